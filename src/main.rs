use clap::Parser;
use mml_extract::ExtractError;
use mml_extract::cli::{args::Args, commands};
use std::process;
use tokio_util::sync::CancellationToken;

fn main() {
    // Parse command line arguments
    let args = Args::parse();

    // If no subcommand was provided, show help and available commands
    if args.command.is_none() {
        show_help_and_commands();
        process::exit(0);
    }

    // Create async runtime and run the main command logic with signal handling
    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("Failed to create async runtime: {}", e);
        process::exit(1);
    });

    let result = runtime.block_on(async {
        // Create cancellation token for coordinating graceful shutdown
        let cancellation_token = CancellationToken::new();

        // Set up graceful shutdown handling
        let shutdown_signal = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("Failed to install CTRL+C signal handler: {}", e);
                std::future::pending::<()>().await;
            }
            // Cancel all operations when Ctrl+C is received
            cancellation_token.cancel();
        };

        // Run the main command with cancellation support
        tokio::select! {
            result = commands::run(args, cancellation_token.clone()) => {
                result
            }
            _ = shutdown_signal => {
                eprintln!("\nReceived CTRL+C, shutting down gracefully...");
                Err(ExtractError::interrupted("Processing interrupted by user").into())
            }
        }
    });

    match result {
        Ok(_outcome) => {
            // Summaries have already been printed by the command
            process::exit(0);
        }
        Err(error) => {
            // Error occurred - print to stderr and exit with error code
            eprintln!("Error: {:#}", error);
            process::exit(1);
        }
    }
}

/// Show help information and available commands when no subcommand is provided
fn show_help_and_commands() {
    println!("mml-extract - MetaMapLite and cTAKES Concept Extractor");
    println!("======================================================");
    println!();
    println!("Normalise concept annotations from MetaMapLite (MMI, JSON) and cTAKES (XMI)");
    println!("output into one CSV row per concept mention.");
    println!();
    println!("USAGE:");
    println!("    mml-extract <COMMAND> [OPTIONS] <DIR>...");
    println!();
    println!("COMMANDS:");
    println!("    extract          Extract concept mentions into CSV tables (main command)");
    println!("    check-offsets    Check that mention offsets match the note text");
    println!("    help             Show this help message or help for specific commands");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help       Show help information");
    println!("    -V, --version    Show version information");
    println!();
    println!("EXAMPLES:");
    println!("    # Extract mentions from MetaMapLite JSON output next to .txt notes:");
    println!("    mml-extract extract /path/to/output --outdir results");
    println!();
    println!("    # Extract cTAKES output, keeping only listed CUIs:");
    println!("    mml-extract extract /path/to/xmi -f xmi --note-directory /path/to/notes \\");
    println!("                        --cui-file cuis.txt --exclude-negated");
    println!();
    println!("    # Check MMI offsets against notes with Windows line endings:");
    println!("    mml-extract check-offsets /path/to/mmi -f mmi --add-cr");
    println!();
    println!("For detailed help on any command, use:");
    println!("    mml-extract <COMMAND> --help");
}
