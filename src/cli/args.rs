//! Command-line argument definitions for mml-extract
//!
//! Defines the CLI interface using the clap derive API.

use crate::config::ExtractConfig;
use crate::error::{ExtractError, Result};
use crate::models::OutputFormat;
use crate::offsets::parse_replacement;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for the annotator output extractor
///
/// Normalises MetaMapLite (MMI, JSON) and cTAKES (XMI) concept annotations into
/// one tabular record per concept mention.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "mml-extract",
    version,
    about = "Extract concept mentions from MetaMapLite and cTAKES output into CSV tables",
    long_about = "Reads MetaMapLite MMI or JSON output, or cTAKES XMI output, normalises every \
                  concept mention into one record, optionally filters and remaps CUIs, and writes \
                  the mentions and per-note statistics as timestamped CSV tables."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Extract concept mentions into CSV tables
    Extract(ExtractArgs),
    /// Check that mention offsets match the note text
    CheckOffsets(CheckOffsetsArgs),
}

/// Arguments shared by every command that reads annotator output
#[derive(Debug, Clone, clap::Args)]
pub struct InputArgs {
    /// Directories containing annotator output files
    #[arg(value_name = "DIR", required = true, num_args = 1..)]
    pub directories: Vec<PathBuf>,

    /// Annotator output format
    #[arg(
        short = 'f',
        long = "extract-format",
        value_name = "FORMAT",
        default_value = "json",
        help = "Annotator output format: mmi, json or xmi"
    )]
    pub format: OutputFormat,

    /// Directories containing the note text, in the same order as the inputs
    ///
    /// When omitted, note text is looked for next to the annotator output.
    #[arg(long = "note-directory", value_name = "DIR")]
    pub note_directories: Vec<PathBuf>,

    /// Suffix of note text files (may be empty)
    #[arg(long = "note-suffix", value_name = "SUFFIX", default_value = ".txt", allow_hyphen_values = true)]
    pub note_suffix: String,

    /// Suffix of annotator output files; defaults to `.{format}`
    #[arg(long = "extract-suffix", value_name = "SUFFIX")]
    pub extract_suffix: Option<String>,

    /// Continue when a note text file cannot be found
    #[arg(long = "skip-missing")]
    pub skip_missing: bool,

    /// Static `key=value` field added to every record
    #[arg(long = "add-field", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub add_fields: Vec<(String, String)>,

    /// Number of files processed concurrently
    #[arg(short = 'j', long = "max-concurrent", value_name = "COUNT")]
    pub max_concurrent: Option<usize>,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Suppress output except errors
    #[arg(short = 'q', long = "quiet", conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Arguments for the extract command
#[derive(Debug, Clone, Parser)]
pub struct ExtractArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Output directory for the mention and note tables
    #[arg(short = 'o', long = "outdir", value_name = "DIR", default_value = ".")]
    pub outdir: PathBuf,

    /// File of target CUIs, one `source_cui[,target_cui]` per line
    #[arg(long = "cui-file", value_name = "FILE")]
    pub cui_file: Option<PathBuf>,

    /// Drop negated mentions
    #[arg(long = "exclude-negated")]
    pub exclude_negated: bool,
}

/// Arguments for the check-offsets command
#[derive(Debug, Clone, Parser)]
pub struct CheckOffsetsArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Restore `\r\n` line endings in the note text before checking
    #[arg(long = "add-cr")]
    pub add_cr: bool,

    /// Text replacement applied to the note text, as `from==to`
    #[arg(long = "replacements", value_name = "FROM==TO", value_parser = parse_replacement)]
    pub replacements: Vec<(String, String)>,

    /// Check at most this many files (0 = all)
    #[arg(long = "limit-files", value_name = "COUNT", default_value_t = 0)]
    pub limit_files: usize,
}

/// Parse a `key=value` pair
fn parse_key_value(raw: &str) -> Result<(String, String)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(ExtractError::configuration(format!(
            "field must look like `key=value`, found: {}",
            raw
        ))),
    }
}

impl Args {
    /// Input arguments of the chosen command
    pub fn input(&self) -> Option<&InputArgs> {
        match &self.command {
            Some(Commands::Extract(args)) => Some(&args.input),
            Some(Commands::CheckOffsets(args)) => Some(&args.input),
            None => None,
        }
    }
}

impl InputArgs {
    /// Build the extraction settings these arguments describe
    pub fn config(&self) -> ExtractConfig {
        let mut config = ExtractConfig::default()
            .with_output_format(self.format)
            .with_note_suffix(self.note_suffix.as_str())
            .with_note_directories(self.note_directories.clone());
        if let Some(suffix) = &self.extract_suffix {
            config = config.with_extract_suffix(suffix.as_str());
        }
        if self.skip_missing {
            config = config.with_skip_missing();
        }
        if let Some(workers) = self.max_concurrent {
            config = config.with_max_concurrent_files(workers);
        }
        self.add_fields
            .iter()
            .fold(config, |config, (key, value)| config.with_extra(key, value))
    }

    /// Determine the appropriate log level based on verbosity flags
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }

    /// Check if we should show progress bars (not in quiet mode)
    pub fn show_progress(&self) -> bool {
        !self.quiet
    }
}

impl ExtractArgs {
    pub fn config(&self) -> ExtractConfig {
        let config = self.input.config();
        if self.exclude_negated {
            config.with_exclude_negated()
        } else {
            config
        }
    }
}

impl CheckOffsetsArgs {
    pub fn config(&self) -> ExtractConfig {
        let config = self
            .input
            .config()
            .with_replacements(self.replacements.clone())
            .with_limit_files(self.limit_files);
        if self.add_cr {
            config.with_add_cr()
        } else {
            config
        }
    }
}
