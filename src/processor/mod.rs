//! Batch extraction engine.
//!
//! Orchestrates discovery of annotator output files across input directories,
//! concurrent parsing with note lookup, and writing of the mention and note
//! tables.

pub mod discovery;
pub mod streaming;
pub mod writer;

#[cfg(test)]
pub mod tests;

use self::{
    discovery::FileDiscovery,
    streaming::{ExtractFile, StreamingProcessor},
    writer::TableWriter,
};

use crate::config::ExtractConfig;
use crate::error::Result;
use crate::models::{NoteRecord, ProcessingStats};
use crate::offsets::OffsetReport;
use crate::target_cuis::TargetCuiIndex;

use colored::*;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Timestamp naming one run's output files
pub fn run_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Main processor for batch extraction
#[derive(Debug)]
pub struct ExtractionProcessor {
    directories: Vec<PathBuf>,
    output_dir: PathBuf,
    config: ExtractConfig,
    targets: Arc<TargetCuiIndex>,
    timestamp: String,
    show_progress: bool,
}

impl ExtractionProcessor {
    pub fn new(directories: Vec<PathBuf>, output_dir: PathBuf, targets: TargetCuiIndex) -> Self {
        Self {
            directories,
            output_dir,
            config: ExtractConfig::default(),
            targets: Arc::new(targets),
            timestamp: run_timestamp(),
            show_progress: true,
        }
    }

    /// Configure the processor
    pub fn with_config(mut self, config: ExtractConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    fn streaming_processor(&self) -> StreamingProcessor {
        StreamingProcessor::new(Arc::new(self.config.clone()), Arc::clone(&self.targets))
            .with_progress(self.show_progress)
    }

    /// Find annotator output files in every input directory, in directory order
    async fn discover(&self) -> Result<Vec<ExtractFile>> {
        let discovery = FileDiscovery::from_config(&self.config);
        let mut files = Vec::new();
        for (dir_index, directory) in self.directories.iter().enumerate() {
            let found = discovery.discover_extract_files(directory).await?;
            println!(
                "  {} {} files in {}",
                "Found".bright_green(),
                found.len().to_string().bright_white().bold(),
                directory.display()
            );
            files.extend(found.into_iter().map(|path| ExtractFile { path, dir_index }));
        }
        Ok(files)
    }

    /// Main processing entry point
    pub async fn process(&self, cancellation_token: &CancellationToken) -> Result<ProcessingStats> {
        let start_time = Instant::now();
        self.config.validate()?;

        println!("{}", "Starting extraction".bright_green().bold());
        println!("  {} {}", "Format:".bright_cyan(), self.config.output_format);
        println!(
            "  {} {}",
            "Output:".bright_cyan(),
            self.output_dir.display()
        );
        if self.targets.is_restricted() {
            println!(
                "  {} {}",
                "Target CUIs:".bright_cyan(),
                self.targets.n_keys()
            );
        }

        println!("\n{}", "Discovering files...".bright_yellow());
        let files = self.discover().await?;

        println!("\n{}", "Processing files...".bright_yellow());
        let (outcomes, counts) = self
            .streaming_processor()
            .process_files(&files, cancellation_token)
            .await?;

        let writer = TableWriter::new(self.output_dir.clone(), self.timestamp.as_str());
        let (output_path, total_mentions) = writer.write_mentions(&outcomes)?;
        let notes: Vec<NoteRecord> = outcomes.iter().filter_map(|o| o.note.clone()).collect();
        let notes_path = writer.write_notes(&notes)?;

        let stats = ProcessingStats {
            files_processed: counts.files_processed,
            files_failed: counts.files_failed,
            notes_missing: counts.notes_missing,
            total_mentions,
            negated_excluded: outcomes.iter().map(|o| o.negated_excluded).sum(),
            output_path,
            notes_path,
            processing_time_ms: start_time.elapsed().as_millis(),
        };
        info!(
            files = stats.files_processed,
            mentions = stats.total_mentions,
            "Extraction complete"
        );
        print_summary(&stats);
        Ok(stats)
    }

    /// Compare claimed mention spans against note text for every file
    pub async fn check_offsets(
        &self,
        cancellation_token: &CancellationToken,
    ) -> Result<OffsetReport> {
        self.config.validate()?;
        println!("{}", "Checking offsets".bright_green().bold());

        let mut files = self.discover().await?;
        if self.config.limit_files > 0 && files.len() > self.config.limit_files {
            files.truncate(self.config.limit_files);
            println!(
                "  {} {} files",
                "Limited to".bright_cyan(),
                self.config.limit_files
            );
        }

        let report = self
            .streaming_processor()
            .check_offsets(&files, cancellation_token)
            .await?;
        print_offset_report(&report);
        Ok(report)
    }
}

fn print_summary(stats: &ProcessingStats) {
    println!("\n{}", "Processing Summary".bright_green().bold());
    println!(
        "  {} {}ms",
        "Time elapsed:".bright_cyan(),
        stats.processing_time_ms.to_string().bright_white()
    );
    println!(
        "  {} {}",
        "Files processed:".bright_cyan(),
        stats.files_processed.to_string().bright_white()
    );
    if stats.files_failed > 0 {
        println!(
            "  {} {}",
            "Files failed:".bright_red(),
            stats.files_failed.to_string().bright_red().bold()
        );
    }
    if stats.notes_missing > 0 {
        println!(
            "  {} {}",
            "Notes missing:".bright_yellow(),
            stats.notes_missing.to_string().bright_yellow()
        );
    }
    if stats.negated_excluded > 0 {
        println!(
            "  {} {}",
            "Negated excluded:".bright_cyan(),
            stats.negated_excluded.to_string().bright_white()
        );
    }
    println!(
        "  {} {}",
        "Total mentions:".bright_cyan(),
        stats.total_mentions.to_string().bright_white().bold()
    );
    println!(
        "  {} {}",
        "Mentions:".bright_cyan(),
        stats.output_path.display()
    );
    println!("  {} {}", "Notes:".bright_cyan(), stats.notes_path.display());
}

fn print_offset_report(report: &OffsetReport) {
    println!("\n{}", "Offset Summary".bright_green().bold());
    println!(
        "  {} {}",
        "Files checked:".bright_cyan(),
        report.files.to_string().bright_white()
    );
    println!(
        "  {} {}",
        "Mentions:".bright_cyan(),
        report.mentions.to_string().bright_white()
    );
    println!(
        "  {} {}",
        "Exact:".bright_cyan(),
        report.exact.to_string().bright_white()
    );
    if report.recovered > 0 {
        println!(
            "  {} {} (total shift {}, range {}..{})",
            "Recovered:".bright_yellow(),
            report.recovered.to_string().bright_yellow(),
            report.total_shift,
            report.max_negative_shift,
            report.max_positive_shift
        );
    }
    if report.not_found > 0 {
        println!(
            "  {} {}",
            "Not found:".bright_red(),
            report.not_found.to_string().bright_red().bold()
        );
        for failure in &report.first_failures {
            println!("    {}", failure);
        }
    }
}
