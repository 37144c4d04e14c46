//! Concurrent per-file processing
//!
//! Each annotator output file is read, parsed and paired with its note text on
//! the blocking thread pool. At most `max_concurrent_files` files are in flight
//! and results come back in input order.

use super::discovery::find_note_file;
use crate::config::ExtractConfig;
use crate::error::{ExtractError, Result};
use crate::models::{ConceptMention, NoteRecord, document_stem};
use crate::offsets::{OffsetReport, SourceText, prepare_note_text};
use crate::parse::{parse_document, read_extract_file};
use crate::target_cuis::TargetCuiIndex;

use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Result of processing one annotator output file
#[derive(Debug)]
pub struct FileOutcome {
    pub extract_path: PathBuf,
    pub doc_id: String,
    pub mentions: Vec<ConceptMention>,
    /// Statistics of the note text, if it was found
    pub note: Option<NoteRecord>,
    pub negated_excluded: usize,
}

/// Counts gathered while streaming a batch
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchCounts {
    pub files_processed: usize,
    pub files_failed: usize,
    pub notes_missing: usize,
}

/// An annotator output file and the index of the input directory it came from
#[derive(Debug, Clone)]
pub struct ExtractFile {
    pub path: PathBuf,
    pub dir_index: usize,
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Parse one annotator output file and gather its note statistics
pub fn process_file(
    file: &ExtractFile,
    config: &ExtractConfig,
    targets: &TargetCuiIndex,
) -> Result<FileOutcome> {
    let path = &file.path;
    let file_name = file_name_of(path);
    let doc_id = document_stem(&file_name);
    let text = read_extract_file(path)?;

    let mut extras = config.extras.clone();
    extras.insert("filename".to_string(), path.display().to_string());

    let mut negated_excluded = 0;
    let mentions: Vec<ConceptMention> =
        parse_document(config.output_format, &text, &file_name, targets, &extras)?
            .filter(|mention| {
                if config.exclude_negated && mention.negated {
                    negated_excluded += 1;
                    false
                } else {
                    true
                }
            })
            .collect();

    let note = match find_note_file(path, file.dir_index, config)? {
        Some(note_path) => {
            debug!("Processing associated note text: {}", note_path.display());
            let note_text = read_extract_file(&note_path)?;
            Some(NoteRecord::from_text(path, doc_id.as_str(), &note_text))
        }
        None => None,
    };

    Ok(FileOutcome {
        extract_path: path.clone(),
        doc_id,
        mentions,
        note,
        negated_excluded,
    })
}

/// Compare every mention's claimed span against its note text.
///
/// Returns `None` when the note is missing and `skip_missing` is set.
pub fn check_file_offsets(file: &ExtractFile, config: &ExtractConfig) -> Result<Option<OffsetReport>> {
    let path = &file.path;
    let file_name = file_name_of(path);
    let doc_id = document_stem(&file_name);
    let Some(note_path) = find_note_file(path, file.dir_index, config)? else {
        return Ok(None);
    };
    let note_text = read_extract_file(&note_path)?;
    let note = SourceText::new(&prepare_note_text(
        &note_text,
        config.add_cr,
        &config.replacements,
    ));

    let text = read_extract_file(path)?;
    let targets = TargetCuiIndex::default();
    let mut report = OffsetReport {
        files: 1,
        ..Default::default()
    };
    for mention in parse_document(
        config.output_format,
        &text,
        &file_name,
        &targets,
        &config.extras,
    )? {
        report.check(&note, &doc_id, &mention.matched_text, mention.start, mention.end);
    }
    Ok(Some(report))
}

fn progress_bar(len: usize, show_progress: bool) -> ProgressBar {
    if !show_progress {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

/// Streaming processor for batches of annotator output files
#[derive(Debug, Clone)]
pub struct StreamingProcessor {
    config: Arc<ExtractConfig>,
    targets: Arc<TargetCuiIndex>,
    show_progress: bool,
}

impl StreamingProcessor {
    pub fn new(config: Arc<ExtractConfig>, targets: Arc<TargetCuiIndex>) -> Self {
        Self {
            config,
            targets,
            show_progress: true,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Process files concurrently, returning outcomes in input order.
    ///
    /// A file that cannot be decoded as its declared format is logged and
    /// counted as failed. Any other error, or cancellation, stops the batch.
    pub async fn process_files(
        &self,
        files: &[ExtractFile],
        cancellation_token: &CancellationToken,
    ) -> Result<(Vec<FileOutcome>, BatchCounts)> {
        let pb = progress_bar(files.len(), self.show_progress);
        pb.set_message("Processing files");
        let concurrent_limit = self.config.max_concurrent_files.clamp(1, files.len().max(1));
        debug!(
            "Processing {} files with {} concurrent workers",
            files.len(),
            concurrent_limit
        );

        let mut results = stream::iter(files.iter().cloned())
            .map(|file| {
                let config = Arc::clone(&self.config);
                let targets = Arc::clone(&self.targets);
                let pb = pb.clone();
                async move {
                    pb.set_message(format!("Processing: {}", file_name_of(&file.path)));
                    let path = file.path.clone();
                    let result =
                        task::spawn_blocking(move || process_file(&file, &config, &targets))
                            .await
                            .map_err(|e| ExtractError::WorkerFailed {
                                path: path.clone(),
                                reason: e.to_string(),
                            })
                            .and_then(|result| result);
                    pb.inc(1);
                    (path, result)
                }
            })
            .buffered(concurrent_limit);

        let mut outcomes = Vec::with_capacity(files.len());
        let mut counts = BatchCounts::default();
        while let Some((path, result)) = results.next().await {
            if cancellation_token.is_cancelled() {
                pb.abandon_with_message("Cancelled");
                return Err(ExtractError::interrupted("Processing interrupted by user"));
            }
            match result {
                Ok(outcome) => {
                    debug!(
                        file = %path.display(),
                        mentions = outcome.mentions.len(),
                        "Processed file"
                    );
                    counts.files_processed += 1;
                    if outcome.note.is_none() {
                        counts.notes_missing += 1;
                    }
                    outcomes.push(outcome);
                }
                Err(e) if e.is_document_error() => {
                    warn!("Failed to process {}: {}", path.display(), e);
                    counts.files_failed += 1;
                }
                Err(e) => {
                    pb.abandon_with_message("Failed");
                    return Err(e);
                }
            }
        }

        pb.finish_with_message("All files processed");
        info!(
            "Processed {} files ({} failed)",
            counts.files_processed, counts.files_failed
        );
        Ok((outcomes, counts))
    }

    /// Check offsets for every file, merging the per-file reports
    pub async fn check_offsets(
        &self,
        files: &[ExtractFile],
        cancellation_token: &CancellationToken,
    ) -> Result<OffsetReport> {
        let pb = progress_bar(files.len(), self.show_progress);
        pb.set_message("Checking offsets");
        let concurrent_limit = self.config.max_concurrent_files.clamp(1, files.len().max(1));

        let mut results = stream::iter(files.iter().cloned())
            .map(|file| {
                let config = Arc::clone(&self.config);
                let pb = pb.clone();
                async move {
                    let path = file.path.clone();
                    let result = task::spawn_blocking(move || check_file_offsets(&file, &config))
                        .await
                        .map_err(|e| ExtractError::WorkerFailed {
                            path: path.clone(),
                            reason: e.to_string(),
                        })
                        .and_then(|result| result);
                    pb.inc(1);
                    (path, result)
                }
            })
            .buffered(concurrent_limit);

        let mut report = OffsetReport::default();
        while let Some((path, result)) = results.next().await {
            if cancellation_token.is_cancelled() {
                pb.abandon_with_message("Cancelled");
                return Err(ExtractError::interrupted("Offset check interrupted by user"));
            }
            match result {
                Ok(Some(file_report)) => report.merge(file_report),
                Ok(None) => {}
                Err(e) if e.is_document_error() => {
                    warn!("Failed to check {}: {}", path.display(), e);
                }
                Err(e) => {
                    pb.abandon_with_message("Failed");
                    return Err(e);
                }
            }
        }
        pb.finish_with_message("Offsets checked");
        Ok(report)
    }
}
