//! Error handling tests

use super::{JSON_OUTPUT, NOTE_TEXT, data_lines, write};
use crate::config::ExtractConfig;
use crate::error::ExtractError;
use crate::processor::ExtractionProcessor;
use crate::target_cuis::TargetCuiIndex;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn processor(dir: std::path::PathBuf, out: std::path::PathBuf) -> ExtractionProcessor {
    ExtractionProcessor::new(vec![dir], out, TargetCuiIndex::default())
        .with_timestamp("run")
        .with_progress(false)
}

#[tokio::test]
async fn test_invalid_document_is_counted_and_skipped() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("input");
    write(&input, "0001.json", JSON_OUTPUT);
    write(&input, "0001.txt", NOTE_TEXT);
    write(&input, "0002.json", "{ not json");
    write(&input, "0002.txt", NOTE_TEXT);

    let stats = processor(input, temp_dir.path().join("out"))
        .process(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(stats.files_processed, 1);
    assert_eq!(stats.files_failed, 1);
    assert_eq!(stats.total_mentions, 2);
}

#[tokio::test]
async fn test_missing_note_stops_the_batch() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("input");
    write(&input, "0001.json", JSON_OUTPUT);

    let err = processor(input, temp_dir.path().join("out"))
        .process(&CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractError::MissingNote { .. }));
}

#[tokio::test]
async fn test_skip_missing_keeps_mentions() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("input");
    write(&input, "0001.json", JSON_OUTPUT);

    let stats = processor(input, temp_dir.path().join("out"))
        .with_config(ExtractConfig::default().with_skip_missing())
        .process(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(stats.files_processed, 1);
    assert_eq!(stats.notes_missing, 1);
    assert_eq!(stats.total_mentions, 2);
    assert!(data_lines(&stats.notes_path).is_empty());
}

#[tokio::test]
async fn test_missing_input_directory() {
    let temp_dir = TempDir::new().unwrap();
    let err = processor(temp_dir.path().join("absent"), temp_dir.path().join("out"))
        .process(&CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractError::DirectoryNotFound { .. }));
}

#[tokio::test]
async fn test_invalid_configuration_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("input");
    std::fs::create_dir_all(&input).unwrap();

    let err = processor(input, temp_dir.path().join("out"))
        .with_config(ExtractConfig::default().with_note_suffix("txt"))
        .process(&CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractError::Configuration { .. }));
}

#[tokio::test]
async fn test_cancelled_run_is_interrupted() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("input");
    write(&input, "0001.json", JSON_OUTPUT);
    write(&input, "0001.txt", NOTE_TEXT);

    let token = CancellationToken::new();
    token.cancel();
    let err = processor(input, temp_dir.path().join("out"))
        .process(&token)
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractError::Interrupted { .. }));
}
