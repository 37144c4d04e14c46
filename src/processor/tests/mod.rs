//! Integration tests for the processor module
//!
//! Runs the complete pipeline over small annotator output directories.

pub mod error_handling;

use std::fs;
use std::path::{Path, PathBuf};

pub const NOTE_TEXT: &str = "No fever and chest pain";

/// Two events: a negated fever and a chest pain
pub const JSON_OUTPUT: &str = r#"[
  {"negated": true, "evlist": [
    {"id": "E1", "start": 3, "length": 5, "matchedtext": "fever",
     "conceptinfo": {"cui": "C0015967", "conceptstring": "fever", "preferredname": "Fever",
                     "semantictypes": ["sosy"], "sources": ["MSH"]}}]},
  {"negated": false, "evlist": [
    {"id": "E2", "start": 13, "length": 10, "matchedtext": "chest pain",
     "conceptinfo": {"cui": "C0008031", "conceptstring": "chest pain", "preferredname": "Chest Pain",
                     "semantictypes": ["sosy"], "sources": ["MSH", "SNOMEDCT_US"]}}]}
]"#;

pub const MMI_OUTPUT: &str = "0001.tx|MMI|2.30|Chest Pain|C0008031|[sosy]|\"chest pain\"-text-0-\"chest pain\"--0|text|13/10|C23.888.592.612.233\n";

pub fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

/// Data lines of a written CSV file
pub fn data_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .skip(1)
        .map(str::to_string)
        .collect()
}

pub fn header(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .next()
        .unwrap_or_default()
        .split(',')
        .map(str::to_string)
        .collect()
}
