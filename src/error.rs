//! Error handling for annotator output extraction.
//!
//! Only whole-document and whole-batch failures live here. Problems confined to a
//! single record line or trigger/position pairing are logged and skipped by the
//! parsers and never surface as an [`ExtractError`].

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Unrecognized output format: {name} (expected one of: mmi, json, xmi)")]
    UnknownFormat { name: String },

    #[error("Invalid JSON in file: {file} - {source}")]
    Json {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid XMI in file: {file} - {reason}")]
    Xml { file: String, reason: String },

    #[error("Invalid CUI file {path} at line {line}: {reason}")]
    InvalidCuiFile {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Unable to find target `{target}` in text at {start}:{end}")]
    LocationNotFound {
        target: String,
        start: usize,
        end: usize,
    },

    #[error("Failed to find note text for extract file: {path}")]
    MissingNote { path: PathBuf },

    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Processing interrupted: {reason}")]
    Interrupted { reason: String },

    #[error("Worker task failed for {path}: {reason}")]
    WorkerFailed { path: PathBuf, reason: String },
}

impl ExtractError {
    /// Create an XML decode error for a file
    pub fn xml(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Xml {
            file: file.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a processing interrupted error
    pub fn interrupted(reason: impl Into<String>) -> Self {
        Self::Interrupted {
            reason: reason.into(),
        }
    }

    /// True for structural decode failures confined to a single document
    pub fn is_document_error(&self) -> bool {
        matches!(self, Self::Json { .. } | Self::Xml { .. })
    }
}

pub type Result<T> = std::result::Result<T, ExtractError>;
