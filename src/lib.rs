//! mml_extract Library
//!
//! Normalises the concept annotations produced by clinical NLP annotators into a
//! flat, per-mention record stream.
//!
//! This library provides tools for:
//! - Parsing MetaMapLite pipe-delimited (MMI) output, including wrapped records
//!   and multi-trigger positional info
//! - Parsing MetaMapLite JSON output and cTAKES XMI output
//! - Filtering and remapping mentions through a target CUI index
//! - Recovering mention offsets that drifted from the source note text
//! - Batch extraction of directories into timestamped CSV tables

pub mod config;
pub mod constants;
pub mod error;
pub mod json_format;
pub mod mmi;
pub mod models;
pub mod offsets;
pub mod parse;
pub mod processor;
pub mod target_cuis;
pub mod xmi;

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use config::ExtractConfig;
pub use error::{ExtractError, Result};
pub use models::{ConceptMention, Extras, FieldValue, NoteRecord, OutputFormat, ProcessingStats};
pub use offsets::{OffsetReport, locate};
pub use parse::{parse_document, parse_document_named};
pub use processor::ExtractionProcessor;
pub use target_cuis::TargetCuiIndex;
