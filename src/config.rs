//! Configuration for batch extraction and offset checking.
//!
//! [`ExtractConfig`] collects the settings the CLI gathers from its flags.
//! Defaults match the annotator's usual layout: JSON output files next to
//! `.txt` notes.

use crate::error::{ExtractError, Result};
use crate::models::{Extras, OutputFormat};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

/// Settings shared by the extraction and offset-check commands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Annotator output format to look for and parse
    pub output_format: OutputFormat,

    /// Suffix of annotator output files; `.{format}` when unset
    pub extract_suffix: Option<String>,

    /// Suffix of the note text files (may be empty)
    pub note_suffix: String,

    /// Directories holding note text, when apart from the annotator output
    pub note_directories: Vec<PathBuf>,

    /// Drop negated mentions from the output
    pub exclude_negated: bool,

    /// Carry on when a note text file cannot be found
    pub skip_missing: bool,

    /// Maximum concurrent file processing
    pub max_concurrent_files: usize,

    /// Static key/value pairs stamped onto every mention
    pub extras: Extras,

    /// Restore `\r\n` line endings before checking offsets
    pub add_cr: bool,

    /// `from -> to` text replacements applied before checking offsets
    pub replacements: Vec<(String, String)>,

    /// Maximum number of files to check offsets for (0 = no limit)
    pub limit_files: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::Json,
            extract_suffix: None,
            note_suffix: ".txt".to_string(),
            note_directories: Vec::new(),
            exclude_negated: false,
            skip_missing: false,
            max_concurrent_files: num_cpus::get(),
            extras: Extras::new(),
            add_cr: false,
            replacements: Vec::new(),
            limit_files: 0,
        }
    }
}

impl ExtractConfig {
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Override the suffix of annotator output files
    pub fn with_extract_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.extract_suffix = Some(suffix.into());
        self
    }

    pub fn with_note_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.note_suffix = suffix.into();
        self
    }

    pub fn with_note_directories(mut self, directories: Vec<PathBuf>) -> Self {
        self.note_directories = directories;
        self
    }

    pub fn with_exclude_negated(mut self) -> Self {
        self.exclude_negated = true;
        self
    }

    pub fn with_skip_missing(mut self) -> Self {
        self.skip_missing = true;
        self
    }

    /// Set maximum concurrent files
    pub fn with_max_concurrent_files(mut self, max_files: usize) -> Self {
        self.max_concurrent_files = max_files;
        self
    }

    /// Add one static field to every mention
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }

    pub fn with_add_cr(mut self) -> Self {
        self.add_cr = true;
        self
    }

    pub fn with_replacements(mut self, replacements: Vec<(String, String)>) -> Self {
        self.replacements = replacements;
        self
    }

    pub fn with_limit_files(mut self, limit: usize) -> Self {
        self.limit_files = limit;
        self
    }

    /// Suffix that identifies annotator output files
    pub fn extract_suffix(&self) -> String {
        self.extract_suffix
            .clone()
            .unwrap_or_else(|| format!(".{}", self.output_format.extension()))
    }

    /// Check the settings are usable
    pub fn validate(&self) -> Result<()> {
        if !self.note_suffix.is_empty() && !self.note_suffix.starts_with('.') {
            return Err(ExtractError::configuration(format!(
                "note suffix must be empty or start with a period, found: {}",
                self.note_suffix
            )));
        }
        if self.extract_suffix.as_deref().is_some_and(str::is_empty) {
            return Err(ExtractError::configuration(
                "extract suffix must not be empty",
            ));
        }
        if self.max_concurrent_files == 0 {
            return Err(ExtractError::configuration(
                "max concurrent files must be at least 1",
            ));
        }
        debug!(
            format = %self.output_format,
            extract_suffix = %self.extract_suffix(),
            note_suffix = %self.note_suffix,
            workers = self.max_concurrent_files,
            "Configuration validated"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExtractConfig::default();
        assert_eq!(config.output_format, OutputFormat::Json);
        assert_eq!(config.extract_suffix(), ".json");
        assert_eq!(config.note_suffix, ".txt");
        assert!(config.max_concurrent_files >= 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let config = ExtractConfig::default()
            .with_output_format(OutputFormat::Xmi)
            .with_note_suffix("")
            .with_exclude_negated()
            .with_extra("article_source", "pubmed");
        assert_eq!(config.extract_suffix(), ".xmi");
        assert!(config.exclude_negated);
        assert_eq!(config.extras["article_source"], "pubmed");
        assert!(config.validate().is_ok());

        let config = config.with_extract_suffix(".txt.xmi");
        assert_eq!(config.extract_suffix(), ".txt.xmi");
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        assert!(ExtractConfig::default().with_note_suffix("txt").validate().is_err());
        assert!(ExtractConfig::default().with_extract_suffix("").validate().is_err());
        assert!(ExtractConfig::default()
            .with_max_concurrent_files(0)
            .validate()
            .is_err());
    }
}
