//! Core data structures for annotator output extraction.
//!
//! Defines the normalised concept mention record, the dynamic field values it
//! flattens into, the supported annotator output formats, and batch statistics.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::ExtractError;

/// Static key/value pairs stamped onto every emitted record
pub type Extras = BTreeMap<String, String>;

/// Annotator output formats understood by the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// MetaMapLite pipe-delimited MMI output
    Mmi,
    /// MetaMapLite JSON output
    Json,
    /// cTAKES XMI output
    Xmi,
}

impl OutputFormat {
    /// File extension written by the annotator for this format
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Mmi => "mmi",
            OutputFormat::Json => "json",
            OutputFormat::Xmi => "xmi",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mmi" => Ok(OutputFormat::Mmi),
            "json" => Ok(OutputFormat::Json),
            "xmi" | "xml" => Ok(OutputFormat::Xmi),
            _ => Err(ExtractError::UnknownFormat { name: s.to_string() }),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// One flattened value of a mention record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Flag(bool),
    Missing,
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<usize> for FieldValue {
    fn from(value: usize) -> Self {
        FieldValue::Integer(value as i64)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Flag(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Missing)
    }
}

/// A single concept mention normalised from any annotator format.
///
/// The fixed fields are common to every format. Each semantic type and source
/// vocabulary additionally appears as a presence flag keyed by its own name, so
/// the flattened record shape varies with the input: tabular consumers must
/// union keys across a batch before fixing a schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConceptMention {
    pub doc_id: String,
    pub event_id: String,
    /// Identifier assigned by the annotator itself, when it provides one
    pub evid: Option<String>,
    pub matched_text: String,
    pub concept_string: String,
    pub cui: String,
    pub preferred_name: String,
    pub start: usize,
    pub length: usize,
    pub end: usize,
    pub negated: bool,
    pub part_of_speech: Option<String>,
    pub semantic_type: String,
    pub all_semantic_types: Vec<String>,
    pub source_vocabulary: String,
    pub all_source_vocabularies: Vec<String>,
    /// Keys flagged present: one per semantic type and source vocabulary
    pub presence: BTreeSet<String>,
    /// Caller extras and format-specific attributes (confidence, tui, ...)
    pub attributes: BTreeMap<String, FieldValue>,
}

impl ConceptMention {
    /// Create an empty mention for a document, seeded with caller extras
    pub fn new(doc_id: impl Into<String>, extras: &Extras) -> Self {
        Self {
            doc_id: doc_id.into(),
            event_id: String::new(),
            evid: None,
            matched_text: String::new(),
            concept_string: String::new(),
            cui: String::new(),
            preferred_name: String::new(),
            start: 0,
            length: 0,
            end: 0,
            negated: false,
            part_of_speech: None,
            semantic_type: String::new(),
            all_semantic_types: Vec::new(),
            source_vocabulary: String::new(),
            all_source_vocabularies: Vec::new(),
            presence: BTreeSet::new(),
            attributes: extras
                .iter()
                .map(|(k, v)| (k.clone(), FieldValue::Text(v.clone())))
                .collect(),
        }
    }

    /// Set the span from a start offset and length; `end` is always derived
    pub fn set_span(&mut self, start: usize, length: usize) {
        self.start = start;
        self.length = length;
        self.end = start + length;
    }

    /// Add a semantic type; the first one added becomes the primary type
    pub fn add_semantic_type(&mut self, semantic_type: &str) {
        if semantic_type.is_empty() {
            return;
        }
        if self.semantic_type.is_empty() {
            self.semantic_type = semantic_type.to_string();
        }
        self.all_semantic_types.push(semantic_type.to_string());
        self.presence.insert(semantic_type.to_string());
    }

    /// Add a source vocabulary; the first one added becomes the primary source
    pub fn add_source(&mut self, source: &str) {
        if source.is_empty() {
            return;
        }
        if self.source_vocabulary.is_empty() {
            self.source_vocabulary = source.to_string();
        }
        self.all_source_vocabularies.push(source.to_string());
        self.presence.insert(source.to_string());
    }

    /// Copy of this mention under a different (remapped) CUI
    pub fn with_cui(&self, cui: &str) -> Self {
        let mut mention = self.clone();
        mention.cui = cui.to_string();
        mention
    }

    /// True if the presence flag for `key` is set
    pub fn has_flag(&self, key: &str) -> bool {
        self.presence.contains(key)
    }

    /// Flatten into column name -> value.
    ///
    /// Attributes (including caller extras) go in first, then presence flags, then
    /// the fixed columns, so computed fields of the same name take precedence.
    pub fn fields(&self) -> BTreeMap<String, FieldValue> {
        let mut fields = self.attributes.clone();
        for key in &self.presence {
            fields.insert(key.clone(), FieldValue::Flag(true));
        }
        // Fixed columns go last and are never shadowed by a flag
        let fixed: [(&str, FieldValue); 16] = [
            ("event_id", self.event_id.as_str().into()),
            ("docid", self.doc_id.as_str().into()),
            ("matchedtext", self.matched_text.as_str().into()),
            ("conceptstring", self.concept_string.as_str().into()),
            ("cui", self.cui.as_str().into()),
            ("preferredname", self.preferred_name.as_str().into()),
            ("start", self.start.into()),
            ("end", self.end.into()),
            ("length", self.length.into()),
            ("evid", self.evid.clone().into()),
            ("negated", self.negated.into()),
            ("pos", self.part_of_speech.clone().into()),
            ("semantictype", self.semantic_type.as_str().into()),
            ("all_semantictypes", self.all_semantic_types.join(",").into()),
            ("source", self.source_vocabulary.as_str().into()),
            ("all_sources", self.all_source_vocabularies.join(",").into()),
        ];
        for (key, value) in fixed {
            fields.insert(key.to_string(), value);
        }
        fields
    }
}

/// Statistics about the note text accompanying an annotator output file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteRecord {
    pub filename: String,
    pub doc_id: String,
    pub num_chars: usize,
    pub num_letters: usize,
    pub num_words: usize,
    pub processed: bool,
}

impl NoteRecord {
    /// Compute statistics for a note's text
    pub fn from_text(path: &Path, doc_id: impl Into<String>, text: &str) -> Self {
        Self {
            filename: path.display().to_string(),
            doc_id: doc_id.into(),
            num_chars: text.chars().count(),
            num_letters: text.chars().filter(|c| c.is_ascii_alphanumeric()).count(),
            num_words: text.split_whitespace().count(),
            processed: true,
        }
    }
}

/// Processing statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub files_processed: usize,
    pub files_failed: usize,
    pub notes_missing: usize,
    pub total_mentions: usize,
    pub negated_excluded: usize,
    pub output_path: PathBuf,
    pub notes_path: PathBuf,
    pub processing_time_ms: u128,
}

/// Derive the document identifier from an annotator output file name.
///
/// Strips the annotator extension and then a remaining `.txt`, so that
/// `0001.txt.xmi`, `0001.mmi` and `0001.json` all yield `0001`.
pub fn document_stem(filename: &str) -> String {
    let name = Path::new(filename)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string());
    let stem = match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name.as_str(),
    };
    stem.strip_suffix(".txt").unwrap_or(stem).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("mmi".parse::<OutputFormat>().unwrap(), OutputFormat::Mmi);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("xmi".parse::<OutputFormat>().unwrap(), OutputFormat::Xmi);
        assert!(matches!(
            "csv".parse::<OutputFormat>(),
            Err(ExtractError::UnknownFormat { .. })
        ));
    }

    #[test]
    fn test_document_stem() {
        assert_eq!(document_stem("0000.mmi"), "0000");
        assert_eq!(document_stem("dir/0001.txt.xmi"), "0001");
        assert_eq!(document_stem("note.json"), "note");
        assert_eq!(document_stem("plain"), "plain");
    }

    #[test]
    fn test_span_end_is_derived() {
        let mut mention = ConceptMention::new("doc", &Extras::new());
        mention.set_span(12, 5);
        assert_eq!(mention.end, 17);
    }

    #[test]
    fn test_fields_computed_override_extras() {
        let mut extras = Extras::new();
        extras.insert("cui".to_string(), "from-extras".to_string());
        extras.insert("article_source".to_string(), "pubmed".to_string());
        let mut mention = ConceptMention::new("doc", &extras);
        mention.cui = "C0008031".to_string();
        mention.add_semantic_type("sosy");
        mention.add_source("MSH");

        let fields = mention.fields();
        assert_eq!(fields["cui"], FieldValue::Text("C0008031".to_string()));
        assert_eq!(fields["article_source"], FieldValue::Text("pubmed".to_string()));
        assert_eq!(fields["sosy"], FieldValue::Flag(true));
        assert_eq!(fields["MSH"], FieldValue::Flag(true));
        assert_eq!(fields["semantictype"], FieldValue::Text("sosy".to_string()));
    }

    #[test]
    fn test_presence_flags_override_extras() {
        let mut extras = Extras::new();
        extras.insert("sosy".to_string(), "label".to_string());
        extras.insert("MSH".to_string(), "label".to_string());
        let mut mention = ConceptMention::new("doc", &extras);
        mention.add_semantic_type("sosy");
        mention.add_source("MSH");

        let fields = mention.fields();
        assert_eq!(fields["sosy"], FieldValue::Flag(true));
        assert_eq!(fields["MSH"], FieldValue::Flag(true));
    }

    #[test]
    fn test_presence_is_additive() {
        let mut mention = ConceptMention::new("doc", &Extras::new());
        mention.add_semantic_type("dsyn");
        mention.add_semantic_type("fndg");
        mention.add_semantic_type("dsyn");
        assert_eq!(mention.semantic_type, "dsyn");
        assert_eq!(mention.all_semantic_types, vec!["dsyn", "fndg", "dsyn"]);
        assert!(mention.has_flag("dsyn") && mention.has_flag("fndg"));
    }

    #[test]
    fn test_note_record_statistics() {
        let note = NoteRecord::from_text(Path::new("a.txt"), "a", "Chest pain, 2 days.\n");
        assert_eq!(note.num_chars, 20);
        assert_eq!(note.num_words, 4);
        assert_eq!(note.num_letters, 14);
    }
}
