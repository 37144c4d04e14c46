//! Reassembly of MMI record lines from physical lines.
//!
//! MetaMapLite occasionally wraps a record across physical lines, usually inside
//! a quoted trigger-info cell. Fragments with fewer than the minimum number of
//! fields are buffered and the next physical line is appended to them (the last
//! field of the fragment continues into the first field of the next line) until
//! a complete record can be split.

use super::line_splitter::{SplitError, split_record_line};
use crate::constants::{
    ABBREVIATION_FIELDS, ABBREVIATION_TAGS, MMI_MIN_FIELDS, MMI_RECORD_TAG, mmi_fields,
};
use std::iter::Enumerate;
use std::str::Lines;
use tracing::{debug, error, warn};

/// A complete MMI record line, split into fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLine {
    pub fields: Vec<String>,
    /// The record text after any continuation lines were merged
    pub raw: String,
    /// Physical line number (1-based) where the record starts
    pub line_number: usize,
}

impl RecordLine {
    pub fn field(&self, index: usize) -> &str {
        self.fields.get(index).map(String::as_str).unwrap_or_default()
    }
}

/// Buffered fragment of a wrapped record
#[derive(Debug)]
struct Fragment {
    raw: String,
    line_number: usize,
}

/// Iterator over the complete MMI record lines of one output file
#[derive(Debug)]
pub struct LineAssembler<'a> {
    lines: Enumerate<Lines<'a>>,
    pending: Option<Fragment>,
    file_name: String,
}

enum Classified {
    Record(RecordLine),
    Fragment(Fragment),
    Skipped,
}

impl<'a> LineAssembler<'a> {
    pub fn new(text: &'a str, file_name: impl Into<String>) -> Self {
        Self {
            lines: text.lines().enumerate(),
            pending: None,
            file_name: file_name.into(),
        }
    }

    fn classify(&self, raw: String, line_number: usize) -> Classified {
        let fields = match split_record_line(&raw) {
            Ok(fields) => fields,
            Err(SplitError::TrailingQuote { field }) if field + 1 < MMI_MIN_FIELDS => {
                return Classified::Fragment(Fragment { raw, line_number });
            }
            Err(e) => {
                error!(
                    file = %self.file_name,
                    line = line_number,
                    stage = "line splitting",
                    "{}; skipping line: {}",
                    e,
                    raw
                );
                return Classified::Skipped;
            }
        };

        let tag = fields
            .get(mmi_fields::RECORD_TAG)
            .map(String::as_str)
            .unwrap_or_default();
        if ABBREVIATION_TAGS.contains(&tag) && fields.len() == ABBREVIATION_FIELDS {
            debug!(file = %self.file_name, line = line_number, "Skipping {} record", tag);
            return Classified::Skipped;
        }
        if fields.len() < MMI_MIN_FIELDS {
            return Classified::Fragment(Fragment { raw, line_number });
        }
        if tag == MMI_RECORD_TAG {
            Classified::Record(RecordLine {
                fields,
                raw,
                line_number,
            })
        } else if ABBREVIATION_TAGS.contains(&tag) {
            debug!(file = %self.file_name, line = line_number, "Skipping {} record", tag);
            Classified::Skipped
        } else {
            warn!(
                file = %self.file_name,
                line = line_number,
                "Line contains {} rather than \"{}\"; skipping line: {}",
                tag,
                MMI_RECORD_TAG,
                raw
            );
            Classified::Skipped
        }
    }
}

/// True if a physical line is on its own a complete record of a known kind
fn starts_new_record(line: &str) -> bool {
    let Ok(fields) = split_record_line(line) else {
        return false;
    };
    let tag = fields
        .get(mmi_fields::RECORD_TAG)
        .map(String::as_str)
        .unwrap_or_default();
    (tag == MMI_RECORD_TAG && fields.len() >= MMI_MIN_FIELDS)
        || (ABBREVIATION_TAGS.contains(&tag) && fields.len() == ABBREVIATION_FIELDS)
}

impl Iterator for LineAssembler<'_> {
    type Item = RecordLine;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let Some((index, line)) = self.lines.next() else {
                if let Some(fragment) = self.pending.take() {
                    warn!(
                        file = %self.file_name,
                        line = fragment.line_number,
                        stage = "line continuation",
                        "Incomplete record at end of file; skipping: {}",
                        fragment.raw
                    );
                }
                return None;
            };
            let line_number = index + 1;
            let line = line.strip_suffix('\r').unwrap_or(line);

            let (raw, start_line) = match self.pending.take() {
                Some(fragment) if starts_new_record(line) => {
                    warn!(
                        file = %self.file_name,
                        line = fragment.line_number,
                        stage = "line continuation",
                        "Record fragment not continued by the next line; skipping: {}",
                        fragment.raw
                    );
                    (line.to_string(), line_number)
                }
                Some(mut fragment) => {
                    fragment.raw.push_str(line);
                    (fragment.raw, fragment.line_number)
                }
                None if line.trim().is_empty() => continue,
                None => (line.to_string(), line_number),
            };

            match self.classify(raw, start_line) {
                Classified::Record(record) => return Some(record),
                Classified::Fragment(fragment) => self.pending = Some(fragment),
                Classified::Skipped => {}
            }
        }
    }
}
