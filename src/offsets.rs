//! Offset reconciliation against the source note text.
//!
//! Annotators sometimes report spans a few characters off (carriage returns
//! dropped, whitespace normalised, encoding differences). [`SourceText::locate`]
//! recovers the true span near the claimed one, and [`OffsetReport`]
//! summarises how well a batch of mentions lines up with its notes.

use crate::constants::LOCATE_WINDOWS;
use crate::error::{ExtractError, Result};
use serde::Serialize;

/// Note text indexed by character
#[derive(Debug, Clone)]
pub struct SourceText {
    chars: Vec<char>,
}

impl SourceText {
    pub fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Text between two character offsets, clamped to the note
    pub fn slice(&self, start: usize, end: usize) -> String {
        let end = end.min(self.chars.len());
        let start = start.min(end);
        self.chars[start..end].iter().collect()
    }

    /// Find the span of `claimed_text` closest to `claimed_start..claimed_end`.
    ///
    /// Returns the claimed span unchanged when it already holds the text.
    /// Otherwise windows of increasing radius around the claim are searched and
    /// the occurrence with the smallest start/end distance to the claim wins,
    /// the earliest on ties.
    pub fn locate(
        &self,
        claimed_text: &str,
        claimed_start: usize,
        claimed_end: usize,
    ) -> Result<(usize, usize)> {
        let target: Vec<char> = claimed_text.chars().collect();
        if self.chars.get(claimed_start..claimed_end) == Some(target.as_slice()) {
            return Ok((claimed_start, claimed_end));
        }

        if !target.is_empty() {
            for &radius in LOCATE_WINDOWS {
                let hi = (claimed_end + radius).min(self.chars.len());
                let lo = claimed_start.saturating_sub(radius).min(hi);
                if let Some(span) =
                    self.closest_in_window(&target, lo, hi, claimed_start, claimed_end)
                {
                    return Ok(span);
                }
            }
        }

        Err(ExtractError::LocationNotFound {
            target: claimed_text.to_string(),
            start: claimed_start,
            end: claimed_end,
        })
    }

    fn closest_in_window(
        &self,
        target: &[char],
        lo: usize,
        hi: usize,
        claimed_start: usize,
        claimed_end: usize,
    ) -> Option<(usize, usize)> {
        let mut best: Option<(usize, (usize, usize))> = None;
        let mut pos = lo;
        while pos + target.len() <= hi {
            if self.chars[pos..pos + target.len()] != *target {
                pos += 1;
                continue;
            }
            let (start, end) = (pos, pos + target.len());
            let distance = [
                start.abs_diff(claimed_start),
                end.abs_diff(claimed_start),
                start.abs_diff(claimed_end),
                end.abs_diff(claimed_end),
            ]
            .into_iter()
            .min()
            .unwrap_or(usize::MAX);
            if best.is_none_or(|(best_distance, _)| distance < best_distance) {
                best = Some((distance, (start, end)));
            }
            pos = end;
        }
        best.map(|(_, span)| span)
    }
}

/// Locate `claimed_text` in `document_text`; see [`SourceText::locate`]
pub fn locate(
    document_text: &str,
    claimed_text: &str,
    claimed_start: usize,
    claimed_end: usize,
) -> Result<(usize, usize)> {
    SourceText::new(document_text).locate(claimed_text, claimed_start, claimed_end)
}

/// Apply carriage-return restoration and `from -> to` replacements to note text
pub fn prepare_note_text(text: &str, add_cr: bool, replacements: &[(String, String)]) -> String {
    let mut text = if add_cr {
        text.replace("\r\n", "\n").replace('\n', "\r\n")
    } else {
        text.to_string()
    };
    for (from, to) in replacements {
        if !from.is_empty() {
            text = text.replace(from.as_str(), to);
        }
    }
    text
}

/// Parse a `from==to` replacement argument
pub fn parse_replacement(raw: &str) -> Result<(String, String)> {
    raw.split_once("==")
        .map(|(from, to)| (from.to_string(), to.to_string()))
        .filter(|(from, _)| !from.is_empty())
        .ok_or_else(|| {
            ExtractError::configuration(format!(
                "replacement must look like `from==to`, found: {}",
                raw
            ))
        })
}

/// Number of failures kept verbatim in a report
const MAX_REPORTED_FAILURES: usize = 20;

/// Summary of offset agreement across a batch
#[derive(Debug, Default, Clone, Serialize)]
pub struct OffsetReport {
    pub files: usize,
    pub mentions: usize,
    pub exact: usize,
    pub recovered: usize,
    pub not_found: usize,
    /// Sum of absolute start shifts of recovered mentions
    pub total_shift: usize,
    pub max_positive_shift: i64,
    pub max_negative_shift: i64,
    pub first_failures: Vec<String>,
}

impl OffsetReport {
    /// Check one mention and record the outcome
    pub fn check(
        &mut self,
        note: &SourceText,
        doc_id: &str,
        claimed_text: &str,
        start: usize,
        end: usize,
    ) {
        self.mentions += 1;
        match note.locate(claimed_text, start, end) {
            Ok((found, _)) if found == start => self.exact += 1,
            Ok((found, _)) => {
                self.recovered += 1;
                let shift = found as i64 - start as i64;
                self.total_shift += shift.unsigned_abs() as usize;
                self.max_positive_shift = self.max_positive_shift.max(shift);
                self.max_negative_shift = self.max_negative_shift.min(shift);
            }
            Err(e) => {
                self.not_found += 1;
                if self.first_failures.len() < MAX_REPORTED_FAILURES {
                    let context = note.slice(start.saturating_sub(10), end + 10);
                    self.first_failures.push(format!(
                        "{}@{}: {} in \"{}\"",
                        doc_id,
                        start,
                        e,
                        context.replace('\n', "\\n")
                    ));
                }
            }
        }
    }

    /// Fold another report into this one
    pub fn merge(&mut self, other: OffsetReport) {
        self.files += other.files;
        self.mentions += other.mentions;
        self.exact += other.exact;
        self.recovered += other.recovered;
        self.not_found += other.not_found;
        self.total_shift += other.total_shift;
        self.max_positive_shift = self.max_positive_shift.max(other.max_positive_shift);
        self.max_negative_shift = self.max_negative_shift.min(other.max_negative_shift);
        let room = MAX_REPORTED_FAILURES.saturating_sub(self.first_failures.len());
        self.first_failures
            .extend(other.first_failures.into_iter().take(room));
    }
}
