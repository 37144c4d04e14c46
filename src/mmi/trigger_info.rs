//! Decoding of the MMI trigger-info cell.
//!
//! The cell is a comma-separated list of
//! `"preferred name"-loc-locpos-"matched text"-pos-negation` tuples, optionally
//! wrapped in `[...]`. Older MetaMapLite releases leave the first preferred name
//! unquoted, which is normalised before matching.

use crate::constants::LOCATION_KIND_PREFIXES;
use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;
use tracing::warn;

/// One decoded trigger: the textual form of a single mention
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTriggerTuple {
    pub preferred_name: String,
    pub location_kind: String,
    pub location_position: usize,
    pub matched_text: String,
    pub part_of_speech: String,
    pub negated: bool,
}

// A quote inside a quoted span is only a terminator when followed by `-`.
static TRIGGER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)"(?P<name>(?:[^"]|"[^-])*)"-(?P<loc>text|tx|ti|ab)-(?P<locpos>\d+)-"(?P<text>(?:[^"]|"[^-])*)"-(?P<pos>[^",\-]*)-(?P<neg>[01])\s*(?:,|\z)"#,
    )
    .expect("trigger info pattern is valid")
});

/// Quote the leading preferred name if the cell uses the unquoted form
fn normalize_quoting(cell: &str) -> Cow<'_, str> {
    if cell.starts_with('"') {
        return Cow::Borrowed(cell);
    }
    let separator = cell.match_indices('-').map(|(idx, _)| idx).find(|&idx| {
        LOCATION_KIND_PREFIXES
            .iter()
            .any(|prefix| cell[idx + 1..].starts_with(prefix))
    });
    match separator {
        Some(idx) if !cell[..idx].contains('"') => {
            Cow::Owned(format!("\"{}\"{}", &cell[..idx], &cell[idx..]))
        }
        _ => Cow::Borrowed(cell),
    }
}

/// Remove one pair of enclosing brackets
fn strip_brackets(cell: &str) -> &str {
    cell.strip_prefix('[')
        .and_then(|inner| inner.strip_suffix(']'))
        .unwrap_or(cell)
}

/// Decode a trigger-info cell into tuples, in order of occurrence.
///
/// Text between matches that is not part of any tuple is reported as a warning
/// and otherwise ignored.
pub fn decode_trigger_info(
    cell: &str,
    file_name: &str,
    line_number: usize,
) -> Vec<RawTriggerTuple> {
    let cell = normalize_quoting(strip_brackets(cell.trim()));
    let mut triggers = Vec::new();
    let mut last_end = 0;

    for captures in TRIGGER_PATTERN.captures_iter(&cell) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        report_residue(&cell[last_end..whole.start()], file_name, line_number);
        last_end = whole.end();

        let Ok(location_position) = captures["locpos"].parse::<usize>() else {
            warn!(
                file = %file_name,
                line = line_number,
                stage = "trigger info",
                "Location position out of range: {}",
                &captures["locpos"]
            );
            continue;
        };
        triggers.push(RawTriggerTuple {
            preferred_name: captures["name"].to_string(),
            location_kind: captures["loc"].to_string(),
            location_position,
            matched_text: captures["text"].to_string(),
            part_of_speech: captures["pos"].to_string(),
            negated: &captures["neg"] == "1",
        });
    }
    report_residue(&cell[last_end..], file_name, line_number);
    triggers
}

fn report_residue(residue: &str, file_name: &str, line_number: usize) {
    let residue = residue.trim_matches(|c: char| c.is_whitespace() || c == ',');
    if !residue.is_empty() {
        warn!(
            file = %file_name,
            line = line_number,
            stage = "trigger info",
            "Possible unparsed content: {}",
            residue
        );
    }
}
