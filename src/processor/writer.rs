//! Tabular output of mentions and note statistics
//!
//! Mention records have a per-input set of keys (one presence flag per semantic
//! type and source vocabulary), so the batch schema is the union of every
//! file's keys. Each file becomes its own frame and the frames are combined
//! with a diagonal concat; presence flags absent from a file are filled with 0.

use super::streaming::FileOutcome;
use crate::constants::{LEADING_COLUMNS, NOTE_COLUMNS};
use crate::error::Result;
use crate::models::{FieldValue, NoteRecord};

use polars::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Storage type chosen for one output column across the batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Empty,
    Text,
    Integer,
    Float,
    Flag,
}

impl ColumnKind {
    fn of(value: &FieldValue) -> Self {
        match value {
            FieldValue::Text(_) => ColumnKind::Text,
            FieldValue::Integer(_) => ColumnKind::Integer,
            FieldValue::Float(_) => ColumnKind::Float,
            FieldValue::Flag(_) => ColumnKind::Flag,
            FieldValue::Missing => ColumnKind::Empty,
        }
    }

    fn merge(self, other: ColumnKind) -> ColumnKind {
        use ColumnKind::*;
        match (self, other) {
            (Empty, kind) | (kind, Empty) => kind,
            (a, b) if a == b => a,
            (Integer, Float) | (Float, Integer) => Float,
            _ => Text,
        }
    }
}

fn text_of(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Text(text) => Some(text.clone()),
        FieldValue::Integer(n) => Some(n.to_string()),
        FieldValue::Float(x) => Some(x.to_string()),
        FieldValue::Flag(flag) => Some(if *flag { "1" } else { "0" }.to_string()),
        FieldValue::Missing => None,
    }
}

fn build_column(name: &str, kind: ColumnKind, values: &[Option<&FieldValue>]) -> Column {
    let name = PlSmallStr::from(name);
    match kind {
        ColumnKind::Integer => Column::new(
            name,
            values
                .iter()
                .map(|v| match v {
                    Some(FieldValue::Integer(n)) => Some(*n),
                    _ => None,
                })
                .collect::<Vec<Option<i64>>>(),
        ),
        ColumnKind::Float => Column::new(
            name,
            values
                .iter()
                .map(|v| match v {
                    Some(FieldValue::Integer(n)) => Some(*n as f64),
                    Some(FieldValue::Float(x)) => Some(*x),
                    _ => None,
                })
                .collect::<Vec<Option<f64>>>(),
        ),
        ColumnKind::Flag => Column::new(
            name,
            values
                .iter()
                .map(|v| match v {
                    Some(FieldValue::Flag(flag)) => Some(i32::from(*flag)),
                    _ => None,
                })
                .collect::<Vec<Option<i32>>>(),
        ),
        ColumnKind::Text | ColumnKind::Empty => Column::new(
            name,
            values
                .iter()
                .map(|v| v.and_then(text_of))
                .collect::<Vec<Option<String>>>(),
        ),
    }
}

/// Header-only mention table
fn empty_mentions_frame() -> Result<DataFrame> {
    let columns = LEADING_COLUMNS
        .iter()
        .map(|name| Column::new(PlSmallStr::from(*name), Vec::<Option<String>>::new()))
        .collect();
    Ok(DataFrame::new(columns)?)
}

/// Build the mention table for a batch: leading columns first, then every
/// other key in sorted order.
pub fn mentions_frame(outcomes: &[FileOutcome]) -> Result<DataFrame> {
    let rows_per_file: Vec<Vec<BTreeMap<String, FieldValue>>> = outcomes
        .iter()
        .map(|outcome| outcome.mentions.iter().map(|m| m.fields()).collect())
        .collect();

    let mut kinds: BTreeMap<String, ColumnKind> = LEADING_COLUMNS
        .iter()
        .map(|name| (name.to_string(), ColumnKind::Empty))
        .collect();
    for row in rows_per_file.iter().flatten() {
        for (key, value) in row {
            let kind = kinds.entry(key.clone()).or_insert(ColumnKind::Empty);
            *kind = kind.merge(ColumnKind::of(value));
        }
    }
    let presence: BTreeSet<&str> = outcomes
        .iter()
        .flat_map(|outcome| &outcome.mentions)
        .flat_map(|mention| mention.presence.iter().map(String::as_str))
        .filter(|key| !LEADING_COLUMNS.contains(key))
        .collect();

    let mut frames = Vec::new();
    for rows in rows_per_file.iter().filter(|rows| !rows.is_empty()) {
        let keys: BTreeSet<&str> = rows
            .iter()
            .flat_map(|row| row.keys().map(String::as_str))
            .chain(LEADING_COLUMNS.iter().copied())
            .collect();
        let columns = keys
            .into_iter()
            .map(|key| {
                let values: Vec<Option<&FieldValue>> = rows.iter().map(|row| row.get(key)).collect();
                let kind = kinds.get(key).copied().unwrap_or(ColumnKind::Empty);
                build_column(key, kind, &values)
            })
            .collect();
        frames.push(DataFrame::new(columns)?.lazy());
    }
    if frames.is_empty() {
        return empty_mentions_frame();
    }
    debug!(
        "Combining {} frames into {} columns ({} presence flags)",
        frames.len(),
        kinds.len(),
        presence.len()
    );

    let order: Vec<Expr> = LEADING_COLUMNS
        .iter()
        .copied()
        .chain(
            kinds
                .keys()
                .map(String::as_str)
                .filter(|key| !LEADING_COLUMNS.contains(key)),
        )
        .map(col)
        .collect();
    let fills: Vec<Expr> = presence
        .iter()
        .map(|key| col(*key).fill_null(lit(0)))
        .collect();

    let combined = concat_lf_diagonal(
        frames,
        UnionArgs {
            to_supertypes: true,
            ..Default::default()
        },
    )?;
    let combined = if fills.is_empty() {
        combined
    } else {
        combined.with_columns(fills)
    };
    Ok(combined.select(order).collect()?)
}

/// Build the note statistics table
pub fn notes_frame(notes: &[NoteRecord]) -> Result<DataFrame> {
    let count = |f: fn(&NoteRecord) -> usize| -> Vec<i64> {
        notes.iter().map(|n| f(n) as i64).collect()
    };
    let columns = vec![
        Column::new(
            NOTE_COLUMNS[0].into(),
            notes.iter().map(|n| n.filename.clone()).collect::<Vec<String>>(),
        ),
        Column::new(
            NOTE_COLUMNS[1].into(),
            notes.iter().map(|n| n.doc_id.clone()).collect::<Vec<String>>(),
        ),
        Column::new(NOTE_COLUMNS[2].into(), count(|n| n.num_chars)),
        Column::new(NOTE_COLUMNS[3].into(), count(|n| n.num_letters)),
        Column::new(NOTE_COLUMNS[4].into(), count(|n| n.num_words)),
        Column::new(
            NOTE_COLUMNS[5].into(),
            notes
                .iter()
                .map(|n| i32::from(n.processed))
                .collect::<Vec<i32>>(),
        ),
    ];
    Ok(DataFrame::new(columns)?)
}

fn write_csv(path: &Path, df: &mut DataFrame) -> Result<()> {
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    Ok(())
}

/// Writes the per-run output tables into one directory
#[derive(Debug, Clone)]
pub struct TableWriter {
    output_dir: PathBuf,
    timestamp: String,
}

impl TableWriter {
    /// `timestamp` names this run's files; it is computed once by the caller
    pub fn new(output_dir: PathBuf, timestamp: impl Into<String>) -> Self {
        Self {
            output_dir,
            timestamp: timestamp.into(),
        }
    }

    pub fn mentions_path(&self) -> PathBuf {
        self.output_dir.join(format!("nlp_{}.csv", self.timestamp))
    }

    pub fn notes_path(&self) -> PathBuf {
        self.output_dir.join(format!("notes_{}.csv", self.timestamp))
    }

    /// Write the mention table, returning its path and row count
    pub fn write_mentions(&self, outcomes: &[FileOutcome]) -> Result<(PathBuf, usize)> {
        std::fs::create_dir_all(&self.output_dir)?;
        let mut df = mentions_frame(outcomes)?;
        let path = self.mentions_path();
        write_csv(&path, &mut df)?;
        debug!("Wrote {} mentions to {}", df.height(), path.display());
        Ok((path, df.height()))
    }

    /// Write the note statistics table
    pub fn write_notes(&self, notes: &[NoteRecord]) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;
        let mut df = notes_frame(notes)?;
        let path = self.notes_path();
        write_csv(&path, &mut df)?;
        debug!("Wrote {} notes to {}", df.height(), path.display());
        Ok(path)
    }
}
