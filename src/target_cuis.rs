//! Target CUI filtering and remapping.
//!
//! A [`TargetCuiIndex`] is built once per run from a two-column file
//! (`source_cui[,target_cui]`) and consulted for every candidate mention. One
//! source CUI may map to several targets, in which case the mention fans out
//! into one output record per target.

use crate::error::{ExtractError, Result};
use std::collections::{BTreeMap, BTreeSet, btree_set};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::iter;
use std::path::Path;
use tracing::{info, warn};

/// Filter/rename table from source CUI to one or more output CUIs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TargetCuiIndex {
    /// Every CUI passes through unchanged
    #[default]
    Unrestricted,
    /// Only registered source CUIs pass, renamed to their targets
    Restricted(BTreeMap<String, BTreeSet<String>>),
}

impl TargetCuiIndex {
    /// An index that keeps nothing until mappings are added
    pub fn restricted() -> Self {
        TargetCuiIndex::Restricted(BTreeMap::new())
    }

    /// Register a mapping; without a target the CUI maps to itself
    pub fn add(&mut self, source_cui: &str, target_cui: Option<&str>) {
        let target = target_cui
            .filter(|t| !t.is_empty())
            .unwrap_or(source_cui)
            .to_string();
        if let TargetCuiIndex::Unrestricted = self {
            *self = TargetCuiIndex::restricted();
        }
        if let TargetCuiIndex::Restricted(map) = self {
            map.entry(source_cui.to_string()).or_default().insert(target);
        }
    }

    pub fn is_restricted(&self) -> bool {
        matches!(self, TargetCuiIndex::Restricted(_))
    }

    /// True if mentions of `cui` survive filtering
    pub fn contains(&self, cui: &str) -> bool {
        match self {
            TargetCuiIndex::Unrestricted => true,
            TargetCuiIndex::Restricted(map) => map.contains_key(cui),
        }
    }

    /// Output CUIs for a source CUI, in sorted order.
    ///
    /// Unrestricted: the CUI itself. Restricted: each registered target, or
    /// nothing if the CUI is not a key. An empty CUI never resolves.
    pub fn resolve<'a>(&'a self, source_cui: &'a str) -> Resolved<'a> {
        if source_cui.is_empty() {
            return Resolved::Empty;
        }
        match self {
            TargetCuiIndex::Unrestricted => Resolved::PassThrough(iter::once(source_cui)),
            TargetCuiIndex::Restricted(map) => match map.get(source_cui) {
                Some(targets) => Resolved::Mapped(targets.iter()),
                None => Resolved::Empty,
            },
        }
    }

    /// Number of registered source CUIs
    pub fn n_keys(&self) -> usize {
        match self {
            TargetCuiIndex::Unrestricted => 0,
            TargetCuiIndex::Restricted(map) => map.len(),
        }
    }

    /// Unique output CUIs across every mapping
    pub fn values(&self) -> BTreeSet<&str> {
        match self {
            TargetCuiIndex::Unrestricted => BTreeSet::new(),
            TargetCuiIndex::Restricted(map) => map
                .values()
                .flat_map(|targets| targets.iter().map(String::as_str))
                .collect(),
        }
    }

    /// Load from a CUI file: one `source_cui[,target_cui]` per line.
    ///
    /// Blank lines and lines starting with `#` are ignored. The result is always
    /// restricted, even if the file holds no mappings.
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let index = Self::from_reader(BufReader::new(file), path)?;
        if index.n_keys() == 0 {
            warn!(
                "CUI file {} contains no mappings; every mention will be filtered out",
                path.display()
            );
        }
        info!(
            "Keeping {} CUIs, and mapping to {}.",
            index.n_keys(),
            index.values().len()
        );
        Ok(index)
    }

    /// Parse mappings from any buffered reader; `path` is used in diagnostics
    pub fn from_reader(reader: impl BufRead, path: &Path) -> Result<Self> {
        let mut index = TargetCuiIndex::restricted();
        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim().trim_start_matches('\u{feff}');
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut columns = line.split(',').map(str::trim);
            let source = columns.next().unwrap_or_default();
            let target = columns.next();
            if columns.next().is_some() {
                return Err(ExtractError::InvalidCuiFile {
                    path: path.to_path_buf(),
                    line: line_num + 1,
                    reason: format!("expected `source_cui[,target_cui]`, found: {}", line),
                });
            }
            if source.is_empty() {
                return Err(ExtractError::InvalidCuiFile {
                    path: path.to_path_buf(),
                    line: line_num + 1,
                    reason: "empty source CUI".to_string(),
                });
            }
            index.add(source, target);
        }
        Ok(index)
    }
}

/// Iterator over the output CUIs resolved for one source CUI
#[derive(Debug, Clone)]
pub enum Resolved<'a> {
    PassThrough(iter::Once<&'a str>),
    Mapped(btree_set::Iter<'a, String>),
    Empty,
}

impl<'a> Iterator for Resolved<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Resolved::PassThrough(once) => once.next(),
            Resolved::Mapped(targets) => targets.next().map(String::as_str),
            Resolved::Empty => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tempfile::NamedTempFile;

    #[test]
    fn test_unrestricted_passes_through() {
        let index = TargetCuiIndex::default();
        assert!(index.contains("C0008031"));
        assert_eq!(index.resolve("C0008031").collect::<Vec<_>>(), vec!["C0008031"]);
        assert_eq!(index.resolve("").count(), 0);
    }

    #[test]
    fn test_restricted_filters_and_self_maps() {
        let mut index = TargetCuiIndex::default();
        index.add("C0008031", None);
        assert!(index.is_restricted());
        assert!(index.contains("C0008031"));
        assert!(!index.contains("C0035647"));
        assert_eq!(index.resolve("C0008031").collect::<Vec<_>>(), vec!["C0008031"]);
        assert_eq!(index.resolve("C0035647").count(), 0);
    }

    #[test]
    fn test_one_to_many_mapping() {
        let mut index = TargetCuiIndex::default();
        index.add("C4552740", Some("C4552740"));
        index.add("C4552740", Some("C0424755"));
        assert_eq!(
            index.resolve("C4552740").collect::<Vec<_>>(),
            vec!["C0424755", "C4552740"]
        );
        assert_eq!(index.n_keys(), 1);
        assert_eq!(index.values().len(), 2);
    }

    #[test]
    fn test_empty_restricted_index_keeps_nothing() {
        let index = TargetCuiIndex::restricted();
        assert!(!index.contains("C0008031"));
        assert_eq!(index.resolve("C0008031").count(), 0);
    }

    #[test]
    fn test_from_reader() {
        let data = "C0008031\n\n# comment\nC4552740,C0424755\nC4552740, C4552740 \n";
        let index = TargetCuiIndex::from_reader(Cursor::new(data), Path::new("cuis.txt")).unwrap();
        assert_eq!(index.n_keys(), 2);
        assert_eq!(index.resolve("C4552740").count(), 2);
        assert_eq!(index.resolve("C0008031").collect::<Vec<_>>(), vec!["C0008031"]);
    }

    #[test]
    fn test_from_reader_rejects_extra_columns() {
        let data = "C0008031,C0000001,C0000002\n";
        let err = TargetCuiIndex::from_reader(Cursor::new(data), Path::new("cuis.txt")).unwrap_err();
        assert!(matches!(err, ExtractError::InvalidCuiFile { line: 1, .. }));
    }

    #[test]
    fn test_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "C0008031,C0008031").unwrap();
        writeln!(temp_file, "C0035647").unwrap();
        let index = TargetCuiIndex::from_file(temp_file.path()).unwrap();
        assert_eq!(index.n_keys(), 2);
    }
}
