//! File discovery for annotator output directories
//!
//! Finds annotator output files by suffix and locates the note text file that
//! each one was produced from.

use crate::config::ExtractConfig;
use crate::error::{ExtractError, Result};
use crate::models::OutputFormat;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File discovery component for annotator output directories
#[derive(Debug, Clone)]
pub struct FileDiscovery {
    extract_suffix: String,
}

impl FileDiscovery {
    pub fn new(extract_suffix: impl Into<String>) -> Self {
        Self {
            extract_suffix: extract_suffix.into(),
        }
    }

    pub fn from_config(config: &ExtractConfig) -> Self {
        Self::new(config.extract_suffix())
    }

    /// Annotator output files directly inside `directory`, sorted by path
    pub async fn discover_extract_files(&self, directory: &Path) -> Result<Vec<PathBuf>> {
        if !tokio::fs::metadata(directory)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            return Err(ExtractError::DirectoryNotFound {
                path: directory.to_path_buf(),
            });
        }

        let pattern = format!(
            "{}/*{}",
            glob::Pattern::escape(&directory.to_string_lossy()),
            glob::Pattern::escape(&self.extract_suffix)
        );
        debug!("Searching for annotator output: {}", pattern);

        let mut files: Vec<PathBuf> = glob::glob(&pattern)
            .map_err(|e| ExtractError::configuration(format!("invalid file pattern: {}", e)))?
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!("Unreadable directory entry: {}", e);
                    None
                }
            })
            .filter(|path| path.is_file())
            .collect();
        files.sort();

        debug!("Found {} files in {}", files.len(), directory.display());
        Ok(files)
    }
}

/// Note file name expected for an annotator output file name
fn expected_note_name(file_name: &str, config: &ExtractConfig) -> String {
    if let Some(suffix) = &config.extract_suffix {
        return format!(
            "{}{}",
            file_name.strip_suffix(suffix.as_str()).unwrap_or(file_name),
            config.note_suffix
        );
    }
    let extension = format!(".{}", config.output_format.extension());
    let stem = file_name.strip_suffix(&extension).unwrap_or(file_name);
    match config.output_format {
        // cTAKES keeps the note's own suffix: `note.txt.xmi`
        OutputFormat::Xmi => stem.to_string(),
        _ => format!("{}{}", stem, config.note_suffix),
    }
}

/// Look for `name` in the note directories, preferring the one at `dir_index`
fn find_in_directories(
    name: &str,
    extract_dir: &Path,
    note_directories: &[PathBuf],
    dir_index: usize,
) -> Option<PathBuf> {
    if note_directories.is_empty() {
        let path = extract_dir.join(name);
        return path.is_file().then_some(path);
    }
    let preferred = note_directories.get(dir_index).into_iter();
    let others = note_directories
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != dir_index)
        .map(|(_, dir)| dir);
    preferred
        .chain(others)
        .map(|dir| dir.join(name))
        .find(|path| path.is_file())
}

/// Locate the note text for an annotator output file.
///
/// Tries the expected name (output suffix swapped for the note suffix), then
/// the same name with every suffix stripped. `dir_index` is the position of
/// the output file's directory among the input directories; the note directory
/// at the same position is searched first.
pub fn find_note_file(
    extract_path: &Path,
    dir_index: usize,
    config: &ExtractConfig,
) -> Result<Option<PathBuf>> {
    let file_name = extract_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extract_dir = extract_path.parent().unwrap_or_else(|| Path::new("."));
    let note_dirs = &config.note_directories;

    let expected = expected_note_name(&file_name, config);
    if let Some(path) = find_in_directories(&expected, extract_dir, note_dirs, dir_index) {
        return Ok(Some(path));
    }

    let bare = format!(
        "{}{}",
        expected.split('.').next().unwrap_or_default(),
        config.note_suffix
    );
    if bare != expected {
        debug!("Failed to find note file {}; trying {}", expected, bare);
        if let Some(path) = find_in_directories(&bare, extract_dir, note_dirs, dir_index) {
            return Ok(Some(path));
        }
    }

    if config.skip_missing {
        warn!(
            "Failed to find note file for {}: tried {} and {}",
            extract_path.display(),
            expected,
            bare
        );
        Ok(None)
    } else {
        Err(ExtractError::MissingNote {
            path: extract_path.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_discover_by_suffix() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.json"), "[]").unwrap();
        fs::write(dir.path().join("a.json"), "[]").unwrap();
        fs::write(dir.path().join("a.txt"), "note").unwrap();

        let files = FileDiscovery::new(".json")
            .discover_extract_files(dir.path())
            .await
            .unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.json", "b.json"]);
    }

    #[tokio::test]
    async fn test_missing_directory() {
        let result = FileDiscovery::new(".json")
            .discover_extract_files(Path::new("/definitely/not/here"))
            .await;
        assert!(matches!(result, Err(ExtractError::DirectoryNotFound { .. })));
    }

    #[test]
    fn test_expected_note_names() {
        let json = ExtractConfig::default();
        assert_eq!(expected_note_name("0001.json", &json), "0001.txt");

        let xmi = ExtractConfig::default().with_output_format(OutputFormat::Xmi);
        assert_eq!(expected_note_name("0001.txt.xmi", &xmi), "0001.txt");

        let custom = ExtractConfig::default()
            .with_output_format(OutputFormat::Mmi)
            .with_extract_suffix(".out.mmi")
            .with_note_suffix("");
        assert_eq!(expected_note_name("0001.out.mmi", &custom), "0001");
    }

    #[test]
    fn test_note_next_to_extract_file() {
        let dir = TempDir::new().unwrap();
        let extract = dir.path().join("0001.json");
        fs::write(&extract, "[]").unwrap();
        fs::write(dir.path().join("0001.txt"), "note").unwrap();

        let note = find_note_file(&extract, 0, &ExtractConfig::default()).unwrap();
        assert_eq!(note, Some(dir.path().join("0001.txt")));
    }

    #[test]
    fn test_note_directory_with_same_index_is_preferred() {
        let out = TempDir::new().unwrap();
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        let extract = out.path().join("0001.json");
        fs::write(&extract, "[]").unwrap();
        fs::write(first.path().join("0001.txt"), "first").unwrap();
        fs::write(second.path().join("0001.txt"), "second").unwrap();

        let config = ExtractConfig::default()
            .with_note_directories(vec![first.path().to_path_buf(), second.path().to_path_buf()]);
        let note = find_note_file(&extract, 1, &config).unwrap();
        assert_eq!(note, Some(second.path().join("0001.txt")));
        let note = find_note_file(&extract, 5, &config).unwrap();
        assert_eq!(note, Some(first.path().join("0001.txt")));
    }

    #[test]
    fn test_falls_back_to_bare_stem() {
        let dir = TempDir::new().unwrap();
        let extract = dir.path().join("0001.out.json");
        fs::write(&extract, "[]").unwrap();
        fs::write(dir.path().join("0001.txt"), "note").unwrap();

        let note = find_note_file(&extract, 0, &ExtractConfig::default()).unwrap();
        assert_eq!(note, Some(dir.path().join("0001.txt")));
    }

    #[test]
    fn test_missing_note() {
        let dir = TempDir::new().unwrap();
        let extract = dir.path().join("0001.json");
        fs::write(&extract, "[]").unwrap();

        let err = find_note_file(&extract, 0, &ExtractConfig::default()).unwrap_err();
        assert!(matches!(err, ExtractError::MissingNote { .. }));

        let config = ExtractConfig::default().with_skip_missing();
        assert_eq!(find_note_file(&extract, 0, &config).unwrap(), None);
    }
}
