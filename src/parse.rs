//! Format dispatch: one entry point for every annotator output format.

use crate::error::Result;
use crate::json_format::parse_json;
use crate::mmi::parse_mmi;
use crate::models::{ConceptMention, Extras, OutputFormat};
use crate::target_cuis::TargetCuiIndex;
use crate::xmi::parse_xmi;
use std::path::Path;

/// Boxed lazy sequence of mentions from any format
pub type Mentions<'a> = Box<dyn Iterator<Item = ConceptMention> + Send + 'a>;

/// Parse one annotator output document in the given format.
///
/// Whitespace-only input yields no mentions. Structural failures of a JSON or
/// XMI document are returned before any mention is produced; malformed MMI
/// records are logged and skipped while iterating.
pub fn parse_document<'a>(
    format: OutputFormat,
    text: &'a str,
    file_name: &str,
    targets: &'a TargetCuiIndex,
    extras: &'a Extras,
) -> Result<Mentions<'a>> {
    if text.trim().is_empty() {
        return Ok(Box::new(std::iter::empty()));
    }
    Ok(match format {
        OutputFormat::Mmi => Box::new(parse_mmi(text, file_name, targets, extras)),
        OutputFormat::Json => Box::new(parse_json(text, file_name, targets, extras)?),
        OutputFormat::Xmi => Box::new(parse_xmi(text, file_name, targets, extras)?),
    })
}

/// Like [`parse_document`], with the format given by name
pub fn parse_document_named<'a>(
    format: &str,
    text: &'a str,
    file_name: &str,
    targets: &'a TargetCuiIndex,
    extras: &'a Extras,
) -> Result<Mentions<'a>> {
    let format: OutputFormat = format.parse()?;
    parse_document(format, text, file_name, targets, extras)
}

/// Read an annotator output file, replacing invalid UTF-8 sequences
pub fn read_extract_file(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractError;

    #[test]
    fn test_unknown_format_fails_before_parsing() {
        let targets = TargetCuiIndex::default();
        let extras = Extras::new();
        let result = parse_document_named("csv", "not parsed", "a.csv", &targets, &extras);
        assert!(matches!(result, Err(ExtractError::UnknownFormat { .. })));
    }

    #[test]
    fn test_blank_document_yields_nothing() {
        let targets = TargetCuiIndex::default();
        let extras = Extras::new();
        for format in [OutputFormat::Mmi, OutputFormat::Json, OutputFormat::Xmi] {
            let mentions = parse_document(format, " \n\t", "a", &targets, &extras).unwrap();
            assert_eq!(mentions.count(), 0);
        }
    }

    #[test]
    fn test_dispatches_by_format() {
        let targets = TargetCuiIndex::default();
        let extras = Extras::new();
        let json = r#"[{"evlist": [{"start": 0, "length": 5, "matchedtext": "fever",
            "conceptinfo": {"cui": "C0015967", "semantictypes": ["sosy"]}}]}]"#;
        let mentions: Vec<_> = parse_document_named("json", json, "n.json", &targets, &extras)
            .unwrap()
            .collect();
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].cui, "C0015967");
    }

    #[test]
    fn test_read_extract_file_is_lossy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.mmi");
        std::fs::write(&path, b"caf\xe9").unwrap();
        assert_eq!(read_extract_file(&path).unwrap(), "caf\u{fffd}");
    }
}
