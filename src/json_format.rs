//! MetaMapLite JSON output format.
//!
//! The document is an array of sentence/phrase objects, each holding an
//! `evlist` of events with a nested `conceptinfo`. Negation is recorded on the
//! enclosing sentence, not on the event.

use crate::error::{ExtractError, Result};
use crate::models::{ConceptMention, Extras, document_stem};
use crate::target_cuis::TargetCuiIndex;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct Sentence {
    #[serde(default)]
    evlist: Vec<Event>,
    #[serde(default)]
    negated: Option<NegationFlag>,
}

/// Negation markers seen in the wild: booleans, 0/1, and their string forms
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NegationFlag {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl NegationFlag {
    fn is_negated(&self) -> bool {
        match self {
            NegationFlag::Bool(flag) => *flag,
            NegationFlag::Int(value) => *value != 0,
            NegationFlag::Text(text) => {
                matches!(text.trim().to_ascii_lowercase().as_str(), "1" | "true")
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct Event {
    #[serde(default)]
    id: Option<Value>,
    start: usize,
    length: usize,
    #[serde(default)]
    matchedtext: String,
    conceptinfo: ConceptInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConceptInfo {
    cui: String,
    conceptstring: String,
    preferredname: String,
    semantictypes: Vec<String>,
    sources: Vec<String>,
}

fn event_identifier(id: Option<Value>) -> Option<String> {
    match id? {
        Value::Null => None,
        Value::String(id) => Some(id),
        other => Some(other.to_string()),
    }
}

/// Mentions for one event, before sequence numbers are assigned
fn event_mentions(
    event: Event,
    negated: bool,
    doc_id: &str,
    targets: &TargetCuiIndex,
    extras: &Extras,
) -> Vec<ConceptMention> {
    let info = event.conceptinfo;
    if info.cui.is_empty() || !targets.contains(&info.cui) {
        return Vec::new();
    }

    let mut mention = ConceptMention::new(doc_id, extras);
    mention.evid = event_identifier(event.id);
    mention.matched_text = event.matchedtext;
    mention.concept_string = info.conceptstring;
    mention.preferred_name = info.preferredname;
    mention.set_span(event.start, event.length);
    mention.negated = negated;
    for semantic_type in &info.semantictypes {
        mention.add_semantic_type(semantic_type);
    }
    for source in &info.sources {
        mention.add_source(source);
    }

    targets
        .resolve(&info.cui)
        .map(|target| mention.with_cui(target))
        .collect()
}

/// Parse one JSON output document into a lazy sequence of mentions.
///
/// The document is decoded up front, so invalid JSON fails before any mention
/// is produced. Event ids count emitted mentions, not source events.
pub fn parse_json<'a>(
    text: &str,
    file_name: &str,
    targets: &'a TargetCuiIndex,
    extras: &'a Extras,
) -> Result<impl Iterator<Item = ConceptMention> + use<'a>> {
    let sentences: Vec<Sentence> =
        serde_json::from_str(text).map_err(|source| ExtractError::Json {
            file: file_name.to_string(),
            source,
        })?;
    let doc_id = document_stem(file_name);
    let prefix = doc_id.clone();

    Ok(sentences
        .into_iter()
        .flat_map(|sentence| {
            let negated = sentence
                .negated
                .as_ref()
                .is_some_and(NegationFlag::is_negated);
            sentence.evlist.into_iter().map(move |event| (event, negated))
        })
        .flat_map(move |(event, negated)| event_mentions(event, negated, &doc_id, targets, extras))
        .enumerate()
        .map(move |(n, mut mention)| {
            mention.event_id = format!("{}_{}", prefix, n);
            mention
        }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEVER: &str = r#"[
        {"phrase": "No fever", "negated": true, "evlist": [
            {"id": "ev0", "start": 3, "length": 5, "matchedtext": "fever",
             "conceptinfo": {"cui": "C0015967", "conceptstring": "Fever",
                             "preferredname": "Fever", "semantictypes": ["sosy"],
                             "sources": ["MSH", "SNOMEDCT_US"]}}
        ]},
        {"phrase": "Chest pain", "evlist": [
            {"id": 7, "start": 10, "length": 10, "matchedtext": "Chest pain",
             "conceptinfo": {"cui": "C0008031", "conceptstring": "Chest Pain",
                             "preferredname": "Chest Pain", "semantictypes": ["sosy", "fndg"],
                             "sources": ["MSH"]}}
        ]}
    ]"#;

    fn parse(text: &str, targets: &TargetCuiIndex) -> Result<Vec<ConceptMention>> {
        let extras = Extras::new();
        Ok(parse_json(text, "0002.json", targets, &extras)?.collect())
    }

    #[test]
    fn test_parse_events() {
        let mentions = parse(FEVER, &TargetCuiIndex::default()).unwrap();
        assert_eq!(mentions.len(), 2);

        let fever = &mentions[0];
        assert_eq!(fever.event_id, "0002_0");
        assert_eq!(fever.doc_id, "0002");
        assert_eq!(fever.evid.as_deref(), Some("ev0"));
        assert!(fever.negated);
        assert_eq!((fever.start, fever.length, fever.end), (3, 5, 8));
        assert_eq!(fever.source_vocabulary, "MSH");
        assert_eq!(fever.all_source_vocabularies, vec!["MSH", "SNOMEDCT_US"]);
        assert!(fever.has_flag("SNOMEDCT_US") && fever.has_flag("sosy"));

        let chest = &mentions[1];
        assert!(!chest.negated);
        assert_eq!(chest.evid.as_deref(), Some("7"));
        assert_eq!(chest.semantic_type, "sosy");
        assert_eq!(chest.all_semantic_types, vec!["sosy", "fndg"]);
    }

    #[test]
    fn test_one_to_many_fan_out() {
        let doc = r#"[{"evlist": [{"id": "a", "start": 0, "length": 4, "matchedtext": "SOB",
            "conceptinfo": {"cui": "C4552740", "semantictypes": ["fndg"], "sources": ["MTH"]}}]}]"#;
        let mut targets = TargetCuiIndex::default();
        targets.add("C4552740", Some("C4552740"));
        targets.add("C4552740", Some("C0424755"));

        let mentions = parse(doc, &targets).unwrap();
        assert_eq!(mentions.len(), 2);
        assert_eq!(
            mentions.iter().map(|m| m.cui.as_str()).collect::<Vec<_>>(),
            vec!["C0424755", "C4552740"]
        );
        assert_eq!(mentions[0].event_id, "0002_0");
        assert_eq!(mentions[1].event_id, "0002_1");
        assert_eq!(mentions[0].matched_text, mentions[1].matched_text);
        assert_eq!(mentions[0].fields().len(), mentions[1].fields().len());
    }

    #[test]
    fn test_filtered_events_do_not_consume_event_ids() {
        let mut targets = TargetCuiIndex::default();
        targets.add("C0008031", None);
        let mentions = parse(FEVER, &targets).unwrap();
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].event_id, "0002_0");
    }

    #[test]
    fn test_negation_flag_forms() {
        let doc = r#"[
            {"negated": 1, "evlist": [{"start": 0, "length": 1, "conceptinfo": {"cui": "C1"}}]},
            {"negated": "0", "evlist": [{"start": 0, "length": 1, "conceptinfo": {"cui": "C1"}}]},
            {"evlist": [{"start": 0, "length": 1, "conceptinfo": {"cui": "C1"}}]}
        ]"#;
        let mentions = parse(doc, &TargetCuiIndex::default()).unwrap();
        assert_eq!(
            mentions.iter().map(|m| m.negated).collect::<Vec<_>>(),
            vec![true, false, false]
        );
        assert!(mentions.iter().all(|m| m.evid.is_none()));
    }

    #[test]
    fn test_invalid_json_is_document_error() {
        let err = parse("[{\"evlist\": [", &TargetCuiIndex::default()).unwrap_err();
        assert!(err.is_document_error());
        assert!(matches!(err, ExtractError::Json { ref file, .. } if file == "0002.json"));
    }
}
