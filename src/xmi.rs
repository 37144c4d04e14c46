//! cTAKES XMI output format.
//!
//! Mentions are split across two element families joined by a reference id:
//! `textsem` mention spans list the ids of their groundings in
//! `ontologyConceptArr`, and each `refsem` grounding carries the CUI and coding
//! scheme under its `xmi:id`. The `syntax` dependency tokens are used only to
//! rebuild enough of the note text to fill `matchedtext` and `pos`.

use crate::constants::semantic_type_for_tui;
use crate::error::{ExtractError, Result};
use crate::models::{ConceptMention, Extras, FieldValue, document_stem};
use crate::target_cuis::TargetCuiIndex;
use quick_xml::NsReader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use std::collections::HashMap;
use tracing::{debug, warn};

const TEXTSEM_NAMESPACE: &str = "textsem.ecore";
const REFSEM_NAMESPACE: &str = "refsem.ecore";
const SYNTAX_NAMESPACE: &str = "syntax.ecore";
const TOKEN_ELEMENT: &str = "ConllDependencyNode";
const CONCEPT_ARRAY: &str = "ontologyConceptArr";
const XMI_ID: &str = "xmi:id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    TextSem,
    RefSem,
    Syntax,
}

impl Family {
    fn from_namespace(uri: &[u8]) -> Option<Self> {
        let uri = String::from_utf8_lossy(uri);
        if uri.contains(TEXTSEM_NAMESPACE) {
            Some(Family::TextSem)
        } else if uri.contains(REFSEM_NAMESPACE) {
            Some(Family::RefSem)
        } else if uri.contains(SYNTAX_NAMESPACE) {
            Some(Family::Syntax)
        } else {
            None
        }
    }
}

#[derive(Debug)]
struct Element {
    family: Family,
    local_name: String,
    attrs: HashMap<String, String>,
}

impl Element {
    fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }
}

/// Collect every element of the three families, in document order
fn read_elements(text: &str, file_name: &str) -> Result<Vec<Element>> {
    let mut reader = NsReader::from_str(text);
    let mut elements = Vec::new();
    let mut saw_element = false;

    loop {
        let (family, event) = match reader.read_resolved_event() {
            Ok((ResolveResult::Bound(Namespace(uri)), event)) => {
                (Family::from_namespace(uri), event)
            }
            Ok((_, event)) => (None, event),
            Err(e) => return Err(ExtractError::xml(file_name, e.to_string())),
        };
        match event {
            Event::Start(start) | Event::Empty(start) => {
                saw_element = true;
                if let Some(family) = family {
                    elements.push(Element {
                        family,
                        local_name: String::from_utf8_lossy(start.local_name().as_ref())
                            .into_owned(),
                        attrs: read_attributes(&start, file_name)?,
                    });
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_element {
        return Err(ExtractError::xml(file_name, "no XML elements found"));
    }
    Ok(elements)
}

fn read_attributes(start: &BytesStart<'_>, file_name: &str) -> Result<HashMap<String, String>> {
    let mut attrs = HashMap::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| ExtractError::xml(file_name, e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| ExtractError::xml(file_name, e.to_string()))?;
        attrs.insert(key, value.into_owned());
    }
    Ok(attrs)
}

/// Approximate note text rebuilt from dependency tokens, plus POS by start offset
#[derive(Debug, Default)]
struct TokenText {
    chars: Vec<char>,
    postags: HashMap<usize, String>,
}

impl TokenText {
    fn build(elements: &[Element]) -> Self {
        let mut tokens: Vec<(usize, &str, Option<&str>)> = elements
            .iter()
            .filter(|el| el.family == Family::Syntax && el.local_name == TOKEN_ELEMENT)
            .filter(|el| el.attr("id") != Some("0"))
            .filter_map(|el| {
                let begin: usize = el.attr("begin")?.parse().ok()?;
                Some((begin.saturating_sub(1), el.attr("form")?, el.attr("postag")))
            })
            .collect();
        tokens.sort_by_key(|(start, _, _)| *start);

        let mut text = TokenText::default();
        for (start, form, postag) in tokens {
            if let Some(postag) = postag {
                text.postags.insert(start, postag.to_string());
            }
            if text.chars.len() > start {
                continue;
            }
            text.chars.resize(start, ' ');
            text.chars.extend(form.chars());
        }
        text
    }

    fn slice(&self, start: usize, end: usize) -> String {
        let end = end.min(self.chars.len());
        self.chars
            .get(start..end)
            .map(|chars| chars.iter().collect())
            .unwrap_or_default()
    }
}

/// A mention assembled from its span and grounding elements
#[derive(Debug)]
struct Partial {
    ref_id: String,
    mention: ConceptMention,
    has_span: bool,
}

/// Partial mentions keyed by reference id, kept in first-seen order
struct Accumulator<'a> {
    doc_id: &'a str,
    extras: &'a Extras,
    index: HashMap<String, usize>,
    partials: Vec<Partial>,
}

impl<'a> Accumulator<'a> {
    fn new(doc_id: &'a str, extras: &'a Extras) -> Self {
        Self {
            doc_id,
            extras,
            index: HashMap::new(),
            partials: Vec::new(),
        }
    }

    fn entry(&mut self, ref_id: &str) -> &mut Partial {
        let idx = match self.index.get(ref_id) {
            Some(&idx) => idx,
            None => {
                self.partials.push(Partial {
                    ref_id: ref_id.to_string(),
                    mention: ConceptMention::new(self.doc_id, self.extras),
                    has_span: false,
                });
                self.index.insert(ref_id.to_string(), self.partials.len() - 1);
                self.partials.len() - 1
            }
        };
        &mut self.partials[idx]
    }
}

fn float_attribute(element: &Element, key: &str, file_name: &str) -> FieldValue {
    match element.attr(key) {
        None => FieldValue::Missing,
        Some(raw) => match raw.trim().parse::<f64>() {
            Ok(value) => FieldValue::Float(value),
            Err(_) => {
                warn!(
                    file = %file_name,
                    stage = "xmi mention",
                    "Attribute {} is not a number: {}",
                    key,
                    raw
                );
                FieldValue::Missing
            }
        },
    }
}

fn flag_attribute(element: &Element, key: &str) -> FieldValue {
    match element.attr(key).map(str::trim) {
        Some(raw) if raw.eq_ignore_ascii_case("true") => FieldValue::Flag(true),
        Some(raw) if raw.eq_ignore_ascii_case("false") => FieldValue::Flag(false),
        _ => FieldValue::Missing,
    }
}

fn apply_span(
    mention: &mut ConceptMention,
    element: &Element,
    start: usize,
    end: usize,
    text: &TokenText,
    file_name: &str,
) {
    mention.set_span(start, end.saturating_sub(start));
    mention.negated = element
        .attr("polarity")
        .and_then(|p| p.trim().parse::<i64>().ok())
        .is_some_and(|polarity| polarity <= 0);
    mention.matched_text = text.slice(start, end);
    mention.part_of_speech = text.postags.get(&start).cloned();

    let attributes = &mut mention.attributes;
    attributes.insert(
        "confidence".to_string(),
        float_attribute(element, "confidence", file_name),
    );
    attributes.insert(
        "uncertainty".to_string(),
        float_attribute(element, "uncertainty", file_name),
    );
    attributes.insert("conditional".to_string(), flag_attribute(element, "conditional"));
    attributes.insert("generic".to_string(), flag_attribute(element, "generic"));
    attributes.insert(
        "subject".to_string(),
        element.attr("subject").map(str::to_string).into(),
    );
}

fn apply_grounding(mention: &mut ConceptMention, element: &Element, file_name: &str) {
    if mention.cui.is_empty() {
        let preferred = element.attr("preferredText").unwrap_or_default();
        mention.cui = element.attr("cui").unwrap_or_default().to_string();
        mention.concept_string = preferred.to_string();
        mention.preferred_name = preferred.to_string();
        mention.attributes.insert(
            "tui".to_string(),
            element.attr("tui").map(str::to_string).into(),
        );
        mention.attributes.insert(
            "score".to_string(),
            float_attribute(element, "score", file_name),
        );
        mention.attributes.insert(
            "code".to_string(),
            element.attr("code").map(str::to_string).into(),
        );
    }

    if let Some(scheme) = element.attr("codingScheme") {
        mention.add_source(scheme);
    }
    if let Some(tui) = element.attr("tui") {
        match semantic_type_for_tui(tui) {
            Some(semantic_type) => mention.add_semantic_type(semantic_type),
            None => {
                warn!(file = %file_name, stage = "xmi grounding", "Unknown TUI: {}", tui);
                mention.add_semantic_type(tui);
            }
        }
    }
}

/// Parse one XMI document into a lazy sequence of mentions.
///
/// The whole document is read before the first mention is produced, since a
/// span and its groundings may appear in any order. Only references with both a
/// span and a CUI that survives `targets` are emitted; `evid` is the reference
/// id and `event_id` counts emitted mentions.
pub fn parse_xmi<'a>(
    text: &str,
    file_name: &str,
    targets: &'a TargetCuiIndex,
    extras: &'a Extras,
) -> Result<impl Iterator<Item = ConceptMention> + use<'a>> {
    let elements = read_elements(text, file_name)?;
    let token_text = TokenText::build(&elements);
    let doc_id = document_stem(file_name);
    let mut accumulator = Accumulator::new(&doc_id, extras);

    for element in elements.iter().filter(|el| el.family == Family::TextSem) {
        let Some(concepts) = element.attr(CONCEPT_ARRAY) else {
            continue;
        };
        let begin = element.attr("begin").and_then(|v| v.parse::<usize>().ok());
        let end = element.attr("end").and_then(|v| v.parse::<usize>().ok());
        let (Some(begin), Some(end)) = (begin, end) else {
            warn!(
                file = %file_name,
                stage = "xmi mention",
                "Mention {} has no valid begin/end; skipping",
                element.attr(XMI_ID).unwrap_or("?")
            );
            continue;
        };
        let (start, end) = (begin.saturating_sub(1), end.saturating_sub(1));
        for ref_id in concepts.split_whitespace() {
            let partial = accumulator.entry(ref_id);
            apply_span(&mut partial.mention, element, start, end, &token_text, file_name);
            partial.has_span = true;
        }
    }

    for element in elements.iter().filter(|el| el.family == Family::RefSem) {
        let Some(ref_id) = element.attr(XMI_ID) else {
            continue;
        };
        let partial = accumulator.entry(ref_id);
        apply_grounding(&mut partial.mention, element, file_name);
    }

    let partials = accumulator.partials;
    let prefix = doc_id.clone();
    Ok(partials
        .into_iter()
        .filter(|partial| {
            let keep = partial.has_span && !partial.mention.cui.is_empty();
            if !keep {
                debug!(ref_id = %partial.ref_id, "Dropping reference without span or CUI");
            }
            keep
        })
        .flat_map(move |partial| {
            let Partial {
                ref_id,
                mut mention,
                ..
            } = partial;
            mention.evid = Some(ref_id);
            targets
                .resolve(&mention.cui)
                .map(|target| mention.with_cui(target))
                .collect::<Vec<_>>()
        })
        .enumerate()
        .map(move |(n, mut mention)| {
            mention.event_id = format!("{}_{}", prefix, n);
            mention
        }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOTE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xmi:XMI xmlns:xmi="http://www.omg.org/XMI"
         xmlns:textsem="http:///org/apache/ctakes/typesystem/type/textsem.ecore"
         xmlns:refsem="http:///org/apache/ctakes/typesystem/type/refsem.ecore"
         xmlns:syntax="http:///org/apache/ctakes/typesystem/type/syntax.ecore"
         xmi:version="2.0">
  <syntax:ConllDependencyNode xmi:id="10" begin="1" end="1" id="0"/>
  <syntax:ConllDependencyNode xmi:id="11" begin="1" end="3" id="1" form="No" postag="DT"/>
  <syntax:ConllDependencyNode xmi:id="12" begin="4" end="9" id="2" form="fever" postag="NN"/>
  <syntax:ConllDependencyNode xmi:id="13" begin="10" end="13" id="3" form="and" postag="CC"/>
  <syntax:ConllDependencyNode xmi:id="14" begin="14" end="19" id="4" form="chest" postag="NN"/>
  <syntax:ConllDependencyNode xmi:id="15" begin="20" end="24" id="5" form="pain" postag="NN"/>
  <textsem:SignSymptomMention xmi:id="20" begin="4" end="9" ontologyConceptArr="30"
      polarity="-1" uncertainty="0" conditional="false" generic="false" subject="patient" confidence="0.0"/>
  <textsem:SignSymptomMention xmi:id="21" begin="14" end="24" ontologyConceptArr="31 32"
      polarity="1" uncertainty="0" conditional="true" generic="false" subject="patient" confidence="high"/>
  <refsem:UmlsConcept xmi:id="30" codingScheme="SNOMEDCT_US" code="386661006" score="0.0"
      cui="C0015967" tui="T184" preferredText="Fever"/>
  <refsem:UmlsConcept xmi:id="30" codingScheme="MSH" code="D005334" score="0.0"
      cui="C0015967" tui="T033" preferredText="Fever"/>
  <refsem:UmlsConcept xmi:id="31" codingScheme="SNOMEDCT_US" code="29857009" score="0.0"
      cui="C0008031" tui="T184" preferredText="Chest Pain"/>
  <refsem:UmlsConcept xmi:id="32" codingScheme="SNOMEDCT_US" code="274668005" score="0.0"
      cui="C2926613" tui="T033" preferredText="Chest pain:Finding"/>
  <refsem:UmlsConcept xmi:id="33" codingScheme="SNOMEDCT_US" cui="C9999999" tui="T033"
      preferredText="Orphan"/>
</xmi:XMI>
"#;

    fn parse(text: &str, targets: &TargetCuiIndex) -> Result<Vec<ConceptMention>> {
        let extras = Extras::new();
        Ok(parse_xmi(text, "0003.txt.xmi", targets, &extras)?.collect())
    }

    #[test]
    fn test_spans_join_groundings() {
        let mentions = parse(NOTE, &TargetCuiIndex::default()).unwrap();
        assert_eq!(mentions.len(), 3);
        assert_eq!(
            mentions.iter().map(|m| m.cui.as_str()).collect::<Vec<_>>(),
            vec!["C0015967", "C0008031", "C2926613"]
        );
        assert_eq!(
            mentions.iter().map(|m| m.event_id.as_str()).collect::<Vec<_>>(),
            vec!["0003_0", "0003_1", "0003_2"]
        );

        let fever = &mentions[0];
        assert_eq!(fever.doc_id, "0003");
        assert_eq!(fever.evid.as_deref(), Some("30"));
        assert_eq!((fever.start, fever.end, fever.length), (3, 8, 5));
        assert_eq!(fever.matched_text, "fever");
        assert_eq!(fever.part_of_speech.as_deref(), Some("NN"));
        assert!(fever.negated);
        assert_eq!(fever.preferred_name, "Fever");
        assert_eq!(fever.attributes["confidence"], FieldValue::Float(0.0));
        assert_eq!(fever.attributes["conditional"], FieldValue::Flag(false));

        let chest = &mentions[1];
        assert_eq!(chest.matched_text, "chest pain");
        assert!(!chest.negated);
        assert_eq!(chest.attributes["conditional"], FieldValue::Flag(true));
        assert_eq!(chest.attributes["confidence"], FieldValue::Missing);
        assert_eq!(chest.semantic_type, "sosy");
        assert_eq!(mentions[2].semantic_type, "fndg");
    }

    #[test]
    fn test_second_grounding_appends() {
        let mentions = parse(NOTE, &TargetCuiIndex::default()).unwrap();
        let fever = &mentions[0];
        assert_eq!(fever.source_vocabulary, "SNOMEDCT_US");
        assert_eq!(fever.all_source_vocabularies, vec!["SNOMEDCT_US", "MSH"]);
        assert_eq!(fever.all_semantic_types, vec!["sosy", "fndg"]);
        assert!(fever.has_flag("MSH") && fever.has_flag("SNOMEDCT_US"));
        assert!(fever.has_flag("sosy") && fever.has_flag("fndg"));
        assert_eq!(fever.attributes["code"], FieldValue::Text("386661006".to_string()));
    }

    #[test]
    fn test_target_filter_and_fan_out() {
        let mut targets = TargetCuiIndex::default();
        targets.add("C0008031", Some("C0008031"));
        targets.add("C0008031", Some("C0000001"));
        let mentions = parse(NOTE, &targets).unwrap();
        assert_eq!(mentions.len(), 2);
        assert!(mentions.iter().all(|m| m.evid.as_deref() == Some("31")));
        assert_eq!(mentions[0].cui, "C0000001");
        assert_eq!(mentions[1].cui, "C0008031");
    }

    #[test]
    fn test_mismatched_tags_are_document_error() {
        let err = parse("<a><b></a>", &TargetCuiIndex::default()).unwrap_err();
        assert!(err.is_document_error());
    }

    #[test]
    fn test_text_without_elements_is_document_error() {
        let err = parse("not xml at all", &TargetCuiIndex::default()).unwrap_err();
        assert!(matches!(err, ExtractError::Xml { .. }));
    }

    #[test]
    fn test_token_text_reconstruction() {
        let elements = read_elements(NOTE, "0003.txt.xmi").unwrap();
        let text = TokenText::build(&elements);
        assert_eq!(text.slice(0, 100), "No fever and chest pain");
    }
}
