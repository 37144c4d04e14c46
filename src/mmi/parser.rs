//! Pipe-format parser: record lines to concept mentions.

use super::line_assembler::{LineAssembler, RecordLine};
use super::positional_info::decode_positional_info;
use super::trigger_info::decode_trigger_info;
use crate::constants::mmi_fields;
use crate::models::{ConceptMention, Extras, document_stem};
use crate::target_cuis::TargetCuiIndex;
use std::collections::VecDeque;
use tracing::{debug, error};

/// Lazy iterator over the concept mentions of one MMI output file.
///
/// Records are decoded one at a time as the caller pulls mentions, so stopping
/// early never pays for the rest of the file.
#[derive(Debug)]
pub struct MmiMentions<'a> {
    records: LineAssembler<'a>,
    file_name: String,
    doc_id: String,
    targets: &'a TargetCuiIndex,
    extras: &'a Extras,
    pending: VecDeque<ConceptMention>,
    next_event: usize,
}

impl<'a> MmiMentions<'a> {
    pub fn new(
        text: &'a str,
        file_name: &str,
        targets: &'a TargetCuiIndex,
        extras: &'a Extras,
    ) -> Self {
        Self {
            records: LineAssembler::new(text, file_name),
            file_name: file_name.to_string(),
            doc_id: document_stem(file_name),
            targets,
            extras,
            pending: VecDeque::new(),
            next_event: 0,
        }
    }

    /// Decode one record line into pending mentions
    fn expand(&mut self, record: &RecordLine) {
        let cui = record.field(mmi_fields::CUI).trim();
        if cui.is_empty() || !self.targets.contains(cui) {
            debug!(file = %self.file_name, line = record.line_number, cui, "CUI filtered out");
            return;
        }

        let trigger_cell = record.field(mmi_fields::TRIGGER_INFO);
        let triggers = decode_trigger_info(trigger_cell, &self.file_name, record.line_number);

        let positional_cell = record.field(mmi_fields::POSITIONAL_INFO);
        let positions = match decode_positional_info(positional_cell) {
            Ok(positions) => positions,
            Err(e) => {
                error!(
                    file = %self.file_name,
                    line = record.line_number,
                    stage = "positional info",
                    field = "positional_info",
                    "{}; cell: {}; skipping record: {}",
                    e,
                    positional_cell,
                    record.raw
                );
                return;
            }
        };
        if triggers.len() != positions.len() {
            error!(
                file = %self.file_name,
                line = record.line_number,
                stage = "trigger/position pairing",
                field = "trigger_info",
                "Decoded {} triggers but {} positions; trigger cell: {}; positional cell: {}; skipping record: {}",
                triggers.len(),
                positions.len(),
                trigger_cell,
                positional_cell,
                record.raw
            );
            return;
        }

        let concept_string = unquote(record.field(mmi_fields::CONCEPT_STRING));
        let semantic_types = split_semantic_types(record.field(mmi_fields::SEMANTIC_TYPES));

        for (trigger, position) in triggers.into_iter().zip(positions) {
            let mut mention = ConceptMention::new(self.doc_id.as_str(), self.extras);
            mention.matched_text = trigger.matched_text;
            mention.concept_string = concept_string.to_string();
            mention.preferred_name = trigger.preferred_name;
            mention.set_span(position.start, position.length);
            mention.negated = trigger.negated;
            mention.part_of_speech = Some(trigger.part_of_speech).filter(|pos| !pos.is_empty());
            for semantic_type in &semantic_types {
                mention.add_semantic_type(semantic_type);
            }

            for target in self.targets.resolve(cui) {
                let mut emitted = mention.with_cui(target);
                emitted.event_id = format!("{}_{}", self.doc_id, self.next_event);
                self.next_event += 1;
                self.pending.push_back(emitted);
            }
        }
    }
}

impl Iterator for MmiMentions<'_> {
    type Item = ConceptMention;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(mention) = self.pending.pop_front() {
                return Some(mention);
            }
            let record = self.records.next()?;
            self.expand(&record);
        }
    }
}

fn unquote(cell: &str) -> &str {
    cell.strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(cell)
}

/// `[sosy,dsyn]` -> `["sosy", "dsyn"]`
fn split_semantic_types(cell: &str) -> Vec<&str> {
    let cell = cell.trim();
    let inner = cell.strip_prefix('[').unwrap_or(cell);
    let inner = inner.strip_suffix(']').unwrap_or(inner);
    inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}
