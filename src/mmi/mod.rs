//! MetaMapLite MMI (pipe-delimited) output format
//!
//! The format is decoded in layers:
//! - [`line_splitter`] - quote-aware split of one line on the outer `|`
//! - [`line_assembler`] - repair of wrapped records and record-kind filtering
//! - [`trigger_info`] - the nested trigger tuples of field 6
//! - [`positional_info`] - the nested `start/length` list of field 8
//! - [`parser`] - composition into [`ConceptMention`]s

pub mod line_assembler;
pub mod line_splitter;
pub mod parser;
pub mod positional_info;
pub mod trigger_info;

#[cfg(test)]
mod tests;

pub use parser::MmiMentions;

use crate::models::{ConceptMention, Extras};
use crate::target_cuis::TargetCuiIndex;

/// Parse the text of one MMI output file into a lazy sequence of mentions
pub fn parse_mmi<'a>(
    text: &'a str,
    file_name: &str,
    targets: &'a TargetCuiIndex,
    extras: &'a Extras,
) -> impl Iterator<Item = ConceptMention> + use<'a> {
    MmiMentions::new(text, file_name, targets, extras)
}
