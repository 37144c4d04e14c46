//! Decoding of the MMI positional-info cell.
//!
//! The cell is a `;`-separated list of `start/length` tokens, one per trigger.
//! A piece holding several `,`-separated tokens lists alternative offsets for
//! triggers that share the same text; each repeat of that exact piece consumes
//! the next alternative.

use std::collections::{HashMap, VecDeque};
use thiserror::Error;

/// One decoded span
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawPositionalTuple {
    pub start: usize,
    pub end: usize,
    pub length: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PositionalError {
    #[error("invalid start/length token `{token}`")]
    InvalidToken { token: String },

    #[error("no alternatives left for grouped offsets `{piece}`")]
    ExhaustedGroup { piece: String },
}

fn parse_token(token: &str) -> Result<RawPositionalTuple, PositionalError> {
    let trimmed = token.trim().trim_start_matches('[').trim_end_matches(']');
    let invalid = || PositionalError::InvalidToken {
        token: token.to_string(),
    };
    let (start, length) = trimmed.split_once('/').ok_or_else(invalid)?;
    let start: usize = start.trim().parse().map_err(|_| invalid())?;
    let length: usize = length.trim().parse().map_err(|_| invalid())?;
    Ok(RawPositionalTuple {
        start,
        end: start + length,
        length,
    })
}

/// Collapse the duplicated `[a/b;c/d],[a/b;c/d]` encoding into `a/b;c/d`
fn collapse_duplicate_encoding(cell: &str) -> String {
    let unbracketed: String = cell.chars().filter(|c| !matches!(c, '[' | ']')).collect();
    let first = unbracketed.split(';').next().unwrap_or_default();
    first.replace(',', ";")
}

/// Decode a positional-info cell into spans, in order of occurrence
pub fn decode_positional_info(cell: &str) -> Result<Vec<RawPositionalTuple>, PositionalError> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Ok(Vec::new());
    }
    let collapsed;
    let cell = if cell.starts_with('[') {
        collapsed = collapse_duplicate_encoding(cell);
        collapsed.as_str()
    } else {
        cell
    };

    let mut groups: HashMap<&str, VecDeque<RawPositionalTuple>> = HashMap::new();
    let mut positions = Vec::new();
    for piece in cell.split(';').filter(|p| !p.trim().is_empty()) {
        if !piece.contains(',') {
            positions.push(parse_token(piece)?);
            continue;
        }
        if !groups.contains_key(piece) {
            let alternatives = piece
                .split(',')
                .map(parse_token)
                .collect::<Result<VecDeque<_>, _>>()?;
            groups.insert(piece, alternatives);
        }
        let next = groups
            .get_mut(piece)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| PositionalError::ExhaustedGroup {
                piece: piece.to_string(),
            })?;
        positions.push(next);
    }
    Ok(positions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: usize, length: usize) -> RawPositionalTuple {
        RawPositionalTuple {
            start,
            end: start + length,
            length,
        }
    }

    #[test]
    fn test_simple_list() {
        assert_eq!(
            decode_positional_info("0/11;20/4").unwrap(),
            vec![span(0, 11), span(20, 4)]
        );
    }

    #[test]
    fn test_grouped_alternatives_are_consumed_in_order() {
        let positions = decode_positional_info("59/5;[44/9],[179/9];[44/9],[179/9]").unwrap();
        assert_eq!(positions, vec![span(59, 5), span(44, 9), span(179, 9)]);
    }

    #[test]
    fn test_duplicate_bracket_encoding_is_collapsed() {
        let positions = decode_positional_info("[4/7,20/7];[4/7,20/7]").unwrap();
        assert_eq!(positions, vec![span(4, 7), span(20, 7)]);
    }

    #[test]
    fn test_exhausted_group_is_error() {
        let err = decode_positional_info("1/2,3/4;1/2,3/4;1/2,3/4").unwrap_err();
        assert!(matches!(err, PositionalError::ExhaustedGroup { .. }));
    }

    #[test]
    fn test_invalid_token() {
        let err = decode_positional_info("0/x").unwrap_err();
        assert_eq!(
            err,
            PositionalError::InvalidToken {
                token: "0/x".to_string()
            }
        );
    }

    #[test]
    fn test_empty_cell() {
        assert!(decode_positional_info("").unwrap().is_empty());
    }
}
