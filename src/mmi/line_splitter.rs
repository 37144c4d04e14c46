//! Quote-aware splitting of one MMI record line on the outer `|` delimiter.
//!
//! MetaMapLite does not escape quotes consistently, so a delimiter inside a
//! quoted cell cannot be told apart from a field boundary by a grammar. The
//! scan below is a small state machine whose transitions are listed literally:
//!
//! | state    | char | field          | next char | action                        |
//! |----------|------|----------------|-----------|-------------------------------|
//! | unquoted | `"`  | any            | any       | open quote                    |
//! | quoted   | `"`  | trigger info   | `-`       | close quote                   |
//! | quoted   | `"`  | other          | `\|`      | close quote                   |
//! | quoted   | `"`  | any            | otherwise | literal (embedded quote)      |
//! | any      | `"`  | any            | end       | error: ambiguous              |
//! | unquoted | `\|` | any            | any       | split                         |
//! | quoted   | `\|` | concept string | `C`       | force close, split            |
//! | quoted   | `\|` | other          | any       | literal                       |
//!
//! Quote characters are kept in the field text; unquoting is left to the
//! decoders that understand each cell.

use crate::constants::{MMI_DELIMITER, mmi_fields};
use thiserror::Error;

/// Failure to split a line into fields
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SplitError {
    /// A quote closes the line, so it is unknown whether it opens or closes a cell
    #[error("quote at end of line is ambiguous (in field {field})")]
    TrailingQuote { field: usize },
}

/// Split a raw record line into fields.
///
/// A line that ends inside a quoted cell is returned as-is with its partial last
/// field; the caller decides whether it is a wrapped fragment.
pub fn split_record_line(line: &str) -> Result<Vec<String>, SplitError> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        let field = fields.len();
        let next = chars.peek().copied();
        match c {
            '"' => {
                let Some(next) = next else {
                    return Err(SplitError::TrailingQuote { field });
                };
                if !quoted {
                    quoted = true;
                } else if field == mmi_fields::TRIGGER_INFO {
                    quoted = next != '-';
                } else {
                    quoted = next != MMI_DELIMITER;
                }
                current.push(c);
            }
            c if c == MMI_DELIMITER => {
                if quoted && field == mmi_fields::CONCEPT_STRING && next == Some('C') {
                    // upstream leaves a lone quote in the concept string unescaped
                    quoted = false;
                }
                if quoted {
                    current.push(c);
                } else {
                    fields.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    fields.push(current);
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_split() {
        let fields = split_record_line("a|MMI|1.0|x|C0000001|[sosy]|t|text|0/1|tree").unwrap();
        assert_eq!(fields.len(), 10);
        assert_eq!(fields[1], "MMI");
        assert_eq!(fields[9], "tree");
    }

    #[test]
    fn test_trailing_delimiter_yields_empty_field() {
        let fields = split_record_line("a|b|").unwrap();
        assert_eq!(fields, vec!["a", "b", ""]);
    }

    #[test]
    fn test_delimiter_inside_quoted_trigger_is_literal() {
        let line = r#"0|MMI|1|x|C1|[sosy]|"a|b"-text-0-"a|b"--0|text|0/3|t"#;
        let fields = split_record_line(line).unwrap();
        assert_eq!(fields.len(), 10);
        assert_eq!(fields[6], r#""a|b"-text-0-"a|b"--0"#);
    }

    #[test]
    fn test_embedded_quote_in_trigger_matched_text() {
        let line = r#"0|MMI|1|x|C1|[sosy]|"5 ft"-text-0-"5" | tall"--0|text|0/9|t"#;
        let fields = split_record_line(line).unwrap();
        assert_eq!(fields.len(), 10);
        assert_eq!(fields[6], r#""5 ft"-text-0-"5" | tall"--0"#);
    }

    #[test]
    fn test_quoted_concept_string_closes_before_delimiter() {
        let line = r#"0|MMI|1|"Pain | Chest"|C1|[sosy]|t|text|0/1|t"#;
        let fields = split_record_line(line).unwrap();
        assert_eq!(fields.len(), 10);
        assert_eq!(fields[3], r#""Pain | Chest""#);
    }

    #[test]
    fn test_unescaped_quote_in_concept_string_forces_split_before_cui() {
        let line = r#"0|MMI|1|5" tall|C1|[sosy]|t|text|0/1|t"#;
        let fields = split_record_line(line).unwrap();
        assert_eq!(fields.len(), 10);
        assert_eq!(fields[3], r#"5" tall"#);
        assert_eq!(fields[4], "C1");
    }

    #[test]
    fn test_quote_at_end_of_line_is_error() {
        let err = split_record_line(r#"0|MMI|1|x|C1|[sosy]|"risk of"#).unwrap_err();
        assert_eq!(err, SplitError::TrailingQuote { field: 6 });
    }

    #[test]
    fn test_unterminated_quote_returns_partial_fields() {
        let fields = split_record_line(r#"0|MMI|1|x|C1|[sosy]|"risk | of"#).unwrap();
        assert_eq!(fields.len(), 7);
        assert_eq!(fields[6], r#""risk | of"#);
    }
}
