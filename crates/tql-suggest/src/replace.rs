//! Applying a completion to the input.

use serde::Serialize;
use tql_query::{Position, QuoteKind};

use crate::{complete::Completion, error::SuggestError};

/// The edited input and where the caret goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Replacement {
    /// The full new input.
    pub text: String,
    /// New caret offset in `text`.
    pub cursor: usize,
}

/// Splices `completion` into `input` over its suggestion's range.
///
/// Adds the whitespace and parens the suggestion requires, unless the surrounding text already
/// provides them. The caret lands inside new parens, otherwise after the inserted text.
pub fn autoreplace(input: &str, completion: &Completion) -> Result<Replacement, SuggestError> {
    let Completion { value, suggestion } = completion;
    if suggestion.kind.is_value_like() && is_partially_quoted(value) {
        return Err(SuggestError::PartiallyQuoted {
            value: value.clone(),
        });
    }

    let Position { start, end } = suggestion.range;
    let bounds = (start <= end)
        .then(|| input.get(..start).zip(input.get(end..)))
        .flatten();
    let Some((head, tail)) = bounds else {
        return Err(SuggestError::RangeOutOfBounds {
            start,
            end,
            len: input.len(),
        });
    };

    let requires = suggestion.requires;
    let tail = if requires.prefix {
        attach_to_group(tail)
    } else {
        tail
    };
    let mut text = String::with_capacity(input.len() + value.len() + 3);
    text.push_str(head);
    if needs_space(requires.whitespace.before, head.chars().next_back()) {
        text.push(' ');
    }
    text.push_str(value);

    let cursor = if requires.group {
        let inside = text.len() + 1;
        if !tail.starts_with('(') {
            text.push_str("()");
            if needs_space(requires.whitespace.after, tail.chars().next()) {
                text.push(' ');
            }
        }
        inside
    } else {
        let spaced = requires.whitespace.after && !requires.prefix;
        if needs_space(spaced, tail.chars().next()) {
            text.push(' ');
        }
        text.len()
    };
    text.push_str(tail);
    Ok(Replacement { text, cursor })
}

/// `tail` without the whitespace before its opening `(`. A group prefix must touch its group.
fn attach_to_group(tail: &str) -> &str {
    let trimmed = tail.trim_start();
    if trimmed.starts_with('(') {
        trimmed
    } else {
        tail
    }
}

/// Returns true if a space must separate the new text from `neighbour`.
fn needs_space(required: bool, neighbour: Option<char>) -> bool {
    required && neighbour.is_some_and(|ch| !ch.is_whitespace())
}

/// Returns true if `value` opens a quote it does not close, closes one it does not open, or
/// closes with a different quote.
fn is_partially_quoted(value: &str) -> bool {
    let open = value.chars().next().and_then(QuoteKind::from_char);
    match (open, closing_quote(value)) {
        (None, None) => false,
        (Some(open), Some(close)) => open != close || value.len() < 2,
        _ => true,
    }
}

/// The unescaped quote `value` ends with.
fn closing_quote(value: &str) -> Option<QuoteKind> {
    let last = value.chars().next_back()?;
    let quote = QuoteKind::from_char(last)?;
    let body = value.get(..value.len() - last.len_utf8()).unwrap_or_default();
    let escapes = body.chars().rev().take_while(|&ch| ch == '\\').count();
    (escapes % 2 == 0).then_some(quote)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suggest::{Requirements, Suggestion, SuggestionKind, WhitespaceRequirement};

    fn completion(kind: SuggestionKind, value: &str, start: usize, end: usize) -> Completion {
        Completion {
            value: value.into(),
            suggestion: Suggestion {
                kind,
                range: Position::new(start, end),
                requires: Requirements::default(),
                is_error: false,
            },
        }
    }

    fn with_spaces(mut completion: Completion, before: bool, after: bool) -> Completion {
        completion.suggestion.requires.whitespace = WhitespaceRequirement { before, after };
        completion
    }

    #[test]
    fn replaces_range() {
        let c = completion(SuggestionKind::Variable, "status", 5, 7);
        let r = autoreplace("a || st", &c).unwrap();
        assert_eq!(r.text, "a || status");
        assert_eq!(r.cursor, 11);
    }

    #[test]
    fn inserts_at_empty_range() {
        let c = completion(SuggestionKind::Paren, ")", 2, 2);
        let r = autoreplace("(a", &c).unwrap();
        assert_eq!(r.text, "(a)");
        assert_eq!(r.cursor, 3);
    }

    #[test]
    fn adds_missing_whitespace() {
        let c = completion(SuggestionKind::BooleanWordOperator, "and", 1, 1);
        let c = with_spaces(c, true, true);
        let r = autoreplace("a)", &c).unwrap();
        assert_eq!(r.text, "a and )");
        assert_eq!(r.cursor, 6);
    }

    #[test]
    fn keeps_existing_whitespace() {
        let c = completion(SuggestionKind::BooleanWordOperator, "and", 2, 2);
        let c = with_spaces(c, true, true);
        let r = autoreplace("a  b", &c).unwrap();
        assert_eq!(r.text, "a and b");
        assert_eq!(r.text.len(), 7);
        assert_eq!(r.cursor, 5);
    }

    #[test]
    fn no_space_at_input_edges() {
        let c = with_spaces(completion(SuggestionKind::Variable, "x", 0, 0), true, true);
        let r = autoreplace("", &c).unwrap();
        assert_eq!(r.text, "x");
        assert_eq!(r.cursor, 1);
    }

    #[test]
    fn group_prefix_adds_parens() {
        let mut c = completion(SuggestionKind::Prefix, "tag", 0, 0);
        c.suggestion.requires.group = true;
        let r = autoreplace("", &c).unwrap();
        assert_eq!(r.text, "tag()");
        assert_eq!(r.cursor, 4);
    }

    #[test]
    fn group_prefix_reuses_existing_paren() {
        let mut c = completion(SuggestionKind::Prefix, "tag", 0, 1);
        c.suggestion.requires.group = true;
        let r = autoreplace("t(a)", &c).unwrap();
        assert_eq!(r.text, "tag(a)");
        assert_eq!(r.cursor, 4);
    }

    #[test]
    fn prefix_before_existing_group() {
        let mut c = with_spaces(completion(SuggestionKind::Prefix, "tag", 0, 0), true, true);
        c.suggestion.requires.prefix = true;
        let r = autoreplace("(a)", &c).unwrap();
        assert_eq!(r.text, "tag(a)");
        assert_eq!(r.cursor, 3);

        // Without the flag the same completion is a separate word.
        c.suggestion.requires.prefix = false;
        assert_eq!(autoreplace("(a)", &c).unwrap().text, "tag (a)");
    }

    #[test]
    fn prefix_closes_gap_before_group() {
        let mut c = completion(SuggestionKind::Prefix, "tag", 2, 2);
        c.suggestion.requires.prefix = true;
        let r = autoreplace("a   (b)", &c).unwrap();
        assert_eq!(r.text, "a tag(b)");
        assert_eq!(r.cursor, 5);

        let r = autoreplace("a   b", &c).unwrap();
        assert_eq!(r.text, "a tag  b");
    }

    #[test]
    fn quoted_values() {
        let c = completion(SuggestionKind::Variable, "\"a b\"", 0, 0);
        assert_eq!(autoreplace("", &c).unwrap().text, "\"a b\"");
        let c = completion(SuggestionKind::Variable, r#""a\"""#, 0, 0);
        assert!(autoreplace("", &c).is_ok());
    }

    #[test]
    fn rejects_partially_quoted_values() {
        for value in ["\"abc", "abc\"", "\"abc'", "\"", r#""abc\""#] {
            let c = completion(SuggestionKind::Variable, value, 0, 0);
            assert_eq!(
                autoreplace("", &c),
                Err(SuggestError::PartiallyQuoted {
                    value: value.into()
                }),
                "{value}"
            );
        }
    }

    #[test]
    fn quote_completions_are_not_checked() {
        let c = completion(SuggestionKind::Quote(QuoteKind::Double), "\"", 2, 2);
        assert_eq!(autoreplace("\"a", &c).unwrap().text, "\"a\"");
    }

    #[test]
    fn rejects_ranges_outside_input() {
        let c = completion(SuggestionKind::Variable, "x", 2, 5);
        assert_eq!(
            autoreplace("abc", &c),
            Err(SuggestError::RangeOutOfBounds {
                start: 2,
                end: 5,
                len: 3
            })
        );
        let c = completion(SuggestionKind::Variable, "x", 2, 1);
        assert!(autoreplace("abc", &c).is_err());
        let c = completion(SuggestionKind::Variable, "x", 1, 1);
        assert!(autoreplace("é", &c).is_err());
    }
}
