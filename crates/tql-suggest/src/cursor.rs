//! Classifies the tokens around a cursor.
//!
//! Whitespace is never tokenized, so the flat token list alone cannot say whether the cursor
//! is glued to a token or separated from it. [`CursorInfo`] combines the token list with the raw
//! input to answer both.

use tql_query::{ErrorToken, Node, TokenRef, ValidToken, flatten};

use crate::error::SuggestError;

/// Whether whitespace separates the cursor from the nearest tokens with text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Whitespace {
    /// Whitespace lies between the previous token and the cursor.
    pub prev: bool,
    /// Whitespace lies between the cursor and the next token.
    pub next: bool,
}

/// Nearest matched tokens on either side of the cursor, skipping missing ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidNeighbours<'a> {
    /// Nearest matched token before the cursor.
    pub prev: Option<&'a ValidToken>,
    /// Nearest matched token after the cursor.
    pub next: Option<&'a ValidToken>,
}

/// The cursor's position relative to the tokens of a tree.
#[derive(Debug, Clone)]
pub struct CursorInfo<'a> {
    /// Cursor byte offset.
    pub index: usize,
    /// The matched token the cursor lies strictly inside of.
    pub at: Option<&'a ValidToken>,
    /// The token directly before the cursor (or before `at`).
    pub prev: Option<TokenRef<'a>>,
    /// The token directly after the cursor (or after `at`).
    pub next: Option<TokenRef<'a>>,
    /// Nearest matched tokens.
    pub valid: ValidNeighbours<'a>,
    /// Whitespace around the cursor. Both false when `at` is set.
    pub whitespace: Whitespace,
    /// Every token of the tree in source order.
    tokens: Vec<TokenRef<'a>>,
    /// Number of tokens entirely before the cursor.
    before: usize,
    /// Index of the first token entirely after the cursor.
    after: usize,
}

impl<'a> CursorInfo<'a> {
    /// Every token of the tree in source order.
    pub fn tokens(&self) -> &[TokenRef<'a>] {
        &self.tokens
    }

    /// Tokens before the cursor, nearest last.
    pub fn tokens_before(&self) -> &[TokenRef<'a>] {
        self.tokens.get(..self.before).unwrap_or_default()
    }

    /// Tokens after the cursor, nearest first.
    pub fn tokens_after(&self) -> &[TokenRef<'a>] {
        self.tokens.get(self.after..).unwrap_or_default()
    }

    /// Nearest matched token with text that ends at or before the cursor.
    pub fn text_before(&self) -> Option<&'a ValidToken> {
        self.tokens_before().iter().rev().find_map(|t| with_text(*t))
    }

    /// Nearest matched token with text that starts at or after the cursor.
    pub fn text_after(&self) -> Option<&'a ValidToken> {
        self.tokens_after().iter().find_map(|t| with_text(*t))
    }
}

/// A matched token that covers at least one byte.
fn with_text(token: TokenRef<'_>) -> Option<&ValidToken> {
    token.as_valid().filter(|t| !t.pos.is_empty())
}

/// Locates `index` among the tokens of `ast`, which was parsed from `input`.
///
/// Every offset from `0` to `input.len()` that falls on a character boundary is accepted.
pub fn get_cursor_info<'a>(
    input: &str,
    ast: &'a Node,
    index: usize,
) -> Result<CursorInfo<'a>, SuggestError> {
    if index > input.len() || !input.is_char_boundary(index) {
        return Err(SuggestError::CursorOutOfBounds {
            index,
            len: input.len(),
        });
    }

    let tokens = flatten(ast);
    let inside = tokens.iter().position(|t| {
        t.as_valid()
            .is_some_and(|v| v.pos.start < index && index < v.pos.end)
    });
    let (before, after) = inside.map_or_else(
        || {
            let split = tokens
                .iter()
                .position(|t| t.pos().start >= index)
                .unwrap_or(tokens.len());
            (split, split)
        },
        |at| (at, at + 1),
    );

    let mut info = CursorInfo {
        index,
        at: inside.and_then(|i| tokens.get(i)).and_then(|t| t.as_valid()),
        prev: before.checked_sub(1).and_then(|i| tokens.get(i)).copied(),
        next: tokens.get(after).copied(),
        valid: ValidNeighbours::default(),
        whitespace: Whitespace::default(),
        tokens,
        before,
        after,
    };
    info.valid = ValidNeighbours {
        prev: info.tokens_before().iter().rev().find_map(|t| t.as_valid()),
        next: info.tokens_after().iter().find_map(|t| t.as_valid()),
    };
    if info.at.is_none() {
        let prev_end = info.text_before().map_or(0, |t| t.pos.end);
        let next_start = info.text_after().map_or(input.len(), |t| t.pos.start);
        info.whitespace = Whitespace {
            prev: has_whitespace(input, prev_end, index),
            next: has_whitespace(input, index, next_start),
        };
    }
    Ok(info)
}

/// Returns true if `input[start..end]` contains whitespace.
fn has_whitespace(input: &str, start: usize, end: usize) -> bool {
    input
        .get(start..end)
        .is_some_and(|s| s.chars().any(char::is_whitespace))
}

/// Missing tokens adjacent to the cursor, most relevant first.
///
/// Walks outwards from the cursor in both directions over missing and zero-width tokens. Quote
/// errors rank first, then paren and bracket errors, then the rest; ties go to the error
/// nearest the cursor. Empty when the cursor is inside a token.
pub fn get_surrounding_errors<'a>(info: &CursorInfo<'a>) -> Vec<&'a ErrorToken> {
    if info.at.is_some() {
        return Vec::new();
    }
    let backward = info
        .tokens_before()
        .iter()
        .rev()
        .take_while(|t| with_text(**t).is_none());
    let forward = info
        .tokens_after()
        .iter()
        .take_while(|t| with_text(**t).is_none());
    let mut errors: Vec<&ErrorToken> = backward
        .chain(forward)
        .filter_map(|t| t.as_error())
        .collect();
    errors.sort_by_key(|e| (rank(e), e.pos.start.abs_diff(info.index)));
    errors
}

/// Error class: quotes, then parens, then everything else.
fn rank(error: &ErrorToken) -> u8 {
    if error.expects_quote() {
        0
    } else if error.expects_paren() {
        1
    } else {
        2
    }
}
