//! Type-ahead support for tql queries.
//!
//! An editor calls these on every keystroke, with the input, the tree parsed from it and the
//! caret offset:
//!
//! 1. [`autosuggest`] says what kinds of text fit at the caret, as [`Suggestion`]s;
//! 2. [`autocomplete`] turns suggestions into concrete [`Completion`]s from candidate lists and
//!    the parser's keywords, quoting values that would not read back unquoted;
//! 3. [`autoreplace`] splices the chosen completion into the input and places the caret.
//!
//! [`get_cursor_info`] and [`get_surrounding_errors`] expose the cursor classification the
//! suggestions are built on.
//!
//! # Example
//!
//! ```
//! use tql_query::Parser;
//! use tql_suggest::{Candidates, SuggestionKind, autocomplete, autoreplace, autosuggest};
//!
//! let parser = Parser::default();
//! let input = "open || ";
//! let ast = parser.parse(input);
//! let suggestions = autosuggest(input, &ast, input.len(), parser.options()).unwrap();
//! assert_eq!(suggestions[0].kind, SuggestionKind::Variable);
//!
//! let candidates = Candidates {
//!     variables: vec!["closed".into()],
//!     ..Candidates::default()
//! };
//! let completions = autocomplete(&parser, &suggestions, &candidates);
//! let replacement = autoreplace(input, &completions[0]).unwrap();
//! assert_eq!(replacement.text, "open || closed");
//! assert_eq!(replacement.cursor, 14);
//! ```

#![warn(missing_docs)]

mod complete;
mod cursor;
mod error;
mod replace;
mod suggest;

pub use complete::{Candidates, Completion, autocomplete, quote, quote_if_needed};
pub use cursor::{
    CursorInfo, ValidNeighbours, Whitespace, get_cursor_info, get_surrounding_errors,
};
pub use error::SuggestError;
pub use replace::{Replacement, autoreplace};
pub use suggest::{Requirements, Suggestion, SuggestionKind, WhitespaceRequirement, autosuggest};
