//! Error types for parser configuration and AST bookkeeping.
//!
//! Malformed query text is never an error: it is represented inside the tree as
//! [`ErrorToken`](crate::ErrorToken)s. The types here cover misconfiguration and API misuse.

use thiserror::Error;

use crate::{ast::Position, options::OperatorRole};

/// An unusable parser configuration.
///
/// Raised eagerly by [`Parser::new`](crate::Parser::new) so a bad configuration never
/// silently degrades into odd tokenization.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionsError {
    /// A keyword role has no keywords at all.
    #[error("no {role}s configured")]
    EmptyKeywords {
        /// The role with an empty keyword list.
        role: OperatorRole,
    },

    /// An operator string is empty or whitespace.
    #[error("blank {role} operator")]
    BlankOperator {
        /// The role of the blank operator.
        role: OperatorRole,
    },

    /// An operator string contains a character the lexer reserves for itself.
    #[error("{role} operator '{value}' contains reserved character {ch:?}")]
    ReservedCharacter {
        /// The role of the offending operator.
        role: OperatorRole,
        /// The operator string.
        value: String,
        /// The reserved character.
        ch: char,
    },

    /// The same string is configured for two different operator roles.
    #[error("'{value}' is configured as both {first} and {second}")]
    ConflictingOperator {
        /// The duplicated operator string.
        value: String,
        /// The role it was first seen in.
        first: OperatorRole,
        /// The role it was seen in again.
        second: OperatorRole,
    },

    /// A prefixable string is empty or contains reserved characters.
    #[error("invalid prefixable string '{value}'")]
    InvalidPrefixableString {
        /// The offending prefix.
        value: String,
    },
}

/// Misuse of the AST bookkeeping API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AstError {
    /// A node already has a parent recorded, i.e. the tree was sealed twice.
    #[error("{kind} at {}..{} already has a parent (tree sealed twice)", pos.start, pos.end)]
    AlreadySealed {
        /// Kind of the node that already had a parent.
        kind: &'static str,
        /// Position of that node.
        pos: Position,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_display() {
        let err = OptionsError::ConflictingOperator {
            value: "&".into(),
            first: OperatorRole::And,
            second: OperatorRole::CustomOperator,
        };
        let display = err.to_string();
        assert!(display.contains("'&'"));
        assert!(display.contains("and keyword"));
        assert!(display.contains("custom property operator"));
    }

    #[test]
    fn reserved_character_display() {
        let err = OptionsError::ReservedCharacter {
            role: OperatorRole::ExpandedSeparator,
            value: "(:".into(),
            ch: '(',
        };
        assert!(err.to_string().contains("'('"));
    }

    #[test]
    fn already_sealed_display() {
        let err = AstError::AlreadySealed {
            kind: "condition",
            pos: Position::new(2, 5),
        };
        assert_eq!(
            err.to_string(),
            "condition at 2..5 already has a parent (tree sealed twice)"
        );
    }
}
