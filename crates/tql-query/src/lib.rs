//! Lexing, parsing and tree bookkeeping for tql queries.
//!
//! tql is a boolean query language built for type-ahead search boxes:
//!
//! - **Values**: `rust`, `"error handling"`, `'x'`, `` `y` ``
//! - **Regexes**: `/^err(or)?$/i`
//! - **Arrays**: `[a b "c d"]`
//! - **Booleans**: `a && b`, `a || b`, `!a`, and their word forms `and`, `or`, `not`
//! - **Groups**: `(a || b) && c`, and prefix groups `title(a || b)`
//! - **Properties**: `title=guide` with custom operators, `size:gt:10` with an expanded
//!   separator, and `tag:in(a b)` with a parenthesized value list
//!
//! Parsing never fails on user input. Missing pieces become
//! [`ErrorToken`]s at the exact position they would go, and every node carries a `valid`
//! flag, which is what cursor-aware suggestions are built on.
//!
//! # Example
//!
//! ```
//! use tql_query::{Node, Parser, ParserOptions};
//!
//! let parser = Parser::new(ParserOptions::default()).unwrap();
//! let ast = parser.parse("a || (b && ");
//! assert!(!ast.is_valid());
//! assert!(matches!(ast, Node::Expression(_)));
//! ```

#![warn(missing_docs)]

mod ast;
mod error;
mod lexer;
mod options;
mod parents;
mod parser;
mod token;

pub use ast::{
    AnyToken, ArrayNode, Brackets, ConditionNode, ConditionParts, ConditionValue, ErrorToken,
    ExpressionNode, GroupNode, GroupPrefix, Node, Parens, Position, PropertyNode, QuotePair,
    Separators, TokenType, ValidToken, VariableNode,
};
pub use error::{AstError, OptionsError};
pub use lexer::{Lexer, Mode};
pub use options::{
    Keyword, Keywords, MissingOperator, OperatorRole, ParserOptions, ValuePolicy, ValuePredicate,
};
pub use parents::{NodeKey, NodeRef, ParentMap, TokenRef, flatten, generate_parents_map};
pub use parser::{LexResult, Parser, parse};
pub use token::{Category, OperatorStyle, QuoteKind, Token, TokenKind};
