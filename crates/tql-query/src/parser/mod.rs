//! Query parser.
//!
//! Parses query text into a [`Node`] tree by recursive descent. The parser never fails on user
//! input: anything missing is recorded as an [`ErrorToken`](crate::ErrorToken) at the place it
//! would go, so a half-typed query still produces a complete tree.
//!
//! # Grammar
//!
//! ```text
//! query         → or_expr
//! or_expr       → and_expr ((OR | implicit-or) and_expr)*
//! and_expr      → not_expr ((AND | implicit-and | missing-op) not_expr)*
//! not_expr      → NOT not_expr | NOT <missing> | atom
//! atom          → "(" or_expr ")" | condition
//! condition     → property_part? value
//!               | variable "(" or_expr ")"
//! property_part → variable? CUSTOM
//!               | variable? SEP op SEP
//!               | variable? SEP op
//! value         → variable | array | "(" sub-parse ")"
//! variable      → prefix? (QUOTE body? QUOTE | "/" body? "/" flags? | VALUE)
//! array         → "[" variable* "]"
//! ```
//!
//! # Precedence (highest to lowest)
//!
//! 1. Grouping: `(...)`
//! 2. Negation
//! 3. AND (explicit, or implicit with the `and` missing-operator policy)
//! 4. OR

mod condition;
mod state;

use std::sync::OnceLock;

use tracing::{debug, trace};

use self::state::{ParseState, ValueContext};
use crate::{
    ast::Node,
    error::OptionsError,
    lexer::Lexer,
    options::ParserOptions,
    token::{Token, TokenKind},
};

/// Tokens of one input, after right-paren balancing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexResult {
    /// Tokens of `raw_input`.
    pub tokens: Vec<Token>,
    /// Number of `(` prepended to balance excess `)`.
    pub shift: usize,
    /// The lexed text: the input with `shift` parens prepended.
    pub raw_input: String,
}

/// A configured query parser.
#[derive(Debug)]
pub struct Parser {
    /// Validated options.
    options: ParserOptions,
    /// Lexer built from the options.
    lexer: Lexer,
    /// Parser for the inside of property value groups, created on first use.
    property_value_parser: OnceLock<Box<Self>>,
}

impl Parser {
    /// Creates a parser, rejecting unusable options.
    pub fn new(options: ParserOptions) -> Result<Self, OptionsError> {
        options.validate()?;
        Ok(Self::from_validated(options))
    }

    /// Creates a parser from options that already passed validation.
    fn from_validated(options: ParserOptions) -> Self {
        let lexer = Lexer::new(&options);
        Self {
            options,
            lexer,
            property_value_parser: OnceLock::new(),
        }
    }

    /// The parser's options.
    pub const fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// The lexer.
    pub const fn lexer(&self) -> &Lexer {
        &self.lexer
    }

    /// Lexes `input`, prepending one `(` for every `)` that closes nothing.
    pub fn lex(&self, input: &str) -> LexResult {
        let tokens = self.lexer.tokenize(input);
        let shift = unmatched_right_parens(&tokens);
        if shift == 0 {
            return LexResult {
                tokens,
                shift,
                raw_input: input.to_string(),
            };
        }

        debug!(shift, "balancing unmatched right parens");
        let raw_input = format!("{}{input}", "(".repeat(shift));
        LexResult {
            tokens: self.lexer.tokenize(&raw_input),
            shift,
            raw_input,
        }
    }

    /// Parses `input` into a tree. Positions are byte offsets into `input`.
    pub fn parse(&self, input: &str) -> Node {
        trace!(len = input.len(), "parsing query");
        self.parse_fragment(input, 0, ValueContext::default())
    }

    /// Parses a piece of a larger input that starts at `offset`.
    fn parse_fragment(&self, input: &str, offset: usize, context: ValueContext) -> Node {
        let lexed = self.lex(input);
        ParseState::new(self, &lexed, offset, context).parse_query()
    }

    /// The parser used for the inside of `prop=(...)`: same options without property syntax.
    fn property_value_parser(&self) -> &Self {
        if self.options.expanded_property_separator.is_none()
            && self.options.custom_property_operators.is_none()
        {
            return self;
        }
        self.property_value_parser.get_or_init(|| {
            debug!("creating property value parser");
            Box::new(Self::from_validated(
                self.options.without_property_operators(),
            ))
        })
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::from_validated(ParserOptions::default())
    }
}

/// Counts `)` tokens that close no `(`.
fn unmatched_right_parens(tokens: &[Token]) -> usize {
    let mut depth = 0usize;
    let mut unmatched = 0;
    for token in tokens {
        match token.kind {
            TokenKind::ParenL => depth += 1,
            TokenKind::ParenR if depth == 0 => unmatched += 1,
            TokenKind::ParenR => depth -= 1,
            _ => {}
        }
    }
    unmatched
}

/// Parses `input` with default options.
pub fn parse(input: &str) -> Node {
    Parser::default().parse(input)
}

#[cfg(test)]
mod tests {
    use std::ptr;

    use super::*;
    use crate::{
        ast::{
            AnyToken, ConditionNode, ConditionValue, ErrorToken, ExpressionNode, GroupNode,
            GroupPrefix, Position, PropertyNode, TokenType, VariableNode,
        },
        options::{MissingOperator, ValuePolicy},
        parents::{TokenRef, flatten},
    };

    fn parser(options: ParserOptions) -> Parser {
        Parser::new(options).unwrap()
    }

    fn property_parser() -> Parser {
        parser(ParserOptions {
            expanded_property_separator: Some(":".into()),
            custom_property_operators: Some(vec!["=".into(), ">=".into()]),
            ..ParserOptions::default()
        })
    }

    fn expression(node: &Node) -> &ExpressionNode {
        match node {
            Node::Expression(e) => e,
            other => panic!("expected expression, got {other:?}"),
        }
    }

    fn condition(node: &Node) -> &ConditionNode {
        match node {
            Node::Condition(c) => c,
            other => panic!("expected condition, got {other:?}"),
        }
    }

    fn group(node: &Node) -> &GroupNode {
        match node {
            Node::Group(g) => g,
            other => panic!("expected group, got {other:?}"),
        }
    }

    fn variable(value: &ConditionValue) -> &VariableNode {
        match value {
            ConditionValue::Variable(v) => v,
            other => panic!("expected variable, got {other:?}"),
        }
    }

    fn error_at(token: &AnyToken) -> (Vec<TokenType>, usize) {
        match token {
            AnyToken::Error(e) => (e.expected.clone(), e.pos.start),
            AnyToken::Valid(t) => panic!("expected error, got {t:?}"),
        }
    }

    #[test]
    fn or_expression_positions() {
        let ast = parse("a || b");
        let expr = expression(&ast);
        assert_eq!(expr.operator().pos(), Position::new(2, 4));
        assert_eq!(expr.left().pos(), Position::new(0, 1));
        assert_eq!(expr.right().pos(), Position::new(5, 6));
        assert!(expr.is_valid());
        assert_eq!(expr.pos(), Position::new(0, 6));
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let ast = parse("a || b && c");
        let expr = expression(&ast);
        assert_eq!(expr.operator().as_valid().unwrap().kind, TokenType::OpOr);
        let right = expression(expr.right());
        assert_eq!(right.operator().as_valid().unwrap().kind, TokenType::OpAnd);
    }

    #[test]
    fn empty_input_is_missing_value() {
        assert_eq!(
            parse(""),
            Node::Error(ErrorToken::new(&[TokenType::Value], 0))
        );
    }

    #[test]
    fn excess_right_paren_is_balanced() {
        let parser = Parser::default();
        let lexed = parser.lex(")(");
        assert_eq!(lexed.shift, 1);
        assert_eq!(lexed.raw_input, "()(");

        let ast = parser.parse(")(");
        let expr = expression(&ast);
        let first = group(expr.left());
        let paren = first.paren().unwrap();
        assert!(paren.left.is_none());
        assert_eq!(paren.right.pos(), Position::new(0, 1));
        assert_eq!(
            error_at(expr.operator()),
            (vec![TokenType::OpAnd, TokenType::OpOr], 1)
        );
        let second = group(expr.right());
        assert_eq!(
            error_at(&second.paren().unwrap().right),
            (vec![TokenType::ParenR], 2)
        );
    }

    #[test]
    fn balanced_excess_paren_keeps_positions() {
        let ast = parse("a)");
        let g = group(&ast);
        assert!(g.is_valid());
        assert_eq!(g.pos(), Position::new(0, 2));
        assert_eq!(g.expression().pos(), Position::new(0, 1));
    }

    #[test]
    fn implicit_and() {
        let parser = parser(ParserOptions {
            on_missing_boolean_operator: MissingOperator::And,
            ..ParserOptions::default()
        });
        let ast = parser.parse("a b");
        let expr = expression(&ast);
        let op = expr.operator().as_valid().unwrap();
        assert_eq!(op.kind, TokenType::OpAnd);
        assert_eq!(op.pos, Position::new(1, 1));
        assert!(op.value.is_empty());
        assert!(expr.is_valid());
    }

    #[test]
    fn implicit_or_has_lowest_precedence() {
        let parser = parser(ParserOptions {
            on_missing_boolean_operator: MissingOperator::Or,
            ..ParserOptions::default()
        });
        let ast = parser.parse("a && b c");
        let expr = expression(&ast);
        let op = expr.operator().as_valid().unwrap();
        assert_eq!(op.kind, TokenType::OpOr);
        assert_eq!(op.pos, Position::new(6, 6));
        assert!(matches!(*expr.left(), Node::Expression(_)));
    }

    #[test]
    fn missing_operator_error() {
        let ast = parse("a b");
        let expr = expression(&ast);
        assert_eq!(
            error_at(expr.operator()),
            (vec![TokenType::OpAnd, TokenType::OpOr], 1)
        );
        assert!(!expr.is_valid());
    }

    #[test]
    fn missing_right_operand() {
        let ast = parse("a && ");
        let expr = expression(&ast);
        assert_eq!(*expr.right(), Node::Error(ErrorToken::new(&[TokenType::Value], 4)));
    }

    #[test]
    fn leading_operator() {
        let ast = parse("&& a");
        let expr = expression(&ast);
        assert_eq!(*expr.left(), Node::Error(ErrorToken::new(&[TokenType::Value], 0)));
        assert!(expr.operator().is_valid());
    }

    #[test]
    fn not_condition() {
        let ast = parse("!a");
        let c = condition(&ast);
        assert_eq!(c.operator().unwrap().value, "!");
        assert_eq!(c.pos(), Position::new(0, 2));
    }

    #[test]
    fn not_without_operand() {
        let ast = parse("a && not");
        let c = condition(expression(&ast).right());
        assert_eq!(c.operator().unwrap().value, "not");
        assert!(matches!(c.value(), ConditionValue::Error(e) if e.pos.start == 8));
        assert!(!c.is_valid());
    }

    #[test]
    fn stacked_not_wraps_in_parenless_group() {
        let ast = parse("!!a");
        let g = group(&ast);
        assert!(g.paren().is_none());
        assert!(matches!(g.prefix(), Some(GroupPrefix::Not(_))));
        let inner = condition(g.expression());
        assert!(inner.operator().is_some());
        assert_eq!(g.pos(), Position::new(0, 3));
    }

    #[test]
    fn not_on_group_sets_prefix() {
        let ast = parse("!(a || b)");
        let g = group(&ast);
        assert!(matches!(g.prefix(), Some(GroupPrefix::Not(_))));
        assert!(g.paren().is_some());
        assert_eq!(g.pos(), Position::new(0, 9));
    }

    #[test]
    fn not_on_prefixed_group_wraps() {
        let ast = parse("!a(b)");
        let outer = group(&ast);
        assert!(outer.paren().is_none());
        let inner = group(outer.expression());
        assert!(matches!(inner.prefix(), Some(GroupPrefix::Condition(_))));
    }

    #[test]
    fn missing_right_paren() {
        let ast = parse("(a");
        let g = group(&ast);
        assert_eq!(
            error_at(&g.paren().unwrap().right),
            (vec![TokenType::ParenR], 2)
        );
    }

    #[test]
    fn empty_group() {
        let ast = parse("()");
        let g = group(&ast);
        assert_eq!(
            *g.expression(),
            Node::Error(ErrorToken::new(&[TokenType::Value], 1))
        );
    }

    #[test]
    fn prefix_group() {
        let ast = parse("a(b || c)");
        let g = group(&ast);
        let Some(GroupPrefix::Condition(prefix)) = g.prefix() else {
            panic!("expected condition prefix");
        };
        assert_eq!(variable(prefix.value()).text(), "a");
        assert_eq!(g.pos(), Position::new(0, 9));
    }

    #[test]
    fn quoted_prefix_group() {
        let ast = parse("\"a b\"(c)");
        assert!(matches!(group(&ast).prefix(), Some(GroupPrefix::Condition(_))));
    }

    #[test]
    fn separated_paren_is_not_prefix() {
        let ast = parse("a (b)");
        let expr = expression(&ast);
        assert!(matches!(*expr.left(), Node::Condition(_)));
        assert!(matches!(*expr.right(), Node::Group(_)));
    }

    #[test]
    fn prefix_groups_disabled() {
        let parser = parser(ParserOptions {
            prefixable_groups: false,
            ..ParserOptions::default()
        });
        assert!(matches!(parser.parse("a(b)"), Node::Expression(_)));
    }

    #[test]
    fn regex_is_never_a_prefix() {
        assert!(matches!(parse("/a/(b)"), Node::Expression(_)));
    }

    #[test]
    fn quoted_values() {
        let ast = parse("'a b'");
        let v = variable(condition(&ast).value());
        assert_eq!(v.text(), "a b");
        assert_eq!(v.pos(), Position::new(0, 5));
        assert!(v.is_valid());
    }

    #[test]
    fn empty_quotes_are_valid() {
        let ast = parse("\"\"");
        let v = variable(condition(&ast).value());
        assert!(v.is_valid());
        assert_eq!(v.value().pos(), Position::new(1, 1));
    }

    #[test]
    fn unterminated_quote() {
        let ast = parse("\"ab");
        let v = variable(condition(&ast).value());
        let quote = v.quote().unwrap();
        assert_eq!(error_at(&quote.right), (vec![TokenType::DoubleQuote], 3));
    }

    #[test]
    fn string_prefix() {
        let parser = parser(ParserOptions {
            prefixable_strings: Some(vec!["r".into()]),
            ..ParserOptions::default()
        });
        let ast = parser.parse("r\"a b\"");
        let v = variable(condition(&ast).value());
        assert_eq!(v.prefix().unwrap().value, "r");
        assert_eq!(v.pos(), Position::new(0, 6));

        // Not glued to the quote, so two conditions.
        assert!(matches!(parser.parse("r \"a\""), Node::Expression(_)));
    }

    #[test]
    fn regex_value() {
        let ast = parse("/a.b/i");
        let v = variable(condition(&ast).value());
        assert!(v.is_regex());
        assert_eq!(v.text(), "a.b");
        assert_eq!(v.quote().unwrap().flags.as_ref().unwrap().value, "i");
        assert_eq!(v.pos(), Position::new(0, 6));
    }

    #[test]
    fn unterminated_regex() {
        let ast = parse("/ab");
        let v = variable(condition(&ast).value());
        assert_eq!(
            error_at(&v.quote().unwrap().right),
            (vec![TokenType::Regex], 3)
        );
    }

    #[test]
    fn array_value() {
        let ast = parse("[a \"b c\"]");
        let ConditionValue::Array(array) = condition(&ast).value() else {
            panic!("expected array");
        };
        assert_eq!(array.values().len(), 2);
        assert_eq!(array.pos(), Position::new(0, 9));
        assert!(array.is_valid());
    }

    #[test]
    fn unterminated_array() {
        let ast = parse("[a");
        let ConditionValue::Array(array) = condition(&ast).value() else {
            panic!("expected array");
        };
        assert_eq!(
            error_at(&array.bracket().right),
            (vec![TokenType::BracketR], 2)
        );
    }

    #[test]
    fn custom_property_operator() {
        let ast = property_parser().parse("a>=b");
        let c = condition(&ast);
        assert_eq!(c.property().unwrap().text(), Some("a"));
        let op = c.property_operator().unwrap().as_valid().unwrap();
        assert_eq!((op.kind, op.value.as_str()), (TokenType::OpCustom, ">="));
        assert_eq!(variable(c.value()).text(), "b");
        assert!(c.is_valid());
        assert_eq!(c.pos(), Position::new(0, 4));
    }

    #[test]
    fn missing_property() {
        let ast = property_parser().parse("=a");
        let c = condition(&ast);
        assert!(matches!(c.property(), Some(PropertyNode::Error(e)) if e.pos.start == 0));
        assert!(!c.is_valid());
    }

    #[test]
    fn missing_property_value() {
        let ast = property_parser().parse("a=");
        let c = condition(&ast);
        assert!(matches!(c.value(), ConditionValue::Error(e) if e.pos.start == 2));
    }

    #[test]
    fn expanded_property_operator() {
        let ast = property_parser().parse("a:op:b");
        let c = condition(&ast);
        let sep = c.sep().unwrap();
        assert_eq!(sep.left.as_ref().unwrap().pos(), Position::new(1, 2));
        assert_eq!(sep.right.as_ref().unwrap().pos(), Position::new(4, 5));
        let op = c.property_operator().unwrap().as_valid().unwrap();
        assert_eq!((op.kind, op.value.as_str()), (TokenType::Value, "op"));
        assert!(c.is_valid());
    }

    #[test]
    fn expanded_operator_missing() {
        let ast = property_parser().parse("a::b");
        let c = condition(&ast);
        assert_eq!(
            error_at(c.property_operator().unwrap()),
            (vec![TokenType::Value], 2)
        );
        assert_eq!(variable(c.value()).text(), "b");
    }

    #[test]
    fn expanded_right_separator_missing() {
        let ast = property_parser().parse("a:op");
        let c = condition(&ast);
        let sep = c.sep().unwrap();
        assert_eq!(
            error_at(sep.right.as_ref().unwrap()),
            (vec![TokenType::OpExpandedSep], 4)
        );
        assert!(matches!(c.value(), ConditionValue::Error(e) if e.pos.start == 4));
    }

    #[test]
    fn expanded_trailing_separator() {
        let ast = property_parser().parse("a:");
        let c = condition(&ast);
        assert_eq!(
            error_at(c.property_operator().unwrap()),
            (vec![TokenType::Value], 2)
        );
        assert!(matches!(c.value(), ConditionValue::Error(_)));
    }

    #[test]
    fn expanded_operator_with_group_value() {
        let ast = property_parser().parse("a:op(b c=d)");
        let c = condition(&ast);
        assert!(c.sep().unwrap().right.is_none());
        let ConditionValue::Group(g) = c.value() else {
            panic!("expected group value");
        };
        assert_eq!(g.pos(), Position::new(4, 11));
        // The property value parser knows no property operators.
        let inner = expression(g.expression());
        assert_eq!(inner.left().pos(), Position::new(5, 6));
        let right = condition(inner.right());
        assert!(right.property().is_none());
        assert_eq!(variable(right.value()).text(), "c=d");
        assert_eq!(right.pos(), Position::new(7, 10));
    }

    #[test]
    fn unterminated_value_group() {
        let ast = property_parser().parse("a=(b");
        let c = condition(&ast);
        let ConditionValue::Group(g) = c.value() else {
            panic!("expected group value");
        };
        assert_eq!(
            error_at(&g.paren().unwrap().right),
            (vec![TokenType::ParenR], 4)
        );
    }

    #[test]
    fn unterminated_array_property_value() {
        let ast = property_parser().parse("a=[b c");
        let c = condition(&ast);
        assert_eq!(c.property().and_then(PropertyNode::text), Some("a"));
        let ConditionValue::Array(array) = c.value() else {
            panic!("expected array value");
        };
        assert_eq!(array.values().len(), 2);
        assert_eq!(
            error_at(&array.bracket().right),
            (vec![TokenType::BracketR], 6)
        );
        assert!(!c.is_valid());
    }

    #[test]
    fn separator_doubles_as_custom_operator() {
        let parser = parser(ParserOptions {
            expanded_property_separator: Some(":".into()),
            custom_property_operators: Some(vec![":".into()]),
            ..ParserOptions::default()
        });
        let ast = parser.parse("a:b");
        let c = condition(&ast);
        assert!(c.sep().is_none());
        let op = c.property_operator().unwrap().as_valid().unwrap();
        assert_eq!(op.kind, TokenType::OpCustom);
        assert!(c.is_valid());

        let ast = parser.parse("a:op:b");
        let expanded = condition(&ast);
        assert!(expanded.sep().is_some());
    }

    #[test]
    fn conditional_regex_values() {
        let parser = parser(ParserOptions {
            custom_property_operators: Some(vec!["=".into()]),
            regex_values: ValuePolicy::when(|property, _| property == Some("path")),
            ..ParserOptions::default()
        });
        let ast = parser.parse("path=/a/");
        let allowed = condition(&ast);
        assert!(variable(allowed.value()).is_regex());

        let ast = parser.parse("name=/a/");
        let rejected = variable(condition(&ast).value());
        assert!(!rejected.is_regex());
        assert_eq!(rejected.text(), "/a/");
        assert_eq!(rejected.pos(), Position::new(5, 8));
    }

    #[test]
    fn conditional_array_values() {
        let parser = parser(ParserOptions {
            custom_property_operators: Some(vec!["=".into()]),
            array_values: ValuePolicy::when(|_, operator| operator == Some("=")),
            ..ParserOptions::default()
        });
        let ast = parser.parse("[a b] || x=[c]");
        let expr = expression(&ast);
        let rejected = variable(condition(expr.left()).value());
        assert_eq!(rejected.text(), "[a b]");
        assert!(matches!(condition(expr.right()).value(), ConditionValue::Array(_)));
    }

    #[test]
    fn property_value_parser_is_memoized() {
        let parser = property_parser();
        let first = parser.property_value_parser();
        let second = parser.property_value_parser();
        assert!(ptr::eq(first, second));
        assert!(first.options().custom_property_operators.is_none());

        let plain = Parser::default();
        assert!(ptr::eq(plain.property_value_parser(), &plain));
    }

    #[test]
    fn invalid_options_rejected() {
        let options = ParserOptions {
            custom_property_operators: Some(vec!["&&".into()]),
            ..ParserOptions::default()
        };
        assert!(matches!(
            Parser::new(options),
            Err(OptionsError::ConflictingOperator { .. })
        ));
    }

    #[test]
    fn repeated_parses_are_independent() {
        let parser = property_parser();
        let first = parser.parse("a=(b) && c");
        let _ = parser.parse(")))");
        assert_eq!(parser.parse("a=(b) && c"), first);
    }

    const SAMPLES: &[&str] = &[
        "",
        "a",
        "a || b && !c",
        "(a || \"b c\") && [d 'e']",
        "a:op:b",
        "a:op(b || c)",
        "x>=\"1\" && /re/gi",
        "!!(a)",
        "a)",
        "((a",
        "a b",
        "\"unterminated",
        "a=",
        "=b",
        "a::",
        "[a \"b",
        "not",
        "a(b c)",
    ];

    #[test]
    fn valid_trees_reconstruct_input() {
        let parser = property_parser();
        for input in SAMPLES {
            let ast = parser.parse(input);
            if !ast.is_valid() {
                continue;
            }
            for token in flatten(&ast) {
                let TokenRef::Valid(token) = token else {
                    panic!("valid tree holds an error token: {input}");
                };
                assert_eq!(
                    &input[token.pos.start..token.pos.end],
                    token.value,
                    "{input}"
                );
            }
        }
    }

    #[test]
    fn validity_matches_error_tokens() {
        let parser = property_parser();
        for input in SAMPLES {
            let ast = parser.parse(input);
            let has_error = flatten(&ast).iter().any(|t| !t.is_valid());
            assert_eq!(ast.is_valid(), !has_error, "{input}");
        }
    }

    #[test]
    fn tokens_are_ordered_and_in_bounds() {
        let parser = property_parser();
        for input in SAMPLES {
            let ast = parser.parse(input);
            let tokens = flatten(&ast);
            for pair in tokens.windows(2) {
                assert!(pair[0].pos().end <= pair[1].pos().start, "{input}");
            }
            for token in tokens {
                assert!(token.pos().end <= input.len(), "{input}");
            }
        }
    }
}
