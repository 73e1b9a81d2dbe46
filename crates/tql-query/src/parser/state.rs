//! Per-parse cursor over the token stream, and the boolean expression grammar.

use tracing::debug;

use super::{LexResult, Parser, condition};
use crate::{
    ast::{
        AnyToken, ConditionNode, ConditionParts, ConditionValue, ErrorToken, ExpressionNode,
        GroupNode, GroupPrefix, Node, Parens, Position, TokenType, ValidToken, VariableNode,
    },
    options::{MissingOperator, ParserOptions},
    token::{Category, Token, TokenKind},
};

/// Property and operator of the condition whose value is being parsed. Fed to the regex and
/// array value predicates, and inherited by the parse of a property value group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueContext {
    /// Unquoted property text.
    pub property: Option<String>,
    /// Property operator text.
    pub operator: Option<String>,
}

/// State of a single parse. Created fresh for every call.
pub(super) struct ParseState<'p> {
    /// The parser being run.
    pub(super) parser: &'p Parser,
    /// The lexed text, including any balancing parens.
    raw: &'p str,
    /// Token stream.
    tokens: &'p [Token],
    /// Index of the next token.
    index: usize,
    /// Number of balancing parens prepended to `raw`.
    shift: usize,
    /// Offset of this text in the caller's input.
    offset: usize,
    /// End of the last consumed token, in original coordinates.
    last_end: Option<usize>,
    /// Inherited value context.
    pub(super) context: ValueContext,
}

impl<'p> ParseState<'p> {
    /// Creates the state for one lexed text.
    pub(super) fn new(
        parser: &'p Parser,
        lexed: &'p LexResult,
        offset: usize,
        context: ValueContext,
    ) -> Self {
        Self {
            parser,
            raw: &lexed.raw_input,
            tokens: &lexed.tokens,
            index: 0,
            shift: lexed.shift,
            offset,
            last_end: None,
            context,
        }
    }

    /// Parser options.
    pub(super) fn options(&self) -> &'p ParserOptions {
        &self.parser.options
    }

    /// Maps an offset in `raw` to the caller's input.
    pub(super) fn to_original(&self, local: usize) -> usize {
        self.offset + local.saturating_sub(self.shift)
    }

    /// Maps an offset in the caller's input to `raw`.
    fn to_local(&self, original: usize) -> usize {
        original.saturating_sub(self.offset) + self.shift
    }

    /// Raw text covering an original-coordinate span.
    pub(super) fn slice(&self, pos: Position) -> &'p str {
        self.raw
            .get(self.to_local(pos.start)..self.to_local(pos.end))
            .unwrap_or_default()
    }

    /// Length of the lexed text.
    pub(super) const fn raw_len(&self) -> usize {
        self.raw.len()
    }

    /// Lexed text between two local offsets.
    pub(super) fn raw_slice(&self, start: usize, end: usize) -> &'p str {
        self.raw.get(start..end).unwrap_or_default()
    }

    /// The next token.
    pub(super) fn peek(&self) -> Option<&'p Token> {
        self.tokens.get(self.index)
    }

    /// The token `n` positions after the next one.
    pub(super) fn peek_at(&self, n: usize) -> Option<&'p Token> {
        self.tokens.get(self.index + n)
    }

    /// Kind of the next token.
    pub(super) fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    /// Returns true if the next token belongs to `category`.
    pub(super) fn peek_is(&self, category: Category) -> bool {
        self.peek().is_some_and(|t| t.kind.is(category))
    }

    /// Tokens from `from` onwards.
    pub(super) fn remaining_from(&self, from: usize) -> &'p [Token] {
        self.tokens.get(from..).unwrap_or_default()
    }

    /// Index of the next token.
    pub(super) const fn index(&self) -> usize {
        self.index
    }

    /// Converts a lexer token into an AST token.
    pub(super) fn valid(&self, token: &Token) -> ValidToken {
        ValidToken::new(
            token.kind.token_type(),
            token.value.clone(),
            Position::new(self.to_original(token.start), self.to_original(token.end)),
        )
    }

    /// Consumes `token`, which must be the next token.
    pub(super) fn consume(&mut self, token: &Token) -> ValidToken {
        let valid = self.valid(token);
        self.index += 1;
        self.last_end = Some(valid.pos.end);
        valid
    }

    /// Consumes the next token if it has `kind`.
    pub(super) fn take(&mut self, kind: TokenKind) -> Option<ValidToken> {
        let token = self.peek().filter(|t| t.kind == kind)?;
        Some(self.consume(token))
    }

    /// Consumes the next token if it belongs to `category`.
    fn take_category(&mut self, category: Category) -> Option<ValidToken> {
        let token = self.peek().filter(|t| t.kind.is(category))?;
        Some(self.consume(token))
    }

    /// Skips to token `index`, which lies at or beyond the next token.
    pub(super) const fn jump_to(&mut self, index: usize) {
        self.index = index;
    }

    /// Records the end of a span consumed by a nested parse.
    pub(super) const fn set_last_end(&mut self, end: usize) {
        self.last_end = Some(end);
    }

    /// Where a missing token would go: after the last consumed token, else before the next
    /// one, else at the start of the text.
    pub(super) fn gap(&self) -> usize {
        self.last_end
            .or_else(|| self.peek().map(|t| self.to_original(t.start)))
            .unwrap_or(self.offset)
    }

    /// An error token at the gap.
    pub(super) fn missing(&self, expected: &[TokenType]) -> ErrorToken {
        ErrorToken::new(expected, self.gap())
    }

    /// A zero-width token with empty text at the gap.
    pub(super) fn synthetic(&self, kind: TokenType) -> ValidToken {
        ValidToken::new(kind, "", Position::empty(self.gap()))
    }

    /// A plain unquoted variable covering `pos`, holding its raw text.
    pub(super) fn literal(&self, pos: Position) -> VariableNode {
        let token = ValidToken::new(TokenType::Value, self.slice(pos), pos);
        VariableNode::new(None, AnyToken::Valid(token), None)
    }

    /// Parses: query → or_expr
    pub(super) fn parse_query(&mut self) -> Node {
        let node = self.parse_or();
        while let Some(token) = self.peek() {
            debug!(kind = ?token.kind, start = token.start, "skipping unexpected token");
            self.index += 1;
        }
        node
    }

    /// Parses: or_expr → and_expr ((OR | implicit-or) and_expr)*
    pub(super) fn parse_or(&mut self) -> Node {
        let mut left = self.parse_and();
        loop {
            let operator = if let Some(op) = self.take_category(Category::Or) {
                op
            } else if self.options().on_missing_boolean_operator == MissingOperator::Or
                && self.peek_is(Category::ConditionStart)
            {
                self.synthetic(TokenType::OpOr)
            } else {
                break;
            };
            let right = self.parse_and();
            left = Node::Expression(ExpressionNode::new(left, AnyToken::Valid(operator), right));
        }
        left
    }

    /// Parses: and_expr → not_expr ((AND | implicit-and | missing-op) not_expr)*
    fn parse_and(&mut self) -> Node {
        let mut left = self.parse_operand();
        loop {
            let operator = if let Some(op) = self.take_category(Category::And) {
                AnyToken::Valid(op)
            } else if self.peek_is(Category::ConditionStart) {
                match self.options().on_missing_boolean_operator {
                    MissingOperator::And => AnyToken::Valid(self.synthetic(TokenType::OpAnd)),
                    MissingOperator::Error => {
                        AnyToken::Error(self.missing(&[TokenType::OpAnd, TokenType::OpOr]))
                    }
                    MissingOperator::Or => break,
                }
            } else {
                break;
            };
            let right = self.parse_operand();
            left = Node::Expression(ExpressionNode::new(left, operator, right));
        }
        left
    }

    /// An operand of a boolean operator, or the error for a missing one.
    fn parse_operand(&mut self) -> Node {
        if self.peek_is(Category::ConditionStart) {
            self.parse_not()
        } else {
            Node::Error(self.missing(&[TokenType::Value]))
        }
    }

    /// Parses: not_expr → NOT not_expr | NOT <missing> | atom
    fn parse_not(&mut self) -> Node {
        let Some(not) = self.take_category(Category::Not) else {
            return self.parse_atom();
        };
        if !self.peek_is(Category::ConditionStart) {
            let mut parts =
                ConditionParts::new(ConditionValue::Error(self.missing(&[TokenType::Value])));
            parts.operator = Some(not);
            return Node::Condition(ConditionNode::from_parts(parts));
        }
        negate(not, self.parse_not())
    }

    /// Parses: atom → "(" or_expr ")" | condition
    fn parse_atom(&mut self) -> Node {
        if self.peek_kind() == Some(TokenKind::ParenL) {
            Node::Group(self.parse_group(None))
        } else {
            condition::parse_condition(self)
        }
    }

    /// Parses a parenthesized group starting at the next `(`.
    pub(super) fn parse_group(&mut self, prefix: Option<GroupPrefix>) -> GroupNode {
        let left = match self.peek() {
            // Parens prepended to balance excess `)` have no place in the input.
            Some(open) if open.end <= self.shift => {
                self.consume(open);
                None
            }
            Some(open) => Some(self.consume(open)),
            None => None,
        };
        let expression = self.parse_or();
        let right = match self.take(TokenKind::ParenR) {
            Some(close) => AnyToken::Valid(close),
            None => AnyToken::Error(self.missing(&[TokenType::ParenR])),
        };
        GroupNode::new(prefix, expression, Some(Parens { left, right }))
    }
}

/// Applies a NOT keyword to an already parsed operand.
fn negate(not: ValidToken, inner: Node) -> Node {
    match inner {
        Node::Condition(condition) if condition.operator().is_none() => {
            let mut parts = condition.into_parts();
            parts.operator = Some(not);
            Node::Condition(ConditionNode::from_parts(parts))
        }
        Node::Group(group) if group.prefix().is_none() && group.paren().is_some() => {
            let (_, expression, paren) = group.into_parts();
            Node::Group(GroupNode::new(Some(GroupPrefix::Not(not)), expression, paren))
        }
        other => Node::Group(GroupNode::new(Some(GroupPrefix::Not(not)), other, None)),
    }
}
