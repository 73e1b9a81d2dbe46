//! Query abstract syntax tree.
//!
//! Every node and token carries a [`Position`], including tokens the parser synthesized to
//! stand in for missing input. Nodes are built bottom-up through their `new`/`from_parts`
//! constructors, which compute the span and the `valid` flag once from the children. Node
//! fields are private and read through accessors, so a finished tree cannot be changed in
//! place.

use std::fmt;

use serde::Serialize;

/// Half-open byte range `[start, end)` into the original input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Position {
    /// First byte covered.
    pub start: usize,
    /// One past the last byte covered.
    pub end: usize,
}

impl Position {
    /// Creates a position.
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// A zero-width position at `at`.
    pub const fn empty(at: usize) -> Self {
        Self { start: at, end: at }
    }

    /// Returns true for zero-width positions.
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Length in bytes.
    pub const fn len(&self) -> usize {
        self.end - self.start
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Token type as seen by consumers of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenType {
    /// Any value text: unquoted, quoted body, regex body, regex flags, property operator word.
    Value,
    /// `"`
    DoubleQuote,
    /// `'`
    SingleQuote,
    /// `` ` ``
    Backtick,
    /// The regex delimiter `/`.
    Regex,
    /// AND keyword.
    OpAnd,
    /// OR keyword.
    OpOr,
    /// NOT keyword.
    OpNot,
    /// `(`
    ParenL,
    /// `)`
    ParenR,
    /// `[`
    BracketL,
    /// `]`
    BracketR,
    /// The expanded property separator.
    OpExpandedSep,
    /// A custom property operator.
    OpCustom,
}

impl TokenType {
    /// Returns true for the three quote types.
    pub const fn is_quote(self) -> bool {
        matches!(self, Self::DoubleQuote | Self::SingleQuote | Self::Backtick)
    }

    /// Returns true for parens and brackets.
    pub const fn is_paren(self) -> bool {
        matches!(
            self,
            Self::ParenL | Self::ParenR | Self::BracketL | Self::BracketR
        )
    }
}

/// A token matched from the input (or synthesized with empty text, e.g. an implicit AND).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidToken {
    /// Token type.
    #[serde(rename = "token")]
    pub kind: TokenType,
    /// Raw, still-escaped text.
    pub value: String,
    /// Source range.
    pub pos: Position,
}

impl ValidToken {
    /// Creates a token.
    pub fn new(kind: TokenType, value: impl Into<String>, pos: Position) -> Self {
        Self {
            kind,
            value: value.into(),
            pos,
        }
    }
}

/// A required token that is missing. Always zero-width.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorToken {
    /// The token types that would fix the input at this exact position.
    pub expected: Vec<TokenType>,
    /// Zero-width position where the token is missing.
    pub pos: Position,
}

impl ErrorToken {
    /// Creates an error token at `at`.
    pub fn new(expected: &[TokenType], at: usize) -> Self {
        Self {
            expected: expected.to_vec(),
            pos: Position::empty(at),
        }
    }

    /// Returns true if any expected type is a quote.
    pub fn expects_quote(&self) -> bool {
        self.expected.iter().any(|t| t.is_quote())
    }

    /// Returns true if any expected type is a paren or bracket.
    pub fn expects_paren(&self) -> bool {
        self.expected.iter().any(|t| t.is_paren())
    }
}

/// Either a matched token or a missing one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum AnyToken {
    /// A matched token.
    Valid(ValidToken),
    /// A missing token.
    Error(ErrorToken),
}

impl AnyToken {
    /// Source range.
    pub fn pos(&self) -> Position {
        match self {
            Self::Valid(t) => t.pos,
            Self::Error(t) => t.pos,
        }
    }

    /// Returns true for matched tokens.
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// The matched token, if any.
    pub fn as_valid(&self) -> Option<&ValidToken> {
        match self {
            Self::Valid(t) => Some(t),
            Self::Error(_) => None,
        }
    }
}

/// Quotes (or regex delimiters) around a variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotePair {
    /// Opening quote.
    pub left: ValidToken,
    /// Closing quote, an error if the input ended first.
    pub right: AnyToken,
    /// Regex flags after the closing delimiter.
    pub flags: Option<ValidToken>,
}

/// A string value, optionally quoted and optionally carrying a string prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableNode {
    /// Prefix glued to the opening quote (`r` in `r"x"`).
    prefix: Option<ValidToken>,
    /// The value text.
    value: AnyToken,
    /// Quotes, when quoted.
    quote: Option<QuotePair>,
    /// Source range.
    pos: Position,
    /// True if no error token exists below this node.
    valid: bool,
}

impl VariableNode {
    /// Builds a variable, computing its span and validity.
    pub fn new(prefix: Option<ValidToken>, value: AnyToken, quote: Option<QuotePair>) -> Self {
        let start = prefix
            .as_ref()
            .map(|p| p.pos.start)
            .or_else(|| quote.as_ref().map(|q| q.left.pos.start))
            .unwrap_or_else(|| value.pos().start);
        let end = quote
            .as_ref()
            .map(|q| q.flags.as_ref().map_or(q.right.pos().end, |f| f.pos.end))
            .unwrap_or_else(|| value.pos().end);
        let valid = value.is_valid() && quote.as_ref().is_none_or(|q| q.right.is_valid());
        Self {
            prefix,
            value,
            quote,
            pos: Position::new(start, end),
            valid,
        }
    }

    /// Returns true for regex literals.
    pub fn is_regex(&self) -> bool {
        self.quote
            .as_ref()
            .is_some_and(|q| q.left.kind == TokenType::Regex)
    }

    /// Prefix glued to the opening quote.
    pub const fn prefix(&self) -> Option<&ValidToken> {
        self.prefix.as_ref()
    }

    /// The value token.
    pub const fn value(&self) -> &AnyToken {
        &self.value
    }

    /// Quotes or regex delimiters.
    pub const fn quote(&self) -> Option<&QuotePair> {
        self.quote.as_ref()
    }

    /// Source range.
    pub const fn pos(&self) -> Position {
        self.pos
    }

    /// True if no error token exists below this node.
    pub const fn is_valid(&self) -> bool {
        self.valid
    }

    /// The raw value text, empty if the value is missing.
    pub fn text(&self) -> &str {
        self.value.as_valid().map_or("", |t| t.value.as_str())
    }
}

/// Property slot of a condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum PropertyNode {
    /// A property name.
    Variable(VariableNode),
    /// Property missing before an operator.
    Error(ErrorToken),
}

impl PropertyNode {
    /// Source range.
    pub fn pos(&self) -> Position {
        match self {
            Self::Variable(v) => v.pos,
            Self::Error(e) => e.pos,
        }
    }

    /// Validity.
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Variable(v) => v.valid,
            Self::Error(_) => false,
        }
    }

    /// Property text, if present.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Variable(v) => Some(v.text()),
            Self::Error(_) => None,
        }
    }
}

/// Separators of the expanded property syntax (`prop:op:value`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Separators {
    /// Between property and operator.
    pub left: Option<AnyToken>,
    /// Between operator and value; absent before a group or array value.
    pub right: Option<AnyToken>,
}

impl Separators {
    /// Validity of both separators.
    fn is_valid(&self) -> bool {
        [&self.left, &self.right]
            .into_iter()
            .flatten()
            .all(AnyToken::is_valid)
    }
}

/// The value of a condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum ConditionValue {
    /// A plain, quoted or regex value.
    Variable(VariableNode),
    /// An array literal.
    Array(ArrayNode),
    /// A parenthesized value list of a property condition.
    Group(GroupNode),
    /// Value missing.
    Error(ErrorToken),
}

impl ConditionValue {
    /// Source range.
    pub fn pos(&self) -> Position {
        match self {
            Self::Variable(v) => v.pos,
            Self::Array(a) => a.pos,
            Self::Group(g) => g.pos,
            Self::Error(e) => e.pos,
        }
    }

    /// Validity.
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Variable(v) => v.valid,
            Self::Array(a) => a.valid,
            Self::Group(g) => g.valid,
            Self::Error(_) => false,
        }
    }
}

/// The pieces of a condition, before span and validity are computed.
#[derive(Debug, Clone)]
pub struct ConditionParts {
    /// NOT keyword.
    pub operator: Option<ValidToken>,
    /// Property.
    pub property: Option<PropertyNode>,
    /// Expanded separators.
    pub sep: Option<Separators>,
    /// Property operator (expanded operator word or custom operator).
    pub property_operator: Option<AnyToken>,
    /// Value.
    pub value: ConditionValue,
}

impl ConditionParts {
    /// Parts for a bare value.
    pub fn new(value: ConditionValue) -> Self {
        Self {
            operator: None,
            property: None,
            sep: None,
            property_operator: None,
            value,
        }
    }
}

/// A boolean-valued condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConditionNode {
    /// NOT keyword.
    operator: Option<ValidToken>,
    /// Property.
    property: Option<PropertyNode>,
    /// Expanded separators.
    sep: Option<Separators>,
    /// Property operator.
    property_operator: Option<AnyToken>,
    /// Value.
    value: ConditionValue,
    /// Source range.
    pos: Position,
    /// True if no error token exists below this node and the property parts are complete.
    valid: bool,
}

impl ConditionNode {
    /// Builds a condition from its parts.
    pub fn from_parts(parts: ConditionParts) -> Self {
        let ConditionParts {
            operator,
            property,
            sep,
            property_operator,
            value,
        } = parts;

        let start = operator
            .as_ref()
            .map(|t| t.pos.start)
            .or_else(|| property.as_ref().map(PropertyNode::pos).map(|p| p.start))
            .or_else(|| {
                sep.as_ref()
                    .and_then(|s| s.left.as_ref())
                    .map(|t| t.pos().start)
            })
            .or_else(|| property_operator.as_ref().map(|t| t.pos().start))
            .unwrap_or_else(|| value.pos().start);
        let end = value.pos().end;

        let well_formed = property.is_some() == property_operator.is_some();
        let valid = well_formed
            && value.is_valid()
            && property.as_ref().is_none_or(PropertyNode::is_valid)
            && property_operator.as_ref().is_none_or(AnyToken::is_valid)
            && sep.as_ref().is_none_or(Separators::is_valid);

        Self {
            operator,
            property,
            sep,
            property_operator,
            value,
            pos: Position::new(start, end),
            valid,
        }
    }

    /// Splits the condition back into its parts.
    pub fn into_parts(self) -> ConditionParts {
        ConditionParts {
            operator: self.operator,
            property: self.property,
            sep: self.sep,
            property_operator: self.property_operator,
            value: self.value,
        }
    }

    /// NOT keyword.
    pub const fn operator(&self) -> Option<&ValidToken> {
        self.operator.as_ref()
    }

    /// Property.
    pub const fn property(&self) -> Option<&PropertyNode> {
        self.property.as_ref()
    }

    /// Expanded separators.
    pub const fn sep(&self) -> Option<&Separators> {
        self.sep.as_ref()
    }

    /// Property operator.
    pub const fn property_operator(&self) -> Option<&AnyToken> {
        self.property_operator.as_ref()
    }

    /// Value.
    pub const fn value(&self) -> &ConditionValue {
        &self.value
    }

    /// Source range.
    pub const fn pos(&self) -> Position {
        self.pos
    }

    /// True if no error token exists below this node and the property parts are complete.
    pub const fn is_valid(&self) -> bool {
        self.valid
    }
}

/// A binary boolean combination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpressionNode {
    /// Left side.
    left: Box<Node>,
    /// AND/OR keyword, implicit operator, or the error for a missing one.
    operator: AnyToken,
    /// Right side.
    right: Box<Node>,
    /// Source range.
    pos: Position,
    /// True if no error token exists below this node.
    valid: bool,
}

impl ExpressionNode {
    /// Builds an expression.
    pub fn new(left: Node, operator: AnyToken, right: Node) -> Self {
        let pos = Position::new(left.pos().start, right.pos().end);
        let valid = operator.is_valid() && left.is_valid() && right.is_valid();
        Self {
            left: Box::new(left),
            operator,
            right: Box::new(right),
            pos,
            valid,
        }
    }

    /// Left side.
    pub fn left(&self) -> &Node {
        &self.left
    }

    /// AND/OR keyword, implicit operator, or the error for a missing one.
    pub const fn operator(&self) -> &AnyToken {
        &self.operator
    }

    /// Right side.
    pub fn right(&self) -> &Node {
        &self.right
    }

    /// Source range.
    pub const fn pos(&self) -> Position {
        self.pos
    }

    /// True if no error token exists below this node.
    pub const fn is_valid(&self) -> bool {
        self.valid
    }
}

/// What precedes a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum GroupPrefix {
    /// A condition applied to every variable inside the group.
    Condition(Box<ConditionNode>),
    /// A NOT keyword.
    Not(ValidToken),
}

impl GroupPrefix {
    /// Source range.
    pub fn pos(&self) -> Position {
        match self {
            Self::Condition(c) => c.pos,
            Self::Not(t) => t.pos,
        }
    }

    /// Validity.
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Condition(c) => c.valid,
            Self::Not(_) => true,
        }
    }
}

/// Parentheses around a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parens {
    /// Opening paren; `None` when it was inserted to balance an excess `)`.
    pub left: Option<ValidToken>,
    /// Closing paren.
    pub right: AnyToken,
}

/// A parenthesized expression, or a paren-less NOT applied to another group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupNode {
    /// Prefix condition or NOT.
    prefix: Option<GroupPrefix>,
    /// Inner expression.
    expression: Box<Node>,
    /// Parentheses, absent for stacked NOTs.
    paren: Option<Parens>,
    /// Source range.
    pos: Position,
    /// True if no error token exists below this node.
    valid: bool,
}

impl GroupNode {
    /// Builds a group.
    pub fn new(prefix: Option<GroupPrefix>, expression: Node, paren: Option<Parens>) -> Self {
        let start = prefix
            .as_ref()
            .map(GroupPrefix::pos)
            .or_else(|| {
                paren
                    .as_ref()
                    .and_then(|p| p.left.as_ref())
                    .map(|t| t.pos)
            })
            .unwrap_or_else(|| expression.pos())
            .start;
        let end = paren
            .as_ref()
            .map_or_else(|| expression.pos().end, |p| p.right.pos().end);
        let valid = expression.is_valid()
            && prefix.as_ref().is_none_or(GroupPrefix::is_valid)
            && paren.as_ref().is_none_or(|p| p.right.is_valid());
        Self {
            prefix,
            expression: Box::new(expression),
            paren,
            pos: Position::new(start, end),
            valid,
        }
    }

    /// Splits the group back into prefix, expression and parens.
    pub fn into_parts(self) -> (Option<GroupPrefix>, Node, Option<Parens>) {
        (self.prefix, *self.expression, self.paren)
    }

    /// Prefix condition or NOT.
    pub const fn prefix(&self) -> Option<&GroupPrefix> {
        self.prefix.as_ref()
    }

    /// Inner expression.
    pub fn expression(&self) -> &Node {
        &self.expression
    }

    /// Parentheses.
    pub const fn paren(&self) -> Option<&Parens> {
        self.paren.as_ref()
    }

    /// Source range.
    pub const fn pos(&self) -> Position {
        self.pos
    }

    /// True if no error token exists below this node.
    pub const fn is_valid(&self) -> bool {
        self.valid
    }
}

/// Brackets around an array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Brackets {
    /// `[`
    pub left: ValidToken,
    /// `]`, an error if the input ended first.
    pub right: AnyToken,
}

/// A bracketed list of literal values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArrayNode {
    /// Elements.
    values: Vec<VariableNode>,
    /// Brackets.
    bracket: Brackets,
    /// Source range.
    pos: Position,
    /// True if no error token exists below this node.
    valid: bool,
}

impl ArrayNode {
    /// Builds an array.
    pub fn new(left: ValidToken, values: Vec<VariableNode>, right: AnyToken) -> Self {
        let pos = Position::new(left.pos.start, right.pos().end);
        let valid = right.is_valid() && values.iter().all(|v| v.valid);
        Self {
            values,
            bracket: Brackets { left, right },
            pos,
            valid,
        }
    }

    /// Elements.
    pub fn values(&self) -> &[VariableNode] {
        &self.values
    }

    /// Brackets.
    pub const fn bracket(&self) -> &Brackets {
        &self.bracket
    }

    /// Source range.
    pub const fn pos(&self) -> Position {
        self.pos
    }

    /// True if no error token exists below this node.
    pub const fn is_valid(&self) -> bool {
        self.valid
    }
}

/// Result of a parse: the root of the tree, or any sub-expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum Node {
    /// Binary boolean expression.
    Expression(ExpressionNode),
    /// Condition.
    Condition(ConditionNode),
    /// Group.
    Group(GroupNode),
    /// A missing condition.
    Error(ErrorToken),
}

impl Node {
    /// Source range.
    pub fn pos(&self) -> Position {
        match self {
            Self::Expression(n) => n.pos,
            Self::Condition(n) => n.pos,
            Self::Group(n) => n.pos,
            Self::Error(e) => e.pos,
        }
    }

    /// True if no error token exists anywhere in this subtree.
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Expression(n) => n.valid,
            Self::Condition(n) => n.valid,
            Self::Group(n) => n.valid,
            Self::Error(_) => false,
        }
    }
}
