//! Lexer token kinds and their categories.

use serde::Serialize;

use crate::ast::TokenType;

/// The three quote characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteKind {
    /// `"`
    Double,
    /// `'`
    Single,
    /// `` ` ``
    Backtick,
}

impl QuoteKind {
    /// All quote kinds, in matcher order.
    pub const ALL: [Self; 3] = [Self::Double, Self::Single, Self::Backtick];

    /// The quote character.
    pub const fn char(self) -> char {
        match self {
            Self::Double => '"',
            Self::Single => '\'',
            Self::Backtick => '`',
        }
    }

    /// The quote kind for a character, if it is a quote.
    pub const fn from_char(ch: char) -> Option<Self> {
        match ch {
            '"' => Some(Self::Double),
            '\'' => Some(Self::Single),
            '`' => Some(Self::Backtick),
            _ => None,
        }
    }

    /// The quote kind of an AST token type, if it is a quote.
    pub const fn from_token_type(kind: TokenType) -> Option<Self> {
        match kind {
            TokenType::DoubleQuote => Some(Self::Double),
            TokenType::SingleQuote => Some(Self::Single),
            TokenType::Backtick => Some(Self::Backtick),
            _ => None,
        }
    }

    /// The AST token type of this quote.
    pub const fn token_type(self) -> TokenType {
        match self {
            Self::Double => TokenType::DoubleQuote,
            Self::Single => TokenType::SingleQuote,
            Self::Backtick => TokenType::Backtick,
        }
    }
}

/// Whether a keyword is written as a symbol or a word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorStyle {
    /// `&&`, `||`, `!`: terminate unquoted values.
    Symbol,
    /// `and`, `or`, `not`: must be delimited like any other value.
    Word,
}

/// Concrete lexer token kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Whitespace. Matched and skipped.
    Whitespace,
    /// Unquoted value text.
    Value,
    /// Body of a quoted value.
    QuotedValue(QuoteKind),
    /// An opening or closing quote.
    Quote(QuoteKind),
    /// An opening or closing `/`.
    RegexDelimiter,
    /// Body of a regex.
    RegexBody,
    /// Letters directly after a closing regex delimiter.
    RegexFlags,
    /// `(`
    ParenL,
    /// `)`
    ParenR,
    /// `[`
    BracketL,
    /// `]`
    BracketR,
    /// AND keyword.
    And(OperatorStyle),
    /// OR keyword.
    Or(OperatorStyle),
    /// NOT keyword.
    Not(OperatorStyle),
    /// Expanded property separator.
    ExpandedSep,
    /// Custom property operator.
    CustomOp,
}

/// Abstract token categories the parser matches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Value text of any kind.
    Value,
    /// Any quote.
    Quote,
    /// AND or OR.
    Boolean,
    /// AND.
    And,
    /// OR.
    Or,
    /// NOT.
    Not,
    /// Separator or custom operator.
    PropertyOperator,
    /// Anything that can begin a condition or group.
    ConditionStart,
    /// `(`
    GroupStart,
}

impl TokenKind {
    /// The categories this kind belongs to.
    pub const fn categories(self) -> &'static [Category] {
        use Category as C;
        match self {
            Self::Whitespace | Self::RegexFlags | Self::ParenR | Self::BracketR => &[],
            Self::Value => &[C::Value, C::ConditionStart],
            Self::QuotedValue(_) | Self::RegexBody => &[C::Value],
            Self::Quote(_) => &[C::Quote, C::ConditionStart],
            Self::RegexDelimiter | Self::BracketL => &[C::ConditionStart],
            Self::ParenL => &[C::ConditionStart, C::GroupStart],
            Self::And(_) => &[C::Boolean, C::And],
            Self::Or(_) => &[C::Boolean, C::Or],
            Self::Not(_) => &[C::Not, C::ConditionStart],
            Self::ExpandedSep | Self::CustomOp => &[C::PropertyOperator, C::ConditionStart],
        }
    }

    /// Returns true if this kind belongs to `category`.
    pub fn is(self, category: Category) -> bool {
        self.categories().contains(&category)
    }

    /// Returns true for kinds that are matched but never emitted.
    pub const fn is_skipped(self) -> bool {
        matches!(self, Self::Whitespace)
    }

    /// Returns true for word keywords.
    pub const fn is_word_keyword(self) -> bool {
        matches!(
            self,
            Self::And(OperatorStyle::Word)
                | Self::Or(OperatorStyle::Word)
                | Self::Not(OperatorStyle::Word)
        )
    }

    /// The AST token type this kind becomes.
    pub const fn token_type(self) -> TokenType {
        match self {
            // Whitespace never reaches the parser.
            Self::Whitespace
            | Self::Value
            | Self::QuotedValue(_)
            | Self::RegexBody
            | Self::RegexFlags => TokenType::Value,
            Self::Quote(q) => q.token_type(),
            Self::RegexDelimiter => TokenType::Regex,
            Self::ParenL => TokenType::ParenL,
            Self::ParenR => TokenType::ParenR,
            Self::BracketL => TokenType::BracketL,
            Self::BracketR => TokenType::BracketR,
            Self::And(_) => TokenType::OpAnd,
            Self::Or(_) => TokenType::OpOr,
            Self::Not(_) => TokenType::OpNot,
            Self::ExpandedSep => TokenType::OpExpandedSep,
            Self::CustomOp => TokenType::OpCustom,
        }
    }
}

/// A lexed token. Offsets are into the text that was lexed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Token kind.
    pub kind: TokenKind,
    /// Matched text.
    pub value: String,
    /// Start byte offset.
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
}

impl Token {
    /// Creates a token.
    pub fn new(kind: TokenKind, value: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            kind,
            value: value.into(),
            start,
            end,
        }
    }
}
