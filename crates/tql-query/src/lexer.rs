//! Query lexer (tokenizer).
//!
//! A small mode automaton: each [`Mode`] owns an ordered list of matchers, the first one that
//! matches at the current offset wins, and its transition selects the next mode. The lexer
//! never fails. Unterminated quotes and regexes simply run to the end of the input, and the
//! parser turns the missing closing token into an error token.

use std::cmp::Reverse;

use tracing::debug;

use crate::{
    options::{OperatorRole, ParserOptions},
    token::{OperatorStyle, QuoteKind, Token, TokenKind},
};

/// Lexer modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Top-level query text.
    Main,
    /// Inside `[...]`.
    Bracket,
    /// Inside a quoted value.
    Quoted {
        /// The opening quote.
        quote: QuoteKind,
        /// Whether the quote was opened inside brackets.
        in_bracket: bool,
    },
    /// Inside `/.../`.
    Regex,
    /// Directly after a closing regex delimiter.
    RegexFlags,
}

/// What a matcher recognizes.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Pattern {
    /// A run of whitespace.
    Whitespace,
    /// An exact string.
    Literal(String),
    /// Unquoted value text in main mode.
    UnquotedValue,
    /// Unquoted value text inside brackets.
    BracketValue,
    /// Body of a quoted value.
    QuotedBody(QuoteKind),
    /// Body of a regex.
    RegexBody,
    /// Regex flags.
    RegexFlags,
}

/// Computes the next mode from the current mode, the matched kind and the tokens so far.
type DynamicTransition = fn(Mode, TokenKind, &[Token]) -> Mode;

/// Mode change after a match.
#[derive(Debug, Clone, Copy)]
enum Transition {
    /// Keep the current mode.
    Stay,
    /// Switch to a fixed mode.
    To(Mode),
    /// Decide from context.
    Dynamic(DynamicTransition),
}

/// One entry in a mode's matcher list.
#[derive(Debug, Clone)]
struct Matcher {
    /// Kind of the emitted token.
    kind: TokenKind,
    /// What to match.
    pattern: Pattern,
    /// Mode change on match.
    transition: Transition,
    /// A pattern that wins when it matches strictly more text (`or` vs `orange`).
    longer_alt: Option<Pattern>,
}

impl Matcher {
    /// A matcher without a longer alternative.
    const fn new(kind: TokenKind, pattern: Pattern, transition: Transition) -> Self {
        Self {
            kind,
            pattern,
            transition,
            longer_alt: None,
        }
    }
}

/// Quote characters open a quoted value, or close it when the last token belongs to it.
fn quote_transition(mode: Mode, kind: TokenKind, tokens: &[Token]) -> Mode {
    let TokenKind::Quote(quote) = kind else {
        return mode;
    };
    match mode {
        Mode::Quoted {
            quote: open,
            in_bracket,
        } if open == quote
            && tokens.last().is_some_and(|t| {
                t.kind == TokenKind::Quote(quote) || t.kind == TokenKind::QuotedValue(quote)
            }) =>
        {
            if in_bracket { Mode::Bracket } else { Mode::Main }
        }
        Mode::Bracket => Mode::Quoted {
            quote,
            in_bracket: true,
        },
        _ => Mode::Quoted {
            quote,
            in_bracket: false,
        },
    }
}

/// Returns true if an operator string reads like a word rather than a symbol.
fn is_word(value: &str) -> bool {
    value.chars().all(|ch| ch.is_alphanumeric() || ch == '_')
}

/// Length of a leading escape sequence (`\` plus the escaped character).
fn escape_len(rest: &str) -> usize {
    let mut chars = rest.chars();
    match (chars.next(), chars.next()) {
        (Some('\\'), Some(escaped)) => 1 + escaped.len_utf8(),
        (Some('\\'), None) => 1,
        _ => 0,
    }
}

/// Operator strings with the token kind they lex as.
type OperatorKinds = Vec<(TokenKind, String)>;

/// Lexer kinds for every configured operator string, split into symbols (longest first) and
/// words. A string configured twice keeps its first role.
fn operator_kinds(options: &ParserOptions) -> (OperatorKinds, OperatorKinds) {
    let mut symbols = OperatorKinds::new();
    let mut words = OperatorKinds::new();
    let mut seen: Vec<&str> = Vec::new();
    for (role, value) in options.operator_strings() {
        if seen.contains(&value) {
            continue;
        }
        seen.push(value);
        let symbol = match role {
            OperatorRole::And | OperatorRole::Or | OperatorRole::Not => {
                let keywords = match role {
                    OperatorRole::And => &options.keywords.and,
                    OperatorRole::Or => &options.keywords.or,
                    _ => &options.keywords.not,
                };
                keywords.iter().any(|k| k.value == value && k.is_symbol)
            }
            OperatorRole::ExpandedSeparator | OperatorRole::CustomOperator => !is_word(value),
        };
        let style = if symbol {
            OperatorStyle::Symbol
        } else {
            OperatorStyle::Word
        };
        let kind = match role {
            OperatorRole::And => TokenKind::And(style),
            OperatorRole::Or => TokenKind::Or(style),
            OperatorRole::Not => TokenKind::Not(style),
            OperatorRole::ExpandedSeparator => TokenKind::ExpandedSep,
            OperatorRole::CustomOperator => TokenKind::CustomOp,
        };
        if symbol {
            symbols.push((kind, value.to_string()));
        } else {
            words.push((kind, value.to_string()));
        }
    }
    symbols.sort_by_key(|(_, value)| Reverse(value.len()));
    (symbols, words)
}

/// The configured lexer.
#[derive(Debug, Clone)]
pub struct Lexer {
    /// Main-mode matchers.
    main: Vec<Matcher>,
    /// Matchers after a closing regex delimiter: flags, then the main list.
    regex_flags: Vec<Matcher>,
    /// Bracket-mode matchers.
    bracket: Vec<Matcher>,
    /// Quoted-mode matchers, one list per quote kind.
    quoted: Vec<(QuoteKind, Vec<Matcher>)>,
    /// Regex-mode matchers.
    regex: Vec<Matcher>,
    /// Symbol operators; they terminate unquoted values.
    symbols: Vec<String>,
    /// Whether `[` is structure in main mode.
    arrays: bool,
}

impl Lexer {
    /// Builds the matcher tables for a set of options.
    pub fn new(options: &ParserOptions) -> Self {
        let arrays = options.array_values.is_lexed();
        let quote_matchers = QuoteKind::ALL.map(|q| {
            Matcher::new(
                TokenKind::Quote(q),
                Pattern::Literal(q.char().to_string()),
                Transition::Dynamic(quote_transition),
            )
        });
        let whitespace = Matcher::new(TokenKind::Whitespace, Pattern::Whitespace, Transition::Stay);

        let (symbols, words) = operator_kinds(options);

        let mut main = vec![whitespace.clone()];
        main.extend(quote_matchers.iter().cloned());
        if options.regex_values.is_lexed() {
            main.push(Matcher::new(
                TokenKind::RegexDelimiter,
                Pattern::Literal("/".into()),
                Transition::To(Mode::Regex),
            ));
        }
        main.push(Matcher::new(
            TokenKind::ParenL,
            Pattern::Literal("(".into()),
            Transition::Stay,
        ));
        main.push(Matcher::new(
            TokenKind::ParenR,
            Pattern::Literal(")".into()),
            Transition::Stay,
        ));
        if arrays {
            main.push(Matcher::new(
                TokenKind::BracketL,
                Pattern::Literal("[".into()),
                Transition::To(Mode::Bracket),
            ));
        }
        for (kind, value) in &symbols {
            main.push(Matcher::new(
                *kind,
                Pattern::Literal(value.clone()),
                Transition::Stay,
            ));
        }
        for (kind, value) in words {
            main.push(Matcher {
                longer_alt: Some(Pattern::UnquotedValue),
                ..Matcher::new(kind, Pattern::Literal(value), Transition::Stay)
            });
        }
        main.push(Matcher::new(
            TokenKind::Value,
            Pattern::UnquotedValue,
            Transition::Stay,
        ));

        let mut regex_flags = vec![Matcher::new(
            TokenKind::RegexFlags,
            Pattern::RegexFlags,
            Transition::To(Mode::Main),
        )];
        regex_flags.extend(main.iter().cloned());

        let mut bracket = vec![whitespace];
        bracket.extend(quote_matchers.iter().cloned());
        bracket.push(Matcher::new(
            TokenKind::BracketR,
            Pattern::Literal("]".into()),
            Transition::To(Mode::Main),
        ));
        bracket.push(Matcher::new(
            TokenKind::Value,
            Pattern::BracketValue,
            Transition::Stay,
        ));

        let quoted = QuoteKind::ALL
            .into_iter()
            .zip(quote_matchers)
            .map(|(q, close)| {
                let body = Matcher::new(
                    TokenKind::QuotedValue(q),
                    Pattern::QuotedBody(q),
                    Transition::Stay,
                );
                (q, vec![body, close])
            })
            .collect();

        let regex = vec![
            Matcher::new(TokenKind::RegexBody, Pattern::RegexBody, Transition::Stay),
            Matcher::new(
                TokenKind::RegexDelimiter,
                Pattern::Literal("/".into()),
                Transition::To(Mode::RegexFlags),
            ),
        ];

        Self {
            main,
            regex_flags,
            bracket,
            quoted,
            regex,
            symbols: symbols.into_iter().map(|(_, value)| value).collect(),
            arrays,
        }
    }

    /// Splits `input` into tokens. Whitespace is matched but not emitted.
    pub fn tokenize(&self, input: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut mode = Mode::Main;
        let mut offset = 0;

        while offset < input.len() {
            let rest = &input[offset..];
            let (kind, len, next) = match self.next_match(mode, rest, &tokens) {
                Some(found) => found,
                None => {
                    let len = rest.chars().next().map_or(1, char::len_utf8);
                    debug!(offset, mode = ?mode, "no matcher accepted input, emitting value");
                    let next = if mode == Mode::RegexFlags {
                        Mode::Main
                    } else {
                        mode
                    };
                    (TokenKind::Value, len, next)
                }
            };
            let end = offset + len;
            if !kind.is_skipped() {
                tokens.push(Token::new(kind, &input[offset..end], offset, end));
            }
            mode = next;
            offset = end;
        }

        tokens
    }

    /// Finds the first matcher of `mode` accepting the start of `rest`.
    fn next_match(
        &self,
        mode: Mode,
        rest: &str,
        tokens: &[Token],
    ) -> Option<(TokenKind, usize, Mode)> {
        for matcher in self.matchers(mode) {
            let len = self.match_len(&matcher.pattern, rest);
            if len == 0 {
                continue;
            }
            if let Some(alt) = &matcher.longer_alt {
                let alt_len = self.match_len(alt, rest);
                if alt_len > len {
                    return Some((TokenKind::Value, alt_len, Self::stay(mode)));
                }
            }
            let next = match matcher.transition {
                Transition::Stay => Self::stay(mode),
                Transition::To(next) => next,
                Transition::Dynamic(decide) => decide(mode, matcher.kind, tokens),
            };
            return Some((matcher.kind, len, next));
        }
        None
    }

    /// The mode after a matcher that does not switch modes. Flags can only follow the
    /// delimiter directly, so anything else returns to main mode.
    fn stay(mode: Mode) -> Mode {
        if mode == Mode::RegexFlags {
            Mode::Main
        } else {
            mode
        }
    }

    /// Matcher list for a mode.
    fn matchers(&self, mode: Mode) -> &[Matcher] {
        match mode {
            Mode::Main => &self.main,
            Mode::RegexFlags => &self.regex_flags,
            Mode::Bracket => &self.bracket,
            Mode::Regex => &self.regex,
            Mode::Quoted { quote, .. } => self
                .quoted
                .iter()
                .find(|(q, _)| *q == quote)
                .map(|(_, matchers)| matchers.as_slice())
                .unwrap_or_default(),
        }
    }

    /// Number of bytes `pattern` matches at the start of `rest`; zero means no match.
    fn match_len(&self, pattern: &Pattern, rest: &str) -> usize {
        match pattern {
            Pattern::Whitespace => rest.len() - rest.trim_start().len(),
            Pattern::Literal(literal) => {
                if rest.starts_with(literal.as_str()) {
                    literal.len()
                } else {
                    0
                }
            }
            Pattern::UnquotedValue => self.value_len(rest, false),
            Pattern::BracketValue => self.value_len(rest, true),
            Pattern::QuotedBody(quote) => Self::body_len(rest, |ch, _| ch == quote.char()),
            Pattern::RegexBody => {
                let mut in_class = false;
                Self::body_len(rest, |ch, _| {
                    match ch {
                        '[' => in_class = true,
                        ']' => in_class = false,
                        '/' if !in_class => return true,
                        _ => {}
                    }
                    false
                })
            }
            Pattern::RegexFlags => rest
                .find(|ch: char| !ch.is_ascii_alphabetic())
                .unwrap_or(rest.len()),
        }
    }

    /// Length of a body that runs until `stop` accepts an unescaped character.
    fn body_len(rest: &str, mut stop: impl FnMut(char, usize) -> bool) -> usize {
        let mut len = 0;
        while let Some(ch) = rest[len..].chars().next() {
            let escape = escape_len(&rest[len..]);
            if escape > 0 {
                len += escape;
                continue;
            }
            if stop(ch, len) {
                break;
            }
            len += ch.len_utf8();
        }
        len
    }

    /// Length of unquoted value text.
    fn value_len(&self, rest: &str, in_bracket: bool) -> usize {
        Self::body_len(rest, |ch, at| {
            if ch.is_whitespace() || QuoteKind::from_char(ch).is_some() {
                return true;
            }
            if in_bracket {
                return ch == ']';
            }
            matches!(ch, '(' | ')')
                || (self.arrays && ch == '[')
                || self
                    .symbols
                    .iter()
                    .any(|symbol| rest[at..].starts_with(symbol.as_str()))
        })
    }
}
