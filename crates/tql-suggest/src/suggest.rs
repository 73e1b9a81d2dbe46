//! Suggestions for what could be typed, or retyped, at a cursor.
//!
//! A suggestion only says what kind of text fits and where it goes; turning it into concrete
//! text is [`autocomplete`](crate::autocomplete)'s job. Suggestions come from three sources, in
//! this order:
//!
//! 1. missing tokens next to the cursor (`is_error` set),
//! 2. an existing token or variable touching the cursor that could be replaced in place,
//!    or an empty slot the cursor sits in,
//! 3. a boolean operator that could go between two values the cursor separates.

use std::ptr;

use serde::Serialize;
use tql_query::{
    AnyToken, ConditionNode, ErrorToken, GroupPrefix, Node, NodeRef, ParentMap, ParserOptions,
    Position, PropertyNode, QuoteKind, TokenRef, TokenType, ValidToken, VariableNode,
    generate_parents_map,
};
use tracing::debug;

use crate::{
    cursor::{CursorInfo, get_cursor_info, get_surrounding_errors},
    error::SuggestError,
};

/// What kind of text a suggestion asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", content = "quote", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SuggestionKind {
    /// A standalone variable.
    Variable,
    /// An element of an array.
    ArrayValue,
    /// The value of a property condition.
    Value,
    /// A variable prefixing a group.
    Prefix,
    /// A boolean operator written as a word.
    BooleanWordOperator,
    /// A boolean operator written as a symbol.
    BooleanSymbolOperator,
    /// Flags after a regex.
    RegexFlags,
    /// A closing quote.
    Quote(QuoteKind),
    /// A closing regex delimiter.
    Regex,
    /// A property name.
    Property,
    /// The expanded property separator.
    PropertySep,
    /// The operator word of the expanded property syntax.
    ExpandedPropertyOperator,
    /// A custom property operator.
    CustomPropertyOperator,
    /// A closing paren.
    Paren,
    /// A closing bracket.
    Bracket,
}

impl SuggestionKind {
    /// Returns true for kinds whose text reads as a word, and so must not touch other words.
    pub const fn is_word_like(self) -> bool {
        matches!(
            self,
            Self::Variable
                | Self::ArrayValue
                | Self::Value
                | Self::Prefix
                | Self::Property
                | Self::BooleanWordOperator
        )
    }

    /// Returns true for kinds completed from candidate values, which may need quoting.
    pub const fn is_value_like(self) -> bool {
        matches!(
            self,
            Self::Variable | Self::ArrayValue | Self::Value | Self::Prefix | Self::Property
        )
    }
}

/// Whitespace a completion must be surrounded with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WhitespaceRequirement {
    /// A space is needed before the text.
    pub before: bool,
    /// A space is needed after the text.
    pub after: bool,
}

/// Decorations a completion needs to fit its position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Requirements {
    /// Surrounding whitespace.
    pub whitespace: WhitespaceRequirement,
    /// The text becomes a group prefix, so `()` must follow it.
    pub group: bool,
    /// The text is inserted directly before an existing group, prefixing it.
    pub prefix: bool,
}

/// A kind of text that fits at a range of the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    /// What kind of text fits.
    pub kind: SuggestionKind,
    /// Range to replace; zero-width for insertions.
    pub range: Position,
    /// Decorations the text needs.
    pub requires: Requirements,
    /// True if the suggestion fixes a missing token.
    pub is_error: bool,
}

/// The role a variable plays in its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    /// A standalone condition value.
    Variable,
    /// A property condition value.
    Value,
    /// An array element.
    ArrayValue,
    /// A group prefix.
    Prefix,
    /// A property name.
    Property,
}

impl Role {
    /// The suggestion kind that replaces a variable in this role.
    const fn kind(self) -> SuggestionKind {
        match self {
            Self::Variable => SuggestionKind::Variable,
            Self::Value => SuggestionKind::Value,
            Self::ArrayValue => SuggestionKind::ArrayValue,
            Self::Prefix => SuggestionKind::Prefix,
            Self::Property => SuggestionKind::Property,
        }
    }
}

/// How a suggestion attaches to a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attach {
    /// It does not.
    Plain,
    /// A new group follows the text.
    NewGroup,
    /// An existing group follows the text.
    ExistingGroup,
}

/// Suggestions for the cursor at `index` in `input`, which `ast` was parsed from with
/// `options`.
pub fn autosuggest(
    input: &str,
    ast: &Node,
    index: usize,
    options: &ParserOptions,
) -> Result<Vec<Suggestion>, SuggestError> {
    let info = get_cursor_info(input, ast, index)?;
    let parents = generate_parents_map(ast);
    let mut suggester = Suggester {
        info: &info,
        parents: &parents,
        options,
        out: Vec::new(),
    };
    suggester.missing_tokens();
    suggester.replacements();
    suggester.missing_operator();
    let suggestions = suggester.out;
    debug!(index, count = suggestions.len(), "suggestions");
    Ok(suggestions)
}

/// State of one `autosuggest` call.
struct Suggester<'a> {
    /// Where the cursor is.
    info: &'a CursorInfo<'a>,
    /// Parents of the tree's nodes.
    parents: &'a ParentMap<'a>,
    /// Options the tree was parsed with.
    options: &'a ParserOptions,
    /// Suggestions so far.
    out: Vec<Suggestion>,
}

impl<'a> Suggester<'a> {
    /// Records a suggestion unless one of the same kind and range exists.
    fn add(&mut self, kind: SuggestionKind, range: Position, is_error: bool, attach: Attach) {
        if self.out.iter().any(|s| s.kind == kind && s.range == range) {
            return;
        }
        let requires = Requirements {
            whitespace: self.whitespace(kind, range),
            group: attach == Attach::NewGroup,
            prefix: attach == Attach::ExistingGroup,
        };
        self.out.push(Suggestion {
            kind,
            range,
            requires,
            is_error,
        });
    }

    /// Records the suggestions for a variable role.
    fn add_role(&mut self, role: Role, range: Position, is_error: bool, prefix: bool) {
        self.add(role.kind(), range, is_error, Attach::Plain);
        if role == Role::Variable && prefix {
            self.add(SuggestionKind::Prefix, range, is_error, Attach::NewGroup);
        }
    }

    /// Records both boolean operator kinds.
    fn add_boolean(&mut self, range: Position, is_error: bool) {
        self.add(
            SuggestionKind::BooleanWordOperator,
            range,
            is_error,
            Attach::Plain,
        );
        self.add(
            SuggestionKind::BooleanSymbolOperator,
            range,
            is_error,
            Attach::Plain,
        );
    }

    /// Whitespace needed around word-like text placed at `range`.
    fn whitespace(&self, kind: SuggestionKind, range: Position) -> WhitespaceRequirement {
        if !kind.is_word_like() {
            return WhitespaceRequirement::default();
        }
        let mut text = self
            .info
            .tokens()
            .iter()
            .filter_map(|t| t.as_valid())
            .filter(|t| !t.pos.is_empty());
        let before = text
            .clone()
            .any(|t| t.pos.end == range.start && is_word_ish(t));
        let after = text.any(|t| {
            t.pos.start == range.end
                && (is_word_ish(t)
                    || (t.kind == TokenType::ParenL && kind != SuggestionKind::Prefix))
        });
        WhitespaceRequirement { before, after }
    }

    /// Suggestions that fill the missing tokens around the cursor.
    fn missing_tokens(&mut self) {
        let here = Position::empty(self.info.index);
        for error in get_surrounding_errors(self.info) {
            for &expected in &error.expected {
                match expected {
                    TokenType::Value => self.missing_value(error, here),
                    TokenType::DoubleQuote | TokenType::SingleQuote | TokenType::Backtick => {
                        if let Some(quote) = QuoteKind::from_token_type(expected) {
                            self.add(SuggestionKind::Quote(quote), here, true, Attach::Plain);
                        }
                    }
                    TokenType::Regex => self.add(SuggestionKind::Regex, here, true, Attach::Plain),
                    TokenType::ParenR => self.add(SuggestionKind::Paren, here, true, Attach::Plain),
                    TokenType::BracketR => {
                        self.add(SuggestionKind::Bracket, here, true, Attach::Plain);
                    }
                    TokenType::OpAnd | TokenType::OpOr => self.add_boolean(here, true),
                    TokenType::OpExpandedSep => {
                        self.add(SuggestionKind::PropertySep, here, true, Attach::Plain);
                    }
                    TokenType::OpCustom => self.add(
                        SuggestionKind::CustomPropertyOperator,
                        here,
                        true,
                        Attach::Plain,
                    ),
                    TokenType::OpNot | TokenType::ParenL | TokenType::BracketL => {}
                }
            }
        }
    }

    /// Suggestions for a missing value, by the slot it is missing from.
    fn missing_value(&mut self, error: &'a ErrorToken, here: Position) {
        let prefix = self.options.prefixable_groups;
        match self.parents.token_parent(TokenRef::Error(error)) {
            Some(NodeRef::Condition(condition)) => {
                let is_property = matches!(
                    condition.property(),
                    Some(PropertyNode::Error(e)) if ptr::eq(e, error)
                );
                if is_property {
                    self.add_role(Role::Property, here, true, false);
                } else if matches!(
                    condition.property_operator(),
                    Some(AnyToken::Error(e)) if ptr::eq(e, error)
                ) {
                    self.add(
                        SuggestionKind::ExpandedPropertyOperator,
                        here,
                        true,
                        Attach::Plain,
                    );
                } else if condition.property_operator().is_some() {
                    self.add_role(Role::Value, here, true, false);
                } else {
                    self.add_role(Role::Variable, here, true, prefix);
                }
            }
            Some(NodeRef::Variable(variable)) => {
                let role = self.role(variable);
                self.add_role(role, here, true, prefix);
            }
            _ => self.add_role(Role::Variable, here, true, prefix),
        }
    }

    /// The role of `variable` in the tree.
    fn role(&self, variable: &'a VariableNode) -> Role {
        match self.parents.parent(NodeRef::Variable(variable)) {
            Some(NodeRef::Array(_)) => Role::ArrayValue,
            Some(NodeRef::Condition(condition)) => {
                let is_property = matches!(
                    condition.property(),
                    Some(PropertyNode::Variable(p)) if ptr::eq(p, variable)
                );
                if is_property {
                    Role::Property
                } else if condition.property_operator().is_some() {
                    Role::Value
                } else if self.is_group_prefix(condition) {
                    Role::Prefix
                } else {
                    Role::Variable
                }
            }
            _ => Role::Variable,
        }
    }

    /// Returns true if `condition` is the prefix of a group.
    fn is_group_prefix(&self, condition: &'a ConditionNode) -> bool {
        match self.parents.parent(NodeRef::Condition(condition)) {
            Some(NodeRef::Group(group)) => matches!(
                group.prefix(),
                Some(GroupPrefix::Condition(prefix)) if ptr::eq(&**prefix, condition)
            ),
            _ => false,
        }
    }

    /// Suggestions that replace what touches the cursor, or fill the slot it sits in.
    fn replacements(&mut self) {
        let index = self.info.index;
        let targets = match self.info.at {
            Some(at) => vec![at],
            None => [
                self.info.text_before().filter(|t| t.pos.end == index),
                self.info.text_after().filter(|t| t.pos.start == index),
            ]
            .into_iter()
            .flatten()
            .collect(),
        };
        if !targets.into_iter().any(|target| self.replace(target)) {
            self.empty_slot();
        }
    }

    /// Records the replacements for `target`, returning false if it cannot be replaced.
    fn replace(&mut self, target: &'a ValidToken) -> bool {
        match self.parents.token_parent(TokenRef::Valid(target)) {
            Some(NodeRef::Variable(variable)) => {
                self.replace_in_variable(variable, target);
                true
            }
            Some(NodeRef::Condition(condition))
                if matches!(
                    condition.property_operator(),
                    Some(AnyToken::Valid(op)) if ptr::eq(op, target)
                ) =>
            {
                let kind = if target.kind == TokenType::OpCustom {
                    SuggestionKind::CustomPropertyOperator
                } else {
                    SuggestionKind::ExpandedPropertyOperator
                };
                self.add(kind, target.pos, false, Attach::Plain);
                true
            }
            Some(NodeRef::Expression(expression))
                if matches!(expression.operator(), AnyToken::Valid(op) if ptr::eq(op, target))
                    && matches!(target.kind, TokenType::OpAnd | TokenType::OpOr) =>
            {
                self.add_boolean(target.pos, false);
                true
            }
            _ => false,
        }
    }

    /// Records the replacements for a token of `variable`.
    fn replace_in_variable(&mut self, variable: &'a VariableNode, target: &'a ValidToken) {
        let index = self.info.index;
        if let Some(quote) = variable.quote() {
            if quote.flags.as_ref().is_some_and(|f| ptr::eq(f, target)) {
                self.add(SuggestionKind::RegexFlags, target.pos, false, Attach::Plain);
                return;
            }
            let closes_regex = variable.is_regex()
                && quote.flags.is_none()
                && target.pos.end == index
                && matches!(&quote.right, AnyToken::Valid(right) if ptr::eq(right, target));
            if closes_regex {
                let here = Position::empty(index);
                self.add(SuggestionKind::RegexFlags, here, false, Attach::Plain);
                return;
            }
        }
        let prefix = self.options.prefixable_groups
            && variable.quote().is_none()
            && variable.prefix().is_none()
            && !self.followed_by_paren(variable);
        let role = self.role(variable);
        self.add_role(role, variable.pos(), false, prefix);
    }

    /// Returns true if a `(` directly follows `variable`.
    fn followed_by_paren(&self, variable: &VariableNode) -> bool {
        self.info
            .tokens()
            .iter()
            .filter_map(|t| t.as_valid())
            .find(|t| !t.pos.is_empty() && t.pos.start >= variable.pos().end)
            .is_some_and(|t| t.kind == TokenType::ParenL && t.pos.start == variable.pos().end)
    }

    /// Insertions into an empty slot: between array brackets, or before an unprefixed group.
    fn empty_slot(&mut self) {
        let here = Position::empty(self.info.index);
        if self.in_array() {
            self.add(SuggestionKind::ArrayValue, here, false, Attach::Plain);
            return;
        }
        if self.options.prefixable_groups && self.before_unprefixed_group() {
            self.add(SuggestionKind::Prefix, here, false, Attach::ExistingGroup);
        }
    }

    /// Returns true if the cursor lies between the brackets of an array.
    fn in_array(&self) -> bool {
        let index = self.info.index;
        let bracket = self
            .info
            .tokens_before()
            .iter()
            .rev()
            .filter_map(|t| t.as_valid())
            .find(|t| matches!(t.kind, TokenType::BracketL | TokenType::BracketR));
        let Some(open) = bracket.filter(|t| t.kind == TokenType::BracketL) else {
            return false;
        };
        match self.parents.token_parent(TokenRef::Valid(open)) {
            Some(NodeRef::Array(array)) => match &array.bracket().right {
                AnyToken::Valid(close) => index <= close.pos.start,
                AnyToken::Error(_) => true,
            },
            _ => false,
        }
    }

    /// Returns true if the cursor touches the `(` of a group that has no prefix.
    fn before_unprefixed_group(&self) -> bool {
        let index = self.info.index;
        let Some(open) = self
            .info
            .text_after()
            .filter(|t| t.kind == TokenType::ParenL && t.pos.start == index)
        else {
            return false;
        };
        let Some(NodeRef::Group(group)) = self.parents.token_parent(TokenRef::Valid(open)) else {
            return false;
        };
        // A property value group takes no prefix.
        if matches!(
            self.parents.parent(NodeRef::Group(group)),
            Some(NodeRef::Condition(_))
        ) {
            return false;
        }
        group.prefix().is_none()
    }

    /// A boolean operator between two values the cursor separates with whitespace.
    fn missing_operator(&mut self) {
        let info = self.info;
        if info.at.is_some() || !(info.whitespace.prev || info.whitespace.next) {
            return;
        }
        let Some(prev) = info.text_before() else {
            return;
        };
        if !self.ends_value(prev) {
            return;
        }
        let next_fits = info
            .text_after()
            .is_none_or(|next| starts_value(next) || next.kind == TokenType::ParenR);
        if next_fits {
            self.add_boolean(Position::empty(info.index), false);
        }
    }

    /// Returns true if `token` is the last token of a complete value.
    fn ends_value(&self, token: &'a ValidToken) -> bool {
        match token.kind {
            TokenType::ParenR | TokenType::BracketR => true,
            _ => match self.parents.token_parent(TokenRef::Valid(token)) {
                Some(NodeRef::Variable(variable)) => {
                    variable.is_valid()
                        && variable.pos().end == token.pos.end
                        && matches!(self.role(variable), Role::Variable | Role::Value)
                }
                _ => false,
            },
        }
    }
}

/// Returns true if a condition can start with `token`.
fn starts_value(token: &ValidToken) -> bool {
    matches!(
        token.kind,
        TokenType::Value
            | TokenType::DoubleQuote
            | TokenType::SingleQuote
            | TokenType::Backtick
            | TokenType::Regex
            | TokenType::ParenL
            | TokenType::BracketL
            | TokenType::OpNot
    )
}

/// Returns true if `token` reads as a word, so word-like text must not touch it.
fn is_word_ish(token: &ValidToken) -> bool {
    match token.kind {
        TokenType::Value
        | TokenType::DoubleQuote
        | TokenType::SingleQuote
        | TokenType::Backtick
        | TokenType::Regex => true,
        TokenType::OpAnd
        | TokenType::OpOr
        | TokenType::OpNot
        | TokenType::OpCustom
        | TokenType::OpExpandedSep => token
            .value
            .chars()
            .all(|ch| ch.is_alphanumeric() || ch == '_'),
        TokenType::ParenL | TokenType::ParenR | TokenType::BracketL | TokenType::BracketR => false,
    }
}

#[cfg(test)]
mod tests {
    use tql_query::{MissingOperator, Parser};

    use super::*;

    fn suggest_with(parser: &Parser, input: &str, index: usize) -> Vec<Suggestion> {
        let ast = parser.parse(input);
        autosuggest(input, &ast, index, parser.options()).unwrap()
    }

    fn suggest(input: &str, index: usize) -> Vec<Suggestion> {
        suggest_with(&Parser::default(), input, index)
    }

    fn kinds(suggestions: &[Suggestion]) -> Vec<(SuggestionKind, usize, usize)> {
        suggestions
            .iter()
            .map(|s| (s.kind, s.range.start, s.range.end))
            .collect()
    }

    fn find(suggestions: &[Suggestion], kind: SuggestionKind) -> Suggestion {
        *suggestions
            .iter()
            .find(|s| s.kind == kind)
            .unwrap_or_else(|| panic!("no {kind:?} in {suggestions:?}"))
    }

    fn property_parser() -> Parser {
        Parser::new(ParserOptions {
            expanded_property_separator: Some(":".into()),
            custom_property_operators: Some(vec!["=".into(), ">=".into()]),
            ..ParserOptions::default()
        })
        .unwrap()
    }

    #[test]
    fn empty_input() {
        let suggestions = suggest("", 0);
        assert_eq!(
            kinds(&suggestions),
            vec![
                (SuggestionKind::Variable, 0, 0),
                (SuggestionKind::Prefix, 0, 0)
            ]
        );
        assert!(find(&suggestions, SuggestionKind::Prefix).requires.group);
        assert!(!find(&suggestions, SuggestionKind::Variable).requires.group);
        assert!(suggestions.iter().all(|s| s.is_error));
    }

    #[test]
    fn empty_input_without_prefixable_groups() {
        let parser = Parser::new(ParserOptions {
            prefixable_groups: false,
            ..ParserOptions::default()
        })
        .unwrap();
        assert_eq!(
            kinds(&suggest_with(&parser, "", 0)),
            vec![(SuggestionKind::Variable, 0, 0)]
        );
    }

    #[test]
    fn array_value_replacement() {
        let suggestions = suggest("[array]", 1);
        assert_eq!(kinds(&suggestions), vec![(SuggestionKind::ArrayValue, 1, 6)]);
        assert_eq!(suggestions[0].requires, Requirements::default());
        assert!(!suggestions[0].is_error);
    }

    #[test]
    fn empty_array_slot() {
        assert_eq!(
            kinds(&suggest("[ ]", 1)),
            vec![(SuggestionKind::ArrayValue, 1, 1)]
        );
        assert_eq!(
            kinds(&suggest("[a ]", 3)),
            vec![(SuggestionKind::ArrayValue, 3, 3)]
        );
    }

    #[test]
    fn unterminated_array() {
        let suggestions = suggest("[a", 2);
        assert_eq!(
            kinds(&suggestions),
            vec![
                (SuggestionKind::Bracket, 2, 2),
                (SuggestionKind::ArrayValue, 1, 2)
            ]
        );
    }

    #[test]
    fn variable_replacement_with_prefix() {
        let suggestions = suggest("abc", 1);
        assert_eq!(
            kinds(&suggestions),
            vec![
                (SuggestionKind::Variable, 0, 3),
                (SuggestionKind::Prefix, 0, 3)
            ]
        );
        assert!(suggestions.iter().all(|s| !s.is_error));
    }

    #[test]
    fn quoted_variable_has_no_prefix() {
        let suggestions = suggest("\"abc\"", 5);
        assert_eq!(kinds(&suggestions), vec![(SuggestionKind::Variable, 0, 5)]);
    }

    #[test]
    fn existing_prefix_is_replaced_as_prefix() {
        let suggestions = suggest("a(b)", 1);
        assert_eq!(kinds(&suggestions)[0], (SuggestionKind::Prefix, 0, 1));
        assert!(!suggestions[0].requires.group);
        assert!(!suggestions[0].requires.whitespace.after);
    }

    #[test]
    fn prefix_before_group() {
        let suggestions = suggest("(b)", 0);
        assert_eq!(kinds(&suggestions), vec![(SuggestionKind::Prefix, 0, 0)]);
        assert!(suggestions[0].requires.prefix);
        assert!(!suggestions[0].requires.group);
    }

    #[test]
    fn missing_quote() {
        let suggestions = suggest("\"abc", 4);
        assert_eq!(
            kinds(&suggestions),
            vec![
                (SuggestionKind::Quote(QuoteKind::Double), 4, 4),
                (SuggestionKind::Variable, 0, 4)
            ]
        );
        assert!(suggestions[0].is_error);
    }

    #[test]
    fn quote_ranks_before_paren() {
        let suggestions = suggest("(\"a", 3);
        let errors: Vec<SuggestionKind> = suggestions
            .iter()
            .filter(|s| s.is_error)
            .map(|s| s.kind)
            .collect();
        assert_eq!(
            errors,
            vec![SuggestionKind::Quote(QuoteKind::Double), SuggestionKind::Paren]
        );
    }

    #[test]
    fn value_after_operator() {
        let suggestions = suggest("a && ", 5);
        assert_eq!(
            kinds(&suggestions),
            vec![
                (SuggestionKind::Variable, 5, 5),
                (SuggestionKind::Prefix, 5, 5)
            ]
        );
    }

    #[test]
    fn operator_touching_cursor_is_replaceable() {
        let suggestions = suggest("a &&", 4);
        assert!(kinds(&suggestions).contains(&(SuggestionKind::BooleanSymbolOperator, 2, 4)));
        assert!(kinds(&suggestions).contains(&(SuggestionKind::BooleanWordOperator, 2, 4)));
        assert!(kinds(&suggestions).contains(&(SuggestionKind::Variable, 4, 4)));
    }

    #[test]
    fn word_after_word_needs_space() {
        let suggestions = suggest("a and", 5);
        let variable = find(&suggestions, SuggestionKind::Variable);
        assert_eq!(variable.range, Position::empty(5));
        assert!(variable.requires.whitespace.before);

        let suggestions = suggest("a &&", 4);
        let variable = find(&suggestions, SuggestionKind::Variable);
        assert!(!variable.requires.whitespace.before);
    }

    #[test]
    fn missing_operator_error() {
        let suggestions = suggest("a b", 1);
        let word = find(&suggestions, SuggestionKind::BooleanWordOperator);
        assert_eq!(word.range, Position::empty(1));
        assert!(word.is_error);
        assert!(kinds(&suggestions).contains(&(SuggestionKind::Variable, 0, 1)));
    }

    #[test]
    fn operator_opportunity_after_value() {
        let suggestions = suggest("a ", 2);
        assert_eq!(
            kinds(&suggestions),
            vec![
                (SuggestionKind::BooleanWordOperator, 2, 2),
                (SuggestionKind::BooleanSymbolOperator, 2, 2)
            ]
        );
        assert!(suggestions.iter().all(|s| !s.is_error));
        assert!(!suggestions[0].requires.whitespace.before);
    }

    #[test]
    fn operator_opportunity_with_implicit_and() {
        let parser = Parser::new(ParserOptions {
            on_missing_boolean_operator: MissingOperator::And,
            ..ParserOptions::default()
        })
        .unwrap();
        let suggestions = suggest_with(&parser, "(a) b", 4);
        assert!(kinds(&suggestions).contains(&(SuggestionKind::BooleanSymbolOperator, 4, 4)));
        let word = find(&suggestions, SuggestionKind::BooleanWordOperator);
        assert!(word.requires.whitespace.after);
        assert!(!word.requires.whitespace.before);
    }

    #[test]
    fn no_operator_inside_array() {
        let suggestions = suggest("[a ]", 3);
        assert!(
            suggestions
                .iter()
                .all(|s| s.kind != SuggestionKind::BooleanWordOperator)
        );
    }

    #[test]
    fn regex_flags() {
        assert_eq!(
            kinds(&suggest("/a/", 3)),
            vec![(SuggestionKind::RegexFlags, 3, 3)]
        );
        assert_eq!(
            kinds(&suggest("/a/gi", 4)),
            vec![(SuggestionKind::RegexFlags, 3, 5)]
        );
    }

    #[test]
    fn missing_regex_delimiter() {
        let suggestions = suggest("/a", 2);
        assert_eq!(kinds(&suggestions)[0], (SuggestionKind::Regex, 2, 2));
    }

    #[test]
    fn custom_property_operator() {
        let parser = property_parser();
        let suggestions = suggest_with(&parser, "prop=", 5);
        assert_eq!(
            kinds(&suggestions),
            vec![
                (SuggestionKind::Value, 5, 5),
                (SuggestionKind::CustomPropertyOperator, 4, 5)
            ]
        );
    }

    #[test]
    fn property_and_value_replacement() {
        let parser = property_parser();
        assert_eq!(
            kinds(&suggest_with(&parser, "prop>=val", 2)),
            vec![(SuggestionKind::Property, 0, 4)]
        );
        assert_eq!(
            kinds(&suggest_with(&parser, "prop>=val", 9)),
            vec![(SuggestionKind::Value, 6, 9)]
        );
    }

    #[test]
    fn expanded_property_slots() {
        let parser = property_parser();
        let suggestions = suggest_with(&parser, "prop:", 5);
        assert_eq!(
            kinds(&suggestions),
            vec![
                (SuggestionKind::ExpandedPropertyOperator, 5, 5),
                (SuggestionKind::Value, 5, 5)
            ]
        );
        assert_eq!(
            kinds(&suggest_with(&parser, "prop:op:v", 7)),
            vec![(SuggestionKind::ExpandedPropertyOperator, 5, 7)]
        );
    }

    #[test]
    fn missing_property() {
        let parser = property_parser();
        let suggestions = suggest_with(&parser, "=a", 0);
        assert_eq!(kinds(&suggestions)[0], (SuggestionKind::Property, 0, 0));
        assert!(suggestions[0].is_error);
    }

    #[test]
    fn cursor_out_of_bounds() {
        let ast = Parser::default().parse("a");
        let options = ParserOptions::default();
        assert!(matches!(
            autosuggest("a", &ast, 2, &options),
            Err(SuggestError::CursorOutOfBounds { index: 2, len: 1 })
        ));
    }

    #[test]
    fn never_fails_and_stays_in_bounds() {
        let parser = property_parser();
        for input in [
            "a || (b && !\"c d\") && prop:op:(x y",
            "prop=[a 'b' c] || r\"x\"",
            ")(",
            "!!",
            "/re/g || [",
        ] {
            let ast = parser.parse(input);
            for index in 0..=input.len() {
                for s in autosuggest(input, &ast, index, parser.options()).unwrap() {
                    assert!(s.range.start <= s.range.end && s.range.end <= input.len());
                }
            }
        }
    }

    #[test]
    fn serializes_kind_tags() {
        let json = serde_json::to_value(suggest("\"a", 2)).unwrap();
        assert_eq!(json[0]["kind"]["type"], "QUOTE");
        assert_eq!(json[0]["kind"]["quote"], "double");
        assert_eq!(json[0]["range"]["start"], 2);
    }
}
