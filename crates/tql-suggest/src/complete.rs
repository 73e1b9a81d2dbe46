//! Concrete completion text for suggestions.

use serde::{Deserialize, Serialize};
use tql_query::{
    ConditionNode, ConditionValue, Node, Parser, ParserOptions, TokenKind, VariableNode,
};
use tracing::debug;

use crate::suggest::{Suggestion, SuggestionKind};

/// Candidate values the caller knows about, by the slot they fit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Candidates {
    /// Standalone variables.
    pub variables: Vec<String>,
    /// Property values.
    pub values: Vec<String>,
    /// Array elements.
    pub array_values: Vec<String>,
    /// Group prefixes.
    pub prefixes: Vec<String>,
    /// Property names.
    pub properties: Vec<String>,
    /// Operator words of the expanded property syntax.
    pub expanded_property_operators: Vec<String>,
    /// Regex flag strings.
    pub regex_flags: Vec<String>,
}

/// A suggestion realized as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Completion {
    /// Text to insert, quoted where needed.
    pub value: String,
    /// The suggestion this completes.
    pub suggestion: Suggestion,
}

/// Every completion for `suggestions`, in suggestion order.
///
/// Values come from `candidates` for variable-like slots and from the parser's options for
/// keywords, operators and delimiters. Variable-like candidates that would not read back as
/// the same unquoted value are quoted.
pub fn autocomplete(
    parser: &Parser,
    suggestions: &[Suggestion],
    candidates: &Candidates,
) -> Vec<Completion> {
    let options = parser.options();
    let mut completions = Vec::new();
    for suggestion in suggestions {
        let values = match suggestion.kind {
            SuggestionKind::Variable => quote_all(parser, &candidates.variables, false),
            SuggestionKind::Value => quote_all(parser, &candidates.values, false),
            SuggestionKind::ArrayValue => quote_all(parser, &candidates.array_values, true),
            SuggestionKind::Prefix => quote_all(parser, &candidates.prefixes, false),
            SuggestionKind::Property => quote_all(parser, &candidates.properties, false),
            SuggestionKind::ExpandedPropertyOperator => {
                candidates.expanded_property_operators.clone()
            }
            SuggestionKind::RegexFlags => candidates.regex_flags.clone(),
            SuggestionKind::BooleanWordOperator => boolean_keywords(options, false),
            SuggestionKind::BooleanSymbolOperator => boolean_keywords(options, true),
            SuggestionKind::Quote(quote) => vec![quote.char().to_string()],
            SuggestionKind::Regex => vec!["/".to_string()],
            SuggestionKind::PropertySep => {
                options.expanded_property_separator.iter().cloned().collect()
            }
            SuggestionKind::CustomPropertyOperator => options
                .custom_property_operators
                .iter()
                .flatten()
                .cloned()
                .collect(),
            SuggestionKind::Paren => vec![")".to_string()],
            SuggestionKind::Bracket => vec!["]".to_string()],
        };
        completions.extend(values.into_iter().map(|value| Completion {
            value,
            suggestion: *suggestion,
        }));
    }
    debug!(
        suggestions = suggestions.len(),
        completions = completions.len(),
        "completed"
    );
    completions
}

/// AND and OR keywords written as symbols, or as words.
fn boolean_keywords(options: &ParserOptions, symbols: bool) -> Vec<String> {
    options
        .keywords
        .and
        .iter()
        .chain(&options.keywords.or)
        .filter(|k| k.is_symbol == symbols)
        .map(|k| k.value.clone())
        .collect()
}

/// Applies [`quote_if_needed`] to every candidate.
fn quote_all(parser: &Parser, values: &[String], in_array: bool) -> Vec<String> {
    values
        .iter()
        .map(|v| quote_if_needed(parser, v, in_array))
        .collect()
}

/// Returns `value` unchanged if `parser` reads it back as a single unquoted variable with the
/// same text (as an array element when `in_array` is set), and a double-quoted copy otherwise.
pub fn quote_if_needed(parser: &Parser, value: &str, in_array: bool) -> String {
    if !value.is_empty() && !value.contains('\\') && reads_back(parser, value, in_array) {
        value.to_string()
    } else {
        quote(value)
    }
}

/// Double-quotes `value`, escaping `"` and `\`.
pub fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for ch in value.chars() {
        if matches!(ch, '"' | '\\') {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    quoted.push('"');
    quoted
}

/// Returns true if `value` parses to exactly one plain variable holding `value`.
fn reads_back(parser: &Parser, value: &str, in_array: bool) -> bool {
    if in_array {
        return reads_back_in_brackets(parser, value);
    }
    let ast = parser.parse(value);
    match bare_condition(&ast).map(ConditionNode::value) {
        Some(ConditionValue::Variable(v)) => is_plain(v, value),
        _ => false,
    }
}

/// Returns true if bracket mode lexes `value` as a single unquoted element.
///
/// Only the lexer is consulted, since a conditional array policy may reject `[...]` at the
/// top level while still accepting it after the property the cursor is on.
fn reads_back_in_brackets(parser: &Parser, value: &str) -> bool {
    let tokens = parser.lexer().tokenize(&format!("[{value}]"));
    matches!(
        tokens.as_slice(),
        [open, element, close]
            if open.kind == TokenKind::BracketL
                && element.kind == TokenKind::Value
                && element.value == value
                && close.kind == TokenKind::BracketR
    )
}

/// The root condition, if it is valid and has no NOT or property.
fn bare_condition(ast: &Node) -> Option<&ConditionNode> {
    match ast {
        Node::Condition(c)
            if c.is_valid()
                && c.operator().is_none()
                && c.property().is_none()
                && c.property_operator().is_none() =>
        {
            Some(c)
        }
        _ => None,
    }
}

/// Returns true for a valid, unquoted, unprefixed variable holding `value`.
fn is_plain(variable: &VariableNode, value: &str) -> bool {
    variable.is_valid()
        && variable.quote().is_none()
        && variable.prefix().is_none()
        && variable.text() == value
}
