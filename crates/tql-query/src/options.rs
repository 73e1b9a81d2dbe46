//! Parser options and their validation.

use std::{collections::HashMap, fmt, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::error::OptionsError;

/// Characters the lexer always treats as structure, so operators may not contain them.
const RESERVED: &[char] = &['"', '\'', '`', '(', ')', '[', ']', '\\'];

/// How two adjacent conditions with no boolean operator between them are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingOperator {
    /// Report an error token expecting either boolean operator.
    #[default]
    Error,
    /// Insert an implicit AND (binds tighter than OR).
    And,
    /// Insert an implicit OR.
    Or,
}

/// Decides whether a regex or array value is allowed, given the enclosing condition's
/// property and property operator (unquoted text, `None` when absent).
pub type ValuePredicate = Arc<dyn Fn(Option<&str>, Option<&str>) -> bool + Send + Sync>;

/// Whether regex or array literals are recognized.
#[derive(Clone, Default)]
pub enum ValuePolicy {
    /// Always recognized.
    #[default]
    Allow,
    /// Never recognized; the characters are ordinary value characters.
    Deny,
    /// Recognized by the lexer, but converted into a plain value whenever the predicate
    /// rejects it.
    When(ValuePredicate),
}

impl ValuePolicy {
    /// Builds a conditional policy from a closure.
    pub fn when(
        predicate: impl Fn(Option<&str>, Option<&str>) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::When(Arc::new(predicate))
    }

    /// Returns true if the lexer should produce tokens for this kind of literal.
    pub fn is_lexed(&self) -> bool {
        !matches!(self, Self::Deny)
    }

    /// Returns true if a literal is allowed for the given property and operator.
    pub fn allows(&self, property: Option<&str>, operator: Option<&str>) -> bool {
        match self {
            Self::Allow => true,
            Self::Deny => false,
            Self::When(predicate) => predicate(property, operator),
        }
    }
}

impl From<bool> for ValuePolicy {
    fn from(allowed: bool) -> Self {
        if allowed { Self::Allow } else { Self::Deny }
    }
}

impl fmt::Debug for ValuePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => write!(f, "Allow"),
            Self::Deny => write!(f, "Deny"),
            Self::When(_) => write!(f, "When(<predicate>)"),
        }
    }
}

/// A single boolean keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyword {
    /// The literal text.
    pub value: String,
    /// Symbols (`&&`) terminate unquoted values; words (`and`) must stand apart from them.
    #[serde(default)]
    pub is_symbol: bool,
}

impl Keyword {
    /// A symbol keyword such as `&&`.
    pub fn symbol(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            is_symbol: true,
        }
    }

    /// A word keyword such as `and`.
    pub fn word(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            is_symbol: false,
        }
    }
}

/// Keyword sets for the three boolean operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keywords {
    /// Conjunction keywords.
    pub and: Vec<Keyword>,
    /// Disjunction keywords.
    pub or: Vec<Keyword>,
    /// Negation keywords.
    pub not: Vec<Keyword>,
}

impl Default for Keywords {
    fn default() -> Self {
        Self {
            and: vec![
                Keyword::symbol("&&"),
                Keyword::symbol("&"),
                Keyword::word("and"),
                Keyword::word("AND"),
            ],
            or: vec![
                Keyword::symbol("||"),
                Keyword::symbol("|"),
                Keyword::word("or"),
                Keyword::word("OR"),
            ],
            not: vec![
                Keyword::symbol("!"),
                Keyword::word("not"),
                Keyword::word("NOT"),
            ],
        }
    }
}

/// The role an operator string plays, used for validation and lexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorRole {
    /// AND keyword.
    And,
    /// OR keyword.
    Or,
    /// NOT keyword.
    Not,
    /// The expanded property separator.
    ExpandedSeparator,
    /// A custom property operator.
    CustomOperator,
}

impl fmt::Display for OperatorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::And => "and keyword",
            Self::Or => "or keyword",
            Self::Not => "not keyword",
            Self::ExpandedSeparator => "expanded property separator",
            Self::CustomOperator => "custom property operator",
        };
        f.write_str(name)
    }
}

/// Parser configuration.
#[derive(Debug, Clone)]
pub struct ParserOptions {
    /// Allow a condition directly followed by `(` to prefix every variable in the group.
    pub prefixable_groups: bool,
    /// Unquoted strings that may prefix a quoted value with no space (`r"a b"`).
    pub prefixable_strings: Option<Vec<String>>,
    /// Separator for the `prop:op:value` syntax.
    pub expanded_property_separator: Option<String>,
    /// Operators for the `prop=value` syntax.
    pub custom_property_operators: Option<Vec<String>>,
    /// Join policy for adjacent conditions.
    pub on_missing_boolean_operator: MissingOperator,
    /// Regex literals (`/body/flags`).
    pub regex_values: ValuePolicy,
    /// Array literals (`[a b]`).
    pub array_values: ValuePolicy,
    /// Boolean keywords.
    pub keywords: Keywords,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            prefixable_groups: true,
            prefixable_strings: None,
            expanded_property_separator: None,
            custom_property_operators: None,
            on_missing_boolean_operator: MissingOperator::Error,
            regex_values: ValuePolicy::Allow,
            array_values: ValuePolicy::Allow,
            keywords: Keywords::default(),
        }
    }
}

impl ParserOptions {
    /// Checks the configuration for blank, reserved or conflicting operator strings.
    pub fn validate(&self) -> Result<(), OptionsError> {
        for (role, keywords) in [
            (OperatorRole::And, &self.keywords.and),
            (OperatorRole::Or, &self.keywords.or),
            (OperatorRole::Not, &self.keywords.not),
        ] {
            if keywords.is_empty() {
                return Err(OptionsError::EmptyKeywords { role });
            }
        }

        let mut seen: HashMap<&str, OperatorRole> = HashMap::new();
        for (role, value) in self.operator_strings() {
            self.check_operator(role, value)?;
            match seen.get(value) {
                Some(&first) if first == role => {}
                // The separator may double as a custom operator (`prop:value`).
                Some(&OperatorRole::ExpandedSeparator) if role == OperatorRole::CustomOperator => {}
                Some(&first) => {
                    return Err(OptionsError::ConflictingOperator {
                        value: value.to_string(),
                        first,
                        second: role,
                    });
                }
                None => {
                    seen.insert(value, role);
                }
            }
        }

        for prefix in self.prefixable_strings.iter().flatten() {
            if prefix.is_empty()
                || prefix
                    .chars()
                    .any(|ch| ch.is_whitespace() || RESERVED.contains(&ch))
            {
                return Err(OptionsError::InvalidPrefixableString {
                    value: prefix.clone(),
                });
            }
        }

        Ok(())
    }

    /// Validates a single operator string.
    fn check_operator(&self, role: OperatorRole, value: &str) -> Result<(), OptionsError> {
        if value.trim().is_empty() {
            return Err(OptionsError::BlankOperator { role });
        }
        let regex_delimiter = self.regex_values.is_lexed().then_some('/');
        if let Some(ch) = value.chars().find(|&ch| {
            ch.is_whitespace() || RESERVED.contains(&ch) || Some(ch) == regex_delimiter
        }) {
            return Err(OptionsError::ReservedCharacter {
                role,
                value: value.to_string(),
                ch,
            });
        }
        Ok(())
    }

    /// Every configured operator string with its role, separator before custom operators.
    pub fn operator_strings(&self) -> Vec<(OperatorRole, &str)> {
        let keywords = [
            (OperatorRole::And, &self.keywords.and),
            (OperatorRole::Or, &self.keywords.or),
            (OperatorRole::Not, &self.keywords.not),
        ];
        let mut strings: Vec<(OperatorRole, &str)> = keywords
            .into_iter()
            .flat_map(|(role, list)| list.iter().map(move |k| (role, k.value.as_str())))
            .collect();
        if let Some(sep) = &self.expanded_property_separator {
            strings.push((OperatorRole::ExpandedSeparator, sep));
        }
        for op in self.custom_property_operators.iter().flatten() {
            strings.push((OperatorRole::CustomOperator, op));
        }
        strings
    }

    /// Returns true if the expanded separator is also usable as a custom operator.
    pub fn separator_is_custom_operator(&self) -> bool {
        match (&self.expanded_property_separator, &self.custom_property_operators) {
            (Some(sep), Some(ops)) => ops.iter().any(|op| op == sep),
            _ => false,
        }
    }

    /// Returns true if `value` is one of the configured prefixable strings.
    pub fn is_prefixable_string(&self, value: &str) -> bool {
        self.prefixable_strings
            .iter()
            .flatten()
            .any(|prefix| prefix == value)
    }

    /// Options for re-parsing the inside of a property value group, where property
    /// syntax is not allowed to nest.
    pub(crate) fn without_property_operators(&self) -> Self {
        Self {
            expanded_property_separator: None,
            custom_property_operators: None,
            ..self.clone()
        }
    }
}
