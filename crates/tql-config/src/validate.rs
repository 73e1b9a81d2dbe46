//! Configuration validation.
//!
//! Hard errors come from the parser's own option checks. This module reports settings that
//! load fine but probably do not do what was meant.

use std::fmt;

use tql_query::{Keyword, OperatorRole};

use crate::{QueryConfig, parse::looks_like_symbol};

/// A non-fatal warning about the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// No `.tql.toml` was found, so built-in defaults apply.
    NoConfigFiles,
    /// A keyword's declared style disagrees with its text.
    ///
    /// A symbol made of letters splits values that merely contain it (`candy` with symbol
    /// `and`); a word made of punctuation needs spaces around it to be recognized.
    KeywordStyleMismatch {
        /// Operator the keyword belongs to.
        role: OperatorRole,
        /// The keyword text.
        value: String,
        /// The declared style.
        is_symbol: bool,
    },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoConfigFiles => write!(f, "no .tql.toml found, using default syntax"),
            Self::KeywordStyleMismatch {
                role,
                value,
                is_symbol,
            } => {
                let (declared, looks) = if *is_symbol {
                    ("a symbol", "a word")
                } else {
                    ("a word", "a symbol")
                };
                write!(f, "{role} '{value}' is declared {declared} but looks like {looks}")
            }
        }
    }
}

/// Validates the configuration and returns any warnings.
pub fn validate_config(config: &QueryConfig) -> Vec<ConfigWarning> {
    let mut warnings = Vec::new();
    if config.sources.is_empty() {
        warnings.push(ConfigWarning::NoConfigFiles);
    }
    for (role, keywords) in [
        (OperatorRole::And, &config.keywords.and),
        (OperatorRole::Or, &config.keywords.or),
        (OperatorRole::Not, &config.keywords.not),
    ] {
        warnings.extend(
            keywords
                .iter()
                .filter(|k| k.is_symbol != looks_like_symbol(&k.value))
                .map(|k| mismatch(role, k)),
        );
    }
    warnings
}

/// Builds the style warning for `keyword`.
fn mismatch(role: OperatorRole, keyword: &Keyword) -> ConfigWarning {
    ConfigWarning::KeywordStyleMismatch {
        role,
        value: keyword.value.clone(),
        is_symbol: keyword.is_symbol,
    }
}
