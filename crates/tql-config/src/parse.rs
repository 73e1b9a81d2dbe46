//! Configuration file parsing.
//!
//! Parses individual `.tql.toml` files into intermediate `RawConfig` structures
//! that preserve the optional nature of all fields before merging.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use serde_with::{OneOrMany, serde_as};
#[cfg(test)]
use toml::de::Error as TomlError;
use tql_query::{Keyword, MissingOperator};

use crate::ConfigError;

/// Raw configuration as parsed directly from a TOML file.
///
/// All fields are optional to support partial configs that will be merged.
/// This mirrors the TOML schema exactly.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// When true, stop discovery here - ignore parent and global configs.
    pub root: Option<bool>,
    /// Query syntax section.
    pub syntax: Option<RawSyntax>,
    /// Boolean keyword section.
    pub keywords: Option<RawKeywords>,
}

/// Raw `[syntax]` section.
#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawSyntax {
    /// Whether a condition directly followed by `(` prefixes the group.
    pub prefixable_groups: Option<bool>,
    /// Strings that may prefix a quoted value.
    #[serde_as(as = "Option<OneOrMany<_>>")]
    pub prefixable_strings: Option<Vec<String>>,
    /// Separator for `prop:op:value`. An empty string disables an inherited separator.
    pub expanded_property_separator: Option<String>,
    /// Operators for `prop=value`. An empty list disables inherited operators.
    #[serde_as(as = "Option<OneOrMany<_>>")]
    pub custom_property_operators: Option<Vec<String>>,
    /// `error`, `and` or `or`.
    pub on_missing_boolean_operator: Option<MissingOperator>,
    /// Whether regex literals are recognized.
    pub regex_values: Option<bool>,
    /// Whether array literals are recognized.
    pub array_values: Option<bool>,
}

/// Raw `[keywords]` section. Each list replaces the built-in keywords for its operator.
#[serde_as]
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RawKeywords {
    /// AND keywords.
    #[serde_as(as = "Option<OneOrMany<_>>")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub and: Option<Vec<RawKeyword>>,
    /// OR keywords.
    #[serde_as(as = "Option<OneOrMany<_>>")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub or: Option<Vec<RawKeyword>>,
    /// NOT keywords.
    #[serde_as(as = "Option<OneOrMany<_>>")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not: Option<Vec<RawKeyword>>,
}

/// A keyword entry: a bare string, or a table that states its style.
///
/// A bare string is a symbol when it has no letters, digits or underscores.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawKeyword {
    /// `"&&"`
    Plain(String),
    /// `{ value = "&&", symbol = true }`
    Detailed {
        /// The keyword text.
        value: String,
        /// Whether the keyword is a symbol; inferred when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        symbol: Option<bool>,
    },
}

impl RawKeyword {
    /// The keyword text.
    pub fn value(&self) -> &str {
        match self {
            Self::Plain(value) | Self::Detailed { value, .. } => value,
        }
    }

    /// Resolves the entry into a parser keyword.
    pub fn to_keyword(&self) -> Keyword {
        let value = self.value();
        let symbol = match self {
            Self::Detailed {
                symbol: Some(symbol),
                ..
            } => *symbol,
            _ => looks_like_symbol(value),
        };
        Keyword {
            value: value.to_string(),
            is_symbol: symbol,
        }
    }
}

/// Returns true if `value` has no word characters.
pub fn looks_like_symbol(value: &str) -> bool {
    !value.chars().any(|ch| ch.is_alphanumeric() || ch == '_')
}

/// Parses a configuration file from disk.
///
/// Returns a `RawConfig` with all fields as optionals, ready for merging.
pub fn parse_config_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;

    parse_config_str(&contents, path)
}

/// Parses configuration from a TOML string.
///
/// The `path` parameter is used for error reporting.
pub fn parse_config_str(contents: &str, path: &Path) -> Result<RawConfig, ConfigError> {
    toml::from_str(contents).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })
}

/// Parses configuration from a TOML string without path context.
///
/// Useful for validating template content (tests only).
#[cfg(test)]
pub fn parse_config(contents: &str) -> Result<RawConfig, TomlError> {
    toml::from_str(contents)
}

/// Checks if a config file has `root = true` set.
///
/// This is used during discovery to stop traversal at root configs.
/// Returns false if the file cannot be read or parsed.
pub fn is_root_config(path: &Path) -> bool {
    let Ok(contents) = fs::read_to_string(path) else {
        return false;
    };
    let Ok(config) = toml::from_str::<RawConfig>(&contents) else {
        return false;
    };
    config.root == Some(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestDir;

    fn parse(toml: &str) -> RawConfig {
        parse_config_str(toml, Path::new("test.toml")).unwrap()
    }

    #[test]
    fn test_parse_empty_config() {
        let config = parse("");
        assert!(config.root.is_none());
        assert!(config.syntax.is_none());
        assert!(config.keywords.is_none());
    }

    #[test]
    fn test_parse_syntax_section() {
        let config = parse(
            r#"
[syntax]
prefixable_groups = false
prefixable_strings = ["r", "i"]
expanded_property_separator = ":"
custom_property_operators = ["=", ">="]
on_missing_boolean_operator = "and"
regex_values = false
"#,
        );
        let syntax = config.syntax.unwrap();
        assert_eq!(syntax.prefixable_groups, Some(false));
        assert_eq!(syntax.prefixable_strings.unwrap(), vec!["r", "i"]);
        assert_eq!(syntax.expanded_property_separator.as_deref(), Some(":"));
        assert_eq!(syntax.custom_property_operators.unwrap(), vec!["=", ">="]);
        assert_eq!(syntax.on_missing_boolean_operator, Some(MissingOperator::And));
        assert_eq!(syntax.regex_values, Some(false));
        assert!(syntax.array_values.is_none());
    }

    #[test]
    fn test_parse_single_string_lists() {
        let config = parse(
            r#"
[syntax]
custom_property_operators = "="
prefixable_strings = "r"
"#,
        );
        let syntax = config.syntax.unwrap();
        assert_eq!(syntax.custom_property_operators.unwrap(), vec!["="]);
        assert_eq!(syntax.prefixable_strings.unwrap(), vec!["r"]);
    }

    #[test]
    fn test_parse_keywords() {
        let config = parse(
            r#"
[keywords]
and = ["&&", "and", { value = "+", symbol = true }]
or = "||"
not = { value = "NOT", symbol = false }
"#,
        );
        let keywords = config.keywords.unwrap();
        let and: Vec<Keyword> = keywords.and.unwrap().iter().map(RawKeyword::to_keyword).collect();
        assert_eq!(
            and,
            vec![Keyword::symbol("&&"), Keyword::word("and"), Keyword::symbol("+")]
        );
        assert_eq!(keywords.or.unwrap(), vec![RawKeyword::Plain("||".into())]);
        assert_eq!(keywords.not.unwrap()[0].to_keyword(), Keyword::word("NOT"));
    }

    #[test]
    fn test_keyword_style_inference() {
        assert_eq!(RawKeyword::Plain("~".into()).to_keyword(), Keyword::symbol("~"));
        assert_eq!(RawKeyword::Plain("y".into()).to_keyword(), Keyword::word("y"));
        assert_eq!(RawKeyword::Plain("_".into()).to_keyword(), Keyword::word("_"));
        let forced = RawKeyword::Detailed {
            value: "et".into(),
            symbol: Some(true),
        };
        assert_eq!(forced.to_keyword(), Keyword::symbol("et"));
    }

    #[test]
    fn test_parse_unknown_missing_operator() {
        let result = parse_config_str(
            "[syntax]\non_missing_boolean_operator = \"xor\"\n",
            Path::new("test.toml"),
        );
        assert!(matches!(result, Err(ConfigError::ParseToml { .. })));
    }

    #[test]
    fn test_parse_predicate_values_rejected() {
        // Conditional regex/array policies need code, not config.
        let result = parse_config_str(
            "[syntax]\nregex_values = \"when\"\n",
            Path::new("test.toml"),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_invalid_toml() {
        let result = parse_config_str("[syntax\n", Path::new("bad.toml"));
        let err = result.unwrap_err();
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn test_parse_config_file_not_found() {
        let result = parse_config_file(Path::new("/nonexistent/path/.tql.toml"));
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }

    #[test]
    fn test_parse_root() {
        assert_eq!(parse("root = true\n").root, Some(true));
        assert_eq!(parse("root = false\n").root, Some(false));
        assert_eq!(parse("[syntax]\nregex_values = true\n").root, None);
    }

    #[test]
    fn test_is_root_config() {
        let dir = TestDir::new();
        assert!(is_root_config(&dir.write_config("a", "root = true\n")));
        assert!(!is_root_config(&dir.write_config("b", "root = false\n")));
        assert!(!is_root_config(&dir.write_config("c", "# test config\n")));
        assert!(!is_root_config(&dir.write_config("d", "root = [")));
        assert!(!is_root_config(Path::new("/nonexistent/.tql.toml")));
    }
}
