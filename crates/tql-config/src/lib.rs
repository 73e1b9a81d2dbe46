//! Configuration system for tql.
//!
//! tql reads its query syntax from TOML files named `.tql.toml`. Configuration is resolved by
//! walking up the directory tree from the current working directory, collecting any
//! `.tql.toml` files found, then loading `~/.tql.toml` as the global config with lowest
//! precedence. The merged settings become the [`ParserOptions`] of a [`Parser`].

#![warn(missing_docs)]

mod discovery;
mod error;
mod merge;
mod parse;
mod templates;
#[cfg(test)]
mod test_support;
mod validate;

use std::path::{Path, PathBuf};

pub use discovery::{CONFIG_FILENAME, discover_config_files, global_config_path, is_global_config};
pub use error::ConfigError;
pub use merge::{ParsedConfig, merge_configs};
pub use parse::{
    RawConfig, RawKeyword, RawKeywords, RawSyntax, parse_config_file, parse_config_str,
};
use serde::Serialize;
pub use templates::config_template;
use tql_query::{Keyword, Keywords, MissingOperator, OptionsError, Parser, ParserOptions};
use tracing::debug;
pub use validate::ConfigWarning;
use validate::validate_config;

/// Query syntax after merging all discovered `.tql.toml` files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryConfig {
    /// Syntax switches and operator strings.
    pub syntax: SyntaxSettings,
    /// Boolean keywords.
    pub keywords: Keywords,
    /// Directory containing the most specific config file.
    pub config_root: Option<PathBuf>,
    /// Files that were merged, highest precedence first.
    pub sources: Vec<PathBuf>,
}

impl QueryConfig {
    /// Loads configuration by discovering and merging all relevant `.tql.toml` files.
    ///
    /// Returns the built-in syntax if no configuration files are found, and an error if the
    /// merged settings would not make a valid parser.
    pub fn load(cwd: &Path) -> Result<Self, ConfigError> {
        let config_files = discover_config_files(cwd);
        Self::load_from_files(&config_files)
    }

    /// Loads configuration from a specific list of config file paths.
    ///
    /// Files should be provided in precedence order: highest precedence first.
    pub fn load_from_files(files: &[PathBuf]) -> Result<Self, ConfigError> {
        debug!(files = files.len(), "loading query config");
        let parsed = files
            .iter()
            .map(|path| {
                let config = parse_config_file(path)?;
                Ok(ParsedConfig {
                    path: path.clone(),
                    config,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let config = merge_configs(&parsed);
        config.options().validate().map_err(|source| config.invalid(source))?;
        Ok(config)
    }

    /// Parser options for these settings.
    pub fn options(&self) -> ParserOptions {
        let syntax = &self.syntax;
        ParserOptions {
            prefixable_groups: syntax.prefixable_groups,
            prefixable_strings: non_empty(&syntax.prefixable_strings),
            expanded_property_separator: syntax.expanded_property_separator.clone(),
            custom_property_operators: non_empty(&syntax.custom_property_operators),
            on_missing_boolean_operator: syntax.on_missing_boolean_operator,
            regex_values: syntax.regex_values.into(),
            array_values: syntax.array_values.into(),
            keywords: self.keywords.clone(),
        }
    }

    /// A parser for these settings.
    pub fn parser(&self) -> Result<Parser, ConfigError> {
        Parser::new(self.options()).map_err(|source| self.invalid(source))
    }

    /// Checks for settings that load but are probably mistakes.
    pub fn validate(&self) -> Vec<ConfigWarning> {
        validate_config(self)
    }

    /// Serializes the effective settings to TOML format.
    ///
    /// The output is itself a valid `.tql.toml`, with every keyword's style spelled out.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        let effective = EffectiveConfig {
            syntax: &self.syntax,
            keywords: RawKeywords {
                and: Some(explicit_styles(&self.keywords.and)),
                or: Some(explicit_styles(&self.keywords.or)),
                not: Some(explicit_styles(&self.keywords.not)),
            },
        };
        Ok(toml::to_string_pretty(&effective)?)
    }

    /// Wraps an options error with the file it most likely came from.
    fn invalid(&self, source: OptionsError) -> ConfigError {
        ConfigError::InvalidOptions {
            origin: self.sources.first().cloned().unwrap_or_default(),
            source,
        }
    }
}

/// Keyword entries that state their style.
fn explicit_styles(keywords: &[Keyword]) -> Vec<RawKeyword> {
    keywords
        .iter()
        .map(|k| RawKeyword::Detailed {
            value: k.value.clone(),
            symbol: Some(k.is_symbol),
        })
        .collect()
}

/// `None` for an empty list.
fn non_empty(values: &[String]) -> Option<Vec<String>> {
    (!values.is_empty()).then(|| values.to_vec())
}

/// The `[syntax]` section with defaults filled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyntaxSettings {
    /// Whether a condition directly followed by `(` prefixes the group.
    pub prefixable_groups: bool,
    /// Strings that may prefix a quoted value.
    pub prefixable_strings: Vec<String>,
    /// Separator for `prop:op:value`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expanded_property_separator: Option<String>,
    /// Operators for `prop=value`.
    pub custom_property_operators: Vec<String>,
    /// How adjacent conditions without an operator are joined.
    pub on_missing_boolean_operator: MissingOperator,
    /// Whether regex literals are recognized.
    pub regex_values: bool,
    /// Whether array literals are recognized.
    pub array_values: bool,
}

impl Default for SyntaxSettings {
    fn default() -> Self {
        Self {
            prefixable_groups: true,
            prefixable_strings: Vec::new(),
            expanded_property_separator: None,
            custom_property_operators: Vec::new(),
            on_missing_boolean_operator: MissingOperator::Error,
            regex_values: true,
            array_values: true,
        }
    }
}

/// Internal struct for TOML serialization of the effective settings.
#[derive(Serialize)]
struct EffectiveConfig<'a> {
    /// Syntax section.
    syntax: &'a SyntaxSettings,
    /// Keywords with explicit styles.
    keywords: RawKeywords,
}
