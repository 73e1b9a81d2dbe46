//! Configuration merging.
//!
//! Merges multiple `RawConfig` files into a single `QueryConfig`, applying precedence rules.

use std::path::PathBuf;

use tql_query::{Keyword, Keywords};
use tracing::debug;

use crate::{
    QueryConfig, SyntaxSettings,
    parse::{RawConfig, RawKeyword, RawKeywords, RawSyntax},
};

/// A parsed config file with its source path.
pub struct ParsedConfig {
    /// Path to the config file.
    pub path: PathBuf,
    /// Parsed raw configuration.
    pub config: RawConfig,
}

/// Merges multiple configuration files into a single `QueryConfig`.
///
/// Configs should be provided in precedence order: highest precedence first (closest to CWD),
/// lowest precedence last (global config).
///
/// Merge rules:
/// - Syntax settings: first defined value wins
/// - Keywords: each of and/or/not is replaced whole by the first file that lists it
/// - An empty separator or operator list still counts as defined, and switches the feature off
pub fn merge_configs(configs: &[ParsedConfig]) -> QueryConfig {
    let mut syntax = SyntaxSettings::default();
    let mut keywords = Keywords::default();

    // Lowest precedence first, so closer files overwrite.
    for parsed in configs.iter().rev() {
        if let Some(raw) = &parsed.config.syntax {
            apply_raw_syntax(&mut syntax, raw);
        }
        if let Some(raw) = &parsed.config.keywords {
            apply_raw_keywords(&mut keywords, raw);
        }
    }

    let sources: Vec<PathBuf> = configs.iter().map(|c| c.path.clone()).collect();
    debug!(files = sources.len(), "merged query config");
    QueryConfig {
        syntax,
        keywords,
        config_root: sources
            .first()
            .and_then(|path| path.parent())
            .map(PathBuf::from),
        sources,
    }
}

/// Applies raw syntax settings to result, overwriting any present values.
fn apply_raw_syntax(result: &mut SyntaxSettings, raw: &RawSyntax) {
    if let Some(v) = raw.prefixable_groups {
        result.prefixable_groups = v;
    }
    if let Some(v) = &raw.prefixable_strings {
        result.prefixable_strings.clone_from(v);
    }
    if let Some(v) = &raw.expanded_property_separator {
        result.expanded_property_separator = (!v.is_empty()).then(|| v.clone());
    }
    if let Some(v) = &raw.custom_property_operators {
        result.custom_property_operators.clone_from(v);
    }
    if let Some(v) = raw.on_missing_boolean_operator {
        result.on_missing_boolean_operator = v;
    }
    if let Some(v) = raw.regex_values {
        result.regex_values = v;
    }
    if let Some(v) = raw.array_values {
        result.array_values = v;
    }
}

/// Replaces every keyword list the raw section defines.
fn apply_raw_keywords(result: &mut Keywords, raw: &RawKeywords) {
    for (list, entries) in [
        (&mut result.and, &raw.and),
        (&mut result.or, &raw.or),
        (&mut result.not, &raw.not),
    ] {
        if let Some(entries) = entries {
            *list = resolve_keywords(entries);
        }
    }
}

/// Resolves raw keyword entries, dropping repeats of the same keyword.
fn resolve_keywords(entries: &[RawKeyword]) -> Vec<Keyword> {
    let mut keywords: Vec<Keyword> = Vec::with_capacity(entries.len());
    for keyword in entries.iter().map(RawKeyword::to_keyword) {
        if !keywords.contains(&keyword) {
            keywords.push(keyword);
        }
    }
    keywords
}
