//! Name resolution for commands, options, and arguments.
//!
//! Member names (function names, parameter names, field names) become
//! external names through one rule: a `-` is inserted wherever a lowercase
//! character is followed by an uppercase one, then everything is lowercased.
//! Runs of capitals therefore stay together (`HTTPServer` → `httpserver`).
//! Explicit names always win and are used verbatim.

use crate::errors::ConfigError;

/// Resolved external name of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommandName {
    /// Path segments from the root (exclusive) to the command.
    pub segments: Vec<String>,
    /// Whether the command is eligible for promotion to the root command.
    pub is_root_candidate: bool,
}

/// Converts an identifier to kebab case.
///
/// ```
/// assert_eq!(weft::naming::kebab_case("HelloWorld"), "hello-world");
/// assert_eq!(weft::naming::kebab_case("parseHTTPHeader"), "parse-httpheader");
/// ```
#[must_use]
pub fn kebab_case(identifier: &str) -> String {
    let mut kebab = String::with_capacity(identifier.len() + 4);
    let mut previous_lowercase = false;
    for character in identifier.chars() {
        if previous_lowercase && character.is_uppercase() {
            kebab.push('-');
        }
        previous_lowercase = character.is_lowercase();
        kebab.extend(character.to_lowercase());
    }
    kebab
}

/// Resolves the command path for a method-level command.
///
/// An explicit name containing whitespace is split into verbatim path
/// segments; an explicit name without whitespace is a single verbatim
/// segment. Without an explicit name, the member name is split on `_` and
/// each segment is kebab-cased. `sole_command` reports whether this is the
/// only command descriptor in the program.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidName`] when the name is blank or produces an
/// empty path segment (for example `order__create`).
pub fn resolve_command_name(
    explicit_name: Option<&str>,
    member_name: &str,
    sole_command: bool,
) -> Result<ResolvedCommandName, ConfigError> {
    let segments = match explicit_name {
        Some(name) => explicit_segments(name)?,
        None => member_segments(member_name)?,
    };
    Ok(ResolvedCommandName {
        segments,
        is_root_candidate: explicit_name.is_none() && sole_command,
    })
}

/// Splits an explicit command name into path segments.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidName`] for blank names.
pub fn explicit_segments(name: &str) -> Result<Vec<String>, ConfigError> {
    let segments: Vec<String> = name.split_whitespace().map(str::to_owned).collect();
    if segments.is_empty() {
        return Err(ConfigError::invalid_name(name, "command names must not be blank"));
    }
    Ok(segments)
}

fn member_segments(member_name: &str) -> Result<Vec<String>, ConfigError> {
    member_name
        .split('_')
        .map(|segment| {
            if segment.is_empty() {
                Err(ConfigError::invalid_name(
                    member_name,
                    "underscore-separated command paths must not contain empty segments",
                ))
            } else {
                Ok(kebab_case(segment))
            }
        })
        .collect()
}

/// Resolves the external name of an option or argument.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidName`] when both names are blank.
pub fn resolve_symbol_name(
    explicit_name: Option<&str>,
    member_name: &str,
) -> Result<String, ConfigError> {
    let resolved = match explicit_name {
        Some(name) => name.trim().to_owned(),
        None => kebab_case(member_name.trim()),
    };
    if resolved.trim_start_matches('-').is_empty() {
        return Err(ConfigError::invalid_name(
            explicit_name.unwrap_or(member_name),
            "option and argument names must not be blank",
        ));
    }
    Ok(resolved)
}

/// Adds the conventional dash prefix to an option name or alias.
///
/// Names that already start with `-` are returned unchanged; single
/// character names gain `-`; everything else gains `--`.
///
/// ```
/// use weft::naming::apply_dash_prefix;
///
/// assert_eq!(apply_dash_prefix("v"), "-v");
/// assert_eq!(apply_dash_prefix("verbose"), "--verbose");
/// assert_eq!(apply_dash_prefix("-x"), "-x");
/// ```
#[must_use]
pub fn apply_dash_prefix(name: &str) -> String {
    if name.starts_with('-') {
        name.to_owned()
    } else if name.chars().count() == 1 {
        format!("-{name}")
    } else {
        format!("--{name}")
    }
}

/// Strips the dash prefix from an option name for comparisons.
#[must_use]
pub fn bare_name(name: &str) -> &str {
    name.trim_start_matches('-')
}

#[cfg(test)]
mod tests;
