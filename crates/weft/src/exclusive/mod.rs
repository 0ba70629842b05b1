//! Mutually exclusive option groups.
//!
//! A group expression is either a flat list of names, all exclusive with
//! each other (`json,yaml,toml`), or a sequence of parenthesised groups that
//! are checked independently (`(json,yaml)(quiet,verbose)`). Names may be
//! separated by commas or whitespace and may carry dash prefixes.

use crate::errors::ConfigError;

/// Parses a group expression into its groups of names.
///
/// ```
/// use weft::exclusive::parse_groups;
///
/// let groups = parse_groups("(json, yaml)(quiet verbose)").expect("valid expression");
/// assert_eq!(groups, vec![vec!["json", "yaml"], vec!["quiet", "verbose"]]);
/// ```
///
/// # Errors
///
/// Returns [`ConfigError::MalformedGroups`] for nested or unmatched
/// parentheses, for names outside parentheses when groups are used, and for
/// empty expressions.
pub fn parse_groups(expression: &str) -> Result<Vec<Vec<String>>, ConfigError> {
    let trimmed = expression.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::malformed_groups(expression, "expression is empty"));
    }
    if !trimmed.contains(['(', ')']) {
        let names = split_names(trimmed);
        if names.is_empty() {
            return Err(ConfigError::malformed_groups(expression, "expression is empty"));
        }
        return Ok(vec![names]);
    }

    let mut groups = Vec::new();
    let mut current: Option<String> = None;
    let mut outside = String::new();
    for character in trimmed.chars() {
        match character {
            '(' if current.is_some() => {
                return Err(ConfigError::malformed_groups(
                    expression,
                    "groups cannot be nested",
                ));
            }
            '(' => {
                if !split_names(&outside).is_empty() {
                    return Err(ConfigError::malformed_groups(
                        expression,
                        "names must appear inside a group",
                    ));
                }
                outside.clear();
                current = Some(String::new());
            }
            ')' => {
                let Some(body) = current.take() else {
                    return Err(ConfigError::malformed_groups(
                        expression,
                        "unmatched closing parenthesis",
                    ));
                };
                let names = split_names(&body);
                if names.is_empty() {
                    return Err(ConfigError::malformed_groups(expression, "group is empty"));
                }
                groups.push(names);
            }
            other => match current.as_mut() {
                Some(body) => body.push(other),
                None => outside.push(other),
            },
        }
    }
    if current.is_some() {
        return Err(ConfigError::malformed_groups(
            expression,
            "unmatched opening parenthesis",
        ));
    }
    if !split_names(&outside).is_empty() {
        return Err(ConfigError::malformed_groups(
            expression,
            "names must appear inside a group",
        ));
    }
    Ok(groups)
}

fn split_names(text: &str) -> Vec<String> {
    text.split(|character: char| character == ',' || character.is_whitespace())
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Returns the first two supplied members of the first group with more
/// than one supplied member.
pub(crate) fn first_conflict<T: Copy>(
    groups: &[Vec<T>],
    mut supplied: impl FnMut(T) -> bool,
) -> Option<(T, T)> {
    groups.iter().find_map(|group| {
        let mut present = group.iter().copied().filter(|member| supplied(*member));
        let first = present.next()?;
        present.next().map(|second| (first, second))
    })
}

/// Whether a validation call scoped to `commands` applies to the command
/// named `leaf` at `path`. An empty scope applies everywhere.
pub(crate) fn in_scope<S: AsRef<str>>(commands: &[S], leaf: &str, path: &[String]) -> bool {
    if commands.is_empty() {
        return true;
    }
    let joined = path.join(" ");
    commands.iter().any(|command| {
        let command = command.as_ref().trim();
        command == leaf || command == joined
    })
}
