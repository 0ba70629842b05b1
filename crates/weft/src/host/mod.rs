//! Adapter onto `clap`, the host parsing engine.
//!
//! The tree is translated into a `clap::Command` once per [`crate::App`];
//! every symbol becomes an `Arg` whose id is the symbol's bare name suffixed
//! with its arena index, so identity survives name collisions between
//! sibling commands. Defaults are never handed to clap: a symbol counts as
//! supplied only when its value came from the command line.

use std::path::PathBuf;

use clap::builder::{PossibleValuesParser, ValueParser};
use clap::parser::{MatchesError, ValueSource};
use clap::{Arg, ArgAction, ArgMatches, Command};

use crate::naming::bare_name;
use crate::tree::{CommandNode, CommandTree, Symbol};
use crate::value::{Value, ValueKind};

/// How an option name is presented to clap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flag<'a> {
    Short(char),
    Long(&'a str),
}

/// Single-character names become short flags unless written with `--`.
/// Longer names are long flags whatever their prefix.
pub(crate) fn flag(name: &str) -> Flag<'_> {
    let bare = bare_name(name);
    let mut characters = bare.chars();
    match (characters.next(), characters.next()) {
        (Some(short), None) if !name.starts_with("--") => Flag::Short(short),
        _ => Flag::Long(bare),
    }
}

/// Canonical spelling used when checking for collisions.
pub(crate) fn flag_key(name: &str) -> String {
    match flag(name) {
        Flag::Short(short) => format!("-{short}"),
        Flag::Long(long) => format!("--{long}"),
    }
}

/// Builds the clap command for the whole tree.
pub(crate) fn build_command(tree: &CommandTree) -> Command {
    let mut command = build_node(tree, tree.root()).disable_help_subcommand(true);
    if let Some(version) = &tree.version {
        command = command.version(version.clone());
    }
    command
}

fn build_node(tree: &CommandTree, node: &CommandNode) -> Command {
    let mut command = Command::new(node.name.clone()).hide(node.hidden);
    if let Some(description) = &node.description {
        command = command.about(description.clone());
    }
    for alias in &node.aliases {
        command = command.visible_alias(alias.clone());
    }
    for id in node.options.iter().chain(&node.recursive_options) {
        command = command.arg(option_arg(&tree[*id]));
    }
    for (position, id) in node.arguments.iter().enumerate() {
        command = command.arg(argument_arg(&tree[*id], position + 1));
    }
    let mut children = node.children().peekable();
    if children.peek().is_some() {
        // A handler node keeps its required inputs without blocking the
        // subcommands beside it.
        command = command.subcommand_negates_reqs(true);
    }
    for child in children {
        command = command.subcommand(build_node(tree, &tree[child]));
    }
    command
}

fn placeholder(symbol: &Symbol) -> String {
    symbol
        .help_name
        .clone()
        .unwrap_or_else(|| symbol.display_name().to_uppercase())
}

fn common(symbol: &Symbol) -> Arg {
    let mut arg = Arg::new(symbol.host_id())
        .value_name(placeholder(symbol))
        .required(symbol.required)
        .hide(symbol.hidden);
    if let Some(description) = &symbol.description {
        arg = arg.help(description.clone());
    }
    arg
}

fn with_flag(arg: Arg, name: &str) -> Arg {
    match flag(name) {
        Flag::Short(short) if arg.get_short().is_none() => arg.short(short),
        Flag::Short(short) => arg.visible_short_alias(short),
        Flag::Long(long) if arg.get_long().is_none() => arg.long(long.to_owned()),
        Flag::Long(long) => arg.visible_alias(long.to_owned()),
    }
}

fn option_arg(symbol: &Symbol) -> Arg {
    let mut arg = with_flag(common(symbol).global(symbol.recursive), &symbol.name);
    for alias in &symbol.aliases {
        arg = with_flag(arg, alias);
    }
    match &symbol.value_kind {
        ValueKind::Bool => arg
            .action(ArgAction::Set)
            .num_args(0..=1)
            .require_equals(true)
            .default_missing_value("true")
            .value_parser(ValueParser::bool()),
        ValueKind::Array(inner) => {
            let arg = arg.action(ArgAction::Append).value_parser(parser_for(inner));
            match symbol.arity {
                Some(arity) => arg.num_args(arity.min..=arity.max),
                None => arg.num_args(1),
            }
        }
        scalar => arg.action(ArgAction::Set).value_parser(parser_for(scalar)),
    }
}

fn argument_arg(symbol: &Symbol, index: usize) -> Arg {
    let arg = common(symbol).index(index);
    match &symbol.value_kind {
        ValueKind::Array(inner) => {
            let arg = arg.action(ArgAction::Append).value_parser(parser_for(inner));
            match (symbol.arity, symbol.required) {
                (Some(arity), _) => arg.num_args(arity.min..=arity.max),
                (None, true) => arg.num_args(1..),
                (None, false) => arg.num_args(0..),
            }
        }
        scalar => arg.action(ArgAction::Set).value_parser(parser_for(scalar)),
    }
}

fn parser_for(kind: &ValueKind) -> ValueParser {
    match kind {
        ValueKind::Bool => ValueParser::bool(),
        ValueKind::Integer(range) => {
            ValueParser::from(clap::value_parser!(i64).range(range.min..=range.max))
        }
        ValueKind::String => ValueParser::string(),
        ValueKind::Path => ValueParser::path_buf(),
        ValueKind::Enum(variants) => {
            ValueParser::from(PossibleValuesParser::new(variants.iter().copied()))
        }
        ValueKind::Array(inner) => parser_for(inner),
    }
}

/// The matched subcommand names and the matches at each level, leaf first.
pub(crate) fn matched_path(root: &ArgMatches) -> (Vec<String>, Vec<ArgMatches>) {
    let mut names = Vec::new();
    let mut chain = vec![root.clone()];
    let mut current = root;
    while let Some((name, sub)) = current.subcommand() {
        names.push(name.to_owned());
        chain.push(sub.clone());
        current = sub;
    }
    chain.reverse();
    (names, chain)
}

fn supplied_in(matches: &ArgMatches, id: &str) -> bool {
    matches!(matches.try_contains_id(id), Ok(true))
        && matches.value_source(id) == Some(ValueSource::CommandLine)
}

/// Whether the symbol's value came from the command line at any level of
/// the matched path.
pub(crate) fn was_supplied(chain: &[ArgMatches], symbol: &Symbol) -> bool {
    let id = symbol.host_id();
    chain.iter().any(|matches| supplied_in(matches, &id))
}

/// The command-line value of the symbol, nearest level first; `None` when
/// the symbol was not supplied.
pub(crate) fn parsed_value(chain: &[ArgMatches], symbol: &Symbol) -> Result<Option<Value>, String> {
    let id = symbol.host_id();
    let Some(matches) = chain.iter().find(|matches| supplied_in(matches, &id)) else {
        return Ok(None);
    };
    let values = values_of(matches, &id, &symbol.value_kind)
        .map_err(|error| format!("cannot read '{}': {error}", symbol.display_name()))?;
    if symbol.value_kind.is_array() {
        return Ok(Some(Value::Array(values)));
    }
    Ok(values.into_iter().next())
}

fn collect<T>(matches: &ArgMatches, id: &str, wrap: fn(T) -> Value) -> Result<Vec<Value>, MatchesError>
where
    T: Clone + Send + Sync + 'static,
{
    Ok(matches
        .try_get_many::<T>(id)?
        .map(|values| values.cloned().map(wrap).collect())
        .unwrap_or_default())
}

fn values_of(matches: &ArgMatches, id: &str, kind: &ValueKind) -> Result<Vec<Value>, MatchesError> {
    match kind {
        ValueKind::Bool => collect::<bool>(matches, id, Value::Bool),
        ValueKind::Integer(_) => collect::<i64>(matches, id, Value::Integer),
        ValueKind::String => collect::<String>(matches, id, Value::String),
        ValueKind::Path => collect::<PathBuf>(matches, id, Value::Path),
        ValueKind::Enum(_) => collect::<String>(matches, id, Value::Enum),
        ValueKind::Array(inner) => values_of(matches, id, inner),
    }
}

#[cfg(test)]
mod tests;
