//! Unit tests for the clap adapter.

use std::path::PathBuf;

use rstest::{fixture, rstest};

use super::*;
use crate::descriptor::Descriptor;
use crate::program::{CommandDecl, Param, Program};
use crate::tree::NodeId;
use crate::tree::builder::build;
use crate::value::ValueType;

#[rstest]
#[case("v", Flag::Short('v'))]
#[case("-v", Flag::Short('v'))]
#[case("--v", Flag::Long("v"))]
#[case("verbose", Flag::Long("verbose"))]
#[case("-verbose", Flag::Long("verbose"))]
#[case("--dry-run", Flag::Long("dry-run"))]
fn names_map_to_short_or_long_flags(#[case] name: &str, #[case] expected: Flag<'_>) {
    assert_eq!(flag(name), expected);
}

#[rstest]
#[case("-v", "-v")]
#[case("--verbose", "--verbose")]
#[case("-verbose", "--verbose")]
fn flag_keys_are_canonical(#[case] name: &str, #[case] key: &str) {
    assert_eq!(flag_key(name), key);
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Format {
    Json,
    Yaml,
}

impl ValueType for Format {
    fn kind() -> ValueKind {
        ValueKind::Enum(&["json", "yaml"])
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Enum(name) if name == "json" => Some(Self::Json),
            Value::Enum(name) if name == "yaml" => Some(Self::Yaml),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::Enum(
            match self {
                Self::Json => "json",
                Self::Yaml => "yaml",
            }
            .to_owned(),
        )
    }
}

#[fixture]
fn tree() -> CommandTree {
    let program = Program::new("tool").command(
        CommandDecl::new(
            "Convert",
            |_input: PathBuf, _tags: Vec<String>, _format: Format, _count: i64, _dry: bool| {},
        )
        .param(Param::argument("Input"))
        .param(Param::option("Tags").alias("t").required(false))
        .param(Param::option("Format").default_value(Format::Json))
        .param(Param::option("Count").default_value(1_i64))
        .param(Param::option("DryRun").alias("n").default_value(false)),
    );
    build(&program).expect("tree builds")
}

fn matches(tree: &CommandTree, args: &[&str]) -> Vec<ArgMatches> {
    let root = build_command(tree)
        .try_get_matches_from(std::iter::once("tool").chain(args.iter().copied()))
        .expect("arguments parse");
    matched_path(&root).1
}

fn value(tree: &CommandTree, chain: &[ArgMatches], name: &str) -> Option<Value> {
    let symbol = tree
        .resolve_symbol(NodeId::ROOT, name)
        .expect("symbol exists");
    parsed_value(chain, symbol).expect("value reads")
}

#[rstest]
fn typed_values_come_back_from_clap(tree: CommandTree) {
    let chain = matches(
        &tree,
        &["in.txt", "-t", "a", "--tags", "b", "--format", "yaml", "--count", "7", "-n"],
    );
    assert_eq!(value(&tree, &chain, "input"), Some(Value::Path(PathBuf::from("in.txt"))));
    assert_eq!(
        value(&tree, &chain, "tags"),
        Some(Value::Array(vec![
            Value::String("a".to_owned()),
            Value::String("b".to_owned())
        ]))
    );
    assert_eq!(value(&tree, &chain, "format"), Some(Value::Enum("yaml".to_owned())));
    assert_eq!(value(&tree, &chain, "count"), Some(Value::Integer(7)));
    assert_eq!(value(&tree, &chain, "dry-run"), Some(Value::Bool(true)));
}

#[rstest]
fn defaults_are_not_reported_as_supplied(tree: CommandTree) {
    let chain = matches(&tree, &["in.txt"]);
    for name in ["tags", "format", "count", "dry-run"] {
        let symbol = tree.resolve_symbol(NodeId::ROOT, name).expect("symbol");
        assert!(!was_supplied(&chain, symbol), "{name} should be absent");
        assert_eq!(value(&tree, &chain, name), None);
    }
}

#[rstest]
#[case(&["in.txt", "--dry-run"], true)]
#[case(&["in.txt", "--dry-run=true"], true)]
#[case(&["in.txt", "--dry-run=false"], false)]
fn boolean_options_accept_an_explicit_value(
    tree: CommandTree,
    #[case] args: &[&str],
    #[case] expected: bool,
) {
    let chain = matches(&tree, args);
    assert_eq!(value(&tree, &chain, "dry-run"), Some(Value::Bool(expected)));
}

#[rstest]
#[case(&[])]
#[case(&["in.txt", "--format", "toml"])]
#[case(&["in.txt", "--count", "many"])]
#[case(&["in.txt", "--unknown"])]
fn clap_rejects_invalid_input(tree: CommandTree, #[case] args: &[&str]) {
    let outcome = build_command(&tree)
        .try_get_matches_from(std::iter::once("tool").chain(args.iter().copied()));
    assert!(outcome.is_err());
}

#[test]
fn recursive_options_are_read_from_any_level() {
    use crate::storage::{OptionCell, OptionField, OptionSet};

    static VERBOSE: OptionCell<bool> = OptionCell::new(false);
    let program = Program::new("tool")
        .options(OptionSet::new("Globals").field(OptionField::new("Verbose", &VERBOSE)))
        .command(CommandDecl::new("remote_add", || {}))
        .command(CommandDecl::new("Status", || {}));
    let tree = build(&program).expect("tree builds");
    let verbose = tree
        .resolve_symbol(NodeId::ROOT, "verbose")
        .expect("global option");

    for args in [["--verbose", "remote", "add"], ["remote", "add", "--verbose"]] {
        let root = build_command(&tree)
            .try_get_matches_from(std::iter::once("tool").chain(args))
            .expect("arguments parse");
        let (names, chain) = matched_path(&root);
        assert_eq!(names, vec!["remote", "add"]);
        assert!(was_supplied(&chain, verbose));
        assert_eq!(
            parsed_value(&chain, verbose).expect("value reads"),
            Some(Value::Bool(true))
        );
    }
}

#[test]
fn command_aliases_resolve_to_the_canonical_name() {
    let program = Program::new("tool")
        .command(CommandDecl::new("List", || {}).descriptor(Descriptor::command().alias("ls")))
        .command(CommandDecl::new("Show", || {}));
    let tree = build(&program).expect("tree builds");
    let root = build_command(&tree)
        .try_get_matches_from(["tool", "ls"])
        .expect("alias parses");
    assert_eq!(matched_path(&root).0, vec!["list"]);
}

#[test]
fn subcommands_lift_the_parent_handler_requirements() {
    let program = Program::new("tool")
        .command(
            CommandDecl::new("Main", |_name: String, _level: i64| {})
                .descriptor(Descriptor::root())
                .param(Param::argument("Name"))
                .param(Param::option("Level")),
        )
        .command(CommandDecl::new("Sub", || {}));
    let tree = build(&program).expect("tree builds");
    let command = build_command(&tree);
    let root = command
        .clone()
        .try_get_matches_from(["tool", "sub"])
        .expect("subcommand parses without the root's inputs");
    assert_eq!(matched_path(&root).0, vec!["sub"]);
    assert!(command.try_get_matches_from(["tool"]).is_err());
}
