//! End-to-end tests for the weft crate: programs are declared, built, and
//! run against captured streams.

use std::io::Write;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rstest::rstest;

use crate::tests::support::Captured;
use crate::{
    CommandDecl, Console, Declaration, Descriptor, Param, Program, RunError, Streams,
};

pub(crate) mod support;

mod behaviour;

fn base64_program() -> Program {
    Program::new("base64").command(
        CommandDecl::new("Encode", |input: String, console: Console| -> anyhow::Result<()> {
            let mut out = console.out();
            writeln!(out, "{}", STANDARD.encode(input.as_bytes()))?;
            Ok(())
        })
        .param(Param::argument("Input")),
    )
}

#[test]
fn encode_writes_base64_to_stdout() {
    let app = base64_program().build().expect("program builds");
    let captured = Captured::default();
    let code = app
        .run(["Hello World!"], captured.streams())
        .expect("run succeeds");
    assert_eq!(code, 0);
    assert_eq!(captured.out.contents(), "SGVsbG8gV29ybGQh\n");
}

#[rstest]
#[case::sync(CommandDecl::new("Run", || 2), 2)]
#[case::deferred(CommandDecl::asynchronous("Run", || async { 3 }), 3)]
#[case::deferred_result(
    CommandDecl::asynchronous("Run", || async { Ok::<_, anyhow::Error>(4) }),
    4
)]
fn handler_results_become_exit_codes(#[case] command: CommandDecl, #[case] expected: i32) {
    let app = Program::new("tool").command(command).build().expect("program builds");
    assert_eq!(app.run(Vec::<String>::new(), Streams::sink()).expect("run"), expected);
}

#[rstest]
#[case::custom(7)]
#[case::conventional(1)]
fn failing_handlers_exit_with_the_exception_handler_code(#[case] expected: i32) {
    let app = Program::new("tool")
        .command(CommandDecl::new("Run", || -> anyhow::Result<()> {
            Err(anyhow::anyhow!("boom"))
        }))
        .build()
        .expect("program builds");
    app.set_exception_handler(move |error, _context| {
        assert_eq!(
            error.handler_error().map(ToString::to_string).as_deref(),
            Some("boom")
        );
        Ok(expected)
    });
    assert_eq!(app.run(Vec::<String>::new(), Streams::sink()).expect("run"), expected);
}

#[test]
fn unhandled_failures_reach_the_caller() {
    let app = Program::new("tool")
        .command(CommandDecl::new("Run", || -> anyhow::Result<()> {
            Err(anyhow::anyhow!("boom"))
        }))
        .build()
        .expect("program builds");
    let error = app
        .run(Vec::<String>::new(), Streams::sink())
        .expect_err("no exception handler");
    assert!(matches!(error, RunError::Unhandled(_)));
    assert_eq!(error.to_string(), "boom");
}

#[test]
fn after_hook_replaces_the_exit_code() {
    let app = Program::new("tool")
        .command(CommandDecl::new("Run", || 0))
        .build()
        .expect("program builds");
    app.on_after_command(|_context, code| {
        *code = 5;
        Ok(())
    });
    assert_eq!(app.run(Vec::<String>::new(), Streams::sink()).expect("run"), 5);
}

#[test]
fn sole_command_runs_with_no_arguments() {
    let app = Program::new("tool")
        .command(CommandDecl::new("HelloWorld", || 11))
        .build()
        .expect("program builds");
    assert!(app.root().has_handler());
    assert_eq!(app.run(Vec::<String>::new(), Streams::sink()).expect("run"), 11);
}

#[test]
fn two_commands_require_a_subcommand() {
    let app = Program::new("tool")
        .command(CommandDecl::new("First", || 11))
        .command(CommandDecl::new("Second", || 12))
        .build()
        .expect("program builds");
    let captured = Captured::default();
    let code = app
        .run(Vec::<String>::new(), captured.streams())
        .expect("run");
    assert_eq!(code, 1);
    assert_eq!(
        captured.err.contents(),
        format!("{}\n", crate::REQUIRED_COMMAND_MESSAGE)
    );
    assert_eq!(app.run(["second"], Streams::sink()).expect("run"), 12);
}

#[test]
fn declared_root_runs_beside_subcommands() {
    let app = Program::new("tool")
        .declare(Declaration::new("Tool", Descriptor::root().describe("Root help")))
        .command(CommandDecl::new("Main", || 20).descriptor(Descriptor::root()))
        .command(CommandDecl::new("Sub", || 21))
        .build()
        .expect("program builds");
    assert_eq!(app.root().description(), Some("Root help"));
    assert_eq!(app.run(Vec::<String>::new(), Streams::sink()).expect("run"), 20);
    assert_eq!(app.run(["sub"], Streams::sink()).expect("run"), 21);
}

#[test]
fn handler_reads_arguments_and_options() {
    let app = Program::new("tool")
        .command(
            CommandDecl::new("Repeat", |word: String, times: i64, console: Console| {
                let mut out = console.out();
                let line = vec![word; usize::try_from(times).unwrap_or(0)].join(" ");
                writeln!(out, "{line}").map(|()| 0)
            })
            .param(Param::argument("Word"))
            .param(Param::option("Times").alias("n").default_value(1_i64)),
        )
        .build()
        .expect("program builds");

    let captured = Captured::default();
    app.run(["hey", "-n", "3"], captured.streams()).expect("run");
    assert_eq!(captured.out.contents(), "hey hey hey\n");

    let captured = Captured::default();
    app.run(["hey"], captured.streams()).expect("run");
    assert_eq!(captured.out.contents(), "hey\n");
}

#[test]
fn required_root_argument_leaves_subcommands_reachable() {
    let app = Program::new("tool")
        .command(
            CommandDecl::new("Main", |name: String| i32::try_from(name.len()).unwrap_or(0))
                .descriptor(Descriptor::root())
                .param(Param::argument("Name")),
        )
        .command(CommandDecl::new("Sub", || 42))
        .build()
        .expect("program builds");
    assert_eq!(app.run(["sub"], Streams::sink()).expect("run"), 42);
    assert_eq!(app.run(["abc"], Streams::sink()).expect("run"), 3);

    let captured = Captured::default();
    let code = app
        .run(Vec::<String>::new(), captured.streams())
        .expect("run");
    assert_eq!(code, 2);
    assert!(captured.err.contents().contains("<NAME>"));
}

#[rstest]
#[case::in_range("7", 7)]
#[case::negative("-1", 2)]
#[case::too_wide("4294967296", 2)]
fn narrow_integers_are_range_checked_by_the_parser(#[case] count: &str, #[case] expected: i32) {
    let app = Program::new("tool")
        .command(
            CommandDecl::new("Run", |count: u32| i32::try_from(count).unwrap_or(0))
                .param(Param::option("Count").alias("c")),
        )
        .build()
        .expect("program builds");
    let captured = Captured::default();
    let code = app
        .run([format!("--count={count}")], captured.streams())
        .expect("run");
    assert_eq!(code, expected);
    if expected == 2 {
        assert!(captured.err.contents().contains("--count"));
    }
}
