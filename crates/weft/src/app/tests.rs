//! Unit tests for the run entry points.

use std::sync::atomic::{AtomicBool, Ordering};

use rstest::{fixture, rstest};

use super::*;
use crate::program::{CommandDecl, Param};
use crate::storage::{OptionCell, OptionField, OptionSet};
use crate::tests::support::Captured;

#[fixture]
fn app() -> App {
    Program::new("tool")
        .version("1.2.3")
        .describe("Tool description")
        .command(
            CommandDecl::new("Greet", |name: String, console: Console| -> anyhow::Result<()> {
                writeln!(console.out(), "hello {name}")?;
                Ok(())
            })
            .param(Param::argument("Name")),
        )
        .command(CommandDecl::new("remote_add", || 0))
        .build()
        .expect("program builds")
}

#[rstest]
fn handlers_write_to_the_redirected_stdout(app: App) {
    let captured = Captured::default();
    let code = app
        .run(["greet", "Ada"], captured.streams())
        .expect("run succeeds");
    assert_eq!(code, 0);
    assert_eq!(captured.out.contents(), "hello Ada\n");
    assert!(captured.err.contents().is_empty());
}

#[rstest]
#[case(&["--help"])]
#[case(&["greet", "--help"])]
#[case(&["--version"])]
fn help_and_version_go_to_stdout(app: App, #[case] args: &[&str]) {
    let captured = Captured::default();
    let code = app.run(args.iter().copied(), captured.streams()).expect("run");
    assert_eq!(code, 0);
    assert!(!captured.out.contents().is_empty());
    assert!(captured.err.contents().is_empty());
}

#[rstest]
fn help_lists_descriptions(app: App) {
    let captured = Captured::default();
    app.run(["--help"], captured.streams()).expect("run");
    let help = captured.out.contents();
    assert!(help.contains("Tool description"));
    assert!(help.contains("greet"));
    assert!(help.contains("remote"));
}

#[rstest]
#[case(&["greet"])]
#[case(&["greet", "Ada", "--loud"])]
#[case(&["launch"])]
fn usage_errors_go_to_stderr_with_clap_exit_code(app: App, #[case] args: &[&str]) {
    let captured = Captured::default();
    let code = app.run(args.iter().copied(), captured.streams()).expect("run");
    assert_eq!(code, 2);
    assert!(captured.out.contents().is_empty());
    assert!(captured.err.contents().contains("error"));
}

#[rstest]
#[case(&[])]
#[case(&["remote"])]
fn group_commands_require_a_subcommand(app: App, #[case] args: &[&str]) {
    let captured = Captured::default();
    let code = app.run(args.iter().copied(), captured.streams()).expect("run");
    assert_eq!(code, 1);
    assert_eq!(captured.err.contents(), "Required command was not provided.\n");
}

#[rstest]
fn current_command_is_only_set_during_dispatch(app: App) {
    let app = Arc::new(app);
    let during = Arc::new(AtomicBool::new(false));
    let (observer, seen) = (Arc::downgrade(&app), Arc::clone(&during));
    app.on_before_command(move |_context| {
        let current = observer.upgrade().and_then(|app| {
            app.current_command().map(|node| node.path().join(" "))
        });
        seen.store(current.as_deref() == Some("remote add"), Ordering::SeqCst);
        Ok(())
    });

    assert!(app.current_command().is_none());
    app.run(["remote", "add"], Streams::sink()).expect("run");
    assert!(during.load(Ordering::SeqCst));
    assert!(app.current_command().is_none());
    let context = app.parse_context().expect("context kept after dispatch");
    assert_eq!(context.command_path(), "tool remote add");
}

#[rstest]
fn exception_handler_decides_the_exit_code(app: App) {
    app.on_before_command(|_context| Err(anyhow::anyhow!("blocked")));
    let outcome = app.run(["remote", "add"], Streams::sink());
    assert!(matches!(outcome, Err(RunError::Unhandled(DispatchError::Hook(_)))));

    app.set_exception_handler(|error, context| {
        assert_eq!(context.command_path(), "tool remote add");
        assert!(matches!(error, DispatchError::Hook(_)));
        Ok(9)
    });
    assert_eq!(app.run(["remote", "add"], Streams::sink()).expect("handled"), 9);

    app.set_exception_handler(|_error, _context| Err(anyhow::anyhow!("handler broke")));
    let outcome = app.run(["remote", "add"], Streams::sink());
    assert!(matches!(outcome, Err(RunError::ExceptionHandler(_))));

    app.clear_exception_handler();
    assert!(app.run(["remote", "add"], Streams::sink()).is_err());
}

#[test]
fn reset_globals_restores_build_time_values() {
    static QUIET: OptionCell<bool> = OptionCell::new(false);
    let app = Program::new("tool")
        .options(OptionSet::new("Globals").field(OptionField::new("Quiet", &QUIET)))
        .command(CommandDecl::new("Run", || {}))
        .build()
        .expect("program builds");

    app.run(["--quiet"], Streams::sink()).expect("run");
    assert!(QUIET.get());
    app.reset_globals();
    assert!(!QUIET.get());
}

#[tokio::test(flavor = "current_thread")]
async fn cancellation_reaches_the_handler() {
    let app = Program::new("tool")
        .command(CommandDecl::asynchronous("Wait", |token: CancellationToken| async move {
            token.cancelled().await;
            130
        }))
        .build()
        .expect("program builds");
    let token = CancellationToken::new();
    token.cancel();
    let code = app
        .run_async_with_cancellation(Vec::<String>::new(), Streams::sink(), token)
        .await
        .expect("run");
    assert_eq!(code, 130);
}

#[test]
fn building_twice_is_a_configuration_error() {
    let mut program = Program::new("tool").command(CommandDecl::new("Run", || {}));
    assert!(program.build().is_ok());
    assert!(matches!(program.build(), Err(ConfigError::AlreadyBuilt)));
}

#[test]
fn install_accepts_exactly_one_program() {
    let first = install(Program::new("first").command(CommandDecl::new("Run", || {})));
    let app = first.expect("first install succeeds");
    assert_eq!(app.tree().program_name(), "first");
    assert!(installed().is_some_and(|installed| std::ptr::eq(installed, app)));

    let second = install(Program::new("second").command(CommandDecl::new("Run", || {})));
    assert!(matches!(second, Err(ConfigError::AlreadyBuilt)));
}

#[rstest]
#[case(0, ExitCode::SUCCESS)]
#[case(2, ExitCode::from(2))]
#[case(255, ExitCode::from(255))]
#[case(-1, ExitCode::FAILURE)]
#[case(256, ExitCode::FAILURE)]
fn statuses_map_onto_process_exit_codes(#[case] status: i32, #[case] expected: ExitCode) {
    assert_eq!(
        format!("{:?}", exit_code_from_status(status)),
        format!("{expected:?}")
    );
}
