//! Behaviour-driven tests for building and running weft programs.

use std::cell::RefCell;
use std::io::Write;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use crate::tests::support::Captured;
use crate::{App, CommandDecl, ConfigError, Descriptor, Param, Program};

#[derive(Default)]
struct TestWorld {
    program: Option<Program>,
    after_code: Option<i32>,
    exception_code: Option<i32>,
    captured: Captured,
    code: Option<i32>,
    second_build: Option<Result<(), ConfigError>>,
}

impl TestWorld {
    fn extend(&mut self, command: CommandDecl) {
        let program = self
            .program
            .take()
            .unwrap_or_else(|| Program::new("tool"));
        self.program = Some(program.command(command));
    }

    fn build(&mut self) -> App {
        let mut program = self.program.take().expect("program should be declared");
        let app = program.build().expect("program builds");
        self.program = Some(program);
        if let Some(code) = self.after_code {
            app.on_after_command(move |_context, exit| {
                *exit = code;
                Ok(())
            });
        }
        if let Some(code) = self.exception_code {
            app.set_exception_handler(move |error, context| {
                writeln!(context.console().err(), "{error}")?;
                Ok(code)
            });
        }
        app
    }
}

#[fixture]
fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::default())
}

fn strip_quotes(value: &str) -> &str {
    value.trim_matches('"')
}

#[given("a program with the command {member} returning {code}")]
fn given_command(world: &RefCell<TestWorld>, member: String, code: i32) {
    world
        .borrow_mut()
        .extend(CommandDecl::new(strip_quotes(&member), move || code));
}

#[given("an export command with the exclusive group {group}")]
fn given_export_command(world: &RefCell<TestWorld>, group: String) {
    world.borrow_mut().extend(
        CommandDecl::new("Export", |_json: bool, _yaml: bool| {})
            .descriptor(Descriptor::command().mutually_exclusive(strip_quotes(&group)))
            .param(Param::option("Json").default_value(false))
            .param(Param::option("Yaml").default_value(false)),
    );
}

#[given("an after-command hook that sets the exit code to {code}")]
fn given_after_hook(world: &RefCell<TestWorld>, code: i32) {
    world.borrow_mut().after_code = Some(code);
}

#[given("an exception handler that reports the message and returns {code}")]
fn given_exception_handler(world: &RefCell<TestWorld>, code: i32) {
    world.borrow_mut().exception_code = Some(code);
}

#[when("the program runs with {args}")]
fn when_program_runs(world: &RefCell<TestWorld>, args: String) {
    let mut state = world.borrow_mut();
    let app = state.build();
    let code = app
        .run(strip_quotes(&args).split_whitespace(), state.captured.streams())
        .expect("run completes");
    state.code = Some(code);
}

#[when("the program is built twice")]
fn when_built_twice(world: &RefCell<TestWorld>) {
    let mut state = world.borrow_mut();
    let mut program = state.program.take().expect("program should be declared");
    let first = program.build();
    assert!(first.is_ok(), "first build should succeed");
    state.second_build = Some(program.build().map(drop));
}

#[then("the exit code is {code}")]
fn then_exit_code(world: &RefCell<TestWorld>, code: i32) {
    assert_eq!(world.borrow().code, Some(code));
}

#[then("standard error reads {text}")]
fn then_stderr_reads(world: &RefCell<TestWorld>, text: String) {
    let contents = world.borrow().captured.err.contents();
    assert_eq!(contents.trim_end(), strip_quotes(&text));
}

#[then("the second build fails as already built")]
fn then_second_build_fails(world: &RefCell<TestWorld>) {
    let state = world.borrow();
    let outcome = state.second_build.as_ref().expect("second build attempted");
    assert!(matches!(outcome, Err(ConfigError::AlreadyBuilt)));
}

#[scenario(
    path = "tests/features/command_binding.feature",
    name = "A sole command becomes the root"
)]
fn sole_command_becomes_root(world: RefCell<TestWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/command_binding.feature",
    name = "Underscored member names become nested commands"
)]
fn underscored_members_nest(world: RefCell<TestWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/command_binding.feature",
    name = "Two commands need a subcommand"
)]
fn two_commands_need_subcommand(world: RefCell<TestWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/command_binding.feature",
    name = "A second build is rejected"
)]
fn second_build_rejected(world: RefCell<TestWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/command_binding.feature",
    name = "After-command hooks rewrite the exit code"
)]
fn after_hooks_rewrite_exit_code(world: RefCell<TestWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/exclusive_options.feature",
    name = "Supplying one option of a group passes"
)]
fn one_exclusive_option_passes(world: RefCell<TestWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/exclusive_options.feature",
    name = "Supplying neither option passes"
)]
fn no_exclusive_option_passes(world: RefCell<TestWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/exclusive_options.feature",
    name = "Supplying both options is reported"
)]
fn both_exclusive_options_reported(world: RefCell<TestWorld>) {
    let _ = world;
}
