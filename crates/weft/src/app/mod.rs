//! Run entry points for a built command tree.

use std::ffi::OsString;
use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Command;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::context::{Console, InvocationContext, Streams};
use crate::dispatch::{self, DISPATCH_TARGET};
use crate::errors::{ConfigError, DispatchError, RunError};
use crate::hooks::Hooks;
use crate::host;
use crate::program::Program;
use crate::tree::{CommandNode, CommandTree, NodeId};

/// Message written when the matched command only groups subcommands.
pub const REQUIRED_COMMAND_MESSAGE: &str = "Required command was not provided.";

static INSTALLED: OnceCell<App> = OnceCell::new();

#[derive(Debug, Default)]
struct RunState {
    current: Option<NodeId>,
    context: Option<InvocationContext>,
}

/// Clears the current command when dispatch ends, however it ends.
struct CurrentCommand<'a>(&'a RwLock<RunState>);

impl<'a> CurrentCommand<'a> {
    fn enter(state: &'a RwLock<RunState>, node: NodeId, context: InvocationContext) -> Self {
        let mut guard = state.write();
        guard.current = Some(node);
        guard.context = Some(context);
        Self(state)
    }
}

impl Drop for CurrentCommand<'_> {
    fn drop(&mut self) {
        self.0.write().current = None;
    }
}

/// A built program, ready to parse and dispatch command lines.
pub struct App {
    tree: Arc<CommandTree>,
    command: Command,
    hooks: Hooks,
    state: RwLock<RunState>,
}

impl App {
    pub(crate) fn new(tree: CommandTree) -> Self {
        let command = host::build_command(&tree);
        Self {
            tree: Arc::new(tree),
            command,
            hooks: Hooks::default(),
            state: RwLock::new(RunState::default()),
        }
    }

    /// The root command.
    #[must_use]
    pub fn root(&self) -> &CommandNode {
        self.tree.root()
    }

    /// The whole command tree.
    #[must_use]
    pub fn tree(&self) -> &CommandTree {
        &self.tree
    }

    /// The command being dispatched; `None` outside dispatch.
    #[must_use]
    pub fn current_command(&self) -> Option<&CommandNode> {
        let current = self.state.read().current?;
        self.tree.node(current)
    }

    /// The context of the running or most recent invocation.
    #[must_use]
    pub fn parse_context(&self) -> Option<InvocationContext> {
        self.state.read().context.clone()
    }

    /// Writes every global and recursive option field back to the value it
    /// held when the tree was built.
    pub fn reset_globals(&self) {
        for initializer in &self.tree.initializers {
            initializer.reset();
        }
    }

    /// Registers a hook that runs before every handler. A failing hook
    /// aborts the handler call.
    pub fn on_before_command<F>(&self, hook: F)
    where
        F: Fn(&InvocationContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.hooks.add_before(Arc::new(hook));
    }

    /// Registers a hook that runs after every handler and may replace the
    /// exit code.
    pub fn on_after_command<F>(&self, hook: F)
    where
        F: Fn(&InvocationContext, &mut i32) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.hooks.add_after(Arc::new(hook));
    }

    /// Sets the handler that turns hook, validation, and handler failures
    /// into exit codes. Without one those failures reach the caller as
    /// [`RunError::Unhandled`].
    pub fn set_exception_handler<F>(&self, handler: F)
    where
        F: Fn(&DispatchError, &InvocationContext) -> anyhow::Result<i32> + Send + Sync + 'static,
    {
        self.hooks.set_exception(Some(Arc::new(handler)));
    }

    /// Removes the exception handler.
    pub fn clear_exception_handler(&self) {
        self.hooks.set_exception(None);
    }

    /// Parses and dispatches `args` (without the program name), blocking on
    /// a current-thread runtime until the handler completes.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Runtime`] when the runtime cannot start, and
    /// otherwise the same errors as [`App::run_async`].
    pub fn run<I, T>(&self, args: I, streams: Streams) -> Result<i32, RunError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(RunError::Runtime)?;
        runtime.block_on(self.run_async(args, streams))
    }

    /// Parses and dispatches `args` (without the program name).
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Unhandled`] for a dispatch failure when no
    /// exception handler is set, [`RunError::ExceptionHandler`] when the
    /// exception handler fails, and [`RunError::Output`] when parser output
    /// cannot be written.
    pub async fn run_async<I, T>(&self, args: I, streams: Streams) -> Result<i32, RunError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        self.run_async_with_cancellation(args, streams, CancellationToken::new())
            .await
    }

    /// Like [`App::run_async`], handing `cancellation` to the handler.
    ///
    /// # Errors
    ///
    /// See [`App::run_async`].
    pub async fn run_async_with_cancellation<I, T>(
        &self,
        args: I,
        streams: Streams,
        cancellation: CancellationToken,
    ) -> Result<i32, RunError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let console = streams.console();
        let argv = std::iter::once(OsString::from(self.tree.program_name()))
            .chain(args.into_iter().map(Into::into));
        let matches = match self.command.clone().try_get_matches_from(argv) {
            Ok(matches) => matches,
            Err(parse_error) => return report_parse_error(&parse_error, &console),
        };

        let (names, chain) = host::matched_path(&matches);
        let segments: Vec<&str> = names.iter().map(String::as_str).collect();
        let Some(node) = self.tree.find(&segments) else {
            return Err(RunError::Unhandled(DispatchError::extraction(
                segments.join(" "),
                "matched command is not part of the tree",
            )));
        };

        let context = InvocationContext::new(
            Arc::clone(&self.tree),
            node.id(),
            chain,
            console.clone(),
            cancellation,
        );
        let _current = CurrentCommand::enter(&self.state, node.id(), context.clone());

        let Some(binding) = node.handler.as_ref() else {
            debug!(
                target: DISPATCH_TARGET,
                command = %context.command_path(),
                "no handler on matched command"
            );
            write_line(&console, REQUIRED_COMMAND_MESSAGE)?;
            return Ok(1);
        };

        match dispatch::dispatch(&context, binding, &self.hooks).await {
            Ok(code) => Ok(code),
            Err(failure) => self.hooks.handle(failure, &context),
        }
    }

    /// Runs with the process arguments and standard streams. Ctrl-C cancels
    /// the handler's token; unhandled errors are reported on standard error
    /// with exit code 1.
    #[must_use]
    pub fn run_process(&self) -> ExitCode {
        let outcome = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(RunError::Runtime)
            .and_then(|runtime| {
                runtime.block_on(async {
                    let cancellation = CancellationToken::new();
                    let trigger = cancellation.clone();
                    let watcher = tokio::spawn(async move {
                        if tokio::signal::ctrl_c().await.is_ok() {
                            trigger.cancel();
                        }
                    });
                    let outcome = self
                        .run_async_with_cancellation(
                            std::env::args_os().skip(1),
                            Streams::process(),
                            cancellation,
                        )
                        .await;
                    watcher.abort();
                    outcome
                })
            });

        match outcome {
            Ok(code) => exit_code_from_status(code),
            Err(failure) => {
                error!(target: DISPATCH_TARGET, error = %failure, "command failed");
                if let Err(write_error) =
                    writeln!(io::stderr(), "{}: {failure}", self.tree.program_name())
                {
                    error!(target: DISPATCH_TARGET, error = %write_error, "failed to report error");
                }
                ExitCode::FAILURE
            }
        }
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("program", &self.tree.program_name())
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

fn write_line(console: &Console, line: &str) -> Result<(), RunError> {
    let mut writer = console.err();
    writeln!(writer, "{line}")
        .and_then(|()| writer.flush())
        .map_err(RunError::Output)
}

/// Help and version requests go to standard output, usage errors to
/// standard error; the exit code is clap's.
fn report_parse_error(parse_error: &clap::Error, console: &Console) -> Result<i32, RunError> {
    let mut writer = if parse_error.use_stderr() {
        console.err()
    } else {
        console.out()
    };
    write!(writer, "{}", parse_error.render())
        .and_then(|()| writer.flush())
        .map_err(RunError::Output)?;
    Ok(parse_error.exit_code())
}

/// Builds `program` and stores the result for the rest of the process.
///
/// # Errors
///
/// Returns [`ConfigError::AlreadyBuilt`] when a program was already
/// installed, or the program's first configuration error.
pub fn install(mut program: Program) -> Result<&'static App, ConfigError> {
    if INSTALLED.get().is_some() {
        return Err(ConfigError::AlreadyBuilt);
    }
    let app = program.build()?;
    INSTALLED
        .set(app)
        .map_err(|_rejected| ConfigError::AlreadyBuilt)?;
    INSTALLED.get().ok_or(ConfigError::AlreadyBuilt)
}

/// The installed program, if any.
#[must_use]
pub fn installed() -> Option<&'static App> {
    INSTALLED.get()
}

/// Maps a handler exit status onto a process exit code; statuses outside
/// `0..=255` become a generic failure.
#[must_use]
pub fn exit_code_from_status(status: i32) -> ExitCode {
    u8::try_from(status).map_or(ExitCode::FAILURE, ExitCode::from)
}

#[cfg(test)]
mod tests;
