//! Per-invocation state shared with hooks and handlers.
//!
//! [`Streams`] is what an embedder hands to the run entry points; handlers
//! see it as a [`Console`]. An [`InvocationContext`] describes the command
//! being dispatched: which node matched, what the parser produced for each
//! visible symbol, and the cancellation token for the run.

use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use clap::ArgMatches;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::errors::{ConfigError, DispatchError, ValidationError};
use crate::exclusive::{first_conflict, in_scope, parse_groups};
use crate::host;
use crate::tree::{CommandNode, CommandTree, NodeId, Symbol, SymbolId};
use crate::value::Value;

type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

fn shared(writer: impl Write + Send + 'static) -> SharedWriter {
    Arc::new(Mutex::new(Box::new(writer)))
}

/// Output and error writers used by one or more runs.
#[derive(Clone)]
pub struct Streams {
    console: Console,
}

impl Streams {
    /// The process's standard output and standard error.
    #[must_use]
    pub fn process() -> Self {
        Self::new(io::stdout(), io::stderr())
    }

    /// Redirects output and errors to the given writers.
    pub fn new(stdout: impl Write + Send + 'static, stderr: impl Write + Send + 'static) -> Self {
        Self {
            console: Console {
                stdout: shared(stdout),
                stderr: shared(stderr),
            },
        }
    }

    /// Discards everything written.
    #[must_use]
    pub fn sink() -> Self {
        Self::new(io::sink(), io::sink())
    }

    /// The handler-facing view of these streams.
    #[must_use]
    pub fn console(&self) -> Console {
        self.console.clone()
    }
}

impl Default for Streams {
    fn default() -> Self {
        Self::process()
    }
}

impl fmt::Debug for Streams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Streams").finish_non_exhaustive()
    }
}

/// Redirectable standard output and error, injectable into handlers.
///
/// ```
/// use std::io::Write;
///
/// use weft::Streams;
///
/// let console = Streams::sink().console();
/// writeln!(console.out(), "hello").expect("write to sink");
/// ```
#[derive(Clone)]
pub struct Console {
    stdout: SharedWriter,
    stderr: SharedWriter,
}

impl Console {
    /// A writer for standard output.
    #[must_use]
    pub fn out(&self) -> ConsoleWriter {
        ConsoleWriter(Arc::clone(&self.stdout))
    }

    /// A writer for standard error.
    #[must_use]
    pub fn err(&self) -> ConsoleWriter {
        ConsoleWriter(Arc::clone(&self.stderr))
    }
}

impl fmt::Debug for Console {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Console").finish_non_exhaustive()
    }
}

/// A handle to one of the console streams.
pub struct ConsoleWriter(SharedWriter);

impl Write for ConsoleWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().write(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.0.lock().write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.lock().flush()
    }
}

impl fmt::Debug for ConsoleWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleWriter").finish_non_exhaustive()
    }
}

struct ContextInner {
    tree: Arc<CommandTree>,
    node: NodeId,
    chain: Vec<ArgMatches>,
    console: Console,
    cancellation: CancellationToken,
}

/// The parse result and ambient state of one command invocation.
///
/// Cheap to clone; hooks, handlers, and the embedder all share one
/// underlying context per run.
#[derive(Clone)]
pub struct InvocationContext {
    inner: Arc<ContextInner>,
}

impl InvocationContext {
    pub(crate) fn new(
        tree: Arc<CommandTree>,
        node: NodeId,
        chain: Vec<ArgMatches>,
        console: Console,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                tree,
                node,
                chain,
                console,
                cancellation,
            }),
        }
    }

    #[cfg(test)]
    pub(crate) fn detached(streams: Streams, cancellation: CancellationToken) -> Self {
        Self::new(
            Arc::new(CommandTree::with_root("detached")),
            NodeId::ROOT,
            Vec::new(),
            streams.console(),
            cancellation,
        )
    }

    /// The tree the command belongs to.
    #[must_use]
    pub fn tree(&self) -> &CommandTree {
        &self.inner.tree
    }

    /// The matched command.
    #[must_use]
    pub fn command(&self) -> &CommandNode {
        &self.inner.tree[self.inner.node]
    }

    /// Program name plus command path, space separated.
    #[must_use]
    pub fn command_path(&self) -> String {
        self.inner.tree.display_path(self.inner.node)
    }

    /// The console for this run.
    #[must_use]
    pub fn console(&self) -> &Console {
        &self.inner.console
    }

    /// Cancellation token for this run.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.inner.cancellation
    }

    /// Whether the named symbol was typed on the command line. Names are
    /// resolved against the symbols the matched command can see.
    #[must_use]
    pub fn is_supplied(&self, name: &str) -> bool {
        self.lookup(name)
            .is_some_and(|symbol| host::was_supplied(&self.inner.chain, symbol))
    }

    /// The parsed value of the named symbol, or its default when absent.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<Value> {
        self.lookup(name)
            .and_then(|symbol| self.symbol_value(symbol).ok().flatten())
    }

    fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.inner.tree.resolve_symbol(self.inner.node, name)
    }

    pub(crate) fn symbol_supplied(&self, id: SymbolId) -> bool {
        host::was_supplied(&self.inner.chain, &self.inner.tree[id])
    }

    pub(crate) fn parsed(&self, symbol: &Symbol) -> Result<Option<Value>, String> {
        host::parsed_value(&self.inner.chain, symbol)
    }

    /// Parsed value, else the default provider's value, else `None`.
    pub(crate) fn symbol_value(&self, symbol: &Symbol) -> Result<Option<Value>, String> {
        Ok(self.parsed(symbol)?.or_else(|| symbol.default_value()))
    }

    /// Fails when more than one member of any group in `expression` was
    /// supplied. With a non-empty `commands` list the check only runs for
    /// commands named there, by leaf name or by space-separated path.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a malformed expression or an
    /// unknown member, and [`ValidationError::MutuallyExclusive`] for a
    /// conflict.
    pub fn validate_mutually_exclusive(
        &self,
        expression: &str,
        commands: &[&str],
    ) -> Result<(), DispatchError> {
        if !self.in_scope(commands) {
            return Ok(());
        }
        let groups = parse_groups(expression)?;
        let resolved = groups
            .iter()
            .map(|group| self.resolve_group(group))
            .collect::<Result<Vec<_>, _>>()?;
        self.check_groups(&resolved)?;
        Ok(())
    }

    /// Fails when more than one of `names` was supplied.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unknown name and
    /// [`ValidationError::MutuallyExclusive`] for a conflict.
    pub fn validate_exclusive_names(
        &self,
        names: &[&str],
        commands: &[&str],
    ) -> Result<(), DispatchError> {
        if !self.in_scope(commands) {
            return Ok(());
        }
        let group = self.resolve_group(names)?;
        self.check_groups(&[group])?;
        Ok(())
    }

    fn in_scope(&self, commands: &[&str]) -> bool {
        let node = self.command();
        in_scope(commands, &node.name, &node.path)
    }

    fn resolve_group<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<SymbolId>, ConfigError> {
        names
            .iter()
            .map(|name| {
                self.lookup(name.as_ref())
                    .map(Symbol::id)
                    .ok_or_else(|| ConfigError::UnknownGroupMember {
                        command: self.command_path(),
                        name: name.as_ref().to_owned(),
                    })
            })
            .collect()
    }

    pub(crate) fn check_groups(&self, groups: &[Vec<SymbolId>]) -> Result<(), ValidationError> {
        match first_conflict(groups, |id| self.symbol_supplied(id)) {
            Some((first, second)) => Err(ValidationError::MutuallyExclusive {
                first: self.inner.tree[first].display_name().to_owned(),
                second: self.inner.tree[second].display_name().to_owned(),
                command: self.command_path(),
            }),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for InvocationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationContext")
            .field("command", &self.command_path())
            .field("cancelled", &self.inner.cancellation.is_cancelled())
            .finish_non_exhaustive()
    }
}
