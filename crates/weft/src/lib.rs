//! Declarative command binding over `clap`.
//!
//! weft turns a table of command, option, and argument descriptors into a
//! `clap` command tree and dispatches the parsed input back to ordinary Rust
//! functions. A [`Program`] collects the declarations; [`Program::build`]
//! resolves names, picks the root command, links subcommands, and binds
//! every handler parameter to a parser symbol, failing fast on malformed
//! metadata. The resulting [`App`] parses command lines and runs the
//! matched handler:
//!
//! ```
//! use weft::{CommandDecl, Param, Program, Streams};
//!
//! let mut program = Program::new("greet").command(
//!     CommandDecl::new("SayHello", |name: String, loud: bool| {
//!         if loud && name == "Ada" { 3 } else { 0 }
//!     })
//!     .param(Param::argument("Name"))
//!     .param(Param::option("Loud").default_value(false)),
//! );
//! let app = program.build().expect("valid declarations");
//! let code = app.run(["Ada", "--loud"], Streams::sink()).expect("command runs");
//! assert_eq!(code, 3);
//! ```
//!
//! Runs pass through a fixed sequence: global option storage is written,
//! exclusive groups and validators are checked, before-command hooks run,
//! the handler is invoked and its result normalised to an exit code, and
//! after-command hooks may replace that code. Failures along the way go to
//! the exception handler set with [`App::set_exception_handler`].

mod app;
mod context;
mod descriptor;
mod dispatch;
mod errors;
pub mod exclusive;
mod handler;
mod hooks;
mod host;
pub mod naming;
mod program;
mod storage;
pub mod telemetry;
mod tree;
mod value;

pub use app::{App, REQUIRED_COMMAND_MESSAGE, exit_code_from_status, install, installed};
pub use context::{Console, ConsoleWriter, InvocationContext, Streams};
pub use descriptor::{Arity, Descriptor, DescriptorKind};
pub use errors::{ConfigError, DispatchError, RunError, ValidationError};
pub use handler::{
    AsyncHandler, Completion, Eventual, Handler, HandlerArg, Immediate, IntoOutcome, ResultShape,
    SlotError, SlotInput, SlotSpec,
};
pub use program::{CommandDecl, Declaration, Param, Program};
pub use storage::{OptionCell, OptionField, OptionSet};
pub use tokio_util::sync::CancellationToken;
pub use tree::{CommandNode, CommandTree, NodeId, Symbol, SymbolId, SymbolKind};
pub use value::{IntegerRange, Value, ValueKind, ValueType};

#[cfg(test)]
mod tests;
