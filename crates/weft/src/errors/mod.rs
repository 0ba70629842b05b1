//! Error taxonomy for tree construction and command dispatch.
//!
//! Configuration errors describe malformed declarations and surface before
//! any argument is parsed. Validation, hook, and handler failures surface
//! during dispatch and are offered to the exception handler. [`RunError`] is
//! what finally reaches the embedding program.

use std::io;

use thiserror::Error;

use crate::descriptor::{Arity, DescriptorKind};
use crate::value::ValueKind;

/// Malformed declarative metadata. Always fatal, never routed through the
/// exception handler.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The command tree was already built.
    #[error("the command tree has already been built")]
    AlreadyBuilt,

    /// The program declares nothing to run.
    #[error("program '{program}' declares no commands")]
    NoCommands {
        /// Program name.
        program: String,
    },

    /// More than one root command was declared at the same priority.
    #[error("multiple root commands declared: '{first}' and '{second}'")]
    DuplicateRoot {
        /// Member or declaration that claimed the root first.
        first: String,
        /// Member or declaration that claimed it again.
        second: String,
    },

    /// Two declarations resolve to the same command path.
    #[error("command '{path}' is declared more than once")]
    DuplicateCommand {
        /// Space-separated command path.
        path: String,
    },

    /// A command node would receive a second handler.
    #[error("command '{path}' already has a handler")]
    MultipleHandlers {
        /// Space-separated command path.
        path: String,
    },

    /// A handler-less command has no subcommands and is not hidden.
    #[error("command '{path}' has no handler and no subcommands")]
    EmptyGroup {
        /// Space-separated command path.
        path: String,
    },

    /// A name could not be resolved to a usable external name.
    #[error("invalid name '{name}': {reason}")]
    InvalidName {
        /// The offending name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A descriptor of the wrong kind was attached to a member.
    #[error("'{member}' must be declared as {expected}, found {found}")]
    InvalidDescriptor {
        /// Member name.
        member: String,
        /// Kind(s) accepted for this member.
        expected: &'static str,
        /// Kind that was declared.
        found: DescriptorKind,
    },

    /// A command references an option set that was never registered.
    #[error("command '{command}' references unknown option set '{set}'")]
    UnknownOptionSet {
        /// Space-separated command path.
        command: String,
        /// Referenced set name.
        set: String,
    },

    /// Declared parameters do not line up with the handler signature.
    #[error("command '{command}' declares {declared} parameters but its handler takes {expected}")]
    ParameterCountMismatch {
        /// Space-separated command path.
        command: String,
        /// Number of declared parameters.
        declared: usize,
        /// Number of value parameters the handler accepts.
        expected: usize,
    },

    /// A default value does not fit the symbol's value kind.
    #[error("default value for '{symbol}' is not a valid {expected}")]
    DefaultTypeMismatch {
        /// Symbol name.
        symbol: String,
        /// Kind the handler expects.
        expected: ValueKind,
    },

    /// The value kind cannot be expressed on the command line.
    #[error("'{symbol}' uses unsupported value kind {kind}")]
    UnsupportedValueKind {
        /// Symbol name.
        symbol: String,
        /// Offending kind.
        kind: ValueKind,
    },

    /// An arity range is empty or inverted, or exceeds one for a scalar.
    #[error("'{symbol}' declares invalid arity {min}..={max}", min = .arity.min, max = .arity.max)]
    InvalidArity {
        /// Symbol name.
        symbol: String,
        /// Declared bounds.
        arity: Arity,
    },

    /// Global and recursive options cannot be required.
    #[error("recursive option '{symbol}' cannot be required")]
    RequiredRecursiveOption {
        /// Symbol name.
        symbol: String,
    },

    /// Positional arguments are declared in an order the parser cannot
    /// resolve.
    #[error("argument '{argument}' of command '{command}' is out of order: {reason}")]
    InvalidArgumentOrder {
        /// Space-separated command path.
        command: String,
        /// Offending argument.
        argument: String,
        /// Which layout rule it breaks.
        reason: &'static str,
    },

    /// Two visible symbols on one command share a name or alias.
    #[error("command '{command}' exposes '{name}' more than once")]
    DuplicateSymbol {
        /// Space-separated command path.
        command: String,
        /// Colliding name.
        name: String,
    },

    /// A mutually exclusive group expression could not be parsed.
    #[error("malformed mutually exclusive group expression '{expression}': {reason}")]
    MalformedGroups {
        /// Raw expression.
        expression: String,
        /// Parse failure.
        reason: &'static str,
    },

    /// A mutually exclusive group names a symbol the command cannot see.
    #[error("command '{command}' has no option or argument named '{name}'")]
    UnknownGroupMember {
        /// Space-separated command path.
        command: String,
        /// Unresolved member name.
        name: String,
    },
}

impl ConfigError {
    /// Creates an invalid name error.
    #[must_use]
    pub fn invalid_name(name: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason,
        }
    }

    /// Creates a malformed group expression error.
    #[must_use]
    pub fn malformed_groups(expression: impl Into<String>, reason: &'static str) -> Self {
        Self::MalformedGroups {
            expression: expression.into(),
            reason,
        }
    }
}

/// Invalid input detected by weft before the handler runs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// More than one member of a mutually exclusive group was supplied.
    #[error("options '{first}' and '{second}' cannot be used together with command '{command}'")]
    MutuallyExclusive {
        /// First offending symbol.
        first: String,
        /// Second offending symbol.
        second: String,
        /// Full command path, including the program name.
        command: String,
    },

    /// A value validator rejected the supplied value.
    #[error("invalid value for '{symbol}': {message}")]
    InvalidValue {
        /// Symbol name.
        symbol: String,
        /// Validator message.
        message: String,
    },
}

/// Failures raised while dispatching one invocation.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Configuration problem detected at call time, for example a malformed
    /// group expression handed to a validation helper.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Input failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A before- or after-command hook failed.
    #[error("command hook failed: {0:#}")]
    Hook(anyhow::Error),

    /// The command handler failed.
    #[error("{0:#}")]
    Handler(anyhow::Error),

    /// A parsed value could not be handed to the handler.
    #[error("cannot bind arguments for command '{command}': {message}")]
    Extraction {
        /// Full command path.
        command: String,
        /// What went wrong.
        message: String,
    },
}

impl DispatchError {
    /// Returns the underlying handler error, if this is one.
    #[must_use]
    pub const fn handler_error(&self) -> Option<&anyhow::Error> {
        match self {
            Self::Handler(error) => Some(error),
            _ => None,
        }
    }

    /// Returns the validation error, if this is one.
    #[must_use]
    pub const fn validation_error(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(error) => Some(error),
            _ => None,
        }
    }

    pub(crate) fn extraction(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Extraction {
            command: command.into(),
            message: message.into(),
        }
    }
}

/// Errors surfaced to the embedding program by the run entry points.
#[derive(Debug, Error)]
pub enum RunError {
    /// Configuration problem; the command line was not acted upon.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A dispatch failure with no exception handler installed.
    #[error(transparent)]
    Unhandled(#[from] DispatchError),

    /// The exception handler itself failed.
    #[error("exception handler failed: {0:#}")]
    ExceptionHandler(anyhow::Error),

    /// The async runtime backing [`crate::App::run`] could not start.
    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] io::Error),

    /// Writing parser output or diagnostics failed.
    #[error("failed to write output: {0}")]
    Output(#[source] io::Error),
}
