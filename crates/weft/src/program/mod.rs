//! Registration table: the declarative input to the tree builder.
//!
//! A [`Program`] collects handler-less command declarations, method-level
//! commands with their typed handlers and parameter metadata, and option
//! sets backed by static storage. Nothing is validated until
//! [`Program::build`] runs the tree builder.
//!
//! ```
//! use weft::{CommandDecl, Param, Program};
//!
//! let mut program = Program::new("greeter")
//!     .describe("Says hello")
//!     .command(
//!         CommandDecl::new("hello", |name: String| {
//!             let _ = name;
//!         })
//!         .param(Param::argument("name")),
//!     );
//! let app = program.build().expect("valid program");
//! assert!(app.root().has_handler());
//! ```

use std::sync::Arc;

use crate::app::App;
use crate::descriptor::Descriptor;
use crate::errors::ConfigError;
use crate::handler::{AsyncHandler, ErasedHandler, Handler, erase};
use crate::storage::OptionSet;
use crate::tree::builder;
use crate::tree::{DefaultProvider, ValueValidator};
use crate::value::{Value, ValueKind, ValueType};

/// A program: its name, description, and every declaration.
#[derive(Debug)]
pub struct Program {
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) version: Option<String>,
    pub(crate) declarations: Vec<Declaration>,
    pub(crate) commands: Vec<CommandDecl>,
    pub(crate) option_sets: Vec<OptionSet>,
    built: bool,
}

impl Program {
    /// Creates an empty program. `name` becomes the root command name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            version: None,
            declarations: Vec::new(),
            commands: Vec::new(),
            option_sets: Vec::new(),
            built: false,
        }
    }

    /// Program-level description, used for the root when nothing more
    /// specific describes it.
    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Enables `--version` on the root command.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Adds a handler-less command or root declaration.
    #[must_use]
    pub fn declare(mut self, declaration: Declaration) -> Self {
        self.declarations.push(declaration);
        self
    }

    /// Adds a command with a handler.
    #[must_use]
    pub fn command(mut self, command: CommandDecl) -> Self {
        self.commands.push(command);
        self
    }

    /// Adds an option set.
    #[must_use]
    pub fn options(mut self, set: OptionSet) -> Self {
        self.option_sets.push(set);
        self
    }

    /// The program name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the tree builder.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::AlreadyBuilt`] on a second call, or the first
    /// configuration error found in the declarations.
    pub fn build(&mut self) -> Result<App, ConfigError> {
        if self.built {
            return Err(ConfigError::AlreadyBuilt);
        }
        self.built = true;
        let tree = builder::build(self)?;
        Ok(App::new(tree))
    }
}

/// A handler-less command declared at program or container scope.
#[derive(Debug)]
pub struct Declaration {
    pub(crate) origin: String,
    pub(crate) descriptor: Descriptor,
    pub(crate) recursive_options: Option<String>,
}

impl Declaration {
    /// Declares a command described by `descriptor`. `origin` names the
    /// declaring scope in error messages.
    pub fn new(origin: impl Into<String>, descriptor: Descriptor) -> Self {
        Self {
            origin: origin.into(),
            descriptor,
            recursive_options: None,
        }
    }

    /// Makes the named option set recursive from this command.
    #[must_use]
    pub fn recursive_options(mut self, set: impl Into<String>) -> Self {
        self.recursive_options = Some(set.into());
        self
    }
}

/// A command bound to a handler.
pub struct CommandDecl {
    pub(crate) member: String,
    pub(crate) descriptor: Descriptor,
    pub(crate) handler: Arc<dyn ErasedHandler>,
    pub(crate) params: Vec<Param>,
    pub(crate) recursive_options: Option<String>,
}

impl CommandDecl {
    /// Declares a synchronous command. The command name derives from
    /// `member` unless the descriptor names it.
    pub fn new<H, Args>(member: impl Into<String>, handler: H) -> Self
    where
        H: Handler<Args>,
        Args: 'static,
    {
        Self::from_erased(member.into(), erase(handler))
    }

    /// Declares a command whose handler is an async function.
    pub fn asynchronous<F, Args>(member: impl Into<String>, handler: F) -> Self
    where
        AsyncHandler<F>: Handler<Args>,
        Args: 'static,
    {
        Self::from_erased(member.into(), erase(AsyncHandler(handler)))
    }

    fn from_erased(member: String, handler: Arc<dyn ErasedHandler>) -> Self {
        Self {
            member,
            descriptor: Descriptor::command(),
            handler,
            params: Vec::new(),
            recursive_options: None,
        }
    }

    /// Replaces the command metadata. Use [`Descriptor::root`] to mark the
    /// handler as the root command.
    #[must_use]
    pub fn descriptor(mut self, descriptor: Descriptor) -> Self {
        self.descriptor = descriptor;
        self
    }

    /// Appends the next value parameter.
    #[must_use]
    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    /// Makes the named option set recursive from this command.
    #[must_use]
    pub fn recursive_options(mut self, set: impl Into<String>) -> Self {
        self.recursive_options = Some(set.into());
        self
    }
}

impl std::fmt::Debug for CommandDecl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDecl")
            .field("member", &self.member)
            .field("descriptor", &self.descriptor)
            .field("params", &self.params)
            .field("recursive_options", &self.recursive_options)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub(crate) struct ParamDefault {
    pub(crate) kind: ValueKind,
    pub(crate) provider: DefaultProvider,
}

/// Metadata for one handler value parameter.
pub struct Param {
    pub(crate) member: String,
    pub(crate) descriptor: Descriptor,
    pub(crate) default: Option<ParamDefault>,
    pub(crate) validators: Vec<ValueValidator>,
}

impl Param {
    /// A named option.
    pub fn option(member: impl Into<String>) -> Self {
        Self::with_descriptor(member, Descriptor::option())
    }

    /// A positional argument.
    pub fn argument(member: impl Into<String>) -> Self {
        Self::with_descriptor(member, Descriptor::argument())
    }

    /// A parameter with explicit metadata. The descriptor must be an option
    /// or argument descriptor; anything else fails at build time.
    pub fn with_descriptor(member: impl Into<String>, descriptor: Descriptor) -> Self {
        Self {
            member: member.into(),
            descriptor,
            default: None,
            validators: Vec::new(),
        }
    }

    fn map_descriptor(mut self, update: impl FnOnce(Descriptor) -> Descriptor) -> Self {
        self.descriptor = update(self.descriptor);
        self
    }

    /// Sets the explicit external name.
    #[must_use]
    pub fn named(self, name: impl Into<String>) -> Self {
        self.map_descriptor(|descriptor| descriptor.named(name))
    }

    /// Sets the help description.
    #[must_use]
    pub fn describe(self, description: impl Into<String>) -> Self {
        self.map_descriptor(|descriptor| descriptor.describe(description))
    }

    /// Adds an alias.
    #[must_use]
    pub fn alias(self, alias: impl Into<String>) -> Self {
        self.map_descriptor(|descriptor| descriptor.alias(alias))
    }

    /// Hides the parameter from help.
    #[must_use]
    pub fn hidden(self) -> Self {
        self.map_descriptor(Descriptor::hidden)
    }

    /// Forces the required flag.
    #[must_use]
    pub fn required(self, required: bool) -> Self {
        self.map_descriptor(|descriptor| descriptor.required(required))
    }

    /// Sets the value count bounds.
    #[must_use]
    pub fn arity(self, min: usize, max: usize) -> Self {
        self.map_descriptor(|descriptor| descriptor.arity(min, max))
    }

    /// Sets the help placeholder.
    #[must_use]
    pub fn help_name(self, help_name: impl Into<String>) -> Self {
        self.map_descriptor(|descriptor| descriptor.help_name(help_name))
    }

    /// Uses `value` when the parameter is absent from the command line.
    #[must_use]
    pub fn default_value<T: ValueType>(self, value: T) -> Self {
        self.default_with(move || value.clone())
    }

    /// Computes the default on demand when the parameter is absent.
    #[must_use]
    pub fn default_with<T, F>(mut self, provider: F) -> Self
    where
        T: ValueType,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.default = Some(ParamDefault {
            kind: T::kind(),
            provider: Arc::new(move || provider().into_value()),
        });
        self
    }

    /// Adds a value check run before the handler. A rejection becomes a
    /// validation error routed through the exception handler.
    #[must_use]
    pub fn validate<T, F>(mut self, check: F) -> Self
    where
        T: ValueType,
        F: Fn(&T) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validators.push(Arc::new(move |value: &Value| {
            T::from_value(value.clone())
                .map_or_else(|| Err(format!("expected {}", T::kind())), |typed| check(&typed))
        }));
        self
    }
}

impl std::fmt::Debug for Param {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Param")
            .field("member", &self.member)
            .field("descriptor", &self.descriptor)
            .field("default_kind", &self.default.as_ref().map(|default| &default.kind))
            .field("validators", &self.validators.len())
            .finish()
    }
}
