//! Declarative metadata records for commands, options, and arguments.
//!
//! A [`Descriptor`] is the statically declared half of a command-line symbol:
//! everything an author writes down next to a handler or field. Descriptors
//! are built with consuming builder methods and are immutable once handed to
//! a [`crate::Program`].

use std::fmt;

use indexmap::IndexSet;

/// The role a descriptor plays in the command tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorKind {
    /// The command executed when no subcommand is given.
    RootCommand,
    /// A named command or subcommand.
    Command,
    /// A named, non-positional parameter.
    Option,
    /// A positional parameter.
    Argument,
}

impl DescriptorKind {
    /// Returns `true` for the two command kinds.
    #[must_use]
    pub const fn is_command(self) -> bool {
        matches!(self, Self::RootCommand | Self::Command)
    }
}

impl fmt::Display for DescriptorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::RootCommand => "root command",
            Self::Command => "command",
            Self::Option => "option",
            Self::Argument => "argument",
        };
        f.write_str(label)
    }
}

/// Inclusive bounds on how many values a symbol consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    /// Minimum number of values.
    pub min: usize,
    /// Maximum number of values.
    pub max: usize,
}

impl Arity {
    /// Creates an arity range.
    #[must_use]
    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    /// Returns `true` when the range is well formed.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.min <= self.max && self.max > 0
    }
}

/// Immutable metadata for one command, option, or argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    kind: DescriptorKind,
    explicit_name: Option<String>,
    description: Option<String>,
    aliases: IndexSet<String>,
    hidden: bool,
    required: Option<bool>,
    arity: Option<Arity>,
    help_name: Option<String>,
    mutually_exclusive_groups: Option<String>,
}

impl Descriptor {
    fn of(kind: DescriptorKind) -> Self {
        Self {
            kind,
            explicit_name: None,
            description: None,
            aliases: IndexSet::new(),
            hidden: false,
            required: None,
            arity: None,
            help_name: None,
            mutually_exclusive_groups: None,
        }
    }

    /// Descriptor for the root command.
    #[must_use]
    pub fn root() -> Self {
        Self::of(DescriptorKind::RootCommand)
    }

    /// Descriptor for a command or subcommand.
    #[must_use]
    pub fn command() -> Self {
        Self::of(DescriptorKind::Command)
    }

    /// Descriptor for an option.
    #[must_use]
    pub fn option() -> Self {
        Self::of(DescriptorKind::Option)
    }

    /// Descriptor for a positional argument.
    #[must_use]
    pub fn argument() -> Self {
        Self::of(DescriptorKind::Argument)
    }

    /// Sets the explicit external name, bypassing case conversion.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.explicit_name = Some(name.into());
        self
    }

    /// Sets the help description.
    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds an alias. Duplicate aliases collapse, first insertion wins the
    /// position.
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.insert(alias.into());
        self
    }

    /// Hides the symbol from help output.
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Forces the required flag instead of inferring it from defaults.
    #[must_use]
    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    /// Sets the value count bounds.
    #[must_use]
    pub fn arity(mut self, min: usize, max: usize) -> Self {
        self.arity = Some(Arity::new(min, max));
        self
    }

    /// Sets the placeholder shown for the value in help output.
    #[must_use]
    pub fn help_name(mut self, help_name: impl Into<String>) -> Self {
        self.help_name = Some(help_name.into());
        self
    }

    /// Sets the mutually exclusive group expression, for example
    /// `"(json,yaml)(quiet,verbose)"` or `"json,yaml,toml"`.
    #[must_use]
    pub fn mutually_exclusive(mut self, expression: impl Into<String>) -> Self {
        self.mutually_exclusive_groups = Some(expression.into());
        self
    }

    /// The descriptor kind.
    #[must_use]
    pub const fn kind(&self) -> DescriptorKind {
        self.kind
    }

    /// The explicit name, if any.
    #[must_use]
    pub fn explicit_name(&self) -> Option<&str> {
        self.explicit_name.as_deref()
    }

    /// The help description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Aliases in declaration order.
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.aliases.iter().map(String::as_str)
    }

    /// Whether the symbol is hidden.
    #[must_use]
    pub const fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// The explicit required flag, `None` when it should be inferred.
    #[must_use]
    pub const fn required_override(&self) -> Option<bool> {
        self.required
    }

    /// The declared arity, if any.
    #[must_use]
    pub const fn arity_bounds(&self) -> Option<Arity> {
        self.arity
    }

    /// The help placeholder, if any.
    #[must_use]
    pub fn help_placeholder(&self) -> Option<&str> {
        self.help_name.as_deref()
    }

    /// The raw mutually exclusive group expression, if any.
    #[must_use]
    pub fn exclusive_groups(&self) -> Option<&str> {
        self.mutually_exclusive_groups.as_deref()
    }
}
