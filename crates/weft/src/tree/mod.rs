//! The assembled command tree.
//!
//! Nodes and symbols live in two arenas owned by [`CommandTree`] and refer to
//! each other through [`NodeId`] and [`SymbolId`]. A recursive option is a
//! single symbol referenced from its owning node; descendants see it through
//! the ancestor chain rather than through a copy.

use std::fmt;
use std::ops::{Index, IndexMut};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::descriptor::Arity;
use crate::handler::{ErasedHandler, ResultShape};
use crate::naming::bare_name;
use crate::storage::GlobalOptionInitializer;
use crate::value::{Value, ValueKind};

pub(crate) mod builder;

/// Identifies a command node within its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// The root command.
    pub const ROOT: Self = Self(0);
}

/// Identifies an option or argument symbol within its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(usize);

/// Whether a symbol is named or positional.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// A named option.
    Option,
    /// A positional argument.
    Argument,
}

pub(crate) type DefaultProvider = Arc<dyn Fn() -> Value + Send + Sync>;
pub(crate) type ValueValidator = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

/// A parser-facing option or argument.
pub struct Symbol {
    pub(crate) id: SymbolId,
    pub(crate) kind: SymbolKind,
    pub(crate) name: String,
    pub(crate) aliases: Vec<String>,
    pub(crate) description: Option<String>,
    pub(crate) value_kind: ValueKind,
    pub(crate) required: bool,
    pub(crate) arity: Option<Arity>,
    pub(crate) hidden: bool,
    pub(crate) help_name: Option<String>,
    pub(crate) recursive: bool,
    pub(crate) owner: NodeId,
    pub(crate) default: Option<DefaultProvider>,
    pub(crate) validators: Vec<ValueValidator>,
}

impl Symbol {
    /// The symbol id.
    #[must_use]
    pub const fn id(&self) -> SymbolId {
        self.id
    }

    /// Option or argument.
    #[must_use]
    pub const fn kind(&self) -> SymbolKind {
        self.kind
    }

    /// The external name. Options carry their dash prefix.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dash-prefixed aliases, in declaration order.
    #[must_use]
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// The help description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// The value kind.
    #[must_use]
    pub const fn value_kind(&self) -> &ValueKind {
        &self.value_kind
    }

    /// Whether the parser requires the symbol.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.required
    }

    /// The declared arity, if any.
    #[must_use]
    pub const fn arity(&self) -> Option<Arity> {
        self.arity
    }

    /// Whether the symbol is hidden from help.
    #[must_use]
    pub const fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Whether the option is visible to descendants of its owner.
    #[must_use]
    pub const fn is_recursive(&self) -> bool {
        self.recursive
    }

    /// The node that declares the symbol.
    #[must_use]
    pub const fn owner(&self) -> NodeId {
        self.owner
    }

    /// Invokes the default-value provider.
    #[must_use]
    pub fn default_value(&self) -> Option<Value> {
        self.default.as_ref().map(|provider| provider())
    }

    /// Whether `name` refers to this symbol, ignoring dash prefixes.
    #[must_use]
    pub fn answers_to(&self, name: &str) -> bool {
        let wanted = bare_name(name);
        bare_name(&self.name) == wanted
            || self.aliases.iter().any(|alias| bare_name(alias) == wanted)
    }

    /// Name without its dash prefix, as used in messages.
    #[must_use]
    pub fn display_name(&self) -> &str {
        bare_name(&self.name)
    }

    pub(crate) fn host_id(&self) -> String {
        format!("{}@{}", bare_name(&self.name), self.id.0)
    }

    pub(crate) fn validate(&self, value: &Value) -> Result<(), String> {
        self.validators
            .iter()
            .try_for_each(|validator| validator(value))
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Symbol")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("value_kind", &self.value_kind)
            .field("required", &self.required)
            .field("recursive", &self.recursive)
            .field("has_default", &self.default.is_some())
            .finish_non_exhaustive()
    }
}

/// How one handler parameter is fed at dispatch time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BoundSlot {
    Value(SymbolId),
    Injected,
}

/// A handler bound to the symbols of its node.
#[derive(Clone)]
pub(crate) struct HandlerBinding {
    pub(crate) handler: Arc<dyn ErasedHandler>,
    pub(crate) slots: Vec<BoundSlot>,
    pub(crate) shape: ResultShape,
}

impl fmt::Debug for HandlerBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerBinding")
            .field("slots", &self.slots)
            .field("shape", &self.shape)
            .finish_non_exhaustive()
    }
}

/// One command or subcommand.
#[derive(Debug)]
pub struct CommandNode {
    pub(crate) id: NodeId,
    pub(crate) name: String,
    pub(crate) path: Vec<String>,
    pub(crate) aliases: Vec<String>,
    pub(crate) description: Option<String>,
    pub(crate) hidden: bool,
    pub(crate) handler: Option<HandlerBinding>,
    pub(crate) children: IndexMap<String, NodeId>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) options: Vec<SymbolId>,
    pub(crate) arguments: Vec<SymbolId>,
    pub(crate) recursive_options: Vec<SymbolId>,
    pub(crate) exclusive_groups: Vec<Vec<SymbolId>>,
    pub(crate) declared: bool,
}

impl CommandNode {
    fn new(id: NodeId, name: String, path: Vec<String>, parent: Option<NodeId>) -> Self {
        Self {
            id,
            name,
            path,
            aliases: Vec::new(),
            description: None,
            hidden: false,
            handler: None,
            children: IndexMap::new(),
            parent,
            options: Vec::new(),
            arguments: Vec::new(),
            recursive_options: Vec::new(),
            exclusive_groups: Vec::new(),
            declared: false,
        }
    }

    /// The node id.
    #[must_use]
    pub const fn id(&self) -> NodeId {
        self.id
    }

    /// Leaf name. The root carries the program name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path segments below the root; empty for the root itself.
    #[must_use]
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Command aliases.
    #[must_use]
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// The help description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Whether the command is hidden from help.
    #[must_use]
    pub const fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Whether a handler is attached.
    #[must_use]
    pub const fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    /// The declared result shape of the attached handler.
    #[must_use]
    pub fn result_shape(&self) -> Option<ResultShape> {
        self.handler.as_ref().map(|binding| binding.shape)
    }

    /// The parent node; `None` for the root.
    #[must_use]
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child node ids in insertion order.
    pub fn children(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children.values().copied()
    }

    /// Options declared directly on this node.
    #[must_use]
    pub fn options(&self) -> &[SymbolId] {
        &self.options
    }

    /// Positional arguments in order.
    #[must_use]
    pub fn arguments(&self) -> &[SymbolId] {
        &self.arguments
    }

    /// Options this node shares with its descendants.
    #[must_use]
    pub fn recursive_options(&self) -> &[SymbolId] {
        &self.recursive_options
    }

    /// Mutually exclusive groups declared on the command.
    #[must_use]
    pub fn exclusive_groups(&self) -> &[Vec<SymbolId>] {
        &self.exclusive_groups
    }
}

/// The fully linked command tree plus the global option initializers.
pub struct CommandTree {
    pub(crate) program: String,
    pub(crate) version: Option<String>,
    pub(crate) nodes: Vec<CommandNode>,
    pub(crate) symbols: Vec<Symbol>,
    pub(crate) initializers: Vec<GlobalOptionInitializer>,
}

impl CommandTree {
    pub(crate) fn with_root(program: impl Into<String>) -> Self {
        let program = program.into();
        let mut root = CommandNode::new(NodeId::ROOT, program.clone(), Vec::new(), None);
        root.declared = true;
        Self {
            program,
            version: None,
            nodes: vec![root],
            symbols: Vec::new(),
            initializers: Vec::new(),
        }
    }

    /// The program name, used as the root command name.
    #[must_use]
    pub fn program_name(&self) -> &str {
        &self.program
    }

    /// The root command.
    #[must_use]
    pub fn root(&self) -> &CommandNode {
        &self[NodeId::ROOT]
    }

    /// Looks up a node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&CommandNode> {
        self.nodes.get(id.0)
    }

    /// Looks up a symbol.
    #[must_use]
    pub fn symbol(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(id.0)
    }

    /// Every node, root first.
    pub fn nodes(&self) -> impl Iterator<Item = &CommandNode> {
        self.nodes.iter()
    }

    /// Finds a command by its path below the root.
    #[must_use]
    pub fn find(&self, path: &[&str]) -> Option<&CommandNode> {
        path.iter().try_fold(self.root(), |node, segment| {
            node.children.get(*segment).map(|child| &self[*child])
        })
    }

    /// The node and its ancestors, nearest first.
    pub fn ancestry(&self, id: NodeId) -> impl Iterator<Item = &CommandNode> {
        std::iter::successors(self.node(id), |node| node.parent.and_then(|p| self.node(p)))
    }

    /// Program name followed by the command path, space separated.
    #[must_use]
    pub fn display_path(&self, id: NodeId) -> String {
        let mut segments = vec![self.program.as_str()];
        if let Some(node) = self.node(id) {
            segments.extend(node.path.iter().map(String::as_str));
        }
        segments.join(" ")
    }

    /// Symbols a command can see: its own options and arguments, then the
    /// recursive options of the command and its ancestors.
    #[must_use]
    pub fn visible_symbols(&self, id: NodeId) -> Vec<SymbolId> {
        let Some(node) = self.node(id) else {
            return Vec::new();
        };
        let mut visible: Vec<SymbolId> = node
            .options
            .iter()
            .chain(node.arguments.iter())
            .copied()
            .collect();
        visible.extend(
            self.ancestry(id)
                .flat_map(|ancestor| ancestor.recursive_options.iter().copied()),
        );
        visible
    }

    /// Resolves a symbol name as seen from `id`.
    #[must_use]
    pub fn resolve_symbol(&self, id: NodeId, name: &str) -> Option<&Symbol> {
        self.visible_symbols(id)
            .into_iter()
            .map(|symbol| &self[symbol])
            .find(|symbol| symbol.answers_to(name))
    }
}

impl Index<NodeId> for CommandTree {
    type Output = CommandNode;

    #[expect(
        clippy::indexing_slicing,
        reason = "node ids are only minted by the tree that owns the arena"
    )]
    fn index(&self, id: NodeId) -> &Self::Output {
        &self.nodes[id.0]
    }
}

impl IndexMut<NodeId> for CommandTree {
    #[expect(
        clippy::indexing_slicing,
        reason = "node ids are only minted by the tree that owns the arena"
    )]
    fn index_mut(&mut self, id: NodeId) -> &mut Self::Output {
        &mut self.nodes[id.0]
    }
}

impl Index<SymbolId> for CommandTree {
    type Output = Symbol;

    #[expect(
        clippy::indexing_slicing,
        reason = "symbol ids are only minted by the tree that owns the arena"
    )]
    fn index(&self, id: SymbolId) -> &Self::Output {
        &self.symbols[id.0]
    }
}

impl fmt::Debug for CommandTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandTree")
            .field("program", &self.program)
            .field("nodes", &self.nodes)
            .field("symbols", &self.symbols)
            .field("initializers", &self.initializers.len())
            .finish()
    }
}
