//! Assembles a [`CommandTree`] from a [`Program`].
//!
//! The builder resolves the root, seeds handler-less declarations, walks
//! method commands shortest path first so parents always exist before their
//! children, attaches option sets, binds handler parameters to symbols, and
//! finally resolves mutually exclusive groups. The first violated invariant
//! aborts the build; nothing is parsed from a partially built tree.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::{
    BoundSlot, CommandNode, CommandTree, HandlerBinding, NodeId, Symbol, SymbolId, SymbolKind,
};
use crate::descriptor::{Descriptor, DescriptorKind};
use crate::errors::ConfigError;
use crate::exclusive::parse_groups;
use crate::handler::SlotSpec;
use crate::host::flag_key;
use crate::naming::{apply_dash_prefix, explicit_segments, resolve_command_name, resolve_symbol_name};
use crate::program::{CommandDecl, Declaration, Param, Program};
use crate::storage::{GlobalOptionInitializer, OptionField};
use crate::value::ValueKind;

pub(crate) const TREE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::tree");

/// Builds the command tree for `program`.
pub(crate) fn build(program: &Program) -> Result<CommandTree, ConfigError> {
    TreeBuilder::new(program).build()
}

/// Which declarations claim the root.
struct RootPlan<'p> {
    declaration: Option<&'p Declaration>,
    command: Option<usize>,
}

struct TreeBuilder<'p> {
    program: &'p Program,
    tree: CommandTree,
    bindings: Vec<(NodeId, &'p CommandDecl)>,
    groups: Vec<(NodeId, &'p Descriptor)>,
    set_refs: Vec<(NodeId, &'p str)>,
}

impl<'p> TreeBuilder<'p> {
    fn new(program: &'p Program) -> Self {
        let mut tree = CommandTree::with_root(program.name.clone());
        tree.version.clone_from(&program.version);
        Self {
            program,
            tree,
            bindings: Vec::new(),
            groups: Vec::new(),
            set_refs: Vec::new(),
        }
    }

    fn build(mut self) -> Result<CommandTree, ConfigError> {
        if self.program.declarations.is_empty() && self.program.commands.is_empty() {
            return Err(ConfigError::NoCommands {
                program: self.program.name.clone(),
            });
        }
        let plan = self.resolve_root()?;
        self.configure_root(&plan);
        self.seed_declarations()?;
        self.attach_commands(&plan)?;
        self.check_groups()?;
        self.attach_option_sets()?;
        self.bind_handlers()?;
        self.check_argument_order()?;
        self.resolve_exclusive_groups()?;
        self.check_symbol_collisions()?;
        debug!(
            target: TREE_TARGET,
            program = %self.tree.program,
            commands = self.tree.nodes.len(),
            symbols = self.tree.symbols.len(),
            globals = self.tree.initializers.len(),
            "command tree built"
        );
        Ok(self.tree)
    }

    fn resolve_root(&self) -> Result<RootPlan<'p>, ConfigError> {
        let program = self.program;
        let declaration = single_root(
            program
                .declarations
                .iter()
                .filter(|declaration| declaration.descriptor.kind() == DescriptorKind::RootCommand),
            |declaration| declaration.origin.clone(),
        )?;
        let marked = single_root(
            program
                .commands
                .iter()
                .enumerate()
                .filter(|(_, command)| command.descriptor.kind() == DescriptorKind::RootCommand),
            |(_, command)| command.member.clone(),
        )?
        .map(|(index, _)| index);
        if declaration.is_some() || marked.is_some() {
            return Ok(RootPlan {
                declaration,
                command: marked,
            });
        }

        let sole = program.declarations.len() + program.commands.len() == 1;
        let inferred = match program.commands.first() {
            Some(command) if sole => {
                resolve_command_name(command.descriptor.explicit_name(), &command.member, true)?
                    .is_root_candidate
                    .then_some(0)
            }
            _ => None,
        };
        Ok(RootPlan {
            declaration: None,
            command: inferred,
        })
    }

    fn configure_root(&mut self, plan: &RootPlan<'p>) {
        let program = self.program;
        let command = plan.command.and_then(|index| program.commands.get(index));
        let description = plan
            .declaration
            .and_then(|declaration| declaration.descriptor.description())
            .or_else(|| command.and_then(|command| command.descriptor.description()))
            .map(str::to_owned)
            .or_else(|| program.description.clone());
        self.tree[NodeId::ROOT].description = description;

        if let Some(declaration) = plan.declaration {
            self.groups.push((NodeId::ROOT, &declaration.descriptor));
            if let Some(set) = &declaration.recursive_options {
                self.set_refs.push((NodeId::ROOT, set.as_str()));
            }
        }
        if let Some(command) = command {
            self.groups.push((NodeId::ROOT, &command.descriptor));
            if let Some(set) = &command.recursive_options {
                self.set_refs.push((NodeId::ROOT, set.as_str()));
            }
            self.bindings.push((NodeId::ROOT, command));
            debug!(target: TREE_TARGET, member = %command.member, "handler promoted to root");
        }
    }

    fn seed_declarations(&mut self) -> Result<(), ConfigError> {
        let program = self.program;
        let mut seeds = Vec::new();
        for declaration in &program.declarations {
            match declaration.descriptor.kind() {
                DescriptorKind::RootCommand => {}
                DescriptorKind::Command => {
                    let name = declaration.descriptor.explicit_name().ok_or_else(|| {
                        ConfigError::invalid_name(
                            declaration.origin.clone(),
                            "handler-less commands need an explicit name",
                        )
                    })?;
                    seeds.push((explicit_segments(name)?, declaration));
                }
                found => {
                    return Err(ConfigError::InvalidDescriptor {
                        member: declaration.origin.clone(),
                        expected: "a command or root command",
                        found,
                    });
                }
            }
        }
        seeds.sort_by_key(|(segments, _)| segments.len());
        for (segments, declaration) in seeds {
            let id = self.claim(&segments)?;
            self.apply_metadata(id, &declaration.descriptor);
            if let Some(set) = &declaration.recursive_options {
                self.set_refs.push((id, set.as_str()));
            }
        }
        Ok(())
    }

    fn attach_commands(&mut self, plan: &RootPlan<'p>) -> Result<(), ConfigError> {
        let program = self.program;
        let mut resolved = Vec::new();
        for (index, command) in program.commands.iter().enumerate() {
            if plan.command == Some(index) {
                continue;
            }
            let kind = command.descriptor.kind();
            if !kind.is_command() {
                return Err(ConfigError::InvalidDescriptor {
                    member: command.member.clone(),
                    expected: "a command or root command",
                    found: kind,
                });
            }
            let name =
                resolve_command_name(command.descriptor.explicit_name(), &command.member, false)?;
            resolved.push((name.segments, command));
        }
        resolved.sort_by_key(|(segments, _)| segments.len());
        for (segments, command) in resolved {
            let id = self.claim(&segments)?;
            self.apply_metadata(id, &command.descriptor);
            self.groups.push((id, &command.descriptor));
            if let Some(set) = &command.recursive_options {
                self.set_refs.push((id, set.as_str()));
            }
            self.bindings.push((id, command));
            debug!(target: TREE_TARGET, path = %segments.join(" "), "command attached");
        }
        Ok(())
    }

    /// Walks `segments` from the root, creating missing intermediate nodes,
    /// and claims the final node for a declaration.
    fn claim(&mut self, segments: &[String]) -> Result<NodeId, ConfigError> {
        let mut current = NodeId::ROOT;
        for (depth, segment) in segments.iter().enumerate() {
            let existing = self.tree[current].children.get(segment).copied();
            current = match existing {
                Some(child) => child,
                None => self
                    .tree
                    .add_child(current, segment, segments.iter().take(depth + 1)),
            };
        }
        if self.tree[current].declared {
            let path = segments.join(" ");
            let bound = self.bindings.iter().any(|(id, _)| *id == current);
            return Err(if bound {
                ConfigError::MultipleHandlers { path }
            } else {
                ConfigError::DuplicateCommand { path }
            });
        }
        self.tree[current].declared = true;
        Ok(current)
    }

    fn apply_metadata(&mut self, id: NodeId, descriptor: &Descriptor) {
        let node = &mut self.tree[id];
        if let Some(description) = descriptor.description() {
            node.description = Some(description.to_owned());
        }
        node.aliases.extend(descriptor.aliases().map(str::to_owned));
        node.hidden |= descriptor.is_hidden();
    }

    fn check_groups(&self) -> Result<(), ConfigError> {
        let has_handler = |id: NodeId| self.bindings.iter().any(|(bound, _)| *bound == id);
        for node in &self.tree.nodes {
            if has_handler(node.id) || !node.children.is_empty() {
                continue;
            }
            if node.id == NodeId::ROOT {
                return Err(ConfigError::NoCommands {
                    program: self.program.name.clone(),
                });
            }
            if !node.hidden {
                return Err(ConfigError::EmptyGroup {
                    path: node.path.join(" "),
                });
            }
        }
        Ok(())
    }

    fn attach_option_sets(&mut self) -> Result<(), ConfigError> {
        let program = self.program;
        for (node, set_name) in self.set_refs.clone() {
            let set = program
                .option_sets
                .iter()
                .find(|set| set.name() == set_name)
                .ok_or_else(|| ConfigError::UnknownOptionSet {
                    command: self.tree.display_path(node),
                    set: set_name.to_owned(),
                })?;
            for field in set.fields() {
                self.attach_field(node, field)?;
            }
        }
        let referenced = |name: &str| self.set_refs.iter().any(|(_, set)| *set == name);
        let globals: Vec<&OptionField> = program
            .option_sets
            .iter()
            .filter(|set| !referenced(set.name()))
            .flat_map(|set| set.fields().iter())
            .collect();
        for field in globals {
            self.attach_field(NodeId::ROOT, field)?;
        }
        Ok(())
    }

    fn attach_field(&mut self, owner: NodeId, field: &OptionField) -> Result<(), ConfigError> {
        let descriptor = field.descriptor();
        if descriptor.kind() != DescriptorKind::Option {
            return Err(ConfigError::InvalidDescriptor {
                member: field.member().to_owned(),
                expected: "an option",
                found: descriptor.kind(),
            });
        }
        let name = apply_dash_prefix(&resolve_symbol_name(
            descriptor.explicit_name(),
            field.member(),
        )?);
        if descriptor.required_override() == Some(true) {
            return Err(ConfigError::RequiredRecursiveOption { symbol: name });
        }
        let storage = field.storage();
        let kind = storage.kind();
        check_kind(&name, &kind, descriptor)?;
        let default = storage.read();
        let captured = default.clone();
        let id = self.tree.add_symbol(Symbol {
            id: SymbolId(0),
            kind: SymbolKind::Option,
            aliases: descriptor.aliases().map(apply_dash_prefix).collect(),
            description: descriptor.description().map(str::to_owned),
            value_kind: kind,
            required: false,
            arity: descriptor.arity_bounds(),
            hidden: descriptor.is_hidden(),
            help_name: descriptor.help_placeholder().map(str::to_owned),
            recursive: true,
            owner,
            default: Some(Arc::new(move || captured.clone())),
            validators: Vec::new(),
            name,
        });
        self.tree[owner].recursive_options.push(id);
        self.tree.initializers.push(GlobalOptionInitializer {
            symbol: id,
            storage,
            default,
        });
        Ok(())
    }

    fn bind_handlers(&mut self) -> Result<(), ConfigError> {
        for (node, command) in std::mem::take(&mut self.bindings) {
            let binding = self.bind(node, command)?;
            self.tree[node].handler = Some(binding);
        }
        Ok(())
    }

    fn bind(&mut self, node: NodeId, command: &CommandDecl) -> Result<HandlerBinding, ConfigError> {
        let specs = command.handler.slots();
        let expected = specs
            .iter()
            .filter(|spec| matches!(spec, SlotSpec::Value { .. }))
            .count();
        if expected != command.params.len() {
            return Err(ConfigError::ParameterCountMismatch {
                command: self.tree.display_path(node),
                declared: command.params.len(),
                expected,
            });
        }
        let mut params = command.params.iter();
        let mut slots = Vec::with_capacity(specs.len());
        for spec in specs {
            let slot = match spec {
                SlotSpec::Value { kind, optional } => {
                    let param = params.next().ok_or_else(|| ConfigError::ParameterCountMismatch {
                        command: self.tree.display_path(node),
                        declared: command.params.len(),
                        expected,
                    })?;
                    BoundSlot::Value(self.bind_param(node, param, kind, optional)?)
                }
                SlotSpec::Injected => BoundSlot::Injected,
            };
            slots.push(slot);
        }
        Ok(HandlerBinding {
            handler: Arc::clone(&command.handler),
            slots,
            shape: command.handler.shape(),
        })
    }

    fn bind_param(
        &mut self,
        node: NodeId,
        param: &Param,
        kind: ValueKind,
        optional: bool,
    ) -> Result<SymbolId, ConfigError> {
        let descriptor = &param.descriptor;
        let symbol_kind = match descriptor.kind() {
            DescriptorKind::Option => SymbolKind::Option,
            DescriptorKind::Argument => SymbolKind::Argument,
            found => {
                return Err(ConfigError::InvalidDescriptor {
                    member: param.member.clone(),
                    expected: "an option or argument",
                    found,
                });
            }
        };
        let resolved = resolve_symbol_name(descriptor.explicit_name(), &param.member)?;
        let name = match symbol_kind {
            SymbolKind::Option => apply_dash_prefix(&resolved),
            SymbolKind::Argument => resolved,
        };
        check_kind(&name, &kind, descriptor)?;
        if param
            .default
            .as_ref()
            .is_some_and(|default| !default.kind.same_shape(&kind))
        {
            return Err(ConfigError::DefaultTypeMismatch {
                symbol: name,
                expected: kind,
            });
        }
        let required = descriptor
            .required_override()
            .unwrap_or(param.default.is_none() && !optional);
        let aliases = match symbol_kind {
            SymbolKind::Option => descriptor.aliases().map(apply_dash_prefix).collect(),
            SymbolKind::Argument => descriptor.aliases().map(str::to_owned).collect(),
        };
        let id = self.tree.add_symbol(Symbol {
            id: SymbolId(0),
            kind: symbol_kind,
            aliases,
            description: descriptor.description().map(str::to_owned),
            value_kind: kind,
            required,
            arity: descriptor.arity_bounds(),
            hidden: descriptor.is_hidden(),
            help_name: descriptor.help_placeholder().map(str::to_owned),
            recursive: false,
            owner: node,
            default: param.default.as_ref().map(|default| Arc::clone(&default.provider)),
            validators: param.validators.clone(),
            name,
        });
        let owner = &mut self.tree[node];
        match symbol_kind {
            SymbolKind::Option => owner.options.push(id),
            SymbolKind::Argument => owner.arguments.push(id),
        }
        Ok(id)
    }

    fn resolve_exclusive_groups(&mut self) -> Result<(), ConfigError> {
        for (node, descriptor) in std::mem::take(&mut self.groups) {
            let Some(expression) = descriptor.exclusive_groups() else {
                continue;
            };
            for group in parse_groups(expression)? {
                let members = group
                    .iter()
                    .map(|name| {
                        self.tree
                            .resolve_symbol(node, name)
                            .map(Symbol::id)
                            .ok_or_else(|| ConfigError::UnknownGroupMember {
                                command: self.tree.display_path(node),
                                name: name.clone(),
                            })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                self.tree[node].exclusive_groups.push(members);
            }
        }
        Ok(())
    }

    fn check_argument_order(&self) -> Result<(), ConfigError> {
        for node in &self.tree.nodes {
            let mut optional_seen = false;
            let mut arguments = node.arguments.iter().peekable();
            while let Some(id) = arguments.next() {
                let symbol = &self.tree[*id];
                let reason = if symbol.required && optional_seen {
                    Some("a required argument cannot follow an optional one")
                } else if arguments.peek().is_some() && takes_variable_count(symbol) {
                    Some("only the last argument may take a variable number of values")
                } else {
                    None
                };
                if let Some(reason) = reason {
                    return Err(ConfigError::InvalidArgumentOrder {
                        command: self.tree.display_path(node.id),
                        argument: symbol.display_name().to_owned(),
                        reason,
                    });
                }
                optional_seen |= !symbol.required;
            }
        }
        Ok(())
    }

    fn check_symbol_collisions(&self) -> Result<(), ConfigError> {
        let mut reserved = vec![String::from("--help"), String::from("-h")];
        if self.tree.version.is_some() {
            reserved.extend([String::from("--version"), String::from("-V")]);
        }
        for node in &self.tree.nodes {
            let mut seen: HashMap<String, SymbolId> = reserved
                .iter()
                .map(|name| (name.clone(), SymbolId(usize::MAX)))
                .collect();
            for id in self.tree.visible_symbols(node.id) {
                let symbol = &self.tree[id];
                if symbol.kind != SymbolKind::Option {
                    continue;
                }
                for name in std::iter::once(&symbol.name).chain(&symbol.aliases) {
                    let key = flag_key(name);
                    if seen.insert(key.clone(), id).is_some_and(|previous| previous != id) {
                        return Err(ConfigError::DuplicateSymbol {
                            command: self.tree.display_path(node.id),
                            name: key,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

fn takes_variable_count(symbol: &Symbol) -> bool {
    symbol.value_kind.is_array() && symbol.arity.is_none_or(|arity| arity.min != arity.max)
}

fn single_root<T>(
    mut candidates: impl Iterator<Item = T>,
    label: impl Fn(&T) -> String,
) -> Result<Option<T>, ConfigError> {
    let Some(first) = candidates.next() else {
        return Ok(None);
    };
    match candidates.next() {
        Some(second) => Err(ConfigError::DuplicateRoot {
            first: label(&first),
            second: label(&second),
        }),
        None => Ok(Some(first)),
    }
}

fn check_kind(name: &str, kind: &ValueKind, descriptor: &Descriptor) -> Result<(), ConfigError> {
    if kind.is_nested_array() {
        return Err(ConfigError::UnsupportedValueKind {
            symbol: name.to_owned(),
            kind: kind.clone(),
        });
    }
    let invalid = descriptor
        .arity_bounds()
        .filter(|arity| !arity.is_valid() || (!kind.is_array() && arity.max > 1));
    if let Some(arity) = invalid {
        return Err(ConfigError::InvalidArity {
            symbol: name.to_owned(),
            arity,
        });
    }
    Ok(())
}

impl CommandTree {
    fn add_child<'s>(
        &mut self,
        parent: NodeId,
        segment: &str,
        path: impl Iterator<Item = &'s String>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        let path: Vec<String> = path.cloned().collect();
        self.nodes
            .push(CommandNode::new(id, segment.to_owned(), path, Some(parent)));
        self[parent].children.insert(segment.to_owned(), id);
        id
    }

    fn add_symbol(&mut self, mut symbol: Symbol) -> SymbolId {
        let id = SymbolId(self.symbols.len());
        symbol.id = id;
        self.symbols.push(symbol);
        id
    }
}
