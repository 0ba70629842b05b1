//! Runtime dispatch of one matched command.
//!
//! The sequence is fixed: global option storage is written first, then the
//! command's exclusive groups and value validators are checked, then the
//! before-command hooks run, then parameters are extracted in slot order and
//! the handler is invoked. The resolved exit code passes through the
//! after-command hooks on its way out.

use tracing::debug;

use crate::context::InvocationContext;
use crate::errors::{DispatchError, ValidationError};
use crate::handler::{SlotInput, SlotSpec};
use crate::hooks::Hooks;
use crate::tree::{BoundSlot, HandlerBinding};
use crate::value::Value;

pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Runs the handler bound to the context's command.
pub(crate) async fn dispatch(
    context: &InvocationContext,
    binding: &HandlerBinding,
    hooks: &Hooks,
) -> Result<i32, DispatchError> {
    let path = context.command_path();
    debug!(target: DISPATCH_TARGET, command = %path, "dispatching command");

    apply_initializers(context)?;
    context.check_groups(&context.command().exclusive_groups)?;
    run_validators(context, binding)?;
    hooks.before(context)?;

    let inputs = extract(context, binding)?;
    let completion = binding.handler.call(inputs).map_err(|error| {
        DispatchError::extraction(
            path.as_str(),
            format!("parameter {}: {}", error.index, error.message),
        )
    })?;
    let mut code = completion.resolve().await.map_err(DispatchError::Handler)?;
    debug!(target: DISPATCH_TARGET, command = %path, code, "handler completed");

    hooks.after(context, &mut code)?;
    Ok(code)
}

/// Writes every global and recursive option into its backing storage.
///
/// Storage behind options the command cannot see is reset to its build-time
/// value first, so a cell shared with a visible option always ends up
/// holding the parsed value.
fn apply_initializers(context: &InvocationContext) -> Result<(), DispatchError> {
    let tree = context.tree();
    let visible = tree.visible_symbols(context.command().id());
    let (seen, unseen): (Vec<_>, Vec<_>) = tree
        .initializers
        .iter()
        .partition(|initializer| visible.contains(&initializer.symbol));

    for initializer in unseen {
        initializer.reset();
    }
    for initializer in seen {
        let symbol = &tree[initializer.symbol];
        let parsed = context
            .parsed(symbol)
            .map_err(|message| DispatchError::extraction(context.command_path(), message))?;
        if !initializer.apply(parsed) {
            return Err(DispatchError::extraction(
                context.command_path(),
                format!("cannot store a value for '{}'", symbol.display_name()),
            ));
        }
    }
    Ok(())
}

fn run_validators(context: &InvocationContext, binding: &HandlerBinding) -> Result<(), DispatchError> {
    let tree = context.tree();
    for slot in &binding.slots {
        let BoundSlot::Value(id) = slot else {
            continue;
        };
        let symbol = &tree[*id];
        if symbol.validators.is_empty() {
            continue;
        }
        let value = context
            .symbol_value(symbol)
            .map_err(|message| DispatchError::extraction(context.command_path(), message))?;
        if let Some(value) = value {
            symbol
                .validate(&value)
                .map_err(|message| ValidationError::InvalidValue {
                    symbol: symbol.display_name().to_owned(),
                    message,
                })?;
        }
    }
    Ok(())
}

/// Produces one input per handler slot, in slot order.
fn extract(context: &InvocationContext, binding: &HandlerBinding) -> Result<Vec<SlotInput>, DispatchError> {
    let tree = context.tree();
    binding
        .slots
        .iter()
        .zip(binding.handler.slots())
        .map(|(bound, spec)| match (bound, spec) {
            (BoundSlot::Value(id), SlotSpec::Value { optional, .. }) => {
                let symbol = &tree[*id];
                let value = context
                    .symbol_value(symbol)
                    .map_err(|message| DispatchError::extraction(context.command_path(), message))?;
                let value = match value {
                    Some(value) => Some(value),
                    None if optional => None,
                    None => Value::implicit_for(symbol.value_kind()),
                };
                Ok(SlotInput::Value(value))
            }
            _ => Ok(SlotInput::Context(context.clone())),
        })
        .collect()
}
