//! Lifecycle hooks and the exception handler.
//!
//! Hooks are registered on a built [`crate::App`] and shared by every run.
//! Before-command hooks may abort the handler call by failing; after-command
//! hooks see the exit code and may replace it. The exception handler turns a
//! dispatch failure into an exit code.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;

use crate::context::InvocationContext;
use crate::dispatch::DISPATCH_TARGET;
use crate::errors::{DispatchError, RunError};

pub(crate) type BeforeHook = Arc<dyn Fn(&InvocationContext) -> anyhow::Result<()> + Send + Sync>;
pub(crate) type AfterHook =
    Arc<dyn Fn(&InvocationContext, &mut i32) -> anyhow::Result<()> + Send + Sync>;
pub(crate) type ExceptionHandler =
    Arc<dyn Fn(&DispatchError, &InvocationContext) -> anyhow::Result<i32> + Send + Sync>;

#[derive(Default)]
pub(crate) struct Hooks {
    before: RwLock<Vec<BeforeHook>>,
    after: RwLock<Vec<AfterHook>>,
    exception: RwLock<Option<ExceptionHandler>>,
}

impl Hooks {
    pub(crate) fn add_before(&self, hook: BeforeHook) {
        self.before.write().push(hook);
    }

    pub(crate) fn add_after(&self, hook: AfterHook) {
        self.after.write().push(hook);
    }

    pub(crate) fn set_exception(&self, handler: Option<ExceptionHandler>) {
        *self.exception.write() = handler;
    }

    /// Runs the before-command hooks in registration order, stopping at the
    /// first failure.
    pub(crate) fn before(&self, context: &InvocationContext) -> Result<(), DispatchError> {
        let hooks = self.before.read().clone();
        hooks
            .iter()
            .try_for_each(|hook| hook(context))
            .map_err(DispatchError::Hook)
    }

    /// Runs the after-command hooks; the last write to `code` wins.
    pub(crate) fn after(&self, context: &InvocationContext, code: &mut i32) -> Result<(), DispatchError> {
        let hooks = self.after.read().clone();
        hooks
            .iter()
            .try_for_each(|hook| hook(context, code))
            .map_err(DispatchError::Hook)
    }

    /// Routes a dispatch failure through the exception handler, or hands it
    /// back to the embedder when none is set.
    pub(crate) fn handle(
        &self,
        error: DispatchError,
        context: &InvocationContext,
    ) -> Result<i32, RunError> {
        let handler = self.exception.read().clone();
        let Some(handler) = handler else {
            return Err(RunError::Unhandled(error));
        };
        warn!(
            target: DISPATCH_TARGET,
            command = %context.command_path(),
            error = %error,
            "routing dispatch failure to exception handler"
        );
        handler(&error, context).map_err(RunError::ExceptionHandler)
    }
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("before", &self.before.read().len())
            .field("after", &self.after.read().len())
            .field("exception", &self.exception.read().is_some())
            .finish()
    }
}
