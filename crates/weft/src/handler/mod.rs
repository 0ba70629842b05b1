//! Bridge from parsed values to strongly typed handler calls.
//!
//! A handler is any function whose parameters implement [`HandlerArg`] and
//! whose return type implements [`IntoOutcome`]. The tree builder asks the
//! handler for its slot layout once, at bind time; the dispatcher later hands
//! it one [`SlotInput`] per slot and receives a [`Completion`].

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::future::BoxFuture;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::context::{Console, InvocationContext};
use crate::value::{Value, ValueKind, ValueType};

/// The result shape a handler declares through its return type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultShape {
    /// Returns nothing; exit code 0.
    Void,
    /// Returns an exit code.
    Code,
    /// Completes asynchronously with nothing.
    Deferred,
    /// Completes asynchronously with an exit code.
    DeferredCode,
}

impl ResultShape {
    /// The asynchronous counterpart of a synchronous shape.
    #[must_use]
    pub const fn deferred(self) -> Self {
        match self {
            Self::Void | Self::Deferred => Self::Deferred,
            Self::Code | Self::DeferredCode => Self::DeferredCode,
        }
    }
}

/// Values a handler may return.
pub trait IntoOutcome: Send + 'static {
    /// Shape recorded on the handler binding.
    const SHAPE: ResultShape;

    /// Normalises the value into an exit code or a handler error.
    ///
    /// # Errors
    ///
    /// Returns the handler's own error for `Err` results.
    fn into_outcome(self) -> anyhow::Result<i32>;
}

impl IntoOutcome for () {
    const SHAPE: ResultShape = ResultShape::Void;

    fn into_outcome(self) -> anyhow::Result<i32> {
        Ok(0)
    }
}

impl IntoOutcome for i32 {
    const SHAPE: ResultShape = ResultShape::Code;

    fn into_outcome(self) -> anyhow::Result<i32> {
        Ok(self)
    }
}

impl<T, E> IntoOutcome for Result<T, E>
where
    T: IntoOutcome,
    E: Into<anyhow::Error> + Send + 'static,
{
    const SHAPE: ResultShape = T::SHAPE;

    fn into_outcome(self) -> anyhow::Result<i32> {
        self.map_err(Into::into)?.into_outcome()
    }
}

/// How a handler parameter is fed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotSpec {
    /// Bound to the next declared parameter.
    Value {
        /// Expected value kind.
        kind: ValueKind,
        /// Whether the Rust type tolerates absence (`Option<T>`).
        optional: bool,
    },
    /// Supplied by the dispatcher; consumes no declared parameter.
    Injected,
}

/// Per-slot input assembled by the dispatcher.
#[derive(Debug)]
pub enum SlotInput {
    /// The parsed or defaulted value, `None` when absent.
    Value(Option<Value>),
    /// Ambient invocation state for injected parameters.
    Context(InvocationContext),
}

/// A slot input that does not fit the handler parameter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("parameter {index}: {message}")]
pub struct SlotError {
    /// Zero-based parameter position.
    pub index: usize,
    /// What went wrong.
    pub message: String,
}

impl SlotError {
    fn new(index: usize, message: impl Into<String>) -> Self {
        Self {
            index,
            message: message.into(),
        }
    }
}

/// Types accepted as handler parameters.
pub trait HandlerArg: Sized + Send + 'static {
    /// How the slot is fed.
    fn spec() -> SlotSpec;

    /// Converts the dispatcher's input into the parameter value.
    ///
    /// # Errors
    ///
    /// Returns a message when the input is missing or has the wrong kind.
    fn extract(input: SlotInput) -> Result<Self, String>;
}

impl<T: ValueType> HandlerArg for T {
    fn spec() -> SlotSpec {
        SlotSpec::Value {
            kind: T::kind(),
            optional: false,
        }
    }

    fn extract(input: SlotInput) -> Result<Self, String> {
        match input {
            SlotInput::Value(Some(value)) => {
                T::from_value(value).ok_or_else(|| format!("expected {}", T::kind()))
            }
            SlotInput::Value(None) => Err(String::from("no value was supplied")),
            SlotInput::Context(_) => Err(String::from("expected a value, got context")),
        }
    }
}

impl<T: ValueType> HandlerArg for Option<T> {
    fn spec() -> SlotSpec {
        SlotSpec::Value {
            kind: T::kind(),
            optional: true,
        }
    }

    fn extract(input: SlotInput) -> Result<Self, String> {
        match input {
            SlotInput::Value(Some(value)) => T::from_value(value)
                .map(Some)
                .ok_or_else(|| format!("expected {}", T::kind())),
            SlotInput::Value(None) => Ok(None),
            SlotInput::Context(_) => Err(String::from("expected a value, got context")),
        }
    }
}

fn injected<T>(input: SlotInput, pick: impl FnOnce(InvocationContext) -> T) -> Result<T, String> {
    match input {
        SlotInput::Context(context) => Ok(pick(context)),
        SlotInput::Value(_) => Err(String::from("expected context, got a value")),
    }
}

impl HandlerArg for InvocationContext {
    fn spec() -> SlotSpec {
        SlotSpec::Injected
    }

    fn extract(input: SlotInput) -> Result<Self, String> {
        injected(input, |context| context)
    }
}

impl HandlerArg for Console {
    fn spec() -> SlotSpec {
        SlotSpec::Injected
    }

    fn extract(input: SlotInput) -> Result<Self, String> {
        injected(input, |context| context.console().clone())
    }
}

impl HandlerArg for CancellationToken {
    fn spec() -> SlotSpec {
        SlotSpec::Injected
    }

    fn extract(input: SlotInput) -> Result<Self, String> {
        injected(input, |context| context.cancellation().clone())
    }
}

/// Result of invoking a handler.
pub enum Completion {
    /// The handler finished synchronously.
    Ready(anyhow::Result<i32>),
    /// The handler returned a future that still has to be awaited.
    Deferred(BoxFuture<'static, anyhow::Result<i32>>),
}

impl Completion {
    /// Awaits a deferred completion; ready completions resolve immediately.
    ///
    /// # Errors
    ///
    /// Returns the handler's error.
    pub async fn resolve(self) -> anyhow::Result<i32> {
        match self {
            Self::Ready(outcome) => outcome,
            Self::Deferred(future) => future.await,
        }
    }
}

/// Marker for handlers that return their result directly.
#[derive(Debug)]
pub struct Immediate;

/// Marker for handlers that return a future.
#[derive(Debug)]
pub struct Eventual;

/// Wraps an async function so it can be registered as a handler.
#[derive(Debug, Clone)]
pub struct AsyncHandler<F>(pub F);

/// A callable the dispatcher can bind and invoke.
///
/// `Args` is a marker tuple that keeps the blanket implementations for
/// different arities and for sync versus async functions apart.
pub trait Handler<Args>: Send + Sync + 'static {
    /// Slot layout, in parameter order.
    fn slots(&self) -> Vec<SlotSpec>;

    /// Declared result shape.
    fn shape(&self) -> ResultShape;

    /// Invokes the handler with one input per slot.
    ///
    /// # Errors
    ///
    /// Returns a [`SlotError`] when an input cannot be converted.
    fn call(&self, inputs: Vec<SlotInput>) -> Result<Completion, SlotError>;
}

fn next_input(
    inputs: &mut std::vec::IntoIter<SlotInput>,
    index: usize,
) -> Result<SlotInput, SlotError> {
    inputs
        .next()
        .ok_or_else(|| SlotError::new(index, "no input provided"))
}

impl<F, R> Handler<(Immediate,)> for F
where
    F: Fn() -> R + Send + Sync + 'static,
    R: IntoOutcome,
{
    fn slots(&self) -> Vec<SlotSpec> {
        Vec::new()
    }

    fn shape(&self) -> ResultShape {
        R::SHAPE
    }

    fn call(&self, _inputs: Vec<SlotInput>) -> Result<Completion, SlotError> {
        Ok(Completion::Ready((self)().into_outcome()))
    }
}

impl<F, Fut, R> Handler<(Eventual,)> for AsyncHandler<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome,
{
    fn slots(&self) -> Vec<SlotSpec> {
        Vec::new()
    }

    fn shape(&self) -> ResultShape {
        R::SHAPE.deferred()
    }

    fn call(&self, _inputs: Vec<SlotInput>) -> Result<Completion, SlotError> {
        let future = (self.0)();
        Ok(Completion::Deferred(Box::pin(async move {
            future.await.into_outcome()
        })))
    }
}

macro_rules! impl_handler {
    ($(($ty:ident, $var:ident, $index:expr)),+) => {
        impl<F, R, $($ty,)+> Handler<(Immediate, $($ty,)+)> for F
        where
            F: Fn($($ty),+) -> R + Send + Sync + 'static,
            R: IntoOutcome,
            $($ty: HandlerArg,)+
        {
            fn slots(&self) -> Vec<SlotSpec> {
                vec![$($ty::spec()),+]
            }

            fn shape(&self) -> ResultShape {
                R::SHAPE
            }

            fn call(&self, inputs: Vec<SlotInput>) -> Result<Completion, SlotError> {
                let mut inputs = inputs.into_iter();
                $(
                    let $var = $ty::extract(next_input(&mut inputs, $index)?)
                        .map_err(|message| SlotError::new($index, message))?;
                )+
                Ok(Completion::Ready((self)($($var),+).into_outcome()))
            }
        }

        impl<F, Fut, R, $($ty,)+> Handler<(Eventual, $($ty,)+)> for AsyncHandler<F>
        where
            F: Fn($($ty),+) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = R> + Send + 'static,
            R: IntoOutcome,
            $($ty: HandlerArg,)+
        {
            fn slots(&self) -> Vec<SlotSpec> {
                vec![$($ty::spec()),+]
            }

            fn shape(&self) -> ResultShape {
                R::SHAPE.deferred()
            }

            fn call(&self, inputs: Vec<SlotInput>) -> Result<Completion, SlotError> {
                let mut inputs = inputs.into_iter();
                $(
                    let $var = $ty::extract(next_input(&mut inputs, $index)?)
                        .map_err(|message| SlotError::new($index, message))?;
                )+
                let future = (self.0)($($var),+);
                Ok(Completion::Deferred(Box::pin(async move {
                    future.await.into_outcome()
                })))
            }
        }
    };
}

impl_handler!((A1, a1, 0));
impl_handler!((A1, a1, 0), (A2, a2, 1));
impl_handler!((A1, a1, 0), (A2, a2, 1), (A3, a3, 2));
impl_handler!((A1, a1, 0), (A2, a2, 1), (A3, a3, 2), (A4, a4, 3));
impl_handler!((A1, a1, 0), (A2, a2, 1), (A3, a3, 2), (A4, a4, 3), (A5, a5, 4));
impl_handler!(
    (A1, a1, 0),
    (A2, a2, 1),
    (A3, a3, 2),
    (A4, a4, 3),
    (A5, a5, 4),
    (A6, a6, 5)
);
impl_handler!(
    (A1, a1, 0),
    (A2, a2, 1),
    (A3, a3, 2),
    (A4, a4, 3),
    (A5, a5, 4),
    (A6, a6, 5),
    (A7, a7, 6)
);
impl_handler!(
    (A1, a1, 0),
    (A2, a2, 1),
    (A3, a3, 2),
    (A4, a4, 3),
    (A5, a5, 4),
    (A6, a6, 5),
    (A7, a7, 6),
    (A8, a8, 7)
);

/// Object-safe view of a [`Handler`] with its marker erased.
pub(crate) trait ErasedHandler: Send + Sync {
    fn slots(&self) -> Vec<SlotSpec>;
    fn shape(&self) -> ResultShape;
    fn call(&self, inputs: Vec<SlotInput>) -> Result<Completion, SlotError>;
}

struct Erased<H, Args> {
    handler: H,
    _args: PhantomData<fn() -> Args>,
}

impl<H, Args> ErasedHandler for Erased<H, Args>
where
    H: Handler<Args>,
    Args: 'static,
{
    fn slots(&self) -> Vec<SlotSpec> {
        self.handler.slots()
    }

    fn shape(&self) -> ResultShape {
        self.handler.shape()
    }

    fn call(&self, inputs: Vec<SlotInput>) -> Result<Completion, SlotError> {
        self.handler.call(inputs)
    }
}

pub(crate) fn erase<H, Args>(handler: H) -> Arc<dyn ErasedHandler>
where
    H: Handler<Args>,
    Args: 'static,
{
    Arc::new(Erased {
        handler,
        _args: PhantomData,
    })
}
