//! Aggregate function trait with type-erased state adapter.
//!
//! Aggregate functions accumulate a result across multiple rows. Each group
//! gets its own state, created by [`AggregateFunction::initial_state`] and
//! consumed by [`AggregateFunction::finalize`].
//!
//! # Type Erasure
//!
//! The [`FunctionRegistry`](crate::FunctionRegistry) stores aggregates as
//! `Arc<dyn AggregateFunction<State = Box<dyn Any + Send>>>`. Concrete
//! implementations use [`AggregateAdapter`] to wrap their typed state.

use std::any::Any;

use greplace_error::{ReplaceError, Result};
use greplace_types::SqliteValue;

/// An aggregate SQL function.
///
/// This trait is **open** (user-implementable). Extension authors implement
/// this trait to register custom aggregate functions.
///
/// # State Lifecycle
///
/// 1. [`initial_state`](Self::initial_state) creates a fresh accumulator.
/// 2. [`step`](Self::step) is called once per row, in row order.
/// 3. [`finalize`](Self::finalize) consumes the state and returns the result.
///
/// Dropping a state without finalizing it is how a host abandons a group.
///
/// # Send + Sync
///
/// The function object itself is shared across threads via `Arc`. The
/// `State` type must be `Send` so independent groups can be folded on
/// different threads.
pub trait AggregateFunction: Send + Sync {
    /// The per-group accumulator type.
    type State: Send;

    /// Create a fresh accumulator.
    fn initial_state(&self) -> Self::State;

    /// Process one row, updating the accumulator.
    fn step(&self, state: &mut Self::State, args: &[SqliteValue]) -> Result<()>;

    /// Consume the accumulator and produce the final result.
    fn finalize(&self, state: Self::State) -> Result<SqliteValue>;

    /// The exact number of arguments this function accepts.
    fn num_args(&self) -> usize;

    /// The function name, used in error messages.
    fn name(&self) -> &str;
}

/// Type-erased adapter that wraps a concrete [`AggregateFunction`] so the
/// registry can store heterogeneous aggregates behind a single trait object.
pub struct AggregateAdapter<F> {
    inner: F,
}

impl<F> AggregateAdapter<F> {
    /// Wrap a concrete aggregate function for type-erased storage.
    pub const fn new(inner: F) -> Self {
        Self { inner }
    }

    fn state_mismatch(&self) -> ReplaceError
    where
        F: AggregateFunction,
    {
        ReplaceError::internal(format!(
            "aggregate state type mismatch in {}()",
            self.inner.name()
        ))
    }
}

impl<F> AggregateFunction for AggregateAdapter<F>
where
    F: AggregateFunction,
    F::State: 'static,
{
    type State = Box<dyn Any + Send>;

    fn initial_state(&self) -> Self::State {
        Box::new(self.inner.initial_state())
    }

    fn step(&self, state: &mut Self::State, args: &[SqliteValue]) -> Result<()> {
        let Some(concrete) = state.downcast_mut::<F::State>() else {
            return Err(self.state_mismatch());
        };
        self.inner.step(concrete, args)
    }

    fn finalize(&self, state: Self::State) -> Result<SqliteValue> {
        let concrete = state
            .downcast::<F::State>()
            .map_err(|_| self.state_mismatch())?;
        self.inner.finalize(*concrete)
    }

    fn num_args(&self) -> usize {
        self.inner.num_args()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
