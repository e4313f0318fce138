//! Single-group fold driver.

use std::any::Any;
use std::sync::Arc;

use greplace_error::{ReplaceError, Result};
use greplace_func::ErasedAggregateFunction;
use greplace_types::{Cx, SqliteValue};
use tracing::warn;

/// Exclusive fold over the rows of one group.
///
/// Wraps a type-erased aggregate and its state:
/// `begin_group` → `accumulate` once per row, in row order → `finish`.
///
/// The first error halts the group. Its state is dropped at once, later
/// rows are not applied, and `finish` reports that error instead of a
/// result. Dropping a `GroupFold` without finishing it abandons the group
/// and releases its buffer.
pub struct GroupFold {
    function: Arc<ErasedAggregateFunction>,
    state: Option<Box<dyn Any + Send>>,
    failure: Option<ReplaceError>,
    rows: u64,
}

impl GroupFold {
    /// Start a new group with a fresh accumulator.
    #[must_use]
    pub fn begin_group(function: Arc<ErasedAggregateFunction>) -> Self {
        let state = function.initial_state();
        Self {
            function,
            state: Some(state),
            failure: None,
            rows: 0,
        }
    }

    /// Feed one row to the group.
    ///
    /// Checks `cx` for cancellation first, then the row's arity against the
    /// aggregate's, then steps the aggregate. Returns the group's failure,
    /// either new or one recorded by an earlier row.
    pub fn accumulate(&mut self, cx: &Cx, args: &[SqliteValue]) -> Result<()> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        self.rows += 1;
        let outcome = cx
            .checkpoint()
            .and_then(|()| self.check_arity(args))
            .and_then(|()| match self.state.as_mut() {
                Some(state) => self.function.step(state, args),
                None => Err(ReplaceError::internal("aggregate state already released")),
            });
        if let Err(err) = outcome {
            self.fail(err.clone());
            return Err(err);
        }
        Ok(())
    }

    /// Finalize the group, consuming the fold.
    pub fn finish(self) -> Result<SqliteValue> {
        if let Some(err) = self.failure {
            return Err(err);
        }
        let state = self
            .state
            .ok_or_else(|| ReplaceError::internal("aggregate state already released"))?;
        self.function.finalize(state)
    }

    /// Abandon the group with `err`, releasing its state.
    ///
    /// A group that already failed keeps its first error.
    pub fn abort(&mut self, err: ReplaceError) {
        if self.failure.is_none() {
            self.fail(err);
        }
    }

    /// Rows delivered so far, including a failing one.
    #[must_use]
    pub const fn row_count(&self) -> u64 {
        self.rows
    }

    #[must_use]
    pub const fn is_failed(&self) -> bool {
        self.failure.is_some()
    }

    #[must_use]
    pub const fn failure(&self) -> Option<&ReplaceError> {
        self.failure.as_ref()
    }

    /// Name of the aggregate being folded.
    #[must_use]
    pub fn function_name(&self) -> &str {
        self.function.name()
    }

    fn check_arity(&self, args: &[SqliteValue]) -> Result<()> {
        let expected = self.function.num_args();
        if args.len() == expected {
            Ok(())
        } else {
            Err(ReplaceError::WrongArgumentCount {
                function: self.function.name().to_owned(),
                expected,
                actual: args.len(),
            })
        }
    }

    fn fail(&mut self, err: ReplaceError) {
        warn!(
            function = self.function.name(),
            row = self.rows,
            kind = err.kind(),
            code = ?err.error_code(),
            error = %err,
            "fold: group halted"
        );
        self.state = None;
        self.failure = Some(err);
    }
}

impl std::fmt::Debug for GroupFold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupFold")
            .field("function", &self.function.name())
            .field("rows", &self.rows)
            .field("failure", &self.failure)
            .finish_non_exhaustive()
    }
}
