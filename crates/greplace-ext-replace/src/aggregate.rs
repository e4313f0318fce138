//! `group_replace(text, key, value[, prefix, postfix])` aggregate.

use greplace_error::{ReplaceError, Result};
use greplace_func::AggregateFunction;
use greplace_types::SqliteValue;
use greplace_types::limits::{GROUP_REPLACE_MAX_ARGS, GROUP_REPLACE_MIN_ARGS};
use tracing::{debug, warn};

use crate::config::ReplaceConfig;
use crate::engine::{SubstitutionRequest, copy_text, replace_in_place};

pub const GROUP_REPLACE: &str = "group_replace";

/// Per-group accumulator.
///
/// The buffer is seeded from the first row's `text` argument and then
/// replaced wholesale by each row's substitution. The first failing row
/// is remembered: the buffer is released and every later row is ignored.
#[derive(Debug, Default)]
pub struct GroupReplaceState {
    buffer: Option<String>,
    rows: u64,
    failure: Option<ReplaceError>,
}

impl GroupReplaceState {
    /// Rows delivered to this group so far, including a failing one.
    pub const fn row_count(&self) -> u64 {
        self.rows
    }

    /// Current working text, `None` before the first row or after a failure.
    pub fn text(&self) -> Option<&str> {
        self.buffer.as_deref()
    }

    /// The error that halted this group, if any.
    pub const fn failure(&self) -> Option<&ReplaceError> {
        self.failure.as_ref()
    }
}

/// The `group_replace` aggregate for one fixed arity (3, 4 or 5).
#[derive(Debug, Clone)]
pub struct GroupReplaceFunc {
    arity: usize,
    config: ReplaceConfig,
}

impl GroupReplaceFunc {
    /// Build the aggregate for `arity` arguments.
    ///
    /// Arity and limits are checked here, once, so a bad registration never
    /// surfaces as a per-row error.
    pub fn new(arity: usize, config: ReplaceConfig) -> Result<Self> {
        if !(GROUP_REPLACE_MIN_ARGS..=GROUP_REPLACE_MAX_ARGS).contains(&arity) {
            return Err(ReplaceError::NoSuchFunction {
                name: GROUP_REPLACE.to_owned(),
                num_args: arity,
            });
        }
        config.validate()?;
        Ok(Self { arity, config })
    }

    pub const fn config(&self) -> &ReplaceConfig {
        &self.config
    }

    fn apply_row(&self, state: &mut GroupReplaceState, args: &[SqliteValue]) -> Result<()> {
        if args.len() != self.arity {
            return Err(ReplaceError::WrongArgumentCount {
                function: GROUP_REPLACE.to_owned(),
                expected: self.arity,
                actual: args.len(),
            });
        }
        let text = text_arg(args, 0)?;
        let key = text_arg(args, 1)?;
        let value = text_arg(args, 2)?;
        let prefix = optional_text_arg(args, 3)?;
        let postfix = optional_text_arg(args, 4)?;

        let request = SubstitutionRequest::new(key, value).framed(prefix, postfix);
        let pattern = request.pattern()?;

        let mut buffer = match state.buffer.take() {
            Some(buffer) => buffer,
            None => {
                let seeded = copy_text(text, &self.config)?;
                debug!(len = seeded.len(), "group_replace: group initialized");
                seeded
            }
        };
        replace_in_place(&mut buffer, &pattern, value, &self.config)?;
        state.buffer = Some(buffer);
        Ok(())
    }
}

impl AggregateFunction for GroupReplaceFunc {
    type State = GroupReplaceState;

    fn initial_state(&self) -> Self::State {
        GroupReplaceState::default()
    }

    fn step(&self, state: &mut Self::State, args: &[SqliteValue]) -> Result<()> {
        if let Some(err) = &state.failure {
            return Err(err.clone());
        }
        state.rows += 1;
        if let Err(err) = self.apply_row(state, args) {
            warn!(
                row = state.rows,
                kind = err.kind(),
                code = ?err.error_code(),
                error = %err,
                "group_replace: halting group"
            );
            state.buffer = None;
            state.failure = Some(err.clone());
            return Err(err);
        }
        Ok(())
    }

    fn finalize(&self, state: Self::State) -> Result<SqliteValue> {
        if let Some(err) = state.failure {
            return Err(err);
        }
        match state.buffer {
            Some(text) => {
                debug!(rows = state.rows, len = text.len(), "group_replace: finalized");
                Ok(SqliteValue::Text(text))
            }
            None => Ok(SqliteValue::Null),
        }
    }

    fn num_args(&self) -> usize {
        self.arity
    }

    fn name(&self) -> &str {
        GROUP_REPLACE
    }
}

fn text_arg(args: &[SqliteValue], index: usize) -> Result<&str> {
    let arg = &args[index];
    arg.as_text()
        .ok_or_else(|| ReplaceError::invalid_argument(GROUP_REPLACE, index + 1, arg.typeof_str()))
}

/// `prefix`/`postfix`: absent or NULL means empty, anything else must be TEXT.
fn optional_text_arg(args: &[SqliteValue], index: usize) -> Result<&str> {
    match args.get(index) {
        None | Some(SqliteValue::Null) => Ok(""),
        Some(_) => text_arg(args, index),
    }
}
