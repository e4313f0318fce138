//! Limits applied to every substitution step.

use greplace_error::{ReplaceError, Result};
use greplace_types::limits::{DEFAULT_MAX_ITERATIONS, MAX_LENGTH};
use serde::{Deserialize, Serialize};

/// Runtime limits for the substitution engine.
///
/// Deserializes from a partial document: missing fields keep their
/// defaults, unknown fields are rejected.
///
/// ```
/// use greplace_ext_replace::ReplaceConfig;
///
/// let config = ReplaceConfig::default().with_max_iterations(16);
/// assert_eq!(config.max_iterations, 16);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReplaceConfig {
    /// Most substitutions a single `replace_all` call may perform.
    pub max_iterations: usize,
    /// Longest buffer, in bytes, the engine will build.
    pub max_length: usize,
}

impl Default for ReplaceConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_length: MAX_LENGTH,
        }
    }
}

impl ReplaceConfig {
    #[must_use]
    pub const fn with_max_iterations(self, max_iterations: usize) -> Self {
        Self {
            max_iterations,
            ..self
        }
    }

    #[must_use]
    pub const fn with_max_length(self, max_length: usize) -> Self {
        Self { max_length, ..self }
    }

    /// Reject limits that would make every substitution fail.
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(ReplaceError::invalid_config(
                "max_iterations must be at least 1",
            ));
        }
        if self.max_length == 0 {
            return Err(ReplaceError::invalid_config(
                "max_length must be at least 1",
            ));
        }
        if self.max_length > MAX_LENGTH {
            return Err(ReplaceError::invalid_config(format!(
                "max_length {} exceeds the engine limit of {MAX_LENGTH}",
                self.max_length
            )));
        }
        Ok(())
    }
}
