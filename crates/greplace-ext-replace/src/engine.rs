//! Literal replace-all over a growing text buffer.
//!
//! The scan is plain substring search: case-sensitive, byte-exact, no
//! regex. After each replacement the scan resumes directly after the
//! inserted value, so the inserted value itself is never rescanned and the
//! text before it is never revisited.

use std::borrow::Cow;

use greplace_error::{ReplaceError, Result};
use tracing::trace;

use crate::config::ReplaceConfig;

/// One row's worth of substitution: replace `prefix ++ key ++ postfix`
/// with `value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubstitutionRequest<'a> {
    pub key: &'a str,
    pub value: &'a str,
    pub prefix: &'a str,
    pub postfix: &'a str,
}

impl<'a> SubstitutionRequest<'a> {
    /// A bare `key -> value` request with no framing.
    pub const fn new(key: &'a str, value: &'a str) -> Self {
        Self {
            key,
            value,
            prefix: "",
            postfix: "",
        }
    }

    /// Wrap the key in `prefix`/`postfix`, e.g. `{` and `}`.
    #[must_use]
    pub const fn framed(self, prefix: &'a str, postfix: &'a str) -> Self {
        Self {
            prefix,
            postfix,
            ..self
        }
    }

    /// The effective search pattern `prefix ++ key ++ postfix`.
    ///
    /// Fails with [`ReplaceError::EmptyPattern`] when all three parts are
    /// empty: an empty needle matches at every position.
    pub fn pattern(&self) -> Result<Cow<'a, str>> {
        let pattern = if self.prefix.is_empty() && self.postfix.is_empty() {
            Cow::Borrowed(self.key)
        } else {
            Cow::Owned([self.prefix, self.key, self.postfix].concat())
        };
        if pattern.is_empty() {
            return Err(ReplaceError::EmptyPattern);
        }
        Ok(pattern)
    }

    /// Apply this request to `text`.
    pub fn apply(&self, text: &str, config: &ReplaceConfig) -> Result<String> {
        replace_all(text, &self.pattern()?, self.value, config)
    }
}

/// Result of a replace-all pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceOutcome {
    pub text: String,
    /// Number of occurrences that were replaced.
    pub replacements: usize,
}

/// Replace every occurrence of `pattern` in `text` with `value`.
///
/// ```
/// use greplace_ext_replace::{ReplaceConfig, replace_all};
///
/// let out = replace_all("two keys, %key and %key", "%key", "value", &ReplaceConfig::default())?;
/// assert_eq!(out, "two keys, value and value");
/// # Ok::<(), greplace_error::ReplaceError>(())
/// ```
pub fn replace_all(text: &str, pattern: &str, value: &str, config: &ReplaceConfig) -> Result<String> {
    replace_all_with_stats(text, pattern, value, config).map(|outcome| outcome.text)
}

/// Like [`replace_all`], also reporting how many replacements were made.
pub fn replace_all_with_stats(
    text: &str,
    pattern: &str,
    value: &str,
    config: &ReplaceConfig,
) -> Result<ReplaceOutcome> {
    let mut buf = copy_text(text, config)?;
    let replacements = replace_in_place(&mut buf, pattern, value, config)?;
    Ok(ReplaceOutcome {
        text: buf,
        replacements,
    })
}

/// Copy `text` into a fresh buffer, honoring the configured length limit.
pub fn copy_text(text: &str, config: &ReplaceConfig) -> Result<String> {
    if text.len() > config.max_length {
        return Err(ReplaceError::AllocationFailure {
            requested: text.len(),
            max: config.max_length,
        });
    }
    let mut buf = String::new();
    buf.try_reserve_exact(text.len())
        .map_err(|_| ReplaceError::AllocationFailure {
            requested: text.len(),
            max: config.max_length,
        })?;
    buf.push_str(text);
    Ok(buf)
}

/// Replace every occurrence of `pattern` in `buf` with `value`, in place.
///
/// Scan algorithm:
/// 1. cursor = 0
/// 2. find the first `pattern` at or after the cursor; stop if none
/// 3. splice `value` over the match
/// 4. cursor = match start + `value.len()`; go to 2
///
/// Returns the number of replacements. On error the buffer holds a
/// partially substituted text and must be discarded by the caller.
pub fn replace_in_place(
    buf: &mut String,
    pattern: &str,
    value: &str,
    config: &ReplaceConfig,
) -> Result<usize> {
    if pattern.is_empty() {
        return Err(ReplaceError::EmptyPattern);
    }

    let mut cursor = 0;
    let mut replacements = 0;
    while let Some(offset) = buf[cursor..].find(pattern) {
        if replacements == config.max_iterations {
            return Err(ReplaceError::IterationLimitExceeded {
                limit: config.max_iterations,
            });
        }
        let start = cursor + offset;

        // `pattern` occurs in `buf`, so this cannot underflow.
        let new_len = buf.len() - pattern.len() + value.len();
        if new_len > config.max_length {
            return Err(ReplaceError::AllocationFailure {
                requested: new_len,
                max: config.max_length,
            });
        }
        if value.len() > pattern.len() {
            buf.try_reserve(value.len() - pattern.len())
                .map_err(|_| ReplaceError::AllocationFailure {
                    requested: new_len,
                    max: config.max_length,
                })?;
        }

        buf.replace_range(start..start + pattern.len(), value);
        cursor = start + value.len();
        replacements += 1;
    }

    trace!(pattern, replacements, len = buf.len(), "replace_all: done");
    Ok(replacements)
}
