//! Engine limits and defaults shared by the replace extension and its
//! drivers.

/// Maximum length in bytes of any string the engine will build.
///
/// Matches C SQLite's compile-time default `SQLITE_MAX_LENGTH`.
pub const MAX_LENGTH: usize = 1_000_000_000;

/// Default cap on the number of substitutions one `replace_all` call may
/// perform before failing.
pub const DEFAULT_MAX_ITERATIONS: usize = 100_000;

/// Fewest arguments `group_replace` accepts: `text, key, value`.
pub const GROUP_REPLACE_MIN_ARGS: usize = 3;

/// Most arguments `group_replace` accepts: `text, key, value, prefix, postfix`.
pub const GROUP_REPLACE_MAX_ARGS: usize = 5;
