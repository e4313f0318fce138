use thiserror::Error;

/// Primary error type for the `group_replace` aggregate and its fold driver.
///
/// Every variant is local to the group being folded: a failing group never
/// poisons another group's state. The type is `Clone` so that an
/// accumulator can hold on to the first failure and report it again at
/// finalize.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplaceError {
    // === Argument Errors ===
    /// An argument that must be TEXT carried some other storage class.
    #[error(
        "invalid parameter types: argument {position} of {function}() must be TEXT, got {actual}"
    )]
    InvalidArgumentType {
        function: String,
        position: usize,
        actual: &'static str,
    },

    /// A row was supplied with a different arity than the prepared aggregate.
    #[error("wrong number of arguments to function {function}(): expected {expected}, got {actual}")]
    WrongArgumentCount {
        function: String,
        expected: usize,
        actual: usize,
    },

    /// The effective search pattern `prefix ++ key ++ postfix` is empty.
    #[error("empty search pattern: prefix, key and postfix are all empty")]
    EmptyPattern,

    // === Limit Errors ===
    /// The replace loop performed more replacements than allowed.
    #[error("replacement limit exceeded: more than {limit} substitutions in one step")]
    IterationLimitExceeded { limit: usize },

    /// The working buffer could not grow to the requested size.
    #[error("string exceeds size limit: {requested} bytes requested (max {max})")]
    AllocationFailure { requested: usize, max: usize },

    // === Configuration Errors ===
    /// No aggregate with this name accepts this many arguments.
    #[error("no such function: {name} with {num_args} arguments")]
    NoSuchFunction { name: String, num_args: usize },

    /// A configuration value is out of its valid domain.
    #[error("invalid configuration: {detail}")]
    InvalidConfig { detail: String },

    // === Lifecycle Errors ===
    /// The host cancelled the fold before the group finished.
    #[error("interrupted")]
    Interrupted,

    /// Internal logic error (should never happen).
    #[error("internal error: {0}")]
    Internal(String),
}

/// SQLite result/error codes used when surfacing a failed group.
///
/// These match the numeric values from C SQLite's `sqlite3.h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    /// Generic error.
    Error = 1,
    /// Internal logic error.
    Internal = 2,
    /// Interrupted by the host.
    Interrupt = 9,
    /// String or BLOB exceeds size limit.
    TooBig = 18,
    /// Data type mismatch.
    Mismatch = 20,
    /// Library used incorrectly.
    Misuse = 21,
    /// Value out of range.
    Range = 25,
}

impl ReplaceError {
    /// Map this error to a SQLite error code.
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::InvalidArgumentType { .. } => ErrorCode::Mismatch,
            Self::WrongArgumentCount { .. } | Self::EmptyPattern | Self::InvalidConfig { .. } => {
                ErrorCode::Misuse
            }
            Self::IterationLimitExceeded { .. } => ErrorCode::Range,
            Self::AllocationFailure { .. } => ErrorCode::TooBig,
            Self::NoSuchFunction { .. } => ErrorCode::Error,
            Self::Interrupted => ErrorCode::Interrupt,
            Self::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Stable name of the error kind, shown next to the message when a
    /// group's result is replaced by its error.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgumentType { .. } => "InvalidArgumentType",
            Self::WrongArgumentCount { .. } => "WrongArgumentCount",
            Self::EmptyPattern => "EmptyPattern",
            Self::IterationLimitExceeded { .. } => "IterationLimitExceeded",
            Self::AllocationFailure { .. } => "AllocationFailure",
            Self::NoSuchFunction { .. } => "NoSuchFunction",
            Self::InvalidConfig { .. } => "InvalidConfig",
            Self::Interrupted => "Interrupted",
            Self::Internal(_) => "Internal",
        }
    }

    /// Human-friendly suggestion for fixing this error.
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::InvalidArgumentType { .. } => {
                Some("Cast every argument to TEXT, e.g. CAST(x AS TEXT)")
            }
            Self::EmptyPattern => Some("Supply a non-empty key"),
            Self::IterationLimitExceeded { .. } => {
                Some("Make sure the value does not reintroduce the key, or raise max_iterations")
            }
            Self::AllocationFailure { .. } => Some("Reduce the size of the template or values"),
            Self::NoSuchFunction { .. } => {
                Some("group_replace takes 3, 4 or 5 arguments: text, key, value[, prefix, postfix]")
            }
            _ => None,
        }
    }

    /// Create an argument type error.
    pub fn invalid_argument(
        function: impl Into<String>,
        position: usize,
        actual: &'static str,
    ) -> Self {
        Self::InvalidArgumentType {
            function: function.into(),
            position,
            actual,
        }
    }

    /// Create a configuration error.
    pub fn invalid_config(detail: impl Into<String>) -> Self {
        Self::InvalidConfig {
            detail: detail.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias using `ReplaceError`.
pub type Result<T> = std::result::Result<T, ReplaceError>;
