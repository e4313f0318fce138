pub mod cx;
pub mod limits;
pub mod value;

pub use cx::Cx;
pub use value::SqliteValue;

use std::fmt;

/// The five fundamental SQLite storage classes.
///
/// Every [`SqliteValue`] belongs to exactly one of them; argument validation
/// in aggregate functions is expressed in terms of storage classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum StorageClass {
    Null,
    Integer,
    Real,
    Text,
    Blob,
}

impl StorageClass {
    /// The lowercase name SQLite's `typeof()` returns for this class.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Integer => "integer",
            Self::Real => "real",
            Self::Text => "text",
            Self::Blob => "blob",
        }
    }
}

impl fmt::Display for StorageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
