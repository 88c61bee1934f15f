use thiserror::Error;

use crate::core::dtype::DataType;

/// Error type definitions
#[derive(Error, Debug)]
pub enum Error {
    /// No kernel exists for the given dtype combination
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// A strict cast or checked arithmetic left the representable range
    #[error("Overflow: {0}")]
    Overflow(String),

    /// A strict cast produced nulls from non-null input
    #[error("Strict cast from {from} to {to} failed: {detail}")]
    StrictCast {
        from: DataType,
        to: DataType,
        detail: String,
    },

    /// Length or dimension mismatch between operands
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Length mismatch: expected {expected}, actual {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// Index outside the sequence bounds or outside the index width
    #[error("Index out of bounds: index {index}, size {size}")]
    IndexOutOfBounds { index: i64, size: usize },

    #[error("Out of range: {0}")]
    OutOfRange(String),

    /// An optional conversion path was requested without its provider
    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    /// The backing storage is aliased and cannot be mutated in place
    #[error("Already borrowed: {0}")]
    BorrowConflict(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Duplicate column name: {0}")]
    DuplicateColumnName(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Raw single-pointer access needs one chunk without a validity bitmap
    #[error("Not contiguous or null values: {0}")]
    NotContiguous(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid regex: {0}")]
    InvalidRegex(String),

    #[error("IO error")]
    Io(#[source] std::io::Error),

    #[error("CSV error")]
    Csv(#[source] csv::Error),

    #[error("JSON error")]
    Json(#[source] serde_json::Error),

    #[cfg(feature = "arrow")]
    #[error("Arrow error")]
    Arrow(#[source] arrow::error::ArrowError),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether this is the transient aliasing conflict that in-place mutation
    /// recovers from by cloning.
    pub fn is_borrow_conflict(&self) -> bool {
        matches!(self, Error::BorrowConflict(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::Csv(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::InvalidRegex(err.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Config(format!("YAML: {}", err))
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(format!("TOML: {}", err))
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Config(format!("TOML: {}", err))
    }
}

#[cfg(feature = "arrow")]
impl From<arrow::error::ArrowError> for Error {
    fn from(err: arrow::error::ArrowError) -> Self {
        Error::Arrow(err)
    }
}

/// Bail out with an error when a condition does not hold.
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !$cond {
            return Err($err);
        }
    };
}
pub(crate) use ensure;
