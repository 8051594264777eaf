/// Errors returned by `tidyframe` operations.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Referenced column does not exist.
    #[error("column not found: {name}")]
    ColumnNotFound { name: String },

    /// A name was required to be unique and is not.
    #[error("name is not unique: {name}")]
    NonUniqueName { name: String },

    /// A single-function-required middleware received zero functions.
    #[error("no function specified for {what}")]
    NoFunction { what: &'static str },

    /// A single-function-required middleware received more than one function.
    #[error("only a single function is allowed in {what}")]
    TooManyFunctions { what: &'static str },

    /// Mutually exclusive directives were both given.
    #[error("{verb}: only one of {first} and {second} can be specified")]
    ConflictingDirective {
        verb: &'static str,
        first: &'static str,
        second: &'static str,
    },

    /// Schema-related mismatch (duplicate names, misaligned lengths, incompatible frames).
    #[error("schema mismatch: {message}")]
    SchemaMismatch { message: String },

    /// Data type mismatch (e.g. non-numeric aggregation or incompatible dtypes).
    #[error(
        "type mismatch{column}: expected {expected}, got {actual}",
        column = column_display(.column)
    )]
    TypeMismatch {
        column: Option<String>,
        expected: String,
        actual: String,
    },

    /// Operation is not supported or invalid for the current inputs.
    #[error("invalid operation: {message}")]
    InvalidOperation { message: String },

    /// Invalid configuration option was provided.
    #[error("invalid configuration option '{option}': {message}")]
    Configuration { option: String, message: String },

    /// Error originating from Arrow compute / record batch APIs.
    #[error("arrow error: {source}")]
    Arrow { source: arrow::error::ArrowError },
}

/// Result type used throughout this crate.
pub type Result<T> = std::result::Result<T, FrameError>;

impl FrameError {
    /// Create a missing column error.
    pub fn column_not_found(name: impl Into<String>) -> Self {
        Self::ColumnNotFound { name: name.into() }
    }

    /// Create a non-unique name error.
    pub fn non_unique_name(name: impl Into<String>) -> Self {
        Self::NonUniqueName { name: name.into() }
    }

    /// Create a schema mismatch error with a message.
    pub fn schema_mismatch(message: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            message: message.into(),
        }
    }

    /// Create a type mismatch error with optional column context.
    pub fn type_mismatch(
        column: impl Into<Option<String>>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            column: column.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn configuration(option: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            option: option.into(),
            message: message.into(),
        }
    }
}

impl From<arrow::error::ArrowError> for FrameError {
    fn from(source: arrow::error::ArrowError) -> Self {
        Self::Arrow { source }
    }
}

fn column_display(column: &Option<String>) -> String {
    column
        .as_ref()
        .map(|c| format!(" for column '{c}'"))
        .unwrap_or_default()
}
