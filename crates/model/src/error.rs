use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum FieldError {
    /// The value could not be coerced into the field's kind.
    #[error("field '{field}' expects {expected}, got {value}: {reason}")]
    Validation {
        field: String,
        expected: &'static str,
        value: String,
        reason: String,
    },

    #[error("composite field '{field}' received {count} attributes, limit is {limit}")]
    StructuralLimitExceeded {
        field: String,
        count: usize,
        limit: usize,
    },

    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("required field '{0}' has no value")]
    MissingRequired(String),
}

pub type Result<T> = std::result::Result<T, FieldError>;
