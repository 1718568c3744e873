use model::FieldError;
use query_dsl::DslError;
use sql_syntax::{Op, SyntaxError};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CompileError {
    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Ambiguous operands for '{op}': {reason}")]
    AmbiguousOperand { op: Op, reason: String },

    #[error("Nested AND/OR groups exceed the maximum depth of {max}")]
    NestingDepthExceeded { max: usize },

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Invalid arithmetic: {0}")]
    InvalidArithmetic(String),

    #[error("Invalid projection: {0}")]
    InvalidProjection(String),

    #[error("Cursor pagination requires a limit and at least one order-by entry")]
    PaginationRequiresOrdering,

    #[error(transparent)]
    Field(#[from] FieldError),

    #[error(transparent)]
    Dsl(#[from] DslError),

    #[error(transparent)]
    Syntax(SyntaxError),
}

impl From<SyntaxError> for CompileError {
    fn from(err: SyntaxError) -> Self {
        match err {
            SyntaxError::UnsupportedOperator(op) => CompileError::UnsupportedOperator(op),
            other => CompileError::Syntax(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, CompileError>;
