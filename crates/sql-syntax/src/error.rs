use crate::parser::Rule;
use pest::error::Error as PestError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SyntaxError {
    #[error("Parse error in '{input}' at column {column}: {message}")]
    Parse {
        input: String,
        column: usize,
        message: String,
    },

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Condition on '{0}' has no values")]
    EmptyCondition(String),
}

impl SyntaxError {
    pub(crate) fn from_pest_error(input: &str, err: PestError<Rule>) -> Self {
        use pest::error::LineColLocation;

        let column = match err.line_col {
            LineColLocation::Pos((_, c)) => c,
            LineColLocation::Span((_, c), _) => c,
        };

        SyntaxError::Parse {
            input: input.to_string(),
            column,
            message: format!("{}", err.variant),
        }
    }
}
