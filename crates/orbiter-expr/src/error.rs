use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExprError {
    #[error("parse error at offset {offset}: {message}")]
    Parse { offset: usize, message: String },

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("wrong arity for '{func}': expected {expected}, got {got}")]
    Arity { func: String, expected: usize, got: usize },

    #[error("type error evaluating '{0}'")]
    Type(String),
}
