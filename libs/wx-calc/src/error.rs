//! Error types for wx-calc

use thiserror::Error;

/// Formula errors
#[derive(Debug, Error)]
pub enum CalcError {
    #[error("Expression error: {0}")]
    Expression(String),

    #[error("Function not allowed: {0}")]
    Function(String),

    #[error("Variable not allowed: {0}")]
    Variable(String),

    #[error("Evaluation error in '{formula}': {message}")]
    Evaluation { formula: String, message: String },
}

impl CalcError {
    pub fn expression(msg: impl Into<String>) -> Self {
        Self::Expression(msg.into())
    }

    pub fn function(name: impl Into<String>) -> Self {
        Self::Function(name.into())
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variable(name.into())
    }

    pub fn evaluation(formula: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Evaluation {
            formula: formula.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CalcError>;
