//! Error types for wx-model

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("Unknown vocabulary: {0}")]
    UnknownVocabulary(String),

    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    #[error("Unknown unit group: {0}")]
    UnknownUnitGroup(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
