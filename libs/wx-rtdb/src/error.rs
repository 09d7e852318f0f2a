//! Error types for wx-rtdb

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RtdbError {
    #[error("Object not defined: {0}")]
    ObjectNotDefined(String),

    #[error("Invalid data type for {path}: expected {expected}")]
    InvalidDataType { path: String, expected: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, RtdbError>;

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_object_not_defined_error() {
        let err = RtdbError::ObjectNotDefined("weather.current.temp".to_string());
        assert_eq!(err.to_string(), "Object not defined: weather.current.temp");
    }

    #[test]
    fn test_from_anyhow_error() {
        let rtdb_err: RtdbError = anyhow::anyhow!("backend gone").into();
        assert!(matches!(rtdb_err, RtdbError::Other(_)));
        assert!(rtdb_err.to_string().contains("backend gone"));
    }
}
