//! Error handling for the weather telemetry service

use errors::WxError;
use thiserror::Error;
use wx_calc::CalcError;
use wx_model::Vocabulary;

/// Wire-level decoding errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Fewer bytes than the fixed header
    #[error("Frame too short: {len} bytes, header needs 4")]
    FrameTooShort { len: usize },

    /// Buffer ended in the middle of a field
    #[error("Frame truncated at field '{field}': need {needed} bytes at offset {offset}, have {available}")]
    FrameTruncated {
        field: String,
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// Value does not fit the declared field width (encoding only)
    #[error("Value for field '{field}' does not fit: {value}")]
    ValueOutOfRange { field: String, value: String },
}

/// Registry loading and conversion errors
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Duplicate field definition: {0}")]
    DuplicateField(String),

    #[error("Field '{field}' has no channel")]
    NoChannel { field: String },

    #[error("Invalid {vocabulary} pattern for '{field}': {reason}")]
    InvalidPattern {
        field: String,
        vocabulary: Vocabulary,
        reason: String,
    },

    #[error("Invalid formula for '{field}': {source}")]
    InvalidFormula {
        field: String,
        #[source]
        source: CalcError,
    },

    #[error("Invalid unit options for '{field}': {reason}")]
    UnitOptions { field: String, reason: String },

    #[error("Ambiguous {vocabulary} key '{key}': matched by '{first}' and '{second}'")]
    AmbiguousKey {
        vocabulary: Vocabulary,
        key: String,
        first: String,
        second: String,
    },

    #[error("Unknown unit '{unit}' for field '{field}'")]
    UnknownUnit { field: String, unit: String },

    #[error("Conversion failed for '{field}': {source}")]
    Conversion {
        field: String,
        #[source]
        source: CalcError,
    },
}

/// Service error type
#[derive(Error, Debug)]
pub enum WxSrvError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Timeout error: {0}")]
    TimeoutError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Result type alias for the service
pub type Result<T> = std::result::Result<T, WxSrvError>;

impl WxSrvError {
    pub fn config(msg: impl Into<String>) -> Self {
        WxSrvError::ConfigError(msg.into())
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        WxSrvError::ConnectionError(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        WxSrvError::TimeoutError(msg.into())
    }
}

impl From<std::io::Error> for WxSrvError {
    fn from(err: std::io::Error) -> Self {
        WxSrvError::IoError(err.to_string())
    }
}

impl From<figment::Error> for WxSrvError {
    fn from(err: figment::Error) -> Self {
        WxSrvError::ConfigError(err.to_string())
    }
}

impl From<anyhow::Error> for WxSrvError {
    fn from(err: anyhow::Error) -> Self {
        WxSrvError::StorageError(err.to_string())
    }
}

// ============================================================================
// Conversion to the shared service error at the binary boundary
// ============================================================================

impl From<WxSrvError> for WxError {
    fn from(err: WxSrvError) -> Self {
        match err {
            WxSrvError::ConfigError(msg) => WxError::Configuration(msg),
            WxSrvError::ConnectionError(reason) => WxError::ConnectionFailed {
                endpoint: "weather station".to_string(),
                reason,
            },
            WxSrvError::TimeoutError(msg) => WxError::Timeout(msg),
            WxSrvError::StorageError(msg) => WxError::Storage(msg),
            WxSrvError::IoError(msg) => WxError::Io(std::io::Error::other(msg)),
            WxSrvError::Protocol(e) => WxError::Protocol {
                protocol: "device_binary".to_string(),
                message: e.to_string(),
            },
            WxSrvError::Pipeline(e) => WxError::Mapping(e.to_string()),
        }
    }
}
