//! Unified error handling for the weather telemetry services
//!
//! Library crates keep their own narrow error enums. Binaries and bootstrap
//! code funnel everything into [`WxError`] so startup failures are reported
//! the same way everywhere.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// ErrorInfo - structured error report
// ============================================================================

/// Serializable summary of an error, used for the startup report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine-readable code
    pub code: String,
    /// Error message
    pub message: String,
    /// Whether the operation may succeed on a later attempt
    pub retryable: bool,
}

// ============================================================================
// WxError - main error type
// ============================================================================

#[derive(Debug, Error)]
pub enum WxError {
    // ======================================
    // Configuration Errors
    // ======================================
    #[error("Configuration error: {0}")]
    Configuration(String),

    // ======================================
    // Protocol & Communication Errors
    // ======================================
    #[error("Protocol error: {protocol}: {message}")]
    Protocol { protocol: String, message: String },

    #[error("Connection failed: {endpoint}: {reason}")]
    ConnectionFailed { endpoint: String, reason: String },

    #[error("Timeout waiting for response from {0}")]
    Timeout(String),

    // ======================================
    // Data Errors
    // ======================================
    #[error("Mapping error: {0}")]
    Mapping(String),

    #[error("Storage error: {0}")]
    Storage(String),

    // ======================================
    // File & I/O Errors
    // ======================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ======================================
    // Service Errors
    // ======================================
    #[error("Service startup failed: {0}")]
    StartupFailed(String),
}

/// Result type alias using WxError
pub type WxResult<T> = Result<T, WxError>;

/// Coarse classification used for logging and retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Communication,
    Data,
    System,
}

impl WxError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn startup(msg: impl Into<String>) -> Self {
        Self::StartupFailed(msg.into())
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Protocol { .. } | Self::ConnectionFailed { .. } | Self::Timeout(_) => {
                ErrorCategory::Communication
            },
            Self::Mapping(_) | Self::Storage(_) => ErrorCategory::Data,
            Self::Io(_) | Self::StartupFailed(_) => ErrorCategory::System,
        }
    }

    /// Stable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "CONFIG_ERROR",
            Self::Protocol { .. } => "PROTOCOL_ERROR",
            Self::ConnectionFailed { .. } => "CONNECTION_FAILED",
            Self::Timeout(_) => "TIMEOUT",
            Self::Mapping(_) => "MAPPING_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::StartupFailed(_) => "STARTUP_FAILED",
        }
    }

    /// Communication failures clear up on their own; the next poll tick retries.
    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Communication
    }

    pub fn log_level(&self) -> tracing::Level {
        match self.category() {
            ErrorCategory::Communication => tracing::Level::WARN,
            ErrorCategory::Data => tracing::Level::DEBUG,
            ErrorCategory::Configuration | ErrorCategory::System => tracing::Level::ERROR,
        }
    }

    pub fn to_error_info(&self) -> ErrorInfo {
        ErrorInfo {
            code: self.error_code().to_string(),
            message: self.to_string(),
            retryable: self.is_retryable(),
        }
    }
}
