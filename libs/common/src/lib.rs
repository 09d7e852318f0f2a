//! Basic library shared by the weather telemetry services
//!
//! - logging bootstrap (console and rolling file output)
//! - graceful shutdown on SIGINT/SIGTERM
//! - hex formatting for wire dumps

pub mod hex;
pub mod logging;
pub mod shutdown;

pub use logging::LogConfig;
pub use shutdown::wait_for_shutdown;
