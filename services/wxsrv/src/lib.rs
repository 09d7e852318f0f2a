//! wxsrv - weather station telemetry service
//!
//! Two ingestion paths feed one normalization pipeline:
//!
//! - a poll scheduler that speaks the station's binary TCP protocol
//! - an HTTP listener for Wunderground-style and Ecowitt-style uploads
//!
//! ```text
//! station --TCP--> Session --raw fields--+
//!                                        +--> normalize --> StatePublisher --> Rtdb
//! station --HTTP-> listener --raw fields-+
//! ```

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod protocol;
pub mod runtime;

pub use config::AppConfig;
pub use error::{PipelineError, ProtocolError, Result, WxSrvError};
pub use pipeline::FieldRegistry;
pub use runtime::{Ingestor, Runtime, StatePublisher};
