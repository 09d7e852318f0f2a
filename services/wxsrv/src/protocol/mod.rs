//! Device wire protocol
//!
//! - `frame`: fixed-offset big-endian frame layouts
//! - `catalog`: the supported calls and their response layouts
//! - `codec`: splits the TCP stream into frames
//! - `session`: one poll cycle's request/response bookkeeping
//! - `transport`: TCP connect with timeout

pub mod catalog;
pub mod codec;
pub mod frame;
pub mod session;
pub mod transport;

pub use catalog::{catalog, enabled_calls, CallFlag, CallFlags, CommandSpec};
pub use codec::ResponseCodec;
pub use frame::{FrameHeader, Layout};
pub use session::{ResponseOutcome, Session};
