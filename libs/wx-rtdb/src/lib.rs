//! State store abstraction for weather telemetry
//!
//! The normalization engine only talks to persistence through the [`Rtdb`]
//! trait: read a state, write a state, make sure an object exists, and read or
//! replace its metadata. [`MemoryRtdb`] is the in-process backend.

pub mod error;
pub mod memory_impl;
pub mod traits;

pub use error::{Result, RtdbError};
pub use memory_impl::{MemoryRtdb, MemoryStats};
pub use traits::{Rtdb, StoredState};
