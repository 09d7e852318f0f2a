//! Trait definitions for the state store

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::any::Any;
use wx_model::{CanonicalValue, ObjectMeta};

/// A stored state value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredState {
    pub value: CanonicalValue,
    /// Unit recorded in the object metadata when the value was read
    pub unit: Option<String>,
    /// Milliseconds since the Unix epoch of the last write
    pub ts: i64,
}

/// State store used by the normalization engine
///
/// Every state path has an object (metadata) and at most one current value.
/// Writes are last-write-wins per path; there is no cross-path transaction.
///
/// Implementations:
/// - `MemoryRtdb`: in-process backend
#[async_trait]
pub trait Rtdb: Send + Sync + 'static {
    /// Allow downcasting to concrete types
    fn as_any(&self) -> &dyn Any;

    // ========== States ==========

    /// Current value and unit of a path, `None` if never written
    async fn get_state(&self, path: &str) -> Result<Option<StoredState>>;

    /// Write the current value of a path. The object must exist.
    async fn set_state(&self, path: &str, value: CanonicalValue) -> Result<()>;

    // ========== Objects ==========

    /// Create the object if it does not exist yet. Returns `true` when created.
    async fn ensure_defined(&self, path: &str, meta: ObjectMeta) -> Result<bool>;

    /// Metadata of a path
    async fn get_object(&self, path: &str) -> Result<Option<ObjectMeta>>;

    /// Replace the metadata of an existing object
    async fn extend_object(&self, path: &str, meta: ObjectMeta) -> Result<()>;

    /// All objects whose path starts with `prefix`, sorted by path
    async fn list_objects(&self, prefix: &str) -> Result<Vec<(String, ObjectMeta)>>;
}
