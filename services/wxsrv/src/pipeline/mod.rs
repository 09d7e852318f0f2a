//! Normalization pipeline shared by the poll scheduler and the HTTP listener

pub mod normalize;
pub mod registry;
pub mod units;

pub use normalize::normalize;
pub use registry::{CompiledField, FieldRegistry};
pub use units::{reconcile, to_display};
