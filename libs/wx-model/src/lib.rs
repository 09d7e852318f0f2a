//! wx-model - data model for weather telemetry
//!
//! - `types`: vocabularies, channels, raw and canonical values, store metadata
//! - `fields`: the static table of canonical measurement definitions

pub mod error;
pub mod fields;
pub mod types;

pub use error::{ModelError, Result};
pub use fields::{FieldSpec, SourceMapping, UnitOption, FIELDS};
pub use types::{
    CanonicalPair, CanonicalValue, Channel, FieldType, ObjectMeta, RawFieldMap, RawValue, UnitGroup,
    Vocabulary,
};
