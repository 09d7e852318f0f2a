//! State publisher
//!
//! Writes canonical pairs to the state store in the configured display unit
//! and keeps the object metadata unit in step with what was written.

use crate::error::Result;
use crate::pipeline::{normalize, reconcile, to_display, CompiledField, FieldRegistry};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use wx_model::{
    CanonicalPair, CanonicalValue, Channel, FieldType, ObjectMeta, RawFieldMap, UnitGroup,
    Vocabulary,
};
use wx_rtdb::Rtdb;

/// Path stamped after every non-empty batch
pub const LAST_UPDATE_PATH: &str = "info.last_update";

/// Display unit per unit group; groups without an entry stay canonical
pub type DisplayUnits = BTreeMap<UnitGroup, String>;

#[derive(Clone)]
pub struct StatePublisher {
    rtdb: Arc<dyn Rtdb>,
    registry: Arc<FieldRegistry>,
    units: DisplayUnits,
}

impl StatePublisher {
    pub fn new(rtdb: Arc<dyn Rtdb>, registry: Arc<FieldRegistry>, units: DisplayUnits) -> Self {
        Self {
            rtdb,
            registry,
            units,
        }
    }

    pub fn registry(&self) -> &Arc<FieldRegistry> {
        &self.registry
    }

    /// Unit a field is stored in under the current configuration
    pub fn display_unit(&self, field: &CompiledField) -> Option<&str> {
        let configured = field
            .spec
            .unit_group
            .and_then(|group| self.units.get(&group))
            .map(String::as_str)
            .filter(|unit| field.unit(unit).is_some());
        configured.or(field.canonical_unit())
    }

    /// Store a batch. Returns the number of states written.
    pub async fn publish(&self, pairs: &[CanonicalPair]) -> Result<usize> {
        let mut written = 0;

        for pair in pairs {
            let Some(field) = self.registry.get(&pair.field_id) else {
                warn!(path = %pair.path, "No definition for field {}", pair.field_id);
                continue;
            };

            let unit = self.display_unit(field).map(str::to_string);
            let value = match (&pair.value, unit.as_deref()) {
                (CanonicalValue::Number(v), Some(target))
                    if Some(target) != field.canonical_unit() =>
                {
                    match to_display(field, *v, target) {
                        Ok(converted) => CanonicalValue::Number(converted),
                        Err(e) => {
                            error!(path = %pair.path, "Display conversion failed: {e}");
                            continue;
                        },
                    }
                },
                (value, _) => value.clone(),
            };

            self.define(&pair.path, field, unit).await?;
            self.rtdb.set_state(&pair.path, value).await?;
            written += 1;
        }

        if written > 0 {
            self.stamp_last_update().await?;
            debug!("Published {written} states");
        }
        Ok(written)
    }

    /// Convert values persisted in a unit other than the configured one.
    ///
    /// Returns the number of states converted. Unknown units are reported
    /// and leave the stored value as it is.
    pub async fn reconcile_stored(&self) -> Result<usize> {
        let mut converted = 0;

        for (path, meta) in self.rtdb.list_objects("").await? {
            let Some(field) = meta.field_id.as_deref().and_then(|id| self.registry.get(id)) else {
                continue;
            };
            if field.spec.field_type != FieldType::Number {
                continue;
            }
            let (Some(stored_unit), Some(target)) = (meta.unit.as_deref(), self.display_unit(field))
            else {
                continue;
            };
            if stored_unit == target {
                continue;
            }

            let Some(state) = self.rtdb.get_state(&path).await? else {
                continue;
            };
            let Some(value) = state.value.as_f64() else {
                continue;
            };

            let value = match reconcile(field, value, stored_unit, target) {
                Ok(value) => value,
                Err(e) => {
                    error!(%path, "Configuration error, value left unconverted: {e}");
                    continue;
                },
            };

            let converted_meta = ObjectMeta {
                unit: Some(target.to_string()),
                ..meta.clone()
            };
            self.rtdb.extend_object(&path, converted_meta).await?;
            // Value and metadata unit change together or not at all
            if let Err(e) = self.rtdb.set_state(&path, CanonicalValue::Number(value)).await {
                self.rtdb.extend_object(&path, meta).await?;
                return Err(e.into());
            }
            debug!(%path, from = stored_unit, to = target, "Stored value converted");
            converted += 1;
        }

        if converted > 0 {
            info!("Converted {converted} stored values to the configured units");
        }
        Ok(converted)
    }

    async fn define(&self, path: &str, field: &CompiledField, unit: Option<String>) -> Result<()> {
        let meta = object_meta(path, field, unit.clone());
        if self.rtdb.ensure_defined(path, meta).await? {
            return Ok(());
        }

        if let Some(existing) = self.rtdb.get_object(path).await? {
            if existing.unit != unit {
                self.rtdb
                    .extend_object(path, ObjectMeta { unit, ..existing })
                    .await?;
            }
        }
        Ok(())
    }

    async fn stamp_last_update(&self) -> Result<()> {
        let meta = ObjectMeta {
            name: "Last update".to_string(),
            field_type: FieldType::Text,
            role: "date".to_string(),
            unit: None,
            min: None,
            max: None,
            field_id: None,
        };
        self.rtdb.ensure_defined(LAST_UPDATE_PATH, meta).await?;
        self.rtdb
            .set_state(
                LAST_UPDATE_PATH,
                CanonicalValue::Text(chrono::Utc::now().to_rfc3339()),
            )
            .await?;
        Ok(())
    }
}

fn object_meta(path: &str, field: &CompiledField, unit: Option<String>) -> ObjectMeta {
    let channel = Channel::ALL
        .into_iter()
        .find(|c| path.starts_with(&format!("{}.", c.path())));
    let mut name = match channel {
        Some(channel) => channel.display_name(field.spec.name),
        None => field.spec.name.to_string(),
    };
    // Instance index after `{channel}.{id}`
    if let Some(instance) = path
        .rsplit_once('.')
        .filter(|(head, _)| head.ends_with(field.id()))
        .map(|(_, tail)| tail)
        .filter(|tail| *tail != field.id())
    {
        name = format!("{name} {instance}");
    }

    ObjectMeta {
        name,
        field_type: field.spec.field_type,
        role: field.spec.role.to_string(),
        unit,
        min: field.spec.min,
        max: field.spec.max,
        field_id: Some(field.id().to_string()),
    }
}

/// Normalize-then-publish entry point shared by both ingestion paths
#[derive(Clone)]
pub struct Ingestor {
    publisher: StatePublisher,
}

impl Ingestor {
    pub fn new(publisher: StatePublisher) -> Self {
        Self { publisher }
    }

    pub fn publisher(&self) -> &StatePublisher {
        &self.publisher
    }

    pub async fn ingest(
        &self,
        vocabulary: Vocabulary,
        raw: &RawFieldMap,
        hint: Option<Channel>,
    ) -> Result<usize> {
        let pairs = normalize(self.publisher.registry(), vocabulary, raw, hint);
        self.publisher.publish(&pairs).await
    }
}
