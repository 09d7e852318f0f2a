//! In-memory state store
//!
//! Uses DashMap for concurrent access from the scheduler and listener tasks.

use crate::error::RtdbError;
use crate::traits::*;
use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::trace;
use wx_model::{CanonicalValue, FieldType, ObjectMeta};

/// In-memory store with concurrent access support
#[derive(Clone)]
pub struct MemoryRtdb {
    states: Arc<DashMap<String, (CanonicalValue, i64)>>,
    objects: Arc<DashMap<String, ObjectMeta>>,
}

impl MemoryRtdb {
    pub fn new() -> Self {
        Self {
            states: Arc::new(DashMap::new()),
            objects: Arc::new(DashMap::new()),
        }
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) {
        self.states.clear();
        self.objects.clear();
    }

    /// Get statistics about stored data
    pub fn stats(&self) -> MemoryStats {
        MemoryStats {
            object_count: self.objects.len(),
            state_count: self.states.len(),
        }
    }
}

impl Default for MemoryRtdb {
    fn default() -> Self {
        Self::new()
    }
}

/// Memory usage statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryStats {
    pub object_count: usize,
    pub state_count: usize,
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[async_trait]
impl Rtdb for MemoryRtdb {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    async fn get_state(&self, path: &str) -> Result<Option<StoredState>> {
        let Some(entry) = self.states.get(path) else {
            return Ok(None);
        };
        let (value, ts) = entry.value().clone();
        drop(entry);
        let unit = self.objects.get(path).and_then(|meta| meta.unit.clone());
        Ok(Some(StoredState { value, unit, ts }))
    }

    async fn set_state(&self, path: &str, value: CanonicalValue) -> Result<()> {
        let Some(meta) = self.objects.get(path) else {
            return Err(RtdbError::ObjectNotDefined(path.to_string()).into());
        };
        let type_matches = matches!(
            (&value, meta.field_type),
            (CanonicalValue::Number(_), FieldType::Number)
                | (CanonicalValue::Text(_), FieldType::Text)
        );
        if !type_matches {
            let expected = format!("{:?}", meta.field_type).to_lowercase();
            return Err(RtdbError::InvalidDataType {
                path: path.to_string(),
                expected,
            }
            .into());
        }
        drop(meta);

        trace!(path, %value, "set_state");
        self.states.insert(path.to_string(), (value, now_millis()));
        Ok(())
    }

    async fn ensure_defined(&self, path: &str, meta: ObjectMeta) -> Result<bool> {
        let mut created = false;
        self.objects.entry(path.to_string()).or_insert_with(|| {
            created = true;
            meta
        });
        Ok(created)
    }

    async fn get_object(&self, path: &str) -> Result<Option<ObjectMeta>> {
        Ok(self.objects.get(path).map(|m| m.value().clone()))
    }

    async fn extend_object(&self, path: &str, meta: ObjectMeta) -> Result<()> {
        match self.objects.get_mut(path) {
            Some(mut existing) => {
                *existing = meta;
                Ok(())
            },
            None => Err(RtdbError::ObjectNotDefined(path.to_string()).into()),
        }
    }

    async fn list_objects(&self, prefix: &str) -> Result<Vec<(String, ObjectMeta)>> {
        let mut objects: Vec<_> = self
            .objects
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        objects.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(objects)
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    fn meta(field_type: FieldType, unit: Option<&str>) -> ObjectMeta {
        ObjectMeta {
            name: "Outdoor temperature".to_string(),
            field_type,
            role: "value.temperature".to_string(),
            unit: unit.map(str::to_string),
            min: None,
            max: None,
            field_id: Some("outdoortemp".to_string()),
        }
    }

    #[tokio::test]
    async fn test_set_requires_object() {
        let db = MemoryRtdb::new();
        let err = db
            .set_state("weather.current.outdoortemp", CanonicalValue::Number(21.2))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not defined"));
    }

    #[tokio::test]
    async fn test_state_roundtrip_carries_unit() {
        let db = MemoryRtdb::new();
        let path = "weather.current.outdoortemp";
        assert!(db
            .ensure_defined(path, meta(FieldType::Number, Some("°C")))
            .await
            .unwrap());
        db.set_state(path, CanonicalValue::Number(21.2)).await.unwrap();

        let state = db.get_state(path).await.unwrap().unwrap();
        assert_eq!(state.value, CanonicalValue::Number(21.2));
        assert_eq!(state.unit.as_deref(), Some("°C"));
        assert!(state.ts > 0);
    }

    #[tokio::test]
    async fn test_ensure_defined_keeps_existing_meta() {
        let db = MemoryRtdb::new();
        let path = "weather.current.outdoortemp";
        db.ensure_defined(path, meta(FieldType::Number, Some("°F")))
            .await
            .unwrap();
        let created = db
            .ensure_defined(path, meta(FieldType::Number, Some("°C")))
            .await
            .unwrap();
        assert!(!created);
        let stored = db.get_object(path).await.unwrap().unwrap();
        assert_eq!(stored.unit.as_deref(), Some("°F"));
    }

    #[tokio::test]
    async fn test_extend_object_replaces_meta() {
        let db = MemoryRtdb::new();
        let path = "weather.current.outdoortemp";
        assert!(db
            .extend_object(path, meta(FieldType::Number, None))
            .await
            .is_err());

        db.ensure_defined(path, meta(FieldType::Number, Some("°F")))
            .await
            .unwrap();
        db.extend_object(path, meta(FieldType::Number, Some("°C")))
            .await
            .unwrap();
        let stored = db.get_object(path).await.unwrap().unwrap();
        assert_eq!(stored.unit.as_deref(), Some("°C"));
    }

    #[tokio::test]
    async fn test_type_mismatch_rejected() {
        let db = MemoryRtdb::new();
        db.ensure_defined("info.softwaretype", meta(FieldType::Text, None))
            .await
            .unwrap();
        assert!(db
            .set_state("info.softwaretype", CanonicalValue::Number(1.0))
            .await
            .is_err());
        db.set_state("info.softwaretype", CanonicalValue::Text("EasyWeatherV1.6.4".into()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_list_objects_by_prefix() {
        let db = MemoryRtdb::new();
        for path in [
            "weather.current.outdoortemp",
            "weather.current.indoortemp",
            "weather.maxvalues.outdoortemp",
            "info.softwaretype",
        ] {
            db.ensure_defined(path, meta(FieldType::Number, None))
                .await
                .unwrap();
        }
        let listed = db.list_objects("weather.current.").await.unwrap();
        let paths: Vec<_> = listed.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(
            paths,
            vec!["weather.current.indoortemp", "weather.current.outdoortemp"]
        );
        assert_eq!(db.list_objects("").await.unwrap().len(), 4);
        assert_eq!(
            db.stats(),
            MemoryStats {
                object_count: 4,
                state_count: 0
            }
        );
        db.clear();
        assert_eq!(db.stats().object_count, 0);
    }
}
