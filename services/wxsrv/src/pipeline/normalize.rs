//! Normalization pipeline
//!
//! Raw key/value maps from any vocabulary in, canonical `(path, value, unit)`
//! pairs out. Keys nothing claims, values that do not parse and readings
//! outside a field's bounds are dropped with a debug note.

use crate::pipeline::registry::{CompiledField, FieldRegistry};
use tracing::{debug, warn};
use wx_model::{
    CanonicalPair, CanonicalValue, Channel, FieldType, RawFieldMap, RawValue, Vocabulary,
};

/// Map every raw field to its canonical pair.
///
/// `hint` selects the channel the pairs are filed under; without one each
/// field goes to its primary channel. A hinted channel the field does not
/// declare drops the field.
pub fn normalize(
    registry: &FieldRegistry,
    vocabulary: Vocabulary,
    raw: &RawFieldMap,
    hint: Option<Channel>,
) -> Vec<CanonicalPair> {
    let mut pairs = Vec::with_capacity(raw.len());

    for (key, value) in raw {
        let Some((field, instance)) = registry.resolve(vocabulary, key) else {
            debug!(%vocabulary, key = %key, "Unmapped field dropped");
            continue;
        };

        let channel = match hint {
            Some(channel) if field.spec.has_channel(channel) => channel,
            Some(channel) => {
                debug!(key = %key, field = field.id(), %channel, "Field not kept on this channel");
                continue;
            },
            None => match field.spec.primary_channel() {
                Some(channel) => channel,
                None => continue,
            },
        };

        let Some(value) = canonical_value(field, vocabulary, key, value) else {
            continue;
        };

        let path = match instance {
            Some(instance) => format!("{}.{}.{}", channel.path(), field.id(), instance),
            None => format!("{}.{}", channel.path(), field.id()),
        };

        pairs.push(CanonicalPair {
            path,
            field_id: field.id().to_string(),
            value,
            unit: field.canonical_unit().map(str::to_string),
        });
    }

    pairs
}

fn canonical_value(
    field: &CompiledField,
    vocabulary: Vocabulary,
    key: &str,
    raw: &RawValue,
) -> Option<CanonicalValue> {
    match field.spec.field_type {
        FieldType::Text => Some(CanonicalValue::Text(raw.to_text())),
        FieldType::Number => {
            let Some(mut value) = raw.as_f64() else {
                debug!(key = %key, ?raw, "Non-numeric value dropped");
                return None;
            };

            if let Some(expr) = field.source(vocabulary).and_then(|s| s.to_canonical.as_ref()) {
                value = match expr.eval(value) {
                    Ok(converted) => converted,
                    Err(e) => {
                        warn!(key = %key, "Conversion failed: {e}");
                        return None;
                    },
                };
            }

            let below = field.spec.min.is_some_and(|min| value < min);
            let above = field.spec.max.is_some_and(|max| value > max);
            if below || above {
                debug!(key = %key, value, "Reading outside field bounds dropped");
                return None;
            }

            Some(CanonicalValue::Number(value))
        },
    }
}
