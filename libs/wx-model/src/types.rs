//! Value and metadata types shared by the codec, the pipeline and the store

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Decoded fields of one frame or one upload, keyed by source field name.
pub type RawFieldMap = BTreeMap<String, RawValue>;

/// Source dialect a raw field map was produced in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vocabulary {
    /// Binary TCP protocol of the station itself
    DeviceBinary,
    /// Query-string uploads in Wunderground format
    Wunderground,
    /// Form-encoded uploads in Ecowitt format
    Ecowitt,
}

impl Vocabulary {
    pub const ALL: [Vocabulary; 3] = [
        Vocabulary::DeviceBinary,
        Vocabulary::Wunderground,
        Vocabulary::Ecowitt,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Vocabulary::DeviceBinary => "device_binary",
            Vocabulary::Wunderground => "wunderground",
            Vocabulary::Ecowitt => "ecowitt",
        }
    }
}

impl fmt::Display for Vocabulary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Vocabulary {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "device_binary" | "device" | "scheduler" => Ok(Vocabulary::DeviceBinary),
            "wunderground" | "wu" => Ok(Vocabulary::Wunderground),
            "ecowitt" | "ew" => Ok(Vocabulary::Ecowitt),
            _ => Err(ModelError::UnknownVocabulary(s.to_string())),
        }
    }
}

/// Whether a field carries a number or a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Number,
    Text,
}

/// A value as it came off the wire, before any conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Integer(i64),
    Number(f64),
    Text(String),
}

impl RawValue {
    /// Numeric view of the value. Text is parsed after trimming.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RawValue::Integer(i) => Some(*i as f64),
            RawValue::Number(n) => Some(*n),
            RawValue::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        }
    }

    /// Text view of the value. Numbers are formatted.
    pub fn to_text(&self) -> String {
        match self {
            RawValue::Integer(i) => i.to_string(),
            RawValue::Number(n) => n.to_string(),
            RawValue::Text(s) => s.clone(),
        }
    }
}

impl From<i64> for RawValue {
    fn from(v: i64) -> Self {
        RawValue::Integer(v)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        RawValue::Text(v.to_string())
    }
}

impl From<String> for RawValue {
    fn from(v: String) -> Self {
        RawValue::Text(v)
    }
}

/// A value in the canonical unit of its field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CanonicalValue {
    Number(f64),
    Text(String),
}

impl CanonicalValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CanonicalValue::Number(n) => Some(*n),
            CanonicalValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CanonicalValue::Number(_) => None,
            CanonicalValue::Text(s) => Some(s),
        }
    }
}

impl fmt::Display for CanonicalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanonicalValue::Number(n) => write!(f, "{}", n),
            CanonicalValue::Text(s) => f.write_str(s),
        }
    }
}

/// One normalized measurement ready for the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalPair {
    /// Full state path, e.g. `weather.current.soilmoisture.2`
    pub path: String,
    /// Id of the field definition that produced it
    pub field_id: String,
    pub value: CanonicalValue,
    /// Canonical unit, if the field has one
    pub unit: Option<String>,
}

/// Metadata the store keeps alongside every state path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub name: String,
    pub field_type: FieldType,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Field definition id, used to find unit options when reconciling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_id: Option<String>,
}

/// Category a measurement is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Info,
    Current,
    Max,
    Min,
    DailyMax,
    DailyMin,
}

impl Channel {
    pub const ALL: [Channel; 6] = [
        Channel::Info,
        Channel::Current,
        Channel::Max,
        Channel::Min,
        Channel::DailyMax,
        Channel::DailyMin,
    ];

    /// State path prefix.
    pub const fn path(self) -> &'static str {
        match self {
            Channel::Info => "info",
            Channel::Current => "weather.current",
            Channel::Max => "weather.maxvalues",
            Channel::Min => "weather.minvalues",
            Channel::DailyMax => "weather.dailymax",
            Channel::DailyMin => "weather.dailymin",
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.path() == path)
    }

    /// Display name of a field when filed under this channel.
    pub fn display_name(self, base: &str) -> String {
        match self {
            Channel::Info | Channel::Current => base.to_string(),
            Channel::Max => format!("Maximum {}", lower_first(base)),
            Channel::Min => format!("Minimum {}", lower_first(base)),
            Channel::DailyMax => format!("Daily maximum {}", lower_first(base)),
            Channel::DailyMin => format!("Daily minimum {}", lower_first(base)),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for Channel {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_path(s).ok_or_else(|| ModelError::UnknownChannel(s.to_string()))
    }
}

fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Group of fields that share one display-unit setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitGroup {
    #[serde(rename = "unit_temperature")]
    Temperature,
    #[serde(rename = "unit_rain")]
    Rain,
    #[serde(rename = "unit_pressure")]
    Pressure,
    #[serde(rename = "unit_windspeed")]
    WindSpeed,
}

impl UnitGroup {
    pub const ALL: [UnitGroup; 4] = [
        UnitGroup::Temperature,
        UnitGroup::Rain,
        UnitGroup::Pressure,
        UnitGroup::WindSpeed,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            UnitGroup::Temperature => "unit_temperature",
            UnitGroup::Rain => "unit_rain",
            UnitGroup::Pressure => "unit_pressure",
            UnitGroup::WindSpeed => "unit_windspeed",
        }
    }
}

impl fmt::Display for UnitGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for UnitGroup {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|g| g.key() == s)
            .ok_or_else(|| ModelError::UnknownUnitGroup(s.to_string()))
    }
}
