//! Service configuration
//!
//! Layered with figment: built-in defaults, then a YAML file, then
//! `WXSRV_`-prefixed environment variables (`__` separates nesting levels,
//! e.g. `WXSRV_SCHEDULER__INTERVAL_SECS=30`).
//!
//! Validation never fails the load. Each problem becomes a [`ConfigIssue`]
//! and the feature it affects is switched off.

use crate::error::{Result, WxSrvError};
use crate::pipeline::FieldRegistry;
use crate::protocol::CallFlags;
use crate::runtime::publisher::DisplayUnits;
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use wx_model::UnitGroup;

pub const DEFAULT_CONFIG_PATH: &str = "config/wxsrv.yaml";
pub const ENV_PREFIX: &str = "WXSRV_";

/// Binary protocol polling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub address: String,
    pub port: u16,
    /// Whole seconds between poll cycles, > 0
    pub interval_secs: u64,
    /// Connect, write and read timeout
    pub timeout_ms: u64,
    pub calls: CallFlags,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: String::new(),
            port: 45000,
            interval_secs: 30,
            timeout_ms: 5000,
            calls: CallFlags::default(),
        }
    }
}

/// HTTP upload endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    pub enabled: bool,
    pub bind: String,
    pub port: u16,
    pub path: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: "0.0.0.0".to_string(),
            port: 8090,
            path: "/weatherstation/updateweatherstation.php".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Enables the daily rolling log file
    pub dir: Option<PathBuf>,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
            json: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub scheduler: SchedulerConfig,
    pub listener: ListenerConfig,
    /// Unit group key (`unit_temperature`, ...) to display unit
    pub units: BTreeMap<String, String>,
    pub logging: LoggingConfig,
}

/// A configuration problem and the feature it disabled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub key: String,
    pub message: String,
}

impl ConfigIssue {
    fn new(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.message)
    }
}

impl AppConfig {
    /// Defaults, then `path` (or the default file if present), then env.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let figment = Figment::from(Serialized::defaults(AppConfig::default()));
        let figment = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(WxSrvError::config(format!(
                        "configuration file not found: {}",
                        path.display()
                    )));
                }
                figment.merge(Yaml::file(path))
            },
            None => figment.merge(Yaml::file(DEFAULT_CONFIG_PATH)),
        };

        Ok(figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?)
    }

    /// Check the configuration, switching off whatever is unusable.
    pub fn validate(&mut self, registry: &FieldRegistry) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        let scheduler = &mut self.scheduler;
        if scheduler.enabled {
            let problem = if scheduler.interval_secs == 0 {
                Some(ConfigIssue::new("scheduler.interval_secs", "must be greater than 0"))
            } else if scheduler.address.trim().is_empty() {
                Some(ConfigIssue::new("scheduler.address", "station address is empty"))
            } else if scheduler.port == 0 {
                Some(ConfigIssue::new("scheduler.port", "port cannot be zero"))
            } else if scheduler.timeout_ms == 0 {
                Some(ConfigIssue::new("scheduler.timeout_ms", "must be greater than 0"))
            } else {
                None
            };
            if let Some(issue) = problem {
                issues.push(ConfigIssue::new(
                    issue.key,
                    format!("{}, scheduler disabled", issue.message),
                ));
                scheduler.enabled = false;
            }
        }

        let listener = &mut self.listener;
        if listener.enabled {
            if listener.port == 0 {
                issues.push(ConfigIssue::new(
                    "listener.port",
                    "port cannot be zero, listener disabled",
                ));
                listener.enabled = false;
            } else if !listener.path.starts_with('/') {
                issues.push(ConfigIssue::new(
                    "listener.path",
                    format!("'{}' must start with '/', listener disabled", listener.path),
                ));
                listener.enabled = false;
            }
        }

        self.units.retain(|key, unit| {
            let Ok(group) = key.parse::<UnitGroup>() else {
                issues.push(ConfigIssue::new(
                    format!("units.{key}"),
                    "unknown unit group, ignored",
                ));
                return false;
            };
            let known = registry.units_for_group(group);
            if known.contains(&unit.as_str()) {
                return true;
            }
            issues.push(ConfigIssue::new(
                format!("units.{key}"),
                format!(
                    "unknown unit '{unit}' (expected one of {}), values stay in the canonical unit",
                    known.join(", ")
                ),
            ));
            false
        });

        issues
    }

    /// Display units by group, as left by [`AppConfig::validate`]
    pub fn display_units(&self) -> DisplayUnits {
        self.units
            .iter()
            .filter_map(|(key, unit)| Some((key.parse::<UnitGroup>().ok()?, unit.clone())))
            .collect()
    }
}
