//! Index settings snapshot
//!
//! Source indices serve live traffic while destinations are built with
//! write-optimised settings (no replicas, refresh disabled). The serving
//! settings of the source are captured before reindexing and applied to the
//! destination right before the alias is switched.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Translog durability forced on a destination before it takes live traffic
pub const SERVING_TRANSLOG_DURABILITY: &str = "request";

/// The `index` settings object of a concrete index, as reported by the engine.
///
/// Engines report most values as strings (`"number_of_shards": "5"`), so the
/// accessors accept either strings or numbers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexSettings(pub Value);

impl IndexSettings {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn number_of_shards(&self) -> Option<u32> {
        self.get_u32("number_of_shards")
    }

    pub fn number_of_replicas(&self) -> Option<u32> {
        self.get_u32("number_of_replicas")
    }

    pub fn refresh_interval(&self) -> Option<String> {
        self.0
            .get("refresh_interval")
            .and_then(value_to_string)
    }

    pub fn translog_durability(&self) -> Option<String> {
        self.0
            .pointer("/translog/durability")
            .or_else(|| self.0.get("translog.durability"))
            .and_then(value_to_string)
    }

    fn get_u32(&self, key: &str) -> Option<u32> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Serving settings of a source index, persisted on its subtask
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_interval: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_replicas: Option<u32>,

    /// Durability of the source, kept for reference; the destination always
    /// gets [`SERVING_TRANSLOG_DURABILITY`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translog_durability: Option<String>,
}

impl SettingsSnapshot {
    /// Capture the dynamic settings worth restoring
    pub fn capture(settings: &IndexSettings) -> Self {
        Self {
            refresh_interval: settings.refresh_interval(),
            number_of_replicas: settings.number_of_replicas(),
            translog_durability: settings.translog_durability(),
        }
    }

    /// Body for an update-settings call that puts a destination into serving shape
    pub fn restore_body(&self) -> Value {
        let mut index = Map::new();
        if let Some(ref interval) = self.refresh_interval {
            index.insert("refresh_interval".to_string(), json!(interval));
        }
        if let Some(replicas) = self.number_of_replicas {
            index.insert("number_of_replicas".to_string(), json!(replicas));
        }
        index.insert(
            "translog".to_string(),
            json!({ "durability": SERVING_TRANSLOG_DURABILITY }),
        );

        json!({ "index": index })
    }
}
