// ABOUTME: Raw inbound envelope as delivered by the host message channel
// ABOUTME: Accepts both the legacy `command` and the newer `type` discriminator

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtoError;

/// A raw `{command | type, payload}` envelope
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub payload: Value,
}

impl Envelope {
    pub fn new(command: impl Into<String>, payload: Value) -> Self {
        Self {
            command: Some(command.into()),
            kind: None,
            payload,
        }
    }

    /// Parse a single JSON envelope
    pub fn from_json(raw: &str) -> Result<Self, ProtoError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Event name, preferring `command` over `type` when both are present
    pub fn name(&self) -> Option<&str> {
        self.command.as_deref().or(self.kind.as_deref())
    }

    /// First present field among `keys`, rendered as a string.
    ///
    /// Numbers and booleans are stringified so ids may arrive either way;
    /// objects and arrays come back as compact JSON.
    pub fn field(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .filter_map(|key| self.payload.get(*key))
            .find_map(|value| match value {
                Value::Null => None,
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                Value::Bool(b) => Some(b.to_string()),
                other => Some(other.to_string()),
            })
    }

    /// First present numeric field among `keys`; numeric strings are accepted
    pub fn number(&self, keys: &[&str]) -> Option<f64> {
        keys.iter()
            .filter_map(|key| self.payload.get(*key))
            .find_map(|value| match value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            })
    }

    /// First present boolean field among `keys`
    pub fn flag(&self, keys: &[&str]) -> Option<bool> {
        keys.iter()
            .filter_map(|key| self.payload.get(*key))
            .find_map(Value::as_bool)
    }
}
