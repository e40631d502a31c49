//! Console replies
//!
//! Every command answers with one JSON object carrying `ok` and either the
//! operation's results or an `err` message.

use serde::Serialize;
use serde_json::json;

use crate::dict::{Lookup, Scalar, StatsSnapshot, Value};

/// Reply body for one console command
#[derive(Debug, Clone, Default, Serialize)]
pub struct Reply {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stale: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forcible: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zones: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<StatsSnapshot>,
}

impl Reply {
    pub fn ok() -> Self {
        Self {
            ok: true,
            ..Self::default()
        }
    }

    pub fn err(message: impl ToString) -> Self {
        Self {
            ok: false,
            err: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn with_value(value: serde_json::Value) -> Self {
        Self {
            value: Some(value),
            ..Self::ok()
        }
    }

    pub fn forcible(forcible: bool) -> Self {
        Self {
            forcible: Some(forcible),
            ..Self::ok()
        }
    }

    pub fn lookup(lookup: Lookup) -> Self {
        Self {
            value: Some(value_to_json(&lookup.value)),
            flags: Some(lookup.flags),
            stale: lookup.stale.then_some(true),
            ..Self::ok()
        }
    }

    /// Serializes to a single line of JSON
    pub fn to_line(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|e| json!({ "ok": false, "err": e.to_string() }).to_string())
    }
}

/// Renders a stored value as JSON; byte strings are decoded lossily.
pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Nil => serde_json::Value::Null,
        Value::Bool(b) => json!(b),
        Value::Number(n) => json!(n),
        Value::Str(bytes) => json!(String::from_utf8_lossy(bytes)),
        Value::List(items) => items.iter().map(scalar_to_json).collect(),
    }
}

pub fn scalar_to_json(item: &Scalar) -> serde_json::Value {
    match item {
        Scalar::Number(n) => json!(n),
        Scalar::Str(bytes) => json!(String::from_utf8_lossy(bytes)),
    }
}
