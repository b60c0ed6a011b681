// ABOUTME: Shared data models for Redis Console
// ABOUTME: Key metadata, scan pages, decoded values and key action results

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Cursor value that both starts and ends a SCAN iteration
pub const START_CURSOR: &str = "0";

/// Redis data type as reported by TYPE
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum KeyType {
    String,
    List,
    Set,
    Zset,
    Hash,
    Stream,
    /// Key does not exist
    None,
    /// Module types and anything else TYPE can return
    Other(String),
}

impl KeyType {
    pub fn from_redis_type(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "string" => KeyType::String,
            "list" => KeyType::List,
            "set" => KeyType::Set,
            "zset" => KeyType::Zset,
            "hash" => KeyType::Hash,
            "stream" => KeyType::Stream,
            "none" => KeyType::None,
            _ => KeyType::Other(s.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            KeyType::String => "string",
            KeyType::List => "list",
            KeyType::Set => "set",
            KeyType::Zset => "zset",
            KeyType::Hash => "hash",
            KeyType::Stream => "stream",
            KeyType::None => "none",
            KeyType::Other(name) => name,
        }
    }
}

impl std::fmt::Display for KeyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<String> for KeyType {
    fn from(value: String) -> Self {
        KeyType::from_redis_type(&value)
    }
}

impl From<KeyType> for String {
    fn from(value: KeyType) -> Self {
        value.as_str().to_string()
    }
}

/// One row of the key list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfo {
    pub key: String,
    #[serde(rename = "type")]
    pub key_type: KeyType,
    /// Seconds left; -1 = no expiry, -2 = key absent
    pub ttl: i64,
}

impl KeyInfo {
    pub fn new(key: impl Into<String>, key_type: KeyType, ttl: i64) -> Self {
        Self {
            key: key.into(),
            key_type,
            ttl,
        }
    }
}

/// One SCAN step worth of keys
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanPage {
    pub cursor: String,
    pub items: Vec<KeyInfo>,
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub connection_lost: bool,
}

impl ScanPage {
    /// Nothing to scan: no active connection
    pub fn empty() -> Self {
        Self {
            cursor: START_CURSOR.to_string(),
            items: Vec::new(),
            done: true,
            error: None,
            connection_lost: false,
        }
    }

    /// Page after one round-trip. A returned cursor of "0" ends the iteration,
    /// including on the very first page of an empty keyspace.
    pub fn from_step(cursor: String, items: Vec<KeyInfo>) -> Self {
        let done = cursor == START_CURSOR;
        Self {
            cursor,
            items,
            done,
            error: None,
            connection_lost: false,
        }
    }

    pub fn failure(message: impl Into<String>, connection_lost: bool) -> Self {
        Self {
            error: Some(message.into()),
            connection_lost,
            ..Self::empty()
        }
    }
}

/// A stream entry from XRANGE
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamEntry {
    pub id: String,
    pub fields: Vec<(String, String)>,
}

/// Decoded value of a key, one variant per supported type
#[derive(Debug, Clone, PartialEq)]
pub enum KeyValue {
    String(String),
    Hash(Vec<(String, String)>),
    List(Vec<String>),
    Set(Vec<String>),
    /// Members with their scores, as returned by ZRANGE WITHSCORES
    Zset(Vec<(String, String)>),
    Stream(Vec<StreamEntry>),
    Unsupported,
}

pub const UNSUPPORTED_PLACEHOLDER: &str = "[unsupported type]";

fn pairs_to_object(pairs: &[(String, String)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(field, value)| (field.clone(), Value::String(value.clone())))
        .collect()
}

impl KeyValue {
    pub fn to_json(&self) -> Value {
        match self {
            KeyValue::String(value) => Value::String(value.clone()),
            KeyValue::Hash(entries) => Value::Object(pairs_to_object(entries)),
            KeyValue::List(items) | KeyValue::Set(items) => json!(items),
            KeyValue::Zset(entries) => Value::Array(
                entries
                    .iter()
                    .map(|(member, score)| json!({ "member": member, "score": score }))
                    .collect(),
            ),
            KeyValue::Stream(entries) => Value::Array(
                entries
                    .iter()
                    .map(|entry| {
                        json!({ "id": entry.id, "fields": pairs_to_object(&entry.fields) })
                    })
                    .collect(),
            ),
            KeyValue::Unsupported => Value::String(UNSUPPORTED_PLACEHOLDER.to_string()),
        }
    }

    /// Text shown in the detail panel.
    ///
    /// Strings that parse as JSON are pretty-printed, other strings are shown
    /// raw; every other type is pretty-printed JSON.
    pub fn display_text(&self) -> String {
        match self {
            KeyValue::String(raw) => match serde_json::from_str::<Value>(raw) {
                Ok(parsed) => pretty(&parsed).unwrap_or_else(|| raw.clone()),
                Err(_) => raw.clone(),
            },
            KeyValue::Unsupported => UNSUPPORTED_PLACEHOLDER.to_string(),
            other => pretty(&other.to_json()).unwrap_or_default(),
        }
    }
}

fn pretty(value: &Value) -> Option<String> {
    serde_json::to_string_pretty(value).ok()
}

/// Result of fetching one key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyDetail {
    pub ok: bool,
    pub key: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub key_type: Option<KeyType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlighted_html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub connection_lost: bool,
}

impl KeyDetail {
    /// Placeholder before anything has been fetched
    pub fn pending() -> Self {
        Self {
            ok: false,
            key: String::new(),
            key_type: None,
            ttl: None,
            value: None,
            value_text: None,
            highlighted_html: None,
            error: None,
            connection_lost: false,
        }
    }

    pub fn loaded(key: impl Into<String>, key_type: KeyType, ttl: i64, value: &KeyValue) -> Self {
        let value_text = value.display_text();
        let highlighted_html = crate::highlight::highlight_json(&value_text);
        Self {
            ok: true,
            key: key.into(),
            key_type: Some(key_type),
            ttl: Some(ttl),
            value: Some(value.to_json()),
            value_text: Some(value_text),
            highlighted_html: Some(highlighted_html),
            ..Self::pending()
        }
    }

    pub fn failure(key: impl Into<String>, message: impl Into<String>, connection_lost: bool) -> Self {
        Self {
            key: key.into(),
            error: Some(message.into()),
            connection_lost,
            ..Self::pending()
        }
    }
}

/// Result of updating or deleting a key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyUpdateResult {
    pub ok: bool,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub connection_lost: bool,
}

impl KeyUpdateResult {
    /// Placeholder before any submission
    pub fn idle() -> Self {
        Self {
            ok: true,
            key: String::new(),
            error: None,
            connection_lost: false,
        }
    }

    pub fn success(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::idle()
        }
    }

    pub fn failure(key: impl Into<String>, message: impl Into<String>, connection_lost: bool) -> Self {
        Self {
            ok: false,
            key: key.into(),
            error: Some(message.into()),
            connection_lost,
        }
    }
}

/// Top-level screen of the console
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Connections,
    Browser,
}
