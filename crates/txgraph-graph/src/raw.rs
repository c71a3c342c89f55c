//! Wire shapes of the Transaction Graph API payload.
//!
//! Every field is optional and decoded leniently: numbers may arrive as
//! strings, booleans as `0`/`1`, edge endpoints as `{ "id": ... }` objects.
//! Each field has several accepted spellings, tried in order; the first one
//! that is present and readable wins, so a record carrying two spellings of
//! the same field still decodes. Anything unreadable becomes `None` and is
//! defaulted later by the adapter.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

const NODE_ID: &[&str] = &["id", "address"];
const NODE_LABEL: &[&str] = &["label", "name"];
const NODE_ENTITY_TYPE: &[&str] = &["entityType", "entity_type", "type"];
const NODE_VOLUME: &[&str] = &["totalVolumeUsd", "total_volume_usd", "volumeUsd"];
const NODE_CONFIDENCE: &[&str] = &["confidenceScore", "confidence_score", "confidence"];
const NODE_ACTIVE: &[&str] = &["isActive", "is_active"];
const TRANSACTION_COUNT: &[&str] = &["transactionCount", "transaction_count", "txCount"];
const NODE_TAGS: &[&str] = &["tags"];

const EDGE_ID: &[&str] = &["id", "edge_id"];
const EDGE_SOURCE: &[&str] = &["sourceId", "source", "source_id", "from"];
const EDGE_TARGET: &[&str] = &["targetId", "target", "target_id", "to"];
const EDGE_AMOUNT: &[&str] = &["transferAmountUsd", "transfer_amount_usd", "amountUsd", "value"];
const EDGE_OTC: &[&str] = &["isSuspectedOtc", "is_suspected_otc", "suspectedOtc"];
const EDGE_COUNT: &[&str] = &["edgeCount", "edge_count"];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNode {
    pub id: Option<String>,
    pub label: Option<String>,
    pub entity_type: Option<String>,
    pub total_volume_usd: Option<f64>,
    pub confidence_score: Option<f64>,
    pub is_active: Option<bool>,
    pub transaction_count: Option<f64>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEdge {
    pub id: Option<String>,
    pub source_id: Option<String>,
    pub target_id: Option<String>,
    pub transfer_amount_usd: Option<f64>,
    pub is_suspected_otc: Option<bool>,
    pub edge_count: Option<f64>,
    pub transaction_count: Option<f64>,
}

impl RawNode {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn from_map(map: &Map<String, Value>) -> Self {
        Self {
            id: first(map, NODE_ID, lenient::string),
            label: first(map, NODE_LABEL, lenient::string),
            entity_type: first(map, NODE_ENTITY_TYPE, lenient::string),
            total_volume_usd: first(map, NODE_VOLUME, lenient::number),
            confidence_score: first(map, NODE_CONFIDENCE, lenient::number),
            is_active: first(map, NODE_ACTIVE, lenient::boolean),
            transaction_count: first(map, TRANSACTION_COUNT, lenient::number),
            tags: first(map, NODE_TAGS, lenient::string_list),
        }
    }
}

impl RawEdge {
    pub fn between(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source_id: Some(source.into()),
            target_id: Some(target.into()),
            ..Default::default()
        }
    }

    pub fn from_map(map: &Map<String, Value>) -> Self {
        Self {
            id: first(map, EDGE_ID, lenient::string),
            source_id: first(map, EDGE_SOURCE, lenient::node_ref),
            target_id: first(map, EDGE_TARGET, lenient::node_ref),
            transfer_amount_usd: first(map, EDGE_AMOUNT, lenient::number),
            is_suspected_otc: first(map, EDGE_OTC, lenient::boolean),
            edge_count: first(map, EDGE_COUNT, lenient::number),
            transaction_count: first(map, TRANSACTION_COUNT, lenient::number),
        }
    }
}

impl<'de> Deserialize<'de> for RawNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Map::deserialize(deserializer).map(|map| Self::from_map(&map))
    }
}

impl<'de> Deserialize<'de> for RawEdge {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Map::deserialize(deserializer).map(|map| Self::from_map(&map))
    }
}

/// First readable value among `keys`, in order.
fn first<T>(map: &Map<String, Value>, keys: &[&str], read: fn(&Value) -> Option<T>) -> Option<T> {
    keys.iter().filter_map(|key| map.get(*key)).find_map(read)
}

/// Top-level payload. `nodes: None` is the one unrecoverable shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawGraphPayload {
    pub nodes: Option<Vec<RawNode>>,
    pub edges: Option<Vec<RawEdge>>,
}

mod lenient {
    use serde_json::Value;

    pub fn number(value: &Value) -> Option<f64> {
        let n = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
            _ => None,
        }?;
        n.is_finite().then_some(n)
    }

    pub fn string(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn node_ref(value: &Value) -> Option<String> {
        match value {
            Value::Object(map) => map.get("id").or_else(|| map.get("address")).and_then(string),
            other => string(other),
        }
    }

    pub fn boolean(value: &Value) -> Option<bool> {
        match value {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_f64().map(|n| n != 0.0),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn string_list(value: &Value) -> Option<Vec<String>> {
        match value {
            Value::Array(items) => Some(items.iter().filter_map(string).collect()),
            Value::String(s) => Some(
                s.split(',')
                    .map(|part| part.trim().to_string())
                    .filter(|part| !part.is_empty())
                    .collect(),
            ),
            _ => None,
        }
    }
}
