//! Per-tutorial `waver-config.json` model.
//!
//! The file is written by the generation service and is not trusted to match a
//! schema: fields are pulled out of the JSON object one by one, and anything
//! missing or of the wrong type falls back to its default.

use serde::Serialize;
use serde_json::{Map, Value};

use super::Difficulty;

/// Authoritative metadata for a persisted tutorial.
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct WaverConfig {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Source repository URL
    pub repo: Option<String>,
    pub author: Option<String>,
    /// Primary language of the source repository
    pub language: Option<String>,
    pub tags: Vec<String>,
    pub difficulty: Difficulty,
    pub estimated_time: Option<String>,
    pub prerequisites: Vec<String>,
    pub last_updated: Option<String>,
}

impl WaverConfig {
    /// Parse the raw JSON document. Only a non-JSON or non-object document is an error.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(raw)?;
        let Value::Object(map) = value else {
            return Err(serde::de::Error::custom("waver-config.json must be a JSON object"));
        };

        Ok(Self {
            title: string_field(&map, "title"),
            description: string_field(&map, "description"),
            repo: string_field(&map, "repo"),
            author: string_field(&map, "author"),
            language: string_field(&map, "language"),
            tags: string_list_field(&map, "tags"),
            difficulty: Difficulty::parse_or_default(
                map.get("difficulty").and_then(Value::as_str),
            ),
            estimated_time: string_field(&map, "estimatedTime"),
            prerequisites: string_list_field(&map, "prerequisites"),
            last_updated: string_field(&map, "lastUpdated"),
        })
    }
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn string_list_field(map: &Map<String, Value>, key: &str) -> Vec<String> {
    match map.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}
