//! Rack layout interchange format
//!
//! JSON documents holding the full element and connection collection of a
//! canvas. Pure data: positions are stored exactly as the elements hold them,
//! relative to their parent.
//!
//! # Document Format
//!
//! ```json
//! {
//!   "version": "1",
//!   "elements": [
//!     { "id": "z1", "kind": "zone", "label": "Hall A",
//!       "position": [50.0, 50.0], "size": [1200.0, 800.0] },
//!     { "id": "r1", "parent": "z1", "kind": "rack", "label": "R1", "totalU": 42,
//!       "position": [50.0, 60.0], "size": [400.0, 1350.0] }
//!   ],
//!   "connections": [
//!     { "id": "e1", "source": "d1", "target": "d2", "medium": "10GbE" }
//!   ]
//! }
//! ```
//!
//! Two older shapes are accepted on import: a bare array of elements (no
//! connections), and an object using `nodes`/`edges` for the two lists.

use node::{Connection, Element};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: &str = "1";

/// Error type for interchange operations.
#[derive(Debug, thiserror::Error)]
pub enum InterchangeError {
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid structure: {0}")]
    InvalidStructure(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A canvas document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub version: String,
    pub elements: Vec<Element>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

impl Document {
    pub fn new(elements: Vec<Element>, connections: Vec<Connection>) -> Self {
        Self {
            version: FORMAT_VERSION.to_string(),
            elements,
            connections,
        }
    }

    /// Serialize the document to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, InterchangeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a document from JSON, accepting every supported shape.
    pub fn from_json(input: &str) -> Result<Self, InterchangeError> {
        let value: Value = serde_json::from_str(input)?;
        match value {
            Value::Array(items) => {
                let elements = parse_list(items, "element")?;
                Ok(Self::new(elements, Vec::new()))
            }
            Value::Object(mut object) => {
                let elements = take_list(&mut object, &["elements", "nodes"])?.ok_or_else(|| {
                    InterchangeError::InvalidStructure(
                        "expected an `elements` (or `nodes`) list".to_string(),
                    )
                })?;
                let connections =
                    take_list(&mut object, &["connections", "edges"])?.unwrap_or_default();
                let version = match object.remove("version") {
                    Some(Value::String(version)) => version,
                    Some(Value::Number(number)) => number.to_string(),
                    _ => FORMAT_VERSION.to_string(),
                };
                Ok(Self {
                    version,
                    elements: parse_list(elements, "element")?,
                    connections: parse_list(connections, "connection")?,
                })
            }
            other => Err(InterchangeError::InvalidStructure(format!(
                "expected an array or an object, found {}",
                json_type(&other)
            ))),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, InterchangeError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| InterchangeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let document = Self::from_json(&text)?;
        log::debug!(
            "Loaded {} elements and {} connections from {}",
            document.elements.len(),
            document.connections.len(),
            path.display()
        );
        Ok(document)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), InterchangeError> {
        let path = path.as_ref();
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|source| InterchangeError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn take_list(
    object: &mut serde_json::Map<String, Value>,
    keys: &[&str],
) -> Result<Option<Vec<Value>>, InterchangeError> {
    for key in keys {
        match object.remove(*key) {
            Some(Value::Array(items)) => return Ok(Some(items)),
            Some(Value::Null) | None => continue,
            Some(other) => {
                return Err(InterchangeError::InvalidStructure(format!(
                    "`{key}` must be an array, found {}",
                    json_type(&other)
                )))
            }
        }
    }
    Ok(None)
}

fn parse_list<T: serde::de::DeserializeOwned>(
    items: Vec<Value>,
    what: &str,
) -> Result<Vec<T>, InterchangeError> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(item)
                .map_err(|err| InterchangeError::InvalidValue(format!("{what} #{index}: {err}")))
        })
        .collect()
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcim_core::RackMetrics;
    use node::{ConnectionId, ElementId, ElementKind, LocalPoint};

    fn sample() -> Document {
        let metrics = RackMetrics::default();
        let elements = vec![
            Element::rack("r1", "R1", 42, LocalPoint::new(0.0, 0.0), &metrics),
            Element::device(
                "d1",
                ElementKind::Server,
                "D1",
                2,
                LocalPoint::new(20.0, 1250.0),
                &metrics,
            )
            .with_parent("r1"),
            Element::device(
                "d2",
                ElementKind::Network,
                "SW",
                1,
                LocalPoint::new(600.0, 0.0),
                &metrics,
            ),
        ];
        let connections = vec![Connection::new(
            ConnectionId::from("e1"),
            ElementId::from("d1"),
            ElementId::from("d2"),
        )
        .with_medium("10GbE")];
        Document::new(elements, connections)
    }

    #[test]
    fn test_roundtrip() {
        let document = sample();
        let json = document.to_json().unwrap();
        let parsed = Document::from_json(&json).expect("Failed to parse");
        assert_eq!(parsed, document);
    }

    #[test]
    fn test_legacy_array() {
        let json = serde_json::to_string(&sample().elements).unwrap();
        let parsed = Document::from_json(&json).unwrap();
        assert_eq!(parsed.elements.len(), 3);
        assert!(parsed.connections.is_empty());
    }

    #[test]
    fn test_nodes_and_edges_aliases() {
        let document = sample();
        let json = serde_json::json!({
            "nodes": document.elements,
            "edges": document.connections,
        })
        .to_string();
        let parsed = Document::from_json(&json).unwrap();
        assert_eq!(parsed.elements, document.elements);
        assert_eq!(parsed.connections, document.connections);
        assert_eq!(parsed.version, FORMAT_VERSION);
    }

    #[test]
    fn test_rejects_other_shapes() {
        assert!(matches!(
            Document::from_json("42"),
            Err(InterchangeError::InvalidStructure(_))
        ));
        assert!(matches!(
            Document::from_json(r#"{ "connections": [] }"#),
            Err(InterchangeError::InvalidStructure(_))
        ));
        assert!(matches!(
            Document::from_json(r#"{ "elements": {} }"#),
            Err(InterchangeError::InvalidStructure(_))
        ));
        assert!(matches!(
            Document::from_json(r#"[{ "id": "x", "kind": "teapot" }]"#),
            Err(InterchangeError::InvalidValue(_))
        ));
        assert!(matches!(
            Document::from_json("{ not json"),
            Err(InterchangeError::Parse(_))
        ));
    }
}
