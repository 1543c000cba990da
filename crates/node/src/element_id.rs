use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for an element.
///
/// Ids are plain strings so that documents written by other tools load
/// unchanged. Elements created interactively get `dnd_{uuid}`; batch layouts
/// build their ids with [`ElementId::namespaced`].
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh id for an element created by a gesture.
    pub fn generate() -> Self {
        Self(format!("dnd_{}", uuid::Uuid::new_v4().simple()))
    }

    /// `{prefix}_{batch}` followed by `_{index}` for every index given.
    pub fn namespaced(prefix: &str, batch: u64, indices: &[usize]) -> Self {
        let mut id = format!("{prefix}_{batch}");
        for index in indices {
            id.push('_');
            id.push_str(&index.to_string());
        }
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ElementId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ElementId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Debug for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElementId({})", self.0)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
