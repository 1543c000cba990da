//! Queries: read-only access to canvas state.
//!
//! Lets scripts and tests inspect the canvas before and after issuing
//! commands.

use crate::Target;
use dcim_core::SlotRange;
use generator::{AnalysisScope, AnalysisSnapshot};
use glam::Vec2;
use interchange::Document;
use node::{ElementData, ElementId, ElementKind};
use serde::{Deserialize, Serialize};

/// A query for canvas state (read-only).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Query {
    /// Elements matching a target, or every element when omitted.
    GetElements {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<Target>,
    },

    GetElement { id: ElementId },

    /// Direct children of an element.
    GetChildren { id: ElementId },

    GetAbsolutePosition { id: ElementId },

    /// Committed slot ranges of a rack's devices, bottom-up.
    GetOccupancy { rack: ElementId },

    GetSelection,

    GetCount,

    /// Bounding box of all content, in canvas space.
    GetBounds,

    /// Broken invariants, empty on a consistent canvas.
    Validate,

    Analysis {
        #[serde(default)]
        scope: AnalysisScope,
    },

    ExportDocument,
}

/// Response to a query.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryResult {
    Elements { elements: Vec<ElementInfo> },

    Element { element: Option<ElementInfo> },

    Position { position: Option<Vec2> },

    Occupancy {
        rack: ElementId,
        slots: Vec<SlotInfo>,
    },

    Selection { ids: Vec<ElementId> },

    Count { count: usize },

    Bounds {
        min: Option<Vec2>,
        max: Option<Vec2>,
    },

    Violations { violations: Vec<String> },

    Analysis { snapshot: AnalysisSnapshot },

    Document { document: Document },

    Error { message: String },
}

impl QueryResult {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

/// Serializable element information.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElementInfo {
    pub id: ElementId,
    pub kind: ElementKind,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ElementId>,
    /// Parent-relative position, as stored.
    pub position: Vec2,
    /// Canvas-space position.
    pub absolute: Vec2,
    pub size: Vec2,
    pub z_index: i32,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub hidden: bool,
    /// Slots held in the parent rack, for mounted devices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slots: Option<SlotRange>,
    pub data: ElementData,
}

/// One device's share of a rack.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlotInfo {
    pub id: ElementId,
    pub start: u32,
    pub end: u32,
    pub height: u32,
    pub label: String,
}

impl SlotInfo {
    pub fn new(id: ElementId, slots: SlotRange) -> Self {
        Self {
            id,
            start: slots.start,
            end: slots.end(),
            height: slots.height,
            label: slots.label(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_tags_are_snake_case() {
        let json = serde_json::to_value(Query::GetAbsolutePosition {
            id: ElementId::from("d1"),
        })
        .unwrap();
        assert_eq!(json["type"], "get_absolute_position");
        assert_eq!(json["id"], "d1");
    }

    #[test]
    fn get_elements_target_is_optional() {
        let query: Query = serde_json::from_str(r#"{ "type": "get_elements" }"#).unwrap();
        assert!(matches!(query, Query::GetElements { target: None }));

        let query: Query =
            serde_json::from_str(r#"{ "type": "analysis", "scope": "selection" }"#).unwrap();
        assert!(matches!(
            query,
            Query::Analysis {
                scope: AnalysisScope::Selection
            }
        ));
    }

    #[test]
    fn slot_info_reports_inclusive_end() {
        let info = SlotInfo::new(ElementId::from("d1"), SlotRange::new(5, 2));
        assert_eq!((info.start, info.end, info.height), (5, 6, 2));
        assert_eq!(info.label, "U5–U6");
    }
}
