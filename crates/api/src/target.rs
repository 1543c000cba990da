//! Target specification for commands.
//!
//! Duplicate and delete operate on a set of elements: the current selection,
//! explicit ids, everything, or the result of a query.

use node::{ElementId, ElementKind};
use serde::{Deserialize, Serialize};

/// Specifies which elements a command targets.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// The current selection (most common for user actions).
    #[default]
    Selection,

    /// Specific element by ID.
    Element(ElementId),

    /// Multiple specific elements by ID.
    Elements(Vec<ElementId>),

    /// Every element on the canvas.
    All,

    /// Elements matching a query.
    Query(ElementQuery),
}

impl From<ElementId> for Target {
    fn from(id: ElementId) -> Self {
        Self::Element(id)
    }
}

impl From<Vec<ElementId>> for Target {
    fn from(ids: Vec<ElementId>) -> Self {
        Self::Elements(ids)
    }
}

/// Query to find elements by properties.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementQuery {
    /// Elements of a specific kind.
    ByKind(ElementKind),

    /// Direct children of the target elements.
    ChildrenOf(Box<Target>),

    /// Elements whose absolute bounds intersect the box.
    InBounds {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_target_is_selection() {
        assert_eq!(Target::default(), Target::Selection);
        assert_eq!(serde_json::to_value(Target::Selection).unwrap(), "selection");
    }

    #[test]
    fn nested_query_reads_from_json() {
        let json = r#"{ "query": { "children_of": { "element": "r1" } } }"#;
        let target: Target = serde_json::from_str(json).unwrap();
        assert_eq!(
            target,
            Target::Query(ElementQuery::ChildrenOf(Box::new(Target::Element(
                ElementId::from("r1")
            ))))
        );

        let json = r#"{ "query": { "by_kind": "virtual_machine" } }"#;
        let target: Target = serde_json::from_str(json).unwrap();
        assert_eq!(
            target,
            Target::Query(ElementQuery::ByKind(ElementKind::VirtualMachine))
        );
    }
}
