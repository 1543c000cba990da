use node::{ConnectionId, ElementId, ElementKind};
use scene_graph::{GraphError, InvariantViolation};

#[derive(Debug, thiserror::Error)]
pub enum CanvasError {
    #[error("Element {0} not found")]
    UnknownElement(ElementId),

    #[error("Connection {0} not found")]
    UnknownConnection(ConnectionId),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("Already dragging {0}")]
    DragInProgress(ElementId),

    #[error("{0} is not being dragged")]
    NotDragging(ElementId),

    #[error("Cannot edit {id}: {reason}")]
    EditConflict { id: ElementId, reason: String },

    #[error("{id} is a {found}, not a {expected}")]
    KindMismatch {
        id: ElementId,
        expected: ElementKind,
        found: ElementKind,
    },

    #[error("No context menu is open")]
    NoContextMenu,

    #[error("Rejected: {} invariant violation(s), first: {}", .0.len(), first_violation(.0))]
    Invariants(Vec<InvariantViolation>),
}

fn first_violation(violations: &[InvariantViolation]) -> String {
    violations
        .first()
        .map(|violation| violation.to_string())
        .unwrap_or_default()
}
