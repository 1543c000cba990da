use dcim_core::SlotRange;
use node::{ConnectionId, ElementId, ElementKind};

/// A rejected structural change. The graph is left as it was.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    #[error("Element {0} already exists")]
    DuplicateId(ElementId),

    #[error("Element {0} not found")]
    UnknownElement(ElementId),

    #[error("Element {id} references missing parent {parent}")]
    UnknownParent { id: ElementId, parent: ElementId },

    #[error("A {kind} cannot be placed inside a {parent_kind} ({id} -> {parent})")]
    InvalidParent {
        id: ElementId,
        kind: ElementKind,
        parent: ElementId,
        parent_kind: ElementKind,
    },

    #[error("Parent chain of {0} is cyclic")]
    Cycle(ElementId),
}

/// A broken structural invariant.
///
/// The controller never produces these; finding one means a logic error
/// upstream or a hand-edited document.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("{id} references missing parent {parent}")]
    MissingParent { id: ElementId, parent: ElementId },

    #[error("{id} ({kind}) is parented to {parent} ({parent_kind})")]
    InvalidParent {
        id: ElementId,
        kind: ElementKind,
        parent: ElementId,
        parent_kind: ElementKind,
    },

    #[error("Parent chain of {id} is cyclic or deeper than {limit}")]
    ParentChain { id: ElementId, limit: usize },

    #[error("{first} ({first_slots}) and {second} ({second_slots}) overlap in rack {rack}")]
    SlotOverlap {
        rack: ElementId,
        first: ElementId,
        first_slots: SlotRange,
        second: ElementId,
        second_slots: SlotRange,
    },

    #[error("{id} is {u_height}U but rack {rack} only holds {total_u}U")]
    ExceedsRack {
        id: ElementId,
        rack: ElementId,
        u_height: u32,
        total_u: u32,
    },

    #[error("Size of {id} does not match its attributes")]
    SizeMismatch { id: ElementId },

    #[error("Connection {connection} references missing element {endpoint}")]
    DanglingConnection {
        connection: ConnectionId,
        endpoint: ElementId,
    },
}
