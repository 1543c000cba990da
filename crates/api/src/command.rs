//! Commands: every operation that modifies canvas state.
//!
//! Commands describe what the user did (dropped a palette item, released a
//! drag, picked a menu entry), not how the canvas reacts. Positions are
//! canvas-space `[x, y]` pairs; drag positions are the element's absolute
//! top-left corner.

use crate::Target;
use canvas::{ConnectionPatch, MenuAction, RevertReason};
use generator::{LayoutDescription, LayoutMode};
use glam::Vec2;
use node::{ConnectionId, ElementData, ElementId, ElementKind, PaletteItem};
use serde::{Deserialize, Serialize};

/// A command that modifies canvas state.
///
/// Commands are serializable for:
/// - Recording and replaying editor sessions
/// - Scripting through `dcim-cli exec`
/// - Tests that drive the editor end to end
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    // === Palette ===
    /// Create an element from a palette entry, centered on `position`.
    Place { item: PaletteItem, position: Vec2 },

    // === Drag ===
    DragStart { id: ElementId },

    /// Update the drop preview. Commits nothing.
    DragMove { id: ElementId, position: Vec2 },

    /// Release the drag with the element's top-left at `position`.
    DragEnd { id: ElementId, position: Vec2 },

    // === Selection and menu ===
    Click {
        id: ElementId,
        /// Add to the selection instead of replacing it.
        #[serde(default)]
        additive: bool,
    },

    ClearSelection,

    /// Open the context menu of an element at a screen position.
    ContextMenu { id: ElementId, position: Vec2 },

    /// Run an entry of the open context menu.
    MenuAction { action: MenuAction },

    // === Elements ===
    Duplicate {
        #[serde(default)]
        target: Target,
    },

    /// Delete target elements and everything inside them.
    Delete {
        #[serde(default)]
        target: Target,
    },

    /// Replace an element's attributes. The variant must match its kind.
    UpdateData { id: ElementId, data: ElementData },

    ResizeZone { id: ElementId, size: Vec2 },

    // === Connections ===
    Connect {
        source: ElementId,
        target: ElementId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        medium: Option<String>,
    },

    UpdateConnection {
        id: ConnectionId,
        #[serde(flatten)]
        patch: ConnectionPatch,
    },

    RemoveConnection { id: ConnectionId },

    // === View ===
    /// Highlight every element of a kind, or clear the highlight.
    HighlightKind {
        #[serde(default)]
        kind: Option<ElementKind>,
    },

    /// Show or hide a layer of the canvas. Without a kind every element is
    /// affected.
    SetVisibility {
        #[serde(default)]
        kind: Option<ElementKind>,
        visible: bool,
    },

    // === Documents and layouts ===
    /// Place a generated layout description as one batch.
    ApplyLayout {
        #[serde(default)]
        mode: LayoutMode,
        layout: LayoutDescription,
    },

    /// Replace the canvas with a document (any supported shape).
    ImportDocument { document: serde_json::Value },

    /// Run commands in order, stopping at the first one that does not
    /// succeed. Earlier commands stay applied.
    Batch { commands: Vec<Command> },
}

/// Result of executing a command.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CommandResult {
    /// Command succeeded.
    Success {
        /// IDs of elements created, if any.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        created: Vec<ElementId>,
        /// IDs of elements modified, if any.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        modified: Vec<ElementId>,
        /// IDs of elements deleted, if any.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        deleted: Vec<ElementId>,
    },
    /// A drop was rejected and the element sprang back.
    Reverted { id: ElementId, reason: RevertReason },
    /// Command failed.
    Error { message: String },
}

impl CommandResult {
    pub fn success() -> Self {
        Self::Success {
            created: vec![],
            modified: vec![],
            deleted: vec![],
        }
    }

    pub fn created(ids: Vec<ElementId>) -> Self {
        Self::Success {
            created: ids,
            modified: vec![],
            deleted: vec![],
        }
    }

    pub fn modified(ids: Vec<ElementId>) -> Self {
        Self::Success {
            created: vec![],
            modified: ids,
            deleted: vec![],
        }
    }

    pub fn deleted(ids: Vec<ElementId>) -> Self {
        Self::Success {
            created: vec![],
            modified: vec![],
            deleted: ids,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}
