//! Editor state for the rack layout canvas.
//!
//! Owns the element graph and connections and implements every mutation the
//! editor performs: palette drops, the drag lifecycle, duplication, deletion,
//! field edits, selection and the context menu. Rendering is expected to be a
//! pure function of this state; changes are announced through a queue of
//! [`CanvasEvent`]s the host drains.

mod canvas;
pub mod containment;
mod drag;
mod error;

pub use canvas::{Batch, Canvas, CanvasEvent, ConnectionPatch, ContextMenu, MenuAction};
pub use containment::{DropPreview, DropTarget};
pub use drag::{DragState, DropOutcome, RevertReason};
pub use error::CanvasError;
// Re-export coordinate types from node for convenience
pub use node::{CanvasPoint, CanvasSize, LocalPoint, ScreenPoint};
