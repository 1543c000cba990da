//! Element data model for the rack layout editor.
//!
//! Elements live in a flat collection. Hierarchy is expressed only through an
//! element's optional parent id, and positions are stored in the parent's
//! coordinate space. Kind-specific fields are a tagged union keyed by the
//! element kind, so the few places that need them match exhaustively.

pub mod coords;
mod connection;
mod data;
mod element;
mod element_id;
mod palette_item;

pub use connection::{Color, ColorParseError, Connection, ConnectionId, DEFAULT_PORT};
pub use coords::{CanvasPoint, CanvasSize, LocalPoint, ScreenPoint};
pub use data::{
    DeviceData, DeviceStatus, ElementData, RackData, SoftwareData, ZoneData,
};
pub use element::{Annotations, Element, ElementKind, ZLayer};
pub use element_id::ElementId;
pub use palette_item::PaletteItem;
