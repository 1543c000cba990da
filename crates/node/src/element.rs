use crate::coords::{CanvasPoint, CanvasSize, LocalPoint};
use crate::data::{DeviceData, ElementData, RackData, ZoneData};
use crate::ElementId;
use dcim_core::{Bounds, EngineConfig, RackMetrics, SlotRange};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// The kind of an element.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ElementKind {
    Zone,
    Rack,
    Placeholder,
    Server,
    Network,
    Storage,
    Firewall,
    VirtualMachine,
    Software,
}

impl ElementKind {
    pub fn is_zone(&self) -> bool {
        matches!(self, ElementKind::Zone)
    }

    /// Racks and placeholder racks.
    pub fn is_rack_like(&self) -> bool {
        matches!(self, ElementKind::Rack | ElementKind::Placeholder)
    }

    /// Whether elements of this kind can own children.
    pub fn is_container(&self) -> bool {
        self.is_zone() || self.is_rack_like()
    }

    /// Leaf elements: everything that is not a zone or a rack.
    pub fn is_leaf(&self) -> bool {
        !self.is_container()
    }

    /// Equipment that occupies rack units.
    pub fn is_rack_mountable(&self) -> bool {
        matches!(
            self,
            ElementKind::Server
                | ElementKind::Network
                | ElementKind::Storage
                | ElementKind::Firewall
                | ElementKind::VirtualMachine
        )
    }

    /// Whether an element of this kind may be parented to `parent`.
    pub fn can_parent_to(&self, parent: ElementKind) -> bool {
        match self {
            ElementKind::Zone => false,
            ElementKind::Rack | ElementKind::Placeholder => parent.is_zone(),
            kind if kind.is_rack_mountable() => parent.is_zone() || parent == ElementKind::Rack,
            _ => parent.is_zone(),
        }
    }

    /// Kinds shown and hidden together by the layer controls. Racks and
    /// placeholders share one layer.
    pub fn visibility_group(&self) -> &[ElementKind] {
        match self {
            ElementKind::Rack | ElementKind::Placeholder => {
                &[ElementKind::Rack, ElementKind::Placeholder]
            }
            kind => std::slice::from_ref(kind),
        }
    }

    pub fn default_layer(&self) -> ZLayer {
        match self {
            ElementKind::Zone => ZLayer::Zone,
            ElementKind::Rack | ElementKind::Placeholder => ZLayer::Rack,
            _ => ZLayer::Device,
        }
    }
}

/// Rendering layer. Devices draw above connections, racks and zones.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZLayer {
    Zone,
    Rack,
    Connection,
    Device,
}

impl ZLayer {
    pub fn z_index(&self) -> i32 {
        match self {
            ZLayer::Zone => -10,
            ZLayer::Rack => 0,
            ZLayer::Connection => 900,
            ZLayer::Device => 1000,
        }
    }
}

/// Transient highlight state set while dragging. Never persisted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Annotations {
    /// The element is the live drop candidate.
    pub is_drop_target: bool,
    /// Slots the dragged device would occupy, shown as a band on the rack.
    pub preview_slots: Option<SlotRange>,
    /// The element matches the kind highlighted in the palette.
    pub is_matched_type: bool,
}

impl Annotations {
    /// Clear everything set by a drag gesture.
    ///
    /// Returns true if anything changed.
    pub fn clear_drag(&mut self) -> bool {
        let changed = self.is_drop_target || self.preview_slots.is_some();
        self.is_drop_target = false;
        self.preview_slots = None;
        changed
    }
}

/// An element on the canvas.
///
/// `position` is relative to the parent, or to the canvas origin when there
/// is no parent. Absolute positions are resolved by walking the parent chain
/// and are never stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredElement")]
pub struct Element {
    pub id: ElementId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ElementId>,
    pub position: LocalPoint,
    pub size: CanvasSize,
    pub layer: ZLayer,
    #[serde(flatten)]
    pub data: ElementData,
    /// Switched off in the layer controls. Hidden elements keep their
    /// place in the hierarchy and still occupy rack units.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub hidden: bool,
    #[serde(skip)]
    pub annotations: Annotations,
}

/// On-disk form of an element. The layer may be omitted and then follows
/// from the kind.
#[derive(Deserialize)]
struct StoredElement {
    id: ElementId,
    #[serde(default)]
    parent: Option<ElementId>,
    position: LocalPoint,
    size: CanvasSize,
    #[serde(default)]
    layer: Option<ZLayer>,
    #[serde(flatten)]
    data: ElementData,
    #[serde(default)]
    hidden: bool,
}

impl From<StoredElement> for Element {
    fn from(stored: StoredElement) -> Self {
        let layer = stored
            .layer
            .unwrap_or_else(|| stored.data.kind().default_layer());
        Element {
            id: stored.id,
            parent: stored.parent,
            position: stored.position,
            size: stored.size,
            layer,
            data: stored.data,
            hidden: stored.hidden,
            annotations: Annotations::default(),
        }
    }
}

impl Element {
    pub fn new(id: ElementId, data: ElementData, position: LocalPoint, size: CanvasSize) -> Self {
        Self {
            id,
            parent: None,
            position,
            size,
            layer: data.kind().default_layer(),
            data,
            hidden: false,
            annotations: Annotations::default(),
        }
    }

    /// Create an element sized from its attributes. Zones get the default
    /// zone size.
    pub fn from_data(
        id: ElementId,
        data: ElementData,
        position: LocalPoint,
        config: &EngineConfig,
    ) -> Self {
        let size = natural_size(&data, config).unwrap_or_else(|| CanvasSize(config.zone.size()));
        Self::new(id, data, position, size)
    }

    pub fn zone(id: impl Into<ElementId>, label: &str, position: LocalPoint, size: CanvasSize) -> Self {
        let data = ElementData::Zone(ZoneData {
            label: label.to_string(),
            ..Default::default()
        });
        Self::new(id.into(), data, position, size)
    }

    pub fn rack(
        id: impl Into<ElementId>,
        label: &str,
        total_u: u32,
        position: LocalPoint,
        metrics: &RackMetrics,
    ) -> Self {
        let size = CanvasSize(metrics.rack_size(total_u));
        Self::new(
            id.into(),
            ElementData::Rack(RackData::new(label, total_u)),
            position,
            size,
        )
    }

    pub fn device(
        id: impl Into<ElementId>,
        kind: ElementKind,
        label: &str,
        u_height: u32,
        position: LocalPoint,
        metrics: &RackMetrics,
    ) -> Self {
        let size = CanvasSize(metrics.device_size(u_height));
        let data = ElementData::device(kind, DeviceData::new(label, u_height));
        Self::new(id.into(), data, position, size)
    }

    pub fn with_parent(mut self, parent: impl Into<ElementId>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn kind(&self) -> ElementKind {
        self.data.kind()
    }

    pub fn label(&self) -> &str {
        self.data.label()
    }

    pub fn u_height(&self) -> Option<u32> {
        self.data.u_height()
    }

    pub fn total_u(&self) -> Option<u32> {
        self.data.total_u()
    }

    /// Bounds of the element if its origin were at `origin`.
    pub fn bounds_at(&self, origin: CanvasPoint) -> Bounds {
        Bounds::from_origin_size(origin.0, self.size.0)
    }

    /// Size implied by the element's attributes, or `None` for freely sized
    /// zones.
    pub fn natural_size(&self, config: &EngineConfig) -> Option<CanvasSize> {
        natural_size(&self.data, config)
    }

    /// Recompute the size from the attributes. Zones keep their size.
    pub fn refresh_size(&mut self, config: &EngineConfig) {
        if let Some(size) = natural_size(&self.data, config) {
            self.size = size;
        }
    }
}

fn natural_size(data: &ElementData, config: &EngineConfig) -> Option<CanvasSize> {
    match data {
        ElementData::Zone(_) => None,
        ElementData::Rack(rack) | ElementData::Placeholder(rack) => {
            Some(CanvasSize(config.rack.rack_size(rack.total_u)))
        }
        ElementData::Software(_) => Some(CanvasSize(config.software.size())),
        other => other
            .u_height()
            .map(|u_height| CanvasSize(config.rack.device_size(u_height))),
    }
}
