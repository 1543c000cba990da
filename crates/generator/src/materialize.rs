//! Batch layout materializer.
//!
//! Turns a [`LayoutDescription`] into positioned elements: one container zone
//! placed right of the existing content, racks or flow nodes laid out in a row
//! inside it, and devices snapped to their declared rack units. Everything is
//! produced up front and handed to [`canvas::Canvas::apply_batch`] as one unit,
//! so a description that cannot be placed leaves the canvas unchanged.

use crate::layout::{DeviceLayout, LayoutDescription, LayoutMode, RackLayout};
use canvas::Batch;
use dcim_core::{EngineConfig, SlotGrid, SlotRange};
use glam::Vec2;
use node::{
    CanvasSize, Color, Connection, ConnectionId, DeviceData, DeviceStatus, Element, ElementData,
    ElementId, ElementKind, LocalPoint, RackData, SoftwareData, ZoneData,
};
use scene_graph::SceneGraph;
use std::collections::HashMap;

const ZONE_LABEL: &str = "Generated zone";
const ZONE_DESCRIPTION: &str = "Auto-generated container";
const RACK_VIEW_DESCRIPTION: &str = "Generated (rack view)";
const FLOW_VIEW_DESCRIPTION: &str = "Generated (business view)";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MaterializeError {
    #[error("The {0} layout has nothing to place")]
    Empty(LayoutMode),

    #[error("Rack {rack:?} has no capacity")]
    EmptyRack { rack: String },

    #[error("{device:?} in rack {rack:?} is a {kind}, not a rack-mountable device")]
    NotADevice {
        rack: String,
        device: String,
        kind: ElementKind,
    },

    #[error("{device:?} is {u_height}U but rack {rack:?} holds {total_u}U")]
    DeviceTooTall {
        rack: String,
        device: String,
        u_height: u32,
        total_u: u32,
    },

    #[error("{device:?} ({slots}) overlaps {other:?} ({other_slots}) in rack {rack:?}")]
    SlotOverlap {
        rack: String,
        device: String,
        slots: SlotRange,
        other: String,
        other_slots: SlotRange,
    },
}

/// Build the elements and connections for `description`.
///
/// `graph` is the current canvas, used only to place the container zone
/// clear of existing content. `batch` namespaces every generated id.
pub fn materialize(
    description: &LayoutDescription,
    mode: LayoutMode,
    graph: &SceneGraph,
    config: &EngineConfig,
    batch: u64,
) -> Result<Batch, MaterializeError> {
    let zone_id = ElementId::namespaced("gen_zone", batch, &[]);
    let (children, connections) = match mode {
        LayoutMode::Rack => (rack_children(description, &zone_id, config, batch)?, Vec::new()),
        LayoutMode::Business => flow_children(description, &zone_id, config, batch)?,
    };

    let zone = container_zone(description, zone_id, &children, graph, config);
    log::debug!(
        "Materialized {} layout: zone {} with {} elements and {} connections",
        mode,
        zone.id,
        children.len(),
        connections.len()
    );

    let mut elements = Vec::with_capacity(children.len() + 1);
    elements.push(zone);
    elements.extend(children);
    Ok(Batch {
        elements,
        connections,
    })
}

/// The container zone, at least the declared size and large enough to bound
/// its direct children.
fn container_zone(
    description: &LayoutDescription,
    id: ElementId,
    children: &[Element],
    graph: &SceneGraph,
    config: &EngineConfig,
) -> Element {
    let layout = &config.batch;
    let origin = match graph.content_bounds() {
        Some(bounds) => Vec2::new(bounds.max.x + layout.content_gap, layout.origin.y),
        None => layout.origin,
    };

    let declared = description.container_zone.clone().unwrap_or_default();
    let mut size = Vec2::new(
        declared.width.unwrap_or(layout.default_container.x),
        declared.height.unwrap_or(layout.default_container.y),
    );
    for child in children.iter().filter(|child| child.parent.as_ref() == Some(&id)) {
        let far = child.position.0 + child.size.0;
        size = size.max(far + Vec2::new(layout.zone_padding_x, layout.zone_padding_bottom));
    }

    let data = ElementData::Zone(ZoneData {
        label: declared.label.unwrap_or_else(|| ZONE_LABEL.to_string()),
        description: Some(ZONE_DESCRIPTION.to_string()),
        color: None,
    });
    Element::new(id, data, LocalPoint(origin), CanvasSize(size))
}

fn rack_children(
    description: &LayoutDescription,
    zone_id: &ElementId,
    config: &EngineConfig,
    batch: u64,
) -> Result<Vec<Element>, MaterializeError> {
    if description.racks.is_empty() {
        return Err(MaterializeError::Empty(LayoutMode::Rack));
    }
    let metrics = config.rack;
    let layout = &config.batch;

    let mut elements = Vec::new();
    for (r, rack) in description.racks.iter().enumerate() {
        if rack.total_u == 0 {
            return Err(MaterializeError::EmptyRack {
                rack: rack.label.clone(),
            });
        }
        let rack_id = ElementId::namespaced("gen_rack", batch, &[r]);
        let x = layout.zone_padding_x + r as f32 * (metrics.rack_width + layout.rack_gap);
        let mut rack_element = Element::new(
            rack_id.clone(),
            ElementData::Rack(RackData::new(rack.label.clone(), rack.total_u)),
            LocalPoint::new(x, layout.zone_padding_y),
            CanvasSize(metrics.rack_size(rack.total_u)),
        );
        rack_element.parent = Some(zone_id.clone());
        elements.push(rack_element);

        let grid = SlotGrid::new(metrics, rack.total_u);
        let mut placed: Vec<(&DeviceLayout, SlotRange)> = Vec::new();
        for (d, device) in rack.devices.iter().enumerate() {
            let kind = rack_device_kind(rack, device)?;
            let u_height = device.u_height.max(1);
            if !grid.fits(u_height) {
                return Err(MaterializeError::DeviceTooTall {
                    rack: rack.label.clone(),
                    device: device.label.clone(),
                    u_height,
                    total_u: rack.total_u,
                });
            }
            let slot = grid.slot_from_position_u(device.position_u, u_height);
            let slots = SlotRange::new(slot, u_height);
            if let Some((other, other_slots)) = placed.iter().find(|(_, other)| other.overlaps(&slots)) {
                return Err(MaterializeError::SlotOverlap {
                    rack: rack.label.clone(),
                    device: device.label.clone(),
                    slots,
                    other: other.label.clone(),
                    other_slots: *other_slots,
                });
            }
            placed.push((device, slots));

            let status = parse_status(device.status.as_deref());
            let data = DeviceData {
                description: Some(RACK_VIEW_DESCRIPTION.to_string()),
                ..DeviceData::new(device.label.clone(), u_height).with_status(status)
            };
            let mut element = Element::new(
                ElementId::namespaced("gen_dev", batch, &[r, d]),
                ElementData::device(kind, data),
                LocalPoint::new(metrics.rail_padding, grid.offset_for_slot(slot, u_height)),
                CanvasSize(metrics.device_size(u_height)),
            );
            element.parent = Some(rack_id.clone());
            elements.push(element);
        }
    }
    Ok(elements)
}

fn flow_children(
    description: &LayoutDescription,
    zone_id: &ElementId,
    config: &EngineConfig,
    batch: u64,
) -> Result<(Vec<Element>, Vec<Connection>), MaterializeError> {
    if description.nodes.is_empty() {
        return Err(MaterializeError::Empty(LayoutMode::Business));
    }
    let metrics = config.rack;
    let layout = &config.batch;
    let y = layout.zone_padding_y + layout.flow_row_offset;

    let mut elements = Vec::with_capacity(description.nodes.len());
    let mut ids: HashMap<&str, ElementId> = HashMap::new();
    for (i, flow_node) in description.nodes.iter().enumerate() {
        let id = ElementId::namespaced("gen_biz", batch, &[i]);
        if ids.insert(flow_node.id.as_str(), id.clone()).is_some() {
            log::warn!("Duplicate flow node id {:?}; edges use the last", flow_node.id);
        }

        let x = layout.zone_padding_x + i as f32 * (metrics.device_width() + layout.flow_gap);
        let kind = flow_node_kind(flow_node.kind.as_deref());
        let (data, size) = if kind == ElementKind::Software {
            let data = ElementData::Software(SoftwareData {
                label: flow_node.label.clone(),
                description: Some(FLOW_VIEW_DESCRIPTION.to_string()),
                ..Default::default()
            });
            (data, CanvasSize(config.software.size()))
        } else {
            let u_height = flow_node.u_height.unwrap_or(1).max(1);
            let data = DeviceData {
                description: Some(FLOW_VIEW_DESCRIPTION.to_string()),
                ..DeviceData::new(flow_node.label.clone(), u_height)
            };
            (
                ElementData::device(kind, data),
                CanvasSize(metrics.device_size(u_height)),
            )
        };
        let mut element = Element::new(id, data, LocalPoint::new(x, y), size);
        element.parent = Some(zone_id.clone());
        elements.push(element);
    }

    let mut connections = Vec::new();
    for (i, edge) in description.edges.iter().enumerate() {
        let (Some(source), Some(target)) = (ids.get(edge.source.as_str()), ids.get(edge.target.as_str()))
        else {
            log::warn!(
                "Skipping edge {} -> {}: unknown endpoint",
                edge.source,
                edge.target
            );
            continue;
        };
        let id = ConnectionId::new(ElementId::namespaced("gen_edge", batch, &[i]).as_str());
        let mut connection =
            Connection::new(id, source.clone(), target.clone()).with_color(Color::accent());
        if let Some(label) = edge.label.as_deref().filter(|label| !label.is_empty()) {
            connection = connection.with_medium(label);
        }
        connections.push(connection);
    }
    Ok((elements, connections))
}

/// Kind of a device declared inside a rack. Unknown strings become servers;
/// known kinds that cannot be mounted are rejected.
fn rack_device_kind(rack: &RackLayout, device: &DeviceLayout) -> Result<ElementKind, MaterializeError> {
    let Some(name) = device.kind.as_deref() else {
        return Ok(ElementKind::Server);
    };
    match name.trim().to_lowercase().parse::<ElementKind>() {
        Ok(kind) if kind.is_rack_mountable() => Ok(kind),
        Ok(kind) => Err(MaterializeError::NotADevice {
            rack: rack.label.clone(),
            device: device.label.clone(),
            kind,
        }),
        Err(_) => {
            log::warn!("Unknown device type {:?}, using server", name);
            Ok(ElementKind::Server)
        }
    }
}

/// Kind of a flow node. Anything that is not a device or a service becomes a
/// server.
fn flow_node_kind(name: Option<&str>) -> ElementKind {
    match name.map(|name| name.trim().to_lowercase().parse::<ElementKind>()) {
        Some(Ok(kind)) if kind.is_rack_mountable() || kind == ElementKind::Software => kind,
        Some(_) => {
            log::warn!("Unsupported flow node type {:?}, using server", name);
            ElementKind::Server
        }
        None => ElementKind::Server,
    }
}

fn parse_status(status: Option<&str>) -> DeviceStatus {
    status
        .and_then(|status| status.trim().to_lowercase().parse().ok())
        .unwrap_or_default()
}
