//! Containment classification.
//!
//! Decides which container a dragged element would land in. Physical nesting
//! wins over logical grouping: a rack-mountable device first looks for a rack,
//! and only then for a zone. Racks, placeholders and software only ever look
//! for zones. Zones are never placed inside anything.
//!
//! Ties go to the first match in iteration order.

use dcim_core::{Bounds, RackMetrics, SlotGrid, SlotRange};
use node::{CanvasPoint, Element, ElementId, ElementKind};
use scene_graph::SceneGraph;

/// Container chosen for a dragged element.
#[derive(Clone, Debug, PartialEq)]
pub enum DropTarget {
    Rack { id: ElementId, origin: CanvasPoint },
    Zone { id: ElementId, origin: CanvasPoint },
}

impl DropTarget {
    pub fn id(&self) -> &ElementId {
        match self {
            DropTarget::Rack { id, .. } | DropTarget::Zone { id, .. } => id,
        }
    }

    pub fn origin(&self) -> CanvasPoint {
        match self {
            DropTarget::Rack { origin, .. } | DropTarget::Zone { origin, .. } => *origin,
        }
    }
}

/// Live highlight for a drag in progress.
#[derive(Clone, Debug, PartialEq)]
pub struct DropPreview {
    pub target: ElementId,
    /// Slots the device would occupy, when the target is a rack it fits in.
    pub slots: Option<SlotRange>,
}

/// Pick the container for `dragged` occupying `bounds` (absolute).
pub fn classify(graph: &SceneGraph, dragged: &Element, bounds: Bounds) -> Option<DropTarget> {
    let (container, origin) = locate(graph, dragged, bounds)?;
    let id = container.id.clone();
    Some(if container.kind() == ElementKind::Rack {
        DropTarget::Rack { id, origin }
    } else {
        DropTarget::Zone { id, origin }
    })
}

/// Target and slot band to highlight while dragging.
pub fn preview(
    graph: &SceneGraph,
    dragged: &Element,
    bounds: Bounds,
    metrics: &RackMetrics,
) -> Option<DropPreview> {
    let (container, origin) = locate(graph, dragged, bounds)?;
    Some(DropPreview {
        target: container.id.clone(),
        slots: slot_band(container, origin, dragged, bounds, metrics),
    })
}

/// Recompute the highlight of a drag whose live preview is `current`.
///
/// Returns `None` while the target and slot band stay the same. Only a new
/// preview allocates.
pub fn refresh_preview(
    graph: &SceneGraph,
    dragged: &Element,
    bounds: Bounds,
    metrics: &RackMetrics,
    current: Option<&DropPreview>,
) -> Option<Option<DropPreview>> {
    let hit = locate(graph, dragged, bounds);
    let slots = hit.and_then(|(container, origin)| slot_band(container, origin, dragged, bounds, metrics));
    let unchanged = match (hit, current) {
        (None, None) => true,
        (Some((container, _)), Some(current)) => {
            container.id == current.target && slots == current.slots
        }
        _ => false,
    };
    if unchanged {
        return None;
    }
    Some(hit.map(|(container, _)| DropPreview {
        target: container.id.clone(),
        slots,
    }))
}

/// Container hit by `bounds`, borrowed from the graph, with its absolute
/// origin.
fn locate<'a>(
    graph: &'a SceneGraph,
    dragged: &Element,
    bounds: Bounds,
) -> Option<(&'a Element, CanvasPoint)> {
    let kind = dragged.kind();
    if kind.is_zone() {
        return None;
    }
    if kind.is_rack_mountable() {
        let rack = first_intersecting(graph, dragged, bounds, |k| k == ElementKind::Rack);
        if rack.is_some() {
            return rack;
        }
    }
    first_intersecting(graph, dragged, bounds, |k| k.is_zone())
}

/// Slots `dragged` would occupy in `container`, if it is a rack the device
/// fits in.
fn slot_band(
    container: &Element,
    origin: CanvasPoint,
    dragged: &Element,
    bounds: Bounds,
    metrics: &RackMetrics,
) -> Option<SlotRange> {
    if container.kind() != ElementKind::Rack {
        return None;
    }
    let grid = SlotGrid::new(*metrics, container.total_u()?);
    let u_height = dragged.u_height()?;
    grid.fits(u_height)
        .then(|| grid.range_at(origin.y(), bounds.min.y, u_height))
}

/// Committed slot ranges of the devices mounted in `rack`, bottom-up.
pub fn occupancy(
    graph: &SceneGraph,
    rack: &ElementId,
    metrics: &RackMetrics,
) -> Vec<(ElementId, SlotRange)> {
    let Some(total_u) = graph.get(rack).and_then(|rack| rack.total_u()) else {
        return Vec::new();
    };
    let grid = SlotGrid::new(*metrics, total_u);
    let mut ranges: Vec<_> = graph
        .children(rack)
        .into_iter()
        .filter_map(|child| {
            child
                .u_height()
                .map(|u| (child.id.clone(), grid.range_from_offset(child.position.y(), u)))
        })
        .collect();
    ranges.sort_by_key(|(_, range)| range.start);
    ranges
}

/// First device in `rack`, other than `ignore`, whose slots overlap `range`.
pub fn slot_collision(
    graph: &SceneGraph,
    rack: &ElementId,
    ignore: &ElementId,
    range: SlotRange,
    metrics: &RackMetrics,
) -> Option<(ElementId, SlotRange)> {
    occupancy(graph, rack, metrics)
        .into_iter()
        .find(|(id, occupied)| id != ignore && occupied.overlaps(&range))
}

/// First unparented leaf element, other than `dragged`, that `bounds` overlaps.
pub fn loose_overlap<'a>(
    graph: &'a SceneGraph,
    dragged: &Element,
    bounds: Bounds,
) -> Option<&'a Element> {
    graph.roots().find(|other| {
        other.id != dragged.id
            && other.kind().is_leaf()
            && other.bounds_at(CanvasPoint(other.position.0)).intersects(&bounds)
    })
}

fn first_intersecting<'a>(
    graph: &'a SceneGraph,
    dragged: &Element,
    bounds: Bounds,
    accepts: impl Fn(ElementKind) -> bool,
) -> Option<(&'a Element, CanvasPoint)> {
    graph
        .iter()
        .filter(|candidate| candidate.id != dragged.id && accepts(candidate.kind()))
        .find_map(|candidate| {
            let origin = graph.absolute_position_of(candidate);
            candidate
                .bounds_at(origin)
                .intersects(&bounds)
                .then_some((candidate, origin))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use node::{CanvasSize, LocalPoint};

    fn metrics() -> RackMetrics {
        RackMetrics::default()
    }

    fn graph() -> SceneGraph {
        let mut graph = SceneGraph::new();
        graph
            .insert(Element::zone(
                "z1",
                "Hall",
                LocalPoint::new(0.0, 0.0),
                CanvasSize::new(2000.0, 2000.0),
            ))
            .unwrap();
        graph
            .insert(
                Element::rack("r1", "R1", 42, LocalPoint::new(100.0, 100.0), &metrics())
                    .with_parent("z1"),
            )
            .unwrap();
        graph
            .insert(
                Element {
                    data: node::ElementData::Placeholder(node::RackData::new("P1", 42)),
                    ..Element::rack("p1", "P1", 42, LocalPoint::new(700.0, 100.0), &metrics())
                }
                .with_parent("z1"),
            )
            .unwrap();
        graph
    }

    fn server(id: &str, u_height: u32) -> Element {
        Element::device(
            id,
            ElementKind::Server,
            id,
            u_height,
            LocalPoint::new(3000.0, 3000.0),
            &metrics(),
        )
    }

    #[test]
    fn test_rack_wins_over_zone() {
        let graph = graph();
        let device = server("d1", 2);
        let bounds = device.bounds_at(CanvasPoint::new(120.0, 300.0));
        let target = classify(&graph, &device, bounds).unwrap();
        assert_eq!(target.id(), &ElementId::from("r1"));
        assert_eq!(target.origin(), CanvasPoint::new(100.0, 100.0));
    }

    #[test]
    fn test_placeholder_never_accepts_devices() {
        let graph = graph();
        let device = server("d1", 2);
        let bounds = device.bounds_at(CanvasPoint::new(720.0, 300.0));
        let target = classify(&graph, &device, bounds).unwrap();
        assert!(matches!(target, DropTarget::Zone { .. }));
    }

    #[test]
    fn test_racks_only_land_in_zones() {
        let graph = graph();
        let rack = Element::rack("r2", "R2", 42, LocalPoint::default(), &metrics());
        let bounds = rack.bounds_at(CanvasPoint::new(150.0, 150.0));
        let target = classify(&graph, &rack, bounds).unwrap();
        assert_eq!(target.id(), &ElementId::from("z1"));

        let outside = rack.bounds_at(CanvasPoint::new(5000.0, 5000.0));
        assert_eq!(classify(&graph, &rack, outside), None);
    }

    #[test]
    fn test_zones_have_no_target() {
        let graph = graph();
        let zone = Element::zone(
            "z2",
            "Other",
            LocalPoint::default(),
            CanvasSize::new(100.0, 100.0),
        );
        let bounds = zone.bounds_at(CanvasPoint::new(10.0, 10.0));
        assert_eq!(classify(&graph, &zone, bounds), None);
    }

    #[test]
    fn test_preview_reports_slots() {
        let graph = graph();
        let grid = SlotGrid::new(metrics(), 42);
        let device = server("d1", 2);
        let y = 100.0 + grid.offset_for_slot(5, 2);
        let bounds = device.bounds_at(CanvasPoint::new(120.0, y));
        let preview = preview(&graph, &device, bounds, &metrics()).unwrap();
        assert_eq!(preview.target, ElementId::from("r1"));
        assert_eq!(preview.slots, Some(SlotRange::new(5, 2)));
    }

    #[test]
    fn test_refresh_preview_only_reports_changes() {
        let graph = graph();
        let grid = SlotGrid::new(metrics(), 42);
        let device = server("d1", 2);
        let at_slot = |slot: u32| {
            device.bounds_at(CanvasPoint::new(120.0, 100.0 + grid.offset_for_slot(slot, 2)))
        };

        let first = refresh_preview(&graph, &device, at_slot(5), &metrics(), None)
            .expect("a new target is a change");
        assert_eq!(first, preview(&graph, &device, at_slot(5), &metrics()));

        assert_eq!(
            refresh_preview(&graph, &device, at_slot(5), &metrics(), first.as_ref()),
            None
        );

        let moved = refresh_preview(&graph, &device, at_slot(6), &metrics(), first.as_ref());
        assert_eq!(
            moved,
            Some(Some(DropPreview {
                target: ElementId::from("r1"),
                slots: Some(SlotRange::new(6, 2)),
            }))
        );

        let outside = device.bounds_at(CanvasPoint::new(5000.0, 5000.0));
        assert_eq!(
            refresh_preview(&graph, &device, outside, &metrics(), first.as_ref()),
            Some(None)
        );
        assert_eq!(refresh_preview(&graph, &device, outside, &metrics(), None), None);
    }

    #[test]
    fn test_collision_ignores_the_dragged_device() {
        let mut graph = graph();
        let grid = SlotGrid::new(metrics(), 42);
        let mounted = Element::device(
            "d1",
            ElementKind::Server,
            "D1",
            2,
            LocalPoint::new(20.0, grid.offset_for_slot(5, 2)),
            &metrics(),
        )
        .with_parent("r1");
        graph.insert(mounted).unwrap();

        let rack = ElementId::from("r1");
        let hit = slot_collision(&graph, &rack, &ElementId::from("d2"), SlotRange::new(6, 1), &metrics());
        assert_eq!(hit, Some((ElementId::from("d1"), SlotRange::new(5, 2))));

        let own = slot_collision(&graph, &rack, &ElementId::from("d1"), SlotRange::new(6, 1), &metrics());
        assert_eq!(own, None);

        assert_eq!(
            occupancy(&graph, &rack, &metrics()),
            vec![(ElementId::from("d1"), SlotRange::new(5, 2))]
        );
    }

    #[test]
    fn test_loose_overlap_skips_containers() {
        let mut graph = graph();
        graph.insert(server("d9", 1)).unwrap();
        let device = server("d1", 1);

        let on_top = device.bounds_at(CanvasPoint::new(3010.0, 3010.0));
        assert_eq!(
            loose_overlap(&graph, &device, on_top).map(|e| e.id.clone()),
            Some(ElementId::from("d9"))
        );

        let over_zone = device.bounds_at(CanvasPoint::new(50.0, 50.0));
        assert!(loose_overlap(&graph, &device, over_zone).is_none());
    }
}
