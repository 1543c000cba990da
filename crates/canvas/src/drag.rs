//! Drag lifecycle.
//!
//! A drag moves through three calls. `drag_start` snapshots the element,
//! `drag_move` only updates the live highlight on the would-be container, and
//! `drag_end` either commits a placement or restores the snapshot. Nothing a
//! drag does is visible in the committed graph until `drag_end` succeeds.

use crate::canvas::{Canvas, CanvasEvent};
use crate::containment::{self, DropPreview, DropTarget};
use crate::CanvasError;
use dcim_core::{SlotGrid, SlotRange};
use node::{CanvasPoint, Element, ElementId, LocalPoint, ZLayer};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An element being dragged.
#[derive(Clone, Debug)]
pub struct DragState {
    pub element: ElementId,
    /// Committed state at drag start, restored on a rejected drop.
    snapshot: Element,
    preview: Option<DropPreview>,
}

impl DragState {
    pub fn preview(&self) -> Option<&DropPreview> {
        self.preview.as_ref()
    }
}

/// Why a drop sprang back.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RevertReason {
    /// The device would share units with another device in the rack.
    SlotCollision {
        rack: ElementId,
        slots: SlotRange,
        occupant: ElementId,
    },
    /// The device is taller than the rack.
    ExceedsCapacity {
        rack: ElementId,
        u_height: u32,
        total_u: u32,
    },
    /// A loose element would land on top of another loose element.
    CanvasOverlap { other: ElementId },
}

impl fmt::Display for RevertReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevertReason::SlotCollision {
                rack,
                slots,
                occupant,
            } => write!(f, "{slots} of rack {rack} is occupied by {occupant}"),
            RevertReason::ExceedsCapacity {
                rack,
                u_height,
                total_u,
            } => write!(f, "a {u_height}U device does not fit in {total_u}U rack {rack}"),
            RevertReason::CanvasOverlap { other } => write!(f, "overlaps {other}"),
        }
    }
}

/// Result of a drop.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropOutcome {
    /// A zone was moved.
    Moved,
    /// A device was snapped into a rack.
    Mounted { rack: ElementId, slots: SlotRange },
    /// The element now belongs to a zone.
    Grouped { zone: ElementId },
    /// The element now sits directly on the canvas.
    Detached,
    Reverted(RevertReason),
}

impl DropOutcome {
    pub fn is_committed(&self) -> bool {
        !matches!(self, DropOutcome::Reverted(_))
    }
}

impl Canvas {
    /// Element currently being dragged.
    pub fn dragging(&self) -> Option<&ElementId> {
        self.drag.as_ref().map(|drag| &drag.element)
    }

    /// Begin dragging `id`. Only one drag may run at a time.
    pub fn drag_start(&mut self, id: &ElementId) -> Result<(), CanvasError> {
        if let Some(drag) = self.drag.as_ref() {
            return Err(CanvasError::DragInProgress(drag.element.clone()));
        }
        let snapshot = self.element(id)?.clone();
        log::trace!("Drag start {}", id);
        self.drag = Some(DragState {
            element: id.clone(),
            snapshot,
            preview: None,
        });
        Ok(())
    }

    /// Update the drop highlight for the element's top-left corner at
    /// `point`. Returns whether any highlight changed.
    ///
    /// Positions and parents are left alone.
    pub fn drag_move(&mut self, id: &ElementId, point: CanvasPoint) -> Result<bool, CanvasError> {
        let drag = self
            .drag
            .as_ref()
            .filter(|drag| &drag.element == id)
            .ok_or_else(|| CanvasError::NotDragging(id.clone()))?;
        let element = self.element(id)?;
        let bounds = element.bounds_at(point);
        let Some(preview) = containment::refresh_preview(
            &self.graph,
            element,
            bounds,
            &self.config.rack,
            drag.preview.as_ref(),
        ) else {
            return Ok(false);
        };

        let previous = self.drag.as_mut().and_then(|drag| drag.preview.take());
        if let Some(previous) = previous {
            if let Some(annotations) = self.graph.annotations_mut(&previous.target) {
                annotations.clear_drag();
            }
        }
        if let Some(next) = preview.as_ref() {
            if let Some(annotations) = self.graph.annotations_mut(&next.target) {
                annotations.is_drop_target = true;
                annotations.preview_slots = next.slots;
            }
        }
        if let Some(drag) = self.drag.as_mut() {
            drag.preview = preview;
        }
        Ok(true)
    }

    /// Drop the element with its top-left corner at `point`.
    ///
    /// A rejected drop restores the element exactly as it was at drag start
    /// and reports why.
    pub fn drag_end(&mut self, id: &ElementId, point: CanvasPoint) -> Result<DropOutcome, CanvasError> {
        let drag = match self.drag.take() {
            Some(drag) if &drag.element == id => drag,
            other => {
                self.drag = other;
                return Err(CanvasError::NotDragging(id.clone()));
            }
        };
        self.clear_drag_annotations();

        let element = self.element(id)?.clone();
        match self.resolve_drop(&element, point) {
            Ok((placed, outcome)) => {
                self.graph.restore(placed)?;
                log::debug!("Dropped {}: {:?}", id, outcome);
                self.emit(CanvasEvent::ElementMoved(id.clone()));
                self.emit(CanvasEvent::ContentChanged);

                let violations = self.validate();
                if !violations.is_empty() {
                    log::error!("Drop of {} broke {} invariant(s)", id, violations.len());
                    for violation in violations.iter() {
                        log::error!("  {}", violation);
                    }
                }
                debug_assert!(violations.is_empty(), "drop committed an invalid graph");
                Ok(outcome)
            }
            Err(reason) => {
                self.graph.restore(drag.snapshot)?;
                log::info!("Reverted drop of {}: {}", id, reason);
                self.emit(CanvasEvent::DropReverted {
                    id: id.clone(),
                    reason: reason.clone(),
                });
                Ok(DropOutcome::Reverted(reason))
            }
        }
    }

    /// Abandon the drag without moving anything.
    pub fn drag_cancel(&mut self) -> Option<ElementId> {
        let drag = self.drag.take()?;
        self.clear_drag_annotations();
        Some(drag.element)
    }

    fn clear_drag_annotations(&mut self) {
        for (_, annotations) in self.graph.annotations_iter_mut() {
            annotations.clear_drag();
        }
    }

    /// Where `element` ends up when dropped at `point`, or why it cannot.
    fn resolve_drop(
        &self,
        element: &Element,
        point: CanvasPoint,
    ) -> Result<(Element, DropOutcome), RevertReason> {
        let kind = element.kind();
        let mut placed = element.clone();
        if kind.is_zone() {
            placed.parent = None;
            placed.position = LocalPoint::root(point);
            return Ok((placed, DropOutcome::Moved));
        }

        let bounds = element.bounds_at(point);
        match containment::classify(&self.graph, element, bounds) {
            Some(DropTarget::Rack { id: rack, origin }) => {
                let metrics = self.config.rack;
                let total_u = self
                    .graph
                    .get(&rack)
                    .and_then(|rack| rack.total_u())
                    .unwrap_or_default();
                let u_height = element.u_height().unwrap_or(1);
                let grid = SlotGrid::new(metrics, total_u);
                if !grid.fits(u_height) {
                    return Err(RevertReason::ExceedsCapacity {
                        rack,
                        u_height,
                        total_u,
                    });
                }

                let slots = grid.range_at(origin.y(), point.y(), u_height);
                if let Some((occupant, _)) =
                    containment::slot_collision(&self.graph, &rack, &element.id, slots, &metrics)
                {
                    return Err(RevertReason::SlotCollision {
                        rack,
                        slots,
                        occupant,
                    });
                }

                placed.parent = Some(rack.clone());
                placed.position = LocalPoint::new(
                    metrics.rail_padding,
                    grid.offset_for_slot(slots.start, u_height),
                );
                placed.layer = ZLayer::Device;
                Ok((placed, DropOutcome::Mounted { rack, slots }))
            }
            Some(DropTarget::Zone { id: zone, origin }) => {
                placed.parent = Some(zone.clone());
                placed.position = LocalPoint::from_canvas(point, origin);
                placed.layer = kind.default_layer();
                Ok((placed, DropOutcome::Grouped { zone }))
            }
            None => {
                if kind.is_leaf() {
                    if let Some(other) = containment::loose_overlap(&self.graph, element, bounds) {
                        return Err(RevertReason::CanvasOverlap {
                            other: other.id.clone(),
                        });
                    }
                }
                placed.parent = None;
                placed.position = LocalPoint::root(point);
                placed.layer = kind.default_layer();
                Ok((placed, DropOutcome::Detached))
            }
        }
    }
}
