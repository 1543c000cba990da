use crate::containment;
use crate::drag::{DragState, RevertReason};
use crate::CanvasError;
use dcim_core::{EngineConfig, SlotGrid, SlotRange};
use glam::Vec2;
use interchange::Document;
use node::{
    CanvasPoint, CanvasSize, Color, Connection, ConnectionId, Element, ElementData, ElementId,
    ElementKind, LocalPoint, PaletteItem, ScreenPoint,
};
use scene_graph::{InvariantViolation, SceneGraph};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use strum_macros::{Display, EnumIter, EnumString};

/// Events emitted by the canvas.
#[derive(Clone, Debug, PartialEq)]
pub enum CanvasEvent {
    ElementAdded(ElementId),
    ElementRemoved(ElementId),
    /// Position or parent of an element changed.
    ElementMoved(ElementId),
    /// A drop was rejected and the element sprang back.
    DropReverted {
        id: ElementId,
        reason: RevertReason,
    },
    SelectionChanged,
    ContentChanged,
}

/// Entries of the element context menu.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MenuAction {
    /// Open the details editor for the element.
    Edit,
    Duplicate,
    Delete,
}

/// An open context menu, bound to one element.
#[derive(Clone, Debug, PartialEq)]
pub struct ContextMenu {
    pub element: ElementId,
    /// Where the host should draw the menu.
    pub anchor: ScreenPoint,
}

/// Field edits of a connection. `None` leaves a field unchanged.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionPatch {
    #[serde(default)]
    pub source_port: Option<String>,
    #[serde(default)]
    pub target_port: Option<String>,
    #[serde(default)]
    pub medium: Option<String>,
    #[serde(default)]
    pub color: Option<Color>,
}

/// Elements and connections inserted together, all or nothing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Batch {
    /// Parents must precede their children.
    pub elements: Vec<Element>,
    pub connections: Vec<Connection>,
}

/// The canvas state.
pub struct Canvas {
    /// All elements, with their hierarchy.
    pub(crate) graph: SceneGraph,

    /// Cables between elements.
    connections: Vec<Connection>,

    /// Currently selected element ids, in selection order.
    selection: SmallVec<[ElementId; 4]>,

    context_menu: Option<ContextMenu>,

    /// Element whose details editor is open.
    editing: Option<ElementId>,

    /// Kind whose elements carry the matched-type highlight.
    highlighted_kind: Option<ElementKind>,

    /// Active drag gesture.
    pub(crate) drag: Option<DragState>,

    pub(crate) config: EngineConfig,

    /// Events not yet drained by the host.
    events: Vec<CanvasEvent>,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Canvas {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            graph: SceneGraph::new(),
            connections: Vec::new(),
            selection: SmallVec::new(),
            context_menu: None,
            editing: None,
            highlighted_kind: None,
            drag: None,
            config,
            events: Vec::new(),
        }
    }

    /// Build a canvas holding `document`.
    pub fn from_document(document: Document, config: EngineConfig) -> Result<Self, CanvasError> {
        let mut canvas = Self::new(config);
        canvas.load_document(document)?;
        canvas.events.clear();
        Ok(canvas)
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn connection(&self, id: &ConnectionId) -> Option<&Connection> {
        self.connections.iter().find(|c| &c.id == id)
    }

    pub fn element(&self, id: &ElementId) -> Result<&Element, CanvasError> {
        self.graph
            .get(id)
            .ok_or_else(|| CanvasError::UnknownElement(id.clone()))
    }

    pub fn selection(&self) -> &[ElementId] {
        &self.selection
    }

    pub fn context_menu(&self) -> Option<&ContextMenu> {
        self.context_menu.as_ref()
    }

    pub fn editing(&self) -> Option<&ElementId> {
        self.editing.as_ref()
    }

    pub fn highlighted_kind(&self) -> Option<ElementKind> {
        self.highlighted_kind
    }

    /// Events emitted since the last drain.
    pub fn events(&self) -> &[CanvasEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<CanvasEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn emit(&mut self, event: CanvasEvent) {
        self.events.push(event);
    }

    /// Create an element from a palette entry, centered on `point`.
    ///
    /// The new element lands unparented.
    pub fn place_from_palette(
        &mut self,
        item: &PaletteItem,
        point: CanvasPoint,
    ) -> Result<ElementId, CanvasError> {
        let size = item.size(&self.config);
        let origin = point.0 - size.0 / 2.0;
        let element = Element::new(
            ElementId::generate(),
            item.to_data(),
            LocalPoint(origin),
            size,
        );
        let id = element.id.clone();
        self.graph.insert(element)?;
        log::debug!("Placed {} {} at {:?}", item.kind, id, origin);
        self.emit(CanvasEvent::ElementAdded(id.clone()));
        self.emit(CanvasEvent::ContentChanged);
        Ok(id)
    }

    /// Copy an element under a fresh id, offset from the original.
    ///
    /// Children are not copied. A copy of a rack-mounted device is placed
    /// loose on the canvas next to its rack, since the offset position would
    /// straddle the original's slots.
    pub fn duplicate(&mut self, id: &ElementId) -> Result<ElementId, CanvasError> {
        let source = self.element(id)?.clone();
        let offset = self.config.duplicate_offset;

        let mut copy = source.clone();
        copy.id = ElementId::generate();
        copy.annotations = Default::default();
        let label = format!("{} (Copy)", source.label());
        copy.data.set_label(label);

        if self.parent_rack(&source).is_some() {
            let absolute = self.graph.absolute_position_of(&source);
            copy.parent = None;
            copy.position = LocalPoint(absolute.0 + offset);
        } else {
            copy.position = LocalPoint(source.position.0 + offset);
        }

        let copy_id = copy.id.clone();
        self.graph.insert(copy)?;
        self.emit(CanvasEvent::ElementAdded(copy_id.clone()));
        self.emit(CanvasEvent::ContentChanged);
        Ok(copy_id)
    }

    /// Delete an element, everything inside it and every connection touching
    /// any of them. Returns the removed ids, parents first.
    pub fn delete(&mut self, id: &ElementId) -> Result<Vec<ElementId>, CanvasError> {
        let removed: Vec<ElementId> = self
            .graph
            .remove(id)?
            .into_iter()
            .map(|element| element.id)
            .collect();

        self.connections
            .retain(|connection| !removed.iter().any(|id| connection.touches(id)));

        let selected = self.selection.len();
        self.selection.retain(|id| !removed.contains(id));
        if self
            .context_menu
            .as_ref()
            .is_some_and(|menu| removed.contains(&menu.element))
        {
            self.context_menu = None;
        }
        if self.editing.as_ref().is_some_and(|id| removed.contains(id)) {
            self.editing = None;
        }
        if self
            .drag
            .as_ref()
            .is_some_and(|drag| removed.contains(&drag.element))
        {
            log::warn!("Deleted {} while it was being dragged", id);
            self.drag = None;
        }

        for removed_id in removed.iter() {
            self.emit(CanvasEvent::ElementRemoved(removed_id.clone()));
        }
        if self.selection.len() != selected {
            self.emit(CanvasEvent::SelectionChanged);
        }
        self.emit(CanvasEvent::ContentChanged);
        Ok(removed)
    }

    /// Select a single element, closing the menu and the editor.
    pub fn click(&mut self, id: &ElementId) -> Result<(), CanvasError> {
        self.element(id)?;
        self.selection.clear();
        self.selection.push(id.clone());
        self.context_menu = None;
        self.editing = None;
        self.emit(CanvasEvent::SelectionChanged);
        Ok(())
    }

    /// Add an element to the selection.
    pub fn click_additive(&mut self, id: &ElementId) -> Result<(), CanvasError> {
        self.element(id)?;
        if !self.selection.contains(id) {
            self.selection.push(id.clone());
            self.emit(CanvasEvent::SelectionChanged);
        }
        Ok(())
    }

    /// Click on empty canvas: clear the selection, the menu and the editor.
    pub fn clear_selection(&mut self) {
        self.context_menu = None;
        self.editing = None;
        if !self.selection.is_empty() {
            self.selection.clear();
            self.emit(CanvasEvent::SelectionChanged);
        }
    }

    /// Open the context menu of an element and select it.
    pub fn open_context_menu(
        &mut self,
        id: &ElementId,
        anchor: ScreenPoint,
    ) -> Result<(), CanvasError> {
        self.element(id)?;
        self.context_menu = Some(ContextMenu {
            element: id.clone(),
            anchor,
        });
        if self.selection.as_slice() != std::slice::from_ref(id) {
            self.selection.clear();
            self.selection.push(id.clone());
            self.emit(CanvasEvent::SelectionChanged);
        }
        Ok(())
    }

    pub fn close_menu(&mut self) {
        self.context_menu = None;
    }

    /// Run a context menu entry and close the menu.
    ///
    /// Returns the ids affected: the edited element, the new copy, or the
    /// removed elements.
    pub fn menu_action(&mut self, action: MenuAction) -> Result<Vec<ElementId>, CanvasError> {
        let menu = self.context_menu.take().ok_or(CanvasError::NoContextMenu)?;
        let id = menu.element;
        match action {
            MenuAction::Edit => {
                self.element(&id)?;
                self.editing = Some(id.clone());
                Ok(vec![id])
            }
            MenuAction::Duplicate => Ok(vec![self.duplicate(&id)?]),
            MenuAction::Delete => self.delete(&id),
        }
    }

    /// Replace the attributes of an element.
    ///
    /// The variant must match the element's kind. The size follows the new
    /// attributes. A mounted device keeps its bottom slot; a rack keeps every
    /// device on its slots. Edits that would break slot exclusivity or push a
    /// device out of its rack are rejected.
    pub fn update_data(&mut self, id: &ElementId, data: ElementData) -> Result<(), CanvasError> {
        let element = self.element(id)?.clone();
        if element.kind() != data.kind() {
            return Err(CanvasError::KindMismatch {
                id: id.clone(),
                expected: element.kind(),
                found: data.kind(),
            });
        }

        let mut updated = element.clone();
        updated.data = data;
        updated.refresh_size(&self.config);
        let metrics = self.config.rack;

        if let (Some(u_height), Some(rack)) = (updated.u_height(), self.parent_rack(&element)) {
            let total_u = rack.total_u().unwrap_or_default();
            let grid = SlotGrid::new(metrics, total_u);
            if !grid.fits(u_height) {
                return Err(CanvasError::EditConflict {
                    id: id.clone(),
                    reason: format!("{u_height}U does not fit in {total_u}U rack {}", rack.id),
                });
            }
            let old_height = element.u_height().unwrap_or(1);
            let slot = grid
                .slot_from_offset(element.position.y(), old_height)
                .min(grid.max_slot(u_height));
            let range = SlotRange::new(slot, u_height);
            if let Some((other, occupied)) =
                containment::slot_collision(&self.graph, &rack.id, id, range, &metrics)
            {
                return Err(CanvasError::EditConflict {
                    id: id.clone(),
                    reason: format!("{range} would overlap {other} at {occupied}"),
                });
            }
            updated.position = LocalPoint::new(element.position.x(), grid.offset_for_slot(slot, u_height));
        }

        let mut remounted = Vec::new();
        if let (Some(old_total), Some(new_total)) = (element.total_u(), updated.total_u()) {
            if old_total != new_total {
                let old_grid = SlotGrid::new(metrics, old_total);
                let new_grid = SlotGrid::new(metrics, new_total);
                for child in self.graph.children(id) {
                    let Some(u_height) = child.u_height() else {
                        continue;
                    };
                    let range = old_grid.range_from_offset(child.position.y(), u_height);
                    if range.end() >= new_total {
                        return Err(CanvasError::EditConflict {
                            id: id.clone(),
                            reason: format!("{} occupies {range}", child.id),
                        });
                    }
                    let mut child = child.clone();
                    child.position =
                        LocalPoint::new(child.position.x(), new_grid.offset_for_slot(range.start, u_height));
                    remounted.push(child);
                }
            }
        }

        self.graph.restore(updated)?;
        for child in remounted {
            self.graph.restore(child)?;
        }
        self.emit(CanvasEvent::ContentChanged);
        Ok(())
    }

    /// Resize a zone. Sizes below the configured minimum are clamped.
    pub fn resize_zone(&mut self, id: &ElementId, size: CanvasSize) -> Result<CanvasSize, CanvasError> {
        let element = self.element(id)?;
        if !element.kind().is_zone() {
            return Err(CanvasError::KindMismatch {
                id: id.clone(),
                expected: ElementKind::Zone,
                found: element.kind(),
            });
        }
        let minimum = Vec2::new(self.config.zone.min_width, self.config.zone.min_height);
        let size = CanvasSize(size.0.max(minimum));
        self.graph.update(id, |zone| zone.size = size)?;
        self.emit(CanvasEvent::ContentChanged);
        Ok(size)
    }

    /// Connect two elements with default ports.
    pub fn connect(
        &mut self,
        source: &ElementId,
        target: &ElementId,
    ) -> Result<ConnectionId, CanvasError> {
        let connection = Connection::new(ConnectionId::generate(), source.clone(), target.clone());
        let id = connection.id.clone();
        self.add_connection(connection)?;
        Ok(id)
    }

    pub fn add_connection(&mut self, connection: Connection) -> Result<(), CanvasError> {
        self.element(&connection.source)?;
        self.element(&connection.target)?;
        if self.connection(&connection.id).is_some() {
            return Err(CanvasError::EditConflict {
                id: connection.source.clone(),
                reason: format!("connection {} already exists", connection.id),
            });
        }
        self.connections.push(connection);
        self.emit(CanvasEvent::ContentChanged);
        Ok(())
    }

    pub fn update_connection(
        &mut self,
        id: &ConnectionId,
        patch: ConnectionPatch,
    ) -> Result<(), CanvasError> {
        let connection = self
            .connections
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(|| CanvasError::UnknownConnection(id.clone()))?;
        if let Some(port) = patch.source_port {
            connection.source_port = port;
        }
        if let Some(port) = patch.target_port {
            connection.target_port = port;
        }
        if let Some(medium) = patch.medium {
            connection.medium = Some(medium);
        }
        if let Some(color) = patch.color {
            connection.color = Some(color);
        }
        self.emit(CanvasEvent::ContentChanged);
        Ok(())
    }

    pub fn remove_connection(&mut self, id: &ConnectionId) -> Result<Connection, CanvasError> {
        let index = self
            .connections
            .iter()
            .position(|c| &c.id == id)
            .ok_or_else(|| CanvasError::UnknownConnection(id.clone()))?;
        let connection = self.connections.remove(index);
        self.emit(CanvasEvent::ContentChanged);
        Ok(connection)
    }

    /// Mark every element of `kind` as matched, or clear the marks.
    pub fn highlight_kind(&mut self, kind: Option<ElementKind>) {
        self.highlighted_kind = kind;
        let kinds: Vec<(ElementId, ElementKind)> = self
            .graph
            .iter()
            .map(|element| (element.id.clone(), element.kind()))
            .collect();
        for (id, element_kind) in kinds {
            if let Some(annotations) = self.graph.annotations_mut(&id) {
                annotations.is_matched_type = Some(element_kind) == kind;
            }
        }
    }

    /// Whether the layer holding `kind` is shown. A layer counts as shown
    /// while any of its elements is visible, or when it has no elements.
    pub fn is_category_visible(&self, kind: ElementKind) -> bool {
        let group = kind.visibility_group();
        let mut members = self
            .graph
            .iter()
            .filter(|element| group.contains(&element.kind()))
            .peekable();
        members.peek().is_none() || members.any(|element| !element.hidden)
    }

    /// Show or hide every element in the layer of `kind`.
    ///
    /// Returns the ids whose flag changed.
    pub fn set_category_visible(&mut self, kind: ElementKind, visible: bool) -> Vec<ElementId> {
        let group = kind.visibility_group();
        self.set_visible_where(|element| group.contains(&element.kind()), visible)
    }

    /// Flip the layer of `kind`: hide it if any member is showing.
    pub fn toggle_category(&mut self, kind: ElementKind) -> Vec<ElementId> {
        let visible = !self.is_category_visible(kind);
        self.set_category_visible(kind, visible)
    }

    /// Show or hide every element on the canvas.
    pub fn set_all_visible(&mut self, visible: bool) -> Vec<ElementId> {
        self.set_visible_where(|_| true, visible)
    }

    fn set_visible_where(
        &mut self,
        filter: impl Fn(&Element) -> bool,
        visible: bool,
    ) -> Vec<ElementId> {
        let targets: Vec<ElementId> = self
            .graph
            .iter()
            .filter(|element| element.hidden == visible && filter(element))
            .map(|element| element.id.clone())
            .collect();
        for id in targets.iter() {
            if let Err(err) = self.graph.set_hidden(id, !visible) {
                log::warn!("Failed to change visibility of {}: {}", id, err);
            }
        }
        if !targets.is_empty() {
            log::debug!(
                "{} {} element(s)",
                if visible { "Showed" } else { "Hid" },
                targets.len()
            );
            self.emit(CanvasEvent::ContentChanged);
        }
        targets
    }

    /// Committed slot ranges of a rack's devices, bottom-up.
    pub fn occupancy(&self, rack: &ElementId) -> Result<Vec<(ElementId, SlotRange)>, CanvasError> {
        let element = self.element(rack)?;
        if !element.kind().is_rack_like() {
            return Err(CanvasError::KindMismatch {
                id: rack.clone(),
                expected: ElementKind::Rack,
                found: element.kind(),
            });
        }
        Ok(containment::occupancy(&self.graph, rack, &self.config.rack))
    }

    /// Check every invariant: parenting, slot exclusivity, sizes and
    /// connection endpoints.
    pub fn validate(&self) -> Vec<InvariantViolation> {
        let mut violations = self.graph.validate();
        let metrics = self.config.rack;

        for element in self.graph.iter() {
            if let Some(natural) = element.natural_size(&self.config) {
                if (natural.0 - element.size.0).abs().max_element() > 0.5 {
                    violations.push(InvariantViolation::SizeMismatch {
                        id: element.id.clone(),
                    });
                }
            }

            let Some(total_u) = element.total_u() else {
                continue;
            };
            for child in self.graph.children(&element.id) {
                if let Some(u_height) = child.u_height() {
                    if u_height > total_u {
                        violations.push(InvariantViolation::ExceedsRack {
                            id: child.id.clone(),
                            rack: element.id.clone(),
                            u_height,
                            total_u,
                        });
                    }
                }
            }
            let ranges = containment::occupancy(&self.graph, &element.id, &metrics);
            for (index, (first, first_slots)) in ranges.iter().enumerate() {
                for (second, second_slots) in ranges.iter().skip(index + 1) {
                    if first_slots.overlaps(second_slots) {
                        violations.push(InvariantViolation::SlotOverlap {
                            rack: element.id.clone(),
                            first: first.clone(),
                            first_slots: *first_slots,
                            second: second.clone(),
                            second_slots: *second_slots,
                        });
                    }
                }
            }
        }

        for connection in self.connections.iter() {
            for endpoint in [&connection.source, &connection.target] {
                if !self.graph.contains(endpoint) {
                    violations.push(InvariantViolation::DanglingConnection {
                        connection: connection.id.clone(),
                        endpoint: endpoint.clone(),
                    });
                }
            }
        }
        violations
    }

    /// Replace the whole canvas with `document`.
    ///
    /// The document must build a graph without invariant violations;
    /// otherwise the canvas is left untouched.
    pub fn load_document(&mut self, document: Document) -> Result<(), CanvasError> {
        let graph = SceneGraph::from_elements(document.elements)?;
        let mut candidate = Canvas::new(self.config.clone());
        candidate.graph = graph;
        candidate.connections = document.connections;
        let violations = candidate.validate();
        if !violations.is_empty() {
            log::warn!("Rejected document: {} invariant violation(s)", violations.len());
            return Err(CanvasError::Invariants(violations));
        }

        self.graph = candidate.graph;
        self.connections = candidate.connections;
        self.selection.clear();
        self.context_menu = None;
        self.editing = None;
        self.drag = None;
        self.highlighted_kind = None;
        log::debug!(
            "Loaded document with {} elements and {} connections",
            self.graph.len(),
            self.connections.len()
        );
        self.emit(CanvasEvent::SelectionChanged);
        self.emit(CanvasEvent::ContentChanged);
        Ok(())
    }

    /// Snapshot the canvas as a document.
    pub fn to_document(&self) -> Document {
        Document::new(self.graph.to_elements(), self.connections.clone())
    }

    /// Insert a batch of elements and connections.
    ///
    /// Nothing is inserted unless every element and connection is accepted
    /// and the result passes [`Canvas::validate`].
    pub fn apply_batch(&mut self, batch: Batch) -> Result<Vec<ElementId>, CanvasError> {
        let mut graph = self.graph.clone();
        let mut added = Vec::with_capacity(batch.elements.len());
        for element in batch.elements {
            added.push(element.id.clone());
            graph.insert(element)?;
        }

        let mut candidate = Canvas::new(self.config.clone());
        candidate.graph = graph;
        candidate.connections = self.connections.clone();
        for connection in batch.connections {
            candidate.add_connection(connection)?;
        }
        let violations = candidate.validate();
        if !violations.is_empty() {
            log::warn!("Rejected batch: {} invariant violation(s)", violations.len());
            return Err(CanvasError::Invariants(violations));
        }

        self.graph = candidate.graph;
        self.connections = candidate.connections;
        if let Some(kind) = self.highlighted_kind {
            self.highlight_kind(Some(kind));
        }
        for id in added.iter() {
            self.emit(CanvasEvent::ElementAdded(id.clone()));
        }
        self.emit(CanvasEvent::ContentChanged);
        Ok(added)
    }

    /// The rack an element is mounted in, if its parent is a rack.
    pub(crate) fn parent_rack(&self, element: &Element) -> Option<&Element> {
        element
            .parent
            .as_ref()
            .and_then(|parent| self.graph.get(parent))
            .filter(|parent| parent.kind() == ElementKind::Rack)
    }
}
