//! # Scene Graph
//!
//! Owns every element on the canvas. Elements are stored flat in an arena and
//! indexed by id; the hierarchy is the parent id each element carries, mirrored
//! into per-element child lists so that walking down is as cheap as walking up.
//!
//! Positions are stored relative to the parent. Absolute positions are resolved
//! on demand by walking the parent chain and are never cached, so moving a
//! container moves everything inside it for free.
//!
//! Every structural mutation goes through the graph, which checks the parenting
//! rules before committing and bumps a version counter afterwards.

mod error;

pub use error::{GraphError, InvariantViolation};

use dcim_core::Bounds;
use node::{Annotations, CanvasPoint, Element, ElementId, LocalPoint};
use slotmap::SlotMap;
use smallvec::SmallVec;
use std::collections::HashMap;

/// Deepest parent chain resolved before giving up. Valid graphs never exceed 2.
pub const MAX_DEPTH: usize = 8;

slotmap::new_key_type! {
    /// Arena key of an element inside one [`SceneGraph`].
    pub struct ElementKey;
}

#[derive(Debug, Clone)]
struct Entry {
    element: Element,
    children: SmallVec<[ElementKey; 8]>,
}

/// The element collection of one canvas.
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    entries: SlotMap<ElementKey, Entry>,
    /// Maps element ids to arena keys for lookups on the drag path.
    index: HashMap<ElementId, ElementKey>,
    /// Iteration order: insertion order, or document order after a load.
    order: Vec<ElementKey>,
    version: u64,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from an unordered list. Children may precede their
    /// parents; the list order becomes the iteration order.
    pub fn from_elements(elements: impl IntoIterator<Item = Element>) -> Result<Self, GraphError> {
        let mut graph = SceneGraph::new();
        for mut element in elements {
            if graph.index.contains_key(&element.id) {
                return Err(GraphError::DuplicateId(element.id));
            }
            element.annotations = Annotations::default();
            let id = element.id.clone();
            let key = graph.entries.insert(Entry {
                element,
                children: SmallVec::new(),
            });
            graph.index.insert(id, key);
            graph.order.push(key);
        }

        for position in 0..graph.order.len() {
            let key = graph.order[position];
            let element = &graph.entries[key].element;
            graph.check_parent(element, element.parent.as_ref())?;
            let parent_key = element
                .parent
                .as_ref()
                .and_then(|p| graph.index.get(p).copied());
            if let Some(parent_key) = parent_key {
                graph.entries[parent_key].children.push(key);
            }
        }

        for key in graph.order.iter() {
            let element = &graph.entries[*key].element;
            if graph.depth(element).is_none() {
                return Err(GraphError::Cycle(element.id.clone()));
            }
        }

        Ok(graph)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Incremented by every structural or positional change.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn contains(&self, id: &ElementId) -> bool {
        self.index.contains_key(id)
    }

    pub fn key_of(&self, id: &ElementId) -> Option<ElementKey> {
        self.index.get(id).copied()
    }

    pub fn get(&self, id: &ElementId) -> Option<&Element> {
        self.index
            .get(id)
            .and_then(|key| self.entries.get(*key))
            .map(|entry| &entry.element)
    }

    /// Elements in iteration order.
    pub fn iter(&self) -> impl Iterator<Item = &Element> + '_ {
        self.order.iter().map(move |key| &self.entries[*key].element)
    }

    /// Elements without a parent, in iteration order.
    pub fn roots(&self) -> impl Iterator<Item = &Element> + '_ {
        self.iter().filter(|element| element.parent.is_none())
    }

    /// Owned copies of every element, in iteration order.
    pub fn to_elements(&self) -> Vec<Element> {
        self.iter().cloned().collect()
    }

    /// Add an element. Its parent, if any, must already exist and accept it.
    pub fn insert(&mut self, mut element: Element) -> Result<ElementKey, GraphError> {
        if self.index.contains_key(&element.id) {
            return Err(GraphError::DuplicateId(element.id));
        }
        self.check_parent(&element, element.parent.as_ref())?;

        element.annotations = Annotations::default();
        let id = element.id.clone();
        let parent_key = element.parent.as_ref().and_then(|p| self.index.get(p).copied());
        let key = self.entries.insert(Entry {
            element,
            children: SmallVec::new(),
        });
        self.index.insert(id, key);
        self.order.push(key);
        if let Some(parent_key) = parent_key {
            self.entries[parent_key].children.push(key);
        }
        self.version += 1;
        Ok(key)
    }

    /// Remove an element and everything inside it.
    ///
    /// Returns the removed elements, each parent before its children.
    pub fn remove(&mut self, id: &ElementId) -> Result<Vec<Element>, GraphError> {
        let key = self
            .key_of(id)
            .ok_or_else(|| GraphError::UnknownElement(id.clone()))?;

        let mut doomed = Vec::new();
        self.collect_subtree(key, &mut doomed);
        self.unlink(key);

        let mut removed = Vec::with_capacity(doomed.len());
        for key in doomed.iter() {
            if let Some(entry) = self.entries.remove(*key) {
                self.index.remove(&entry.element.id);
                removed.push(entry.element);
            }
        }
        self.order.retain(|key| !doomed.contains(key));
        self.version += 1;
        Ok(removed)
    }

    /// Clear every element.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
        self.order.clear();
        self.version += 1;
    }

    /// Direct children of `id`, in the order they were attached.
    pub fn children(&self, id: &ElementId) -> Vec<&Element> {
        self.key_of(id)
            .map(|key| {
                self.entries[key]
                    .children
                    .iter()
                    .map(|child| &self.entries[*child].element)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Everything below `id`, parents before children.
    pub fn descendants(&self, id: &ElementId) -> Vec<&Element> {
        let Some(key) = self.key_of(id) else {
            return Vec::new();
        };
        let mut keys = Vec::new();
        self.collect_subtree(key, &mut keys);
        keys.iter()
            .skip(1)
            .map(|key| &self.entries[*key].element)
            .collect()
    }

    /// Whether `ancestor` appears on the parent chain of `descendant`.
    pub fn is_ancestor(&self, ancestor: &ElementId, descendant: &ElementId) -> bool {
        let mut current = self.get(descendant).and_then(|e| e.parent.as_ref());
        let mut depth = 0;
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            depth += 1;
            if depth > MAX_DEPTH {
                return false;
            }
            current = self.get(id).and_then(|e| e.parent.as_ref());
        }
        false
    }

    /// Absolute canvas position of an element.
    ///
    /// Sums the element's position with every ancestor's. A chain longer than
    /// [`MAX_DEPTH`] can only come from a cycle; it is logged and the partial
    /// sum returned.
    pub fn absolute_position_of(&self, element: &Element) -> CanvasPoint {
        let mut position = element.position.0;
        let mut parent = element.parent.as_ref();
        let mut depth = 0;
        while let Some(parent_id) = parent {
            let Some(parent_element) = self.get(parent_id) else {
                log::error!("{} references missing parent {}", element.id, parent_id);
                break;
            };
            depth += 1;
            if depth > MAX_DEPTH {
                log::error!(
                    "Parent chain of {} exceeds {} levels; hierarchy is cyclic",
                    element.id,
                    MAX_DEPTH
                );
                debug_assert!(false, "cyclic parent chain at {}", element.id);
                break;
            }
            position += parent_element.position.0;
            parent = parent_element.parent.as_ref();
        }
        CanvasPoint(position)
    }

    pub fn absolute_position(&self, id: &ElementId) -> Option<CanvasPoint> {
        self.get(id).map(|element| self.absolute_position_of(element))
    }

    pub fn absolute_bounds_of(&self, element: &Element) -> Bounds {
        element.bounds_at(self.absolute_position_of(element))
    }

    pub fn absolute_bounds(&self, id: &ElementId) -> Option<Bounds> {
        self.get(id).map(|element| self.absolute_bounds_of(element))
    }

    /// Union of the bounds of all root elements.
    pub fn content_bounds(&self) -> Option<Bounds> {
        self.roots()
            .map(|element| self.absolute_bounds_of(element))
            .reduce(|a, b| a.union(&b))
    }

    /// Move an element within its current parent.
    pub fn set_position(&mut self, id: &ElementId, position: LocalPoint) -> Result<(), GraphError> {
        let key = self
            .key_of(id)
            .ok_or_else(|| GraphError::UnknownElement(id.clone()))?;
        self.entries[key].element.position = position;
        self.version += 1;
        Ok(())
    }

    /// Set the layer-control flag of an element. Returns true if it changed.
    pub fn set_hidden(&mut self, id: &ElementId, hidden: bool) -> Result<bool, GraphError> {
        let key = self
            .key_of(id)
            .ok_or_else(|| GraphError::UnknownElement(id.clone()))?;
        let element = &mut self.entries[key].element;
        if element.hidden == hidden {
            return Ok(false);
        }
        element.hidden = hidden;
        self.version += 1;
        Ok(true)
    }

    /// Replace the stored element carrying the same id.
    ///
    /// Used to roll an element back to a snapshot and to commit edits. The
    /// snapshot's parent is checked like an insert; children stay attached.
    pub fn restore(&mut self, mut element: Element) -> Result<(), GraphError> {
        let key = self
            .key_of(&element.id)
            .ok_or_else(|| GraphError::UnknownElement(element.id.clone()))?;
        self.check_parent(&element, element.parent.as_ref())?;
        if let Some(parent) = element.parent.as_ref() {
            if parent == &element.id || self.is_ancestor(&element.id, parent) {
                return Err(GraphError::Cycle(element.id));
            }
        }

        let parent_changed = self.entries[key].element.parent != element.parent;
        if parent_changed {
            self.unlink(key);
            if let Some(parent_key) = element.parent.as_ref().and_then(|p| self.key_of(p)) {
                self.entries[parent_key].children.push(key);
            }
        }

        element.annotations = std::mem::take(&mut self.entries[key].element.annotations);
        self.entries[key].element = element;
        self.version += 1;
        Ok(())
    }

    /// Apply `edit` to a copy of the element and commit it through
    /// [`SceneGraph::restore`]. Nothing changes if the edit breaks a rule.
    pub fn update(
        &mut self,
        id: &ElementId,
        edit: impl FnOnce(&mut Element),
    ) -> Result<(), GraphError> {
        let mut element = self
            .get(id)
            .cloned()
            .ok_or_else(|| GraphError::UnknownElement(id.clone()))?;
        edit(&mut element);
        if element.id != *id {
            return Err(GraphError::UnknownElement(element.id));
        }
        self.restore(element)
    }

    /// Transient annotations of one element. Not a versioned change.
    pub fn annotations_mut(&mut self, id: &ElementId) -> Option<&mut Annotations> {
        let key = self.key_of(id)?;
        self.entries
            .get_mut(key)
            .map(|entry| &mut entry.element.annotations)
    }

    /// Transient annotations of every element.
    pub fn annotations_iter_mut(
        &mut self,
    ) -> impl Iterator<Item = (&ElementId, &mut Annotations)> + '_ {
        self.entries.values_mut().map(|entry| {
            let element = &mut entry.element;
            (&element.id, &mut element.annotations)
        })
    }

    /// Check the parenting invariants of every element.
    pub fn validate(&self) -> Vec<InvariantViolation> {
        let mut violations = Vec::new();
        for element in self.iter() {
            let Some(parent_id) = element.parent.as_ref() else {
                continue;
            };
            let Some(parent) = self.get(parent_id) else {
                violations.push(InvariantViolation::MissingParent {
                    id: element.id.clone(),
                    parent: parent_id.clone(),
                });
                continue;
            };
            if !element.kind().can_parent_to(parent.kind()) {
                violations.push(InvariantViolation::InvalidParent {
                    id: element.id.clone(),
                    kind: element.kind(),
                    parent: parent_id.clone(),
                    parent_kind: parent.kind(),
                });
            }
            if self.depth(element).is_none() {
                violations.push(InvariantViolation::ParentChain {
                    id: element.id.clone(),
                    limit: MAX_DEPTH,
                });
            }
        }
        violations
    }

    fn check_parent(&self, element: &Element, parent: Option<&ElementId>) -> Result<(), GraphError> {
        let Some(parent_id) = parent else {
            return Ok(());
        };
        let parent = self.get(parent_id).ok_or_else(|| GraphError::UnknownParent {
            id: element.id.clone(),
            parent: parent_id.clone(),
        })?;
        if !element.kind().can_parent_to(parent.kind()) {
            return Err(GraphError::InvalidParent {
                id: element.id.clone(),
                kind: element.kind(),
                parent: parent_id.clone(),
                parent_kind: parent.kind(),
            });
        }
        Ok(())
    }

    /// Length of the parent chain, or `None` past [`MAX_DEPTH`].
    fn depth(&self, element: &Element) -> Option<usize> {
        let mut depth = 0;
        let mut parent = element.parent.as_ref();
        while let Some(id) = parent {
            depth += 1;
            if depth > MAX_DEPTH {
                return None;
            }
            parent = self.get(id).and_then(|e| e.parent.as_ref());
        }
        Some(depth)
    }

    /// Detach `key` from its parent's child list.
    fn unlink(&mut self, key: ElementKey) {
        let parent_key = self.entries[key]
            .element
            .parent
            .as_ref()
            .and_then(|p| self.index.get(p).copied());
        if let Some(parent_key) = parent_key {
            self.entries[parent_key].children.retain(|child| *child != key);
        }
    }

    fn collect_subtree(&self, key: ElementKey, out: &mut Vec<ElementKey>) {
        if out.len() > self.entries.len() {
            return;
        }
        out.push(key);
        if let Some(entry) = self.entries.get(key) {
            for child in entry.children.iter() {
                self.collect_subtree(*child, out);
            }
        }
    }
}
