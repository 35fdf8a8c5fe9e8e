//! Per-annotation version history.
//!
//! Every polygon version lives in a [`PolygonArena`] indexed by id. A
//! [`PolygonManager`] owns one annotation's chain as an ordered list of ids
//! (index 0 is the root placeholder) plus a cursor pointing at the displayed
//! version. Undo moves the cursor back, redo moves it forward, and appending
//! a new version after an undo truncates the chain at the cursor, so the old
//! forward branch is dropped for good.

use std::collections::HashMap;

use crate::model::{ClickPoint, ManagerId, Point, Polygon, PolygonId};
use crate::viewport::Viewport;

// ============================================================================
// Arena
// ============================================================================

/// Storage for all polygon versions of a session.
#[derive(Debug, Clone)]
pub struct PolygonArena {
    polygons: HashMap<PolygonId, Polygon>,
    next_id: PolygonId,
}

impl Default for PolygonArena {
    fn default() -> Self {
        Self::new()
    }
}

impl PolygonArena {
    pub fn new() -> Self {
        Self {
            polygons: HashMap::new(),
            next_id: 1,
        }
    }

    /// Reserve a fresh polygon id. Ids are never reused.
    pub fn allocate_id(&mut self) -> PolygonId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn insert(&mut self, polygon: Polygon) {
        self.polygons.insert(polygon.id(), polygon);
    }

    pub fn get(&self, id: PolygonId) -> Option<&Polygon> {
        self.polygons.get(&id)
    }

    pub fn get_mut(&mut self, id: PolygonId) -> Option<&mut Polygon> {
        self.polygons.get_mut(&id)
    }

    pub fn remove(&mut self, id: PolygonId) -> Option<Polygon> {
        self.polygons.remove(&id)
    }

    pub fn contains(&self, id: PolygonId) -> bool {
        self.polygons.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Drop all polygons. The id counter keeps running.
    pub fn clear(&mut self) {
        self.polygons.clear();
    }
}

// ============================================================================
// Manager
// ============================================================================

/// One named annotation and its version chain.
#[derive(Debug, Clone)]
pub struct PolygonManager {
    id: ManagerId,
    name: String,
    /// `chain[0]` is the root placeholder.
    chain: Vec<PolygonId>,
    cursor: usize,
    clicked_points: Vec<ClickPoint>,
}

impl PolygonManager {
    /// Create a manager whose chain holds only the root placeholder.
    pub fn new(id: ManagerId, name: impl Into<String>, arena: &mut PolygonArena) -> Self {
        let name = name.into();
        let root = Polygon::root_sentinel(arena.allocate_id(), id, &name);
        let root_id = root.id();
        arena.insert(root);
        Self {
            id,
            name,
            chain: vec![root_id],
            cursor: 0,
            clicked_points: Vec::new(),
        }
    }

    pub fn id(&self) -> ManagerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stage `polygon` as the version after the displayed one.
    ///
    /// Anything past the cursor is discarded and freed. The cursor does not
    /// move; call [`display_next_mask_item`](Self::display_next_mask_item)
    /// to commit.
    pub fn append_mask_item(&mut self, polygon: Polygon, arena: &mut PolygonArena) {
        for id in self.chain.drain(self.cursor + 1..) {
            arena.remove(id);
        }
        log::debug!(
            "{}: staged polygon {} after version {}",
            self.name,
            polygon.id(),
            self.cursor
        );
        self.chain.push(polygon.id());
        arena.insert(polygon);
    }

    /// Advance to the next version (redo, or commit after an append).
    ///
    /// Returns `false` without doing anything when there is no next version.
    pub fn display_next_mask_item(
        &mut self,
        arena: &mut PolygonArena,
        viewport: &mut dyn Viewport,
    ) -> bool {
        let Some(&next_id) = self.chain.get(self.cursor + 1) else {
            return false;
        };

        if !self.has_nothing_displayed() {
            let current_id = self.chain[self.cursor];
            viewport.remove_polygon(current_id);
            if let Some(current) = arena.get_mut(current_id) {
                current.set_selected(false);
            }
        }

        self.cursor += 1;
        if let Some(polygon) = arena.get_mut(next_id) {
            polygon.set_selected(true);
            viewport.add_polygon(polygon);
            if let Some(click) = polygon.click() {
                self.clicked_points.push(click);
            }
        }

        log::debug!("{}: displaying version {}/{}", self.name, self.cursor, self.version_count());
        true
    }

    /// Step back one version (undo).
    ///
    /// Stepping back from the first version returns to the root, where
    /// nothing is drawn. Returns `false` when already at the root.
    pub fn display_previous_mask_item(
        &mut self,
        arena: &mut PolygonArena,
        viewport: &mut dyn Viewport,
    ) -> bool {
        if self.has_nothing_displayed() {
            return false;
        }

        let current_id = self.chain[self.cursor];
        viewport.remove_polygon(current_id);
        if let Some(current) = arena.get_mut(current_id) {
            current.set_selected(false);
        }

        self.cursor -= 1;
        self.clicked_points.pop();

        if !self.has_nothing_displayed() {
            if let Some(polygon) = arena.get_mut(self.chain[self.cursor]) {
                polygon.set_selected(true);
                viewport.add_polygon(polygon);
            }
        }

        log::debug!("{}: displaying version {}/{}", self.name, self.cursor, self.version_count());
        true
    }

    /// True when the cursor is at the root placeholder.
    pub fn has_nothing_displayed(&self) -> bool {
        self.cursor == 0
    }

    pub fn unselect_current_mask(&self, arena: &mut PolygonArena, viewport: &mut dyn Viewport) {
        self.set_current_selected(false, arena, viewport);
    }

    pub fn select_current_mask(&self, arena: &mut PolygonArena, viewport: &mut dyn Viewport) {
        self.set_current_selected(true, arena, viewport);
    }

    fn set_current_selected(
        &self,
        selected: bool,
        arena: &mut PolygonArena,
        viewport: &mut dyn Viewport,
    ) {
        if self.has_nothing_displayed() {
            return;
        }
        if let Some(polygon) = arena.get_mut(self.chain[self.cursor]) {
            polygon.set_selected(selected);
            viewport.refresh_polygon(polygon);
        }
    }

    pub fn clicked_points(&self) -> &[ClickPoint] {
        &self.clicked_points
    }

    pub fn clicked_points_count(&self) -> usize {
        self.clicked_points.len()
    }

    /// Id of the displayed version, `None` at the root.
    pub fn displayed(&self) -> Option<PolygonId> {
        (!self.has_nothing_displayed()).then(|| self.chain[self.cursor])
    }

    pub fn displayed_polygon<'a>(&self, arena: &'a PolygonArena) -> Option<&'a Polygon> {
        self.displayed().and_then(|id| arena.get(id))
    }

    pub fn root(&self) -> PolygonId {
        self.chain[0]
    }

    /// Number of committed steps between the root and the displayed version.
    pub fn depth(&self) -> usize {
        self.cursor
    }

    /// Number of versions in the chain, excluding the root.
    pub fn version_count(&self) -> usize {
        self.chain.len() - 1
    }

    /// All ids in chain order, root first.
    pub fn chain(&self) -> &[PolygonId] {
        &self.chain
    }

    /// The version that superseded `id`, if any.
    pub fn next_of(&self, id: PolygonId) -> Option<PolygonId> {
        let index = self.chain.iter().position(|&c| c == id)?;
        self.chain.get(index + 1).copied()
    }

    /// The version `id` superseded, if any.
    pub fn previous_of(&self, id: PolygonId) -> Option<PolygonId> {
        let index = self.chain.iter().position(|&c| c == id)?;
        index.checked_sub(1).map(|i| self.chain[i])
    }

    /// Scene position of the click that started this annotation.
    pub fn seed_point(&self, arena: &PolygonArena) -> Option<Point> {
        self.chain
            .get(1)
            .and_then(|&id| arena.get(id))
            .map(|p| p.seed_point())
    }

    /// Remove the whole chain from the viewport and the arena.
    pub fn discard(self, arena: &mut PolygonArena, viewport: &mut dyn Viewport) {
        if let Some(id) = self.displayed() {
            viewport.remove_polygon(id);
        }
        for id in self.chain {
            arena.remove(id);
        }
        log::debug!("{}: discarded", self.name);
    }
}
