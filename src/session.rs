//! Annotation session: all managers for one open image.

use std::collections::HashSet;

use crate::constants::{DEFAULT_GROUP, MASK_NAME_PREFIX};
use crate::history::{PolygonArena, PolygonManager};
use crate::model::{ExportRecord, ManagerId, Polygon, Rgba};
use crate::viewport::Viewport;

/// Generates `mask{N}` names, skipping reserved ones.
#[derive(Debug, Clone)]
pub struct NameAllocator {
    counter: u64,
    reserved: HashSet<String>,
}

impl Default for NameAllocator {
    fn default() -> Self {
        Self {
            counter: 1,
            reserved: HashSet::new(),
        }
    }
}

impl NameAllocator {
    /// Next free generated name. The counter never goes back.
    pub fn allocate(&mut self) -> String {
        let mut name = format!("{MASK_NAME_PREFIX}{}", self.counter);
        while self.reserved.contains(&name) {
            self.counter += 1;
            name = format!("{MASK_NAME_PREFIX}{}", self.counter);
        }
        self.counter += 1;
        self.reserved.insert(name.clone());
        name
    }

    /// Mark an externally supplied name as used.
    pub fn reserve(&mut self, name: impl Into<String>) {
        self.reserved.insert(name.into());
    }

    pub fn is_reserved(&self, name: &str) -> bool {
        self.reserved.contains(name)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Managers, polygon storage, selection and identifiers of one image.
#[derive(Debug, Clone)]
pub struct AnnotationSession {
    managers: Vec<PolygonManager>,
    arena: PolygonArena,
    current: Option<ManagerId>,
    names: NameAllocator,
    next_manager_id: ManagerId,
    groups: Vec<String>,
}

impl Default for AnnotationSession {
    fn default() -> Self {
        Self::new()
    }
}

impl AnnotationSession {
    pub fn new() -> Self {
        Self {
            managers: Vec::new(),
            arena: PolygonArena::new(),
            current: None,
            names: NameAllocator::default(),
            next_manager_id: 1,
            groups: vec![DEFAULT_GROUP.to_string()],
        }
    }

    /// Start a new annotation with a generated name.
    pub fn new_manager(&mut self) -> ManagerId {
        let name = self.names.allocate();
        self.push_manager(name)
    }

    /// Start a new annotation with a given name (loaded data), reserving it.
    pub fn new_manager_named(&mut self, name: &str) -> ManagerId {
        self.names.reserve(name);
        self.push_manager(name.to_string())
    }

    fn push_manager(&mut self, name: String) -> ManagerId {
        let id = self.next_manager_id;
        self.next_manager_id += 1;
        log::debug!("New annotation '{}' (manager {})", name, id);
        self.managers.push(PolygonManager::new(id, name, &mut self.arena));
        id
    }

    /// Remove a manager and its whole chain. Its name stays reserved.
    pub fn remove_manager(&mut self, id: ManagerId, viewport: &mut dyn Viewport) -> bool {
        let Some(index) = self.managers.iter().position(|m| m.id() == id) else {
            return false;
        };
        let manager = self.managers.remove(index);
        manager.discard(&mut self.arena, viewport);
        if self.current == Some(id) {
            self.current = None;
        }
        true
    }

    /// Insert a single-version annotation from a persisted record.
    ///
    /// With `keep_name` the record's name is reused and reserved; otherwise a
    /// fresh name is generated.
    pub fn restore_record(
        &mut self,
        record: &ExportRecord,
        keep_name: bool,
        viewport: &mut dyn Viewport,
    ) -> ManagerId {
        let manager_id = if keep_name && !record.name.is_empty() {
            self.new_manager_named(&record.name)
        } else {
            self.new_manager()
        };
        let name = self
            .manager(manager_id)
            .map(|m| m.name().to_string())
            .unwrap_or_default();
        let mut record = ExportRecord {
            name,
            ..record.clone()
        };
        if record.display_name.is_empty() {
            record.display_name = record.name.clone();
        }
        let polygon = Polygon::from_export_record(self.arena.allocate_id(), manager_id, &record);

        let Self { managers, arena, .. } = self;
        if let Some(manager) = managers.iter_mut().find(|m| m.id() == manager_id) {
            manager.append_mask_item(polygon, arena);
            manager.display_next_mask_item(arena, viewport);
            manager.unselect_current_mask(arena, viewport);
        }
        manager_id
    }

    pub fn managers(&self) -> &[PolygonManager] {
        &self.managers
    }

    pub fn manager(&self, id: ManagerId) -> Option<&PolygonManager> {
        self.managers.iter().find(|m| m.id() == id)
    }

    /// Mutable access to a manager together with the arena it draws from.
    pub fn manager_and_arena(
        &mut self,
        id: ManagerId,
    ) -> Option<(&mut PolygonManager, &mut PolygonArena)> {
        let Self { managers, arena, .. } = self;
        managers.iter_mut().find(|m| m.id() == id).map(|m| (m, arena))
    }

    pub fn find_by_name(&self, name: &str) -> Option<ManagerId> {
        self.managers.iter().find(|m| m.name() == name).map(|m| m.id())
    }

    pub fn arena(&self) -> &PolygonArena {
        &self.arena
    }

    pub fn arena_mut(&mut self) -> &mut PolygonArena {
        &mut self.arena
    }

    pub fn current(&self) -> Option<ManagerId> {
        self.current
    }

    pub fn set_current(&mut self, id: Option<ManagerId>) {
        self.current = id;
    }

    pub fn current_manager(&self) -> Option<&PolygonManager> {
        self.current.and_then(|id| self.manager(id))
    }

    pub fn names(&self) -> &NameAllocator {
        &self.names
    }

    pub fn reserve_name(&mut self, name: &str) {
        self.names.reserve(name);
    }

    /// Displayed polygons of all managers, in creation order.
    pub fn displayed_polygons(&self) -> impl Iterator<Item = &Polygon> {
        self.managers
            .iter()
            .filter_map(|m| m.displayed_polygon(&self.arena))
    }

    /// Export records of every displayed mask.
    pub fn displayed_records(&self) -> Vec<ExportRecord> {
        self.displayed_polygons().map(|p| p.to_export_record()).collect()
    }

    /// Distinct labels of displayed masks, in first-seen order.
    pub fn unique_labels(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.displayed_polygons()
            .filter(|p| seen.insert(p.label().to_string()))
            .map(|p| p.label().to_string())
            .collect()
    }

    /// Recolor every displayed polygon carrying `label`. Returns how many
    /// polygons changed.
    pub fn recolor_label(&mut self, label: &str, color: Rgba, viewport: &mut dyn Viewport) -> usize {
        let ids: Vec<_> = self.managers.iter().filter_map(|m| m.displayed()).collect();
        let mut changed = 0;
        for id in ids {
            if let Some(polygon) = self.arena.get_mut(id) {
                if polygon.label() == label {
                    polygon.set_color(color);
                    viewport.refresh_polygon(polygon);
                    changed += 1;
                }
            }
        }
        log::info!("Recolored {} masks labelled '{}'", changed, label);
        changed
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    /// Add a group unless an identical string is already present.
    pub fn add_group(&mut self, group: &str) -> bool {
        if group.is_empty() || self.groups.iter().any(|g| g == group) {
            return false;
        }
        self.groups.push(group.to_string());
        true
    }

    /// Drop all managers, polygons, names and selection. Groups are kept.
    pub fn clear(&mut self) {
        self.managers.clear();
        self.arena.clear();
        self.current = None;
        self.names.reset();
    }

    pub fn len(&self) -> usize {
        self.managers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }
}
