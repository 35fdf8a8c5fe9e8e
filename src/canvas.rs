//! Canvas coordinator.
//!
//! Turns pointer clicks into annotation edits: picking the target manager,
//! querying the segmenter, tracing the chosen mask and committing it as a new
//! version. Also owns undo/redo, erase, bulk recoloring and the background
//! jobs that read session state.

use std::path::{Path, PathBuf};

use image::RgbaImage;
use thiserror::Error;

use crate::config::AppConfig;
use crate::constants::{DEFAULT_GROUP, DEFAULT_MASK_COLOR};
use crate::contour::{ContourTracer, LargestContourTracer};
use crate::events::SessionEvent;
use crate::format::{ExportOptions, FormatError, FormatRegistry, ImportOptions, ProjectData};
use crate::jobs::{JobError, JobKind, JobOutput, JobReport, JobRunner};
use crate::model::{
    ClickPoint, ExportRecord, ManagerId, MaskBitmap, MaskStrength, Point, Polarity, Polygon,
    PolygonId, Rgba, ToolMode,
};
use crate::segment::{SegmentError, Segmenter, select_candidate};
use crate::session::AnnotationSession;
use crate::viewport::Viewport;

// ============================================================================
// Input
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Modifier keys relevant to the canvas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// Refine the current mask instead of starting a new one (Ctrl).
    pub append: bool,
}

/// A click in device coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub position: Point,
    pub button: MouseButton,
    pub modifiers: Modifiers,
}

impl PointerEvent {
    pub fn new(x: f32, y: f32, button: MouseButton) -> Self {
        Self {
            position: Point::new(x, y),
            button,
            modifiers: Modifiers::default(),
        }
    }

    pub fn left(x: f32, y: f32) -> Self {
        Self::new(x, y, MouseButton::Left)
    }

    pub fn right(x: f32, y: f32) -> Self {
        Self::new(x, y, MouseButton::Right)
    }

    pub fn with_append(mut self) -> Self {
        self.modifiers.append = true;
        self
    }
}

/// Why a click was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    OutsideImage,
    MiddleButton,
    RightClickWithoutAppend,
    /// Append click with no current, non-empty annotation.
    NothingToRefine,
    /// Erase click that hit no polygon.
    NothingUnderPointer,
    /// The target annotation disappeared before the mask was committed.
    AnnotationMissing,
}

/// What a click did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    Ignored(IgnoreReason),
    /// An existing annotation became current; nothing was edited.
    Selected(ManagerId),
    Created {
        manager: ManagerId,
        polygon: PolygonId,
    },
    Refined {
        manager: ManagerId,
        polygon: PolygonId,
    },
    Erased(ManagerId),
}

#[derive(Debug, Error)]
pub enum CanvasError {
    #[error("Busy: {} in progress", .0.name())]
    Busy(JobKind),

    #[error("No image loaded")]
    NoImage,

    #[error(transparent)]
    Segment(#[from] SegmentError),

    #[error(transparent)]
    Job(#[from] JobError),
}

// ============================================================================
// Canvas
// ============================================================================

/// Coordinates one open image, its annotations, the viewport and the model.
pub struct Canvas<V: Viewport, S: Segmenter> {
    session: AnnotationSession,
    viewport: V,
    segmenter: S,
    tracer: Box<dyn ContourTracer>,
    tool: ToolMode,
    strength: MaskStrength,
    mask_color: Rgba,
    /// Label for new versions; blank means the annotation name.
    label: String,
    group: String,
    image_path: Option<PathBuf>,
    export_options: ExportOptions,
    /// Viewport revision the segmenter embedding was computed for.
    embedded_revision: Option<u64>,
    events: Vec<SessionEvent>,
    jobs: JobRunner,
}

impl<V: Viewport, S: Segmenter> Canvas<V, S> {
    pub fn new(viewport: V, segmenter: S) -> Self {
        Self {
            session: AnnotationSession::new(),
            viewport,
            segmenter,
            tracer: Box::new(LargestContourTracer),
            tool: ToolMode::default(),
            strength: MaskStrength::default(),
            mask_color: DEFAULT_MASK_COLOR,
            label: String::new(),
            group: DEFAULT_GROUP.to_string(),
            image_path: None,
            export_options: ExportOptions::default(),
            embedded_revision: None,
            events: Vec::new(),
            jobs: JobRunner::new(),
        }
    }

    /// Replace the contour tracer.
    pub fn with_tracer(mut self, tracer: impl ContourTracer + 'static) -> Self {
        self.tracer = Box::new(tracer);
        self
    }

    /// Take brush color, strength, groups and COCO options from `config`.
    pub fn apply_config(&mut self, config: &AppConfig) {
        self.mask_color = config.preferences.default_mask_color;
        self.strength = config.preferences.mask_strength;
        self.export_options = self
            .export_options
            .clone()
            .category_name(config.coco.category_name.clone())
            .description(config.coco.description.clone());
        for group in &config.groups {
            self.session.add_group(group);
        }
    }

    // ------------------------------------------------------------------------
    // Clicks
    // ------------------------------------------------------------------------

    /// Handle one click. Dropped clicks are `Ok(ClickOutcome::Ignored(_))`.
    pub fn handle_click(&mut self, event: PointerEvent) -> Result<ClickOutcome, CanvasError> {
        self.ensure_idle()?;
        let (width, height) = self.viewport.image_size().ok_or(CanvasError::NoImage)?;

        let scene = self.viewport.map_to_scene(event.position);
        let inside = scene.x > 0.0
            && scene.x < width as f32
            && scene.y > 0.0
            && scene.y < height as f32;
        if !inside {
            log::debug!("Click at ({:.1}, {:.1}) is outside the image", scene.x, scene.y);
            return Ok(ClickOutcome::Ignored(IgnoreReason::OutsideImage));
        }
        if event.button == MouseButton::Middle {
            return Ok(ClickOutcome::Ignored(IgnoreReason::MiddleButton));
        }

        match self.tool {
            ToolMode::EraseMask => Ok(self.erase_at(scene)),
            ToolMode::CreateMask => self.create_or_refine(event, scene),
        }
    }

    fn erase_at(&mut self, scene: Point) -> ClickOutcome {
        let hit = self
            .viewport
            .items_at(scene)
            .into_iter()
            .find_map(|item| item.polygon_owner());
        let Some(owner) = hit else {
            return ClickOutcome::Ignored(IgnoreReason::NothingUnderPointer);
        };

        let name = self
            .session
            .manager(owner)
            .map(|m| m.name().to_string())
            .unwrap_or_default();
        self.session.remove_manager(owner, &mut self.viewport);
        log::info!("🗑️  Erased '{}'", name);
        self.events.push(SessionEvent::MaskRemoved { name });
        ClickOutcome::Erased(owner)
    }

    fn create_or_refine(
        &mut self,
        event: PointerEvent,
        scene: Point,
    ) -> Result<ClickOutcome, CanvasError> {
        let append = event.modifiers.append;

        if event.button == MouseButton::Left && !append {
            let hit = self
                .viewport
                .items_at(scene)
                .into_iter()
                .find_map(|item| item.polygon_owner());
            if let Some(owner) = hit {
                self.select_manager(owner);
                return Ok(ClickOutcome::Selected(owner));
            }
        }

        if event.button == MouseButton::Right && !append {
            return Ok(ClickOutcome::Ignored(IgnoreReason::RightClickWithoutAppend));
        }

        let target = if append {
            match self.session.current_manager() {
                Some(manager) if !manager.has_nothing_displayed() => Some(manager.id()),
                _ => {
                    log::warn!("Refinement click dropped: no mask to refine");
                    return Ok(ClickOutcome::Ignored(IgnoreReason::NothingToRefine));
                }
            }
        } else {
            None
        };
        let polarity = match (append, event.button) {
            (true, MouseButton::Right) => Polarity::Negative,
            _ => Polarity::Positive,
        };
        let click = ClickPoint::new(
            event.position.x.round(),
            event.position.y.round(),
            polarity,
        );

        self.ensure_embedding()?;

        let mut points: Vec<ClickPoint> = target
            .and_then(|id| self.session.manager(id))
            .map(|m| m.clicked_points().to_vec())
            .unwrap_or_default();
        let candidates = if points.is_empty() {
            self.segmenter.propose_from_point(click.x, click.y)?
        } else {
            points.push(click);
            self.segmenter.propose_from_points(&points)?
        };
        let chosen = select_candidate(candidates, self.strength)?;

        let manager_id = match target {
            Some(id) => id,
            None => {
                self.unselect_current();
                let id = self.session.new_manager();
                self.session.set_current(Some(id));
                id
            }
        };

        let Some(polygon) = self.commit_mask(manager_id, click, scene, chosen.mask) else {
            log::error!("Annotation {} vanished before its mask was committed", manager_id);
            return Ok(ClickOutcome::Ignored(IgnoreReason::AnnotationMissing));
        };

        let name = self
            .session
            .manager(manager_id)
            .map(|m| m.name().to_string())
            .unwrap_or_default();
        if target.is_some() {
            log::debug!("Refined '{}' with {:?} point", name, polarity);
            self.events.push(SessionEvent::MaskUpdated { name });
            Ok(ClickOutcome::Refined {
                manager: manager_id,
                polygon,
            })
        } else {
            log::info!("✏️  New mask '{}'", name);
            self.events.push(SessionEvent::MaskAdded { name });
            Ok(ClickOutcome::Created {
                manager: manager_id,
                polygon,
            })
        }
    }

    /// Build the next version of `manager_id` from `mask` and display it.
    fn commit_mask(
        &mut self,
        manager_id: ManagerId,
        click: ClickPoint,
        scene: Point,
        mask: MaskBitmap,
    ) -> Option<PolygonId> {
        let label = self.label.trim().to_string();
        let Self {
            session,
            viewport,
            tracer,
            mask_color,
            group,
            ..
        } = self;
        let (manager, arena) = session.manager_and_arena(manager_id)?;

        // Refinements keep the color of the version they replace.
        let color = manager
            .displayed_polygon(arena)
            .map(|p| p.color())
            .unwrap_or(*mask_color);
        let seed = manager.seed_point(arena).unwrap_or(scene);

        let mut polygon = Polygon::new(
            arena.allocate_id(),
            manager_id,
            manager.name(),
            color,
            click,
            seed,
            Some(group.clone()),
        );
        if !label.is_empty() {
            polygon.set_label(label);
        }
        polygon.set_geometry_from_mask(mask, tracer.as_ref(), &*viewport);

        let id = polygon.id();
        manager.append_mask_item(polygon, arena);
        manager.display_next_mask_item(arena, viewport);
        Some(id)
    }

    /// Re-embed the visible raster if the view changed since the last query.
    fn ensure_embedding(&mut self) -> Result<(), CanvasError> {
        let revision = self.viewport.revision();
        if self.embedded_revision == Some(revision) {
            return Ok(());
        }
        let visible = self.viewport.capture_visible().ok_or(CanvasError::NoImage)?;
        log::debug!(
            "View changed, embedding {}x{} visible raster",
            visible.width(),
            visible.height()
        );
        self.segmenter.set_image(&visible)?;
        self.embedded_revision = Some(revision);
        Ok(())
    }

    fn select_manager(&mut self, id: ManagerId) {
        self.unselect_current();
        self.session.set_current(Some(id));
        let Self {
            session,
            viewport,
            events,
            ..
        } = self;
        if let Some((manager, arena)) = session.manager_and_arena(id) {
            manager.select_current_mask(arena, viewport);
            events.push(SessionEvent::MaskSelected {
                name: manager.name().to_string(),
            });
        }
    }

    fn unselect_current(&mut self) {
        let Some(id) = self.session.current() else {
            return;
        };
        let Self {
            session, viewport, ..
        } = self;
        if let Some((manager, arena)) = session.manager_and_arena(id) {
            manager.unselect_current_mask(arena, viewport);
        }
    }

    // ------------------------------------------------------------------------
    // History and list actions
    // ------------------------------------------------------------------------

    /// Undo the last version of the current annotation.
    pub fn undo(&mut self) -> Result<bool, CanvasError> {
        self.ensure_idle()?;
        Ok(self.step_current(false))
    }

    /// Redo the next version of the current annotation.
    pub fn redo(&mut self) -> Result<bool, CanvasError> {
        self.ensure_idle()?;
        Ok(self.step_current(true))
    }

    fn step_current(&mut self, forward: bool) -> bool {
        let Some(id) = self.session.current() else {
            return false;
        };
        let Self {
            session,
            viewport,
            events,
            ..
        } = self;
        let Some((manager, arena)) = session.manager_and_arena(id) else {
            return false;
        };
        let was_empty = manager.has_nothing_displayed();
        let moved = if forward {
            manager.display_next_mask_item(arena, viewport)
        } else {
            manager.display_previous_mask_item(arena, viewport)
        };
        if !moved {
            return false;
        }

        // The list only shows annotations that draw something.
        let name = manager.name().to_string();
        let event = if was_empty {
            SessionEvent::MaskAdded { name }
        } else if manager.has_nothing_displayed() {
            SessionEvent::MaskRemoved { name }
        } else {
            SessionEvent::MaskUpdated { name }
        };
        events.push(event);
        true
    }

    /// Make the annotation called `name` current, as when picked from a list.
    pub fn select_by_name(&mut self, name: &str) -> Result<bool, CanvasError> {
        self.ensure_idle()?;
        let Some(id) = self.session.find_by_name(name) else {
            return Ok(false);
        };
        self.select_manager(id);
        Ok(true)
    }

    /// Recolor every displayed mask labelled `label`.
    pub fn recolor_label(&mut self, label: &str, color: Rgba) -> Result<usize, CanvasError> {
        self.ensure_idle()?;
        Ok(self.session.recolor_label(label, color, &mut self.viewport))
    }

    /// Give each label its own hue. Returns the assignment.
    pub fn auto_palette(&mut self) -> Result<Vec<(String, Rgba)>, CanvasError> {
        self.ensure_idle()?;
        let labels = self.session.unique_labels();
        let palette = Rgba::palette(labels.len(), self.mask_color.a);
        let assignment: Vec<(String, Rgba)> = labels.into_iter().zip(palette).collect();
        for (label, color) in &assignment {
            self.session.recolor_label(label, *color, &mut self.viewport);
        }
        Ok(assignment)
    }

    /// Forget all annotations and the image.
    pub fn close(&mut self) -> Result<(), CanvasError> {
        self.ensure_idle()?;
        self.reset();
        Ok(())
    }

    fn reset(&mut self) {
        self.session.clear();
        self.viewport.clear_polygons();
        self.viewport.clear_image();
        self.viewport.mark_moved();
        self.embedded_revision = None;
        self.image_path = None;
        log::info!("Session closed");
        self.events.push(SessionEvent::SessionClosed);
    }

    /// Open `image`, replacing the current session.
    pub fn load_image(
        &mut self,
        image: RgbaImage,
        path: Option<PathBuf>,
    ) -> Result<(), CanvasError> {
        self.ensure_idle()?;
        self.replace_image(image, path);
        Ok(())
    }

    fn replace_image(&mut self, image: RgbaImage, path: Option<PathBuf>) {
        if !self.session.is_empty() || self.viewport.image().is_some() {
            self.reset();
        }
        let (width, height) = image.dimensions();
        self.viewport.set_image(image);
        self.image_path = path;
        log::info!("📷 Loaded {}x{} image {:?}", width, height, self.image_path);
        self.events.push(SessionEvent::ImageLoaded { width, height });
    }

    /// Add one single-version annotation per record.
    ///
    /// With `keep_names` the stored names are reused and reserved; otherwise
    /// each record gets a freshly generated name.
    pub fn import_records(
        &mut self,
        records: &[ExportRecord],
        keep_names: bool,
    ) -> Result<Vec<ManagerId>, CanvasError> {
        self.ensure_idle()?;
        Ok(self.restore_records(records, keep_names))
    }

    fn restore_records(&mut self, records: &[ExportRecord], keep_names: bool) -> Vec<ManagerId> {
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            let id = self
                .session
                .restore_record(record, keep_names, &mut self.viewport);
            if let Some(manager) = self.session.manager(id) {
                self.events.push(SessionEvent::MaskAdded {
                    name: manager.name().to_string(),
                });
            }
            ids.push(id);
        }
        log::info!("Restored {} annotations", ids.len());
        ids
    }

    /// Snapshot of the image and displayed annotations.
    pub fn project_data(&self) -> ProjectData {
        let mut data = ProjectData::new().with_records(self.session.displayed_records());
        if let Some(image) = self.viewport.image() {
            data = data.with_image(image.clone());
        }
        if let Some(path) = &self.image_path {
            data = data.with_image_path(path.clone());
        }
        data
    }

    // ------------------------------------------------------------------------
    // Background jobs
    // ------------------------------------------------------------------------

    pub fn start_save(&mut self, path: impl Into<PathBuf>) -> Result<(), CanvasError> {
        self.start_write(JobKind::SaveProject, path.into())
    }

    pub fn start_export_image(&mut self, path: impl Into<PathBuf>) -> Result<(), CanvasError> {
        self.start_write(JobKind::ExportImage, path.into())
    }

    pub fn start_export_coco(&mut self, path: impl Into<PathBuf>) -> Result<(), CanvasError> {
        self.start_write(JobKind::ExportCoco, path.into())
    }

    pub fn start_export_shapefile(&mut self, path: impl Into<PathBuf>) -> Result<(), CanvasError> {
        self.start_write(JobKind::ExportShapefile, path.into())
    }

    pub fn start_load(&mut self, path: impl Into<PathBuf>) -> Result<(), CanvasError> {
        self.start_read(JobKind::LoadProject, path.into())
    }

    pub fn start_import_shapefile(&mut self, path: impl Into<PathBuf>) -> Result<(), CanvasError> {
        self.start_read(JobKind::ImportShapefile, path.into())
    }

    fn start_write(&mut self, kind: JobKind, path: PathBuf) -> Result<(), CanvasError> {
        self.ensure_idle()?;
        let data = self.project_data();
        let options = self.export_options.clone();

        self.jobs.start(kind, move || {
            let registry = FormatRegistry::new();
            let format = registry
                .get(kind.format_id())
                .ok_or_else(|| unknown_format(kind))?;
            let options = options.georef(data.georef());
            format.export(&data, &path, &options).map(JobOutput::Exported)
        })?;

        self.events.push(SessionEvent::JobStarted(kind));
        Ok(())
    }

    fn start_read(&mut self, kind: JobKind, path: PathBuf) -> Result<(), CanvasError> {
        self.ensure_idle()?;
        let image_path = self.image_path.clone();

        self.jobs.start(kind, move || {
            let registry = FormatRegistry::new();
            let format = registry
                .get(kind.format_id())
                .ok_or_else(|| unknown_format(kind))?;
            let georef = image_path.and_then(|p| ProjectData::new().with_image_path(p).georef());
            let data = format.import(&path, &ImportOptions::new().georef(georef))?;
            Ok(JobOutput::Loaded(Box::new(data)))
        })?;

        self.events.push(SessionEvent::JobStarted(kind));
        Ok(())
    }

    /// Collect a finished job without blocking and apply its result.
    pub fn poll_job(&mut self) -> Option<JobReport> {
        let report = self.jobs.poll()?;
        Some(self.complete_job(report))
    }

    /// Block until the running job finishes and apply its result.
    pub fn wait_job(&mut self) -> Option<JobReport> {
        let report = self.jobs.wait()?;
        Some(self.complete_job(report))
    }

    fn complete_job(&mut self, report: JobReport) -> JobReport {
        match &report.result {
            Ok(JobOutput::Loaded(data)) => {
                self.apply_loaded(report.kind, data);
                self.events.push(SessionEvent::JobFinished(report.kind));
            }
            Ok(JobOutput::Exported(_)) => {
                self.events.push(SessionEvent::JobFinished(report.kind));
            }
            Err(e) => {
                self.events.push(SessionEvent::JobFailed {
                    kind: report.kind,
                    message: e.to_string(),
                });
            }
        }
        report
    }

    fn apply_loaded(&mut self, kind: JobKind, data: &ProjectData) {
        match kind {
            JobKind::LoadProject => {
                if let Some(image) = &data.image {
                    self.replace_image(image.clone(), data.image_path.clone());
                }
                self.restore_records(&data.records, true);
            }
            _ => {
                self.restore_records(&data.records, false);
            }
        }
    }

    pub fn is_busy(&self) -> bool {
        self.jobs.is_busy()
    }

    pub fn active_job(&self) -> Option<JobKind> {
        self.jobs.active_kind()
    }

    fn ensure_idle(&self) -> Result<(), CanvasError> {
        match self.jobs.active_kind() {
            Some(kind) => Err(CanvasError::Busy(kind)),
            None => Ok(()),
        }
    }

    // ------------------------------------------------------------------------
    // Accessors and settings
    // ------------------------------------------------------------------------

    /// Take all queued notifications.
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Mark the view as changed (e.g. a side panel was toggled) so the next
    /// query re-embeds the visible raster.
    pub fn invalidate_view_cache(&mut self) {
        self.viewport.mark_moved();
    }

    pub fn session(&self) -> &AnnotationSession {
        &self.session
    }

    pub fn viewport(&self) -> &V {
        &self.viewport
    }

    /// Pan and zoom go through here; the viewport tracks its own revision.
    pub fn viewport_mut(&mut self) -> &mut V {
        &mut self.viewport
    }

    pub fn segmenter(&self) -> &S {
        &self.segmenter
    }

    pub fn segmenter_mut(&mut self) -> &mut S {
        &mut self.segmenter
    }

    pub fn tool(&self) -> ToolMode {
        self.tool
    }

    pub fn set_tool(&mut self, tool: ToolMode) {
        log::debug!("Tool: {}", tool.name());
        self.tool = tool;
    }

    pub fn cycle_tool(&mut self) -> ToolMode {
        self.set_tool(self.tool.next());
        self.tool
    }

    pub fn strength(&self) -> MaskStrength {
        self.strength
    }

    pub fn set_strength(&mut self, strength: MaskStrength) {
        self.strength = strength;
    }

    pub fn mask_color(&self) -> Rgba {
        self.mask_color
    }

    pub fn set_mask_color(&mut self, color: Rgba) {
        self.mask_color = color;
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    /// Use `group` for new versions, registering it if new. Blank selects
    /// the default group.
    pub fn set_group(&mut self, group: &str) {
        if group.is_empty() {
            self.group = DEFAULT_GROUP.to_string();
            return;
        }
        self.session.add_group(group);
        self.group = group.to_string();
    }

    pub fn image_path(&self) -> Option<&Path> {
        self.image_path.as_deref()
    }

    pub fn export_options(&self) -> &ExportOptions {
        &self.export_options
    }

    pub fn set_export_options(&mut self, options: ExportOptions) {
        self.export_options = options;
    }
}

fn unknown_format(kind: JobKind) -> FormatError {
    FormatError::UnsupportedOperation(format!("no '{}' format registered", kind.format_id()))
}
