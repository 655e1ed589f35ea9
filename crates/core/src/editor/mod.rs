//! Coordinating shell around the scene store and the playback engine.
//!
//! The editor owns the selection and the link between scene objects and the
//! display objects of a [`RenderSurface`]. Every mutation is applied to the
//! core state first and then pushed to the surface. If the surface is not
//! ready the push is skipped and retried on the next sync.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::{
    config::EditorConfig,
    media::{MediaHandle, MediaSource},
    render::{RenderSurface, SurfaceHandle},
    scene::{ObjectId, SceneStore, Size, TimeWindow},
    timeline::{Cadence, ManualCadence, PlaybackEngine, PlaybackState, TickOutcome, TimerId},
    CanvasError, Result,
};

pub struct Editor<S: RenderSurface, C: Cadence = ManualCadence> {
    engine: PlaybackEngine<C>,
    store: SceneStore,
    surface: S,
    handles: HashMap<ObjectId, SurfaceHandle>,
    selection: Option<ObjectId>,
    disposed: bool,
}

impl<S: RenderSurface, C: Cadence> Editor<S, C> {
    pub fn new(config: &EditorConfig, surface: S, cadence: C) -> Self {
        Self {
            engine: PlaybackEngine::new(cadence, config.playback.tick_interval()),
            store: SceneStore::new(config.canvas, config.placement),
            surface,
            handles: HashMap::new(),
            selection: None,
            disposed: false,
        }
    }

    pub fn store(&self) -> &SceneStore {
        &self.store
    }

    pub fn engine(&self) -> &PlaybackEngine<C> {
        &self.engine
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn clock(&self) -> u64 {
        self.engine.clock()
    }

    pub fn state(&self) -> PlaybackState {
        self.engine.state()
    }

    pub fn selection(&self) -> Option<ObjectId> {
        self.selection
    }

    /// Display object backing `id`, once the surface has created one.
    pub fn surface_handle(&self, id: ObjectId) -> Option<SurfaceHandle> {
        self.handles.get(&id).copied()
    }

    pub fn on_media_release(&mut self, revoker: impl FnMut(MediaHandle) + 'static) {
        self.store.on_media_release(revoker);
    }

    /// Places uploaded media on the canvas and makes it the active object.
    pub fn upload(&mut self, source: MediaSource) -> ObjectId {
        info!(name = %source.name, kind = ?source.kind, "uploading media");
        let id = self.store.add(source);
        self.selection = Some(id);
        self.sync_surface();
        id
    }

    /// Changes the active object. Unknown ids clear the selection.
    pub fn select(&mut self, id: Option<ObjectId>) {
        self.selection = id.filter(|id| self.store.get(*id).is_some());
        if id.is_some() && self.selection.is_none() {
            warn!(?id, "selected object does not exist");
        }
    }

    /// Selection notification coming from the surface.
    pub fn selection_changed(&mut self, handle: Option<SurfaceHandle>) {
        let id = handle.and_then(|handle| self.object_for(handle));
        self.select(id);
    }

    /// Pulls the geometry of a display object the user moved or scaled on
    /// the canvas back into the store. The object becomes active.
    pub fn object_transformed(&mut self, handle: SurfaceHandle) -> Result<()> {
        let id = self
            .object_for(handle)
            .ok_or_else(|| CanvasError::msg(format!("unknown display object {handle:?}")))?;
        let transform = self
            .surface
            .object_geometry(handle)
            .ok_or(CanvasError::ResourceUnavailable)?;

        self.selection = Some(id);
        if let Err(err) = self.store.apply_transform(id, transform) {
            // put the stored geometry back on screen
            self.sync_surface();
            return Err(err);
        }
        Ok(())
    }

    /// Size panel: resizes the active object to `size` pixels.
    pub fn resize_selection(&mut self, size: Size) -> Result<()> {
        let id = self.active()?;
        self.store.set_geometry(id, size)?;
        self.sync_surface();
        Ok(())
    }

    /// Timing panel: stores a new window on the active object and returns it
    /// as normalised.
    pub fn retime_selection(&mut self, start: f64, end: f64) -> Result<TimeWindow> {
        let id = self.active()?;
        let window = self
            .store
            .set_time_window(id, start, end)
            .ok_or(CanvasError::NoActiveObject)?;
        self.sync_surface();
        Ok(window)
    }

    /// Displayed size of the active object, rounded to whole pixels.
    pub fn size_panel(&self) -> Option<Size> {
        let object = self.store.get(self.selection?)?;
        let size = object.geometry().displayed_size();
        Some(Size::new(size.width.round(), size.height.round()))
    }

    pub fn timing_panel(&self) -> Option<TimeWindow> {
        self.store.get(self.selection?).map(|object| object.window())
    }

    pub fn can_play(&self) -> bool {
        self.selection.is_some() && !self.engine.is_running()
    }

    pub fn can_reset(&self) -> bool {
        self.engine.can_reset()
    }

    /// Starts playback bounded by the end time of the active object.
    pub fn play(&mut self) -> Result<()> {
        let bound = self
            .selection
            .and_then(|id| self.store.get(id))
            .map(|object| object.window().end());

        if !self.engine.play(bound, &mut self.store) {
            return Err(CanvasError::NoActiveObject);
        }
        info!(clock = self.engine.clock(), bound = self.engine.bound(), "play");
        self.sync_surface();
        Ok(())
    }

    pub fn pause(&mut self) -> bool {
        self.engine.pause()
    }

    pub fn reset(&mut self) -> bool {
        if !self.engine.reset(&mut self.store) {
            return false;
        }
        self.sync_surface();
        true
    }

    /// Delivers one cadence tick.
    pub fn tick(&mut self, timer: TimerId) -> TickOutcome {
        let outcome = self.engine.on_tick(timer, &mut self.store);
        if outcome != TickOutcome::Ignored {
            self.sync_surface();
        }
        outcome
    }

    /// Pushes geometry and visibility of every object to the surface and
    /// renders a frame. Returns whether the surface was updated.
    pub fn sync_surface(&mut self) -> bool {
        if !self.surface.is_ready() {
            debug!("surface not ready, deferring sync");
            return false;
        }

        match self.push_to_surface() {
            Ok(()) => true,
            Err(err) => {
                warn!(%err, "surface sync failed");
                false
            }
        }
    }

    /// Cancels the cadence, then releases every media handle.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.engine.dispose();
        self.store.dispose();
        self.disposed = true;
        debug!("editor disposed");
    }

    fn active(&self) -> Result<ObjectId> {
        self.selection.ok_or(CanvasError::NoActiveObject)
    }

    fn object_for(&self, handle: SurfaceHandle) -> Option<ObjectId> {
        self.handles
            .iter()
            .find(|(_, candidate)| **candidate == handle)
            .map(|(id, _)| *id)
    }

    fn push_to_surface(&mut self) -> Result<()> {
        for object in self.store.iter() {
            let transform = object.geometry().transform();
            let handle = match self.handles.get(&object.id()) {
                Some(handle) => *handle,
                None => {
                    let handle = self.surface.create_display_object(object.media(), transform)?;
                    self.handles.insert(object.id(), handle);
                    handle
                }
            };
            self.surface.set_object_geometry(handle, transform)?;
            self.surface.set_object_visible(handle, object.visible())?;
        }
        self.surface.render_frame()
    }
}

impl<S: RenderSurface, C: Cadence> Drop for Editor<S, C> {
    fn drop(&mut self) {
        self.dispose();
    }
}
