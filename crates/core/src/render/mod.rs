use serde::Serialize;

use crate::{media::MediaHandle, scene::Transform, CanvasError, Result};

/// Handle of a display object owned by a [`RenderSurface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SurfaceHandle(u64);

/// The 2D canvas that draws placed media.
///
/// Hit-testing and interactive transforms live behind this trait; the editor
/// only pushes geometry and visibility and asks for frames.
pub trait RenderSurface {
    /// Whether the surface has been initialised and accepts calls.
    fn is_ready(&self) -> bool;

    fn create_display_object(
        &mut self,
        media: MediaHandle,
        transform: Transform,
    ) -> Result<SurfaceHandle>;

    fn object_geometry(&self, handle: SurfaceHandle) -> Option<Transform>;

    fn set_object_geometry(&mut self, handle: SurfaceHandle, transform: Transform) -> Result<()>;

    fn set_object_visible(&mut self, handle: SurfaceHandle, visible: bool) -> Result<()>;

    fn render_frame(&mut self) -> Result<()>;
}

/// State of one display object as last pushed to a [`RecordingSurface`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayObject {
    pub handle: SurfaceHandle,
    pub media: MediaHandle,
    pub transform: Transform,
    pub visible: bool,
}

/// In-memory surface that keeps the pushed state and counts frames.
///
/// Used by the command line front-end and by tests. It can start out
/// uninitialised to model a canvas that is still loading.
#[derive(Debug)]
pub struct RecordingSurface {
    ready: bool,
    next: u64,
    objects: Vec<DisplayObject>,
    frames: usize,
}

impl Default for RecordingSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self {
            ready: true,
            next: 0,
            objects: Vec::new(),
            frames: 0,
        }
    }

    pub fn uninitialised() -> Self {
        Self {
            ready: false,
            ..Self::new()
        }
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn objects(&self) -> &[DisplayObject] {
        &self.objects
    }

    pub fn object(&self, handle: SurfaceHandle) -> Option<&DisplayObject> {
        self.objects.iter().find(|object| object.handle == handle)
    }

    /// Simulates the user dragging or scaling an object on the canvas.
    pub fn manipulate(&mut self, handle: SurfaceHandle, transform: Transform) -> Result<()> {
        self.object_mut(handle)?.transform = transform;
        Ok(())
    }

    fn object_mut(&mut self, handle: SurfaceHandle) -> Result<&mut DisplayObject> {
        if !self.ready {
            return Err(CanvasError::ResourceUnavailable);
        }
        self.objects
            .iter_mut()
            .find(|object| object.handle == handle)
            .ok_or_else(|| CanvasError::msg(format!("unknown display object {handle:?}")))
    }
}

impl RenderSurface for RecordingSurface {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn create_display_object(
        &mut self,
        media: MediaHandle,
        transform: Transform,
    ) -> Result<SurfaceHandle> {
        if !self.ready {
            return Err(CanvasError::ResourceUnavailable);
        }

        self.next += 1;
        let handle = SurfaceHandle(self.next);
        self.objects.push(DisplayObject {
            handle,
            media,
            transform,
            visible: true,
        });
        Ok(handle)
    }

    fn object_geometry(&self, handle: SurfaceHandle) -> Option<Transform> {
        self.object(handle).map(|object| object.transform)
    }

    fn set_object_geometry(&mut self, handle: SurfaceHandle, transform: Transform) -> Result<()> {
        self.object_mut(handle)?.transform = transform;
        Ok(())
    }

    fn set_object_visible(&mut self, handle: SurfaceHandle, visible: bool) -> Result<()> {
        self.object_mut(handle)?.visible = visible;
        Ok(())
    }

    fn render_frame(&mut self) -> Result<()> {
        if !self.ready {
            return Err(CanvasError::ResourceUnavailable);
        }
        self.frames += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MediaKind, MediaLibrary, MediaSource};

    fn transform() -> Transform {
        Transform {
            x: 1.0,
            y: 2.0,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }

    fn media() -> MediaHandle {
        let mut library = MediaLibrary::new();
        library.acquire(MediaSource::new("a.png", MediaKind::Image, 8.0, 8.0).unwrap())
    }

    #[test]
    fn records_pushed_state_and_frames() {
        let mut surface = RecordingSurface::new();
        let handle = surface.create_display_object(media(), transform()).unwrap();

        surface.set_object_visible(handle, false).unwrap();
        surface.render_frame().unwrap();

        let object = surface.object(handle).unwrap();
        assert!(!object.visible);
        assert_eq!(surface.object_geometry(handle), Some(transform()));
        assert_eq!(surface.frames(), 1);
    }

    #[test]
    fn uninitialised_surface_refuses_calls() {
        let mut surface = RecordingSurface::uninitialised();
        let err = surface.create_display_object(media(), transform()).unwrap_err();
        assert!(matches!(err, CanvasError::ResourceUnavailable));
        assert!(surface.render_frame().is_err());
        assert_eq!(surface.frames(), 0);

        surface.set_ready(true);
        assert!(surface.create_display_object(media(), transform()).is_ok());
    }
}
