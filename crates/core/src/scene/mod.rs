//! Authoritative store of the objects placed on the canvas.
//!
//! Each object carries its geometry and the time window during which it is
//! shown. Visibility is derived from the playback clock and only ever written
//! by [`SceneStore::recompute_visibility`].

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    config::{CanvasConfig, PlacementConfig},
    media::{MediaHandle, MediaKind, MediaLibrary, MediaSource},
    CanvasError, Result,
};

/// Stable identity of a placed object. Ids are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Position and scale as exchanged with the rendering surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub x: f64,
    pub y: f64,
    pub scale_x: f64,
    pub scale_y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub x: f64,
    pub y: f64,
    /// Size of the decoded media before scaling.
    pub intrinsic: Size,
    pub scale_x: f64,
    pub scale_y: f64,
}

impl Geometry {
    /// Effective on-screen size, `intrinsic * scale`.
    pub fn displayed_size(&self) -> Size {
        Size::new(
            self.intrinsic.width * self.scale_x,
            self.intrinsic.height * self.scale_y,
        )
    }

    pub fn transform(&self) -> Transform {
        Transform {
            x: self.x,
            y: self.y,
            scale_x: self.scale_x,
            scale_y: self.scale_y,
        }
    }
}

/// Inclusive interval of seconds during which an object is visible.
///
/// Both ends are finite and non-negative and `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeWindow {
    start: f64,
    end: f64,
}

impl TimeWindow {
    /// Coerces both values to non-negative seconds and swaps an inverted
    /// pair.
    pub fn new(start: f64, end: f64) -> Self {
        let (start, end) = (non_negative(start), non_negative(end));
        if Self::is_inverted(start, end) {
            Self {
                start: end,
                end: start,
            }
        } else {
            Self { start, end }
        }
    }

    /// Whether `new` would swap this pair once both ends are coerced.
    fn is_inverted(start: f64, end: f64) -> bool {
        non_negative(end) < non_negative(start)
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn contains(&self, clock: u64) -> bool {
        let clock = clock as f64;
        clock >= self.start && clock <= self.end
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self::new(0.0, 10.0)
    }
}

impl FromStr for TimeWindow {
    type Err = CanvasError;

    /// Parses `START..END`, e.g. `3..5` or `1.5..4`.
    fn from_str(s: &str) -> Result<Self> {
        let (start, end) = s
            .split_once("..")
            .ok_or_else(|| CanvasError::InvalidTimeWindow(format!("expected START..END, got `{s}`")))?;
        let parse = |value: &str| {
            value
                .trim()
                .parse::<f64>()
                .map_err(|_| CanvasError::InvalidTimeWindow(format!("`{value}` is not a number")))
        };
        Ok(Self::new(parse(start)?, parse(end)?))
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// An image or video placed on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneObject {
    id: ObjectId,
    kind: MediaKind,
    media: MediaHandle,
    geometry: Geometry,
    window: TimeWindow,
    visible: bool,
}

impl SceneObject {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn media(&self) -> MediaHandle {
        self.media
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }

    pub fn visible(&self) -> bool {
        self.visible
    }
}

/// Owns every placed object in insertion (z) order, together with the media
/// handles they were created from.
#[derive(Debug)]
pub struct SceneStore {
    canvas: CanvasConfig,
    placement: PlacementConfig,
    next_id: u64,
    clock: u64,
    objects: Vec<SceneObject>,
    media: MediaLibrary,
}

impl Default for SceneStore {
    fn default() -> Self {
        Self::new(CanvasConfig::default(), PlacementConfig::default())
    }
}

impl SceneStore {
    pub fn new(canvas: CanvasConfig, placement: PlacementConfig) -> Self {
        Self {
            canvas,
            placement,
            next_id: 0,
            clock: 0,
            objects: Vec::new(),
            media: MediaLibrary::new(),
        }
    }

    /// Places a new object using the default layout and time window and
    /// returns its id.
    ///
    /// Media larger than the placement box is shrunk to fit while keeping its
    /// aspect ratio, then centered on the canvas. The object starts out with
    /// the visibility of the most recently computed clock.
    pub fn add(&mut self, source: MediaSource) -> ObjectId {
        self.next_id += 1;
        let id = ObjectId(self.next_id);

        let intrinsic = Size::new(source.width, source.height);
        let fitted = fit_within(intrinsic, self.placement.max_width, self.placement.max_height);
        let geometry = Geometry {
            x: (self.canvas.width - fitted.width) / 2.0,
            y: (self.canvas.height - fitted.height) / 2.0,
            intrinsic,
            scale_x: fitted.width / intrinsic.width,
            scale_y: fitted.height / intrinsic.height,
        };
        let window = TimeWindow::new(self.placement.default_start, self.placement.default_end);
        let kind = source.kind;
        let media = self.media.acquire(source);

        debug!(%id, ?kind, ?geometry, "placed object");
        self.objects.push(SceneObject {
            id,
            kind,
            media,
            geometry,
            window,
            visible: window.contains(self.clock),
        });
        id
    }

    /// Resizes an object to `size` by recomputing its scale factors.
    ///
    /// Non-positive sizes are rejected and the previous geometry is kept.
    /// An unknown id is ignored.
    pub fn set_geometry(&mut self, id: ObjectId, size: Size) -> Result<()> {
        if !size.is_valid() {
            warn!(%id, width = size.width, height = size.height, "rejected resize");
            return Err(CanvasError::InvalidGeometry {
                width: size.width,
                height: size.height,
            });
        }

        if let Some(object) = self.get_mut(id) {
            let geometry = &mut object.geometry;
            geometry.scale_x = size.width / geometry.intrinsic.width;
            geometry.scale_y = size.height / geometry.intrinsic.height;
        }
        Ok(())
    }

    /// Moves an object without changing its scale.
    pub fn set_position(&mut self, id: ObjectId, x: f64, y: f64) -> Result<()> {
        if !(x.is_finite() && y.is_finite()) {
            return Err(CanvasError::InvalidGeometry {
                width: x,
                height: y,
            });
        }

        if let Some(object) = self.get_mut(id) {
            object.geometry.x = x;
            object.geometry.y = y;
        }
        Ok(())
    }

    /// Mirrors a move/scale performed directly on the rendering surface.
    pub fn apply_transform(&mut self, id: ObjectId, transform: Transform) -> Result<()> {
        let scale_ok = transform.scale_x.is_finite()
            && transform.scale_y.is_finite()
            && transform.scale_x > 0.0
            && transform.scale_y > 0.0;
        if !scale_ok {
            warn!(%id, ?transform, "rejected transform");
            return Err(CanvasError::InvalidGeometry {
                width: transform.scale_x,
                height: transform.scale_y,
            });
        }

        self.set_position(id, transform.x, transform.y)?;
        if let Some(object) = self.get_mut(id) {
            object.geometry.scale_x = transform.scale_x;
            object.geometry.scale_y = transform.scale_y;
        }
        Ok(())
    }

    /// Stores a new time window and returns it as normalised, or `None` if
    /// the id is unknown.
    ///
    /// Negative or non-numeric values become `0`; an end before the start is
    /// swapped with it. Visibility is left alone until the next
    /// [`recompute_visibility`](Self::recompute_visibility).
    pub fn set_time_window(&mut self, id: ObjectId, start: f64, end: f64) -> Option<TimeWindow> {
        let object = self.get_mut(id)?;
        let window = TimeWindow::new(start, end);
        if TimeWindow::is_inverted(start, end) {
            warn!(%id, start, end, "inverted time window swapped");
        }
        object.window = window;
        Some(window)
    }

    /// Derives `visible` for every object from `clock`.
    pub fn recompute_visibility(&mut self, clock: u64) {
        self.clock = clock;
        for object in &mut self.objects {
            object.visible = object.window.contains(clock);
        }
    }

    /// Snapshot of every object in insertion order.
    pub fn objects_as_list(&self) -> Vec<SceneObject> {
        self.objects.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.iter()
    }

    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.iter().find(|object| object.id == id)
    }

    fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|object| object.id == id)
    }

    /// Deletes an object and releases its media handle.
    pub fn remove(&mut self, id: ObjectId) -> Option<SceneObject> {
        let index = self.objects.iter().position(|object| object.id == id)?;
        let object = self.objects.remove(index);
        self.media.release(object.media);
        Some(object)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn media(&self) -> &MediaLibrary {
        &self.media
    }

    /// Registers the callback that frees host resources for each released
    /// media handle.
    pub fn on_media_release(&mut self, revoker: impl FnMut(MediaHandle) + 'static) {
        self.media.set_revoker(revoker);
    }

    /// Releases every media handle. Objects stay in place for inspection.
    pub fn dispose(&mut self) {
        let released = self.media.release_all();
        if released > 0 {
            debug!(released, "scene store disposed");
        }
    }
}

impl Drop for SceneStore {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn fit_within(size: Size, max_width: f64, max_height: f64) -> Size {
    let Size {
        mut width,
        mut height,
    } = size;

    if width > max_width {
        height *= max_width / width;
        width = max_width;
    }
    if height > max_height {
        width *= max_height / height;
        height = max_height;
    }
    Size::new(width, height)
}
