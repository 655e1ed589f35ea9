//! Core library for the Timed Canvas editor.
//!
//! Media placed on a 2-D canvas carries a visibility time window. A
//! scene-wide playback clock ticks once per second and decides which objects
//! are shown. The crate holds the scene model ([`SceneStore`]), the playback
//! state machine ([`PlaybackEngine`]) and a small shell ([`Editor`]) that
//! connects both to a rendering surface and a timer source, which are
//! supplied by the host through the [`RenderSurface`] and [`Cadence`] traits.

pub mod config;
pub mod editor;
pub mod error;
pub mod media;
pub mod render;
pub mod scene;
pub mod timeline;

pub use config::{CanvasConfig, EditorConfig, PlacementConfig, PlaybackConfig};
pub use editor::Editor;
pub use error::{CanvasError, Result};
pub use media::{MediaHandle, MediaKind, MediaLibrary, MediaSource};
pub use render::{DisplayObject, RecordingSurface, RenderSurface, SurfaceHandle};
pub use scene::{Geometry, ObjectId, SceneObject, SceneStore, Size, TimeWindow, Transform};
pub use timeline::{
    Cadence, ManualCadence, PlaybackClock, PlaybackEngine, PlaybackState, TickOutcome, TimerId,
};
