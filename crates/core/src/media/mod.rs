use std::{collections::HashMap, fmt, path::Path};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{CanvasError, Result};

/// Kind of media an object was created from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classifies a MIME type such as `image/png` or `video/mp4`.
    pub fn from_mime(mime: &str) -> Result<Self> {
        if mime.starts_with("image/") {
            Ok(Self::Image)
        } else if mime.starts_with("video/") {
            Ok(Self::Video)
        } else {
            Err(CanvasError::UnsupportedMedia(mime.to_string()))
        }
    }

    /// Classifies a file by its extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "png" | "jpg" | "jpeg" | "gif" | "webp" | "bmp" | "svg" => Ok(Self::Image),
            "mp4" | "webm" | "mov" | "mkv" | "avi" | "ogv" => Ok(Self::Video),
            _ => Err(CanvasError::UnsupportedMedia(path.display().to_string())),
        }
    }
}

/// Decoded description of an uploaded file: what it is and how large it is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaSource {
    pub name: String,
    pub kind: MediaKind,
    pub width: f64,
    pub height: f64,
}

impl MediaSource {
    /// Builds a source, rejecting non-positive intrinsic sizes.
    pub fn new(name: impl Into<String>, kind: MediaKind, width: f64, height: f64) -> Result<Self> {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(CanvasError::InvalidGeometry { width, height });
        }

        Ok(Self {
            name: name.into(),
            kind,
            width,
            height,
        })
    }
}

/// Temporary handle to an uploaded file, valid until released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MediaHandle(u64);

impl fmt::Display for MediaHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "media://{}", self.0)
    }
}

/// Called with every handle the library gives back, so the host can free
/// whatever it created for the upload.
pub type Revoker = Box<dyn FnMut(MediaHandle)>;

/// Registry of every handle handed out for uploaded media.
#[derive(Default)]
pub struct MediaLibrary {
    next: u64,
    live: HashMap<MediaHandle, MediaSource>,
    revoker: Option<Revoker>,
}

impl MediaLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_revoker(&mut self, revoker: impl FnMut(MediaHandle) + 'static) {
        self.revoker = Some(Box::new(revoker));
    }

    pub fn acquire(&mut self, source: MediaSource) -> MediaHandle {
        self.next += 1;
        let handle = MediaHandle(self.next);
        debug!(%handle, name = %source.name, "acquired media handle");
        self.live.insert(handle, source);
        handle
    }

    /// Revokes a handle. Returns `false` if it was already released.
    pub fn release(&mut self, handle: MediaHandle) -> bool {
        let released = self.live.remove(&handle).is_some();
        if released {
            self.revoke(handle);
        }
        released
    }

    pub fn release_all(&mut self) -> usize {
        let mut handles: Vec<MediaHandle> = self.live.drain().map(|(handle, _)| handle).collect();
        handles.sort();
        for handle in &handles {
            self.revoke(*handle);
        }
        handles.len()
    }

    pub fn source(&self, handle: MediaHandle) -> Option<&MediaSource> {
        self.live.get(&handle)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    fn revoke(&mut self, handle: MediaHandle) {
        debug!(%handle, "released media handle");
        if let Some(revoker) = self.revoker.as_mut() {
            revoker(handle);
        }
    }
}

impl fmt::Debug for MediaLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaLibrary")
            .field("next", &self.next)
            .field("live", &self.live)
            .field("revoker", &self.revoker.is_some())
            .finish()
    }
}
