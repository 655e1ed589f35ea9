/// Result alias that carries the custom [`CanvasError`] type.
pub type Result<T> = std::result::Result<T, CanvasError>;

/// Common error type for the core crate.
///
/// None of these are fatal: the editor shell logs them and carries on with
/// the previous state.
#[derive(Debug, thiserror::Error)]
pub enum CanvasError {
    /// Width or height was zero, negative or not a number.
    #[error("invalid geometry: {width}x{height}")]
    InvalidGeometry { width: f64, height: f64 },
    /// A time window value could not be interpreted as seconds.
    #[error("invalid time window: {0}")]
    InvalidTimeWindow(String),
    /// An edit or transport operation arrived with nothing selected.
    #[error("no active object")]
    NoActiveObject,
    /// The rendering surface is not initialised yet.
    #[error("render surface unavailable")]
    ResourceUnavailable,
    /// The uploaded file is neither an image nor a video.
    #[error("unsupported media `{0}`")]
    UnsupportedMedia(String),
    /// Free-form message, mostly used by the command line front-end.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Configuration could not be parsed.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl CanvasError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for CanvasError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for CanvasError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
