use std::fmt;
use std::path::PathBuf;

use image::{GrayImage, RgbaImage};

use crate::error::AcquireError;

/// Where a picture should come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// The configured default pair; `gray` is an optional precomputed companion.
    Bundled { color: PathBuf, gray: Option<PathBuf> },
    /// A single user-chosen file.
    File(PathBuf),
    /// A random photo for `topic` from the remote photo API.
    Remote { topic: String },
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bundled { color, .. } => write!(f, "bundled {}", color.display()),
            Self::File(path) => write!(f, "file {}", path.display()),
            Self::Remote { topic } => write!(f, "remote \"{topic}\""),
        }
    }
}

/// Shown when the bundled pair has not been generated yet.
pub const MISSING_ASSETS_HINT: &str =
    "bundled images not found; create them with `cargo run -p asset-gen`";

impl ImageSource {
    /// Guidance for `error` when it means the bundled files do not exist.
    pub fn missing_hint(&self, error: &AcquireError) -> Option<&'static str> {
        match (self, error) {
            (Self::Bundled { .. }, AcquireError::Io(err))
                if err.kind() == std::io::ErrorKind::NotFound =>
            {
                Some(MISSING_ASSETS_HINT)
            }
            _ => None,
        }
    }
}

/// Credit line shown next to remotely sourced photos.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribution {
    pub text: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct LoadImage {
    pub generation: u64,
    pub source: ImageSource,
}

/// Decoded pixels ready for compositing; `gray` always matches `color` in size.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub color: RgbaImage,
    pub gray: Option<GrayImage>,
}

impl PreparedImage {
    pub fn dimensions(&self) -> (u32, u32) {
        self.color.dimensions()
    }
}

#[derive(Debug)]
pub struct ImageLoaded {
    pub generation: u64,
    pub source: ImageSource,
    pub prepared: PreparedImage,
    pub attribution: Option<Attribution>,
}

#[derive(Debug)]
pub struct LoadFailed {
    pub generation: u64,
    pub source: ImageSource,
    pub error: AcquireError,
}

#[derive(Debug)]
pub enum LoadOutcome {
    Loaded(ImageLoaded),
    Failed(LoadFailed),
}

impl LoadOutcome {
    pub fn generation(&self) -> u64 {
        match self {
            Self::Loaded(loaded) => loaded.generation,
            Self::Failed(failed) => failed.generation,
        }
    }
}
