use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use tracing::warn;

use crate::events::ImageSource;
use crate::params::WipeParams;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    /// Default picture shown at startup and on "reload".
    pub image: ImageOptions,
    /// Initial wipe parameters.
    pub wipe: WipeParams,
    pub loader: LoaderOptions,
    pub unsplash: UnsplashOptions,
    pub viewer: ViewerOptions,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(mut self) -> Result<Self> {
        ensure!(
            self.loader.max_dimension > 0,
            "loader.max-dimension must be greater than zero"
        );
        ensure!(
            self.loader.max_concurrent_loads > 0,
            "loader.max-concurrent-loads must be greater than zero"
        );
        self.unsplash.validate()?;
        self.viewer.validate()?;

        let clamped = self.wipe.clamped();
        if clamped != self.wipe {
            warn!(?clamped, "wipe parameters were outside their bounds; clamped");
            self.wipe = clamped;
        }
        Ok(self)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            image: ImageOptions::default(),
            wipe: WipeParams::default(),
            loader: LoaderOptions::default(),
            unsplash: UnsplashOptions::default(),
            viewer: ViewerOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ImageOptions {
    /// Color picture.
    pub color: PathBuf,
    /// Optional precomputed grayscale companion; must match `color` in size.
    pub gray: Option<PathBuf>,
    /// Reload when either file changes on disk.
    pub watch: bool,
}

impl ImageOptions {
    pub fn source(&self) -> ImageSource {
        ImageSource::Bundled {
            color: self.color.clone(),
            gray: self.gray.clone(),
        }
    }

    pub fn watched_paths(&self) -> Vec<PathBuf> {
        let mut paths = vec![self.color.clone()];
        paths.extend(self.gray.iter().cloned());
        paths
    }
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            color: PathBuf::from("assets/image-color.jpg"),
            gray: None,
            watch: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct LoaderOptions {
    /// Longest edge a decoded image may keep; larger images are downscaled.
    pub max_dimension: u32,
    /// Maximum number of loads running at once.
    pub max_concurrent_loads: usize,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            max_dimension: 4096,
            max_concurrent_loads: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Orientation {
    #[default]
    Landscape,
    Portrait,
    Squarish,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Landscape => "landscape",
            Self::Portrait => "portrait",
            Self::Squarish => "squarish",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct UnsplashOptions {
    /// API base URL.
    pub endpoint: String,
    /// Access key; takes precedence over `access-key-env`.
    pub access_key: Option<String>,
    /// Environment variable consulted when `access-key` is unset.
    pub access_key_env: String,
    /// Topics a random photo is drawn from.
    pub queries: Vec<String>,
    pub orientation: Orientation,
    /// Per-request limit; the API call and the image download each get this long.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl UnsplashOptions {
    fn default_queries() -> Vec<String> {
        [
            "climate change",
            "wildfire",
            "flood",
            "drought",
            "melting ice",
            "heatwave",
            "storm",
            "nature",
        ]
        .iter()
        .map(|q| q.to_string())
        .collect()
    }

    /// Access key from the config file, falling back to the environment.
    pub fn resolve_access_key(&self) -> Option<String> {
        self.access_key
            .clone()
            .or_else(|| std::env::var(&self.access_key_env).ok())
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            !self.endpoint.trim().is_empty(),
            "unsplash.endpoint must not be empty"
        );
        ensure!(
            self.queries.iter().any(|q| !q.trim().is_empty()),
            "unsplash.queries must contain at least one topic"
        );
        ensure!(
            self.timeout > Duration::ZERO,
            "unsplash.timeout must be positive"
        );
        Ok(())
    }
}

// Hand-written so the access key never reaches the startup log.
impl fmt::Debug for UnsplashOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnsplashOptions")
            .field("endpoint", &self.endpoint)
            .field("access_key", &self.access_key.as_ref().map(|_| "<redacted>"))
            .field("access_key_env", &self.access_key_env)
            .field("queries", &self.queries)
            .field("orientation", &self.orientation)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for UnsplashOptions {
    fn default() -> Self {
        Self {
            endpoint: "https://api.unsplash.com".to_string(),
            access_key: None,
            access_key_env: "UNSPLASH_ACCESS_KEY".to_string(),
            queries: Self::default_queries(),
            orientation: Orientation::default(),
            timeout: Duration::from_secs(15),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ViewerOptions {
    pub title: String,
    pub fullscreen: bool,
    /// Panel steps moved per arrow key press.
    pub nudge_steps: i32,
    /// Panel steps moved per arrow key press with Shift held.
    pub coarse_nudge_steps: i32,
}

impl ViewerOptions {
    fn validate(&self) -> Result<()> {
        ensure!(self.nudge_steps > 0, "viewer.nudge-steps must be positive");
        ensure!(
            self.coarse_nudge_steps > 0,
            "viewer.coarse-nudge-steps must be positive"
        );
        Ok(())
    }
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            title: "MaskKing".to_string(),
            fullscreen: false,
            nudge_steps: 10,
            coarse_nudge_steps: 100,
        }
    }
}
