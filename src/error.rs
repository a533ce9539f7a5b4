use thiserror::Error;

/// Reasons an image source can fail to deliver a new picture.
///
/// None of these are fatal: the viewer keeps showing the current image.
#[derive(Debug, Error)]
pub enum AcquireError {
    /// No Unsplash access key was configured or exported.
    #[error("missing Unsplash access key (set {env} or unsplash.access-key)")]
    MissingCredentials { env: String },

    /// The remote API answered with a non-success status.
    #[error("Unsplash error {status}: {message}")]
    Remote { status: u16, message: String },

    /// The API response did not name a downloadable image.
    #[error("Unsplash response did not include an image URL")]
    NoImageUrl,

    /// A color/grayscale pair that cannot be composited together.
    #[error("grayscale image is {gray:?} but color image is {color:?}")]
    DimensionMismatch { color: (u32, u32), gray: (u32, u32) },

    /// Transport failure talking to the remote source.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// The API response body was not the expected JSON.
    #[error("malformed Unsplash response: {0}")]
    Json(#[from] serde_json::Error),

    /// The bytes could not be decoded as an image.
    #[error(transparent)]
    Decode(#[from] image::ImageError),

    /// Downscaling a decoded image failed.
    #[error("resize failed: {0}")]
    Resize(String),

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A background decode task panicked or was cancelled.
    #[error("image task failed: {0}")]
    Task(String),
}
