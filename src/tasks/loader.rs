use std::io::Cursor;
use std::path::Path;

use anyhow::Result;
use fast_image_resize as fir;
use image::{GrayImage, ImageBuffer, Pixel, RgbaImage, imageops};
use tokio::select;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::LoaderOptions;
use crate::error::AcquireError;
use crate::events::{
    Attribution, ImageLoaded, ImageSource, LoadFailed, LoadImage, LoadOutcome, PreparedImage,
};
use crate::processing::layout::fit_within;
use crate::tasks::unsplash::UnsplashClient;

/// Decodes an image to RGBA8 and applies EXIF orientation if available.
pub fn decode_rgba8_apply_exif(bytes: &[u8]) -> Result<RgbaImage, AcquireError> {
    let img = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .decode()?
        .to_rgba8();
    Ok(apply_orientation(img, read_orientation(bytes).unwrap_or(1)))
}

fn decode_luma8_apply_exif(bytes: &[u8]) -> Result<GrayImage, AcquireError> {
    let img = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .decode()?
        .to_luma8();
    Ok(apply_orientation(img, read_orientation(bytes).unwrap_or(1)))
}

fn apply_orientation<P>(
    img: ImageBuffer<P, Vec<P::Subpixel>>,
    orientation: u16,
) -> ImageBuffer<P, Vec<P::Subpixel>>
where
    P: Pixel + 'static,
{
    match orientation {
        2 => imageops::flip_horizontal(&img),
        3 => imageops::rotate180(&img),
        4 => imageops::flip_vertical(&img),
        // transpose
        5 => imageops::flip_horizontal(&imageops::rotate90(&img)),
        6 => imageops::rotate90(&img),
        // transverse
        7 => imageops::flip_horizontal(&imageops::rotate270(&img)),
        8 => imageops::rotate270(&img),
        _ => img,
    }
}

fn read_orientation(bytes: &[u8]) -> Option<u16> {
    let mut cursor = Cursor::new(bytes);
    let exif = exif::Reader::new().read_from_container(&mut cursor).ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    let orientation = field.value.get_uint(0)? as u16;
    debug!(orientation, "exif orientation");
    Some(orientation)
}

fn resize_rgba(source: RgbaImage, target_w: u32, target_h: u32) -> Result<RgbaImage, AcquireError> {
    if source.dimensions() == (target_w, target_h) {
        return Ok(source);
    }
    let src_view = fir::images::ImageRef::new(
        source.width(),
        source.height(),
        source.as_raw(),
        fir::PixelType::U8x4,
    )
    .map_err(|err| AcquireError::Resize(err.to_string()))?;
    let mut dst_image = fir::images::Image::new(target_w, target_h, fir::PixelType::U8x4);
    let options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::CatmullRom));
    fir::Resizer::new()
        .resize(&src_view, &mut dst_image, Some(&options))
        .map_err(|err| AcquireError::Resize(err.to_string()))?;
    RgbaImage::from_raw(target_w, target_h, dst_image.into_vec())
        .ok_or_else(|| AcquireError::Resize("resized buffer has the wrong length".into()))
}

/// Pair the color image with an optional grayscale companion and bring both
/// within `max_dimension` on their long edge.
pub fn prepare(
    color: RgbaImage,
    gray: Option<GrayImage>,
    max_dimension: u32,
) -> Result<PreparedImage, AcquireError> {
    if let Some(gray) = gray.as_ref() {
        if gray.dimensions() != color.dimensions() {
            return Err(AcquireError::DimensionMismatch {
                color: color.dimensions(),
                gray: gray.dimensions(),
            });
        }
    }

    let (width, height) = color.dimensions();
    let (target_w, target_h) = fit_within(width, height, max_dimension);
    if (target_w, target_h) == (width, height) {
        return Ok(PreparedImage { color, gray });
    }

    debug!(width, height, target_w, target_h, "downscaling decoded image");
    let color = resize_rgba(color, target_w, target_h)?;
    // fast_image_resize is built for U8x4 only; the single-channel companion
    // goes through image's resampler with the same filter.
    let gray =
        gray.map(|g| imageops::resize(&g, target_w, target_h, imageops::FilterType::CatmullRom));
    Ok(PreparedImage { color, gray })
}

fn load_bundled(
    color: &Path,
    gray: Option<&Path>,
    max_dimension: u32,
) -> Result<PreparedImage, AcquireError> {
    let color = decode_rgba8_apply_exif(&std::fs::read(color)?)?;
    let gray = match gray {
        Some(path) => Some(decode_luma8_apply_exif(&std::fs::read(path)?)?),
        None => None,
    };
    prepare(color, gray, max_dimension)
}

fn load_file(path: &Path, max_dimension: u32) -> Result<PreparedImage, AcquireError> {
    let color = decode_rgba8_apply_exif(&std::fs::read(path)?)?;
    prepare(color, None, max_dimension)
}

async fn blocking<T, F>(f: F) -> Result<T, AcquireError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, AcquireError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| AcquireError::Task(err.to_string()))?
}

/// Resolve one source into decoded pixels plus the credit line it carries.
pub async fn acquire(
    source: &ImageSource,
    unsplash: &UnsplashClient,
    max_dimension: u32,
) -> Result<(PreparedImage, Option<Attribution>), AcquireError> {
    match source {
        ImageSource::Bundled { color, gray } => {
            let color = color.clone();
            let gray = gray.clone();
            let prepared =
                blocking(move || load_bundled(&color, gray.as_deref(), max_dimension)).await?;
            Ok((prepared, None))
        }
        ImageSource::File(path) => {
            let path = path.clone();
            let prepared = blocking(move || load_file(&path, max_dimension)).await?;
            Ok((prepared, None))
        }
        ImageSource::Remote { topic } => {
            let photo = unsplash.random_photo(topic).await?;
            debug!(url = %photo.image_url, "downloading remote photo");
            let bytes = unsplash.download(&photo.image_url).await?;
            let prepared = blocking(move || {
                let color = decode_rgba8_apply_exif(&bytes)?;
                prepare(color, None, max_dimension)
            })
            .await?;
            Ok((prepared, Some(photo.attribution)))
        }
    }
}

/// Accepts load requests, resolves them concurrently (up to
/// `max-concurrent-loads` at a time) and reports every outcome tagged with the
/// request's generation. Requests still waiting in the queue when a slot frees
/// up collapse to the newest one. Outcomes arrive in completion order; the
/// receiver decides which one is current.
pub async fn run(
    mut load_rx: Receiver<LoadImage>,
    to_viewer: Sender<LoadOutcome>,
    cancel: CancellationToken,
    options: LoaderOptions,
    unsplash: UnsplashClient,
) -> Result<()> {
    let max_in_flight = options.max_concurrent_loads.max(1);
    let mut tasks: JoinSet<LoadOutcome> = JoinSet::new();
    let mut accepting = true;

    loop {
        if !accepting && tasks.is_empty() {
            debug!("request channel closed and nothing in flight; stopping loader");
            break;
        }
        select! {
            _ = cancel.cancelled() => break,

            request = load_rx.recv(), if accepting && tasks.len() < max_in_flight => {
                let Some(mut request) = request else {
                    accepting = false;
                    continue;
                };
                // anything still queued behind this one supersedes it
                while let Ok(newer) = load_rx.try_recv() {
                    debug!(
                        generation = request.generation,
                        newer = newer.generation,
                        "skipping superseded load"
                    );
                    request = newer;
                }
                let LoadImage { generation, source } = request;
                debug!(generation, %source, "load requested");
                let unsplash = unsplash.clone();
                let max_dimension = options.max_dimension;
                tasks.spawn(async move {
                    match acquire(&source, &unsplash, max_dimension).await {
                        Ok((prepared, attribution)) => LoadOutcome::Loaded(ImageLoaded {
                            generation,
                            source,
                            prepared,
                            attribution,
                        }),
                        Err(error) => LoadOutcome::Failed(LoadFailed {
                            generation,
                            source,
                            error,
                        }),
                    }
                });
            }

            Some(joined) = tasks.join_next() => {
                let outcome = match joined {
                    Ok(outcome) => outcome,
                    Err(err) => {
                        warn!(error = %err, "load task aborted");
                        continue;
                    }
                };
                match &outcome {
                    LoadOutcome::Loaded(loaded) => {
                        let (width, height) = loaded.prepared.dimensions();
                        info!(
                            generation = loaded.generation,
                            source = %loaded.source,
                            width,
                            height,
                            "image loaded"
                        );
                    }
                    LoadOutcome::Failed(failed) => {
                        warn!(
                            generation = failed.generation,
                            source = %failed.source,
                            error = %failed.error,
                            "image load failed"
                        );
                    }
                }
                if to_viewer.send(outcome).await.is_err() {
                    debug!("viewer channel closed; stopping loader");
                    break;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use image::{Luma, Rgba};

    // JPEG 2x1 with EXIF orientation 6 (rotate 90 CW), base64 encoded
    const ORIENT6_JPEG: &str = concat!(
        "/9j/4AAQSkZJRgABAQAAAQABAAD/4QAiRXhpZgAATU0AKgAAAAgAAQESAAMAAAABAAYAAAAAAAD/2wBDAAgGBgcGBQgHBwcJCQgKDBQNDAsLDBkSEw8UHRofHh0aHBwgJC4nICIsIxwcKDcpLDAxNDQ0Hyc5PTgyPC4zNDL/",
        "2wBDAQkJCQwLDBgNDRgyIRwhMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjL/wAARCAABAAIDASIAAhEBAxEB/8QAHwAAAQUBAQEBAQEAAAAAAAAAAAECAwQFBgcICQoL/8QAtRAAAgEDAwIEAwUFBAQAAAF9AQIDAAQRBRIhMUEGE1FhByJxFDKBkaEII0KxwRVS0fAkM2JyggkKFhcYGRolJicoKSo0NTY3ODk6Q0RFRkdISUpTVFVWV1hZWmNkZWZnaGlqc3R1dnd4eXqDhIWGh4iJipKTlJWWl5iZmqKjpKWmp6ipqrKztLW2t7i5usLDxMXGx8jJytLT1NXW19jZ2uHi4+Tl5ufo6erx8vP09fb3+Pn6/8QAHwEAAwEBAQEBAQEBAQAAAAAAAAECAwQFBgcICQoL/8QAtREAAgECBAQDBAcFBAQAAQJ3AAECAxEEBSExBhJBUQdhcRMiMoEIFEKRobHBCSMzUvAVYnLRChYkNOEl8RcYGRomJygpKjU2Nzg5OkNERUZHSElKU1RVVldYWVpjZGVmZ2hpanN0dXZ3eHl6goOEhYaHiImKkpOUlZaXmJmaoqOkpaanqKmqsrO0tba3uLm6wsPExcbHyMnK0tPU1dbX2Nna4uPk5ebn6Onq8vP09fb3+Pn6/9oADAMBAAIRAxEAPwDi6KKK+ZP3E//Z"
    );

    fn orient6_bytes() -> Vec<u8> {
        base64::engine::general_purpose::STANDARD
            .decode(ORIENT6_JPEG)
            .unwrap()
    }

    #[test]
    fn applies_orientation_six() {
        let img = decode_rgba8_apply_exif(&orient6_bytes()).unwrap();
        assert_eq!(img.dimensions(), (1, 2));
    }

    #[test]
    fn gray_companion_gets_the_same_orientation() {
        let img = decode_luma8_apply_exif(&orient6_bytes()).unwrap();
        assert_eq!(img.dimensions(), (1, 2));
    }

    #[test]
    fn undecodable_bytes_are_a_decode_error() {
        let err = decode_rgba8_apply_exif(b"definitely not an image").unwrap_err();
        assert!(matches!(err, AcquireError::Decode(_)));
    }

    #[test]
    fn rejects_mismatched_pair() {
        let color = RgbaImage::from_pixel(4, 3, Rgba([1, 2, 3, 255]));
        let gray = GrayImage::from_pixel(3, 4, Luma([9]));
        let err = prepare(color, Some(gray), 4096).unwrap_err();
        match err {
            AcquireError::DimensionMismatch { color, gray } => {
                assert_eq!(color, (4, 3));
                assert_eq!(gray, (3, 4));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn downscales_both_images_to_the_same_size() {
        let color = RgbaImage::from_pixel(400, 200, Rgba([200, 100, 50, 255]));
        let gray = GrayImage::from_pixel(400, 200, Luma([120]));
        let prepared = prepare(color, Some(gray), 100).unwrap();
        assert_eq!(prepared.dimensions(), (100, 50));
        assert_eq!(prepared.gray.as_ref().unwrap().dimensions(), (100, 50));
        let px = prepared.color.get_pixel(50, 25);
        assert!((px.0[0] as i32 - 200).abs() <= 1);
        assert_eq!(px.0[3], 255);
    }

    #[test]
    fn small_images_pass_through() {
        let color = RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 255]));
        let prepared = prepare(color, None, 4096).unwrap();
        assert_eq!(prepared.dimensions(), (8, 8));
        assert!(prepared.gray.is_none());
    }
}
