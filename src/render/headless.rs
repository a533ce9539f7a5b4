use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use image::RgbaImage;
use tracing::{debug, info};

use crate::events::PreparedImage;
use crate::params::WipeParams;
use crate::processing::compositor::composite_into;

pub fn frame_file_name(index: u32) -> String {
    format!("frame-{index:05}.png")
}

/// Render `frames` frames of the wipe on the CPU into `out_dir`.
///
/// Frame 0 shows `params` as given; each following frame advances the sweep
/// by `1 / fps` seconds. Returns the written paths in frame order.
pub fn render_sequence(
    image: &PreparedImage,
    params: &WipeParams,
    frames: u32,
    fps: f32,
    out_dir: &Path,
) -> Result<Vec<PathBuf>> {
    ensure!(fps.is_finite() && fps > 0.0, "fps must be positive, got {fps}");
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    let (width, height) = image.dimensions();
    let dt = 1.0 / fps;
    let mut params = params.clone();
    let mut frame = RgbaImage::new(width, height);
    let mut written = Vec::with_capacity(frames as usize);

    for index in 0..frames {
        composite_into(&image.color, image.gray.as_ref(), &params, &mut frame);
        let path = out_dir.join(frame_file_name(index));
        frame
            .save(&path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        debug!(index, threshold = params.threshold, time = params.time, "frame written");
        written.push(path);
        params.advance(dt);
    }

    info!(
        frames,
        fps,
        width,
        height,
        dir = %out_dir.display(),
        "headless render finished"
    );
    Ok(written)
}
