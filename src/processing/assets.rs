//! Synthetic placeholder artwork: a diagonal gradient with soft colored blobs,
//! plus its grayscale companion.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GrayImage, Luma, Rgba, RgbaImage};
use tracing::info;

use crate::processing::compositor::luma_u8;

pub const DEFAULT_WIDTH: u32 = 1920;
pub const DEFAULT_HEIGHT: u32 = 1080;
pub const DEFAULT_QUALITY: u8 = 92;
pub const COLOR_FILE_NAME: &str = "image-color.jpg";
pub const GRAY_FILE_NAME: &str = "image-bw.jpg";

/// Blob layout is authored against this canvas and scaled to the target.
const REFERENCE_SIZE: (f32, f32) = (1920.0, 1080.0);

struct Stop {
    at: f32,
    rgb: [u8; 3],
}

const BACKGROUND: [Stop; 4] = [
    Stop { at: 0.0, rgb: [0x1a, 0x1a, 0x2e] },
    Stop { at: 0.3, rgb: [0x16, 0x21, 0x3e] },
    Stop { at: 0.6, rgb: [0x0f, 0x34, 0x60] },
    Stop { at: 1.0, rgb: [0xe9, 0x45, 0x60] },
];

struct Blob {
    rgb: [u8; 3],
    x: f32,
    y: f32,
    r: f32,
}

const BLOBS: [Blob; 8] = [
    Blob { rgb: [0xff, 0x6b, 0x6b], x: 300.0, y: 300.0, r: 200.0 },
    Blob { rgb: [0x4e, 0xcd, 0xc4], x: 600.0, y: 500.0, r: 180.0 },
    Blob { rgb: [0x45, 0xb7, 0xd1], x: 950.0, y: 350.0, r: 220.0 },
    Blob { rgb: [0xf7, 0xdc, 0x6f], x: 1400.0, y: 400.0, r: 250.0 },
    Blob { rgb: [0xbb, 0x8f, 0xce], x: 1600.0, y: 700.0, r: 190.0 },
    Blob { rgb: [0x58, 0xd6, 0x8d], x: 400.0, y: 800.0, r: 170.0 },
    Blob { rgb: [0xec, 0x70, 0x63], x: 1100.0, y: 750.0, r: 200.0 },
    Blob { rgb: [0x85, 0xc1, 0xe9], x: 800.0, y: 900.0, r: 160.0 },
];

/// Paths written by [`write_assets`].
#[derive(Debug, Clone)]
pub struct AssetPaths {
    pub color: PathBuf,
    pub gray: PathBuf,
}

/// Render the color placeholder at the requested size.
pub fn synthesize_color(width: u32, height: u32) -> RgbaImage {
    let width = width.max(1);
    let height = height.max(1);
    let (dx, dy) = (width as f32, height as f32);
    let span = dx * dx + dy * dy;

    let mut image = RgbaImage::from_fn(width, height, |x, y| {
        let px = x as f32 + 0.5;
        let py = y as f32 + 0.5;
        let t = ((px * dx + py * dy) / span).clamp(0.0, 1.0);
        to_pixel(gradient_at(t))
    });

    let sx = width as f32 / REFERENCE_SIZE.0;
    let sy = height as f32 / REFERENCE_SIZE.1;
    let sr = sx.min(sy);
    for blob in &BLOBS {
        paint_blob(&mut image, blob, sx, sy, sr);
    }
    image
}

/// Grayscale companion using the same luma weights as the compositor.
pub fn derive_grayscale(color: &RgbaImage) -> GrayImage {
    GrayImage::from_fn(color.width(), color.height(), |x, y| {
        let p = color.get_pixel(x, y).0;
        Luma([luma_u8([p[0], p[1], p[2]])])
    })
}

/// Write `image-color.jpg` and `image-bw.jpg` into `dir`, creating it if needed.
pub fn write_assets(dir: &Path, width: u32, height: u32, quality: u8) -> Result<AssetPaths> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create asset directory {}", dir.display()))?;

    let color = synthesize_color(width, height);
    let gray = derive_grayscale(&color);

    let paths = AssetPaths {
        color: dir.join(COLOR_FILE_NAME),
        gray: dir.join(GRAY_FILE_NAME),
    };

    let rgb = DynamicImage::ImageRgba8(color).to_rgb8();
    encode_jpeg(&paths.color, quality, |encoder| encoder.encode_image(&rgb))?;
    info!(path = %paths.color.display(), width, height, "wrote color asset");

    encode_jpeg(&paths.gray, quality, |encoder| encoder.encode_image(&gray))?;
    info!(path = %paths.gray.display(), width, height, "wrote grayscale asset");

    Ok(paths)
}

fn encode_jpeg<F>(path: &Path, quality: u8, write: F) -> Result<()>
where
    F: FnOnce(&mut JpegEncoder<&mut BufWriter<File>>) -> image::ImageResult<()>,
{
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100));
        write(&mut encoder).with_context(|| format!("failed to encode {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to flush {}", path.display()))?;
    Ok(())
}

fn gradient_at(t: f32) -> [f32; 3] {
    let mut prev = &BACKGROUND[0];
    for stop in &BACKGROUND[1..] {
        if t <= stop.at {
            let span = (stop.at - prev.at).max(f32::EPSILON);
            let k = ((t - prev.at) / span).clamp(0.0, 1.0);
            let mut rgb = [0.0; 3];
            for c in 0..3 {
                let a = f32::from(prev.rgb[c]);
                let b = f32::from(stop.rgb[c]);
                rgb[c] = a + (b - a) * k;
            }
            return rgb;
        }
        prev = stop;
    }
    BACKGROUND[BACKGROUND.len() - 1].rgb.map(f32::from)
}

// Radial fill from the blob color at the center to fully transparent at the
// rim, blended source-over onto the canvas.
fn paint_blob(image: &mut RgbaImage, blob: &Blob, sx: f32, sy: f32, sr: f32) {
    let cx = blob.x * sx;
    let cy = blob.y * sy;
    let radius = (blob.r * sr).max(1.0);
    let x0 = (cx - radius).floor().max(0.0) as u32;
    let y0 = (cy - radius).floor().max(0.0) as u32;
    let x1 = ((cx + radius).ceil() as u32).min(image.width());
    let y1 = ((cy + radius).ceil() as u32).min(image.height());
    let src = blob.rgb.map(f32::from);

    for y in y0..y1 {
        for x in x0..x1 {
            let dx = x as f32 + 0.5 - cx;
            let dy = y as f32 + 0.5 - cy;
            let dist = (dx * dx + dy * dy).sqrt();
            if dist >= radius {
                continue;
            }
            let alpha = 1.0 - dist / radius;
            let pixel = image.get_pixel_mut(x, y);
            let mut rgb = [0.0; 3];
            for c in 0..3 {
                rgb[c] = src[c] * alpha + f32::from(pixel.0[c]) * (1.0 - alpha);
            }
            *pixel = to_pixel(rgb);
        }
    }
}

fn to_pixel(rgb: [f32; 3]) -> Rgba<u8> {
    let [r, g, b] = rgb.map(|c| c.round().clamp(0.0, 255.0) as u8);
    Rgba([r, g, b, 255])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gradient_hits_its_stops() {
        assert_eq!(gradient_at(0.0), [26.0, 26.0, 46.0]);
        assert_eq!(gradient_at(1.0), [233.0, 69.0, 96.0]);
        let mid = gradient_at(0.3);
        assert_eq!(mid, [22.0, 33.0, 62.0]);
    }

    #[test]
    fn blob_centers_carry_their_color() {
        let image = synthesize_color(DEFAULT_WIDTH, DEFAULT_HEIGHT);
        // no later blob reaches the yellow one
        let center = image.get_pixel(1400, 400).0;
        assert!((i32::from(center[0]) - 0xf7).abs() <= 3, "{center:?}");
        assert!((i32::from(center[1]) - 0xdc).abs() <= 3, "{center:?}");
    }

    #[test]
    fn corners_follow_the_background_gradient() {
        let image = synthesize_color(64, 36);
        let top_left = image.get_pixel(0, 0).0;
        let bottom_right = image.get_pixel(63, 35).0;
        assert!(top_left[0] < 40 && top_left[2] < 60, "{top_left:?}");
        assert!(bottom_right[0] > 200, "{bottom_right:?}");
    }

    #[test]
    fn grayscale_uses_canonical_luma() {
        let color = RgbaImage::from_fn(3, 1, |x, _| match x {
            0 => Rgba([255, 0, 0, 255]),
            1 => Rgba([0, 255, 0, 255]),
            _ => Rgba([0, 0, 255, 255]),
        });
        let gray = derive_grayscale(&color);
        assert_eq!(gray.get_pixel(0, 0).0[0], 76);
        assert_eq!(gray.get_pixel(1, 0).0[0], 150);
        assert_eq!(gray.get_pixel(2, 0).0[0], 29);
    }
}
