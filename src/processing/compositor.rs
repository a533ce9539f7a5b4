//! Luminance-threshold wipe between a color image and its grayscale rendering.
//!
//! Every output pixel depends only on the matching input pixels and the
//! parameters, so rows are shaded in parallel. `wipe.wgsl` runs the same
//! function on the GPU.

use image::{GrayImage, RgbaImage};
use rayon::prelude::*;

use crate::params::WipeParams;
use crate::processing::noise::NoiseField;

pub const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

/// Perceptual brightness of a color with channels in [0, 1].
pub fn luma(rgb: [f32; 3]) -> f32 {
    (rgb[0] * LUMA_WEIGHTS[0] + rgb[1] * LUMA_WEIGHTS[1] + rgb[2] * LUMA_WEIGHTS[2]).clamp(0.0, 1.0)
}

/// Luma of an 8-bit color, quantized back to 8 bits.
pub fn luma_u8(rgb: [u8; 3]) -> u8 {
    let value = luma(rgb.map(|c| f32::from(c) / 255.0));
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Clamped cubic Hermite step between `lo` and `hi`.
///
/// A zero-width band (`hi <= lo`) is a hard step: 0 below `lo`, 1 otherwise.
pub fn smoothstep(lo: f32, hi: f32, v: f32) -> f32 {
    if hi <= lo {
        return if v < lo { 0.0 } else { 1.0 };
    }
    let t = ((v - lo) / (hi - lo)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Per-frame shading state derived from [`WipeParams`].
#[derive(Debug, Clone, Copy)]
pub struct WipeShader {
    lo: f32,
    hi: f32,
    invert: bool,
    noise_strength: f32,
    noise: Option<NoiseField>,
}

impl WipeShader {
    pub fn new(params: &WipeParams) -> Self {
        let noise = (params.noise_strength > 0.0)
            .then(|| NoiseField::new(params.noise_scale, params.time));
        Self {
            lo: params.threshold - params.feather,
            hi: params.threshold + params.feather,
            invert: params.direction.inverts_luma(),
            noise_strength: params.noise_strength.max(0.0),
            noise,
        }
    }

    /// Mask in [0, 1] for a pixel: 0 keeps the grayscale value, 1 the color.
    pub fn mask(&self, luma: f32, u: f32, v: f32) -> f32 {
        let mut signal = if self.invert { 1.0 - luma } else { luma };
        if let Some(noise) = &self.noise {
            signal += noise.sample(u, v) * self.noise_strength;
        }
        smoothstep(self.lo, self.hi, signal).clamp(0.0, 1.0)
    }

    /// Shade one pixel. `gray` is the precomputed grayscale value if one is
    /// available; otherwise it is derived from `rgb`.
    pub fn shade(&self, rgb: [f32; 3], gray: Option<f32>, u: f32, v: f32) -> [f32; 3] {
        let luma = gray.unwrap_or_else(|| luma(rgb));
        let mask = self.mask(luma, u, v);
        let mut out = [0.0; 3];
        for (dst, src) in out.iter_mut().zip(rgb) {
            *dst = (luma * (1.0 - mask) + src * mask).clamp(0.0, 1.0);
        }
        out
    }
}

/// Composite `color` against its grayscale rendering into a new image.
pub fn composite(color: &RgbaImage, gray: Option<&GrayImage>, params: &WipeParams) -> RgbaImage {
    let mut out = RgbaImage::new(color.width(), color.height());
    composite_into(color, gray, params, &mut out);
    out
}

/// Same as [`composite`], writing into `out` so a frame loop can reuse one
/// buffer. `out` is reallocated if its size differs from `color`.
///
/// A grayscale image whose size does not match `color` is ignored and luma is
/// derived from the color pixels instead.
pub fn composite_into(
    color: &RgbaImage,
    gray: Option<&GrayImage>,
    params: &WipeParams,
    out: &mut RgbaImage,
) {
    let (width, height) = color.dimensions();
    if out.dimensions() != (width, height) {
        *out = RgbaImage::new(width, height);
    }
    if width == 0 || height == 0 {
        return;
    }
    let gray = gray.filter(|g| g.dimensions() == (width, height));
    let shader = WipeShader::new(params);
    let src = color.as_raw();
    let gray_raw = gray.map(|g| g.as_raw());
    let row_len = width as usize * 4;
    let inv_w = 1.0 / width as f32;
    let inv_h = 1.0 / height as f32;

    let dst: &mut [u8] = out;
    dst.par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| {
            let v = (y as f32 + 0.5) * inv_h;
            let src_row = &src[y * row_len..(y + 1) * row_len];
            for (x, (dst_px, src_px)) in row
                .chunks_exact_mut(4)
                .zip(src_row.chunks_exact(4))
                .enumerate()
            {
                let u = (x as f32 + 0.5) * inv_w;
                let rgb = [
                    f32::from(src_px[0]) / 255.0,
                    f32::from(src_px[1]) / 255.0,
                    f32::from(src_px[2]) / 255.0,
                ];
                let g = gray_raw.map(|g| f32::from(g[y * width as usize + x]) / 255.0);
                let shaded = shader.shade(rgb, g, u, v);
                for (channel, value) in dst_px.iter_mut().zip(shaded) {
                    *channel = (value * 255.0).round() as u8;
                }
                dst_px[3] = u8::MAX;
            }
        });
}
