//! Hash-based value noise used to roughen the wipe edge.
//!
//! Written with the same float operations as `wipe.wgsl` so the CPU and GPU
//! renderings agree to within rounding.

/// Scale applied to normalized coordinates before sampling.
pub const LATTICE_SCALE: f32 = 200.0;
/// Per-second drift of the noise field along x and y.
pub const DRIFT: [f32; 2] = [0.15, 0.11];

/// Field sampler for one frame: the scale and time offset are fixed, only the
/// coordinate changes per pixel.
#[derive(Debug, Clone, Copy)]
pub struct NoiseField {
    scale: f32,
    offset: [f32; 2],
}

impl NoiseField {
    pub fn new(noise_scale: f32, time: f32) -> Self {
        Self {
            scale: noise_scale * LATTICE_SCALE,
            offset: [time * DRIFT[0], time * DRIFT[1]],
        }
    }

    /// Signed noise in [-1, 1] at a normalized image coordinate.
    pub fn sample(&self, u: f32, v: f32) -> f32 {
        let p = [u * self.scale + self.offset[0], v * self.scale + self.offset[1]];
        (value_noise(p) - 0.5) * 2.0
    }
}

fn fract(x: f32) -> f32 {
    x - x.floor()
}

/// Pseudo-random scalar in [0, 1) for a lattice point.
pub fn hash(p: [f32; 2]) -> f32 {
    let mut q = [fract(p[0] * 123.34), fract(p[1] * 456.21)];
    let d = q[0] * (q[0] + 34.345) + q[1] * (q[1] + 34.345);
    q[0] += d;
    q[1] += d;
    fract(q[0] * q[1])
}

/// Bilinear value noise in [0, 1] with Hermite-smoothed weights.
pub fn value_noise(p: [f32; 2]) -> f32 {
    let i = [p[0].floor(), p[1].floor()];
    let f = [p[0] - i[0], p[1] - i[1]];

    let a = hash(i);
    let b = hash([i[0] + 1.0, i[1]]);
    let c = hash([i[0], i[1] + 1.0]);
    let d = hash([i[0] + 1.0, i[1] + 1.0]);

    let ux = f[0] * f[0] * (3.0 - 2.0 * f[0]);
    let uy = f[1] * f[1] * (3.0 - 2.0 * f[1]);

    lerp(a, b, ux) + (c - a) * uy * (1.0 - ux) + (d - b) * ux * uy
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
