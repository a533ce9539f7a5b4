/// Size that fits inside a `max_dim` square while keeping aspect ratio.
/// Images already within the limit keep their size.
pub fn fit_within(src_w: u32, src_h: u32, max_dim: u32) -> (u32, u32) {
    let iw = src_w.max(1) as f32;
    let ih = src_h.max(1) as f32;
    let limit = max_dim.max(1) as f32;
    let scale = (limit / iw).min(limit / ih).min(1.0);
    let w = (iw * scale).round().clamp(1.0, limit);
    let h = (ih * scale).round().clamp(1.0, limit);
    (w as u32, h as u32)
}

/// Uniform scale that makes the image cover the whole canvas.
pub fn cover_scale(canvas_w: u32, canvas_h: u32, src_w: u32, src_h: u32) -> f32 {
    let iw = src_w.max(1) as f32;
    let ih = src_h.max(1) as f32;
    let cw = canvas_w.max(1) as f32;
    let ch = canvas_h.max(1) as f32;
    (cw / iw).max(ch / ih)
}

/// Fraction of the image visible along each axis once it is cover-scaled and
/// centered on the canvas. A canvas pixel at normalized position `p` samples
/// the image at `0.5 + (p - 0.5) * uv_scale`.
pub fn cover_uv_scale(canvas_w: u32, canvas_h: u32, src_w: u32, src_h: u32) -> [f32; 2] {
    let scale = cover_scale(canvas_w, canvas_h, src_w, src_h);
    let iw = src_w.max(1) as f32;
    let ih = src_h.max(1) as f32;
    let cw = canvas_w.max(1) as f32;
    let ch = canvas_h.max(1) as f32;
    [
        (cw / (iw * scale)).min(1.0),
        (ch / (ih * scale)).min(1.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_within_keeps_small_images() {
        assert_eq!(fit_within(640, 480, 4096), (640, 480));
    }

    #[test]
    fn fit_within_shrinks_long_edge() {
        assert_eq!(fit_within(8000, 4000, 2000), (2000, 1000));
        assert_eq!(fit_within(3000, 6000, 1500), (750, 1500));
    }

    #[test]
    fn cover_scale_fills_the_tighter_axis() {
        assert_eq!(cover_scale(200, 100, 100, 200), 2.0);
        assert_eq!(cover_scale(1920, 1080, 3840, 2160), 0.5);
    }

    #[test]
    fn wide_canvas_crops_a_tall_image_vertically() {
        assert_eq!(cover_uv_scale(200, 100, 100, 200), [1.0, 0.25]);
    }

    #[test]
    fn tall_canvas_crops_a_wide_image_horizontally() {
        assert_eq!(cover_uv_scale(100, 200, 200, 100), [0.25, 1.0]);
    }

    #[test]
    fn matching_aspect_shows_everything() {
        assert_eq!(cover_uv_scale(1920, 1080, 1280, 720), [1.0, 1.0]);
    }

    #[test]
    fn zero_sizes_are_treated_as_one_pixel() {
        assert_eq!(cover_scale(0, 0, 0, 0), 1.0);
        assert_eq!(cover_uv_scale(0, 0, 0, 0), [1.0, 1.0]);
        assert_eq!(cover_uv_scale(0, 10, 10, 10), [0.1, 1.0]);
    }
}
