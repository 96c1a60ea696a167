// ============================================================================
// STYLISTIC EFFECTS — vignette, film grain, unsharp-mask sharpen
// ============================================================================

use image::RgbaImage;
use rayon::prelude::*;

use crate::ops::filters::gaussian_blur;

// ----------------------------------------------------------------------------
// Hash-based noise primitives
// ----------------------------------------------------------------------------

#[inline]
fn hash_u32(mut x: u32) -> u32 {
    x = x.wrapping_mul(0x9E37_79B9);
    x ^= x >> 16;
    x = x.wrapping_mul(0x85EB_CA6B);
    x ^= x >> 13;
    x = x.wrapping_mul(0xC2B2_AE35);
    x ^= x >> 16;
    x
}

/// Hash to f32 in [0, 1).
#[inline]
fn hash_f32(x: u32, y: u32, seed: u32) -> f32 {
    let h = hash_u32(
        x.wrapping_mul(374_761_393)
            .wrapping_add(y.wrapping_mul(668_265_263))
            .wrapping_add(seed),
    );
    (h & 0x00FF_FFFF) as f32 / 16_777_216.0
}

// ----------------------------------------------------------------------------
// Vignette
// ----------------------------------------------------------------------------

/// Darken the buffer radially: no darkening at the center, `amount/100` at
/// the farthest corner, multiplied into every color channel.  Monotonic and
/// saturating toward black; `amount <= 0` is a no-op.
pub fn vignette(flat: &RgbaImage, amount: f32) -> RgbaImage {
    if amount <= 0.0 {
        return flat.clone();
    }
    let w = flat.width();
    let h = flat.height();
    if w == 0 || h == 0 {
        return flat.clone();
    }

    let cx = w as f32 / 2.0;
    let cy = h as f32 / 2.0;
    let max_dist = (cx * cx + cy * cy).sqrt();
    let factor = (amount / 100.0).clamp(0.0, 1.0);

    let stride = w as usize * 4;
    let src_raw = flat.as_raw();
    let mut dst_raw = vec![0u8; src_raw.len()];

    dst_raw.par_chunks_mut(stride).enumerate().for_each(|(y, row_out)| {
        let row_in = &src_raw[y * stride..(y + 1) * stride];
        let dy = y as f32 - cy;
        for x in 0..w as usize {
            let dx = x as f32 - cx;
            let falloff = (dx * dx + dy * dy).sqrt() / max_dist;
            let vf = (1.0 - falloff * factor).clamp(0.0, 1.0);
            let pi = x * 4;
            row_out[pi] = (row_in[pi] as f32 * vf).round() as u8;
            row_out[pi + 1] = (row_in[pi + 1] as f32 * vf).round() as u8;
            row_out[pi + 2] = (row_in[pi + 2] as f32 * vf).round() as u8;
            row_out[pi + 3] = row_in[pi + 3];
        }
    });

    RgbaImage::from_raw(w, h, dst_raw).unwrap_or_else(|| flat.clone())
}

// ----------------------------------------------------------------------------
// Film grain
// ----------------------------------------------------------------------------

/// Add achromatic luminance noise: one sample per pixel, drawn uniformly from
/// [-intensity, +intensity], added to R, G and B identically and clamped per
/// channel.  Alpha is untouched.  The hash-based sampler makes the output a
/// pure function of (pixel position, seed), so renders are reproducible.
pub fn grain(flat: &RgbaImage, intensity: f32, seed: u32) -> RgbaImage {
    if intensity <= 0.0 {
        return flat.clone();
    }
    let w = flat.width();
    let h = flat.height();
    if w == 0 || h == 0 {
        return flat.clone();
    }

    let stride = w as usize * 4;
    let src_raw = flat.as_raw();
    let mut dst_raw = vec![0u8; src_raw.len()];

    dst_raw.par_chunks_mut(stride).enumerate().for_each(|(y, row_out)| {
        let row_in = &src_raw[y * stride..(y + 1) * stride];
        for x in 0..w as usize {
            let pi = x * 4;
            // Same sample for all three channels keeps the grain achromatic.
            let noise = (hash_f32(x as u32, y as u32, seed) - 0.5) * intensity * 2.0;
            for c in 0..3 {
                let v = row_in[pi + c] as f32 + noise;
                row_out[pi + c] = v.round().clamp(0.0, 255.0) as u8;
            }
            row_out[pi + 3] = row_in[pi + 3];
        }
    });

    RgbaImage::from_raw(w, h, dst_raw).unwrap_or_else(|| flat.clone())
}

// ----------------------------------------------------------------------------
// Sharpen
// ----------------------------------------------------------------------------

/// Unsharp mask: result = original + amount * (original - blurred).
/// `amount <= 0` is a no-op.
pub fn sharpen(flat: &RgbaImage, amount: f32) -> RgbaImage {
    if amount <= 0.0 {
        return flat.clone();
    }
    let blurred = gaussian_blur(flat, 1.0);
    let w = flat.width() as usize;
    let h = flat.height() as usize;
    let src_raw = flat.as_raw();
    let blur_raw = blurred.as_raw();
    let stride = w * 4;
    let mut dst_raw = vec![0u8; w * h * 4];

    dst_raw.par_chunks_mut(stride).enumerate().for_each(|(y, row_out)| {
        for x in 0..w {
            let pi = x * 4;
            let si = y * stride + pi;
            for c in 0..3 {
                let s = src_raw[si + c] as f32;
                let b = blur_raw[si + c] as f32;
                let v = s + amount * (s - b);
                row_out[pi + c] = v.round().clamp(0.0, 255.0) as u8;
            }
            row_out[pi + 3] = src_raw[si + 3];
        }
    });

    RgbaImage::from_raw(w as u32, h as u32, dst_raw).unwrap_or_else(|| flat.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn vignette_zero_is_a_noop() {
        let src = RgbaImage::from_pixel(6, 6, Rgba([200, 180, 160, 255]));
        let out = vignette(&src, 0.0);
        assert_eq!(src.as_raw(), out.as_raw());
    }

    #[test]
    fn vignette_darkens_corners_more_than_center() {
        let src = RgbaImage::from_pixel(11, 11, Rgba([200, 200, 200, 255]));
        let out = vignette(&src, 100.0);
        let corner = out.get_pixel(0, 0).0[0];
        let center = out.get_pixel(5, 5).0[0];
        assert!(
            corner < center,
            "corner {} must be darker than center {}",
            corner,
            center
        );
        // Center is essentially untouched at distance ~0.
        assert!(center >= 195, "got {}", center);
    }

    #[test]
    fn vignette_preserves_alpha() {
        let src = RgbaImage::from_pixel(5, 5, Rgba([100, 100, 100, 77]));
        let out = vignette(&src, 80.0);
        assert_eq!(out.get_pixel(0, 0).0[3], 77);
    }

    #[test]
    fn grain_is_deterministic_for_a_fixed_seed() {
        let src = RgbaImage::from_pixel(16, 16, Rgba([128, 128, 128, 255]));
        let a = grain(&src, 25.0, 42);
        let b = grain(&src, 25.0, 42);
        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn grain_differs_across_seeds() {
        let src = RgbaImage::from_pixel(16, 16, Rgba([128, 128, 128, 255]));
        let a = grain(&src, 25.0, 1);
        let b = grain(&src, 25.0, 2);
        assert_ne!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn grain_is_achromatic() {
        let src = RgbaImage::from_pixel(8, 8, Rgba([128, 128, 128, 255]));
        let out = grain(&src, 30.0, 7);
        for px in out.pixels() {
            // All three channels start equal and receive the same sample.
            assert_eq!(px.0[0], px.0[1]);
            assert_eq!(px.0[1], px.0[2]);
            assert_eq!(px.0[3], 255);
        }
    }

    #[test]
    fn grain_zero_is_a_noop() {
        let src = RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 255]));
        assert_eq!(grain(&src, 0.0, 99).as_raw(), src.as_raw());
    }

    #[test]
    fn sharpen_zero_is_a_noop() {
        let src = RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 255]));
        assert_eq!(sharpen(&src, 0.0).as_raw(), src.as_raw());
    }

    #[test]
    fn sharpen_increases_edge_contrast() {
        // Left half dark, right half bright.
        let mut src = RgbaImage::from_pixel(10, 10, Rgba([50, 50, 50, 255]));
        for y in 0..10 {
            for x in 5..10 {
                src.put_pixel(x, y, Rgba([200, 200, 200, 255]));
            }
        }
        let out = sharpen(&src, 2.0);
        // Pixels flanking the edge overshoot in opposite directions.
        assert!(out.get_pixel(4, 5).0[0] <= 50);
        assert!(out.get_pixel(5, 5).0[0] >= 200);
    }
}
