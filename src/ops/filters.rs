// ============================================================================
// IMAGE FILTERS — separable Gaussian blur
// ============================================================================

use image::RgbaImage;
use rayon::prelude::*;

/// Build a normalized 1-D Gaussian kernel for the given sigma.  Sub-pixel
/// sigmas produce a 1-tap kernel (identity).
fn build_gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (sigma * 3.0).ceil() as usize;
    if radius == 0 {
        return vec![1.0];
    }
    let len = radius * 2 + 1;
    let mut kernel = vec![0.0f32; len];
    let s2 = 2.0 * sigma * sigma;
    let mut sum = 0.0f32;
    for (i, k) in kernel.iter_mut().enumerate() {
        let x = i as f32 - radius as f32;
        let v = (-x * x / s2).exp();
        *k = v;
        sum += v;
    }
    let inv = 1.0 / sum;
    for v in &mut kernel {
        *v *= inv;
    }
    kernel
}

/// Rayon-parallelized separable Gaussian blur.  `sigma <= 0` is a no-op and
/// returns the input unchanged (byte-identical).
pub fn gaussian_blur(src: &RgbaImage, sigma: f32) -> RgbaImage {
    if sigma <= 0.0 {
        return src.clone();
    }
    let w = src.width() as usize;
    let h = src.height() as usize;
    if w == 0 || h == 0 {
        return src.clone();
    }

    let kernel = build_gaussian_kernel(sigma);
    let radius = kernel.len() / 2;
    let src_raw = src.as_raw();

    // Convert to f32 buffer (4 channels interleaved).
    let pixel_count = w * h * 4;
    let buf_in: Vec<f32> = src_raw.iter().map(|&b| b as f32).collect();

    // --- Horizontal pass (parallel by row) ---
    let mut buf_h = vec![0.0f32; pixel_count];
    buf_h.par_chunks_mut(w * 4).enumerate().for_each(|(y, row_out)| {
        let row_in_start = y * w * 4;
        for x in 0..w {
            let mut r = 0.0f32;
            let mut g = 0.0f32;
            let mut b = 0.0f32;
            let mut a = 0.0f32;
            for (ki, &kv) in kernel.iter().enumerate() {
                let sx = (x as isize + ki as isize - radius as isize)
                    .max(0)
                    .min(w as isize - 1) as usize;
                let idx = row_in_start + sx * 4;
                r += buf_in[idx] * kv;
                g += buf_in[idx + 1] * kv;
                b += buf_in[idx + 2] * kv;
                a += buf_in[idx + 3] * kv;
            }
            let out_idx = x * 4;
            row_out[out_idx] = r;
            row_out[out_idx + 1] = g;
            row_out[out_idx + 2] = b;
            row_out[out_idx + 3] = a;
        }
    });

    // --- Vertical pass (parallel by row) ---
    let mut buf_v = vec![0.0f32; pixel_count];
    buf_v.par_chunks_mut(w * 4).enumerate().for_each(|(y, row_out)| {
        for x in 0..w {
            let mut r = 0.0f32;
            let mut g = 0.0f32;
            let mut b = 0.0f32;
            let mut a = 0.0f32;
            for (ki, &kv) in kernel.iter().enumerate() {
                let sy = (y as isize + ki as isize - radius as isize)
                    .max(0)
                    .min(h as isize - 1) as usize;
                let idx = sy * w * 4 + x * 4;
                r += buf_h[idx] * kv;
                g += buf_h[idx + 1] * kv;
                b += buf_h[idx + 2] * kv;
                a += buf_h[idx + 3] * kv;
            }
            let out_idx = x * 4;
            row_out[out_idx] = r;
            row_out[out_idx + 1] = g;
            row_out[out_idx + 2] = b;
            row_out[out_idx + 3] = a;
        }
    });

    // Convert back to u8.
    let dst_raw: Vec<u8> = buf_v
        .iter()
        .map(|&v| v.round().clamp(0.0, 255.0) as u8)
        .collect();
    RgbaImage::from_raw(w as u32, h as u32, dst_raw).unwrap_or_else(|| src.clone())
}
