// ============================================================================
// TONAL/COLOR STAGE — combined per-pixel color transform
// ============================================================================
//
// One pass over the buffer applying, in order: exposure, brightness,
// contrast, saturation + vibrance, hue rotation, warmth (sepia), tint,
// highlights/shadows.  Brightness, contrast and saturation use the standard
// filter-effects percentage formulas (100% = identity); hue rotation and
// sepia use the standard color matrices.  Each output channel is clamped to
// [0, 255] after the full transform.
//
// Warmth deliberately uses the absolute value of the parameter, so +w and -w
// produce the same warming tint.  That matches the observed behavior of the
// editor this engine replaces; see the pinning test below.
// ============================================================================

use image::RgbaImage;
use rayon::prelude::*;

use crate::settings::EditorSettings;

/// Apply a per-pixel transform function over the whole buffer, rows in
/// parallel.  `transform` receives and returns (r, g, b, a) as f32 in the
/// 0–255 range; outputs are rounded and clamped.
pub fn apply_pixel_transform<F>(flat: &RgbaImage, transform: F) -> RgbaImage
where
    F: Fn(f32, f32, f32, f32) -> (f32, f32, f32, f32) + Sync,
{
    let w = flat.width() as usize;
    let h = flat.height() as usize;
    if w == 0 || h == 0 {
        return flat.clone();
    }

    let src_raw = flat.as_raw();
    let mut dst_raw = vec![0u8; w * h * 4];
    let stride = w * 4;

    dst_raw.par_chunks_mut(stride).enumerate().for_each(|(y, row_out)| {
        let row_in = &src_raw[y * stride..(y + 1) * stride];
        for x in 0..w {
            let pi = x * 4;
            let r = row_in[pi] as f32;
            let g = row_in[pi + 1] as f32;
            let b = row_in[pi + 2] as f32;
            let a = row_in[pi + 3] as f32;
            let (nr, ng, nb, na) = transform(r, g, b, a);
            row_out[pi] = nr.round().clamp(0.0, 255.0) as u8;
            row_out[pi + 1] = ng.round().clamp(0.0, 255.0) as u8;
            row_out[pi + 2] = nb.round().clamp(0.0, 255.0) as u8;
            row_out[pi + 3] = na.round().clamp(0.0, 255.0) as u8;
        }
    });

    RgbaImage::from_raw(w as u32, h as u32, dst_raw).unwrap_or_else(|| flat.clone())
}

/// True when every parameter consumed by the color stage is at identity.
pub fn is_color_identity(s: &EditorSettings) -> bool {
    s.brightness == 0.0
        && s.contrast == 0.0
        && s.saturation == 0.0
        && s.hue == 0.0
        && s.warmth == 0.0
        && s.exposure == 0.0
        && s.highlights == 0.0
        && s.shadows == 0.0
        && s.vibrance == 0.0
        && s.tint == 0.0
}

/// The combined tonal/color stage.  Pure: consumes a buffer, produces a new
/// one.  Identity settings return the input unchanged, byte for byte.
pub fn color_stage(flat: &RgbaImage, s: &EditorSettings) -> RgbaImage {
    if is_color_identity(s) {
        return flat.clone();
    }

    // Precompute per-render constants.
    let exposure_gain = (s.exposure / 100.0).exp2();
    let brightness_gain = (100.0 + s.brightness) / 100.0;
    let contrast_gain = (100.0 + s.contrast) / 100.0;
    let sat = (100.0 + s.saturation) / 100.0;
    let vib = s.vibrance / 100.0;
    let hue_rad = s.hue.to_radians();
    let (hue_sin, hue_cos) = hue_rad.sin_cos();
    // Positive and negative warmth produce the same tint magnitude.
    let sepia_amount = (s.warmth.abs() / 100.0).min(1.0);
    let tint_shift = s.tint / 100.0 * 30.0;
    let highlights = s.highlights / 100.0;
    let shadows = s.shadows / 100.0;

    apply_pixel_transform(flat, |r, g, b, a| {
        let mut r = r / 255.0;
        let mut g = g / 255.0;
        let mut b = b / 255.0;

        // Exposure: photographic stops, ×2^(ev/100).
        if s.exposure != 0.0 {
            r *= exposure_gain;
            g *= exposure_gain;
            b *= exposure_gain;
        }

        // Brightness: linear gain from the 100% baseline.
        if s.brightness != 0.0 {
            r *= brightness_gain;
            g *= brightness_gain;
            b *= brightness_gain;
        }

        // Contrast: pivot around mid-grey.
        if s.contrast != 0.0 {
            r = (r - 0.5) * contrast_gain + 0.5;
            g = (g - 0.5) * contrast_gain + 0.5;
            b = (b - 0.5) * contrast_gain + 0.5;
        }

        // Saturation + vibrance: lerp between Rec.709 luminance and the
        // color.  Vibrance scales the effective saturation by how little
        // saturation the pixel already has.
        if s.saturation != 0.0 || s.vibrance != 0.0 {
            let lum = 0.2126 * r + 0.7152 * g + 0.0722 * b;
            let px_sat = {
                let max = r.max(g).max(b);
                let min = r.min(g).min(b);
                max - min
            };
            let eff = sat * (1.0 + vib * (1.0 - px_sat.clamp(0.0, 1.0)));
            r = lum + (r - lum) * eff;
            g = lum + (g - lum) * eff;
            b = lum + (b - lum) * eff;
        }

        // Hue rotation: the standard hue-rotate matrix built from the
        // luminance constants and the rotation angle.
        if s.hue != 0.0 {
            let (ir, ig, ib) = (r, g, b);
            r = (0.213 + hue_cos * 0.787 - hue_sin * 0.213) * ir
                + (0.715 - hue_cos * 0.715 - hue_sin * 0.715) * ig
                + (0.072 - hue_cos * 0.072 + hue_sin * 0.928) * ib;
            g = (0.213 - hue_cos * 0.213 + hue_sin * 0.143) * ir
                + (0.715 + hue_cos * 0.285 + hue_sin * 0.140) * ig
                + (0.072 - hue_cos * 0.072 - hue_sin * 0.283) * ib;
            b = (0.213 - hue_cos * 0.213 - hue_sin * 0.787) * ir
                + (0.715 - hue_cos * 0.715 + hue_sin * 0.715) * ig
                + (0.072 + hue_cos * 0.928 + hue_sin * 0.072) * ib;
        }

        // Warmth: sepia matrix scaled by intensity.
        if sepia_amount > 0.0 {
            let (ir, ig, ib) = (r, g, b);
            let sr = 0.393 * ir + 0.769 * ig + 0.189 * ib;
            let sg = 0.349 * ir + 0.686 * ig + 0.168 * ib;
            let sb = 0.272 * ir + 0.534 * ig + 0.131 * ib;
            r = ir + (sr - ir) * sepia_amount;
            g = ig + (sg - ig) * sepia_amount;
            b = ib + (sb - ib) * sepia_amount;
        }

        // Tint: green↔magenta axis.  Positive pushes magenta.
        if s.tint != 0.0 {
            r += tint_shift * 0.5 / 255.0;
            g -= tint_shift / 255.0;
            b += tint_shift * 0.5 / 255.0;
        }

        // Highlights / shadows: offsets weighted toward the upper or lower
        // luminance band, so mid-tones move less than the extremes.
        if s.highlights != 0.0 || s.shadows != 0.0 {
            let lum = (0.2126 * r + 0.7152 * g + 0.0722 * b).clamp(0.0, 1.0);
            let hi_w = smoothstep(0.5, 1.0, lum);
            let sh_w = smoothstep(0.5, 1.0, 1.0 - lum);
            let offset = highlights * hi_w * 0.35 + shadows * sh_w * 0.35;
            r += offset;
            g += offset;
            b += offset;
        }

        (r * 255.0, g * 255.0, b * 255.0, a)
    })
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}
