// ============================================================================
// LAYER STACK — named layers, blend modes, flattening
// ============================================================================

use image::{Rgba, RgbaImage};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{log_info, log_warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    SoftLight,
    HardLight,
    ColorDodge,
    ColorBurn,
    Darken,
    Lighten,
}

impl BlendMode {
    /// Returns all blend modes for UI display
    pub fn all() -> &'static [BlendMode] {
        &[
            BlendMode::Normal,
            BlendMode::Multiply,
            BlendMode::Screen,
            BlendMode::Overlay,
            BlendMode::SoftLight,
            BlendMode::HardLight,
            BlendMode::ColorDodge,
            BlendMode::ColorBurn,
            BlendMode::Darken,
            BlendMode::Lighten,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            BlendMode::Normal => "normal",
            BlendMode::Multiply => "multiply",
            BlendMode::Screen => "screen",
            BlendMode::Overlay => "overlay",
            BlendMode::SoftLight => "soft-light",
            BlendMode::HardLight => "hard-light",
            BlendMode::ColorDodge => "color-dodge",
            BlendMode::ColorBurn => "color-burn",
            BlendMode::Darken => "darken",
            BlendMode::Lighten => "lighten",
        }
    }

    /// Reconstruct from a stored name (defaults to Normal for unknown values)
    pub fn from_name(name: &str) -> Self {
        BlendMode::all()
            .iter()
            .copied()
            .find(|m| m.name() == name)
            .unwrap_or(BlendMode::Normal)
    }
}

/// One layer in the stack.  Pixel content is optional: in practice only the
/// background layer carries pixels (the decoded source image), while extra
/// layers are bookkeeping until content lands in them — but the flattening
/// path supports content on any layer.
#[derive(Clone)]
pub struct Layer {
    pub id: Uuid,
    pub name: String,
    pub visible: bool,
    /// Layer opacity in percent, clamped to [0, 100].
    pub opacity: f32,
    pub blend_mode: BlendMode,
    pub locked: bool,
    pub pixels: Option<RgbaImage>,
}

impl Layer {
    pub fn new(name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            visible: true,
            opacity: 100.0,
            blend_mode: BlendMode::Normal,
            locked: false,
            pixels: None,
        }
    }

    pub fn with_pixels(name: String, pixels: RgbaImage) -> Self {
        let mut layer = Self::new(name);
        layer.pixels = Some(pixels);
        layer
    }
}

/// Ordered stack of layers plus the active-layer selection.
///
/// Invariant: once an image is loaded the stack holds at least one layer;
/// deleting the last remaining layer is a guarded no-op.
pub struct LayerStack {
    pub layers: Vec<Layer>,
    pub active_layer_id: Option<Uuid>,
    pub width: u32,
    pub height: u32,
}

impl LayerStack {
    /// Create the initial stack for a freshly loaded source image: one
    /// visible "Background" layer holding the source pixels.
    pub fn for_source(source: &RgbaImage) -> Self {
        let background = Layer::with_pixels("Background".to_string(), source.clone());
        let active = background.id;
        Self {
            layers: vec![background],
            active_layer_id: Some(active),
            width: source.width(),
            height: source.height(),
        }
    }

    pub fn layer_index(&self, id: Uuid) -> Option<usize> {
        self.layers.iter().position(|l| l.id == id)
    }

    pub fn layer(&self, id: Uuid) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn layer_mut(&mut self, id: Uuid) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.id == id)
    }

    pub fn active_layer(&self) -> Option<&Layer> {
        self.active_layer_id.and_then(|id| self.layer(id))
    }

    /// Append a new empty layer on top of the stack and make it active.
    pub fn add_layer(&mut self) -> Uuid {
        let layer = Layer::new(format!("Layer {}", self.layers.len() + 1));
        let id = layer.id;
        self.layers.push(layer);
        self.active_layer_id = Some(id);
        log_info!("Added layer {}", id);
        id
    }

    /// Insert a copy of `id` immediately after it, with a fresh id and a
    /// " Copy"-suffixed name.  Returns the new id, or None if `id` is unknown.
    pub fn duplicate_layer(&mut self, id: Uuid) -> Option<Uuid> {
        let Some(idx) = self.layer_index(id) else {
            log_warn!("duplicate_layer: unknown layer {}", id);
            return None;
        };
        let mut copy = self.layers[idx].clone();
        copy.id = Uuid::new_v4();
        copy.name = format!("{} Copy", copy.name);
        let new_id = copy.id;
        self.layers.insert(idx + 1, copy);
        Some(new_id)
    }

    /// Remove a layer.  Refuses (no-op) when it is the only remaining layer.
    /// If the removed layer was active, the first remaining layer becomes
    /// active.  Returns whether a layer was removed.
    pub fn delete_layer(&mut self, id: Uuid) -> bool {
        if self.layers.len() <= 1 {
            log_warn!("delete_layer: refusing to delete the last layer");
            return false;
        }
        let Some(idx) = self.layer_index(id) else {
            log_warn!("delete_layer: unknown layer {}", id);
            return false;
        };
        self.layers.remove(idx);
        if self.active_layer_id == Some(id) {
            self.active_layer_id = self.layers.first().map(|l| l.id);
        }
        true
    }

    /// Move layer `id` to the position currently occupied by `target_id`,
    /// preserving the relative order of all other layers.  Unknown ids are a
    /// no-op.  This is the explicit form of drag-and-drop reordering.
    pub fn reorder(&mut self, id: Uuid, target_id: Uuid) {
        if id == target_id {
            return;
        }
        let (Some(from), Some(_)) = (self.layer_index(id), self.layer_index(target_id)) else {
            log_warn!("reorder: unknown layer id");
            return;
        };
        let layer = self.layers.remove(from);
        // Recompute after removal so the insert lands at the target's slot.
        let to = self.layer_index(target_id).unwrap_or(0);
        self.layers.insert(to, layer);
    }

    pub fn set_active(&mut self, id: Uuid) {
        if self.layer_index(id).is_some() {
            self.active_layer_id = Some(id);
        } else {
            log_warn!("set_active: unknown layer {}", id);
        }
    }

    pub fn set_visible(&mut self, id: Uuid, visible: bool) {
        if let Some(layer) = self.layer_mut(id) {
            layer.visible = visible;
        }
    }

    pub fn set_opacity(&mut self, id: Uuid, opacity: f32) {
        if let Some(layer) = self.layer_mut(id) {
            layer.opacity = opacity.clamp(0.0, 100.0);
        }
    }

    pub fn set_blend_mode(&mut self, id: Uuid, mode: BlendMode) {
        if let Some(layer) = self.layer_mut(id) {
            layer.blend_mode = mode;
        }
    }

    pub fn set_locked(&mut self, id: Uuid, locked: bool) {
        if let Some(layer) = self.layer_mut(id) {
            layer.locked = locked;
        }
    }

    pub fn rename(&mut self, id: Uuid, name: String) {
        if let Some(layer) = self.layer_mut(id) {
            layer.name = name;
        }
    }

    /// Flatten the stack bottom-to-top into one buffer sized to the canvas.
    ///
    /// Each visible layer with pixel content is blended onto the accumulator
    /// using its blend mode; opacity linearly interpolates between the
    /// accumulator and the blended result.  Invisible layers and layers
    /// without content contribute nothing.  Rows are processed in parallel
    /// and joined before the buffer is handed to the next stage.
    pub fn flatten(&self) -> RgbaImage {
        let w = self.width as usize;
        let h = self.height as usize;
        let mut out = vec![0u8; w * h * 4];
        let stride = w * 4;

        let visible: Vec<(&RgbaImage, BlendMode, f32)> = self
            .layers
            .iter()
            .filter(|l| l.visible)
            .filter_map(|l| l.pixels.as_ref().map(|p| (p, l.blend_mode, l.opacity / 100.0)))
            .collect();

        out.par_chunks_mut(stride).enumerate().for_each(|(y, row_out)| {
            for x in 0..w {
                let mut base = Rgba([0u8, 0, 0, 0]);
                for &(content, mode, opacity) in &visible {
                    if x as u32 >= content.width() || y as u32 >= content.height() {
                        continue;
                    }
                    let top = *content.get_pixel(x as u32, y as u32);
                    base = blend_pixel(base, top, mode, opacity);
                }
                let pi = x * 4;
                row_out[pi..pi + 4].copy_from_slice(&base.0);
            }
        });

        RgbaImage::from_raw(self.width, self.height, out)
            .unwrap_or_else(|| RgbaImage::new(self.width, self.height))
    }
}

/// Blend `top` over `base` with the given mode and opacity in [0, 1].
/// Straight (non-premultiplied) alpha throughout; channels clamp to [0, 255].
pub fn blend_pixel(base: Rgba<u8>, top: Rgba<u8>, mode: BlendMode, opacity: f32) -> Rgba<u8> {
    // Fast path: Normal blend at full opacity over a fully transparent base
    // is exactly the top pixel.  Checked before the transparent-top path so a
    // single-layer composite preserves every byte, RGB under zero alpha
    // included.
    if matches!(mode, BlendMode::Normal) && opacity >= 1.0 && base[3] == 0 {
        return top;
    }

    // Fast path: fully transparent top pixel — nothing to blend
    if top[3] == 0 || opacity <= 0.0 {
        return base;
    }

    // Fast path: Normal blend, full opacity, fully opaque top pixel — just overwrite
    if matches!(mode, BlendMode::Normal) && opacity >= 1.0 && top[3] == 255 {
        return top;
    }

    let opacity = opacity.clamp(0.0, 1.0);

    let base_r = base[0] as f32 / 255.0;
    let base_g = base[1] as f32 / 255.0;
    let base_b = base[2] as f32 / 255.0;
    let base_a = base[3] as f32 / 255.0;

    let top_r = top[0] as f32 / 255.0;
    let top_g = top[1] as f32 / 255.0;
    let top_b = top[2] as f32 / 255.0;
    let top_a = (top[3] as f32 / 255.0) * opacity;

    let (r, g, b) = match mode {
        BlendMode::Normal => (top_r, top_g, top_b),
        BlendMode::Multiply => (base_r * top_r, base_g * top_g, base_b * top_b),
        BlendMode::Screen => (
            1.0 - (1.0 - base_r) * (1.0 - top_r),
            1.0 - (1.0 - base_g) * (1.0 - top_g),
            1.0 - (1.0 - base_b) * (1.0 - top_b),
        ),
        BlendMode::Overlay => (
            overlay_channel(base_r, top_r),
            overlay_channel(base_g, top_g),
            overlay_channel(base_b, top_b),
        ),
        BlendMode::HardLight => (
            overlay_channel(top_r, base_r),
            overlay_channel(top_g, base_g),
            overlay_channel(top_b, base_b),
        ),
        BlendMode::SoftLight => (
            soft_light_channel(base_r, top_r),
            soft_light_channel(base_g, top_g),
            soft_light_channel(base_b, top_b),
        ),
        BlendMode::ColorDodge => (
            color_dodge_channel(base_r, top_r),
            color_dodge_channel(base_g, top_g),
            color_dodge_channel(base_b, top_b),
        ),
        BlendMode::ColorBurn => (
            color_burn_channel(base_r, top_r),
            color_burn_channel(base_g, top_g),
            color_burn_channel(base_b, top_b),
        ),
        BlendMode::Darken => (base_r.min(top_r), base_g.min(top_g), base_b.min(top_b)),
        BlendMode::Lighten => (base_r.max(top_r), base_g.max(top_g), base_b.max(top_b)),
    };

    let out_a = top_a + base_a * (1.0 - top_a);
    if out_a == 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let out_r = (r * top_a + base_r * base_a * (1.0 - top_a)) / out_a;
    let out_g = (g * top_a + base_g * base_a * (1.0 - top_a)) / out_a;
    let out_b = (b * top_a + base_b * base_a * (1.0 - top_a)) / out_a;

    // Round to nearest: the un-premultiply divide above reintroduces float
    // error, and truncation would make a no-op composite lossy for any pixel
    // with alpha < 255.
    Rgba([
        (out_r * 255.0).round().clamp(0.0, 255.0) as u8,
        (out_g * 255.0).round().clamp(0.0, 255.0) as u8,
        (out_b * 255.0).round().clamp(0.0, 255.0) as u8,
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

// Blend mode helper functions
fn overlay_channel(base: f32, top: f32) -> f32 {
    if base < 0.5 {
        2.0 * base * top
    } else {
        1.0 - 2.0 * (1.0 - base) * (1.0 - top)
    }
}

fn soft_light_channel(base: f32, top: f32) -> f32 {
    if top < 0.5 {
        base - (1.0 - 2.0 * top) * base * (1.0 - base)
    } else {
        let d = if base < 0.25 {
            ((16.0 * base - 12.0) * base + 4.0) * base
        } else {
            base.sqrt()
        };
        base + (2.0 * top - 1.0) * (d - base)
    }
}

fn color_dodge_channel(base: f32, top: f32) -> f32 {
    if top >= 1.0 {
        1.0
    } else {
        (base / (1.0 - top)).min(1.0)
    }
}

fn color_burn_channel(base: f32, top: f32) -> f32 {
    if top == 0.0 {
        0.0
    } else {
        (1.0 - (1.0 - base) / top).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32, px: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba(px))
    }

    #[test]
    fn stack_starts_with_background_layer() {
        let stack = LayerStack::for_source(&solid(4, 4, [255, 255, 255, 255]));
        assert_eq!(stack.layers.len(), 1);
        assert_eq!(stack.layers[0].name, "Background");
        assert_eq!(stack.active_layer_id, Some(stack.layers[0].id));
    }

    #[test]
    fn delete_last_layer_is_refused() {
        let mut stack = LayerStack::for_source(&solid(2, 2, [0, 0, 0, 255]));
        let id = stack.layers[0].id;
        assert!(!stack.delete_layer(id));
        assert_eq!(stack.layers.len(), 1, "stack unchanged");
    }

    #[test]
    fn delete_active_layer_activates_first_remaining() {
        let mut stack = LayerStack::for_source(&solid(2, 2, [0, 0, 0, 255]));
        let added = stack.add_layer();
        assert_eq!(stack.active_layer_id, Some(added));
        assert!(stack.delete_layer(added));
        assert_eq!(stack.active_layer_id, Some(stack.layers[0].id));
    }

    #[test]
    fn duplicate_inserts_after_source_with_suffixed_name() {
        let mut stack = LayerStack::for_source(&solid(2, 2, [9, 9, 9, 255]));
        stack.add_layer();
        let bg = stack.layers[0].id;
        let copy = stack.duplicate_layer(bg).unwrap();
        assert_eq!(stack.layers.len(), 3);
        assert_eq!(stack.layers[1].id, copy);
        assert_eq!(stack.layers[1].name, "Background Copy");
        assert_ne!(copy, bg, "copy gets a fresh id");
    }

    #[test]
    fn reorder_moves_layer_to_target_slot() {
        let mut stack = LayerStack::for_source(&solid(2, 2, [0, 0, 0, 255]));
        let b = stack.add_layer();
        let c = stack.add_layer();
        let a = stack.layers[0].id;
        // [a, b, c] → move c before a
        stack.reorder(c, a);
        let order: Vec<Uuid> = stack.layers.iter().map(|l| l.id).collect();
        assert_eq!(order, vec![c, a, b]);
    }

    #[test]
    fn opacity_setter_clamps() {
        let mut stack = LayerStack::for_source(&solid(2, 2, [0, 0, 0, 255]));
        let id = stack.layers[0].id;
        stack.set_opacity(id, 250.0);
        assert_eq!(stack.layer(id).unwrap().opacity, 100.0);
        stack.set_opacity(id, -4.0);
        assert_eq!(stack.layer(id).unwrap().opacity, 0.0);
    }

    #[test]
    fn flatten_skips_invisible_layers() {
        let mut stack = LayerStack::for_source(&solid(2, 2, [10, 20, 30, 255]));
        let top_id = stack.add_layer();
        stack.layer_mut(top_id).unwrap().pixels = Some(solid(2, 2, [200, 0, 0, 255]));
        stack.set_visible(top_id, false);
        let flat = stack.flatten();
        assert_eq!(flat.get_pixel(0, 0).0, [10, 20, 30, 255]);
    }

    #[test]
    fn flatten_blends_layer_with_content() {
        let mut stack = LayerStack::for_source(&solid(2, 2, [200, 200, 200, 255]));
        let top_id = stack.add_layer();
        stack.layer_mut(top_id).unwrap().pixels = Some(solid(2, 2, [128, 128, 128, 255]));
        stack.set_blend_mode(top_id, BlendMode::Multiply);
        let flat = stack.flatten();
        let px = flat.get_pixel(1, 1).0;
        assert!(px[0] < 128, "multiply darkens, got {}", px[0]);
    }

    #[test]
    fn flatten_reproduces_a_semitransparent_layer_exactly() {
        // Every alpha value from 0 to 255 must survive a no-op composite.
        let mut src = RgbaImage::new(16, 16);
        for (i, px) in src.pixels_mut().enumerate() {
            *px = Rgba([
                (i * 7 % 256) as u8,
                (i * 13 % 256) as u8,
                (i * 29 % 256) as u8,
                i as u8,
            ]);
        }
        let stack = LayerStack::for_source(&src);
        assert_eq!(stack.flatten().as_raw(), src.as_raw());
    }

    #[test]
    fn multiply_blend_darkens() {
        let out = blend_pixel(
            Rgba([200, 200, 200, 255]),
            Rgba([128, 128, 128, 255]),
            BlendMode::Multiply,
            1.0,
        );
        // 200/255 * 128/255 ≈ 0.394 → ≈ 100
        assert!(out[0] < 128 && out[0] > 90, "got {}", out[0]);
        assert_eq!(out[3], 255);
    }

    #[test]
    fn screen_blend_lightens() {
        let out = blend_pixel(
            Rgba([100, 100, 100, 255]),
            Rgba([100, 100, 100, 255]),
            BlendMode::Screen,
            1.0,
        );
        assert!(out[0] > 100);
    }

    #[test]
    fn half_opacity_interpolates_toward_base() {
        let base = Rgba([0, 0, 0, 255]);
        let top = Rgba([255, 255, 255, 255]);
        let out = blend_pixel(base, top, BlendMode::Normal, 0.5);
        assert!((out[0] as i32 - 128).abs() <= 1, "got {}", out[0]);
    }

    #[test]
    fn blend_mode_names_round_trip() {
        for &mode in BlendMode::all() {
            assert_eq!(BlendMode::from_name(mode.name()), mode);
        }
        assert_eq!(BlendMode::from_name("unknown"), BlendMode::Normal);
    }
}
