// ============================================================================
// EDITOR SETTINGS — the flat parameter vector driving the render pipeline
// ============================================================================
//
// Every adjustment the editor exposes lives here as one named numeric field
// with a declared valid range.  Out-of-range input is clamped at the boundary,
// never rejected.  The whole struct is replaced wholesale on preset
// application, undo, redo, and history jumps; sliders update one field at a
// time through `set_field`.
// ============================================================================

use serde::{Deserialize, Serialize};

/// One adjustable field of [`EditorSettings`], used for slider routing and the
/// CLI's `--set field=value` syntax.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingsField {
    Brightness,
    Contrast,
    Saturation,
    Blur,
    Rotation,
    Scale,
    Hue,
    Exposure,
    Highlights,
    Shadows,
    Vibrance,
    Warmth,
    Tint,
    Vignette,
    Grain,
    Sharpen,
}

impl SettingsField {
    pub fn all() -> &'static [SettingsField] {
        &[
            SettingsField::Brightness,
            SettingsField::Contrast,
            SettingsField::Saturation,
            SettingsField::Blur,
            SettingsField::Rotation,
            SettingsField::Scale,
            SettingsField::Hue,
            SettingsField::Exposure,
            SettingsField::Highlights,
            SettingsField::Shadows,
            SettingsField::Vibrance,
            SettingsField::Warmth,
            SettingsField::Tint,
            SettingsField::Vignette,
            SettingsField::Grain,
            SettingsField::Sharpen,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            SettingsField::Brightness => "brightness",
            SettingsField::Contrast => "contrast",
            SettingsField::Saturation => "saturation",
            SettingsField::Blur => "blur",
            SettingsField::Rotation => "rotation",
            SettingsField::Scale => "scale",
            SettingsField::Hue => "hue",
            SettingsField::Exposure => "exposure",
            SettingsField::Highlights => "highlights",
            SettingsField::Shadows => "shadows",
            SettingsField::Vibrance => "vibrance",
            SettingsField::Warmth => "warmth",
            SettingsField::Tint => "tint",
            SettingsField::Vignette => "vignette",
            SettingsField::Grain => "grain",
            SettingsField::Sharpen => "sharpen",
        }
    }

    /// Parse a field name as used by the CLI and preset tables.
    pub fn from_name(name: &str) -> Option<SettingsField> {
        SettingsField::all()
            .iter()
            .copied()
            .find(|f| f.name() == name)
    }

    /// Declared valid range (inclusive).  Values outside are clamped.
    pub fn range(&self) -> (f32, f32) {
        match self {
            SettingsField::Brightness
            | SettingsField::Contrast
            | SettingsField::Saturation
            | SettingsField::Highlights
            | SettingsField::Shadows
            | SettingsField::Vibrance
            | SettingsField::Warmth
            | SettingsField::Tint => (-100.0, 100.0),
            SettingsField::Exposure => (-200.0, 200.0),
            SettingsField::Hue | SettingsField::Rotation => (-180.0, 180.0),
            SettingsField::Blur => (0.0, 20.0),
            SettingsField::Sharpen => (0.0, 5.0),
            SettingsField::Vignette => (0.0, 100.0),
            SettingsField::Grain => (0.0, 50.0),
            SettingsField::Scale => (0.1, 3.0),
        }
    }

    pub fn clamp(&self, value: f32) -> f32 {
        // NaN slips through f32::clamp and would poison every later render,
        // so non-finite input falls back to the field's identity default.
        if !value.is_finite() {
            return EditorSettings::default().get_field(*self);
        }
        let (lo, hi) = self.range();
        value.clamp(lo, hi)
    }
}

/// The full parameter vector: 16 named adjustment values.
///
/// Defaults are the identity rendering (all zero, scale 1.0): a render with
/// default settings reproduces the source buffer pixel-for-pixel.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EditorSettings {
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
    pub blur: f32,
    pub rotation: f32,
    pub scale: f32,
    pub hue: f32,
    pub exposure: f32,
    pub highlights: f32,
    pub shadows: f32,
    pub vibrance: f32,
    pub warmth: f32,
    pub tint: f32,
    pub vignette: f32,
    pub grain: f32,
    pub sharpen: f32,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            brightness: 0.0,
            contrast: 0.0,
            saturation: 0.0,
            blur: 0.0,
            rotation: 0.0,
            scale: 1.0,
            hue: 0.0,
            exposure: 0.0,
            highlights: 0.0,
            shadows: 0.0,
            vibrance: 0.0,
            warmth: 0.0,
            tint: 0.0,
            vignette: 0.0,
            grain: 0.0,
            sharpen: 0.0,
        }
    }
}

impl EditorSettings {
    pub fn get_field(&self, field: SettingsField) -> f32 {
        match field {
            SettingsField::Brightness => self.brightness,
            SettingsField::Contrast => self.contrast,
            SettingsField::Saturation => self.saturation,
            SettingsField::Blur => self.blur,
            SettingsField::Rotation => self.rotation,
            SettingsField::Scale => self.scale,
            SettingsField::Hue => self.hue,
            SettingsField::Exposure => self.exposure,
            SettingsField::Highlights => self.highlights,
            SettingsField::Shadows => self.shadows,
            SettingsField::Vibrance => self.vibrance,
            SettingsField::Warmth => self.warmth,
            SettingsField::Tint => self.tint,
            SettingsField::Vignette => self.vignette,
            SettingsField::Grain => self.grain,
            SettingsField::Sharpen => self.sharpen,
        }
    }

    /// Set one field, clamping to its declared range.
    pub fn set_field(&mut self, field: SettingsField, value: f32) {
        let value = field.clamp(value);
        match field {
            SettingsField::Brightness => self.brightness = value,
            SettingsField::Contrast => self.contrast = value,
            SettingsField::Saturation => self.saturation = value,
            SettingsField::Blur => self.blur = value,
            SettingsField::Rotation => self.rotation = value,
            SettingsField::Scale => self.scale = value,
            SettingsField::Hue => self.hue = value,
            SettingsField::Exposure => self.exposure = value,
            SettingsField::Highlights => self.highlights = value,
            SettingsField::Shadows => self.shadows = value,
            SettingsField::Vibrance => self.vibrance = value,
            SettingsField::Warmth => self.warmth = value,
            SettingsField::Tint => self.tint = value,
            SettingsField::Vignette => self.vignette = value,
            SettingsField::Grain => self.grain = value,
            SettingsField::Sharpen => self.sharpen = value,
        }
    }

    /// Builder-style copy with one field replaced (clamped).
    pub fn with_field(mut self, field: SettingsField, value: f32) -> Self {
        self.set_field(field, value);
        self
    }

    /// Return a copy with every field forced back into its declared range.
    /// Used when deserializing settings from untrusted project files.
    pub fn clamped(&self) -> Self {
        let mut out = *self;
        for &field in SettingsField::all() {
            out.set_field(field, self.get_field(field));
        }
        out
    }

    /// True when every field is at its identity default (no-op render).
    pub fn is_identity(&self) -> bool {
        *self == EditorSettings::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_identity() {
        let s = EditorSettings::default();
        assert!(s.is_identity());
        assert_eq!(s.scale, 1.0);
        assert_eq!(s.brightness, 0.0);
    }

    #[test]
    fn out_of_range_values_clamp_at_boundary() {
        let mut s = EditorSettings::default();
        s.set_field(SettingsField::Brightness, 1000.0);
        assert_eq!(s.brightness, 100.0, "brightness clamps to its max");

        s.set_field(SettingsField::Scale, 0.0);
        assert_eq!(s.scale, 0.1, "scale clamps to its min");

        s.set_field(SettingsField::Hue, -720.0);
        assert_eq!(s.hue, -180.0);
    }

    #[test]
    fn non_finite_values_fall_back_to_the_field_default() {
        let mut s = EditorSettings::default();
        s.set_field(SettingsField::Brightness, f32::NAN);
        assert_eq!(s.brightness, 0.0);
        s.set_field(SettingsField::Scale, f32::NAN);
        assert_eq!(s.scale, 1.0);
        s.set_field(SettingsField::Contrast, f32::INFINITY);
        assert_eq!(s.contrast, 0.0);

        s.exposure = f32::NAN;
        assert_eq!(s.clamped().exposure, 0.0);
    }

    #[test]
    fn clamped_repairs_every_field() {
        let mut s = EditorSettings::default();
        s.exposure = 9999.0;
        s.grain = -5.0;
        let fixed = s.clamped();
        assert_eq!(fixed.exposure, 200.0);
        assert_eq!(fixed.grain, 0.0);
    }

    #[test]
    fn field_names_round_trip() {
        for &field in SettingsField::all() {
            assert_eq!(SettingsField::from_name(field.name()), Some(field));
        }
        assert_eq!(SettingsField::from_name("bogus"), None);
    }
}
