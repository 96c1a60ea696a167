// ============================================================================
// PRESETS — named partial settings overlays
// ============================================================================
//
// A preset is a small set of field→value pairs merged onto the current
// settings; fields the preset does not mention keep their current value.
// Applying a preset is a history edit like any other settings change.
// ============================================================================

use crate::settings::{EditorSettings, SettingsField};

/// A named overlay of settings fields.
pub struct Preset {
    pub name: &'static str,
    pub fields: &'static [(SettingsField, f32)],
}

impl Preset {
    /// Merge this preset's fields onto `current`.  Unmentioned fields are
    /// left untouched; mentioned values are clamped like any slider input.
    pub fn apply_to(&self, current: &EditorSettings) -> EditorSettings {
        let mut out = *current;
        for &(field, value) in self.fields {
            out.set_field(field, value);
        }
        out
    }
}

pub const VINTAGE: Preset = Preset {
    name: "Vintage",
    fields: &[
        (SettingsField::Brightness, 10.0),
        (SettingsField::Contrast, 20.0),
        (SettingsField::Saturation, -30.0),
        (SettingsField::Blur, 0.5),
        (SettingsField::Warmth, 30.0),
        (SettingsField::Vignette, 20.0),
    ],
};

pub const BLACK_AND_WHITE: Preset = Preset {
    name: "B&W",
    fields: &[
        (SettingsField::Brightness, 0.0),
        (SettingsField::Contrast, 30.0),
        (SettingsField::Saturation, -100.0),
        (SettingsField::Blur, 0.0),
        (SettingsField::Sharpen, 1.0),
    ],
};

pub const VIBRANT: Preset = Preset {
    name: "Vibrant",
    fields: &[
        (SettingsField::Brightness, 15.0),
        (SettingsField::Contrast, 25.0),
        (SettingsField::Saturation, 50.0),
        (SettingsField::Vibrance, 30.0),
        (SettingsField::Blur, 0.0),
    ],
};

pub const SOFT: Preset = Preset {
    name: "Soft",
    fields: &[
        (SettingsField::Brightness, 20.0),
        (SettingsField::Contrast, -10.0),
        (SettingsField::Saturation, 10.0),
        (SettingsField::Blur, 1.0),
        (SettingsField::Highlights, -20.0),
    ],
};

pub const DRAMATIC: Preset = Preset {
    name: "Dramatic",
    fields: &[
        (SettingsField::Brightness, -10.0),
        (SettingsField::Contrast, 40.0),
        (SettingsField::Saturation, 20.0),
        (SettingsField::Shadows, -30.0),
        (SettingsField::Highlights, -20.0),
        (SettingsField::Vignette, 30.0),
    ],
};

pub const FILM: Preset = Preset {
    name: "Film",
    fields: &[
        (SettingsField::Brightness, 5.0),
        (SettingsField::Contrast, 15.0),
        (SettingsField::Saturation, -10.0),
        (SettingsField::Grain, 15.0),
        (SettingsField::Warmth, 20.0),
        (SettingsField::Vignette, 15.0),
    ],
};

/// One-click auto enhancement from the toolbar.
pub const QUICK_ENHANCE: Preset = Preset {
    name: "Quick Enhance",
    fields: &[
        (SettingsField::Brightness, 10.0),
        (SettingsField::Contrast, 15.0),
        (SettingsField::Saturation, 20.0),
        (SettingsField::Sharpen, 0.5),
        (SettingsField::Vibrance, 15.0),
    ],
};

/// The presets offered in the sidebar, in display order.
pub fn all() -> &'static [&'static Preset] {
    &[&VINTAGE, &BLACK_AND_WHITE, &VIBRANT, &SOFT, &DRAMATIC, &FILM]
}

/// Look up a preset by (case-insensitive) name.  "bw" and "b&w" both match.
pub fn by_name(name: &str) -> Option<&'static Preset> {
    let lowered = name.to_lowercase();
    let normalized = lowered.replace(['&', '-', ' '], "");
    all()
        .iter()
        .copied()
        .find(|p| p.name.to_lowercase().replace(['&', '-', ' '], "") == normalized)
}
