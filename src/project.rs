// ============================================================================
// EDITOR DOCUMENT — one open image plus all mutable editor state
// ============================================================================
//
// The explicit state container: the immutable source buffer, the layer
// stack, the live settings, the history stacks and the last-good rendered
// frame all hang off one struct owned by a single controller.  All edits
// route through here so every settings change is recorded in history and
// every render starts from the pristine source.
// ============================================================================

use image::RgbaImage;
use uuid::Uuid;

use crate::canvas::LayerStack;
use crate::history::HistoryManager;
use crate::log_err;
use crate::presets::{self, Preset};
use crate::render::{self, RenderError};
use crate::settings::{EditorSettings, SettingsField};

/// Single open document.
pub struct EditorDocument {
    pub id: Uuid,
    /// The decoded source image.  Read-only once loaded: every render stage
    /// treats it as immutable and allocates its own output.
    source: RgbaImage,
    pub layers: LayerStack,
    pub settings: EditorSettings,
    pub history: HistoryManager,
    /// Seed for the grain stage, fixed at load so repeated renders of the
    /// same state are byte-identical.  Settable for tests and replays.
    pub grain_seed: u32,
    /// Last successfully rendered frame.  A failed render leaves this (and
    /// everything else) untouched.
    rendered: Option<RgbaImage>,
    pub is_dirty: bool,
}

impl EditorDocument {
    /// Open a document around an already-decoded source image.  The layer
    /// stack starts with a single "Background" layer holding the source.
    pub fn new(source: RgbaImage) -> Self {
        let layers = LayerStack::for_source(&source);
        let grain_seed = seed_from_entropy();
        Self {
            id: Uuid::new_v4(),
            source,
            layers,
            settings: EditorSettings::default(),
            history: HistoryManager::new(),
            grain_seed,
            rendered: None,
            is_dirty: false,
        }
    }

    pub fn source(&self) -> &RgbaImage {
        &self.source
    }

    /// The latest fully rendered frame, if any render has succeeded.
    /// Export reads this snapshot — never a partially written buffer.
    pub fn rendered(&self) -> Option<&RgbaImage> {
        self.rendered.as_ref()
    }

    // ---- settings edits ----------------------------------------------------

    /// Replace the live settings wholesale, recording the outgoing value in
    /// history.  Values are clamped, never rejected.
    pub fn edit_settings(&mut self, new_settings: EditorSettings) {
        self.history.push(self.settings);
        self.settings = new_settings.clamped();
        self.is_dirty = true;
    }

    /// Slider interaction: update a single field (clamped) as one edit.
    pub fn set_field(&mut self, field: SettingsField, value: f32) {
        let updated = self.settings.with_field(field, value);
        self.edit_settings(updated);
    }

    /// Merge a preset onto the current settings.  An edit like any other.
    pub fn apply_preset(&mut self, preset: &Preset) {
        let merged = preset.apply_to(&self.settings);
        self.edit_settings(merged);
    }

    /// One-click enhancement from the toolbar.
    pub fn quick_enhance(&mut self) {
        self.apply_preset(&presets::QUICK_ENHANCE);
    }

    /// Reset every adjustment back to defaults (recorded in history).
    pub fn reset_settings(&mut self) {
        self.edit_settings(EditorSettings::default());
    }

    // ---- history navigation ------------------------------------------------

    /// Step back one edit.  Returns whether anything changed.
    pub fn undo(&mut self) -> bool {
        match self.history.undo(self.settings) {
            Some(previous) => {
                self.settings = previous;
                self.is_dirty = true;
                true
            }
            None => false,
        }
    }

    /// Step forward one undone edit.  Returns whether anything changed.
    pub fn redo(&mut self) -> bool {
        match self.history.redo(self.settings) {
            Some(next) => {
                self.settings = next;
                self.is_dirty = true;
                true
            }
            None => false,
        }
    }

    /// Jump to an arbitrary point of the displayed timeline.  Treated as an
    /// edit: pushes the current value and clears the redo branch.
    pub fn jump_to(&mut self, snapshot: EditorSettings) {
        self.edit_settings(snapshot);
    }

    // ---- rendering ---------------------------------------------------------

    /// Re-run the full pipeline from the source.  On success the frame is
    /// stored as the latest snapshot; on failure the previous frame, the
    /// settings and the history are all preserved.
    pub fn render(&mut self) -> Result<&RgbaImage, RenderError> {
        match render::render(&self.layers, &self.settings, self.grain_seed) {
            Ok(frame) => Ok(&*self.rendered.insert(frame)),
            Err(e) => {
                log_err!("render failed: {}", e);
                Err(e)
            }
        }
    }
}

/// Fresh random-ish seed from the system clock.  Good enough for grain; a
/// document wanting reproducibility overwrites `grain_seed` explicitly.
fn seed_from_entropy() -> u32 {
    use std::time::{SystemTime, UNIX_EPOCH};
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => (d.as_nanos() & 0xFFFF_FFFF) as u32,
        Err(_) => 0x5EED_1234,
    }
}
