// ============================================================================
// HISTORY — undo/redo over settings snapshots
// ============================================================================
//
// Two stacks of by-value settings snapshots plus the live value held by the
// document.  An edit pushes the outgoing live value onto the undo stack and
// clears the redo stack entirely; history is strictly linear, never a tree.
// The live value itself is never stored in either stack, so
// undo.len() + redo.len() + 1 equals the total timeline length.
// ============================================================================

use std::collections::VecDeque;

use crate::settings::EditorSettings;

#[derive(Default)]
pub struct HistoryManager {
    undo_stack: VecDeque<EditorSettings>,
    redo_stack: VecDeque<EditorSettings>,
}

impl HistoryManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an edit: the outgoing live value is pushed onto the undo
    /// stack and any undone future is discarded.
    pub fn push(&mut self, outgoing_live: EditorSettings) {
        self.redo_stack.clear();
        self.undo_stack.push_back(outgoing_live);
    }

    /// Step back.  Returns the snapshot that becomes the new live value, or
    /// None when there is nothing to undo.
    pub fn undo(&mut self, current_live: EditorSettings) -> Option<EditorSettings> {
        let previous = self.undo_stack.pop_back()?;
        self.redo_stack.push_back(current_live);
        Some(previous)
    }

    /// Step forward.  Returns the snapshot that becomes the new live value,
    /// or None when there is nothing to redo.
    pub fn redo(&mut self, current_live: EditorSettings) -> Option<EditorSettings> {
        let next = self.redo_stack.pop_back()?;
        self.undo_stack.push_back(current_live);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// The timeline as displayed: oldest undo entry first, then the live
    /// value, then the undone future nearest-first.  Returns the entries and
    /// the index of the live value.
    pub fn timeline(&self, current_live: EditorSettings) -> (Vec<EditorSettings>, usize) {
        let mut entries: Vec<EditorSettings> = self.undo_stack.iter().copied().collect();
        let current_index = entries.len();
        entries.push(current_live);
        entries.extend(self.redo_stack.iter().rev().copied());
        (entries, current_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SettingsField;

    fn with(field: SettingsField, v: f32) -> EditorSettings {
        EditorSettings::default().with_field(field, v)
    }

    #[test]
    fn undo_then_redo_restores_the_exact_live_value() {
        let mut history = HistoryManager::new();
        let mut live = EditorSettings::default();

        for i in 1..=5 {
            history.push(live);
            live = with(SettingsField::Brightness, i as f32 * 10.0);
        }
        let before = live;

        for _ in 0..3 {
            live = history.undo(live).unwrap();
        }
        for _ in 0..3 {
            live = history.redo(live).unwrap();
        }
        assert_eq!(live, before, "round-trip must be exact");
    }

    #[test]
    fn edit_clears_the_redo_stack() {
        let mut history = HistoryManager::new();
        let mut live = EditorSettings::default();

        history.push(live);
        live = with(SettingsField::Contrast, 20.0);
        live = history.undo(live).unwrap();
        assert!(history.can_redo());

        // A fresh edit invalidates the undone future.
        history.push(live);
        assert!(!history.can_redo());
        assert_eq!(history.redo_len(), 0);
    }

    #[test]
    fn undo_and_redo_on_empty_stacks_are_noops() {
        let mut history = HistoryManager::new();
        let live = with(SettingsField::Hue, 45.0);
        assert!(history.undo(live).is_none());
        assert!(history.redo(live).is_none());
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn brightness_contrast_undo_redo_scenario() {
        // Edit A (brightness=10), Edit B (contrast=20), then walk the line.
        let mut history = HistoryManager::new();
        let original = EditorSettings::default();
        let mut live = original;

        history.push(live);
        live = with(SettingsField::Brightness, 10.0); // Edit A

        history.push(live);
        live.set_field(SettingsField::Contrast, 20.0); // Edit B

        live = history.undo(live).unwrap();
        assert_eq!(live.brightness, 10.0);
        assert_eq!(live.contrast, 0.0);

        live = history.undo(live).unwrap();
        assert_eq!(live, original);

        live = history.redo(live).unwrap();
        assert_eq!(live.brightness, 10.0);
        assert_eq!(live.contrast, 0.0);
    }

    #[test]
    fn stack_sizes_account_for_the_whole_timeline() {
        let mut history = HistoryManager::new();
        let mut live = EditorSettings::default();
        for i in 0..4 {
            history.push(live);
            live = with(SettingsField::Grain, i as f32 * 5.0);
        }
        live = history.undo(live).unwrap();
        live = history.undo(live).unwrap();
        let (entries, current) = history.timeline(live);
        assert_eq!(entries.len(), history.undo_len() + history.redo_len() + 1);
        assert_eq!(entries.len(), 5);
        assert_eq!(current, history.undo_len());
        assert_eq!(entries[current], live);
    }

    #[test]
    fn timeline_orders_past_live_future() {
        let mut history = HistoryManager::new();
        let a = EditorSettings::default();
        let b = with(SettingsField::Brightness, 10.0);
        let c = with(SettingsField::Brightness, 20.0);

        let mut live = a;
        history.push(live);
        live = b;
        history.push(live);
        live = c;
        live = history.undo(live).unwrap(); // live = b, redo = [c]

        let (entries, current) = history.timeline(live);
        assert_eq!(entries, vec![a, b, c]);
        assert_eq!(current, 1);
    }
}
