//! PixelForge — non-destructive photo adjustment and compositing engine.
//!
//! The pipeline renders every frame from the pristine source image: layer
//! flatten, geometric transform, the combined tonal/color stage, blur,
//! sharpen, vignette and grain, in that fixed order.  Edits are snapshots of
//! a small settings vector, which is what makes undo/redo exact and cheap.

pub mod canvas;
pub mod cli;
pub mod history;
pub mod io;
pub mod logger;
pub mod ops;
pub mod presets;
pub mod project;
pub mod render;
pub mod settings;
