// ============================================================================
// IMAGE AND PROJECT I/O
// ============================================================================
//
// Decoding source images, exporting rendered frames as PNG, and persisting a
// whole editing session (image + settings + layer metadata) through a small
// key/value store abstraction so the project survives restarts.
// ============================================================================

use std::collections::HashMap;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, ImageError, RgbaImage};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::canvas::{BlendMode, Layer, LayerStack};
use crate::log_info;
use crate::settings::EditorSettings;

/// Store key under which the single persisted session lives.
pub const PROJECT_KEY: &str = "pixelforge-project";

/// Error type for image and project file operations.
#[derive(Debug)]
pub enum ProjectError {
    Io(std::io::Error),
    Image(String),
    Serialize(String),
    InvalidFormat(String),
    MissingProject,
}

impl std::fmt::Display for ProjectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectError::Io(e) => write!(f, "I/O error: {}", e),
            ProjectError::Image(e) => write!(f, "Image error: {}", e),
            ProjectError::Serialize(e) => write!(f, "Serialization error: {}", e),
            ProjectError::InvalidFormat(e) => write!(f, "Invalid format: {}", e),
            ProjectError::MissingProject => write!(f, "No saved project found"),
        }
    }
}

impl std::error::Error for ProjectError {}

impl From<std::io::Error> for ProjectError {
    fn from(e: std::io::Error) -> Self {
        ProjectError::Io(e)
    }
}

impl From<ImageError> for ProjectError {
    fn from(e: ImageError) -> Self {
        ProjectError::Image(e.to_string())
    }
}

impl From<Box<bincode::ErrorKind>> for ProjectError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        ProjectError::Serialize(e.to_string())
    }
}

// ----------------------------------------------------------------------------
// Source decode / frame export
// ----------------------------------------------------------------------------

/// Decode any supported raster file (PNG, JPEG, WebP, BMP, ...) to RGBA8.
pub fn load_image(path: &Path) -> Result<RgbaImage, ProjectError> {
    let img = image::open(path)?;
    Ok(img.to_rgba8())
}

/// Timestamped default export name, e.g. `edited-image-1724999999999.png`.
pub fn default_export_name() -> String {
    let ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    format!("edited-image-{}.png", ms)
}

/// Write a rendered frame as PNG.  Returns the path actually written: when
/// `path` is a directory the timestamped default name is appended.
pub fn export_png(frame: &RgbaImage, path: &Path) -> Result<PathBuf, ProjectError> {
    let target = if path.is_dir() {
        path.join(default_export_name())
    } else {
        path.to_path_buf()
    };
    if let Some(parent) = target.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let file = fs::File::create(&target)?;
    let encoder = PngEncoder::new(std::io::BufWriter::new(file));
    encoder.write_image(
        frame.as_raw(),
        frame.width(),
        frame.height(),
        ColorType::Rgba8,
    )?;
    log_info!("Exported {}x{} frame to {}", frame.width(), frame.height(), target.display());
    Ok(target)
}

// ----------------------------------------------------------------------------
// Session persistence
// ----------------------------------------------------------------------------

/// Byte-valued key/value store.  The desktop build uses a directory on disk;
/// tests use the in-memory variant.
pub trait KvStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ProjectError>;
    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), ProjectError>;
    fn remove(&mut self, key: &str) -> Result<(), ProjectError>;
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStore {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ProjectError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), ProjectError> {
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), ProjectError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Directory-backed store: each key is one file under the root.
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, ProjectError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.bin", key))
    }
}

impl KvStore for DirStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ProjectError> {
        match fs::read(self.key_path(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), ProjectError> {
        fs::write(self.key_path(key), value)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), ProjectError> {
        match fs::remove_file(self.key_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Serializable layer metadata.  Pixel content beyond the source image is
/// not persisted; only the background layer carries pixels, re-derived from
/// the stored source on load.
#[derive(Serialize, Deserialize)]
struct LayerData {
    id: String,
    name: String,
    visible: bool,
    opacity: f32,
    blend_mode: String,
    locked: bool,
    has_pixels: bool,
}

/// The persisted session: PNG-encoded source, settings, layer metadata and a
/// save timestamp.
#[derive(Serialize, Deserialize)]
struct ProjectBundle {
    magic: String,
    image_png: Vec<u8>,
    settings: EditorSettings,
    active_layer_id: Option<String>,
    layers: Vec<LayerData>,
    timestamp_ms: u64,
}

const BUNDLE_MAGIC: &str = "PXF1";

/// Everything `load_project` recovers from the store.
pub struct SavedProject {
    pub source: RgbaImage,
    pub settings: EditorSettings,
    pub stack: LayerStack,
    pub timestamp_ms: u64,
}

/// Persist the current session under [`PROJECT_KEY`].
pub fn save_project(
    store: &mut dyn KvStore,
    source: &RgbaImage,
    settings: &EditorSettings,
    stack: &LayerStack,
) -> Result<(), ProjectError> {
    let mut image_png = Vec::new();
    PngEncoder::new(Cursor::new(&mut image_png)).write_image(
        source.as_raw(),
        source.width(),
        source.height(),
        ColorType::Rgba8,
    )?;

    let layers = stack
        .layers
        .iter()
        .map(|l| LayerData {
            id: l.id.to_string(),
            name: l.name.clone(),
            visible: l.visible,
            opacity: l.opacity,
            blend_mode: l.blend_mode.name().to_string(),
            locked: l.locked,
            has_pixels: l.pixels.is_some(),
        })
        .collect();

    let bundle = ProjectBundle {
        magic: BUNDLE_MAGIC.to_string(),
        image_png,
        settings: *settings,
        active_layer_id: stack.active_layer_id.map(|id| id.to_string()),
        layers,
        timestamp_ms: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0),
    };

    let bytes = bincode::serialize(&bundle)?;
    store.set(PROJECT_KEY, &bytes)?;
    log_info!("Saved project ({} bytes) under '{}'", bytes.len(), PROJECT_KEY);
    Ok(())
}

/// Restore the persisted session from the store, rebuilding the layer stack
/// around the decoded source.
pub fn load_project(store: &dyn KvStore) -> Result<SavedProject, ProjectError> {
    let bytes = store.get(PROJECT_KEY)?.ok_or(ProjectError::MissingProject)?;
    let bundle: ProjectBundle = bincode::deserialize(&bytes)?;
    if bundle.magic != BUNDLE_MAGIC {
        return Err(ProjectError::InvalidFormat(format!(
            "unknown project magic '{}'",
            bundle.magic
        )));
    }

    let source = image::load_from_memory(&bundle.image_png)?.to_rgba8();
    if source.width() == 0 || source.height() == 0 {
        return Err(ProjectError::InvalidFormat(
            "stored image has zero size".to_string(),
        ));
    }

    let mut stack = LayerStack {
        layers: Vec::with_capacity(bundle.layers.len()),
        active_layer_id: None,
        width: source.width(),
        height: source.height(),
    };
    for data in &bundle.layers {
        let id = Uuid::parse_str(&data.id)
            .map_err(|e| ProjectError::InvalidFormat(format!("bad layer id: {}", e)))?;
        stack.layers.push(Layer {
            id,
            name: data.name.clone(),
            visible: data.visible,
            opacity: data.opacity.clamp(0.0, 100.0),
            blend_mode: BlendMode::from_name(&data.blend_mode),
            locked: data.locked,
            pixels: if data.has_pixels {
                Some(source.clone())
            } else {
                None
            },
        });
    }
    if stack.layers.is_empty() {
        stack = LayerStack::for_source(&source);
    } else {
        stack.active_layer_id = bundle
            .active_layer_id
            .as_deref()
            .and_then(|s| Uuid::parse_str(s).ok())
            .filter(|id| stack.layer_index(*id).is_some())
            .or(Some(stack.layers[0].id));
    }

    Ok(SavedProject {
        source,
        settings: bundle.settings.clamped(),
        stack,
        timestamp_ms: bundle.timestamp_ms,
    })
}
