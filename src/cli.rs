// ============================================================================
// PixelForge CLI — headless batch rendering via command-line arguments
// ============================================================================
//
// Usage examples:
//   pixelforge --input photo.png --preset vintage --output result.png
//   pixelforge -i photo.jpg --set brightness=20 --set contrast=10 -o out.png
//   pixelforge -i "shots/*.jpg" --preset film --output-dir processed/
//   pixelforge -i photo.png --quick-enhance --seed 42
//
// All processing runs on the current process; per-pixel work is spread across
// rayon's thread pool by the pipeline stages themselves.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::io::{self, export_png};
use crate::presets;
use crate::project::EditorDocument;
use crate::settings::SettingsField;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// PixelForge headless photo processor.
///
/// Apply adjustment presets and individual settings to image files without
/// opening the GUI.
#[derive(Parser, Debug)]
#[command(
    name = "pixelforge",
    about = "PixelForge headless batch photo processor",
    long_about = "Apply adjustment presets and individual slider settings to image\n\
                  files and export the result as PNG. Supports PNG, JPEG, WEBP and\n\
                  BMP input.\n\n\
                  Example:\n  \
                  pixelforge --input photo.png --preset vintage --output result.png\n  \
                  pixelforge -i \"*.jpg\" --set brightness=20 --output-dir out/"
)]
pub struct CliArgs {
    /// Input file(s). Glob patterns accepted (e.g. "*.png", "shots/*.jpg").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Named preset to apply first: vintage, bw, vibrant, soft, dramatic, film.
    #[arg(short, long, value_name = "NAME")]
    pub preset: Option<String>,

    /// Individual setting override, repeatable: --set brightness=20 --set blur=1.5.
    /// Applied after the preset, clamped to each slider's range.
    #[arg(long = "set", value_name = "FIELD=VALUE")]
    pub set: Vec<String>,

    /// Apply the one-click auto enhancement before any preset or --set.
    #[arg(long)]
    pub quick_enhance: bool,

    /// Grain seed, for reproducible film-grain output.
    #[arg(long, value_name = "N")]
    pub seed: Option<u32>,

    /// Output file path. Only valid for single-file input.
    /// For batch input use --output-dir instead.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.
    /// Files are written here as <stem>-edited.png.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Print per-file timing information.
    #[arg(short, long)]
    pub verbose: bool,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = one or more files failed.
pub fn run(args: CliArgs) -> ExitCode {
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    if let Err(e) = validate_output_flags(inputs.len(), args.output.is_some()) {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }

    // Validate the preset name up front so batch runs fail fast.
    let preset = match &args.preset {
        Some(name) => match presets::by_name(name) {
            Some(p) => Some(p),
            None => {
                eprintln!(
                    "error: unknown preset '{}'. Available: {}",
                    name,
                    presets::all()
                        .iter()
                        .map(|p| p.name)
                        .collect::<Vec<_>>()
                        .join(", ")
                );
                return ExitCode::FAILURE;
            }
        },
        None => None,
    };

    // Parse --set overrides once; they apply to every input.
    let overrides = match parse_overrides(&args.set) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(dir) = &args.output_dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!(
                "error: could not create output directory '{}': {}",
                dir.display(),
                e
            );
            return ExitCode::FAILURE;
        }
    }

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }

        let file_start = Instant::now();

        let output_path = build_output_path(
            input_path,
            args.output.as_deref(),
            args.output_dir.as_deref(),
        );

        match run_one(input_path, &output_path, preset, &overrides, &args) {
            Ok(written) => {
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        written.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

// ============================================================================
// Per-file processing pipeline
// ============================================================================

fn run_one(
    input: &Path,
    output: &Path,
    preset: Option<&presets::Preset>,
    overrides: &[(SettingsField, f32)],
    args: &CliArgs,
) -> Result<PathBuf, String> {
    let source = io::load_image(input).map_err(|e| format!("load failed: {}", e))?;

    let mut doc = EditorDocument::new(source);
    if let Some(seed) = args.seed {
        doc.grain_seed = seed;
    }

    if args.quick_enhance {
        doc.quick_enhance();
    }
    if let Some(p) = preset {
        doc.apply_preset(p);
    }
    for &(field, value) in overrides {
        doc.set_field(field, value);
    }

    doc.render().map_err(|e| format!("render failed: {}", e))?;
    let frame = doc.rendered().ok_or("render produced no frame")?;

    export_png(frame, output)
        .map_err(|e| format!("save failed: {}", e))
}

// ============================================================================
// Helpers
// ============================================================================

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);

        if as_path.exists() {
            // Literal path — use directly
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

/// `--output` names exactly one file, so batch runs must use `--output-dir`
/// instead; accepting both would funnel every input into the same path.
fn validate_output_flags(input_count: usize, has_output: bool) -> Result<(), String> {
    if input_count > 1 && has_output {
        return Err(format!(
            "{} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            input_count
        ));
    }
    Ok(())
}

/// Parse repeated `--set field=value` arguments.
fn parse_overrides(pairs: &[String]) -> Result<Vec<(SettingsField, f32)>, String> {
    let mut overrides = Vec::with_capacity(pairs.len());
    for pair in pairs {
        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("--set expects FIELD=VALUE, got '{}'", pair))?;
        let field = SettingsField::from_name(name.trim()).ok_or_else(|| {
            format!(
                "unknown setting '{}'. Available: {}",
                name,
                SettingsField::all()
                    .iter()
                    .map(|f| f.name())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        })?;
        let parsed: f32 = value
            .trim()
            .parse()
            .map_err(|_| format!("'{}' is not a number in '{}'", value, pair))?;
        // "NaN" and "inf" parse successfully but are meaningless as slider
        // positions.
        if !parsed.is_finite() {
            return Err(format!("'{}' is not a finite number in '{}'", value, pair));
        }
        overrides.push((field, parsed));
    }
    Ok(overrides)
}

/// Compute the output path for a single input file.
///
/// Priority:
/// 1. `--output` (explicit path, used for single-file input)
/// 2. `--output-dir` (batch directory, derives filename from input stem)
/// 3. Fallback: timestamped default name next to the input file
fn build_output_path(input: &Path, output: Option<&Path>, output_dir: Option<&Path>) -> PathBuf {
    if let Some(out) = output {
        return out.to_path_buf();
    }

    if let Some(dir) = output_dir {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        return dir.join(format!("{}-edited.png", stem));
    }

    let parent = input.parent().unwrap_or(Path::new("."));
    parent.join(io::default_export_name())
}
