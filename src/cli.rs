// ============================================================================
// OutlineTint CLI — batch outline recoloring of a tile-set directory
// ============================================================================
//
// Usage examples:
//   OutlineTint Images/TileSets/HexaRealm/Units
//   OutlineTint units/ --settings outline.cfg --verbose
//   OutlineTint units/ --darkness 2 --shadow-color 0,0,0,0 --output-dir out/
//   OutlineTint units/ --write-settings outline.cfg
//
// Every triad (base image + optional nation-color overlays) is loaded,
// recolored and saved before the next one is touched. Any failure aborts the
// whole run.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use image::Rgba;
use log::{debug, error, info};

use crate::io::{ConvertError, OUTPUT_DIR_NAME, TriadPaths, discover_triads, load_triad, save_triad};
use crate::ops::outline::recolor_triad;
use crate::settings::{OutlineSettings, parse_rgba};

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// Recolor flat outlines of tile images from their surroundings.
#[derive(Parser, Debug)]
#[command(
    name = "OutlineTint",
    about = "Recolor sprite outlines from neighboring pixels",
    long_about = "Replace every outline-colored pixel of the PNG images in a directory\n\
                  with a blend of its neighbors, and mirror the blend onto the\n\
                  nation color overlays (<name>-1.png, <name>-2.png).\n\
                  Results are written to <SOURCE_DIR>/ColoredOutline unless\n\
                  --output-dir is given.\n\n\
                  Example:\n  \
                  OutlineTint units/ --settings outline.cfg --verbose"
)]
pub struct CliArgs {
    /// Directory holding the base images and their overlays.
    #[arg(value_name = "SOURCE_DIR")]
    pub source: PathBuf,

    /// Settings file (key=value lines). Command-line values override it.
    #[arg(short, long, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Output directory. Defaults to <SOURCE_DIR>/ColoredOutline.
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Write the effective settings to FILE before converting.
    #[arg(long, value_name = "FILE")]
    pub write_settings: Option<PathBuf>,

    /// Marker color of outline pixels.
    #[arg(long, value_name = "R,G,B,A", value_parser = parse_rgba)]
    pub outline_color: Option<Rgba<u8>>,

    /// Color excluded from blends (0,0,0,0 lets shadows bleed in).
    #[arg(long, value_name = "R,G,B,A", value_parser = parse_rgba)]
    pub shadow_color: Option<Rgba<u8>>,

    /// Outline darkness (> 1 darker, < 1 lighter, must be positive).
    #[arg(short, long, value_name = "FACTOR")]
    pub darkness: Option<f64>,

    /// Alpha reduction strength for overlay outlines (> 0).
    #[arg(long, value_name = "N")]
    pub alpha_strength: Option<u32>,

    /// Darken the base image outline.
    #[arg(long, value_name = "BOOL")]
    pub darken_base_outline: Option<bool>,

    /// Darken the nation color overlay outlines.
    #[arg(long, value_name = "BOOL")]
    pub darken_nation_outlines: Option<bool>,

    /// Reduce overlay outline alpha where few neighbors contributed.
    #[arg(long, value_name = "BOOL")]
    pub reduce_nation_alpha: Option<bool>,

    /// Print per-file timing and pixel counts.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    /// Defaults, then the settings file, then command-line overrides.
    pub fn resolve_settings(&self) -> Result<OutlineSettings, String> {
        let mut s = match &self.settings {
            Some(path) => OutlineSettings::load(path)
                .map_err(|e| format!("settings '{}': {}", path.display(), e))?,
            None => OutlineSettings::default(),
        };

        if let Some(c) = self.outline_color {
            s.outline_color = c;
        }
        if let Some(c) = self.shadow_color {
            s.shadow_color = c;
        }
        if let Some(d) = self.darkness {
            s.outline_darkness = d;
        }
        if let Some(n) = self.alpha_strength {
            s.alpha_reduction_strength = n;
        }
        if let Some(b) = self.darken_base_outline {
            s.darken_base_outline = b;
        }
        if let Some(b) = self.darken_nation_outlines {
            s.darken_nation_outlines = b;
        }
        if let Some(b) = self.reduce_nation_alpha {
            s.reduce_nation_alpha = b;
        }

        s.validate().map_err(|e| e.to_string())?;
        Ok(s)
    }

    fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| self.source.join(OUTPUT_DIR_NAME))
    }
}

// ============================================================================
// Public entry point
// ============================================================================

/// Totals of one directory run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConversionSummary {
    /// Triads inspected.
    pub triads: usize,
    /// Triads that had outline pixels and were written.
    pub converted: usize,
    /// Outline pixels recolored across all base images.
    pub outline_pixels: usize,
}

/// Run the conversion and return an OS exit code.
pub fn run(args: CliArgs) -> ExitCode {
    let settings = match args.resolve_settings() {
        Ok(s) => s,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    debug!("effective settings:\n{}", settings.to_config_string());

    if let Some(path) = &args.write_settings {
        if let Err(e) = std::fs::write(path, settings.to_config_string()) {
            error!("could not write settings '{}': {}", path.display(), e);
            return ExitCode::FAILURE;
        }
        info!("settings written to {}", path.display());
    }

    let output_dir = args.output_dir();
    let start = Instant::now();
    match convert_directory(&args.source, &output_dir, &settings, args.verbose) {
        Ok(summary) => {
            info!(
                "converted {} of {} images ({} outline pixels) in {:.0}ms",
                summary.converted,
                summary.triads,
                summary.outline_pixels,
                start.elapsed().as_secs_f64() * 1000.0
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Recolor every triad in `source` and write results to `output_dir`.
pub fn convert_directory(
    source: &Path,
    output_dir: &Path,
    settings: &OutlineSettings,
    verbose: bool,
) -> Result<ConversionSummary, ConvertError> {
    let triads = discover_triads(source)?;
    std::fs::create_dir_all(output_dir)?;
    info!(
        "{} base images in {}, writing to {}",
        triads.len(),
        source.display(),
        output_dir.display()
    );

    let mut summary = ConversionSummary {
        triads: triads.len(),
        ..Default::default()
    };

    for paths in &triads {
        let file_start = Instant::now();
        let found = run_one(paths, output_dir, settings)?;
        if found == 0 {
            debug!("{}: no outline pixels, skipped", paths.display_name());
            continue;
        }

        summary.converted += 1;
        summary.outline_pixels += found;
        println!(
            "Converted {}{}",
            paths.display_name(),
            if paths.overlays.is_some() { " and its nation color overlays" } else { "" }
        );
        if verbose {
            println!(
                "  {} outline pixels ({:.0}ms)",
                found,
                file_start.elapsed().as_secs_f64() * 1000.0
            );
        }
    }

    Ok(summary)
}

// ============================================================================
// Per-triad processing pipeline
// ============================================================================

/// Load, recolor and (when outline pixels were found) save one triad.
/// Returns the number of outline pixels in the base image.
fn run_one(paths: &TriadPaths, output_dir: &Path, settings: &OutlineSettings) -> Result<usize, ConvertError> {
    // -- Step 1: Load ----------------------------------------------------
    let mut triad = load_triad(paths)?;

    // -- Step 2: Recolor -------------------------------------------------
    let found = recolor_triad(&mut triad, settings)?;

    // -- Step 3: Save ----------------------------------------------------
    if found > 0 {
        save_triad(&triad, paths, output_dir)?;
    }

    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{load_rgba, save_png};
    use image::RgbaImage;

    const OUTLINE: Rgba<u8> = Rgba([0, 0, 0, 255]);

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("outlinetint_cli_{}_{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn plain_settings() -> OutlineSettings {
        OutlineSettings {
            darken_base_outline: false,
            darken_nation_outlines: false,
            reduce_nation_alpha: false,
            ..Default::default()
        }
    }

    fn plus_image() -> RgbaImage {
        let mut img = RgbaImage::new(3, 3);
        img.put_pixel(1, 1, OUTLINE);
        img.put_pixel(1, 0, Rgba([200, 0, 0, 255]));
        img.put_pixel(0, 1, Rgba([0, 100, 0, 255]));
        img.put_pixel(2, 1, Rgba([0, 0, 50, 255]));
        img.put_pixel(1, 2, Rgba([11, 22, 33, 255]));
        img
    }

    #[test]
    fn converts_a_triad_end_to_end() {
        let dir = scratch_dir("triad");
        save_png(&plus_image(), &dir.join("Archer.png")).unwrap();
        let mut overlay = RgbaImage::new(3, 3);
        overlay.put_pixel(1, 0, Rgba([255, 255, 255, 255]));
        save_png(&overlay, &dir.join("Archer-1.png")).unwrap();
        save_png(&RgbaImage::new(3, 3), &dir.join("Archer-2.png")).unwrap();

        let out = dir.join(OUTPUT_DIR_NAME);
        let summary = convert_directory(&dir, &out, &plain_settings(), false).unwrap();
        assert_eq!(summary, ConversionSummary { triads: 1, converted: 1, outline_pixels: 1 });

        let base = load_rgba(&out.join("Archer.png")).unwrap();
        assert_eq!(*base.get_pixel(1, 1), Rgba([52, 30, 20, 255]));
        let first = load_rgba(&out.join("Archer-1.png")).unwrap();
        assert_eq!(*first.get_pixel(1, 1), Rgba([255, 255, 255, 255]));
        assert!(out.join("Archer-2.png").is_file());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn triad_without_outline_writes_nothing() {
        let dir = scratch_dir("no_outline");
        let mut img = plus_image();
        img.put_pixel(1, 1, Rgba([9, 9, 9, 255]));
        save_png(&img, &dir.join("Tree.png")).unwrap();
        save_png(&img, &dir.join("Tree-1.png")).unwrap();
        save_png(&img, &dir.join("Tree-2.png")).unwrap();

        let out = dir.join(OUTPUT_DIR_NAME);
        let summary = convert_directory(&dir, &out, &plain_settings(), false).unwrap();
        assert_eq!(summary.converted, 0);
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 0);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn mismatched_overlay_aborts_the_run() {
        let dir = scratch_dir("mismatch");
        save_png(&plus_image(), &dir.join("Knight.png")).unwrap();
        save_png(&RgbaImage::new(3, 3), &dir.join("Knight-1.png")).unwrap();
        save_png(&RgbaImage::new(2, 2), &dir.join("Knight-2.png")).unwrap();

        let out = dir.join(OUTPUT_DIR_NAME);
        let err = convert_directory(&dir, &out, &plain_settings(), false).unwrap_err();
        assert!(matches!(err, ConvertError::DimensionMismatch { .. }));
        assert!(!out.join("Knight.png").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn command_line_overrides_settings_file() {
        let dir = scratch_dir("settings");
        let cfg = dir.join("outline.cfg");
        std::fs::write(&cfg, "outline_darkness=2.5\nalpha_reduction_strength=4\n").unwrap();

        let args = CliArgs::parse_from([
            "OutlineTint",
            dir.to_str().unwrap(),
            "--settings",
            cfg.to_str().unwrap(),
            "--alpha-strength",
            "6",
            "--shadow-color",
            "0,0,0,0",
            "--reduce-nation-alpha",
            "false",
        ]);
        let s = args.resolve_settings().unwrap();
        assert_eq!(s.outline_darkness, 2.5);
        assert_eq!(s.alpha_reduction_strength, 6);
        assert_eq!(s.shadow_color, Rgba([0, 0, 0, 0]));
        assert!(!s.reduce_nation_alpha);
        assert!(s.darken_base_outline);
        assert_eq!(args.output_dir(), dir.join(OUTPUT_DIR_NAME));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn zero_darkness_is_refused_before_converting() {
        let args = CliArgs::parse_from(["OutlineTint", "units", "--darkness", "0"]);
        assert!(args.resolve_settings().is_err());
        let args = CliArgs::parse_from(["OutlineTint", "units", "--darkness=-1.5"]);
        assert!(args.resolve_settings().is_err());
    }
}
