use image::codecs::png::PngEncoder;
use image::{ImageEncoder, ImageError, RgbaImage};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::ops::outline::ImageTriad;

/// Name of the output directory created inside the source directory.
pub const OUTPUT_DIR_NAME: &str = "ColoredOutline";

/// Filename suffixes of the two nation-color overlays.
pub const OVERLAY_SUFFIXES: [&str; 2] = ["-1", "-2"];

/// Error type for loading, converting and saving image triads
#[derive(Debug)]
pub enum ConvertError {
    Io(std::io::Error),
    Image { path: PathBuf, source: ImageError },
    InvalidSourceDir(PathBuf),
    Pattern(String),
    MissingOverlay { base: PathBuf, missing: PathBuf },
    DimensionMismatch { overlay: usize, base: (u32, u32), found: (u32, u32) },
}

impl std::fmt::Display for ConvertError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConvertError::Io(e) => write!(f, "I/O error: {}", e),
            ConvertError::Image { path, source } => {
                write!(f, "image error in '{}': {}", path.display(), source)
            }
            ConvertError::InvalidSourceDir(p) => {
                write!(f, "source '{}' is not a directory", p.display())
            }
            ConvertError::Pattern(e) => write!(f, "invalid file pattern: {}", e),
            ConvertError::MissingOverlay { base, missing } => write!(
                f,
                "'{}' has a first nation color overlay but '{}' is missing",
                base.display(),
                missing.display()
            ),
            ConvertError::DimensionMismatch { overlay, base, found } => write!(
                f,
                "nation color overlay {} is {}x{} but the base image is {}x{}",
                overlay, found.0, found.1, base.0, base.1
            ),
        }
    }
}

impl std::error::Error for ConvertError {}

impl From<std::io::Error> for ConvertError {
    fn from(e: std::io::Error) -> Self {
        ConvertError::Io(e)
    }
}

/// Paths of one base image and, when present, its two overlays.
#[derive(Clone, Debug, PartialEq)]
pub struct TriadPaths {
    pub base: PathBuf,
    pub overlays: Option<[PathBuf; 2]>,
}

impl TriadPaths {
    /// File name of the base image, for progress output.
    pub fn display_name(&self) -> String {
        self.base
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.base.display().to_string())
    }

    /// Every path of the triad, base first.
    pub fn all(&self) -> Vec<&Path> {
        let mut paths = vec![self.base.as_path()];
        if let Some(overlays) = &self.overlays {
            paths.extend(overlays.iter().map(PathBuf::as_path));
        }
        paths
    }
}

/// `name.png` → `name-1.png` (or `-2`) in the same directory.
fn overlay_path(base: &Path, suffix: &str) -> Option<PathBuf> {
    let stem = base.file_stem()?.to_str()?;
    let ext = base.extension().and_then(|e| e.to_str()).unwrap_or("png");
    Some(base.with_file_name(format!("{}{}.{}", stem, suffix, ext)))
}

fn is_overlay(path: &Path) -> bool {
    path.file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|stem| OVERLAY_SUFFIXES.iter().any(|suf| stem.ends_with(suf)))
}

/// List the base images of `dir` with their overlays, in sorted order.
///
/// A base image is any `*.png` whose stem does not end in `-1` or `-2`. Its
/// overlay pair counts as present when `<stem>-1.png` exists; the second
/// overlay is then required.
pub fn discover_triads(dir: &Path) -> Result<Vec<TriadPaths>, ConvertError> {
    if !dir.is_dir() {
        return Err(ConvertError::InvalidSourceDir(dir.to_path_buf()));
    }

    let pattern = glob::Pattern::escape(&dir.to_string_lossy()) + "/*.png";
    let entries = glob::glob(&pattern).map_err(|e| ConvertError::Pattern(e.to_string()))?;

    let mut triads = Vec::new();
    for entry in entries {
        let base = entry.map_err(|e| ConvertError::Io(e.into_error()))?;
        if !base.is_file() || is_overlay(&base) {
            continue;
        }

        let overlays = match overlay_path(&base, OVERLAY_SUFFIXES[0]) {
            Some(first) if first.is_file() => {
                let second = overlay_path(&base, OVERLAY_SUFFIXES[1]).unwrap_or_default();
                if !second.is_file() {
                    return Err(ConvertError::MissingOverlay { base, missing: second });
                }
                Some([first, second])
            }
            _ => None,
        };
        triads.push(TriadPaths { base, overlays });
    }

    Ok(triads)
}

/// Decode any image the `image` crate understands into RGBA8.
pub fn load_rgba(path: &Path) -> Result<RgbaImage, ConvertError> {
    image::open(path)
        .map(|img| img.to_rgba8())
        .map_err(|source| ConvertError::Image { path: path.to_path_buf(), source })
}

/// Load all images of a triad.
pub fn load_triad(paths: &TriadPaths) -> Result<ImageTriad, ConvertError> {
    let base = load_rgba(&paths.base)?;
    let overlays = match &paths.overlays {
        Some([first, second]) => Some([load_rgba(first)?, load_rgba(second)?]),
        None => None,
    };
    Ok(ImageTriad { base, overlays })
}

/// Encode `image` as an RGBA PNG at `path`.
pub fn save_png(image: &RgbaImage, path: &Path) -> Result<(), ConvertError> {
    let to_err = |source: ImageError| ConvertError::Image { path: path.to_path_buf(), source };
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    PngEncoder::new(&mut writer)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ColorType::Rgba8,
        )
        .map_err(to_err)?;
    Ok(())
}

/// Where a source file lands inside `output_dir`.
pub fn output_path(source: &Path, output_dir: &Path) -> Option<PathBuf> {
    Some(output_dir.join(source.file_name()?))
}

/// Save every image of a triad under `output_dir`, keeping file names.
pub fn save_triad(triad: &ImageTriad, paths: &TriadPaths, output_dir: &Path) -> Result<(), ConvertError> {
    let images = std::iter::once(&triad.base).chain(triad.overlays.iter().flatten());
    for (image, source) in images.zip(paths.all()) {
        let target = output_path(source, output_dir)
            .ok_or_else(|| ConvertError::InvalidSourceDir(source.to_path_buf()))?;
        save_png(image, &target)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("outlinetint_io_{}_{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_blank(path: &Path, w: u32, h: u32) {
        save_png(&RgbaImage::new(w, h), path).unwrap();
    }

    #[test]
    fn overlay_names_follow_the_base() {
        let base = Path::new("units/Archer.png");
        assert_eq!(overlay_path(base, "-1").unwrap(), Path::new("units/Archer-1.png"));
        assert_eq!(overlay_path(base, "-2").unwrap(), Path::new("units/Archer-2.png"));
        assert!(is_overlay(Path::new("units/Archer-2.png")));
        assert!(!is_overlay(Path::new("units/Archer.png")));
        assert!(!is_overlay(Path::new("units/Tier12.png")));
    }

    #[test]
    fn discovers_bases_and_overlay_pairs() {
        let dir = scratch_dir("discover");
        write_blank(&dir.join("Archer.png"), 2, 2);
        write_blank(&dir.join("Archer-1.png"), 2, 2);
        write_blank(&dir.join("Archer-2.png"), 2, 2);
        write_blank(&dir.join("Warrior.png"), 2, 2);
        std::fs::write(dir.join("notes.txt"), "skip me").unwrap();

        let triads = discover_triads(&dir).unwrap();
        assert_eq!(triads.len(), 2);
        assert_eq!(triads[0].display_name(), "Archer.png");
        assert_eq!(triads[0].all().len(), 3);
        assert_eq!(triads[1].display_name(), "Warrior.png");
        assert!(triads[1].overlays.is_none());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn first_overlay_without_second_is_an_error() {
        let dir = scratch_dir("missing");
        write_blank(&dir.join("Scout.png"), 2, 2);
        write_blank(&dir.join("Scout-1.png"), 2, 2);

        let err = discover_triads(&dir).unwrap_err();
        assert!(matches!(err, ConvertError::MissingOverlay { .. }));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_source_dir_is_reported() {
        let dir = std::env::temp_dir().join("outlinetint_io_does_not_exist");
        assert!(matches!(discover_triads(&dir), Err(ConvertError::InvalidSourceDir(_))));
    }

    #[test]
    fn png_round_trip_keeps_rgba() {
        let dir = scratch_dir("png");
        let path = dir.join("pixel.png");
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(1, 0, Rgba([1, 2, 3, 4]));
        save_png(&img, &path).unwrap();
        assert_eq!(load_rgba(&path).unwrap(), img);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn unreadable_image_names_its_path() {
        let dir = scratch_dir("garbage");
        let path = dir.join("broken.png");
        std::fs::write(&path, b"not a png").unwrap();
        match load_rgba(&path) {
            Err(ConvertError::Image { path: p, .. }) => assert_eq!(p, path),
            other => panic!("unexpected result: {:?}", other.map(|i| i.dimensions())),
        }

        let _ = std::fs::remove_dir_all(&dir);
    }
}
