use image::{Rgba, RgbaImage};
use log::debug;

use crate::io::ConvertError;
use crate::ops::blend::blend_colors;
use crate::settings::OutlineSettings;

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Immutable, row-major copy of an image's pixels taken before painting.
///
/// The painter reads neighbors from here and writes into the live
/// [`RgbaImage`], so a recolored pixel never feeds into the blend of an
/// adjacent outline pixel.
#[derive(Clone, Debug)]
pub struct PixelSnapshot {
    pixels: Vec<Rgba<u8>>,
    width: usize,
}

impl PixelSnapshot {
    pub fn capture(image: &RgbaImage) -> Self {
        Self {
            pixels: image.pixels().copied().collect(),
            width: image.width() as usize,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn pixels(&self) -> &[Rgba<u8>] {
        &self.pixels
    }

    /// Pixel at a signed linear position; `None` outside the image.
    #[inline]
    pub fn get(&self, pos: isize) -> Option<Rgba<u8>> {
        if pos < 0 {
            return None;
        }
        self.pixels.get(pos as usize).copied()
    }

    /// `(x, y)` of a linear index.
    #[inline]
    pub fn coords(&self, index: usize) -> (u32, u32) {
        ((index % self.width) as u32, (index / self.width) as u32)
    }
}

/// A base image and its optional pair of nation-color overlays.
pub struct ImageTriad {
    pub base: RgbaImage,
    pub overlays: Option<[RgbaImage; 2]>,
}

/// True when `color` may take part in an outline blend.
#[inline]
fn contributes(color: Rgba<u8>, settings: &OutlineSettings) -> bool {
    color != TRANSPARENT && color != settings.outline_color && color != settings.shadow_color
}

/// Gather the blend candidates around `index`.
///
/// Candidates are the row above, the left neighbor, `current` (the value the
/// base image holds at `index`), the right neighbor and the row below.
/// Positions outside the snapshot count as transparent.
///
/// Edge policy: the row above is only read when `index - width > 0` and the
/// row below when `index + width > 0`. Columns are not bounds-checked, so the
/// first and last column pick up wrapped pixels from the neighboring row, and
/// the pixel at `index == width` gets no row above.
pub fn collect_neighbor_colors(
    snapshot: &PixelSnapshot,
    index: usize,
    current: Rgba<u8>,
    settings: &OutlineSettings,
) -> Vec<Rgba<u8>> {
    let i = index as isize;
    let w = snapshot.width() as isize;
    let mut colors = Vec::with_capacity(9);

    let mut consider = |color: Option<Rgba<u8>>| {
        if let Some(c) = color
            && contributes(c, settings)
        {
            colors.push(c);
        }
    };

    if i - w > 0 {
        for pos in [i - w - 1, i - w, i - w + 1] {
            consider(snapshot.get(pos));
        }
    }

    consider(snapshot.get(i - 1));
    consider(Some(current));
    consider(snapshot.get(i + 1));

    if i + w > 0 {
        for pos in [i + w - 1, i + w, i + w + 1] {
            consider(snapshot.get(pos));
        }
    }

    colors
}

/// Alpha after attenuation: `alpha / ceil(strength / contributors)`.
#[inline]
pub fn reduce_alpha(alpha: u8, strength: u32, contributors: usize) -> u8 {
    let divisor = strength.div_ceil(contributors.max(1) as u32).max(1);
    (alpha as u32 / divisor) as u8
}

/// Recolor the pixel at `index` of `image` from its snapshot neighborhood.
///
/// Returns `false` and leaves the pixel untouched when no neighbor
/// contributes.
pub fn paint_outline_pixel(
    snapshot: &PixelSnapshot,
    index: usize,
    current: Rgba<u8>,
    image: &mut RgbaImage,
    darken: bool,
    reduce: bool,
    settings: &OutlineSettings,
) -> bool {
    let colors = collect_neighbor_colors(snapshot, index, current, settings);
    if colors.is_empty() {
        return false;
    }

    let mut blended = blend_colors(&colors, darken, settings.outline_darkness);
    if reduce {
        blended[3] = reduce_alpha(blended[3], settings.alpha_reduction_strength, colors.len());
    }

    let (x, y) = snapshot.coords(index);
    image.put_pixel(x, y, blended);
    true
}

/// Recolor every outline pixel of a triad in place.
///
/// Returns how many outline pixels the base image holds; overlays are painted
/// at the same indices. Overlays must match the base dimensions.
pub fn recolor_triad(triad: &mut ImageTriad, settings: &OutlineSettings) -> Result<usize, ConvertError> {
    let base_dims = triad.base.dimensions();
    if let Some(overlays) = &triad.overlays {
        for (slot, overlay) in overlays.iter().enumerate() {
            if overlay.dimensions() != base_dims {
                return Err(ConvertError::DimensionMismatch {
                    overlay: slot + 1,
                    base: base_dims,
                    found: overlay.dimensions(),
                });
            }
        }
    }

    let base_snapshot = PixelSnapshot::capture(&triad.base);
    let overlay_snapshots = triad
        .overlays
        .as_ref()
        .map(|[first, second]| [PixelSnapshot::capture(first), PixelSnapshot::capture(second)]);

    let mut outline_pixels = 0;
    let mut unpainted = 0;
    for (index, &current) in base_snapshot.pixels().iter().enumerate() {
        if current != settings.outline_color {
            continue;
        }
        outline_pixels += 1;

        if !paint_outline_pixel(
            &base_snapshot,
            index,
            current,
            &mut triad.base,
            settings.darken_base_outline,
            false,
            settings,
        ) {
            unpainted += 1;
        }

        if let (Some(overlays), Some(snapshots)) = (triad.overlays.as_mut(), overlay_snapshots.as_ref()) {
            for (overlay, snapshot) in overlays.iter_mut().zip(snapshots) {
                paint_outline_pixel(
                    snapshot,
                    index,
                    current,
                    overlay,
                    settings.darken_nation_outlines,
                    settings.reduce_nation_alpha,
                    settings,
                );
            }
        }
    }

    debug!(
        "{} outline pixels, {} without contributing neighbors",
        outline_pixels, unpainted
    );
    Ok(outline_pixels)
}
