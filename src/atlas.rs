//! Atlas packing - combines a sheet's sequences into one power-of-two texture
//!
//! Implements the naive shelf packing used by the game's own sheet tool, run
//! for every trial width from 2^22 down to 4 and every [`Heuristic`] visiting
//! order. Trials only compute layouts; the pixels of the single best layout
//! are composited at the end.

use image::{imageops, Rgba, RgbaImage};
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

use crate::order::{sort_baseline, Heuristic, PriorityMap};
use crate::sequence::Sequence;

/// Gap between neighbouring sequences, in pixels.
pub const PADDING: u32 = 8;

/// Widest trial width.
pub const MAX_TRIAL_WIDTH: u32 = 1 << 22;

/// Narrowest trial width.
pub const MIN_TRIAL_WIDTH: u32 = 4;

/// Tallest content a layout may have; beyond this the atlas height
/// no longer fits a `u32` power of two.
const MAX_CONTENT_HEIGHT: u64 = 1 << 31;

/// Transparent color for atlas background
const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Error packing a sheet
#[derive(Debug, Error)]
pub enum PackError {
    #[error(
        "Failed to pack sheet '{sheet}': no trial width between {} and {} fits its {count} sequences (widest is {widest}px)",
        MIN_TRIAL_WIDTH,
        MAX_TRIAL_WIDTH
    )]
    NoLayout {
        sheet: String,
        count: usize,
        widest: u32,
    },
}

/// Configuration for atlas packing
#[derive(Debug, Clone)]
pub struct AtlasConfig {
    /// Flatten translucent pixels onto black after compositing
    pub opaque: bool,
    /// Evaluate trials on the rayon thread pool
    pub parallel: bool,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            opaque: false,
            parallel: true,
        }
    }
}

/// Top-left corner of a sequence inside an atlas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub x: u32,
    pub y: u32,
}

/// Result of one shelf packing trial. Placements are indexed like the
/// `sizes` slice the trial was given, not by visiting order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub trial_width: u32,
    pub placements: Vec<Placement>,
    /// Packed extent without trailing padding
    pub content_width: u32,
    pub content_height: u32,
    /// Power-of-two atlas size
    pub width: u32,
    pub height: u32,
}

/// Ranking of a layout; lower is better, compared field by field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Score {
    /// Power-of-two atlas area
    pub atlas_area: u64,
    /// Area of the packed content before rounding
    pub content_area: u64,
    /// 1 for square content, otherwise `h / w + w / h`
    pub squareness: u32,
}

impl Layout {
    pub fn score(&self) -> Score {
        Score {
            atlas_area: self.width as u64 * self.height as u64,
            content_area: self.content_width as u64 * self.content_height as u64,
            squareness: squareness(self.content_width, self.content_height),
        }
    }
}

fn squareness(w: u32, h: u32) -> u32 {
    if w == h {
        1
    } else {
        h.checked_div(w).unwrap_or(0) + w.checked_div(h).unwrap_or(0)
    }
}

/// A successful trial and the heuristic that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub heuristic: Heuristic,
    pub layout: Layout,
}

/// A packed sheet: the winning layout with its composited pixels.
///
/// `names`, `sizes` and `layout.placements` are all in final pack order.
#[derive(Debug, Clone)]
pub struct PackedAtlas {
    pub names: Vec<String>,
    pub sizes: Vec<(u32, u32)>,
    pub heuristic: Heuristic,
    pub layout: Layout,
    pub image: RgbaImage,
}

impl PackedAtlas {
    pub fn width(&self) -> u32 {
        self.layout.width
    }

    pub fn height(&self) -> u32 {
        self.layout.height
    }
}

/// Pack a sheet's sequences into an atlas.
///
/// Sequences are put into baseline order first (priority group, then name);
/// that order is the final pack order. The sequences are consumed: their
/// pixels are released once composited.
pub fn pack_sheet(
    sheet: &str,
    mut sequences: Vec<Sequence>,
    priority: &PriorityMap,
    config: &AtlasConfig,
) -> Result<PackedAtlas, PackError> {
    sort_baseline(&mut sequences, priority, |s| s.name.as_str());
    let sizes: Vec<(u32, u32)> = sequences.iter().map(|s| (s.width(), s.height())).collect();

    let best = search_layout(&sizes, config.parallel).ok_or_else(|| PackError::NoLayout {
        sheet: sheet.to_string(),
        count: sizes.len(),
        widest: sizes.iter().map(|s| s.0).max().unwrap_or(0),
    })?;

    log::info!(
        "packed '{}': {} sequences into {}x{} (content {}x{}, trial width {}, {} order)",
        sheet,
        sizes.len(),
        best.layout.width,
        best.layout.height,
        best.layout.content_width,
        best.layout.content_height,
        best.layout.trial_width,
        best.heuristic
    );

    let image = composite(&sequences, &best.layout, config.opaque);
    let names = sequences.into_iter().map(|s| s.name).collect();

    Ok(PackedAtlas {
        names,
        sizes,
        heuristic: best.heuristic,
        layout: best.layout,
        image,
    })
}

/// Trial widths in search order: 2^22, 2^21, ..., 4.
pub fn trial_widths() -> impl Iterator<Item = u32> {
    std::iter::successors(Some(MAX_TRIAL_WIDTH), |&w| {
        let next = w / 2;
        (next >= MIN_TRIAL_WIDTH).then_some(next)
    })
}

/// Run every (trial width, heuristic) combination and keep the best layout.
///
/// Ties keep the earliest candidate in search order, so the result does not
/// depend on whether trials run in parallel.
pub fn search_layout(sizes: &[(u32, u32)], parallel: bool) -> Option<Candidate> {
    let orders: Vec<(Heuristic, Vec<usize>)> = Heuristic::ALL
        .iter()
        .map(|&h| (h, h.order(sizes)))
        .collect();
    let trials: Vec<(u32, usize)> = trial_widths()
        .flat_map(|w| (0..orders.len()).map(move |o| (w, o)))
        .collect();

    let run = |&(width, o): &(u32, usize)| {
        let (heuristic, order) = &orders[o];
        shelf_pack(sizes, order, width).map(|layout| Candidate {
            heuristic: *heuristic,
            layout,
        })
    };
    let candidates: Vec<Option<Candidate>> = if parallel {
        trials.par_iter().map(run).collect()
    } else {
        trials.iter().map(run).collect()
    };

    let mut best: Option<Candidate> = None;
    for candidate in candidates.into_iter().flatten() {
        let score = candidate.layout.score();
        let is_best = best.as_ref().map_or(true, |b| score < b.layout.score());
        log::debug!(
            "packing option: {}x{} ({} pixels, width {}, {} order) ({})",
            candidate.layout.content_width,
            candidate.layout.content_height,
            score.content_area,
            candidate.layout.trial_width,
            candidate.heuristic,
            if is_best { "new best" } else { "discarding" }
        );
        if is_best {
            best = Some(candidate);
        }
    }

    best
}

/// Shelf-pack `sizes` visiting them in `order`, wrapping rows at `trial_width`.
///
/// Returns `None` if a single sequence is wider than `trial_width`.
pub fn shelf_pack(sizes: &[(u32, u32)], order: &[usize], trial_width: u32) -> Option<Layout> {
    let width_limit = trial_width as u64;
    let padding = PADDING as u64;
    let mut placements = vec![Placement { x: 0, y: 0 }; sizes.len()];
    let (mut row, mut col, mut next_row, mut max_col) = (0u64, 0u64, 0u64, 0u64);

    for &i in order {
        let (w, h) = (sizes[i].0 as u64, sizes[i].1 as u64);
        if col + w > width_limit {
            col = 0;
            row = next_row;
        }
        if col + w > width_limit {
            return None;
        }

        placements[i] = Placement {
            x: col as u32,
            y: u32::try_from(row).ok()?,
        };

        next_row = next_row.max(row + h + padding);
        col += w + padding;
        max_col = max_col.max(col);
    }

    // no trailing padding: texture coordinates are clamped, not wrapped
    let content_width = max_col.saturating_sub(padding);
    let content_height = next_row.saturating_sub(padding);
    if content_height > MAX_CONTENT_HEIGHT {
        return None;
    }
    let (content_width, content_height) = (content_width as u32, content_height as u32);

    Some(Layout {
        trial_width,
        placements,
        content_width,
        content_height,
        width: next_power_of_two(content_width),
        height: next_power_of_two(content_height),
    })
}

/// Get the next power of two >= n
fn next_power_of_two(n: u32) -> u32 {
    n.max(1).next_power_of_two()
}

/// Draw every sequence at its placement, with edge bleed.
fn composite(sequences: &[Sequence], layout: &Layout, opaque: bool) -> RgbaImage {
    let mut atlas = RgbaImage::from_pixel(layout.width, layout.height, TRANSPARENT);

    for (sequence, placement) in sequences.iter().zip(&layout.placements) {
        stamp_with_bleed(
            &mut atlas,
            &sequence.image,
            placement.x as i64,
            placement.y as i64,
        );
    }

    if opaque {
        flatten_opaque(&mut atlas);
    }

    atlas
}

/// Copy `image` to (`x`, `y`), first stamping shifted copies into the
/// surrounding padding so bilinear sampling at the edges sees edge pixels.
///
/// Diagonal shifts come first, then orthogonal ones, each from half the
/// padding down to 1; the unshifted image is drawn last.
fn stamp_with_bleed(atlas: &mut RgbaImage, image: &RgbaImage, x: i64, y: i64) {
    let bleed = (PADDING / 2) as i64;

    for o in (1..=bleed).rev() {
        for (dx, dy) in [(o, o), (-o, -o), (o, -o), (-o, o)] {
            imageops::replace(atlas, image, x + dx, y + dy);
        }
    }

    for o in (1..=bleed).rev() {
        for (dx, dy) in [(-o, 0), (o, 0), (0, -o), (0, o)] {
            imageops::replace(atlas, image, x + dx, y + dy);
        }
    }

    imageops::replace(atlas, image, x, y);
}

/// Replace every translucent pixel with its color over opaque black.
fn flatten_opaque(atlas: &mut RgbaImage) {
    for pixel in atlas.pixels_mut() {
        let a = pixel[3] as u32;
        if a < 255 {
            for c in 0..3 {
                // 16-bit premultiply, then back to 8 bits
                pixel[c] = ((pixel[c] as u32 * 0x101 * a / 0xff) >> 8) as u8;
            }
            pixel[3] = 255;
        }
    }
}
