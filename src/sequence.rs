//! Sequence aggregation - cuts catalog regions out of the frame stream
//!
//! Works in two phases. The frame pass walks the stream once and stores every
//! requested crop under a [`CropKey`] (sheet, sequence, role). The
//! finalization pass then turns the stored crops into [`Sequence`]s, deriving
//! glow images for additive entries. Frame arrival order never matters.

use image::{imageops, RgbaImage};
use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;

use crate::config::{Rect, SheetConfig};
use crate::frames::{FrameError, FrameSource};

/// Error while building sequences
#[derive(Debug, Error)]
pub enum SequenceError {
    #[error(transparent)]
    Frame(#[from] FrameError),
    /// The stream ended before a frame some region depends on
    #[error(
        "Frame {index} is needed by '{sequence}' in sheet '{sheet}' but the frame stream ends before it"
    )]
    MissingFrame {
        index: u32,
        sequence: String,
        sheet: String,
    },
    #[error(
        "Region of '{sequence}' ({}x{} at {},{}) does not fit in frame {index} ({frame_w}x{frame_h})",
        rect.w,
        rect.h,
        rect.x,
        rect.y
    )]
    RegionOutOfBounds {
        sequence: String,
        rect: Rect,
        index: u32,
        frame_w: u32,
        frame_h: u32,
    },
    #[error("Sequence name '{name}' is used twice in sheet '{sheet}'")]
    DuplicateSequence { name: String, sheet: String },
}

/// One named single-frame image destined for an atlas.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    pub name: String,
    pub image: RgbaImage,
}

impl Sequence {
    pub fn new(name: impl Into<String>, image: RgbaImage) -> Self {
        Self {
            name: name.into(),
            image,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// What a stored crop is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CropRole {
    /// The sequence image itself
    Plain,
    /// Non-hovered state of an additive sequence
    Base,
    /// Hovered state of an additive sequence
    Hover,
}

/// Identity of a stored crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CropKey {
    pub sheet: usize,
    pub sequence: usize,
    pub role: CropRole,
}

/// Where one sequence comes from.
#[derive(Debug, Clone)]
struct SequencePlan {
    name: String,
    rect: Rect,
    index: u32,
    base: Option<u32>,
}

#[derive(Debug, Clone, Copy)]
struct CropRequest {
    key: CropKey,
    rect: Rect,
}

/// Build the sequences of every sheet from one pass over `source`.
///
/// Returns one list per sheet, in catalog order. Stops reading frames once
/// every crop has been taken or the stream ends, whichever comes first.
pub fn collect_sequences(
    sheets: &[SheetConfig],
    source: &mut dyn FrameSource,
) -> Result<Vec<Vec<Sequence>>, SequenceError> {
    let plans = plan_sheets(sheets)?;

    let mut requests: BTreeMap<u32, Vec<CropRequest>> = BTreeMap::new();
    let mut request = |index: u32, key: CropKey, rect: Rect| {
        requests
            .entry(index)
            .or_default()
            .push(CropRequest { key, rect });
    };

    for (sheet, plan) in plans.iter().enumerate() {
        for (sequence, seq) in plan.iter().enumerate() {
            let key = |role| CropKey {
                sheet,
                sequence,
                role,
            };
            match seq.base {
                None => request(seq.index, key(CropRole::Plain), seq.rect),
                Some(base) => {
                    request(base, key(CropRole::Base), seq.rect);
                    request(seq.index, key(CropRole::Hover), seq.rect);
                }
            }
        }
    }

    let crops = read_crops(source, requests, &plans, sheets)?;
    finalize(sheets, plans, crops)
}

/// Expand each sheet's regions into per-sequence plans, rejecting duplicate names.
fn plan_sheets(sheets: &[SheetConfig]) -> Result<Vec<Vec<SequencePlan>>, SequenceError> {
    let mut plans = Vec::with_capacity(sheets.len());
    for sheet in sheets {
        let mut seen = HashSet::new();
        let mut plan = Vec::with_capacity(sheet.sequence_count());
        for (region, entry) in sheet.entries() {
            let name = region.sequence_name(entry);
            if !seen.insert(name.clone()) {
                return Err(SequenceError::DuplicateSequence {
                    name,
                    sheet: sheet.name.clone(),
                });
            }
            plan.push(SequencePlan {
                name,
                rect: region.rect,
                index: entry.index,
                base: entry.base,
            });
        }
        plans.push(plan);
    }
    Ok(plans)
}

/// The frame pass: crop every request as its frame arrives.
fn read_crops(
    source: &mut dyn FrameSource,
    mut requests: BTreeMap<u32, Vec<CropRequest>>,
    plans: &[Vec<SequencePlan>],
    sheets: &[SheetConfig],
) -> Result<HashMap<CropKey, RgbaImage>, SequenceError> {
    let mut crops = HashMap::new();

    let mut index = 0u32;
    while !requests.is_empty() {
        let Some(frame) = source.frame(index)? else {
            break;
        };

        if let Some(pending) = requests.remove(&index) {
            for request in pending {
                let name = &plans[request.key.sheet][request.key.sequence].name;
                if !request.rect.fits_within(frame.width(), frame.height()) {
                    return Err(SequenceError::RegionOutOfBounds {
                        sequence: name.clone(),
                        rect: request.rect,
                        index,
                        frame_w: frame.width(),
                        frame_h: frame.height(),
                    });
                }

                log::debug!("cropping {:?} ({:?})", name, request.key.role);
                let rect = request.rect;
                let crop = imageops::crop_imm(&frame, rect.x, rect.y, rect.w, rect.h)
                    .to_image();
                crops.insert(request.key, crop);
            }
        }

        index += 1;
    }

    if let Some((&index, pending)) = requests.iter().next() {
        let key = pending[0].key;
        return Err(SequenceError::MissingFrame {
            index,
            sequence: plans[key.sheet][key.sequence].name.clone(),
            sheet: sheets[key.sheet].name.clone(),
        });
    }

    Ok(crops)
}

/// The finalization pass: resolve each planned sequence from its stored crops.
fn finalize(
    sheets: &[SheetConfig],
    plans: Vec<Vec<SequencePlan>>,
    mut crops: HashMap<CropKey, RgbaImage>,
) -> Result<Vec<Vec<Sequence>>, SequenceError> {
    let mut result = Vec::with_capacity(plans.len());

    for (sheet, plan) in plans.into_iter().enumerate() {
        let mut sequences = Vec::with_capacity(plan.len());
        for (sequence, seq) in plan.into_iter().enumerate() {
            let mut take = |role: CropRole, index: u32| -> Result<RgbaImage, SequenceError> {
                let key = CropKey {
                    sheet,
                    sequence,
                    role,
                };
                crops.remove(&key).ok_or_else(|| SequenceError::MissingFrame {
                    index,
                    sequence: seq.name.clone(),
                    sheet: sheets[sheet].name.clone(),
                })
            };

            let image = match seq.base {
                None => take(CropRole::Plain, seq.index)?,
                Some(base) => {
                    let hover = take(CropRole::Hover, seq.index)?;
                    let base = take(CropRole::Base, base)?;
                    derive_glow(hover, base)
                }
            };
            sequences.push(Sequence {
                name: seq.name,
                image,
            });
        }
        result.push(sequences);
    }

    Ok(result)
}

/// Derive the additive glow image of a hovered crop over its base crop.
///
/// Each colour channel becomes the premultiplied difference
/// `max(0, (hover * hover_a - base * base_a) / 255)`. Alpha is taken from the
/// base crop unchanged. The hover buffer is reused for the result and the
/// base buffer is dropped.
pub fn derive_glow(mut hover: RgbaImage, base: RgbaImage) -> RgbaImage {
    debug_assert_eq!(hover.dimensions(), base.dimensions());

    for (h, b) in hover.pixels_mut().zip(base.pixels()) {
        let ha = h[3] as i32;
        let ba = b[3] as i32;
        for c in 0..3 {
            let delta = (h[c] as i32 * ha - b[c] as i32 * ba) / 255;
            h[c] = delta.max(0) as u8;
        }
        h[3] = b[3];
    }

    hover
}
