//! Sheet metadata - the binary `.sht` blob read by the HUD renderer
//!
//! Layout, all fields 32-bit little-endian:
//!
//! ```text
//! u32 version (1)
//! u32 sequence count
//! per sequence:
//!   u32 index, u32 loop flag (1), u32 frame count (1)
//!   f32 total time (1), f32 frame time (1)
//!   4 x (f32 u_min, f32 v_min, f32 u_max, f32 v_max)   one per color channel
//! ```

use serde::Serialize;
use thiserror::Error;

use crate::atlas::{Layout, PackedAtlas};

/// Version written at the start of every blob.
pub const FORMAT_VERSION: u32 = 1;

/// Bytes per sequence entry.
pub const ENTRY_SIZE: usize = 4 * (5 + 4 * 4);

/// Error decoding a sheet blob
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SheetFormatError {
    #[error("Unsupported sheet format version {0} (expected {})", FORMAT_VERSION)]
    UnsupportedVersion(u32),
    #[error("Sheet data truncated at byte {offset}")]
    Truncated {
        offset: usize,
    },
    #[error("Sheet data has {count} unexpected trailing bytes")]
    TrailingBytes {
        count: usize,
    },
}

/// Texture coordinates of one sequence, inset by half a pixel on every edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UvRect {
    pub u_min: f32,
    pub v_min: f32,
    pub u_max: f32,
    pub v_max: f32,
}

impl UvRect {
    /// UVs of a `w` x `h` rectangle at (`x`, `y`) in an `atlas_w` x `atlas_h` texture.
    pub fn from_pixels(x: u32, y: u32, w: u32, h: u32, atlas_w: u32, atlas_h: u32) -> Self {
        let (aw, ah) = (atlas_w as f32, atlas_h as f32);
        Self {
            u_min: (x as f32 + 0.5) / aw,
            v_min: (y as f32 + 0.5) / ah,
            u_max: ((x + w) as f32 - 0.5) / aw,
            v_max: ((y + h) as f32 - 0.5) / ah,
        }
    }

    /// Scale back to pixel edges `(x_min, y_min, x_max, y_max)`, undoing the inset.
    pub fn to_pixels(&self, atlas_w: u32, atlas_h: u32) -> (f32, f32, f32, f32) {
        let (aw, ah) = (atlas_w as f32, atlas_h as f32);
        (
            self.u_min * aw - 0.5,
            self.v_min * ah - 0.5,
            self.u_max * aw + 0.5,
            self.v_max * ah + 0.5,
        )
    }
}

/// Metadata of one sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetEntry {
    /// Position in pack order
    pub index: u32,
    pub loop_flag: u32,
    pub frame_count: u32,
    pub total_time: f32,
    pub frame_time: f32,
    /// One rectangle per color channel (R, G, B, A)
    pub uv: [UvRect; 4],
}

impl SheetEntry {
    /// A static, non-looping single-frame entry.
    pub fn single_frame(index: u32, uv: UvRect) -> Self {
        Self {
            index,
            loop_flag: 1,
            frame_count: 1,
            total_time: 1.0,
            frame_time: 1.0,
            uv: [uv; 4],
        }
    }
}

/// All entries of a sheet, in pack order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetRecord {
    pub entries: Vec<SheetEntry>,
}

impl SheetRecord {
    /// Build the record of a packed atlas.
    pub fn from_atlas(atlas: &PackedAtlas) -> Self {
        Self::from_layout(&atlas.sizes, &atlas.layout)
    }

    /// Build a record from sequence sizes and their layout, both in pack order.
    pub fn from_layout(sizes: &[(u32, u32)], layout: &Layout) -> Self {
        let entries = sizes
            .iter()
            .zip(&layout.placements)
            .enumerate()
            .map(|(i, (&(w, h), p))| {
                let uv = UvRect::from_pixels(p.x, p.y, w, h, layout.width, layout.height);
                SheetEntry::single_frame(i as u32, uv)
            })
            .collect();
        Self { entries }
    }

    /// Serialize to the binary blob.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + self.entries.len() * ENTRY_SIZE);
        put_u32(&mut out, FORMAT_VERSION);
        put_u32(&mut out, self.entries.len() as u32);

        for entry in &self.entries {
            put_u32(&mut out, entry.index);
            put_u32(&mut out, entry.loop_flag);
            put_u32(&mut out, entry.frame_count);
            put_f32(&mut out, entry.total_time);
            put_f32(&mut out, entry.frame_time);
            for uv in &entry.uv {
                put_f32(&mut out, uv.u_min);
                put_f32(&mut out, uv.v_min);
                put_f32(&mut out, uv.u_max);
                put_f32(&mut out, uv.v_max);
            }
        }

        out
    }

    /// Parse a binary blob.
    pub fn decode(bytes: &[u8]) -> Result<Self, SheetFormatError> {
        let mut reader = Reader { bytes, offset: 0 };

        let version = reader.u32()?;
        if version != FORMAT_VERSION {
            return Err(SheetFormatError::UnsupportedVersion(version));
        }

        let count = reader.u32()? as usize;
        // cap the allocation by what the remaining bytes can hold
        let mut entries = Vec::with_capacity(count.min(bytes.len() / ENTRY_SIZE));
        for _ in 0..count {
            let index = reader.u32()?;
            let loop_flag = reader.u32()?;
            let frame_count = reader.u32()?;
            let total_time = reader.f32()?;
            let frame_time = reader.f32()?;
            let uv = [reader.uv()?, reader.uv()?, reader.uv()?, reader.uv()?];
            entries.push(SheetEntry {
                index,
                loop_flag,
                frame_count,
                total_time,
                frame_time,
                uv,
            });
        }

        let remaining = bytes.len() - reader.offset;
        if remaining != 0 {
            return Err(SheetFormatError::TrailingBytes { count: remaining });
        }

        Ok(Self { entries })
    }
}

fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_f32(out: &mut Vec<u8>, value: f32) {
    out.extend_from_slice(&value.to_le_bytes());
}

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl Reader<'_> {
    fn u32(&mut self) -> Result<u32, SheetFormatError> {
        let chunk = self
            .bytes
            .get(self.offset..self.offset + 4)
            .ok_or(SheetFormatError::Truncated {
                offset: self.offset,
            })?;
        self.offset += 4;
        Ok(u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
    }

    fn f32(&mut self) -> Result<f32, SheetFormatError> {
        self.u32().map(f32::from_bits)
    }

    fn uv(&mut self) -> Result<UvRect, SheetFormatError> {
        Ok(UvRect {
            u_min: self.f32()?,
            v_min: self.f32()?,
            u_max: self.f32()?,
            v_max: self.f32()?,
        })
    }
}
