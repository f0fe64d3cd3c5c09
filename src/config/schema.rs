//! Catalog schema types for `hudsheet.toml`
//!
//! Describes which rectangles are cut out of which frames, how they are
//! grouped into sheets, and the settings around the frame stream and the
//! external texture compiler.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// A rectangle in frame pixels, top-left corner plus size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// Right edge (exclusive).
    pub fn right(&self) -> u64 {
        self.x as u64 + self.w as u64
    }

    /// Bottom edge (exclusive).
    pub fn bottom(&self) -> u64 {
        self.y as u64 + self.h as u64
    }

    /// Whether the rectangle lies fully inside a `width` x `height` image.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.right() <= width as u64 && self.bottom() <= height as u64
    }
}

/// One frame entry of a region.
///
/// A plain entry crops `index`. An entry with a `base` frame is additive: the
/// sequence stores the glow difference between frame `index` (hovered) and
/// frame `base` (not hovered).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameEntry {
    /// Frame the crop (or the hover crop) is taken from
    pub index: u32,
    /// Appended to the region name to form the sequence name
    #[serde(default)]
    pub suffix: String,
    /// Base frame for additive entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<u32>,
}

impl FrameEntry {
    pub fn plain(index: u32, suffix: impl Into<String>) -> Self {
        Self {
            index,
            suffix: suffix.into(),
            base: None,
        }
    }

    pub fn additive(base: u32, index: u32, suffix: impl Into<String>) -> Self {
        Self {
            index,
            suffix: suffix.into(),
            base: Some(base),
        }
    }

    pub fn is_additive(&self) -> bool {
        self.base.is_some()
    }
}

/// A named source rectangle and the frames it is cut from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionConfig {
    pub name: String,
    pub rect: Rect,
    #[serde(default)]
    pub frames: Vec<FrameEntry>,
}

impl RegionConfig {
    /// Sequence name produced by one of this region's entries.
    pub fn sequence_name(&self, entry: &FrameEntry) -> String {
        format!("{}{}", self.name, entry.suffix)
    }
}

/// One output atlas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetConfig {
    /// Output file stem
    pub name: String,
    /// Identifier written into the enum text
    #[serde(rename = "enum")]
    pub enum_name: String,
    /// Flatten translucent pixels onto black (for atlases drawn without blending)
    #[serde(default)]
    pub opaque: bool,
    #[serde(default, rename = "region")]
    pub regions: Vec<RegionConfig>,
}

impl SheetConfig {
    /// Iterate over (region, entry) pairs in catalog order.
    pub fn entries(&self) -> impl Iterator<Item = (&RegionConfig, &FrameEntry)> {
        self.regions
            .iter()
            .flat_map(|r| r.frames.iter().map(move |e| (r, e)))
    }

    /// Number of sequences this sheet produces.
    pub fn sequence_count(&self) -> usize {
        self.regions.iter().map(|r| r.frames.len()).sum()
    }
}

/// Where frame files live and how they are named:
/// `<dir>/<prefix><index padded to digits>.<extension>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FramesConfig {
    /// Frame directory, relative to the catalog file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_digits")]
    pub digits: usize,
    #[serde(default = "default_extension")]
    pub extension: String,
}

impl Default for FramesConfig {
    fn default() -> Self {
        Self {
            dir: None,
            prefix: default_prefix(),
            digits: default_digits(),
            extension: default_extension(),
        }
    }
}

fn default_prefix() -> String {
    "frame_".to_string()
}

fn default_digits() -> usize {
    4
}

fn default_extension() -> String {
    "png".to_string()
}

/// External texture compiler run once per written sheet.
///
/// `{name}` in an argument is replaced by the sheet name and `{out}` by the
/// output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Full catalog file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub frames: FramesConfig,
    /// Compatibility priority group per sequence name (missing names are group 0)
    #[serde(default)]
    pub priority: HashMap<String, u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compiler: Option<CompilerConfig>,
    #[serde(default, rename = "sheet")]
    pub sheets: Vec<SheetConfig>,
}

impl Catalog {
    /// Validate the catalog, returning every problem found.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.frames.digits == 0 {
            errors.push("frames.digits must be at least 1".to_string());
        }

        let mut sheet_names = std::collections::HashSet::new();
        for sheet in &self.sheets {
            if sheet.name.is_empty() {
                errors.push("sheet name must not be empty".to_string());
            } else if !sheet_names.insert(sheet.name.as_str()) {
                let name = &sheet.name;
                errors.push(format!("duplicate sheet name '{}'", name));
            }

            let mut seen = std::collections::HashSet::new();
            for region in &sheet.regions {
                if region.rect.w == 0 || region.rect.h == 0 {
                    errors.push(format!(
                        "sheet '{}': region '{}' has an empty rectangle ({}x{})",
                        sheet.name, region.name, region.rect.w, region.rect.h
                    ));
                }
                for entry in &region.frames {
                    let name = region.sequence_name(entry);
                    if !seen.insert(name.clone()) {
                        errors.push(format!(
                            "sheet '{}': duplicate sequence name '{}'",
                            sheet.name, name
                        ));
                    }
                }
            }
        }

        if let Some(compiler) = &self.compiler {
            if compiler.program.trim().is_empty() {
                let error = "compiler.program must not be empty";
                errors.push(error.to_string());
            }
        }

        errors
    }

    /// Look up a sheet by name.
    pub fn sheet(&self, name: &str) -> Option<&SheetConfig> {
        self.sheets.iter().find(|s| s.name == name)
    }
}
