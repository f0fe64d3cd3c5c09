//! Build pipeline - frames in, packed sheets out
//!
//! 1. One pass over the frame stream builds the sequences of every sheet
//! 2. Each sheet is packed and serialized, strictly one after another
//! 3. Each finished sheet is handed to a sink (normally [`write_sheet`])
//!
//! Any error aborts the whole run.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::atlas::{pack_sheet, AtlasConfig, PackError, PackedAtlas};
use crate::config::{Catalog, ConfigError, SheetConfig};
use crate::frames::FrameSource;
use crate::order::{sort_baseline, PriorityMap};
use crate::output::{self, OutputError, SheetPaths};
use crate::sequence::{collect_sequences, SequenceError};
use crate::sheet::SheetRecord;

/// Error from any stage of a build
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Sequence(#[from] SequenceError),
    #[error(transparent)]
    Pack(#[from] PackError),
    #[error(transparent)]
    Output(#[from] OutputError),
}

/// Options that apply to the whole run.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Evaluate packing trials on the rayon thread pool
    pub parallel: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self { parallel: true }
    }
}

/// A finished sheet.
#[derive(Debug, Clone)]
pub struct SheetOutput {
    pub name: String,
    pub enum_name: String,
    pub atlas: PackedAtlas,
    pub record: SheetRecord,
}

impl SheetOutput {
    /// Sequence names in pack order.
    pub fn names(&self) -> &[String] {
        &self.atlas.names
    }

    /// The binary `.sht` blob.
    pub fn metadata(&self) -> Vec<u8> {
        self.record.to_bytes()
    }
}

/// Summary of a written sheet.
#[derive(Debug, Clone)]
pub struct WrittenSheet {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub sequences: usize,
    pub paths: SheetPaths,
}

/// Sequence names of a sheet in pack order, without reading any frame.
pub fn pack_order(sheet: &SheetConfig, priority: &PriorityMap) -> Vec<String> {
    let mut names: Vec<String> = sheet.entries().map(|(r, e)| r.sequence_name(e)).collect();
    sort_baseline(&mut names, priority, |n| n.as_str());
    names
}

/// Build every sheet of `catalog` from `source`, handing each finished
/// sheet to `sink` before the next one is packed.
///
/// Returns the number of sheets built.
pub fn build_sheets<F>(
    catalog: &Catalog,
    source: &mut dyn FrameSource,
    options: &BuildOptions,
    mut sink: F,
) -> Result<usize, BuildError>
where
    F: FnMut(SheetOutput) -> Result<(), BuildError>,
{
    let priority = PriorityMap::new(catalog.priority.clone());
    let all_sequences = collect_sequences(&catalog.sheets, source)?;

    let mut built = 0;
    for (sheet, sequences) in catalog.sheets.iter().zip(all_sequences) {
        log::info!(
            "packing sheet '{}' ({} sequences)",
            sheet.name,
            sequences.len()
        );

        let config = AtlasConfig {
            opaque: sheet.opaque,
            parallel: options.parallel,
        };
        let atlas = pack_sheet(&sheet.name, sequences, &priority, &config)?;
        let record = SheetRecord::from_atlas(&atlas);

        sink(SheetOutput {
            name: sheet.name.clone(),
            enum_name: sheet.enum_name.clone(),
            atlas,
            record,
        })?;
        built += 1;
    }

    Ok(built)
}

/// Write one sheet's atlas, metadata and enum text into `out_dir`.
pub fn write_sheet(sheet: &SheetOutput, out_dir: &Path) -> Result<WrittenSheet, OutputError> {
    let paths = SheetPaths::new(out_dir, &sheet.name);
    log::info!("writing files for '{}'", sheet.name);

    output::save_image(&sheet.atlas.image, &paths.atlas)?;
    output::write_file(&paths.metadata, &sheet.metadata())?;
    let enum_text = output::enum_text(&sheet.enum_name, sheet.names());
    output::write_file(&paths.enum_text, enum_text.as_bytes())?;

    Ok(WrittenSheet {
        name: sheet.name.clone(),
        width: sheet.atlas.width(),
        height: sheet.atlas.height(),
        sequences: sheet.names().len(),
        paths,
    })
}

/// Build every sheet and write it to `out_dir`, running the catalog's
/// texture compiler (if any) after each sheet is written.
pub fn build_to_dir(
    catalog: &Catalog,
    source: &mut dyn FrameSource,
    out_dir: &Path,
    options: &BuildOptions,
) -> Result<Vec<WrittenSheet>, BuildError> {
    let mut written = Vec::new();

    build_sheets(catalog, source, options, |sheet| {
        let result = write_sheet(&sheet, out_dir)?;
        if let Some(compiler) = &catalog.compiler {
            output::run_compiler(compiler, &sheet.name, out_dir)?;
        }
        written.push(result);
        Ok(())
    })?;

    Ok(written)
}

/// Directory frames are read from: an explicit override, else the catalog's
/// `frames.dir` relative to `catalog_dir`, else `catalog_dir` itself.
pub fn frames_dir(catalog: &Catalog, catalog_dir: &Path, explicit: Option<&Path>) -> PathBuf {
    match (explicit, &catalog.frames.dir) {
        (Some(dir), _) => dir.to_path_buf(),
        (None, Some(dir)) => crate::config::loader::resolve_path(catalog_dir, dir),
        (None, None) => catalog_dir.to_path_buf(),
    }
}
