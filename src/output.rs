//! Sheet output - atlas image, metadata blob, enum text and texture compiler
//!
//! Every sheet named `<name>` produces, inside the output directory:
//!
//! | File | Content |
//! |------|---------|
//! | `<name>.tga` | Packed atlas |
//! | `<name>.sht` | Binary sheet metadata |
//! | `<name>_enum.txt` | `DECLARE_HUD_SHEET` enum block in pack order |

use image::RgbaImage;
use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

use crate::config::CompilerConfig;

/// Error type for output operations
#[derive(Debug, Error)]
pub enum OutputError {
    /// IO error during file operations
    #[error("Failed to write '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Image encoding error
    #[error("Failed to encode '{}': {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Failed to start texture compiler '{program}': {source}")]
    CompilerSpawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("Texture compiler '{program}' failed for sheet '{sheet}' ({status})")]
    CompilerFailed {
        program: String,
        sheet: String,
        status: std::process::ExitStatus,
    },
}

/// Paths written for one sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetPaths {
    pub atlas: PathBuf,
    pub metadata: PathBuf,
    pub enum_text: PathBuf,
}

impl SheetPaths {
    /// Output paths of sheet `name` inside `out_dir`.
    pub fn new(out_dir: &Path, name: &str) -> Self {
        Self {
            atlas: out_dir.join(format!("{}.tga", name)),
            metadata: out_dir.join(format!("{}.sht", name)),
            enum_text: out_dir.join(format!("{}_enum.txt", name)),
        }
    }
}

/// Save an RGBA image; the format follows the file extension.
///
/// Parent directories are created if they don't exist.
pub fn save_image(image: &RgbaImage, path: &Path) -> Result<(), OutputError> {
    create_parent(path)?;
    image.save(path).map_err(|source| OutputError::Image {
        path: path.to_path_buf(),
        source,
    })
}

/// Write raw bytes, creating parent directories.
pub fn write_file(path: &Path, contents: &[u8]) -> Result<(), OutputError> {
    create_parent(path)?;
    std::fs::write(path, contents).map_err(|source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn create_parent(path: &Path) -> Result<(), OutputError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|source| OutputError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    Ok(())
}

/// Render the enum block listing `names` in pack order.
pub fn enum_text(enum_name: &str, names: &[String]) -> String {
    let mut out = String::new();
    // writing to a String cannot fail
    let _ = writeln!(out, "\tDECLARE_HUD_SHEET( {} )", enum_name);
    for name in names {
        let _ = writeln!(out, "\t\tDECLARE_HUD_SHEET_UV( {} ),", name);
    }
    let _ = writeln!(out, "\tEND_HUD_SHEET( {} );", enum_name);
    out
}

/// Compiler arguments with `{name}` replaced by `sheet` and `{out}` by `out_dir`.
pub fn compiler_args(compiler: &CompilerConfig, sheet: &str, out_dir: &Path) -> Vec<String> {
    let out = out_dir.display().to_string();
    compiler
        .args
        .iter()
        .map(|a| a.replace("{name}", sheet).replace("{out}", &out))
        .collect()
}

/// Run the external texture compiler for one sheet inside `out_dir`.
///
/// `{out}` is substituted with the absolute output directory, so it stays
/// valid from the compiler's working directory. The compiler's output goes
/// straight to this process's stdout/stderr.
pub fn run_compiler(
    compiler: &CompilerConfig,
    sheet: &str,
    out_dir: &Path,
) -> Result<(), OutputError> {
    let absolute_out = std::path::absolute(out_dir).map_err(|source| OutputError::Io {
        path: out_dir.to_path_buf(),
        source,
    })?;
    let args = compiler_args(compiler, sheet, &absolute_out);
    log::info!(
        "compiling {} with {} {}",
        sheet,
        compiler.program,
        args.join(" ")
    );

    let status = Command::new(&compiler.program)
        .args(&args)
        .current_dir(&absolute_out)
        .status()
        .map_err(|source| OutputError::CompilerSpawn {
            program: compiler.program.clone(),
            source,
        })?;

    if !status.success() {
        return Err(OutputError::CompilerFailed {
            program: compiler.program.clone(),
            sheet: sheet.to_string(),
            status,
        });
    }
    Ok(())
}
