//! Command-line interface implementation

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::config::loader::{find_catalog, merge_cli_overrides, CliOverrides};
use crate::config::{load_catalog, Catalog};
use crate::frames::DirectoryFrames;
use crate::order::PriorityMap;
use crate::pipeline::{build_to_dir, frames_dir, pack_order, BuildOptions};
use crate::sheet::SheetRecord;

/// Exit codes
const EXIT_SUCCESS: u8 = 0;
const EXIT_ERROR: u8 = 1;
const EXIT_INVALID_ARGS: u8 = 2;

/// hudsheet - Pack HUD elements cut from screenshots into texture atlases
#[derive(Parser)]
#[command(name = "hudsheet")]
#[command(about = "hudsheet - Pack HUD elements cut from screenshots into texture atlases")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Cut, pack and write every sheet of the catalog
    Build {
        /// Catalog file (default: nearest hudsheet.toml, else the built-in catalog)
        #[arg(short, long)]
        catalog: Option<PathBuf>,

        /// Directory holding the numbered frame images
        #[arg(short, long)]
        frames: Option<PathBuf>,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,

        /// Only build the sheet with this name
        #[arg(short, long)]
        sheet: Option<String>,

        /// Override the frame file prefix
        #[arg(long)]
        frame_prefix: Option<String>,

        /// Flatten every sheet onto an opaque background
        #[arg(long)]
        opaque: bool,

        /// Do not run the texture compiler
        #[arg(long)]
        no_compile: bool,

        /// Evaluate packing trials on a single thread
        #[arg(long)]
        serial: bool,

        /// Log debug output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print each sheet's sequence names in pack order
    List {
        /// Catalog file (default: nearest hudsheet.toml, else the built-in catalog)
        #[arg(short, long)]
        catalog: Option<PathBuf>,
    },

    /// Print the contents of a .sht metadata file
    Inspect {
        /// Metadata file
        input: PathBuf,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            catalog,
            frames,
            out,
            sheet,
            frame_prefix,
            opaque,
            no_compile,
            serial,
            verbose,
        } => {
            crate::logging::init(verbose);
            let overrides = CliOverrides {
                opaque: opaque.then_some(true),
                no_compile,
                frame_prefix,
                sheet,
            };
            run_build(
                catalog.as_deref(),
                frames.as_deref(),
                &out,
                &overrides,
                !serial,
            )
        }
        Commands::List { catalog } => {
            crate::logging::init(false);
            run_list(catalog.as_deref())
        }
        Commands::Inspect { input, json } => run_inspect(&input, json),
    }
}

/// Load the catalog and the directory relative paths in it are resolved from.
fn open_catalog(path: Option<&Path>) -> Result<(Catalog, PathBuf), ExitCode> {
    let path = path.map(Path::to_path_buf).or_else(find_catalog);

    if let Some(p) = &path {
        if !p.exists() {
            eprintln!("Error: Cannot open catalog '{}'", p.display());
            return Err(ExitCode::from(EXIT_INVALID_ARGS));
        }
    }

    let catalog = load_catalog(path.as_deref()).map_err(|e| {
        eprintln!("Error: {}", e);
        ExitCode::from(EXIT_ERROR)
    })?;

    let catalog_dir = path
        .as_deref()
        .and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    Ok((catalog, catalog_dir))
}

/// Execute the build command
fn run_build(
    catalog_path: Option<&Path>,
    frames: Option<&Path>,
    out: &Path,
    overrides: &CliOverrides,
    parallel: bool,
) -> ExitCode {
    let (mut catalog, catalog_dir) = match open_catalog(catalog_path) {
        Ok(loaded) => loaded,
        Err(code) => return code,
    };

    if let Err(e) = merge_cli_overrides(&mut catalog, overrides) {
        eprintln!("Error: {}", e);
        return ExitCode::from(EXIT_INVALID_ARGS);
    }

    let dir = frames_dir(&catalog, &catalog_dir, frames);
    log::info!("reading frames from {}", dir.display());
    let mut source = DirectoryFrames::new(dir, catalog.frames.clone());

    match build_to_dir(&catalog, &mut source, out, &BuildOptions { parallel }) {
        Ok(written) => {
            for sheet in &written {
                println!(
                    "Saved: {} ({}x{}, {} sequences)",
                    sheet.paths.atlas.display(),
                    sheet.width,
                    sheet.height,
                    sheet.sequences
                );
            }
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Execute the list command
fn run_list(catalog_path: Option<&Path>) -> ExitCode {
    let (catalog, _) = match open_catalog(catalog_path) {
        Ok(loaded) => loaded,
        Err(code) => return code,
    };

    let priority = PriorityMap::new(catalog.priority.clone());
    for sheet in &catalog.sheets {
        println!("{} ({})", sheet.name, sheet.enum_name);
        for (i, name) in pack_order(sheet, &priority).iter().enumerate() {
            println!("  {:>3}  {}", i, name);
        }
    }

    ExitCode::from(EXIT_SUCCESS)
}

/// Execute the inspect command
fn run_inspect(input: &Path, json: bool) -> ExitCode {
    let bytes = match std::fs::read(input) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Error: Cannot open input file '{}': {}", input.display(), e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };

    let record = match SheetRecord::decode(&bytes) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: '{}': {}", input.display(), e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    if json {
        match serde_json::to_string_pretty(&record) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::from(EXIT_ERROR);
            }
        }
    } else {
        println!("{} sequences", record.entries.len());
        for entry in &record.entries {
            let uv = &entry.uv[0];
            println!(
                "  {:>3}  u {:.6}..{:.6}  v {:.6}..{:.6}",
                entry.index, uv.u_min, uv.u_max, uv.v_min, uv.v_max
            );
        }
    }

    ExitCode::from(EXIT_SUCCESS)
}
