//! Catalog loading and discovery for `hudsheet.toml`
//!
//! Provides functions to find, load, validate and override the region catalog.

use super::schema::Catalog;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name searched for when no catalog path is given.
pub const CATALOG_FILE_NAME: &str = "hudsheet.toml";

/// Catalog shipped with the tool: the main menu HUD sheets.
const BUILTIN_CATALOG: &str = include_str!("../../catalogs/main_menu.toml");

/// Catalog loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Catalog validation failed:\n{}", bullet_list(.0))]
    Validation(Vec<String>),
}

fn bullet_list(errors: &[String]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// CLI arguments that can override catalog values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Force opaque output for every sheet
    pub opaque: Option<bool>,
    /// Skip the external compiler even if one is configured
    pub no_compile: bool,
    /// Override the frame file prefix
    pub frame_prefix: Option<String>,
    /// Only keep the sheet with this name
    pub sheet: Option<String>,
}

/// Find `hudsheet.toml` by walking up from the current working directory.
pub fn find_catalog() -> Option<PathBuf> {
    env::current_dir().ok().and_then(find_catalog_from)
}

/// Find `hudsheet.toml` by walking up from a specific directory.
pub fn find_catalog_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let catalog_path = current.join(CATALOG_FILE_NAME);
        if catalog_path.exists() {
            return Some(catalog_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load a catalog.
///
/// If a path is provided, loads from that file. Otherwise looks for
/// `hudsheet.toml` with [`find_catalog`], falling back to the built-in
/// main menu catalog.
pub fn load_catalog(path: Option<&Path>) -> Result<Catalog, ConfigError> {
    let catalog_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_catalog(),
    };

    match catalog_path {
        Some(p) => {
            log::debug!("loading catalog from {}", p.display());
            load_catalog_file(&p)
        }
        None => {
            log::debug!("no {} found, using built-in catalog", CATALOG_FILE_NAME);
            builtin_catalog()
        }
    }
}

fn load_catalog_file(path: &Path) -> Result<Catalog, ConfigError> {
    let contents = fs::read_to_string(path)?;
    parse_catalog(&contents)
}

/// Parse and validate catalog TOML text.
pub fn parse_catalog(contents: &str) -> Result<Catalog, ConfigError> {
    let catalog: Catalog = toml::from_str(contents)?;

    let errors = catalog.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors));
    }

    Ok(catalog)
}

/// The built-in main menu catalog.
pub fn builtin_catalog() -> Result<Catalog, ConfigError> {
    parse_catalog(BUILTIN_CATALOG)
}

/// Merge CLI overrides into a catalog.
///
/// CLI arguments take precedence over catalog values. Selecting a sheet that
/// does not exist is a validation error.
pub fn merge_cli_overrides(
    catalog: &mut Catalog,
    overrides: &CliOverrides,
) -> Result<(), ConfigError> {
    if let Some(opaque) = overrides.opaque {
        for sheet in &mut catalog.sheets {
            sheet.opaque = opaque;
        }
    }

    if overrides.no_compile {
        catalog.compiler = None;
    }

    if let Some(ref prefix) = overrides.frame_prefix {
        catalog.frames.prefix = prefix.clone();
    }

    if let Some(ref name) = overrides.sheet {
        if catalog.sheet(name).is_none() {
            let error = format!("no sheet named '{}'", name);
            return Err(ConfigError::Validation(vec![error]));
        }
        catalog.sheets.retain(|s| &s.name == name);
    }

    Ok(())
}

/// Resolve a path relative to the directory holding the catalog.
///
/// Absolute paths are returned unchanged.
pub fn resolve_path(catalog_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        catalog_dir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    const SMALL_CATALOG: &[u8] = br#"
[frames]
prefix = "shot_"
digits = 3

[[sheet]]
name = "menu_sheet"
enum = "MenuSheet"

[[sheet.region]]
name = "logo"
rect = { x = 0, y = 0, w = 8, h = 4 }
frames = [{ index = 0 }]

[[sheet]]
name = "menu_additive"
enum = "MenuAdditive"

[[sheet.region]]
name = "logo"
rect = { x = 0, y = 0, w = 8, h = 4 }
frames = [{ base = 0, index = 1, suffix = "_hover" }]
"#;

    fn write_catalog(dir: &Path, contents: &[u8]) -> PathBuf {
        let path = dir.join(CATALOG_FILE_NAME);
        File::create(&path)
            .expect("should create catalog file")
            .write_all(contents)
            .expect("should write catalog content");
        path
    }

    fn small_catalog() -> Catalog {
        let text = std::str::from_utf8(SMALL_CATALOG).unwrap();
        parse_catalog(text).unwrap()
    }

    #[test]
    fn test_find_catalog_in_parent_dir() {
        let temp = TempDir::new().expect("should create temp dir");
        let path = write_catalog(temp.path(), SMALL_CATALOG);

        let subdir = temp.path().join("frames").join("raw");
        fs::create_dir_all(&subdir).expect("should create subdirs");

        assert_eq!(find_catalog_from(subdir), Some(path));
    }

    #[test]
    fn test_find_catalog_not_found() {
        let temp = TempDir::new().expect("should create temp dir");
        assert_eq!(find_catalog_from(temp.path().to_path_buf()), None);
    }

    #[test]
    fn test_load_catalog_from_file() {
        let temp = TempDir::new().expect("should create temp dir");
        let path = write_catalog(temp.path(), SMALL_CATALOG);

        let catalog = load_catalog(Some(&path)).expect("should load");
        assert_eq!(catalog.frames.prefix, "shot_");
        assert_eq!(catalog.frames.digits, 3);
        assert_eq!(catalog.frames.extension, "png");
        assert_eq!(catalog.sheets.len(), 2);
        assert!(catalog.sheets[1].regions[0].frames[0].is_additive());
    }

    #[test]
    fn test_load_catalog_missing_file() {
        let temp = TempDir::new().expect("should create temp dir");
        let result = load_catalog(Some(&temp.path().join("nonexistent.toml")));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_catalog_invalid_toml() {
        let temp = TempDir::new().expect("should create temp dir");
        let path = write_catalog(temp.path(), b"this is not valid toml {{{");
        assert!(matches!(
            load_catalog(Some(&path)),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_catalog_validation_error() {
        let temp = TempDir::new().expect("should create temp dir");
        let path = write_catalog(
            temp.path(),
            br#"
[[sheet]]
name = "a"
enum = "A"

[[sheet.region]]
name = "x"
rect = { x = 0, y = 0, w = 4, h = 4 }
frames = [{ index = 0 }, { index = 1 }]
"#,
        );
        match load_catalog(Some(&path)) {
            Err(ConfigError::Validation(errors)) => {
                assert!(errors[0].contains("duplicate sequence name 'x'"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_builtin_catalog() {
        let catalog = builtin_catalog().expect("built-in catalog should be valid");
        assert_eq!(catalog.frames.prefix, "mainmenu_");
        assert_eq!(catalog.sheets.len(), 2);

        let plain = catalog.sheet("main_menu_sheet").expect("plain sheet");
        assert_eq!(plain.enum_name, "MainMenuSheet");
        assert!(plain.entries().all(|(_, e)| !e.is_additive()));

        let additive = catalog.sheet("main_menu_additive_sheet");
        let additive = additive.expect("additive sheet");
        assert_eq!(additive.enum_name, "MainMenuAdditive");
        assert!(additive.entries().all(|(_, e)| e.is_additive()));

        assert_eq!(catalog.priority.get("notifications"), Some(&1));
        assert_eq!(catalog.priority.get("settings"), None);
    }

    #[test]
    fn test_merge_cli_overrides() {
        let mut catalog = small_catalog();
        let overrides = CliOverrides {
            opaque: Some(true),
            frame_prefix: Some("frame".to_string()),
            sheet: Some("menu_additive".to_string()),
            ..Default::default()
        };

        merge_cli_overrides(&mut catalog, &overrides).unwrap();
        assert_eq!(catalog.frames.prefix, "frame");
        assert_eq!(catalog.sheets.len(), 1);
        assert_eq!(catalog.sheets[0].name, "menu_additive");
        assert!(catalog.sheets[0].opaque);
    }

    #[test]
    fn test_merge_cli_overrides_unknown_sheet() {
        let mut catalog = small_catalog();
        let overrides = CliOverrides {
            sheet: Some("missing".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            merge_cli_overrides(&mut catalog, &overrides),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_merge_cli_overrides_no_compile() {
        let compiler = crate::config::CompilerConfig {
            program: "vtex".to_string(),
            args: vec![],
        };
        let mut catalog = Catalog {
            compiler: Some(compiler),
            ..Default::default()
        };
        let overrides = CliOverrides {
            no_compile: true,
            ..Default::default()
        };
        merge_cli_overrides(&mut catalog, &overrides).unwrap();
        assert!(catalog.compiler.is_none());
    }

    #[test]
    fn test_resolve_path() {
        let root = Path::new("/project");
        assert_eq!(
            resolve_path(root, Path::new("/other/path")),
            PathBuf::from("/other/path")
        );
        assert_eq!(
            resolve_path(root, Path::new("frames")),
            PathBuf::from("/project/frames")
        );
    }
}
