//! Integration tests for the hudsheet CLI
//!
//! These tests run the binary against catalogs and frames written into a
//! temp directory and check exit codes, output and written files.

use image::{Rgba, RgbaImage};
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const CATALOG: &str = r#"
[frames]
dir = "shots"
prefix = "cap_"

[[sheet]]
name = "hud"
enum = "HudSheet"

[[sheet.region]]
name = "back"
rect = { x = 0, y = 0, w = 12, h = 6 }
frames = [{ index = 0 }, { index = 1, suffix = "_pressed" }]

[[sheet.region]]
name = "icon"
rect = { x = 4, y = 8, w = 8, h = 8 }
frames = [{ index = 1 }]
"#;

fn run(args: &[&str], cwd: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_hudsheet"))
        .args(args)
        .current_dir(cwd)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute hudsheet")
}

/// Write the catalog as `hudsheet.toml` and two frames under `shots/`.
fn setup_project(extra: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    let catalog = format!("{}{}", CATALOG, extra);
    let path = temp.path().join("hudsheet.toml");
    fs::write(path, catalog).unwrap();

    let shots = temp.path().join("shots");
    fs::create_dir_all(&shots).unwrap();
    for i in 0..2u8 {
        RgbaImage::from_pixel(16, 16, Rgba([40 * (i + 1), 0, 0, 255]))
            .save(shots.join(format!("cap_000{}.png", i)))
            .unwrap();
    }
    temp
}

#[test]
fn test_build_from_discovered_catalog() {
    let project = setup_project("");
    let output = run(&["build", "--out", "out"], project.path());

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("hud.tga"), "stdout: {}", stdout);

    let out = project.path().join("out");
    assert!(out.join("hud.tga").exists());
    assert!(out.join("hud.sht").exists());
    let enum_text = fs::read_to_string(out.join("hud_enum.txt")).unwrap();
    assert!(enum_text.contains("DECLARE_HUD_SHEET_UV( back_pressed ),"));
}

#[test]
fn test_build_opaque_flag() {
    let project = setup_project("");
    let output = run(&["build", "--out", "out", "--opaque"], project.path());
    assert!(output.status.success());

    // the atlas keeps transparent space around the content, flattened to black
    let atlas = image::open(project.path().join("out").join("hud.tga"))
        .unwrap()
        .into_rgba8();
    assert!(atlas.pixels().all(|p| p[3] == 255));
}

#[test]
fn test_build_unknown_sheet_is_invalid_args() {
    let project = setup_project("");
    let output = run(&["build", "--sheet", "nope"], project.path());
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no sheet named 'nope'"));
}

#[test]
fn test_build_missing_catalog_is_invalid_args() {
    let temp = TempDir::new().unwrap();
    let output = run(&["build", "--catalog", "missing.toml"], temp.path());
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_build_missing_frames_fails() {
    let project = setup_project("");
    let frame = project.path().join("shots").join("cap_0001.png");
    fs::remove_file(frame).unwrap();

    let output = run(&["build", "--out", "out"], project.path());
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error:"));
}

#[cfg(unix)]
#[test]
fn test_build_runs_compiler_in_out_dir() {
    let project = setup_project(
        r#"
[compiler]
program = "sh"
args = ["-c", "touch {name}.vtf"]
"#,
    );

    let output = run(&["build", "--out", "out"], project.path());
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(project.path().join("out").join("hud.vtf").exists());

    let args = ["build", "--out", "skipped", "--no-compile"];
    let skipped = run(&args, project.path());
    assert!(skipped.status.success());
    assert!(!project.path().join("skipped").join("hud.vtf").exists());
}

#[test]
fn test_list_pack_order() {
    let project = setup_project("");
    let output = run(&["list"], project.path());
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines[0], "hud (HudSheet)");
    assert!(lines[1].ends_with("back"));
    assert!(lines[2].ends_with("back_pressed"));
    assert!(lines[3].ends_with("icon"));
}

#[test]
fn test_list_builtin_catalog() {
    let temp = TempDir::new().unwrap();
    let output = run(&["list"], temp.path());
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("main_menu_sheet (MainMenuSheet)"));
    let additive = "main_menu_additive_sheet (MainMenuAdditive)";
    assert!(stdout.contains(additive));
}

#[test]
fn test_inspect_json() {
    let project = setup_project("");
    let built = run(&["build", "--out", "out"], project.path());
    assert!(built.status.success());

    let output = run(&["inspect", "out/hud.sht", "--json"], project.path());
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let entries = value["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[2]["index"], 2);
    assert_eq!(entries[0]["uv"].as_array().unwrap().len(), 4);
}

#[test]
fn test_inspect_rejects_bad_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("bad.sht");
    fs::write(path, [2, 0, 0, 0, 0, 0, 0, 0]).unwrap();

    let output = run(&["inspect", "bad.sht"], temp.path());
    assert_eq!(output.status.code(), Some(1));

    let missing = run(&["inspect", "missing.sht"], temp.path());
    assert_eq!(missing.status.code(), Some(2));
}
