//! hudsheet - Command-line tool for packing HUD sprite sheets from screenshots

use std::process::ExitCode;

use hudsheet::cli;

fn main() -> ExitCode {
    cli::run()
}
