//! Console logging
//!
//! `RUST_LOG` wins when set. Otherwise hudsheet logs at info (debug with
//! `--verbose`) and every other crate only at warn.

use env_logger::fmt::{Color, Formatter};
use log::{Level, LevelFilter, Record};
use std::io::Write;

/// Default filter for this crate's own messages.
pub fn default_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Install the stderr logger. Calling it twice is harmless.
pub fn init(verbose: bool) {
    let mut builder = env_logger::Builder::new();

    if std::env::var("RUST_LOG").is_ok() {
        builder.parse_env("RUST_LOG");
    } else {
        builder.filter_level(LevelFilter::Warn);
        builder.filter(Some("hudsheet"), default_level(verbose));
    }

    builder.format(|buf: &mut Formatter, record: &Record| {
        let mut level_style = buf.style();
        match record.level() {
            Level::Error => level_style.set_color(Color::Red).set_bold(true),
            Level::Warn => level_style.set_color(Color::Yellow).set_bold(true),
            Level::Info => level_style.set_color(Color::Green).set_bold(true),
            Level::Debug => level_style.set_color(Color::Blue).set_bold(true),
            Level::Trace => level_style.set_color(Color::White),
        };

        let mut meta_style = buf.style();
        meta_style.set_color(Color::Rgb(120, 120, 120));

        writeln!(
            buf,
            "{:>5} {} {}",
            level_style.value(record.level()),
            meta_style.value(record.target()),
            record.args()
        )
    });

    // a logger installed earlier (tests, embedding program) stays in place
    let _ = builder.try_init();
}
