//! hudsheet - Library for packing HUD sprite sheets
//!
//! This library provides functionality to:
//! - Cut named regions out of a numbered stream of screenshots
//! - Derive additive glow images from hovered/unhovered frame pairs
//! - Pack every sheet into a power-of-two atlas with edge bleed
//! - Write the atlas, the binary `.sht` metadata and the enum text

pub mod atlas;
pub mod cli;
pub mod config;
pub mod frames;
pub mod logging;
pub mod order;
pub mod output;
pub mod pipeline;
pub mod sequence;
pub mod sheet;
