//! Frame sources - the numbered screenshot stream regions are cut from
//!
//! Frames are addressed by a non-negative index. The stream ends at the first
//! index with no frame; that is normal termination, not an error.

use image::RgbaImage;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::FramesConfig;

/// Error reading a frame that exists but cannot be loaded
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Failed to read frame {index} from '{}': {source}", path.display())]
    Io {
        index: u32,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to decode frame {index} from '{}': {source}", path.display())]
    Decode {
        index: u32,
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error(
        "Frame {index} is {actual_w}x{actual_h}, expected {expected_w}x{expected_h} like frame 0"
    )]
    SizeMismatch {
        index: u32,
        actual_w: u32,
        actual_h: u32,
        expected_w: u32,
        expected_h: u32,
    },
}

/// A stream of frames addressed by increasing index.
pub trait FrameSource {
    /// Fetch frame `index`, or `None` if the stream ends before it.
    fn frame(&mut self, index: u32) -> Result<Option<RgbaImage>, FrameError>;
}

/// Frames stored as numbered image files in a directory.
///
/// Frame `i` lives at `<dir>/<prefix><i padded to digits>.<extension>`.
#[derive(Debug, Clone)]
pub struct DirectoryFrames {
    dir: PathBuf,
    config: FramesConfig,
    size: Option<(u32, u32)>,
}

impl DirectoryFrames {
    pub fn new(dir: impl Into<PathBuf>, config: FramesConfig) -> Self {
        Self {
            dir: dir.into(),
            config,
            size: None,
        }
    }

    /// Path of frame `index`.
    pub fn frame_path(&self, index: u32) -> PathBuf {
        frame_path(&self.dir, &self.config, index)
    }
}

/// Build the path of frame `index` inside `dir`.
pub fn frame_path(dir: &Path, config: &FramesConfig, index: u32) -> PathBuf {
    dir.join(format!(
        "{}{:0width$}.{}",
        config.prefix,
        index,
        config.extension,
        width = config.digits
    ))
}

impl FrameSource for DirectoryFrames {
    fn frame(&mut self, index: u32) -> Result<Option<RgbaImage>, FrameError> {
        let path = self.frame_path(index);
        let io_error = |source| FrameError::Io {
            index,
            path: path.clone(),
            source,
        };

        // only a missing file ends the stream, other lookup failures are errors
        if !path.try_exists().map_err(io_error)? {
            log::debug!("frame stream ends at {}", path.display());
            return Ok(None);
        }

        log::info!("reading {}", path.display());
        let reader = image::io::Reader::open(&path)
            .map_err(io_error)?
            .with_guessed_format()
            .map_err(io_error)?;
        let image = reader
            .decode()
            .map_err(|source| FrameError::Decode {
                index,
                path: path.clone(),
                source,
            })?
            .into_rgba8();

        check_size(&mut self.size, index, &image)?;
        Ok(Some(image))
    }
}

/// Frames held in memory, index `i` is `frames[i]`.
#[derive(Debug, Clone, Default)]
pub struct MemoryFrames {
    frames: Vec<RgbaImage>,
    size: Option<(u32, u32)>,
}

impl MemoryFrames {
    pub fn new(frames: Vec<RgbaImage>) -> Self {
        Self { frames, size: None }
    }
}

impl FrameSource for MemoryFrames {
    fn frame(&mut self, index: u32) -> Result<Option<RgbaImage>, FrameError> {
        match self.frames.get(index as usize) {
            Some(image) => {
                check_size(&mut self.size, index, image)?;
                Ok(Some(image.clone()))
            }
            None => Ok(None),
        }
    }
}

/// All frames of a stream share the size of the first one read.
fn check_size(
    size: &mut Option<(u32, u32)>,
    index: u32,
    image: &RgbaImage,
) -> Result<(), FrameError> {
    let actual = image.dimensions();
    match *size {
        None => {
            *size = Some(actual);
            Ok(())
        }
        Some(expected) if expected == actual => Ok(()),
        Some((expected_w, expected_h)) => Err(FrameError::SizeMismatch {
            index,
            actual_w: actual.0,
            actual_h: actual.1,
            expected_w,
            expected_h,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use tempfile::TempDir;

    fn frames_config() -> FramesConfig {
        FramesConfig {
            dir: None,
            prefix: "shot_".to_string(),
            digits: 4,
            extension: "png".to_string(),
        }
    }

    #[test]
    fn test_frame_path() {
        let path = frame_path(Path::new("in"), &frames_config(), 7);
        assert_eq!(path, PathBuf::from("in/shot_0007.png"));

        let wide = frame_path(Path::new("in"), &frames_config(), 123456);
        assert_eq!(wide, PathBuf::from("in/shot_123456.png"));
    }

    #[test]
    fn test_directory_frames_stream() {
        let temp = TempDir::new().unwrap();
        let red = RgbaImage::from_pixel(4, 2, Rgba([255, 0, 0, 255]));
        let half = RgbaImage::from_pixel(4, 2, Rgba([0, 0, 255, 128]));
        red.save(temp.path().join("shot_0000.png")).unwrap();
        half.save(temp.path().join("shot_0001.png")).unwrap();

        let mut frames = DirectoryFrames::new(temp.path(), frames_config());
        assert_eq!(frames.frame(0).unwrap().unwrap(), red);
        assert_eq!(frames.frame(1).unwrap().unwrap(), half);
        assert!(frames.frame(2).unwrap().is_none());
    }

    #[test]
    fn test_directory_frames_decode_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("shot_0000.png");
        std::fs::write(path, b"not a png").unwrap();

        let mut frames = DirectoryFrames::new(temp.path(), frames_config());
        assert!(matches!(
            frames.frame(0),
            Err(FrameError::Decode { index: 0, .. })
        ));
    }

    #[test]
    fn test_memory_frames_size_mismatch() {
        let mut frames = MemoryFrames::new(vec![RgbaImage::new(4, 4), RgbaImage::new(4, 5)]);
        assert!(frames.frame(0).unwrap().is_some());
        assert!(matches!(
            frames.frame(1),
            Err(FrameError::SizeMismatch {
                index: 1,
                actual_h: 5,
                expected_h: 4,
                ..
            })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_directory_frames_unreadable_path_is_an_error() {
        let temp = TempDir::new().unwrap();
        // a regular file where the frame directory should be
        let not_a_dir = temp.path().join("frames");
        std::fs::write(&not_a_dir, b"").unwrap();

        let mut frames = DirectoryFrames::new(&not_a_dir, frames_config());
        assert!(matches!(
            frames.frame(0),
            Err(FrameError::Io { index: 0, .. })
        ));
    }

    #[test]
    fn test_memory_frames_end() {
        let mut frames = MemoryFrames::new(vec![RgbaImage::new(1, 1)]);
        assert!(frames.frame(1).unwrap().is_none());
        assert!(frames.frame(99).unwrap().is_none());
    }
}
