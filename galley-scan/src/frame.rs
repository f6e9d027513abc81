//! Video frames and the camera abstraction that produces them.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::{GrayImage, RgbImage};
use tracing::debug;

use crate::error::CameraError;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// One captured video frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    image: RgbImage,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    /// Blank white frame, handy for fakes.
    pub fn blank(width: u32, height: u32) -> Self {
        Self::new(RgbImage::from_pixel(width, height, image::Rgb([255, 255, 255])))
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, CameraError> {
        Ok(Self::new(image::open(path)?.to_rgb8()))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }

    pub fn to_luma(&self) -> GrayImage {
        image::imageops::grayscale(&self.image)
    }
}

/// A camera. `open` acquires the device, `release` gives it back.
#[async_trait]
pub trait FrameSource: Send {
    async fn open(&mut self) -> Result<(), CameraError>;

    async fn read_frame(&mut self) -> Result<Frame, CameraError>;

    fn release(&mut self);
}

/// Releases the camera when dropped, on every exit path of a session.
pub struct CameraGuard<'a, S: FrameSource + ?Sized> {
    source: &'a mut S,
}

impl<'a, S: FrameSource + ?Sized> CameraGuard<'a, S> {
    /// Takes ownership of an already opened source.
    pub fn new(source: &'a mut S) -> Self {
        Self { source }
    }

    pub async fn read(&mut self) -> Result<Frame, CameraError> {
        self.source.read_frame().await
    }
}

impl<S: FrameSource + ?Sized> Drop for CameraGuard<'_, S> {
    fn drop(&mut self) {
        self.source.release();
        debug!("camera released");
    }
}

/// Plays image files from a directory, in file name order, as a camera.
#[derive(Debug)]
pub struct ImageDirSource {
    dir: PathBuf,
    looping: bool,
    files: Vec<PathBuf>,
    cursor: usize,
    opened: bool,
}

impl ImageDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            looping: true,
            files: Vec::new(),
            cursor: 0,
            opened: false,
        }
    }

    /// When false, reading past the last file is a read failure.
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn is_open(&self) -> bool {
        self.opened
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[async_trait]
impl FrameSource for ImageDirSource {
    async fn open(&mut self) -> Result<(), CameraError> {
        let entries = std::fs::read_dir(&self.dir)
            .map_err(|e| CameraError::Open(format!("{}: {e}", self.dir.display())))?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && is_image(&path) {
                files.push(path);
            }
        }
        files.sort();

        if files.is_empty() {
            return Err(CameraError::Open(format!(
                "no frames in {}",
                self.dir.display()
            )));
        }

        debug!(dir = %self.dir.display(), frames = files.len(), "frame directory opened");
        self.files = files;
        self.cursor = 0;
        self.opened = true;
        Ok(())
    }

    async fn read_frame(&mut self) -> Result<Frame, CameraError> {
        if !self.opened {
            return Err(CameraError::Read("camera is not open".to_string()));
        }
        if self.cursor >= self.files.len() {
            if !self.looping {
                return Err(CameraError::Read("end of frames".to_string()));
            }
            self.cursor = 0;
        }
        let path = &self.files[self.cursor];
        self.cursor += 1;
        Frame::open(path)
    }

    fn release(&mut self) {
        self.opened = false;
        self.files.clear();
        self.cursor = 0;
    }
}
