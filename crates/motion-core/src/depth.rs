//! Depth maps and the estimator seam.
//!
//! A depth map holds one normalized value per pixel, 0.0 = farthest and
//! 1.0 = nearest. Real estimation happens out of process; this crate only
//! defines the seam, a deterministic fallback, and the on-disk cache.

use std::path::{Path, PathBuf};

use image::{GrayImage, Luma};
use sha2::{Digest, Sha256};
use tracing::debug;

use storyreel_common::{StoryError, StoryResult};

use crate::clip::Frame;

/// Per-pixel normalized depth, row-major, same dimensions as its image.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthMap {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl DepthMap {
    /// Min-max normalize an 8-bit depth image into `[0, 1]`. A uniform
    /// input yields an all-zero map (global shift, no relief).
    pub fn from_gray(gray: &GrayImage) -> Self {
        let (width, height) = gray.dimensions();
        if width == 0 || height == 0 {
            return Self {
                width,
                height,
                values: Vec::new(),
            };
        }
        let mut lo = u8::MAX;
        let mut hi = u8::MIN;
        for Luma([v]) in gray.pixels() {
            lo = lo.min(*v);
            hi = hi.max(*v);
        }
        let span = (hi - lo) as f32;
        let values = gray
            .pixels()
            .map(|Luma([v])| {
                if span > 0.0 {
                    (*v - lo) as f32 / span
                } else {
                    0.0
                }
            })
            .collect();
        Self {
            width,
            height,
            values,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Depth at a pixel, clamped to the map bounds.
    pub fn at(&self, x: u32, y: u32) -> f32 {
        let x = x.min(self.width - 1);
        let y = y.min(self.height - 1);
        self.values[(y * self.width + x) as usize]
    }

    /// Bilinearly resample to new dimensions.
    pub fn resized(&self, width: u32, height: u32) -> Self {
        if (width, height) == (self.width, self.height) {
            return self.clone();
        }
        let mut values = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                let sx = (x as f32 + 0.5) / width as f32 * self.width as f32 - 0.5;
                let sy = (y as f32 + 0.5) / height as f32 * self.height as f32 - 0.5;
                values.push(self.sample_bilinear(sx, sy));
            }
        }
        Self {
            width,
            height,
            values,
        }
    }

    fn sample_bilinear(&self, x: f32, y: f32) -> f32 {
        let max_x = (self.width - 1) as f32;
        let max_y = (self.height - 1) as f32;
        let x = x.clamp(0.0, max_x);
        let y = y.clamp(0.0, max_y);
        let x0 = x.floor() as u32;
        let y0 = y.floor() as u32;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let fx = x - x0 as f32;
        let fy = y - y0 as f32;
        let top = self.at(x0, y0) * (1.0 - fx) + self.at(x1, y0) * fx;
        let bottom = self.at(x0, y1) * (1.0 - fx) + self.at(x1, y1) * fx;
        top * (1.0 - fy) + bottom * fy
    }

    /// Quantize back to an 8-bit gray image for caching.
    pub fn to_gray(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            Luma([(self.at(x, y) * 255.0).round() as u8])
        })
    }
}

/// Produces a depth map for a still image.
pub trait DepthEstimator: Send + Sync {
    fn estimate(&self, image: &Frame) -> StoryResult<DepthMap>;
}

/// Deterministic fallback estimator: a radial gradient with the frame center
/// nearest. Keeps parallax usable when no learned estimator is wired in.
#[derive(Debug, Clone, Default)]
pub struct RadialDepthEstimator;

impl DepthEstimator for RadialDepthEstimator {
    fn estimate(&self, image: &Frame) -> StoryResult<DepthMap> {
        let (width, height) = image.dimensions();
        let cx = (width as f32 - 1.0) / 2.0;
        let cy = (height as f32 - 1.0) / 2.0;
        let max_dist = (cx * cx + cy * cy).sqrt().max(1.0);
        let values = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| {
                let dx = x as f32 - cx;
                let dy = y as f32 - cy;
                1.0 - (dx * dx + dy * dy).sqrt() / max_dist
            })
            .collect();
        Ok(DepthMap {
            width,
            height,
            values,
        })
    }
}

/// Content-addressed depth cache: maps are stored as gray PNGs keyed by the
/// SHA-256 of the source image file bytes, so edited images never reuse a
/// stale map.
#[derive(Debug, Clone)]
pub struct DepthCache {
    dir: PathBuf,
}

impl DepthCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn entry_path(&self, image_path: &Path) -> StoryResult<PathBuf> {
        let bytes = std::fs::read(image_path).map_err(|e| {
            StoryError::depth(format!("read image for cache key {}: {e}", image_path.display()))
        })?;
        let digest = Sha256::digest(&bytes);
        Ok(self.dir.join(format!("depth_{:x}.png", digest)))
    }

    /// Cached map for the image at `image_path`, if one exists.
    pub fn load(&self, image_path: &Path) -> StoryResult<Option<DepthMap>> {
        let entry = self.entry_path(image_path)?;
        if !entry.exists() {
            return Ok(None);
        }
        let gray = image::open(&entry)
            .map_err(|e| StoryError::depth(format!("read cached depth {}: {e}", entry.display())))?
            .into_luma8();
        debug!(cache = %entry.display(), "depth cache hit");
        Ok(Some(DepthMap::from_gray(&gray)))
    }

    /// Store a map under the image's content key.
    pub fn store(&self, image_path: &Path, map: &DepthMap) -> StoryResult<()> {
        std::fs::create_dir_all(&self.dir)?;
        let entry = self.entry_path(image_path)?;
        map.to_gray()
            .save(&entry)
            .map_err(|e| StoryError::depth(format!("write cached depth {}: {e}", entry.display())))?;
        Ok(())
    }
}
