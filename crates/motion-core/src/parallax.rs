//! Depth-weighted parallax rendering.
//!
//! For pure pan actions each output pixel is pulled from a source position
//! displaced against the pan direction, weighted by that pixel's depth.
//! Near pixels travel the full offset, far pixels barely move, which reads
//! as camera translation through a 3D scene.

use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::Rgb;
use tracing::debug;

use storyreel_common::config::ParallaxConfig;
use storyreel_scene_model::{CameraAction, PanDirection};

use crate::clip::{Clip, Frame};
use crate::depth::DepthMap;
use crate::easing::ease_in_out_cubic;

#[derive(Debug, Clone)]
pub struct ParallaxRenderer {
    config: ParallaxConfig,
}

impl ParallaxRenderer {
    pub fn new(config: ParallaxConfig) -> Self {
        Self { config }
    }

    /// Build a parallax clip for a pure pan, or `None` when `action` is not
    /// one. Zooms and compounds fall back to the flat camera path.
    pub fn render(
        &self,
        image: &Frame,
        depth: &DepthMap,
        duration: f64,
        action: CameraAction,
        target_width: u32,
        target_height: u32,
    ) -> Option<Clip> {
        let direction = match action {
            CameraAction::Pan(direction) => direction,
            _ => return None,
        };

        let base = Arc::new(aspect_fill(image, target_width, target_height));
        let depth = Arc::new(depth.resized(target_width, target_height));

        // Peak displacement in pixels along the pan axis.
        let axis_len = match direction {
            PanDirection::Left | PanDirection::Right => target_width as f64,
            PanDirection::Up | PanDirection::Down => target_height as f64,
        };
        let amplitude = self.config.movement_fraction * axis_len;
        let sign = match direction {
            PanDirection::Right | PanDirection::Down => 1.0,
            PanDirection::Left | PanDirection::Up => -1.0,
        };
        debug!(?direction, amplitude, "parallax pan");

        Some(Clip::new(
            target_width,
            target_height,
            duration,
            Arc::new(move |t| {
                let p = if duration > 0.0 { t / duration } else { 0.0 };
                let offset = sign * amplitude * ease_in_out_cubic(p);
                displace(&base, &depth, direction, offset as f32)
            }),
        ))
    }
}

/// Resize to cover the target and center-crop the overflow.
fn aspect_fill(image: &Frame, width: u32, height: u32) -> Frame {
    let (sw, sh) = image.dimensions();
    if (sw, sh) == (width, height) {
        return image.clone();
    }
    let scale = (width as f64 / sw as f64).max(height as f64 / sh as f64);
    let rw = ((sw as f64 * scale).ceil() as u32).max(width);
    let rh = ((sh as f64 * scale).ceil() as u32).max(height);
    let resized = imageops::resize(image, rw, rh, FilterType::Lanczos3);
    imageops::crop_imm(&resized, (rw - width) / 2, (rh - height) / 2, width, height).to_image()
}

fn displace(base: &Frame, depth: &DepthMap, direction: PanDirection, offset: f32) -> Frame {
    let (width, height) = base.dimensions();
    Frame::from_fn(width, height, |x, y| {
        let shift = offset * depth.at(x, y);
        let (sx, sy) = match direction {
            PanDirection::Left | PanDirection::Right => (x as f32 - shift, y as f32),
            PanDirection::Up | PanDirection::Down => (x as f32, y as f32 - shift),
        };
        sample_bilinear(base, sx, sy)
    })
}

/// Bilinear sample with edge clamp; out-of-range coordinates repeat the
/// border pixel instead of wrapping.
fn sample_bilinear(image: &Frame, x: f32, y: f32) -> Rgb<u8> {
    let (width, height) = image.dimensions();
    let max_x = (width - 1) as f32;
    let max_y = (height - 1) as f32;
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let mut out = [0u8; 3];
    for c in 0..3 {
        let tl = image.get_pixel(x0, y0).0[c] as f32;
        let tr = image.get_pixel(x1, y0).0[c] as f32;
        let bl = image.get_pixel(x0, y1).0[c] as f32;
        let br = image.get_pixel(x1, y1).0[c] as f32;
        let top = tl * (1.0 - fx) + tr * fx;
        let bottom = bl * (1.0 - fx) + br * fx;
        out[c] = (top * (1.0 - fy) + bottom * fy).round() as u8;
    }
    Rgb(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, RgbImage};
    use storyreel_scene_model::ZoomDirection;

    fn renderer() -> ParallaxRenderer {
        ParallaxRenderer::new(ParallaxConfig {
            enabled: true,
            movement_fraction: 0.1,
        })
    }

    fn gradient_image(width: u32, height: u32) -> Frame {
        RgbImage::from_fn(width, height, |x, _| {
            Rgb([(x * 255 / width.max(1)) as u8, 0, 0])
        })
    }

    #[test]
    fn non_pan_actions_are_rejected() {
        let image = gradient_image(16, 16);
        let depth = DepthMap::from_gray(&GrayImage::from_pixel(16, 16, Luma([0])));
        let r = renderer();
        assert!(r
            .render(&image, &depth, 2.0, CameraAction::ZoomIn, 16, 16)
            .is_none());
        assert!(r
            .render(
                &image,
                &depth,
                2.0,
                CameraAction::Compound {
                    zoom: ZoomDirection::In,
                    pan: PanDirection::Left,
                },
                16,
                16,
            )
            .is_none());
    }

    #[test]
    fn zero_depth_pan_is_identity() {
        // Uniform gray normalizes to all-zero depth, so nothing displaces.
        let image = gradient_image(16, 16);
        let depth = DepthMap::from_gray(&GrayImage::from_pixel(16, 16, Luma([128])));
        let clip = renderer()
            .render(&image, &depth, 2.0, CameraAction::Pan(PanDirection::Right), 16, 16)
            .expect("clip");
        assert_eq!(clip.sample(2.0), image);
    }

    #[test]
    fn near_pixels_displace_more_than_far() {
        // Top half far (0), bottom half near (255).
        let image = gradient_image(32, 32);
        let gray = GrayImage::from_fn(32, 32, |_, y| Luma([if y < 16 { 0 } else { 255 }]));
        let depth = DepthMap::from_gray(&gray);
        let clip = renderer()
            .render(&image, &depth, 2.0, CameraAction::Pan(PanDirection::Right), 32, 32)
            .expect("clip");
        let frame = clip.sample(2.0);
        // Near row pulled from further left, so it reads darker on the
        // red gradient than the unmoved far row.
        let far = frame.get_pixel(20, 4).0[0];
        let near = frame.get_pixel(20, 28).0[0];
        assert!(near < far, "near {near} should sample left of far {far}");
    }

    #[test]
    fn output_matches_target_dimensions() {
        let image = gradient_image(64, 48);
        let depth = DepthMap::from_gray(&GrayImage::from_pixel(64, 48, Luma([100])));
        let clip = renderer()
            .render(&image, &depth, 1.0, CameraAction::Pan(PanDirection::Up), 30, 40)
            .expect("clip");
        assert_eq!(clip.sample(0.5).dimensions(), (30, 40));
    }
}
