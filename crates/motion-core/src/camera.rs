//! Ken Burns camera synthesis.
//!
//! Every frame is cropped out of the ORIGINAL still and resized back to the
//! source dimensions with Lanczos3, so repeated sampling never compounds
//! resampling loss.

use image::imageops::{self, FilterType};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};
use std::sync::Arc;

use storyreel_common::config::CameraConfig;
use storyreel_scene_model::{CameraAction, PanDirection, ZoomDirection};

use crate::clip::{Clip, Frame};
use crate::easing::maybe_ease;

/// Sub-pixel crop rectangle in source-image coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropWindow {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Crop window for `action` at eased progress `p` over a `width` x `height`
/// source. Pure; the synthesizer and its tests share it.
pub fn crop_window(
    action: CameraAction,
    p: f64,
    width: u32,
    height: u32,
    config: &CameraConfig,
) -> CropWindow {
    let (w, h) = (width as f64, height as f64);
    let intensity = config.movement_intensity.max(0.0);
    // Intensity scales the zoom/pan amplitude, not the timing.
    let zoom_span = (config.zoom_scale - 1.0) * intensity;
    let pan_scale = 1.0 + (config.pan_scale - 1.0) * intensity;

    let zoomed = |scale: f64| {
        let fraction = 1.0 / scale.max(1.0);
        let cw = w * fraction;
        let ch = h * fraction;
        CropWindow {
            x: (w - cw) / 2.0,
            y: (h - ch) / 2.0,
            width: cw,
            height: ch,
        }
    };

    let panned = |direction: PanDirection, p: f64| {
        let fraction = 1.0 / pan_scale.max(1.0);
        let cw = w * fraction;
        let ch = h * fraction;
        // Travel spans the full slack on the pan axis; the other axis stays
        // centered.
        let slack_x = w - cw;
        let slack_y = h - ch;
        let (x, y) = match direction {
            PanDirection::Right => (slack_x * p, slack_y / 2.0),
            PanDirection::Left => (slack_x * (1.0 - p), slack_y / 2.0),
            PanDirection::Up => (slack_x / 2.0, slack_y * (1.0 - p)),
            PanDirection::Down => (slack_x / 2.0, slack_y * p),
        };
        CropWindow {
            x,
            y,
            width: cw,
            height: ch,
        }
    };

    match action {
        CameraAction::ZoomIn => zoomed(1.0 + zoom_span * p),
        CameraAction::ZoomOut => zoomed(1.0 + zoom_span * (1.0 - p)),
        CameraAction::Pan(direction) => panned(direction, p),
        CameraAction::Static => CropWindow {
            x: 0.0,
            y: 0.0,
            width: w,
            height: h,
        },
        CameraAction::Compound { zoom, pan } => {
            let scale = match zoom {
                ZoomDirection::In => 1.0 + zoom_span * p,
                ZoomDirection::Out => 1.0 + zoom_span * (1.0 - p),
            };
            let sized = zoomed(scale);
            let slack_x = w - sized.width;
            let slack_y = h - sized.height;
            let (x, y) = match pan {
                PanDirection::Right => (slack_x * p, slack_y / 2.0),
                PanDirection::Left => (slack_x * (1.0 - p), slack_y / 2.0),
                PanDirection::Up => (slack_x / 2.0, slack_y * (1.0 - p)),
                PanDirection::Down => (slack_x / 2.0, slack_y * p),
            };
            CropWindow { x, y, ..sized }
        }
    }
}

/// Synthesizes a moving clip out of one still image.
#[derive(Debug, Clone)]
pub struct CameraMotionSynthesizer {
    config: CameraConfig,
}

impl CameraMotionSynthesizer {
    pub fn new(config: CameraConfig) -> Self {
        Self { config }
    }

    /// Build a clip of `duration` seconds animating `action` over `image`.
    pub fn synthesize(&self, image: Frame, duration: f64, action: CameraAction) -> Clip {
        let (width, height) = image.dimensions();
        let config = self.config.clone();
        let image = Arc::new(image);

        Clip::new(
            width,
            height,
            duration,
            Arc::new(move |t| {
                let raw = if duration > 0.0 { t / duration } else { 0.0 };
                let p = maybe_ease(raw, config.easing);
                render_frame(&image, action, p, &config)
            }),
        )
    }
}

fn render_frame(source: &Frame, action: CameraAction, p: f64, config: &CameraConfig) -> Frame {
    let (width, height) = source.dimensions();
    let window = crop_window(action, p, width, height, config);

    let x = (window.x.round() as u32).min(width.saturating_sub(1));
    let y = (window.y.round() as u32).min(height.saturating_sub(1));
    let cw = (window.width.round() as u32).clamp(1, width - x);
    let ch = (window.height.round() as u32).clamp(1, height - y);

    let rotation = rotation_deg(action, p, config).filter(|angle| angle.abs() > 1e-6);
    match rotation {
        Some(angle) => {
            let cropped = rotated_window(source, x, y, cw, ch, angle);
            imageops::resize(&cropped, width, height, FilterType::Lanczos3)
        }
        None if (x, y, cw, ch) == (0, 0, width, height) => source.clone(),
        None => {
            let cropped = imageops::crop_imm(source, x, y, cw, ch).to_image();
            imageops::resize(&cropped, width, height, FilterType::Lanczos3)
        }
    }
}

/// Rotated crop at source resolution. The crop is widened to the rotated
/// window's bounding box first, so after rotation the corners are filled
/// with real source pixels instead of a fill color. Padding is clamped to
/// the source bounds; only a near-full-frame window at a steep angle can
/// still run out of pixels.
fn rotated_window(source: &Frame, x: u32, y: u32, cw: u32, ch: u32, angle_deg: f64) -> Frame {
    let (width, height) = source.dimensions();
    let theta = angle_deg.to_radians();
    let (sin_a, cos_a) = (theta.sin().abs(), theta.cos().abs());
    let pad_w = ((cw as f64 * cos_a + ch as f64 * sin_a).ceil() as u32)
        .max(cw)
        .min(width);
    let pad_h = ((cw as f64 * sin_a + ch as f64 * cos_a).ceil() as u32)
        .max(ch)
        .min(height);
    let px = (x + cw / 2)
        .saturating_sub(pad_w / 2)
        .min(width - pad_w);
    let py = (y + ch / 2)
        .saturating_sub(pad_h / 2)
        .min(height - pad_h);

    let padded = imageops::crop_imm(source, px, py, pad_w, pad_h).to_image();
    let rotated = rotate_about_center(
        &padded,
        theta as f32,
        Interpolation::Bilinear,
        image::Rgb([0, 0, 0]),
    );
    imageops::crop_imm(&rotated, (pad_w - cw) / 2, (pad_h - ch) / 2, cw, ch).to_image()
}

/// Rotation angle in degrees for `action` at progress `p`, if rotation is
/// configured. Zooms rotate linearly, compounds swing out and back, pans and
/// static frames never rotate.
fn rotation_deg(action: CameraAction, p: f64, config: &CameraConfig) -> Option<f64> {
    let max = config.rotation_deg? * config.movement_intensity.max(0.0);
    match action {
        CameraAction::ZoomIn | CameraAction::ZoomOut => Some(max * p),
        CameraAction::Compound { .. } => Some(max * (p * std::f64::consts::PI).sin()),
        CameraAction::Pan(_) | CameraAction::Static => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn config() -> CameraConfig {
        CameraConfig {
            zoom_scale: 1.15,
            pan_scale: 1.12,
            movement_intensity: 1.0,
            easing: false,
            rotation_deg: None,
        }
    }

    #[test]
    fn zoom_in_midpoint_window() {
        // Halfway through a 1.15x push-in the scale is 1.075, so the window
        // is 1/1.075 of the source.
        let w = crop_window(CameraAction::ZoomIn, 0.5, 1000, 2000, &config());
        assert!((w.width - 1000.0 / 1.075).abs() < 1e-6);
        assert!((w.height - 2000.0 / 1.075).abs() < 1e-6);
        // Centered.
        assert!((w.x - (1000.0 - w.width) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn zoom_in_ends_at_full_scale() {
        let w = crop_window(CameraAction::ZoomIn, 1.0, 1150, 1150, &config());
        assert!((w.width - 1000.0).abs() < 1e-6);
    }

    #[test]
    fn zoom_out_is_reversed_zoom_in() {
        let cfg = config();
        let a = crop_window(CameraAction::ZoomIn, 0.25, 1000, 1000, &cfg);
        let b = crop_window(CameraAction::ZoomOut, 0.75, 1000, 1000, &cfg);
        assert!((a.width - b.width).abs() < 1e-9);
    }

    #[test]
    fn pan_window_size_is_constant() {
        let cfg = config();
        let start = crop_window(CameraAction::Pan(PanDirection::Right), 0.0, 1120, 1120, &cfg);
        let end = crop_window(CameraAction::Pan(PanDirection::Right), 1.0, 1120, 1120, &cfg);
        assert!((start.width - end.width).abs() < 1e-9);
        assert!((start.width - 1000.0).abs() < 1e-6);
        // Left edge at start, right edge at end.
        assert!(start.x.abs() < 1e-9);
        assert!((end.x + end.width - 1120.0).abs() < 1e-6);
    }

    #[test]
    fn pan_up_travels_bottom_to_top() {
        let cfg = config();
        let start = crop_window(CameraAction::Pan(PanDirection::Up), 0.0, 1120, 1120, &cfg);
        let end = crop_window(CameraAction::Pan(PanDirection::Up), 1.0, 1120, 1120, &cfg);
        assert!(start.y > end.y);
        assert!(end.y.abs() < 1e-9);
    }

    #[test]
    fn static_action_is_identity_window() {
        let w = crop_window(CameraAction::Static, 0.7, 640, 480, &config());
        assert_eq!(w, CropWindow { x: 0.0, y: 0.0, width: 640.0, height: 480.0 });
    }

    #[test]
    fn intensity_scales_amplitude() {
        let mut cfg = config();
        cfg.movement_intensity = 0.5;
        // Effective end scale 1.075 instead of 1.15.
        let w = crop_window(CameraAction::ZoomIn, 1.0, 1000, 1000, &cfg);
        assert!((w.width - 1000.0 / 1.075).abs() < 1e-6);
    }

    #[test]
    fn compound_interpolates_both_axes() {
        let cfg = config();
        let action = CameraAction::Compound {
            zoom: ZoomDirection::In,
            pan: PanDirection::Right,
        };
        let mid = crop_window(action, 0.5, 1000, 1000, &cfg);
        assert!(mid.width < 1000.0);
        // Offset is half the slack at midpoint.
        assert!((mid.x - (1000.0 - mid.width) * 0.5).abs() < 1e-9);
    }

    #[test]
    fn synthesized_frames_keep_source_dimensions() {
        let image = RgbImage::from_pixel(64, 48, Rgb([90, 90, 90]));
        let clip = CameraMotionSynthesizer::new(config()).synthesize(image, 2.0, CameraAction::ZoomIn);
        let frame = clip.sample(1.0);
        assert_eq!(frame.dimensions(), (64, 48));
    }

    #[test]
    fn rotation_keeps_corners_inside_the_source() {
        let mut cfg = config();
        cfg.rotation_deg = Some(5.0);
        let image = RgbImage::from_pixel(200, 200, Rgb([255, 255, 255]));
        let clip = CameraMotionSynthesizer::new(cfg).synthesize(image, 2.0, CameraAction::ZoomIn);
        // End of the push-in carries the full tilt. On an all-white source
        // the corners must stay bright; a fill color would read near zero.
        let frame = clip.sample(2.0);
        assert_eq!(frame.dimensions(), (200, 200));
        assert!(frame.get_pixel(0, 0).0[0] > 200);
        assert!(frame.get_pixel(199, 199).0[0] > 200);
    }

    #[test]
    fn static_clip_frames_match_source() {
        let image = RgbImage::from_pixel(32, 32, Rgb([7, 8, 9]));
        let clip =
            CameraMotionSynthesizer::new(config()).synthesize(image.clone(), 1.0, CameraAction::Static);
        assert_eq!(clip.sample(0.5), image);
    }
}
