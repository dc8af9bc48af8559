//! Transition construction.
//!
//! Overlap transitions (crossfade, circle open) are expressed as an alpha
//! function attached to the incoming clip; the flattener blends it over the
//! outgoing segment for the overlap span. The page turn is different: it is
//! its own short clip inserted between two segments.

use std::sync::Arc;

use image::{GrayImage, Luma, Rgb};

use storyreel_common::config::TransitionKind;
use storyreel_motion_core::easing::ease_in_out_cubic;
use storyreel_motion_core::{AlphaFn, AlphaMask, Clip, Frame};

/// Alpha function the incoming clip carries for its first `duration`
/// seconds. `None` for kinds with no overlap blend and for degenerate
/// durations.
pub fn overlap_alpha(
    kind: TransitionKind,
    duration: f64,
    width: u32,
    height: u32,
) -> Option<AlphaFn> {
    if duration <= 0.0 {
        return None;
    }
    match kind {
        TransitionKind::Crossfade | TransitionKind::CrossfadeSlow => {
            Some(Arc::new(move |t| {
                let p = (t / duration).clamp(0.0, 1.0);
                AlphaMask::Uniform(p as f32)
            }))
        }
        TransitionKind::CircleOpen => Some(Arc::new(move |t| {
            let p = ease_in_out_cubic((t / duration).clamp(0.0, 1.0));
            if p >= 1.0 {
                AlphaMask::Uniform(1.0)
            } else {
                AlphaMask::Mask(circle_mask(width, height, p))
            }
        })),
        TransitionKind::PageTurn | TransitionKind::None => None,
    }
}

/// Anti-aliased disk mask at eased progress `p`. The radius reaches the
/// frame half-diagonal at `p = 1` so the final mask covers every pixel.
fn circle_mask(width: u32, height: u32, p: f64) -> GrayImage {
    let cx = width as f64 / 2.0;
    let cy = height as f64 / 2.0;
    let max_radius = (cx * cx + cy * cy).sqrt();
    let radius = max_radius * p;
    // One-pixel soft edge keeps the rim from shimmering frame to frame.
    let feather = 1.5;
    GrayImage::from_fn(width, height, |x, y| {
        let dx = x as f64 + 0.5 - cx;
        let dy = y as f64 + 0.5 - cy;
        let dist = (dx * dx + dy * dy).sqrt();
        let coverage = ((radius - dist) / feather + 0.5).clamp(0.0, 1.0);
        Luma([(coverage * 255.0).round() as u8])
    })
}

/// Build the inserted page-turn clip: the outgoing page pivots away over
/// the incoming page. `prev` and `next` must share dimensions.
pub fn page_turn(prev: Frame, next: Frame, duration: f64) -> Option<Clip> {
    if duration <= 0.0 || prev.dimensions() != next.dimensions() {
        return None;
    }
    let (width, height) = prev.dimensions();
    let prev = Arc::new(prev);
    let next = Arc::new(next);
    Some(Clip::new(
        width,
        height,
        duration,
        Arc::new(move |t| {
            let p = ease_in_out_cubic((t / duration).clamp(0.0, 1.0));
            page_turn_frame(&prev, &next, p)
        }),
    ))
}

/// One page-turn frame at eased progress `p in [0, 1]`.
///
/// The page pivots on the left spine through `p * 90` degrees, so its
/// projected width shrinks with cos(theta) while the free edge skews
/// vertically with sin(theta). A shadow deepens toward the free edge, a
/// thin highlight marks the fold, and the lifted page casts a sin(theta)
/// shadow band onto the arriving image just past the edge.
fn page_turn_frame(prev: &Frame, next: &Frame, p: f64) -> Frame {
    let (width, height) = prev.dimensions();
    let theta = p * std::f64::consts::FRAC_PI_2;
    let cos_t = theta.cos();
    let sin_t = theta.sin();
    let page_width = width as f64 * cos_t;
    let skew = height as f64 * 0.15 * sin_t;
    let shadow_band = width as f64 * 0.08;

    Frame::from_fn(width, height, |x, y| {
        let fx = x as f64;
        if page_width < 1.0 {
            return *next.get_pixel(x, y);
        }
        if fx >= page_width {
            let mut pixel = *next.get_pixel(x, y);
            let past = fx - page_width;
            if past < shadow_band {
                let strength = (0.5 * sin_t * (1.0 - past / shadow_band)) as f32;
                for c in pixel.0.iter_mut() {
                    *c = (*c as f32 * (1.0 - strength)) as u8;
                }
            }
            return pixel;
        }
        // Position across the turning page, 0 at the spine, 1 at the edge.
        let u = fx / page_width;
        let sx = (fx / cos_t).min((width - 1) as f64);
        // Trapezoid: rows compress toward the middle as the edge lifts.
        let squeeze = 1.0 - (skew * u * 2.0) / height as f64;
        let sy = height as f64 / 2.0 + (y as f64 - height as f64 / 2.0) / squeeze.max(0.05);
        if sy < 0.0 || sy > (height - 1) as f64 {
            // Lifted page no longer covers this row.
            return *next.get_pixel(x, y);
        }

        let Rgb([r, g, b]) = *prev.get_pixel(sx as u32, sy as u32);
        let shade = (1.0 - 0.45 * sin_t * u) as f32;
        let mut out = [
            (r as f32 * shade) as u8,
            (g as f32 * shade) as u8,
            (b as f32 * shade) as u8,
        ];
        // Fold highlight along the free edge.
        if u > 0.96 && sin_t > 0.05 {
            for c in &mut out {
                *c = c.saturating_add(50);
            }
        }
        Rgb(out)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn solid(value: u8) -> Frame {
        RgbImage::from_pixel(20, 20, Rgb([value, value, value]))
    }

    #[test]
    fn crossfade_alpha_ramps_up() {
        let alpha = overlap_alpha(TransitionKind::Crossfade, 0.8, 20, 20).expect("alpha");
        match (alpha(0.0), alpha(0.4), alpha(0.8)) {
            (AlphaMask::Uniform(a), AlphaMask::Uniform(b), AlphaMask::Uniform(c)) => {
                assert_eq!(a, 0.0);
                assert!((b - 0.5).abs() < 1e-6);
                assert_eq!(c, 1.0);
            }
            _ => panic!("crossfade must be uniform"),
        }
    }

    #[test]
    fn degenerate_duration_yields_no_alpha() {
        assert!(overlap_alpha(TransitionKind::Crossfade, 0.0, 20, 20).is_none());
        assert!(overlap_alpha(TransitionKind::None, 1.0, 20, 20).is_none());
        assert!(overlap_alpha(TransitionKind::PageTurn, 0.7, 20, 20).is_none());
    }

    #[test]
    fn circle_open_covers_frame_at_completion() {
        let alpha = overlap_alpha(TransitionKind::CircleOpen, 1.0, 21, 21).expect("alpha");
        // Mid-transition: opaque center, transparent corner.
        match alpha(0.5) {
            AlphaMask::Mask(mask) => {
                assert_eq!(mask.get_pixel(10, 10).0[0], 255);
                assert_eq!(mask.get_pixel(0, 0).0[0], 0);
            }
            _ => panic!("mid circle must be a mask"),
        }
        match alpha(1.0) {
            AlphaMask::Uniform(a) => assert_eq!(a, 1.0),
            AlphaMask::Mask(mask) => {
                for pixel in mask.pixels() {
                    assert_eq!(pixel.0[0], 255);
                }
            }
        }
    }

    #[test]
    fn page_turn_starts_on_prev_and_ends_on_next() {
        let clip = page_turn(solid(200), solid(20), 0.7).expect("clip");
        assert_eq!(clip.sample(0.0).get_pixel(5, 10).0[0], 200);
        assert_eq!(clip.sample(0.7).get_pixel(5, 10).0[0], 20);
    }

    #[test]
    fn page_turn_rejects_mismatched_frames() {
        let other = RgbImage::from_pixel(10, 20, Rgb([0, 0, 0]));
        assert!(page_turn(solid(200), other, 0.7).is_none());
        assert!(page_turn(solid(200), solid(20), 0.0).is_none());
    }

    #[test]
    fn circle_open_radius_follows_eased_progress() {
        let alpha = overlap_alpha(TransitionKind::CircleOpen, 1.0, 200, 200).expect("alpha");
        // A quarter of the way in, eased progress is 0.0625, so the disk
        // radius is under 9px. Linear progress would already reach 35px.
        match alpha(0.25) {
            AlphaMask::Mask(mask) => {
                assert_eq!(mask.get_pixel(100, 100).0[0], 255);
                assert_eq!(mask.get_pixel(120, 100).0[0], 0);
            }
            _ => panic!("partial circle must be a mask"),
        }
    }

    #[test]
    fn page_turn_angle_follows_eased_progress() {
        let clip = page_turn(solid(200), solid(20), 1.0).expect("clip");
        // At a quarter of the duration the eased angle is still small, so
        // the column near the free edge still shows the outgoing page.
        let frame = clip.sample(0.25);
        assert!(frame.get_pixel(19, 10).0[0] > 150);
    }

    #[test]
    fn arriving_page_carries_an_edge_shadow() {
        let prev = RgbImage::from_pixel(100, 100, Rgb([200, 200, 200]));
        let next = RgbImage::from_pixel(100, 100, Rgb([120, 120, 120]));
        let clip = page_turn(prev, next.clone(), 1.0).expect("clip");
        let frame = clip.sample(0.5);
        // Just past the lifted edge the incoming page sits in shadow; far
        // from the edge it shows untouched.
        let shadowed = frame.get_pixel(72, 50).0[0];
        let clear = frame.get_pixel(95, 50).0[0];
        assert!(shadowed < clear, "expected shadow band, got {shadowed} vs {clear}");
        assert_eq!(clear, 120);
        // The final frame is exactly the incoming image.
        assert_eq!(clip.sample(1.0), next);
    }

    #[test]
    fn page_turn_midpoint_shows_both_pages() {
        let clip = page_turn(solid(220), solid(20), 1.0).expect("clip");
        let frame = clip.sample(0.5);
        // Spine side still shows the darkened outgoing page, the revealed
        // side shows the incoming one.
        assert!(frame.get_pixel(1, 10).0[0] > 100);
        assert_eq!(frame.get_pixel(19, 10).0[0], 20);
    }
}
