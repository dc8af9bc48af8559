//! Scene composition layouts.
//!
//! Movie: the visual aspect-fills the output frame. Book: the visual sits
//! on a black canvas with a subtitle pane in the lower third, word-wrapped
//! and centered over a translucent box. Subtitle text is rasterized once
//! per scene into an RGBA overlay and blended per frame.

use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use rusttype::{point, Font, Scale};
use tracing::warn;

use storyreel_common::config::{LayoutKind, RenderConfig, SubtitleConfig};
use storyreel_motion_core::{Clip, Frame};

/// Pane geometry for the book layout, all derived from the output size.
#[derive(Debug, Clone, Copy)]
struct PaneLayout {
    text_start_x: u32,
    text_start_y: u32,
    text_area_w: u32,
    text_area_h: u32,
}

impl PaneLayout {
    fn for_size(width: u32, height: u32) -> Self {
        let pane_height = (height as f64 * 0.35) as u32;
        let pane_bottom_margin = (height as f64 * 0.15) as u32;
        let pane_x_margin = (width as f64 * 0.08) as u32;
        let text_pad = (width as f64 * 0.04) as u32;
        let pane_top = height - pane_height - pane_bottom_margin;
        Self {
            text_start_x: pane_x_margin + text_pad,
            text_start_y: pane_top + text_pad,
            text_area_w: width - 2 * pane_x_margin - 2 * text_pad,
            text_area_h: pane_height.saturating_sub(2 * text_pad),
        }
    }
}

/// Composes scene visuals into output-sized frames for the active layout.
pub struct SceneComposer {
    layout: LayoutKind,
    subtitles: SubtitleConfig,
    width: u32,
    height: u32,
    font: Option<Font<'static>>,
}

impl SceneComposer {
    pub fn new(config: &RenderConfig) -> Self {
        let font = if config.subtitles.enabled {
            load_font(&config.subtitles)
        } else {
            None
        };
        Self {
            layout: config.layout_kind(),
            subtitles: config.subtitles.clone(),
            width: config.output.width,
            height: config.output.height,
            font,
        }
    }

    /// Wrap a scene visual into an output-sized clip, with the subtitle
    /// pane when the book layout and a font are active.
    pub fn compose(&self, clip: Clip, subtitle: &str, secondary: Option<&str>) -> Clip {
        let (width, height) = (self.width, self.height);
        let overlay = match self.layout {
            LayoutKind::Movie => None,
            LayoutKind::Book => self.subtitle_overlay(subtitle, secondary).map(Arc::new),
        };

        let audio = clip.audio.clone();
        let alpha = clip.alpha.clone();
        let inner = Arc::new(clip);
        let mut composed = Clip::new(
            width,
            height,
            inner.duration(),
            Arc::new(move |t| {
                let mut frame = aspect_fill(&inner.sample(t), width, height);
                if let Some(overlay) = &overlay {
                    blend_overlay(&mut frame, overlay);
                }
                frame
            }),
        );
        if let Some(audio) = audio {
            composed = composed.with_audio(audio);
        }
        if let Some(alpha) = alpha {
            composed = composed.with_alpha(alpha);
        }
        composed
    }

    fn subtitle_overlay(&self, subtitle: &str, secondary: Option<&str>) -> Option<RgbaImage> {
        if !self.subtitles.enabled || subtitle.is_empty() {
            return None;
        }
        let Some(font) = &self.font else {
            warn!("subtitle font unavailable, skipping subtitle pane");
            return None;
        };

        let pane = PaneLayout::for_size(self.width, self.height);
        let mut font_px = (self.width as f32 * 0.06).round();
        let mut lines = wrap_text(subtitle, font, font_px, pane.text_area_w as f32);
        // Shrink until the text fits four lines, with a floor.
        while lines.len() > 4 && font_px > 20.0 {
            font_px *= 0.9;
            lines = wrap_text(subtitle, font, font_px, pane.text_area_w as f32);
        }

        let mut blocks: Vec<(Vec<String>, f32, Rgba<u8>)> =
            vec![(lines, font_px, Rgba([255, 255, 255, 255]))];
        if self.subtitles.bilingual {
            if let Some(secondary) = secondary.filter(|s| !s.is_empty()) {
                let secondary_px = font_px * 0.8;
                blocks.push((
                    wrap_text(secondary, font, secondary_px, pane.text_area_w as f32),
                    secondary_px,
                    Rgba([200, 200, 200, 255]),
                ));
            }
        }

        let total_h: u32 = blocks
            .iter()
            .map(|(lines, px, _)| lines.len() as u32 * (px * 1.4) as u32)
            .sum::<u32>()
            + (blocks.len() as u32 - 1) * 20;
        let start_y =
            pane.text_start_y + pane.text_area_h.saturating_sub(total_h) / 2;

        let mut overlay = RgbaImage::from_pixel(self.width, self.height, Rgba([0, 0, 0, 0]));

        // Translucent box behind the whole text block.
        let box_pad = 15u32;
        let box_top = start_y.saturating_sub(box_pad);
        let box_bottom = (start_y + total_h + box_pad).min(self.height);
        let box_left = pane.text_start_x.saturating_sub(box_pad);
        let box_right = (pane.text_start_x + pane.text_area_w + box_pad).min(self.width);
        for y in box_top..box_bottom {
            for x in box_left..box_right {
                overlay.put_pixel(x, y, Rgba([0, 0, 0, 140]));
            }
        }

        let mut cursor_y = start_y as f32;
        for (lines, px, color) in &blocks {
            let scale = Scale::uniform(*px);
            for line in lines {
                let line_w = text_width(line, font, scale);
                let x = pane.text_start_x as f32 + (pane.text_area_w as f32 - line_w) / 2.0;
                draw_text(&mut overlay, font, scale, x.max(0.0), cursor_y, line, *color);
                cursor_y += px * 1.4;
            }
            cursor_y += 20.0;
        }
        Some(overlay)
    }
}

fn load_font(config: &SubtitleConfig) -> Option<Font<'static>> {
    let path = config.font.as_ref()?;
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) => {
            warn!(font = %path.display(), error = %e, "failed to read subtitle font");
            return None;
        }
    };
    let font = Font::try_from_vec(data);
    if font.is_none() {
        warn!(font = %path.display(), "failed to parse subtitle font");
    }
    font
}

/// Resize to cover the target and center-crop the overflow.
pub fn aspect_fill(frame: &Frame, width: u32, height: u32) -> Frame {
    let (sw, sh) = frame.dimensions();
    if (sw, sh) == (width, height) {
        return frame.clone();
    }
    let scale = (width as f64 / sw as f64).max(height as f64 / sh as f64);
    let rw = ((sw as f64 * scale).ceil() as u32).max(width);
    let rh = ((sh as f64 * scale).ceil() as u32).max(height);
    let resized = imageops::resize(frame, rw, rh, FilterType::Lanczos3);
    imageops::crop_imm(&resized, (rw - width) / 2, (rh - height) / 2, width, height).to_image()
}

fn blend_overlay(frame: &mut Frame, overlay: &RgbaImage) {
    for (pixel, over) in frame.pixels_mut().zip(overlay.pixels()) {
        let alpha = over.0[3] as f32 / 255.0;
        if alpha <= 0.0 {
            continue;
        }
        for c in 0..3 {
            let base = pixel.0[c] as f32;
            let top = over.0[c] as f32;
            pixel.0[c] = (base * (1.0 - alpha) + top * alpha).round() as u8;
        }
    }
}

/// Greedy word wrap against a pixel budget.
fn wrap_text(text: &str, font: &Font<'_>, font_px: f32, max_width: f32) -> Vec<String> {
    let scale = Scale::uniform(font_px);
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if text_width(&candidate, font, scale) <= max_width || current.is_empty() {
            current = candidate;
        } else {
            lines.push(std::mem::take(&mut current));
            current = word.to_string();
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn text_width(text: &str, font: &Font<'_>, scale: Scale) -> f32 {
    let v_metrics = font.v_metrics(scale);
    font.layout(text, scale, point(0.0, v_metrics.ascent))
        .filter_map(|g| g.pixel_bounding_box().map(|bb| bb.max.x as f32))
        .fold(0.0, f32::max)
}

fn draw_text(
    canvas: &mut RgbaImage,
    font: &Font<'_>,
    scale: Scale,
    x: f32,
    y: f32,
    text: &str,
    color: Rgba<u8>,
) {
    let v_metrics = font.v_metrics(scale);
    let (width, height) = canvas.dimensions();
    for glyph in font.layout(text, scale, point(x, y + v_metrics.ascent)) {
        if let Some(bb) = glyph.pixel_bounding_box() {
            glyph.draw(|gx, gy, coverage| {
                let px = bb.min.x + gx as i32;
                let py = bb.min.y + gy as i32;
                if px < 0 || py < 0 || px as u32 >= width || py as u32 >= height {
                    return;
                }
                let existing = canvas.get_pixel(px as u32, py as u32);
                let alpha = (coverage * color.0[3] as f32) as u8;
                if alpha > existing.0[3] || coverage > 0.1 {
                    canvas.put_pixel(
                        px as u32,
                        py as u32,
                        Rgba([color.0[0], color.0[1], color.0[2], alpha.max(existing.0[3])]),
                    );
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use storyreel_common::config::{CategoryStyle, TransitionKind};

    fn gradient(width: u32, height: u32) -> Frame {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 0])
        })
    }

    #[test]
    fn aspect_fill_covers_target_exactly() {
        let wide = gradient(200, 50);
        assert_eq!(aspect_fill(&wide, 100, 100).dimensions(), (100, 100));
        let tall = gradient(50, 200);
        assert_eq!(aspect_fill(&tall, 90, 160).dimensions(), (90, 160));
    }

    #[test]
    fn movie_layout_only_resizes() {
        let mut config = RenderConfig::default();
        config.output.width = 54;
        config.output.height = 96;
        let composer = SceneComposer::new(&config);
        let clip = Clip::from_image(gradient(108, 192), 2.0);
        let composed = composer.compose(clip, "once upon a time", None);
        assert_eq!(composed.sample(1.0).dimensions(), (54, 96));
        assert_eq!(composed.duration(), 2.0);
    }

    #[test]
    fn book_layout_without_font_still_composes() {
        let mut config = RenderConfig::default();
        config.output.width = 54;
        config.output.height = 96;
        config.category = "storybook".to_string();
        config.categories.insert(
            "storybook".to_string(),
            CategoryStyle {
                transition: TransitionKind::CrossfadeSlow,
                layout: LayoutKind::Book,
                bgm: None,
            },
        );
        config.subtitles.enabled = true;
        // No font configured: composition proceeds without the pane.
        let composer = SceneComposer::new(&config);
        let clip = Clip::from_image(gradient(108, 192), 2.0);
        let composed = composer.compose(clip, "once upon a time", None);
        assert_eq!(composed.sample(0.5).dimensions(), (54, 96));
    }

    #[test]
    fn pane_geometry_matches_proportions() {
        let pane = PaneLayout::for_size(1080, 1920);
        // 8% margin + 4% pad on each side.
        assert_eq!(pane.text_start_x, 86 + 43);
        assert_eq!(pane.text_area_w, 1080 - 2 * 86 - 2 * 43);
        // Pane top at H - 35% - 15%.
        assert_eq!(pane.text_start_y, 1920 - 672 - 288 + 43);
    }

    #[test]
    fn composed_clip_keeps_audio() {
        let config = RenderConfig::default();
        let composer = SceneComposer::new(&config);
        let audio = storyreel_motion_core::AudioTrack::silence(2.0, 44_100);
        let clip = Clip::from_image(gradient(10, 10), 2.0).with_audio(audio);
        let composed = composer.compose(clip, "", None);
        assert!(composed.audio.is_some());
    }
}
