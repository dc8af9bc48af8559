//! Render configuration.
//!
//! The engine takes one immutable [`RenderConfig`] value, passed explicitly
//! into every component. There is no process-wide configuration singleton.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Transition family applied between timeline segments.
///
/// Overlap kinds (crossfade, crossfade_slow, circle_open) make the incoming
/// segment start before the running end time; insert kinds (page_turn) become
/// their own timeline member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    #[default]
    None,
    Crossfade,
    CrossfadeSlow,
    CircleOpen,
    PageTurn,
}

/// Scene composition layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LayoutKind {
    /// Full-frame visual, no text pane.
    #[default]
    Movie,
    /// Storybook layout: visual over a dark canvas with a subtitle pane.
    Book,
}

/// Per-category styling: which transition, layout, and music a category gets.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CategoryStyle {
    #[serde(default)]
    pub transition: TransitionKind,
    #[serde(default)]
    pub layout: LayoutKind,
    /// Background music file for this category.
    #[serde(default)]
    pub bgm: Option<PathBuf>,
}

/// Output container parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Frame rate.
    pub fps: u32,
    /// Directory the final file (and depth cache) is written to.
    pub output_dir: PathBuf,
}

/// Camera-motion parameters for the Ken Burns synthesizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Zoom end scale (1.15 = 15% push-in over the segment).
    pub zoom_scale: f64,
    /// Fixed window scale for pan actions.
    pub pan_scale: f64,
    /// Multiplier on movement amplitude.
    pub movement_intensity: f64,
    /// Remap progress through cubic ease-in-out.
    pub easing: bool,
    /// Maximum rotation in degrees; `None` disables rotation.
    pub rotation_deg: Option<f64>,
}

/// Parallax (depth-displacement) parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParallaxConfig {
    pub enabled: bool,
    /// Peak displacement as a fraction of frame width/height.
    pub movement_fraction: f64,
}

/// Audio mixing parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Mix/output sample rate.
    pub sample_rate: u32,
    /// Silence appended after each scene's narration (seconds).
    pub narration_padding_secs: f64,
    /// BGM gain relative to narration.
    pub bgm_volume: f32,
    /// Fade-out applied to the very end of the BGM (seconds).
    pub bgm_fade_out_secs: f64,
    /// Silence before the cover title audio (seconds).
    pub cover_lead_in_secs: f64,
    /// Silence after the cover title audio (seconds).
    pub cover_lead_out_secs: f64,
    /// Minimum cover segment duration (seconds).
    pub cover_min_secs: f64,
}

/// Transition durations, configurable per kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionTimings {
    pub crossfade_secs: f64,
    pub crossfade_slow_secs: f64,
    pub circle_open_secs: f64,
    pub page_turn_secs: f64,
}

/// Custom intro segment: a pre-rendered video, optionally dubbed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntroConfig {
    /// Intro video file.
    pub video: PathBuf,
    /// Text to synthesize over the intro; `None` keeps the intro silent.
    #[serde(default)]
    pub dub_text: Option<String>,
    /// Maximum permitted dub speech-rate multiplier (1.3 = +30%).
    #[serde(default = "default_max_speedup")]
    pub max_speedup: f64,
}

fn default_max_speedup() -> f64 {
    1.3
}

/// Cover segment: a pre-generated cover still, optionally narrated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverConfig {
    pub image: PathBuf,
    #[serde(default)]
    pub title_audio: Option<PathBuf>,
}

/// Subtitle rendering options for the book layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtitleConfig {
    pub enabled: bool,
    /// Render the secondary subtitle line when a scene carries one.
    pub bilingual: bool,
    /// TTF font file; subtitles are skipped with a warning when missing.
    #[serde(default)]
    pub font: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "storyreel=debug,warn").
    pub level: String,
    /// Whether to output structured JSON logs.
    pub json: bool,
}

/// Complete engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub output: OutputConfig,
    pub camera: CameraConfig,
    pub parallax: ParallaxConfig,
    pub audio: AudioConfig,
    pub transitions: TransitionTimings,

    /// Active category, used to look up styling in `categories`.
    #[serde(default)]
    pub category: String,
    /// Category name -> styling. An unconfigured category gets no
    /// transition, the movie layout, and no music; nothing is inherited
    /// from a global default.
    #[serde(default)]
    pub categories: BTreeMap<String, CategoryStyle>,

    #[serde(default)]
    pub intro: Option<IntroConfig>,
    #[serde(default)]
    pub cover: Option<CoverConfig>,
    /// Outro still image, shown with a short fade at the end.
    #[serde(default)]
    pub outro_image: Option<PathBuf>,
    /// Outro duration (seconds).
    #[serde(default = "default_outro_secs")]
    pub outro_secs: f64,

    pub subtitles: SubtitleConfig,
    pub logging: LoggingConfig,
}

fn default_outro_secs() -> f64 {
    4.0
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            fps: 24,
            output_dir: PathBuf::from("output"),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            zoom_scale: 1.15,
            pan_scale: 1.12,
            movement_intensity: 1.0,
            easing: true,
            rotation_deg: None,
        }
    }
}

impl Default for ParallaxConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            movement_fraction: 0.1,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            narration_padding_secs: 0.5,
            bgm_volume: 0.15,
            bgm_fade_out_secs: 2.0,
            cover_lead_in_secs: 0.5,
            cover_lead_out_secs: 1.0,
            cover_min_secs: 2.0,
        }
    }
}

impl Default for TransitionTimings {
    fn default() -> Self {
        Self {
            crossfade_secs: 0.8,
            crossfade_slow_secs: 2.0,
            circle_open_secs: 1.0,
            page_turn_secs: 0.7,
        }
    }
}

impl Default for SubtitleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bilingual: false,
            font: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            output: OutputConfig::default(),
            camera: CameraConfig::default(),
            parallax: ParallaxConfig::default(),
            audio: AudioConfig::default(),
            transitions: TransitionTimings::default(),
            category: String::new(),
            categories: BTreeMap::new(),
            intro: None,
            cover: None,
            outro_image: None,
            outro_secs: default_outro_secs(),
            subtitles: SubtitleConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl RenderConfig {
    /// Load config from a JSON file, falling back to defaults on error.
    pub fn load(path: &std::path::Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config as pretty JSON.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    fn style(&self) -> Option<&CategoryStyle> {
        self.categories.get(&self.category)
    }

    /// Transition for the active category. An unconfigured category is an
    /// explicit `TransitionKind::None`, not an inherited default.
    pub fn transition_kind(&self) -> TransitionKind {
        self.style().map_or(TransitionKind::None, |s| s.transition)
    }

    /// Layout for the active category.
    pub fn layout_kind(&self) -> LayoutKind {
        self.style().map_or(LayoutKind::Movie, |s| s.layout)
    }

    /// BGM file for the active category, if any.
    pub fn bgm_path(&self) -> Option<&PathBuf> {
        self.style().and_then(|s| s.bgm.as_ref())
    }

    /// Duration for a transition kind in seconds.
    pub fn transition_duration(&self, kind: TransitionKind) -> f64 {
        match kind {
            TransitionKind::None => 0.0,
            TransitionKind::Crossfade => self.transitions.crossfade_secs,
            TransitionKind::CrossfadeSlow => self.transitions.crossfade_slow_secs,
            TransitionKind::CircleOpen => self.transitions.circle_open_secs,
            TransitionKind::PageTurn => self.transitions.page_turn_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_category_has_no_transition() {
        let config = RenderConfig {
            category: "nature".to_string(),
            ..RenderConfig::default()
        };
        assert_eq!(config.transition_kind(), TransitionKind::None);
        assert_eq!(config.layout_kind(), LayoutKind::Movie);
        assert!(config.bgm_path().is_none());
    }

    #[test]
    fn configured_category_resolves_style() {
        let mut config = RenderConfig::default();
        config.category = "storybook".to_string();
        config.categories.insert(
            "storybook".to_string(),
            CategoryStyle {
                transition: TransitionKind::CrossfadeSlow,
                layout: LayoutKind::Book,
                bgm: Some(PathBuf::from("music/calm.mp3")),
            },
        );
        assert_eq!(config.transition_kind(), TransitionKind::CrossfadeSlow);
        assert_eq!(config.layout_kind(), LayoutKind::Book);
        assert!((config.transition_duration(config.transition_kind()) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = RenderConfig::default();
        let json = serde_json::to_string(&config).expect("serialize");
        let back: RenderConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.output.fps, 24);
        assert!((back.audio.narration_padding_secs - 0.5).abs() < 1e-9);
        assert!((back.transitions.crossfade_secs - 0.8).abs() < 1e-9);
    }
}
