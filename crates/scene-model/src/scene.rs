//! Scene and camera-action types.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Zoom component of a camera action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoomDirection {
    In,
    Out,
}

/// Pan component of a camera action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanDirection {
    Left,
    Right,
    Up,
    Down,
}

/// Camera movement applied to a scene's still image.
///
/// Wire tags are snake_case strings: `"zoom_in"`, `"pan_left"`, `"static"`,
/// and compound `"zoom_in_pan_left"` style tags. An unrecognized tag in a
/// manifest degrades to `Static` instead of failing the whole load; strict
/// parsing is available through [`FromStr`]. A scene with no tag at all
/// gets [`Scene::DEFAULT_ACTION`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum CameraAction {
    ZoomIn,
    ZoomOut,
    Pan(PanDirection),
    Static,
    Compound {
        zoom: ZoomDirection,
        pan: PanDirection,
    },
}

/// Error returned when a camera tag does not match any known action.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown camera action tag: {tag}")]
pub struct UnknownCameraAction {
    pub tag: String,
}

impl FromStr for CameraAction {
    type Err = UnknownCameraAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let pan = |tag: &str| match tag {
            "left" => Some(PanDirection::Left),
            "right" => Some(PanDirection::Right),
            "up" => Some(PanDirection::Up),
            "down" => Some(PanDirection::Down),
            _ => None,
        };

        match s {
            "zoom_in" => return Ok(Self::ZoomIn),
            "zoom_out" => return Ok(Self::ZoomOut),
            "static" => return Ok(Self::Static),
            _ => {}
        }
        if let Some(direction) = s.strip_prefix("pan_").and_then(pan) {
            return Ok(Self::Pan(direction));
        }
        // Compound "<zoom>_<pan>" tags, e.g. "zoom_in_pan_right".
        for (prefix, zoom) in [
            ("zoom_in_pan_", ZoomDirection::In),
            ("zoom_out_pan_", ZoomDirection::Out),
        ] {
            if let Some(direction) = s.strip_prefix(prefix).and_then(pan) {
                return Ok(Self::Compound {
                    zoom,
                    pan: direction,
                });
            }
        }
        Err(UnknownCameraAction { tag: s.to_string() })
    }
}

impl fmt::Display for CameraAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pan = |p: PanDirection| match p {
            PanDirection::Left => "left",
            PanDirection::Right => "right",
            PanDirection::Up => "up",
            PanDirection::Down => "down",
        };
        match self {
            Self::ZoomIn => write!(f, "zoom_in"),
            Self::ZoomOut => write!(f, "zoom_out"),
            Self::Static => write!(f, "static"),
            Self::Pan(p) => write!(f, "pan_{}", pan(*p)),
            Self::Compound { zoom, pan: p } => {
                let z = match zoom {
                    ZoomDirection::In => "zoom_in",
                    ZoomDirection::Out => "zoom_out",
                };
                write!(f, "{}_pan_{}", z, pan(*p))
            }
        }
    }
}

impl<'de> Deserialize<'de> for CameraAction {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let tag = String::deserialize(deserializer)?;
        Ok(tag.parse().unwrap_or(Self::Static))
    }
}

impl From<CameraAction> for String {
    fn from(value: CameraAction) -> Self {
        value.to_string()
    }
}

impl CameraAction {
    /// Pure pan actions are the only ones eligible for parallax rendering.
    pub fn is_pan(&self) -> bool {
        matches!(self, Self::Pan(_))
    }

    /// Pan component, if the action has one.
    pub fn pan_direction(&self) -> Option<PanDirection> {
        match self {
            Self::Pan(p) | Self::Compound { pan: p, .. } => Some(*p),
            _ => None,
        }
    }
}

/// One narrated beat of the story.
///
/// Created by upstream generation steps with all asset paths already
/// materialized on disk; the compositing engine only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    /// Scene identifier, carried into error reports.
    pub id: u32,

    /// Narration audio for this scene.
    pub narration_audio: PathBuf,

    /// Still image used when no motion clip is available.
    #[serde(default)]
    pub image: Option<PathBuf>,

    /// Pre-generated motion clip; preferred over the still when present.
    #[serde(default)]
    pub motion_video: Option<PathBuf>,

    /// Camera movement tag. `None` falls back to [`Scene::DEFAULT_ACTION`].
    #[serde(default)]
    pub camera_action: Option<CameraAction>,

    /// Cached depth map for this scene's image, if one was precomputed.
    #[serde(default)]
    pub depth_cache: Option<PathBuf>,

    /// Subtitle text shown in the book layout.
    #[serde(default)]
    pub subtitle: String,

    /// Secondary subtitle line for bilingual rendering.
    #[serde(default)]
    pub subtitle_secondary: Option<String>,
}

impl Scene {
    /// Camera action used when a scene does not carry one.
    pub const DEFAULT_ACTION: CameraAction = CameraAction::ZoomIn;

    /// The camera action to render, with the default applied.
    pub fn resolved_action(&self) -> CameraAction {
        self.camera_action.unwrap_or(Self::DEFAULT_ACTION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_tags_round_trip() {
        for tag in [
            "zoom_in",
            "zoom_out",
            "pan_left",
            "pan_right",
            "pan_up",
            "pan_down",
            "static",
            "zoom_in_pan_left",
            "zoom_out_pan_down",
        ] {
            let action: CameraAction = tag.parse().expect(tag);
            assert_eq!(action.to_string(), tag);
        }
    }

    #[test]
    fn unknown_tag_is_a_parse_error() {
        let err = "dolly_zoom".parse::<CameraAction>().unwrap_err();
        assert_eq!(err.tag, "dolly_zoom");
    }

    #[test]
    fn unknown_tag_deserializes_to_static() {
        let action: CameraAction = serde_json::from_str("\"dolly_zoom\"").unwrap();
        assert_eq!(action, CameraAction::Static);
    }

    #[test]
    fn only_pure_pans_are_parallax_eligible() {
        assert!(CameraAction::Pan(PanDirection::Right).is_pan());
        assert!(!CameraAction::ZoomIn.is_pan());
        assert!(!CameraAction::Compound {
            zoom: ZoomDirection::In,
            pan: PanDirection::Left,
        }
        .is_pan());
    }

    #[test]
    fn scene_without_action_resolves_default() {
        let scene = Scene {
            id: 1,
            narration_audio: PathBuf::from("s1.mp3"),
            image: Some(PathBuf::from("s1.png")),
            motion_video: None,
            camera_action: None,
            depth_cache: None,
            subtitle: String::new(),
            subtitle_secondary: None,
        };
        assert_eq!(scene.resolved_action(), CameraAction::ZoomIn);
    }
}
