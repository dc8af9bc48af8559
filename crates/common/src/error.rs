//! Error types shared across StoryReel crates.

use std::path::PathBuf;

/// Top-level error type for StoryReel operations.
#[derive(Debug, thiserror::Error)]
pub enum StoryError {
    #[error("Asset error: {message}")]
    Asset { message: String },

    #[error("Camera motion error: {message}")]
    Camera { message: String },

    #[error("Depth estimation error: {message}")]
    Depth { message: String },

    #[error("Parallax error: {message}")]
    Parallax { message: String },

    #[error("Transition error: {message}")]
    Transition { message: String },

    #[error("Timeline error: {message}")]
    Timeline { message: String },

    #[error("Audio error: {message}")]
    Audio { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Fatal failure attributed to one scene, so the caller can identify
    /// which scene was responsible.
    #[error("Scene {scene_id} failed: {source}")]
    Scene {
        scene_id: u32,
        #[source]
        source: Box<StoryError>,
    },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using StoryError.
pub type StoryResult<T> = Result<T, StoryError>;

impl StoryError {
    pub fn asset(msg: impl Into<String>) -> Self {
        Self::Asset {
            message: msg.into(),
        }
    }

    pub fn camera(msg: impl Into<String>) -> Self {
        Self::Camera {
            message: msg.into(),
        }
    }

    pub fn depth(msg: impl Into<String>) -> Self {
        Self::Depth {
            message: msg.into(),
        }
    }

    pub fn parallax(msg: impl Into<String>) -> Self {
        Self::Parallax {
            message: msg.into(),
        }
    }

    pub fn transition(msg: impl Into<String>) -> Self {
        Self::Transition {
            message: msg.into(),
        }
    }

    pub fn timeline(msg: impl Into<String>) -> Self {
        Self::Timeline {
            message: msg.into(),
        }
    }

    pub fn audio(msg: impl Into<String>) -> Self {
        Self::Audio {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Attribute an error to the scene it occurred in.
    pub fn in_scene(self, scene_id: u32) -> Self {
        Self::Scene {
            scene_id,
            source: Box::new(self),
        }
    }
}
