//! On-disk script manifest.
//!
//! Upstream generation steps write this manifest next to the generated
//! assets; the engine reads it to drive assembly.

use std::path::Path;

use serde::{Deserialize, Serialize};
use storyreel_common::{StoryError, StoryResult};

use crate::scene::Scene;

/// A generated script plus the scenes it produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptManifest {
    /// Story topic, also used as the cover title.
    pub topic: String,

    /// Cover subtitle line.
    #[serde(default)]
    pub subtitle: String,

    /// One-line plot summary.
    #[serde(default)]
    pub summary: String,

    /// Spoken hook played before the story starts, when configured.
    #[serde(default)]
    pub intro_hook: String,

    pub scenes: Vec<Scene>,
}

impl ScriptManifest {
    /// Read a manifest from a JSON file.
    pub fn from_json(path: &Path) -> StoryResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StoryError::asset(format!("read script manifest {}: {e}", path.display()))
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write the manifest as pretty JSON.
    pub fn to_json(&self, path: &Path) -> StoryResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn manifest_round_trips() {
        let manifest = ScriptManifest {
            topic: "The Lantern Fox".to_string(),
            subtitle: "a bedtime story".to_string(),
            summary: String::new(),
            intro_hook: String::new(),
            scenes: vec![Scene {
                id: 1,
                narration_audio: PathBuf::from("scene_1.mp3"),
                image: Some(PathBuf::from("scene_1.png")),
                motion_video: None,
                camera_action: Some("pan_right".parse().unwrap()),
                depth_cache: None,
                subtitle: "Once upon a time".to_string(),
                subtitle_secondary: None,
            }],
        };
        let json = serde_json::to_string(&manifest).expect("serialize");
        let back: ScriptManifest = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.topic, "The Lantern Fox");
        assert_eq!(back.scenes.len(), 1);
        assert_eq!(
            back.scenes[0].camera_action.unwrap().to_string(),
            "pan_right"
        );
    }
}
