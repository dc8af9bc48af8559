//! Timeline placement and overlap accounting.
//!
//! Segments are placed on an absolute time axis. An overlap transition pulls
//! the incoming segment's start backwards by the transition duration, so the
//! finished timeline length is the sum of segment durations minus the sum of
//! overlaps. Inserted transitions (page turn) and music-free segments are
//! butt-joined.

use storyreel_common::{StoryError, StoryResult};
use storyreel_motion_core::Clip;
use storyreel_scene_model::TransitionSpec;
use tracing::debug;

/// A clip pinned to an absolute start time.
#[derive(Debug)]
pub struct PlacedClip {
    pub clip: Clip,
    pub start: f64,
}

impl PlacedClip {
    pub fn end(&self) -> f64 {
        self.start + self.clip.duration()
    }
}

/// A finalized timeline ready for flattening.
#[derive(Debug)]
pub struct Timeline {
    pub clips: Vec<PlacedClip>,
    pub duration: f64,
    /// Time at which background music starts; music-free lead segments
    /// (intro, cover) push it forward.
    pub bgm_start_offset: f64,
}

/// Accumulates segments into a [`Timeline`].
///
/// The first segment always lands at zero regardless of its transition; a
/// transition needs a predecessor to blend against.
#[derive(Debug, Default)]
pub struct TimelineBuilder {
    clips: Vec<PlacedClip>,
    end: f64,
    bgm_start_offset: f64,
}

impl TimelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Running end time of the placed content.
    pub fn end(&self) -> f64 {
        self.end
    }

    /// Place a story segment. `spec.overlap_sign` pulls the start backwards
    /// for overlap transitions; the pull is clamped so a segment never
    /// starts before its predecessor.
    pub fn add_segment(&mut self, clip: Clip, spec: &TransitionSpec) -> StoryResult<()> {
        let duration = clip.duration();
        if !duration.is_finite() || duration <= 0.0 {
            return Err(StoryError::timeline(format!(
                "segment duration must be positive and finite, got {duration}"
            )));
        }

        let start = if self.clips.is_empty() {
            0.0
        } else {
            let prev_start = self.clips[self.clips.len() - 1].start;
            (self.end + spec.overlap_sign).clamp(prev_start, self.end)
        };
        debug!(start, duration, kind = ?spec.kind, "placing segment");
        self.end = self.end.max(start + duration);
        self.clips.push(PlacedClip { clip, start });
        Ok(())
    }

    /// Place a lead segment that background music must not play under.
    /// Butt-joined, and the BGM start offset advances past it.
    pub fn add_music_free_segment(&mut self, clip: Clip) -> StoryResult<()> {
        let duration = clip.duration();
        if !duration.is_finite() || duration <= 0.0 {
            return Err(StoryError::timeline(format!(
                "segment duration must be positive and finite, got {duration}"
            )));
        }
        let start = self.end;
        self.end = start + duration;
        self.bgm_start_offset = self.end;
        self.clips.push(PlacedClip { clip, start });
        Ok(())
    }

    /// Insert a transition clip of its own (page turn). Butt-joined.
    pub fn add_insert(&mut self, clip: Clip) -> StoryResult<()> {
        let duration = clip.duration();
        if !duration.is_finite() || duration <= 0.0 {
            return Err(StoryError::timeline(format!(
                "insert duration must be positive and finite, got {duration}"
            )));
        }
        let start = self.end;
        self.end = start + duration;
        self.clips.push(PlacedClip { clip, start });
        Ok(())
    }

    /// Finalize. At least one segment must have been placed.
    pub fn build(self) -> StoryResult<Timeline> {
        if self.clips.is_empty() {
            return Err(StoryError::timeline("no segments were placed"));
        }
        Ok(Timeline {
            duration: self.end,
            bgm_start_offset: self.bgm_start_offset,
            clips: self.clips,
        })
    }
}
