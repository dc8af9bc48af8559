//! Transition specification.
//!
//! The `overlap_sign` is the single invariant both duration bookkeeping and
//! concatenation policy key off of: negative for overlap-style transitions
//! (the incoming segment starts `|overlap_sign|` seconds before the running
//! end time) and zero for insert-style (page turn) and no transition.

use serde::{Deserialize, Serialize};
use storyreel_common::config::{RenderConfig, TransitionKind};

/// A resolved transition between two adjacent timeline segments.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionSpec {
    pub kind: TransitionKind,
    /// Effect duration in seconds.
    pub duration: f64,
    /// Signed concatenation padding in seconds (`-duration` or `0.0`).
    pub overlap_sign: f64,
}

impl TransitionSpec {
    /// No transition: a plain back-to-back append.
    pub const NONE: Self = Self {
        kind: TransitionKind::None,
        duration: 0.0,
        overlap_sign: 0.0,
    };

    /// Resolve a kind and duration into a spec.
    ///
    /// A non-positive duration degenerates to [`TransitionSpec::NONE`]
    /// rather than an error.
    pub fn new(kind: TransitionKind, duration: f64) -> Self {
        if duration <= 0.0 || kind == TransitionKind::None {
            return Self::NONE;
        }
        let overlap_sign = match kind {
            TransitionKind::Crossfade
            | TransitionKind::CrossfadeSlow
            | TransitionKind::CircleOpen => -duration,
            TransitionKind::PageTurn | TransitionKind::None => 0.0,
        };
        Self {
            kind,
            duration,
            overlap_sign,
        }
    }

    /// Resolve the active category's transition from the configuration.
    pub fn from_config(config: &RenderConfig) -> Self {
        let kind = config.transition_kind();
        Self::new(kind, config.transition_duration(kind))
    }

    /// Overlap-style: the incoming segment overlaps its predecessor.
    pub fn is_overlap(&self) -> bool {
        self.overlap_sign < 0.0
    }

    /// Insert-style: the transition becomes its own timeline member.
    pub fn is_insert(&self) -> bool {
        self.kind == TransitionKind::PageTurn
    }
}
