//! StoryReel Scene Model
//!
//! Defines the data contracts the compositing engine consumes:
//! - **Scene:** one narrated beat (image or motion clip + audio + camera tag)
//! - **Transitions:** the signed-overlap transition specification
//! - **Script:** the on-disk manifest produced by upstream generation steps
//!
//! Scenes are immutable once handed to the engine; the engine only reads
//! them. Optional fields are explicit `Option<T>` with defaults declared
//! here, never looked up dynamically.

pub mod scene;
pub mod script;
pub mod transition;

pub use scene::*;
pub use script::*;
pub use transition::*;
