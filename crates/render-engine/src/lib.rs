//! StoryReel Render Engine
//!
//! Turns a list of scenes plus a configuration into one encoded video:
//! - **Timeline:** segment placement with signed overlap accounting
//! - **Transitions:** crossfade, circle-open, and page-turn construction
//! - **Layout:** scene composition for the movie and book layouts
//! - **Audio:** narration padding, BGM looping/mixing, and the intro dub fit
//! - **Media:** ffprobe/ffmpeg subprocess I/O
//! - **Assemble:** the end-to-end pipeline entry point

pub mod assemble;
pub mod audio;
pub mod layout;
pub mod media;
pub mod renderer;
pub mod timeline;
pub mod transition;

pub use assemble::{assemble, Assembler};
pub use timeline::{PlacedClip, Timeline, TimelineBuilder};
