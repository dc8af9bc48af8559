//! StoryReel Motion Core
//!
//! Per-frame numeric synthesis over still images:
//! - **Clip:** a bounded-duration visual signal modeled as a pure `t -> frame`
//!   function with all parameters captured by value at construction time
//! - **Camera:** the Ken Burns crop/zoom/pan synthesizer
//! - **Depth/Parallax:** depth maps, the estimator seam, and depth-weighted
//!   pixel displacement
//!
//! Nothing in this crate mutates shared state across frames; the renderer
//! pulls frames on demand.

pub mod camera;
pub mod clip;
pub mod depth;
pub mod easing;
pub mod parallax;

pub use camera::*;
pub use clip::*;
pub use depth::*;
pub use parallax::*;
