//! The clip model: a bounded-duration visual signal plus attached audio.
//!
//! A clip's frame producer is a pure function of time with every parameter
//! captured by value at construction, so clips can be sampled repeatedly in
//! any order. Clips are owned exclusively by the segment that created them.

use std::sync::Arc;

use image::{GrayImage, RgbImage};

/// A single video frame.
pub type Frame = RgbImage;

/// Pure frame producer: `t` in seconds -> frame.
pub type FrameFn = Arc<dyn Fn(f64) -> Frame + Send + Sync>;

/// Per-frame opacity of a clip against whatever is beneath it.
#[derive(Clone)]
pub enum AlphaMask {
    /// One opacity for the whole frame (crossfade ramp).
    Uniform(f32),
    /// Per-pixel opacity, 0 = transparent, 255 = opaque (circle open).
    Mask(GrayImage),
}

/// Pure alpha producer: `t` in seconds -> mask.
pub type AlphaFn = Arc<dyn Fn(f64) -> AlphaMask + Send + Sync>;

/// Interleaved-stereo PCM audio attached to a clip.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioTrack {
    pub sample_rate: u32,
    /// Interleaved stereo samples in `[-1, 1]`.
    pub samples: Vec<f32>,
}

impl AudioTrack {
    pub fn silence(duration: f64, sample_rate: u32) -> Self {
        let frames = (duration.max(0.0) * sample_rate as f64).round() as usize;
        Self {
            sample_rate,
            samples: vec![0.0; frames * 2],
        }
    }

    pub fn duration_secs(&self) -> f64 {
        (self.samples.len() / 2) as f64 / self.sample_rate as f64
    }

    /// Pad with trailing silence up to `duration`. Never shortens.
    pub fn pad_to(&mut self, duration: f64) {
        let target = (duration.max(0.0) * self.sample_rate as f64).round() as usize * 2;
        if target > self.samples.len() {
            self.samples.resize(target, 0.0);
        }
    }

    /// Hard-trim to `duration`. Never lengthens.
    pub fn trim_to(&mut self, duration: f64) {
        let target = (duration.max(0.0) * self.sample_rate as f64).round() as usize * 2;
        if target < self.samples.len() {
            self.samples.truncate(target);
        }
    }

    /// Prepend `lead` seconds of silence.
    pub fn with_lead_in(mut self, lead: f64) -> Self {
        let pad = (lead.max(0.0) * self.sample_rate as f64).round() as usize * 2;
        let mut samples = vec![0.0; pad];
        samples.append(&mut self.samples);
        self.samples = samples;
        self
    }
}

/// A bounded-duration visual signal with optional audio and alpha.
#[derive(Clone)]
pub struct Clip {
    width: u32,
    height: u32,
    duration: f64,
    frame_fn: FrameFn,
    /// Opacity against the segment beneath during overlap; `None` = opaque.
    pub alpha: Option<AlphaFn>,
    pub audio: Option<AudioTrack>,
}

impl std::fmt::Debug for Clip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clip")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("duration", &self.duration)
            .field("has_alpha", &self.alpha.is_some())
            .field("has_audio", &self.audio.is_some())
            .finish()
    }
}

impl Clip {
    pub fn new(width: u32, height: u32, duration: f64, frame_fn: FrameFn) -> Self {
        Self {
            width,
            height,
            duration,
            frame_fn,
            alpha: None,
            audio: None,
        }
    }

    /// A static clip showing one image for the whole duration.
    pub fn from_image(image: Frame, duration: f64) -> Self {
        let (width, height) = image.dimensions();
        let image = Arc::new(image);
        Self::new(
            width,
            height,
            duration,
            Arc::new(move |_t| (*image).clone()),
        )
    }

    /// A clip over pre-decoded frames at a fixed rate, looped to `duration`
    /// when the sequence is shorter.
    pub fn from_frames(frames: Vec<Frame>, fps: u32, duration: f64) -> Option<Self> {
        let first = frames.first()?;
        let (width, height) = first.dimensions();
        let frames = Arc::new(frames);
        let count = frames.len();
        Some(Self::new(
            width,
            height,
            duration,
            Arc::new(move |t| {
                let index = (t.max(0.0) * fps as f64).floor() as usize % count;
                frames[index].clone()
            }),
        ))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Produce the frame at `t`, clamped into the clip's time range.
    pub fn sample(&self, t: f64) -> Frame {
        let t = t.clamp(0.0, self.duration);
        (self.frame_fn)(t)
    }

    /// Opacity at `t`; clips without an alpha function are opaque.
    pub fn alpha_at(&self, t: f64) -> AlphaMask {
        match &self.alpha {
            Some(alpha) => alpha(t),
            None => AlphaMask::Uniform(1.0),
        }
    }

    pub fn with_audio(mut self, audio: AudioTrack) -> Self {
        self.audio = Some(audio);
        self
    }

    pub fn with_alpha(mut self, alpha: AlphaFn) -> Self {
        self.alpha = Some(alpha);
        self
    }

    /// Extend the clip by holding its final frame for `extra` seconds.
    pub fn extended_with_freeze(mut self, extra: f64) -> Self {
        if extra <= 0.0 {
            return self;
        }
        let end = self.duration;
        let inner = Arc::clone(&self.frame_fn);
        self.duration += extra;
        // Hold just inside the end so frame sequences do not wrap back
        // to their first frame.
        let hold = (end - 1e-4).max(0.0);
        self.frame_fn = Arc::new(move |t| if t < end { inner(t) } else { inner(hold) });
        self
    }

    /// Apply a fade from/to black at the clip boundaries.
    pub fn with_black_fades(mut self, fade_in: f64, fade_out: f64) -> Self {
        let inner = Arc::clone(&self.frame_fn);
        let duration = self.duration;
        self.frame_fn = Arc::new(move |t| {
            let mut gain = 1.0f64;
            if fade_in > 0.0 && t < fade_in {
                gain = gain.min(t / fade_in);
            }
            if fade_out > 0.0 && t > duration - fade_out {
                gain = gain.min((duration - t) / fade_out);
            }
            let mut frame = inner(t);
            if gain < 1.0 {
                let gain = gain.clamp(0.0, 1.0) as f32;
                for pixel in frame.pixels_mut() {
                    for channel in pixel.0.iter_mut() {
                        *channel = (*channel as f32 * gain) as u8;
                    }
                }
            }
            frame
        });
        self
    }
}
