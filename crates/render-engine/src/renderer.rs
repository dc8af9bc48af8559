//! Timeline flattening and encoding.
//!
//! A single pass walks the output frame clock, composites every clip active
//! at that instant in placement order, and streams raw rgb24 frames into an
//! ffmpeg child alongside the mixed audio track. No intermediate video
//! files are written.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use image::RgbImage;
use tracing::{debug, info};

use storyreel_common::config::OutputConfig;
use storyreel_common::{StoryError, StoryResult};
use storyreel_motion_core::{AlphaMask, AudioTrack, Frame};

use crate::audio::write_wav;
use crate::layout::aspect_fill;
use crate::media::MediaTools;
use crate::timeline::Timeline;

pub struct Renderer {
    tools: MediaTools,
    output: OutputConfig,
}

impl Renderer {
    pub fn new(tools: MediaTools, output: OutputConfig) -> Self {
        Self { tools, output }
    }

    /// Flattened frame at absolute time `t`: active clips composited in
    /// placement order, later clips blended by their alpha.
    pub fn frame_at(&self, timeline: &Timeline, t: f64) -> Frame {
        let (width, height) = (self.output.width, self.output.height);
        let mut canvas = RgbImage::new(width, height);
        for placed in &timeline.clips {
            if t < placed.start || t >= placed.end() {
                continue;
            }
            let local = t - placed.start;
            let mut frame = placed.clip.sample(local);
            if frame.dimensions() != (width, height) {
                frame = aspect_fill(&frame, width, height);
            }
            blend(&mut canvas, &frame, placed.clip.alpha_at(local));
        }
        canvas
    }

    /// Encode the timeline and audio to `output_path`. Blocking; run it on
    /// a worker thread from async contexts.
    pub fn render(
        &self,
        timeline: &Timeline,
        audio: &AudioTrack,
        output_path: &Path,
    ) -> StoryResult<PathBuf> {
        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let fps = self.output.fps;
        let total_frames = (timeline.duration * fps as f64).ceil() as u64;
        if total_frames == 0 {
            return Err(StoryError::render("timeline flattens to zero frames"));
        }

        let scratch = tempfile::tempdir()
            .map_err(|e| StoryError::render(format!("failed to create scratch dir: {e}")))?;
        let wav_path = scratch.path().join("master.wav");
        write_wav(&wav_path, audio)?;

        info!(
            frames = total_frames,
            duration_secs = timeline.duration,
            output = %output_path.display(),
            "encoding timeline"
        );

        let size = format!("{}x{}", self.output.width, self.output.height);
        let mut child = Command::new(&self.tools.ffmpeg)
            .args(["-y", "-hide_banner", "-loglevel", "error"])
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-s", &size])
            .args(["-r", &fps.to_string(), "-i", "pipe:0"])
            .arg("-i")
            .arg(&wav_path)
            .args(["-c:v", "libx264", "-preset", "medium", "-pix_fmt", "yuv420p"])
            .args(["-c:a", "aac", "-b:a", "192k"])
            .args(["-movflags", "+faststart", "-shortest"])
            .arg(output_path)
            .stdin(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| StoryError::render(format!("failed to start ffmpeg: {e}")))?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| StoryError::render("failed to capture ffmpeg stderr"))?;
        // Drain stderr concurrently so ffmpeg never blocks on a full pipe.
        let stderr_task = std::thread::spawn(move || -> String {
            let mut output = String::new();
            let mut reader = std::io::BufReader::new(stderr);
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| StoryError::render("failed to capture ffmpeg stdin"))?;

        let report_every = (total_frames / 10).max(1);
        for index in 0..total_frames {
            let t = index as f64 / fps as f64;
            let frame = self.frame_at(timeline, t);
            stdin
                .write_all(frame.as_raw())
                .map_err(|e| StoryError::render(format!("failed writing frame {index}: {e}")))?;
            if index % report_every == 0 {
                debug!(
                    frame = index,
                    total = total_frames,
                    t_secs = t,
                    "render progress"
                );
            }
        }
        drop(stdin);

        let status = child
            .wait()
            .map_err(|e| StoryError::render(format!("failed to wait on ffmpeg: {e}")))?;
        let stderr_output = stderr_task
            .join()
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());
        if !status.success() {
            return Err(StoryError::render(format!(
                "ffmpeg encode failed (status {}): {}",
                status,
                stderr_output.trim()
            )));
        }

        info!(output = %output_path.display(), "encode finished");
        Ok(output_path.to_path_buf())
    }
}

/// Blend `top` over `canvas` using the given alpha.
fn blend(canvas: &mut Frame, top: &Frame, alpha: AlphaMask) {
    match alpha {
        AlphaMask::Uniform(a) => {
            let a = a.clamp(0.0, 1.0);
            if a >= 1.0 {
                canvas.clone_from(top);
                return;
            }
            if a <= 0.0 {
                return;
            }
            for (base, over) in canvas.pixels_mut().zip(top.pixels()) {
                for c in 0..3 {
                    base.0[c] =
                        (base.0[c] as f32 * (1.0 - a) + over.0[c] as f32 * a).round() as u8;
                }
            }
        }
        AlphaMask::Mask(mask) => {
            for ((base, over), m) in canvas.pixels_mut().zip(top.pixels()).zip(mask.pixels()) {
                let a = m.0[0] as f32 / 255.0;
                for c in 0..3 {
                    base.0[c] =
                        (base.0[c] as f32 * (1.0 - a) + over.0[c] as f32 * a).round() as u8;
                }
            }
        }
    }
}
