//! Media probing and decoding through ffmpeg subprocesses.
//!
//! Raw samples travel over pipes: audio as s16le PCM, video as rgb24
//! frames. stderr is drained on its own thread so ffmpeg never blocks on a
//! full pipe.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::Deserialize;
use tracing::debug;

use storyreel_common::{StoryError, StoryResult};
use storyreel_motion_core::{AudioTrack, Frame};

/// Resolved ffmpeg/ffprobe binaries.
#[derive(Debug, Clone)]
pub struct MediaTools {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl MediaTools {
    /// Locate both binaries on PATH.
    pub fn locate() -> StoryResult<Self> {
        let ffmpeg = which::which("ffmpeg")
            .map_err(|_| StoryError::unsupported("ffmpeg not found in PATH"))?;
        let ffprobe = which::which("ffprobe")
            .map_err(|_| StoryError::unsupported("ffprobe not found in PATH"))?;
        debug!(ffmpeg = %ffmpeg.display(), ffprobe = %ffprobe.display(), "media tools located");
        Ok(Self { ffmpeg, ffprobe })
    }

    /// Container duration in seconds.
    pub fn probe_duration(&self, path: &Path) -> StoryResult<f64> {
        if !path.exists() {
            return Err(StoryError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "json",
            ])
            .arg(path)
            .output()
            .map_err(|e| StoryError::render(format!("failed to start ffprobe: {e}")))?;
        if !output.status.success() {
            return Err(StoryError::render(format!(
                "ffprobe failed for {}: {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        #[derive(Deserialize)]
        struct ProbeFormat {
            duration: Option<String>,
        }
        #[derive(Deserialize)]
        struct ProbeOutput {
            format: ProbeFormat,
        }

        let probe: ProbeOutput = serde_json::from_slice(&output.stdout)?;
        probe
            .format
            .duration
            .as_deref()
            .and_then(|d| d.parse::<f64>().ok())
            .ok_or_else(|| {
                StoryError::render(format!("no duration reported for {}", path.display()))
            })
    }

    /// Pixel dimensions of the first video stream.
    pub fn probe_dimensions(&self, path: &Path) -> StoryResult<(u32, u32)> {
        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height",
                "-of",
                "json",
            ])
            .arg(path)
            .output()
            .map_err(|e| StoryError::render(format!("failed to start ffprobe: {e}")))?;
        if !output.status.success() {
            return Err(StoryError::render(format!(
                "ffprobe failed for {}: {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        #[derive(Deserialize)]
        struct ProbeStream {
            width: Option<u32>,
            height: Option<u32>,
        }
        #[derive(Deserialize)]
        struct ProbeOutput {
            #[serde(default)]
            streams: Vec<ProbeStream>,
        }

        let probe: ProbeOutput = serde_json::from_slice(&output.stdout)?;
        probe
            .streams
            .first()
            .and_then(|s| Some((s.width?, s.height?)))
            .ok_or_else(|| {
                StoryError::render(format!("no video stream in {}", path.display()))
            })
    }

    /// Decode a file's audio into interleaved stereo f32 at `sample_rate`.
    pub fn decode_audio(&self, path: &Path, sample_rate: u32) -> StoryResult<AudioTrack> {
        if !path.exists() {
            return Err(StoryError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let raw = self.run_decode(
            Command::new(&self.ffmpeg)
                .args(["-v", "error", "-i"])
                .arg(path)
                .args([
                    "-f",
                    "s16le",
                    "-acodec",
                    "pcm_s16le",
                    "-ac",
                    "2",
                    "-ar",
                    &sample_rate.to_string(),
                    "pipe:1",
                ]),
            path,
        )?;

        let samples = raw
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / i16::MAX as f32)
            .collect();
        Ok(AudioTrack {
            sample_rate,
            samples,
        })
    }

    /// Decode a video into rgb24 frames at `fps`, scaled and cropped to
    /// cover `width` x `height`.
    pub fn decode_video_frames(
        &self,
        path: &Path,
        fps: u32,
        width: u32,
        height: u32,
    ) -> StoryResult<Vec<Frame>> {
        if !path.exists() {
            return Err(StoryError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let filter = format!(
            "fps={fps},scale={width}:{height}:force_original_aspect_ratio=increase,crop={width}:{height}"
        );
        let raw = self.run_decode(
            Command::new(&self.ffmpeg)
                .args(["-v", "error", "-i"])
                .arg(path)
                .args(["-vf", &filter, "-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"]),
            path,
        )?;

        let frame_len = (width * height * 3) as usize;
        if frame_len == 0 || raw.len() < frame_len {
            return Err(StoryError::render(format!(
                "decoded no frames from {}",
                path.display()
            )));
        }
        let frames = raw
            .chunks_exact(frame_len)
            .filter_map(|chunk| Frame::from_raw(width, height, chunk.to_vec()))
            .collect::<Vec<_>>();
        debug!(count = frames.len(), source = %path.display(), "decoded video frames");
        Ok(frames)
    }

    fn run_decode(&self, cmd: &mut Command, path: &Path) -> StoryResult<Vec<u8>> {
        let mut child = cmd
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| StoryError::render(format!("failed to start ffmpeg: {e}")))?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| StoryError::render("failed to capture ffmpeg stderr"))?;
        let stderr_task = std::thread::spawn(move || -> String {
            let mut output = String::new();
            let mut reader = std::io::BufReader::new(stderr);
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let mut raw = Vec::new();
        child
            .stdout
            .take()
            .ok_or_else(|| StoryError::render("failed to capture ffmpeg stdout"))?
            .read_to_end(&mut raw)
            .map_err(|e| StoryError::render(format!("failed reading ffmpeg output: {e}")))?;

        let status = child
            .wait()
            .map_err(|e| StoryError::render(format!("failed to wait on ffmpeg: {e}")))?;
        let stderr_output = stderr_task
            .join()
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());
        if !status.success() {
            return Err(StoryError::render(format!(
                "ffmpeg decode failed for {} (status {}): {}",
                path.display(),
                status,
                stderr_output.trim()
            )));
        }
        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_reported_before_spawning() {
        let tools = MediaTools {
            ffmpeg: PathBuf::from("/nonexistent/ffmpeg"),
            ffprobe: PathBuf::from("/nonexistent/ffprobe"),
        };
        let missing = Path::new("/nonexistent/story/scene_1.mp3");
        assert!(matches!(
            tools.probe_duration(missing),
            Err(StoryError::FileNotFound { .. })
        ));
        assert!(matches!(
            tools.decode_audio(missing, 44_100),
            Err(StoryError::FileNotFound { .. })
        ));
        assert!(matches!(
            tools.decode_video_frames(missing, 24, 64, 64),
            Err(StoryError::FileNotFound { .. })
        ));
    }
}
