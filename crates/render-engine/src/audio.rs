//! Audio assembly: narration placement, background music, the cover track,
//! and the intro dub fit.
//!
//! Sync policy: narration audio is never stretched. Visuals are padded to
//! the audio, silence is appended to the audio, and the BGM is looped and
//! trimmed to the exact remaining timeline length.

use storyreel_common::config::AudioConfig;
use storyreel_common::{StoryError, StoryResult};
use storyreel_motion_core::AudioTrack;
use tracing::{debug, info, warn};

use crate::timeline::Timeline;

/// Safety margin multiplier on the resynthesis rate so rounding in the
/// synthesizer cannot leave the retry a few milliseconds over.
const RATE_MARGIN: f64 = 1.01;

/// Longest freeze-frame extension granted to an overflowing intro dub;
/// anything beyond it is trimmed off the dub tail.
const MAX_FREEZE_EXTENSION_SECS: f64 = 2.5;

/// Synthesizes speech at a given rate multiplier (1.0 = natural).
pub trait DubSynthesizer: Send + Sync {
    fn synthesize(&self, text: &str, rate: f64) -> StoryResult<AudioTrack>;
}

/// How an intro dub was made to fit its video.
#[derive(Debug)]
pub enum IntroFitOutcome {
    /// Natural-rate dub already fits.
    Natural(AudioTrack),
    /// Resynthesized faster; `rate` is the multiplier used.
    SpedUp { track: AudioTrack, rate: f64 },
    /// Still over after the bounded retry; the video gains a freeze-frame
    /// tail of `extend_secs` and the dub is trimmed to match.
    Extended { track: AudioTrack, extend_secs: f64 },
}

impl IntroFitOutcome {
    pub fn track(&self) -> &AudioTrack {
        match self {
            Self::Natural(track) => track,
            Self::SpedUp { track, .. } => track,
            Self::Extended { track, .. } => track,
        }
    }

    /// Extra seconds the intro video must hold its last frame.
    pub fn extend_secs(&self) -> f64 {
        match self {
            Self::Extended { extend_secs, .. } => *extend_secs,
            _ => 0.0,
        }
    }
}

/// Fits a synthesized dub into a fixed-length intro video with one bounded
/// resynthesis retry.
#[derive(Debug, Clone)]
pub struct IntroFit {
    max_speedup: f64,
}

impl IntroFit {
    pub fn new(max_speedup: f64) -> Self {
        Self {
            max_speedup: max_speedup.max(1.0),
        }
    }

    /// Needed speech-rate multiplier for a dub of `dub_secs` to fit
    /// `video_secs`, with margin, clamped to the configured maximum.
    pub fn retry_rate(&self, dub_secs: f64, video_secs: f64) -> f64 {
        ((dub_secs / video_secs) * RATE_MARGIN).clamp(1.0, self.max_speedup)
    }

    pub fn fit(
        &self,
        synthesizer: &dyn DubSynthesizer,
        text: &str,
        video_secs: f64,
    ) -> StoryResult<IntroFitOutcome> {
        if video_secs <= 0.0 {
            return Err(StoryError::audio("intro video duration must be positive"));
        }

        let natural = synthesizer.synthesize(text, 1.0)?;
        let natural_secs = natural.duration_secs();
        if natural_secs <= video_secs {
            debug!(dub_secs = natural_secs, video_secs, "intro dub fits at natural rate");
            return Ok(IntroFitOutcome::Natural(natural));
        }

        let rate = self.retry_rate(natural_secs, video_secs);
        info!(
            dub_secs = natural_secs,
            video_secs, rate, "intro dub overflows, resynthesizing faster"
        );
        let retried = synthesizer.synthesize(text, rate)?;
        let retried_secs = retried.duration_secs();
        if retried_secs <= video_secs {
            return Ok(IntroFitOutcome::SpedUp {
                track: retried,
                rate,
            });
        }

        // Terminal: hold the last video frame instead of retrying again.
        let overflow = retried_secs - video_secs;
        let extend_secs = overflow.min(MAX_FREEZE_EXTENSION_SECS);
        let mut track = retried;
        if overflow > extend_secs {
            warn!(
                overflow,
                extend_secs, "intro dub exceeds freeze-frame allowance, trimming tail"
            );
            track.trim_to(video_secs + extend_secs);
        }
        Ok(IntroFitOutcome::Extended { track, extend_secs })
    }
}

/// Builds the master audio track for a finalized timeline.
#[derive(Debug, Clone)]
pub struct AudioSyncMixer {
    config: AudioConfig,
}

impl AudioSyncMixer {
    pub fn new(config: AudioConfig) -> Self {
        Self { config }
    }

    /// Mix every placed clip's audio plus the looped background music into
    /// one track the exact length of the timeline.
    pub fn mix_timeline(&self, timeline: &Timeline, bgm: Option<&AudioTrack>) -> AudioTrack {
        let sample_rate = self.config.sample_rate;
        let mut master = AudioTrack::silence(timeline.duration, sample_rate);

        for placed in &timeline.clips {
            if let Some(audio) = &placed.clip.audio {
                let audio = resample_to(audio, sample_rate);
                mix_into(&mut master, &audio, placed.start, 1.0);
            }
        }

        if let Some(bgm) = bgm {
            let span = timeline.duration - timeline.bgm_start_offset;
            if span > 0.0 {
                let bgm = resample_to(bgm, sample_rate);
                let mut bed = loop_to_length(&bgm, span);
                apply_fade_out(&mut bed, self.config.bgm_fade_out_secs);
                mix_into(
                    &mut master,
                    &bed,
                    timeline.bgm_start_offset,
                    self.config.bgm_volume,
                );
                debug!(
                    start = timeline.bgm_start_offset,
                    span, volume = self.config.bgm_volume, "background music mixed"
                );
            }
        }

        clamp_track(&mut master);
        master
    }

    /// Narration track for one scene: the spoken audio plus trailing
    /// breathing-room silence. The result's duration is the segment's
    /// base duration.
    pub fn narration_with_padding(&self, narration: AudioTrack) -> AudioTrack {
        let mut track = resample_to(&narration, self.config.sample_rate);
        let target = track.duration_secs() + self.config.narration_padding_secs;
        track.pad_to(target);
        track
    }

    /// Cover audio: silence, then the optional title narration, then more
    /// silence, never shorter than the configured minimum.
    pub fn cover_track(&self, title_audio: Option<AudioTrack>) -> AudioTrack {
        let sample_rate = self.config.sample_rate;
        let mut track = match title_audio {
            Some(audio) => {
                resample_to(&audio, sample_rate).with_lead_in(self.config.cover_lead_in_secs)
            }
            None => AudioTrack::silence(self.config.cover_lead_in_secs, sample_rate),
        };
        let target = (track.duration_secs() + self.config.cover_lead_out_secs)
            .max(self.config.cover_min_secs);
        track.pad_to(target);
        track
    }
}

/// Repeat `track` until it covers exactly `duration` seconds.
pub fn loop_to_length(track: &AudioTrack, duration: f64) -> AudioTrack {
    let target = (duration.max(0.0) * track.sample_rate as f64).round() as usize * 2;
    let mut samples = Vec::with_capacity(target);
    if track.samples.is_empty() {
        samples.resize(target, 0.0);
    } else {
        while samples.len() < target {
            let remaining = target - samples.len();
            let take = remaining.min(track.samples.len());
            samples.extend_from_slice(&track.samples[..take]);
        }
    }
    AudioTrack {
        sample_rate: track.sample_rate,
        samples,
    }
}

/// Linear fade to silence over the last `fade_secs` of the track.
pub fn apply_fade_out(track: &mut AudioTrack, fade_secs: f64) {
    let total_frames = track.samples.len() / 2;
    let fade_frames = ((fade_secs.max(0.0) * track.sample_rate as f64).round() as usize)
        .min(total_frames);
    if fade_frames == 0 {
        return;
    }
    let start = total_frames - fade_frames;
    for frame in 0..fade_frames {
        let gain = 1.0 - (frame as f32 + 1.0) / fade_frames as f32;
        let idx = (start + frame) * 2;
        track.samples[idx] *= gain;
        track.samples[idx + 1] *= gain;
    }
}

/// Add `source` into `master` starting at `start_secs`, scaled by `gain`.
/// Samples past the master's end are dropped.
pub fn mix_into(master: &mut AudioTrack, source: &AudioTrack, start_secs: f64, gain: f32) {
    let offset = (start_secs.max(0.0) * master.sample_rate as f64).round() as usize * 2;
    for (i, sample) in source.samples.iter().enumerate() {
        let Some(slot) = master.samples.get_mut(offset + i) else {
            break;
        };
        *slot += sample * gain;
    }
}

fn clamp_track(track: &mut AudioTrack) {
    for sample in &mut track.samples {
        *sample = sample.clamp(-1.0, 1.0);
    }
}

/// Nearest-sample resample. Identity when rates already match.
pub fn resample_to(track: &AudioTrack, sample_rate: u32) -> AudioTrack {
    if track.sample_rate == sample_rate {
        return track.clone();
    }
    let src_frames = track.samples.len() / 2;
    let dst_frames =
        (src_frames as f64 * sample_rate as f64 / track.sample_rate as f64).round() as usize;
    let mut samples = Vec::with_capacity(dst_frames * 2);
    for frame in 0..dst_frames {
        let src = ((frame as f64 * track.sample_rate as f64 / sample_rate as f64) as usize)
            .min(src_frames.saturating_sub(1));
        samples.push(track.samples[src * 2]);
        samples.push(track.samples[src * 2 + 1]);
    }
    AudioTrack {
        sample_rate,
        samples,
    }
}

/// Write a track as a 16-bit PCM stereo WAV file.
pub fn write_wav(path: &std::path::Path, track: &AudioTrack) -> StoryResult<()> {
    let frames = track.samples.len() / 2;
    let data_len = (frames * 2 * 2) as u32;
    let byte_rate = track.sample_rate * 2 * 2;

    let mut out = Vec::with_capacity(44 + data_len as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&2u16.to_le_bytes()); // stereo
    out.extend_from_slice(&track.sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&4u16.to_le_bytes()); // block align
    out.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    for sample in &track.samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        out.extend_from_slice(&value.to_le_bytes());
    }

    std::fs::write(path, out)
        .map_err(|e| StoryError::audio(format!("write wav {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::TimelineBuilder;
    use image::{Rgb, RgbImage};
    use storyreel_motion_core::Clip;
    use storyreel_scene_model::TransitionSpec;

    const RATE: u32 = 44_100;

    fn config() -> AudioConfig {
        AudioConfig {
            sample_rate: RATE,
            narration_padding_secs: 0.5,
            bgm_volume: 0.15,
            bgm_fade_out_secs: 2.0,
            cover_lead_in_secs: 0.5,
            cover_lead_out_secs: 1.0,
            cover_min_secs: 2.0,
        }
    }

    fn tone(duration: f64, value: f32) -> AudioTrack {
        let frames = (duration * RATE as f64).round() as usize;
        AudioTrack {
            sample_rate: RATE,
            samples: vec![value; frames * 2],
        }
    }

    struct FixedLengthSynth {
        natural_secs: f64,
    }

    impl DubSynthesizer for FixedLengthSynth {
        fn synthesize(&self, _text: &str, rate: f64) -> StoryResult<AudioTrack> {
            Ok(tone(self.natural_secs / rate, 0.2))
        }
    }

    struct StubbornSynth;

    impl DubSynthesizer for StubbornSynth {
        // Ignores the rate: the retry cannot help.
        fn synthesize(&self, _text: &str, _rate: f64) -> StoryResult<AudioTrack> {
            Ok(tone(20.0, 0.2))
        }
    }

    #[test]
    fn narration_padding_appends_silence() {
        let mixer = AudioSyncMixer::new(config());
        let padded = mixer.narration_with_padding(tone(3.0, 0.5));
        assert!((padded.duration_secs() - 3.5).abs() < 1e-3);
        // Tail is silent.
        assert_eq!(*padded.samples.last().unwrap(), 0.0);
    }

    #[test]
    fn cover_track_honors_lead_times_and_minimum() {
        let mixer = AudioSyncMixer::new(config());
        // 4s title: 0.5 lead-in + 4.0 + 1.0 lead-out.
        let with_title = mixer.cover_track(Some(tone(4.0, 0.3)));
        assert!((with_title.duration_secs() - 5.5).abs() < 1e-3);
        // No title: floor at the 2.0s minimum.
        let silent = mixer.cover_track(None);
        assert!((silent.duration_secs() - 2.0).abs() < 1e-3);
    }

    #[test]
    fn bgm_loops_to_exact_length() {
        let bed = loop_to_length(&tone(3.0, 0.4), 10.0);
        assert!((bed.duration_secs() - 10.0).abs() < 1e-3);
        assert_eq!(*bed.samples.last().unwrap(), 0.4);
    }

    #[test]
    fn fade_out_silences_the_tail() {
        let mut bed = tone(5.0, 0.4);
        apply_fade_out(&mut bed, 2.0);
        let frames = bed.samples.len() / 2;
        // Untouched before the fade, silent at the very end.
        assert_eq!(bed.samples[(frames / 2) * 2], 0.4);
        assert!(bed.samples[(frames - 1) * 2].abs() < 1e-3);
    }

    #[test]
    fn timeline_mix_respects_bgm_offset() {
        let mut builder = TimelineBuilder::new();
        let frame = RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]));
        builder
            .add_music_free_segment(Clip::from_image(frame.clone(), 4.0))
            .unwrap();
        builder
            .add_segment(
                Clip::from_image(frame, 30.0).with_audio(tone(30.0, 0.0)),
                &TransitionSpec::NONE,
            )
            .unwrap();
        let timeline = builder.build().unwrap();
        assert!((timeline.duration - 34.0).abs() < 1e-9);

        let mixer = AudioSyncMixer::new(config());
        let master = mixer.mix_timeline(&timeline, Some(&tone(7.0, 0.4)));
        assert!((master.duration_secs() - 34.0).abs() < 1e-3);

        let at = |secs: f64| master.samples[(secs * RATE as f64) as usize * 2];
        // Music-free lead stays silent; the bed plays at 0.15 gain after it.
        assert_eq!(at(2.0), 0.0);
        assert!((at(10.0) - 0.4 * 0.15).abs() < 1e-3);
    }

    #[test]
    fn intro_dub_fits_naturally_when_short_enough() {
        let fit = IntroFit::new(1.3);
        let outcome = fit
            .fit(&FixedLengthSynth { natural_secs: 2.5 }, "hi", 3.0)
            .unwrap();
        assert!(matches!(outcome, IntroFitOutcome::Natural(_)));
        assert_eq!(outcome.extend_secs(), 0.0);
    }

    #[test]
    fn overflow_retries_with_margin_rate() {
        let fit = IntroFit::new(1.3);
        // 20% over: retry at 1.2 * 1.01 = 1.212.
        assert!((fit.retry_rate(3.6, 3.0) - 1.212).abs() < 1e-9);
        let outcome = fit
            .fit(&FixedLengthSynth { natural_secs: 3.6 }, "hi", 3.0)
            .unwrap();
        match outcome {
            IntroFitOutcome::SpedUp { rate, track } => {
                assert!((rate - 1.212).abs() < 1e-9);
                assert!(track.duration_secs() <= 3.0);
            }
            other => panic!("expected sped-up outcome, got {other:?}"),
        }
    }

    #[test]
    fn retry_rate_is_clamped_to_max() {
        let fit = IntroFit::new(1.3);
        assert!((fit.retry_rate(6.0, 3.0) - 1.3).abs() < 1e-9);
    }

    #[test]
    fn stubborn_overflow_ends_in_freeze_frame() {
        let fit = IntroFit::new(1.3);
        let outcome = fit.fit(&StubbornSynth, "hi", 18.5).unwrap();
        match outcome {
            IntroFitOutcome::Extended { track, extend_secs } => {
                assert!((extend_secs - 1.5).abs() < 1e-6);
                assert!((track.duration_secs() - 20.0).abs() < 1e-3);
            }
            other => panic!("expected extension, got {other:?}"),
        }
    }

    #[test]
    fn extreme_overflow_is_trimmed_at_the_allowance() {
        let fit = IntroFit::new(1.3);
        let outcome = fit.fit(&StubbornSynth, "hi", 10.0).unwrap();
        match outcome {
            IntroFitOutcome::Extended { track, extend_secs } => {
                assert!((extend_secs - 2.5).abs() < 1e-6);
                assert!((track.duration_secs() - 12.5).abs() < 1e-3);
            }
            other => panic!("expected trimmed extension, got {other:?}"),
        }
    }
}
