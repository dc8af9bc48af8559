//! End-to-end assembly: scenes in, one encoded video out.
//!
//! Per-scene failures are recoverable: the scene is logged with its id and
//! skipped, and assembly continues. Only an empty timeline is fatal.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use storyreel_common::config::RenderConfig;
use storyreel_common::{StoryError, StoryResult};
use storyreel_motion_core::{
    AudioTrack, CameraMotionSynthesizer, Clip, DepthCache, DepthEstimator, DepthMap, Frame,
    ParallaxRenderer, RadialDepthEstimator,
};
use storyreel_scene_model::{Scene, ScriptManifest, TransitionSpec};

use crate::audio::{AudioSyncMixer, DubSynthesizer, IntroFit};
use crate::layout::SceneComposer;
use crate::media::MediaTools;
use crate::renderer::Renderer;
use crate::timeline::TimelineBuilder;
use crate::transition::{overlap_alpha, page_turn};

/// Fade applied to the first and last moments of the finished video.
const EDGE_FADE_SECS: f64 = 0.5;

/// Assemble a manifest into a video using the given configuration.
///
/// Convenience wrapper over [`Assembler`] with default seams: the radial
/// depth fallback and no dub synthesizer.
pub async fn assemble(manifest: &ScriptManifest, config: &RenderConfig) -> StoryResult<PathBuf> {
    Assembler::new(config.clone())?.assemble(manifest).await
}

/// The assembly pipeline with its pluggable seams.
pub struct Assembler {
    config: RenderConfig,
    tools: MediaTools,
    camera: CameraMotionSynthesizer,
    parallax: ParallaxRenderer,
    mixer: AudioSyncMixer,
    depth_estimator: Arc<dyn DepthEstimator>,
    dub_synthesizer: Option<Arc<dyn DubSynthesizer>>,
    depth_cache: DepthCache,
}

impl Assembler {
    pub fn new(config: RenderConfig) -> StoryResult<Self> {
        let tools = MediaTools::locate()?;
        let camera = CameraMotionSynthesizer::new(config.camera.clone());
        let parallax = ParallaxRenderer::new(config.parallax.clone());
        let mixer = AudioSyncMixer::new(config.audio.clone());
        let depth_cache = DepthCache::new(config.output.output_dir.join("depth_cache"));
        Ok(Self {
            config,
            tools,
            camera,
            parallax,
            mixer,
            depth_estimator: Arc::new(RadialDepthEstimator),
            dub_synthesizer: None,
            depth_cache,
        })
    }

    /// Replace the depth estimator used for parallax scenes.
    pub fn with_depth_estimator(mut self, estimator: Arc<dyn DepthEstimator>) -> Self {
        self.depth_estimator = estimator;
        self
    }

    /// Provide a speech synthesizer for the intro dub.
    pub fn with_dub_synthesizer(mut self, synthesizer: Arc<dyn DubSynthesizer>) -> Self {
        self.dub_synthesizer = Some(synthesizer);
        self
    }

    /// Run the full pipeline and return the output file path.
    pub async fn assemble(&self, manifest: &ScriptManifest) -> StoryResult<PathBuf> {
        let started = std::time::Instant::now();
        info!(
            topic = %manifest.topic,
            scenes = manifest.scenes.len(),
            category = %self.config.category,
            "assembling story video"
        );

        let composer = SceneComposer::new(&self.config);
        let spec = TransitionSpec::from_config(&self.config);
        let mut builder = TimelineBuilder::new();
        let mut last_frame: Option<Frame> = None;

        if let Some(intro) = self.config.intro.clone() {
            let clip = self.intro_clip(&intro)?;
            last_frame = Some(final_frame(&clip));
            builder.add_music_free_segment(clip)?;
        }

        if let Some(cover) = self.config.cover.clone() {
            let clip = self.cover_clip(&cover)?;
            last_frame = Some(final_frame(&clip));
            builder.add_music_free_segment(clip)?;
        }

        if !manifest.intro_hook.is_empty() {
            match self.hook_clip(manifest) {
                Ok(Some(clip)) => {
                    last_frame = Some(final_frame(&clip));
                    builder.add_music_free_segment(clip)?;
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "skipping spoken hook"),
            }
        }

        let mut placed_scenes = 0usize;
        for scene in &manifest.scenes {
            match self.scene_clip(scene, &composer, &spec, !builder.is_empty()) {
                Ok(clip) => {
                    if spec.is_insert() {
                        if let Some(prev) = last_frame.take() {
                            let next_first = clip.sample(0.0);
                            if let Some(turn) = page_turn(prev, next_first, spec.duration) {
                                builder.add_insert(turn)?;
                            }
                        }
                    }
                    last_frame = Some(final_frame(&clip));
                    builder.add_segment(clip, &spec)?;
                    placed_scenes += 1;
                }
                Err(e) => {
                    warn!(error = %e.in_scene(scene.id), "skipping scene");
                }
            }
        }
        if placed_scenes == 0 {
            return Err(StoryError::timeline("no scene could be assembled"));
        }

        if let Some(outro_image) = self.config.outro_image.clone() {
            match self.outro_clip(&outro_image) {
                // Butt-joined: the outro brings its own fade from black.
                Ok(clip) => builder.add_segment(clip, &TransitionSpec::NONE)?,
                Err(e) => warn!(error = %e, "skipping outro"),
            }
        }

        let timeline = builder.build()?;
        let bgm = self.load_bgm();
        let master = self.mixer.mix_timeline(&timeline, bgm.as_ref());

        let output_path = self
            .config
            .output
            .output_dir
            .join(format!("{}.mp4", sanitize_name(&manifest.topic)));
        let renderer = Renderer::new(self.tools.clone(), self.config.output.clone());
        let encode_path = output_path.clone();
        let rendered = tokio::task::spawn_blocking(move || {
            renderer.render(&timeline, &master, &encode_path)
        })
        .await
        .map_err(|e| StoryError::render(format!("render task failed: {e}")))??;

        info!(
            output = %rendered.display(),
            scenes = placed_scenes,
            elapsed_secs = started.elapsed().as_secs_f64(),
            "assembly finished"
        );
        Ok(rendered)
    }

    /// One story segment: visual chain, layout composition, padded
    /// narration, and the overlap alpha when a predecessor exists.
    fn scene_clip(
        &self,
        scene: &Scene,
        composer: &SceneComposer,
        spec: &TransitionSpec,
        has_predecessor: bool,
    ) -> StoryResult<Clip> {
        let narration = self
            .tools
            .decode_audio(&scene.narration_audio, self.config.audio.sample_rate)?;
        let mut audio = self.mixer.narration_with_padding(narration);
        let mut duration = audio.duration_secs();
        // An overlapping segment loses its head to the blend; extend it so
        // the narration still gets its full time on screen.
        if has_predecessor && spec.is_overlap() {
            duration += spec.duration;
            audio = audio.with_lead_in(spec.duration);
        }

        let visual = self.scene_visual(scene, duration)?;
        let secondary = scene.subtitle_secondary.as_deref();
        let mut clip = composer.compose(visual, &scene.subtitle, secondary);
        audio.pad_to(clip.duration());
        clip = clip.with_audio(audio);

        if has_predecessor && spec.is_overlap() {
            if let Some(alpha) = overlap_alpha(
                spec.kind,
                spec.duration,
                self.config.output.width,
                self.config.output.height,
            ) {
                clip = clip.with_alpha(alpha);
            }
        }
        Ok(clip)
    }

    /// Visual preference order: pre-generated motion clip, then parallax
    /// for pure pans, then the Ken Burns camera. Each fallback is logged.
    fn scene_visual(&self, scene: &Scene, duration: f64) -> StoryResult<Clip> {
        if let Some(motion_video) = &scene.motion_video {
            match self.tools.decode_video_frames(
                motion_video,
                self.config.output.fps,
                self.config.output.width,
                self.config.output.height,
            ) {
                Ok(frames) => {
                    if let Some(clip) = Clip::from_frames(frames, self.config.output.fps, duration)
                    {
                        return Ok(clip);
                    }
                }
                Err(e) => {
                    warn!(scene = scene.id, error = %e, "motion clip unusable, falling back to still");
                }
            }
        }

        let image_path = scene.image.as_ref().ok_or_else(|| {
            StoryError::asset(format!("scene {} has neither motion clip nor image", scene.id))
        })?;
        let image = image::open(image_path)
            .map_err(|e| {
                StoryError::asset(format!("open image {}: {e}", image_path.display()))
            })?
            .into_rgb8();

        let action = scene.resolved_action();
        if self.config.parallax.enabled && action.is_pan() {
            match self.depth_for(scene, &image) {
                Ok(depth) => {
                    if let Some(clip) = self.parallax.render(
                        &image,
                        &depth,
                        duration,
                        action,
                        self.config.output.width,
                        self.config.output.height,
                    ) {
                        return Ok(clip);
                    }
                }
                Err(e) => {
                    warn!(scene = scene.id, error = %e, "depth unavailable, using flat camera");
                }
            }
        }

        Ok(self.camera.synthesize(image, duration, action))
    }

    fn depth_for(&self, scene: &Scene, image: &Frame) -> StoryResult<DepthMap> {
        // Precomputed map shipped with the scene wins.
        if let Some(path) = &scene.depth_cache {
            let gray = image::open(path)
                .map_err(|e| StoryError::depth(format!("open depth map {}: {e}", path.display())))?
                .into_luma8();
            return Ok(DepthMap::from_gray(&gray));
        }
        let image_path = scene.image.as_ref().ok_or_else(|| {
            StoryError::depth(format!("scene {} has no image to estimate depth for", scene.id))
        })?;
        if let Some(cached) = self.depth_cache.load(image_path)? {
            return Ok(cached);
        }
        let depth = self.depth_estimator.estimate(image)?;
        if let Err(e) = self.depth_cache.store(image_path, &depth) {
            warn!(scene = scene.id, error = %e, "failed to cache depth map");
        }
        Ok(depth)
    }

    fn intro_clip(&self, intro: &storyreel_common::config::IntroConfig) -> StoryResult<Clip> {
        let video_secs = self.tools.probe_duration(&intro.video)?;
        let frames = self.tools.decode_video_frames(
            &intro.video,
            self.config.output.fps,
            self.config.output.width,
            self.config.output.height,
        )?;
        let mut clip = Clip::from_frames(frames, self.config.output.fps, video_secs)
            .ok_or_else(|| StoryError::asset("intro video decoded to zero frames"))?;

        let audio = match (&intro.dub_text, &self.dub_synthesizer) {
            (Some(text), Some(synthesizer)) => {
                let fit = IntroFit::new(intro.max_speedup);
                let outcome = fit.fit(synthesizer.as_ref(), text, video_secs)?;
                let extend = outcome.extend_secs();
                if extend > 0.0 {
                    clip = clip.extended_with_freeze(extend);
                }
                outcome.track().clone()
            }
            (Some(_), None) => {
                warn!("intro dub text configured but no synthesizer provided, keeping original audio");
                self.intro_source_audio(&intro.video, video_secs)
            }
            (None, _) => self.intro_source_audio(&intro.video, video_secs),
        };

        let mut audio = audio;
        audio.pad_to(clip.duration());
        Ok(clip.with_audio(audio))
    }

    fn intro_source_audio(&self, video: &std::path::Path, video_secs: f64) -> AudioTrack {
        match self
            .tools
            .decode_audio(video, self.config.audio.sample_rate)
        {
            Ok(track) => track,
            Err(e) => {
                warn!(error = %e, "intro has no usable audio track, using silence");
                AudioTrack::silence(video_secs, self.config.audio.sample_rate)
            }
        }
    }

    /// Spoken hook before the story: synthesized hook audio over the cover
    /// image, or the first scene still when no cover is configured. Plays
    /// music-free, like the intro and cover.
    fn hook_clip(&self, manifest: &ScriptManifest) -> StoryResult<Option<Clip>> {
        let Some(synthesizer) = &self.dub_synthesizer else {
            warn!("intro hook text present but no synthesizer provided, skipping hook");
            return Ok(None);
        };
        let image_path = self
            .config
            .cover
            .as_ref()
            .map(|cover| cover.image.clone())
            .or_else(|| manifest.scenes.iter().find_map(|scene| scene.image.clone()));
        let Some(image_path) = image_path else {
            warn!("no still available for the spoken hook, skipping hook");
            return Ok(None);
        };
        let image = image::open(&image_path)
            .map_err(|e| {
                StoryError::asset(format!("open hook still {}: {e}", image_path.display()))
            })?
            .into_rgb8();
        let audio = self
            .mixer
            .narration_with_padding(synthesizer.synthesize(&manifest.intro_hook, 1.0)?);
        let duration = audio.duration_secs();
        Ok(Some(Clip::from_image(image, duration).with_audio(audio)))
    }

    fn cover_clip(&self, cover: &storyreel_common::config::CoverConfig) -> StoryResult<Clip> {
        let image = image::open(&cover.image)
            .map_err(|e| {
                StoryError::asset(format!("open cover {}: {e}", cover.image.display()))
            })?
            .into_rgb8();
        let title_audio = match &cover.title_audio {
            Some(path) => Some(
                self.tools
                    .decode_audio(path, self.config.audio.sample_rate)?,
            ),
            None => None,
        };
        let track = self.mixer.cover_track(title_audio);
        let duration = track.duration_secs();
        Ok(Clip::from_image(image, duration).with_audio(track))
    }

    fn outro_clip(&self, image_path: &std::path::Path) -> StoryResult<Clip> {
        let image = image::open(image_path)
            .map_err(|e| {
                StoryError::asset(format!("open outro {}: {e}", image_path.display()))
            })?
            .into_rgb8();
        let duration = self.config.outro_secs;
        let audio = AudioTrack::silence(duration, self.config.audio.sample_rate);
        Ok(Clip::from_image(image, duration)
            .with_black_fades(EDGE_FADE_SECS, EDGE_FADE_SECS)
            .with_audio(audio))
    }

    fn load_bgm(&self) -> Option<AudioTrack> {
        let path = self.config.bgm_path()?;
        match self
            .tools
            .decode_audio(path, self.config.audio.sample_rate)
        {
            Ok(track) => Some(track),
            Err(e) => {
                // Missing music is never fatal; the story plays without it.
                warn!(bgm = %path.display(), error = %e, "background music unavailable");
                None
            }
        }
    }
}

/// The visually last frame of a clip. Sampled just inside the end so
/// frame-sequence clips do not wrap back to their first frame.
fn final_frame(clip: &Clip) -> Frame {
    clip.sample(clip.duration() - 1e-4)
}

fn sanitize_name(topic: &str) -> String {
    let cleaned: String = topic
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        "story".to_string()
    } else {
        trimmed.to_string()
    }
}
