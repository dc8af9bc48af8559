use std::path::PathBuf;

use image::{Rgb, RgbImage};

use storyreel_common::config::{AudioConfig, CameraConfig, OutputConfig, TransitionKind};
use storyreel_motion_core::{AudioTrack, CameraMotionSynthesizer, Clip};
use storyreel_render_engine::audio::AudioSyncMixer;
use storyreel_render_engine::media::MediaTools;
use storyreel_render_engine::renderer::Renderer;
use storyreel_render_engine::timeline::TimelineBuilder;
use storyreel_render_engine::transition::{overlap_alpha, page_turn};
use storyreel_scene_model::{CameraAction, TransitionSpec};

const RATE: u32 = 44_100;

fn solid(value: u8) -> RgbImage {
    RgbImage::from_pixel(16, 16, Rgb([value, value, value]))
}

fn tone(duration: f64, value: f32) -> AudioTrack {
    let frames = (duration * RATE as f64).round() as usize;
    AudioTrack {
        sample_rate: RATE,
        samples: vec![value; frames * 2],
    }
}

fn renderer() -> Renderer {
    Renderer::new(
        MediaTools {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        },
        OutputConfig {
            width: 16,
            height: 16,
            fps: 24,
            output_dir: PathBuf::from("out"),
        },
    )
}

#[test]
fn crossfaded_story_flattens_to_expected_length_and_blend() {
    let camera = CameraMotionSynthesizer::new(CameraConfig::default());
    let first = camera
        .synthesize(solid(0), 3.0, CameraAction::ZoomIn)
        .with_audio(AudioTrack::silence(3.0, RATE));
    let spec = TransitionSpec::new(TransitionKind::Crossfade, 0.8);
    let second = camera
        .synthesize(solid(200), 3.0, CameraAction::Static)
        .with_alpha(overlap_alpha(TransitionKind::Crossfade, 0.8, 16, 16).expect("alpha"))
        .with_audio(AudioTrack::silence(3.0, RATE));

    let mut builder = TimelineBuilder::new();
    builder.add_segment(first, &TransitionSpec::NONE).unwrap();
    builder.add_segment(second, &spec).unwrap();
    let timeline = builder.build().unwrap();

    // 3.0 + 3.0 - 0.8 overlap.
    assert!((timeline.duration - 5.2).abs() < 1e-9);

    let mixer = AudioSyncMixer::new(AudioConfig::default());
    let master = mixer.mix_timeline(&timeline, Some(&tone(1.0, 0.4)));
    assert!((master.duration_secs() - 5.2).abs() < 1e-3);
    // BGM starts at zero (no music-free lead) at the configured 0.15 gain.
    let sample = master.samples[(0.5 * RATE as f64) as usize * 2];
    assert!((sample - 0.4 * 0.15).abs() < 1e-3);

    let renderer = renderer();
    // Overlap spans [2.2, 3.0): halfway through, the dark outgoing frame and
    // the bright incoming one blend evenly.
    let mid = renderer.frame_at(&timeline, 2.6).get_pixel(8, 8).0[0];
    assert!((90..=110).contains(&mid), "expected ~100, got {mid}");
    assert_eq!(renderer.frame_at(&timeline, 4.0).get_pixel(8, 8).0[0], 200);
}

#[test]
fn page_turn_insert_bridges_adjacent_scenes() {
    let prev = solid(220);
    let next = solid(30);
    let turn = page_turn(prev.clone(), next.clone(), 0.7).expect("turn clip");

    let mut builder = TimelineBuilder::new();
    builder
        .add_segment(Clip::from_image(prev, 2.0), &TransitionSpec::NONE)
        .unwrap();
    builder.add_insert(turn).unwrap();
    builder
        .add_segment(
            Clip::from_image(next, 2.0),
            &TransitionSpec::new(TransitionKind::PageTurn, 0.7),
        )
        .unwrap();
    let timeline = builder.build().unwrap();

    // Inserts butt-join: 2.0 + 0.7 + 2.0.
    assert!((timeline.duration - 4.7).abs() < 1e-9);

    let renderer = renderer();
    // The turn starts on the outgoing page and the tail segment shows the
    // incoming one.
    assert_eq!(renderer.frame_at(&timeline, 2.0).get_pixel(2, 8).0[0], 220);
    assert_eq!(renderer.frame_at(&timeline, 3.5).get_pixel(8, 8).0[0], 30);
}
