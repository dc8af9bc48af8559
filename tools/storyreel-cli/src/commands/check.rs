//! Check the rendering environment.

use std::path::PathBuf;

use storyreel_common::config::RenderConfig;
use storyreel_render_engine::media::MediaTools;

pub fn run(config_path: PathBuf) -> anyhow::Result<()> {
    println!("StoryReel Environment Check");
    println!("{}", "=".repeat(50));

    let mut all_ok = true;

    match MediaTools::locate() {
        Ok(tools) => {
            println!("[OK] ffmpeg:  {}", tools.ffmpeg.display());
            println!("[OK] ffprobe: {}", tools.ffprobe.display());
        }
        Err(e) => {
            println!("[FAIL] media tools: {e}");
            all_ok = false;
        }
    }

    if config_path.exists() {
        let config = RenderConfig::load(&config_path);
        println!("[OK] config: {}", config_path.display());
        println!(
            "     output {}x{} @ {} fps -> {}",
            config.output.width,
            config.output.height,
            config.output.fps,
            config.output.output_dir.display()
        );
        println!(
            "     category '{}': transition {:?}, layout {:?}",
            config.category,
            config.transition_kind(),
            config.layout_kind()
        );
        if let Some(bgm) = config.bgm_path() {
            if bgm.exists() {
                println!("[OK] bgm: {}", bgm.display());
            } else {
                println!("[WARN] bgm missing: {}", bgm.display());
            }
        }
        if let Some(font) = &config.subtitles.font {
            if font.exists() {
                println!("[OK] subtitle font: {}", font.display());
            } else {
                println!("[WARN] subtitle font missing: {}", font.display());
            }
        }
    } else {
        println!(
            "[WARN] no config at {}, defaults will be used",
            config_path.display()
        );
    }

    println!();
    if all_ok {
        println!("Environment is ready.");
    } else {
        println!("Some requirements are missing. See above.");
    }
    Ok(())
}
