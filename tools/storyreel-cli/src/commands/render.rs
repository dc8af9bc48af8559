//! Render a script manifest to a finished video.

use std::path::PathBuf;

use storyreel_common::config::RenderConfig;
use storyreel_render_engine::assemble::Assembler;
use storyreel_scene_model::ScriptManifest;

pub async fn run(
    config_path: PathBuf,
    manifest_path: PathBuf,
    category: Option<String>,
    output: Option<PathBuf>,
    parallax: bool,
) -> anyhow::Result<()> {
    let mut config = RenderConfig::load(&config_path);
    if let Some(category) = category {
        config.category = category;
    }
    if let Some(output) = output {
        config.output.output_dir = output;
    }
    if parallax {
        config.parallax.enabled = true;
    }

    let manifest = ScriptManifest::from_json(&manifest_path)?;
    tracing::info!(
        manifest = %manifest_path.display(),
        topic = %manifest.topic,
        scenes = manifest.scenes.len(),
        "starting render"
    );

    let assembler = Assembler::new(config)?;
    let output_path = assembler.assemble(&manifest).await?;

    println!("Rendered: {}", output_path.display());
    Ok(())
}
