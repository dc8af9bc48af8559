//! Probe a media asset.

use std::path::PathBuf;

use storyreel_render_engine::media::MediaTools;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    let tools = MediaTools::locate()?;

    let duration = tools.probe_duration(&path)?;
    println!("File:     {}", path.display());
    println!("Duration: {duration:.3}s");

    match tools.probe_dimensions(&path) {
        Ok((width, height)) => println!("Video:    {width}x{height}"),
        Err(_) => println!("Video:    (no video stream)"),
    }

    Ok(())
}
