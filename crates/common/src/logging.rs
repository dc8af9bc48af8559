//! Tracing setup for the batch renderer.
//!
//! A bare level in the config ("info", "debug") is scoped to the storyreel
//! crates with everything else held at `warn`, so ffmpeg chatter and
//! dependency internals stay quiet during a render. `RUST_LOG` and explicit
//! directive strings pass through untouched.

use crate::config::LoggingConfig;

const WORKSPACE_CRATES: [&str; 5] = [
    "storyreel_common",
    "storyreel_scene_model",
    "storyreel_motion_core",
    "storyreel_render_engine",
    "storyreel_cli",
];

/// Expand a bare level into per-crate directives; anything that already
/// looks like a directive list is returned as-is.
fn filter_directives(level: &str) -> String {
    if level.contains('=') || level.contains(',') {
        return level.to_string();
    }
    let mut directives = String::from("warn");
    for krate in WORKSPACE_CRATES {
        directives.push(',');
        directives.push_str(krate);
        directives.push('=');
        directives.push_str(level);
    }
    directives
}

/// Initialize the tracing subscriber with the given configuration.
pub fn init_logging(config: &LoggingConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(&config.level)));

    if config.json {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .json()
            .flatten_event(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    } else {
        // Uptime timestamps read better than wall clock across a long
        // render: scene N placed at +42s, encode finished at +180s.
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_timer(fmt::time::uptime())
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    }
}

/// Initialize logging with defaults (useful for tests and quick scripts).
pub fn init_default_logging() {
    init_logging(&LoggingConfig::default());
}
