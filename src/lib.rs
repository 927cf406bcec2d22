//! TextSnap helper: clipboard bridge, screen capture, install/role checks, launch at login and
//! relaunch for the screenshot-to-text app.

pub mod cli;
pub mod config;
pub mod paths;
pub mod session;
pub mod system;

use tracing_subscriber::EnvFilter;

pub use cli::run;

/// Bundle identifier; also the LaunchAgent label.
pub const BUNDLE_IDENTIFIER: &str = "io.textsnap.helper";

/// Installs the stderr log subscriber. `RUST_LOG` wins over the configured level, which applies
/// to this crate's targets only; everything else logs warnings and above.
pub fn init_logging(level: config::LogLevel) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,textsnap_lib={level},textsnap={level}",
            level = level.as_str()
        ))
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
