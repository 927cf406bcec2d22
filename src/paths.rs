//! Path utilities: home, application support, install directories and the running bundle.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

/// Directory name used under the platform data directory (Application Support on macOS).
pub const APP_SUPPORT_DIR_NAME: &str = "TextSnap";

/// System-wide applications directory on macOS.
const SYSTEM_APPLICATIONS_DIR: &str = "/Applications";

#[derive(Debug, Error)]
pub enum PathError {
    #[error("Could not determine home directory: HOME and USERPROFILE are not set")]
    NoHomeDir,
    #[error("No application data directory available on this platform")]
    NoDataDir,
    #[error("Failed to create directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("Failed to resolve the running executable: {0}")]
    CurrentExe(io::Error),
}

/// Gets the user's home directory.
///
/// On Unix-like systems (macOS, Linux), uses the `HOME` environment variable.
/// On Windows, tries `HOME` first (available on Windows 10+), then falls back to `USERPROFILE`.
pub fn get_home_dir() -> Result<PathBuf, PathError> {
    if let Ok(home) = env::var("HOME") {
        if !home.is_empty() {
            return Ok(PathBuf::from(home));
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Ok(profile) = env::var("USERPROFILE") {
            return Ok(PathBuf::from(profile));
        }
    }

    Err(PathError::NoHomeDir)
}

/// `/Applications`
pub fn system_applications_dir() -> PathBuf {
    PathBuf::from(SYSTEM_APPLICATIONS_DIR)
}

/// `${HOME}/Applications`
pub fn user_applications_dir() -> Result<PathBuf, PathError> {
    Ok(get_home_dir()?.join("Applications"))
}

/// `${HOME}/Library/LaunchAgents`
pub fn launch_agents_dir() -> Result<PathBuf, PathError> {
    Ok(get_home_dir()?.join("Library").join("LaunchAgents"))
}

/// Per-application support directory: `<data_dir>/TextSnap`.
pub fn app_support_dir() -> Result<PathBuf, PathError> {
    let base = dirs::data_dir().ok_or(PathError::NoDataDir)?;
    Ok(base.join(APP_SUPPORT_DIR_NAME))
}

/// Ensures the application support directory exists, creating intermediate directories.
pub fn ensure_app_support_dir() -> Result<PathBuf, PathError> {
    let dir = app_support_dir()?;
    ensure_dir(&dir)?;
    Ok(dir)
}

fn ensure_dir(dir: &Path) -> Result<bool, PathError> {
    if dir.is_dir() {
        debug!(path = %dir.display(), "Directory already exists");
        return Ok(false);
    }

    fs::create_dir_all(dir).map_err(|source| PathError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;
    info!(path = %dir.display(), "Created directory");
    Ok(true)
}

/// Path of the running application bundle.
///
/// Walks up from the executable to the nearest `*.app` directory. When the binary is not
/// inside a bundle (e.g. `cargo run`, Linux), the executable itself is treated as the bundle.
pub fn current_bundle_path() -> Result<PathBuf, PathError> {
    let exe = env::current_exe().map_err(PathError::CurrentExe)?;
    Ok(bundle_path_for(&exe))
}

fn bundle_path_for(exe: &Path) -> PathBuf {
    exe.ancestors()
        .find(|p| p.extension().is_some_and(|ext| ext == "app"))
        .map(Path::to_path_buf)
        .unwrap_or_else(|| exe.to_path_buf())
}
