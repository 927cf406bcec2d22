//! Launch-at-login registration.
//!
//! `LaunchAgentLoginItem` registers the app through a per-user LaunchAgent plist
//! (`~/Library/LaunchAgents/<label>.plist`) with `RunAtLoad`, which launchd picks up at login.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, error, info};

use crate::paths;

#[derive(Debug, Error)]
pub enum LoginItemError {
    #[error("Failed to write login item {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("Failed to remove login item {path}: {source}")]
    Remove { path: PathBuf, source: io::Error },
}

/// OS service that launches the app at user login.
pub trait LoginItemService {
    fn is_registered(&self) -> Result<bool, LoginItemError>;
    fn register(&mut self) -> Result<(), LoginItemError>;
    /// Unregistering an item that is not registered succeeds.
    fn unregister(&mut self) -> Result<(), LoginItemError>;
}

/// Enables or disables launch at login. Best effort: failures are logged and dropped, no retry.
///
/// Enabling an item that is already registered unregisters it first so the registration is
/// re-asserted with the current bundle path.
pub fn set_launch_at_login(service: &mut dyn LoginItemService, enabled: bool) {
    let result = if enabled {
        enable(service)
    } else {
        service.unregister()
    };

    match result {
        Ok(()) => info!(enabled, "Updated launch at login"),
        Err(e) => error!(error = %e, enabled, "Failed to update launch at login"),
    }
}

fn enable(service: &mut dyn LoginItemService) -> Result<(), LoginItemError> {
    if service.is_registered()? {
        debug!("Login item already registered, re-registering");
        service.unregister()?;
    }
    service.register()
}

/// Login item backed by a LaunchAgent plist that opens the bundle.
#[derive(Debug, Clone)]
pub struct LaunchAgentLoginItem {
    label: String,
    bundle: PathBuf,
    agents_dir: PathBuf,
}

impl LaunchAgentLoginItem {
    pub fn new(
        label: impl Into<String>,
        bundle: impl Into<PathBuf>,
        agents_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            label: label.into(),
            bundle: bundle.into(),
            agents_dir: agents_dir.into(),
        }
    }

    /// Item for `bundle` in the current user's LaunchAgents directory.
    pub fn for_current_user(bundle: impl Into<PathBuf>) -> Result<Self, paths::PathError> {
        Ok(Self::new(
            crate::BUNDLE_IDENTIFIER,
            bundle,
            paths::launch_agents_dir()?,
        ))
    }

    pub fn plist_path(&self) -> PathBuf {
        self.agents_dir.join(format!("{}.plist", self.label))
    }

    fn render_plist(&self) -> String {
        let (program, args) = launch_arguments(&self.bundle);
        let mut arguments = format!("        <string>{}</string>\n", xml_escape(&program));
        for arg in args {
            arguments.push_str(&format!("        <string>{}</string>\n", xml_escape(&arg)));
        }

        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>Label</key>
    <string>{label}</string>
    <key>ProgramArguments</key>
    <array>
{arguments}    </array>
    <key>RunAtLoad</key>
    <true/>
    <key>ProcessType</key>
    <string>Interactive</string>
</dict>
</plist>
"#,
            label = xml_escape(&self.label),
        )
    }
}

impl LoginItemService for LaunchAgentLoginItem {
    fn is_registered(&self) -> Result<bool, LoginItemError> {
        Ok(self.plist_path().is_file())
    }

    fn register(&mut self) -> Result<(), LoginItemError> {
        let path = self.plist_path();
        let write = |path: &Path| -> io::Result<()> {
            fs::create_dir_all(&self.agents_dir)?;
            fs::write(path, self.render_plist())
        };
        write(&path).map_err(|source| LoginItemError::Write {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "Login item registered");
        Ok(())
    }

    fn unregister(&mut self) -> Result<(), LoginItemError> {
        let path = self.plist_path();
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "Login item unregistered");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(LoginItemError::Remove { path, source }),
        }
    }
}

/// `open <bundle>` for app bundles, the executable itself otherwise.
fn launch_arguments(bundle: &Path) -> (String, Vec<String>) {
    let bundle = bundle.display().to_string();
    if bundle.ends_with(".app") {
        ("/usr/bin/open".to_string(), vec![bundle])
    } else {
        (bundle, Vec::new())
    }
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
