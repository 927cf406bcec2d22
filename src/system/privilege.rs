//! Admin-group membership and install-location checks.
//!
//! An admin may keep the app in `/Applications` or `~/Applications`; for a standard user only
//! `~/Applications` counts as correctly installed.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::paths;

/// Shell test for membership of the `admin` group; exit status 0 means admin.
const ADMIN_PROBE_SCRIPT: &str = "id -Gn | tr ' ' '\\n' | grep -qx admin";

/// Outcome of the admin probe before it is collapsed to a boolean.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminStatus {
    Admin,
    NotAdmin,
    /// The probe could not run or was killed by a signal.
    Unknown(String),
}

impl AdminStatus {
    /// Only a positive answer counts; `Unknown` degrades to not-admin.
    pub fn is_admin(&self) -> bool {
        matches!(self, AdminStatus::Admin)
    }
}

/// Install location and role of the running app. Transient; not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrivilegeResult {
    pub is_in_expected_directory: bool,
    pub is_admin: bool,
}

/// Command used to test admin membership.
#[derive(Debug, Clone)]
pub struct AdminProbe {
    program: String,
    args: Vec<String>,
}

impl Default for AdminProbe {
    fn default() -> Self {
        Self::new("/bin/sh", ["-c", ADMIN_PROBE_SCRIPT])
    }
}

impl AdminProbe {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Runs the probe and reports the distinction between "not admin" and "could not tell".
    pub async fn admin_status(&self) -> AdminStatus {
        let status = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => AdminStatus::Admin,
            Ok(status) => match status.code() {
                Some(code) => {
                    debug!(code, "Admin probe exited non-zero");
                    AdminStatus::NotAdmin
                }
                None => {
                    warn!("Admin probe terminated by signal");
                    AdminStatus::Unknown("terminated by signal".to_string())
                }
            },
            Err(e) => {
                warn!(error = %e, program = %self.program, "Failed to run admin probe");
                AdminStatus::Unknown(e.to_string())
            }
        }
    }

    /// `true` only when the probe positively reports admin membership.
    pub async fn is_current_user_admin(&self) -> bool {
        self.admin_status().await.is_admin()
    }
}

/// Checks the current user's admin membership with the default probe.
pub async fn is_current_user_admin() -> bool {
    AdminProbe::default().is_current_user_admin().await
}

/// Where a bundle is allowed to live, depending on the user's role.
#[derive(Debug, Clone)]
pub struct InstallDirs {
    pub system_applications: PathBuf,
    pub user_applications: PathBuf,
}

impl InstallDirs {
    pub fn from_environment() -> Result<Self, paths::PathError> {
        Ok(Self {
            system_applications: paths::system_applications_dir(),
            user_applications: paths::user_applications_dir()?,
        })
    }
}

/// Admins are correctly placed in either directory; other users only in the user directory.
pub fn evaluate_install_location(bundle_parent: &Path, is_admin: bool, dirs: &InstallDirs) -> bool {
    let in_user_dir = same_dir(bundle_parent, &dirs.user_applications);
    if is_admin {
        in_user_dir || same_dir(bundle_parent, &dirs.system_applications)
    } else {
        in_user_dir
    }
}

fn same_dir(a: &Path, b: &Path) -> bool {
    a.components().eq(b.components())
}

/// Resolves the admin status, then checks that `bundle` sits in a directory allowed for it.
pub async fn check_install_location_and_role(
    bundle: &Path,
    probe: &AdminProbe,
    dirs: &InstallDirs,
) -> PrivilegeResult {
    let is_admin = probe.is_current_user_admin().await;
    let is_in_expected_directory = bundle
        .parent()
        .is_some_and(|parent| evaluate_install_location(parent, is_admin, dirs));

    info!(
        bundle = %bundle.display(),
        is_admin,
        is_in_expected_directory,
        "Checked install location"
    );
    PrivilegeResult {
        is_in_expected_directory,
        is_admin,
    }
}
