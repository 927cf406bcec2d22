//! System interactions (clipboard, screenshot, privileges, login items, relaunch)

pub mod clipboard;
pub mod login_item;
pub mod privilege;
pub mod relaunch;
pub mod screenshot;

pub use clipboard::{ArboardClipboard, ClipboardError, SystemClipboard};
pub use login_item::{set_launch_at_login, LaunchAgentLoginItem, LoginItemError, LoginItemService};
pub use privilege::{
    check_install_location_and_role, is_current_user_admin, AdminProbe, AdminStatus, InstallDirs,
    PrivilegeResult,
};
pub use relaunch::{relaunch_application, DEFAULT_RELAUNCH_DELAY};
pub use screenshot::{CaptureCommand, CaptureOutcome, ScreenCapture, ScreenshotError};
