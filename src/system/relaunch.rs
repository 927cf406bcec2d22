//! Relaunch: a detached shell waits, then reopens the bundle while this process exits.

use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

use tracing::{error, info};

pub const DEFAULT_RELAUNCH_DELAY: Duration = Duration::from_millis(500);

/// `$1` is the delay in seconds, `$2` the bundle path.
#[cfg(target_os = "macos")]
const RELAUNCH_SCRIPT: &str = r#"sleep "$1"; /usr/bin/open "$2""#;
#[cfg(not(target_os = "macos"))]
const RELAUNCH_SCRIPT: &str = r#"sleep "$1"; exec "$2""#;

/// Builds the detached relaunch command without spawning it.
pub fn relaunch_command(bundle: &Path, delay: Duration) -> Command {
    let mut command = Command::new("/bin/sh");
    command
        .arg("-c")
        .arg(RELAUNCH_SCRIPT)
        .arg("textsnap-relaunch")
        .arg(format!("{:.3}", delay.as_secs_f64()))
        .arg(bundle)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // New process group so the helper survives our exit.
        command.process_group(0);
    }

    command
}

/// Schedules a reopen of `bundle` after `delay` and terminates the current process.
/// Control never returns to the caller.
pub fn relaunch_application(bundle: &Path, delay: Duration) -> ! {
    match relaunch_command(bundle, delay).spawn() {
        Ok(child) => {
            info!(
                pid = child.id(),
                bundle = %bundle.display(),
                delay_ms = delay.as_millis(),
                "Relaunch scheduled, exiting"
            );
            std::process::exit(0);
        }
        Err(e) => {
            error!(error = %e, bundle = %bundle.display(), "Failed to schedule relaunch, exiting");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsStr;

    use super::*;

    #[test]
    fn command_passes_delay_and_bundle_as_positional_args() {
        let bundle = Path::new("/Applications/Text Snap.app");
        let command = relaunch_command(bundle, DEFAULT_RELAUNCH_DELAY);

        assert_eq!(command.get_program(), OsStr::new("/bin/sh"));
        let args: Vec<&OsStr> = command.get_args().collect();
        assert_eq!(args[0], OsStr::new("-c"));
        assert_eq!(args[1], OsStr::new(RELAUNCH_SCRIPT));
        assert_eq!(args[3], OsStr::new("0.500"));
        assert_eq!(args[4], bundle.as_os_str());
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    #[test]
    fn script_execs_the_target_after_sleeping() {
        let ok = relaunch_command(Path::new("/bin/true"), Duration::from_millis(10))
            .status()
            .unwrap();
        assert!(ok.success());

        let missing = relaunch_command(Path::new("/nonexistent/textsnap"), Duration::ZERO)
            .status()
            .unwrap();
        assert!(!missing.success());
    }
}
