//! macOS screenshot tool: `screencapture` writing an interactive selection to the clipboard.

use super::CaptureCommand;

pub(super) const SCREENCAPTURE_PROGRAM: &str = "/usr/sbin/screencapture";

/// -c: write the capture to the clipboard instead of a file
/// -i: interactive mode (crosshair region selection, Escape cancels)
/// -x: no capture sound
const SCREENCAPTURE_ARGS: [&str; 3] = ["-c", "-i", "-x"];

/// `screencapture` exits with 1 when the user presses Escape.
const USER_DISMISSED_EXIT_CODE: i32 = 1;

pub(super) fn command_with_program(program: &str) -> CaptureCommand {
    CaptureCommand::new(program, SCREENCAPTURE_ARGS)
        .dismissed_exit_code(USER_DISMISSED_EXIT_CODE)
}
