//! Screen capture: runs the interactive screenshot tool and reads the result from the clipboard.
//!
//! The tool writes the selected region to the clipboard; its termination is the completion
//! signal. The image is then read on the main context, which owns the clipboard.

#[cfg(target_os = "macos")]
mod macos;

use std::process::Stdio;

use image::RgbaImage;
use thiserror::Error;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::session::{SessionError, SessionHandle};

#[derive(Error, Debug)]
pub enum ScreenshotError {
    #[error("Screen capture is not supported on this platform")]
    Unsupported,
    #[error("Failed to execute screenshot tool {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("Failed to wait for screenshot tool: {0}")]
    Wait(std::io::Error),
    #[error("Failed to read capture from clipboard: {0}")]
    Session(#[from] SessionError),
}

/// Result of one interactive capture.
#[derive(Debug)]
pub enum CaptureOutcome {
    /// The clipboard held image data once the tool exited.
    Captured(RgbaImage),
    /// The tool exited without producing an image (e.g. the user dismissed the selection).
    NoImage,
    /// The cancellation token fired; the tool was killed.
    Cancelled,
    Failed(ScreenshotError),
}

impl CaptureOutcome {
    /// The image, if any. Collapses every non-capture outcome to `None`.
    pub fn into_image(self) -> Option<RgbaImage> {
        match self {
            CaptureOutcome::Captured(image) => Some(image),
            _ => None,
        }
    }
}

/// Program and arguments of the screenshot tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureCommand {
    program: String,
    args: Vec<String>,
    dismissed_exit_code: Option<i32>,
}

impl CaptureCommand {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            dismissed_exit_code: None,
        }
    }

    /// Exit code meaning the user dismissed the selection. The clipboard is not read in that
    /// case, so an older image left on it is not mistaken for a capture.
    pub fn dismissed_exit_code(mut self, code: i32) -> Self {
        self.dismissed_exit_code = Some(code);
        self
    }

    /// The platform screenshot tool, or `None` where there is none.
    pub fn platform_default() -> Option<Self> {
        #[cfg(target_os = "macos")]
        {
            Some(macos::command_with_program(macos::SCREENCAPTURE_PROGRAM))
        }

        #[cfg(not(target_os = "macos"))]
        {
            None
        }
    }

    /// The platform tool's arguments with a different program (config override).
    pub fn with_program(program: &str) -> Self {
        #[cfg(target_os = "macos")]
        {
            macos::command_with_program(program)
        }

        #[cfg(not(target_os = "macos"))]
        {
            Self::new(program, Vec::<String>::new())
        }
    }
}

/// Screenshot invoker bound to a capture session.
pub struct ScreenCapture {
    command: Option<CaptureCommand>,
    session: SessionHandle,
}

impl ScreenCapture {
    pub fn new(session: SessionHandle) -> Self {
        Self {
            command: CaptureCommand::platform_default(),
            session,
        }
    }

    pub fn with_command(session: SessionHandle, command: CaptureCommand) -> Self {
        Self {
            command: Some(command),
            session,
        }
    }

    /// Lets the user select a screen region, then returns the image the tool left on the clipboard.
    pub async fn capture_selection_to_clipboard(
        &self,
        cancel: &CancellationToken,
    ) -> CaptureOutcome {
        let Some(command) = &self.command else {
            warn!("No screenshot tool available on this platform");
            return CaptureOutcome::Failed(ScreenshotError::Unsupported);
        };

        if cancel.is_cancelled() {
            debug!("Capture cancelled before the screenshot tool started");
            return CaptureOutcome::Cancelled;
        }

        debug!(program = %command.program, "Starting interactive screen capture");
        let mut child = match Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(source) => {
                error!(
                    error = %source,
                    program = %command.program,
                    "Failed to start screenshot tool"
                );
                return CaptureOutcome::Failed(ScreenshotError::Spawn {
                    program: command.program.clone(),
                    source,
                });
            }
        };

        let waited = tokio::select! {
            status = child.wait() => Some(status),
            _ = cancel.cancelled() => None,
        };

        let status = match waited {
            Some(Ok(status)) => status,
            Some(Err(e)) => {
                error!(error = %e, "Failed to wait for screenshot tool");
                return CaptureOutcome::Failed(ScreenshotError::Wait(e));
            }
            None => {
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "Failed to stop screenshot tool after cancellation");
                }
                info!("Screen capture cancelled");
                return CaptureOutcome::Cancelled;
            }
        };

        let code = status.code();
        if code.is_some() && code == command.dismissed_exit_code {
            debug!(?code, "User dismissed screen selection");
            return CaptureOutcome::NoImage;
        }
        if !status.success() {
            debug!(?code, "Screenshot tool exited with non-zero status");
        }

        match self.session.read_clipboard_image().await {
            Ok(Some(image)) => {
                info!(
                    width = image.width(),
                    height = image.height(),
                    "Screen region captured"
                );
                CaptureOutcome::Captured(image)
            }
            Ok(None) => {
                debug!("No image on clipboard after capture");
                CaptureOutcome::NoImage
            }
            Err(e) => CaptureOutcome::Failed(e.into()),
        }
    }
}
