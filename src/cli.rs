//! Command-line entry point: parses a command and runs it against the library.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::config::{self, AppConfig};
use crate::paths;
use crate::session::{CapturedTextEntry, SessionHandle};
use crate::system::{
    self, AdminProbe, AdminStatus, CaptureCommand, CaptureOutcome, InstallDirs,
    LaunchAgentLoginItem, LoginItemService, ScreenCapture,
};

const USAGE: &str = "Usage: textsnap <command>

Commands:
  capture                    Select a screen region and save it to the support directory
  copy <text>...             Copy the given lines to the clipboard
  clear                      Clear the clipboard
  is-admin                   Report whether the current user is an admin
  check-install [bundle]     Check the bundle location against the user's role
  login-item <on|off|status> Manage launch at login
  relaunch [seconds]         Restart the app after a delay
  support-dir                Create and print the application support directory
  version                    Print the version";

const LAST_CAPTURE_FILE_NAME: &str = "last-capture.png";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginItemAction {
    On,
    Off,
    Status,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    Capture,
    Copy(Vec<String>),
    Clear,
    IsAdmin,
    CheckInstall(Option<PathBuf>),
    LoginItem(LoginItemAction),
    Relaunch(Option<Duration>),
    SupportDir,
    Version,
}

/// Parses the arguments after the program name.
pub fn parse_command(args: &[String]) -> Result<CliCommand, String> {
    let Some((command, rest)) = args.split_first() else {
        return Err("missing command".to_string());
    };

    let no_extra = |cmd: CliCommand| {
        if rest.is_empty() {
            Ok(cmd)
        } else {
            Err(format!("unexpected arguments for {command}"))
        }
    };

    match command.as_str() {
        "capture" => no_extra(CliCommand::Capture),
        "copy" => Ok(CliCommand::Copy(rest.to_vec())),
        "clear" => no_extra(CliCommand::Clear),
        "is-admin" => no_extra(CliCommand::IsAdmin),
        "check-install" => match rest {
            [] => Ok(CliCommand::CheckInstall(None)),
            [bundle] => Ok(CliCommand::CheckInstall(Some(PathBuf::from(bundle)))),
            _ => Err("check-install takes at most one bundle path".to_string()),
        },
        "login-item" => match rest {
            [action] => match action.as_str() {
                "on" => Ok(CliCommand::LoginItem(LoginItemAction::On)),
                "off" => Ok(CliCommand::LoginItem(LoginItemAction::Off)),
                "status" => Ok(CliCommand::LoginItem(LoginItemAction::Status)),
                other => Err(format!("unknown login-item action: {other}")),
            },
            _ => Err("login-item takes one of on, off, status".to_string()),
        },
        "relaunch" => match rest {
            [] => Ok(CliCommand::Relaunch(None)),
            [secs] => secs
                .parse::<f64>()
                .ok()
                .and_then(|s| Duration::try_from_secs_f64(s).ok())
                .map(|delay| CliCommand::Relaunch(Some(delay)))
                .ok_or_else(|| format!("invalid delay: {secs}")),
            _ => Err("relaunch takes at most one delay in seconds".to_string()),
        },
        "support-dir" => no_extra(CliCommand::SupportDir),
        "version" | "--version" | "-V" => no_extra(CliCommand::Version),
        other => Err(format!("unknown command: {other}")),
    }
}

/// Parses `args`, initializes logging from the config and runs the command.
pub fn run(args: &[String]) -> ExitCode {
    let command = match parse_command(args) {
        Ok(command) => command,
        Err(msg) => {
            eprintln!("textsnap: {msg}\n\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    crate::init_logging(config::load_log_level());
    let config = config::load_config();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "Failed to create tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(execute(command, &config))
}

async fn execute(command: CliCommand, config: &AppConfig) -> ExitCode {
    match command {
        CliCommand::Capture => capture(config).await,
        CliCommand::Copy(lines) => {
            with_session(|session| async move {
                let entries = lines.into_iter().map(CapturedTextEntry::new).collect();
                session.copy_to_clipboard(entries).await
            })
            .await
        }
        CliCommand::Clear => {
            with_session(|session| async move { session.clear_capture().await }).await
        }
        CliCommand::IsAdmin => {
            match AdminProbe::default().admin_status().await {
                AdminStatus::Admin => println!("admin"),
                AdminStatus::NotAdmin => println!("not admin"),
                AdminStatus::Unknown(reason) => println!("unknown ({reason})"),
            }
            ExitCode::SUCCESS
        }
        CliCommand::CheckInstall(bundle) => check_install(bundle).await,
        CliCommand::LoginItem(action) => login_item(action, config),
        CliCommand::Relaunch(delay) => {
            let bundle = match paths::current_bundle_path() {
                Ok(bundle) => bundle,
                Err(e) => return fail(e),
            };
            system::relaunch_application(&bundle, delay.unwrap_or(config.relaunch_delay))
        }
        CliCommand::SupportDir => match paths::ensure_app_support_dir() {
            Ok(dir) => {
                println!("{}", dir.display());
                ExitCode::SUCCESS
            }
            Err(e) => fail(e),
        },
        CliCommand::Version => {
            println!("textsnap {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
    }
}

fn fail(e: impl std::fmt::Display) -> ExitCode {
    eprintln!("textsnap: {e}");
    ExitCode::FAILURE
}

async fn with_session<F, Fut>(f: F) -> ExitCode
where
    F: FnOnce(SessionHandle) -> Fut,
    Fut: std::future::Future<Output = Result<(), crate::session::SessionError>>,
{
    let session = match SessionHandle::start_with_system_clipboard().await {
        Ok(session) => session,
        Err(e) => return fail(e),
    };
    let result = f(session.clone()).await;
    session.close();
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(e),
    }
}

async fn capture(config: &AppConfig) -> ExitCode {
    let session = match SessionHandle::start_with_system_clipboard().await {
        Ok(session) => session,
        Err(e) => return fail(e),
    };
    let capture = match &config.capture_program {
        Some(program) => {
            ScreenCapture::with_command(session.clone(), CaptureCommand::with_program(program))
        }
        None => ScreenCapture::new(session.clone()),
    };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let outcome = capture.capture_selection_to_clipboard(&cancel).await;
    session.close();

    match outcome {
        CaptureOutcome::Captured(image) => {
            let dir = match paths::ensure_app_support_dir() {
                Ok(dir) => dir,
                Err(e) => return fail(e),
            };
            let path = dir.join(LAST_CAPTURE_FILE_NAME);
            if let Err(e) = image.save(&path) {
                return fail(format!("failed to save capture to {}: {e}", path.display()));
            }
            println!("{}x{} {}", image.width(), image.height(), path.display());
            ExitCode::SUCCESS
        }
        CaptureOutcome::NoImage => {
            println!("no image");
            ExitCode::SUCCESS
        }
        CaptureOutcome::Cancelled => {
            println!("cancelled");
            ExitCode::from(130)
        }
        CaptureOutcome::Failed(e) => fail(e),
    }
}

async fn check_install(bundle: Option<PathBuf>) -> ExitCode {
    let bundle = match bundle.map(Ok).unwrap_or_else(paths::current_bundle_path) {
        Ok(bundle) => bundle,
        Err(e) => return fail(e),
    };
    let dirs = match InstallDirs::from_environment() {
        Ok(dirs) => dirs,
        Err(e) => return fail(e),
    };

    let result =
        system::check_install_location_and_role(&bundle, &AdminProbe::default(), &dirs).await;
    println!(
        "in_expected_directory={} admin={}",
        result.is_in_expected_directory, result.is_admin
    );
    ExitCode::SUCCESS
}

/// `on`/`off` from the LaunchAgent, flagging when it disagrees with the saved setting.
fn login_item_status_line(registered: bool, configured: bool) -> String {
    let state = if registered { "on" } else { "off" };
    if registered == configured {
        state.to_string()
    } else {
        let saved = if configured { "on" } else { "off" };
        format!("{state} (config says {saved})")
    }
}

fn login_item(action: LoginItemAction, config: &AppConfig) -> ExitCode {
    let bundle = match paths::current_bundle_path() {
        Ok(bundle) => bundle,
        Err(e) => return fail(e),
    };
    let mut item = match LaunchAgentLoginItem::for_current_user(bundle) {
        Ok(item) => item,
        Err(e) => return fail(e),
    };

    match action {
        LoginItemAction::Status => match item.is_registered() {
            Ok(registered) => {
                if registered != config.launch_at_login {
                    warn!(
                        registered,
                        configured = config.launch_at_login,
                        "Login item differs from saved setting"
                    );
                }
                println!(
                    "{}",
                    login_item_status_line(registered, config.launch_at_login)
                );
                ExitCode::SUCCESS
            }
            Err(e) => fail(e),
        },
        LoginItemAction::On | LoginItemAction::Off => {
            let enabled = action == LoginItemAction::On;
            system::set_launch_at_login(&mut item, enabled);
            config::save_launch_at_login(enabled);
            match item.is_registered() {
                Ok(registered) if registered == enabled => ExitCode::SUCCESS,
                Ok(_) => {
                    warn!(enabled, "Login item state did not change");
                    ExitCode::FAILURE
                }
                Err(e) => fail(e),
            }
        }
    }
}
