use anyhow::{Context, Result};
use edgepatch_core::Platform;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::TerminatedProcess;

const START_MAXIMIZED_ARG: &str = "--start-maximized";
const MACOS_APP_NAME: &str = "Microsoft Edge";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchStatus {
    Started { pid: u32 },
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOutcome {
    pub exe: PathBuf,
    pub status: LaunchStatus,
}

/// The outermost `.app` bundle that contains `exe`, if any. Helper
/// executables live in nested bundles inside the browser's own bundle.
pub fn macos_app_bundle(exe: &Path) -> Option<&Path> {
    exe.ancestors()
        .filter(|ancestor| ancestor.extension().is_some_and(|ext| ext == "app"))
        .last()
}

pub fn build_launch_command(platform: Platform, exe: &Path) -> Command {
    match platform {
        Platform::Windows | Platform::Linux => {
            let mut command = Command::new(exe);
            command.arg(START_MAXIMIZED_ARG);
            command
        }
        Platform::MacOs => {
            let mut command = Command::new("open");
            command.arg("-a");
            match macos_app_bundle(exe) {
                Some(bundle) => command.arg(bundle),
                None => command.arg(MACOS_APP_NAME),
            };
            command.arg("--args").arg(START_MAXIMIZED_ARG);
            command
        }
    }
}

/// Launches one detached browser per terminated process, in order.
pub fn restart_browsers(
    platform: Platform,
    terminated: &[TerminatedProcess],
) -> Vec<LaunchOutcome> {
    restart_browsers_with(platform, terminated, spawn_detached)
}

pub fn restart_browsers_with<F>(
    platform: Platform,
    terminated: &[TerminatedProcess],
    mut launcher: F,
) -> Vec<LaunchOutcome>
where
    F: FnMut(&mut Command) -> Result<u32>,
{
    terminated
        .iter()
        .map(|process| {
            let mut command = build_launch_command(platform, &process.exe);
            let status = match launcher(&mut command) {
                Ok(pid) => LaunchStatus::Started { pid },
                Err(err) => LaunchStatus::Failed(format!("{err:#}")),
            };
            LaunchOutcome {
                exe: process.exe.clone(),
                status,
            }
        })
        .collect()
}

fn spawn_detached(command: &mut Command) -> Result<u32> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    detach_child(command);

    let program = command.get_program().to_string_lossy().into_owned();
    let child = command
        .spawn()
        .with_context(|| format!("failed to launch {program}"))?;
    Ok(child.id())
}

#[cfg(unix)]
fn detach_child(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(windows)]
fn detach_child(command: &mut Command) {
    use std::os::windows::process::CommandExt;
    // CREATE_NEW_PROCESS_GROUP | DETACHED_PROCESS
    command.creation_flags(0x0000_0208);
}

#[cfg(not(any(unix, windows)))]
fn detach_child(_command: &mut Command) {}
