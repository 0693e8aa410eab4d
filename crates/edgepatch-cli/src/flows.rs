use anyhow::{anyhow, Result};
use edgepatch_core::{
    discover_installations, read_last_version, BrowserVersion, Channel, Installation,
    InstallationLayout, Platform,
};
use edgepatch_patcher::{
    patch_local_state, patch_preferences, PatchStatus, ProfileOutcome, ProfileStatus, WriteMode,
};
use edgepatch_process::{
    restart_browsers, shutdown_browser, wait_for_exit, LaunchOutcome, LaunchStatus,
    ProcessMatcher, ShutdownReport, ShutdownStatus, SysinfoProcessTable, DEFAULT_EXIT_POLL,
    DEFAULT_EXIT_TIMEOUT,
};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use crate::config::PatchSettings;
use crate::render::{render_status_line, OutputStyle, TerminalRenderer};

/// Everything that happened to one installation during a patch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InstallationReport {
    pub(crate) channel: Channel,
    pub(crate) root: PathBuf,
    pub(crate) version: Result<String, String>,
    pub(crate) local_state: Option<Result<PatchStatus, String>>,
    pub(crate) preferences: Option<Result<Vec<ProfileOutcome>, String>>,
}

impl InstallationReport {
    fn failures(&self) -> usize {
        let version = usize::from(self.version.is_err());
        let local_state = usize::from(matches!(self.local_state, Some(Err(_))));
        let preferences = match &self.preferences {
            Some(Err(_)) => 1,
            Some(Ok(outcomes)) => outcomes
                .iter()
                .filter(|outcome| matches!(outcome.status, ProfileStatus::Failed(_)))
                .count(),
            None => 0,
        };
        version + local_state + preferences
    }
}

/// Reads the version marker and, when it is valid, patches Local State and
/// every profile's Preferences. Never fails; problems land in the report.
pub(crate) fn patch_installation(
    installation: &Installation,
    country: &str,
    mode: WriteMode,
) -> InstallationReport {
    let layout = &installation.layout;
    let version = read_last_version(layout)
        .and_then(|raw| BrowserVersion::parse(&raw))
        .map(|version| version.to_string())
        .map_err(|err| format!("{err:#}"));

    let mut report = InstallationReport {
        channel: installation.channel,
        root: layout.root().to_path_buf(),
        version,
        local_state: None,
        preferences: None,
    };
    if report.version.is_err() {
        return report;
    }

    report.local_state =
        Some(patch_local_state(layout, country, mode).map_err(|err| format!("{err:#}")));
    report.preferences =
        Some(patch_preferences(layout, mode).map_err(|err| format!("{err:#}")));
    report
}

pub(crate) fn format_installation_lines(
    report: &InstallationReport,
    style: OutputStyle,
    mode: WriteMode,
) -> Vec<String> {
    let version = match &report.version {
        Ok(version) => version,
        Err(reason) => {
            return vec![render_status_line(
                style,
                "err",
                &format!("Failed to get version of Edge {}: {reason}", report.channel),
            )];
        }
    };

    let mut lines = vec![render_status_line(
        style,
        "step",
        &format!(
            "Patching Edge {} {} \"{}\"",
            report.channel,
            version,
            report.root.display()
        ),
    )];

    let patched = match mode {
        WriteMode::Write => "Succeeded in patching",
        WriteMode::DryRun => "Would patch",
    };

    match &report.local_state {
        Some(Ok(PatchStatus::Patched)) => lines.push(render_status_line(
            style,
            "ok",
            &format!("{patched} Local State"),
        )),
        Some(Ok(PatchStatus::AlreadyPatched)) => lines.push(render_status_line(
            style,
            "step",
            "No need to patch Local State",
        )),
        Some(Err(reason)) => lines.push(render_status_line(
            style,
            "err",
            &format!("Error patching Local State: {reason}"),
        )),
        None => {}
    }

    match &report.preferences {
        Some(Ok(outcomes)) => {
            for outcome in outcomes {
                let profile = &outcome.profile;
                let line = match &outcome.status {
                    ProfileStatus::Patched => render_status_line(
                        style,
                        "ok",
                        &format!("{patched} Preferences of {profile}"),
                    ),
                    ProfileStatus::AlreadyPatched => render_status_line(
                        style,
                        "step",
                        &format!("No need to patch Preferences of {profile}"),
                    ),
                    ProfileStatus::Missing => continue,
                    ProfileStatus::Failed(reason) => render_status_line(
                        style,
                        "err",
                        &format!("Failed to patch Preferences of {profile}: {reason}"),
                    ),
                };
                lines.push(line);
            }
        }
        Some(Err(reason)) => lines.push(render_status_line(
            style,
            "err",
            &format!("Error patching Preferences: {reason}"),
        )),
        None => {}
    }

    lines
}

pub(crate) fn format_shutdown_lines(report: &ShutdownReport, style: OutputStyle) -> Vec<String> {
    let mut lines = Vec::new();
    if !report.terminated.is_empty() {
        lines.push(render_status_line(
            style,
            "ok",
            &format!("Shutdown Edge ({} process(es))", report.terminated.len()),
        ));
    }

    let failed =
        report.count(ShutdownStatus::KillFailed) + report.count(ShutdownStatus::ExeUnavailable);
    if failed > 0 {
        lines.push(render_status_line(
            style,
            "warn",
            &format!("{failed} Edge process(es) could not be stopped"),
        ));
    }
    lines
}

pub(crate) fn format_restart_lines(outcomes: &[LaunchOutcome], style: OutputStyle) -> Vec<String> {
    outcomes
        .iter()
        .map(|outcome| match &outcome.status {
            LaunchStatus::Started { .. } => render_status_line(
                style,
                "ok",
                &format!("Starting: {}", outcome.exe.display()),
            ),
            LaunchStatus::Failed(reason) => render_status_line(
                style,
                "err",
                &format!("Failed to start {}: {reason}", outcome.exe.display()),
            ),
        })
        .collect()
}

pub(crate) fn select_installations(
    settings: &PatchSettings,
    installations: Vec<Installation>,
) -> Result<Vec<Installation>> {
    if installations.is_empty() {
        return Err(anyhow!("no available user data path found"));
    }

    let selected = installations
        .into_iter()
        .filter(|installation| settings.wants_channel(installation.channel))
        .collect::<Vec<_>>();
    if selected.is_empty() {
        let requested = settings
            .channels
            .iter()
            .map(Channel::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        return Err(anyhow!("no installation found for channel(s): {requested}"));
    }
    Ok(selected)
}

pub(crate) fn run_patch(
    settings: &PatchSettings,
    platform: Platform,
    renderer: TerminalRenderer,
) -> Result<()> {
    let style = renderer.style();
    let mode = if settings.dry_run {
        WriteMode::DryRun
    } else {
        WriteMode::Write
    };

    let home = platform.home_dir()?;
    let installations = select_installations(
        settings,
        discover_installations(&home, &settings.table),
    )?;

    let mut table = SysinfoProcessTable::new();
    let mut shutdown = ShutdownReport::default();
    if settings.shutdown && mode == WriteMode::Write {
        renderer.print_section("shutdown");
        match shutdown_browser(&mut table, &ProcessMatcher::for_platform(platform)) {
            Ok(report) => {
                for line in format_shutdown_lines(&report, style) {
                    println!("{line}");
                }
                let still_running = wait_for_exit(
                    &mut table,
                    &report.terminated_pids(),
                    DEFAULT_EXIT_TIMEOUT,
                    DEFAULT_EXIT_POLL,
                );
                if !still_running.is_empty() {
                    renderer.print_warning(&format!(
                        "Edge process(es) still running after shutdown: {still_running:?}"
                    ));
                }
                shutdown = report;
            }
            Err(err) => renderer.print_warning(&format!("Failed to shutdown Edge: {err:#}")),
        }
    }

    renderer.print_section("patch");
    let mut progress = renderer.start_progress("patch", installations.len() as u64);
    let mut failures = 0;
    for installation in &installations {
        let report = patch_installation(installation, &settings.country, mode);
        failures += report.failures();
        progress.print_lines(&format_installation_lines(&report, style, mode));
        progress.advance();
    }
    progress.finish();

    if settings.restart && !shutdown.terminated.is_empty() {
        renderer.print_section("restart");
        renderer.print_status("step", "Restart Edge");
        let outcomes = restart_browsers(platform, &shutdown.terminated);
        for line in format_restart_lines(&outcomes, style) {
            println!("{line}");
        }
    }

    if failures > 0 {
        renderer.print_status(
            "warn",
            &format!("Finished with {failures} error(s); see messages above"),
        );
    } else {
        renderer.print_status("ok", "Done");
    }

    if settings.pause {
        pause_for_enter()?;
    }
    Ok(())
}

pub(crate) fn format_doctor_lines(
    platform: Platform,
    home: &Path,
    settings: &PatchSettings,
) -> Vec<String> {
    let mut lines = vec![
        format!("platform: {platform}"),
        format!("home: {}", home.display()),
        format!("country: {}", settings.country),
    ];
    for entry in settings.table.entries() {
        let layout = InstallationLayout::new(home.join(&entry.relative));
        if !layout.root().is_dir() {
            lines.push(format!(
                "{}: missing ({})",
                entry.channel,
                layout.root().display()
            ));
            continue;
        }
        let version =
            read_last_version(&layout).unwrap_or_else(|err| format!("unknown ({err:#})"));
        lines.push(format!(
            "{}: {} ({})",
            entry.channel,
            version,
            layout.root().display()
        ));
    }
    lines
}

pub(crate) fn run_doctor(settings: &PatchSettings, platform: Platform) -> Result<()> {
    let home = platform.home_dir()?;
    for line in format_doctor_lines(platform, &home, settings) {
        println!("{line}");
    }
    Ok(())
}

fn pause_for_enter() -> Result<()> {
    print!("\nPress Enter to continue...");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(())
}
