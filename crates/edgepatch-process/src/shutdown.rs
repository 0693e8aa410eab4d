use anyhow::{Context, Result};
use edgepatch_core::Platform;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::ProcessTable;

pub const DEFAULT_EXIT_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_EXIT_POLL: Duration = Duration::from_millis(100);

/// How browser processes are recognized by name on each platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessMatcher {
    Exact(String),
    Prefix(String),
}

impl ProcessMatcher {
    pub fn for_platform(platform: Platform) -> Self {
        match platform {
            Platform::Windows => Self::Exact("msedge.exe".to_string()),
            Platform::Linux => Self::Exact("msedge".to_string()),
            // App bundles report "Microsoft Edge", "Microsoft Edge Beta", ...
            Platform::MacOs => Self::Prefix("Microsoft Edge".to_string()),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::Exact(expected) => name == expected,
            Self::Prefix(prefix) => name.starts_with(prefix.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownStatus {
    Terminated,
    NotRunning,
    /// The immediate parent has the same name, so the parent is stopped instead.
    SkippedChild,
    ExeUnavailable,
    KillFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    pub pid: u32,
    pub name: String,
    pub status: ShutdownStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminatedProcess {
    pub pid: u32,
    pub exe: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    pub terminated: Vec<TerminatedProcess>,
    pub outcomes: Vec<ProcessOutcome>,
}

impl ShutdownReport {
    pub fn terminated_pids(&self) -> Vec<u32> {
        self.terminated.iter().map(|process| process.pid).collect()
    }

    pub fn count(&self, status: ShutdownStatus) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.status == status)
            .count()
    }
}

/// Terminates every top-level browser process and records its executable.
///
/// Only enumerating the process table can fail. Per-process problems are
/// recorded in [`ShutdownReport::outcomes`] and never abort the sweep.
pub fn shutdown_browser<T: ProcessTable + ?Sized>(
    table: &mut T,
    matcher: &ProcessMatcher,
) -> Result<ShutdownReport> {
    let entries = table
        .processes()
        .context("failed to enumerate running processes")?;

    let mut report = ShutdownReport::default();
    for entry in entries {
        let Some(name) = entry.name else {
            tracing::debug!(pid = entry.pid, "skipping process with unreadable name");
            continue;
        };
        if !matcher.matches(&name) {
            continue;
        }

        let status = stop_process(table, entry.pid, entry.parent, &name, &mut report);
        tracing::debug!(pid = entry.pid, name = %name, ?status, "browser process visited");
        report.outcomes.push(ProcessOutcome {
            pid: entry.pid,
            name,
            status,
        });
    }
    Ok(report)
}

fn stop_process<T: ProcessTable + ?Sized>(
    table: &mut T,
    pid: u32,
    parent: Option<u32>,
    name: &str,
    report: &mut ShutdownReport,
) -> ShutdownStatus {
    if !table.is_running(pid) {
        return ShutdownStatus::NotRunning;
    }

    let parent_name = parent
        .filter(|ppid| *ppid > 0)
        .and_then(|ppid| table.name(ppid));
    if parent_name.as_deref() == Some(name) {
        return ShutdownStatus::SkippedChild;
    }

    let Some(exe) = table.exe(pid) else {
        return ShutdownStatus::ExeUnavailable;
    };

    if !table.terminate(pid) {
        return ShutdownStatus::KillFailed;
    }
    report.terminated.push(TerminatedProcess { pid, exe });
    ShutdownStatus::Terminated
}

/// Polls until every pid has exited or `timeout` passes; returns the pids
/// still running at the end.
pub fn wait_for_exit<T: ProcessTable + ?Sized>(
    table: &mut T,
    pids: &[u32],
    timeout: Duration,
    poll: Duration,
) -> Vec<u32> {
    let deadline = Instant::now() + timeout;
    let mut remaining = pids.to_vec();
    loop {
        remaining.retain(|pid| table.is_running(*pid));
        if remaining.is_empty() || Instant::now() >= deadline {
            return remaining;
        }
        std::thread::sleep(poll);
    }
}
