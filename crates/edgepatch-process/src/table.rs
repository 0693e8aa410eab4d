use anyhow::Result;
use std::path::PathBuf;
use sysinfo::{
    Pid, ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, Signal, System, UpdateKind,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    pub pid: u32,
    pub parent: Option<u32>,
    /// `None` when the OS reports a name that cannot be read as UTF-8.
    pub name: Option<String>,
}

/// Read and signal access to the OS process table.
pub trait ProcessTable {
    fn processes(&mut self) -> Result<Vec<ProcessEntry>>;

    fn name(&mut self, pid: u32) -> Option<String>;

    fn is_running(&mut self, pid: u32) -> bool;

    fn exe(&mut self, pid: u32) -> Option<PathBuf>;

    /// Asks the process to exit; returns whether the signal was delivered.
    fn terminate(&mut self, pid: u32) -> bool;
}

pub struct SysinfoProcessTable {
    system: System,
}

impl SysinfoProcessTable {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }

    fn refresh(&mut self, processes: ProcessesToUpdate<'_>) {
        self.system.refresh_processes_specifics(
            processes,
            true,
            ProcessRefreshKind::nothing().with_exe(UpdateKind::OnlyIfNotSet),
        );
    }
}

impl Default for SysinfoProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTable for SysinfoProcessTable {
    fn processes(&mut self) -> Result<Vec<ProcessEntry>> {
        self.refresh(ProcessesToUpdate::All);

        let mut entries = self
            .system
            .processes()
            .iter()
            .map(|(pid, process)| ProcessEntry {
                pid: pid.as_u32(),
                parent: process.parent().map(Pid::as_u32),
                name: process.name().to_str().map(str::to_string),
            })
            .collect::<Vec<_>>();
        entries.sort_by_key(|entry| entry.pid);
        Ok(entries)
    }

    fn name(&mut self, pid: u32) -> Option<String> {
        self.system
            .process(Pid::from_u32(pid))
            .and_then(|process| process.name().to_str())
            .map(str::to_string)
    }

    fn is_running(&mut self, pid: u32) -> bool {
        let pid = Pid::from_u32(pid);
        self.refresh(ProcessesToUpdate::Some(&[pid]));
        self.system.process(pid).is_some_and(|process| {
            !matches!(
                process.status(),
                ProcessStatus::Zombie | ProcessStatus::Dead
            )
        })
    }

    fn exe(&mut self, pid: u32) -> Option<PathBuf> {
        self.system
            .process(Pid::from_u32(pid))
            .and_then(|process| process.exe())
            .map(|path| path.to_path_buf())
    }

    fn terminate(&mut self, pid: u32) -> bool {
        let Some(process) = self.system.process(Pid::from_u32(pid)) else {
            return false;
        };
        // Windows has no SIGTERM; kill_with returns None there.
        match process.kill_with(Signal::Term) {
            Some(sent) => sent,
            None => process.kill(),
        }
    }
}
