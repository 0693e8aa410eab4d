mod restart;
mod shutdown;
mod table;

pub use restart::{
    build_launch_command, macos_app_bundle, restart_browsers, restart_browsers_with,
    LaunchOutcome, LaunchStatus,
};
pub use shutdown::{
    shutdown_browser, wait_for_exit, ProcessMatcher, ProcessOutcome, ShutdownReport,
    ShutdownStatus, TerminatedProcess, DEFAULT_EXIT_POLL, DEFAULT_EXIT_TIMEOUT,
};
pub use table::{ProcessEntry, ProcessTable, SysinfoProcessTable};
