mod json_file;
mod local_state;
mod preferences;

pub use local_state::{patch_local_state, DEFAULT_COUNTRY};
pub use preferences::{patch_preferences, ProfileOutcome, ProfileStatus};

/// Result of patching a single configuration document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchStatus {
    Patched,
    AlreadyPatched,
}

/// Whether the patcher should write its changes or only report them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    #[default]
    Write,
    DryRun,
}
