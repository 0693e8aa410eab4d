use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const LAST_VERSION_FILE: &str = "Last Version";
const LOCAL_STATE_FILE: &str = "Local State";
const PREFERENCES_FILE: &str = "Preferences";
const DEFAULT_PROFILE: &str = "Default";
const NAMED_PROFILE_PREFIX: &str = "Profile ";

/// Paths inside one browser installation root (the "User Data" directory).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallationLayout {
    root: PathBuf,
}

impl InstallationLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn last_version_path(&self) -> PathBuf {
        self.root.join(LAST_VERSION_FILE)
    }

    pub fn local_state_path(&self) -> PathBuf {
        self.root.join(LOCAL_STATE_FILE)
    }

    pub fn profile_dir(&self, profile: &str) -> PathBuf {
        self.root.join(profile)
    }

    pub fn preferences_path(&self, profile: &str) -> PathBuf {
        self.profile_dir(profile).join(PREFERENCES_FILE)
    }

    /// Immediate child directories that hold a user profile, sorted by name.
    pub fn profile_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root).with_context(|| {
            format!("failed to read installation root: {}", self.root.display())
        })? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if is_profile_dir_name(&name) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

pub(crate) fn is_profile_dir_name(name: &str) -> bool {
    name == DEFAULT_PROFILE || name.starts_with(NAMED_PROFILE_PREFIX)
}
