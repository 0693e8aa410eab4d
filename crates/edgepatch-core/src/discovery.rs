use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::{Channel, InstallationLayout, Platform};

/// A channel and its user data directory, relative to the home directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelPath {
    pub channel: Channel,
    #[serde(rename = "path")]
    pub relative: PathBuf,
}

impl ChannelPath {
    pub fn new(channel: Channel, relative: impl Into<PathBuf>) -> Self {
        Self {
            channel,
            relative: relative.into(),
        }
    }
}

/// Ordered candidate directories checked for one platform.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChannelTable {
    entries: Vec<ChannelPath>,
}

impl ChannelTable {
    pub fn new(entries: Vec<ChannelPath>) -> Self {
        Self { entries }
    }

    pub fn builtin(platform: Platform) -> Self {
        let (base, dirs): (&[&str], [&str; 4]) = match platform {
            Platform::Windows => (
                &["AppData", "Local", "Microsoft"][..],
                ["Edge", "Edge SxS", "Edge Dev", "Edge Beta"],
            ),
            Platform::Linux => (
                &[".config"][..],
                [
                    "microsoft-edge",
                    "microsoft-edge-canary",
                    "microsoft-edge-dev",
                    "microsoft-edge-beta",
                ],
            ),
            Platform::MacOs => (
                &["Library", "Application Support"][..],
                [
                    "Microsoft Edge",
                    "Microsoft Edge Canary",
                    "Microsoft Edge Dev",
                    "Microsoft Edge Beta",
                ],
            ),
        };

        let entries = Channel::ALL
            .into_iter()
            .zip(dirs)
            .map(|(channel, dir)| {
                let mut relative: PathBuf = base.iter().collect();
                relative.push(dir);
                if platform == Platform::Windows {
                    relative.push("User Data");
                }
                ChannelPath::new(channel, relative)
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[ChannelPath] {
        &self.entries
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installation {
    pub channel: Channel,
    pub layout: InstallationLayout,
}

/// Returns the installations from `table` whose directory exists under `home`.
///
/// Table order is preserved and a channel listed twice keeps its first
/// existing directory.
pub fn discover_installations(home: &Path, table: &ChannelTable) -> Vec<Installation> {
    let mut seen = BTreeSet::new();
    let mut found = Vec::new();
    for entry in table.entries() {
        if seen.contains(&entry.channel) {
            continue;
        }
        let root = home.join(&entry.relative);
        if !root.is_dir() {
            continue;
        }
        seen.insert(entry.channel);
        found.push(Installation {
            channel: entry.channel,
            layout: InstallationLayout::new(root),
        });
    }
    found
}
