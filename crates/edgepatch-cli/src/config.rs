use anyhow::{anyhow, Context, Result};
use edgepatch_core::{Channel, ChannelPath, ChannelTable, Platform};
use edgepatch_patcher::DEFAULT_COUNTRY;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::PatchArgs;

const CONFIG_ENV: &str = "EDGEPATCH_CONFIG";
const CONFIG_DIR: &str = "edgepatch";
const CONFIG_FILE: &str = "config.toml";

/// Optional settings read from `config.toml`; command-line flags win.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct FileConfig {
    pub(crate) country: Option<String>,
    pub(crate) shutdown: Option<bool>,
    pub(crate) restart: Option<bool>,
    pub(crate) pause: Option<bool>,
    /// Per-OS channel tables keyed by `windows`, `linux` or `macos`.
    #[serde(default)]
    pub(crate) channels: BTreeMap<String, Vec<ChannelPath>>,
}

impl FileConfig {
    pub(crate) fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        for key in config.channels.keys() {
            Platform::from_os_name(key)
                .with_context(|| format!("invalid [channels] key '{key}'"))?;
        }
        Ok(config)
    }

    pub(crate) fn channel_table(&self, platform: Platform) -> ChannelTable {
        match self.channels.get(platform.as_str()) {
            Some(entries) => ChannelTable::new(entries.clone()),
            None => ChannelTable::builtin(platform),
        }
    }
}

pub(crate) fn config_home_from(
    platform: Platform,
    lookup: impl Fn(&str) -> Option<String>,
) -> Option<PathBuf> {
    let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
    match platform {
        Platform::Windows => non_empty("APPDATA").map(PathBuf::from),
        Platform::Linux | Platform::MacOs => non_empty("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| non_empty("HOME").map(|home| PathBuf::from(home).join(".config"))),
    }
}

pub(crate) fn default_config_path_from(
    platform: Platform,
    lookup: impl Fn(&str) -> Option<String>,
) -> Option<PathBuf> {
    if let Some(explicit) = lookup(CONFIG_ENV).filter(|value| !value.trim().is_empty()) {
        return Some(PathBuf::from(explicit));
    }
    config_home_from(platform, lookup).map(|home| home.join(CONFIG_DIR).join(CONFIG_FILE))
}

/// Loads `explicit` (which must exist) or the default location (which may not).
pub(crate) fn load_config(explicit: Option<&Path>, platform: Platform) -> Result<FileConfig> {
    let path = match explicit {
        Some(path) => {
            if !path.is_file() {
                return Err(anyhow!("config file not found: {}", path.display()));
            }
            path.to_path_buf()
        }
        None => {
            let Some(path) = default_config_path_from(platform, |name| std::env::var(name).ok())
            else {
                return Ok(FileConfig::default());
            };
            if !path.is_file() {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(FileConfig::default());
            }
            path
        }
    };

    let content = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    FileConfig::parse(&content)
        .with_context(|| format!("failed to parse config: {}", path.display()))
}

/// The fully merged settings for one `patch` run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PatchSettings {
    pub(crate) country: String,
    pub(crate) shutdown: bool,
    pub(crate) restart: bool,
    pub(crate) pause: bool,
    pub(crate) dry_run: bool,
    pub(crate) channels: Vec<Channel>,
    pub(crate) table: ChannelTable,
}

impl PatchSettings {
    pub(crate) fn resolve(
        args: &PatchArgs,
        config: &FileConfig,
        platform: Platform,
        stdin_is_terminal: bool,
    ) -> Result<Self> {
        let country = normalize_country(
            args.country
                .as_deref()
                .or(config.country.as_deref())
                .unwrap_or(DEFAULT_COUNTRY),
        )?;

        let pause = if args.pause {
            true
        } else if args.no_pause {
            false
        } else {
            config
                .pause
                .unwrap_or(platform == Platform::Windows && stdin_is_terminal)
        };

        Ok(Self {
            country,
            shutdown: !args.no_shutdown && config.shutdown.unwrap_or(true),
            restart: !args.no_restart && config.restart.unwrap_or(true),
            pause,
            dry_run: args.dry_run,
            channels: args.channels.clone(),
            table: config.channel_table(platform),
        })
    }

    pub(crate) fn wants_channel(&self, channel: Channel) -> bool {
        self.channels.is_empty() || self.channels.contains(&channel)
    }
}

fn normalize_country(value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.len() != 2 || !trimmed.chars().all(|ch| ch.is_ascii_alphabetic()) {
        return Err(anyhow!(
            "invalid country code '{value}': expected two ASCII letters such as US"
        ));
    }
    Ok(trimmed.to_ascii_uppercase())
}
