use anyhow::{anyhow, Context, Result};
use std::fmt;
use std::fs;

use crate::InstallationLayout;

/// Reads the trimmed contents of the installation's `Last Version` marker.
pub fn read_last_version(layout: &InstallationLayout) -> Result<String> {
    let path = layout.last_version_path();
    if !path.exists() {
        return Err(anyhow!("file not found: {}", path.display()));
    }

    let value = fs::read_to_string(&path)
        .with_context(|| format!("failed to read version marker: {}", path.display()))?;
    Ok(value.trim().to_string())
}

/// A dotted numeric browser version such as `120.0.2210.91`, kept exactly
/// as written in the marker file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserVersion {
    raw: String,
}

impl BrowserVersion {
    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        let well_formed = !trimmed.is_empty()
            && trimmed
                .split('.')
                .all(|part| !part.is_empty() && part.bytes().all(|byte| byte.is_ascii_digit()));
        if !well_formed {
            return Err(anyhow!("invalid version format: '{value}'"));
        }
        Ok(Self {
            raw: trimmed.to_string(),
        })
    }
}

impl fmt::Display for BrowserVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
