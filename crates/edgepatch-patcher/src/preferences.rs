use anyhow::{anyhow, Result};
use edgepatch_core::InstallationLayout;
use serde_json::{Map, Value};

use crate::json_file::{read_json_document, write_json_document};
use crate::{PatchStatus, WriteMode};

const BROWSER_KEY: &str = "browser";
const ELIGIBILITY_KEY: &str = "chat_ip_eligibility_status";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileStatus {
    Patched,
    AlreadyPatched,
    /// The profile directory has no `Preferences` file.
    Missing,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileOutcome {
    pub profile: String,
    pub status: ProfileStatus,
}

/// Enables the chat eligibility flag in every profile's `Preferences`.
///
/// Only listing the installation root can fail the whole call; each
/// profile reports its own outcome and never stops the others.
pub fn patch_preferences(
    layout: &InstallationLayout,
    mode: WriteMode,
) -> Result<Vec<ProfileOutcome>> {
    let profiles = layout.profile_names()?;

    let mut outcomes = Vec::with_capacity(profiles.len());
    for profile in profiles {
        let status = match patch_profile(layout, &profile, mode) {
            Ok(Some(PatchStatus::Patched)) => ProfileStatus::Patched,
            Ok(Some(PatchStatus::AlreadyPatched)) => ProfileStatus::AlreadyPatched,
            Ok(None) => {
                tracing::debug!(profile = %profile, "profile has no Preferences file");
                ProfileStatus::Missing
            }
            Err(err) => {
                let reason = format!("{err:#}");
                tracing::debug!(profile = %profile, error = %reason, "profile patch failed");
                ProfileStatus::Failed(reason)
            }
        };
        outcomes.push(ProfileOutcome { profile, status });
    }
    Ok(outcomes)
}

fn patch_profile(
    layout: &InstallationLayout,
    profile: &str,
    mode: WriteMode,
) -> Result<Option<PatchStatus>> {
    let path = layout.preferences_path(profile);
    if !path.is_file() {
        return Ok(None);
    }

    let mut document = read_json_document(&path)?;
    if !enable_eligibility(&mut document)
        .map_err(|reason| anyhow!("{reason}: {}", path.display()))?
    {
        return Ok(Some(PatchStatus::AlreadyPatched));
    }

    if mode == WriteMode::Write {
        write_json_document(&path, &document)?;
    }
    Ok(Some(PatchStatus::Patched))
}

/// Sets `browser.chat_ip_eligibility_status` to `true`, returning whether
/// the document changed.
fn enable_eligibility(document: &mut Value) -> Result<bool, &'static str> {
    let Value::Object(fields) = document else {
        return Err("top-level value is not an object");
    };

    let browser = fields
        .entry(BROWSER_KEY)
        .or_insert_with(|| Value::Object(Map::new()));
    let Value::Object(browser) = browser else {
        return Err("'browser' is not an object");
    };

    if browser.get(ELIGIBILITY_KEY) == Some(&Value::Bool(true)) {
        return Ok(false);
    }
    browser.insert(ELIGIBILITY_KEY.to_string(), Value::Bool(true));
    Ok(true)
}
