use anyhow::{anyhow, Result};
use edgepatch_core::InstallationLayout;
use serde_json::Value;

use crate::json_file::{read_json_document, write_json_document};
use crate::{PatchStatus, WriteMode};

pub const DEFAULT_COUNTRY: &str = "US";

const COUNTRY_KEY: &str = "variations_country";

/// Sets the installation-wide `variations_country` to `country`, writing
/// `Local State` only when the stored value differs.
pub fn patch_local_state(
    layout: &InstallationLayout,
    country: &str,
    mode: WriteMode,
) -> Result<PatchStatus> {
    let path = layout.local_state_path();
    if !path.is_file() {
        return Err(anyhow!(
            "failed to patch Local State: file not found: {}",
            path.display()
        ));
    }

    let mut document = read_json_document(&path)?;
    let Value::Object(fields) = &mut document else {
        return Err(anyhow!(
            "failed to patch Local State: top-level value is not an object: {}",
            path.display()
        ));
    };

    if fields.get(COUNTRY_KEY).and_then(Value::as_str) == Some(country) {
        return Ok(PatchStatus::AlreadyPatched);
    }

    tracing::debug!(
        path = %path.display(),
        previous = ?fields.get(COUNTRY_KEY),
        country,
        "updating variations country"
    );
    fields.insert(COUNTRY_KEY.to_string(), Value::String(country.to_string()));
    if mode == WriteMode::Write {
        write_json_document(&path, &document)?;
    }
    Ok(PatchStatus::Patched)
}
