use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;

pub(crate) fn read_json_document(path: &Path) -> Result<Value> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

/// Pretty-prints `document` with two-space indentation and a trailing newline.
pub(crate) fn render_json_document(document: &Value) -> Result<String> {
    let mut rendered =
        serde_json::to_string_pretty(document).context("failed to serialize JSON document")?;
    rendered.push('\n');
    Ok(rendered)
}

/// Serializes fully in memory before touching `path`, so a serialization
/// failure never leaves a truncated file behind.
pub(crate) fn write_json_document(path: &Path, document: &Value) -> Result<()> {
    let rendered = render_json_document(document)
        .with_context(|| format!("failed to serialize {}", path.display()))?;
    fs::write(path, rendered).with_context(|| format!("failed to write {}", path.display()))
}
