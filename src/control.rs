//! Run-control switch read before processing.

use crate::config::ControlConfig;
use anyhow::{Context, Result};

/// Whether processing may run, per the control file's boolean `key`.
pub fn run_permitted(control: &ControlConfig) -> Result<bool> {
    let content = std::fs::read_to_string(&control.file)
        .with_context(|| format!("Failed to read control file: {:?}", control.file))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse control file: {:?}", control.file))?;

    value
        .get(&control.key)
        .and_then(serde_json::Value::as_bool)
        .with_context(|| {
            format!(
                "Control file {:?} has no boolean '{}'",
                control.file, control.key
            )
        })
}
