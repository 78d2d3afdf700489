mod types;

pub use types::*;

use anyhow::{Context, Result};
use framekeeper_av::ClampRange;
use framekeeper_common::paths;
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./framekeeper.toml",
        "~/.config/framekeeper/config.toml",
        "/etc/framekeeper/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

impl VerifyConfig {
    pub fn clamp_range(&self) -> Result<ClampRange> {
        ClampRange::new(self.clamp_low, self.clamp_high).context("Invalid [verify] clamp range")
    }
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.policy.documents.is_empty() {
        anyhow::bail!("At least one conformance policy document must be configured");
    }
    for doc in &config.policy.documents {
        if !doc.exists() {
            tracing::warn!("Policy document does not exist: {:?}", doc);
        }
    }

    config.verify.clamp_range()?;

    if config.target.accepted_extensions.is_empty() {
        anyhow::bail!("No accepted source extensions configured");
    }

    let paths = &config.paths;
    let mut roles = vec![
        ("arrivals", &paths.arrivals),
        ("transcode", &paths.transcode),
        ("success", &paths.success),
        ("failure", &paths.failure),
        ("review", &paths.review),
    ];
    if let Some(ref completed) = paths.completed {
        roles.push(("completed", completed));
    }
    for (i, (name_a, a)) in roles.iter().enumerate() {
        for (name_b, b) in &roles[i + 1..] {
            if paths::overlaps(a, b) {
                anyhow::bail!(
                    "paths.{} and paths.{} must differ and not contain one another ({:?}, {:?})",
                    name_a,
                    name_b,
                    a,
                    b
                );
            }
        }
    }

    if config.lifecycle.source_on_success == SourceDisposition::Relocate && paths.completed.is_none()
    {
        anyhow::bail!("lifecycle.source_on_success = \"relocate\" requires paths.completed");
    }

    if let Some(ref control) = config.control {
        if control.key.is_empty() {
            anyhow::bail!("control.key cannot be empty");
        }
    }

    Ok(())
}
