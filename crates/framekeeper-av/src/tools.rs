//! External tool detection and configuration.
//!
//! The [`ToolRegistry`] discovers and caches the locations of the external
//! CLI tools the pipeline shells out to (ffmpeg, mediainfo, mediaconch).
//! [`ToolsConfig`] carries path overrides and the per-stage time limits.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Known tool names that the registry manages.
pub const KNOWN_TOOLS: &[&str] = &["ffmpeg", "mediainfo", "mediaconch"];

const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_ENCODE_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);
const DEFAULT_DIGEST_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);
const DEFAULT_VALIDATE_TIMEOUT: Duration = Duration::from_secs(600);

/// Tool path overrides and stage time limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    #[serde(default)]
    pub mediainfo_path: Option<PathBuf>,

    #[serde(default)]
    pub mediaconch_path: Option<PathBuf>,

    /// Limit for each metadata inspection.
    #[serde(
        default = "default_probe_timeout",
        with = "duration_secs",
        rename = "probe_timeout_secs"
    )]
    pub probe_timeout: Duration,

    /// Limit for the transcode itself.
    #[serde(
        default = "default_encode_timeout",
        with = "duration_secs",
        rename = "encode_timeout_secs"
    )]
    pub encode_timeout: Duration,

    /// Limit for producing one frame digest manifest.
    #[serde(
        default = "default_digest_timeout",
        with = "duration_secs",
        rename = "digest_timeout_secs"
    )]
    pub digest_timeout: Duration,

    /// Limit for one policy validation.
    #[serde(
        default = "default_validate_timeout",
        with = "duration_secs",
        rename = "validate_timeout_secs"
    )]
    pub validate_timeout: Duration,
}

fn default_probe_timeout() -> Duration {
    DEFAULT_PROBE_TIMEOUT
}

fn default_encode_timeout() -> Duration {
    DEFAULT_ENCODE_TIMEOUT
}

fn default_digest_timeout() -> Duration {
    DEFAULT_DIGEST_TIMEOUT
}

fn default_validate_timeout() -> Duration {
    DEFAULT_VALIDATE_TIMEOUT
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            mediainfo_path: None,
            mediaconch_path: None,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            encode_timeout: DEFAULT_ENCODE_TIMEOUT,
            digest_timeout: DEFAULT_DIGEST_TIMEOUT,
            validate_timeout: DEFAULT_VALIDATE_TIMEOUT,
        }
    }
}

impl ToolsConfig {
    fn override_for(&self, name: &str) -> Option<&Path> {
        match name {
            "ffmpeg" => self.ffmpeg_path.as_deref(),
            "mediainfo" => self.mediainfo_path.as_deref(),
            "mediaconch" => self.mediaconch_path.as_deref(),
            _ => None,
        }
    }
}

/// Serde helpers to (de)serialize `Duration` as whole seconds.
mod duration_secs {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

/// Availability information for a tool, returned by [`ToolRegistry::check_all`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name.
    pub name: String,
    /// Whether the tool was found.
    pub available: bool,
    /// Version string (first line of version output), if available.
    pub version: Option<String>,
    /// Resolved path to the executable.
    pub path: Option<PathBuf>,
}

/// Registry holding discovered tool locations.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, PathBuf>,
}

impl ToolRegistry {
    /// Discover tools by searching `PATH` (or using overrides from config).
    ///
    /// A configured override is used when it exists on disk; otherwise
    /// [`which::which`] locates the tool. Tools that are not found are
    /// omitted from the registry.
    pub fn discover(config: &ToolsConfig) -> Self {
        let mut tools = HashMap::new();

        for &name in KNOWN_TOOLS {
            let resolved = match config.override_for(name) {
                Some(p) if p.exists() => Some(p.to_path_buf()),
                Some(_p) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("Configured path for {} does not exist: {:?}", name, _p);
                    which::which(name).ok()
                }
                None => which::which(name).ok(),
            };

            if let Some(path) = resolved {
                tools.insert(name.to_string(), path);
            }
        }

        Self { tools }
    }

    /// Path of the given tool, or [`Error::ToolNotFound`] if discovery missed it.
    pub fn require(&self, name: &str) -> Result<&Path> {
        self.tools
            .get(name)
            .map(PathBuf::as_path)
            .ok_or_else(|| Error::tool_not_found(name))
    }

    /// Path of the given tool, falling back to the bare name so that the
    /// failure surfaces when the tool is first invoked.
    pub fn path_or_name(&self, name: &str) -> PathBuf {
        self.tools
            .get(name)
            .cloned()
            .unwrap_or_else(|| PathBuf::from(name))
    }

    /// Check all known tools and return availability information.
    pub fn check_all(&self) -> Vec<ToolInfo> {
        KNOWN_TOOLS
            .iter()
            .map(|&name| match self.tools.get(name) {
                Some(path) => ToolInfo {
                    name: name.to_string(),
                    available: true,
                    version: detect_version(name, path),
                    path: Some(path.clone()),
                },
                None => ToolInfo {
                    name: name.to_string(),
                    available: false,
                    version: None,
                    path: None,
                },
            })
            .collect()
    }
}

/// Run `<tool> --version` (or `-version` for ffmpeg) and return the first
/// non-empty line of stdout.
fn detect_version(name: &str, path: &Path) -> Option<String> {
    let version_arg = match name {
        "ffmpeg" => "-version",
        _ => "--version",
    };

    let output = std::process::Command::new(path)
        .arg(version_arg)
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(|s| s.to_string())
}
