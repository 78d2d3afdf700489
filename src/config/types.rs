use framekeeper_av::ToolsConfig;
use framekeeper_common::CodecFamily;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub target: TargetConfig,

    #[serde(default)]
    pub policy: PolicyConfig,

    #[serde(default)]
    pub lifecycle: LifecycleConfig,

    #[serde(default)]
    pub verify: VerifyConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub control: Option<ControlConfig>,
}

/// Locations an asset moves through.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathsConfig {
    /// Where source assets arrive and wait for (re)processing.
    #[serde(default = "default_arrivals")]
    pub arrivals: PathBuf,

    /// Working directory derived assets are encoded into.
    #[serde(default = "default_transcode")]
    pub transcode: PathBuf,

    /// Verified, conformant derived assets.
    #[serde(default = "default_success")]
    pub success: PathBuf,

    /// Derived assets that failed verification or conformance.
    #[serde(default = "default_failure")]
    pub failure: PathBuf,

    /// Sources whose derived asset did not match, held for a person to look at.
    #[serde(default = "default_review")]
    pub review: PathBuf,

    /// Sources handed on after success, when they are relocated rather than deleted.
    #[serde(default)]
    pub completed: Option<PathBuf>,

    /// Archive of frame digest manifests.
    #[serde(default)]
    pub manifests: Option<PathBuf>,

    /// Append-only audit log; entries go to tracing only when unset.
    #[serde(default)]
    pub audit_log: Option<PathBuf>,
}

fn default_arrivals() -> PathBuf {
    PathBuf::from("arrivals")
}
fn default_transcode() -> PathBuf {
    PathBuf::from("transcode")
}
fn default_success() -> PathBuf {
    PathBuf::from("success")
}
fn default_failure() -> PathBuf {
    PathBuf::from("failure")
}
fn default_review() -> PathBuf {
    PathBuf::from("review")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            arrivals: default_arrivals(),
            transcode: default_transcode(),
            success: default_success(),
            failure: default_failure(),
            review: default_review(),
            completed: None,
            manifests: None,
            audit_log: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TargetConfig {
    #[serde(default)]
    pub codec: CodecFamily,

    /// Appended to the source stem to name the derived asset.
    #[serde(default)]
    pub derived_suffix: String,

    /// Source extensions the pipeline accepts.
    #[serde(default = "default_extensions")]
    pub accepted_extensions: Vec<String>,
}

fn default_extensions() -> Vec<String> {
    vec!["mkv".to_string()]
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            codec: CodecFamily::default(),
            derived_suffix: String::new(),
            accepted_extensions: default_extensions(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PolicyConfig {
    /// Conformance policy documents; an asset conforms if any one passes.
    #[serde(default)]
    pub documents: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LifecycleConfig {
    #[serde(default)]
    pub stale_derived: StaleDerivedPolicy,

    #[serde(default)]
    pub on_mismatch: MismatchPolicy,

    #[serde(default)]
    pub failed_derived: DerivedDisposition,

    #[serde(default)]
    pub source_on_success: SourceDisposition,
}

/// What to do when a derived asset already sits at the encode output path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StaleDerivedPolicy {
    /// Abort the attempt without touching anything.
    #[default]
    Block,
    /// Delete the stale file (confirmed) and encode afresh.
    Remove,
}

/// Where the source goes after a frame mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MismatchPolicy {
    /// Move to the review location.
    #[default]
    Review,
    /// Leave in arrivals for another attempt.
    Retry,
}

/// What happens to a derived asset that failed verification or conformance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DerivedDisposition {
    #[default]
    Relocate,
    Delete,
}

/// What happens to the source once its derived asset is safely stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceDisposition {
    #[default]
    Delete,
    /// Move to `paths.completed`.
    Relocate,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VerifyConfig {
    #[serde(default = "default_clamp_low")]
    pub clamp_low: u16,

    #[serde(default = "default_clamp_high")]
    pub clamp_high: u16,
}

fn default_clamp_low() -> u16 {
    4
}
fn default_clamp_high() -> u16 {
    1019
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            clamp_low: default_clamp_low(),
            clamp_high: default_clamp_high(),
        }
    }
}

/// Run-control switch: a JSON object whose boolean `key` says whether
/// processing may run.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControlConfig {
    pub file: PathBuf,
    pub key: String,
}
