//! Conformance checking against policy documents.
//!
//! A [`PolicyValidator`] never fails: anything that prevents a clear pass or
//! fail (tool missing, timeout, unreadable policy, unrecognised output) is an
//! [`ConformanceVerdict::Indeterminate`] verdict, which callers must treat as
//! a failure.

use crate::command::ToolCommand;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Result of validating an asset against one or more policies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "lowercase")]
pub enum ConformanceVerdict {
    Pass,
    /// The validator ran and the asset does not conform; `diagnostics` is the
    /// validator's output, verbatim.
    Fail { diagnostics: String },
    /// No verdict could be produced.
    Indeterminate { reason: String },
}

impl ConformanceVerdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }

    /// Combine the verdicts of several alternative policies: any pass passes;
    /// otherwise the failures (diagnostics joined) win over indeterminate.
    pub fn any_of(verdicts: Vec<ConformanceVerdict>) -> ConformanceVerdict {
        if verdicts.is_empty() {
            return Self::Indeterminate {
                reason: "no policy documents configured".to_string(),
            };
        }
        if verdicts.iter().any(Self::is_pass) {
            return Self::Pass;
        }

        let failures: Vec<String> = verdicts
            .iter()
            .filter_map(|v| match v {
                Self::Fail { diagnostics } => Some(diagnostics.clone()),
                _ => None,
            })
            .collect();
        if !failures.is_empty() {
            return Self::Fail {
                diagnostics: failures.join("\n"),
            };
        }

        let reasons: Vec<String> = verdicts
            .into_iter()
            .filter_map(|v| match v {
                Self::Indeterminate { reason } => Some(reason),
                _ => None,
            })
            .collect();
        Self::Indeterminate {
            reason: reasons.join("; "),
        }
    }
}

/// Something that validates a media file against a policy document.
#[async_trait]
pub trait PolicyValidator: Send + Sync {
    /// Human-readable name of this validator (e.g. "mediaconch").
    fn name(&self) -> &'static str;

    async fn validate(&self, path: &Path, policy: &Path) -> ConformanceVerdict;
}

/// Validate against each policy in turn; the asset conforms if any policy
/// passes.
pub async fn check_conformance(
    validator: &dyn PolicyValidator,
    path: &Path,
    policies: &[PathBuf],
) -> ConformanceVerdict {
    let mut verdicts = Vec::with_capacity(policies.len());
    for policy in policies {
        let verdict = validator.validate(path, policy).await;
        if verdict.is_pass() {
            return verdict;
        }
        verdicts.push(verdict);
    }
    ConformanceVerdict::any_of(verdicts)
}

/// Interpret MediaConch's policy report.
///
/// Reports start with `pass!`, `fail!` or `N/A!` followed by the file path
/// and, for failures, the failing rules.
pub fn parse_mediaconch_output(stdout: &str) -> ConformanceVerdict {
    let report = stdout.trim();
    if report.is_empty() {
        return ConformanceVerdict::Indeterminate {
            reason: "mediaconch produced no output".to_string(),
        };
    }
    if report.starts_with("pass!") {
        ConformanceVerdict::Pass
    } else if report.starts_with("fail!") {
        ConformanceVerdict::Fail {
            diagnostics: report.to_string(),
        }
    } else if report.starts_with("N/A!") {
        ConformanceVerdict::Indeterminate {
            reason: format!("policy not applicable: {}", report),
        }
    } else {
        ConformanceVerdict::Indeterminate {
            reason: format!("unrecognised mediaconch output: {}", report),
        }
    }
}

/// Validator backed by the `mediaconch` CLI.
#[derive(Debug, Clone)]
pub struct MediaConchValidator {
    program: PathBuf,
    timeout: Duration,
}

impl MediaConchValidator {
    pub fn new(program: PathBuf, timeout: Duration) -> Self {
        Self { program, timeout }
    }
}

#[async_trait]
impl PolicyValidator for MediaConchValidator {
    fn name(&self) -> &'static str {
        "mediaconch"
    }

    async fn validate(&self, path: &Path, policy: &Path) -> ConformanceVerdict {
        if !policy.is_file() {
            return ConformanceVerdict::Indeterminate {
                reason: format!("policy document not readable: {}", policy.display()),
            };
        }

        let output = ToolCommand::new(self.program.clone())
            .arg("--force")
            .arg("-p")
            .arg(policy.to_string_lossy())
            .arg(path.to_string_lossy())
            .timeout(self.timeout)
            .allow_failure()
            .execute()
            .await;

        match output {
            Ok(out) => {
                let verdict = parse_mediaconch_output(&out.stdout);
                // A crash that printed nothing useful says nothing about the file.
                match verdict {
                    ConformanceVerdict::Indeterminate { reason } if !out.status.success() => {
                        ConformanceVerdict::Indeterminate {
                            reason: format!("{} (exit {}: {})", reason, out.status, out.stderr.trim()),
                        }
                    }
                    other => other,
                }
            }
            Err(e) => ConformanceVerdict::Indeterminate {
                reason: e.to_string(),
            },
        }
    }
}
