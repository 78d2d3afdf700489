use framekeeper_common::CodecFamily;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Where a source asset is in its current attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Arrived,
    Transcoding,
    Verifying,
    ConformanceChecking,
    Succeeded,
    FailedVerification,
    FailedConformance,
    FailedResolution,
    FailedRelocation,
}

impl LifecycleState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded
                | Self::FailedVerification
                | Self::FailedConformance
                | Self::FailedResolution
                | Self::FailedRelocation
        )
    }

    pub fn can_transition_to(&self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Arrived, Transcoding)
                | (Arrived, FailedResolution)
                | (Transcoding, Verifying)
                | (Transcoding, FailedResolution)
                | (Verifying, ConformanceChecking)
                | (Verifying, FailedVerification)
                | (ConformanceChecking, Succeeded)
                | (ConformanceChecking, FailedConformance)
                | (ConformanceChecking, FailedRelocation)
        )
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Arrived => "arrived",
            Self::Transcoding => "transcoding",
            Self::Verifying => "verifying",
            Self::ConformanceChecking => "conformance_checking",
            Self::Succeeded => "succeeded",
            Self::FailedVerification => "failed_verification",
            Self::FailedConformance => "failed_conformance",
            Self::FailedResolution => "failed_resolution",
            Self::FailedRelocation => "failed_relocation",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Source,
    Derived,
}

/// A file the pipeline is acting on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub path: PathBuf,
    pub kind: AssetKind,
    pub family: Option<CodecFamily>,
    pub state: LifecycleState,
}

impl Asset {
    pub fn source(path: PathBuf) -> Self {
        Self {
            path,
            kind: AssetKind::Source,
            family: None,
            state: LifecycleState::Arrived,
        }
    }

    pub fn derived(path: PathBuf, family: CodecFamily) -> Self {
        Self {
            path,
            kind: AssetKind::Derived,
            family: Some(family),
            state: LifecycleState::Transcoding,
        }
    }

    /// File name used to label audit entries.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Move to `next`, refusing transitions the lifecycle does not allow.
    pub fn advance(&mut self, next: LifecycleState) -> Result<(), InvalidTransition> {
        if !self.state.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid lifecycle transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: LifecycleState,
    pub to: LifecycleState,
}

/// Outcome of one `process` invocation, as seen by the external dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalState {
    Succeeded,
    FailedVerification,
    FailedConformance,
    FailedResolution,
    FailedRelocation,
    /// The path was not eligible: already dispositioned or not a source.
    Skipped,
}

impl TerminalState {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Succeeded => 0,
            Self::Skipped => 3,
            Self::FailedVerification => 10,
            Self::FailedConformance => 11,
            Self::FailedResolution => 12,
            Self::FailedRelocation => 13,
        }
    }
}

impl LifecycleState {
    /// The dispatcher-facing outcome of a terminal state.
    pub fn terminal(&self) -> Option<TerminalState> {
        match self {
            LifecycleState::Succeeded => Some(TerminalState::Succeeded),
            LifecycleState::FailedVerification => Some(TerminalState::FailedVerification),
            LifecycleState::FailedConformance => Some(TerminalState::FailedConformance),
            LifecycleState::FailedResolution => Some(TerminalState::FailedResolution),
            LifecycleState::FailedRelocation => Some(TerminalState::FailedRelocation),
            _ => None,
        }
    }
}

impl fmt::Display for TerminalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Succeeded => "succeeded",
            Self::FailedVerification => "failed_verification",
            Self::FailedConformance => "failed_conformance",
            Self::FailedResolution => "failed_resolution",
            Self::FailedRelocation => "failed_relocation",
            Self::Skipped => "skipped",
        };
        write!(f, "{}", name)
    }
}
