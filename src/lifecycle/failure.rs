use crate::audit::Severity;
use crate::lifecycle::relocate::RelocationError;
use crate::resolver::ResolutionError;
use thiserror::Error;

/// Everything that can end an attempt short of success.
///
/// Probe, resolution, encode and digest failures are faults in the pipeline's
/// surroundings. A mismatch or a conformance failure is a verdict about the
/// asset. A filesystem failure risks the archive itself.
#[derive(Debug, Error)]
pub enum Failure {
    #[error("probe failed: {0}")]
    Probe(#[source] framekeeper_av::Error),

    #[error("resolution failed: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("encode failed: {0}")]
    Encode(#[source] framekeeper_av::Error),

    #[error("frame digest failed: {0}")]
    Digest(#[source] framekeeper_av::Error),

    #[error("frame mismatch: {divergent} of {frames} positions differ")]
    VerificationMismatch { frames: usize, divergent: usize },

    #[error("conformance failed: {0}")]
    Conformance(String),

    #[error("filesystem: {0}")]
    Filesystem(#[from] RelocationError),
}

impl Failure {
    pub fn severity(&self) -> Severity {
        match self {
            Failure::Probe(_) | Failure::Resolution(_) | Failure::Encode(_) | Failure::Digest(_) => {
                Severity::Error
            }
            Failure::VerificationMismatch { .. } | Failure::Conformance(_) => Severity::Warning,
            Failure::Filesystem(_) => Severity::Critical,
        }
    }
}
