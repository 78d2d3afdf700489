//! # framekeeper-av
//!
//! The external tool boundary of framekeeper.
//!
//! This crate provides:
//! - Tool discovery and a timeout-bounded command runner
//! - Probing a file into a [`MediaProfile`](framekeeper_common::MediaProfile)
//!   through a [`MediaInspector`]
//! - Running an encode through an [`EncodingEngine`]
//! - Clamped per-frame digest manifests and their comparison
//! - Policy conformance checks through a [`PolicyValidator`]
//!
//! Each collaborator is a trait with one CLI-backed implementation (mediainfo,
//! ffmpeg, mediaconch), so callers can substitute their own.
//!
//! ## Features
//!
//! - `tracing` - Enable tracing support
//!
//! ## Example
//!
//! ```no_run
//! use framekeeper_av::{probe_profile, MediaInfoInspector};
//! use std::path::{Path, PathBuf};
//! use std::time::Duration;
//!
//! # async fn example() -> framekeeper_av::Result<()> {
//! let inspector = MediaInfoInspector::new(PathBuf::from("mediainfo"), Duration::from_secs(60));
//! let profile = probe_profile(&inspector, Path::new("/arrivals/N_1234.mkv")).await?;
//! println!("{}", profile.summary());
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod conformance;
pub mod encode;
mod error;
pub mod framemd5;
pub mod probe;
pub mod tools;

// Re-exports
pub use command::{ToolCommand, ToolOutput};
pub use conformance::{check_conformance, ConformanceVerdict, MediaConchValidator, PolicyValidator};
pub use encode::{EncodingEngine, FfmpegEncoder};
pub use error::{Error, Result};
pub use framemd5::{
    compare_manifests, verify, ClampRange, DigestOptions, Divergence, FfmpegFrameMd5,
    FrameDigest, FrameDigestManifest, FrameDigester, Verification, VerificationVerdict,
};
pub use probe::{probe_profile, InspectField, MediaInfoInspector, MediaInspector};
pub use tools::{ToolInfo, ToolRegistry, ToolsConfig};
