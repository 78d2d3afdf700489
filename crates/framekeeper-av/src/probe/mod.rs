//! Metadata probing.
//!
//! A [`MediaInspector`] answers one attribute query at a time with the raw
//! text an inspection tool prints. [`probe_profile`] asks for every attribute
//! a transcode depends on and maps each answer onto its closed enumeration,
//! keeping anything unrecognised as [`Probed::Unknown`].

mod mediainfo;

pub use mediainfo::{
    parse_aspect_ratio, parse_colour_primaries, parse_field_order, parse_frame_rate,
    parse_height, parse_matrix_coefficients, MediaInfoInspector,
};

use crate::{Error, Result};
use async_trait::async_trait;
use framekeeper_common::{MediaProfile, Probed};
use std::fmt;
use std::path::Path;

/// A single attribute of the primary video stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InspectField {
    ColourPrimaries,
    MatrixCoefficients,
    /// Interlaced / progressive.
    ScanType,
    /// TFF / BFF.
    ScanOrder,
    FrameRate,
    DisplayAspectRatio,
    Height,
}

impl InspectField {
    pub const ALL: [InspectField; 7] = [
        Self::ColourPrimaries,
        Self::MatrixCoefficients,
        Self::ScanType,
        Self::ScanOrder,
        Self::FrameRate,
        Self::DisplayAspectRatio,
        Self::Height,
    ];
}

impl fmt::Display for InspectField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ColourPrimaries => "colour primaries",
            Self::MatrixCoefficients => "matrix coefficients",
            Self::ScanType => "scan type",
            Self::ScanOrder => "scan order",
            Self::FrameRate => "frame rate",
            Self::DisplayAspectRatio => "display aspect ratio",
            Self::Height => "height",
        };
        f.write_str(name)
    }
}

/// Something that can report raw attribute values of a media file.
#[async_trait]
pub trait MediaInspector: Send + Sync {
    /// Human-readable name of this inspector (e.g. "mediainfo").
    fn name(&self) -> &'static str;

    /// Raw value of `field` for the file at `path`. An empty string means the
    /// inspector ran but reported nothing.
    async fn inspect(&self, path: &Path, field: InspectField) -> Result<String>;
}

/// Probe `path` into a [`MediaProfile`].
///
/// Inspector failures (missing tool, non-zero exit, timeout) are errors; an
/// answer that does not map onto a known value is not, it becomes
/// [`Probed::Unknown`].
pub async fn probe_profile(inspector: &dyn MediaInspector, path: &Path) -> Result<MediaProfile> {
    if !path.exists() {
        return Err(Error::file_not_found(path));
    }

    let primaries = inspector.inspect(path, InspectField::ColourPrimaries).await?;
    let matrix = inspector
        .inspect(path, InspectField::MatrixCoefficients)
        .await?;
    let scan_type = inspector.inspect(path, InspectField::ScanType).await?;
    let scan_order = inspector.inspect(path, InspectField::ScanOrder).await?;
    let frame_rate = inspector.inspect(path, InspectField::FrameRate).await?;
    let dar = inspector
        .inspect(path, InspectField::DisplayAspectRatio)
        .await?;
    let height = inspector.inspect(path, InspectField::Height).await?;

    let field_order_raw = format!("{} {}", scan_type.trim(), scan_order.trim());

    let profile = MediaProfile {
        colour_primaries: Probed::from_parse(parse_colour_primaries(&primaries), &primaries),
        matrix_coefficients: Probed::from_parse(parse_matrix_coefficients(&matrix), &matrix),
        field_order: Probed::from_parse(
            parse_field_order(&scan_type, &scan_order),
            &field_order_raw,
        ),
        frame_rate: Probed::from_parse(parse_frame_rate(&frame_rate), &frame_rate),
        aspect_ratio: Probed::from_parse(parse_aspect_ratio(&dar), &dar),
        height: Probed::from_parse(parse_height(&height), &height),
    };

    #[cfg(feature = "tracing")]
    tracing::debug!(
        "Probed {} with {}: {}",
        path.display(),
        inspector.name(),
        profile.summary()
    );

    Ok(profile)
}
