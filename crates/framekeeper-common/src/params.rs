//! Target codec families and the fully-specified parameters of one encode.

use crate::error::Error;
use crate::types::{AspectRatio, ColourPrimaries, FieldOrder, FrameRate, MatrixCoefficients};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The family of derived asset a pipeline produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecFamily {
    /// Uncompressed 10-bit 4:2:2 in QuickTime.
    #[default]
    V210,
    /// FFV1 version 3 in Matroska.
    Ffv1,
}

impl CodecFamily {
    pub const ALL: [CodecFamily; 2] = [Self::V210, Self::Ffv1];

    pub fn container(&self) -> Container {
        match self {
            Self::V210 => Container::Mov,
            Self::Ffv1 => Container::Mkv,
        }
    }
}

impl fmt::Display for CodecFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V210 => write!(f, "v210"),
            Self::Ffv1 => write!(f, "ffv1"),
        }
    }
}

impl FromStr for CodecFamily {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "v210" => Ok(Self::V210),
            "ffv1" => Ok(Self::Ffv1),
            other => Err(Error::unrecognised("codec family", other)),
        }
    }
}

/// Output container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    Mov,
    Mkv,
}

impl Container {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mov => "mov",
            Self::Mkv => "mkv",
        }
    }

    /// Muxer name for ffmpeg's `-f`.
    pub fn ffmpeg_format(&self) -> &'static str {
        match self {
            Self::Mov => "mov",
            Self::Mkv => "matroska",
        }
    }
}

/// Colour metadata written into the derived stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColourTags {
    pub primaries: ColourPrimaries,
    /// Transfer characteristics, as ffmpeg names them.
    pub transfer: String,
    pub matrix: MatrixCoefficients,
    /// Broadcast (tv) range rather than full range.
    pub limited_range: bool,
}

/// A crop window, rendered as ffmpeg's `crop=w:h:x:y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crop {
    pub width: u32,
    pub height: u32,
    pub x: u32,
    pub y: u32,
}

impl fmt::Display for Crop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}:{}", self.width, self.height, self.x, self.y)
    }
}

/// Everything the encoding engine needs to produce a derived asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeParameters {
    /// Name of the preset that produced these parameters.
    pub preset: String,
    pub family: CodecFamily,
    /// Encoder name for `-c:v`.
    pub video_codec: String,
    /// Encoder-specific options, already split into arguments.
    #[serde(default)]
    pub codec_options: Vec<String>,
    /// Human-readable encoder tag stored in the stream metadata.
    #[serde(default)]
    pub encoder_tag: Option<String>,
    #[serde(default)]
    pub colour: Option<ColourTags>,
    #[serde(default)]
    pub field_order: Option<FieldOrder>,
    #[serde(default)]
    pub frame_rate: Option<FrameRate>,
    #[serde(default)]
    pub crop: Option<Crop>,
    #[serde(default)]
    pub display_aspect: Option<AspectRatio>,
    pub container: Container,
    /// `-movflags` values.
    #[serde(default)]
    pub container_flags: Vec<String>,
    /// Drop data streams (`-dn`).
    #[serde(default)]
    pub drop_data_streams: bool,
}

impl EncodeParameters {
    /// The video filter chain, in application order.
    pub fn video_filters(&self) -> Vec<String> {
        let mut filters = Vec::new();
        if let Some(order) = self.field_order {
            filters.push(format!("setfield={}", order.setfield_value()));
        }
        if let Some(rate) = self.frame_rate {
            filters.push(format!("fps=fps={}", rate.ffmpeg_value()));
        }
        if let Some(crop) = self.crop {
            filters.push(format!("crop={}", crop));
        }
        if let Some(dar) = self.display_aspect {
            filters.push(format!("setdar={}", dar.setdar_value()));
        }
        filters
    }
}
