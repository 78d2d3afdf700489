//! Closed enumerations describing the video attributes a transcode depends on.
//!
//! Every enumeration here is deliberately small: a value that does not map onto
//! one of the listed members is carried as [`Probed::Unknown`] instead of being
//! approximated.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A probed attribute: either a recognised value or the raw token that could
/// not be recognised.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "lowercase")]
pub enum Probed<T> {
    /// The attribute mapped onto a known enumeration member.
    Known(T),
    /// The attribute was absent or unrecognised; holds what the inspector said.
    Unknown(String),
}

impl<T> Probed<T> {
    /// Construct an unknown value carrying the raw inspector token.
    pub fn unknown(raw: impl Into<String>) -> Self {
        Probed::Unknown(raw.into())
    }

    /// The known value, if any.
    pub fn known(&self) -> Option<&T> {
        match self {
            Probed::Known(value) => Some(value),
            Probed::Unknown(_) => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Probed::Known(_))
    }

    /// Build from an optional parse result, keeping the trimmed raw token on failure.
    pub fn from_parse(parsed: Option<T>, raw: &str) -> Self {
        match parsed {
            Some(value) => Probed::Known(value),
            None => Probed::unknown(raw.trim()),
        }
    }
}

impl<T: fmt::Display> fmt::Display for Probed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Probed::Known(value) => write!(f, "{}", value),
            Probed::Unknown(raw) if raw.is_empty() => write!(f, "unknown"),
            Probed::Unknown(raw) => write!(f, "unknown ({:?})", raw),
        }
    }
}

/// Colour primaries of the video stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColourPrimaries {
    /// ITU-R BT.709.
    Bt709,
    /// BT.601 525-line (NTSC), tagged `smpte170m`.
    Bt601Ntsc,
    /// BT.601 625-line (PAL), tagged `bt470bg`.
    Bt601Pal,
}

impl ColourPrimaries {
    /// Value for ffmpeg's `-color_primaries`.
    pub fn ffmpeg_name(&self) -> &'static str {
        match self {
            Self::Bt709 => "bt709",
            Self::Bt601Ntsc => "smpte170m",
            Self::Bt601Pal => "bt470bg",
        }
    }
}

impl fmt::Display for ColourPrimaries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bt709 => write!(f, "BT.709"),
            Self::Bt601Ntsc => write!(f, "BT.601 NTSC"),
            Self::Bt601Pal => write!(f, "BT.601 PAL"),
        }
    }
}

/// Matrix coefficients of the video stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatrixCoefficients {
    Bt709,
    Bt601,
    Bt470bg,
}

impl MatrixCoefficients {
    /// Value for ffmpeg's `-colorspace`.
    pub fn ffmpeg_name(&self) -> &'static str {
        match self {
            Self::Bt709 => "bt709",
            Self::Bt601 => "smpte170m",
            Self::Bt470bg => "bt470bg",
        }
    }
}

impl fmt::Display for MatrixCoefficients {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bt709 => write!(f, "BT.709"),
            Self::Bt601 => write!(f, "BT.601"),
            Self::Bt470bg => write!(f, "BT.470 BG"),
        }
    }
}

/// Field order (scan order) of the video stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldOrder {
    /// Interlaced, top field first.
    Tff,
    /// Interlaced, bottom field first.
    Bff,
    Progressive,
}

impl FieldOrder {
    /// Value for ffmpeg's `setfield` filter.
    pub fn setfield_value(&self) -> &'static str {
        match self {
            Self::Tff => "tff",
            Self::Bff => "bff",
            Self::Progressive => "prog",
        }
    }
}

impl fmt::Display for FieldOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tff => write!(f, "tff"),
            Self::Bff => write!(f, "bff"),
            Self::Progressive => write!(f, "progressive"),
        }
    }
}

/// Nominal frame rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameRate {
    #[serde(rename = "23.976")]
    Fps23_976,
    #[serde(rename = "24")]
    Fps24,
    #[serde(rename = "25")]
    Fps25,
    #[serde(rename = "29.97")]
    Fps29_97,
    #[serde(rename = "30")]
    Fps30,
    #[serde(rename = "50")]
    Fps50,
    #[serde(rename = "59.94")]
    Fps59_94,
    #[serde(rename = "60")]
    Fps60,
}

/// Tolerance when matching a decimal frame rate against the known set.
const FRAME_RATE_TOLERANCE: f64 = 0.01;

impl FrameRate {
    pub const ALL: [FrameRate; 8] = [
        Self::Fps23_976,
        Self::Fps24,
        Self::Fps25,
        Self::Fps29_97,
        Self::Fps30,
        Self::Fps50,
        Self::Fps59_94,
        Self::Fps60,
    ];

    /// Exact rational rate as (numerator, denominator).
    pub fn rational(&self) -> (u32, u32) {
        match self {
            Self::Fps23_976 => (24000, 1001),
            Self::Fps24 => (24, 1),
            Self::Fps25 => (25, 1),
            Self::Fps29_97 => (30000, 1001),
            Self::Fps30 => (30, 1),
            Self::Fps50 => (50, 1),
            Self::Fps59_94 => (60000, 1001),
            Self::Fps60 => (60, 1),
        }
    }

    pub fn as_f64(&self) -> f64 {
        let (num, den) = self.rational();
        num as f64 / den as f64
    }

    /// Value for ffmpeg's `fps=fps=` filter option.
    pub fn ffmpeg_value(&self) -> String {
        match self.rational() {
            (num, 1) => num.to_string(),
            (num, den) => format!("{}/{}", num, den),
        }
    }

    /// Match a decimal rate (e.g. `29.970`) against the known set.
    pub fn from_fps(fps: f64) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|rate| (rate.as_f64() - fps).abs() < FRAME_RATE_TOLERANCE)
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fps23_976 => write!(f, "23.976"),
            Self::Fps24 => write!(f, "24"),
            Self::Fps25 => write!(f, "25"),
            Self::Fps29_97 => write!(f, "29.97"),
            Self::Fps30 => write!(f, "30"),
            Self::Fps50 => write!(f, "50"),
            Self::Fps59_94 => write!(f, "59.94"),
            Self::Fps60 => write!(f, "60"),
        }
    }
}

/// Display aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "4:3")]
    FourByThree,
    #[serde(rename = "16:9")]
    SixteenByNine,
    #[serde(rename = "5:4")]
    FiveByFour,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 3] = [Self::FourByThree, Self::SixteenByNine, Self::FiveByFour];

    pub fn ratio(&self) -> (u32, u32) {
        match self {
            Self::FourByThree => (4, 3),
            Self::SixteenByNine => (16, 9),
            Self::FiveByFour => (5, 4),
        }
    }

    /// Value for ffmpeg's `setdar` filter (`4/3`).
    pub fn setdar_value(&self) -> String {
        let (w, h) = self.ratio();
        format!("{}/{}", w, h)
    }

    /// Match a decimal ratio (e.g. `1.778`) against the known set.
    pub fn from_decimal(value: f64) -> Option<Self> {
        Self::ALL.into_iter().find(|dar| {
            let (w, h) = dar.ratio();
            (w as f64 / h as f64 - value).abs() < 0.01
        })
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (w, h) = self.ratio();
        write!(f, "{}:{}", w, h)
    }
}

/// Coded picture height in lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Height {
    /// NTSC active picture.
    #[serde(rename = "486")]
    H486,
    /// PAL active picture.
    #[serde(rename = "576")]
    H576,
    /// PAL including 32 lines of vertical blanking.
    #[serde(rename = "608")]
    H608,
    #[serde(rename = "720")]
    H720,
    #[serde(rename = "1080")]
    H1080,
}

impl Height {
    pub const ALL: [Height; 5] = [Self::H486, Self::H576, Self::H608, Self::H720, Self::H1080];

    pub fn lines(&self) -> u32 {
        match self {
            Self::H486 => 486,
            Self::H576 => 576,
            Self::H608 => 608,
            Self::H720 => 720,
            Self::H1080 => 1080,
        }
    }

    pub fn from_lines(lines: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|h| h.lines() == lines)
    }
}

impl fmt::Display for Height {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.lines())
    }
}
