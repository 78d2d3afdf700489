//! MediaInfo-based attribute inspection.
//!
//! Each attribute is read with a raw-language template query
//! (`--Language=raw --Output=Video;%Field%`) so the output is a single
//! untranslated token.

use super::{InspectField, MediaInspector};
use crate::command::ToolCommand;
use crate::Result;
use async_trait::async_trait;
use framekeeper_common::{
    AspectRatio, ColourPrimaries, FieldOrder, FrameRate, Height, MatrixCoefficients,
};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

/// Inspector backed by the `mediainfo` CLI.
#[derive(Debug, Clone)]
pub struct MediaInfoInspector {
    program: PathBuf,
    timeout: Duration,
}

impl MediaInfoInspector {
    pub fn new(program: PathBuf, timeout: Duration) -> Self {
        Self { program, timeout }
    }

    fn template(field: InspectField) -> &'static str {
        match field {
            InspectField::ColourPrimaries => "Video;%colour_primaries%",
            InspectField::MatrixCoefficients => "Video;%matrix_coefficients%",
            InspectField::ScanType => "Video;%ScanType%",
            InspectField::ScanOrder => "Video;%ScanOrder%",
            InspectField::FrameRate => "Video;%FrameRate%",
            InspectField::DisplayAspectRatio => "Video;%DisplayAspectRatio/String%",
            InspectField::Height => "Video;%Height%",
        }
    }
}

#[async_trait]
impl MediaInspector for MediaInfoInspector {
    fn name(&self) -> &'static str {
        "mediainfo"
    }

    async fn inspect(&self, path: &Path, field: InspectField) -> Result<String> {
        let output = ToolCommand::new(self.program.clone())
            .arg("--Language=raw")
            .arg(format!("--Output={}", Self::template(field)))
            .arg(path.to_string_lossy())
            .timeout(self.timeout)
            .execute()
            .await?;

        // Multiple video streams print their values back to back; the first
        // stream is the one that is transcoded.
        Ok(output
            .stdout
            .lines()
            .next()
            .unwrap_or_default()
            .trim()
            .to_string())
    }
}

/// `BT.709` → Bt709; `BT.601` with `NTSC` or `PAL` → the matching BT.601 variant.
pub fn parse_colour_primaries(raw: &str) -> Option<ColourPrimaries> {
    let raw = raw.trim();
    if raw.contains("BT.709") {
        Some(ColourPrimaries::Bt709)
    } else if raw.contains("BT.601") && raw.contains("NTSC") {
        Some(ColourPrimaries::Bt601Ntsc)
    } else if raw.contains("BT.601") && raw.contains("PAL") {
        Some(ColourPrimaries::Bt601Pal)
    } else {
        None
    }
}

pub fn parse_matrix_coefficients(raw: &str) -> Option<MatrixCoefficients> {
    let raw = raw.trim();
    if raw.contains("BT.709") {
        Some(MatrixCoefficients::Bt709)
    } else if raw.contains("BT.601") {
        Some(MatrixCoefficients::Bt601)
    } else if raw.contains("BT.470") {
        Some(MatrixCoefficients::Bt470bg)
    } else {
        None
    }
}

/// Field order from the scan type and scan order answers.
///
/// A progressive scan type wins; otherwise the scan order must say TFF or BFF.
/// Anything else (MBAFF, mixed, empty) is unrecognised.
pub fn parse_field_order(scan_type: &str, scan_order: &str) -> Option<FieldOrder> {
    let scan_type = scan_type.trim().to_uppercase();
    let scan_order = scan_order.trim().to_uppercase();

    if scan_type == "PROGRESSIVE" || scan_order.contains("PROG") {
        return Some(FieldOrder::Progressive);
    }
    match scan_order.as_str() {
        "TFF" => Some(FieldOrder::Tff),
        "BFF" => Some(FieldOrder::Bff),
        _ => None,
    }
}

fn first_number(raw: &str) -> Option<f64> {
    static NUMBER: OnceLock<Option<Regex>> = OnceLock::new();
    NUMBER
        .get_or_init(|| Regex::new(r"\d+(?:\.\d+)?").ok())
        .as_ref()?
        .find(raw)
        .and_then(|m| m.as_str().parse().ok())
}

/// Decimal frame rate (`25.000`, `29.970 FPS`) matched against the known set.
pub fn parse_frame_rate(raw: &str) -> Option<FrameRate> {
    first_number(raw).and_then(FrameRate::from_fps)
}

/// `4:3` / `16:9` / `5:4`, or their decimal forms.
pub fn parse_aspect_ratio(raw: &str) -> Option<AspectRatio> {
    let raw = raw.trim();
    if let Some((w, h)) = raw.split_once(':') {
        let w: f64 = w.trim().parse().ok()?;
        let h: f64 = h.trim().parse().ok()?;
        if h <= 0.0 {
            return None;
        }
        return AspectRatio::from_decimal(w / h);
    }
    first_number(raw).and_then(AspectRatio::from_decimal)
}

/// Height in lines; tolerates thousands separators and a `pixels` suffix
/// (`1 080 pixels`).
pub fn parse_height(raw: &str) -> Option<Height> {
    let digits: String = raw
        .trim()
        .trim_end_matches("pixels")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().and_then(Height::from_lines)
}
