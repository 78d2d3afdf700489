//! The probed description of a source asset.

use crate::types::*;
use serde::{Deserialize, Serialize};

/// Attributes of an asset's primary video stream, each either known or
/// explicitly unknown.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaProfile {
    pub colour_primaries: Probed<ColourPrimaries>,
    pub matrix_coefficients: Probed<MatrixCoefficients>,
    pub field_order: Probed<FieldOrder>,
    pub frame_rate: Probed<FrameRate>,
    pub aspect_ratio: Probed<AspectRatio>,
    pub height: Probed<Height>,
}

impl MediaProfile {
    /// A profile in which nothing has been recognised.
    pub fn unknown() -> Self {
        Self {
            colour_primaries: Probed::unknown(""),
            matrix_coefficients: Probed::unknown(""),
            field_order: Probed::unknown(""),
            frame_rate: Probed::unknown(""),
            aspect_ratio: Probed::unknown(""),
            height: Probed::unknown(""),
        }
    }

    pub fn is_fully_known(&self) -> bool {
        self.unknown_fields().is_empty()
    }

    /// Names of the fields that are unknown, in declaration order.
    pub fn unknown_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if !self.colour_primaries.is_known() {
            fields.push("colour_primaries");
        }
        if !self.matrix_coefficients.is_known() {
            fields.push("matrix_coefficients");
        }
        if !self.field_order.is_known() {
            fields.push("field_order");
        }
        if !self.frame_rate.is_known() {
            fields.push("frame_rate");
        }
        if !self.aspect_ratio.is_known() {
            fields.push("aspect_ratio");
        }
        if !self.height.is_known() {
            fields.push("height");
        }
        fields
    }

    /// One-line human summary used in logs.
    pub fn summary(&self) -> String {
        format!(
            "height={} dar={} field_order={} primaries={} matrix={} frame_rate={}",
            self.height,
            self.aspect_ratio,
            self.field_order,
            self.colour_primaries,
            self.matrix_coefficients,
            self.frame_rate
        )
    }
}
