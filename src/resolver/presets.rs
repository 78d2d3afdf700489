//! Rule tables for each target codec family.
//!
//! # V210 (uncompressed 10-bit 4:2:2 in QuickTime)
//!
//! Rules are keyed on height, display aspect ratio, field order and colour
//! primaries. Colour tags and field order are written from the preset, the
//! frame rate is carried over from the source.
//!
//! | Preset                                 | Height     | DAR  | Field | Primaries |
//! |----------------------------------------|------------|------|-------|-----------|
//! | SD 4:3 PAL interlaced                  | 576        | 4:3  | TFF   | BT.601 PAL |
//! | SD 16:9 PAL interlaced                 | 576        | 16:9 | TFF   | BT.601 PAL |
//! | SD 4:3 PAL interlaced (cropped from 608) | 608      | any  | TFF   | BT.601 PAL |
//! | SD 4:3 NTSC interlaced                 | 486        | 4:3  | BFF   | BT.601 NTSC |
//! | HD 16:9 interlaced                     | 1080       | 16:9 | TFF   | BT.709    |
//! | HD 16:9 progressive                    | 1080, 720  | 16:9 | prog  | BT.709    |
//!
//! # FFV1 (version 3 in Matroska)
//!
//! Rules are keyed on field order and the colour triplet; everything they
//! reference is passed through to the derived stream.

use super::matcher::RuleConditions;
use framekeeper_common::{
    AspectRatio, CodecFamily, ColourPrimaries, Crop, FieldOrder, FrameRate, Height,
    MatrixCoefficients,
};

/// Where a preset takes a setting from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source<T> {
    /// Always this value.
    Fixed(T),
    /// Copied from the probed profile; an unknown value fails resolution.
    FromProfile,
    /// Not written.
    Omit,
}

/// Primaries and matrix written together as the colour tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColourPair {
    pub primaries: ColourPrimaries,
    pub matrix: MatrixCoefficients,
}

/// A named parameter set.
#[derive(Debug, Clone, Copy)]
pub struct Preset {
    pub name: &'static str,
    pub video_codec: &'static str,
    pub codec_options: &'static [&'static str],
    pub encoder_tag: Option<&'static str>,
    pub colour: Source<ColourPair>,
    /// Transfer characteristics written alongside the colour tags.
    pub transfer: &'static str,
    pub field_order: Source<FieldOrder>,
    pub frame_rate: Source<FrameRate>,
    pub crop: Option<Crop>,
    pub display_aspect: Option<AspectRatio>,
    pub container_flags: &'static [&'static str],
    pub drop_data_streams: bool,
}

/// A rule selecting a preset for profiles that satisfy its conditions.
#[derive(Debug, Clone, Copy)]
pub struct ResolutionRule {
    pub family: CodecFamily,
    pub conditions: RuleConditions,
    pub preset: Preset,
}

impl ResolutionRule {
    pub fn name(&self) -> &'static str {
        self.preset.name
    }
}

const PAL: ColourPair = ColourPair {
    primaries: ColourPrimaries::Bt601Pal,
    matrix: MatrixCoefficients::Bt470bg,
};

const NTSC: ColourPair = ColourPair {
    primaries: ColourPrimaries::Bt601Ntsc,
    matrix: MatrixCoefficients::Bt601,
};

const HD: ColourPair = ColourPair {
    primaries: ColourPrimaries::Bt709,
    matrix: MatrixCoefficients::Bt709,
};

const fn v210(
    name: &'static str,
    colour: ColourPair,
    field_order: FieldOrder,
    crop: Option<Crop>,
    display_aspect: AspectRatio,
) -> Preset {
    Preset {
        name,
        video_codec: "v210",
        codec_options: &[],
        encoder_tag: Some("Uncompressed 10-bit 4:2:2"),
        colour: Source::Fixed(colour),
        transfer: "bt709",
        field_order: Source::Fixed(field_order),
        frame_rate: Source::FromProfile,
        crop,
        display_aspect: Some(display_aspect),
        container_flags: &["write_colr"],
        drop_data_streams: true,
    }
}

const fn ffv1(name: &'static str) -> Preset {
    Preset {
        name,
        video_codec: "ffv1",
        codec_options: &["-level", "3", "-g", "1", "-slicecrc", "1", "-slices", "24"],
        encoder_tag: None,
        colour: Source::FromProfile,
        transfer: "bt709",
        field_order: Source::FromProfile,
        frame_rate: Source::FromProfile,
        crop: None,
        display_aspect: None,
        container_flags: &[],
        drop_data_streams: false,
    }
}

/// 608-line PAL captures carry 32 lines of VBI above the picture.
const PAL_608_CROP: Crop = Crop {
    width: 720,
    height: 576,
    x: 0,
    y: 32,
};

pub static V210_RULES: &[ResolutionRule] = &[
    ResolutionRule {
        family: CodecFamily::V210,
        conditions: RuleConditions {
            height: Some(&[Height::H576]),
            aspect_ratio: Some(&[AspectRatio::FourByThree]),
            field_order: Some(&[FieldOrder::Tff]),
            colour_primaries: Some(&[ColourPrimaries::Bt601Pal]),
            matrix_coefficients: None,
        },
        preset: v210("SD 4:3 PAL interlaced", PAL, FieldOrder::Tff, None, AspectRatio::FourByThree),
    },
    ResolutionRule {
        family: CodecFamily::V210,
        conditions: RuleConditions {
            height: Some(&[Height::H576]),
            aspect_ratio: Some(&[AspectRatio::SixteenByNine]),
            field_order: Some(&[FieldOrder::Tff]),
            colour_primaries: Some(&[ColourPrimaries::Bt601Pal]),
            matrix_coefficients: None,
        },
        preset: v210(
            "SD 16:9 PAL interlaced",
            PAL,
            FieldOrder::Tff,
            None,
            AspectRatio::SixteenByNine,
        ),
    },
    ResolutionRule {
        family: CodecFamily::V210,
        conditions: RuleConditions {
            height: Some(&[Height::H608]),
            aspect_ratio: None,
            field_order: Some(&[FieldOrder::Tff]),
            colour_primaries: Some(&[ColourPrimaries::Bt601Pal]),
            matrix_coefficients: None,
        },
        preset: v210(
            "SD 4:3 PAL interlaced (cropped from 608)",
            PAL,
            FieldOrder::Tff,
            Some(PAL_608_CROP),
            AspectRatio::FourByThree,
        ),
    },
    ResolutionRule {
        family: CodecFamily::V210,
        conditions: RuleConditions {
            height: Some(&[Height::H486]),
            aspect_ratio: Some(&[AspectRatio::FourByThree]),
            field_order: Some(&[FieldOrder::Bff]),
            colour_primaries: Some(&[ColourPrimaries::Bt601Ntsc]),
            matrix_coefficients: None,
        },
        preset: v210("SD 4:3 NTSC interlaced", NTSC, FieldOrder::Bff, None, AspectRatio::FourByThree),
    },
    ResolutionRule {
        family: CodecFamily::V210,
        conditions: RuleConditions {
            height: Some(&[Height::H1080]),
            aspect_ratio: Some(&[AspectRatio::SixteenByNine]),
            field_order: Some(&[FieldOrder::Tff]),
            colour_primaries: Some(&[ColourPrimaries::Bt709]),
            matrix_coefficients: None,
        },
        preset: v210("HD 16:9 interlaced", HD, FieldOrder::Tff, None, AspectRatio::SixteenByNine),
    },
    ResolutionRule {
        family: CodecFamily::V210,
        conditions: RuleConditions {
            height: Some(&[Height::H1080, Height::H720]),
            aspect_ratio: Some(&[AspectRatio::SixteenByNine]),
            field_order: Some(&[FieldOrder::Progressive]),
            colour_primaries: Some(&[ColourPrimaries::Bt709]),
            matrix_coefficients: None,
        },
        preset: v210(
            "HD 16:9 progressive",
            HD,
            FieldOrder::Progressive,
            None,
            AspectRatio::SixteenByNine,
        ),
    },
];

pub static FFV1_RULES: &[ResolutionRule] = &[
    ResolutionRule {
        family: CodecFamily::Ffv1,
        conditions: RuleConditions {
            height: None,
            aspect_ratio: None,
            field_order: Some(&[FieldOrder::Tff, FieldOrder::Bff]),
            colour_primaries: Some(&[ColourPrimaries::Bt601Pal, ColourPrimaries::Bt601Ntsc]),
            matrix_coefficients: Some(&[MatrixCoefficients::Bt601, MatrixCoefficients::Bt470bg]),
        },
        preset: ffv1("FFV1 SD interlaced"),
    },
    ResolutionRule {
        family: CodecFamily::Ffv1,
        conditions: RuleConditions {
            height: None,
            aspect_ratio: None,
            field_order: Some(&[FieldOrder::Tff, FieldOrder::Bff]),
            colour_primaries: Some(&[ColourPrimaries::Bt709]),
            matrix_coefficients: Some(&[MatrixCoefficients::Bt709]),
        },
        preset: ffv1("FFV1 HD interlaced"),
    },
    ResolutionRule {
        family: CodecFamily::Ffv1,
        conditions: RuleConditions {
            height: None,
            aspect_ratio: None,
            field_order: Some(&[FieldOrder::Progressive]),
            colour_primaries: Some(&[
                ColourPrimaries::Bt709,
                ColourPrimaries::Bt601Pal,
                ColourPrimaries::Bt601Ntsc,
            ]),
            matrix_coefficients: Some(&[
                MatrixCoefficients::Bt709,
                MatrixCoefficients::Bt601,
                MatrixCoefficients::Bt470bg,
            ]),
        },
        preset: ffv1("FFV1 progressive"),
    },
];

/// The rule table for a codec family, in declaration order.
pub fn table(family: CodecFamily) -> &'static [ResolutionRule] {
    match family {
        CodecFamily::V210 => V210_RULES,
        CodecFamily::Ffv1 => FFV1_RULES,
    }
}
