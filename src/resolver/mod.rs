//! Map a probed [`MediaProfile`] onto concrete [`EncodeParameters`].
//!
//! Resolution is a pure table lookup. Rules are tried most specific first;
//! the first rule whose known fields do not contradict the profile is the
//! active rule. There is no fallback preset: a profile no rule covers, or one
//! that leaves a field the active rule needs unknown, is a
//! [`ResolutionError`].

mod matcher;
mod presets;

pub use matcher::RuleConditions;
pub use presets::{table, ColourPair, Preset, ResolutionRule, Source, FFV1_RULES, V210_RULES};

use framekeeper_common::{
    CodecFamily, ColourTags, EncodeParameters, FieldOrder, FrameRate, MediaProfile, Probed,
};
use std::cmp::Reverse;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("rule '{rule}' needs {field}, which is unknown ({raw:?})")]
    UnknownField {
        rule: &'static str,
        field: &'static str,
        raw: String,
    },

    #[error("no {family} rule covers {summary}")]
    NoMatchingRule { family: CodecFamily, summary: String },
}

/// The rules of a family in evaluation order: descending specificity,
/// declaration order within equal specificity.
pub fn ordered_rules(family: CodecFamily) -> Vec<&'static ResolutionRule> {
    let mut rules: Vec<&'static ResolutionRule> = table(family).iter().collect();
    rules.sort_by_key(|rule| Reverse(rule.conditions.specificity()));
    rules
}

/// The rule that governs this profile, if any.
pub fn active_rule(profile: &MediaProfile, family: CodecFamily) -> Option<&'static ResolutionRule> {
    ordered_rules(family)
        .into_iter()
        .find(|rule| !rule.conditions.contradicts(profile))
}

/// Resolve encode parameters for `profile` in the given codec family.
pub fn resolve(
    profile: &MediaProfile,
    family: CodecFamily,
) -> Result<EncodeParameters, ResolutionError> {
    let rule = active_rule(profile, family).ok_or_else(|| ResolutionError::NoMatchingRule {
        family,
        summary: profile.summary(),
    })?;

    if let Some((field, raw)) = rule.conditions.first_unknown(profile) {
        return Err(unknown_field(rule, field, raw));
    }

    build_parameters(rule, profile)
}

fn unknown_field(rule: &ResolutionRule, field: &'static str, raw: &str) -> ResolutionError {
    ResolutionError::UnknownField {
        rule: rule.name(),
        field,
        raw: raw.to_string(),
    }
}

fn from_profile<T: Copy>(
    rule: &ResolutionRule,
    field: &'static str,
    value: &Probed<T>,
) -> Result<T, ResolutionError> {
    match value {
        Probed::Known(v) => Ok(*v),
        Probed::Unknown(raw) => Err(unknown_field(rule, field, raw)),
    }
}

fn build_parameters(
    rule: &ResolutionRule,
    profile: &MediaProfile,
) -> Result<EncodeParameters, ResolutionError> {
    let preset = &rule.preset;

    let colour_pair = match preset.colour {
        Source::Fixed(pair) => Some(pair),
        Source::FromProfile => Some(ColourPair {
            primaries: from_profile(rule, "colour_primaries", &profile.colour_primaries)?,
            matrix: from_profile(rule, "matrix_coefficients", &profile.matrix_coefficients)?,
        }),
        Source::Omit => None,
    };

    let field_order: Option<FieldOrder> = match preset.field_order {
        Source::Fixed(order) => Some(order),
        Source::FromProfile => Some(from_profile(rule, "field_order", &profile.field_order)?),
        Source::Omit => None,
    };

    let frame_rate: Option<FrameRate> = match preset.frame_rate {
        Source::Fixed(rate) => Some(rate),
        Source::FromProfile => Some(from_profile(rule, "frame_rate", &profile.frame_rate)?),
        Source::Omit => None,
    };

    let family = rule.family;
    Ok(EncodeParameters {
        preset: preset.name.to_string(),
        family,
        video_codec: preset.video_codec.to_string(),
        codec_options: preset.codec_options.iter().map(|s| s.to_string()).collect(),
        encoder_tag: preset.encoder_tag.map(str::to_string),
        colour: colour_pair.map(|pair| ColourTags {
            primaries: pair.primaries,
            transfer: preset.transfer.to_string(),
            matrix: pair.matrix,
            limited_range: true,
        }),
        field_order,
        frame_rate,
        crop: preset.crop,
        display_aspect: preset.display_aspect,
        container: family.container(),
        container_flags: preset.container_flags.iter().map(|s| s.to_string()).collect(),
        drop_data_streams: preset.drop_data_streams,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use framekeeper_common::{
        AspectRatio, ColourPrimaries, Container, Crop, Height, MatrixCoefficients,
    };

    fn profile(
        height: Height,
        dar: AspectRatio,
        field: FieldOrder,
        primaries: ColourPrimaries,
        matrix: MatrixCoefficients,
    ) -> MediaProfile {
        MediaProfile {
            colour_primaries: Probed::Known(primaries),
            matrix_coefficients: Probed::Known(matrix),
            field_order: Probed::Known(field),
            frame_rate: Probed::Known(FrameRate::Fps25),
            aspect_ratio: Probed::Known(dar),
            height: Probed::Known(height),
        }
    }

    fn pal_sd() -> MediaProfile {
        profile(
            Height::H576,
            AspectRatio::FourByThree,
            FieldOrder::Tff,
            ColourPrimaries::Bt601Pal,
            MatrixCoefficients::Bt470bg,
        )
    }

    #[test]
    fn test_pal_sd_v210() {
        let params = resolve(&pal_sd(), CodecFamily::V210).unwrap();
        assert_eq!(params.preset, "SD 4:3 PAL interlaced");
        assert_eq!(params.container, Container::Mov);
        assert_eq!(params.field_order, Some(FieldOrder::Tff));
        assert_eq!(params.frame_rate, Some(FrameRate::Fps25));
        assert_eq!(params.display_aspect, Some(AspectRatio::FourByThree));
        assert!(params.drop_data_streams);

        let colour = params.colour.unwrap();
        assert_eq!(colour.primaries, ColourPrimaries::Bt601Pal);
        assert_eq!(colour.matrix, MatrixCoefficients::Bt470bg);
        assert_eq!(colour.transfer, "bt709");
        assert!(colour.limited_range);
    }

    #[test]
    fn test_608_line_capture_is_cropped() {
        let mut p = pal_sd();
        p.height = Probed::Known(Height::H608);
        // aspect ratio is not referenced by the cropping rule
        p.aspect_ratio = Probed::unknown("1.184");

        let params = resolve(&p, CodecFamily::V210).unwrap();
        assert_eq!(params.preset, "SD 4:3 PAL interlaced (cropped from 608)");
        assert_eq!(
            params.crop,
            Some(Crop {
                width: 720,
                height: 576,
                x: 0,
                y: 32
            })
        );
        assert_eq!(params.display_aspect, Some(AspectRatio::FourByThree));
    }

    #[test]
    fn test_ntsc_and_hd() {
        let ntsc = profile(
            Height::H486,
            AspectRatio::FourByThree,
            FieldOrder::Bff,
            ColourPrimaries::Bt601Ntsc,
            MatrixCoefficients::Bt601,
        );
        assert_eq!(
            resolve(&ntsc, CodecFamily::V210).unwrap().preset,
            "SD 4:3 NTSC interlaced"
        );

        let hd = profile(
            Height::H720,
            AspectRatio::SixteenByNine,
            FieldOrder::Progressive,
            ColourPrimaries::Bt709,
            MatrixCoefficients::Bt709,
        );
        let params = resolve(&hd, CodecFamily::V210).unwrap();
        assert_eq!(params.preset, "HD 16:9 progressive");
        assert_eq!(params.field_order, Some(FieldOrder::Progressive));
    }

    #[test]
    fn test_uncovered_profile_is_refused() {
        let odd = profile(
            Height::H576,
            AspectRatio::FiveByFour,
            FieldOrder::Tff,
            ColourPrimaries::Bt601Pal,
            MatrixCoefficients::Bt470bg,
        );
        assert_matches!(
            resolve(&odd, CodecFamily::V210),
            Err(ResolutionError::NoMatchingRule {
                family: CodecFamily::V210,
                ..
            })
        );
    }

    #[test]
    fn test_unknown_referenced_field_fails() {
        let mut p = pal_sd();
        p.field_order = Probed::unknown("MBAFF");
        assert_eq!(
            resolve(&p, CodecFamily::V210),
            Err(ResolutionError::UnknownField {
                rule: "SD 4:3 PAL interlaced",
                field: "field_order",
                raw: "MBAFF".to_string(),
            })
        );
    }

    #[test]
    fn test_unknown_passthrough_field_fails() {
        let mut p = pal_sd();
        p.frame_rate = Probed::unknown("12.5");
        assert_matches!(
            resolve(&p, CodecFamily::V210),
            Err(ResolutionError::UnknownField {
                field: "frame_rate",
                ..
            })
        );
    }

    #[test]
    fn test_unreferenced_unknown_is_tolerated() {
        let mut p = pal_sd();
        p.matrix_coefficients = Probed::unknown("");
        assert!(resolve(&p, CodecFamily::V210).is_ok());
        // FFV1 passes the matrix through, so it must be known
        assert!(resolve(&p, CodecFamily::Ffv1).is_err());
    }

    #[test]
    fn test_ffv1_passes_colour_through() {
        let params = resolve(&pal_sd(), CodecFamily::Ffv1).unwrap();
        assert_eq!(params.preset, "FFV1 SD interlaced");
        assert_eq!(params.container, Container::Mkv);
        assert_eq!(params.video_codec, "ffv1");
        assert!(params.codec_options.windows(2).any(|w| w == ["-slices", "24"]));
        assert_eq!(params.crop, None);
        assert_eq!(params.display_aspect, None);
        let colour = params.colour.unwrap();
        assert_eq!(colour.matrix, MatrixCoefficients::Bt470bg);
        assert_eq!(colour.transfer, "bt709");
    }

    #[test]
    fn test_ffv1_rejects_mixed_colour_triplet() {
        let mixed = profile(
            Height::H1080,
            AspectRatio::SixteenByNine,
            FieldOrder::Tff,
            ColourPrimaries::Bt709,
            MatrixCoefficients::Bt601,
        );
        assert_matches!(
            resolve(&mixed, CodecFamily::Ffv1),
            Err(ResolutionError::NoMatchingRule { .. })
        );
    }

    #[test]
    fn test_ordered_rules_most_specific_first() {
        let rules = ordered_rules(CodecFamily::V210);
        let specificities: Vec<usize> =
            rules.iter().map(|r| r.conditions.specificity()).collect();
        let mut sorted = specificities.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(specificities, sorted);
        assert!(rules.last().unwrap().preset.crop.is_some());
    }
}
