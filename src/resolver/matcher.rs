use framekeeper_common::{
    AspectRatio, ColourPrimaries, FieldOrder, Height, MatrixCoefficients, MediaProfile, Probed,
};

/// The profile fields a rule references, each with the values it accepts.
///
/// `None` means the rule does not look at that field.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleConditions {
    pub height: Option<&'static [Height]>,
    pub aspect_ratio: Option<&'static [AspectRatio]>,
    pub field_order: Option<&'static [FieldOrder]>,
    pub colour_primaries: Option<&'static [ColourPrimaries]>,
    pub matrix_coefficients: Option<&'static [MatrixCoefficients]>,
}

impl RuleConditions {
    /// Number of referenced fields; more specific rules are tried first.
    pub fn specificity(&self) -> usize {
        [
            self.height.is_some(),
            self.aspect_ratio.is_some(),
            self.field_order.is_some(),
            self.colour_primaries.is_some(),
            self.matrix_coefficients.is_some(),
        ]
        .iter()
        .filter(|referenced| **referenced)
        .count()
    }

    /// True if any referenced field is known and outside the accepted values.
    ///
    /// Unknown fields never contradict; they are caught by
    /// [`first_unknown`](Self::first_unknown) once the rule is chosen.
    pub fn contradicts(&self, profile: &MediaProfile) -> bool {
        contradicts(self.height, &profile.height)
            || contradicts(self.aspect_ratio, &profile.aspect_ratio)
            || contradicts(self.field_order, &profile.field_order)
            || contradicts(self.colour_primaries, &profile.colour_primaries)
            || contradicts(self.matrix_coefficients, &profile.matrix_coefficients)
    }

    /// The first referenced field the profile could not recognise, with its
    /// raw token.
    pub fn first_unknown<'p>(&self, profile: &'p MediaProfile) -> Option<(&'static str, &'p str)> {
        unknown(self.height, &profile.height)
            .map(|raw| ("height", raw))
            .or_else(|| unknown(self.aspect_ratio, &profile.aspect_ratio).map(|raw| ("aspect_ratio", raw)))
            .or_else(|| unknown(self.field_order, &profile.field_order).map(|raw| ("field_order", raw)))
            .or_else(|| {
                unknown(self.colour_primaries, &profile.colour_primaries)
                    .map(|raw| ("colour_primaries", raw))
            })
            .or_else(|| {
                unknown(self.matrix_coefficients, &profile.matrix_coefficients)
                    .map(|raw| ("matrix_coefficients", raw))
            })
    }
}

fn contradicts<T: PartialEq>(accepted: Option<&[T]>, value: &Probed<T>) -> bool {
    match (accepted, value) {
        (Some(accepted), Probed::Known(v)) => !accepted.contains(v),
        _ => false,
    }
}

fn unknown<'p, T>(accepted: Option<&[T]>, value: &'p Probed<T>) -> Option<&'p str> {
    match (accepted, value) {
        (Some(_), Probed::Unknown(raw)) => Some(raw.as_str()),
        _ => None,
    }
}
