use std::fmt;

/// Classification of how a model's value at a feature relates to a
/// reference's value, both measured against the feature's background
/// prior. Used only to annotate verbose evidence chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonCode {
    /// model above background, reference above background
    TruePositive,
    /// model above background, reference below background
    FalsePositive,
    /// model above background, reference at background
    ExcessPositive,
    /// model at background, reference above background
    AmbientPositive,
    /// model at background, reference at background
    Unremarkable,
    /// model below background, reference below background
    TrueNegative,
    /// model below background, reference above background
    FalseNegative,
    /// model below background, reference at background
    ExcessNegative,
    /// model at background, reference below background
    AmbientNegative,
}

impl fmt::Display for ComparisonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            ComparisonCode::TruePositive => "TP",
            ComparisonCode::FalsePositive => "FP",
            ComparisonCode::ExcessPositive => "EP",
            ComparisonCode::AmbientPositive => "AP",
            ComparisonCode::Unremarkable => "U",
            ComparisonCode::TrueNegative => "TN",
            ComparisonCode::FalseNegative => "FN",
            ComparisonCode::ExcessNegative => "EN",
            ComparisonCode::AmbientNegative => "AN",
        };
        f.write_str(code)
    }
}

/// Classify a `(model_value, reference_value)` pair relative to `bg`.
pub fn comparison_code(model_val: f64, ref_val: f64, bg: f64) -> ComparisonCode {
    use ComparisonCode::*;
    if model_val > bg {
        if ref_val > bg {
            TruePositive
        } else if ref_val < bg {
            FalsePositive
        } else {
            AmbientPositive
        }
    } else if model_val < bg {
        if ref_val > bg {
            FalseNegative
        } else if ref_val < bg {
            TrueNegative
        } else {
            AmbientNegative
        }
    } else if ref_val > bg {
        ExcessPositive
    } else if ref_val < bg {
        ExcessNegative
    } else {
        Unremarkable
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::true_positive(0.9, 0.9, 0.1, ComparisonCode::TruePositive)]
    #[case::false_positive(0.9, 0.01, 0.1, ComparisonCode::FalsePositive)]
    #[case::ambient_positive(0.9, 0.1, 0.1, ComparisonCode::AmbientPositive)]
    #[case::false_negative(0.01, 0.9, 0.1, ComparisonCode::FalseNegative)]
    #[case::true_negative(0.01, 0.01, 0.1, ComparisonCode::TrueNegative)]
    #[case::ambient_negative(0.01, 0.1, 0.1, ComparisonCode::AmbientNegative)]
    #[case::excess_positive(0.1, 0.9, 0.1, ComparisonCode::ExcessPositive)]
    #[case::excess_negative(0.1, 0.01, 0.1, ComparisonCode::ExcessNegative)]
    #[case::unremarkable(0.1, 0.1, 0.1, ComparisonCode::Unremarkable)]
    fn classifies_all_nine_combinations(
        #[case] model: f64,
        #[case] reference: f64,
        #[case] bg: f64,
        #[case] expected: ComparisonCode,
    ) {
        assert_eq!(comparison_code(model, reference, bg), expected);
    }

    #[rstest]
    fn display_matches_original_short_codes() {
        assert_eq!(ComparisonCode::TruePositive.to_string(), "TP");
        assert_eq!(ComparisonCode::Unremarkable.to_string(), "U");
    }
}
