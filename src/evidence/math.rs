//! Stable log2-domain Bayesian probability updates.
//!
//! Updates a probability given a stream of `(tpr, fpr)` evidence pairs.
//! Working in log2 space keeps long evidence chains numerically stable:
//! the contribution of each datum is a sum rather than a product of many
//! small ratios.

const DEFAULT_REG_LOWER: f64 = -512.0;
const DEFAULT_REG_UPPER: f64 = 512.0;

/// A single Bayesian update of `p` given one `(tpr, fpr)` pair.
pub fn update_single(p: f64, tpr: f64, fpr: f64) -> f64 {
    if tpr == fpr {
        return p;
    }
    (tpr * p) / (((tpr - fpr) * p) + fpr)
}

/// Equivalent to [`update_single`], parameterized by the ratio `fpr/tpr`
/// rather than by `tpr` and `fpr` separately.
pub fn update_single_ratio(p: f64, fpr_tpr: f64) -> f64 {
    if fpr_tpr == 1.0 {
        return p;
    }
    p / (((1.0 - fpr_tpr) * p) + fpr_tpr)
}

/// `log2(p)`, clamped to `[reg_lower, reg_upper]` rather than producing
/// `-inf`/`NaN` for `p` outside `(0, 1)`.
fn reglog2(p: f64, reg_lower: f64, reg_upper: f64) -> f64 {
    let plog = p.log2();
    if plog.is_finite() {
        return plog.clamp(reg_lower, reg_upper);
    }
    if p < 2f64.powf(reg_lower) {
        reg_lower
    } else {
        reg_upper
    }
}

/// Update `p` given parallel lists of true-positive and false-positive
/// rates, accumulating in log2 space and collapsing to a single ratio
/// update at the end.
pub fn evidence_update(p: f64, tpr_list: &[f64], fpr_list: &[f64]) -> f64 {
    evidence_update_reg(p, tpr_list, fpr_list, DEFAULT_REG_LOWER, DEFAULT_REG_UPPER)
}

fn evidence_update_reg(
    p: f64,
    tpr_list: &[f64],
    fpr_list: &[f64],
    reg_lower: f64,
    reg_upper: f64,
) -> f64 {
    let mut tpr_logsum = 0.0;
    let mut fpr_logsum = 0.0;
    for (&tpr, &fpr) in tpr_list.iter().zip(fpr_list) {
        if tpr == fpr {
            continue;
        }
        tpr_logsum += reglog2(tpr, reg_lower, reg_upper);
        fpr_logsum += reglog2(fpr, reg_lower, reg_upper);
    }

    let expodiff = (fpr_logsum - tpr_logsum).clamp(reg_lower, reg_upper);
    update_single_ratio(p, 2f64.powf(expodiff))
}

/// Recover the `fpr/tpr` ratio that would carry `prior` to `posterior`
/// under [`update_single_ratio`].
pub fn estimate_update_ratio(prior: f64, posterior: f64) -> f64 {
    let pp = prior * posterior;
    (pp - prior) / (pp - posterior)
}

/// Apply the update implied by an earlier `prior -> posterior` enrichment
/// to a new probability `p`.
pub fn estimate_update(p: f64, prior: f64, posterior: f64) -> f64 {
    let ratio = estimate_update_ratio(prior, posterior);
    update_single_ratio(p, ratio)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evidence_update_with_no_data_is_identity() {
        assert_eq!(evidence_update(0.3, &[], &[]), 0.3);
    }

    #[test]
    fn update_single_with_equal_tpr_fpr_is_identity() {
        assert_eq!(update_single(0.3, 0.5, 0.5), 0.3);
    }

    #[test]
    fn evidence_update_tpr_gt_fpr_increases_probability() {
        let p = evidence_update(0.1, &[0.9], &[0.1]);
        assert!(p > 0.1);
    }

    #[test]
    fn evidence_update_tpr_lt_fpr_decreases_probability() {
        let p = evidence_update(0.1, &[0.1], &[0.9]);
        assert!(p < 0.1);
    }

    #[test]
    fn update_single_ratio_of_one_is_identity() {
        assert_eq!(update_single_ratio(0.42, 1.0), 0.42);
    }

    #[test]
    fn reglog2_clamps_extreme_small_p() {
        // p well below 2^-512 would otherwise produce -inf from log2.
        let clamped = reglog2(0.0, -512.0, 512.0);
        assert_eq!(clamped, -512.0);
    }

    #[test]
    fn estimate_update_round_trips_through_update_single_ratio() {
        let ratio = 0.3;
        let prior = 0.01;
        let posterior = update_single_ratio(prior, ratio);
        let recovered = estimate_update_ratio(prior, posterior);
        assert!((recovered - ratio).abs() < 1e-9);
    }

    #[test]
    fn evidence_update_matches_single_update_for_one_datum() {
        let chained = evidence_update(0.2, &[0.8], &[0.05]);
        let single = update_single(0.2, 0.8, 0.05);
        assert!((chained - single).abs() < 1e-9);
    }
}
