//! Sample-size and power calculations for two-proportion tests.

use super::normal::normal_inverse_cdf;

/// Per-arm sample size required to detect a relative lift of
/// `relative_mde` over `baseline_rate` with the given power at the given
/// significance level.
///
/// Standard two-proportion formula: with `p1 = baseline`,
/// `p2 = baseline * (1 + mde)` and `p_bar = (p1 + p2) / 2`,
///
/// ```text
/// n = (z_alpha * sqrt(2 * p_bar * (1 - p_bar))
///      + z_beta * sqrt(p1 * (1 - p1) + p2 * (1 - p2)))^2 / (p2 - p1)^2
/// ```
///
/// A zero baseline or zero MDE makes the detectable effect zero, which no
/// finite sample can resolve; those inputs return `u64::MAX`, which reads
/// as "unreachable" downstream.
pub fn required_sample_size(
    baseline_rate: f64,
    relative_mde: f64,
    power: f64,
    significance_level: f64,
) -> u64 {
    let p1 = baseline_rate;
    let p2 = baseline_rate * (1.0 + relative_mde);
    let p_bar = (p1 + p2) / 2.0;

    let effect = p2 - p1;
    if !(effect > 0.0) {
        return u64::MAX;
    }

    let z_alpha = normal_inverse_cdf(1.0 - significance_level / 2.0);
    let z_beta = normal_inverse_cdf(power);

    let numerator = (z_alpha * (2.0 * p_bar * (1.0 - p_bar)).sqrt()
        + z_beta * (p1 * (1.0 - p1) + p2 * (1.0 - p2)).sqrt())
    .powi(2);

    let n = numerator / (effect * effect);
    if !n.is_finite() {
        return u64::MAX;
    }
    n.ceil() as u64
}

/// Calendar estimate for a test: days until every arm reaches the required
/// sample size, given total daily traffic split across `num_variants` arms.
///
/// Zero daily traffic never reaches significance; saturates to `u64::MAX`.
pub fn days_to_significance(
    daily_visitors: u64,
    baseline_rate: f64,
    relative_mde: f64,
    num_variants: u64,
) -> u64 {
    if daily_visitors == 0 {
        return u64::MAX;
    }
    let n = required_sample_size(
        baseline_rate,
        relative_mde,
        crate::constants::DEFAULT_POWER,
        crate::constants::DEFAULT_SIGNIFICANCE_LEVEL,
    );
    let total = (n as f64) * (num_variants as f64);
    (total / daily_visitors as f64).ceil() as u64
}
