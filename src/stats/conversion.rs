//! Two-proportion z-test for conversion rates.

use serde::{Deserialize, Serialize};

use super::normal::{normal_cdf, normal_inverse_cdf};
use super::power::required_sample_size;
use super::VariantStats;
use crate::constants::{DEFAULT_POWER, DEFAULT_RELATIVE_MDE, FALLBACK_BASELINE_RATE};

/// Result of comparing treatment against control conversion rates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionSignificance {
    pub control_rate: f64,
    pub treatment_rate: f64,
    /// Treatment rate minus control rate
    pub absolute_lift: f64,
    /// Lift as a percentage of the control rate; 0 when the control rate is
    /// 0, since a relative lift over nothing is undefined
    pub relative_lift: f64,
    pub z_score: f64,
    pub p_value: f64,
    pub significant: bool,
    /// Wald interval for the control rate, clamped to [0, 1]
    pub control_interval: (f64, f64),
    /// Wald interval for the treatment rate, clamped to [0, 1]
    pub treatment_interval: (f64, f64),
    /// Whether both arms have reached the recommended per-arm sample size
    pub sample_size_reached: bool,
    /// Per-arm sample size for an 80%-power, 5%-relative-MDE design
    /// anchored on the observed control rate
    pub recommended_sample_size: u64,
}

/// Pooled two-proportion z-test of `treatment` against `control` at the
/// given confidence level (e.g. 0.95).
///
/// Empty arms are legal: a zero sample size zeroes the pooled standard
/// error, and a zero standard error zeroes the z-score. Absence of evidence
/// is reported as no effect (`p = 1`), never as an error.
pub fn conversion_significance(
    control: &VariantStats,
    treatment: &VariantStats,
    confidence_level: f64,
) -> ConversionSignificance {
    let n_c = control.visitors as f64;
    let n_t = treatment.visitors as f64;
    let control_rate = control.conversion_rate();
    let treatment_rate = treatment.conversion_rate();

    let pooled = if control.visitors + treatment.visitors == 0 {
        0.0
    } else {
        (control.conversions + treatment.conversions) as f64 / (n_c + n_t)
    };

    let se = if control.visitors == 0 || treatment.visitors == 0 {
        0.0
    } else {
        (pooled * (1.0 - pooled) * (1.0 / n_c + 1.0 / n_t)).sqrt()
    };

    let z_score = if se == 0.0 {
        0.0
    } else {
        (treatment_rate - control_rate) / se
    };

    let p_value = 2.0 * (1.0 - normal_cdf(z_score.abs()));

    let absolute_lift = treatment_rate - control_rate;
    let relative_lift = if control_rate == 0.0 {
        0.0
    } else {
        absolute_lift / control_rate * 100.0
    };

    let alpha = 1.0 - confidence_level;
    let z_critical = normal_inverse_cdf(1.0 - alpha / 2.0);
    let control_interval = wald_interval(control_rate, control.visitors, z_critical);
    let treatment_interval = wald_interval(treatment_rate, treatment.visitors, z_critical);

    let baseline = if control_rate > 0.0 {
        control_rate
    } else {
        FALLBACK_BASELINE_RATE
    };
    let recommended_sample_size =
        required_sample_size(baseline, DEFAULT_RELATIVE_MDE, DEFAULT_POWER, alpha);

    let significant = p_value < alpha;
    let sample_size_reached =
        control.visitors.min(treatment.visitors) >= recommended_sample_size;

    ConversionSignificance {
        control_rate,
        treatment_rate,
        absolute_lift,
        relative_lift,
        z_score,
        p_value,
        significant,
        control_interval,
        treatment_interval,
        sample_size_reached,
        recommended_sample_size,
    }
}

/// Wald interval `p +- z * sqrt(p(1-p)/n)`, clamped to [0, 1].
/// Collapses to a point at `p` when the arm is empty.
fn wald_interval(rate: f64, visitors: u64, z_critical: f64) -> (f64, f64) {
    if visitors == 0 {
        return (0.0, 0.0);
    }
    let margin = z_critical * (rate * (1.0 - rate) / visitors as f64).sqrt();
    ((rate - margin).max(0.0), (rate + margin).min(1.0))
}
