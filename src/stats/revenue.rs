//! Welch-style significance test for revenue per visitor.

use serde::{Deserialize, Serialize};

use super::normal::normal_cdf;
use super::VariantStats;

/// Result of comparing treatment against control revenue per visitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueSignificance {
    /// Revenue per visitor in cents
    pub control_rpv: f64,
    pub treatment_rpv: f64,
    pub absolute_lift: f64,
    /// Lift as a percentage of control RPV; 0 when control RPV is 0
    pub relative_lift: f64,
    pub t_statistic: f64,
    /// Welch-Satterthwaite degrees of freedom. Informational: the p-value
    /// below comes from the normal approximation, not a Student-t CDF
    pub degrees_of_freedom: f64,
    pub p_value: f64,
    pub significant: bool,
}

/// Welch-style test of treatment RPV against control RPV.
///
/// When raw per-order revenue samples are available for both arms (at least
/// two orders each), the variance is the Bessel-corrected sample variance.
/// Without samples the variance falls back to `RPV^2`, treating revenue per
/// visitor as a rate whose standard deviation matches its mean. That
/// fallback is deliberately crude; callers that care about precision should
/// pass the raw samples.
///
/// The p-value uses the normal CDF rather than a Student-t CDF, which is
/// accurate for the sample sizes a price test runs at and increasingly
/// optimistic below a few dozen orders per arm.
pub fn revenue_significance(
    control: &VariantStats,
    treatment: &VariantStats,
    control_samples: Option<&[f64]>,
    treatment_samples: Option<&[f64]>,
    confidence_level: f64,
) -> RevenueSignificance {
    let control_rpv = control.revenue_per_visitor();
    let treatment_rpv = treatment.revenue_per_visitor();

    let (var_c, var_t) = match (control_samples, treatment_samples) {
        (Some(c), Some(t)) if c.len() >= 2 && t.len() >= 2 => {
            (sample_variance(c), sample_variance(t))
        }
        _ => (control_rpv * control_rpv, treatment_rpv * treatment_rpv),
    };

    let n_c = control.visitors as f64;
    let n_t = treatment.visitors as f64;

    let (t_statistic, degrees_of_freedom) = if control.visitors == 0 || treatment.visitors == 0 {
        (0.0, 0.0)
    } else {
        let term_c = var_c / n_c;
        let term_t = var_t / n_t;
        let se = (term_c + term_t).sqrt();
        let t = if se == 0.0 {
            0.0
        } else {
            (treatment_rpv - control_rpv) / se
        };
        (t, welch_satterthwaite(term_c, n_c, term_t, n_t))
    };

    let p_value = 2.0 * (1.0 - normal_cdf(t_statistic.abs()));

    let absolute_lift = treatment_rpv - control_rpv;
    let relative_lift = if control_rpv == 0.0 {
        0.0
    } else {
        absolute_lift / control_rpv * 100.0
    };

    RevenueSignificance {
        control_rpv,
        treatment_rpv,
        absolute_lift,
        relative_lift,
        t_statistic,
        degrees_of_freedom,
        p_value,
        significant: p_value < (1.0 - confidence_level),
    }
}

/// Bessel-corrected sample variance (divide by n - 1).
fn sample_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let sum_sq = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
    sum_sq / (values.len() - 1) as f64
}

/// Welch-Satterthwaite approximation from the per-arm variance/n terms.
fn welch_satterthwaite(term_c: f64, n_c: f64, term_t: f64, n_t: f64) -> f64 {
    let denom_c = if n_c > 1.0 {
        term_c * term_c / (n_c - 1.0)
    } else {
        0.0
    };
    let denom_t = if n_t > 1.0 {
        term_t * term_t / (n_t - 1.0)
    } else {
        0.0
    };
    if denom_c + denom_t == 0.0 {
        return 0.0;
    }
    (term_c + term_t).powi(2) / (denom_c + denom_t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_arms_show_no_effect() {
        let stats = VariantStats::new(1000, 40, 40000);
        let result = revenue_significance(&stats, &stats, None, None, 0.95);

        assert_eq!(result.t_statistic, 0.0);
        assert!((result.p_value - 1.0).abs() < 1e-3);
        assert!(!result.significant);
    }

    #[test]
    fn empty_arms_are_safe() {
        let empty = VariantStats::default();
        let result = revenue_significance(&empty, &empty, None, None, 0.95);

        assert_eq!(result.control_rpv, 0.0);
        assert_eq!(result.t_statistic, 0.0);
        assert_eq!(result.degrees_of_freedom, 0.0);
        assert_eq!(result.relative_lift, 0.0);
    }

    #[test]
    fn fallback_variance_is_rpv_squared() {
        // With the fallback, t = (rpv_t - rpv_c) / sqrt(rpv_c^2/n + rpv_t^2/n)
        let control = VariantStats::new(100, 10, 1000); // RPV 10
        let treatment = VariantStats::new(100, 10, 2000); // RPV 20
        let result = revenue_significance(&control, &treatment, None, None, 0.95);

        let expected = 10.0 / ((100.0 / 100.0) + (400.0 / 100.0_f64)).sqrt();
        assert!((result.t_statistic - expected).abs() < 1e-9);
    }

    #[test]
    fn raw_samples_beat_the_fallback() {
        // Tightly clustered order values: true variance is tiny, so the
        // same RPV gap becomes much more significant than the fallback
        // would claim.
        let control = VariantStats::new(200, 50, 10000); // RPV 50
        let treatment = VariantStats::new(200, 50, 12000); // RPV 60

        let control_orders: Vec<f64> = (0..50).map(|i| 195.0 + (i % 5) as f64 * 2.0).collect();
        let treatment_orders: Vec<f64> = (0..50).map(|i| 235.0 + (i % 5) as f64 * 2.0).collect();

        let with_samples = revenue_significance(
            &control,
            &treatment,
            Some(&control_orders),
            Some(&treatment_orders),
            0.95,
        );
        let without = revenue_significance(&control, &treatment, None, None, 0.95);

        assert!(with_samples.t_statistic.abs() > without.t_statistic.abs());
        assert!(with_samples.p_value < without.p_value);
    }

    #[test]
    fn short_samples_fall_back() {
        let control = VariantStats::new(100, 1, 500);
        let treatment = VariantStats::new(100, 1, 900);
        // One order per arm cannot estimate a variance
        let short = revenue_significance(
            &control,
            &treatment,
            Some(&[500.0]),
            Some(&[900.0]),
            0.95,
        );
        let fallback = revenue_significance(&control, &treatment, None, None, 0.95);
        assert_eq!(short.t_statistic, fallback.t_statistic);
    }

    #[test]
    fn sample_variance_is_bessel_corrected() {
        // Variance of {2, 4, 6} is 4 with n-1, not 8/3
        assert!((sample_variance(&[2.0, 4.0, 6.0]) - 4.0).abs() < 1e-12);
        assert_eq!(sample_variance(&[5.0]), 0.0);
    }

    #[test]
    fn degrees_of_freedom_equal_variances() {
        // Equal variances and equal n: df approaches 2(n-1)
        let arm = VariantStats::new(100, 20, 50000);
        let other = VariantStats::new(100, 20, 60000);
        let samples: Vec<f64> = (0..20).map(|i| 2400.0 + i as f64 * 10.0).collect();
        let result =
            revenue_significance(&arm, &other, Some(&samples), Some(&samples), 0.95);
        assert!((result.degrees_of_freedom - 198.0).abs() < 1.0);
    }
}
