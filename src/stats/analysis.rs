//! Composite analysis: one recommendation from the conversion and revenue
//! tests combined.

use serde::{Deserialize, Serialize};

use super::conversion::{conversion_significance, ConversionSignificance};
use super::revenue::{revenue_significance, RevenueSignificance};
use super::VariantStats;
use crate::format::{format_lift, format_percentage};

/// Which arm the analysis declares the winner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    None,
    Control,
    Variant,
}

/// Combined verdict over both metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestAnalysis {
    pub conversion: ConversionSignificance,
    pub revenue: RevenueSignificance,
    pub winner: Winner,
    pub recommendation: String,
}

/// Run both tests and fold them into a single decision.
///
/// The rule order is part of the output contract, not an implementation
/// detail. Conversion rate is the primary metric: revenue only decides the
/// winner when conversion significance is absent, and an underpowered test
/// never declares a winner at all, no matter what the p-values say.
pub fn analyze(
    control: &VariantStats,
    treatment: &VariantStats,
    control_samples: Option<&[f64]>,
    treatment_samples: Option<&[f64]>,
    confidence_level: f64,
) -> TestAnalysis {
    let conversion = conversion_significance(control, treatment, confidence_level);
    let revenue = revenue_significance(
        control,
        treatment,
        control_samples,
        treatment_samples,
        confidence_level,
    );

    let (winner, recommendation) = if !conversion.sample_size_reached {
        (
            Winner::None,
            format!(
                "Need more data: collect at least {} visitors per variant before acting \
                 (current minimum is {})",
                conversion.recommended_sample_size,
                control.visitors.min(treatment.visitors)
            ),
        )
    } else if !conversion.significant && !revenue.significant {
        (
            Winner::None,
            "No significant difference between variants. Keep the current price or test a \
             bolder change."
                .to_string(),
        )
    } else if conversion.significant && conversion.relative_lift > 0.0 {
        (
            Winner::Variant,
            format!(
                "Variant wins: conversion rate improved {} ({} vs {})",
                format_lift(conversion.relative_lift),
                format_percentage(conversion.treatment_rate),
                format_percentage(conversion.control_rate)
            ),
        )
    } else if conversion.significant && conversion.relative_lift < 0.0 {
        (
            Winner::Control,
            format!(
                "Control wins: the variant converted {} worse ({} vs {})",
                format_lift(conversion.relative_lift.abs()),
                format_percentage(conversion.treatment_rate),
                format_percentage(conversion.control_rate)
            ),
        )
    } else if revenue.significant && revenue.relative_lift > 0.0 {
        (
            Winner::Variant,
            format!(
                "Variant wins on revenue: {} more revenue per visitor",
                format_lift(revenue.relative_lift)
            ),
        )
    } else if revenue.significant && revenue.relative_lift < 0.0 {
        (
            Winner::Control,
            format!(
                "Control wins on revenue: the variant earned {} less per visitor",
                format_lift(revenue.relative_lift.abs())
            ),
        )
    } else {
        (
            Winner::None,
            "No significant difference between variants. Keep the current price or test a \
             bolder change."
                .to_string(),
        )
    };

    TestAnalysis {
        conversion,
        revenue,
        winner,
        recommendation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Enough visitors that the 5%-MDE sample-size gate is satisfied for a
    // high baseline rate.
    const BIG: u64 = 40_000;

    #[test]
    fn underpowered_test_recommends_more_data() {
        let control = VariantStats::new(100, 3, 9000);
        let treatment = VariantStats::new(100, 4, 12000);
        let result = analyze(&control, &treatment, None, None, 0.95);

        assert_eq!(result.winner, Winner::None);
        assert!(result.recommendation.starts_with("Need more data"));
    }

    #[test]
    fn no_difference_after_enough_data() {
        let control = VariantStats::new(BIG, 8000, 800_000);
        let treatment = VariantStats::new(BIG, 8010, 801_000);
        let result = analyze(&control, &treatment, None, None, 0.95);

        assert_eq!(result.winner, Winner::None);
        assert!(result.recommendation.contains("No significant difference"));
    }

    #[test]
    fn conversion_win_goes_to_variant() {
        let control = VariantStats::new(BIG, 8000, 800_000);
        let treatment = VariantStats::new(BIG, 8800, 880_000);
        let result = analyze(&control, &treatment, None, None, 0.95);

        assert_eq!(result.winner, Winner::Variant);
        assert!(result.recommendation.contains("Variant wins"));
    }

    #[test]
    fn conversion_loss_goes_to_control() {
        let control = VariantStats::new(BIG, 8800, 880_000);
        let treatment = VariantStats::new(BIG, 8000, 800_000);
        let result = analyze(&control, &treatment, None, None, 0.95);

        assert_eq!(result.winner, Winner::Control);
    }

    #[test]
    fn conversion_outranks_revenue() {
        // Conversion is significantly up while revenue per visitor is
        // dramatically down (cheaper price converts more, earns less).
        // Conversion is the primary metric, so the variant still wins.
        let control = VariantStats::new(BIG, 8000, 8_000_000);
        let treatment = VariantStats::new(BIG, 8800, 2_000_000);

        let control_orders: Vec<f64> = (0..200).map(|i| 990.0 + (i % 7) as f64).collect();
        let treatment_orders: Vec<f64> = (0..200).map(|i| 225.0 + (i % 7) as f64).collect();

        let result = analyze(
            &control,
            &treatment,
            Some(&control_orders),
            Some(&treatment_orders),
            0.95,
        );

        assert!(result.conversion.significant);
        assert!(result.revenue.significant);
        assert!(result.revenue.relative_lift < 0.0);
        assert_eq!(result.winner, Winner::Variant);
    }

    #[test]
    fn revenue_decides_when_conversion_is_flat() {
        // Same conversion counts, very different order values.
        let control = VariantStats::new(BIG, 8000, 4_000_000);
        let treatment = VariantStats::new(BIG, 8000, 6_000_000);

        let control_orders: Vec<f64> = (0..500).map(|i| 495.0 + (i % 11) as f64).collect();
        let treatment_orders: Vec<f64> = (0..500).map(|i| 745.0 + (i % 11) as f64).collect();

        let result = analyze(
            &control,
            &treatment,
            Some(&control_orders),
            Some(&treatment_orders),
            0.95,
        );

        assert!(!result.conversion.significant);
        assert!(result.revenue.significant);
        assert_eq!(result.winner, Winner::Variant);
        assert!(result.recommendation.contains("revenue"));
    }
}
