//! Service-wide defaults and limits in one place.

/// Default confidence level for significance tests (95%)
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;

/// Default statistical power for sample-size calculations (80%)
pub const DEFAULT_POWER: f64 = 0.8;

/// Default significance level (alpha) for sample-size calculations
pub const DEFAULT_SIGNIFICANCE_LEVEL: f64 = 0.05;

/// Relative minimum detectable effect the sample-size recommendation is
/// anchored on (5% relative lift)
pub const DEFAULT_RELATIVE_MDE: f64 = 0.05;

/// Baseline conversion rate assumed when the control arm has no conversions
/// yet (3% is a typical storefront conversion rate)
pub const FALLBACK_BASELINE_RATE: f64 = 0.03;

/// Traffic weights are integer percentages
pub const MAX_VARIANT_WEIGHT: u32 = 100;

/// Weights across one experiment's variants must sum to this
pub const WEIGHT_TOTAL: u32 = 100;

/// Maximum lengths for client-supplied identifiers
pub const MAX_VISITOR_ID_LENGTH: usize = 128;
pub const MAX_ORDER_ID_LENGTH: usize = 128;
pub const MAX_NAME_LENGTH: usize = 256;
pub const MAX_PROMO_CODE_LENGTH: usize = 64;
pub const MAX_PRODUCT_IDS: usize = 200;
