//! Display formatting for money, rates and lifts.
//!
//! Used by the recommendation strings and the dashboard-facing JSON; kept
//! here so every surface renders the same way.

/// Format an amount in minor currency units: `2599` becomes `"$25.99"`.
/// Negative amounts keep the sign ahead of the dollar sign.
pub fn format_currency(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}${}.{:02}", sign, abs / 100, abs % 100)
}

/// Format a rate in `[0, 1]` as a percentage with two decimals:
/// `0.0345` becomes `"3.45%"`.
pub fn format_percentage(rate: f64) -> String {
    format!("{:.2}%", rate * 100.0)
}

/// Format an already-relative lift value with one decimal:
/// `-10.5` becomes `"-10.5%"`.
pub fn format_lift(lift: f64) -> String {
    format!("{:.1}%", lift)
}
