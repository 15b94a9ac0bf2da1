//! Input validation at the API boundary.
//! Everything client-supplied is checked here before any store access.

use anyhow::{anyhow, Result};

use crate::constants::{
    MAX_NAME_LENGTH, MAX_ORDER_ID_LENGTH, MAX_PRODUCT_IDS, MAX_PROMO_CODE_LENGTH,
    MAX_VARIANT_WEIGHT, MAX_VISITOR_ID_LENGTH,
};

/// Validate a client-generated visitor identifier.
pub fn validate_visitor_id(visitor_id: &str) -> Result<()> {
    if visitor_id.is_empty() {
        return Err(anyhow!("visitor_id cannot be empty"));
    }

    if visitor_id.len() > MAX_VISITOR_ID_LENGTH {
        return Err(anyhow!(
            "visitor_id too long: {} chars (max: {})",
            visitor_id.len(),
            MAX_VISITOR_ID_LENGTH
        ));
    }

    // Only allow alphanumeric, dash, underscore
    if !visitor_id
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(anyhow!(
            "visitor_id contains invalid characters (allowed: alphanumeric, -, _)"
        ));
    }

    Ok(())
}

/// Validate a display name.
pub fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(anyhow!("name cannot be empty"));
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(anyhow!(
            "name too long: {} chars (max: {})",
            name.len(),
            MAX_NAME_LENGTH
        ));
    }
    Ok(())
}

/// Validate a variant traffic weight.
pub fn validate_weight(weight: u32) -> Result<()> {
    if weight > MAX_VARIANT_WEIGHT {
        return Err(anyhow!(
            "weight must be between 0 and {MAX_VARIANT_WEIGHT}, got: {weight}"
        ));
    }
    Ok(())
}

/// Validate a promotional code.
pub fn validate_promo_code(code: &str) -> Result<()> {
    if code.is_empty() {
        return Err(anyhow!("promo_code cannot be empty when present"));
    }
    if code.len() > MAX_PROMO_CODE_LENGTH {
        return Err(anyhow!(
            "promo_code too long: {} chars (max: {})",
            code.len(),
            MAX_PROMO_CODE_LENGTH
        ));
    }
    Ok(())
}

/// Validate an order identifier.
pub fn validate_order_id(order_id: &str) -> Result<()> {
    if order_id.is_empty() {
        return Err(anyhow!("order_id cannot be empty when present"));
    }
    if order_id.len() > MAX_ORDER_ID_LENGTH {
        return Err(anyhow!(
            "order_id too long: {} chars (max: {})",
            order_id.len(),
            MAX_ORDER_ID_LENGTH
        ));
    }
    Ok(())
}

/// Validate revenue from an untrusted payload. Revenue arrives signed so a
/// negative amount is rejected with a field error instead of a
/// deserialization failure.
pub fn validate_revenue_cents(revenue_cents: i64) -> Result<u64> {
    if revenue_cents < 0 {
        return Err(anyhow!(
            "revenue_cents must be a non-negative integer, got: {revenue_cents}"
        ));
    }
    Ok(revenue_cents as u64)
}

/// Validate the product id list on experiment creation.
pub fn validate_product_ids(product_ids: &[String]) -> Result<()> {
    if product_ids.len() > MAX_PRODUCT_IDS {
        return Err(anyhow!(
            "too many product ids: {} (max: {})",
            product_ids.len(),
            MAX_PRODUCT_IDS
        ));
    }
    for id in product_ids {
        if id.trim().is_empty() {
            return Err(anyhow!("product ids cannot be empty"));
        }
    }
    Ok(())
}

/// Validate a confidence level for analysis requests.
pub fn validate_confidence_level(level: f64) -> Result<()> {
    if !(0.5..1.0).contains(&level) {
        return Err(anyhow!(
            "confidence_level must be in [0.5, 1.0), got: {level}"
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visitor_ids() {
        assert!(validate_visitor_id("visitor-123_abc").is_ok());
        assert!(validate_visitor_id("").is_err());
        assert!(validate_visitor_id("has space").is_err());
        assert!(validate_visitor_id(&"x".repeat(200)).is_err());
    }

    #[test]
    fn weights() {
        assert!(validate_weight(0).is_ok());
        assert!(validate_weight(100).is_ok());
        assert!(validate_weight(101).is_err());
    }

    #[test]
    fn revenue() {
        assert_eq!(validate_revenue_cents(0).unwrap(), 0);
        assert_eq!(validate_revenue_cents(2599).unwrap(), 2599);
        assert!(validate_revenue_cents(-1).is_err());
    }

    #[test]
    fn confidence_levels() {
        assert!(validate_confidence_level(0.95).is_ok());
        assert!(validate_confidence_level(0.5).is_ok());
        assert!(validate_confidence_level(1.0).is_err());
        assert!(validate_confidence_level(0.2).is_err());
    }
}
