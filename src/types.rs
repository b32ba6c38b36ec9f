//! Common quantities and traits for the packing engine.
//!
//! Weights are whole grams, prices are currency amounts. Everything that
//! carries a weight or a price exposes it through the traits below so the
//! allocator can treat items, packages and carts uniformly.

/// Weight in whole grams.
pub type Grams = u64;

/// Currency amount (e.g. dollars with cents as fraction).
pub type Money = f64;

/// Tolerance for currency comparisons.
///
/// Prices are accumulated incrementally, so sums like `0.1 + 0.2` must still
/// compare equal to their decimal counterpart.
pub const EPSILON_PRICE: f64 = 1e-6;

/// Trait for objects with weight.
pub trait Weighted {
    /// Returns the weight in grams.
    fn weight(&self) -> Grams;
}

/// Trait for objects with a price.
pub trait Priced {
    /// Returns the price in currency units.
    fn price(&self) -> Money;
}

/// Compares two amounts with `EPSILON_PRICE` tolerance: `a <= b`.
#[inline]
pub fn price_at_most(a: Money, b: Money) -> bool {
    a <= b + EPSILON_PRICE
}

/// Validation functions shared by item construction and request parsing.
pub mod validation {
    use super::Money;

    /// Validates an item name.
    ///
    /// # Returns
    /// `Ok(())` for a non-blank name, otherwise error text
    pub fn validate_name(name: &str) -> Result<(), String> {
        if name.trim().is_empty() {
            return Err("Name must not be empty".to_string());
        }
        Ok(())
    }

    /// Validates a price.
    ///
    /// # Returns
    /// `Ok(())` for finite non-negative values, otherwise error text
    pub fn validate_price(value: Money) -> Result<(), String> {
        if value.is_nan() {
            return Err("Price must not be NaN".to_string());
        }
        if value.is_infinite() {
            return Err("Price must not be infinite".to_string());
        }
        if value < 0.0 {
            return Err(format!("Price must not be negative, got: {}", value));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_at_most_tolerates_rounding() {
        assert!(price_at_most(0.1 + 0.2, 0.3));
        assert!(price_at_most(250.0, 250.0));
        assert!(!price_at_most(250.01, 250.0));
    }

    #[test]
    fn test_validation_name() {
        assert!(validation::validate_name("Item 1").is_ok());
        assert!(validation::validate_name("").is_err());
        assert!(validation::validate_name("   ").is_err());
    }

    #[test]
    fn test_validation_price() {
        assert!(validation::validate_price(0.0).is_ok());
        assert!(validation::validate_price(12.5).is_ok());
        assert!(validation::validate_price(-1.0).is_err());
        assert!(validation::validate_price(f64::NAN).is_err());
        assert!(validation::validate_price(f64::INFINITY).is_err());
    }
}
