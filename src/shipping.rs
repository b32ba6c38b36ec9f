//! Shipping tier schedule.
//!
//! Shipping cost is a step function of package weight. Each bracket covers
//! the weights up to and including its upper bound; the first bracket starts
//! at 0 g. Weights above the last bound have no defined cost.

use crate::types::{Grams, Money};

/// One step of the schedule: weights `<= upper_bound` (and above the previous
/// bound) ship for `cost`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShippingBracket {
    pub upper_bound: Grams,
    pub cost: Money,
}

/// Ordered list of shipping brackets.
#[derive(Clone, Debug, PartialEq)]
pub struct ShippingSchedule {
    brackets: Vec<ShippingBracket>,
}

impl ShippingSchedule {
    /// Brackets used when nothing else is configured: 0-200 g ships for 5,
    /// 201-500 g for 10, 501-1000 g for 15 and 1001-5000 g for 20.
    pub const DEFAULT_BRACKETS: [(Grams, Money); 4] =
        [(200, 5.0), (500, 10.0), (1000, 15.0), (5000, 20.0)];

    /// Builds a schedule from `(upper_bound, cost)` pairs.
    ///
    /// Bounds must be strictly increasing and the list must not be empty.
    pub fn new(brackets: &[(Grams, Money)]) -> Result<Self, String> {
        if brackets.is_empty() {
            return Err("Shipping schedule needs at least one bracket".to_string());
        }
        for pair in brackets.windows(2) {
            if pair[0].0 >= pair[1].0 {
                return Err(format!(
                    "Shipping bracket bounds must increase strictly ({} >= {})",
                    pair[0].0, pair[1].0
                ));
            }
        }
        Ok(Self {
            brackets: brackets
                .iter()
                .map(|&(upper_bound, cost)| ShippingBracket { upper_bound, cost })
                .collect(),
        })
    }

    fn bracket_for(&self, weight: Grams) -> Option<&ShippingBracket> {
        self.brackets.iter().find(|b| weight <= b.upper_bound)
    }

    /// Shipping cost for a package of the given weight.
    ///
    /// `None` above the heaviest bracket.
    pub fn cost_for(&self, weight: Grams) -> Option<Money> {
        self.bracket_for(weight).map(|b| b.cost)
    }

    /// Grams that can still be added before the weight crosses into the next
    /// bracket.
    pub fn headroom(&self, weight: Grams) -> Option<Grams> {
        self.bracket_for(weight).map(|b| b.upper_bound - weight)
    }

    /// Heaviest weight with a defined shipping cost.
    pub fn max_weight(&self) -> Grams {
        self.brackets.last().map_or(0, |b| b.upper_bound)
    }

    pub fn brackets(&self) -> &[ShippingBracket] {
        &self.brackets
    }
}

impl Default for ShippingSchedule {
    fn default() -> Self {
        Self {
            brackets: Self::DEFAULT_BRACKETS
                .iter()
                .map(|&(upper_bound, cost)| ShippingBracket { upper_bound, cost })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0, 5.0; "empty")]
    #[test_case(200, 5.0; "top of first bracket")]
    #[test_case(201, 10.0; "bottom of second bracket")]
    #[test_case(500, 10.0; "top of second bracket")]
    #[test_case(501, 15.0; "bottom of third bracket")]
    #[test_case(1000, 15.0; "top of third bracket")]
    #[test_case(1001, 20.0; "bottom of fourth bracket")]
    #[test_case(5000, 20.0; "top of fourth bracket")]
    fn cost_follows_tier_boundaries(weight: Grams, expected: Money) {
        assert_eq!(ShippingSchedule::default().cost_for(weight), Some(expected));
    }

    #[test_case(0, 200)]
    #[test_case(150, 50)]
    #[test_case(200, 0)]
    #[test_case(201, 299)]
    #[test_case(999, 1)]
    #[test_case(4800, 200)]
    fn headroom_reaches_next_boundary(weight: Grams, expected: Grams) {
        assert_eq!(ShippingSchedule::default().headroom(weight), Some(expected));
    }

    #[test]
    fn weight_above_last_bracket_is_undefined() {
        let schedule = ShippingSchedule::default();
        assert_eq!(schedule.max_weight(), 5000);
        assert_eq!(schedule.cost_for(5001), None);
        assert_eq!(schedule.headroom(5001), None);
    }

    #[test]
    fn rejects_unordered_brackets() {
        assert!(ShippingSchedule::new(&[(500, 10.0), (200, 5.0)]).is_err());
        assert!(ShippingSchedule::new(&[]).is_err());
        assert!(ShippingSchedule::new(&[(100, 1.0), (300, 2.0)]).is_ok());
    }
}
