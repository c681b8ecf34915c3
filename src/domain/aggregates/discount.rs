//! Percentage discounts on catalog products.
//!
//! At most one discount per product is active at a time; activating a new
//! one deactivates the old. The product keeps its pre-discount price so
//! deactivation can restore it.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Discount {
    pub id: Uuid,
    pub product_id: Uuid,
    /// Percentage in (0, 100].
    pub rate: Decimal,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Discount {
    pub fn new(product_id: Uuid, rate: Decimal) -> Result<Self, Error> {
        if rate <= Decimal::ZERO || rate > Decimal::from(100) {
            return Err(Error::InvalidArgument(
                "discount rate must be between 0 and 100".into(),
            ));
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::now_v7(),
            product_id,
            rate,
            starts_at: now,
            ends_at: now + Duration::days(30),
            active: true,
            created_at: now,
        })
    }

    /// Discounted price rounded to two decimal places, half-up.
    pub fn apply_to(&self, price: Decimal) -> Decimal {
        let multiplier = Decimal::ONE - self.rate / Decimal::from(100);
        (price * multiplier).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_must_be_in_range() {
        let pid = Uuid::now_v7();
        assert!(Discount::new(pid, Decimal::ZERO).is_err());
        assert!(Discount::new(pid, Decimal::from(-5)).is_err());
        assert!(Discount::new(pid, Decimal::from(101)).is_err());
        assert!(Discount::new(pid, Decimal::from(100)).is_ok());
    }

    #[test]
    fn apply_rounds_half_up() {
        let d = Discount::new(Uuid::now_v7(), Decimal::from(25)).unwrap();
        // 10.33 * 0.75 = 7.7475 -> 7.75
        assert_eq!(d.apply_to(Decimal::new(1033, 2)), Decimal::new(775, 2));
    }

    #[test]
    fn full_discount_zeroes_price() {
        let d = Discount::new(Uuid::now_v7(), Decimal::from(100)).unwrap();
        assert_eq!(d.apply_to(Decimal::new(999, 2)), Decimal::new(0, 2));
    }
}
