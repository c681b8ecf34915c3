//! Product catalog entry and its stock ledger.
//!
//! The inventory count is the one resource mutated by several workflows
//! (checkout, cancel, refund approval). All mutators go through
//! [`Product::decrease_stock`] / [`Product::increase_stock`] so the
//! `inventory >= 0` invariant holds everywhere; stores additionally apply
//! decrements as a single conditional update to close the race between
//! concurrent checkouts.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub brand: Option<String>,
    pub description: Option<String>,
    pub price: Decimal,
    pub currency: String,
    pub inventory: i32,
    /// Pre-discount price, present only while a discount is active.
    pub original_price: Option<Decimal>,
    pub discount_rate: Option<Decimal>,
    pub on_sale: bool,
    pub average_rating: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn new(name: impl Into<String>, price: Decimal, currency: &str, inventory: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            brand: None,
            description: None,
            price,
            currency: currency.to_string(),
            inventory,
            original_price: None,
            discount_rate: None,
            on_sale: false,
            average_rating: 0.0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_stock(&self, quantity: u32) -> bool {
        self.inventory >= quantity as i32
    }

    /// Checked decrement. The check precedes the mutation so a negative
    /// inventory is never observable, even transiently.
    pub fn decrease_stock(&mut self, quantity: u32) -> Result<(), Error> {
        if !self.has_stock(quantity) {
            return Err(Error::InsufficientStock {
                name: self.name.clone(),
                requested: quantity,
                available: self.inventory.max(0) as u32,
            });
        }
        self.inventory -= quantity as i32;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Unconditional restock, used on cancellation and refund approval.
    pub fn increase_stock(&mut self, quantity: u32) {
        self.inventory += quantity as i32;
        self.updated_at = Utc::now();
    }
}
