//! Cart aggregate.
//!
//! A cart belongs to exactly one user or one guest session. Items are
//! unique per product; re-adding a product merges into the existing line.
//! The total is recomputed after every mutation rather than adjusted
//! incrementally.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::aggregates::product::Product;
use crate::domain::value_objects::Money;
use crate::error::Error;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cart {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub guest_token: Option<String>,
    pub items: Vec<CartItem>,
    pub total: Decimal,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CartItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl CartItem {
    pub fn line_total(&self, currency: &str) -> Money {
        Money::new(self.unit_price, currency).multiply(self.quantity)
    }
}

impl Cart {
    pub fn for_user(user_id: Uuid, currency: &str) -> Self {
        Self::empty(Some(user_id), None, currency)
    }

    pub fn for_guest(token: impl Into<String>, currency: &str) -> Self {
        Self::empty(None, Some(token.into()), currency)
    }

    fn empty(user_id: Option<Uuid>, guest_token: Option<String>, currency: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            user_id,
            guest_token,
            items: vec![],
            total: Decimal::ZERO,
            currency: currency.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item_for(&self, product_id: Uuid) -> Option<&CartItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    /// Adds `quantity` of `product`. An existing line for the same product
    /// absorbs the quantity and has its unit price refreshed to the
    /// product's current price.
    pub fn add_item(&mut self, product: &Product, quantity: u32) -> Result<(), Error> {
        if quantity == 0 {
            return Err(Error::InvalidArgument("quantity must be at least 1".into()));
        }
        match self.items.iter_mut().find(|i| i.product_id == product.id) {
            Some(existing) => {
                existing.quantity += quantity;
                existing.unit_price = product.price;
            }
            None => self.items.push(CartItem {
                id: Uuid::now_v7(),
                product_id: product.id,
                name: product.name.clone(),
                quantity,
                unit_price: product.price,
            }),
        }
        self.recalculate();
        Ok(())
    }

    /// Sets the quantity of an existing line; zero removes the line.
    pub fn update_quantity(&mut self, product_id: Uuid, quantity: u32) -> Result<(), Error> {
        if self.item_for(product_id).is_none() {
            return Err(Error::NotFound("cart item"));
        }
        if quantity == 0 {
            self.items.retain(|i| i.product_id != product_id);
        } else if let Some(item) = self.items.iter_mut().find(|i| i.product_id == product_id) {
            item.quantity = quantity;
        }
        self.recalculate();
        Ok(())
    }

    pub fn remove_item(&mut self, product_id: Uuid) -> Result<(), Error> {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        if self.items.len() == before {
            return Err(Error::NotFound("cart item"));
        }
        self.recalculate();
        Ok(())
    }

    /// Idempotent: clearing an empty cart is a no-op.
    pub fn clear(&mut self) {
        self.items.clear();
        self.recalculate();
    }

    /// Absorbs every line of `other` (a guest cart), summing quantities
    /// where both carts hold the same product.
    pub fn merge_from(&mut self, other: &Cart) {
        for item in &other.items {
            match self.items.iter_mut().find(|i| i.product_id == item.product_id) {
                Some(existing) => existing.quantity += item.quantity,
                None => self.items.push(CartItem {
                    id: Uuid::now_v7(),
                    product_id: item.product_id,
                    name: item.name.clone(),
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                }),
            }
        }
        self.recalculate();
    }

    fn recalculate(&mut self) {
        let zero = Money::zero(&self.currency);
        self.total = self
            .items
            .iter()
            .fold(zero, |acc, i| {
                let line = i.line_total(&self.currency);
                acc.add(&line).unwrap_or(acc)
            })
            .amount();
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(price_cents: i64, stock: i32) -> Product {
        Product::new("Widget", Decimal::new(price_cents, 2), "USD", stock)
    }

    #[test]
    fn add_merges_per_product() {
        let p = product(1000, 10);
        let mut cart = Cart::for_user(Uuid::now_v7(), "USD");
        cart.add_item(&p, 2).unwrap();
        cart.add_item(&p, 1).unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 3);
        assert_eq!(cart.total, Decimal::new(3000, 2));
    }

    #[test]
    fn add_refreshes_unit_price_on_merge() {
        let mut p = product(1000, 10);
        let mut cart = Cart::for_user(Uuid::now_v7(), "USD");
        cart.add_item(&p, 1).unwrap();
        p.price = Decimal::new(1200, 2);
        cart.add_item(&p, 1).unwrap();
        assert_eq!(cart.items[0].unit_price, Decimal::new(1200, 2));
        assert_eq!(cart.total, Decimal::new(2400, 2));
    }

    #[test]
    fn zero_quantity_add_is_rejected() {
        let p = product(1000, 10);
        let mut cart = Cart::for_user(Uuid::now_v7(), "USD");
        assert!(matches!(cart.add_item(&p, 0), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn update_to_zero_removes_line() {
        let p = product(1000, 10);
        let mut cart = Cart::for_user(Uuid::now_v7(), "USD");
        cart.add_item(&p, 2).unwrap();
        cart.update_quantity(p.id, 0).unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.total, Decimal::ZERO);
    }

    #[test]
    fn remove_missing_item_is_not_found() {
        let mut cart = Cart::for_user(Uuid::now_v7(), "USD");
        assert!(matches!(cart.remove_item(Uuid::now_v7()), Err(Error::NotFound(_))));
    }

    #[test]
    fn clear_is_idempotent() {
        let p = product(1000, 10);
        let mut cart = Cart::for_user(Uuid::now_v7(), "USD");
        cart.add_item(&p, 2).unwrap();
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.total, Decimal::ZERO);
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.total, Decimal::ZERO);
    }

    #[test]
    fn merge_sums_quantities_per_product() {
        let p = product(1000, 10);
        let other = product(500, 10);

        let mut guest = Cart::for_guest("g-1", "USD");
        guest.add_item(&p, 2).unwrap();
        guest.add_item(&other, 1).unwrap();

        let mut user = Cart::for_user(Uuid::now_v7(), "USD");
        user.add_item(&p, 1).unwrap();
        user.merge_from(&guest);

        assert_eq!(user.items.len(), 2);
        assert_eq!(user.item_for(p.id).unwrap().quantity, 3);
        assert_eq!(user.item_for(other.id).unwrap().quantity, 1);
        assert_eq!(user.total, Decimal::new(3500, 2));
    }

    #[test]
    fn merge_from_empty_cart_is_noop() {
        let p = product(1000, 10);
        let mut user = Cart::for_user(Uuid::now_v7(), "USD");
        user.add_item(&p, 1).unwrap();
        let total = user.total;
        user.merge_from(&Cart::for_guest("g-2", "USD"));
        assert_eq!(user.items.len(), 1);
        assert_eq!(user.total, total);
    }
}
