//! Order aggregate.
//!
//! An order is a snapshot of a cart taken at checkout: line items capture
//! quantity and unit price at purchase time and never change afterwards,
//! except for each item's refund status. Status changes go through an
//! explicit transition table; the looseness of ad-hoc overwrites is
//! deliberately not carried over.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::aggregates::cart::Cart;
use crate::error::Error;

/// Days after the order date during which a refund may still be requested.
pub const REFUND_WINDOW_DAYS: i64 = 30;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Processing,
    Provisioning,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Forward-only transition table. `Cancelled` is reachable from any
    /// non-terminal state; nothing leaves `Delivered` or `Cancelled`.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Processing, Provisioning)
                | (Provisioning, Delivered)
                | (Pending, Cancelled)
                | (Processing, Cancelled)
                | (Provisioning, Cancelled)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Provisioning => "PROVISIONING",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Result<Self, Error> {
        match s {
            "PENDING" => Ok(OrderStatus::Pending),
            "PROCESSING" => Ok(OrderStatus::Processing),
            "PROVISIONING" => Ok(OrderStatus::Provisioning),
            "DELIVERED" => Ok(OrderStatus::Delivered),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            other => Err(Error::InvalidArgument(format!("unknown order status: {other}"))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundStatus {
    #[default]
    None,
    Requested,
    Approved,
    Rejected,
}

impl RefundStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RefundStatus::None => "NONE",
            RefundStatus::Requested => "REQUESTED",
            RefundStatus::Approved => "APPROVED",
            RefundStatus::Rejected => "REJECTED",
        }
    }

    pub fn parse(s: &str) -> Result<Self, Error> {
        match s {
            "NONE" => Ok(RefundStatus::None),
            "REQUESTED" => Ok(RefundStatus::Requested),
            "APPROVED" => Ok(RefundStatus::Approved),
            "REJECTED" => Ok(RefundStatus::Rejected),
            other => Err(Error::InvalidArgument(format!("unknown refund status: {other}"))),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShippingDetails {
    pub address: String,
    pub phone: String,
    pub email: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub ordered_at: DateTime<Utc>,
    pub total: Decimal,
    pub currency: String,
    pub shipping: ShippingDetails,
    pub items: Vec<OrderItem>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub refund_status: RefundStatus,
}

impl OrderItem {
    /// `None -> Requested`; anything else is an illegal transition.
    pub fn request_refund(&mut self) -> Result<(), Error> {
        if self.refund_status != RefundStatus::None {
            return Err(Error::InvalidState(format!(
                "refund already {} for this item",
                self.refund_status.as_str()
            )));
        }
        self.refund_status = RefundStatus::Requested;
        Ok(())
    }

    /// `Requested -> {Approved, Rejected}`. Resolving an item that was
    /// never requested, or re-resolving a settled one, is rejected.
    pub fn resolve_refund(&mut self, approved: bool) -> Result<(), Error> {
        if self.refund_status != RefundStatus::Requested {
            return Err(Error::InvalidState(format!(
                "refund is {}, expected REQUESTED",
                self.refund_status.as_str()
            )));
        }
        self.refund_status = if approved {
            RefundStatus::Approved
        } else {
            RefundStatus::Rejected
        };
        Ok(())
    }
}

impl Order {
    /// Snapshots a cart into a `Pending` order. The cart must be non-empty;
    /// stock is validated and decremented by the caller inside the same
    /// store transaction that persists the order.
    pub fn from_cart(cart: &Cart, user_id: Uuid, shipping: ShippingDetails) -> Result<Self, Error> {
        if cart.is_empty() {
            return Err(Error::EmptyCart);
        }
        let order_id = Uuid::now_v7();
        let items = cart
            .items
            .iter()
            .map(|ci| OrderItem {
                id: Uuid::now_v7(),
                order_id,
                product_id: ci.product_id,
                name: ci.name.clone(),
                quantity: ci.quantity,
                unit_price: ci.unit_price,
                refund_status: RefundStatus::None,
            })
            .collect::<Vec<_>>();
        let total = items
            .iter()
            .map(|i| i.unit_price * Decimal::from(i.quantity))
            .sum();
        Ok(Self {
            id: order_id,
            user_id,
            status: OrderStatus::Pending,
            ordered_at: Utc::now(),
            total,
            currency: cart.currency.clone(),
            shipping,
            items,
        })
    }

    pub fn item(&self, item_id: Uuid) -> Option<&OrderItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    pub fn item_mut(&mut self, item_id: Uuid) -> Option<&mut OrderItem> {
        self.items.iter_mut().find(|i| i.id == item_id)
    }

    pub fn owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }

    /// Customer-facing cancellation: allowed from any state except
    /// `Delivered` (and a second cancel of a cancelled order).
    pub fn cancel(&mut self) -> Result<(), Error> {
        match self.status {
            OrderStatus::Delivered => Err(Error::InvalidState(
                "delivered orders cannot be cancelled".into(),
            )),
            OrderStatus::Cancelled => {
                Err(Error::InvalidState("order is already cancelled".into()))
            }
            _ => {
                self.status = OrderStatus::Cancelled;
                Ok(())
            }
        }
    }

    pub fn set_status(&mut self, next: OrderStatus) -> Result<(), Error> {
        if !self.status.can_transition_to(next) {
            return Err(Error::InvalidState(format!(
                "cannot move order from {} to {}",
                self.status.as_str(),
                next.as_str()
            )));
        }
        self.status = next;
        Ok(())
    }

    /// (product, quantity) pairs to return to stock when the whole order
    /// is reversed.
    pub fn restock_quantities(&self) -> Vec<(Uuid, u32)> {
        self.items.iter().map(|i| (i.product_id, i.quantity)).collect()
    }

    /// Refund requests are accepted up to and including day
    /// [`REFUND_WINDOW_DAYS`] after the order date.
    pub fn within_refund_window(&self, now: DateTime<Utc>) -> bool {
        let days = (now.date_naive() - self.ordered_at.date_naive()).num_days();
        days <= REFUND_WINDOW_DAYS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::product::Product;
    use chrono::Duration;

    fn cart_with_one_item() -> (Cart, Product) {
        let p = Product::new("Widget", Decimal::new(1000, 2), "USD", 5);
        let mut cart = Cart::for_user(Uuid::now_v7(), "USD");
        cart.add_item(&p, 2).unwrap();
        (cart, p)
    }

    fn order() -> Order {
        let (cart, _) = cart_with_one_item();
        Order::from_cart(&cart, cart.user_id.unwrap(), shipping()).unwrap()
    }

    fn shipping() -> ShippingDetails {
        ShippingDetails {
            address: "1 Main St".into(),
            phone: "555-0100".into(),
            email: "buyer@example.com".into(),
        }
    }

    #[test]
    fn from_cart_snapshots_items_and_total() {
        let (cart, p) = cart_with_one_item();
        let order = Order::from_cart(&cart, cart.user_id.unwrap(), shipping()).unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].product_id, p.id);
        assert_eq!(order.items[0].quantity, 2);
        assert_eq!(order.total, Decimal::new(2000, 2));
    }

    #[test]
    fn from_empty_cart_fails() {
        let cart = Cart::for_user(Uuid::now_v7(), "USD");
        assert!(matches!(
            Order::from_cart(&cart, cart.user_id.unwrap(), shipping()),
            Err(Error::EmptyCart)
        ));
    }

    #[test]
    fn transition_table_is_forward_only() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Provisioning));
        assert!(Provisioning.can_transition_to(Delivered));
        assert!(!Delivered.can_transition_to(Pending));
        assert!(!Delivered.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Processing));
        assert!(!Pending.can_transition_to(Delivered));
    }

    #[test]
    fn cancel_rejected_after_delivery() {
        let mut o = order();
        o.status = OrderStatus::Delivered;
        assert!(matches!(o.cancel(), Err(Error::InvalidState(_))));
        assert_eq!(o.status, OrderStatus::Delivered);
    }

    #[test]
    fn cancel_is_not_repeatable() {
        let mut o = order();
        o.cancel().unwrap();
        assert!(matches!(o.cancel(), Err(Error::InvalidState(_))));
    }

    #[test]
    fn refund_state_machine() {
        let mut o = order();
        let item = &mut o.items[0];
        assert!(item.resolve_refund(true).is_err());
        item.request_refund().unwrap();
        assert!(item.request_refund().is_err());
        item.resolve_refund(true).unwrap();
        assert_eq!(item.refund_status, RefundStatus::Approved);
        assert!(item.resolve_refund(false).is_err());
    }

    #[test]
    fn refund_window_boundary() {
        let mut o = order();
        let now = Utc::now();
        o.ordered_at = now - Duration::days(30);
        assert!(o.within_refund_window(now));
        o.ordered_at = now - Duration::days(31);
        assert!(!o.within_refund_window(now));
    }

    #[test]
    fn status_round_trips_through_strings() {
        for s in [
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderStatus::Provisioning,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(OrderStatus::parse(s.as_str()).unwrap(), s);
        }
    }
}
