//! Domain events published after lifecycle writes commit.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::OrderStatus;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    OrderPlaced {
        order_id: Uuid,
        user_id: Uuid,
        total: Decimal,
        currency: String,
    },
    OrderStatusChanged {
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    },
    OrderCancelled {
        order_id: Uuid,
        user_id: Uuid,
    },
    RefundRequested {
        order_id: Uuid,
        item_id: Uuid,
    },
    RefundResolved {
        order_id: Uuid,
        item_id: Uuid,
        approved: bool,
    },
    DiscountActivated {
        discount_id: Uuid,
        product_id: Uuid,
        rate: Decimal,
    },
    DiscountDeactivated {
        discount_id: Uuid,
        product_id: Uuid,
    },
}

impl DomainEvent {
    /// Subject the event is published under.
    pub fn subject(&self) -> &'static str {
        match self {
            DomainEvent::OrderPlaced { .. } => "storefront.orders.placed",
            DomainEvent::OrderStatusChanged { .. } => "storefront.orders.status",
            DomainEvent::OrderCancelled { .. } => "storefront.orders.cancelled",
            DomainEvent::RefundRequested { .. } => "storefront.refunds.requested",
            DomainEvent::RefundResolved { .. } => "storefront.refunds.resolved",
            DomainEvent::DiscountActivated { .. } => "storefront.discounts.activated",
            DomainEvent::DiscountDeactivated { .. } => "storefront.discounts.deactivated",
        }
    }
}
