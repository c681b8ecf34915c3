//! Order lifecycle: checkout, status transitions, cancellation, and the
//! per-item refund workflow.
//!
//! Every operation that moves stock does so inside the same store
//! operation that persists the status change, so an order status is never
//! observable without its inventory effect. The write carries the state
//! this request read as a precondition, so two racing reversals settle
//! exactly once. Invoice rendering and email go out on spawned tasks after
//! the write commits and cannot fail a request.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::aggregates::{Order, OrderItem, OrderStatus, RefundStatus, ShippingDetails};
use crate::domain::events::DomainEvent;
use crate::error::{Error, Result};
use crate::services::invoices::Invoices;
use crate::services::notifications::{EventBus, Mailer};
use crate::store::Store;

pub struct OrderService {
    store: Arc<dyn Store>,
    mailer: Arc<dyn Mailer>,
    invoices: Arc<Invoices>,
    events: EventBus,
    currency: String,
}

impl OrderService {
    pub fn new(
        store: Arc<dyn Store>,
        mailer: Arc<dyn Mailer>,
        invoices: Arc<Invoices>,
        events: EventBus,
        currency: &str,
    ) -> Self {
        Self {
            store,
            mailer,
            invoices,
            events,
            currency: currency.to_string(),
        }
    }

    /// Converts the user's cart into a `Pending` order.
    ///
    /// The store applies the order insert, every stock decrement, and the
    /// cart clear as one atomic operation; a failed decrement aborts the
    /// whole checkout with `InsufficientStock` and no partial order.
    pub async fn checkout(&self, user_id: Uuid, shipping: ShippingDetails) -> Result<Order> {
        let cart = self.store.cart_for_user(user_id, &self.currency).await?;
        let order = Order::from_cart(&cart, user_id, shipping)?;
        self.store.place_order(&order, cart.id).await?;

        tracing::info!(order_id = %order.id, %user_id, total = %order.total, "order placed");
        self.events.publish(DomainEvent::OrderPlaced {
            order_id: order.id,
            user_id,
            total: order.total,
            currency: order.currency.clone(),
        });
        self.send_confirmation(order.clone());
        Ok(order)
    }

    /// Invoice + confirmation email, fire-and-forget.
    fn send_confirmation(&self, order: Order) {
        let mailer = Arc::clone(&self.mailer);
        let invoices = Arc::clone(&self.invoices);
        tokio::spawn(async move {
            let invoice = match invoices.generate(&order).await {
                Ok(path) => Some(path),
                Err(e) => {
                    tracing::warn!(order_id = %order.id, error = %e, "invoice generation failed");
                    None
                }
            };
            if let Err(e) = mailer
                .send_order_confirmation(&order.shipping.email, &order, invoice.as_deref())
                .await
            {
                tracing::warn!(order_id = %order.id, error = %e, "confirmation email failed");
            }
        });
    }

    pub async fn order_for_user(&self, order_id: Uuid, user_id: Uuid) -> Result<Order> {
        let order = self.store.order(order_id).await?;
        if !order.owned_by(user_id) {
            return Err(Error::Forbidden("order belongs to another user"));
        }
        Ok(order)
    }

    pub async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
        self.store.orders_for_user(user_id).await
    }

    pub async fn all_orders(&self) -> Result<Vec<Order>> {
        self.store.all_orders().await
    }

    /// Invoice document for an order, regenerated if missing. Unlike the
    /// checkout-time rendering this is the primary result of the call, so
    /// failures propagate.
    pub async fn invoice(&self, order_id: Uuid, user_id: Uuid) -> Result<PathBuf> {
        let order = self.order_for_user(order_id, user_id).await?;
        self.invoices
            .get_or_generate(&order)
            .await
            .map_err(|e| Error::Storage(e.to_string()))
    }

    /// Customer cancellation: ownership-checked, refused after delivery,
    /// restores stock for every line item.
    pub async fn cancel(&self, order_id: Uuid, user_id: Uuid) -> Result<Order> {
        let mut order = self.store.order(order_id).await?;
        if !order.owned_by(user_id) {
            return Err(Error::Forbidden("order belongs to another user"));
        }
        let from = order.status;
        order.cancel()?;
        self.store
            .update_order_status(order_id, from, OrderStatus::Cancelled, &order.restock_quantities())
            .await?;

        tracing::info!(%order_id, %user_id, "order cancelled");
        self.events.publish(DomainEvent::OrderCancelled { order_id, user_id });
        Ok(order)
    }

    /// Administrative status update. Transitions follow the forward-only
    /// table; cancellation through this path is additionally restricted to
    /// `Processing` and `Provisioning` and restores inventory.
    pub async fn update_status(&self, order_id: Uuid, next: OrderStatus) -> Result<Order> {
        let mut order = self.store.order(order_id).await?;
        let from = order.status;
        if next == OrderStatus::Cancelled
            && !matches!(from, OrderStatus::Processing | OrderStatus::Provisioning)
        {
            return Err(Error::InvalidState(format!(
                "administrative cancellation is only allowed from PROCESSING or PROVISIONING, \
                 order is {}",
                from.as_str()
            )));
        }
        order.set_status(next)?;
        let restock = if next == OrderStatus::Cancelled {
            order.restock_quantities()
        } else {
            vec![]
        };
        self.store.update_order_status(order_id, from, next, &restock).await?;

        tracing::info!(%order_id, from = from.as_str(), to = next.as_str(), "order status updated");
        self.events
            .publish(DomainEvent::OrderStatusChanged { order_id, from, to: next });
        Ok(order)
    }

    /// Opens a refund request for one order item. Ownership-checked, only
    /// accepted within the refund window, and only from the `None` state.
    pub async fn request_refund(
        &self,
        order_id: Uuid,
        item_id: Uuid,
        user_id: Uuid,
    ) -> Result<OrderItem> {
        let mut order = self.store.order(order_id).await?;
        if !order.owned_by(user_id) {
            return Err(Error::Forbidden("order belongs to another user"));
        }
        if !order.within_refund_window(Utc::now()) {
            return Err(Error::InvalidArgument(
                "refund requests are only accepted within 30 days of the order date".into(),
            ));
        }
        let item = order.item_mut(item_id).ok_or(Error::NotFound("order item"))?;
        item.request_refund()?;
        self.store
            .update_refund_status(order_id, item_id, RefundStatus::None, RefundStatus::Requested, None)
            .await?;

        tracing::info!(%order_id, %item_id, "refund requested");
        self.events.publish(DomainEvent::RefundRequested { order_id, item_id });
        Ok(item.clone())
    }

    /// Resolves a requested refund. Approval restores the product's stock
    /// in the same store operation as the status change and sends a
    /// best-effort notification.
    pub async fn resolve_refund(
        &self,
        order_id: Uuid,
        item_id: Uuid,
        approved: bool,
    ) -> Result<OrderItem> {
        let mut order = self.store.order(order_id).await?;
        let email = order.shipping.email.clone();
        let item = order.item_mut(item_id).ok_or(Error::NotFound("order item"))?;
        item.resolve_refund(approved)?;
        let status = item.refund_status;
        let restock = approved.then(|| (item.product_id, item.quantity));
        let resolved = item.clone();
        self.store
            .update_refund_status(order_id, item_id, RefundStatus::Requested, status, restock)
            .await?;

        tracing::info!(%order_id, %item_id, approved, "refund resolved");
        self.events
            .publish(DomainEvent::RefundResolved { order_id, item_id, approved });

        let mailer = Arc::clone(&self.mailer);
        let item_name = resolved.name.clone();
        tokio::spawn(async move {
            let subject = if approved {
                "Your refund has been approved"
            } else {
                "Your refund request was declined"
            };
            let body = format!("<p>Refund update for item: {item_name}</p>");
            if let Err(e) = mailer.send_email(&email, subject, &body).await {
                tracing::warn!(%order_id, error = %e, "refund notification failed");
            }
        });
        Ok(resolved)
    }
}
