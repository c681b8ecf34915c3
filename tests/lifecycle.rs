//! End-to-end order lifecycle tests over the in-memory store.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use storefront::domain::aggregates::{
    Order, OrderStatus, Product, RefundStatus, ShippingDetails,
};
use storefront::error::Error;
use storefront::services::{
    CartOwner, CartService, EventBus, Invoices, LogMailer, Mailer, OrderService,
};
use storefront::store::memory::MemoryStore;
use storefront::store::Store;

struct Harness {
    store: Arc<MemoryStore>,
    carts: CartService,
    orders: OrderService,
    _invoice_dir: tempfile::TempDir,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let dyn_store: Arc<dyn Store> = store.clone();
    let mailer: Arc<dyn Mailer> = Arc::new(LogMailer);
    let invoice_dir = tempfile::tempdir().unwrap();
    let invoices = Arc::new(Invoices::new(invoice_dir.path()));
    Harness {
        carts: CartService::new(dyn_store.clone(), "USD"),
        orders: OrderService::new(dyn_store, mailer, invoices, EventBus::disabled(), "USD"),
        store,
        _invoice_dir: invoice_dir,
    }
}

fn shipping() -> ShippingDetails {
    ShippingDetails {
        address: "1 Main St".into(),
        phone: "555-0100".into(),
        email: "buyer@example.com".into(),
    }
}

async fn seed_product(store: &MemoryStore, price_cents: i64, stock: i32) -> Product {
    let product = Product::new("Widget", Decimal::new(price_cents, 2), "USD", stock);
    store.insert_product(&product).await.unwrap();
    product
}

async fn place_order(h: &Harness, product: &Product, quantity: u32) -> (Uuid, Order) {
    let user = Uuid::now_v7();
    h.carts
        .add_item(&CartOwner::User(user), product.id, quantity)
        .await
        .unwrap();
    let order = h.orders.checkout(user, shipping()).await.unwrap();
    (user, order)
}

#[tokio::test]
async fn checkout_snapshots_cart_and_decrements_stock() {
    // Scenario A: stock 5, price 10.00, qty 2.
    let h = harness();
    let product = seed_product(&h.store, 1000, 5).await;
    let user = Uuid::now_v7();

    h.carts
        .add_item(&CartOwner::User(user), product.id, 2)
        .await
        .unwrap();
    let order = h.orders.checkout(user, shipping()).await.unwrap();

    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.total, Decimal::new(2000, 2));
    assert_eq!(order.items.len(), 1);
    assert_eq!(h.store.product(product.id).await.unwrap().inventory, 3);

    let cart = h.carts.cart(&CartOwner::User(user)).await.unwrap();
    assert!(cart.is_empty());
    assert_eq!(cart.total, Decimal::ZERO);
}

#[tokio::test]
async fn checkout_fails_whole_order_on_short_stock() {
    // Scenario B: qty 6 against stock 5.
    let h = harness();
    let product = seed_product(&h.store, 1000, 5).await;
    let user = Uuid::now_v7();

    h.carts
        .add_item(&CartOwner::User(user), product.id, 6)
        .await
        .unwrap();
    let err = h.orders.checkout(user, shipping()).await.unwrap_err();

    assert!(matches!(err, Error::InsufficientStock { requested: 6, available: 5, .. }));
    assert_eq!(h.store.product(product.id).await.unwrap().inventory, 5);
    assert!(h.orders.orders_for_user(user).await.unwrap().is_empty());
    // The cart survives the failed checkout.
    let cart = h.carts.cart(&CartOwner::User(user)).await.unwrap();
    assert_eq!(cart.items.len(), 1);
}

#[tokio::test]
async fn failing_line_rolls_back_earlier_decrements() {
    let h = harness();
    let plenty = seed_product(&h.store, 1000, 10).await;
    let scarce = {
        let p = Product::new("Scarce", Decimal::new(500, 2), "USD", 1);
        h.store.insert_product(&p).await.unwrap();
        p
    };
    let user = Uuid::now_v7();
    h.carts.add_item(&CartOwner::User(user), plenty.id, 2).await.unwrap();
    h.carts.add_item(&CartOwner::User(user), scarce.id, 3).await.unwrap();

    let err = h.orders.checkout(user, shipping()).await.unwrap_err();
    assert!(matches!(err, Error::InsufficientStock { .. }));
    assert_eq!(h.store.product(plenty.id).await.unwrap().inventory, 10);
    assert_eq!(h.store.product(scarce.id).await.unwrap().inventory, 1);
}

#[tokio::test]
async fn checkout_of_empty_cart_is_rejected() {
    let h = harness();
    let user = Uuid::now_v7();
    h.carts.cart(&CartOwner::User(user)).await.unwrap();
    assert!(matches!(
        h.orders.checkout(user, shipping()).await,
        Err(Error::EmptyCart)
    ));
}

#[tokio::test]
async fn cancel_restores_inventory_to_pre_order_level() {
    // Round trip: checkout then cancel leaves stock unchanged.
    let h = harness();
    let product = seed_product(&h.store, 1000, 5).await;
    let (user, order) = place_order(&h, &product, 2).await;
    assert_eq!(h.store.product(product.id).await.unwrap().inventory, 3);

    let cancelled = h.orders.cancel(order.id, user).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(h.store.product(product.id).await.unwrap().inventory, 5);
}

#[tokio::test]
async fn cancel_from_processing_restores_stock() {
    // Scenario C.
    let h = harness();
    let product = seed_product(&h.store, 1000, 5).await;
    let (user, order) = place_order(&h, &product, 2).await;

    h.orders.update_status(order.id, OrderStatus::Processing).await.unwrap();
    let cancelled = h.orders.cancel(order.id, user).await.unwrap();

    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(h.store.product(product.id).await.unwrap().inventory, 5);
}

#[tokio::test]
async fn delivered_orders_cannot_be_cancelled() {
    // Scenario D.
    let h = harness();
    let product = seed_product(&h.store, 1000, 5).await;
    let (user, order) = place_order(&h, &product, 2).await;
    for status in [OrderStatus::Processing, OrderStatus::Provisioning, OrderStatus::Delivered] {
        h.orders.update_status(order.id, status).await.unwrap();
    }

    let err = h.orders.cancel(order.id, user).await.unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
    let stored = h.store.order(order.id).await.unwrap();
    assert_eq!(stored.status, OrderStatus::Delivered);
    assert_eq!(h.store.product(product.id).await.unwrap().inventory, 3);
}

#[tokio::test]
async fn cancel_requires_ownership() {
    let h = harness();
    let product = seed_product(&h.store, 1000, 5).await;
    let (_user, order) = place_order(&h, &product, 1).await;
    let stranger = Uuid::now_v7();
    assert!(matches!(
        h.orders.cancel(order.id, stranger).await,
        Err(Error::Forbidden(_))
    ));
}

#[tokio::test]
async fn admin_status_updates_follow_transition_table() {
    let h = harness();
    let product = seed_product(&h.store, 1000, 5).await;
    let (_user, order) = place_order(&h, &product, 1).await;

    // Admin cancellation from PENDING is not allowed.
    assert!(matches!(
        h.orders.update_status(order.id, OrderStatus::Cancelled).await,
        Err(Error::InvalidState(_))
    ));
    // Skipping states is not allowed.
    assert!(matches!(
        h.orders.update_status(order.id, OrderStatus::Delivered).await,
        Err(Error::InvalidState(_))
    ));

    h.orders.update_status(order.id, OrderStatus::Processing).await.unwrap();
    let cancelled = h.orders.update_status(order.id, OrderStatus::Cancelled).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(h.store.product(product.id).await.unwrap().inventory, 5);

    // Nothing leaves CANCELLED.
    assert!(matches!(
        h.orders.update_status(order.id, OrderStatus::Processing).await,
        Err(Error::InvalidState(_))
    ));
}

#[tokio::test]
async fn refund_approval_restores_stock_and_settles_item() {
    // Scenario E.
    let h = harness();
    let product = seed_product(&h.store, 1000, 5).await;
    let (user, order) = place_order(&h, &product, 2).await;
    let item_id = order.items[0].id;

    let requested = h.orders.request_refund(order.id, item_id, user).await.unwrap();
    assert_eq!(requested.refund_status, RefundStatus::Requested);

    let resolved = h.orders.resolve_refund(order.id, item_id, true).await.unwrap();
    assert_eq!(resolved.refund_status, RefundStatus::Approved);
    assert_eq!(h.store.product(product.id).await.unwrap().inventory, 5);
}

#[tokio::test]
async fn rejected_refund_keeps_stock() {
    let h = harness();
    let product = seed_product(&h.store, 1000, 5).await;
    let (user, order) = place_order(&h, &product, 2).await;
    let item_id = order.items[0].id;

    h.orders.request_refund(order.id, item_id, user).await.unwrap();
    let resolved = h.orders.resolve_refund(order.id, item_id, false).await.unwrap();
    assert_eq!(resolved.refund_status, RefundStatus::Rejected);
    assert_eq!(h.store.product(product.id).await.unwrap().inventory, 3);
}

#[tokio::test]
async fn refund_cannot_be_resolved_twice() {
    let h = harness();
    let product = seed_product(&h.store, 1000, 5).await;
    let (user, order) = place_order(&h, &product, 2).await;
    let item_id = order.items[0].id;

    h.orders.request_refund(order.id, item_id, user).await.unwrap();
    h.orders.resolve_refund(order.id, item_id, true).await.unwrap();
    assert!(matches!(
        h.orders.resolve_refund(order.id, item_id, true).await,
        Err(Error::InvalidState(_))
    ));
    // Stock restored exactly once.
    assert_eq!(h.store.product(product.id).await.unwrap().inventory, 5);
}

#[tokio::test]
async fn refund_requires_request_before_resolution() {
    let h = harness();
    let product = seed_product(&h.store, 1000, 5).await;
    let (_user, order) = place_order(&h, &product, 2).await;
    assert!(matches!(
        h.orders.resolve_refund(order.id, order.items[0].id, true).await,
        Err(Error::InvalidState(_))
    ));
}

#[tokio::test]
async fn refund_window_accepts_day_30_rejects_day_31() {
    let h = harness();
    let product = seed_product(&h.store, 1000, 5).await;
    let user = Uuid::now_v7();

    for days in [30i64, 31] {
        h.carts.add_item(&CartOwner::User(user), product.id, 1).await.unwrap();
        let cart = h.carts.cart(&CartOwner::User(user)).await.unwrap();
        let mut order = Order::from_cart(&cart, user, shipping()).unwrap();
        order.ordered_at = Utc::now() - Duration::days(days);
        h.store.place_order(&order, cart.id).await.unwrap();

        let result = h.orders.request_refund(order.id, order.items[0].id, user).await;
        if days == 30 {
            assert!(result.is_ok(), "day 30 must be the last accepted day");
        } else {
            assert!(matches!(result, Err(Error::InvalidArgument(_))));
        }
    }
}

#[tokio::test]
async fn concurrent_checkouts_never_oversell() {
    // Scenario F: two qty-3 checkouts against stock 5.
    let h = harness();
    let product = seed_product(&h.store, 1000, 5).await;
    let (alice, bob) = (Uuid::now_v7(), Uuid::now_v7());
    h.carts.add_item(&CartOwner::User(alice), product.id, 3).await.unwrap();
    h.carts.add_item(&CartOwner::User(bob), product.id, 3).await.unwrap();

    let (a, b) = tokio::join!(
        h.orders.checkout(alice, shipping()),
        h.orders.checkout(bob, shipping()),
    );

    assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
    assert_eq!(h.store.product(product.id).await.unwrap().inventory, 2);
}

#[tokio::test]
async fn racing_cancellations_restock_exactly_once() {
    let h = harness();
    let product = seed_product(&h.store, 1000, 5).await;
    let (_user, order) = place_order(&h, &product, 2).await;

    // Two cancellation requests read the same PENDING order before either
    // writes; the status swap lets only the first apply its restock.
    let restock = order.restock_quantities();
    h.store
        .update_order_status(order.id, OrderStatus::Pending, OrderStatus::Cancelled, &restock)
        .await
        .unwrap();
    let err = h
        .store
        .update_order_status(order.id, OrderStatus::Pending, OrderStatus::Cancelled, &restock)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidState(_)));
    assert_eq!(h.store.product(product.id).await.unwrap().inventory, 5);
}

#[tokio::test]
async fn racing_refund_approvals_restock_exactly_once() {
    let h = harness();
    let product = seed_product(&h.store, 1000, 5).await;
    let (user, order) = place_order(&h, &product, 2).await;
    let item = &order.items[0];
    h.orders.request_refund(order.id, item.id, user).await.unwrap();

    // Both approvals observe the item as REQUESTED before either writes.
    let restock = Some((item.product_id, item.quantity));
    h.store
        .update_refund_status(
            order.id,
            item.id,
            RefundStatus::Requested,
            RefundStatus::Approved,
            restock,
        )
        .await
        .unwrap();
    let err = h
        .store
        .update_refund_status(
            order.id,
            item.id,
            RefundStatus::Requested,
            RefundStatus::Approved,
            restock,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidState(_)));
    assert_eq!(h.store.product(product.id).await.unwrap().inventory, 5);
}

#[tokio::test]
async fn orders_for_user_are_newest_first() {
    let h = harness();
    let product = seed_product(&h.store, 1000, 10).await;
    let user = Uuid::now_v7();

    h.carts.add_item(&CartOwner::User(user), product.id, 1).await.unwrap();
    let first = h.orders.checkout(user, shipping()).await.unwrap();
    h.carts.add_item(&CartOwner::User(user), product.id, 1).await.unwrap();
    let second = h.orders.checkout(user, shipping()).await.unwrap();

    let orders = h.orders.orders_for_user(user).await.unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0].id, second.id);
    assert_eq!(orders[1].id, first.id);

    // Another user's order is not visible through the owner-checked read.
    let stranger = Uuid::now_v7();
    assert!(matches!(
        h.orders.order_for_user(first.id, stranger).await,
        Err(Error::Forbidden(_))
    ));
}

#[tokio::test]
async fn invoice_is_owner_checked_and_idempotent() {
    let h = harness();
    let product = seed_product(&h.store, 1000, 5).await;
    let (user, order) = place_order(&h, &product, 2).await;

    let first = h.orders.invoice(order.id, user).await.unwrap();
    let second = h.orders.invoice(order.id, user).await.unwrap();
    assert_eq!(first, second);
    assert!(first.exists());

    assert!(matches!(
        h.orders.invoice(order.id, Uuid::now_v7()).await,
        Err(Error::Forbidden(_))
    ));
}
