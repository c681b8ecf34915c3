//! Persistence collaborator.
//!
//! Services talk to a [`Store`] trait object; multi-entity writes that must
//! be atomic (checkout, cancellation, refund approval) are single trait
//! operations so each backend can give them one transaction scope. Stock
//! decrements inside those operations are conditional: the decrement and
//! the sufficiency check are one step, never a separate read and write.
//! Status writes that restock are compare-and-swap against the state the
//! caller read, so two racing reversals can never both apply.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::aggregates::{
    Cart, Discount, Order, OrderStatus, Product, RefundStatus, Review, Wishlist,
};
use crate::error::Result;

#[async_trait]
pub trait Store: Send + Sync {
    // Products
    async fn insert_product(&self, product: &Product) -> Result<()>;
    async fn update_product(&self, product: &Product) -> Result<()>;
    async fn product(&self, id: Uuid) -> Result<Product>;
    async fn list_products(&self, limit: i64, offset: i64) -> Result<Vec<Product>>;
    /// Unconditional restock outside an order-level operation.
    async fn increment_stock(&self, product_id: Uuid, quantity: u32) -> Result<()>;

    // Carts
    /// Returns the user's cart, creating and persisting an empty one on
    /// first access.
    async fn cart_for_user(&self, user_id: Uuid, currency: &str) -> Result<Cart>;
    async fn cart_for_guest(&self, token: &str, currency: &str) -> Result<Cart>;
    async fn find_guest_cart(&self, token: &str) -> Result<Option<Cart>>;
    /// Replaces the cart's items and total with the given aggregate state.
    async fn save_cart(&self, cart: &Cart) -> Result<()>;
    async fn delete_cart(&self, cart_id: Uuid) -> Result<()>;

    // Orders
    /// Atomically: conditionally decrement stock for every line item,
    /// insert the order with its items, and clear the source cart. Fails
    /// with `InsufficientStock` and no side effects if any decrement
    /// cannot be satisfied.
    async fn place_order(&self, order: &Order, cart_id: Uuid) -> Result<()>;
    async fn order(&self, id: Uuid) -> Result<Order>;
    /// Newest first.
    async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>>;
    async fn all_orders(&self) -> Result<Vec<Order>>;
    /// Compare-and-swap on the order status, applied atomically with the
    /// inventory restocks that accompany it (empty for forward
    /// transitions). Fails with `InvalidState` when the stored status no
    /// longer matches `from`, so concurrent cancellations restock at most
    /// once.
    async fn update_order_status(
        &self,
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
        restock: &[(Uuid, u32)],
    ) -> Result<()>;
    /// Compare-and-swap on an item's refund status, restocking the product
    /// when the refund is approved. Fails with `InvalidState` when the
    /// stored status no longer matches `from`.
    async fn update_refund_status(
        &self,
        order_id: Uuid,
        item_id: Uuid,
        from: RefundStatus,
        to: RefundStatus,
        restock: Option<(Uuid, u32)>,
    ) -> Result<()>;
    async fn has_delivered_order_with_product(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<bool>;

    // Discounts
    /// Atomically retires any active discount on the product, writes the
    /// product's sale pricing, and inserts the new discount row.
    async fn activate_discount(&self, discount: &Discount, product: &Product) -> Result<()>;
    /// Atomically deactivates the discount and writes the product's
    /// restored pricing. Fails with `InvalidState` if the discount is no
    /// longer active.
    async fn deactivate_discount(&self, discount_id: Uuid, product: &Product) -> Result<()>;
    async fn discount(&self, id: Uuid) -> Result<Discount>;
    async fn active_discount_for_product(&self, product_id: Uuid) -> Result<Option<Discount>>;
    async fn list_discounts(&self, active_only: bool) -> Result<Vec<Discount>>;

    // Reviews
    async fn insert_review(&self, review: &Review) -> Result<()>;
    async fn review(&self, id: Uuid) -> Result<Review>;
    async fn set_review_approved(&self, id: Uuid) -> Result<()>;
    async fn delete_review(&self, id: Uuid) -> Result<()>;
    async fn reviews_for_product(&self, product_id: Uuid, approved_only: bool)
        -> Result<Vec<Review>>;
    async fn set_product_rating(&self, product_id: Uuid, rating: f64) -> Result<()>;

    // Wishlists
    async fn wishlist_for_user(&self, user_id: Uuid) -> Result<Wishlist>;
    async fn save_wishlist(&self, wishlist: &Wishlist) -> Result<()>;
    /// Users whose wishlist contains the product, for price-drop notices.
    async fn wishlist_owners_for_product(&self, product_id: Uuid) -> Result<Vec<Uuid>>;
}
