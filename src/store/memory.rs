//! In-memory store, used by the test suite and local development.
//!
//! A single mutex guards all tables, so every multi-entity operation is
//! naturally atomic and concurrent checkouts serialize: two requests can
//! never both pass a stock check before either decrements.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::aggregates::{
    Cart, Discount, Order, OrderStatus, Product, RefundStatus, Review, Wishlist,
};
use crate::error::{Error, Result};
use crate::store::Store;

#[derive(Default)]
struct Inner {
    products: HashMap<Uuid, Product>,
    carts: HashMap<Uuid, Cart>,
    orders: HashMap<Uuid, Order>,
    discounts: HashMap<Uuid, Discount>,
    reviews: HashMap<Uuid, Review>,
    wishlists: HashMap<Uuid, Wishlist>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_product(&self, product: &Product) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn update_product(&self, product: &Product) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if !inner.products.contains_key(&product.id) {
            return Err(Error::NotFound("product"));
        }
        inner.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn product(&self, id: Uuid) -> Result<Product> {
        let inner = self.inner.lock().await;
        inner.products.get(&id).cloned().ok_or(Error::NotFound("product"))
    }

    async fn list_products(&self, limit: i64, offset: i64) -> Result<Vec<Product>> {
        let inner = self.inner.lock().await;
        let mut products: Vec<_> = inner.products.values().cloned().collect();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(products
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn increment_stock(&self, product_id: Uuid, quantity: u32) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let product = inner
            .products
            .get_mut(&product_id)
            .ok_or(Error::NotFound("product"))?;
        product.increase_stock(quantity);
        Ok(())
    }

    async fn cart_for_user(&self, user_id: Uuid, currency: &str) -> Result<Cart> {
        let mut inner = self.inner.lock().await;
        if let Some(cart) = inner.carts.values().find(|c| c.user_id == Some(user_id)) {
            return Ok(cart.clone());
        }
        let cart = Cart::for_user(user_id, currency);
        inner.carts.insert(cart.id, cart.clone());
        Ok(cart)
    }

    async fn cart_for_guest(&self, token: &str, currency: &str) -> Result<Cart> {
        let mut inner = self.inner.lock().await;
        if let Some(cart) = inner
            .carts
            .values()
            .find(|c| c.guest_token.as_deref() == Some(token))
        {
            return Ok(cart.clone());
        }
        let cart = Cart::for_guest(token, currency);
        inner.carts.insert(cart.id, cart.clone());
        Ok(cart)
    }

    async fn find_guest_cart(&self, token: &str) -> Result<Option<Cart>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .carts
            .values()
            .find(|c| c.guest_token.as_deref() == Some(token))
            .cloned())
    }

    async fn save_cart(&self, cart: &Cart) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.carts.insert(cart.id, cart.clone());
        Ok(())
    }

    async fn delete_cart(&self, cart_id: Uuid) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.carts.remove(&cart_id);
        Ok(())
    }

    async fn place_order(&self, order: &Order, cart_id: Uuid) -> Result<()> {
        let mut inner = self.inner.lock().await;

        // Validate every line before mutating anything, all under the one
        // lock, so a failure on item N leaves items 1..N-1 untouched.
        for item in &order.items {
            let product = inner
                .products
                .get(&item.product_id)
                .ok_or(Error::NotFound("product"))?;
            if !product.has_stock(item.quantity) {
                return Err(Error::InsufficientStock {
                    name: product.name.clone(),
                    requested: item.quantity,
                    available: product.inventory.max(0) as u32,
                });
            }
        }
        for item in &order.items {
            if let Some(product) = inner.products.get_mut(&item.product_id) {
                product.decrease_stock(item.quantity)?;
            }
        }

        inner.orders.insert(order.id, order.clone());

        if let Some(cart) = inner.carts.get_mut(&cart_id) {
            cart.clear();
        }
        Ok(())
    }

    async fn order(&self, id: Uuid) -> Result<Order> {
        let inner = self.inner.lock().await;
        inner.orders.get(&id).cloned().ok_or(Error::NotFound("order"))
    }

    async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
        let inner = self.inner.lock().await;
        let mut orders: Vec<_> = inner
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.ordered_at.cmp(&a.ordered_at));
        Ok(orders)
    }

    async fn all_orders(&self) -> Result<Vec<Order>> {
        let inner = self.inner.lock().await;
        let mut orders: Vec<_> = inner.orders.values().cloned().collect();
        orders.sort_by(|a, b| b.ordered_at.cmp(&a.ordered_at));
        Ok(orders)
    }

    async fn update_order_status(
        &self,
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
        restock: &[(Uuid, u32)],
    ) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let current = inner
            .orders
            .get(&order_id)
            .ok_or(Error::NotFound("order"))?
            .status;
        // The state check and the write share the lock; a request that
        // raced past a stale read fails here instead of restocking again.
        if current != from {
            return Err(Error::InvalidState(format!(
                "order is {}, expected {}",
                current.as_str(),
                from.as_str()
            )));
        }
        for (product_id, quantity) in restock {
            if let Some(product) = inner.products.get_mut(product_id) {
                product.increase_stock(*quantity);
            }
        }
        if let Some(order) = inner.orders.get_mut(&order_id) {
            order.status = to;
        }
        Ok(())
    }

    async fn update_refund_status(
        &self,
        order_id: Uuid,
        item_id: Uuid,
        from: RefundStatus,
        to: RefundStatus,
        restock: Option<(Uuid, u32)>,
    ) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let order = inner.orders.get(&order_id).ok_or(Error::NotFound("order"))?;
        let current = order
            .item(item_id)
            .ok_or(Error::NotFound("order item"))?
            .refund_status;
        if current != from {
            return Err(Error::InvalidState(format!(
                "refund is {}, expected {}",
                current.as_str(),
                from.as_str()
            )));
        }
        if let Some((product_id, quantity)) = restock {
            let product = inner
                .products
                .get_mut(&product_id)
                .ok_or(Error::NotFound("product"))?;
            product.increase_stock(quantity);
        }
        if let Some(item) = inner
            .orders
            .get_mut(&order_id)
            .and_then(|o| o.item_mut(item_id))
        {
            item.refund_status = to;
        }
        Ok(())
    }

    async fn has_delivered_order_with_product(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<bool> {
        let inner = self.inner.lock().await;
        Ok(inner.orders.values().any(|o| {
            o.user_id == user_id
                && o.status == OrderStatus::Delivered
                && o.items.iter().any(|i| i.product_id == product_id)
        }))
    }

    async fn activate_discount(&self, discount: &Discount, product: &Product) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if !inner.products.contains_key(&product.id) {
            return Err(Error::NotFound("product"));
        }
        for d in inner.discounts.values_mut() {
            if d.product_id == product.id && d.active {
                d.active = false;
            }
        }
        inner.products.insert(product.id, product.clone());
        inner.discounts.insert(discount.id, discount.clone());
        Ok(())
    }

    async fn deactivate_discount(&self, discount_id: Uuid, product: &Product) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if !inner.products.contains_key(&product.id) {
            return Err(Error::NotFound("product"));
        }
        let discount = inner
            .discounts
            .get_mut(&discount_id)
            .ok_or(Error::NotFound("discount"))?;
        if !discount.active {
            return Err(Error::InvalidState("discount is not active".into()));
        }
        discount.active = false;
        inner.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn discount(&self, id: Uuid) -> Result<Discount> {
        let inner = self.inner.lock().await;
        inner.discounts.get(&id).cloned().ok_or(Error::NotFound("discount"))
    }

    async fn active_discount_for_product(&self, product_id: Uuid) -> Result<Option<Discount>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .discounts
            .values()
            .find(|d| d.product_id == product_id && d.active)
            .cloned())
    }

    async fn list_discounts(&self, active_only: bool) -> Result<Vec<Discount>> {
        let inner = self.inner.lock().await;
        let mut discounts: Vec<_> = inner
            .discounts
            .values()
            .filter(|d| !active_only || d.active)
            .cloned()
            .collect();
        discounts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(discounts)
    }

    async fn insert_review(&self, review: &Review) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.reviews.insert(review.id, review.clone());
        Ok(())
    }

    async fn review(&self, id: Uuid) -> Result<Review> {
        let inner = self.inner.lock().await;
        inner.reviews.get(&id).cloned().ok_or(Error::NotFound("review"))
    }

    async fn set_review_approved(&self, id: Uuid) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let review = inner.reviews.get_mut(&id).ok_or(Error::NotFound("review"))?;
        review.approved = true;
        Ok(())
    }

    async fn delete_review(&self, id: Uuid) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.reviews.remove(&id).ok_or(Error::NotFound("review"))?;
        Ok(())
    }

    async fn reviews_for_product(
        &self,
        product_id: Uuid,
        approved_only: bool,
    ) -> Result<Vec<Review>> {
        let inner = self.inner.lock().await;
        let mut reviews: Vec<_> = inner
            .reviews
            .values()
            .filter(|r| r.product_id == product_id && (!approved_only || r.approved))
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reviews)
    }

    async fn set_product_rating(&self, product_id: Uuid, rating: f64) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let product = inner
            .products
            .get_mut(&product_id)
            .ok_or(Error::NotFound("product"))?;
        product.average_rating = rating;
        Ok(())
    }

    async fn wishlist_for_user(&self, user_id: Uuid) -> Result<Wishlist> {
        let mut inner = self.inner.lock().await;
        if let Some(w) = inner.wishlists.values().find(|w| w.user_id == user_id) {
            return Ok(w.clone());
        }
        let wishlist = Wishlist::for_user(user_id);
        inner.wishlists.insert(wishlist.id, wishlist.clone());
        Ok(wishlist)
    }

    async fn save_wishlist(&self, wishlist: &Wishlist) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.wishlists.insert(wishlist.id, wishlist.clone());
        Ok(())
    }

    async fn wishlist_owners_for_product(&self, product_id: Uuid) -> Result<Vec<Uuid>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .wishlists
            .values()
            .filter(|w| w.contains(product_id))
            .map(|w| w.user_id)
            .collect())
    }
}
