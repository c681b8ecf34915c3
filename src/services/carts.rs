//! Cart workflows: per-user and guest carts, item mutation, and the
//! guest-to-user merge on sign-in.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::aggregates::Cart;
use crate::error::Result;
use crate::store::Store;

/// Who a cart belongs to: an authenticated user or a guest session.
#[derive(Clone, Debug)]
pub enum CartOwner {
    User(Uuid),
    Guest(String),
}

pub struct CartService {
    store: Arc<dyn Store>,
    currency: String,
}

impl CartService {
    pub fn new(store: Arc<dyn Store>, currency: &str) -> Self {
        Self { store, currency: currency.to_string() }
    }

    /// Returns the owner's cart, creating an empty one on first access.
    pub async fn cart(&self, owner: &CartOwner) -> Result<Cart> {
        match owner {
            CartOwner::User(user_id) => self.store.cart_for_user(*user_id, &self.currency).await,
            CartOwner::Guest(token) => self.store.cart_for_guest(token, &self.currency).await,
        }
    }

    pub async fn add_item(
        &self,
        owner: &CartOwner,
        product_id: Uuid,
        quantity: u32,
    ) -> Result<Cart> {
        let product = self.store.product(product_id).await?;
        let mut cart = self.cart(owner).await?;
        cart.add_item(&product, quantity)?;
        self.store.save_cart(&cart).await?;
        Ok(cart)
    }

    pub async fn update_quantity(
        &self,
        owner: &CartOwner,
        product_id: Uuid,
        quantity: u32,
    ) -> Result<Cart> {
        let mut cart = self.cart(owner).await?;
        cart.update_quantity(product_id, quantity)?;
        self.store.save_cart(&cart).await?;
        Ok(cart)
    }

    pub async fn remove_item(&self, owner: &CartOwner, product_id: Uuid) -> Result<Cart> {
        let mut cart = self.cart(owner).await?;
        cart.remove_item(product_id)?;
        self.store.save_cart(&cart).await?;
        Ok(cart)
    }

    /// Idempotent: clearing an already-empty cart succeeds.
    pub async fn clear(&self, owner: &CartOwner) -> Result<Cart> {
        let mut cart = self.cart(owner).await?;
        cart.clear();
        self.store.save_cart(&cart).await?;
        Ok(cart)
    }

    /// Folds a guest cart into the user's cart on sign-in, summing
    /// quantities per product, then deletes the guest cart. An absent or
    /// empty guest cart leaves the user cart untouched.
    pub async fn merge_guest_cart(&self, guest_token: &str, user_id: Uuid) -> Result<Cart> {
        let guest = self.store.find_guest_cart(guest_token).await?;
        let mut user_cart = self.store.cart_for_user(user_id, &self.currency).await?;
        let Some(guest) = guest else {
            return Ok(user_cart);
        };
        if guest.is_empty() {
            self.store.delete_cart(guest.id).await?;
            return Ok(user_cart);
        }
        user_cart.merge_from(&guest);
        self.store.save_cart(&user_cart).await?;
        self.store.delete_cart(guest.id).await?;
        Ok(user_cart)
    }
}
