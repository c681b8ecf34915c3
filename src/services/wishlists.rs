//! Wishlist workflows.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::aggregates::Wishlist;
use crate::error::Result;
use crate::store::Store;

pub struct WishlistService {
    store: Arc<dyn Store>,
}

impl WishlistService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn for_user(&self, user_id: Uuid) -> Result<Wishlist> {
        self.store.wishlist_for_user(user_id).await
    }

    pub async fn add(&self, user_id: Uuid, product_id: Uuid) -> Result<Wishlist> {
        // Verify the product exists before referencing it.
        self.store.product(product_id).await?;
        let mut wishlist = self.store.wishlist_for_user(user_id).await?;
        wishlist.add(product_id);
        self.store.save_wishlist(&wishlist).await?;
        Ok(wishlist)
    }

    pub async fn remove(&self, user_id: Uuid, product_id: Uuid) -> Result<Wishlist> {
        let mut wishlist = self.store.wishlist_for_user(user_id).await?;
        wishlist.remove(product_id);
        self.store.save_wishlist(&wishlist).await?;
        Ok(wishlist)
    }
}
