//! Per-user wishlist: a set of product references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Wishlist {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Wishlist {
    pub fn for_user(user_id: Uuid) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id,
            product_ids: vec![],
            created_at: Utc::now(),
        }
    }

    pub fn contains(&self, product_id: Uuid) -> bool {
        self.product_ids.contains(&product_id)
    }

    /// Adding an already-present product is a no-op.
    pub fn add(&mut self, product_id: Uuid) {
        if !self.contains(product_id) {
            self.product_ids.push(product_id);
        }
    }

    pub fn remove(&mut self, product_id: Uuid) {
        self.product_ids.retain(|p| *p != product_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_is_set_like() {
        let mut w = Wishlist::for_user(Uuid::now_v7());
        let p = Uuid::now_v7();
        w.add(p);
        w.add(p);
        assert_eq!(w.product_ids.len(), 1);
        w.remove(p);
        assert!(!w.contains(p));
    }
}
