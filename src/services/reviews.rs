//! Review workflows: purchase-gated comments and ratings, moderation, and
//! the product's average rating.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::aggregates::Review;
use crate::error::{Error, Result};
use crate::store::Store;

pub struct ReviewService {
    store: Arc<dyn Store>,
}

impl ReviewService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Only buyers who received the product may review it.
    async fn require_delivered_purchase(&self, user_id: Uuid, product_id: Uuid) -> Result<()> {
        if !self
            .store
            .has_delivered_order_with_product(user_id, product_id)
            .await?
        {
            return Err(Error::InvalidState(
                "product must be purchased and delivered before reviewing".into(),
            ));
        }
        Ok(())
    }

    /// A bare star rating; auto-approved and immediately reflected in the
    /// product's average.
    pub async fn add_rating(&self, product_id: Uuid, user_id: Uuid, rating: i32) -> Result<Review> {
        self.require_delivered_purchase(user_id, product_id).await?;
        self.store.product(product_id).await?;
        let review = Review::rating(product_id, user_id, rating)?;
        self.store.insert_review(&review).await?;
        self.recompute_rating(product_id).await?;
        Ok(review)
    }

    /// A text comment, optionally with a rating; held until moderation.
    pub async fn add_comment(
        &self,
        product_id: Uuid,
        user_id: Uuid,
        content: String,
        rating: Option<i32>,
    ) -> Result<Review> {
        self.require_delivered_purchase(user_id, product_id).await?;
        self.store.product(product_id).await?;
        let review = Review::comment(product_id, user_id, content, rating)?;
        self.store.insert_review(&review).await?;
        Ok(review)
    }

    /// Moderation: approval makes the review visible and counts its rating;
    /// rejection deletes it.
    pub async fn moderate(&self, review_id: Uuid, approved: bool) -> Result<()> {
        let review = self.store.review(review_id).await?;
        if approved {
            self.store.set_review_approved(review_id).await?;
        } else {
            self.store.delete_review(review_id).await?;
        }
        self.recompute_rating(review.product_id).await?;
        Ok(())
    }

    pub async fn for_product(&self, product_id: Uuid, include_pending: bool) -> Result<Vec<Review>> {
        self.store.reviews_for_product(product_id, !include_pending).await
    }

    /// Average over approved reviews that carry a rating; zero when none.
    async fn recompute_rating(&self, product_id: Uuid) -> Result<()> {
        let reviews = self.store.reviews_for_product(product_id, true).await?;
        let ratings: Vec<i32> = reviews.iter().filter_map(|r| r.rating).collect();
        let average = if ratings.is_empty() {
            0.0
        } else {
            ratings.iter().sum::<i32>() as f64 / ratings.len() as f64
        };
        self.store.set_product_rating(product_id, average).await
    }
}
