//! Product reviews: comments and ratings.
//!
//! Bare ratings are auto-approved; comments with text await moderation.
//! Only approved rows count towards a product's average rating.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Review {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub content: Option<String>,
    pub rating: Option<i32>,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
}

impl Review {
    /// A standalone star rating, approved immediately.
    pub fn rating(product_id: Uuid, user_id: Uuid, rating: i32) -> Result<Self, Error> {
        Self::validate_rating(rating)?;
        Ok(Self {
            id: Uuid::now_v7(),
            product_id,
            user_id,
            content: None,
            rating: Some(rating),
            approved: true,
            created_at: Utc::now(),
        })
    }

    /// A text comment, optionally carrying a rating; held for moderation.
    pub fn comment(
        product_id: Uuid,
        user_id: Uuid,
        content: String,
        rating: Option<i32>,
    ) -> Result<Self, Error> {
        if content.trim().is_empty() {
            return Err(Error::InvalidArgument("comment must not be empty".into()));
        }
        if let Some(r) = rating {
            Self::validate_rating(r)?;
        }
        Ok(Self {
            id: Uuid::now_v7(),
            product_id,
            user_id,
            content: Some(content),
            rating,
            approved: false,
            created_at: Utc::now(),
        })
    }

    fn validate_rating(rating: i32) -> Result<(), Error> {
        if !(1..=5).contains(&rating) {
            return Err(Error::InvalidArgument("rating must be between 1 and 5".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_bounds() {
        let (p, u) = (Uuid::now_v7(), Uuid::now_v7());
        assert!(Review::rating(p, u, 0).is_err());
        assert!(Review::rating(p, u, 6).is_err());
        assert!(Review::rating(p, u, 5).unwrap().approved);
    }

    #[test]
    fn comments_await_moderation() {
        let r = Review::comment(Uuid::now_v7(), Uuid::now_v7(), "great".into(), Some(4)).unwrap();
        assert!(!r.approved);
    }

    #[test]
    fn empty_comment_rejected() {
        assert!(Review::comment(Uuid::now_v7(), Uuid::now_v7(), "  ".into(), None).is_err());
    }
}
