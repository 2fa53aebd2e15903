//! Product reviews.
//!
//! Reviews come from two places: "seed" reviews fetched from the REST API and
//! reviews written on this device. Both share the same shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ProductId;

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewId(pub i64);

impl fmt::Display for ReviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A review attached to a product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub author: String,

    /// Star rating in `MIN_RATING..=MAX_RATING`
    pub rating: u8,

    #[serde(default)]
    pub comment: String,

    pub created_at: DateTime<Utc>,
}

impl Review {
    pub fn has_valid_rating(&self) -> bool {
        (MIN_RATING..=MAX_RATING).contains(&self.rating)
    }
}

/// A review as typed by the user, before an id is assigned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewDraft {
    pub product_id: ProductId,
    pub author: String,
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
}

impl ReviewDraft {
    /// Turn the draft into a review with the given id, clamping the rating.
    pub fn into_review(self, id: ReviewId) -> Review {
        Review {
            id,
            product_id: self.product_id,
            author: self.author,
            rating: self.rating.clamp(MIN_RATING, MAX_RATING),
            comment: self.comment,
            created_at: Utc::now(),
        }
    }
}
