//! Domain payloads shared across the Storefront stores and service.

pub mod chat;
pub mod reviews;

pub use chat::{ChatMessage, MessageId, Sender};
pub use reviews::{Review, ReviewDraft, ReviewId};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a product in the remote catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub i64);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a seller; also the counterparty of a chat thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SellerId(pub i64);

impl fmt::Display for SellerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A catalogue product as returned by the REST API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,

    /// Price in minor currency units.
    pub price: u64,

    #[serde(default)]
    pub seller_id: Option<SellerId>,

    #[serde(default)]
    pub image_url: Option<String>,
}

impl Product {
    pub fn new(id: i64, name: impl Into<String>, price: u64) -> Self {
        Self {
            id: ProductId(id),
            name: name.into(),
            price,
            seller_id: None,
            image_url: None,
        }
    }

    pub fn with_seller(mut self, seller: SellerId) -> Self {
        self.seller_id = Some(seller);
        self
    }
}
