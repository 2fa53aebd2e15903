//! Optimistic local collection stores for the Storefront client.
//!
//! Each store keeps a collection in memory, mirrors it to a [`KvStore`] under
//! its own key, and rolls memory back when the write fails.

pub mod cart;
pub mod chat;
mod error;
pub mod kv;
pub mod likes;
pub mod optimistic;
pub mod remote;
pub mod reviews;
pub mod search;

pub use cart::{CartEntry, CartPatch, CartStore};
pub use chat::{ChatStore, ConversationSummary};
pub use error::{Result, StoreError};
pub use kv::{EncryptedKv, KvStore, MemoryKv, SledKv};
pub use likes::LikeStore;
pub use optimistic::{Collection, Mutation, OptimisticStore, StorePhase};
pub use remote::{LikesRemote, ReviewsRemote};
pub use reviews::{reconcile, ReviewStore};
pub use search::SearchHistoryStore;
