//! Chat messages exchanged with sellers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::SellerId;

/// Locally assigned, auto-incrementing message identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who wrote a message within a thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    /// The local user
    Me,
    /// The seller on the other side of the thread
    Counterparty,
}

/// A single chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,

    /// Seller this message is exchanged with; also the thread key
    pub counterparty: SellerId,

    pub sender: Sender,

    pub text: String,

    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(id: MessageId, counterparty: SellerId, sender: Sender, text: String) -> Self {
        Self {
            id,
            counterparty,
            sender,
            text,
            timestamp: Utc::now(),
        }
    }

    pub fn is_mine(&self) -> bool {
        self.sender == Sender::Me
    }
}
