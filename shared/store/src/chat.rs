//! Chat history with sellers, kept only on this device.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use storefront_model::{ChatMessage, MessageId, SellerId, Sender};
use tokio::sync::watch;

use crate::kv::{keys, KvStore};
use crate::optimistic::{Collection, Mutation, OptimisticStore};
use crate::{Result, StoreError};

/// All threads plus the id counter. Persisted as one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatLog {
    pub next_id: u64,
    /// Messages grouped by counterparty, oldest first
    pub threads: BTreeMap<SellerId, Vec<ChatMessage>>,
}

impl Default for ChatLog {
    fn default() -> Self {
        Self {
            next_id: 1,
            threads: BTreeMap::new(),
        }
    }
}

impl ChatLog {
    /// Append a message under the next id. `None` once ids are exhausted.
    fn push(&mut self, counterparty: SellerId, sender: Sender, text: String) -> Option<ChatMessage> {
        let following = self.next_id.checked_add(1)?;
        let message = ChatMessage::new(MessageId(self.next_id), counterparty, sender, text);
        self.next_id = following;
        self.threads
            .entry(counterparty)
            .or_default()
            .push(message.clone());
        Some(message)
    }
}

impl Collection for ChatLog {
    fn validate(&self) -> std::result::Result<(), String> {
        let mut seen = HashSet::new();
        for (counterparty, messages) in &self.threads {
            for message in messages {
                if message.counterparty != *counterparty {
                    return Err(format!(
                        "message {} filed under seller {} belongs to seller {}",
                        message.id, counterparty, message.counterparty
                    ));
                }
                if message.id.0 >= self.next_id {
                    return Err(format!(
                        "message id {} is not below next id {}",
                        message.id, self.next_id
                    ));
                }
                if !seen.insert(message.id) {
                    return Err(format!("duplicate message id {}", message.id));
                }
            }
        }
        Ok(())
    }
}

/// Latest message of one thread, for the conversation list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationSummary {
    pub counterparty: SellerId,
    pub last_message: ChatMessage,
    pub message_count: usize,
}

#[derive(Clone)]
pub struct ChatStore {
    store: OptimisticStore<ChatLog>,
}

impl ChatStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self {
            store: OptimisticStore::new(keys::CHAT, kv),
        }
    }

    /// Load persisted history, returning the number of threads.
    pub async fn load(&self) -> usize {
        self.store.load().await.threads.len()
    }

    /// Append a message written by the local user.
    pub async fn send(&self, counterparty: SellerId, text: &str) -> Result<ChatMessage> {
        self.append(counterparty, Sender::Me, text).await
    }

    /// Append a message written by the seller.
    pub async fn receive(&self, counterparty: SellerId, text: &str) -> Result<ChatMessage> {
        self.append(counterparty, Sender::Counterparty, text).await
    }

    async fn append(&self, counterparty: SellerId, sender: Sender, text: &str) -> Result<ChatMessage> {
        let text = text.trim();
        if text.is_empty() {
            return Err(StoreError::InvalidInput("message text is empty".to_string()));
        }
        let text = text.to_string();

        let appended = self
            .store
            .apply(move |log: &mut ChatLog| match log.push(counterparty, sender, text) {
                Some(message) => Mutation::Write(Some(message)),
                None => Mutation::Unchanged(None),
            })
            .await?;
        appended.ok_or_else(|| StoreError::InvalidInput("chat message ids are exhausted".to_string()))
    }

    /// Delete a single message. Returns whether it existed.
    pub async fn remove_message(&self, id: MessageId) -> Result<bool> {
        self.store
            .apply(move |log: &mut ChatLog| {
                let mut removed = false;
                for messages in log.threads.values_mut() {
                    let before = messages.len();
                    messages.retain(|m| m.id != id);
                    removed |= messages.len() != before;
                }
                log.threads.retain(|_, messages| !messages.is_empty());
                Mutation::write_if(removed, removed)
            })
            .await
    }

    /// Drop a whole thread. Returns whether it existed.
    pub async fn clear_thread(&self, counterparty: SellerId) -> Result<bool> {
        self.store
            .apply(move |log: &mut ChatLog| {
                let removed = log.threads.remove(&counterparty).is_some();
                Mutation::write_if(removed, removed)
            })
            .await
    }

    /// Drop every thread and delete the durable key.
    pub async fn clear(&self) -> Result<()> {
        self.store
            .apply(|log: &mut ChatLog| {
                *log = ChatLog::default();
                Mutation::Remove(())
            })
            .await
    }

    pub async fn thread(&self, counterparty: SellerId) -> Vec<ChatMessage> {
        self.store
            .read(|log| log.threads.get(&counterparty).cloned().unwrap_or_default())
            .await
    }

    /// One summary per thread, most recently active first.
    pub async fn conversations(&self) -> Vec<ConversationSummary> {
        let mut summaries: Vec<_> = self
            .store
            .read(|log| {
                log.threads
                    .iter()
                    .filter_map(|(counterparty, messages)| {
                        messages.last().map(|last| ConversationSummary {
                            counterparty: *counterparty,
                            last_message: last.clone(),
                            message_count: messages.len(),
                        })
                    })
                    .collect()
            })
            .await;
        summaries.sort_by(|a, b| b.last_message.id.cmp(&a.last_message.id));
        summaries
    }

    pub fn subscribe(&self) -> watch::Receiver<ChatLog> {
        self.store.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKv;

    async fn chat() -> (ChatStore, MemoryKv) {
        let kv = MemoryKv::new();
        let chat = ChatStore::new(Arc::new(kv.clone()));
        chat.load().await;
        (chat, kv)
    }

    #[tokio::test]
    async fn ids_increase_across_threads() {
        let (chat, _kv) = chat().await;

        let first = chat.send(SellerId(1), "hello").await.unwrap();
        let second = chat.receive(SellerId(2), "hi there").await.unwrap();
        let third = chat.send(SellerId(1), "is it available?").await.unwrap();

        assert_eq!(first.id, MessageId(1));
        assert_eq!(second.id, MessageId(2));
        assert_eq!(third.id, MessageId(3));
        assert!(first.is_mine());
        assert!(!second.is_mine());

        let thread = chat.thread(SellerId(1)).await;
        assert_eq!(thread.len(), 2);
        assert_eq!(thread[1].text, "is it available?");
    }

    #[tokio::test]
    async fn blank_messages_are_rejected() {
        let (chat, kv) = chat().await;
        let result = chat.send(SellerId(1), "   ").await;
        assert!(matches!(result, Err(StoreError::InvalidInput(_))));
        assert!(kv.is_empty().await);
    }

    #[tokio::test]
    async fn exhausted_ids_are_an_error_not_a_wrap() {
        let kv = MemoryKv::new();
        let raw = format!(r#"{{"next_id":{},"threads":{{}}}}"#, u64::MAX);
        kv.set(keys::CHAT, raw.clone()).await.unwrap();
        let chat = ChatStore::new(Arc::new(kv.clone()));
        chat.load().await;

        let result = chat.send(SellerId(1), "hi").await;
        assert!(matches!(result, Err(StoreError::InvalidInput(_))));
        assert!(chat.thread(SellerId(1)).await.is_empty());
        assert_eq!(kv.get(keys::CHAT).await.unwrap(), Some(raw));
    }

    #[tokio::test]
    async fn last_id_is_still_usable() {
        let kv = MemoryKv::new();
        let raw = format!(r#"{{"next_id":{},"threads":{{}}}}"#, u64::MAX - 1);
        kv.set(keys::CHAT, raw).await.unwrap();
        let chat = ChatStore::new(Arc::new(kv.clone()));
        chat.load().await;

        let message = chat.send(SellerId(1), "hi").await.unwrap();
        assert_eq!(message.id, MessageId(u64::MAX - 1));

        let restarted = ChatStore::new(Arc::new(kv));
        assert_eq!(restarted.load().await, 1);
    }

    #[tokio::test]
    async fn conversations_are_sorted_by_latest_message() {
        let (chat, _kv) = chat().await;
        chat.send(SellerId(1), "one").await.unwrap();
        chat.send(SellerId(2), "two").await.unwrap();
        chat.receive(SellerId(1), "three").await.unwrap();

        let summaries = chat.conversations().await;
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].counterparty, SellerId(1));
        assert_eq!(summaries[0].message_count, 2);
        assert_eq!(summaries[0].last_message.text, "three");
        assert_eq!(summaries[1].counterparty, SellerId(2));
    }

    #[tokio::test]
    async fn history_and_counter_survive_reload() {
        let (chat, kv) = chat().await;
        chat.send(SellerId(4), "first").await.unwrap();
        chat.send(SellerId(4), "second").await.unwrap();

        let restarted = ChatStore::new(Arc::new(kv));
        assert_eq!(restarted.load().await, 1);
        let next = restarted.send(SellerId(4), "third").await.unwrap();
        assert_eq!(next.id, MessageId(3));
    }

    #[tokio::test]
    async fn failed_write_does_not_consume_an_id() {
        let (chat, kv) = chat().await;
        chat.send(SellerId(1), "ok").await.unwrap();

        kv.fail_writes(true);
        assert!(chat.send(SellerId(1), "lost").await.is_err());
        assert_eq!(chat.thread(SellerId(1)).await.len(), 1);

        kv.fail_writes(false);
        let message = chat.send(SellerId(1), "retry").await.unwrap();
        assert_eq!(message.id, MessageId(2));
    }

    #[tokio::test]
    async fn removing_messages_and_threads() {
        let (chat, kv) = chat().await;
        let message = chat.send(SellerId(1), "oops").await.unwrap();
        chat.send(SellerId(2), "keep").await.unwrap();

        assert!(chat.remove_message(message.id).await.unwrap());
        assert!(!chat.remove_message(message.id).await.unwrap());
        assert!(chat.thread(SellerId(1)).await.is_empty());

        assert!(chat.clear_thread(SellerId(2)).await.unwrap());
        assert!(chat.conversations().await.is_empty());

        chat.send(SellerId(3), "again").await.unwrap();
        chat.clear().await.unwrap();
        assert!(!kv.contains_key(keys::CHAT).await);
    }

    #[tokio::test]
    async fn ids_beyond_the_counter_are_discarded_on_load() {
        let (chat, kv) = chat().await;
        chat.send(SellerId(1), "hello").await.unwrap();

        let raw = kv.get(keys::CHAT).await.unwrap().unwrap();
        let mut log: ChatLog = serde_json::from_str(&raw).unwrap();
        log.next_id = 1;
        kv.set(keys::CHAT, serde_json::to_string(&log).unwrap())
            .await
            .unwrap();

        assert_eq!(chat.load().await, 0);
        assert!(!kv.contains_key(keys::CHAT).await);
    }
}
