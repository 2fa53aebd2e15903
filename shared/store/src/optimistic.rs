//! Optimistic in-memory collection mirrored to durable storage.
//!
//! A mutation is applied to a copy of the current collection, published so
//! readers see it immediately, then the whole collection is written under its
//! key. If the write fails the pre-mutation snapshot is restored and the
//! error is returned to the caller.
//!
//! Mutations on one store are serialized by a write gate that is held until
//! the write has been confirmed or rolled back, so the snapshot restored on
//! failure is always the last state that storage accepted. The write itself
//! runs on a spawned task that owns the gate, so a caller that gives up
//! (a dropped request future) cannot leave an unsettled state behind.

use std::future::Future;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::kv::KvStore;
use crate::{Result, StoreError};

/// A value that can be held by an [`OptimisticStore`].
pub trait Collection: Clone + Default + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Check invariants that the type system does not capture.
    ///
    /// Returning an error on load causes the stored value to be discarded.
    fn validate(&self) -> std::result::Result<(), String> {
        Ok(())
    }
}

/// Outcome of a mutation closure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation<R> {
    /// Nothing changed; no write happens.
    Unchanged(R),
    /// Persist the mutated collection.
    Write(R),
    /// Delete the durable key entirely.
    Remove(R),
}

impl<R> Mutation<R> {
    pub fn write_if(changed: bool, value: R) -> Self {
        if changed {
            Mutation::Write(value)
        } else {
            Mutation::Unchanged(value)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorePhase {
    /// `load` has not run yet
    Uninitialized,
    Ready,
    /// An optimistic state is published and its write is in flight
    Pending,
}

struct Inner<C> {
    phase: StorePhase,
    entries: C,
}

enum Persist {
    Write,
    Remove,
}

/// A published optimistic state waiting for its write to settle.
struct Staged<C> {
    previous: C,
    next: C,
    persist: Persist,
}

enum Staging<C, R> {
    Skipped(R),
    Staged(Staged<C>, R),
}

pub struct OptimisticStore<C: Collection> {
    key: String,
    kv: Arc<dyn KvStore>,
    inner: Arc<RwLock<Inner<C>>>,
    write_gate: Arc<Mutex<()>>,
    changes: Arc<watch::Sender<C>>,
}

impl<C: Collection> Clone for OptimisticStore<C> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            kv: Arc::clone(&self.kv),
            inner: Arc::clone(&self.inner),
            write_gate: Arc::clone(&self.write_gate),
            changes: Arc::clone(&self.changes),
        }
    }
}

impl<C: Collection> OptimisticStore<C> {
    pub fn new(key: impl Into<String>, kv: Arc<dyn KvStore>) -> Self {
        let (changes, _) = watch::channel(C::default());
        Self {
            key: key.into(),
            kv,
            inner: Arc::new(RwLock::new(Inner {
                phase: StorePhase::Uninitialized,
                entries: C::default(),
            })),
            write_gate: Arc::new(Mutex::new(())),
            changes: Arc::new(changes),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub async fn phase(&self) -> StorePhase {
        self.inner.read().await.phase
    }

    /// Observe every published state: optimistic, committed and reverted.
    pub fn subscribe(&self) -> watch::Receiver<C> {
        self.changes.subscribe()
    }

    /// Read the durable copy into memory.
    ///
    /// Never fails: a missing key yields an empty collection, a value that
    /// does not parse or validate is discarded (and its key removed), and a
    /// backend read error yields an empty collection without touching
    /// storage.
    pub async fn load(&self) -> C {
        let _gate = self.write_gate.lock().await;

        let loaded = match self.kv.get(&self.key).await {
            Ok(None) => C::default(),
            Ok(Some(raw)) => match parse::<C>(&raw) {
                Ok(entries) => entries,
                Err(reason) => {
                    self.discard(&reason).await;
                    C::default()
                }
            },
            Err(StoreError::Corrupt { reason, .. }) => {
                self.discard(&reason).await;
                C::default()
            }
            Err(err) => {
                warn!(key = %self.key, error = %err, "failed to read collection, starting empty");
                C::default()
            }
        };

        {
            let mut inner = self.inner.write().await;
            inner.entries = loaded.clone();
            inner.phase = StorePhase::Ready;
        }
        self.changes.send_replace(loaded.clone());
        debug!(key = %self.key, "collection loaded");
        loaded
    }

    async fn discard(&self, reason: &str) {
        warn!(key = %self.key, %reason, "discarding corrupt collection");
        if let Err(err) = self.kv.remove(&self.key).await {
            warn!(key = %self.key, error = %err, "failed to remove corrupt collection");
        }
    }

    /// Current in-memory collection.
    pub async fn snapshot(&self) -> C {
        self.inner.read().await.entries.clone()
    }

    /// Run a pure query against the current in-memory collection.
    pub async fn read<R>(&self, query: impl FnOnce(&C) -> R) -> R {
        let inner = self.inner.read().await;
        query(&inner.entries)
    }

    /// Apply `mutation`, persist the result, and revert on failure.
    ///
    /// Once staged, the write runs on its own task and settles (commit or
    /// revert) even if the caller stops waiting for it.
    pub async fn apply<R, F>(&self, mutation: F) -> Result<R>
    where
        F: FnOnce(&mut C) -> Mutation<R>,
    {
        let gate = Arc::clone(&self.write_gate).lock_owned().await;
        let (staged, value) = match self.stage(mutation).await? {
            Staging::Skipped(value) => return Ok(value),
            Staging::Staged(staged, value) => (staged, value),
        };

        let store = self.clone();
        let task = tokio::spawn(async move {
            let _gate = gate;
            store.settle(staged).await
        });
        join(task).await?;
        Ok(value)
    }

    /// Like [`apply`](Self::apply), then wait for `confirm` (typically a
    /// remote call) before committing.
    ///
    /// A failed confirmation restores the pre-mutation snapshot in memory and
    /// in storage and returns the confirmation error.
    pub async fn apply_confirmed<R, F, G, Fut>(&self, mutation: F, confirm: G) -> Result<R>
    where
        R: Clone + Send + 'static,
        F: FnOnce(&mut C) -> Mutation<R>,
        G: FnOnce(R) -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let gate = Arc::clone(&self.write_gate).lock_owned().await;
        let (staged, value) = match self.stage(mutation).await? {
            Staging::Skipped(value) => return Ok(value),
            Staging::Staged(staged, value) => (staged, value),
        };

        let store = self.clone();
        let confirmed = value.clone();
        let task = tokio::spawn(async move {
            let _gate = gate;
            store.settle_confirmed(staged, confirm(confirmed)).await
        });
        join(task).await?;
        Ok(value)
    }

    async fn stage<R, F>(&self, mutation: F) -> Result<Staging<C, R>>
    where
        F: FnOnce(&mut C) -> Mutation<R>,
    {
        let mut inner = self.inner.write().await;
        if inner.phase == StorePhase::Uninitialized {
            return Err(StoreError::NotLoaded(self.key.clone()));
        }

        let previous = inner.entries.clone();
        let mut next = previous.clone();
        let (value, persist) = match mutation(&mut next) {
            Mutation::Unchanged(value) => return Ok(Staging::Skipped(value)),
            Mutation::Write(value) => (value, Persist::Write),
            Mutation::Remove(value) => (value, Persist::Remove),
        };

        inner.entries = next.clone();
        inner.phase = StorePhase::Pending;
        drop(inner);

        self.changes.send_replace(next.clone());
        Ok(Staging::Staged(
            Staged {
                previous,
                next,
                persist,
            },
            value,
        ))
    }

    async fn settle(&self, staged: Staged<C>) -> Result<()> {
        match self.persist(&staged.next, staged.persist).await {
            Ok(()) => {
                self.commit().await;
                Ok(())
            }
            Err(err) => {
                warn!(key = %self.key, error = %err, "persist failed, reverting");
                self.revert(staged.previous).await;
                Err(err)
            }
        }
    }

    async fn settle_confirmed<Fut>(&self, staged: Staged<C>, confirmation: Fut) -> Result<()>
    where
        Fut: Future<Output = Result<()>>,
    {
        if let Err(err) = self.persist(&staged.next, staged.persist).await {
            warn!(key = %self.key, error = %err, "persist failed, reverting");
            self.revert(staged.previous).await;
            return Err(err);
        }

        if let Err(err) = confirmation.await {
            warn!(key = %self.key, error = %err, "confirmation failed, reverting");
            if let Err(restore_err) = self.persist(&staged.previous, Persist::Write).await {
                error!(
                    key = %self.key,
                    error = %restore_err,
                    "failed to restore previous collection after rejected confirmation"
                );
            }
            self.revert(staged.previous).await;
            return Err(err);
        }

        self.commit().await;
        Ok(())
    }

    async fn persist(&self, entries: &C, persist: Persist) -> Result<()> {
        match persist {
            Persist::Write => {
                let json = serde_json::to_string(entries)?;
                self.kv.set(&self.key, json).await
            }
            Persist::Remove => self.kv.remove(&self.key).await,
        }
    }

    async fn commit(&self) {
        self.inner.write().await.phase = StorePhase::Ready;
        debug!(key = %self.key, "collection persisted");
    }

    async fn revert(&self, previous: C) {
        {
            let mut inner = self.inner.write().await;
            inner.entries = previous.clone();
            inner.phase = StorePhase::Ready;
        }
        self.changes.send_replace(previous);
    }
}

async fn join(task: JoinHandle<Result<()>>) -> Result<()> {
    task.await
        .map_err(|err| StoreError::Backend(format!("write task failed: {err}")))?
}

fn parse<C: Collection>(raw: &str) -> std::result::Result<C, String> {
    let entries: C = serde_json::from_str(raw).map_err(|e| e.to_string())?;
    entries.validate()?;
    Ok(entries)
}
