//! Shopping cart: products plus per-entry selection and rental duration.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use storefront_model::{Product, ProductId};
use tokio::sync::watch;

use crate::kv::{keys, KvStore};
use crate::optimistic::{Collection, Mutation, OptimisticStore};
use crate::Result;

/// A product in the cart with its UI-only metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartEntry {
    pub item: Product,

    /// Whether the entry counts towards checkout
    pub selected: bool,

    /// Number of periods (days) the product is booked for; always >= 1
    pub duration: u32,
}

impl CartEntry {
    pub fn new(item: Product) -> Self {
        Self {
            item,
            selected: true,
            duration: 1,
        }
    }

    pub fn id(&self) -> ProductId {
        self.item.id
    }

    pub fn subtotal(&self) -> u64 {
        self.item.price.saturating_mul(u64::from(self.duration))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartEntries(pub Vec<CartEntry>);

impl CartEntries {
    fn find_mut(&mut self, id: ProductId) -> Option<&mut CartEntry> {
        self.0.iter_mut().find(|entry| entry.id() == id)
    }
}

impl Collection for CartEntries {
    fn validate(&self) -> std::result::Result<(), String> {
        let mut seen = HashSet::new();
        for entry in &self.0 {
            if entry.duration < 1 {
                return Err(format!("entry {} has duration 0", entry.id()));
            }
            if !seen.insert(entry.id()) {
                return Err(format!("duplicate cart entry {}", entry.id()));
            }
        }
        Ok(())
    }
}

/// Field-level change to one entry. Absent fields are left alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CartPatch {
    pub selected: Option<bool>,
    pub duration: Option<f64>,
}

/// Floor a requested duration and clamp it to at least one period.
pub fn clamp_duration(requested: f64) -> u32 {
    if !requested.is_finite() || requested < 1.0 {
        return 1;
    }
    // `as` saturates at u32::MAX.
    requested.floor() as u32
}

#[derive(Clone)]
pub struct CartStore {
    store: OptimisticStore<CartEntries>,
}

impl CartStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self {
            store: OptimisticStore::new(keys::CART, kv),
        }
    }

    /// Load the persisted cart, returning the number of entries.
    pub async fn load(&self) -> usize {
        self.store.load().await.0.len()
    }

    /// Add `product` with default metadata.
    ///
    /// Returns `false` without touching storage when the product is already
    /// in the cart.
    pub async fn add(&self, product: Product) -> Result<bool> {
        self.store
            .apply(move |cart: &mut CartEntries| {
                if cart.0.iter().any(|entry| entry.id() == product.id) {
                    return Mutation::Unchanged(false);
                }
                cart.0.push(CartEntry::new(product));
                Mutation::Write(true)
            })
            .await
    }

    /// Remove the entry for `id`. Returns whether an entry was removed.
    pub async fn remove(&self, id: ProductId) -> Result<bool> {
        self.store
            .apply(move |cart: &mut CartEntries| {
                let before = cart.0.len();
                cart.0.retain(|entry| entry.id() != id);
                let removed = cart.0.len() != before;
                Mutation::write_if(removed, removed)
            })
            .await
    }

    /// Empty the cart and delete its durable key.
    pub async fn clear(&self) -> Result<()> {
        self.store
            .apply(|cart: &mut CartEntries| {
                cart.0.clear();
                Mutation::Remove(())
            })
            .await
    }

    /// Flip the selection flag of `id`, returning the new flag.
    pub async fn toggle_selection(&self, id: ProductId) -> Result<Option<bool>> {
        self.store
            .apply(move |cart: &mut CartEntries| match cart.find_mut(id) {
                Some(entry) => {
                    entry.selected = !entry.selected;
                    Mutation::Write(Some(entry.selected))
                }
                None => Mutation::Unchanged(None),
            })
            .await
    }

    /// Set the selection flag of `id`. Returns `None` when `id` is not in the cart.
    pub async fn set_selected(&self, id: ProductId, selected: bool) -> Result<Option<bool>> {
        self.store
            .apply(move |cart: &mut CartEntries| match cart.find_mut(id) {
                Some(entry) if entry.selected == selected => Mutation::Unchanged(Some(selected)),
                Some(entry) => {
                    entry.selected = selected;
                    Mutation::Write(Some(selected))
                }
                None => Mutation::Unchanged(None),
            })
            .await
    }

    /// Set the selection flag of every entry.
    pub async fn set_all_selected(&self, selected: bool) -> Result<()> {
        self.store
            .apply(move |cart: &mut CartEntries| {
                let mut changed = false;
                for entry in cart.0.iter_mut().filter(|e| e.selected != selected) {
                    entry.selected = selected;
                    changed = true;
                }
                Mutation::write_if(changed, ())
            })
            .await
    }

    /// Apply every field of `patch` to `id` in a single write.
    ///
    /// Returns the updated entry, or `None` when `id` is not in the cart.
    pub async fn update(&self, id: ProductId, patch: CartPatch) -> Result<Option<CartEntry>> {
        self.store
            .apply(move |cart: &mut CartEntries| {
                let Some(entry) = cart.find_mut(id) else {
                    return Mutation::Unchanged(None);
                };
                let before = entry.clone();
                if let Some(selected) = patch.selected {
                    entry.selected = selected;
                }
                if let Some(duration) = patch.duration {
                    entry.duration = clamp_duration(duration);
                }
                let changed = *entry != before;
                Mutation::write_if(changed, Some(entry.clone()))
            })
            .await
    }

    /// Set the duration of `id`, returning the stored (clamped) duration.
    pub async fn update_duration(&self, id: ProductId, duration: f64) -> Result<Option<u32>> {
        let duration = clamp_duration(duration);
        self.store
            .apply(move |cart: &mut CartEntries| match cart.find_mut(id) {
                Some(entry) if entry.duration == duration => Mutation::Unchanged(Some(duration)),
                Some(entry) => {
                    entry.duration = duration;
                    Mutation::Write(Some(duration))
                }
                None => Mutation::Unchanged(None),
            })
            .await
    }

    pub async fn contains(&self, id: ProductId) -> bool {
        self.store
            .read(|cart| cart.0.iter().any(|entry| entry.id() == id))
            .await
    }

    pub async fn entries(&self) -> Vec<CartEntry> {
        self.store.snapshot().await.0
    }

    pub async fn selected(&self) -> Vec<CartEntry> {
        self.store
            .read(|cart| cart.0.iter().filter(|e| e.selected).cloned().collect())
            .await
    }

    /// Sum of `price * duration` over selected entries.
    pub async fn selected_total(&self) -> u64 {
        self.store
            .read(|cart| {
                cart.0
                    .iter()
                    .filter(|e| e.selected)
                    .map(CartEntry::subtotal)
                    .fold(0u64, u64::saturating_add)
            })
            .await
    }

    pub async fn len(&self) -> usize {
        self.store.read(|cart| cart.0.len()).await
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn subscribe(&self) -> watch::Receiver<CartEntries> {
        self.store.subscribe()
    }
}
