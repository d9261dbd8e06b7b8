use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::{
    error::ProviderError,
    feed::{
        FeedHandle,
        source::{DocumentSnapshot, DocumentStore, QueryKey},
    },
};

/// Logical subscription identity. Each slot holds at most one live feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedSlot {
    /// The authenticated user's profile document.
    Profile,
    /// The ranked or chronological score query.
    Leaderboard,
}

/// Monotonically increasing counter per slot, used to discard deliveries
/// from a superseded feed.
pub type Generation = u64;

struct SlotEntry {
    generation: Generation,
    handle: FeedHandle,
}

/// Owns zero-or-one live feed per [`FeedSlot`] and guarantees deterministic
/// teardown.
///
/// Re-subscribing a slot synchronously closes the superseded handle before
/// the new feed is established, and bumps the slot's live generation first,
/// so a superseded feed's in-flight delivery can never reach a callback.
/// Callers that queue deliveries before applying them re-check
/// [`is_current`](Self::is_current) with the generation attached to the
/// delivery.
pub struct SubscriptionManager {
    store: Arc<dyn DocumentStore>,
    slots: DashMap<FeedSlot, SlotEntry>,
    live: Arc<DashMap<FeedSlot, Generation>>,
}

impl SubscriptionManager {
    /// Build a manager draining feeds from the given store.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            slots: DashMap::new(),
            live: Arc::new(DashMap::new()),
        }
    }

    /// Watch a single document in `slot`, replacing any previous feed.
    ///
    /// Returns the generation of the new feed; every delivery carries it so
    /// the caller can discard queued deliveries from superseded feeds.
    pub fn subscribe_document<D, E>(
        &self,
        slot: FeedSlot,
        collection: &str,
        id: &str,
        on_data: D,
        on_error: E,
    ) -> Generation
    where
        D: Fn(Generation, DocumentSnapshot) + Send + Sync + 'static,
        E: Fn(Generation, ProviderError) + Send + Sync + 'static,
    {
        let generation = self.supersede(slot);
        debug!(?slot, generation, collection, id, "opening document feed");

        let handle = self.store.watch_document(
            collection,
            id,
            self.gate(slot, generation, on_data),
            self.gate(slot, generation, on_error),
        );

        self.slots.insert(slot, SlotEntry { generation, handle });
        generation
    }

    /// Watch an ordered query in `slot`, replacing any previous feed.
    pub fn subscribe_query<D, E>(
        &self,
        slot: FeedSlot,
        key: &QueryKey,
        on_data: D,
        on_error: E,
    ) -> Generation
    where
        D: Fn(Generation, Vec<DocumentSnapshot>) + Send + Sync + 'static,
        E: Fn(Generation, ProviderError) + Send + Sync + 'static,
    {
        let generation = self.supersede(slot);
        debug!(?slot, generation, collection = %key.collection, "opening query feed");

        let handle = self.store.watch_query(
            key,
            self.gate(slot, generation, on_data),
            self.gate(slot, generation, on_error),
        );

        self.slots.insert(slot, SlotEntry { generation, handle });
        generation
    }

    /// Close the feed held by `slot`, if any. Idempotent.
    pub fn unsubscribe(&self, slot: FeedSlot) {
        let Some((_, mut entry)) = self.slots.remove(&slot) else {
            return;
        };

        // Invalidate before tearing down so an in-flight delivery racing the
        // teardown is discarded by the gate.
        self.bump(slot);
        entry.handle.close();
        debug!(?slot, generation = entry.generation, "closed feed");
    }

    /// Close every feed, each teardown running exactly once. Used on full
    /// shutdown.
    pub fn unsubscribe_all(&self) {
        let slots: Vec<FeedSlot> = self.slots.iter().map(|entry| *entry.key()).collect();
        for slot in slots {
            self.unsubscribe(slot);
        }
    }

    /// Whether `generation` is still the live feed of `slot`.
    pub fn is_current(&self, slot: FeedSlot, generation: Generation) -> bool {
        self.live
            .get(&slot)
            .is_some_and(|live| *live == generation)
    }

    /// Whether `slot` currently holds a feed.
    pub fn is_active(&self, slot: FeedSlot) -> bool {
        self.slots.contains_key(&slot)
    }

    /// Bump the live generation and synchronously close any previous handle.
    fn supersede(&self, slot: FeedSlot) -> Generation {
        let generation = self.bump(slot);
        if let Some((_, mut entry)) = self.slots.remove(&slot) {
            entry.handle.close();
        }
        generation
    }

    fn bump(&self, slot: FeedSlot) -> Generation {
        let mut entry = self.live.entry(slot).or_insert(0);
        *entry += 1;
        *entry
    }

    /// Wrap a callback so it only fires while `generation` is live.
    fn gate<T, F>(&self, slot: FeedSlot, generation: Generation, inner: F) -> Box<dyn Fn(T) + Send + Sync>
    where
        T: 'static,
        F: Fn(Generation, T) + Send + Sync + 'static,
    {
        let live = Arc::clone(&self.live);
        Box::new(move |payload: T| {
            let current = live.get(&slot).is_some_and(|value| *value == generation);
            if current {
                inner(generation, payload);
            }
        })
    }
}
