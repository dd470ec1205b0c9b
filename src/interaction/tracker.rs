//! Registry of in-flight deliveries, one per conversation.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use tracing::{debug, warn};

use crate::base::types::{ConversationKey, DeliveryHandle};

type HandleMap = HashMap<ConversationKey, DeliveryHandle>;

/// Tracks the message being edited for each conversation.
///
/// A conversation holds at most one handle. Registration is rejected while the
/// key is occupied, and an entry can only be removed by the run that owns it.
///
/// This is trivially cloneable; clones share the same registry.
#[derive(Clone, Default)]
pub struct ConversationTracker {
    inner: Arc<Mutex<HandleMap>>,
}

impl ConversationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HandleMap> {
        // The map holds plain data, so a panic elsewhere cannot leave it half-updated.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Claims the conversation for `handle`.
    ///
    /// On success, the returned [`Registration`] removes the entry when dropped.
    /// If another run holds the conversation, its handle is returned instead.
    pub fn register(&self, handle: DeliveryHandle) -> Result<Registration, DeliveryHandle> {
        let mut map = self.lock();

        if let Some(existing) = map.get(&handle.key) {
            return Err(existing.clone());
        }

        debug!(key = %handle.key, ts = %handle.message_ts, "Registered conversation");
        map.insert(handle.key.clone(), handle.clone());

        Ok(Registration { tracker: self.clone(), handle })
    }

    /// The handle currently registered for `key`, if any.
    pub fn lookup(&self, key: &ConversationKey) -> Option<DeliveryHandle> {
        self.lock().get(key).cloned()
    }

    /// Removes the entry for `handle.key` if it still belongs to `handle`.
    ///
    /// Returns whether an entry was removed.
    pub fn unregister(&self, handle: &DeliveryHandle) -> bool {
        let mut map = self.lock();

        match map.get(&handle.key) {
            Some(existing) if existing == handle => {
                map.remove(&handle.key);
                debug!(key = %handle.key, ts = %handle.message_ts, "Unregistered conversation");
                true
            }
            Some(existing) => {
                warn!(key = %handle.key, owner = %existing.message_ts, ts = %handle.message_ts, "Refusing to unregister a conversation owned by another run");
                false
            }
            None => false,
        }
    }

    /// Number of conversations with an in-flight delivery.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Ownership of one tracker entry for the duration of a relay run.
///
/// Dropping it unregisters the entry exactly once, whichever way the run ends,
/// including when the run's future is dropped mid-flight.
pub struct Registration {
    tracker: ConversationTracker,
    handle: DeliveryHandle,
}

impl Registration {
    pub fn handle(&self) -> &DeliveryHandle {
        &self.handle
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.tracker.unregister(&self.handle);
    }
}

// Tests.
