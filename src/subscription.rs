use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

/// Entries keyed by insertion id. Handed out entries stay registered until
/// their [`Subscription`] guard is dropped.
pub(crate) struct Registry<T> {
    next_id: AtomicU64,
    entries: RwLock<BTreeMap<u64, T>>,
}

impl<T> Registry<T> {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicU64::new(1),
            entries: RwLock::new(BTreeMap::new()),
        })
    }

    pub(crate) fn len(&self) -> usize {
        match self.entries.read() {
            Ok(entries) => entries.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub(crate) fn collect<R>(&self, mut select: impl FnMut(&T) -> Option<R>) -> Vec<R> {
        let entries = match self.entries.read() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.values().filter_map(&mut select).collect()
    }

    fn remove(&self, id: u64) {
        let mut entries = match self.entries.write() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.remove(&id);
    }
}

impl<T: Send + Sync + 'static> Registry<T> {
    pub(crate) fn insert(self: &Arc<Self>, entry: T) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        {
            let mut entries = match self.entries.write() {
                Ok(entries) => entries,
                Err(poisoned) => poisoned.into_inner(),
            };
            entries.insert(id, entry);
        }
        let registry: Arc<dyn Unregister> = self.clone();
        Subscription {
            id,
            registry: Arc::downgrade(&registry),
        }
    }
}

trait Unregister: Send + Sync {
    fn unregister(&self, id: u64);
}

impl<T: Send + Sync> Unregister for Registry<T> {
    fn unregister(&self, id: u64) {
        self.remove(id);
    }
}

/// Scoped registration handle. Dropping it releases the registration; a
/// registry that is already gone is ignored.
#[must_use = "dropping a subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    registry: Weak<dyn Unregister>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Unsubscribes now. Same as dropping the guard.
    pub fn cancel(self) {}
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.unregister(self.id);
        }
    }
}
