//! Resource registry
//!
//! Maps each [`ResourceKey`] to its single [`SharedPoller`]. Entries are
//! reference counted: every `get_or_create` takes one holder reference and
//! every `release` drops one; the poller is stopped when the last holder
//! goes away.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use domain::ResourceKey;
use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::error::ApplicationError;
use crate::ports::ResourceFetcher;
use crate::services::shared_poller::{PollerSettings, SharedPoller};

struct RegistryEntry {
    cell: Arc<OnceCell<Arc<SharedPoller>>>,
    holders: usize,
}

/// Removes the entry if a creation is dropped before it finishes
struct PendingCreation<'a> {
    registry: &'a PollerRegistry,
    key: &'a ResourceKey,
    cell: &'a Arc<OnceCell<Arc<SharedPoller>>>,
    armed: bool,
}

impl Drop for PendingCreation<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.registry.abandon_creation(self.key, self.cell);
        }
    }
}

/// Process-wide table of shared pollers, injected where needed
pub struct PollerRegistry {
    fetcher: Arc<dyn ResourceFetcher>,
    entries: Mutex<HashMap<ResourceKey, RegistryEntry>>,
}

impl fmt::Debug for PollerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollerRegistry")
            .field("entries", &self.entries.lock().len())
            .finish_non_exhaustive()
    }
}

impl PollerRegistry {
    /// Create an empty registry fetching through `fetcher`
    pub fn new(fetcher: Arc<dyn ResourceFetcher>) -> Self {
        Self {
            fetcher,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the poller for `key`, creating it on first use
    ///
    /// An existing poller is returned as is, without fetching. Concurrent
    /// callers for a missing key share a single creation and therefore a
    /// single initial fetch. `settings` only matter for the creating call.
    ///
    /// The holder reference is taken only once a poller is handed out, so
    /// dropping this future mid-creation leaves no reference behind. If the
    /// registry was shut down while the poller was being created, the poller
    /// is returned already stopped.
    pub async fn get_or_create(
        &self,
        key: &ResourceKey,
        settings: PollerSettings,
    ) -> Arc<SharedPoller> {
        loop {
            let cell = {
                let mut entries = self.entries.lock();
                let entry = entries
                    .entry(key.clone())
                    .or_insert_with(|| RegistryEntry {
                        cell: Arc::new(OnceCell::new()),
                        holders: 0,
                    });
                if let Some(poller) = entry.cell.get() {
                    entry.holders += 1;
                    debug!(key = %key, holders = entry.holders, "Reusing shared poller");
                    return Arc::clone(poller);
                }
                Arc::clone(&entry.cell)
            };

            let mut pending = PendingCreation {
                registry: self,
                key,
                cell: &cell,
                armed: true,
            };
            let fetcher = Arc::clone(&self.fetcher);
            let poller = Arc::clone(
                cell.get_or_init(|| async move {
                    debug!(key = %key, "Creating shared poller");
                    SharedPoller::start(key.clone(), fetcher, settings).await
                })
                .await,
            );
            pending.armed = false;

            if let Some(poller) = self.take_created(key, &cell, poller) {
                return poller;
            }
        }
    }

    /// Count the caller as a holder of a freshly created poller
    ///
    /// Returns `None` when another creation replaced the entry meanwhile;
    /// the caller then joins that one instead.
    fn take_created(
        &self,
        key: &ResourceKey,
        cell: &Arc<OnceCell<Arc<SharedPoller>>>,
        poller: Arc<SharedPoller>,
    ) -> Option<Arc<SharedPoller>> {
        let replaced = {
            let mut entries = self.entries.lock();
            match entries.get_mut(key) {
                Some(entry) if Arc::ptr_eq(&entry.cell, cell) => {
                    entry.holders += 1;
                    return Some(poller);
                },
                Some(_) => true,
                None => false,
            }
        };

        if replaced {
            warn!(key = %key, "Entry replaced during creation, stopping duplicate poller");
            poller.stop();
            None
        } else {
            warn!(key = %key, "Registry shut down during creation, stopping poller");
            poller.stop();
            Some(poller)
        }
    }

    /// Clean up after a creation whose caller went away
    ///
    /// The entry is dropped only if nobody holds it and no other caller is
    /// waiting on the same creation.
    fn abandon_creation(&self, key: &ResourceKey, cell: &Arc<OnceCell<Arc<SharedPoller>>>) {
        let removed = {
            let mut entries = self.entries.lock();
            // the entry and the abandoning caller own one reference each
            let orphaned = entries.get(key).is_some_and(|entry| {
                Arc::ptr_eq(&entry.cell, cell)
                    && entry.holders == 0
                    && Arc::strong_count(cell) <= 2
            });
            if orphaned {
                entries.remove(key)
            } else {
                None
            }
        };

        if let Some(entry) = removed {
            if let Some(poller) = entry.cell.get() {
                poller.stop();
            }
            debug!(key = %key, "Poller creation abandoned, entry removed");
        }
    }

    /// Drop one holder reference for `key`
    ///
    /// When the last holder releases, the entry is removed and its poller
    /// stopped. Releasing an unknown key, or a key whose poller is still
    /// being created and has no holder yet, is a no-op and returns `false`.
    pub fn release(&self, key: &ResourceKey) -> bool {
        let removed = {
            let mut entries = self.entries.lock();
            let Some(entry) = entries.get_mut(key).filter(|entry| entry.holders > 0) else {
                let err = ApplicationError::UnknownResourceKey(key.to_string());
                debug!(error = %err, "Release ignored");
                return false;
            };

            entry.holders -= 1;
            if entry.holders > 0 {
                debug!(key = %key, holders = entry.holders, "Released poller reference");
                return true;
            }
            entries.remove(key)
        };

        if let Some(poller) = removed.as_ref().and_then(|entry| entry.cell.get()) {
            poller.stop();
        }
        info!(key = %key, "Last holder released, poller removed");
        true
    }

    /// The poller for `key`, if it exists and finished creation
    pub fn get(&self, key: &ResourceKey) -> Option<Arc<SharedPoller>> {
        self.entries
            .lock()
            .get(key)
            .and_then(|entry| entry.cell.get().cloned())
    }

    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.entries.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Number of holder references for `key`
    pub fn holders(&self, key: &ResourceKey) -> usize {
        self.entries
            .lock()
            .get(key)
            .map_or(0, |entry| entry.holders)
    }

    /// Keys with a registered poller, sorted by their display form
    pub fn keys(&self) -> Vec<ResourceKey> {
        let mut keys: Vec<ResourceKey> = self.entries.lock().keys().cloned().collect();
        keys.sort_by_key(ToString::to_string);
        keys
    }

    /// Stop and remove every poller
    pub fn shutdown(&self) {
        let drained: Vec<(ResourceKey, RegistryEntry)> = self.entries.lock().drain().collect();
        let count = drained.len();
        for (_, entry) in drained {
            if let Some(poller) = entry.cell.get() {
                poller.stop();
            }
        }
        info!(count, "Poller registry shut down");
    }
}
