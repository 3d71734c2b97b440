//! Per-consumer view
//!
//! A view subscribes to one [`SharedPoller`], filters its snapshot for a
//! single device and pushes the result to the display layer. The first
//! non-empty projection also yields the device's label; that rename happens
//! once per view and is never repeated.

use std::fmt;
use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicBool, Ordering};

use domain::{
    FilteredSnapshot, LineFilter, ResourceKey, ResourceKind, ResourceSnapshot,
    derive_stop_identity, derive_vehicle_identity,
};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::error::ApplicationError;
use crate::ports::DisplayPort;
use crate::services::shared_poller::{PollerListener, PollerUpdate, SharedPoller};

/// Filter a snapshot for one consumer
///
/// Keeps the records matching `filter` in their original order. An absent
/// snapshot projects to an empty one without timestamp.
pub fn project(snapshot: Option<&ResourceSnapshot>, filter: &LineFilter) -> FilteredSnapshot {
    let Some(snapshot) = snapshot else {
        return FilteredSnapshot::empty();
    };

    FilteredSnapshot {
        timestamp: snapshot.timestamp.clone(),
        records: snapshot
            .records
            .iter()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect(),
    }
}

struct ViewState {
    current: FilteredSnapshot,
    last_success: bool,
    identity_updated: bool,
    label: Option<String>,
    /// Poller generation of the update currently shown
    generation: Option<u64>,
}

/// Filtered projection of one poller for one device
pub struct ConsumerView {
    device_id: String,
    filter: LineFilter,
    poller: Arc<SharedPoller>,
    display: Arc<dyn DisplayPort>,
    state: Mutex<ViewState>,
    detached: AtomicBool,
}

impl fmt::Debug for ConsumerView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ConsumerView")
            .field("device_id", &self.device_id)
            .field("key", self.poller.key())
            .field("filter", &self.filter)
            .field("records", &state.current.len())
            .field("identity_updated", &state.identity_updated)
            .finish_non_exhaustive()
    }
}

impl ConsumerView {
    /// Subscribe a new view to `poller` and project its current snapshot
    ///
    /// The device id doubles as the subscription id, so attaching the same
    /// device twice to one poller fails with `DuplicateSubscription`.
    pub fn attach(
        device_id: impl Into<String>,
        poller: Arc<SharedPoller>,
        filter: LineFilter,
        display: Arc<dyn DisplayPort>,
    ) -> Result<Arc<Self>, ApplicationError> {
        let view = Arc::new(Self {
            device_id: device_id.into(),
            filter,
            poller,
            display,
            state: Mutex::new(ViewState {
                current: FilteredSnapshot::empty(),
                last_success: false,
                identity_updated: false,
                label: None,
                generation: None,
            }),
            detached: AtomicBool::new(false),
        });

        let listener: Weak<dyn PollerListener> = Arc::downgrade(&view) as Weak<ConsumerView>;
        view.poller.add_listener(view.device_id.clone(), listener)?;

        // A tick may already have reached the view; apply drops this update
        // if so.
        let update = view.poller.current_update();
        view.apply(&update);

        debug!(
            device_id = %view.device_id,
            key = %view.poller.key(),
            "Consumer view attached"
        );
        Ok(view)
    }

    /// Re-project after the poller ticked
    ///
    /// Updates older than the one already shown are ignored.
    pub fn on_upstream_notified(&self, update: &PollerUpdate) {
        if self.is_detached() {
            return;
        }
        self.apply(update);
    }

    fn apply(&self, update: &PollerUpdate) {
        let last_success = update.last_success;
        let (rename, published) = {
            let mut state = self.state.lock();
            if state.generation.is_some_and(|shown| shown >= update.generation) {
                debug!(
                    device_id = %self.device_id,
                    generation = update.generation,
                    "Stale poller update ignored"
                );
                return;
            }
            state.generation = Some(update.generation);
            state.current = project(update.snapshot.as_deref(), &self.filter);
            state.last_success = last_success;

            let rename = if !state.identity_updated && !state.current.is_empty() {
                let label = self.derive_label(&state.current);
                if label.is_some() {
                    state.identity_updated = true;
                    state.label.clone_from(&label);
                }
                label
            } else {
                None
            };

            (rename, state.current.clone())
        };

        if let Some(label) = rename {
            info!(device_id = %self.device_id, label = %label, "Device identity derived");
            self.display.rename_device(&self.device_id, &label);
        }
        self.display
            .publish_state(&self.device_id, &published, last_success);
    }

    fn derive_label(&self, current: &FilteredSnapshot) -> Option<String> {
        let key = self.poller.key();
        let identity = match key.kind() {
            ResourceKind::Stop => {
                derive_stop_identity(key.operator(), key.target(), &self.filter, &current.records)
            },
            ResourceKind::Vehicle => {
                derive_vehicle_identity(key.operator(), key.target(), &current.records)
            },
        };
        identity.map(|identity| identity.label)
    }

    /// Unsubscribe from the poller; returns `false` if already detached
    pub fn detach(&self) -> bool {
        if self.detached.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.poller.remove_listener(&self.device_id);
        debug!(device_id = %self.device_id, "Consumer view detached");
        true
    }

    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::SeqCst)
    }

    /// Latest projection
    pub fn current(&self) -> FilteredSnapshot {
        self.state.lock().current.clone()
    }

    /// Whether the poller's most recent fetch succeeded
    pub fn last_success(&self) -> bool {
        self.state.lock().last_success
    }

    /// Whether the one-time rename already happened
    pub fn identity_updated(&self) -> bool {
        self.state.lock().identity_updated
    }

    /// Label sent with the rename, once derived
    pub fn label(&self) -> Option<String> {
        self.state.lock().label.clone()
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn key(&self) -> &ResourceKey {
        self.poller.key()
    }

    pub const fn filter(&self) -> &LineFilter {
        &self.filter
    }

    /// The poller this view is subscribed to
    pub fn poller(&self) -> &Arc<SharedPoller> {
        &self.poller
    }
}

impl PollerListener for ConsumerView {
    fn on_update(&self, update: &PollerUpdate) {
        self.on_upstream_notified(update);
    }
}
