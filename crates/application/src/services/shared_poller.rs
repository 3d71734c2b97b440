//! Shared resource poller
//!
//! Owns the polling loop for one [`ResourceKey`]. The first fetch runs
//! before [`SharedPoller::start`] returns, the second one follows after a
//! fixed warm-up interval, and from then on the configured interval applies.
//! Every tick, successful or not, is broadcast to the registered listeners.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use domain::{ResourceKey, ResourceSnapshot};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::ApplicationError;
use crate::ports::ResourceFetcher;

/// Interval used between the first and second fetch
pub const WARMUP_INTERVAL_SECS: u64 = 60;
/// Lower bound for configured poll intervals
pub const MIN_POLL_INTERVAL_SECS: u64 = 30;
/// Upper bound for configured poll intervals
pub const MAX_POLL_INTERVAL_SECS: u64 = 300;
/// Poll interval used when none is configured
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

const WARMUP_INTERVAL: Duration = Duration::from_secs(WARMUP_INTERVAL_SECS);

/// Per-poller settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollerSettings {
    /// Steady-state poll interval in seconds, clamped to [30, 300]
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

const fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
        }
    }
}

impl PollerSettings {
    /// Settings with the given poll interval
    pub const fn with_interval_secs(poll_interval_secs: u64) -> Self {
        Self { poll_interval_secs }
    }

    /// The configured interval after clamping
    pub fn interval(&self) -> Duration {
        Duration::from_secs(
            self.poll_interval_secs
                .clamp(MIN_POLL_INTERVAL_SECS, MAX_POLL_INTERVAL_SECS),
        )
    }
}

/// Lifecycle phase of a poller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollerPhase {
    /// Initial fetch not finished yet
    Initializing,
    /// Waiting out the warm-up interval before the second fetch
    WarmingUp,
    /// Polling at the configured interval
    Steady,
    /// Torn down, never fetches again
    Stopped,
}

/// What listeners receive after every tick
#[derive(Debug, Clone)]
pub struct PollerUpdate {
    /// Key of the notifying poller
    pub key: ResourceKey,
    /// Latest successful snapshot, if any fetch ever succeeded
    pub snapshot: Option<Arc<ResourceSnapshot>>,
    /// Whether the most recent fetch succeeded
    pub last_success: bool,
    /// Error message of the most recent fetch, if it failed
    pub last_error: Option<String>,
    /// Number of fetches completed when this update was taken
    ///
    /// Strictly increases from one fetch to the next, so a consumer can
    /// tell a stale update from a fresh one.
    pub generation: u64,
}

/// Callback invoked on every poller tick
///
/// Runs synchronously on the poller's task; implementations must return
/// quickly and must not block.
pub trait PollerListener: Send + Sync {
    /// Handle one tick
    fn on_update(&self, update: &PollerUpdate);
}

impl<F> PollerListener for F
where
    F: Fn(&PollerUpdate) + Send + Sync,
{
    fn on_update(&self, update: &PollerUpdate) {
        self(update);
    }
}

struct ListenerSlot {
    subscription_id: String,
    listener: Weak<dyn PollerListener>,
}

struct PollerState {
    phase: PollerPhase,
    snapshot: Option<Arc<ResourceSnapshot>>,
    last_success: bool,
    last_error: Option<String>,
    current_interval: Duration,
    generation: u64,
}

/// Single polling loop serving every consumer of one resource key
pub struct SharedPoller {
    key: ResourceKey,
    fetcher: Arc<dyn ResourceFetcher>,
    configured_interval: Duration,
    state: RwLock<PollerState>,
    listeners: Mutex<Vec<ListenerSlot>>,
    task: Mutex<Option<JoinHandle<()>>>,
    stopped: AtomicBool,
    /// Serialises fetches so timer ticks and manual refreshes never overlap
    fetch_lock: tokio::sync::Mutex<()>,
}

impl fmt::Debug for SharedPoller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("SharedPoller")
            .field("key", &self.key)
            .field("phase", &state.phase)
            .field("last_success", &state.last_success)
            .field("current_interval", &state.current_interval)
            .field("configured_interval", &self.configured_interval)
            .field("listeners", &self.listeners.lock().len())
            .finish_non_exhaustive()
    }
}

impl SharedPoller {
    /// Create a poller, run its initial fetch and start its timer
    ///
    /// A failing initial fetch is not fatal: the poller starts with no
    /// snapshot and `last_success == false`, and keeps polling.
    pub async fn start(
        key: ResourceKey,
        fetcher: Arc<dyn ResourceFetcher>,
        settings: PollerSettings,
    ) -> Arc<Self> {
        let configured_interval = settings.interval();
        if configured_interval.as_secs() != settings.poll_interval_secs {
            warn!(
                key = %key,
                requested_secs = settings.poll_interval_secs,
                interval_secs = configured_interval.as_secs(),
                "Poll interval out of range, clamped"
            );
        }

        let poller = Arc::new(Self {
            key,
            fetcher,
            configured_interval,
            state: RwLock::new(PollerState {
                phase: PollerPhase::Initializing,
                snapshot: None,
                last_success: false,
                last_error: None,
                current_interval: configured_interval,
                generation: 0,
            }),
            fetch_lock: tokio::sync::Mutex::new(()),
            listeners: Mutex::new(Vec::new()),
            task: Mutex::new(None),
            stopped: AtomicBool::new(false),
        });

        poller.fetch_once().await;

        {
            let mut state = poller.state.write();
            state.phase = PollerPhase::WarmingUp;
            state.current_interval = WARMUP_INTERVAL;
        }

        info!(
            key = %poller.key,
            warmup_secs = WARMUP_INTERVAL_SECS,
            interval_secs = configured_interval.as_secs(),
            "Shared poller started"
        );

        poller.spawn_timer();
        poller
    }

    fn spawn_timer(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            loop {
                let interval = match weak.upgrade() {
                    Some(poller) if !poller.is_stopped() => poller.current_interval(),
                    _ => break,
                };

                tokio::time::sleep(interval).await;

                let Some(poller) = weak.upgrade() else {
                    break;
                };
                if poller.is_stopped() {
                    break;
                }
                poller.tick().await;
            }
        });

        *self.task.lock() = Some(handle);

        // stop() may have run before the handle was stored
        if self.is_stopped() {
            self.abort_timer();
        }
    }

    async fn tick(&self) {
        let _fetching = self.fetch_lock.lock().await;
        self.advance_phase();
        self.fetch_once().await;

        if self.is_stopped() {
            return;
        }
        self.notify_listeners();
    }

    /// Fetch now and notify listeners, outside the regular schedule
    ///
    /// Leaves the phase and the timer alone; the next tick still comes
    /// after the current interval. Returns `false` once stopped.
    pub async fn refresh_now(&self) -> bool {
        let _fetching = self.fetch_lock.lock().await;
        if self.is_stopped() {
            return false;
        }
        debug!(key = %self.key, "Manual refresh");
        self.fetch_once().await;

        if self.is_stopped() {
            return false;
        }
        self.notify_listeners();
        true
    }

    fn advance_phase(&self) {
        let mut state = self.state.write();
        if state.phase == PollerPhase::WarmingUp {
            state.phase = PollerPhase::Steady;
            state.current_interval = self.configured_interval;
            debug!(
                key = %self.key,
                interval_secs = self.configured_interval.as_secs(),
                "Warm-up finished, switching to configured interval"
            );
        }
    }

    async fn fetch_once(&self) {
        let result = self.fetcher.fetch(&self.key).await;

        let mut state = self.state.write();
        state.generation += 1;
        match result {
            Ok(snapshot) => {
                debug!(key = %self.key, records = snapshot.len(), "Poller updated");
                state.snapshot = Some(Arc::new(snapshot));
                state.last_success = true;
                state.last_error = None;
            },
            Err(e) => {
                warn!(key = %self.key, error = %e, "Update failed, keeping previous snapshot");
                state.last_success = false;
                state.last_error = Some(e.to_string());
            },
        }
    }

    /// Consistent copy of the latest fetch outcome
    pub fn current_update(&self) -> PollerUpdate {
        let state = self.state.read();
        PollerUpdate {
            key: self.key.clone(),
            snapshot: state.snapshot.clone(),
            last_success: state.last_success,
            last_error: state.last_error.clone(),
            generation: state.generation,
        }
    }

    fn notify_listeners(&self) {
        let update = self.current_update();

        // Collect first so listeners may (un)subscribe from inside the callback
        let live: Vec<(String, Arc<dyn PollerListener>)> = {
            let mut listeners = self.listeners.lock();
            listeners.retain(|slot| slot.listener.strong_count() > 0);
            listeners
                .iter()
                .filter_map(|slot| {
                    slot.listener
                        .upgrade()
                        .map(|l| (slot.subscription_id.clone(), l))
                })
                .collect()
        };

        for (subscription_id, listener) in live {
            if catch_unwind(AssertUnwindSafe(|| listener.on_update(&update))).is_err() {
                error!(
                    key = %self.key,
                    subscription = %subscription_id,
                    "Listener panicked while handling update"
                );
            }
        }
    }

    /// Register a listener under `subscription_id`
    ///
    /// The poller only keeps a weak reference; dropping the last strong
    /// reference unsubscribes implicitly.
    pub fn add_listener(
        &self,
        subscription_id: impl Into<String>,
        listener: Weak<dyn PollerListener>,
    ) -> Result<(), ApplicationError> {
        let subscription_id = subscription_id.into();

        if self.is_stopped() {
            return Err(ApplicationError::UnknownResourceKey(self.key.to_string()));
        }

        let mut listeners = self.listeners.lock();
        if listeners
            .iter()
            .any(|slot| slot.subscription_id == subscription_id && slot.listener.strong_count() > 0)
        {
            return Err(ApplicationError::DuplicateSubscription(subscription_id));
        }

        listeners.retain(|slot| slot.subscription_id != subscription_id);
        listeners.push(ListenerSlot {
            subscription_id,
            listener,
        });
        Ok(())
    }

    /// Remove a listener, returning whether it was registered
    pub fn remove_listener(&self, subscription_id: &str) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|slot| slot.subscription_id != subscription_id);
        listeners.len() != before
    }

    /// Tear the poller down: drop all listeners and cancel the timer
    ///
    /// Safe to call more than once.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }

        self.listeners.lock().clear();
        self.state.write().phase = PollerPhase::Stopped;
        self.abort_timer();

        info!(key = %self.key, "Shared poller stopped");
    }

    fn abort_timer(&self) {
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
        }
    }

    /// Resource key this poller serves
    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    /// Latest successful snapshot
    pub fn snapshot(&self) -> Option<Arc<ResourceSnapshot>> {
        self.state.read().snapshot.clone()
    }

    /// Whether the most recent fetch succeeded
    pub fn last_success(&self) -> bool {
        self.state.read().last_success
    }

    /// Error of the most recent fetch, if it failed
    pub fn last_error(&self) -> Option<String> {
        self.state.read().last_error.clone()
    }

    /// Number of fetches completed so far
    pub fn generation(&self) -> u64 {
        self.state.read().generation
    }

    pub fn phase(&self) -> PollerPhase {
        self.state.read().phase
    }

    /// Delay before the next tick
    pub fn current_interval(&self) -> Duration {
        self.state.read().current_interval
    }

    /// Steady-state interval after clamping
    pub const fn configured_interval(&self) -> Duration {
        self.configured_interval
    }

    /// Number of live listeners
    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .iter()
            .filter(|slot| slot.listener.strong_count() > 0)
            .count()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl Drop for SharedPoller {
    fn drop(&mut self) {
        if let Some(handle) = self.task.get_mut().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use domain::TransitRecord;

    use super::*;
    use crate::services::test_support::{ScriptedFetcher, snapshot_with_lines};

    fn stop_key() -> ResourceKey {
        ResourceKey::stop("SF", "18031").unwrap()
    }

    async fn sleep_secs(secs: u64) {
        tokio::time::sleep(Duration::from_secs(secs)).await;
    }

    fn counting_listener(counter: &Arc<AtomicUsize>) -> Arc<dyn PollerListener> {
        let counter = Arc::clone(counter);
        Arc::new(move |_: &PollerUpdate| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn settings_clamp_interval() {
        assert_eq!(PollerSettings::with_interval_secs(5).interval().as_secs(), 30);
        assert_eq!(PollerSettings::with_interval_secs(900).interval().as_secs(), 300);
        assert_eq!(PollerSettings::with_interval_secs(120).interval().as_secs(), 120);
        assert_eq!(PollerSettings::default().interval().as_secs(), 60);
    }

    #[tokio::test(start_paused = true)]
    async fn start_fetches_once_and_enters_warmup() {
        let fetcher = ScriptedFetcher::always(snapshot_with_lines(&["N"]));
        let poller = SharedPoller::start(
            stop_key(),
            fetcher.clone(),
            PollerSettings::with_interval_secs(120),
        )
        .await;

        assert_eq!(fetcher.calls(), 1);
        assert_eq!(poller.phase(), PollerPhase::WarmingUp);
        assert_eq!(poller.current_interval(), Duration::from_secs(60));
        assert_eq!(poller.configured_interval(), Duration::from_secs(120));
        assert!(poller.last_success());
        assert_eq!(poller.snapshot().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn second_tick_uses_warmup_third_uses_configured() {
        let fetcher = ScriptedFetcher::always(snapshot_with_lines(&["N"]));
        let poller = SharedPoller::start(
            stop_key(),
            fetcher.clone(),
            PollerSettings::with_interval_secs(120),
        )
        .await;

        sleep_secs(59).await;
        assert_eq!(fetcher.calls(), 1);

        sleep_secs(2).await;
        assert_eq!(fetcher.calls(), 2);
        assert_eq!(poller.phase(), PollerPhase::Steady);
        assert_eq!(poller.current_interval(), Duration::from_secs(120));

        // third tick at 60 + 120
        sleep_secs(118).await;
        assert_eq!(fetcher.calls(), 2);
        sleep_secs(2).await;
        assert_eq!(fetcher.calls(), 3);

        sleep_secs(120).await;
        assert_eq!(fetcher.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn warmup_applies_even_when_configured_is_shorter() {
        let fetcher = ScriptedFetcher::always(snapshot_with_lines(&["N"]));
        let _poller = SharedPoller::start(
            stop_key(),
            fetcher.clone(),
            PollerSettings::with_interval_secs(30),
        )
        .await;

        sleep_secs(45).await;
        assert_eq!(fetcher.calls(), 1);
        sleep_secs(16).await;
        assert_eq!(fetcher.calls(), 2);
        sleep_secs(30).await;
        assert_eq!(fetcher.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_tick_keeps_snapshot() {
        let fetcher = ScriptedFetcher::scripted(vec![
            Ok(snapshot_with_lines(&["N", "T"])),
            Err(ApplicationError::RateLimited {
                retry_after_secs: None,
            }),
        ]);
        let poller = SharedPoller::start(
            stop_key(),
            fetcher.clone(),
            PollerSettings::with_interval_secs(120),
        )
        .await;
        let before = poller.snapshot().unwrap();

        let updates = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&updates);
        let listener: Arc<dyn PollerListener> = Arc::new(move |u: &PollerUpdate| {
            sink.lock().push((u.last_success, u.snapshot.clone()));
        });
        poller
            .add_listener("observer", Arc::downgrade(&listener))
            .unwrap();

        sleep_secs(61).await;
        assert_eq!(fetcher.calls(), 2);
        assert!(!poller.last_success());
        assert!(poller.last_error().unwrap().contains("Rate limit"));
        assert!(Arc::ptr_eq(&poller.snapshot().unwrap(), &before));

        {
            let seen = updates.lock();
            assert_eq!(seen.len(), 1);
            assert!(!seen[0].0);
            assert_eq!(seen[0].1.as_ref().unwrap().len(), 2);
        }

        // next tick still at the interval set on the failed tick
        sleep_secs(118).await;
        assert_eq!(fetcher.calls(), 2);
        sleep_secs(2).await;
        assert_eq!(fetcher.calls(), 3);
        assert!(poller.last_success());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_initial_fetch_is_not_fatal() {
        let fetcher = ScriptedFetcher::scripted(vec![Err(ApplicationError::TransportFailure(
            "connection refused".into(),
        ))]);
        let poller =
            SharedPoller::start(stop_key(), fetcher.clone(), PollerSettings::default()).await;

        assert!(poller.snapshot().is_none());
        assert!(!poller.last_success());
        assert_eq!(poller.phase(), PollerPhase::WarmingUp);

        sleep_secs(61).await;
        assert!(poller.last_success());
        assert!(poller.snapshot().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn listeners_notified_in_registration_order() {
        let fetcher = ScriptedFetcher::always(snapshot_with_lines(&["N"]));
        let poller =
            SharedPoller::start(stop_key(), fetcher.clone(), PollerSettings::default()).await;

        let order = Arc::new(Mutex::new(Vec::new()));
        let mut keep = Vec::new();
        for name in ["a", "b", "c"] {
            let order = Arc::clone(&order);
            let listener: Arc<dyn PollerListener> = Arc::new(move |_: &PollerUpdate| {
                order.lock().push(name);
            });
            poller.add_listener(name, Arc::downgrade(&listener)).unwrap();
            keep.push(listener);
        }

        sleep_secs(61).await;
        assert_eq!(*order.lock(), vec!["a", "b", "c"]);
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_listener_does_not_starve_others() {
        let fetcher = ScriptedFetcher::always(snapshot_with_lines(&["N"]));
        let poller =
            SharedPoller::start(stop_key(), fetcher.clone(), PollerSettings::default()).await;

        let bad: Arc<dyn PollerListener> = Arc::new(|_: &PollerUpdate| {
            panic!("listener failure");
        });
        let counter = Arc::new(AtomicUsize::new(0));
        let good = counting_listener(&counter);

        poller.add_listener("bad", Arc::downgrade(&bad)).unwrap();
        poller.add_listener("good", Arc::downgrade(&good)).unwrap();

        sleep_secs(61).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        sleep_secs(60).await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(fetcher.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_subscription_is_rejected() {
        let fetcher = ScriptedFetcher::always(snapshot_with_lines(&["N"]));
        let poller =
            SharedPoller::start(stop_key(), fetcher.clone(), PollerSettings::default()).await;

        let counter = Arc::new(AtomicUsize::new(0));
        let first = counting_listener(&counter);
        let second = counting_listener(&counter);

        poller.add_listener("SF_18031_N", Arc::downgrade(&first)).unwrap();
        let err = poller
            .add_listener("SF_18031_N", Arc::downgrade(&second))
            .unwrap_err();
        assert!(matches!(err, ApplicationError::DuplicateSubscription(id) if id == "SF_18031_N"));
        assert_eq!(poller.listener_count(), 1);

        sleep_secs(61).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_listener_is_pruned() {
        let fetcher = ScriptedFetcher::always(snapshot_with_lines(&["N"]));
        let poller =
            SharedPoller::start(stop_key(), fetcher.clone(), PollerSettings::default()).await;

        let counter = Arc::new(AtomicUsize::new(0));
        let listener = counting_listener(&counter);
        poller.add_listener("gone", Arc::downgrade(&listener)).unwrap();
        drop(listener);

        assert_eq!(poller.listener_count(), 0);
        sleep_secs(61).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        // the id is free again
        let again = counting_listener(&counter);
        assert!(poller.add_listener("gone", Arc::downgrade(&again)).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn remove_listener_reports_presence() {
        let fetcher = ScriptedFetcher::always(snapshot_with_lines(&["N"]));
        let poller =
            SharedPoller::start(stop_key(), fetcher.clone(), PollerSettings::default()).await;

        let counter = Arc::new(AtomicUsize::new(0));
        let listener = counting_listener(&counter);
        poller.add_listener("x", Arc::downgrade(&listener)).unwrap();

        assert!(poller.remove_listener("x"));
        assert!(!poller.remove_listener("x"));

        sleep_secs(61).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_idempotent_and_halts_fetching() {
        let fetcher = ScriptedFetcher::always(snapshot_with_lines(&["N"]));
        let poller =
            SharedPoller::start(stop_key(), fetcher.clone(), PollerSettings::default()).await;

        let counter = Arc::new(AtomicUsize::new(0));
        let listener = counting_listener(&counter);
        poller.add_listener("x", Arc::downgrade(&listener)).unwrap();

        poller.stop();
        poller.stop();

        assert!(poller.is_stopped());
        assert_eq!(poller.phase(), PollerPhase::Stopped);
        assert_eq!(poller.listener_count(), 0);

        sleep_secs(600).await;
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        let late = counting_listener(&counter);
        assert!(poller.add_listener("late", Arc::downgrade(&late)).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_poller_cancels_timer() {
        let fetcher = ScriptedFetcher::always(snapshot_with_lines(&["N"]));
        let poller =
            SharedPoller::start(stop_key(), fetcher.clone(), PollerSettings::default()).await;
        drop(poller);

        sleep_secs(600).await;
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn update_carries_key_and_snapshot() {
        let fetcher = ScriptedFetcher::always(snapshot_with_lines(&["N", "5"]));
        let poller =
            SharedPoller::start(stop_key(), fetcher.clone(), PollerSettings::default()).await;

        let seen: Arc<Mutex<Option<PollerUpdate>>> = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let listener: Arc<dyn PollerListener> = Arc::new(move |u: &PollerUpdate| {
            *sink.lock() = Some(u.clone());
        });
        poller.add_listener("x", Arc::downgrade(&listener)).unwrap();

        sleep_secs(61).await;
        let update = seen.lock().clone().unwrap();
        assert_eq!(update.key, stop_key());
        assert!(update.last_success);
        assert!(update.last_error.is_none());
        let lines: Vec<_> = update
            .snapshot
            .unwrap()
            .records
            .iter()
            .map(|r: &TransitRecord| r.line_ref.clone().unwrap())
            .collect();
        assert_eq!(lines, vec!["N", "5"]);
    }

    #[tokio::test(start_paused = true)]
    async fn generation_counts_every_fetch() {
        let fetcher = ScriptedFetcher::scripted(vec![
            Ok(snapshot_with_lines(&["N"])),
            Err(ApplicationError::TransportFailure("reset".into())),
        ]);
        let poller =
            SharedPoller::start(stop_key(), fetcher.clone(), PollerSettings::default()).await;
        assert_eq!(poller.generation(), 1);
        assert_eq!(poller.current_update().generation, 1);

        // a failed fetch still moves the counter
        sleep_secs(61).await;
        assert!(!poller.last_success());
        assert_eq!(poller.generation(), 2);
        assert_eq!(poller.current_update().generation, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_now_fetches_without_touching_schedule() {
        let fetcher = ScriptedFetcher::always(snapshot_with_lines(&["N"]));
        let poller = SharedPoller::start(
            stop_key(),
            fetcher.clone(),
            PollerSettings::with_interval_secs(120),
        )
        .await;

        let counter = Arc::new(AtomicUsize::new(0));
        let listener = counting_listener(&counter);
        poller.add_listener("x", Arc::downgrade(&listener)).unwrap();

        sleep_secs(30).await;
        assert!(poller.refresh_now().await);
        assert_eq!(fetcher.calls(), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(poller.phase(), PollerPhase::WarmingUp);
        assert_eq!(poller.current_interval(), Duration::from_secs(60));

        // the warm-up tick keeps its original deadline
        sleep_secs(31).await;
        assert_eq!(fetcher.calls(), 3);
        assert_eq!(poller.phase(), PollerPhase::Steady);

        poller.stop();
        assert!(!poller.refresh_now().await);
        assert_eq!(fetcher.calls(), 3);
    }
}
