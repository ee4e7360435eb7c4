//! Listener lifecycle shared by document and collection stores.
//!
//! A store is `Idle` until its first subscriber arrives. Activation moves it
//! to `Pending`, starts the timeout and attaches the realtime listener. The
//! first snapshot (or the timeout) moves it to `Live`. Losing the last
//! subscriber, or `once` mode after the first snapshot, moves it to `Closed`;
//! a later subscriber activates it again.
//!
//! Every activation gets a fresh epoch. Snapshot, error and timer callbacks
//! carry the epoch they were created for and are dropped when it no longer
//! matches or the store is closed, so nothing is published after teardown.
//!
//! Updates are queued in the order their states replace each other and a
//! single caller at a time drains the queue, so subscribers observe states in
//! the same order as `get()` does, even when snapshots race on several threads.

use std::collections::VecDeque;
use std::fmt::Debug;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use futures::future::{abortable, AbortHandle};

use crate::firestore::{FirestoreError, ListenerRegistration};
use crate::performance::{Performance, TraceHandle};
use crate::platform::runtime;
use crate::stores::error::{listener_failed, timeout, StoreError};
use crate::util::{NextFn, SubscriberSet, Unsubscribe};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorePhase {
    Idle,
    Pending,
    Live,
    Closed,
}

/// Immutable view of a store, replaced as a whole on every update.
#[derive(Clone, Debug, PartialEq)]
pub struct StoreState<V, M> {
    pub value: Option<V>,
    pub loading: bool,
    pub error: Option<StoreError>,
    pub meta: M,
}

pub(crate) type ListenFn<V, M> =
    Box<dyn Fn(SnapshotSink<V, M>) -> ListenerRegistration + Send + Sync + 'static>;

pub(crate) struct CoreConfig<V, M> {
    pub label: String,
    pub max_wait: Duration,
    pub once: bool,
    pub log: bool,
    /// Published instead of an absent value until a snapshot has been processed.
    pub fallback: Option<V>,
    /// Published when there is nothing else to show (absent data, listener error).
    pub vacant: Option<V>,
    pub derive_meta: fn(Option<&V>) -> M,
    pub trace: Option<TraceHandle>,
}

pub(crate) struct StoreCore<V, M> {
    label: String,
    max_wait: Duration,
    once: bool,
    log: bool,
    fallback: Option<V>,
    vacant: Option<V>,
    derive_meta: fn(Option<&V>) -> M,
    listen: ListenFn<V, M>,
    state: Mutex<Arc<StoreState<V, M>>>,
    control: Mutex<Control>,
    delivery: Mutex<Delivery<V>>,
    subscribers: SubscriberSet<Option<V>>,
}

struct Delivery<V> {
    queue: VecDeque<Option<V>>,
    draining: bool,
}

struct Control {
    phase: StorePhase,
    epoch: u64,
    /// Set once a real snapshot has been processed; timeouts and errors do not count.
    snapshot_seen: bool,
    registration: Option<ListenerRegistration>,
    timer: Option<AbortHandle>,
    trace: Option<TraceHandle>,
}

/// Hands snapshot and error callbacks back to the store that opened the listener.
pub(crate) struct SnapshotSink<V, M> {
    core: Weak<StoreCore<V, M>>,
    epoch: u64,
}

impl<V, M> Clone for SnapshotSink<V, M> {
    fn clone(&self) -> Self {
        Self {
            core: Weak::clone(&self.core),
            epoch: self.epoch,
        }
    }
}

impl<V, M> SnapshotSink<V, M>
where
    V: Clone + Debug + Send + Sync + 'static,
    M: Clone + Send + Sync + 'static,
{
    /// `None` means the target holds no data (missing document, empty result).
    pub(crate) fn next(&self, value: Option<V>) {
        if let Some(core) = self.core.upgrade() {
            core.on_snapshot(self.epoch, value);
        }
    }

    pub(crate) fn fail(&self, error: FirestoreError) {
        if let Some(core) = self.core.upgrade() {
            core.on_listener_error(self.epoch, error);
        }
    }
}

impl<V, M> StoreCore<V, M>
where
    V: Clone + Debug + Send + Sync + 'static,
    M: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(config: CoreConfig<V, M>, listen: ListenFn<V, M>) -> Arc<Self> {
        let meta = (config.derive_meta)(None);
        Arc::new(Self {
            label: config.label,
            max_wait: config.max_wait,
            once: config.once,
            log: config.log,
            fallback: config.fallback,
            vacant: config.vacant,
            derive_meta: config.derive_meta,
            listen,
            state: Mutex::new(Arc::new(StoreState {
                value: None,
                loading: true,
                error: None,
                meta,
            })),
            control: Mutex::new(Control {
                phase: StorePhase::Idle,
                epoch: 0,
                snapshot_seen: false,
                registration: None,
                timer: None,
                trace: config.trace,
            }),
            delivery: Mutex::new(Delivery {
                queue: VecDeque::new(),
                draining: false,
            }),
            subscribers: SubscriberSet::new(),
        })
    }

    pub(crate) fn state(&self) -> Arc<StoreState<V, M>> {
        Arc::clone(&self.state.lock().unwrap())
    }

    pub(crate) fn phase(&self) -> StorePhase {
        self.control.lock().unwrap().phase
    }

    /// Registers `run`, activating the store for the first subscriber.
    ///
    /// `run` is called right away with the current value and again after
    /// every update until the returned closure is called.
    pub(crate) fn subscribe(self: &Arc<Self>, run: NextFn<Option<V>>) -> Unsubscribe {
        let (id, count) = self.subscribers.add(Arc::clone(&run));
        let current = self.state().value.clone();
        run(&current);

        if count == 1 {
            self.activate();
        }

        let core = Arc::clone(self);
        Box::new(move || {
            if core.subscribers.remove(id) == Some(0) {
                core.deactivate();
            }
        })
    }

    fn activate(self: &Arc<Self>) {
        let epoch = {
            let mut control = self.control.lock().unwrap();
            control.epoch += 1;
            control.phase = StorePhase::Pending;
            control.epoch
        };
        log::debug!("{}: attaching listener (activation {epoch})", self.label);

        if !self.max_wait.is_zero() {
            let timer = self.start_timer(epoch);
            let mut control = self.control.lock().unwrap();
            if control.epoch == epoch && control.phase == StorePhase::Pending {
                control.timer = Some(timer);
            } else {
                timer.abort();
            }
        }

        let registration = (self.listen)(SnapshotSink {
            core: Arc::downgrade(self),
            epoch,
        });

        let mut control = self.control.lock().unwrap();
        if control.epoch == epoch && control.phase != StorePhase::Closed {
            control.registration = Some(registration);
        } else {
            // `once` already fired from inside the listen call, or the last
            // subscriber left while it ran.
            drop(control);
            log::debug!("{}: store closed while attaching", self.label);
            registration.detach();
        }
    }

    fn start_timer(self: &Arc<Self>, epoch: u64) -> AbortHandle {
        let core = Arc::downgrade(self);
        let max_wait = self.max_wait;
        let (timer, handle) = abortable(async move {
            runtime::sleep(max_wait).await;
            if let Some(core) = core.upgrade() {
                core.on_timeout(epoch);
            }
        });
        runtime::spawn_detached(async move {
            let _ = timer.await;
        });
        handle
    }

    fn deactivate(&self) {
        let (registration, timer) = {
            let mut control = self.control.lock().unwrap();
            control.epoch += 1;
            control.phase = StorePhase::Closed;
            (control.registration.take(), control.timer.take())
        };
        if let Some(timer) = timer {
            timer.abort();
        }
        if let Some(registration) = registration {
            log::debug!("{}: detaching listener", self.label);
            registration.detach();
        }
    }

    fn on_snapshot(&self, epoch: u64, value: Option<V>) {
        let (value, registration, trace) = {
            let mut control = self.control.lock().unwrap();
            if !Self::accepts(&control, epoch) {
                log::debug!("{}: dropping snapshot from a closed listener", self.label);
                return;
            }
            let value = self.resolve(&control, value);
            control.snapshot_seen = true;
            let trace = Self::settle(&mut control);
            self.replace_state(value.clone(), None);

            let registration = if self.once {
                control.phase = StorePhase::Closed;
                control.registration.take()
            } else {
                None
            };
            (value, registration, trace)
        };

        if self.log {
            log::info!("{}: fetched {:?}", self.label, value);
        }
        self.finish_trace(trace);
        if let Some(registration) = registration {
            log::debug!("{}: first value received, detaching (once)", self.label);
            registration.detach();
        }
        self.drain();
    }

    fn on_timeout(&self, epoch: u64) {
        let (error, trace) = {
            let mut control = self.control.lock().unwrap();
            if control.epoch != epoch || control.phase != StorePhase::Pending {
                return;
            }
            let value = self.resolve(&control, None);
            let trace = Self::settle(&mut control);
            let error = timeout(self.max_wait);
            self.replace_state(value, Some(error.clone()));
            (error, trace)
        };

        if self.log {
            log::info!("{}: {error}", self.label);
        }
        self.finish_trace(trace);
        self.drain();
    }

    fn on_listener_error(&self, epoch: u64, error: FirestoreError) {
        let trace = {
            let mut control = self.control.lock().unwrap();
            if !Self::accepts(&control, epoch) {
                return;
            }
            log::error!("{}: {error}", self.label);
            let trace = Self::settle(&mut control);
            self.replace_state(self.vacant.clone(), Some(listener_failed(error)));
            trace
        };

        self.finish_trace(trace);
        self.drain();
    }

    fn accepts(control: &Control, epoch: u64) -> bool {
        control.epoch == epoch
            && matches!(control.phase, StorePhase::Pending | StorePhase::Live)
    }

    fn resolve(&self, control: &Control, value: Option<V>) -> Option<V> {
        value
            .or_else(|| {
                if control.snapshot_seen {
                    None
                } else {
                    self.fallback.clone()
                }
            })
            .or_else(|| self.vacant.clone())
    }

    /// Marks the current activation as having produced a value.
    fn settle(control: &mut Control) -> Option<TraceHandle> {
        control.phase = StorePhase::Live;
        if let Some(timer) = control.timer.take() {
            timer.abort();
        }
        control.trace.take()
    }

    /// Swaps in the new state and queues it for subscribers. Called with
    /// `control` held so queue order matches replacement order.
    fn replace_state(&self, value: Option<V>, error: Option<StoreError>) {
        let meta = (self.derive_meta)(value.as_ref());
        *self.state.lock().unwrap() = Arc::new(StoreState {
            value: value.clone(),
            loading: false,
            error,
            meta,
        });
        self.delivery.lock().unwrap().queue.push_back(value);
    }

    /// Notifies subscribers of queued values unless another caller is
    /// already doing so; that caller picks up whatever was queued here.
    fn drain(&self) {
        {
            let mut delivery = self.delivery.lock().unwrap();
            if delivery.draining {
                return;
            }
            delivery.draining = true;
        }
        loop {
            let next = {
                let mut delivery = self.delivery.lock().unwrap();
                match delivery.queue.pop_front() {
                    Some(value) => value,
                    None => {
                        delivery.draining = false;
                        return;
                    }
                }
            };
            self.subscribers.notify(&next);
        }
    }

    fn finish_trace(&self, trace: Option<TraceHandle>) {
        if let Some(trace) = trace {
            let recorded = trace.stop();
            log::debug!(
                "{}: trace {} finished after {:?}",
                self.label,
                recorded.name,
                recorded.duration
            );
        }
    }
}

/// Starts the trace named `trace_id` when both a recorder and an id are given.
pub(crate) fn start_trace(
    performance: Option<&Performance>,
    trace_id: Option<&str>,
    label: &str,
) -> Option<TraceHandle> {
    let trace_id = trace_id?;
    let Some(performance) = performance else {
        log::debug!("{label}: no performance recorder, trace {trace_id} skipped");
        return None;
    };
    match performance.new_trace(trace_id) {
        Ok(trace) => Some(trace),
        Err(err) => {
            log::warn!("{label}: continuing untraced: {err}");
            None
        }
    }
}

impl<V, M> Drop for StoreCore<V, M> {
    fn drop(&mut self) {
        if let Ok(control) = self.control.get_mut() {
            if let Some(timer) = control.timer.take() {
                timer.abort();
            }
        }
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use crate::firestore::Firestore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::sleep;

    type Captured = Arc<Mutex<Vec<Option<u32>>>>;

    /// Core whose listener never delivers; snapshots are pushed through the
    /// sinks collected in the returned vector.
    fn manual_core(
        max_wait: Duration,
        once: bool,
    ) -> (
        Arc<StoreCore<u32, usize>>,
        Arc<Mutex<Vec<SnapshotSink<u32, usize>>>>,
        Firestore,
    ) {
        let firestore = Firestore::new();
        let sinks: Arc<Mutex<Vec<SnapshotSink<u32, usize>>>> = Arc::new(Mutex::new(Vec::new()));
        let collected = sinks.clone();
        let reference = firestore.doc("manual/target").unwrap();
        let core = StoreCore::new(
            CoreConfig {
                label: "manual/target".into(),
                max_wait,
                once,
                log: false,
                fallback: Some(7),
                vacant: None,
                derive_meta: |value| value.map(|v| *v as usize).unwrap_or_default(),
                trace: None,
            },
            Box::new(move |sink: SnapshotSink<u32, usize>| {
                collected.lock().unwrap().push(sink);
                reference.on_snapshot(|_| {}, |_| {})
            }),
        );
        (core, sinks, firestore)
    }

    fn capture(core: &Arc<StoreCore<u32, usize>>) -> (Captured, Unsubscribe) {
        let seen: Captured = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        let unsubscribe = core.subscribe(Arc::new(move |value: &Option<u32>| {
            log.lock().unwrap().push(*value)
        }));
        (seen, unsubscribe)
    }

    #[tokio::test]
    async fn fallback_applies_only_before_first_emission() {
        let (core, sinks, _firestore) = manual_core(Duration::ZERO, false);
        assert_eq!(core.phase(), StorePhase::Idle);
        let (seen, _unsubscribe) = capture(&core);
        assert_eq!(core.phase(), StorePhase::Pending);

        let sink = sinks.lock().unwrap()[0].clone();
        sink.next(None);
        sink.next(Some(3));
        sink.next(None);

        assert_eq!(
            seen.lock().unwrap().as_slice(),
            &[None, Some(7), Some(3), None]
        );
        assert_eq!(core.state().meta, 0);
        assert_eq!(core.phase(), StorePhase::Live);
    }

    #[tokio::test]
    async fn absent_first_snapshot_after_timeout_keeps_the_fallback() {
        let (core, sinks, _firestore) = manual_core(Duration::from_millis(5), false);
        let (seen, _unsubscribe) = capture(&core);

        sleep(Duration::from_millis(30)).await;
        assert!(core.state().error.as_ref().is_some_and(StoreError::is_timeout));
        assert_eq!(core.state().value, Some(7));

        let sink = sinks.lock().unwrap()[0].clone();
        sink.next(None);
        assert_eq!(core.state().value, Some(7));
        assert!(core.state().error.is_none());

        sink.next(None);
        assert_eq!(
            seen.lock().unwrap().as_slice(),
            &[None, Some(7), Some(7), None]
        );
    }

    #[tokio::test]
    async fn late_timer_never_overrides_a_snapshot() {
        let (core, sinks, _firestore) = manual_core(Duration::from_millis(5), false);
        let (seen, _unsubscribe) = capture(&core);

        sinks.lock().unwrap()[0].next(Some(1));
        sleep(Duration::from_millis(30)).await;

        let state = core.state();
        assert_eq!(state.value, Some(1));
        assert!(state.error.is_none());
        assert_eq!(seen.lock().unwrap().as_slice(), &[None, Some(1)]);
    }

    #[tokio::test]
    async fn stale_epoch_callbacks_are_dropped() {
        let (core, sinks, firestore) = manual_core(Duration::ZERO, false);
        let (seen, unsubscribe) = capture(&core);
        unsubscribe();
        assert_eq!(core.phase(), StorePhase::Closed);
        assert_eq!(firestore.listener_count(), 0);

        sinks.lock().unwrap()[0].next(Some(9));
        assert_eq!(seen.lock().unwrap().as_slice(), &[None]);

        let (_again, _unsubscribe) = capture(&core);
        assert_eq!(sinks.lock().unwrap().len(), 2);
        assert_eq!(firestore.listener_count(), 1);
        sinks.lock().unwrap()[0].next(Some(9));
        assert_eq!(core.state().value, None);
    }

    #[tokio::test]
    async fn once_detaches_even_when_delivered_during_listen() {
        let firestore = Firestore::new();
        let reference = firestore.doc("sync/target").unwrap();
        let listens = Arc::new(AtomicUsize::new(0));
        let counter = listens.clone();
        let core: Arc<StoreCore<u32, ()>> = StoreCore::new(
            CoreConfig {
                label: "sync/target".into(),
                max_wait: Duration::ZERO,
                once: true,
                log: false,
                fallback: None,
                vacant: None,
                derive_meta: |_| (),
                trace: None,
            },
            Box::new(move |sink: SnapshotSink<u32, ()>| {
                counter.fetch_add(1, Ordering::SeqCst);
                sink.next(Some(5));
                reference.on_snapshot(|_| {}, |_| {})
            }),
        );

        let seen: Arc<Mutex<Vec<Option<u32>>>> = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        let _unsubscribe = core.subscribe(Arc::new(move |value: &Option<u32>| {
            log.lock().unwrap().push(*value)
        }));
        assert_eq!(seen.lock().unwrap().as_slice(), &[None, Some(5)]);
        assert_eq!(core.state().value, Some(5));
        assert_eq!(core.phase(), StorePhase::Closed);
        assert_eq!(firestore.listener_count(), 0);
        assert_eq!(listens.load(Ordering::SeqCst), 1);
    }
}
