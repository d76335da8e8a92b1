// ── Sync controller ──
//
// Drives one full reconciliation cycle (fetch → detect → lifecycle →
// dispatch) and owns the cross-cycle state machine. At most one cycle
// executes at a time: the mirror-state lock serializes the poll task,
// deferred retries, and manual `refresh_now()` callers, so a request
// arriving mid-cycle queues instead of running concurrently.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::future::join_all;
use tokio::sync::{Mutex, broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use mirrorloop_api::{FetchError, ResourceClient, ResourceKind};

use crate::config::SyncConfig;
use crate::detect::detect;
use crate::dispatch::{TriggerDispatcher, TriggerSink};
use crate::error::CoreError;
use crate::lifecycle::{
    KnownIds, LifecycleManager, LifecycleOutcome, RepresentationFactory, RepresentationRegistry,
};
use crate::model::kinds::descriptor_for;
use crate::model::{
    ChangeEvent, ResourceId, ResourceSnapshot, TriggerSource, normalize_batch, synthesize_child,
};
use crate::optimistic::OptimisticTracker;
use crate::scheduler::PollScheduler;

const TRIGGER_CHANNEL_SIZE: usize = 4;
const EVENT_CHANNEL_SIZE: usize = 256;

// ── SyncState ───────────────────────────────────────────────────────

/// Cross-cycle state machine, observable by consumers.
///
/// `Idle → Fetching → {AuthFailed | Degraded | Ready} → Idle`. After an
/// auth failure the machine parks in `AuthFailed` until the next
/// trigger starts a fresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Fetching,
    Ready,
    Degraded,
    AuthFailed,
}

/// What one completed cycle did, for hosts and logs.
#[derive(Debug, Clone)]
pub struct CycleSummary {
    pub source: TriggerSource,
    pub state: SyncState,
    pub events: usize,
    pub dispatched: usize,
    pub lifecycle: LifecycleOutcome,
    pub degraded_kinds: Vec<ResourceKind>,
}

// ── Mirror state ────────────────────────────────────────────────────

/// Everything that survives between cycles. Owned exclusively by one
/// controller instance — never a module-level singleton.
#[derive(Default)]
struct MirrorState {
    /// Combined snapshot stored by the previous completed cycle.
    previous: HashMap<ResourceId, ResourceSnapshot>,
    /// Last successfully fetched collection per kind, reused verbatim
    /// when a kind fails transiently.
    last_good: HashMap<ResourceKind, Vec<ResourceSnapshot>>,
    known: KnownIds,
    /// Kinds this controller version does not expose. Logged once,
    /// permanently empty afterwards.
    unsupported: HashSet<ResourceKind>,
    /// True once one full cycle has completed; gates the deletion pass.
    baseline_established: bool,
}

// ── SyncController ──────────────────────────────────────────────────

/// The main entry point for hosts.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. Construct with the
/// four collaborators, call [`start()`](Self::start) to run the
/// baseline cycle and spawn the poll task, [`shutdown()`](Self::shutdown)
/// to tear down.
#[derive(Clone)]
pub struct SyncController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: SyncConfig,
    client: Arc<dyn ResourceClient>,
    lifecycle: LifecycleManager,
    dispatcher: TriggerDispatcher,
    scheduler: PollScheduler,
    mirror: Mutex<MirrorState>,
    /// Std mutex: touched from sync contexts (`note_local_mutation`)
    /// and never held across an await.
    optimistic: std::sync::Mutex<OptimisticTracker>,
    sync_state: watch::Sender<SyncState>,
    event_tx: broadcast::Sender<Arc<ChangeEvent>>,
    trigger_rx: Mutex<Option<mpsc::Receiver<TriggerSource>>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl SyncController {
    /// Create a controller from its configuration and collaborators.
    /// Does nothing remote — call [`start()`](Self::start).
    pub fn new(
        config: SyncConfig,
        client: Arc<dyn ResourceClient>,
        registry: Arc<dyn RepresentationRegistry>,
        factory: Arc<dyn RepresentationFactory>,
        sink: Arc<dyn TriggerSink>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let (trigger_tx, trigger_rx) = mpsc::channel(TRIGGER_CHANNEL_SIZE);
        let scheduler = PollScheduler::new(config.clone(), trigger_tx, cancel.child_token());
        let (sync_state, _) = watch::channel(SyncState::Idle);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);

        Self {
            inner: Arc::new(ControllerInner {
                config,
                client,
                lifecycle: LifecycleManager::new(registry, factory),
                dispatcher: TriggerDispatcher::new(sink),
                scheduler,
                mirror: Mutex::new(MirrorState::default()),
                optimistic: std::sync::Mutex::new(OptimisticTracker::new()),
                sync_state,
                event_tx,
                trigger_rx: Mutex::new(Some(trigger_rx)),
                cancel,
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    // ── Engine lifecycle ─────────────────────────────────────────────

    /// Run the baseline reconciliation cycle, then spawn the poll task.
    ///
    /// A failure here (client unusable, auth rejected) aborts startup
    /// with no background work running — the only failure mode that
    /// aborts anything larger than a single cycle.
    pub async fn start(&self) -> Result<(), CoreError> {
        let summary = self.run_cycle(TriggerSource::Scheduled).await?;
        info!(
            events = summary.events,
            created = summary.lifecycle.created,
            adopted = summary.lifecycle.adopted,
            "baseline reconciliation complete"
        );

        let rx = self
            .inner
            .trigger_rx
            .lock()
            .await
            .take()
            .ok_or(CoreError::Stopped)?;
        let ctrl = self.clone();
        let cancel = self.inner.cancel.child_token();
        self.inner
            .task_handles
            .lock()
            .await
            .push(tokio::spawn(poll_task(ctrl, rx, cancel)));
        Ok(())
    }

    /// Cancel background tasks and wait for them to finish.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        let _ = self.inner.sync_state.send(SyncState::Idle);
        debug!("controller shut down");
    }

    // ── Local mutation surface ───────────────────────────────────────

    /// Record a locally-initiated mutation of `id`.
    ///
    /// The expected state becomes visible immediately through
    /// [`effective_enabled`](Self::effective_enabled) and a debounced
    /// reconciliation cycle is scheduled. The next fetch overwrites the
    /// assumption either way — remote wins.
    pub fn note_local_mutation(&self, id: ResourceId, expected_enabled: bool) {
        self.inner
            .optimistic
            .lock()
            .expect("optimistic lock poisoned")
            .assume(id.clone(), expected_enabled, self.inner.config.optimistic_expiry);
        self.inner.scheduler.register_activity(id);
    }

    /// The on/off state consumers should display right now: a pending
    /// local assumption if one exists, the mirrored remote state
    /// otherwise.
    pub async fn effective_enabled(&self, id: &ResourceId) -> Option<bool> {
        let assumed = {
            let tracker = self.inner.optimistic.lock().expect("optimistic lock poisoned");
            tracker.effective(id)
        };
        if assumed.is_some() {
            return assumed;
        }
        self.inner.mirror.lock().await.previous.get(id).and_then(|s| s.enabled)
    }

    // ── State observation ────────────────────────────────────────────

    /// Subscribe to state machine transitions.
    pub fn state(&self) -> watch::Receiver<SyncState> {
        self.inner.sync_state.subscribe()
    }

    /// Subscribe to the change-event rebroadcast stream.
    pub fn events(&self) -> broadcast::Receiver<Arc<ChangeEvent>> {
        self.inner.event_tx.subscribe()
    }

    /// Snapshot of the ids currently represented locally.
    pub async fn known_ids(&self) -> HashSet<ResourceId> {
        self.inner.mirror.lock().await.known.snapshot()
    }

    pub async fn baseline_established(&self) -> bool {
        self.inner.mirror.lock().await.baseline_established
    }

    /// The mirrored snapshot of one resource from the last completed
    /// cycle.
    pub async fn snapshot_of(&self, id: &ResourceId) -> Option<ResourceSnapshot> {
        self.inner.mirror.lock().await.previous.get(id).cloned()
    }

    // ── Reconciliation cycle ─────────────────────────────────────────

    /// Run one full reconciliation cycle immediately.
    ///
    /// Queues behind any in-flight cycle. Errors are cycle-fatal
    /// conditions only (auth, throttle); per-kind transient failures
    /// degrade instead.
    pub async fn refresh_now(&self) -> Result<CycleSummary, CoreError> {
        self.run_cycle(TriggerSource::Scheduled).await
    }

    #[allow(clippy::too_many_lines)]
    async fn run_cycle(&self, source: TriggerSource) -> Result<CycleSummary, CoreError> {
        // Serializes cycles: whoever holds the mirror runs; the rest
        // queue here.
        let mut mirror = self.inner.mirror.lock().await;
        let _ = self.inner.sync_state.send(SyncState::Fetching);
        let dirty = self.inner.scheduler.take_dirty();
        if !dirty.is_empty() {
            debug!(dirty = dirty.len(), %source, "cycle covers local mutation burst");
        }

        // ── Fetch ────────────────────────────────────────────────────
        // Kinds already marked unsupported stay permanently empty and
        // are not asked for again.
        let fetches = join_all(
            ResourceKind::FETCHED
                .iter()
                .filter(|kind| !mirror.unsupported.contains(*kind))
                .map(|&kind| {
                    let client = Arc::clone(&self.inner.client);
                    async move { (kind, client.fetch(kind).await) }
                }),
        )
        .await;

        // Cycle-fatal conditions first, before any state is touched:
        // the previous snapshot stays intact and the drained dirty ids
        // go back so the interrupted burst is still covered.
        for (_, result) in &fetches {
            match result {
                Err(e) if e.is_auth() => {
                    warn!(error = %e, "auth failure — suspending cycle and requesting renewal");
                    self.inner.scheduler.requeue_dirty(dirty);
                    let _ = self.inner.sync_state.send(SyncState::AuthFailed);
                    if let Err(renew) = self.inner.client.renew_session().await {
                        warn!(error = %renew, "session renewal failed");
                    }
                    return Err(CoreError::AuthenticationFailed { message: e.to_string() });
                }
                Err(FetchError::Throttled { retry_after_secs }) => {
                    self.inner.scheduler.requeue_dirty(dirty);
                    self.inner
                        .scheduler
                        .defer(Duration::from_secs(*retry_after_secs), source);
                    let _ = self.inner.sync_state.send(SyncState::Idle);
                    return Err(CoreError::Throttled {
                        retry_after_secs: *retry_after_secs,
                    });
                }
                _ => {}
            }
        }

        // ── Validate / normalize ─────────────────────────────────────
        let mut current: HashMap<ResourceId, ResourceSnapshot> = HashMap::new();
        let mut degraded_kinds: Vec<ResourceKind> = Vec::new();

        for (kind, result) in fetches {
            let snapshots = match result {
                Ok(records) => {
                    let snaps = normalize_batch(kind, records);
                    mirror.last_good.insert(kind, snaps.clone());
                    snaps
                }
                Err(FetchError::Unsupported { .. }) => {
                    if mirror.unsupported.insert(kind) {
                        debug!(%kind, "resource type not supported by this controller");
                    }
                    mirror.last_good.insert(kind, Vec::new());
                    Vec::new()
                }
                Err(e) => {
                    // Transient: reuse the previous good collection so
                    // none of this kind's resources look deleted.
                    warn!(%kind, error = %e, "fetch failed — keeping previous snapshot");
                    degraded_kinds.push(kind);
                    mirror.last_good.get(&kind).cloned().unwrap_or_default()
                }
            };

            for snapshot in snapshots {
                if let Some(clash) = current.insert(snapshot.id.clone(), snapshot) {
                    warn!(id = %clash.id, kind = %clash.kind, "duplicate id across resource types — keeping latest");
                }
            }
        }

        // ── Companion children ───────────────────────────────────────
        let children: Vec<ResourceSnapshot> = current
            .values()
            .filter_map(|parent| {
                let child_desc = descriptor_for(parent.kind)?.child?;
                synthesize_child(parent, &child_desc)
            })
            .collect();
        for child in children {
            current.insert(child.id.clone(), child);
        }

        // ── Optimistic collapse (remote wins) ────────────────────────
        {
            let mut tracker = self.inner.optimistic.lock().expect("optimistic lock poisoned");
            tracker.sweep(Instant::now());
            for (id, snapshot) in &current {
                if let Some(enabled) = snapshot.enabled {
                    tracker.observe(id, enabled);
                }
            }
            for id in mirror.previous.keys() {
                if !current.contains_key(id) {
                    tracker.forget(id);
                }
            }
            if !tracker.has_pending() {
                self.inner.scheduler.mark_confirmed();
            }
        }

        // ── Detect ───────────────────────────────────────────────────
        let events = detect(&mirror.previous, &current, Utc::now(), source);

        // ── Lifecycle: discovery, then deletion ──────────────────────
        let mut lifecycle = self.inner.lifecycle.discover(&mut mirror.known, &current).await;

        if mirror.baseline_established {
            let current_ids: HashSet<ResourceId> = current.keys().cloned().collect();
            let kind_of: HashMap<ResourceId, ResourceKind> = mirror
                .previous
                .iter()
                .chain(current.iter())
                .map(|(id, snap)| (id.clone(), snap.kind))
                .collect();
            let removal = self
                .inner
                .lifecycle
                .remove_stale(&mut mirror.known, &current_ids, &kind_of)
                .await;
            lifecycle.removed = removal.removed;
            lifecycle.failed += removal.failed;
        }

        // ── Dispatch ─────────────────────────────────────────────────
        let dispatched = self.inner.dispatcher.dispatch_all(&events).await;
        for event in &events {
            let _ = self.inner.event_tx.send(Arc::new(event.clone()));
        }

        // ── Commit ───────────────────────────────────────────────────
        mirror.previous = current;
        mirror.baseline_established = true;

        let state = if degraded_kinds.is_empty() {
            SyncState::Ready
        } else {
            SyncState::Degraded
        };
        let _ = self.inner.sync_state.send(state);
        let _ = self.inner.sync_state.send(SyncState::Idle);

        debug!(
            events = events.len(),
            dispatched,
            created = lifecycle.created,
            adopted = lifecycle.adopted,
            removed = lifecycle.removed,
            degraded = degraded_kinds.len(),
            "reconciliation cycle complete"
        );

        Ok(CycleSummary {
            source,
            state,
            events: events.len(),
            dispatched,
            lifecycle,
            degraded_kinds,
        })
    }
}

// ── Background poll task ────────────────────────────────────────────

/// Single-flow cycle driver: debounced triggers and the periodic
/// cadence share one loop, so cycles never overlap. The sleep arm is
/// recomputed every iteration from the scheduler's current tier, and
/// the baseline tier guarantees it always eventually fires.
async fn poll_task(
    controller: SyncController,
    mut trigger_rx: mpsc::Receiver<TriggerSource>,
    cancel: CancellationToken,
) {
    loop {
        let interval = controller.inner.scheduler.current_interval();
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            trigger = trigger_rx.recv() => {
                let Some(source) = trigger else { break };
                if let Err(e) = controller.run_cycle(source).await {
                    warn!(error = %e, "triggered reconciliation failed");
                }
            }
            () = tokio::time::sleep(interval) => {
                if let Err(e) = controller.run_cycle(TriggerSource::Scheduled).await {
                    warn!(error = %e, "scheduled reconciliation failed");
                }
            }
        }
    }
}
