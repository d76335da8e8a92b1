// ── Dynamic poll scheduling ──
//
// Owns the refresh cadence: a baseline periodic tier, an accelerated
// tier while local activity is recent, a realtime tier while a local
// mutation awaits remote confirmation, and a debounced coalescing
// timer for locally-initiated mutation bursts.
//
// `register_activity` is always safe to call, including mid-cycle: it
// only touches a std-mutex bookkeeping block and never blocks on the
// cycle itself. The pending debounce timer is the single cancellable
// construct — cancel-and-replace on every re-arm, with accumulated
// dirty ids surviving every cancellation.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::SyncConfig;
use crate::model::{ResourceId, TriggerSource};

/// Scheduling bookkeeping for one controller instance.
#[derive(Debug, Default)]
struct PollState {
    last_activity_at: Option<Instant>,
    dirty: HashSet<ResourceId>,
    /// Set on activity, cleared once no optimistic assumption remains
    /// unconfirmed. Selects the realtime tier.
    awaiting_confirmation: bool,
    /// Pending debounce timer — cancelled outright when re-armed.
    debounce: Option<CancellationToken>,
}

/// Owns the refresh cadence and the debounce coalescing timer.
///
/// Cycle requests go out on a bounded channel the orchestration loop
/// drains; a request arriving while a cycle is in flight queues there
/// rather than running concurrently.
pub struct PollScheduler {
    config: SyncConfig,
    trigger_tx: mpsc::Sender<TriggerSource>,
    /// Parent for every timer token, so engine shutdown reaps pending
    /// timers.
    cancel: CancellationToken,
    state: Mutex<PollState>,
}

impl PollScheduler {
    pub fn new(
        config: SyncConfig,
        trigger_tx: mpsc::Sender<TriggerSource>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            trigger_tx,
            cancel,
            state: Mutex::new(PollState::default()),
        }
    }

    /// Record that a local mutation touched `id`.
    ///
    /// Non-blocking. Resets the debounce countdown to the full window
    /// and accumulates `id` into the dirty set — ids are never lost
    /// across resets. Must be called from within a tokio runtime (the
    /// replacement timer is a spawned task).
    pub fn register_activity(&self, id: ResourceId) {
        let token = self.cancel.child_token();
        {
            let mut state = self.state.lock().expect("poll state lock poisoned");
            state.dirty.insert(id);
            state.last_activity_at = Some(Instant::now());
            state.awaiting_confirmation = true;
            if let Some(previous) = state.debounce.replace(token.clone()) {
                previous.cancel();
            }
        }
        self.arm_debounce(token);
    }

    /// One of the three configured intervals, selected by elapsed time
    /// since the last activity. Both accelerated tiers step down to
    /// `base` once `activity_timeout` has passed.
    pub fn current_interval(&self) -> Duration {
        let state = self.state.lock().expect("poll state lock poisoned");
        let recent = state
            .last_activity_at
            .is_some_and(|t| t.elapsed() <= self.config.activity_timeout);
        if recent && state.awaiting_confirmation {
            self.config.realtime_interval
        } else if recent {
            self.config.active_interval
        } else {
            self.config.base_interval
        }
    }

    /// Drain the accumulated dirty ids at cycle start.
    pub fn take_dirty(&self) -> HashSet<ResourceId> {
        let mut state = self.state.lock().expect("poll state lock poisoned");
        std::mem::take(&mut state.dirty)
    }

    /// Restore drained ids after a cycle that could not complete, so
    /// the interrupted activity burst is still covered next time.
    pub fn requeue_dirty(&self, ids: HashSet<ResourceId>) {
        let mut state = self.state.lock().expect("poll state lock poisoned");
        state.dirty.extend(ids);
    }

    /// Called once no optimistic assumption remains unconfirmed; the
    /// realtime tier steps down to `active`.
    pub fn mark_confirmed(&self) {
        let mut state = self.state.lock().expect("poll state lock poisoned");
        state.awaiting_confirmation = false;
    }

    /// Reschedule a throttled cycle at the earliest permitted time
    /// rather than dropping it.
    pub fn defer(&self, delay: Duration, source: TriggerSource) {
        let tx = self.trigger_tx.clone();
        let cancel = self.cancel.clone();
        debug!(delay_secs = delay.as_secs(), "cycle throttled — deferring");
        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    let _ = tx.try_send(source);
                }
            }
        });
    }

    /// Arm the replacement debounce timer. If it fires un-cancelled,
    /// exactly one cycle request goes out.
    fn arm_debounce(&self, token: CancellationToken) {
        let window = self.config.debounce_window;
        let tx = self.trigger_tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = token.cancelled() => {}
                () = tokio::time::sleep(window) => {
                    // A full channel means a cycle request is already
                    // queued; the dirty ids stay put until a cycle
                    // drains them, so nothing is lost.
                    if tx.try_send(TriggerSource::Activity).is_err() {
                        debug!("debounce fired with a cycle already queued — coalesced");
                    }
                }
            }
        });
    }
}
