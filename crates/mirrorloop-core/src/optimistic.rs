// ── Optimistic assumed-state tracking ──
//
// A local mutation assumes its outcome immediately so consumers see the
// toggle flip without waiting for the next fetch. The assumption lives
// until the remote confirms it (remote always wins) or until it
// expires, at which point the last confirmed value is restored.

use std::collections::HashMap;

use tokio::time::{Duration, Instant};
use tracing::debug;

use crate::model::ResourceId;

/// Per-id assumed-state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssumedState {
    /// Value observed from the remote controller.
    Confirmed(bool),
    /// Locally assumed value pending remote confirmation.
    Optimistic {
        value: bool,
        /// Last confirmed value, restored on expiry.
        prior: Option<bool>,
        expires_at: Instant,
    },
}

/// Tracks optimistic assumptions for every id with local activity.
///
/// Owned by one controller instance; all access goes through the
/// orchestration cycle, so no interior locking here.
#[derive(Debug, Default)]
pub struct OptimisticTracker {
    states: HashMap<ResourceId, AssumedState>,
}

impl OptimisticTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a locally-assumed value for `id`, expiring after `ttl`.
    ///
    /// A second assumption for the same id replaces the first but keeps
    /// the original confirmed fallback: only the net state observed at
    /// fetch time is ever reported.
    pub fn assume(&mut self, id: ResourceId, value: bool, ttl: Duration) {
        let prior = match self.states.get(&id) {
            Some(AssumedState::Confirmed(v)) => Some(*v),
            Some(AssumedState::Optimistic { prior, .. }) => *prior,
            None => None,
        };
        self.states.insert(
            id,
            AssumedState::Optimistic {
                value,
                prior,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Collapse to the fetched value. Remote always wins, whether or
    /// not it matches the assumption.
    pub fn observe(&mut self, id: &ResourceId, value: bool) {
        self.states.insert(id.clone(), AssumedState::Confirmed(value));
    }

    /// An id that disappeared from the remote has nothing to confirm.
    pub fn forget(&mut self, id: &ResourceId) {
        self.states.remove(id);
    }

    /// Revert assumptions whose expiry elapsed without a confirming
    /// fetch. Returns the ids that reverted.
    pub fn sweep(&mut self, now: Instant) -> Vec<ResourceId> {
        let mut reverted = Vec::new();
        for (id, state) in &mut self.states {
            if let AssumedState::Optimistic { prior, expires_at, .. } = state {
                if *expires_at <= now {
                    debug!(id = %id, "optimistic assumption expired — reverting");
                    reverted.push(id.clone());
                    *state = match prior {
                        Some(v) => AssumedState::Confirmed(*v),
                        None => AssumedState::Confirmed(false),
                    };
                }
            }
        }
        reverted
    }

    /// The value consumers should see right now: the assumption while
    /// it is pending, the confirmed value otherwise.
    pub fn effective(&self, id: &ResourceId) -> Option<bool> {
        match self.states.get(id)? {
            AssumedState::Confirmed(v) => Some(*v),
            AssumedState::Optimistic { value, .. } => Some(*value),
        }
    }

    /// Whether any assumption is still awaiting remote confirmation.
    /// Drives the scheduler's realtime tier.
    pub fn has_pending(&self) -> bool {
        self.states
            .values()
            .any(|s| matches!(s, AssumedState::Optimistic { .. }))
    }
}
