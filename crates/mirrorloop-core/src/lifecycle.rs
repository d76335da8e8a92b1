// ── Resource lifecycle management ──
//
// Discovery, idempotent adoption, and stale removal of locally
// registered representations. The known-identifier set lives here in
// spirit but is owned by the controller's mirror state — nothing else
// in the engine mutates it.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::kinds::descriptor_for;
use crate::model::{ResourceId, ResourceKind, ResourceSnapshot};

/// Registry namespace this engine registers representations under.
pub const PLATFORM: &str = "mirrorloop";

// ── KnownIds ────────────────────────────────────────────────────────

/// The set of resource ids currently represented locally.
///
/// Grows on successful discovery or adoption, shrinks only after the
/// deletion pass confirms an id is gone. Mutated exclusively by the
/// lifecycle manager.
#[derive(Debug, Default, Clone)]
pub struct KnownIds(HashSet<ResourceId>);

impl KnownIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &ResourceId) -> bool {
        self.0.contains(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Snapshot copy, for introspection and the deletion pass.
    pub fn snapshot(&self) -> HashSet<ResourceId> {
        self.0.clone()
    }

    fn absorb(&mut self, id: ResourceId) {
        self.0.insert(id);
    }

    fn drop_id(&mut self, id: &ResourceId) {
        self.0.remove(id);
    }
}

// ── Host collaborator contracts ─────────────────────────────────────

/// Opaque handle to a registered representation, as issued by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepresentationHandle(pub String);

impl fmt::Display for RepresentationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The host's registry of existing representations.
///
/// `lookup` drives idempotent adoption: a hit means a representation
/// for this id already exists (typically from before a process
/// restart) and must be absorbed rather than duplicated.
#[async_trait]
pub trait RepresentationRegistry: Send + Sync {
    async fn lookup(
        &self,
        domain: &str,
        platform: &str,
        id: &ResourceId,
    ) -> Option<RepresentationHandle>;

    async fn remove(
        &self,
        domain: &str,
        platform: &str,
        id: &ResourceId,
    ) -> Result<(), CoreError>;
}

/// Constructs and tears down local representations.
#[async_trait]
pub trait RepresentationFactory: Send + Sync {
    async fn construct(
        &self,
        kind: ResourceKind,
        snapshot: &ResourceSnapshot,
    ) -> Result<RepresentationHandle, CoreError>;

    async fn destroy(&self, kind: ResourceKind, id: &ResourceId) -> Result<(), CoreError>;
}

// ── LifecycleManager ────────────────────────────────────────────────

/// Per-cycle outcome counts, for the cycle summary and logs.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleOutcome {
    pub created: usize,
    pub adopted: usize,
    pub removed: usize,
    pub failed: usize,
}

/// Discovers new resources, adopts pre-existing representations, and
/// removes stale ones.
pub struct LifecycleManager {
    registry: Arc<dyn RepresentationRegistry>,
    factory: Arc<dyn RepresentationFactory>,
}

impl LifecycleManager {
    pub fn new(
        registry: Arc<dyn RepresentationRegistry>,
        factory: Arc<dyn RepresentationFactory>,
    ) -> Self {
        Self { registry, factory }
    }

    /// Discovery pass over the combined current snapshot.
    ///
    /// For every snapshot not yet known: a registry hit adopts the
    /// existing representation (no duplicate construction — the
    /// restart-recovery and conflict-resolution path); a miss queues
    /// the snapshot, and the whole queue is constructed after the
    /// scan. A failure for one id is logged and retried next cycle
    /// without aborting the rest of the batch.
    pub async fn discover(
        &self,
        known: &mut KnownIds,
        current: &HashMap<ResourceId, ResourceSnapshot>,
    ) -> LifecycleOutcome {
        let mut outcome = LifecycleOutcome::default();
        let mut pending: Vec<&ResourceSnapshot> = Vec::new();

        for snapshot in current.values() {
            if known.contains(&snapshot.id) {
                continue;
            }
            let Some(desc) = descriptor_for(snapshot.kind) else {
                warn!(kind = %snapshot.kind, "no kind registration — skipping discovery");
                continue;
            };

            match self.registry.lookup(desc.domain, PLATFORM, &snapshot.id).await {
                Some(handle) => {
                    debug!(id = %snapshot.id, %handle, "adopting existing representation");
                    known.absorb(snapshot.id.clone());
                    outcome.adopted += 1;
                }
                None => pending.push(snapshot),
            }
        }

        for snapshot in pending {
            match self.factory.construct(snapshot.kind, snapshot).await {
                Ok(handle) => {
                    debug!(id = %snapshot.id, %handle, "registered new representation");
                    known.absorb(snapshot.id.clone());
                    outcome.created += 1;
                }
                Err(e) => {
                    warn!(id = %snapshot.id, error = %e, "representation construction failed — will retry");
                    outcome.failed += 1;
                }
            }
        }

        outcome
    }

    /// Deletion pass: remove every known id absent from the current
    /// combined id set.
    ///
    /// The caller gates this on an established baseline; ids of
    /// transiently-failed kinds never show up stale because their
    /// previous snapshots are preserved into `current_ids`.
    pub async fn remove_stale(
        &self,
        known: &mut KnownIds,
        current_ids: &HashSet<ResourceId>,
        kind_of: &HashMap<ResourceId, ResourceKind>,
    ) -> LifecycleOutcome {
        let mut outcome = LifecycleOutcome::default();

        for id in known.snapshot() {
            if current_ids.contains(&id) {
                continue;
            }
            let kind = kind_of.get(&id).copied();
            if let Err(e) = self.remove_one(&id, kind).await {
                warn!(id = %id, error = %e, "stale removal failed — will retry");
                outcome.failed += 1;
                continue;
            }
            known.drop_id(&id);
            outcome.removed += 1;
        }

        outcome
    }

    async fn remove_one(&self, id: &ResourceId, kind: Option<ResourceKind>) -> Result<(), CoreError> {
        // Without a recorded kind (e.g. first cycle after restart for a
        // resource the remote dropped meanwhile), fall back to the
        // default domain so the registry record still goes away.
        let (kind, domain) = match kind.and_then(descriptor_for) {
            Some(desc) => (Some(desc.kind), desc.domain),
            None => (kind, "switch"),
        };
        if let Some(kind) = kind {
            self.factory.destroy(kind, id).await?;
        }
        self.registry.remove(domain, PLATFORM, id).await
    }
}
