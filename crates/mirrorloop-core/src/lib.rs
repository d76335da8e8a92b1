//! State-mirroring and reconciliation engine for remote network
//! controllers.
//!
//! This crate keeps a local mirror of many configuration-object types
//! fresh under a dynamic polling schedule, classifies what changed
//! between refresh cycles, manages locally-registered controllable
//! representations, and emits structured change notifications for
//! downstream automation consumers:
//!
//! - **[`SyncController`]** — Central facade owning the orchestration
//!   loop and the cross-cycle state machine.
//!   [`start()`](SyncController::start) runs the baseline cycle and
//!   spawns the poll task; [`refresh_now()`](SyncController::refresh_now)
//!   drives a single cycle on demand.
//!
//! - **[`PollScheduler`]** — Three-tier refresh cadence (base / active /
//!   realtime) plus a debounced coalescing timer for locally-initiated
//!   mutation bursts.
//!
//! - **[`detect`](detect::detect)** — Pure cross-type change detector
//!   producing one classified [`ChangeEvent`] per id per cycle.
//!
//! - **[`LifecycleManager`]** — Discovery, idempotent adoption, and
//!   stale removal of local representations against the host's
//!   [`RepresentationRegistry`] and [`RepresentationFactory`].
//!
//! - **[`OptimisticTracker`]** — Per-id assumed-state machine for local
//!   mutations pending remote confirmation; the remote always wins.
//!
//! - **[`TriggerDispatcher`]** — Thin adapter forwarding events to the
//!   host's [`TriggerSink`], with an [`EventFilter`] predicate for
//!   consumers.
//!
//! The wire-level client is consumed as the
//! [`ResourceClient`](mirrorloop_api::ResourceClient) trait from
//! `mirrorloop-api` — this crate never talks to the network itself.

pub mod config;
pub mod controller;
pub mod detect;
pub mod dispatch;
pub mod error;
pub mod lifecycle;
pub mod model;
pub mod optimistic;
pub mod scheduler;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::SyncConfig;
pub use controller::{CycleSummary, SyncController, SyncState};
pub use dispatch::{EventFilter, TriggerDispatcher, TriggerSink};
pub use error::CoreError;
pub use lifecycle::{
    KnownIds, LifecycleManager, LifecycleOutcome, RepresentationFactory, RepresentationHandle,
    RepresentationRegistry,
};
pub use optimistic::{AssumedState, OptimisticTracker};
pub use scheduler::PollScheduler;

// Re-export model types at the crate root for ergonomics.
pub use model::{
    ChangeAction, ChangeEvent, ResourceId, ResourceKind, ResourceSnapshot, TriggerSource,
};
