// ── Change event types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use mirrorloop_api::ResourceKind;

use super::snapshot::{ResourceId, ResourceSnapshot};

/// Classified transition between two consecutive snapshots of one id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    Created,
    Enabled,
    Disabled,
    Modified,
    Deleted,
}

/// What caused the reconciliation cycle that produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    /// Periodic cadence (baseline or accelerated tier).
    Scheduled,
    /// Debounced burst of locally-initiated mutations.
    Activity,
}

/// One detected transition, consumed once by the trigger dispatcher.
///
/// Carries both full states so downstream automation can react to the
/// exact attribute that moved without re-fetching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub id: ResourceId,
    pub kind: ResourceKind,
    pub action: ChangeAction,
    pub display_name: String,
    pub old_state: Option<ResourceSnapshot>,
    pub new_state: Option<ResourceSnapshot>,
    pub timestamp: DateTime<Utc>,
    pub source: TriggerSource,
}
