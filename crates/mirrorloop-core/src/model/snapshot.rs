// ── Core identity and snapshot types ──
//
// ResourceId and ResourceSnapshot are the foundation of every cycle:
// each fetch produces a fresh set of snapshots keyed by id, superseding
// the previous cycle's set wholesale. Snapshots are never mutated in
// place.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use mirrorloop_api::{RawRecord, ResourceKind};

use crate::error::CoreError;

// ── ResourceId ──────────────────────────────────────────────────────

/// Canonical identifier for a mirrored resource.
///
/// Opaque — whatever string the remote controller hands out, globally
/// unique across all resource types. Companion children derive their
/// ids deterministically from the parent's.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive the deterministic id of a companion child resource.
    ///
    /// `"5f1a..".child("kill_switch")` -> `"5f1a.._kill_switch"`. The
    /// derived id is treated as a fully independent entry everywhere
    /// downstream (known-id set, detector, lifecycle).
    pub fn child(&self, suffix: &str) -> Self {
        Self(format!("{}_{suffix}", self.0))
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ResourceId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for ResourceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ResourceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ── ResourceSnapshot ────────────────────────────────────────────────

/// One remote resource as observed in one fetch cycle.
///
/// The semantic fields (`name`, `enabled`) are normalized out of the
/// raw payload; `fields` keeps the payload verbatim so pass-through
/// updates and significant-field comparison never lose attributes the
/// engine doesn't model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub id: ResourceId,
    pub kind: ResourceKind,
    pub name: Option<String>,
    pub enabled: Option<bool>,
    /// Set for synthesized companion children only.
    pub parent_id: Option<ResourceId>,
    pub fields: Map<String, Value>,
}

impl ResourceSnapshot {
    /// Normalize one raw record into a snapshot.
    ///
    /// A record without an id is malformed and rejected — the caller
    /// drops it and continues with the rest of the batch.
    pub fn from_record(kind: ResourceKind, record: RawRecord) -> Result<Self, CoreError> {
        let Some(id) = record.id() else {
            return Err(CoreError::Validation {
                message: format!("{kind} record has no id field"),
            });
        };
        let id = ResourceId::new(id);
        let name = record.name().map(str::to_owned);
        let enabled = record.enabled();

        Ok(Self {
            id,
            kind,
            name,
            enabled,
            parent_id: None,
            fields: record.fields,
        })
    }

    /// Read a raw field, with absent keys reading as JSON null.
    ///
    /// Comparison code treats "missing" as a distinguished unknown
    /// value rather than a crash.
    pub fn field(&self, key: &str) -> &Value {
        self.fields.get(key).unwrap_or(&Value::Null)
    }

    /// Best display label for event payloads and log lines.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| self.id.as_str())
    }
}

/// Normalize a fetched batch, dropping malformed records.
///
/// Each rejected record is logged with as much identity as it has; the
/// rest of the batch is still processed.
pub fn normalize_batch(kind: ResourceKind, records: Vec<RawRecord>) -> Vec<ResourceSnapshot> {
    let mut out = Vec::with_capacity(records.len());
    for record in records {
        match ResourceSnapshot::from_record(kind, record) {
            Ok(snapshot) => out.push(snapshot),
            Err(e) => warn!(%kind, error = %e, "dropping malformed record"),
        }
    }
    out
}
