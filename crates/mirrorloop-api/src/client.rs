// ── Remote state fetcher contract ──

use async_trait::async_trait;

use crate::error::FetchError;
use crate::kind::ResourceKind;
use crate::record::RawRecord;

/// Per-resource-type accessor into the remote controller.
///
/// Implementations wrap the actual wire client. The engine calls
/// [`fetch`](Self::fetch) once per fetched kind per reconciliation cycle
/// and relies on the [`FetchError`] taxonomy to classify failures:
///
/// - `Unsupported` — this controller version never exposes the kind;
///   the engine logs once and stops asking aggressively.
/// - transient variants — the engine keeps the previous cycle's
///   snapshot for the kind instead of treating its resources as
///   deleted.
/// - `Throttled` — the cycle is rescheduled, not dropped.
/// - auth variants — fatal for the cycle; the engine suspends its
///   deletion pass and calls [`renew_session`](Self::renew_session).
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Fetch the full current collection for one resource type.
    async fn fetch(&self, kind: ResourceKind) -> Result<Vec<RawRecord>, FetchError>;

    /// Re-establish the session after an auth failure.
    ///
    /// Session mechanics belong to the wire client; the default is a
    /// no-op for clients whose transport re-authenticates on demand.
    async fn renew_session(&self) -> Result<(), FetchError> {
        Ok(())
    }
}
