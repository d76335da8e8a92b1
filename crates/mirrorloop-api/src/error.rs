use thiserror::Error;

use crate::kind::ResourceKind;

/// Failure taxonomy for remote state access.
///
/// The engine's recovery logic keys on these variants: unsupported kinds
/// go quiet permanently, transient failures keep the previous snapshot,
/// throttling reschedules the cycle, and auth failures suspend the
/// deletion pass and request session renewal.
#[derive(Debug, Error)]
pub enum FetchError {
    // ── Capability ──────────────────────────────────────────────────
    /// The remote controller does not expose this resource type.
    /// Permanent for the life of the session.
    #[error("Resource type not supported by this controller: {kind}")]
    Unsupported { kind: ResourceKind },

    // ── Transient ───────────────────────────────────────────────────
    /// Network-level failure (connection refused, reset, DNS, ...).
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// The controller asked us to back off.
    #[error("Throttled -- retry after {retry_after_secs}s")]
    Throttled { retry_after_secs: u64 },

    // ── Authentication ──────────────────────────────────────────────
    /// Credentials rejected.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// Session expired mid-flight.
    #[error("Session expired -- re-authentication required")]
    SessionExpired,

    // ── Data ────────────────────────────────────────────────────────
    /// The response body could not be decoded at all. Per-record
    /// validation failures are handled by the engine, not here.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String },
}

impl FetchError {
    /// Returns `true` if this failure is worth retrying on the next
    /// cycle with the previous snapshot preserved in the meantime.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Timeout { .. } | Self::Deserialization { .. }
        )
    }

    /// Returns `true` if re-authentication might resolve this failure.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Authentication { .. } | Self::SessionExpired)
    }
}
