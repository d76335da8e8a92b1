// ── Core error types ──
//
// Host-facing errors from mirrorloop-core. Wire-level failures never
// surface raw: the `From<FetchError>` impl translates the boundary
// taxonomy into domain-appropriate variants, and fully-recovered
// conditions (unsupported kinds, transient per-type failures) never
// become errors at all.

use thiserror::Error;

use mirrorloop_api::{FetchError, ResourceKind};

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Remote access ────────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Remote controller throttled the request -- retry after {retry_after_secs}s")]
    Throttled { retry_after_secs: u64 },

    #[error("Resource type not supported by this controller: {kind}")]
    Unsupported { kind: ResourceKind },

    #[error("Transient fetch failure: {message}")]
    Transient { message: String },

    // ── Data ────────────────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    Validation { message: String },

    // ── Host collaborators ──────────────────────────────────────────
    #[error("Registry operation failed: {message}")]
    Registry { message: String },

    #[error("Representation construction failed for {id}: {message}")]
    Construction { id: String, message: String },

    #[error("Trigger delivery failed: {message}")]
    Dispatch { message: String },

    // ── Engine lifecycle ────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Engine is shut down")]
    Stopped,

    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from boundary-layer errors ───────────────────────────

impl From<FetchError> for CoreError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Authentication { message } => CoreError::AuthenticationFailed { message },
            FetchError::SessionExpired => CoreError::AuthenticationFailed {
                message: "session expired".into(),
            },
            FetchError::Throttled { retry_after_secs } => CoreError::Throttled { retry_after_secs },
            FetchError::Unsupported { kind } => CoreError::Unsupported { kind },
            FetchError::Transport { message } | FetchError::Deserialization { message } => {
                CoreError::Transient { message }
            }
            FetchError::Timeout { timeout_secs } => CoreError::Transient {
                message: format!("timed out after {timeout_secs}s"),
            },
        }
    }
}
