// ── Runtime tuning configuration ──
//
// The host constructs a `SyncConfig` and hands it to the controller --
// core never reads config files. All knobs are positive whole seconds
// on the wire-facing surface; internally they are `Duration`s.

use std::time::Duration;

use crate::error::CoreError;

/// Scheduling and reconciliation tuning for one controller instance.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Baseline cadence — always eventually fires, catching
    /// externally-initiated changes invisible to activity tracking.
    pub base_interval: Duration,
    /// Accelerated cadence while local activity is recent.
    pub active_interval: Duration,
    /// Fastest cadence while a local mutation awaits remote
    /// confirmation.
    pub realtime_interval: Duration,
    /// How long after the last local activity the accelerated tiers
    /// stay in effect.
    pub activity_timeout: Duration,
    /// Coalescing delay after a local mutation before a cycle runs.
    pub debounce_window: Duration,
    /// How long a locally-assumed state survives without remote
    /// confirmation before reverting.
    pub optimistic_expiry: Duration,
}

impl SyncConfig {
    /// Build a config from whole-second knobs, rejecting zeros.
    #[allow(clippy::similar_names)]
    pub fn from_secs(
        base: u64,
        active: u64,
        realtime: u64,
        activity_timeout: u64,
        debounce: u64,
        optimistic_expiry: u64,
    ) -> Result<Self, CoreError> {
        let require = |name: &str, v: u64| -> Result<Duration, CoreError> {
            if v == 0 {
                return Err(CoreError::Config {
                    message: format!("{name} must be a positive number of seconds"),
                });
            }
            Ok(Duration::from_secs(v))
        };

        Ok(Self {
            base_interval: require("base_interval", base)?,
            active_interval: require("active_interval", active)?,
            realtime_interval: require("realtime_interval", realtime)?,
            activity_timeout: require("activity_timeout", activity_timeout)?,
            debounce_window: require("debounce_window", debounce)?,
            optimistic_expiry: require("optimistic_expiry", optimistic_expiry)?,
        })
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_secs(300),
            active_interval: Duration::from_secs(30),
            realtime_interval: Duration::from_secs(5),
            activity_timeout: Duration::from_secs(120),
            debounce_window: Duration::from_secs(2),
            optimistic_expiry: Duration::from_secs(15),
        }
    }
}
