// ── Resource type tags ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Type tag for every configuration object the engine mirrors.
///
/// Adding a mirrored type means adding a variant here plus one row in
/// the core kind table — the engine itself never matches on individual
/// variants outside that table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ResourceKind {
    /// Port forwarding rule.
    PortForward,
    /// Traffic rule (allow/block by matching target).
    TrafficRule,
    /// Traffic route (policy-based routing entry).
    TrafficRoute,
    /// Companion toggle nested inside a traffic route's config.
    /// Synthetic — derived from the parent, never fetched.
    RouteKillSwitch,
    /// Zone-based firewall policy.
    FirewallPolicy,
    /// Wireless network broadcast.
    Wlan,
}

impl ResourceKind {
    /// The kinds fetched from the remote controller, in fetch order.
    ///
    /// Synthetic companion kinds are excluded — they exist only as
    /// derived entries in the combined snapshot.
    pub const FETCHED: &'static [ResourceKind] = &[
        ResourceKind::PortForward,
        ResourceKind::TrafficRule,
        ResourceKind::TrafficRoute,
        ResourceKind::FirewallPolicy,
        ResourceKind::Wlan,
    ];

    /// Returns `true` for kinds derived from a parent resource rather
    /// than fetched from the remote controller.
    pub fn is_synthetic(self) -> bool {
        matches!(self, ResourceKind::RouteKillSwitch)
    }
}
