// ── Kind registration table ──
//
// One row per mirrored resource type. Discovery, change classification,
// and child synthesis all read from this table, so adding a type is one
// variant in `ResourceKind` plus one row here — no conditionals
// scattered through the engine.

use serde_json::Value;

use mirrorloop_api::ResourceKind;

use super::snapshot::ResourceSnapshot;

/// Declares a companion toggle nested inside a parent resource's config.
///
/// The child exists only while `flag_field` is present and
/// boolean-typed on the parent's *current* snapshot; its id derives
/// from the parent's id plus `suffix`.
#[derive(Debug, Clone, Copy)]
pub struct ChildDescriptor {
    pub kind: ResourceKind,
    pub suffix: &'static str,
    pub flag_field: &'static str,
    /// Appended to the parent's display name for the child's label.
    pub label: &'static str,
}

/// Registration row for one mirrored resource type.
#[derive(Debug, Clone, Copy)]
pub struct KindDescriptor {
    pub kind: ResourceKind,
    /// Host-side representation domain (registry lookup namespace).
    pub domain: &'static str,
    /// Raw payload fields whose change alone classifies as `modified`.
    pub significant_fields: &'static [&'static str],
    pub child: Option<ChildDescriptor>,
}

pub const KIND_TABLE: &[KindDescriptor] = &[
    KindDescriptor {
        kind: ResourceKind::PortForward,
        domain: "switch",
        significant_fields: &["name", "fwd", "fwd_port", "dst_port", "proto"],
        child: None,
    },
    KindDescriptor {
        kind: ResourceKind::TrafficRule,
        domain: "switch",
        significant_fields: &["description", "action", "matching_target", "target_devices"],
        child: None,
    },
    KindDescriptor {
        kind: ResourceKind::TrafficRoute,
        domain: "switch",
        significant_fields: &["description", "matching_target", "network_id", "next_hop"],
        child: Some(ChildDescriptor {
            kind: ResourceKind::RouteKillSwitch,
            suffix: "kill_switch",
            flag_field: "kill_switch",
            label: "kill switch",
        }),
    },
    KindDescriptor {
        kind: ResourceKind::FirewallPolicy,
        domain: "switch",
        significant_fields: &["name", "action", "protocol", "source", "destination"],
        child: None,
    },
    KindDescriptor {
        kind: ResourceKind::Wlan,
        domain: "switch",
        significant_fields: &["name", "security", "wpa_mode"],
        child: None,
    },
    // Synthetic companion kinds still need a row for discovery and
    // classification; they are never fetched (see ResourceKind::FETCHED).
    KindDescriptor {
        kind: ResourceKind::RouteKillSwitch,
        domain: "switch",
        significant_fields: &[],
        child: None,
    },
];

/// Look up the registration row for a kind.
pub fn descriptor_for(kind: ResourceKind) -> Option<&'static KindDescriptor> {
    KIND_TABLE.iter().find(|s| s.kind == kind)
}

/// Synthesize the companion child for one parent snapshot, if the
/// declared precondition holds.
///
/// Returns `None` when the flag is absent or not boolean-typed — the
/// child then simply doesn't exist this cycle, and the lifecycle
/// manager removes any representation left over from earlier cycles.
pub fn synthesize_child(parent: &ResourceSnapshot, desc: &ChildDescriptor) -> Option<ResourceSnapshot> {
    let Some(Value::Bool(flag)) = parent.fields.get(desc.flag_field) else {
        return None;
    };

    let mut fields = serde_json::Map::new();
    fields.insert(desc.flag_field.to_owned(), Value::Bool(*flag));

    Some(ResourceSnapshot {
        id: parent.id.child(desc.suffix),
        kind: desc.kind,
        name: Some(format!("{} {}", parent.display_name(), desc.label)),
        enabled: Some(*flag),
        parent_id: Some(parent.id.clone()),
        fields,
    })
}
