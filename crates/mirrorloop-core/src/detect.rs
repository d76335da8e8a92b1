// ── Cross-type change detection ──
//
// Pure diff of two combined snapshot maps. No side effects: the caller
// owns what happens to the resulting events. The previous map always
// comes from the last *completed* cycle, never a partially-applied one.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::model::kinds::descriptor_for;
use crate::model::{ChangeAction, ChangeEvent, ResourceId, ResourceSnapshot, TriggerSource};

/// Diff the previous combined snapshot against the current one.
///
/// Classification per id:
/// - absent before, present now -> `created`
/// - present before, absent now -> `deleted`
/// - present in both: an `enabled` transition wins outright (one event
///   per id per cycle, action matching the new value); otherwise any
///   difference in the kind's significant-field set yields `modified`;
///   otherwise nothing.
///
/// Companion children are ordinary entries in both maps, so they diff
/// independently of their parents. Ordering across unrelated ids is
/// unspecified.
pub fn detect(
    previous: &HashMap<ResourceId, ResourceSnapshot>,
    current: &HashMap<ResourceId, ResourceSnapshot>,
    now: DateTime<Utc>,
    source: TriggerSource,
) -> Vec<ChangeEvent> {
    let mut events = Vec::new();

    for (id, cur) in current {
        match previous.get(id) {
            None => events.push(event(ChangeAction::Created, cur, None, Some(cur.clone()), now, source)),
            Some(prev) => {
                if let Some(action) = classify_pair(prev, cur) {
                    events.push(event(action, cur, Some(prev.clone()), Some(cur.clone()), now, source));
                }
            }
        }
    }

    for (id, prev) in previous {
        if !current.contains_key(id) {
            events.push(event(ChangeAction::Deleted, prev, Some(prev.clone()), None, now, source));
        }
    }

    events
}

/// Classify an id present in both cycles. `None` means no event.
fn classify_pair(prev: &ResourceSnapshot, cur: &ResourceSnapshot) -> Option<ChangeAction> {
    if prev.enabled != cur.enabled {
        // The discriminating boolean takes precedence over every other
        // field difference: exactly one event, matching the new value.
        // A value that became unknown can't carry an on/off action and
        // falls through to the significant-field check.
        match cur.enabled {
            Some(true) => return Some(ChangeAction::Enabled),
            Some(false) => return Some(ChangeAction::Disabled),
            None => {}
        }
    }

    let significant = descriptor_for(cur.kind).map_or(&[][..], |s| s.significant_fields);
    let moved = significant.iter().any(|key| prev.field(key) != cur.field(key))
        || prev.name != cur.name;
    if moved {
        return Some(ChangeAction::Modified);
    }

    None
}

fn event(
    action: ChangeAction,
    reference: &ResourceSnapshot,
    old_state: Option<ResourceSnapshot>,
    new_state: Option<ResourceSnapshot>,
    timestamp: DateTime<Utc>,
    source: TriggerSource,
) -> ChangeEvent {
    ChangeEvent {
        id: reference.id.clone(),
        kind: reference.kind,
        action,
        display_name: reference.display_name().to_owned(),
        old_state,
        new_state,
        timestamp,
        source,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use mirrorloop_api::{RawRecord, ResourceKind};

    fn snap(kind: ResourceKind, fields: serde_json::Value) -> ResourceSnapshot {
        ResourceSnapshot::from_record(kind, RawRecord::from(fields)).unwrap()
    }

    fn map(snaps: Vec<ResourceSnapshot>) -> HashMap<ResourceId, ResourceSnapshot> {
        snaps.into_iter().map(|s| (s.id.clone(), s)).collect()
    }

    fn diff(
        previous: &HashMap<ResourceId, ResourceSnapshot>,
        current: &HashMap<ResourceId, ResourceSnapshot>,
    ) -> Vec<ChangeEvent> {
        detect(previous, current, Utc::now(), TriggerSource::Scheduled)
    }

    #[test]
    fn identical_maps_produce_no_events() {
        let a = map(vec![
            snap(ResourceKind::PortForward, json!({"_id": "pf1", "name": "ssh", "enabled": true})),
            snap(ResourceKind::Wlan, json!({"_id": "w1", "name": "home", "enabled": false})),
        ]);
        assert_eq!(diff(&a, &a.clone()), Vec::new());
    }

    #[test]
    fn new_id_yields_exactly_one_created() {
        let prev = map(vec![]);
        let cur = map(vec![snap(
            ResourceKind::PortForward,
            json!({"_id": "pf1", "name": "ssh", "enabled": true}),
        )]);

        let events = diff(&prev, &cur);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, ChangeAction::Created);
        assert_eq!(events[0].id.as_str(), "pf1");
        assert!(events[0].old_state.is_none());
        assert_eq!(events[0].display_name, "ssh");
    }

    #[test]
    fn missing_id_yields_exactly_one_deleted() {
        let prev = map(vec![snap(
            ResourceKind::TrafficRule,
            json!({"_id": "tr1", "description": "block iot", "enabled": true}),
        )]);
        let cur = map(vec![]);

        let events = diff(&prev, &cur);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, ChangeAction::Deleted);
        assert!(events[0].new_state.is_none());
    }

    #[test]
    fn enabled_transition_beats_other_field_changes() {
        let prev = map(vec![snap(
            ResourceKind::PortForward,
            json!({"_id": "pf1", "name": "ssh", "enabled": true, "dst_port": "22"}),
        )]);
        // Disabled AND renamed AND retargeted in the same cycle: only
        // one event, and it is the enabled-state one.
        let cur = map(vec![snap(
            ResourceKind::PortForward,
            json!({"_id": "pf1", "name": "ssh-alt", "enabled": false, "dst_port": "2222"}),
        )]);

        let events = diff(&prev, &cur);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, ChangeAction::Disabled);
    }

    #[test]
    fn enabled_action_matches_new_value() {
        let prev = map(vec![snap(
            ResourceKind::Wlan,
            json!({"_id": "w1", "enabled": false}),
        )]);
        let cur = map(vec![snap(
            ResourceKind::Wlan,
            json!({"_id": "w1", "enabled": true}),
        )]);

        let events = diff(&prev, &cur);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, ChangeAction::Enabled);
    }

    #[test]
    fn significant_field_change_yields_modified() {
        let prev = map(vec![snap(
            ResourceKind::FirewallPolicy,
            json!({"_id": "fw1", "name": "deny-guest", "enabled": true, "protocol": "tcp"}),
        )]);
        let cur = map(vec![snap(
            ResourceKind::FirewallPolicy,
            json!({"_id": "fw1", "name": "deny-guest", "enabled": true, "protocol": "udp"}),
        )]);

        let events = diff(&prev, &cur);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, ChangeAction::Modified);
    }

    #[test]
    fn insignificant_field_change_yields_nothing() {
        let prev = map(vec![snap(
            ResourceKind::FirewallPolicy,
            json!({"_id": "fw1", "enabled": true, "hit_count": 10}),
        )]);
        let cur = map(vec![snap(
            ResourceKind::FirewallPolicy,
            json!({"_id": "fw1", "enabled": true, "hit_count": 9000}),
        )]);

        assert_eq!(diff(&prev, &cur), Vec::new());
    }

    #[test]
    fn missing_significant_field_reads_as_unknown_not_crash() {
        let prev = map(vec![snap(
            ResourceKind::Wlan,
            json!({"_id": "w1", "enabled": true, "security": "wpa2"}),
        )]);
        let cur = map(vec![snap(
            ResourceKind::Wlan,
            json!({"_id": "w1", "enabled": true}),
        )]);

        let events = diff(&prev, &cur);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, ChangeAction::Modified);
    }

    #[test]
    fn enabled_becoming_unknown_downgrades_to_modified() {
        let prev = map(vec![snap(
            ResourceKind::Wlan,
            json!({"_id": "w1", "enabled": true, "security": "wpa2"}),
        )]);
        let cur = map(vec![snap(
            ResourceKind::Wlan,
            json!({"_id": "w1", "security": "wpa3"}),
        )]);

        let events = diff(&prev, &cur);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, ChangeAction::Modified);
    }

    #[test]
    fn child_diffs_independently_of_parent() {
        let parent_prev = snap(
            ResourceKind::TrafficRoute,
            json!({"_id": "r1", "description": "vpn", "enabled": true, "kill_switch": true}),
        );
        let child_prev = crate::model::synthesize_child(
            &parent_prev,
            &crate::model::descriptor_for(ResourceKind::TrafficRoute).unwrap().child.unwrap(),
        )
        .unwrap();

        // Parent unchanged; child flag flips off.
        let parent_cur = snap(
            ResourceKind::TrafficRoute,
            json!({"_id": "r1", "description": "vpn", "enabled": true, "kill_switch": false}),
        );
        let child_cur = crate::model::synthesize_child(
            &parent_cur,
            &crate::model::descriptor_for(ResourceKind::TrafficRoute).unwrap().child.unwrap(),
        )
        .unwrap();

        let prev = map(vec![parent_prev, child_prev]);
        let cur = map(vec![parent_cur, child_cur]);

        let events = diff(&prev, &cur);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id.as_str(), "r1_kill_switch");
        assert_eq!(events[0].action, ChangeAction::Disabled);
    }
}
