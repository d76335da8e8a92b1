// ── Trigger dispatch ──
//
// Thin adapter between detected change events and the host's
// automation-consumer interface. One event per id per cycle; ordering
// across unrelated ids within a cycle is unspecified.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::error::CoreError;
use crate::model::{ChangeAction, ChangeEvent, ResourceId, ResourceKind};

/// The host's automation-consumer interface.
///
/// Receives each event exactly once with full old/new state. Delivery
/// failures are the host's problem to surface; the engine logs and
/// moves on.
#[async_trait]
pub trait TriggerSink: Send + Sync {
    async fn deliver(&self, event: &ChangeEvent) -> Result<(), CoreError>;
}

/// Forwards each detected change event to the sink.
pub struct TriggerDispatcher {
    sink: Arc<dyn TriggerSink>,
}

impl TriggerDispatcher {
    pub fn new(sink: Arc<dyn TriggerSink>) -> Self {
        Self { sink }
    }

    /// Dispatch a cycle's events. Returns how many were delivered;
    /// a failed delivery never aborts the rest.
    pub async fn dispatch_all(&self, events: &[ChangeEvent]) -> usize {
        let mut delivered = 0;
        for event in events {
            match self.sink.deliver(event).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(id = %event.id, action = %event.action, error = %e, "trigger delivery failed");
                }
            }
        }
        delivered
    }
}

// ── Consumer-side filtering ─────────────────────────────────────────

/// Filter predicate for change events.
///
/// Consumers that subscribe to the rebroadcast stream narrow it with
/// these rather than re-implementing match logic.
pub enum EventFilter {
    All,
    ById(ResourceId),
    ByKind(ResourceKind),
    ByAction(ChangeAction),
    /// Case-insensitive substring match on the display label.
    LabelContains(String),
    Custom(Box<dyn Fn(&ChangeEvent) -> bool + Send + Sync>),
}

impl EventFilter {
    pub fn matches(&self, event: &ChangeEvent) -> bool {
        match self {
            Self::All => true,
            Self::ById(id) => event.id == *id,
            Self::ByKind(kind) => event.kind == *kind,
            Self::ByAction(action) => event.action == *action,
            Self::LabelContains(needle) => event
                .display_name
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            Self::Custom(f) => f(event),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use chrono::Utc;

    use crate::model::TriggerSource;

    struct RecordingSink {
        delivered: Mutex<Vec<ResourceId>>,
        reject: Option<ResourceId>,
    }

    #[async_trait]
    impl TriggerSink for RecordingSink {
        async fn deliver(&self, event: &ChangeEvent) -> Result<(), CoreError> {
            if self.reject.as_ref() == Some(&event.id) {
                return Err(CoreError::Dispatch {
                    message: "consumer unavailable".into(),
                });
            }
            self.delivered.lock().unwrap().push(event.id.clone());
            Ok(())
        }
    }

    fn event(id: &str, action: ChangeAction) -> ChangeEvent {
        ChangeEvent {
            id: ResourceId::new(id),
            kind: ResourceKind::PortForward,
            action,
            display_name: format!("rule {id}"),
            old_state: None,
            new_state: None,
            timestamp: Utc::now(),
            source: TriggerSource::Scheduled,
        }
    }

    #[tokio::test]
    async fn failed_delivery_does_not_abort_the_rest() {
        let sink = Arc::new(RecordingSink {
            delivered: Mutex::new(Vec::new()),
            reject: Some(ResourceId::new("b")),
        });
        let dispatcher = TriggerDispatcher::new(Arc::clone(&sink) as Arc<dyn TriggerSink>);

        let events = vec![
            event("a", ChangeAction::Created),
            event("b", ChangeAction::Deleted),
            event("c", ChangeAction::Enabled),
        ];
        let delivered = dispatcher.dispatch_all(&events).await;

        assert_eq!(delivered, 2);
        let seen = sink.delivered.lock().unwrap();
        assert_eq!(seen.as_slice(), [ResourceId::new("a"), ResourceId::new("c")]);
    }

    #[test]
    fn filters_match_expected_events() {
        let e = event("pf1", ChangeAction::Enabled);

        assert!(EventFilter::All.matches(&e));
        assert!(EventFilter::ById(ResourceId::new("pf1")).matches(&e));
        assert!(!EventFilter::ById(ResourceId::new("pf2")).matches(&e));
        assert!(EventFilter::ByKind(ResourceKind::PortForward).matches(&e));
        assert!(EventFilter::ByAction(ChangeAction::Enabled).matches(&e));
        assert!(!EventFilter::ByAction(ChangeAction::Deleted).matches(&e));
        assert!(EventFilter::LabelContains("RULE".into()).matches(&e));
        assert!(EventFilter::Custom(Box::new(|ev| ev.id.as_str().starts_with("pf"))).matches(&e));
    }
}
