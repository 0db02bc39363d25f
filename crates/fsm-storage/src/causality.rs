// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Causality traversal and per-instance history (§4.3).

use std::collections::{HashMap, HashSet, VecDeque};

use fsm_core::{EventId, InstanceId, PersistedEvent};

use crate::error::StorageError;
use crate::traits::EventStore;

/// Topologically ordered list starting at `event_id` and following
/// `caused` pointers. Cycles are impossible: events are append-only with
/// monotonically increasing ids, so `caused` can only point forward.
pub async fn trace_event_causality(
    store: &dyn EventStore,
    event_id: EventId,
) -> Result<Vec<PersistedEvent>, StorageError> {
    let all = store.all().await?;
    let by_id: HashMap<EventId, &PersistedEvent> = all.iter().map(|e| (e.id, e)).collect();

    let mut ordered = Vec::new();
    let mut seen = HashSet::new();
    let mut queue = VecDeque::new();
    queue.push_back(event_id);

    while let Some(id) = queue.pop_front() {
        if !seen.insert(id) {
            continue;
        }
        if let Some(event) = by_id.get(&id) {
            ordered.push((*event).clone());
            for caused_id in &event.caused {
                queue.push_back(*caused_id);
            }
        }
    }

    Ok(ordered)
}

/// Per-instance log, sorted by `persisted_at`.
pub async fn get_instance_history(
    store: &dyn EventStore,
    instance_id: InstanceId,
) -> Result<Vec<PersistedEvent>, StorageError> {
    let mut events = store.by_instance(instance_id).await?;
    events.sort_by_key(|e| e.persisted_at);
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryEventStore;
    use fsm_core::IncomingEvent;

    fn event(id: &str, caused_by: Vec<EventId>, caused: Vec<EventId>) -> PersistedEvent {
        PersistedEvent {
            id: EventId::from_string(id),
            instance_id: InstanceId::new(),
            component_name: "C".into(),
            machine_name: "M".into(),
            event: IncomingEvent::empty("BEGIN", 0),
            state_before: "Start".into(),
            state_after: "Processing".into(),
            persisted_at: 0,
            caused_by,
            caused,
            source_component_name: None,
            target_component_name: None,
        }
    }

    #[tokio::test]
    async fn follows_caused_chain() {
        let store = InMemoryEventStore::new();
        let root = EventId::from_string("evt-0000000000000000001");
        let child = EventId::from_string("evt-0000000000000000002");
        store.append(event(root.as_str(), vec![], vec![child])).await.expect("append");
        store.append(event(child.as_str(), vec![root], vec![])).await.expect("append");

        let chain = trace_event_causality(&store, root).await.expect("trace");
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].id, root);
        assert_eq!(chain[1].id, child);
    }
}
