// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed channel namespace (§4.5): the set of names every broker driver,
//! in-memory or networked, publishes and subscribes under.

/// Runtime presence announcements: `{id, componentName, machines}`.
pub const REGISTRY_ANNOUNCE: &str = "fsm:registry:announce";

/// Mirrors `EngineEvent::StateChange`.
pub const EVENTS_STATE_CHANGE: &str = "fsm:events:state_change";

/// Mirrors `EngineEvent::InstanceCreated`.
pub const EVENTS_INSTANCE_CREATED: &str = "fsm:events:instance_created";

/// Mirrors `EngineEvent::InstanceDisposed`.
pub const EVENTS_INSTANCE_DISPOSED: &str = "fsm:events:instance_disposed";

/// Inbound commands (`sendEvent`/`createInstance`) addressed to one component.
pub fn commands(component_name: &str) -> String {
    format!("fsm:commands:{component_name}")
}

/// Property-matched / targeted cross-component delivery channel. A bare
/// component name, not under the `fsm:` prefix — the one exception the
/// namespace carries (§4.5).
pub fn component_channel(component_name: &str) -> String {
    component_name.to_string()
}
