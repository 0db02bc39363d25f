// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `Sender` capability object handed to every hook (§4.4) and the
//! `CrossComponent` injection seam it uses to reach a registry without
//! `fsm-engine` depending on `fsm-registry` (§9 "cyclic references...
//! resolved by injection").

use std::sync::Arc;

use async_trait::async_trait;
use fsm_core::{DispatchError, IncomingEvent, InstanceId};
use parking_lot::Mutex;
use serde_json::Value;

/// Implemented by the component registry (`fsm-registry`). `fsm-engine`
/// only sees this trait, never the registry type, breaking the
/// runtime/registry/broadcaster cycle §9 describes.
#[async_trait]
pub trait CrossComponent: Send + Sync {
    async fn send_event_to_component(
        &self,
        component: &str,
        instance_id: InstanceId,
        event: IncomingEvent,
    ) -> Result<(), DispatchError>;

    async fn broadcast_to_component(
        &self,
        component: &str,
        machine: &str,
        state: &str,
        event: IncomingEvent,
    ) -> Result<usize, DispatchError>;

    /// `id` is pre-allocated by the caller (`Sender::create_instance_in_component`
    /// hands it back synchronously) so the implementation creates the
    /// instance under that id rather than minting its own.
    async fn create_instance_in_component(
        &self,
        component: &str,
        id: InstanceId,
        machine: &str,
        payload: Value,
    ) -> Result<(), DispatchError>;
}

/// Effects a hook requested, executed by the dispatcher once the commit
/// that produced them has completed (§4.1: "hooks never block the
/// commit"). Queuing rather than recursing also sidesteps re-entering the
/// single instance-map lock from inside a hook invocation it is awaited
/// under.
#[derive(Debug, Clone)]
pub enum PendingAction {
    SendToSelf(IncomingEvent),
    SendTo { instance_id: InstanceId, event: IncomingEvent },
    Broadcast { machine: String, state: String, event: IncomingEvent },
    CreateInstance { id: InstanceId, machine: String, payload: Value },
    SendToComponent { component: String, instance_id: InstanceId, event: IncomingEvent },
    BroadcastToComponent { component: String, machine: String, state: String, event: IncomingEvent },
    CreateInstanceInComponent { id: InstanceId, component: String, machine: String, payload: Value },
}

/// Capability object handed to every hook invocation (§4.4). Cheap to
/// clone; every method either queues a `PendingAction` or, for creation
/// calls that must hand back an id synchronously, allocates the id up
/// front and queues the materialization.
#[derive(Clone)]
pub struct Sender {
    self_instance_id: InstanceId,
    queue: Arc<Mutex<Vec<PendingAction>>>,
    cross_component: Option<Arc<dyn CrossComponent>>,
}

impl Sender {
    pub(crate) fn new(self_instance_id: InstanceId, cross_component: Option<Arc<dyn CrossComponent>>) -> Self {
        Self { self_instance_id, queue: Arc::new(Mutex::new(Vec::new())), cross_component }
    }

    pub fn send_to_self(&self, event: IncomingEvent) {
        self.queue.lock().push(PendingAction::SendToSelf(event));
    }

    pub fn send_to(&self, instance_id: InstanceId, event: IncomingEvent) {
        self.queue.lock().push(PendingAction::SendTo { instance_id, event });
    }

    pub fn broadcast(&self, machine: impl Into<String>, state: impl Into<String>, event: IncomingEvent) {
        self.queue.lock().push(PendingAction::Broadcast {
            machine: machine.into(),
            state: state.into(),
            event,
        });
    }

    pub fn create_instance(&self, machine: impl Into<String>, payload: Value) -> InstanceId {
        let id = InstanceId::new();
        self.queue.lock().push(PendingAction::CreateInstance { id, machine: machine.into(), payload });
        id
    }

    pub fn send_to_component(
        &self,
        component: impl Into<String>,
        instance_id: InstanceId,
        event: IncomingEvent,
    ) -> Result<(), DispatchError> {
        self.require_cross_component()?;
        self.queue.lock().push(PendingAction::SendToComponent { component: component.into(), instance_id, event });
        Ok(())
    }

    pub fn broadcast_to_component(
        &self,
        component: impl Into<String>,
        machine: impl Into<String>,
        state: impl Into<String>,
        event: IncomingEvent,
    ) -> Result<(), DispatchError> {
        self.require_cross_component()?;
        self.queue.lock().push(PendingAction::BroadcastToComponent {
            component: component.into(),
            machine: machine.into(),
            state: state.into(),
            event,
        });
        Ok(())
    }

    pub fn create_instance_in_component(
        &self,
        component: impl Into<String>,
        machine: impl Into<String>,
        payload: Value,
    ) -> Result<InstanceId, DispatchError> {
        self.require_cross_component()?;
        let id = InstanceId::new();
        self.queue.lock().push(PendingAction::CreateInstanceInComponent {
            id,
            component: component.into(),
            machine: machine.into(),
            payload,
        });
        Ok(id)
    }

    fn require_cross_component(&self) -> Result<(), DispatchError> {
        if self.cross_component.is_some() {
            Ok(())
        } else {
            Err(DispatchError::CrossComponentUnavailable)
        }
    }

    pub(crate) fn self_instance_id(&self) -> InstanceId {
        self.self_instance_id
    }

    pub(crate) fn cross_component(&self) -> Option<&Arc<dyn CrossComponent>> {
        self.cross_component.as_ref()
    }

    /// Drain every action queued by hooks during the commit this `Sender`
    /// was scoped to.
    pub(crate) fn drain(&self) -> Vec<PendingAction> {
        std::mem::take(&mut self.queue.lock())
    }
}
