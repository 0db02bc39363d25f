// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pairs one runtime with a broker (§4.5): announces presence, mirrors
//! engine events onto the broker's fixed channels, and executes inbound
//! cross-component commands delivered on the component's own command
//! channel and its property-matched broadcast channel.

use std::sync::Arc;

use fsm_core::EngineEvent;
use fsm_registry::Runtime;
use serde_json::json;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::broker::{Broker, BrokerHandler, SubscriptionId};
use crate::channels;
use crate::error::BrokerError;

/// Holds the live wiring for one runtime's broker connection. Dropping
/// this without calling `disconnect` leaves the mirroring task running
/// and the command subscriptions live — always pair `connect` with a
/// matching `disconnect`.
pub struct Broadcaster {
    runtime: Arc<dyn Runtime>,
    broker: Arc<dyn Broker>,
    command_sub: parking_lot::Mutex<Option<SubscriptionId>>,
    broadcast_sub: parking_lot::Mutex<Option<SubscriptionId>>,
    mirror_task: parking_lot::Mutex<Option<JoinHandle<()>>>,
    events_tx: broadcast::Sender<EngineEvent>,
}

impl Broadcaster {
    pub fn new(runtime: Arc<dyn Runtime>, broker: Arc<dyn Broker>) -> Self {
        let (events_tx, _) = broadcast::channel(128);
        Self {
            runtime,
            broker,
            command_sub: parking_lot::Mutex::new(None),
            broadcast_sub: parking_lot::Mutex::new(None),
            mirror_task: parking_lot::Mutex::new(None),
            events_tx,
        }
    }

    /// Broadcaster-level events (`broker_disconnected`) — not part of the
    /// runtime's own `EngineEvent` stream, since they describe the broker
    /// connection itself rather than any one instance's transitions.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events_tx.subscribe()
    }

    /// Announces the component on `REGISTRY_ANNOUNCE`, subscribes to its
    /// command channel and its property-matched broadcast channel
    /// (§4.4/§4.5), and starts mirroring its engine events onto the
    /// broker. Idempotent only in the sense that calling it twice without
    /// an intervening `disconnect` leaks the first mirroring task — the
    /// caller is expected to hold one `Broadcaster` per live connection.
    pub async fn connect(self: &Arc<Self>) -> Result<(), BrokerError> {
        self.broker.connect().await?;

        self.broker
            .publish(
                channels::REGISTRY_ANNOUNCE,
                json!({
                    "componentName": self.runtime.component_name(),
                    "machines": self.runtime.machine_names(),
                }),
            )
            .await?;

        let command_channel = channels::commands(self.runtime.component_name());
        let sub = self.broker.subscribe(&command_channel, self.command_handler()).await?;
        *self.command_sub.lock() = Some(sub);

        let broadcast_channel = channels::component_channel(self.runtime.component_name());
        let broadcast_sub = self.broker.subscribe(&broadcast_channel, self.command_handler()).await?;
        *self.broadcast_sub.lock() = Some(broadcast_sub);

        let mut events = self.runtime.subscribe();
        let this = self.clone();
        let handle = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => mirror_event(&this.broker, this.runtime.component_name(), event).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(component = %this.runtime.component_name(), skipped, "broadcaster lagged behind engine events");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        // The runtime's own event stream ended while this
                        // broadcaster still believed itself connected — a
                        // genuine subscription failure, not a single bad
                        // message. There is no runtime left to reconnect to.
                        let _ = this.events_tx.send(EngineEvent::BrokerDisconnected {
                            reason: "engine event stream closed".to_string(),
                        });
                        break;
                    }
                }
            }
        });
        *self.mirror_task.lock() = Some(handle);

        info!(component = %self.runtime.component_name(), "broadcaster connected");
        Ok(())
    }

    pub async fn disconnect(&self) -> Result<(), BrokerError> {
        if let Some(handle) = self.mirror_task.lock().take() {
            handle.abort();
        }
        if let Some(sub) = self.command_sub.lock().take() {
            let command_channel = channels::commands(self.runtime.component_name());
            self.broker.unsubscribe(&command_channel, sub).await?;
        }
        if let Some(sub) = self.broadcast_sub.lock().take() {
            let broadcast_channel = channels::component_channel(self.runtime.component_name());
            self.broker.unsubscribe(&broadcast_channel, sub).await?;
        }
        self.broker.disconnect().await
    }

    /// Builds a handler that executes an inbound command against this
    /// broadcaster's runtime, disconnecting and re-announcing on failure
    /// (§7 point 6: "inbound subscription errors disconnect the
    /// broadcaster and emit `broker_disconnected`... on reconnect, the
    /// broadcaster re-announces and re-subscribes").
    fn command_handler(self: &Arc<Self>) -> BrokerHandler {
        let this = self.clone();
        Arc::new(move |message| {
            let this = this.clone();
            Box::pin(async move {
                if let Err(err) = execute_command(&this.runtime, message).await {
                    this.handle_subscription_failure(err.to_string()).await;
                }
            })
        })
    }

    async fn handle_subscription_failure(self: &Arc<Self>, reason: String) {
        warn!(component = %self.runtime.component_name(), %reason, "broker subscription failed, disconnecting broadcaster");
        let _ = self.events_tx.send(EngineEvent::BrokerDisconnected { reason });
        if let Err(err) = self.disconnect().await {
            warn!(component = %self.runtime.component_name(), %err, "error tearing down broadcaster after subscription failure");
        }
        if let Err(err) = self.connect().await {
            warn!(component = %self.runtime.component_name(), %err, "broadcaster reconnect failed");
        }
    }
}

async fn mirror_event(broker: &Arc<dyn Broker>, component_name: &str, event: EngineEvent) {
    let (channel, message) = match event {
        EngineEvent::StateChange { instance_id, machine_name, from, to, event } => (
            channels::EVENTS_STATE_CHANGE,
            json!({
                "componentName": component_name,
                "instanceId": instance_id.to_string(),
                "machineName": machine_name,
                "from": from,
                "to": to,
                "event": event,
            }),
        ),
        EngineEvent::InstanceCreated { instance_id, machine_name, state } => (
            channels::EVENTS_INSTANCE_CREATED,
            json!({
                "componentName": component_name,
                "instanceId": instance_id.to_string(),
                "machineName": machine_name,
                "state": state,
            }),
        ),
        EngineEvent::InstanceDisposed { instance_id, machine_name, final_state } => (
            channels::EVENTS_INSTANCE_DISPOSED,
            json!({
                "componentName": component_name,
                "instanceId": instance_id.to_string(),
                "machineName": machine_name,
                "finalState": final_state,
            }),
        ),
        // Other engine event kinds (timers firing, errors, unhandled events)
        // stay local — the wire carries only what §4.5 names.
        _ => return,
    };
    if let Err(err) = broker.publish(channel, message).await {
        warn!(%channel, %err, "failed to mirror engine event onto broker");
    }
}

async fn execute_command(runtime: &Arc<dyn Runtime>, message: serde_json::Value) -> Result<(), BrokerError> {
    let command = message.get("command").and_then(|v| v.as_str()).unwrap_or_default();
    match command {
        "sendEvent" => {
            let instance_id = parse_instance_id(&message)?;
            let event = parse_incoming_event(&message)?;
            runtime
                .send_event(instance_id, event)
                .await
                .map_err(|err| BrokerError::Registry(fsm_registry::RegistryError::Runtime(err)))
        }
        "createInstance" => {
            let instance_id = parse_instance_id(&message)?;
            let machine = message.get("machine").and_then(|v| v.as_str()).unwrap_or_default();
            let payload = message.get("payload").cloned().unwrap_or(serde_json::Value::Null);
            runtime
                .create_instance_with_id(machine, instance_id, payload)
                .await
                .map_err(|err| BrokerError::Registry(fsm_registry::RegistryError::Runtime(err)))
        }
        "broadcast" => {
            let machine = message
                .get("machine")
                .and_then(|v| v.as_str())
                .ok_or_else(|| BrokerError::MalformedCommand("missing machine".to_string()))?;
            let state = message
                .get("state")
                .and_then(|v| v.as_str())
                .ok_or_else(|| BrokerError::MalformedCommand("missing state".to_string()))?;
            let event = parse_incoming_event(&message)?;
            runtime
                .broadcast_event(machine, state, event)
                .await
                .map(|_count| ())
                .map_err(|err| BrokerError::Registry(fsm_registry::RegistryError::Runtime(err)))
        }
        other => {
            warn!(command = other, "unrecognized broker command, ignoring");
            Ok(())
        }
    }
}

fn parse_instance_id(message: &serde_json::Value) -> Result<fsm_core::InstanceId, BrokerError> {
    message
        .get("instanceId")
        .and_then(|v| v.as_str())
        .map(fsm_core::InstanceId::from_string)
        .ok_or_else(|| BrokerError::MalformedCommand("missing instanceId".to_string()))
}

fn parse_incoming_event(message: &serde_json::Value) -> Result<fsm_core::IncomingEvent, BrokerError> {
    let event_type = message
        .get("eventType")
        .and_then(|v| v.as_str())
        .ok_or_else(|| BrokerError::MalformedCommand("missing eventType".to_string()))?;
    let payload = message.get("payload").cloned().unwrap_or(serde_json::Value::Null);
    // `occurred_at_ms` is only carried if the sender included it; otherwise
    // this hop's receipt time stands in, same as any other inbound edge.
    let occurred_at_ms = message
        .get("occurredAtMs")
        .and_then(|v| v.as_u64())
        .unwrap_or_else(|| {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0)
        });
    Ok(fsm_core::IncomingEvent::new(event_type, payload, occurred_at_ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fsm_core::test_support::{component, machine, state, transition};
    use fsm_core::{FakeClock, InstanceId, StateKind};
    use fsm_engine::{Engine, HookRegistry};
    use fsm_storage::{InMemoryEventStore, InMemorySnapshotStore, PersistenceConfig};
    use fsm_timer::TimerService;

    use crate::broker::InMemoryBroker;

    fn runtime_for(name: &str) -> Arc<dyn Runtime> {
        let clock = FakeClock::new();
        let order_machine = machine("Order", "Pending")
            .state(state("Pending", StateKind::Entry))
            .state(state("Active", StateKind::Regular))
            .transition(transition("Pending", "Active", "GO"))
            .build();
        let comp = component(name).machine(order_machine).build();
        let events: Arc<dyn fsm_storage::EventStore> = Arc::new(InMemoryEventStore::new());
        let snapshots: Arc<dyn fsm_storage::SnapshotStore> = Arc::new(InMemorySnapshotStore::new());
        let persistence = Arc::new(fsm_storage::PersistenceManager::new(
            clock.clone(),
            PersistenceConfig::default(),
            events,
            snapshots,
        ));
        let (timers, _fire_rx) = TimerService::new(clock.clone());
        Arc::new(Engine::new(comp, clock, persistence, Arc::new(timers), HookRegistry::new(), None).expect("valid"))
    }

    #[tokio::test]
    async fn connect_announces_presence() {
        let runtime = runtime_for("Orders");
        let broker = Arc::new(InMemoryBroker::new());
        let received = Arc::new(tokio::sync::Mutex::new(None));
        let store = received.clone();
        broker
            .subscribe(
                channels::REGISTRY_ANNOUNCE,
                Arc::new(move |msg| {
                    let store = store.clone();
                    Box::pin(async move {
                        *store.lock().await = Some(msg);
                    })
                }),
            )
            .await
            .expect("subscribe");

        let broadcaster = Arc::new(Broadcaster::new(runtime, broker));
        broadcaster.connect().await.expect("connect");
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        let announced = received.lock().await.clone().expect("announcement received");
        assert_eq!(announced["componentName"], "Orders");
        broadcaster.disconnect().await.expect("disconnect");
    }

    #[tokio::test]
    async fn state_change_is_mirrored_onto_broker() {
        let runtime = runtime_for("Orders");
        let broker = Arc::new(InMemoryBroker::new());
        let received = Arc::new(tokio::sync::Mutex::new(Vec::new()));
        let store = received.clone();
        broker
            .subscribe(
                channels::EVENTS_STATE_CHANGE,
                Arc::new(move |msg| {
                    let store = store.clone();
                    Box::pin(async move {
                        store.lock().await.push(msg);
                    })
                }),
            )
            .await
            .expect("subscribe");

        let broadcaster = Arc::new(Broadcaster::new(runtime.clone(), broker));
        broadcaster.connect().await.expect("connect");

        let id = InstanceId::new();
        runtime.create_instance_with_id("Order", id, serde_json::json!({})).await.expect("create");
        runtime
            .send_event(id, fsm_core::IncomingEvent::empty("GO", 0))
            .await
            .expect("send");

        for _ in 0..20 {
            tokio::task::yield_now().await;
        }

        let mirrored = received.lock().await;
        assert!(mirrored.iter().any(|m| m["to"] == "Active"));
        broadcaster.disconnect().await.expect("disconnect");
    }

    #[tokio::test]
    async fn broadcast_channel_reaches_the_runtime() {
        let runtime = runtime_for("Orders");
        runtime
            .create_instance_with_id("Order", InstanceId::new(), serde_json::json!({}))
            .await
            .expect("create");
        let broker = Arc::new(InMemoryBroker::new());
        let broadcaster = Arc::new(Broadcaster::new(runtime.clone(), broker.clone()));
        broadcaster.connect().await.expect("connect");

        broker
            .publish(
                &channels::component_channel("Orders"),
                serde_json::json!({
                    "command": "broadcast",
                    "machine": "Order",
                    "state": "Pending",
                    "eventType": "GO",
                }),
            )
            .await
            .expect("publish");

        for _ in 0..20 {
            tokio::task::yield_now().await;
        }

        let instances = runtime.event_store().all().await.expect("events");
        assert!(instances.iter().any(|e| e.event.event_type == "GO"));
        broadcaster.disconnect().await.expect("disconnect");
    }

    #[tokio::test]
    async fn malformed_command_disconnects_and_emits_broker_disconnected() {
        let runtime = runtime_for("Orders");
        let broker = Arc::new(InMemoryBroker::new());
        let broadcaster = Arc::new(Broadcaster::new(runtime, broker.clone()));
        let mut events = broadcaster.subscribe();
        broadcaster.connect().await.expect("connect");

        broker
            .publish(&channels::commands("Orders"), serde_json::json!({"command": "sendEvent"}))
            .await
            .expect("publish");

        for _ in 0..20 {
            tokio::task::yield_now().await;
        }

        let event = events.recv().await.expect("broker_disconnected");
        assert!(matches!(event, EngineEvent::BrokerDisconnected { .. }));
        broadcaster.disconnect().await.expect("disconnect");
    }
}
