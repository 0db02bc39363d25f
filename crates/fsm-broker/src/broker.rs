// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `Broker` adapter contract (§4.5) and its in-memory implementation,
//! the process-global singleton used for monolith mode and tests. Network
//! brokers (AMQP, Redis) satisfy the same trait; this crate ships only
//! the in-memory one.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::error::BrokerError;

pub type HandlerFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// A subscriber callback: invoked once per message published on the
/// channel it was registered against. Fire-and-forget from the
/// publisher's perspective (§5 "Broker publishes are fire-and-forget").
pub type BrokerHandler = Arc<dyn Fn(Value) -> HandlerFuture + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[async_trait]
pub trait Broker: Send + Sync {
    async fn connect(&self) -> Result<(), BrokerError>;

    async fn disconnect(&self) -> Result<(), BrokerError>;

    async fn publish(&self, channel: &str, message: Value) -> Result<(), BrokerError>;

    async fn subscribe(&self, channel: &str, handler: BrokerHandler) -> Result<SubscriptionId, BrokerError>;

    async fn unsubscribe(&self, channel: &str, subscription: SubscriptionId) -> Result<(), BrokerError>;
}

/// Process-global in-memory broker: a channel name maps to the list of
/// handlers subscribed to it. `publish` invokes every handler as a
/// detached task so a slow or failing subscriber never blocks the
/// publisher (the same "never bypasses, never blocks" posture the
/// dispatcher holds for hooks).
#[derive(Default)]
pub struct InMemoryBroker {
    connected: std::sync::atomic::AtomicBool,
    channels: RwLock<HashMap<String, Vec<(SubscriptionId, BrokerHandler)>>>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn connect(&self) -> Result<(), BrokerError> {
        self.connected.store(true, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), BrokerError> {
        self.connected.store(false, std::sync::atomic::Ordering::SeqCst);
        self.channels.write().clear();
        Ok(())
    }

    async fn publish(&self, channel: &str, message: Value) -> Result<(), BrokerError> {
        if !self.connected.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(BrokerError::NotConnected);
        }
        let handlers: Vec<BrokerHandler> = self
            .channels
            .read()
            .get(channel)
            .map(|subs| subs.iter().map(|(_, h)| h.clone()).collect())
            .unwrap_or_default();
        for handler in handlers {
            let message = message.clone();
            tokio::spawn(async move {
                handler(message).await;
            });
        }
        Ok(())
    }

    async fn subscribe(&self, channel: &str, handler: BrokerHandler) -> Result<SubscriptionId, BrokerError> {
        let id = SubscriptionId::new();
        self.channels.write().entry(channel.to_string()).or_default().push((id, handler));
        Ok(id)
    }

    async fn unsubscribe(&self, channel: &str, subscription: SubscriptionId) -> Result<(), BrokerError> {
        let mut channels = self.channels.write();
        let Some(subs) = channels.get_mut(channel) else {
            return Err(BrokerError::UnknownSubscription(subscription.to_string(), channel.to_string()));
        };
        let before = subs.len();
        subs.retain(|(id, _)| *id != subscription);
        if subs.len() == before {
            warn!(%channel, %subscription, "unsubscribe: subscription not found");
            return Err(BrokerError::UnknownSubscription(subscription.to_string(), channel.to_string()));
        }
        Ok(())
    }
}
