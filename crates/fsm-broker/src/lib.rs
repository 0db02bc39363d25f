// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fsm-broker: the broker adapter and broadcaster (§4.5). Carries a fixed
//! channel namespace over any pub/sub transport; ships an in-memory,
//! process-global implementation for monolith mode and tests. Pairs one
//! runtime with a broker connection via [`broadcaster::Broadcaster`].

pub mod broadcaster;
pub mod broker;
pub mod channels;
pub mod cross_component;
pub mod error;

pub use broadcaster::Broadcaster;
pub use broker::{Broker, BrokerHandler, HandlerFuture, InMemoryBroker, SubscriptionId};
pub use cross_component::BrokerCrossComponent;
pub use error::BrokerError;
