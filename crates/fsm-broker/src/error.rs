// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for the broker adapter and broadcaster (§4.5).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("broker is not connected")]
    NotConnected,

    #[error("no subscription {0} on channel {1}")]
    UnknownSubscription(String, String),

    #[error("malformed broker command: {0}")]
    MalformedCommand(String),

    #[error(transparent)]
    Registry(#[from] fsm_registry::RegistryError),
}
