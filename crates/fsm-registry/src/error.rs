// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for the component registry (§4.4).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("component already registered: {0}")]
    DuplicateComponent(String),

    #[error("no such component registered: {0}")]
    UnknownComponent(String),

    #[error(transparent)]
    Runtime(#[from] fsm_engine::EngineError),

    #[error(transparent)]
    Storage(#[from] fsm_storage::StorageError),
}
