// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("no persisted event with id {0}")]
    EventNotFound(fsm_core::EventId),
    #[error("backing store unavailable: {0}")]
    Unavailable(String),
}
