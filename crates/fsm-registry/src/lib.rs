// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fsm-registry: the component registry (§4.4). Owns the directory of
//! components running in one process, routes cross-component sends and
//! broadcasts, and answers cross-component instance lookup and history
//! queries. Implements `fsm-engine`'s `CrossComponent` trait so engines
//! can reach it without depending on it directly.

pub mod error;
pub mod registry;
pub mod runtime;

pub use error::RegistryError;
pub use registry::{ComponentInfo, FoundInstance, Registry};
pub use runtime::Runtime;
