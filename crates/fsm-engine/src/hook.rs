// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User-defined side-effect hooks (§4.1 `onEntry`/`onExit`/`triggeredMethod`).
//!
//! The runtime never executes author-supplied code beyond declarative
//! boolean expressions (§1 Non-goals), so a hook name is a lookup key into
//! a registry of Rust closures the embedder supplies — not a dynamically
//! dispatched method name resolved at runtime.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use fsm_core::{IncomingEvent, Instance, InstanceId};
use serde_json::Value;

use crate::sender::Sender;

/// View of the firing instance handed to a hook, plus the capability to
/// request further effects.
pub struct HookContext<'a> {
    pub instance_id: InstanceId,
    pub machine_name: &'a str,
    pub state: &'a str,
    pub event: &'a IncomingEvent,
    pub instance: &'a Instance,
    pub sender: &'a Sender,
}

/// A patch merged into the instance's `context` after the hook returns.
/// Empty for hooks that only use the `Sender` to request effects.
pub type HookOutput = HashMap<String, Value>;

/// Hooks report failure by returning `Err` rather than panicking — the
/// workspace denies `panic!`/`unwrap`/`expect` outside tests, so a hook
/// "exception" (§7 point 4) is modeled as a `Result`, not an unwind the
/// dispatcher would need to catch. The commit has already succeeded by
/// the time a hook runs; a failing hook surfaces `hook_error` and is
/// otherwise inert.
pub type HookResult = Result<HookOutput, String>;

pub type HookFuture<'a> = Pin<Box<dyn Future<Output = HookResult> + Send + 'a>>;

pub type HookFn = Arc<dyn for<'a> Fn(HookContext<'a>) -> HookFuture<'a> + Send + Sync>;

/// Name-keyed lookup table the embedder populates with the hook closures
/// named by `onEntry`/`onExit`/`triggeredMethod` in the component
/// declaration. A name with no registered closure is a silent no-op,
/// matching the "optional hook name" shape of `State`/`Transition`.
#[derive(Clone, Default)]
pub struct HookRegistry {
    hooks: HashMap<String, HookFn>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, hook: HookFn) {
        self.hooks.insert(name.into(), hook);
    }

    pub fn get(&self, name: &str) -> Option<&HookFn> {
        self.hooks.get(name)
    }
}
