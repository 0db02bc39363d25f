// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timer identity: which instance, which state, which transition kind.
//!
//! A `TimerId` encodes its own kind in its string form (`timeout:<state>:<instance>`)
//! the same way the teacher's `TimerKind::parse` round-trips a timer id string
//! rather than carrying a side table from id to meaning.

use fsm_core::InstanceId;

/// The two transition kinds the timer service ever arms (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerSlot {
    Timeout,
    Auto,
}

fsm_core::simple_display! {
    TimerSlot {
        Timeout => "timeout",
        Auto => "auto",
    }
}

/// Identifies one armed timer: an instance, the state it was armed for,
/// and whether it backs a `timeout` or `auto` transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerKey {
    pub instance_id: InstanceId,
    pub slot: TimerSlot,
}

impl TimerKey {
    pub fn new(instance_id: InstanceId, slot: TimerSlot) -> Self {
        Self { instance_id, slot }
    }
}

impl std::fmt::Display for TimerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.slot, self.instance_id)
    }
}
