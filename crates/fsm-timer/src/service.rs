// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The timer service: owns every deferred firing for `timeout` and `auto`
//! transitions (§4.2). Firings re-enter the dispatcher queue over a
//! channel; the service itself never touches instance state directly.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use fsm_core::{Clock, InstanceId, PendingTimeout};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::kind::{TimerKey, TimerSlot};

/// Delivered to the dispatcher when an armed timer's deadline elapses.
/// The dispatcher synthesizes an `IncomingEvent { type: event, payload: {} }`
/// from this and routes it exactly like any other inbound event.
#[derive(Debug, Clone)]
pub struct TimerFired {
    pub instance_id: InstanceId,
    pub state: String,
    pub event: String,
}

struct Armed {
    state: String,
    fires_event: String,
    due_at_ms: u64,
    handle: JoinHandle<()>,
}

/// Result of `resynchronize`: timers rebuilt vs. timers whose `dueAt` had
/// already elapsed and were fired immediately (§4.2, §4.3).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResyncResult {
    pub synced: usize,
    pub expired: usize,
}

pub struct TimerService<C: Clock> {
    clock: C,
    fire_tx: mpsc::UnboundedSender<TimerFired>,
    armed: Arc<Mutex<HashMap<TimerKey, Armed>>>,
}

impl<C: Clock> TimerService<C> {
    pub fn new(clock: C) -> (Self, mpsc::UnboundedReceiver<TimerFired>) {
        let (fire_tx, fire_rx) = mpsc::unbounded_channel();
        (Self { clock, fire_tx, armed: Arc::new(Mutex::new(HashMap::new())) }, fire_rx)
    }

    /// Arm a `timeout`/`auto` transition for `state`, firing `fires_event`
    /// after `delay`. Replaces any timer already armed for the same slot.
    pub fn schedule(
        &self,
        instance_id: InstanceId,
        slot: TimerSlot,
        state: impl Into<String>,
        fires_event: impl Into<String>,
        delay: Duration,
    ) {
        let state = state.into();
        let fires_event = fires_event.into();
        let key = TimerKey::new(instance_id, slot);
        let due_at_ms = self.clock.epoch_ms() + delay.as_millis() as u64;

        self.cancel(instance_id, slot);

        let tx = self.fire_tx.clone();
        let fired_state = state.clone();
        let fired_event = fires_event.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Receiver gone means the runtime is shutting down; nothing to do.
            let _ = tx.send(TimerFired { instance_id, state: fired_state, event: fired_event });
        });

        self.armed.lock().insert(key, Armed { state, fires_event, due_at_ms, handle });
        tracing::debug!(%instance_id, %slot, due_at_ms, "timer armed");
    }

    /// Arm from an absolute `dueAt`, as restore does. Fires immediately
    /// (without spawning a sleep) if `dueAt` has already elapsed, and
    /// reports that via the returned `bool` (`false` == expired).
    pub fn schedule_absolute(
        &self,
        instance_id: InstanceId,
        slot: TimerSlot,
        state: impl Into<String>,
        fires_event: impl Into<String>,
        due_at_ms: u64,
    ) -> bool {
        let now = self.clock.epoch_ms();
        if due_at_ms <= now {
            let state = state.into();
            let fires_event = fires_event.into();
            tracing::debug!(%instance_id, %slot, due_at_ms, now, "timer expired during restore, firing immediately");
            let _ = self.fire_tx.send(TimerFired { instance_id, state, event: fires_event });
            false
        } else {
            self.schedule(instance_id, slot, state, fires_event, Duration::from_millis(due_at_ms - now));
            true
        }
    }

    /// Cancel the timer (if any) armed for `(instance_id, slot)`.
    pub fn cancel(&self, instance_id: InstanceId, slot: TimerSlot) {
        if let Some(armed) = self.armed.lock().remove(&TimerKey::new(instance_id, slot)) {
            armed.handle.abort();
        }
    }

    /// Cancel every timer armed for `instance_id` — state exit, disposal.
    pub fn cancel_all(&self, instance_id: InstanceId) {
        self.cancel(instance_id, TimerSlot::Timeout);
        self.cancel(instance_id, TimerSlot::Auto);
    }

    /// The original firing time of a still-armed timer, used to preserve
    /// it across a self-loop with `resetOnSelfLoop = false`.
    pub fn due_at(&self, instance_id: InstanceId, slot: TimerSlot) -> Option<u64> {
        self.armed.lock().get(&TimerKey::new(instance_id, slot)).map(|a| a.due_at_ms)
    }

    /// Pending timers for `instance_id`, in the shape a [`Snapshot`](fsm_core::Snapshot) stores them.
    pub fn snapshot_pending(&self, instance_id: InstanceId) -> Vec<PendingTimeout> {
        let armed = self.armed.lock();
        [TimerSlot::Timeout, TimerSlot::Auto]
            .into_iter()
            .filter_map(|slot| armed.get(&TimerKey::new(instance_id, slot)))
            .map(|a| PendingTimeout {
                state: a.state.clone(),
                due_at_ms: a.due_at_ms,
                fires_event: a.fires_event.clone(),
            })
            .collect()
    }
}

impl<C: Clock> Drop for TimerService<C> {
    fn drop(&mut self) {
        for armed in self.armed.lock().values() {
            armed.handle.abort();
        }
    }
}

/// Rebuild timers for every `(instance, pending timeout, slot)` triple a
/// caller has classified from restored snapshots (§4.3 `resynchronizeTimeouts`).
pub fn resynchronize<C: Clock>(
    service: &TimerService<C>,
    pending: impl IntoIterator<Item = (InstanceId, PendingTimeout, TimerSlot)>,
) -> ResyncResult {
    let mut result = ResyncResult::default();
    for (instance_id, timeout, slot) in pending {
        let armed =
            service.schedule_absolute(instance_id, slot, timeout.state, timeout.fires_event, timeout.due_at_ms);
        if armed {
            result.synced += 1;
        } else {
            result.expired += 1;
        }
    }
    result
}
