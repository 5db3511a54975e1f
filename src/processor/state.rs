//! Processor lifecycle state machine
//!
//! ```text
//!  Created ──start──▶ Running ──stop──▶ StopRequested ──last worker exits──▶ Stopped
//!     │                  │                    ▲
//!     │                  │ queue drained,     │ stop
//!     │                  ▼ workers exited     │
//!     │            AllThreadsExited ──────────┘
//!     └──────────────────────stop───────────────────────────────────────────▶ Stopped
//! ```
//!
//! Transitions only move forward. `Stopped` is terminal.

use crate::core::sync::lock_or_fail;
use crate::queue::QueueResult;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    strum_macros::Display,
    strum_macros::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProcessorState {
    Created,
    Running,
    StopRequested,
    /// Every worker left on its own before anyone asked it to stop
    AllThreadsExited,
    Stopped,
}

impl ProcessorState {
    /// No worker will ever run again from this state
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            ProcessorState::Stopped | ProcessorState::AllThreadsExited
        )
    }
}

pub(crate) struct LifecycleData {
    pub state: ProcessorState,
    pub started_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub disposed: bool,
}

impl LifecycleData {
    /// Move to `next` and stamp the stop time when the state is final
    pub fn transition(&mut self, next: ProcessorState) {
        if self.state == next {
            return;
        }
        log::debug!("Processor state {} -> {}", self.state, next);
        self.state = next;
        match next {
            ProcessorState::Running => self.started_at = Some(Utc::now()),
            ProcessorState::Stopped | ProcessorState::AllThreadsExited => {
                self.stopped_at.get_or_insert_with(Utc::now);
            }
            _ => {}
        }
    }
}

/// Shared between the processor and the exit hook run by its last worker
pub(crate) struct Lifecycle {
    data: Mutex<LifecycleData>,
    changed: Condvar,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            data: Mutex::new(LifecycleData {
                state: ProcessorState::Created,
                started_at: None,
                stopped_at: None,
                disposed: false,
            }),
            changed: Condvar::new(),
        }
    }

    pub fn lock(&self) -> QueueResult<MutexGuard<'_, LifecycleData>> {
        lock_or_fail(self.data.lock())
    }

    /// Run `update` under the lock and wake state waiters
    pub fn update<R>(&self, update: impl FnOnce(&mut LifecycleData) -> R) -> QueueResult<R> {
        let mut data = self.lock()?;
        let result = update(&mut data);
        self.changed.notify_all();
        Ok(result)
    }

    pub fn state(&self) -> ProcessorState {
        match self.data.lock() {
            Ok(data) => data.state,
            Err(poisoned) => poisoned.into_inner().state,
        }
    }

    /// The last worker is gone
    pub fn on_all_threads_exited(&self) {
        let result = self.update(|data| match data.state {
            ProcessorState::Running => data.transition(ProcessorState::AllThreadsExited),
            ProcessorState::StopRequested => data.transition(ProcessorState::Stopped),
            _ => {}
        });
        if let Err(e) = result {
            log::warn!("Could not record worker exit: {}", e);
        }
    }

    /// Block until the state is finished; false if `timeout` passed first
    pub fn wait_finished(&self, timeout: Option<Duration>) -> QueueResult<bool> {
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        let mut data = self.lock()?;
        while !data.state.is_finished() {
            match deadline {
                None => data = lock_or_fail(self.changed.wait(data))?,
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(false);
                    }
                    let (guard, _) = lock_or_fail(self.changed.wait_timeout(data, deadline - now))?;
                    data = guard;
                }
            }
        }
        Ok(true)
    }
}
