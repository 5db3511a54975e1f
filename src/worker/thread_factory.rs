//! Thread creation for worker threads
//!
//! The worker set never calls `std::thread::spawn` directly. It describes each
//! thread with a [`ThreadSpec`] and hands it to a [`ThreadFactory`], which lets
//! callers control naming, stack size and scheduling priority, or substitute
//! their own spawning policy in tests.

use crate::queue::{QueueError, QueueResult};
use serde::{Deserialize, Serialize};
use std::thread::{self, JoinHandle};

/// Scheduling priority requested for worker threads
///
/// Applied best-effort. On Linux it maps to a per-thread nice value; raising
/// priority above normal usually needs `CAP_SYS_NICE` and silently stays at
/// normal without it. Other platforms ignore it.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ThreadPriority {
    Lowest,
    BelowNormal,
    #[default]
    Normal,
    AboveNormal,
    Highest,
}

impl ThreadPriority {
    /// Nice value used on Linux
    pub fn nice_value(self) -> i32 {
        match self {
            ThreadPriority::Lowest => 19,
            ThreadPriority::BelowNormal => 10,
            ThreadPriority::Normal => 0,
            ThreadPriority::AboveNormal => -5,
            ThreadPriority::Highest => -10,
        }
    }
}

/// Everything a factory needs to know about one worker thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadSpec {
    pub name: String,
    pub priority: ThreadPriority,
    /// Background threads are not waited for when their owner is dropped
    pub is_background: bool,
}

/// Work to run on the new thread
pub type ThreadBody = Box<dyn FnOnce() + Send + 'static>;

/// Creates the OS threads that run worker loops
pub trait ThreadFactory: Send + Sync {
    fn spawn(&self, spec: &ThreadSpec, body: ThreadBody) -> QueueResult<JoinHandle<()>>;
}

/// Factory backed by [`std::thread::Builder`]
#[derive(Debug, Clone, Default)]
pub struct StdThreadFactory {
    stack_size: Option<usize>,
}

impl StdThreadFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }
}

impl ThreadFactory for StdThreadFactory {
    fn spawn(&self, spec: &ThreadSpec, body: ThreadBody) -> QueueResult<JoinHandle<()>> {
        let mut builder = thread::Builder::new().name(spec.name.clone());
        if let Some(bytes) = self.stack_size {
            builder = builder.stack_size(bytes);
        }

        let priority = spec.priority;
        builder
            .spawn(move || {
                apply_priority(priority);
                body()
            })
            .map_err(|e| QueueError::ThreadSpawn {
                name: spec.name.clone(),
                message: e.to_string(),
            })
    }
}

/// Apply `priority` to the calling thread, logging instead of failing
pub fn apply_priority(priority: ThreadPriority) {
    if priority == ThreadPriority::Normal {
        return;
    }
    if let Err(e) = set_current_thread_priority(priority) {
        log::debug!(
            "Could not set priority {} on thread {:?}: {}",
            priority,
            thread::current().name().unwrap_or("<unnamed>"),
            e
        );
    }
}

#[cfg(target_os = "linux")]
fn set_current_thread_priority(priority: ThreadPriority) -> std::io::Result<()> {
    // SAFETY: gettid has no preconditions and always succeeds
    let tid = unsafe { libc::syscall(libc::SYS_gettid) } as libc::id_t;
    // SAFETY: setpriority only reads its scalar arguments
    let rc = unsafe { libc::setpriority(libc::PRIO_PROCESS, tid, priority.nice_value()) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(target_os = "linux"))]
fn set_current_thread_priority(_priority: ThreadPriority) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "thread priority is only supported on Linux",
    ))
}
