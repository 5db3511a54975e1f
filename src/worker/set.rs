//! WorkerThreadSet - a fixed set of threads draining one queue
//!
//! Each worker runs the same loop: take an item (blocking, cancelable by the
//! set's take token), mark itself active, run the handler under the set's
//! hard-stop token, mark itself idle. A take that reports end of stream,
//! cancellation or disposal ends the loop.
//!
//! Stopping is two-phase. [`StopOptions`] decides whether workers drain what
//! is queued or leave after their current item, whether in-flight handlers see
//! a cancelled token, and whether the caller waits for the threads to exit.

use crate::core::cancellation::CancellationToken;
use crate::core::sync::{handle_rwlock_read, handle_rwlock_write, lock_or_fail};
use crate::queue::{BlockingQueue, QueueError, QueueResult};
use crate::worker::fault::{panic_message, FaultCallback, FaultKind, HandlerError, HandlerFault};
use crate::worker::thread_factory::{ThreadFactory, ThreadPriority, ThreadSpec};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, RwLock};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

/// User code run once per item
///
/// The token is the set's hard-stop token; long-running handlers should poll
/// it and return early once it fires.
pub type ItemHandler<T> =
    Arc<dyn Fn(T, &CancellationToken) -> Result<(), HandlerError> + Send + Sync>;

/// Wrap a closure as an [`ItemHandler`]
pub fn item_handler<T, F>(handler: F) -> ItemHandler<T>
where
    F: Fn(T, &CancellationToken) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    Arc::new(handler)
}

/// Called once, on the last worker to exit
pub(crate) type ExitHook = Arc<dyn Fn() + Send + Sync>;

/// How a stop request treats queued and in-flight work
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopOptions {
    /// Block until every worker thread has exited
    pub wait_for_completion: bool,
    /// Drain queued items before exiting; otherwise leave after the current one
    pub let_finish_process: bool,
    /// Cancel the token passed to running handlers
    pub hard_stop: bool,
}

impl StopOptions {
    pub fn new(wait_for_completion: bool, let_finish_process: bool, hard_stop: bool) -> Self {
        Self {
            wait_for_completion,
            let_finish_process,
            hard_stop,
        }
    }

    /// Drain everything, let handlers finish, wait
    pub fn graceful() -> Self {
        Self::new(true, true, false)
    }

    /// Abandon queued items, cancel handlers, wait
    pub fn immediate() -> Self {
        Self::new(true, false, true)
    }
}

/// Construction parameters for a [`WorkerThreadSet`]
#[derive(Clone)]
pub struct WorkerSettings {
    /// Prefix for thread names; worker `i` is named `{name}-{i}`
    pub name: String,
    pub thread_count: usize,
    pub priority: ThreadPriority,
    pub is_background: bool,
    pub thread_factory: Arc<dyn ThreadFactory>,
    pub fault_callback: Option<FaultCallback>,
}

struct WorkerRecord {
    index: usize,
    name: String,
    active: AtomicBool,
}

struct SetShared<T> {
    queue: Arc<dyn BlockingQueue<T>>,
    handler: ItemHandler<T>,
    fault_callback: Option<FaultCallback>,
    take_token: CancellationToken,
    hard_stop_token: CancellationToken,
    records: Vec<WorkerRecord>,
    thread_ids: RwLock<HashMap<ThreadId, usize>>,
    active: AtomicUsize,
    alive: Mutex<usize>,
    all_exited: Condvar,
    exit_hook: Mutex<Option<ExitHook>>,
    processed: AtomicU64,
    faulted: AtomicU64,
}

/// Marks a worker active for as long as it lives
struct ActiveGuard<'a> {
    record: &'a WorkerRecord,
    active: &'a AtomicUsize,
}

impl<'a> ActiveGuard<'a> {
    fn enter(record: &'a WorkerRecord, active: &'a AtomicUsize) -> Self {
        record.active.store(true, Ordering::Release);
        active.fetch_add(1, Ordering::AcqRel);
        Self { record, active }
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.record.active.store(false, Ordering::Release);
        self.active.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Runs when a worker leaves its loop, however it leaves
struct ExitGuard<'a, T> {
    shared: &'a SetShared<T>,
}

impl<T> Drop for ExitGuard<'_, T> {
    fn drop(&mut self) {
        if let Ok(mut ids) = self.shared.thread_ids.write() {
            ids.remove(&thread::current().id());
        }
        self.shared.release_threads(1);
    }
}

impl<T> SetShared<T> {
    fn lock_alive(&self) -> MutexGuard<'_, usize> {
        match self.alive.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Drop `count` threads from the alive tally, firing the exit hook at zero
    fn release_threads(&self, count: usize) {
        let now_empty = {
            let mut alive = self.lock_alive();
            *alive = alive.saturating_sub(count);
            if *alive == 0 {
                self.all_exited.notify_all();
            }
            *alive == 0
        };
        if now_empty {
            let hook = match self.exit_hook.lock() {
                Ok(hook) => hook.clone(),
                Err(poisoned) => poisoned.into_inner().clone(),
            };
            if let Some(hook) = hook {
                hook();
            }
        }
    }

    fn report_fault(&self, fault: HandlerFault) {
        self.faulted.fetch_add(1, Ordering::Relaxed);
        log::error!("{}", fault);

        if let Some(callback) = &self.fault_callback {
            if catch_unwind(AssertUnwindSafe(|| callback(&fault))).is_err() {
                log::warn!(
                    "Fault callback panicked while reporting a fault from {}",
                    fault.thread_name
                );
            }
        }
    }

    fn process(&self, record: &WorkerRecord, item: T) {
        let _active = ActiveGuard::enter(record, &self.active);
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            (self.handler)(item, &self.hard_stop_token)
        }));

        let kind = match outcome {
            Ok(Ok(())) => {
                self.processed.fetch_add(1, Ordering::Relaxed);
                return;
            }
            Ok(Err(error)) => FaultKind::Error(error),
            Err(payload) => FaultKind::Panic(panic_message(&*payload)),
        };
        self.report_fault(HandlerFault {
            worker_index: record.index,
            thread_name: record.name.clone(),
            kind,
        });
    }
}

fn run_worker<T: Send + 'static>(shared: Arc<SetShared<T>>, index: usize) {
    let shared = &*shared;
    let _exit = ExitGuard { shared };
    let record = &shared.records[index];

    if let Ok(mut ids) = handle_rwlock_write(shared.thread_ids.write(), |message| {
        QueueError::OperationFailed { message }
    }) {
        ids.insert(thread::current().id(), index);
    }
    log::debug!("Worker {} started", record.name);

    loop {
        match shared.queue.try_take(None, &shared.take_token) {
            Ok(Some(item)) => {
                log::trace!("Worker {} took an item", record.name);
                shared.process(record, item);
            }
            Ok(None) => {
                log::debug!("Worker {} exiting: queue drained", record.name);
                break;
            }
            Err(QueueError::Cancelled) => {
                log::debug!("Worker {} exiting: stop requested", record.name);
                break;
            }
            Err(QueueError::Disposed) => {
                log::debug!("Worker {} exiting: queue disposed", record.name);
                break;
            }
            Err(e) => {
                log::warn!("Worker {} exiting on queue error: {}", record.name, e);
                break;
            }
        }
    }
}

/// A fixed number of worker threads pulling from one shared queue
pub struct WorkerThreadSet<T> {
    shared: Arc<SetShared<T>>,
    priority: ThreadPriority,
    is_background: bool,
    thread_factory: Arc<dyn ThreadFactory>,
    started: AtomicBool,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl<T: Send + 'static> WorkerThreadSet<T> {
    pub fn new(
        queue: Arc<dyn BlockingQueue<T>>,
        handler: ItemHandler<T>,
        settings: WorkerSettings,
    ) -> Self {
        let records = (0..settings.thread_count)
            .map(|index| WorkerRecord {
                index,
                name: format!("{}-{}", settings.name, index),
                active: AtomicBool::new(false),
            })
            .collect();

        Self {
            shared: Arc::new(SetShared {
                queue,
                handler,
                fault_callback: settings.fault_callback,
                take_token: CancellationToken::new(),
                hard_stop_token: CancellationToken::new(),
                records,
                thread_ids: RwLock::new(HashMap::new()),
                active: AtomicUsize::new(0),
                alive: Mutex::new(0),
                all_exited: Condvar::new(),
                exit_hook: Mutex::new(None),
                processed: AtomicU64::new(0),
                faulted: AtomicU64::new(0),
            }),
            priority: settings.priority,
            is_background: settings.is_background,
            thread_factory: settings.thread_factory,
            started: AtomicBool::new(false),
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Install the hook run by the last worker to exit
    pub(crate) fn set_exit_hook(&self, hook: ExitHook) {
        match self.shared.exit_hook.lock() {
            Ok(mut slot) => *slot = Some(hook),
            Err(poisoned) => *poisoned.into_inner() = Some(hook),
        }
    }

    /// Spawn every worker thread
    ///
    /// If a spawn fails, the threads already running are told to leave and
    /// the spawn error is returned.
    pub fn start(&self) -> QueueResult<()> {
        if self.shared.queue.is_disposed() {
            return Err(QueueError::Disposed);
        }
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(QueueError::AlreadyStarted);
        }

        let mut handles = lock_or_fail(self.handles.lock())?;
        let total = self.shared.records.len();
        // Count every thread up front so an early exit cannot reach zero
        *self.shared.lock_alive() = total;

        for record in &self.shared.records {
            let spec = ThreadSpec {
                name: record.name.clone(),
                priority: self.priority,
                is_background: self.is_background,
            };
            let shared = Arc::clone(&self.shared);
            let index = record.index;

            match self
                .thread_factory
                .spawn(&spec, Box::new(move || run_worker(shared, index)))
            {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    log::warn!("Could not start {}: {}", record.name, e);
                    self.shared.take_token.cancel();
                    self.shared.release_threads(total - record.index);
                    return Err(e);
                }
            }
        }

        log::debug!("Started {} worker threads", total);
        Ok(())
    }

    /// Ask the workers to stop, optionally waiting for them
    ///
    /// Safe to call repeatedly; later calls can escalate earlier ones, e.g. a
    /// soft stop followed by a hard one.
    pub fn stop(&self, options: StopOptions) -> QueueResult<()> {
        log::debug!(
            "Stopping workers (wait={}, drain={}, hard={})",
            options.wait_for_completion,
            options.let_finish_process,
            options.hard_stop
        );

        if options.hard_stop {
            self.shared.hard_stop_token.cancel();
        }
        if !options.let_finish_process {
            self.shared.take_token.cancel();
        }
        match self.shared.queue.complete_adding() {
            Ok(()) | Err(QueueError::Disposed) => {}
            Err(e) => return Err(e),
        }

        if options.wait_for_completion {
            self.join()?;
        }
        Ok(())
    }

    /// Wait for every worker to exit and reap their handles
    ///
    /// Called from a worker thread this returns immediately: a worker cannot
    /// wait for itself.
    pub fn join(&self) -> QueueResult<()> {
        if self.is_worker_thread() {
            log::warn!(
                "Join requested from worker thread {:?}; not waiting",
                thread::current().name()
            );
            return Ok(());
        }

        self.wait_all_exited(None)?;

        let handles: Vec<_> = lock_or_fail(self.handles.lock())?.drain(..).collect();
        for handle in handles {
            let name = handle.thread().name().map(str::to_string);
            if handle.join().is_err() {
                log::warn!("Worker thread {:?} terminated by a panic", name);
            }
        }
        Ok(())
    }

    /// Block until no worker is alive; false if `timeout` passed first
    pub fn wait_all_exited(&self, timeout: Option<Duration>) -> QueueResult<bool> {
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        let mut alive = lock_or_fail(self.shared.alive.lock())?;
        while *alive > 0 {
            match deadline {
                None => alive = lock_or_fail(self.shared.all_exited.wait(alive))?,
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(false);
                    }
                    let (guard, _) =
                        lock_or_fail(self.shared.all_exited.wait_timeout(alive, deadline - now))?;
                    alive = guard;
                }
            }
        }
        Ok(true)
    }

    /// True when called from one of this set's worker threads
    pub fn is_worker_thread(&self) -> bool {
        handle_rwlock_read(self.shared.thread_ids.read(), |message| {
            QueueError::OperationFailed { message }
        })
        .map(|ids| ids.contains_key(&thread::current().id()))
        .unwrap_or(false)
    }

    /// Index of the calling worker thread, if it is one
    pub fn current_worker_index(&self) -> Option<usize> {
        handle_rwlock_read(self.shared.thread_ids.read(), |message| {
            QueueError::OperationFailed { message }
        })
        .ok()
        .and_then(|ids| ids.get(&thread::current().id()).copied())
    }

    pub fn thread_count(&self) -> usize {
        self.shared.records.len()
    }

    /// Workers currently inside the handler
    pub fn active_thread_count(&self) -> usize {
        self.shared.active.load(Ordering::Acquire)
    }

    /// Per-worker activity flags, indexed by worker
    pub fn activity(&self) -> Vec<bool> {
        self.shared
            .records
            .iter()
            .map(|record| record.active.load(Ordering::Acquire))
            .collect()
    }

    /// Worker threads that have not yet left their loop
    pub fn alive_thread_count(&self) -> usize {
        *self.shared.lock_alive()
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Items whose handler returned `Ok`
    pub fn processed_count(&self) -> u64 {
        self.shared.processed.load(Ordering::Relaxed)
    }

    /// Items whose handler returned `Err` or panicked
    pub fn faulted_count(&self) -> u64 {
        self.shared.faulted.load(Ordering::Relaxed)
    }

    pub fn is_hard_stop_requested(&self) -> bool {
        self.shared.hard_stop_token.is_cancelled()
    }
}

impl<T> fmt::Debug for WorkerThreadSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerThreadSet")
            .field("thread_count", &self.shared.records.len())
            .field("active", &self.shared.active.load(Ordering::Relaxed))
            .field("started", &self.started.load(Ordering::Relaxed))
            .field("priority", &self.priority)
            .field("is_background", &self.is_background)
            .finish_non_exhaustive()
    }
}
