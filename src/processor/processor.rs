//! QueueProcessor - a queue and the worker threads that drain it
//!
//! The processor owns one [`BlockingQueue`] and one [`WorkerThreadSet`] and
//! ties their shutdown to a [`ProcessorState`] machine. Producers call the
//! `add` family; worker threads call the handler for each item.

use crate::core::cancellation::CancellationToken;
use crate::core::error_handling::log_error_with_context;
use crate::core::sync::lock_or_fail;
use crate::processor::config::ProcessorConfig;
use crate::processor::state::{Lifecycle, ProcessorState};
use crate::processor::stats::ProcessorStats;
use crate::queue::{AddOutcome, BlockingQueue, BoundedBlockingQueue, QueueError, QueueResult};
use crate::worker::{
    FaultCallback, HandlerError, HandlerFault, StdThreadFactory, StopOptions, ThreadFactory,
    WorkerSettings, WorkerThreadSet,
};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Configures optional collaborators before a processor is built
///
/// ```rust
/// use queue_processor::processor::{ProcessorConfig, QueueProcessor};
/// use queue_processor::worker::StopOptions;
///
/// let processor = QueueProcessor::builder(ProcessorConfig::new("doc").with_thread_count(2))
///     .on_fault(|fault| eprintln!("{}", fault))
///     .build(|item: u32, _token| {
///         if item == 0 {
///             return Err("zero is not allowed".into());
///         }
///         Ok(())
///     })
///     .unwrap();
///
/// processor.start().unwrap();
/// processor.add(1).unwrap();
/// processor.stop(StopOptions::graceful()).unwrap();
/// assert_eq!(processor.stats().processed, 1);
/// ```
pub struct QueueProcessorBuilder<T> {
    config: ProcessorConfig,
    fault_callback: Option<FaultCallback>,
    thread_factory: Option<Arc<dyn ThreadFactory>>,
    queue: Option<Arc<dyn BlockingQueue<T>>>,
}

impl<T: Send + 'static> QueueProcessorBuilder<T> {
    pub fn new(config: ProcessorConfig) -> Self {
        Self {
            config,
            fault_callback: None,
            thread_factory: None,
            queue: None,
        }
    }

    /// Receive every handler error or panic
    pub fn on_fault<F>(mut self, callback: F) -> Self
    where
        F: Fn(&HandlerFault) + Send + Sync + 'static,
    {
        self.fault_callback = Some(Arc::new(callback));
        self
    }

    pub fn thread_factory(mut self, factory: Arc<dyn ThreadFactory>) -> Self {
        self.thread_factory = Some(factory);
        self
    }

    /// Use an existing queue instead of building one from the config
    ///
    /// The config's capacity and store kind are ignored in that case.
    pub fn queue(mut self, queue: Arc<dyn BlockingQueue<T>>) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn build<F>(self, handler: F) -> QueueResult<QueueProcessor<T>>
    where
        F: Fn(T, &CancellationToken) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.config.validate()?;
        let config = self.config;

        let queue: Arc<dyn BlockingQueue<T>> = match self.queue {
            Some(queue) => {
                log::debug!("Processor '{}' uses an injected queue", config.name);
                queue
            }
            None => Arc::new(BoundedBlockingQueue::with_store(
                config.queue_capacity,
                config.store_kind,
            )),
        };
        if queue.is_disposed() {
            return Err(QueueError::Disposed);
        }

        let workers = WorkerThreadSet::new(
            Arc::clone(&queue),
            Arc::new(handler),
            WorkerSettings {
                name: config.name.clone(),
                thread_count: config.thread_count,
                priority: config.priority,
                is_background: config.is_background,
                thread_factory: self
                    .thread_factory
                    .unwrap_or_else(|| Arc::new(StdThreadFactory::new())),
                fault_callback: self.fault_callback,
            },
        );

        let lifecycle = Arc::new(Lifecycle::new());
        let hook_lifecycle = Arc::clone(&lifecycle);
        workers.set_exit_hook(Arc::new(move || hook_lifecycle.on_all_threads_exited()));

        log::debug!(
            "Created processor '{}' ({} threads, capacity {:?}, {} store)",
            config.name,
            config.thread_count,
            queue.capacity(),
            config.store_kind
        );

        Ok(QueueProcessor {
            name: config.name,
            is_background: config.is_background,
            queue,
            workers,
            lifecycle,
            control: Mutex::new(()),
        })
    }
}

enum StopAction {
    Nothing,
    CloseQueue,
    SignalWorkers,
}

/// A bounded work queue drained by a fixed set of worker threads
///
/// Dropping a foreground processor disposes it and waits for its workers.
/// Dropping a background processor requests a hard stop and returns at once.
pub struct QueueProcessor<T: Send + 'static> {
    name: String,
    is_background: bool,
    queue: Arc<dyn BlockingQueue<T>>,
    workers: WorkerThreadSet<T>,
    lifecycle: Arc<Lifecycle>,
    // Held by start until every worker is spawned, and by stop and dispose
    // while they signal the workers. Never held across a join.
    control: Mutex<()>,
}

impl<T: Send + 'static> QueueProcessor<T> {
    pub fn new<F>(config: ProcessorConfig, handler: F) -> QueueResult<Self>
    where
        F: Fn(T, &CancellationToken) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        QueueProcessorBuilder::new(config).build(handler)
    }

    pub fn builder(config: ProcessorConfig) -> QueueProcessorBuilder<T> {
        QueueProcessorBuilder::new(config)
    }

    /// Spawn the worker threads
    pub fn start(&self) -> QueueResult<()> {
        let _control = self.control()?;
        self.ensure_not_disposed()?;
        self.lifecycle.update(|data| match data.state {
            ProcessorState::Created => {
                data.transition(ProcessorState::Running);
                Ok(())
            }
            _ => Err(QueueError::AlreadyStarted),
        })??;

        if let Err(e) = self.workers.start() {
            log_error_with_context(&e, &format!("Starting processor '{}'", self.name));
            self.close_queue();
            self.lifecycle
                .update(|data| data.transition(ProcessorState::Stopped))?;
            return Err(e);
        }

        log::debug!(
            "Processor '{}' running with {} threads",
            self.name,
            self.workers.thread_count()
        );
        Ok(())
    }

    /// Add an item, waiting as long as it takes for space
    pub fn add(&self, item: T) -> QueueResult<()> {
        match self.try_add_with(item, None, &CancellationToken::none())? {
            AddOutcome::Added => Ok(()),
            AddOutcome::TimedOut(_) => Err(QueueError::OperationFailed {
                message: "unbounded wait reported a timeout".to_string(),
            }),
        }
    }

    /// Add an item only if there is space right now
    pub fn try_add(&self, item: T) -> QueueResult<AddOutcome<T>> {
        self.try_add_with(item, Some(Duration::ZERO), &CancellationToken::none())
    }

    pub fn try_add_timeout(&self, item: T, timeout: Duration) -> QueueResult<AddOutcome<T>> {
        self.try_add_with(item, Some(timeout), &CancellationToken::none())
    }

    pub fn try_add_with(
        &self,
        item: T,
        timeout: Option<Duration>,
        token: &CancellationToken,
    ) -> QueueResult<AddOutcome<T>> {
        self.ensure_not_disposed()?;
        self.queue.try_add(item, timeout, token)
    }

    /// Add an item past the capacity bound
    pub fn add_forced(&self, item: T) -> QueueResult<()> {
        self.ensure_not_disposed()?;
        self.queue.add_forced(item)
    }

    /// Stop accepting items; workers keep draining what is queued
    pub fn complete_adding(&self) -> QueueResult<()> {
        self.ensure_not_disposed()?;
        self.queue.complete_adding()
    }

    /// Ask the processor to stop
    ///
    /// A processor that never started moves straight to `Stopped`. Calling
    /// again while a stop is in progress applies the new options on top, so a
    /// soft stop can be escalated to a hard one. Stopping a disposed processor
    /// does nothing. A stop issued while `start` is spawning waits for it.
    pub fn stop(&self, options: StopOptions) -> QueueResult<()> {
        let control = self.control()?;
        let action = self.lifecycle.update(|data| {
            if data.disposed {
                return StopAction::Nothing;
            }
            match data.state {
                ProcessorState::Created => {
                    data.transition(ProcessorState::Stopped);
                    StopAction::CloseQueue
                }
                ProcessorState::Stopped => StopAction::Nothing,
                _ => {
                    data.transition(ProcessorState::StopRequested);
                    StopAction::SignalWorkers
                }
            }
        })?;

        match action {
            StopAction::Nothing => Ok(()),
            StopAction::CloseQueue => {
                self.close_queue();
                Ok(())
            }
            StopAction::SignalWorkers => {
                log::debug!("Stopping processor '{}'", self.name);
                self.workers.stop(StopOptions {
                    wait_for_completion: false,
                    ..options
                })?;
                drop(control);
                if options.wait_for_completion {
                    self.workers.join()?;
                }
                self.settle_if_exited();
                Ok(())
            }
        }
    }

    /// Block until the processor has stopped or its workers have all exited
    ///
    /// Returns at once when called from one of the processor's own workers.
    pub fn wait_until_stop(&self) -> QueueResult<()> {
        self.wait_for_stop(None).map(|_| ())
    }

    /// As [`wait_until_stop`](Self::wait_until_stop); false if `timeout` passed first
    pub fn wait_until_stop_timeout(&self, timeout: Duration) -> QueueResult<bool> {
        self.wait_for_stop(Some(timeout))
    }

    fn wait_for_stop(&self, timeout: Option<Duration>) -> QueueResult<bool> {
        self.ensure_not_disposed()?;
        if self.workers.is_worker_thread() {
            log::warn!(
                "Processor '{}': wait_until_stop called from a worker thread; not waiting",
                self.name
            );
            return Ok(false);
        }
        if !self.lifecycle.wait_finished(timeout)? {
            return Ok(false);
        }
        self.workers.join()?;
        Ok(true)
    }

    /// Hard stop, wait for the workers, then tear the queue down
    ///
    /// Anything still queued is dropped. Blocked producers are released with
    /// [`QueueError::Disposed`]. Safe to call more than once.
    pub fn dispose(&self) -> QueueResult<()> {
        let control = self.control()?;
        let was_started = self.lifecycle.update(|data| {
            if data.disposed {
                return None;
            }
            data.disposed = true;
            match data.state {
                ProcessorState::Created => {
                    data.transition(ProcessorState::Stopped);
                    Some(false)
                }
                ProcessorState::Stopped => Some(false),
                _ => {
                    data.transition(ProcessorState::StopRequested);
                    Some(true)
                }
            }
        })?;
        let Some(was_started) = was_started else {
            return Ok(());
        };

        log::debug!("Disposing processor '{}'", self.name);
        // Dispose first so blocked producers see Disposed, not AddingCompleted
        self.queue.dispose();
        if was_started {
            self.workers.stop(StopOptions {
                wait_for_completion: false,
                ..StopOptions::immediate()
            })?;
            drop(control);
            self.workers.join()?;
            self.settle_if_exited();
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ProcessorState {
        self.lifecycle.state()
    }

    /// Items waiting in the queue
    pub fn element_count(&self) -> usize {
        self.queue.len()
    }

    pub fn queue_capacity(&self) -> Option<usize> {
        self.queue.capacity()
    }

    pub fn thread_count(&self) -> usize {
        self.workers.thread_count()
    }

    pub fn active_thread_count(&self) -> usize {
        self.workers.active_thread_count()
    }

    pub fn is_adding_completed(&self) -> bool {
        self.queue.is_adding_completed()
    }

    pub fn is_background(&self) -> bool {
        self.is_background
    }

    pub fn is_disposed(&self) -> bool {
        match self.lifecycle.lock() {
            Ok(data) => data.disposed,
            Err(_) => true,
        }
    }

    /// True while workers are running or still finishing after a stop request
    pub fn is_work(&self) -> bool {
        match self.state() {
            ProcessorState::Running => true,
            ProcessorState::StopRequested => self.workers.alive_thread_count() > 0,
            _ => false,
        }
    }

    /// True when called from one of this processor's worker threads
    pub fn is_worker_thread(&self) -> bool {
        self.workers.is_worker_thread()
    }

    pub fn stats(&self) -> ProcessorStats {
        let (state, started_at, stopped_at) = match self.lifecycle.lock() {
            Ok(data) => (data.state, data.started_at, data.stopped_at),
            Err(_) => (self.lifecycle.state(), None, None),
        };
        ProcessorStats {
            name: self.name.clone(),
            state,
            processed: self.workers.processed_count(),
            faulted: self.workers.faulted_count(),
            thread_count: self.workers.thread_count(),
            active_threads: self.workers.active_thread_count(),
            queued: self.queue.len(),
            started_at,
            stopped_at,
        }
    }

    fn control(&self) -> QueueResult<MutexGuard<'_, ()>> {
        lock_or_fail(self.control.lock())
    }

    fn ensure_not_disposed(&self) -> QueueResult<()> {
        if self.is_disposed() {
            Err(QueueError::Disposed)
        } else {
            Ok(())
        }
    }

    fn close_queue(&self) {
        if let Err(e) = self.queue.complete_adding() {
            log::debug!("Processor '{}': queue already closed ({})", self.name, e);
        }
    }

    /// The exit hook cannot fire twice; cover workers that left before the request
    fn settle_if_exited(&self) {
        if self.workers.alive_thread_count() == 0 {
            self.lifecycle.on_all_threads_exited();
        }
    }
}

impl<T: Send + 'static> Drop for QueueProcessor<T> {
    fn drop(&mut self) {
        if self.is_disposed() {
            return;
        }
        let (result, context) = if self.is_background {
            (
                self.stop(StopOptions::new(false, false, true)),
                "Stopping background processor on drop",
            )
        } else {
            (self.dispose(), "Disposing processor on drop")
        };
        if let Err(e) = result {
            log_error_with_context(&e, context);
        }
    }
}

impl<T: Send + 'static> fmt::Debug for QueueProcessor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueProcessor")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("is_background", &self.is_background)
            .field("workers", &self.workers)
            .field("queued", &self.queue.len())
            .finish()
    }
}
