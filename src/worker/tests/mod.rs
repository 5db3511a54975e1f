//! Worker thread set tests


#[cfg(test)]
pub(crate) mod support {
    use crate::queue::api::BoundedBlockingQueue;
    use crate::worker::api::{
        FaultCallback, ItemHandler, StdThreadFactory, ThreadPriority, WorkerSettings,
        WorkerThreadSet,
    };
    use std::sync::Arc;

    pub fn settings(name: &str, thread_count: usize) -> WorkerSettings {
        WorkerSettings {
            name: name.to_string(),
            thread_count,
            priority: ThreadPriority::Normal,
            is_background: false,
            thread_factory: Arc::new(StdThreadFactory::new()),
            fault_callback: None,
        }
    }

    pub fn worker_set<T: Send + 'static>(
        name: &str,
        thread_count: usize,
        capacity: Option<usize>,
        handler: ItemHandler<T>,
        fault_callback: Option<FaultCallback>,
    ) -> (Arc<BoundedBlockingQueue<T>>, WorkerThreadSet<T>) {
        let queue = Arc::new(BoundedBlockingQueue::new(capacity));
        let mut settings = settings(name, thread_count);
        settings.fault_callback = fault_callback;
        let set = WorkerThreadSet::new(queue.clone(), handler, settings);
        (queue, set)
    }
}
