//! Injected thread factories and queues

use crate::common;
use queue_processor::processor::api::{
    BlockingQueue, ProcessorConfig, ProcessorState, QueueError, QueueProcessor, StopOptions,
    ThreadFactory, ThreadPriority,
};
use queue_processor::queue::api::BoundedBlockingQueue;
use queue_processor::worker::api::{StdThreadFactory, ThreadBody, ThreadSpec};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

/// Records every spec it is asked to spawn, then defers to the std factory
#[derive(Default)]
struct RecordingFactory {
    specs: Mutex<Vec<ThreadSpec>>,
    inner: StdThreadFactory,
}

impl ThreadFactory for RecordingFactory {
    fn spawn(&self, spec: &ThreadSpec, body: ThreadBody) -> Result<JoinHandle<()>, QueueError> {
        self.specs.lock().unwrap().push(spec.clone());
        self.inner.spawn(spec, body)
    }
}

#[test]
fn test_thread_factory_sees_every_worker() {
    let factory = Arc::new(RecordingFactory::default());
    let processor = QueueProcessor::builder(
        ProcessorConfig::new("custom")
            .with_thread_count(3)
            .with_priority(ThreadPriority::Lowest)
            .with_background(false),
    )
    .thread_factory(factory.clone())
    .build(|_: u64, _| Ok(()))
    .unwrap();

    processor.start().unwrap();
    processor.stop(StopOptions::graceful()).unwrap();

    let specs = factory.specs.lock().unwrap();
    let names: Vec<&str> = specs.iter().map(|spec| spec.name.as_str()).collect();
    assert_eq!(names, ["custom-0", "custom-1", "custom-2"]);
    assert!(specs
        .iter()
        .all(|spec| spec.priority == ThreadPriority::Lowest && !spec.is_background));
}

#[test]
fn test_injected_queue_is_shared_with_producers() {
    let queue: Arc<BoundedBlockingQueue<u64>> = Arc::new(BoundedBlockingQueue::new(Some(4)));
    let recorder = common::Recorder::default();
    let sink = recorder.clone();

    let config = ProcessorConfig::new("shared").with_thread_count(2);
    let processor = QueueProcessor::<u64>::builder(config)
        .queue(queue.clone())
        .build(move |item, _| {
            sink.record(item);
            Ok(())
        })
        .unwrap();
    assert_eq!(processor.queue_capacity(), Some(4));

    processor.start().unwrap();
    // Producers may use the queue directly
    for item in 0..100 {
        queue.add(item).unwrap();
    }
    queue.complete_adding().unwrap();

    assert!(common::eventually(
        || processor.state() == ProcessorState::AllThreadsExited
    ));
    assert_eq!(recorder.count(), 100);
    assert!(queue.is_completed());
}

#[test]
fn test_disposed_queue_cannot_back_a_processor() {
    let queue: Arc<BoundedBlockingQueue<u64>> = Arc::new(BoundedBlockingQueue::new(None));
    queue.dispose();

    let result = QueueProcessor::<u64>::builder(ProcessorConfig::new("dead"))
        .queue(queue)
        .build(|_, _| Ok(()));
    assert!(matches!(result, Err(QueueError::Disposed)));
}
