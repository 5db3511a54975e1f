//! Producer/consumer scenarios across the full stack

use crate::common;
use queue_processor::processor::api::{
    ProcessorConfig, ProcessorState, QueueError, QueueProcessor, StopOptions,
};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn test_multiple_producers_soft_stop() {
    const PRODUCERS: u64 = 5;
    const PER_PRODUCER: u64 = 2_000;

    let recorder = common::Recorder::default();
    let sink = recorder.clone();
    let processor = Arc::new(
        QueueProcessor::new(
            ProcessorConfig::new("producers")
                .with_thread_count(4)
                .with_capacity(100),
            move |item: u64, _| {
                sink.record(item);
                Ok(())
            },
        )
        .unwrap(),
    );
    processor.start().unwrap();

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let processor = Arc::clone(&processor);
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    processor.add(p * PER_PRODUCER + i).unwrap();
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    processor.stop(StopOptions::new(true, true, false)).unwrap();

    assert_eq!(recorder.count() as u64, PRODUCERS * PER_PRODUCER);
    assert!(recorder.duplicates().is_empty());
    assert_eq!(processor.state(), ProcessorState::Stopped);
}

#[test]
fn test_producer_blocked_on_full_queue_sees_disposed() {
    let processor = Arc::new(
        QueueProcessor::new(
            ProcessorConfig::new("blocked").with_thread_count(1).with_capacity(2),
            |_: u64, token| {
                while !token.is_cancelled() {
                    thread::sleep(Duration::from_millis(5));
                }
                Ok(())
            },
        )
        .unwrap(),
    );
    processor.start().unwrap();
    processor.add(0).unwrap();
    assert!(common::eventually(|| processor.active_thread_count() == 1));
    processor.add(1).unwrap();
    processor.add(2).unwrap();

    let producer = {
        let processor = Arc::clone(&processor);
        thread::spawn(move || processor.add(3))
    };
    thread::sleep(Duration::from_millis(50));
    assert_eq!(processor.element_count(), 2);

    processor.dispose().unwrap();
    assert_eq!(producer.join().unwrap(), Err(QueueError::Disposed));
    assert!(!processor.is_work());
}

#[test]
fn test_stop_without_drain_abandons_queue() {
    let recorder = common::Recorder::default();
    let sink = recorder.clone();
    let processor = QueueProcessor::new(
        ProcessorConfig::new("abandon").with_thread_count(1),
        move |item: u64, _| {
            thread::sleep(Duration::from_millis(10));
            sink.record(item);
            Ok(())
        },
    )
    .unwrap();
    processor.start().unwrap();
    for item in 0..100 {
        processor.add(item).unwrap();
    }

    processor.stop(StopOptions::new(true, false, false)).unwrap();

    assert_eq!(processor.state(), ProcessorState::Stopped);
    assert!(recorder.count() < 100);
    assert_eq!(recorder.count() + processor.element_count(), 100);
}
