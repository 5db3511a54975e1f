//! Loading processor configuration from TOML files

use crate::common;
use queue_processor::processor::api::{
    ProcessorConfig, QueueError, QueueProcessor, StopOptions, StoreKind, ThreadPriority,
};

#[test]
fn test_processor_from_toml_file() {
    let file = common::toml_file(
        r#"
        [processor]
        name = "from-file"
        thread_count = 3
        queue_capacity = 25
        store_kind = "linked"
        priority = "below_normal"
        is_background = false
        "#,
    );

    let config = ProcessorConfig::from_toml_file(file.path()).unwrap();
    assert_eq!(config.thread_count, 3);
    assert_eq!(config.store_kind, StoreKind::Linked);
    assert_eq!(config.priority, ThreadPriority::BelowNormal);

    let processor = QueueProcessor::new(config, |_: u64, _| Ok(())).unwrap();
    assert_eq!(processor.name(), "from-file");
    assert_eq!(processor.thread_count(), 3);
    assert_eq!(processor.queue_capacity(), Some(25));
    assert!(!processor.is_background());

    processor.start().unwrap();
    processor.add(1).unwrap();
    processor.stop(StopOptions::graceful()).unwrap();
    assert_eq!(processor.stats().processed, 1);
}

#[test]
fn test_invalid_file_is_reported_with_path() {
    let file = common::toml_file("thread_count = 0\n");

    match ProcessorConfig::from_toml_file(file.path()) {
        Err(QueueError::InvalidConfig { message }) => {
            assert!(message.contains("thread_count"), "{}", message);
            assert!(
                message.contains(&file.path().display().to_string()),
                "{}",
                message
            );
        }
        other => panic!("expected InvalidConfig, got {:?}", other),
    }
}

#[test]
fn test_missing_file_is_invalid_config() {
    let dir = tempfile::tempdir().unwrap();
    let result = ProcessorConfig::from_toml_file(dir.path().join("absent.toml"));
    assert!(matches!(result, Err(QueueError::InvalidConfig { .. })));
}

#[test]
fn test_invalid_config_is_rejected_before_threads_exist() {
    let result = QueueProcessor::new(
        ProcessorConfig::new("bad").with_thread_count(0),
        |_: u64, _| Ok(()),
    );
    assert!(matches!(result, Err(QueueError::InvalidConfig { .. })));
}
