//! Boundary values and unusual inputs

#[cfg(test)]
mod tests {
    use crate::queue::api::{
        AddOutcome, BlockingQueue, BoundedBlockingQueue, CancellationToken, QueueError,
    };
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_zero_capacity_only_accepts_forced_adds() {
        let queue = BoundedBlockingQueue::new(Some(0));

        let outcome = queue
            .try_add(1, Some(Duration::ZERO), &CancellationToken::none())
            .unwrap();
        assert_eq!(outcome, AddOutcome::TimedOut(1));

        queue.add_forced(2).unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.take().unwrap(), Some(2));
    }

    #[test]
    fn test_huge_timeout_behaves_as_infinite() {
        let queue: Arc<BoundedBlockingQueue<u8>> = Arc::new(BoundedBlockingQueue::new(None));

        let taker_queue = Arc::clone(&queue);
        let taker = thread::spawn(move || {
            taker_queue.try_take(Some(Duration::MAX), &CancellationToken::none())
        });

        thread::sleep(Duration::from_millis(30));
        queue.add(42).unwrap();
        assert_eq!(taker.join().unwrap(), Ok(Some(42)));
    }

    #[test]
    fn test_huge_capacity_does_not_preallocate_everything() {
        let queue = BoundedBlockingQueue::new(Some(usize::MAX));
        queue.add("fits").unwrap();
        assert_eq!(queue.capacity(), Some(usize::MAX));
        assert_eq!(queue.take().unwrap(), Some("fits"));
    }

    #[test]
    fn test_forced_add_overfills_then_blocking_add_waits() {
        let queue = BoundedBlockingQueue::new(Some(1));
        queue.add_forced(1).unwrap();
        queue.add_forced(2).unwrap();
        assert_eq!(queue.len(), 2);

        let outcome = queue
            .try_add(3, Some(Duration::from_millis(10)), &CancellationToken::none())
            .unwrap();
        assert!(!outcome.is_added());

        // One take still leaves the queue at capacity
        queue.take().unwrap();
        let outcome = queue
            .try_add(3, Some(Duration::ZERO), &CancellationToken::none())
            .unwrap();
        assert_eq!(outcome.into_rejected(), Some(3));
    }

    #[test]
    fn test_zero_timeout_take_on_empty_queue() {
        let queue: BoundedBlockingQueue<u8> = BoundedBlockingQueue::new(Some(1));
        assert_eq!(
            queue.try_take(Some(Duration::ZERO), &CancellationToken::none()),
            Ok(None)
        );
        assert!(!queue.is_completed());
    }

    #[test]
    fn test_cancelled_token_checked_before_available_item() {
        let queue = BoundedBlockingQueue::new(None);
        queue.add(1).unwrap();
        let token = CancellationToken::new();
        token.cancel();

        assert_eq!(
            queue.try_peek(Some(Duration::ZERO), &token),
            Err(QueueError::Cancelled)
        );
    }

    #[test]
    fn test_waiting_call_leaves_no_registration_behind() {
        let queue: BoundedBlockingQueue<u8> = BoundedBlockingQueue::new(None);
        let token = CancellationToken::new();

        for _ in 0..10 {
            let _ = queue.try_take(Some(Duration::from_millis(1)), &token);
        }
        assert_eq!(token.registered_callbacks(), 0);
    }

    #[test]
    fn test_debug_output_reports_state() {
        let queue = BoundedBlockingQueue::new(Some(2));
        queue.add(1u8).unwrap();
        let rendered = format!("{:?}", queue);
        assert!(rendered.contains("capacity: Some(2)"));
        assert!(rendered.contains("len: 1"));
    }
}
