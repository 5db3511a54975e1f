//! Multi-producer, multi-consumer behaviour

#[cfg(test)]
mod tests {
    use crate::queue::api::{BlockingQueue, BoundedBlockingQueue, CancellationToken, StoreKind};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::Duration;

    fn run_producers_and_consumers(kind: StoreKind) {
        const PRODUCERS: usize = 4;
        const CONSUMERS: usize = 4;
        const PER_PRODUCER: usize = 2_500;

        let queue = Arc::new(BoundedBlockingQueue::with_store(Some(16), kind));
        let barrier = Arc::new(Barrier::new(PRODUCERS + CONSUMERS));

        let producers: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let queue = Arc::clone(&queue);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    for i in 0..PER_PRODUCER {
                        queue.add(p * PER_PRODUCER + i).unwrap();
                    }
                })
            })
            .collect();

        let consumers: Vec<_> = (0..CONSUMERS)
            .map(|_| {
                let queue = Arc::clone(&queue);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    let mut seen = Vec::new();
                    while let Some(item) = queue.take().unwrap() {
                        seen.push(item);
                    }
                    seen
                })
            })
            .collect();

        for producer in producers {
            producer.join().unwrap();
        }
        queue.complete_adding().unwrap();

        let mut all = HashSet::new();
        let mut total = 0;
        for consumer in consumers {
            let seen = consumer.join().unwrap();
            total += seen.len();
            all.extend(seen);
        }

        assert_eq!(total, PRODUCERS * PER_PRODUCER, "every item delivered");
        assert_eq!(all.len(), PRODUCERS * PER_PRODUCER, "no item delivered twice");
        assert!(queue.is_completed());
    }

    #[test]
    fn test_exactly_once_delivery_array_store() {
        run_producers_and_consumers(StoreKind::Array);
        println!("✓ Array store delivered every item exactly once");
    }

    #[test]
    fn test_exactly_once_delivery_linked_store() {
        run_producers_and_consumers(StoreKind::Linked);
        println!("✓ Linked store delivered every item exactly once");
    }

    #[test]
    fn test_single_producer_order_preserved_per_consumer() {
        let queue = Arc::new(BoundedBlockingQueue::new(Some(8)));
        let consumer_queue = Arc::clone(&queue);
        let consumer = thread::spawn(move || {
            let mut seen = Vec::new();
            while let Some(item) = consumer_queue.take().unwrap() {
                seen.push(item);
            }
            seen
        });

        for i in 0..1_000 {
            queue.add(i).unwrap();
        }
        queue.complete_adding().unwrap();

        let seen = consumer.join().unwrap();
        assert_eq!(seen, (0..1_000).collect::<Vec<_>>());
    }

    #[test]
    fn test_bound_is_never_exceeded_by_blocking_adds() {
        const CAPACITY: usize = 3;
        let queue = Arc::new(BoundedBlockingQueue::new(Some(CAPACITY)));
        let peak = Arc::new(AtomicUsize::new(0));

        let producers: Vec<_> = (0..3)
            .map(|_| {
                let queue = Arc::clone(&queue);
                let peak = Arc::clone(&peak);
                thread::spawn(move || {
                    for i in 0..200 {
                        queue.add(i).unwrap();
                        peak.fetch_max(queue.len(), Ordering::Relaxed);
                    }
                })
            })
            .collect();

        let mut taken = 0;
        while taken < 600 {
            if queue
                .try_take(Some(Duration::from_millis(100)), &CancellationToken::none())
                .unwrap()
                .is_some()
            {
                taken += 1;
            }
        }
        for producer in producers {
            producer.join().unwrap();
        }

        assert!(peak.load(Ordering::Relaxed) <= CAPACITY);
    }

    #[test]
    fn test_one_token_cancels_many_waiters() {
        let queue: Arc<BoundedBlockingQueue<u8>> = Arc::new(BoundedBlockingQueue::new(None));
        let token = CancellationToken::new();

        let waiters: Vec<_> = (0..6)
            .map(|_| {
                let queue = Arc::clone(&queue);
                let token = token.clone();
                thread::spawn(move || queue.try_take(None, &token))
            })
            .collect();

        thread::sleep(Duration::from_millis(50));
        token.cancel();

        for waiter in waiters {
            assert!(waiter.join().unwrap().is_err());
        }
    }
}
