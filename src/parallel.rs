//! Order-preserving parallel execution
//!
//! [`OrderPreservingParallelizer`] runs an expensive per-item transform on
//! a fixed pool of worker threads while delivering results to a consumer
//! callback in exactly the order the inputs were submitted. Each input is
//! tagged with a sequence number; a reorder buffer holds results that
//! completed early and flushes every consecutively-ready prefix.
//!
//! Submission blocks once the bounded in-flight capacity is reached, so
//! memory use stays proportional to the worker count. A panicking
//! transform is caught and surfaced as an absent result for its sequence
//! slot; it never stalls the buffer.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

/// Runs a transform concurrently while preserving submission order.
///
/// Created with a transform, a consumer callback, and a worker count.
/// Feed inputs with [`add`](Self::add), then call [`end`](Self::end) and
/// [`join`](Self::join); after `join` returns, the consumer has seen every
/// successful result in submission order.
pub struct OrderPreservingParallelizer<I> {
    input_tx: Option<SyncSender<(u64, I)>>,
    workers: Vec<JoinHandle<()>>,
    collector: Option<JoinHandle<()>>,
    next_seq: u64,
}

impl<I: Send + 'static> OrderPreservingParallelizer<I> {
    /// Spawn the worker pool and the reorder collector.
    ///
    /// `transform` may run concurrently from all workers at once.
    /// `consumer` runs on a single collector thread. `workers` must be
    /// at least 1.
    pub fn new<O, F, C>(workers: usize, transform: F, consumer: C) -> Result<Self>
    where
        O: Send + 'static,
        F: Fn(I) -> O + Send + Sync + 'static,
        C: FnMut(O) + Send + 'static,
    {
        if workers < 1 {
            return Err(Error::Setup(format!(
                "number of worker threads can't be {workers}"
            )));
        }

        // Bounded channels give submission backpressure: at most
        // 2 * workers items queued plus one per busy worker.
        let capacity = workers * 2;
        let (input_tx, input_rx) = sync_channel::<(u64, I)>(capacity);
        let (result_tx, result_rx) = sync_channel::<(u64, Option<O>)>(capacity);

        let input_rx = Arc::new(Mutex::new(input_rx));
        let transform = Arc::new(transform);

        let mut handles = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            let input_rx = Arc::clone(&input_rx);
            let result_tx = result_tx.clone();
            let transform = Arc::clone(&transform);

            let handle = thread::Builder::new()
                .name(format!("fefinder-worker-{worker_id}"))
                .spawn(move || {
                    loop {
                        let received = match input_rx.lock() {
                            Ok(guard) => guard.recv(),
                            Err(_) => break,
                        };
                        let (seq, input) = match received {
                            Ok(item) => item,
                            Err(_) => break,
                        };

                        let result =
                            catch_unwind(AssertUnwindSafe(|| (*transform)(input))).ok();
                        if result.is_none() {
                            log::error!(
                                "worker panicked while processing item {seq}; \
                                 dropping its result"
                            );
                        }
                        if result_tx.send((seq, result)).is_err() {
                            break;
                        }
                    }
                })
                .map_err(|e| Error::Setup(format!("could not spawn worker: {e}")))?;
            handles.push(handle);
        }
        drop(result_tx);

        let collector = thread::Builder::new()
            .name("fefinder-collector".into())
            .spawn(move || collect_in_order(result_rx, consumer))
            .map_err(|e| Error::Setup(format!("could not spawn collector: {e}")))?;

        Ok(OrderPreservingParallelizer {
            input_tx: Some(input_tx),
            workers: handles,
            collector: Some(collector),
            next_seq: 0,
        })
    }

    /// Submit one input; blocks while the in-flight capacity is saturated
    pub fn add(&mut self, input: I) {
        let seq = self.next_seq;
        self.next_seq += 1;
        if let Some(tx) = &self.input_tx {
            if tx.send((seq, input)).is_err() {
                log::error!("parallelizer workers are gone; dropping item {seq}");
            }
        } else {
            log::error!("add() after end(); dropping item {seq}");
        }
    }

    /// Signal that no further inputs will be submitted
    pub fn end(&mut self) {
        self.input_tx.take();
    }

    /// Block until all submitted work has been transformed and every
    /// buffered result has been handed to the consumer, in order
    pub fn join(mut self) {
        self.end();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
        if let Some(collector) = self.collector.take() {
            let _ = collector.join();
        }
    }
}

/// Drain the result channel, releasing results strictly in sequence order.
fn collect_in_order<O>(result_rx: Receiver<(u64, Option<O>)>, mut consumer: impl FnMut(O)) {
    let mut buffer: BTreeMap<u64, Option<O>> = BTreeMap::new();
    let mut next_expected: u64 = 0;

    for (seq, result) in result_rx {
        buffer.insert(seq, result);
        while let Some(ready) = buffer.remove(&next_expected) {
            if let Some(output) = ready {
                consumer(output);
            }
            next_expected += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::mpsc::channel;
    use std::time::Duration;

    fn run_squares(workers: usize, inputs: Vec<u64>) -> Vec<u64> {
        let (tx, rx) = channel();
        let mut parallelizer = OrderPreservingParallelizer::new(
            workers,
            |n: u64| {
                // Uneven delays force out-of-order completion
                std::thread::sleep(Duration::from_millis(n % 3));
                n * n
            },
            move |out| tx.send(out).unwrap(),
        )
        .unwrap();

        for n in inputs {
            parallelizer.add(n);
        }
        parallelizer.join();
        rx.iter().collect()
    }

    #[test]
    fn test_results_arrive_in_submission_order() {
        let inputs: Vec<u64> = (0..50).collect();
        let expected: Vec<u64> = inputs.iter().map(|n| n * n).collect();
        assert_eq!(run_squares(4, inputs), expected);
    }

    #[test]
    fn test_single_worker() {
        assert_eq!(run_squares(1, vec![3, 1, 2]), vec![9, 1, 4]);
    }

    #[test]
    fn test_zero_workers_is_setup_error() {
        let result = OrderPreservingParallelizer::<u64>::new(0, |n| n, |_| {});
        assert!(matches!(result, Err(Error::Setup(_))));
    }

    #[test]
    fn test_panicking_transform_skips_slot_without_stalling() {
        let (tx, rx) = channel();
        let mut parallelizer = OrderPreservingParallelizer::new(
            3,
            |n: u64| {
                if n == 2 {
                    panic!("boom");
                }
                n
            },
            move |out| tx.send(out).unwrap(),
        )
        .unwrap();

        for n in 0..6 {
            parallelizer.add(n);
        }
        parallelizer.join();
        let collected: Vec<u64> = rx.iter().collect();
        assert_eq!(collected, vec![0, 1, 3, 4, 5]);
    }

    #[test]
    fn test_join_without_inputs() {
        let parallelizer =
            OrderPreservingParallelizer::<u64>::new(2, |n| n, |_| {}).unwrap();
        parallelizer.join();
    }

    proptest! {
        #[test]
        fn prop_order_preserved_for_any_workload(
            inputs in prop::collection::vec(0u64..100, 0..40),
            workers in 1usize..6,
        ) {
            let expected: Vec<u64> = inputs.iter().map(|n| n * n).collect();
            prop_assert_eq!(run_squares(workers, inputs), expected);
        }
    }
}
