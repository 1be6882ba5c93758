//! Throttled fan-out for provider calls.
//!
//! Requests run in fixed-size batches. Calls inside a batch run
//! concurrently; batches run one after another with a fixed pause between
//! them so the provider does not start rejecting us.

use futures::future::join_all;
use log::trace;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchScheduler {
    batch_size: usize,
    delay: Duration,
}

impl BatchScheduler {
    /// A `batch_size` of zero is treated as one.
    #[must_use]
    pub fn new(batch_size: usize, delay: Duration) -> Self {
        Self {
            batch_size: batch_size.max(1),
            delay,
        }
    }

    #[must_use]
    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Runs `call` for every item and returns the outputs in input order.
    ///
    /// There is no pause after the final batch.
    pub async fn run<T, O, F, Fut>(&self, items: Vec<T>, call: F) -> Vec<O>
    where
        F: Fn(T) -> Fut,
        Fut: Future<Output = O>,
    {
        let total = items.len();
        let mut outputs = Vec::with_capacity(total);
        let mut items = items.into_iter().peekable();
        let mut batch_index = 0;

        while items.peek().is_some() {
            if batch_index > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let batch: Vec<Fut> = items.by_ref().take(self.batch_size).map(&call).collect();
            trace!("Running batch {} ({} calls of {total})", batch_index + 1, batch.len());
            outputs.extend(join_all(batch).await);
            batch_index += 1;
        }

        outputs
    }
}

impl Default for BatchScheduler {
    fn default() -> Self {
        Self::new(5, Duration::from_millis(250))
    }
}
