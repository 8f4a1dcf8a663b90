//! Bounded-concurrency batch execution
//!
//! Items are processed in consecutive batches. Every call in a batch runs
//! concurrently and the whole batch settles before the next one starts, so
//! at most `batch_size` calls are ever in flight. Each result lands in the
//! slot of the item that produced it; completion order never matters.

use crate::error::ExtractorError;
use futures::future::join_all;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Runs async tasks over a slice in fixed-size batches
#[derive(Debug, Clone, Copy)]
pub struct ConcurrencyBatcher {
    batch_size: usize,
}

impl ConcurrencyBatcher {
    /// Create a batcher; a batch size of 0 is treated as 1
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    /// Run `task` over every item
    ///
    /// Returns one slot per item, in item order. A task signals failure with
    /// `None`, which never affects its siblings. Cancellation abandons the
    /// in-flight batch and discards everything collected so far.
    pub async fn run<'a, I, T, F, Fut>(
        &self,
        items: &'a [I],
        cancel: &CancellationToken,
        mut task: F,
    ) -> Result<Vec<Option<T>>, ExtractorError>
    where
        F: FnMut(&'a I) -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        let mut slots: Vec<Option<T>> = items.iter().map(|_| None).collect();
        let batch_count = items.len().div_ceil(self.batch_size);

        for (batch_idx, batch) in items.chunks(self.batch_size).enumerate() {
            let base = batch_idx * self.batch_size;
            debug!(
                "Starting batch {}/{} ({} calls)",
                batch_idx + 1,
                batch_count,
                batch.len()
            );

            let calls: Vec<Fut> = batch.iter().map(&mut task).collect();
            let results = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Cancelled during batch {}/{}", batch_idx + 1, batch_count);
                    return Err(ExtractorError::Cancelled);
                }
                results = join_all(calls) => results,
            };

            for (offset, result) in results.into_iter().enumerate() {
                slots[base + offset] = result;
            }
        }

        Ok(slots)
    }
}
