//! Partial-result accumulator for queue-style batched retrieval.
//!
//! A queue source pulls and acknowledges messages one at a time. An
//! acknowledged message cannot be put back, so once the batch holds any
//! records a later failure ends the batch early instead of discarding them:
//!
//! ```text
//! Pulling ──fetch+ack ok──▶ Pulling
//!    │ empty queue / batch full ──▶ FullSuccessReturn
//!    │ failure, records held    ──▶ PartialSuccessReturn
//!    └ failure, nothing held    ──▶ RetryableFailure (orchestrator retries)
//! ```

use tidewire_types::{ConnectorError, Record};

use crate::adapter::PullAdapter;
use crate::retry::{Operation, Outcome};

/// Ordered records acknowledged so far in the current call, bounded by `limit`.
#[derive(Debug)]
pub struct PartialBatch {
    records: Vec<Record>,
    limit: usize,
}

impl PartialBatch {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            records: Vec::new(),
            limit,
        }
    }

    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.records.len() >= self.limit
    }

    /// Finish the batch normally.
    pub fn complete(self) -> Outcome<Vec<Record>> {
        Outcome::Complete(self.records)
    }

    /// Finish the batch after a failed fetch or acknowledge step.
    ///
    /// # Errors
    ///
    /// Returns `err` unchanged when nothing has been acknowledged yet, so the
    /// whole call can be retried. With records held, the batch is returned as
    /// a partial success and `err` only travels along as the cause.
    pub fn settle(self, err: ConnectorError) -> Result<Outcome<Vec<Record>>, ConnectorError> {
        if self.records.is_empty() {
            Err(err)
        } else {
            Ok(Outcome::Partial {
                value: self.records,
                cause: err,
            })
        }
    }
}

/// Pull up to `max_batch_size` messages, acknowledging each before keeping it.
#[derive(Debug, Clone, Copy)]
pub struct PullBatch {
    max_batch_size: usize,
}

impl PullBatch {
    pub fn new(max_batch_size: usize) -> Self {
        Self { max_batch_size }
    }
}

impl<A: PullAdapter> Operation<A> for PullBatch {
    type Output = Vec<Record>;

    fn name(&self) -> &'static str {
        "retrieve"
    }

    async fn run(
        &mut self,
        adapter: &mut A,
        handle: &mut A::Handle,
    ) -> Result<Outcome<Vec<Record>>, ConnectorError> {
        let mut batch = PartialBatch::with_limit(self.max_batch_size);

        while !batch.is_full() {
            let message = match adapter.fetch_one(handle).await {
                Ok(Some(message)) => message,
                Ok(None) => break,
                Err(err) => return batch.settle(err),
            };
            if let Err(err) = adapter.acknowledge(handle, &message).await {
                return batch.settle(err);
            }
            batch.push(adapter.into_record(message));
        }

        tracing::info!(backend = adapter.name(), rows = batch.len(), "Retrieved {} rows", batch.len());
        Ok(batch.complete())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tidewire_types::record::message_record;

    use super::*;

    #[test]
    fn settle_empty_batch_propagates_error() {
        let batch = PartialBatch::with_limit(10);
        let err = batch
            .settle(ConnectorError::connection("LOST", "gone"))
            .unwrap_err();
        assert_eq!(err.code, "LOST");
    }

    #[test]
    fn settle_with_records_is_partial_success() {
        let mut batch = PartialBatch::with_limit(10);
        batch.push(message_record("a"));
        batch.push(message_record("b"));
        let outcome = batch
            .settle(ConnectorError::connection("LOST", "gone"))
            .unwrap();
        match outcome {
            Outcome::Partial { value, cause } => {
                assert_eq!(value.len(), 2);
                assert_eq!(value[0]["message"], json!("a"));
                assert_eq!(cause.code, "LOST");
            }
            Outcome::Complete(_) => panic!("expected partial outcome"),
        }
    }

    #[test]
    fn full_at_limit() {
        let mut batch = PartialBatch::with_limit(1);
        assert!(!batch.is_full());
        batch.push(message_record("a"));
        assert!(batch.is_full());
    }
}
