//! Retry orchestrator.
//!
//! [`execute`] wraps one logical call (one `retrieve` or one `insert`) with
//! bounded retry. Each attempt first ensures a live connection. Fatal errors
//! stop immediately; recoverable errors invalidate the connection and are
//! retried until the policy's attempts run out. An operation may instead
//! report a partial result, which is returned as success without retrying.

use tidewire_types::{CommitState, ConnectorError, RetryPolicy};

use crate::adapter::Adapter;
use crate::lifecycle::ConnectionLifecycle;

/// Successful result of one attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The unit of work finished.
    Complete(T),
    /// The unit of work failed part way after committing some work at the
    /// backend. `value` holds the committed part and must reach the caller.
    Partial { value: T, cause: ConnectorError },
}

/// One unit of work against a connected adapter, bound to its request.
#[allow(async_fn_in_trait)]
pub trait Operation<A: Adapter> {
    type Output;

    /// Operation name used in log fields (`retrieve`, `insert`, ...).
    fn name(&self) -> &'static str;

    /// Run a single attempt.
    ///
    /// # Errors
    ///
    /// Returns the adapter's classified error; the orchestrator decides what
    /// to do with it based on its kind alone.
    async fn run(
        &mut self,
        adapter: &mut A,
        handle: &mut A::Handle,
    ) -> Result<Outcome<Self::Output>, ConnectorError>;
}

/// Run `operation` under `policy`, reconnecting through `lifecycle` between attempts.
///
/// # Errors
///
/// Returns the first fatal error, or the last recoverable error once
/// `policy.max_attempts()` attempts have failed. The error is never
/// reinterpreted.
pub async fn execute<A, O>(
    lifecycle: &mut ConnectionLifecycle<A>,
    policy: &RetryPolicy,
    operation: &mut O,
) -> Result<O::Output, ConnectorError>
where
    A: Adapter,
    O: Operation<A>,
{
    let max_attempts = policy.max_attempts();
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let result = match lifecycle.ensure_connected().await {
            Ok((adapter, handle)) => operation.run(adapter, handle).await,
            Err(err) => Err(err),
        };

        match result {
            Ok(Outcome::Complete(value)) => {
                if attempt > 1 {
                    tracing::info!(
                        operation = operation.name(),
                        backend = lifecycle.adapter().name(),
                        attempt,
                        "Recovered after retry"
                    );
                }
                return Ok(value);
            }
            Ok(Outcome::Partial { value, cause }) => {
                tracing::warn!(
                    operation = operation.name(),
                    backend = lifecycle.adapter().name(),
                    attempt,
                    category = %cause.category,
                    code = %cause.code,
                    "{}. Returning already committed work",
                    cause.message
                );
                return Ok(value);
            }
            Err(err) if err.is_fatal() => {
                tracing::error!(
                    operation = operation.name(),
                    backend = lifecycle.adapter().name(),
                    attempt,
                    category = %err.category,
                    code = %err.code,
                    "Fatal connector error, not retrying: {}",
                    err.message
                );
                return Err(err);
            }
            Err(err) => {
                lifecycle.invalidate();

                if attempt >= max_attempts {
                    tracing::error!(
                        operation = operation.name(),
                        backend = lifecycle.adapter().name(),
                        attempt,
                        max_attempts,
                        category = %err.category,
                        code = %err.code,
                        "Max attempts exhausted: {}",
                        err.message
                    );
                    return Err(err);
                }

                let delay = policy.delay_after(attempt);
                #[allow(clippy::cast_possible_truncation)]
                let delay_ms = delay.as_millis() as u64;
                if err.commit_state == Some(CommitState::AfterCommitUnknown) {
                    tracing::warn!(
                        operation = operation.name(),
                        backend = lifecycle.adapter().name(),
                        code = %err.code,
                        "Commit outcome unknown, retry may duplicate the write"
                    );
                }
                tracing::warn!(
                    operation = operation.name(),
                    backend = lifecycle.adapter().name(),
                    attempt,
                    max_attempts,
                    delay_ms,
                    category = %err.category,
                    code = %err.code,
                    "Recoverable error, will reconnect and retry: {}",
                    err.message
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
