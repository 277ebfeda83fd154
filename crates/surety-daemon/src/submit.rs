//! Bounded remote calls.
//!
//! Registration and response submission share one contract: issue the
//! call, await the acknowledgement under a bounded timeout, and classify
//! the outcome as success or a recoverable failure the caller logs and
//! moves past. No retries — the remote service's own idempotency rules
//! make re-issuing a rejected call pointless.

use std::future::Future;
use std::time::Duration;

use surety_core::LedgerError;

/// Await `call` for at most `limit`, mapping expiry to
/// [`LedgerError::Timeout`] tagged with `operation`.
///
/// # Errors
///
/// Returns the call's own error, or [`LedgerError::Timeout`] if the bound
/// elapsed first. Both are recoverable per the dispatch failure semantics.
pub async fn bounded<T, F>(
    operation: &'static str,
    limit: Duration,
    call: F,
) -> Result<T, LedgerError>
where
    F: Future<Output = Result<T, LedgerError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(outcome) => outcome,
        Err(_) => Err(LedgerError::Timeout {
            operation,
            limit_ms: limit.as_millis() as u64,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn completes_within_bound() {
        let result = bounded("probe", Duration::from_secs(1), async { Ok(7u32) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn propagates_the_call_error() {
        let result: Result<(), _> = bounded("probe", Duration::from_secs(1), async {
            Err(LedgerError::Stream("boom".to_string()))
        })
        .await;
        assert_eq!(result.unwrap_err(), LedgerError::Stream("boom".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_call_times_out() {
        let result: Result<(), _> = bounded("probe", Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await;
        assert_eq!(
            result.unwrap_err(),
            LedgerError::Timeout {
                operation: "probe",
                limit_ms: 50
            }
        );
    }
}
