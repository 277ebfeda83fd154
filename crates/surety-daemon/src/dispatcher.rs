//! Event dispatcher.
//!
//! Long-lived loop over the remote request event stream. Each event moves
//! the dispatcher through Idle -> Dispatching -> Idle: look up the
//! identities holding the event's partition index, and for each one
//! independently sample a flight status and submit a response. There is no
//! terminal state; the loop runs for the life of the process.
//!
//! The handler is reentrant and stateless between invocations — the only
//! state the loop carries is the next stream offset, so resubscription
//! after a transport drop is safe at any point. Re-delivered events are
//! harmless: the remote service rejects stale and duplicate votes.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use surety_core::{
    FlightStatus, IndexRegistry, LedgerClient, OracleRequestEvent, ResponseSubmission,
};
use tracing::{debug, info, warn};

use crate::submit::bounded;

/// Dispatches oracle responses for every inbound request event.
pub struct EventDispatcher {
    ledger: Arc<dyn LedgerClient>,
    registry: Arc<IndexRegistry>,
    rpc_timeout: Duration,
    resubscribe_delay: Duration,
}

impl EventDispatcher {
    /// Create a dispatcher reading the registry populated at registration.
    #[must_use]
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        registry: Arc<IndexRegistry>,
        rpc_timeout: Duration,
        resubscribe_delay: Duration,
    ) -> Self {
        Self {
            ledger,
            registry,
            rpc_timeout,
            resubscribe_delay,
        }
    }

    /// Consume the event stream forever, starting at `from_offset`.
    ///
    /// Stream `Err` items are logged and the subscription stays up. If the
    /// stream itself ends (transport drop), the loop re-subscribes from
    /// the next unconsumed offset after a short delay. Each event is
    /// handled on its own task so a slow dispatch never blocks the next
    /// event.
    pub async fn run(self: Arc<Self>, from_offset: u64) {
        let mut next_offset = from_offset;
        loop {
            let mut stream = match bounded(
                "subscribe",
                self.rpc_timeout,
                self.ledger.subscribe(next_offset),
            )
            .await
            {
                Ok(stream) => {
                    info!(offset = next_offset, "subscribed to oracle request events");
                    stream
                }
                Err(error) => {
                    warn!(%error, "event subscription failed; retrying");
                    tokio::time::sleep(self.resubscribe_delay).await;
                    continue;
                }
            };

            while let Some(item) = stream.next().await {
                match item {
                    Ok(sequenced) => {
                        next_offset = sequenced.offset + 1;
                        let dispatcher = Arc::clone(&self);
                        tokio::spawn(async move {
                            dispatcher.dispatch(sequenced.event).await;
                        });
                    }
                    Err(error) => {
                        // Transport hiccup; stay subscribed.
                        warn!(%error, "event stream error");
                    }
                }
            }

            warn!(
                offset = next_offset,
                "event stream ended; re-subscribing"
            );
            tokio::time::sleep(self.resubscribe_delay).await;
        }
    }

    /// Answer one request event.
    ///
    /// Submissions for different identities are independent and issued
    /// concurrently; one rejection never blocks the siblings.
    pub async fn dispatch(&self, event: OracleRequestEvent) {
        let matching = self.registry.matching(event.partition_index).await;
        if matching.is_empty() {
            // Expected when the remote assignment range exceeds the local
            // registration count.
            info!(
                index = %event.partition_index,
                correlation_id = %event.correlation_id,
                "no registered oracle holds index; skipping"
            );
            return;
        }

        debug!(
            index = %event.partition_index,
            flight = %event.flight,
            oracles = matching.len(),
            "dispatching oracle responses"
        );

        let submissions = matching.into_iter().map(|identity| {
            let event = event.clone();
            async move {
                // Each identity samples independently; disagreement is the
                // point, the remote consensus layer resolves it.
                let status = FlightStatus::sample(&mut rand::thread_rng());
                let submission = ResponseSubmission::answering(&event, identity.clone(), status);
                match bounded(
                    "submit_response",
                    self.rpc_timeout,
                    self.ledger.submit_response(&submission),
                )
                .await
                {
                    Ok(()) => info!(
                        oracle = %identity,
                        status = status.code(),
                        correlation_id = %event.correlation_id,
                        "response accepted"
                    ),
                    Err(error) => warn!(
                        oracle = %identity,
                        %error,
                        correlation_id = %event.correlation_id,
                        "response rejected"
                    ),
                }
            }
        });
        futures::future::join_all(submissions).await;
    }
}
