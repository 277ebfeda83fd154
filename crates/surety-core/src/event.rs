//! Oracle request events and response submissions.
//!
//! Both types are transient wire shapes: events are consumed once per
//! dispatch cycle and never persisted locally (the remote service is the
//! source of truth and may re-emit or already have closed the request);
//! submissions are fire-and-forget, their acceptance decided by the remote
//! consensus rules.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::{AccountId, Identity};
use crate::registry::PartitionIndex;
use crate::status::FlightStatus;

/// Composite subject key identifying one flight.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlightKey {
    /// The airline account that registered the flight.
    pub airline: AccountId,
    /// Flight number, e.g. `"ND1309"`.
    pub flight: String,
}

impl std::fmt::Display for FlightKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.airline, self.flight)
    }
}

/// A request for flight status emitted by the remote contract.
///
/// Only oracles holding `partition_index` are expected to answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleRequestEvent {
    /// Partition index the contract fanned this request out to.
    pub partition_index: PartitionIndex,
    /// Flight the status is requested for.
    pub flight: FlightKey,
    /// Departure timestamp (unix seconds) echoed back in responses.
    pub timestamp: u64,
    /// Correlates responses, log lines, and contract-side request state.
    pub correlation_id: Uuid,
}

/// An event together with its position in the remote event stream.
///
/// Offsets let a dropped subscription resume where it left off without
/// local persistence; replayed events are harmless because the remote
/// service rejects stale and duplicate votes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencedEvent {
    /// Zero-based position in the stream.
    pub offset: u64,
    /// The request event itself.
    pub event: OracleRequestEvent,
}

/// One oracle's answer to a request event.
///
/// The flight key and timestamp are echoed from the event unchanged; the
/// contract matches them against its open request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseSubmission {
    /// The identity submitting (and signing) the response.
    pub identity: Identity,
    /// Partition index the event carried.
    pub partition_index: PartitionIndex,
    /// Flight echoed from the event.
    pub flight: FlightKey,
    /// Timestamp echoed from the event.
    pub timestamp: u64,
    /// This oracle's independently chosen status.
    pub status: FlightStatus,
    /// Correlation id echoed from the event.
    pub correlation_id: Uuid,
}

impl ResponseSubmission {
    /// Build a submission answering `event` as `identity` with `status`.
    #[must_use]
    pub fn answering(event: &OracleRequestEvent, identity: Identity, status: FlightStatus) -> Self {
        Self {
            identity,
            partition_index: event.partition_index,
            flight: event.flight.clone(),
            timestamp: event.timestamp,
            status,
            correlation_id: event.correlation_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> OracleRequestEvent {
        OracleRequestEvent {
            partition_index: PartitionIndex::new_unchecked(4),
            flight: FlightKey {
                airline: AccountId::derive(1, 1),
                flight: "ND1309".to_string(),
            },
            timestamp: 1_700_000_000,
            correlation_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn answering_echoes_event_fields_unchanged() {
        let event = sample_event();
        let identity = Identity {
            ordinal: 7,
            account: AccountId::derive(1, 7),
        };
        let submission =
            ResponseSubmission::answering(&event, identity.clone(), FlightStatus::LateWeather);

        assert_eq!(submission.identity, identity);
        assert_eq!(submission.partition_index, event.partition_index);
        assert_eq!(submission.flight, event.flight);
        assert_eq!(submission.timestamp, event.timestamp);
        assert_eq!(submission.correlation_id, event.correlation_id);
        assert_eq!(submission.status, FlightStatus::LateWeather);
    }

    #[test]
    fn event_serde_round_trip() {
        let event = sample_event();
        let json = serde_json::to_string(&event).unwrap();
        let back: OracleRequestEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }
}
