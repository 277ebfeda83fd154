//! Synthetic flight-request traffic.
//!
//! The simulator is self-contained: nothing external asks for flight
//! status, so this task plays the passenger side, periodically asking the
//! simulated ledger to emit a request for a random flight from a fixed
//! table. The ledger picks the partition index the way the contract
//! would; the generator never sees or steers the fan-out.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::Rng;
use surety_core::ledger::memory::InMemoryLedger;
use surety_core::{FlightKey, IdentityPool};
use tracing::info;

/// Flight numbers the generator draws from.
const FLIGHT_NUMBERS: [&str; 5] = ["ND1309", "SU2407", "BA0117", "LH0454", "JL0043"];

/// How many leading pool slots act as airlines (slots before the oracle
/// sub-range; slot 0 is the contract owner).
const AIRLINE_SLOTS: std::ops::Range<usize> = 1..4;

/// Emits synthetic oracle requests into the simulated ledger.
pub struct TrafficGenerator {
    ledger: Arc<InMemoryLedger>,
    flights: Vec<FlightKey>,
    interval: Duration,
}

impl TrafficGenerator {
    /// Build a generator over the pool's airline slots.
    #[must_use]
    pub fn new(ledger: Arc<InMemoryLedger>, pool: &IdentityPool, interval: Duration) -> Self {
        let mut flights = Vec::new();
        for slot in AIRLINE_SLOTS {
            if let Some(airline) = pool.get(slot) {
                for number in FLIGHT_NUMBERS {
                    flights.push(FlightKey {
                        airline: airline.account.clone(),
                        flight: number.to_string(),
                    });
                }
            }
        }
        Self {
            ledger,
            flights,
            interval,
        }
    }

    /// Emit one request per interval, forever.
    pub async fn run(self) {
        if self.flights.is_empty() {
            info!("no airline slots in pool; traffic generator idle");
            return;
        }
        info!(
            interval_ms = self.interval.as_millis() as u64,
            flights = self.flights.len(),
            "traffic generator started"
        );
        loop {
            tokio::time::sleep(self.interval).await;
            let flight = {
                let mut rng = rand::thread_rng();
                self.flights[rng.gen_range(0..self.flights.len())].clone()
            };
            let timestamp = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_secs())
                .unwrap_or(0);
            let event = self.ledger.emit_request(flight, timestamp).await;
            info!(
                flight = %event.flight,
                index = %event.partition_index,
                correlation_id = %event.correlation_id,
                "emitted flight status request"
            );
        }
    }
}
