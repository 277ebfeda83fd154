//! Flight status codes.
//!
//! The contract accepts exactly six status values. Oracles sample
//! uniformly at random from this domain for every request they answer;
//! disagreement between oracles is expected and resolved by the remote
//! consensus layer.

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The fixed flight-status code domain.
///
/// Discriminants match the on-contract encoding and must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum FlightStatus {
    /// No information available.
    Unknown = 0,
    /// Flight arrived on time.
    OnTime = 10,
    /// Delayed, airline at fault.
    LateAirline = 20,
    /// Delayed by weather.
    LateWeather = 30,
    /// Delayed by a technical problem.
    LateTechnical = 40,
    /// Delayed for any other reason.
    LateOther = 50,
}

/// Unknown status code on the wire.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("unknown flight status code {0}")]
pub struct UnknownStatusCode(pub u8);

impl FlightStatus {
    /// Every value in the domain, in code order.
    pub const DOMAIN: [Self; 6] = [
        Self::Unknown,
        Self::OnTime,
        Self::LateAirline,
        Self::LateWeather,
        Self::LateTechnical,
        Self::LateOther,
    ];

    /// The numeric code submitted to the contract.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Decode a contract status code.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownStatusCode`] for codes outside the fixed domain.
    pub const fn from_code(code: u8) -> Result<Self, UnknownStatusCode> {
        match code {
            0 => Ok(Self::Unknown),
            10 => Ok(Self::OnTime),
            20 => Ok(Self::LateAirline),
            30 => Ok(Self::LateWeather),
            40 => Ok(Self::LateTechnical),
            50 => Ok(Self::LateOther),
            other => Err(UnknownStatusCode(other)),
        }
    }

    /// Uniform random choice from the domain.
    pub fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::DOMAIN[rng.gen_range(0..Self::DOMAIN.len())]
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn codes_round_trip() {
        for status in FlightStatus::DOMAIN {
            assert_eq!(FlightStatus::from_code(status.code()), Ok(status));
        }
    }

    #[test]
    fn codes_outside_domain_rejected() {
        for code in [1u8, 11, 25, 51, 255] {
            assert_eq!(FlightStatus::from_code(code), Err(UnknownStatusCode(code)));
        }
    }

    #[test]
    fn sampling_stays_in_domain() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1_000 {
            let status = FlightStatus::sample(&mut rng);
            assert!(FlightStatus::DOMAIN.contains(&status));
        }
    }

    /// Statistical property: over a large sample every code appears with
    /// roughly uniform frequency. Tolerance is generous so the seeded run
    /// stays deterministic and far from flaky.
    #[test]
    fn sampling_is_roughly_uniform() {
        let mut rng = StdRng::seed_from_u64(99);
        let mut counts: HashMap<FlightStatus, usize> = HashMap::new();
        let samples = 60_000;
        for _ in 0..samples {
            *counts.entry(FlightStatus::sample(&mut rng)).or_default() += 1;
        }
        let expected = samples / FlightStatus::DOMAIN.len();
        for status in FlightStatus::DOMAIN {
            let observed = counts.get(&status).copied().unwrap_or(0);
            let deviation = observed.abs_diff(expected);
            assert!(
                deviation < expected / 5,
                "{status:?} appeared {observed} times, expected about {expected}"
            );
        }
    }
}
