use serde::{Deserialize, Serialize};

use crate::{DurationDistribution, Error, Result};

/// What to do with travelers whose primary service has not started when the simulation stops.
#[derive(
    Debug, PartialEq, Eq, Clone, Copy, strum::EnumString, strum::ToString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InFlightPolicy {
    /// Leave them out of the waiting-time sample.
    Exclude,
    /// Record the time they have waited so far, up to the horizon.
    Partial,
}

impl Default for InFlightPolicy {
    fn default() -> Self {
        Self::Exclude
    }
}

/// Configuration for a single simulation run.
///
/// Missing fields in a deserialized configuration are taken from the reference scenario, see
/// [`SimulationConfig::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Time between consecutive arrivals.
    pub arrival: DurationDistribution,
    /// Primary screening time.
    pub service: DurationDistribution,
    /// Secondary screening time at the senior officer.
    pub secondary_service: DurationDistribution,
    /// Probability that a traveler is referred to the senior officer.
    pub referral_probability: f64,
    /// Number of primary screening stations.
    pub num_stations: usize,
    /// Virtual time at which the simulation stops.
    pub horizon: f64,
    /// Seed of the random number generator.
    pub seed: u64,
    /// Treatment of travelers still waiting at the horizon.
    pub in_flight: InFlightPolicy,
}

impl Default for SimulationConfig {
    /// One day (in minutes) at a checkpoint with three stations, 1.2 arrivals per minute,
    /// and 3% of travelers referred to the senior officer.
    fn default() -> Self {
        Self {
            arrival: DurationDistribution::Exponential { rate: 1.2 },
            service: DurationDistribution::TruncatedNormal {
                mean: 2.0,
                std_dev: 0.5,
            },
            secondary_service: DurationDistribution::TruncatedNormal {
                mean: 5.0,
                std_dev: 1.5,
            },
            referral_probability: 0.03,
            num_stations: 3,
            horizon: 1440.0,
            seed: 0,
            in_flight: InFlightPolicy::Exclude,
        }
    }
}

impl SimulationConfig {
    /// Returns the same configuration with a different number of stations.
    #[must_use]
    pub fn with_stations(mut self, num_stations: usize) -> Self {
        self.num_stations = num_stations;
        self
    }

    /// Returns the same configuration with a different seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Checks the configuration. Nothing is clamped: any value out of range is an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.num_stations == 0 {
            return Err(Error::InvalidConfiguration(String::from(
                "at least one station is required",
            )));
        }
        validate_probability(self.referral_probability)?;
        if !(self.horizon.is_finite() && self.horizon > 0.0) {
            return Err(Error::InvalidConfiguration(format!(
                "horizon must be positive, got {}",
                self.horizon
            )));
        }
        self.arrival.validate()?;
        self.service.validate()?;
        self.secondary_service.validate()
    }
}

pub(crate) fn validate_probability(probability: f64) -> Result<()> {
    if (0.0..=1.0).contains(&probability) {
        Ok(())
    } else {
        Err(Error::InvalidConfiguration(format!(
            "referral probability must be in [0, 1], got {}",
            probability
        )))
    }
}
