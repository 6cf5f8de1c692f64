//! Airport security checkpoint simulation.
//!
//! Travelers arrive at random, join the shortest of several parallel screening stations, and are
//! served one at a time. A small fraction of served travelers is referred to a single senior
//! officer for extra screening before they leave. The simulation collects waiting times and
//! queue lengths that can be compared against queueing-theory predictions.

#![warn(
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::default_trait_access,
    clippy::cast_precision_loss
)]

use std::fmt;

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

mod airport;
pub use airport::{Airport, Distributions};

mod config;
pub use config::{InFlightPolicy, SimulationConfig};

mod distribution;
pub use distribution::{DurationDistribution, Sampler};

mod metrics;
pub use metrics::{CustomerRecord, Metrics, QueueTimeline, RunReport};

mod simulation;
pub use simulation::{ConfiguredSimulation, Simulation};

mod station;
pub use station::{Station, Traveler};

pub mod replication;
pub mod theory;

/// Station ID.
#[derive(
    From,
    Into,
    Debug,
    PartialEq,
    PartialOrd,
    Eq,
    Ord,
    Serialize,
    Deserialize,
    Copy,
    Clone,
    Hash,
    Display,
)]
pub struct StationId(usize);

/// Customer ID, which is also the index of the customer's record in [`Metrics`].
#[derive(
    From,
    Into,
    Debug,
    PartialEq,
    PartialOrd,
    Eq,
    Ord,
    Serialize,
    Deserialize,
    Copy,
    Clone,
    Hash,
    Display,
)]
pub struct CustomerId(usize);

/// Identifies a single-server resource: one of the primary screening stations, or the shared
/// secondary station (the senior officer).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Lane {
    /// Primary screening station.
    Primary(StationId),
    /// Secondary screening by the senior officer.
    Secondary,
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary(id) => write!(f, "station {}", id),
            Self::Secondary => write!(f, "senior officer"),
        }
    }
}

/// Checkpoint events.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Event {
    /// A traveler arrives and joins the shortest queue. Then, the next arrival is scheduled after
    /// a time drawn from the arrival distribution.
    NextArrival,
    /// The server of the lane picks up the next waiting traveler, if it is idle.
    StartService(Lane),
    /// The server of the lane is done with the traveler it was serving.
    FinishService(Lane),
}

/// Checkpoint simulation errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Scheduling failed.
    #[error(transparent)]
    Schedule(#[from] sim20::Error),
    /// The configuration is rejected at construction.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// A finish-service event was processed by a server that was not serving anyone.
    #[error("finish-service event for idle {0}")]
    IdleFinish(Lane),
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
