//! Independent replications of a simulation and their statistical summary.
//!
//! Each replication runs the same configuration with a different seed. Seeds are derived from
//! the configured base seed, so the same base seed gives the same replications regardless of how
//! many threads run them. Using the same base seed for different numbers of stations also makes
//! them share random number streams, which sharpens comparisons between them.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};
use statrs::statistics::Statistics;

use crate::{ConfiguredSimulation, Error, Result, RunReport, SimulationConfig};

/// Confidence level of the reported intervals.
pub const CONFIDENCE_LEVEL: f64 = 0.95;

/// Sample mean with the half-width of its confidence interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Estimate {
    /// Sample mean.
    pub mean: f64,
    /// Half-width of the Student-t confidence interval at [`CONFIDENCE_LEVEL`].
    pub half_width: f64,
}

impl Estimate {
    /// Estimates the mean of the population from the sample.
    ///
    /// The mean is NaN if the sample is empty, and the half-width is infinite if there are fewer
    /// than two values.
    #[must_use]
    pub fn from_sample(sample: &[f64]) -> Self {
        let mean = sample.mean();
        let half_width = if sample.len() < 2 {
            f64::INFINITY
        } else {
            let dof = (sample.len() - 1) as f64;
            let quantile = StudentsT::new(0.0, 1.0, dof)
                .map(|t| t.inverse_cdf(1.0 - (1.0 - CONFIDENCE_LEVEL) / 2.0))
                .unwrap_or(f64::INFINITY);
            quantile * sample.std_dev() / (sample.len() as f64).sqrt()
        };
        Self { mean, half_width }
    }

    /// Lower end of the confidence interval.
    #[must_use]
    pub fn lower(&self) -> f64 {
        self.mean - self.half_width
    }

    /// Upper end of the confidence interval.
    #[must_use]
    pub fn upper(&self) -> f64 {
        self.mean + self.half_width
    }

    /// Whether `value` falls within the confidence interval.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        self.lower() <= value && value <= self.upper()
    }
}

/// Summary of replications for one number of stations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplicationSummary {
    /// Number of stations.
    pub num_stations: usize,
    /// Number of replications.
    pub replications: usize,
    /// Mean waiting time for the primary screening.
    pub mean_waiting_time: Estimate,
    /// Time-weighted queue length, averaged over stations.
    pub average_queue_length: Estimate,
    /// Maximum queue length over all stations.
    pub max_queue_length: Estimate,
    /// Mean waiting time for the senior officer.
    pub mean_secondary_waiting_time: Estimate,
}

/// Derives `replications` seeds from `base_seed`.
#[must_use]
pub fn seeds(base_seed: u64, replications: usize) -> Vec<u64> {
    let mut rng = ChaCha8Rng::seed_from_u64(base_seed);
    (0..replications).map(|_| rng.next_u64()).collect()
}

/// Runs `replications` independent replications of `config` in parallel, returning the reports
/// in order of their seeds (see [`seeds`]).
///
/// # Errors
///
/// Returns an error if the configuration is invalid, no replications are requested, or any
/// replication fails.
pub fn replicate(config: &SimulationConfig, replications: usize) -> Result<Vec<RunReport>> {
    if replications == 0 {
        return Err(Error::InvalidConfiguration(String::from(
            "at least one replication is required",
        )));
    }
    config.validate()?;
    seeds(config.seed, replications)
        .into_par_iter()
        .map(|seed| ConfiguredSimulation::from_config(&config.clone().with_seed(seed))?.run())
        .collect()
}

/// Reduces the reports of replications to estimates of each metric.
///
/// Replications in which nobody was served (or referred and served, for the secondary waiting
/// time) do not contribute to the respective waiting time estimate.
#[must_use]
pub fn summarize(num_stations: usize, reports: &[RunReport]) -> ReplicationSummary {
    let defined = |values: Vec<f64>| values.into_iter().filter(|v| !v.is_nan()).collect::<Vec<_>>();
    let waiting = defined(reports.iter().map(RunReport::mean_waiting_time).collect());
    let secondary = defined(
        reports
            .iter()
            .map(RunReport::mean_secondary_waiting_time)
            .collect(),
    );
    let average: Vec<f64> = reports.iter().map(RunReport::average_queue_length).collect();
    let max: Vec<f64> = reports
        .iter()
        .map(|r| r.max_queue_length() as f64)
        .collect();
    ReplicationSummary {
        num_stations,
        replications: reports.len(),
        mean_waiting_time: Estimate::from_sample(&waiting),
        average_queue_length: Estimate::from_sample(&average),
        max_queue_length: Estimate::from_sample(&max),
        mean_secondary_waiting_time: Estimate::from_sample(&secondary),
    }
}

/// Replicates `config` for each number of stations in `station_counts`.
///
/// # Errors
///
/// See [`replicate`].
pub fn sweep(
    config: &SimulationConfig,
    station_counts: &[usize],
    replications: usize,
) -> Result<Vec<ReplicationSummary>> {
    station_counts
        .iter()
        .map(|&num_stations| {
            let reports = replicate(&config.clone().with_stations(num_stations), replications)?;
            Ok(summarize(num_stations, &reports))
        })
        .collect()
}
