use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::Distribution;
use sim20::{EventEntry, Scheduler};

use crate::{
    Airport, Distributions, Error, Event, InFlightPolicy, Result, RunReport, Sampler,
    SimulationConfig,
};

/// Simulation built from a [`SimulationConfig`].
pub type ConfiguredSimulation = Simulation<ChaCha8Rng, Sampler, Sampler, Sampler>;

/// A single simulation run: the scheduler, the checkpoint it drives, and the stopping rule.
///
/// The run stops before the first event scheduled at or after the horizon, so at least one
/// future event is always left unprocessed.
pub struct Simulation<R, A, S, T> {
    scheduler: Scheduler<Event>,
    airport: Airport<R, A, S, T>,
    horizon: f64,
    policy: InFlightPolicy,
}

impl ConfiguredSimulation {
    /// Constructs a simulation from the configuration, seeding the random number generator with
    /// `config.seed`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if the configuration is invalid.
    pub fn from_config(config: &SimulationConfig) -> Result<Self> {
        config.validate()?;
        let distributions = Distributions {
            arrival: config.arrival.sampler()?,
            service: config.service.sampler()?,
            secondary_service: config.secondary_service.sampler()?,
        };
        Self::new(
            ChaCha8Rng::seed_from_u64(config.seed),
            distributions,
            config.referral_probability,
            config.num_stations,
            config.horizon,
        )
        .map(|sim| sim.in_flight_policy(config.in_flight))
    }
}

impl<R, A, S, T> Simulation<R, A, S, T>
where
    R: Rng,
    A: Distribution<f64>,
    S: Distribution<f64>,
    T: Distribution<f64>,
{
    /// Constructs a simulation with idle stations and the first arrival scheduled at time 0.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if the horizon is not positive, or the checkpoint
    /// cannot be constructed (see [`Airport::new`]).
    pub fn new(
        rng: R,
        distributions: Distributions<A, S, T>,
        referral_probability: f64,
        num_stations: usize,
        horizon: f64,
    ) -> Result<Self> {
        if !(horizon > 0.0) {
            return Err(Error::InvalidConfiguration(format!(
                "horizon must be positive, got {}",
                horizon
            )));
        }
        let mut scheduler = Scheduler::default();
        let airport = Airport::new(
            rng,
            distributions,
            referral_probability,
            num_stations,
            scheduler.clock(),
        )?;
        scheduler.schedule_immediately(Event::NextArrival);
        Ok(Self {
            scheduler,
            airport,
            horizon,
            policy: InFlightPolicy::default(),
        })
    }

    /// Sets the policy for travelers still waiting at the horizon.
    #[must_use]
    pub fn in_flight_policy(mut self, policy: InFlightPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Current simulation time.
    #[must_use]
    pub fn time(&self) -> f64 {
        self.scheduler.time()
    }

    /// The time at which the simulation stops.
    #[must_use]
    pub fn horizon(&self) -> f64 {
        self.horizon
    }

    /// The scheduler with all pending events.
    #[must_use]
    pub fn scheduler(&self) -> &Scheduler<Event> {
        &self.scheduler
    }

    /// The simulated checkpoint.
    #[must_use]
    pub fn airport(&self) -> &Airport<R, A, S, T> {
        &self.airport
    }

    /// Processes the next event if it occurs before the horizon, and returns it.
    /// Returns `None` once the horizon is reached.
    ///
    /// # Errors
    ///
    /// Returns an error if the event cannot be processed. It indicates a defect and the
    /// simulation should not be continued.
    pub fn step(&mut self) -> Result<Option<EventEntry<Event>>> {
        if self.scheduler.peek_time()? >= self.horizon {
            return Ok(None);
        }
        self.scheduler.run_next(&mut self.airport).map(Some)
    }

    /// Runs until the horizon and returns the report.
    ///
    /// # Errors
    ///
    /// See [`Simulation::step`].
    pub fn run(mut self) -> Result<RunReport> {
        let mut processed = 0_usize;
        while self.step()?.is_some() {
            processed += 1;
        }
        let report = self.report();
        log::info!(
            "Processed {} events until {}: {} arrived, {} departed, {} in system",
            processed,
            self.horizon,
            report.arrived,
            report.departed,
            report.in_system
        );
        Ok(report)
    }

    /// Report of the metrics collected so far, integrated up to the horizon.
    #[must_use]
    pub fn report(&self) -> RunReport {
        self.airport.report(self.horizon, self.policy)
    }
}
