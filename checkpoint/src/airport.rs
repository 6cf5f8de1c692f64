use rand::Rng;
use rand_distr::Distribution;
use sim20::{ClockRef, Component, Scheduler};

use crate::config::validate_probability;
use crate::{
    Error, Event, InFlightPolicy, Lane, Metrics, Result, RunReport, Station, StationId, Traveler,
};

/// Distributions of durations driving the checkpoint.
#[derive(Debug, Clone)]
pub struct Distributions<A, S, T> {
    /// Time between consecutive arrivals.
    pub arrival: A,
    /// Primary screening time.
    pub service: S,
    /// Secondary screening time.
    pub secondary_service: T,
}

/// The airport security checkpoint: a number of primary screening stations working in parallel
/// and the senior officer shared by all of them.
///
/// Each arriving traveler joins the station with the shortest queue; ties are broken by the
/// lowest station index. After the primary screening, a referred traveler joins the senior
/// officer's queue, and everyone else leaves.
pub struct Airport<R, A, S, T> {
    rng: R,
    distributions: Distributions<A, S, T>,
    referral_probability: f64,
    stations: Vec<Station>,
    senior: Station,
    metrics: Metrics,
}

impl<R, A, S, T> Airport<R, A, S, T>
where
    R: Rng,
    A: Distribution<f64>,
    S: Distribution<f64>,
    T: Distribution<f64>,
{
    /// Constructs a checkpoint with `num_stations` idle stations. All random values are drawn
    /// from `rng`; `clock` is used to timestamp the collected metrics.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if there are no stations or the referral
    /// probability is not in `[0, 1]`.
    pub fn new(
        rng: R,
        distributions: Distributions<A, S, T>,
        referral_probability: f64,
        num_stations: usize,
        clock: ClockRef,
    ) -> Result<Self> {
        if num_stations == 0 {
            return Err(Error::InvalidConfiguration(String::from(
                "at least one station is required",
            )));
        }
        validate_probability(referral_probability)?;
        Ok(Self {
            rng,
            distributions,
            referral_probability,
            stations: vec![Station::default(); num_stations],
            senior: Station::default(),
            metrics: Metrics::new(clock, num_stations),
        })
    }

    /// Primary screening stations.
    #[must_use]
    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    /// The station serving `lane`.
    ///
    /// # Panics
    ///
    /// Panics if `lane` refers to a station that does not exist.
    #[must_use]
    pub fn station(&self, lane: Lane) -> &Station {
        match lane {
            Lane::Primary(id) => &self.stations[id.0],
            Lane::Secondary => &self.senior,
        }
    }

    /// All lanes: primary stations in order, followed by the senior officer.
    pub fn lanes(&self) -> impl Iterator<Item = Lane> {
        (0..self.stations.len())
            .map(|id| Lane::Primary(StationId(id)))
            .chain(std::iter::once(Lane::Secondary))
    }

    /// Metrics collected so far.
    #[must_use]
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Number of travelers waiting or in service anywhere in the checkpoint.
    #[must_use]
    pub fn in_system(&self) -> usize {
        self.stations
            .iter()
            .chain(std::iter::once(&self.senior))
            .map(Station::in_system)
            .sum()
    }

    /// Summarizes the metrics collected up to `horizon`.
    #[must_use]
    pub fn report(&self, horizon: f64, policy: InFlightPolicy) -> RunReport {
        self.metrics.report(horizon, policy, self.in_system())
    }

    /// The station with the fewest waiting travelers, the lowest index winning ties.
    #[must_use]
    pub fn shortest_queue(&self) -> StationId {
        self.stations
            .iter()
            .enumerate()
            .min_by_key(|(_, station)| station.queue_length())
            .map_or(StationId(0), |(id, _)| StationId(id))
    }

    fn station_mut(&mut self, lane: Lane) -> &mut Station {
        match lane {
            Lane::Primary(id) => &mut self.stations[id.0],
            Lane::Secondary => &mut self.senior,
        }
    }

    fn referral(&mut self) -> bool {
        let probability = self.referral_probability;
        if probability <= 0.0 {
            false
        } else if probability >= 1.0 {
            true
        } else {
            self.rng.gen_bool(probability)
        }
    }

    fn next_arrival(&mut self, scheduler: &mut Scheduler<Event>) -> Result<()> {
        let delay = self.distributions.arrival.sample(&mut self.rng);
        let referred = self.referral();
        let station = self.shortest_queue();
        let id = self.metrics.arrive(station, referred);
        log::debug!(
            "[{:.4}] Customer {} routed to station {}",
            scheduler.time(),
            id,
            station
        );
        self.enter(Lane::Primary(station), Traveler { id, referred }, scheduler);
        scheduler.schedule(delay, Event::NextArrival)?;
        Ok(())
    }

    fn enter(&mut self, lane: Lane, traveler: Traveler, scheduler: &mut Scheduler<Event>) {
        let station = self.station_mut(lane);
        let start = station.arrive(traveler);
        let length = station.queue_length();
        self.metrics.queue_changed(lane, length);
        if start {
            scheduler.schedule_immediately(Event::StartService(lane));
        }
    }

    fn start_service(&mut self, lane: Lane, scheduler: &mut Scheduler<Event>) -> Result<()> {
        let station = self.station_mut(lane);
        let traveler = match station.start_service() {
            Some(traveler) => traveler,
            None => {
                log::trace!("[{:.4}] Nothing to start at {}", scheduler.time(), lane);
                return Ok(());
            }
        };
        let length = station.queue_length();
        self.metrics.queue_changed(lane, length);
        self.metrics.start_service(traveler.id, lane);
        let duration = match lane {
            Lane::Primary(_) => self.distributions.service.sample(&mut self.rng),
            Lane::Secondary => self.distributions.secondary_service.sample(&mut self.rng),
        };
        log::debug!(
            "[{:.4}] Customer {} served at {} for {:.4}",
            scheduler.time(),
            traveler.id,
            lane,
            duration
        );
        scheduler.schedule(duration, Event::FinishService(lane))?;
        Ok(())
    }

    fn finish_service(&mut self, lane: Lane, scheduler: &mut Scheduler<Event>) -> Result<()> {
        let (traveler, start_next) = self
            .station_mut(lane)
            .finish_service()
            .ok_or(Error::IdleFinish(lane))?;
        match lane {
            Lane::Primary(_) if traveler.referred => {
                log::debug!(
                    "[{:.4}] Customer {} referred to the senior officer",
                    scheduler.time(),
                    traveler.id
                );
                self.metrics.refer(traveler.id);
                self.enter(Lane::Secondary, traveler, scheduler);
            }
            _ => self.metrics.depart(traveler.id),
        }
        if start_next {
            scheduler.schedule_immediately(Event::StartService(lane));
        }
        Ok(())
    }
}

impl<R, A, S, T> Component for Airport<R, A, S, T>
where
    R: Rng,
    A: Distribution<f64>,
    S: Distribution<f64>,
    T: Distribution<f64>,
{
    type Event = Event;
    type Error = Error;

    fn process_event(&mut self, event: &Event, scheduler: &mut Scheduler<Event>) -> Result<()> {
        match *event {
            Event::NextArrival => self.next_arrival(scheduler),
            Event::StartService(lane) => self.start_service(lane, scheduler),
            Event::FinishService(lane) => self.finish_service(lane, scheduler),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::CustomerId;

    use rand::rngs::mock::StepRng;
    use testing::{Fixed, Scripted};

    type TestAirport = Airport<StepRng, Scripted<f64>, Fixed<f64>, Fixed<f64>>;

    fn airport(
        scheduler: &Scheduler<Event>,
        arrivals: Vec<f64>,
        service: f64,
        referral_probability: f64,
        num_stations: usize,
    ) -> Result<TestAirport> {
        Airport::new(
            StepRng::new(0, 1),
            Distributions {
                arrival: Scripted::new(arrivals),
                service: Fixed(service),
                secondary_service: Fixed(2.0),
            },
            referral_probability,
            num_stations,
            scheduler.clock(),
        )
    }

    fn run_before(
        time: f64,
        scheduler: &mut Scheduler<Event>,
        airport: &mut TestAirport,
    ) -> Vec<(f64, Event)> {
        let mut events = Vec::new();
        while scheduler.peek_time().unwrap() < time {
            let entry = scheduler.run_next(airport).unwrap();
            events.push((entry.time(), *entry.event()));
        }
        events
    }

    fn traveler(id: usize) -> Traveler {
        Traveler {
            id: CustomerId(id),
            referred: false,
        }
    }

    #[test]
    fn test_routes_to_shortest_queue_lowest_index() {
        let mut scheduler = Scheduler::default();
        let mut airport = airport(&scheduler, vec![1.0], 1.0, 0.0, 3).unwrap();
        for (station, length) in [3, 1, 1].iter().enumerate() {
            for id in 0..*length {
                airport.stations[station].arrive(traveler(id));
            }
        }
        assert_eq!(airport.shortest_queue(), StationId(1));

        scheduler.schedule_immediately(Event::NextArrival);
        scheduler.run_next(&mut airport).unwrap();
        let lengths: Vec<_> = airport.stations().iter().map(Station::queue_length).collect();
        assert_eq!(lengths, vec![3, 2, 1]);
        assert_eq!(
            airport.metrics().customers()[0].station,
            StationId(1),
            "routing decision recorded"
        );
        assert_eq!(airport.shortest_queue(), StationId(2));
    }

    #[test]
    fn test_same_time_finish_and_arrival_follow_schedule_order() {
        let mut scheduler = Scheduler::default();
        let mut airport = airport(&scheduler, vec![1.0], 1.5, 0.0, 1).unwrap();
        scheduler.schedule_immediately(Event::NextArrival);
        let events = run_before(4.0, &mut scheduler, &mut airport);

        let primary = Lane::Primary(StationId(0));
        let at_three: Vec<_> = events
            .iter()
            .filter(|(time, _)| *time == 3.0)
            .map(|(_, event)| *event)
            .collect();
        assert_eq!(
            at_three,
            vec![
                Event::FinishService(primary),
                Event::NextArrival,
                Event::StartService(primary),
            ]
        );

        let starts: Vec<_> = airport
            .metrics()
            .customers()
            .iter()
            .map(|c| c.service_start_time)
            .collect();
        assert_eq!(starts, vec![Some(0.0), Some(1.5), Some(3.0), None]);
        let waits: Vec<_> = airport
            .metrics()
            .customers()
            .iter()
            .filter_map(|c| c.waiting_time())
            .collect();
        assert_eq!(waits, vec![0.0, 0.5, 1.0]);
        assert_eq!(airport.station(primary).queue_length(), 1);
        assert!(airport.station(primary).is_busy());
        assert_eq!(airport.in_system(), 2);
    }

    #[test]
    fn test_referred_traveler_visits_senior_officer() {
        let mut scheduler = Scheduler::default();
        let mut airport = airport(&scheduler, vec![10.0], 1.0, 1.0, 2).unwrap();
        scheduler.schedule_immediately(Event::NextArrival);
        let events = run_before(10.0, &mut scheduler, &mut airport);
        assert_eq!(
            events
                .iter()
                .filter(|(_, e)| *e == Event::FinishService(Lane::Secondary))
                .count(),
            1
        );
        let record = &airport.metrics().customers()[0];
        assert!(record.referred);
        assert_eq!(record.service_start_time, Some(0.0));
        assert_eq!(record.secondary_arrival_time, Some(1.0));
        assert_eq!(record.secondary_start_time, Some(1.0));
        assert_eq!(record.departure_time, Some(3.0));
        assert_eq!(airport.in_system(), 0);
    }

    #[test]
    fn test_finish_on_idle_server_fails() {
        let mut scheduler = Scheduler::default();
        let mut airport = airport(&scheduler, vec![1.0], 1.0, 0.0, 1).unwrap();
        scheduler.schedule_immediately(Event::FinishService(Lane::Secondary));
        assert_eq!(
            scheduler.run_next(&mut airport).unwrap_err(),
            Error::IdleFinish(Lane::Secondary)
        );
    }

    #[test]
    fn test_negative_duration_is_rejected_by_scheduler() {
        let mut scheduler = Scheduler::default();
        let mut airport = airport(&scheduler, vec![-1.0], 1.0, 0.0, 1).unwrap();
        scheduler.schedule_immediately(Event::NextArrival);
        assert!(matches!(
            scheduler.run_next(&mut airport),
            Err(Error::Schedule(sim20::Error::InvalidTime { .. }))
        ));
    }

    #[test]
    fn test_invalid_construction() {
        let scheduler = Scheduler::default();
        assert!(airport(&scheduler, vec![1.0], 1.0, 0.0, 0).is_err());
        assert!(airport(&scheduler, vec![1.0], 1.0, 1.01, 1).is_err());
        let airport = airport(&scheduler, vec![1.0], 1.0, 0.5, 2).unwrap();
        assert_eq!(
            airport.lanes().collect::<Vec<_>>(),
            vec![
                Lane::Primary(StationId(0)),
                Lane::Primary(StationId(1)),
                Lane::Secondary
            ]
        );
    }
}
