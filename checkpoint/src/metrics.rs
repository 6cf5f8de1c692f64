use serde::Serialize;
use sim20::ClockRef;

use crate::{CustomerId, InFlightPolicy, Lane, StationId};

/// Timestamps of a single customer going through the checkpoint.
///
/// Created on arrival; once `departure_time` is set, it is never modified again.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerRecord {
    /// Station the customer was routed to.
    pub station: StationId,
    /// Whether the customer is referred to the senior officer.
    pub referred: bool,
    /// Arrival at the checkpoint.
    pub arrival_time: f64,
    /// Start of the primary screening.
    pub service_start_time: Option<f64>,
    /// Arrival at the senior officer's queue.
    pub secondary_arrival_time: Option<f64>,
    /// Start of the secondary screening.
    pub secondary_start_time: Option<f64>,
    /// Leaving the checkpoint.
    pub departure_time: Option<f64>,
}

impl CustomerRecord {
    /// Time spent waiting for the primary screening, if it has started.
    #[must_use]
    pub fn waiting_time(&self) -> Option<f64> {
        self.service_start_time.map(|start| start - self.arrival_time)
    }

    /// Time spent waiting for the senior officer, if the secondary screening has started.
    #[must_use]
    pub fn secondary_waiting_time(&self) -> Option<f64> {
        self.secondary_arrival_time
            .zip(self.secondary_start_time)
            .map(|(arrival, start)| start - arrival)
    }

    /// Whether the customer has left.
    #[must_use]
    pub fn has_departed(&self) -> bool {
        self.departure_time.is_some()
    }
}

/// Queue length as a step function of time.
///
/// A sample is recorded on every change; the length holds until the next sample.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueTimeline {
    samples: Vec<(f64, usize)>,
}

impl Default for QueueTimeline {
    fn default() -> Self {
        Self {
            samples: vec![(0.0, 0)],
        }
    }
}

impl QueueTimeline {
    /// Records that the queue has length `length` from `time` onward.
    pub fn record(&mut self, time: f64, length: usize) {
        self.samples.push((time, length));
    }

    /// All recorded samples, in order of time.
    #[must_use]
    pub fn samples(&self) -> &[(f64, usize)] {
        &self.samples
    }

    /// The most recent queue length.
    #[must_use]
    pub fn current(&self) -> usize {
        self.samples.last().map_or(0, |&(_, length)| length)
    }

    /// Maximum observed queue length.
    #[must_use]
    pub fn max(&self) -> usize {
        self.samples.iter().map(|&(_, length)| length).max().unwrap_or(0)
    }

    /// Time-weighted average of the queue length over `[0, end]`: each length is weighted by
    /// the time it was held. Returns 0 if `end` is not positive.
    #[must_use]
    pub fn time_average(&self, end: f64) -> f64 {
        if end <= 0.0 {
            return 0.0;
        }
        let area: f64 = self
            .samples
            .iter()
            .zip(
                self.samples
                    .iter()
                    .skip(1)
                    .map(|&(time, _)| time)
                    .chain(std::iter::once(end)),
            )
            .map(|(&(from, length), to)| (to.min(end) - from.min(end)) * length as f64)
            .sum();
        area / end
    }
}

/// Collects customer records and queue length timelines during a run.
#[derive(Debug, Clone)]
pub struct Metrics {
    clock: ClockRef,
    customers: Vec<CustomerRecord>,
    stations: Vec<QueueTimeline>,
    senior: QueueTimeline,
}

impl Metrics {
    /// Constructs empty metrics for `num_stations` stations, timestamped with `clock`.
    #[must_use]
    pub fn new(clock: ClockRef, num_stations: usize) -> Self {
        Self {
            clock,
            customers: Vec::new(),
            stations: vec![QueueTimeline::default(); num_stations],
            senior: QueueTimeline::default(),
        }
    }

    /// Creates a record of a customer arriving now and returns its ID.
    pub fn arrive(&mut self, station: StationId, referred: bool) -> CustomerId {
        let id = CustomerId(self.customers.len());
        self.customers.push(CustomerRecord {
            station,
            referred,
            arrival_time: self.clock.time(),
            service_start_time: None,
            secondary_arrival_time: None,
            secondary_start_time: None,
            departure_time: None,
        });
        id
    }

    /// Records the customer joining the senior officer's queue now.
    pub fn refer(&mut self, customer: CustomerId) {
        let time = self.clock.time();
        self.record_mut(customer).secondary_arrival_time = Some(time);
    }

    /// Records the start of the customer's service at `lane` now.
    pub fn start_service(&mut self, customer: CustomerId, lane: Lane) {
        let time = self.clock.time();
        let record = self.record_mut(customer);
        match lane {
            Lane::Primary(_) => record.service_start_time = Some(time),
            Lane::Secondary => record.secondary_start_time = Some(time),
        }
    }

    /// Records the customer leaving the checkpoint now.
    pub fn depart(&mut self, customer: CustomerId) {
        let time = self.clock.time();
        self.record_mut(customer).departure_time = Some(time);
    }

    /// Records the current queue length at `lane`.
    pub fn queue_changed(&mut self, lane: Lane, length: usize) {
        let time = self.clock.time();
        self.timeline_mut(lane).record(time, length);
    }

    /// All customer records, in order of arrival.
    #[must_use]
    pub fn customers(&self) -> &[CustomerRecord] {
        &self.customers
    }

    /// Customer record by ID.
    #[must_use]
    pub fn customer(&self, customer: CustomerId) -> Option<&CustomerRecord> {
        self.customers.get(customer.0)
    }

    /// Queue length timeline of `lane`.
    ///
    /// # Panics
    ///
    /// Panics if `lane` refers to a station that does not exist.
    #[must_use]
    pub fn timeline(&self, lane: Lane) -> &QueueTimeline {
        match lane {
            Lane::Primary(id) => &self.stations[id.0],
            Lane::Secondary => &self.senior,
        }
    }

    fn timeline_mut(&mut self, lane: Lane) -> &mut QueueTimeline {
        match lane {
            Lane::Primary(id) => &mut self.stations[id.0],
            Lane::Secondary => &mut self.senior,
        }
    }

    fn record_mut(&mut self, customer: CustomerId) -> &mut CustomerRecord {
        &mut self.customers[customer.0]
    }

    /// Summarizes the run stopped at `horizon`. `in_system` is the number of customers still
    /// waiting or in service, as counted by the stations.
    #[must_use]
    pub fn report(&self, horizon: f64, policy: InFlightPolicy, in_system: usize) -> RunReport {
        let unfinished = |arrival: f64| match policy {
            InFlightPolicy::Exclude => None,
            InFlightPolicy::Partial => Some(horizon - arrival),
        };
        let waiting_times = self
            .customers
            .iter()
            .filter_map(|c| c.waiting_time().or_else(|| unfinished(c.arrival_time)))
            .collect();
        let secondary_waiting_times = self
            .customers
            .iter()
            .filter_map(|c| {
                c.secondary_waiting_time()
                    .or_else(|| c.secondary_arrival_time.and_then(unfinished))
            })
            .collect();
        RunReport {
            horizon,
            waiting_times,
            secondary_waiting_times,
            average_queue_lengths: self
                .stations
                .iter()
                .map(|t| t.time_average(horizon))
                .collect(),
            max_queue_lengths: self.stations.iter().map(QueueTimeline::max).collect(),
            secondary_average_queue_length: self.senior.time_average(horizon),
            secondary_max_queue_length: self.senior.max(),
            arrived: self.customers.len(),
            departed: self.customers.iter().filter(|c| c.has_departed()).count(),
            in_system,
            censored: self
                .customers
                .iter()
                .filter(|c| c.service_start_time.is_none())
                .count(),
        }
    }
}

/// Results of a single simulation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// Virtual time at which the run stopped.
    pub horizon: f64,
    /// Waiting times for the primary screening, in order of arrival.
    pub waiting_times: Vec<f64>,
    /// Waiting times for the senior officer, in order of arrival.
    pub secondary_waiting_times: Vec<f64>,
    /// Time-weighted average queue length at each station.
    pub average_queue_lengths: Vec<f64>,
    /// Maximum queue length at each station.
    pub max_queue_lengths: Vec<usize>,
    /// Time-weighted average queue length at the senior officer.
    pub secondary_average_queue_length: f64,
    /// Maximum queue length at the senior officer.
    pub secondary_max_queue_length: usize,
    /// Number of customers that arrived.
    pub arrived: usize,
    /// Number of customers that left.
    pub departed: usize,
    /// Number of customers still waiting or in service at the horizon.
    pub in_system: usize,
    /// Number of customers whose primary screening had not started at the horizon.
    pub censored: usize,
}

impl RunReport {
    /// Mean of the primary waiting times, or NaN if nobody was served.
    #[must_use]
    pub fn mean_waiting_time(&self) -> f64 {
        mean(&self.waiting_times)
    }

    /// Mean of the secondary waiting times, or NaN if nobody was referred and served.
    #[must_use]
    pub fn mean_secondary_waiting_time(&self) -> f64 {
        mean(&self.secondary_waiting_times)
    }

    /// Average queue length over all stations.
    #[must_use]
    pub fn average_queue_length(&self) -> f64 {
        mean(&self.average_queue_lengths)
    }

    /// Maximum queue length over all stations.
    #[must_use]
    pub fn max_queue_length(&self) -> usize {
        self.max_queue_lengths.iter().copied().max().unwrap_or(0)
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod test {
    use super::*;

    use std::cell::Cell;
    use std::rc::Rc;

    use float_cmp::approx_eq;
    use rstest::{fixture, rstest};

    #[test]
    fn test_time_average_weights_by_duration() {
        let mut timeline = QueueTimeline::default();
        timeline.record(1.0, 4);
        timeline.record(2.0, 1);
        timeline.record(2.0, 2);
        timeline.record(6.0, 0);
        // 0 for 1, 4 for 1, 1 for 0, 2 for 4, 0 for 4; the plain mean of samples would be 1.4.
        assert!(approx_eq!(f64, timeline.time_average(10.0), 1.2, ulps = 2));
        assert!(approx_eq!(f64, timeline.time_average(4.0), 2.0, ulps = 2));
        assert_eq!(timeline.max(), 4);
        assert_eq!(timeline.current(), 0);
        assert_eq!(timeline.time_average(0.0), 0.0);
    }

    struct Fixture {
        clock: Rc<Cell<f64>>,
        metrics: Metrics,
    }

    #[fixture]
    fn fixture() -> Fixture {
        let clock = Rc::new(Cell::new(0.0));
        let metrics = Metrics::new(Rc::clone(&clock).into(), 2);
        Fixture { clock, metrics }
    }

    #[rstest]
    fn test_customer_lifecycle(fixture: Fixture) {
        let Fixture { clock, mut metrics } = fixture;
        let lane = Lane::Primary(StationId(1));

        clock.set(1.0);
        let id = metrics.arrive(StationId(1), true);
        metrics.queue_changed(lane, 1);
        clock.set(3.0);
        metrics.start_service(id, lane);
        metrics.queue_changed(lane, 0);
        clock.set(4.0);
        metrics.refer(id);
        clock.set(4.5);
        metrics.start_service(id, Lane::Secondary);
        clock.set(6.0);
        metrics.depart(id);

        let record = metrics.customer(id).unwrap();
        assert_eq!(record.waiting_time(), Some(2.0));
        assert_eq!(record.secondary_waiting_time(), Some(0.5));
        assert_eq!(record.departure_time, Some(6.0));
        assert!(record.has_departed());
        assert_eq!(metrics.timeline(lane).samples(), &[(0.0, 0), (1.0, 1), (3.0, 0)]);
        assert_eq!(metrics.timeline(Lane::Secondary).samples(), &[(0.0, 0)]);
    }

    fn populate(fixture: Fixture) -> Metrics {
        let Fixture { clock, mut metrics } = fixture;
        let served = metrics.arrive(StationId(0), false);
        metrics.start_service(served, Lane::Primary(StationId(0)));
        clock.set(2.0);
        let waiting = metrics.arrive(StationId(0), false);
        clock.set(3.0);
        metrics.start_service(waiting, Lane::Primary(StationId(0)));
        clock.set(6.0);
        let _censored = metrics.arrive(StationId(1), false);
        metrics.depart(served);
        metrics
    }

    #[rstest]
    fn test_report_excludes_in_flight(fixture: Fixture) {
        let report = populate(fixture).report(10.0, InFlightPolicy::Exclude, 2);
        assert_eq!(report.waiting_times, vec![0.0, 1.0]);
        assert_eq!(report.arrived, 3);
        assert_eq!(report.departed, 1);
        assert_eq!(report.in_system, 2);
        assert_eq!(report.censored, 1);
        assert_eq!(report.mean_waiting_time(), 0.5);
        assert_eq!(report.average_queue_lengths, vec![0.0, 0.0]);
        assert!(report.secondary_waiting_times.is_empty());
        assert!(report.mean_secondary_waiting_time().is_nan());
    }

    #[rstest]
    fn test_report_records_partial_waits(fixture: Fixture) {
        let report = populate(fixture).report(10.0, InFlightPolicy::Partial, 2);
        assert_eq!(report.waiting_times, vec![0.0, 1.0, 4.0]);
        assert_eq!(report.censored, 1);
    }
}
