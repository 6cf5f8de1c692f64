use std::collections::VecDeque;

use crate::CustomerId;

/// A traveler waiting in a queue or being served.
///
/// Only what is needed after arrival is kept here; the timestamps live in the customer's record.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Traveler {
    /// ID of the customer record.
    pub id: CustomerId,
    /// Whether the traveler must also pass through the secondary station.
    pub referred: bool,
}

/// A single-server station with a FIFO waiting line.
///
/// The same state machine is used for the primary screening stations and for the secondary
/// station; they only differ in what feeds them. The station itself does not schedule anything:
/// transitions report what needs to be scheduled, and the caller does it.
#[derive(Debug, Default, Clone)]
pub struct Station {
    waiting: VecDeque<Traveler>,
    in_service: Option<Traveler>,
    start_pending: bool,
}

impl Station {
    /// Number of travelers waiting, not counting the one in service.
    #[must_use]
    pub fn queue_length(&self) -> usize {
        self.waiting.len()
    }

    /// Whether a traveler is being served.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_service.is_some()
    }

    /// Number of travelers at the station, waiting or in service.
    #[must_use]
    pub fn in_system(&self) -> usize {
        self.waiting.len() + usize::from(self.is_busy())
    }

    /// Iterates over waiting travelers, front of the line first.
    pub fn waiting(&self) -> impl Iterator<Item = &Traveler> {
        self.waiting.iter()
    }

    /// Traveler currently in service.
    #[must_use]
    pub fn in_service(&self) -> Option<Traveler> {
        self.in_service
    }

    /// Puts `traveler` at the end of the line.
    ///
    /// Returns `true` if the caller must schedule a start-service event: the server is idle and
    /// no start is pending yet.
    pub fn arrive(&mut self, traveler: Traveler) -> bool {
        self.waiting.push_back(traveler);
        self.request_start()
    }

    /// Takes the first traveler from the line into service.
    ///
    /// Returns `None`, leaving the state unchanged, when the server is busy or nobody is waiting.
    pub fn start_service(&mut self) -> Option<Traveler> {
        self.start_pending = false;
        if self.is_busy() {
            return None;
        }
        let traveler = self.waiting.pop_front()?;
        self.in_service = Some(traveler);
        Some(traveler)
    }

    /// Releases the traveler in service.
    ///
    /// Returns the released traveler and whether the caller must schedule a start-service event
    /// for the next one in line. Returns `None` if nobody was in service.
    pub fn finish_service(&mut self) -> Option<(Traveler, bool)> {
        let traveler = self.in_service.take()?;
        Some((traveler, self.request_start()))
    }

    fn request_start(&mut self) -> bool {
        if self.is_busy() || self.start_pending || self.waiting.is_empty() {
            false
        } else {
            self.start_pending = true;
            true
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn traveler(id: usize) -> Traveler {
        Traveler {
            id: CustomerId::from(id),
            referred: false,
        }
    }

    #[test]
    fn test_idle_station_serves_arrival() {
        let mut station = Station::default();
        assert!(!station.is_busy());
        assert!(station.arrive(traveler(0)));
        assert_eq!(station.queue_length(), 1);
        assert_eq!(station.start_service(), Some(traveler(0)));
        assert!(station.is_busy());
        assert_eq!(station.queue_length(), 0);
        assert_eq!(station.in_system(), 1);
        assert_eq!(station.finish_service(), Some((traveler(0), false)));
        assert!(!station.is_busy());
        assert_eq!(station.in_system(), 0);
    }

    #[test]
    fn test_busy_station_queues_in_order() {
        let mut station = Station::default();
        assert!(station.arrive(traveler(0)));
        assert!(station.start_service().is_some());
        assert!(!station.arrive(traveler(1)));
        assert!(!station.arrive(traveler(2)));
        assert_eq!(
            station.waiting().map(|t| t.id).collect::<Vec<_>>(),
            vec![CustomerId::from(1), CustomerId::from(2)]
        );
        assert_eq!(station.start_service(), None);
        assert_eq!(station.queue_length(), 2);

        assert_eq!(station.finish_service(), Some((traveler(0), true)));
        assert_eq!(station.start_service(), Some(traveler(1)));
        assert_eq!(station.finish_service(), Some((traveler(1), true)));
        assert_eq!(station.start_service(), Some(traveler(2)));
        assert_eq!(station.finish_service(), Some((traveler(2), false)));
    }

    #[test]
    fn test_only_one_start_requested_for_simultaneous_arrivals() {
        let mut station = Station::default();
        assert!(station.arrive(traveler(0)));
        assert!(!station.arrive(traveler(1)));
        assert_eq!(station.start_service(), Some(traveler(0)));
        assert_eq!(station.in_service(), Some(traveler(0)));
        assert_eq!(station.queue_length(), 1);
    }

    #[test]
    fn test_start_on_empty_station_is_noop() {
        let mut station = Station::default();
        assert_eq!(station.start_service(), None);
        assert!(!station.is_busy());
        assert_eq!(station.finish_service(), None);
    }
}
