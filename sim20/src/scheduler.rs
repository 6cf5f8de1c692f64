use std::cell::Cell;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::rc::Rc;

use ordered_float::OrderedFloat;

use crate::{Clock, Component, Error, Result};

/// Entry type stored in the scheduler, including the event value, the time when it is supposed
/// to occur, and the sequence number assigned at scheduling.
///
/// Entries are ordered by time, and then by the sequence number, so that two events scheduled for
/// the same time are executed in the order they were inserted. The order is reversed so that the
/// earliest entry is on top of a max-heap.
#[derive(Debug, Clone)]
pub struct EventEntry<E> {
    time: OrderedFloat<f64>,
    seq: u64,
    event: E,
}

impl<E> EventEntry<E> {
    /// Time at which the event occurs.
    #[must_use]
    pub fn time(&self) -> f64 {
        self.time.0
    }

    /// Sequence number assigned by the scheduler; unique within a single scheduler.
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.seq
    }

    /// Event value.
    #[must_use]
    pub fn event(&self) -> &E {
        &self.event
    }

    /// Consumes the entry and returns the event value.
    #[must_use]
    pub fn into_event(self) -> E {
        self.event
    }

    fn key(&self) -> (OrderedFloat<f64>, u64) {
        (self.time, self.seq)
    }
}

impl<E> PartialEq for EventEntry<E> {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl<E> Eq for EventEntry<E> {}

impl<E> PartialOrd for EventEntry<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for EventEntry<E> {
    fn cmp(&self, other: &Self) -> Ordering {
        other.key().cmp(&self.key())
    }
}

/// This struct has only immutable access to the simulation clock exposed.
#[derive(Debug, Clone)]
pub struct ClockRef {
    clock: Clock,
}

impl From<Clock> for ClockRef {
    fn from(clock: Clock) -> Self {
        Self { clock }
    }
}

impl ClockRef {
    /// Return the current simulation time.
    #[must_use]
    pub fn time(&self) -> f64 {
        self.clock.get()
    }
}

/// Scheduler is used to keep the current time and information about the upcoming events.
///
/// The current time only moves forward: it is set to the time of each popped event, and no event
/// can be scheduled before it.
pub struct Scheduler<E> {
    events: BinaryHeap<EventEntry<E>>,
    clock: Clock,
    next_seq: u64,
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self {
            events: BinaryHeap::new(),
            clock: Rc::new(Cell::new(0.0)),
            next_seq: 0,
        }
    }
}

impl<E> fmt::Debug for Scheduler<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("time", &self.time())
            .field("pending", &self.events.len())
            .finish()
    }
}

impl<E> Scheduler<E> {
    /// Schedules `event` to be executed at the absolute `time`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTime`] if `time` is earlier than the current time or is NaN.
    pub fn schedule_at(&mut self, time: f64, event: E) -> Result<()> {
        let now = self.time();
        if time.is_nan() || time < now {
            return Err(Error::InvalidTime { time, now });
        }
        self.push(time, event);
        Ok(())
    }

    /// Schedules `event` to be executed at `self.time() + delay`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTime`] if `delay` is negative or NaN.
    pub fn schedule(&mut self, delay: f64, event: E) -> Result<()> {
        let now = self.time();
        if delay.is_nan() || delay < 0.0 {
            return Err(Error::InvalidTime {
                time: now + delay,
                now,
            });
        }
        self.push(now + delay, event);
        Ok(())
    }

    /// Schedules `event` to be executed at `self.time()`, after all events already scheduled for
    /// that time.
    pub fn schedule_immediately(&mut self, event: E) {
        let now = self.time();
        self.push(now, event);
    }

    fn push(&mut self, time: f64, event: E) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.events.push(EventEntry {
            time: OrderedFloat(time),
            seq,
            event,
        });
    }

    /// Returns the current simulation time.
    #[must_use]
    pub fn time(&self) -> f64 {
        self.clock.get()
    }

    /// Returns a structure with immutable access to the simulation time.
    #[must_use]
    pub fn clock(&self) -> ClockRef {
        ClockRef {
            clock: Rc::clone(&self.clock),
        }
    }

    /// Returns the time of the next scheduled event without removing it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptySchedule`] if no events are pending.
    pub fn peek_time(&self) -> Result<f64> {
        self.events
            .peek()
            .map(EventEntry::time)
            .ok_or(Error::EmptySchedule)
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Answers whether there are no pending events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Iterates over all pending events in an arbitrary order.
    pub fn pending(&self) -> impl Iterator<Item = &EventEntry<E>> {
        self.events.iter()
    }

    /// Removes and returns the next scheduled event or `None` if none are left.
    /// The clock is advanced to the time of the returned event.
    pub fn pop(&mut self) -> Option<EventEntry<E>> {
        self.events.pop().map(|entry| {
            self.clock.set(entry.time());
            entry
        })
    }

    /// Removes the next scheduled event, advances the clock, and lets `component` process it.
    /// Returns the processed entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptySchedule`] (converted to the component's error type) if no events
    /// are pending, or any error returned by the component.
    pub fn run_next<C>(&mut self, component: &mut C) -> std::result::Result<EventEntry<E>, C::Error>
    where
        C: Component<Event = E>,
        E: fmt::Debug,
    {
        let entry = self.pop().ok_or(Error::EmptySchedule)?;
        log::trace!("[{:.4}] {:?}", entry.time(), entry.event());
        component.process_event(entry.event(), self)?;
        Ok(entry)
    }
}
