#![warn(
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::default_trait_access)]

//! This is a general purpose discrete-event simulation engine that provides a scheduler keeping
//! the virtual clock, and a component abstraction that reacts to scheduled events.
//!
//! Events are plain values of a closed type (typically an `enum`), and they are executed in the
//! order of their time. Events scheduled for the same time are executed in the order in which
//! they were scheduled, which makes every run reproducible.

use std::cell::Cell;
use std::rc::Rc;

pub use component::Component;
pub use scheduler::{ClockRef, EventEntry, Scheduler};

mod component;
mod scheduler;

/// Simulation clock, shared between the scheduler and any [`ClockRef`] handed out.
pub type Clock = Rc<Cell<f64>>;

/// Errors raised by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum Error {
    /// An event was scheduled before the current time, or at a time that is not a number.
    #[error("cannot schedule an event at {time} when the current time is {now}")]
    InvalidTime {
        /// Requested time of the event.
        time: f64,
        /// Current simulation time.
        now: f64,
    },
    /// Requested the next event but none are pending.
    #[error("no events are scheduled")]
    EmptySchedule,
}

/// Result type returned by the scheduler.
pub type Result<T> = std::result::Result<T, Error>;
