use crate::Scheduler;

/// A simulation component reacting to events of a single, closed type.
///
/// All events are dispatched through [`Component::process_event`], which typically is a single
/// `match` over an `enum` of event kinds. While processing, the component may schedule any number
/// of future events and mutate its own state. It happens synchronously, before the scheduler
/// moves on to the next event.
pub trait Component {
    /// Type of events processed by this component.
    type Event;
    /// Error returned when processing fails. Must be able to carry scheduling errors.
    type Error: From<crate::Error>;

    /// Processes `event` at the current time of `scheduler`.
    ///
    /// # Errors
    ///
    /// Returns an error if the event cannot be processed in the current state, or if scheduling
    /// a follow-up event fails.
    fn process_event(
        &mut self,
        event: &Self::Event,
        scheduler: &mut Scheduler<Self::Event>,
    ) -> Result<(), Self::Error>;
}
