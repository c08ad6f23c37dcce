use crate::engine::IntDomainEvent;

/// A wrapper for a domain event, which forces the propagator implementation to map the event
/// through the variable the event is for, so that views can reinterpret it.
#[derive(Clone, Copy, Debug)]
pub struct OpaqueDomainEvent(IntDomainEvent);

impl From<IntDomainEvent> for OpaqueDomainEvent {
    fn from(event: IntDomainEvent) -> Self {
        OpaqueDomainEvent(event)
    }
}

impl OpaqueDomainEvent {
    pub(crate) fn unwrap(self) -> IntDomainEvent {
        self.0
    }
}
