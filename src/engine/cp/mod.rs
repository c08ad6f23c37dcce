mod assignments;
pub(crate) mod domain_events;
mod event_sink;
mod opaque_domain_event;
pub(crate) mod propagation;
mod propagator_queue;
pub(crate) mod test_solver;
mod trailed;
pub(crate) mod watch_lists;

pub use assignments::Assignments;
pub use assignments::EmptyDomain;
pub(crate) use domain_events::DomainEvents;
pub use opaque_domain_event::OpaqueDomainEvent;
pub(crate) use propagator_queue::PropagatorQueue;
pub use trailed::TrailedInteger;
pub use trailed::TrailedValues;
pub use watch_lists::IntDomainEvent;
pub(crate) use watch_lists::WatchListCP;
pub use watch_lists::Watchers;
