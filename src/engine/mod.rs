pub(crate) mod constraint_satisfaction_solver;
pub(crate) mod cp;
pub(crate) mod variables;

pub(crate) use constraint_satisfaction_solver::ConstraintSatisfactionSolver;
pub use cp::Assignments;
pub(crate) use cp::DomainEvents;
pub use cp::EmptyDomain;
pub use cp::IntDomainEvent;
pub use cp::OpaqueDomainEvent;
pub use cp::TrailedInteger;
pub use cp::TrailedValues;
pub(crate) use cp::PropagatorQueue;
pub(crate) use cp::WatchListCP;
pub use cp::Watchers;
pub(crate) use cp::propagation;
