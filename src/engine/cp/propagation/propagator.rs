use downcast_rs::impl_downcast;
use downcast_rs::Downcast;

use super::PropagationContext;
use super::PropagationContextMut;
use super::PropagatorInitialisationContext;
use crate::basic_types::Entailment;
use crate::basic_types::PropagationStatusCP;
use super::LocalId;
use crate::engine::OpaqueDomainEvent;

// We need this to allow concrete propagator types to be recovered from a
// `Box<dyn Propagator>`; Rust inherently does not allow downcasting from the trait definition
// to its concrete type.
impl_downcast!(Propagator);

/// All propagators implement the [`Propagator`] trait, which defines the main propagator
/// logic with regards to propagation and detecting conflicts.
///
/// The only required functions are [`Propagator::name`], [`Propagator::initialise_at_root`],
/// and [`Propagator::propagate`]; all other functions have default implementations.
pub(crate) trait Propagator: Downcast {
    /// Return the name of the propagator; this is a convenience method that is used for
    /// printing.
    fn name(&self) -> &str;

    /// Initialises the propagator and subscribes it to the domain events of the variables it
    /// reacts to, by calling [`PropagatorInitialisationContext::register`]. The subscriptions
    /// realise the propagation conditions of the propagator. Called exactly once, when the
    /// propagator is added to the solver.
    fn initialise_at_root(
        &mut self,
        context: &mut PropagatorInitialisationContext,
    ) -> PropagationStatusCP;

    /// Propagate method that will be called during search.
    ///
    /// This method extends the current partial assignment with inferred domain changes found
    /// by the propagator. In case no conflict has been detected it should return
    /// [`Result::Ok`], otherwise it should return a [`Result::Err`] with an inconsistency.
    ///
    /// Propagators are not required to propagate until a fixed point; they will be called
    /// again by the solver until no further propagations happen. They must however be
    /// idempotent: running twice without intervening domain changes must not filter further.
    fn propagate(&mut self, context: PropagationContextMut) -> PropagationStatusCP;

    /// Called when an event happens to one of the variables the propagator is subscribed to.
    /// It indicates whether the provided event should cause the propagator to be enqueued.
    ///
    /// This can be used to incrementally maintain data structures, and should only be used
    /// for computationally cheap logic. Expensive computation should be performed in the
    /// [`Propagator::propagate`] method.
    ///
    /// By default the propagator is always enqueued for every event. Not all propagators
    /// will benefit from implementing this, so it is not required to do so.
    fn notify(
        &mut self,
        _context: PropagationContext,
        _local_id: LocalId,
        _event: OpaqueDomainEvent,
    ) -> EnqueueDecision {
        EnqueueDecision::Enqueue
    }

    /// Called each time the solver backtracks; the propagator can then update its internal
    /// data structures given the new variable domains.
    ///
    /// By default this function does nothing.
    fn synchronise(&mut self, _context: PropagationContext) {}

    /// Returns the priority of the propagator represented as an integer. Lower values mean
    /// higher priority and the priority determines the order in which propagators will be
    /// asked to propagate. It is custom for simpler propagators to have lower priority
    /// values.
    fn priority(&self) -> u32 {
        // setting an arbitrary priority by default
        3
    }

    /// The entailment status of the propagator under the current domains: `True` only when
    /// every remaining assignment satisfies the constraint, `False` when a violation is
    /// already witnessed, `Undefined` otherwise.
    fn is_entailed(&self, _context: PropagationContext) -> Entailment {
        Entailment::Undefined
    }
}

/// Indicator of what to do when a propagator is notified.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum EnqueueDecision {
    /// The propagator should be enqueued.
    Enqueue,
    /// The propagator should not be enqueued.
    Skip,
}
