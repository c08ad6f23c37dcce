use super::contexts::HasAssignments;
use super::contexts::HasTrailedValues;
use crate::engine::propagation::LocalId;
use crate::engine::propagation::PropagatorId;
use crate::engine::propagation::PropagatorVarId;
use crate::engine::variables::IntegerVariable;
use crate::engine::Assignments;
use crate::engine::DomainEvents;
use crate::engine::TrailedValues;
use crate::engine::WatchListCP;
use crate::engine::Watchers;

/// The context provided to [`Propagator::initialise_at_root`]; used to register the
/// propagator for domain events (its propagation conditions) and to allocate trailed
/// integers for its backtrackable state.
///
/// [`Propagator::initialise_at_root`]: crate::engine::propagation::Propagator::initialise_at_root
pub(crate) struct PropagatorInitialisationContext<'a> {
    watch_list: &'a mut WatchListCP,
    pub(crate) trailed_values: &'a mut TrailedValues,
    propagator_id: PropagatorId,
    pub(crate) assignments: &'a Assignments,
}

impl<'a> PropagatorInitialisationContext<'a> {
    pub(crate) fn new(
        watch_list: &'a mut WatchListCP,
        trailed_values: &'a mut TrailedValues,
        propagator_id: PropagatorId,
        assignments: &'a Assignments,
    ) -> Self {
        PropagatorInitialisationContext {
            watch_list,
            trailed_values,
            propagator_id,
            assignments,
        }
    }

    /// Subscribes the propagator to the given [`DomainEvents`] on `var`; the propagator will
    /// be notified with `local_id` when one of the events happens to `var`.
    pub(crate) fn register<Var: IntegerVariable>(
        &mut self,
        var: Var,
        domain_events: DomainEvents,
        local_id: LocalId,
    ) -> Var {
        let propagator_var = PropagatorVarId {
            propagator: self.propagator_id,
            variable: local_id,
        };

        let mut watchers = Watchers::new(propagator_var, self.watch_list);
        var.watch_all(&mut watchers, domain_events.get_int_events());

        var
    }
}

impl HasAssignments for PropagatorInitialisationContext<'_> {
    fn assignments(&self) -> &Assignments {
        self.assignments
    }
}

impl HasTrailedValues for PropagatorInitialisationContext<'_> {
    fn trailed_values(&self) -> &TrailedValues {
        self.trailed_values
    }

    fn trailed_values_mut(&mut self) -> &mut TrailedValues {
        self.trailed_values
    }
}
