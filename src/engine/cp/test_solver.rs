#![cfg(test)]
//! This module exposes helpers that aid testing of CP propagators. The [`TestSolver`] allows
//! setting up specific scenarios under which to test the various operations of a propagator.

use super::propagation::store::PropagatorStore;
use super::propagation::EnqueueDecision;
use super::propagation::PropagatorInitialisationContext;
use super::TrailedValues;
use crate::basic_types::Inconsistency;
use crate::engine::propagation::LocalId;
use crate::engine::propagation::PropagationContext;
use crate::engine::propagation::PropagationContextMut;
use crate::engine::propagation::Propagator;
use crate::engine::propagation::PropagatorId;
use crate::engine::variables::DomainId;
use crate::engine::variables::IntegerVariable;
use crate::engine::variables::Literal;
use crate::engine::Assignments;
use crate::engine::EmptyDomain;
use crate::engine::WatchListCP;

/// A container for CP variables, which can be used to test propagators.
#[derive(Default, Debug)]
pub(crate) struct TestSolver {
    pub(crate) assignments: Assignments,
    pub(crate) propagator_store: PropagatorStore,
    pub(crate) trailed_values: TrailedValues,
    watch_list: WatchListCP,
}

impl TestSolver {
    pub(crate) fn new_variable(&mut self, lb: i32, ub: i32) -> DomainId {
        self.watch_list.grow();
        self.assignments.grow(lb, ub)
    }

    pub(crate) fn new_sparse_variable(&mut self, values: &[i32]) -> DomainId {
        self.watch_list.grow();
        self.assignments.grow_sparse(values)
    }

    pub(crate) fn new_literal(&mut self) -> Literal {
        let domain_id = self.new_variable(0, 1);
        Literal::new(domain_id)
    }

    pub(crate) fn new_propagator(
        &mut self,
        propagator: impl Propagator + 'static,
    ) -> Result<PropagatorId, Inconsistency> {
        let propagator: Box<dyn Propagator> = Box::new(propagator);
        let id = self.propagator_store.alloc(propagator);

        self.propagator_store[id].initialise_at_root(&mut PropagatorInitialisationContext::new(
            &mut self.watch_list,
            &mut self.trailed_values,
            id,
            &self.assignments,
        ))?;

        self.propagate(id)?;

        Ok(id)
    }

    pub(crate) fn contains<Var: IntegerVariable>(&self, var: Var, value: i32) -> bool {
        var.contains(&self.assignments, value)
    }

    pub(crate) fn lower_bound(&self, var: DomainId) -> i32 {
        self.assignments.get_lower_bound(var)
    }

    pub(crate) fn upper_bound(&self, var: DomainId) -> i32 {
        self.assignments.get_upper_bound(var)
    }

    pub(crate) fn remove(&mut self, var: DomainId, value: i32) -> Result<bool, EmptyDomain> {
        self.assignments.remove_value_from_domain(var, value)
    }

    pub(crate) fn increase_lower_bound_and_notify(
        &mut self,
        propagator: PropagatorId,
        local_id: u32,
        var: DomainId,
        value: i32,
    ) -> EnqueueDecision {
        let result = self.assignments.tighten_lower_bound(var, value);
        assert!(
            result.is_ok(),
            "The provided value to `increase_lower_bound_and_notify` caused an empty domain"
        );
        self.notify(propagator, local_id)
    }

    pub(crate) fn decrease_upper_bound_and_notify(
        &mut self,
        propagator: PropagatorId,
        local_id: u32,
        var: DomainId,
        value: i32,
    ) -> EnqueueDecision {
        let result = self.assignments.tighten_upper_bound(var, value);
        assert!(
            result.is_ok(),
            "The provided value to `decrease_upper_bound_and_notify` caused an empty domain"
        );
        self.notify(propagator, local_id)
    }

    fn notify(&mut self, propagator: PropagatorId, local_id: u32) -> EnqueueDecision {
        let mut decision = EnqueueDecision::Skip;
        let events = self.assignments.drain_domain_events().collect::<Vec<_>>();
        for (event, _) in events {
            let context = PropagationContext::new(&self.assignments);
            let this_decision = self.propagator_store[propagator].notify(
                context,
                LocalId::from(local_id),
                event.into(),
            );
            if this_decision == EnqueueDecision::Enqueue {
                decision = EnqueueDecision::Enqueue;
            }
        }
        decision
    }

    pub(crate) fn set_literal(
        &mut self,
        literal: Literal,
        truth_value: bool,
    ) -> Result<bool, EmptyDomain> {
        match truth_value {
            true => literal.set_lower_bound(&mut self.assignments, 1),
            false => literal.set_upper_bound(&mut self.assignments, 0),
        }
    }

    pub(crate) fn is_literal_false(&self, literal: Literal) -> bool {
        literal.is_false(&self.assignments)
    }

    pub(crate) fn propagate(&mut self, propagator: PropagatorId) -> Result<(), Inconsistency> {
        let context =
            PropagationContextMut::new(&mut self.trailed_values, &mut self.assignments);
        self.propagator_store[propagator].propagate(context)
    }

    pub(crate) fn propagate_until_fixed_point(
        &mut self,
        propagator: PropagatorId,
    ) -> Result<(), Inconsistency> {
        let mut num_trail_entries = self.assignments.num_trail_entries();
        loop {
            self.notify_all(propagator);
            self.propagate(propagator)?;
            if self.assignments.num_trail_entries() == num_trail_entries {
                break;
            }
            num_trail_entries = self.assignments.num_trail_entries();
        }
        Ok(())
    }

    fn notify_all(&mut self, propagator: PropagatorId) {
        let events = self.assignments.drain_domain_events().collect::<Vec<_>>();
        for (event, domain) in events {
            let affected = self
                .watch_list
                .get_affected_propagators(event, domain)
                .to_vec();
            for propagator_var in affected {
                if propagator_var.propagator != propagator {
                    continue;
                }
                let context = PropagationContext::new(&self.assignments);
                let _ = self.propagator_store[propagator].notify(
                    context,
                    propagator_var.variable,
                    event.into(),
                );
            }
        }
    }

    pub(crate) fn assert_bounds(&self, var: DomainId, lb: i32, ub: i32) {
        let actual_lb = self.lower_bound(var);
        let actual_ub = self.upper_bound(var);

        assert_eq!(
            (lb, ub),
            (actual_lb, actual_ub),
            "The expected bounds [{lb}..{ub}] did not match the actual bounds [{actual_lb}..{actual_ub}]"
        );
    }
}
