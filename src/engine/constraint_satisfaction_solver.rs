use log::debug;

use crate::basic_types::ConstraintOperationError;
use crate::basic_types::PropagationStatusCP;
use crate::basic_types::Solution;
use crate::branching::Brancher;
use crate::engine::cp::propagation::store::PropagatorStore;
use crate::engine::propagation::EnqueueDecision;
use crate::engine::propagation::PropagationContext;
use crate::engine::propagation::PropagationContextMut;
use crate::engine::propagation::Propagator;
use crate::engine::propagation::PropagatorInitialisationContext;
use crate::engine::variables::DomainId;
use crate::engine::Assignments;
use crate::engine::PropagatorQueue;
use crate::engine::TrailedValues;
use crate::engine::WatchListCP;
use crate::kairos_assert_simple;

/// The solver engine: owns the domain store, the trailed values, the propagators and their
/// watch lists, and runs the propagation loop and the depth-first search.
///
/// Propagators are scheduled by priority; events produced by domain writes are delivered to
/// the subscribed propagators which decide whether to enqueue themselves. A failure aborts
/// the current search node and the trail restores all state.
#[derive(Debug)]
pub(crate) struct ConstraintSatisfactionSolver {
    pub(crate) assignments: Assignments,
    pub(crate) trailed_values: TrailedValues,
    propagators: PropagatorStore,
    watch_list: WatchListCP,
    propagator_queue: PropagatorQueue,
    infeasible_at_root: bool,
}

/// During search, the number of priority levels used by the propagator queue.
const NUM_PRIORITY_LEVELS: u32 = 5;

impl Default for ConstraintSatisfactionSolver {
    fn default() -> Self {
        ConstraintSatisfactionSolver {
            assignments: Assignments::default(),
            trailed_values: TrailedValues::default(),
            propagators: PropagatorStore::default(),
            watch_list: WatchListCP::default(),
            propagator_queue: PropagatorQueue::new(NUM_PRIORITY_LEVELS),
            infeasible_at_root: false,
        }
    }
}

impl ConstraintSatisfactionSolver {
    pub(crate) fn create_new_integer_variable(&mut self, lower_bound: i32, upper_bound: i32) -> DomainId {
        kairos_assert_simple!(
            self.assignments.get_decision_level() == 0,
            "variables can only be created at the root"
        );
        self.watch_list.grow();
        self.assignments.grow(lower_bound, upper_bound)
    }

    pub(crate) fn create_new_sparse_integer_variable(&mut self, values: &[i32]) -> DomainId {
        kairos_assert_simple!(
            self.assignments.get_decision_level() == 0,
            "variables can only be created at the root"
        );
        self.watch_list.grow();
        self.assignments.grow_sparse(values)
    }

    pub(crate) fn is_infeasible(&self) -> bool {
        self.infeasible_at_root
    }

    /// Adds a propagator at the root, initialises it, and propagates to a fixpoint. If this
    /// results in a root-level conflict the solver becomes infeasible and every subsequent
    /// operation reports as much.
    pub(crate) fn add_propagator(
        &mut self,
        propagator: impl Propagator + 'static,
    ) -> Result<(), ConstraintOperationError> {
        if self.infeasible_at_root {
            return Err(ConstraintOperationError::InfeasibleState);
        }

        kairos_assert_simple!(
            self.assignments.get_decision_level() == 0,
            "propagators can only be added at the root"
        );

        let propagator: Box<dyn Propagator> = Box::new(propagator);
        let propagator_id = self.propagators.alloc(propagator);

        let mut initialisation_context = PropagatorInitialisationContext::new(
            &mut self.watch_list,
            &mut self.trailed_values,
            propagator_id,
            &self.assignments,
        );

        let initialisation_result =
            self.propagators[propagator_id].initialise_at_root(&mut initialisation_context);

        if initialisation_result.is_err() {
            self.infeasible_at_root = true;
            return Err(ConstraintOperationError::InfeasiblePropagator);
        }

        let priority = self.propagators[propagator_id].priority();
        self.propagator_queue
            .enqueue_propagator(propagator_id, priority);

        if self.propagate_to_fixpoint().is_err() {
            self.infeasible_at_root = true;
            return Err(ConstraintOperationError::InfeasiblePropagator);
        }

        Ok(())
    }

    /// Runs the propagation loop: pops propagators from the priority queue, runs them, and
    /// delivers the produced domain events until both the queue and the event sink are empty.
    pub(crate) fn propagate_to_fixpoint(&mut self) -> PropagationStatusCP {
        self.notify_propagators_about_domain_events();

        while let Some(propagator_id) = self.propagator_queue.pop() {
            let context =
                PropagationContextMut::new(&mut self.trailed_values, &mut self.assignments);

            let result = self.propagators[propagator_id].propagate(context);

            if let Err(inconsistency) = result {
                debug!(
                    "Propagator {} (id {}) reported an inconsistency",
                    self.propagators[propagator_id].name(),
                    propagator_id
                );
                return Err(inconsistency);
            }

            self.notify_propagators_about_domain_events();
        }

        Ok(())
    }

    fn notify_propagators_about_domain_events(&mut self) {
        let events = self.assignments.drain_domain_events().collect::<Vec<_>>();

        for (event, domain) in events {
            let affected_propagators = self
                .watch_list
                .get_affected_propagators(event, domain)
                .to_vec();

            for propagator_var in affected_propagators {
                let context = PropagationContext::new(&self.assignments);
                let decision = self.propagators[propagator_var.propagator].notify(
                    context,
                    propagator_var.variable,
                    event.into(),
                );

                if decision == EnqueueDecision::Enqueue {
                    let priority = self.propagators[propagator_var.propagator].priority();
                    self.propagator_queue
                        .enqueue_propagator(propagator_var.propagator, priority);
                }
            }
        }
    }

    pub(crate) fn declare_new_decision_level(&mut self) {
        self.assignments.increase_decision_level();
        self.trailed_values.increase_decision_level();
    }

    /// Restores the solver to the given decision level: domains, trailed values, and the
    /// propagators' internal structures.
    pub(crate) fn backtrack(&mut self, backtrack_level: usize) {
        kairos_assert_simple!(backtrack_level < self.assignments.get_decision_level());

        self.assignments.synchronise(backtrack_level);
        self.trailed_values.synchronise(backtrack_level);
        self.propagator_queue.clear();

        let context = PropagationContext::new(&self.assignments);
        self.propagators
            .iter_propagators_mut()
            .for_each(|propagator| propagator.synchronise(context));
    }

    /// Depth-first search over the unfixed variables. Every found solution is passed to
    /// `on_solution`; enumeration continues while the callback returns `true`. Returns
    /// whether at least one solution was found. The solver is restored to the root when the
    /// search completes.
    pub(crate) fn solve(
        &mut self,
        brancher: &mut dyn Brancher,
        on_solution: &mut dyn FnMut(Solution) -> bool,
    ) -> bool {
        if self.infeasible_at_root {
            return false;
        }

        if self.propagate_to_fixpoint().is_err() {
            self.infeasible_at_root = true;
            return false;
        }

        let mut found_any = false;
        let mut decisions: Vec<(DomainId, i32)> = Vec::new();

        loop {
            match self.next_decision(brancher) {
                Some((domain, value)) => {
                    self.declare_new_decision_level();
                    decisions.push((domain, value));

                    let conflict = self.assignments.make_assignment(domain, value).is_err()
                        || self.propagate_to_fixpoint().is_err();

                    if conflict && !self.backtrack_and_exclude(&mut decisions) {
                        break;
                    }
                }
                None => {
                    found_any = true;
                    debug!(
                        "Solution found at decision level {}",
                        self.assignments.get_decision_level()
                    );

                    let keep_going = on_solution(Solution::from_assignments(&self.assignments));

                    if !keep_going || !self.backtrack_and_exclude(&mut decisions) {
                        break;
                    }
                }
            }
        }

        if self.assignments.get_decision_level() > 0 {
            self.backtrack(0);
        }

        found_any
    }

    /// Asks the brancher for the next decision; any variable the brancher does not cover is
    /// picked up by an input-order minimum-value fallback so that solutions always have every
    /// domain fixed.
    fn next_decision(&mut self, brancher: &mut dyn Brancher) -> Option<(DomainId, i32)> {
        brancher.next_decision(&self.assignments).or_else(|| {
            self.assignments
                .get_domains()
                .find(|&domain| !self.assignments.is_domain_assigned(domain))
                .map(|domain| (domain, self.assignments.get_lower_bound(domain)))
        })
    }

    /// Undoes decisions until one can be refuted by removing the tried value from its domain
    /// without immediately failing again. Returns false when the search tree is exhausted.
    fn backtrack_and_exclude(&mut self, decisions: &mut Vec<(DomainId, i32)>) -> bool {
        loop {
            if self.assignments.get_decision_level() == 0 {
                return false;
            }

            let (domain, value) = decisions.pop().expect("one decision per decision level");
            self.backtrack(self.assignments.get_decision_level() - 1);

            let excluded = self.assignments.remove_value_from_domain(domain, value);
            if excluded.is_ok() && self.propagate_to_fixpoint().is_ok() {
                return true;
            }
        }
    }
}
