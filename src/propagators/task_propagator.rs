use crate::basic_types::Entailment;
use crate::basic_types::PropagationStatusCP;
use crate::engine::propagation::LocalId;
use crate::engine::propagation::PropagationContext;
use crate::engine::propagation::PropagationContextMut;
use crate::engine::propagation::Propagator;
use crate::engine::propagation::PropagatorInitialisationContext;
use crate::engine::propagation::ReadDomains;
use crate::engine::DomainEvents;
use crate::engine::variables::IntegerVariable;
use crate::propagators::SchedulingTask;

/// Enforces bound consistency on the task relation `start + duration = end`.
///
/// For an optional task all updates are gated on the task being possibly present, and an
/// update which would empty a domain makes the task absent instead.
///
/// This propagator is not posted for tasks whose `end` is an offset view of `start` with a
/// fixed duration: the relation is then maintained structurally by the domain store.
pub(crate) struct TaskPropagator<Var> {
    task: SchedulingTask<Var>,
}

impl<Var: IntegerVariable> TaskPropagator<Var> {
    pub(crate) fn new(task: SchedulingTask<Var>) -> Self {
        TaskPropagator { task }
    }
}

impl<Var: IntegerVariable + 'static> Propagator for TaskPropagator<Var> {
    fn name(&self) -> &str {
        "TaskRelation"
    }

    fn priority(&self) -> u32 {
        1
    }

    fn initialise_at_root(
        &mut self,
        context: &mut PropagatorInitialisationContext,
    ) -> PropagationStatusCP {
        let _ = context.register(self.task.start.clone(), DomainEvents::BOUNDS, LocalId::from(0));
        let _ = context.register(
            self.task.duration.clone(),
            DomainEvents::BOUNDS,
            LocalId::from(1),
        );
        let _ = context.register(self.task.end.clone(), DomainEvents::BOUNDS, LocalId::from(2));
        if let Some(presence) = self.task.presence {
            let _ = context.register(presence, DomainEvents::LOWER_BOUND_AND_ASSIGN, LocalId::from(3));
        }
        Ok(())
    }

    fn propagate(&mut self, mut context: PropagationContextMut) -> PropagationStatusCP {
        let _ = self.task.propagate_relation(&mut context)?;
        Ok(())
    }

    fn is_entailed(&self, context: PropagationContext) -> Entailment {
        if !self.task.may_be_performed(context) {
            // An absent task satisfies the relation vacuously.
            return Entailment::True;
        }
        if context.is_fixed(&self.task.start)
            && context.is_fixed(&self.task.duration)
            && context.is_fixed(&self.task.end)
            && self.task.must_be_performed(context)
        {
            let holds = context.lower_bound(&self.task.start)
                + context.lower_bound(&self.task.duration)
                == context.lower_bound(&self.task.end);
            if holds {
                return Entailment::True;
            }
            return Entailment::False;
        }
        Entailment::Undefined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::cp::test_solver::TestSolver;
    use crate::engine::variables::Literal;

    fn task_from_triple(
        solver: &mut TestSolver,
        bounds: [(i32, i32); 3],
        presence: Option<Literal>,
    ) -> (SchedulingTask<crate::engine::variables::DomainId>, [crate::engine::variables::DomainId; 3]) {
        let start = solver.new_variable(bounds[0].0, bounds[0].1);
        let duration = solver.new_variable(bounds[1].0, bounds[1].1);
        let end = solver.new_variable(bounds[2].0, bounds[2].1);
        (
            SchedulingTask {
                start,
                duration,
                end,
                presence,
                id: LocalId::from(0),
            },
            [start, duration, end],
        )
    }

    #[test]
    fn bounds_are_made_consistent() {
        let mut solver = TestSolver::default();
        let (task, [start, duration, end]) =
            task_from_triple(&mut solver, [(0, 10), (3, 5), (0, 9)], None);

        let _ = solver
            .new_propagator(TaskPropagator::new(task))
            .expect("no conflict");

        solver.assert_bounds(start, 0, 6);
        solver.assert_bounds(duration, 3, 5);
        solver.assert_bounds(end, 3, 9);
    }

    #[test]
    fn fixed_duration_links_start_and_end() {
        let mut solver = TestSolver::default();
        let (task, [start, _, end]) = task_from_triple(&mut solver, [(2, 8), (4, 4), (0, 20)], None);

        let propagator = solver
            .new_propagator(TaskPropagator::new(task))
            .expect("no conflict");

        solver.assert_bounds(end, 6, 12);

        let _ = solver.increase_lower_bound_and_notify(propagator, 0, start, 5);
        solver.propagate(propagator).expect("no conflict");
        solver.assert_bounds(end, 9, 12);
    }

    #[test]
    fn infeasible_relation_fails() {
        let mut solver = TestSolver::default();
        let (task, _) = task_from_triple(&mut solver, [(8, 8), (9, 9), (0, 9)], None);

        let result = solver.new_propagator(TaskPropagator::new(task));
        assert!(result.is_err());
    }

    #[test]
    fn an_infeasible_optional_task_becomes_absent() {
        let mut solver = TestSolver::default();
        let presence = solver.new_literal();
        let (task, _) = task_from_triple(&mut solver, [(8, 8), (9, 9), (0, 9)], Some(presence));

        let _ = solver
            .new_propagator(TaskPropagator::new(task))
            .expect("the conflict is absorbed by the presence");

        assert!(solver.is_literal_false(presence));
    }

    #[test]
    fn direct_task_updates_go_through_the_variables() {
        let mut solver = TestSolver::default();
        let (task, [start, duration, end]) =
            task_from_triple(&mut solver, [(0, 10), (2, 6), (0, 20)], None);

        let mut context = crate::engine::propagation::PropagationContextMut::new(
            &mut solver.trailed_values,
            &mut solver.assignments,
        );

        assert!(task.update_min_duration(&mut context, 3).expect("no conflict"));
        assert!(task.update_max_duration(&mut context, 5).expect("no conflict"));
        assert!(task.instantiate_start_at(&mut context, 4).expect("no conflict"));
        assert!(task.instantiate_end_at(&mut context, 8).expect("no conflict"));

        solver.assert_bounds(duration, 3, 5);
        solver.assert_bounds(start, 4, 4);
        solver.assert_bounds(end, 8, 8);
    }

    #[test]
    fn forcing_the_presence_of_an_optional_task_fixes_its_literal() {
        let mut solver = TestSolver::default();
        let presence = solver.new_literal();
        let (task, _) = task_from_triple(&mut solver, [(0, 10), (3, 5), (0, 15)], Some(presence));

        let mut context = crate::engine::propagation::PropagationContextMut::new(
            &mut solver.trailed_values,
            &mut solver.assignments,
        );
        assert!(task.force_to_be_performed(&mut context).expect("no conflict"));

        assert!(task.must_be_performed(crate::engine::propagation::PropagationContext::new(
            &solver.assignments
        )));
    }

    #[test]
    fn the_mirror_reads_the_reversed_bounds() {
        let mut solver = TestSolver::default();
        let (task, _) = task_from_triple(&mut solver, [(2, 6), (3, 3), (5, 9)], None);

        let mirror = task.mirror();
        let context = crate::engine::propagation::PropagationContext::new(&solver.assignments);

        assert_eq!(mirror.est(context), -task.lct(context));
        assert_eq!(mirror.lst(context), -task.ect(context));
        assert_eq!(mirror.ect(context), -task.lst(context));
        assert_eq!(mirror.lct(context), -task.est(context));
        assert_eq!(mirror.min_duration(context), task.min_duration(context));
    }

    #[test]
    fn an_absent_task_is_not_filtered() {
        let mut solver = TestSolver::default();
        let presence = solver.new_literal();
        let (task, [start, duration, end]) =
            task_from_triple(&mut solver, [(0, 10), (3, 5), (0, 9)], Some(presence));

        let _ = solver.set_literal(presence, false).expect("no conflict");
        let propagator = solver
            .new_propagator(TaskPropagator::new(task))
            .expect("no conflict");
        solver.propagate(propagator).expect("no conflict");

        solver.assert_bounds(start, 0, 10);
        solver.assert_bounds(duration, 3, 5);
        solver.assert_bounds(end, 0, 9);
    }
}
