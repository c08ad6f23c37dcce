use crate::basic_types::Entailment;
use crate::basic_types::PropagationStatusCP;
use crate::engine::propagation::LocalId;
use crate::engine::propagation::PropagationContext;
use crate::engine::propagation::PropagationContextMut;
use crate::engine::propagation::Propagator;
use crate::engine::propagation::PropagatorInitialisationContext;
use crate::engine::variables::IntegerVariable;
use crate::engine::DomainEvents;
use crate::propagators::resource;
use crate::propagators::SchedulingTask;

/// Closed-form filtering for a disjunction of exactly two tasks: when the compulsory parts
/// intersect the weaker task is forced off; when one task can only run first, the other is
/// pushed after it.
pub(crate) struct DisjunctiveTwoTasks<Var, HVar> {
    task1: SchedulingTask<Var>,
    task2: SchedulingTask<Var>,
    height1: Option<HVar>,
    height2: Option<HVar>,
}

impl<Var: IntegerVariable, HVar: IntegerVariable> DisjunctiveTwoTasks<Var, HVar> {
    pub(crate) fn new(
        task1: SchedulingTask<Var>,
        height1: Option<HVar>,
        task2: SchedulingTask<Var>,
        height2: Option<HVar>,
    ) -> Self {
        DisjunctiveTwoTasks {
            task1,
            task2,
            height1,
            height2,
        }
    }
}

impl<Var: IntegerVariable + 'static, HVar: IntegerVariable + 'static> Propagator
    for DisjunctiveTwoTasks<Var, HVar>
{
    fn name(&self) -> &str {
        "DisjunctiveTwoTasks"
    }

    fn priority(&self) -> u32 {
        1
    }

    fn initialise_at_root(
        &mut self,
        context: &mut PropagatorInitialisationContext,
    ) -> PropagationStatusCP {
        let mut local_id = 0;
        for task in [&self.task1, &self.task2] {
            let _ = context.register(task.start.clone(), DomainEvents::BOUNDS, LocalId::from(local_id));
            let _ = context.register(
                task.duration.clone(),
                DomainEvents::BOUNDS,
                LocalId::from(local_id + 1),
            );
            let _ = context.register(task.end.clone(), DomainEvents::BOUNDS, LocalId::from(local_id + 2));
            local_id += 3;
        }
        for height in [&self.height1, &self.height2].into_iter().flatten() {
            let _ = context.register(
                height.clone(),
                DomainEvents::LOWER_BOUND_AND_ASSIGN,
                LocalId::from(local_id),
            );
            local_id += 1;
        }
        for presence in [&self.task1.presence, &self.task2.presence]
            .into_iter()
            .flatten()
        {
            let _ = context.register(*presence, DomainEvents::BOUNDS, LocalId::from(local_id));
            local_id += 1;
        }
        Ok(())
    }

    fn propagate(&mut self, mut context: PropagationContextMut) -> PropagationStatusCP {
        let read = context.as_readonly();
        if !resource::may_be_performed(read, &self.task1, self.height1.as_ref())
            || !resource::may_be_performed(read, &self.task2, self.height2.as_ref())
        {
            return Ok(());
        }

        let must_be_performed_1 = resource::must_be_performed(read, &self.task1, self.height1.as_ref());
        let must_be_performed_2 = resource::must_be_performed(read, &self.task2, self.height2.as_ref());

        if resource::intersect(read, &self.task1, &self.task2) {
            if must_be_performed_1 {
                let _ = resource::filter_optional_task(
                    &mut context,
                    &self.task2,
                    self.height2.as_ref(),
                )?;
            } else if must_be_performed_2 {
                let _ = resource::filter_optional_task(
                    &mut context,
                    &self.task1,
                    self.height1.as_ref(),
                )?;
            }
        } else if self.task1.lst(read) < self.task2.ect(read) {
            // task1 runs before task2
            if must_be_performed_1 {
                let ect1 = self.task1.ect(context.as_readonly());
                let _ = resource::filter_est(&mut context, &self.task2, self.height2.as_ref(), ect1)?;
            }
            if must_be_performed_2 {
                let lst2 = self.task2.lst(context.as_readonly());
                let _ = resource::filter_lct(&mut context, &self.task1, self.height1.as_ref(), lst2)?;
            }
        } else if self.task2.lst(read) < self.task1.ect(read) {
            // task2 runs before task1
            if must_be_performed_2 {
                let ect2 = self.task2.ect(context.as_readonly());
                let _ = resource::filter_est(&mut context, &self.task1, self.height1.as_ref(), ect2)?;
            }
            if must_be_performed_1 {
                let lst1 = self.task1.lst(context.as_readonly());
                let _ = resource::filter_lct(&mut context, &self.task2, self.height2.as_ref(), lst1)?;
            }
        }

        Ok(())
    }

    fn is_entailed(&self, context: PropagationContext) -> Entailment {
        if !resource::may_be_performed(context, &self.task1, self.height1.as_ref())
            || !resource::may_be_performed(context, &self.task2, self.height2.as_ref())
            || self.task1.lct(context) <= self.task2.est(context)
            || self.task2.lct(context) <= self.task1.est(context)
        {
            Entailment::True
        } else if resource::must_be_performed(context, &self.task1, self.height1.as_ref())
            && resource::must_be_performed(context, &self.task2, self.height2.as_ref())
            && resource::intersect(context, &self.task1, &self.task2)
        {
            Entailment::False
        } else {
            Entailment::Undefined
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::cp::test_solver::TestSolver;
    use crate::engine::variables::DomainId;

    fn new_task(
        solver: &mut TestSolver,
        start: (i32, i32),
        duration: (i32, i32),
        end: (i32, i32),
        id: u32,
    ) -> SchedulingTask<DomainId> {
        SchedulingTask {
            start: solver.new_variable(start.0, start.1),
            duration: solver.new_variable(duration.0, duration.1),
            end: solver.new_variable(end.0, end.1),
            presence: None,
            id: LocalId::from(id),
        }
    }

    #[test]
    fn the_second_task_is_pushed_after_the_first() {
        let mut solver = TestSolver::default();
        let task1 = new_task(&mut solver, (0, 2), (5, 5), (5, 7), 0);
        let task2 = new_task(&mut solver, (3, 10), (2, 2), (5, 12), 1);
        let start2 = task2.start;

        let _ = solver
            .new_propagator(DisjunctiveTwoTasks::<DomainId, DomainId>::new(
                task1, None, task2, None,
            ))
            .expect("no conflict");

        // task1 spans [2, 5) at the latest, so task2 starts at its earliest completion
        solver.assert_bounds(start2, 5, 10);
    }

    #[test]
    fn intersecting_mandatory_tasks_fail() {
        let mut solver = TestSolver::default();
        let task1 = new_task(&mut solver, (0, 1), (5, 5), (5, 6), 0);
        let task2 = new_task(&mut solver, (2, 3), (4, 4), (6, 7), 1);

        let result = solver.new_propagator(DisjunctiveTwoTasks::<DomainId, DomainId>::new(
            task1, None, task2, None,
        ));
        assert!(result.is_err());
    }

    #[test]
    fn an_intersecting_optional_task_is_forced_off() {
        let mut solver = TestSolver::default();
        let task1 = new_task(&mut solver, (0, 1), (5, 5), (5, 6), 0);
        let presence = solver.new_literal();
        let mut task2 = new_task(&mut solver, (2, 3), (4, 4), (6, 7), 1);
        task2.presence = Some(presence);

        let _ = solver
            .new_propagator(DisjunctiveTwoTasks::<DomainId, DomainId>::new(
                task1, None, task2, None,
            ))
            .expect("the conflict is absorbed by the presence");

        assert!(solver.is_literal_false(presence));
    }

    #[test]
    fn entailment_of_disjoint_windows() {
        let mut solver = TestSolver::default();
        let task1 = new_task(&mut solver, (0, 1), (3, 3), (3, 4), 0);
        let task2 = new_task(&mut solver, (6, 9), (2, 2), (8, 11), 1);

        let propagator = DisjunctiveTwoTasks::<DomainId, DomainId>::new(task1, None, task2, None);
        let context = PropagationContext::new(&solver.assignments);
        assert_eq!(propagator.is_entailed(context), Entailment::True);
    }
}
