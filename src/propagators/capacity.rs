use crate::basic_types::Entailment;
use crate::basic_types::PropagationStatusCP;
use crate::containers::IntQueueSet;
use crate::engine::propagation::EnqueueDecision;
use crate::engine::propagation::LocalId;
use crate::engine::propagation::ManipulateTrailedValues;
use crate::engine::propagation::PropagationContext;
use crate::engine::propagation::PropagationContextMut;
use crate::engine::propagation::Propagator;
use crate::engine::propagation::PropagatorInitialisationContext;
use crate::engine::propagation::ReadDomains;
use crate::engine::variables::IntegerVariable;
use crate::engine::DomainEvents;
use crate::engine::OpaqueDomainEvent;
use crate::engine::TrailedInteger;
use crate::propagators::resource;
use crate::propagators::SchedulingTask;

/// Per-task sanity checks against the capacity: a task whose minimal height exceeds the
/// capacity is forced off the resource, and mandatory tasks with positive duration bound the
/// capacity from below and their height from above.
///
/// A trailed integer remembers the last seen `capacity.ub` so that the linear scan only runs
/// when the capacity actually changed; the propagator passivates once the sum of all height
/// upper bounds fits under `capacity.lb`.
pub(crate) struct Capacity<Var, HVar> {
    tasks: Vec<SchedulingTask<Var>>,
    heights: Vec<HVar>,
    capacity: HVar,
    last_capacity_max: TrailedInteger,
    is_active: TrailedInteger,
    pending_tasks: IntQueueSet,
}

impl<Var: IntegerVariable, HVar: IntegerVariable> Capacity<Var, HVar> {
    pub(crate) fn new(tasks: Vec<SchedulingTask<Var>>, heights: Vec<HVar>, capacity: HVar) -> Self {
        let num_tasks = tasks.len();
        Capacity {
            tasks,
            heights,
            capacity,
            last_capacity_max: TrailedInteger::default(),
            is_active: TrailedInteger::default(),
            pending_tasks: IntQueueSet::new(num_tasks),
        }
    }

    fn propagate_task(
        &self,
        context: &mut PropagationContextMut,
        index: usize,
    ) -> PropagationStatusCP {
        let task = &self.tasks[index];
        let height = &self.heights[index];

        if context.as_readonly().upper_bound(&self.capacity)
            < context.as_readonly().lower_bound(height)
        {
            if task.must_be_performed(context.as_readonly()) {
                let _ = task.update_duration(context, 0, 0)?;
            } else {
                let _ = task.force_to_be_optional(context)?;
            }
        } else if task.must_be_performed(context.as_readonly())
            && task.min_duration(context.as_readonly()) > 0
        {
            let capacity_max = context.as_readonly().upper_bound(&self.capacity);
            let _ = context.set_upper_bound(height, capacity_max)?;
            let height_min = context.as_readonly().lower_bound(height);
            let _ = context.set_lower_bound(&self.capacity, height_min)?;
        }
        Ok(())
    }
}

impl<Var: IntegerVariable + 'static, HVar: IntegerVariable + 'static> Propagator
    for Capacity<Var, HVar>
{
    fn name(&self) -> &str {
        "Capacity"
    }

    fn priority(&self) -> u32 {
        2
    }

    fn initialise_at_root(
        &mut self,
        context: &mut PropagatorInitialisationContext,
    ) -> PropagationStatusCP {
        let num_tasks = self.tasks.len();
        for (index, task) in self.tasks.iter().enumerate() {
            let _ = context.register(
                task.duration.clone(),
                DomainEvents::LOWER_BOUND_AND_ASSIGN,
                LocalId::from(index as u32),
            );
        }
        for (index, height) in self.heights.iter().enumerate() {
            let _ = context.register(
                height.clone(),
                DomainEvents::LOWER_BOUND_AND_ASSIGN,
                LocalId::from((num_tasks + index) as u32),
            );
        }
        let _ = context.register(
            self.capacity.clone(),
            DomainEvents::UPPER_BOUND_AND_ASSIGN,
            LocalId::from(2 * num_tasks as u32),
        );

        let capacity_max = context.upper_bound(&self.capacity);
        self.last_capacity_max = context.new_trailed_integer(capacity_max as i64 + 1);
        self.is_active = context.new_trailed_integer(1);

        Ok(())
    }

    fn notify(
        &mut self,
        _context: PropagationContext,
        local_id: LocalId,
        _event: OpaqueDomainEvent,
    ) -> EnqueueDecision {
        let index = local_id.unpack() as usize;
        if index < 2 * self.tasks.len() {
            self.pending_tasks.add(index % self.tasks.len());
        }
        EnqueueDecision::Enqueue
    }

    fn propagate(&mut self, mut context: PropagationContextMut) -> PropagationStatusCP {
        if context.value(self.is_active) == 0 {
            return Ok(());
        }

        let _ = context.set_lower_bound(&self.capacity, 0)?;
        for height in &self.heights {
            let _ = context.set_lower_bound(height, 0)?;
        }

        while let Some(index) = self.pending_tasks.remove() {
            self.propagate_task(&mut context, index)?;
        }

        let capacity_max = context.as_readonly().upper_bound(&self.capacity) as i64;
        if context.value(self.last_capacity_max) != capacity_max {
            context.assign(self.last_capacity_max, capacity_max);

            let mut sum_of_heights: i64 = 0;
            for index in 0..self.tasks.len() {
                self.propagate_task(&mut context, index)?;
                if self.tasks[index].may_be_performed(context.as_readonly()) {
                    sum_of_heights +=
                        context.as_readonly().upper_bound(&self.heights[index]) as i64;
                }
            }

            if sum_of_heights <= context.as_readonly().lower_bound(&self.capacity) as i64 {
                context.assign(self.is_active, 0);
            }
        }

        Ok(())
    }

    fn is_entailed(&self, context: PropagationContext) -> Entailment {
        resource::is_entailed(context, false, &self.tasks, &self.heights, &self.capacity)
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
    fn heights_are_bounded_by_the_capacity() {
        let mut solver = TestSolver::default();
        let task = new_task(&mut solver, (0, 10), (2, 2), (2, 12), 0);
        let height = solver.new_variable(1, 9);
        let capacity = solver.new_variable(0, 4);

        let _ = solver
            .new_propagator(Capacity::new(vec![task], vec![height], capacity))
            .expect("no conflict");

        solver.assert_bounds(height, 1, 4);
        solver.assert_bounds(capacity, 1, 4);
    }

    #[test]
    fn a_task_which_cannot_fit_gets_zero_duration() {
        let mut solver = TestSolver::default();
        let task = new_task(&mut solver, (0, 10), (0, 5), (0, 15), 0);
        let duration = task.duration;
        let height = solver.new_variable(7, 9);
        let capacity = solver.new_variable(0, 4);

        let _ = solver
            .new_propagator(Capacity::new(vec![task], vec![height], capacity))
            .expect("no conflict");

        solver.assert_bounds(duration, 0, 0);
    }

    #[test]
    fn an_optional_task_which_cannot_fit_becomes_absent() {
        let mut solver = TestSolver::default();
        let presence = solver.new_literal();
        let mut task = new_task(&mut solver, (0, 10), (1, 5), (1, 15), 0);
        task.presence = Some(presence);
        let height = solver.new_variable(7, 9);
        let capacity = solver.new_variable(0, 4);

        let _ = solver
            .new_propagator(Capacity::new(vec![task], vec![height], capacity))
            .expect("no conflict");

        assert!(solver.is_literal_false(presence));
    }
}
