use super::Constraint;
use crate::basic_types::ConstraintOperationError;
use crate::engine::variables::DomainId;
use crate::engine::variables::IntegerVariable;
use crate::propagators::disjunctive::Disjunctive;
use crate::propagators::disjunctive::DisjunctiveTwoTasks;
use crate::propagators::ArgTask;
use crate::propagators::SchedulingTask;
use crate::Solver;

/// Creates the disjunctive constraint: no two of the tasks overlap in time.
///
/// Fewer than two tasks yield a trivially true constraint; exactly two tasks are posted as
/// the closed-form pair propagator, and more tasks as the n-ary propagator.
pub fn disjunctive<Var>(tasks: impl IntoIterator<Item = ArgTask<Var>>) -> impl Constraint
where
    Var: IntegerVariable + 'static,
{
    DisjunctiveConstructor::<Var, DomainId> {
        tasks: tasks.into_iter().collect(),
        resource: None,
    }
}

/// The disjunctive constraint over tasks carrying height variables on a resource: tasks
/// whose height can still drop to zero are excluded from the resource instead of failing.
pub fn disjunctive_with_resource<Var, HVar>(
    tasks: impl IntoIterator<Item = ArgTask<Var>>,
    heights: impl IntoIterator<Item = HVar>,
    capacity: HVar,
) -> impl Constraint
where
    Var: IntegerVariable + 'static,
    HVar: IntegerVariable + 'static,
{
    DisjunctiveConstructor {
        tasks: tasks.into_iter().collect(),
        resource: Some((heights.into_iter().collect(), capacity)),
    }
}

struct DisjunctiveConstructor<Var, HVar> {
    tasks: Vec<ArgTask<Var>>,
    resource: Option<(Vec<HVar>, HVar)>,
}

impl<Var, HVar> Constraint for DisjunctiveConstructor<Var, HVar>
where
    Var: IntegerVariable + 'static,
    HVar: IntegerVariable + 'static,
{
    fn post(self, solver: &mut Solver) -> Result<(), ConstraintOperationError> {
        if self.tasks.len() < 2 {
            // trivially true
            return Ok(());
        }

        if let Some((heights, _)) = &self.resource {
            if heights.len() != self.tasks.len() {
                return Err(ConstraintOperationError::MalformedConstraint(
                    "tasks and heights must have the same length",
                ));
            }
        }

        let mut tasks = SchedulingTask::from_arg_tasks(self.tasks);

        match self.resource {
            Some((mut heights, capacity)) => {
                if tasks.len() == 2 {
                    let task2 = tasks.pop().unwrap();
                    let task1 = tasks.pop().unwrap();
                    let height2 = heights.pop().unwrap();
                    let height1 = heights.pop().unwrap();
                    solver.add_propagator(DisjunctiveTwoTasks::new(
                        task1,
                        Some(height1),
                        task2,
                        Some(height2),
                    ))
                } else {
                    solver.add_propagator(Disjunctive::new(tasks, heights, capacity))
                }
            }
            None => {
                if tasks.len() == 2 {
                    let task2 = tasks.pop().unwrap();
                    let task1 = tasks.pop().unwrap();
                    solver.add_propagator(DisjunctiveTwoTasks::<Var, HVar>::new(
                        task1, None, task2, None,
                    ))
                } else {
                    // an ad-hoc unit resource: every task uses one unit of a capacity of one
                    let heights: Vec<DomainId> = (0..tasks.len())
                        .map(|_| solver.new_bounded_integer(1, 1))
                        .collect();
                    let capacity = solver.new_bounded_integer(1, 1);
                    solver.add_propagator(Disjunctive::new(tasks, heights, capacity))
                }
            }
        }
    }
}
