use itertools::Itertools;

use super::Constraint;
use crate::basic_types::ConstraintOperationError;
use crate::engine::variables::IntegerVariable;
use crate::propagators::arithmetic::LessThanOrEquals;
use crate::propagators::capacity::Capacity;
use crate::propagators::cumulative::Cumulative;
use crate::propagators::cumulative::CumulativeGraph;
use crate::propagators::ArgTask;
use crate::propagators::SchedulingTask;
use crate::Solver;

/// Which internal propagator realises the cumulative constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CumulativeVariant {
    /// Time-table filtering with a profile rebuilt within every propagation.
    TimeTable,
    /// Time-table filtering with a backtrackable profile which is only rebuilt when a
    /// compulsory part changed.
    #[default]
    TimeTableIncremental,
    /// The overlap-graph partitioned propagator which filters changed neighbourhoods
    /// locally while they stay small.
    Graph,
}

/// Options for posting the cumulative constraint.
#[derive(Debug, Clone, Copy, Default)]
pub struct CumulativeOptions {
    pub variant: CumulativeVariant,
}

/// Creates the cumulative constraint: at each point in time, the cumulated height of the
/// tasks that overlap that point does not exceed the capacity.
///
/// Tasks which cannot consume the resource (zero maximal height or zero maximal duration)
/// are discarded at posting. Depending on what remains, the constraint degenerates to an
/// arithmetic bound or to a disjunctive constraint, and tasks which alone occupy more than
/// half of the capacity additionally get a redundant disjunctive among themselves.
pub fn cumulative<Var, HVar>(
    tasks: impl IntoIterator<Item = ArgTask<Var>>,
    heights: impl IntoIterator<Item = HVar>,
    capacity: HVar,
) -> impl Constraint
where
    Var: IntegerVariable + 'static,
    HVar: IntegerVariable + 'static,
{
    cumulative_with_options(tasks, heights, capacity, CumulativeOptions::default())
}

/// See [`cumulative`]; the options select the internal propagator variant.
pub fn cumulative_with_options<Var, HVar>(
    tasks: impl IntoIterator<Item = ArgTask<Var>>,
    heights: impl IntoIterator<Item = HVar>,
    capacity: HVar,
    options: CumulativeOptions,
) -> impl Constraint
where
    Var: IntegerVariable + 'static,
    HVar: IntegerVariable + 'static,
{
    CumulativeConstructor {
        tasks: tasks.into_iter().collect(),
        heights: heights.into_iter().collect(),
        capacity,
        options,
    }
}

struct CumulativeConstructor<Var, HVar> {
    tasks: Vec<ArgTask<Var>>,
    heights: Vec<HVar>,
    capacity: HVar,
    options: CumulativeOptions,
}

impl<Var, HVar> Constraint for CumulativeConstructor<Var, HVar>
where
    Var: IntegerVariable + 'static,
    HVar: IntegerVariable + 'static,
{
    fn post(self, solver: &mut Solver) -> Result<(), ConstraintOperationError> {
        if self.tasks.len() != self.heights.len() {
            return Err(ConstraintOperationError::MalformedConstraint(
                "tasks and heights must have the same length",
            ));
        }

        // remove tasks that have no impact on the resource consumption
        let (tasks, heights): (Vec<ArgTask<Var>>, Vec<HVar>) = self
            .tasks
            .into_iter()
            .zip(self.heights)
            .filter(|(task, height)| {
                solver.upper_bound(height) > 0 && solver.upper_bound(&task.duration) > 0
            })
            .unzip();

        if tasks.is_empty() {
            let zero = solver.new_bounded_integer(0, 0);
            return solver.add_propagator(LessThanOrEquals::new(zero, self.capacity));
        }

        if tasks.len() == 1 {
            let height = heights.into_iter().next().unwrap();
            return solver.add_propagator(LessThanOrEquals::new(height, self.capacity));
        }

        if solver.upper_bound(&self.capacity) <= 1 {
            return super::disjunctive_with_resource(tasks, heights, self.capacity).post(solver);
        }

        let scheduling_tasks = SchedulingTask::from_arg_tasks(tasks);

        // tasks which alone require more than half of the capacity pairwise exclude each
        // other; the subset is computed once, at posting
        let half_capacity = solver.upper_bound(&self.capacity) / 2;
        let exclusive: Vec<usize> = (0..scheduling_tasks.len())
            .filter(|&index| {
                let minimum_positive_height = solver
                    .domain_values(&heights[index])
                    .into_iter()
                    .find(|&value| value > 0);
                minimum_positive_height.is_some_and(|height| height > half_capacity)
            })
            .collect();

        solver.add_propagator(Capacity::new(
            scheduling_tasks.clone(),
            heights.clone(),
            self.capacity.clone(),
        ))?;

        if exclusive.len() >= 2 {
            let exclusive_tasks = exclusive
                .iter()
                .map(|&i| scheduling_tasks[i].clone())
                .collect_vec();
            let exclusive_heights = exclusive.iter().map(|&i| heights[i].clone()).collect_vec();
            solver.add_propagator(crate::propagators::disjunctive::Disjunctive::new(
                exclusive_tasks,
                exclusive_heights,
                self.capacity.clone(),
            ))?;
        }

        match self.options.variant {
            CumulativeVariant::TimeTable => solver.add_propagator(Cumulative::new_transient(
                scheduling_tasks,
                heights,
                self.capacity,
            )),
            CumulativeVariant::TimeTableIncremental => solver.add_propagator(Cumulative::new(
                scheduling_tasks,
                heights,
                self.capacity,
            )),
            CumulativeVariant::Graph => solver.add_propagator(CumulativeGraph::new(
                scheduling_tasks,
                heights,
                self.capacity,
            )),
        }
    }
}
