use std::collections::HashSet;

use crate::basic_types::ConstraintOperationError;
use crate::basic_types::Solution;
use crate::branching::Brancher;
use crate::branching::InputOrder;
use crate::constraints::ConstraintPoster;
use crate::engine::propagation::Propagator;
use crate::engine::variables::AffineView;
use crate::engine::variables::DomainId;
use crate::engine::variables::IntegerVariable;
use crate::engine::variables::Literal;
use crate::engine::variables::TransformableVariable;
use crate::engine::ConstraintSatisfactionSolver;
use crate::propagators::ArgTask;
use crate::propagators::SchedulingTask;
use crate::propagators::TaskPropagator;

/// The entry point for modelling and solving: variables and tasks are created on the
/// solver, constraints are added through [`Solver::add_constraint`], and solutions are
/// found with [`Solver::satisfy`].
#[derive(Default, Debug)]
pub struct Solver {
    satisfaction_solver: ConstraintSatisfactionSolver,
    /// The task relation triples which already have a propagator, so that a task shared by
    /// several constraints is propagated once.
    task_registry: HashSet<(DomainId, DomainId, DomainId)>,
}

/// The result of [`Solver::satisfy`].
#[derive(Debug)]
pub enum SatisfactionResult {
    /// A solution was found; every variable is instantiated in it.
    Satisfiable(Solution),
    /// No solution exists.
    Unsatisfiable,
}

impl Solver {
    /// Creates a new integer variable with the domain `[lower_bound, upper_bound]`.
    pub fn new_bounded_integer(&mut self, lower_bound: i32, upper_bound: i32) -> DomainId {
        self.satisfaction_solver
            .create_new_integer_variable(lower_bound, upper_bound)
    }

    /// Creates a new integer variable whose domain contains exactly the given values.
    pub fn new_sparse_integer(&mut self, values: &[i32]) -> DomainId {
        self.satisfaction_solver
            .create_new_sparse_integer_variable(values)
    }

    /// Creates a new boolean variable.
    pub fn new_literal(&mut self) -> Literal {
        Literal::new(self.new_bounded_integer(0, 1))
    }

    /// The current lower bound of the variable.
    pub fn lower_bound<Var: IntegerVariable>(&self, variable: &Var) -> i32 {
        variable.lower_bound(&self.satisfaction_solver.assignments)
    }

    /// The current upper bound of the variable.
    pub fn upper_bound<Var: IntegerVariable>(&self, variable: &Var) -> i32 {
        variable.upper_bound(&self.satisfaction_solver.assignments)
    }

    /// The values currently in the domain of the variable, in increasing order.
    pub fn domain_values<Var: IntegerVariable>(&self, variable: &Var) -> Vec<i32> {
        variable
            .iterate_domain(&self.satisfaction_solver.assignments)
            .collect()
    }

    /// Creates a task over a `(start, duration, end)` variable triple and posts its bound
    /// consistency propagator, unless the same triple was already turned into a task.
    pub fn new_task(
        &mut self,
        start: DomainId,
        duration: DomainId,
        end: DomainId,
    ) -> Result<ArgTask<AffineView<DomainId>>, ConstraintOperationError> {
        self.create_task(start, duration, end, None)
    }

    /// Creates an optional task: the relation `start + duration = end` is enforced only
    /// while the presence literal can still be true, and a task whose relation becomes
    /// infeasible is made absent instead of failing.
    pub fn new_optional_task(
        &mut self,
        start: DomainId,
        duration: DomainId,
        end: DomainId,
        presence: Literal,
    ) -> Result<ArgTask<AffineView<DomainId>>, ConstraintOperationError> {
        self.create_task(start, duration, end, Some(presence))
    }

    /// Creates a task with a fixed duration; its end is an offset view of its start, so the
    /// task relation holds structurally and no propagator is posted.
    pub fn new_fixed_duration_task(
        &mut self,
        start: DomainId,
        duration: i32,
    ) -> ArgTask<AffineView<DomainId>> {
        let duration_variable = self.new_bounded_integer(duration, duration);
        ArgTask {
            start: start.scaled(1),
            duration: duration_variable.scaled(1),
            end: start.offset(duration),
            presence: None,
        }
    }

    /// See [`Solver::new_fixed_duration_task`]; the presence literal makes the task
    /// optional.
    pub fn new_optional_fixed_duration_task(
        &mut self,
        start: DomainId,
        duration: i32,
        presence: Literal,
    ) -> ArgTask<AffineView<DomainId>> {
        let mut task = self.new_fixed_duration_task(start, duration);
        task.presence = Some(presence);
        task
    }

    fn create_task(
        &mut self,
        start: DomainId,
        duration: DomainId,
        end: DomainId,
        presence: Option<Literal>,
    ) -> Result<ArgTask<AffineView<DomainId>>, ConstraintOperationError> {
        if self.task_registry.insert((start, duration, end)) {
            self.add_propagator(TaskPropagator::new(SchedulingTask {
                start,
                duration,
                end,
                presence,
                id: crate::engine::propagation::LocalId::from(0),
            }))?;
        }
        Ok(ArgTask {
            start: start.scaled(1),
            duration: duration.scaled(1),
            end: end.scaled(1),
            presence,
        })
    }

    /// Creates a [`ConstraintPoster`] for the constraint, through which it is added to the
    /// solver.
    pub fn add_constraint<ConstraintImpl>(
        &mut self,
        constraint: ConstraintImpl,
    ) -> ConstraintPoster<'_, ConstraintImpl> {
        ConstraintPoster::new(self, constraint)
    }

    pub(crate) fn add_propagator(
        &mut self,
        propagator: impl Propagator + 'static,
    ) -> Result<(), ConstraintOperationError> {
        self.satisfaction_solver.add_propagator(propagator)
    }

    /// The default branching strategy: the variables in creation order, assigned their
    /// minimum value first.
    pub fn default_brancher(&self) -> InputOrder {
        InputOrder::new(self.satisfaction_solver.assignments.get_domains().collect())
    }

    /// Searches for a single solution.
    pub fn satisfy(&mut self, brancher: &mut impl Brancher) -> SatisfactionResult {
        let mut solution = None;
        let _ = self.satisfaction_solver.solve(brancher, &mut |found| {
            solution = Some(found);
            false
        });
        match solution {
            Some(solution) => SatisfactionResult::Satisfiable(solution),
            None => SatisfactionResult::Unsatisfiable,
        }
    }

    /// Enumerates solutions, passing each to the callback; enumeration stops when the
    /// callback returns `false`. Returns the number of solutions seen.
    pub fn enumerate_solutions(
        &mut self,
        brancher: &mut impl Brancher,
        mut on_solution: impl FnMut(&Solution) -> bool,
    ) -> u64 {
        let mut count = 0;
        let _ = self.satisfaction_solver.solve(brancher, &mut |found| {
            count += 1;
            on_solution(&found)
        });
        count
    }
}
