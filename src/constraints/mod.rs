//! Defines the constraints that the solver provides out of the box, which can be added with
//! [`Solver::add_constraint`].
//!
//! A constraint is a relation over variables. In the solver, constraints are enforced
//! through propagators, and therefore constraints can be viewed as a collection of
//! propagators.
//!
//! # Example
//! ```
//! # use kairos_solver::constraints;
//! # use kairos_solver::Solver;
//! let mut solver = Solver::default();
//!
//! let start_a = solver.new_bounded_integer(0, 4);
//! let start_b = solver.new_bounded_integer(0, 4);
//! let task_a = solver.new_fixed_duration_task(start_a, 2);
//! let task_b = solver.new_fixed_duration_task(start_b, 2);
//!
//! solver
//!     .add_constraint(constraints::disjunctive(vec![task_a, task_b]))
//!     .post()
//!     .expect("no root-level conflict");
//! ```

mod constraint_poster;
mod cumulative;
mod disjunctive;

pub use constraint_poster::ConstraintPoster;
pub use cumulative::cumulative;
pub use cumulative::cumulative_with_options;
pub use cumulative::CumulativeOptions;
pub use cumulative::CumulativeVariant;
pub use disjunctive::disjunctive;
pub use disjunctive::disjunctive_with_resource;

pub use crate::propagators::ArgTask;

use crate::basic_types::ConstraintOperationError;
use crate::engine::propagation::Propagator;
use crate::Solver;

/// A [`Constraint`] is a relation over variables. It disqualifies certain partial
/// assignments of making it into a solution of the problem.
pub trait Constraint {
    /// Add the [`Constraint`] to the [`Solver`].
    ///
    /// This method returns a [`ConstraintOperationError`] if the addition of the
    /// [`Constraint`] led to a root-level conflict.
    fn post(self, solver: &mut Solver) -> Result<(), ConstraintOperationError>;
}

impl<ConcretePropagator> Constraint for ConcretePropagator
where
    ConcretePropagator: Propagator + 'static,
{
    fn post(self, solver: &mut Solver) -> Result<(), ConstraintOperationError> {
        solver.add_propagator(self)
    }
}

impl<C: Constraint> Constraint for Vec<C> {
    fn post(self, solver: &mut Solver) -> Result<(), ConstraintOperationError> {
        self.into_iter().try_for_each(|constraint| constraint.post(solver))
    }
}
