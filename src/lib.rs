//! # Kairos
//! Kairos is a constraint programming solver centred on single-resource scheduling.
//! It provides integer variables with backtrackable domains, a priority-driven
//! propagation engine, and a family of filtering algorithms for the disjunctive and
//! cumulative global constraints: time-table reasoning over compulsory-part
//! profiles, overload checking, detectable precedences, not-first/not-last,
//! edge-finding through an ascendant-set search tree, and pairwise immediate
//! selections.
//!
//! # Using Kairos
//! The first step to solving a problem is creating a [`Solver`] and **adding
//! variables**:
//! ```rust
//! # use kairos_solver::Solver;
//! let mut solver = Solver::default();
//!
//! let start_a = solver.new_bounded_integer(0, 10);
//! let start_b = solver.new_bounded_integer(0, 10);
//! ```
//!
//! Tasks combine a start, a duration, and an end; when the duration is fixed the
//! end is an offset view of the start and the task relation is maintained
//! structurally:
//! ```rust
//! # use kairos_solver::Solver;
//! # let mut solver = Solver::default();
//! # let start_a = solver.new_bounded_integer(0, 10);
//! # let start_b = solver.new_bounded_integer(0, 10);
//! let task_a = solver.new_fixed_duration_task(start_a, 4);
//! let task_b = solver.new_fixed_duration_task(start_b, 3);
//! ```
//!
//! **Constraints** are created through the [`constraints`] module and added with
//! [`Solver::add_constraint`]:
//! ```rust
//! # use kairos_solver::Solver;
//! # use kairos_solver::constraints;
//! # let mut solver = Solver::default();
//! # let start_a = solver.new_bounded_integer(0, 10);
//! # let start_b = solver.new_bounded_integer(0, 10);
//! # let task_a = solver.new_fixed_duration_task(start_a, 4);
//! # let task_b = solver.new_fixed_duration_task(start_b, 3);
//! solver
//!     .add_constraint(constraints::disjunctive(vec![task_a, task_b]))
//!     .post()
//!     .expect("no root-level conflict");
//! ```
//!
//! **Finding a solution** is done with [`Solver::satisfy`] and a branching
//! strategy:
//! ```rust
//! # use kairos_solver::Solver;
//! # use kairos_solver::constraints;
//! # use kairos_solver::results::SatisfactionResult;
//! # let mut solver = Solver::default();
//! # let start_a = solver.new_bounded_integer(0, 10);
//! # let start_b = solver.new_bounded_integer(0, 10);
//! # let task_a = solver.new_fixed_duration_task(start_a, 4);
//! # let task_b = solver.new_fixed_duration_task(start_b, 3);
//! # solver.add_constraint(constraints::disjunctive(vec![task_a, task_b])).post().unwrap();
//! let mut brancher = solver.default_brancher();
//! match solver.satisfy(&mut brancher) {
//!     SatisfactionResult::Satisfiable(solution) => {
//!         assert!(solution.get_value(start_a).abs_diff(solution.get_value(start_b)) >= 3);
//!     }
//!     SatisfactionResult::Unsatisfiable => panic!("this problem has a solution"),
//! }
//! ```

pub(crate) mod basic_types;
pub mod containers;
#[doc(hidden)]
pub mod engine;
pub(crate) mod math;
pub(crate) mod propagators;

pub mod branching;
pub mod constraints;

mod api;
pub mod kairos_asserts;

pub use api::solver::Solver;
pub use basic_types::ConstraintOperationError;
pub use basic_types::Entailment;
#[doc(hidden)]
pub use kairos_asserts as asserts;

/// Variables and views over them.
pub mod variables {
    pub use crate::engine::variables::AffineView;
    pub use crate::engine::variables::DomainId;
    pub use crate::engine::variables::IntegerVariable;
    pub use crate::engine::variables::Literal;
    pub use crate::engine::variables::TransformableVariable;
}

/// Results of a satisfaction run.
pub mod results {
    pub use crate::api::solver::SatisfactionResult;
    pub use crate::basic_types::Solution;
}
