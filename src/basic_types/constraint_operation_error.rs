use thiserror::Error;

#[cfg(doc)]
use crate::Solver;

/// Errors related to adding constraints to the [`Solver`].
#[derive(Error, Debug, Copy, Clone)]
pub enum ConstraintOperationError {
    /// Error which indicates that adding a propagator led to infeasibility at the root.
    #[error("Adding the constraint failed because it is infeasible at the root")]
    InfeasiblePropagator,
    /// Error which indicates that a constraint was attempted to be added while the solver was
    /// already in an infeasible state.
    #[error("Adding the constraint failed because the solver is in an infeasible state")]
    InfeasibleState,
    /// Error which indicates that the arguments of a constraint did not satisfy its contract,
    /// e.g. mismatched task and height array lengths.
    #[error("Adding the constraint failed because its arguments are malformed: {0}")]
    MalformedConstraint(&'static str),
}
