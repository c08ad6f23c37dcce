mod constraint_operation_error;
mod propagation_status;
mod solution;
mod trail;

pub use constraint_operation_error::ConstraintOperationError;
pub(crate) use propagation_status::Inconsistency;
pub use propagation_status::Entailment;
pub(crate) use propagation_status::PropagationStatusCP;
pub use solution::Solution;
pub(crate) use trail::Trail;
