use crate::engine::variables::DomainId;
use crate::engine::Assignments;

/// A branching strategy: selects the next decision of the depth-first search.
///
/// A decision is a `(domain, value)` pair; the solver instantiates the domain to the value
/// and, upon backtracking, removes the value from the domain instead.
pub trait Brancher {
    /// The next decision under the current assignments, or [`None`] when every variable this
    /// brancher is responsible for is fixed.
    fn next_decision(&mut self, assignments: &Assignments) -> Option<(DomainId, i32)>;
}

/// The default strategy: the first unfixed variable in registration order, assigned to its
/// minimum value.
#[derive(Debug, Clone)]
pub struct InputOrder {
    variables: Vec<DomainId>,
}

impl InputOrder {
    pub fn new(variables: Vec<DomainId>) -> Self {
        InputOrder { variables }
    }
}

impl Brancher for InputOrder {
    fn next_decision(&mut self, assignments: &Assignments) -> Option<(DomainId, i32)> {
        self.variables
            .iter()
            .find(|&&domain| !assignments.is_domain_assigned(domain))
            .map(|&domain| (domain, assignments.get_lower_bound(domain)))
    }
}
