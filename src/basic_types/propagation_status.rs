use crate::engine::EmptyDomain;

/// The result of invoking a constraint programming propagator. The propagation can either
/// succeed or identify an inconsistency.
pub(crate) type PropagationStatusCP = Result<(), Inconsistency>;

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Inconsistency {
    /// A propagation emptied the domain of a variable.
    EmptyDomain,
    /// The propagator found the current state inconsistent without performing a domain
    /// operation, e.g. an overload check which proves that the mandatory energy exceeds the
    /// available area.
    Conflict,
}

impl From<EmptyDomain> for Inconsistency {
    fn from(_: EmptyDomain) -> Self {
        Inconsistency::EmptyDomain
    }
}

/// Three-valued entailment status of a constraint under the current domains.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Entailment {
    /// The constraint holds under every remaining assignment.
    True,
    /// The constraint is violated by every remaining assignment.
    False,
    /// Neither of the above can be concluded yet.
    Undefined,
}
