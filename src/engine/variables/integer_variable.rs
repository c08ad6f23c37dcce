use enumset::EnumSet;

use super::TransformableVariable;
use crate::containers::KeyedVec;
use crate::engine::cp::watch_lists::Watchers;
use crate::engine::variables::DomainId;
use crate::engine::Assignments;
use crate::engine::EmptyDomain;
use crate::engine::IntDomainEvent;
use crate::engine::OpaqueDomainEvent;

/// A trait specifying the required behaviour of an integer variable such as retrieving a
/// lower-bound ([`IntegerVariable::lower_bound`]) or adjusting the bounds
/// ([`IntegerVariable::set_lower_bound`]).
///
/// Writes return `true` iff the domain changed; a write which would empty the domain returns
/// [`EmptyDomain`] and the emptied state is journaled on the trail so that backtracking
/// restores it.
pub trait IntegerVariable: Clone + TransformableVariable<Self::AffineView> {
    type AffineView: IntegerVariable;

    /// Get the lower bound of the variable.
    fn lower_bound(&self, assignment: &Assignments) -> i32;

    /// Get the upper bound of the variable.
    fn upper_bound(&self, assignment: &Assignments) -> i32;

    /// Determine whether the value is in the domain of this variable.
    fn contains(&self, assignment: &Assignments, value: i32) -> bool;

    /// Iterate over the values of the domain of this variable in increasing order.
    fn iterate_domain(&self, assignment: &Assignments) -> impl Iterator<Item = i32>;

    /// Remove a value from the domain of this variable.
    fn remove(&self, assignment: &mut Assignments, value: i32) -> Result<bool, EmptyDomain>;

    /// Tighten the lower bound of the domain of this variable.
    fn set_lower_bound(&self, assignment: &mut Assignments, value: i32)
        -> Result<bool, EmptyDomain>;

    /// Tighten the upper bound of the domain of this variable.
    fn set_upper_bound(&self, assignment: &mut Assignments, value: i32)
        -> Result<bool, EmptyDomain>;

    /// Instantiate this variable to the given value.
    fn instantiate_to(&self, assignment: &mut Assignments, value: i32)
        -> Result<bool, EmptyDomain>;

    /// Register a watch for this variable on the given domain events.
    fn watch_all(&self, watchers: &mut Watchers<'_>, events: EnumSet<IntDomainEvent>);

    /// Decode a domain event for this variable.
    fn unpack_event(&self, event: OpaqueDomainEvent) -> IntDomainEvent;

    /// Evaluate this variable under a full assignment of the underlying domains.
    fn evaluate_assignment(&self, values: &KeyedVec<DomainId, i32>) -> i32;
}
