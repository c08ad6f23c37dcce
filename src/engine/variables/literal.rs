use std::ops::Not;

use enumset::EnumSet;

use super::DomainId;
use super::IntegerVariable;
use super::TransformableVariable;
use crate::containers::KeyedVec;
use crate::engine::cp::watch_lists::Watchers;
use crate::engine::variables::AffineView;
use crate::engine::Assignments;
use crate::engine::EmptyDomain;
use crate::engine::IntDomainEvent;
use crate::engine::OpaqueDomainEvent;

/// A boolean variable realised as a 0-1 integer view; used for the presence variable of
/// optional tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Literal {
    integer_variable: AffineView<DomainId>,
}

impl Literal {
    pub(crate) fn new(domain_id: DomainId) -> Literal {
        Literal {
            integer_variable: domain_id.scaled(1),
        }
    }

    pub fn domain_id(&self) -> DomainId {
        self.integer_variable.inner
    }

    /// Whether the literal is fixed to true under the current assignment.
    pub fn is_true(&self, assignment: &Assignments) -> bool {
        self.lower_bound(assignment) >= 1
    }

    /// Whether the literal is fixed to false under the current assignment.
    pub fn is_false(&self, assignment: &Assignments) -> bool {
        self.upper_bound(assignment) <= 0
    }
}

impl Not for Literal {
    type Output = Literal;

    fn not(self) -> Self::Output {
        Literal {
            integer_variable: self.integer_variable.scaled(-1).offset(1),
        }
    }
}

impl IntegerVariable for Literal {
    type AffineView = AffineView<Self>;

    /// Returns the lower bound represented as a 0-1 value.
    /// Literals that evaluate to true have a lower bound of 1, literals that evaluate to false
    /// have an upper bound of 0, and unassigned literals have bounds [0, 1].
    fn lower_bound(&self, assignment: &Assignments) -> i32 {
        self.integer_variable.lower_bound(assignment)
    }

    fn upper_bound(&self, assignment: &Assignments) -> i32 {
        self.integer_variable.upper_bound(assignment)
    }

    fn contains(&self, assignment: &Assignments, value: i32) -> bool {
        self.integer_variable.contains(assignment, value)
    }

    fn iterate_domain(&self, assignment: &Assignments) -> impl Iterator<Item = i32> {
        self.integer_variable.iterate_domain(assignment)
    }

    fn remove(&self, assignment: &mut Assignments, value: i32) -> Result<bool, EmptyDomain> {
        self.integer_variable.remove(assignment, value)
    }

    fn set_lower_bound(
        &self,
        assignment: &mut Assignments,
        value: i32,
    ) -> Result<bool, EmptyDomain> {
        self.integer_variable.set_lower_bound(assignment, value)
    }

    fn set_upper_bound(
        &self,
        assignment: &mut Assignments,
        value: i32,
    ) -> Result<bool, EmptyDomain> {
        self.integer_variable.set_upper_bound(assignment, value)
    }

    fn instantiate_to(
        &self,
        assignment: &mut Assignments,
        value: i32,
    ) -> Result<bool, EmptyDomain> {
        self.integer_variable.instantiate_to(assignment, value)
    }

    fn watch_all(&self, watchers: &mut Watchers<'_>, events: EnumSet<IntDomainEvent>) {
        self.integer_variable.watch_all(watchers, events)
    }

    fn unpack_event(&self, event: OpaqueDomainEvent) -> IntDomainEvent {
        self.integer_variable.unpack_event(event)
    }

    fn evaluate_assignment(&self, values: &KeyedVec<DomainId, i32>) -> i32 {
        self.integer_variable.evaluate_assignment(values)
    }
}

impl TransformableVariable<AffineView<Literal>> for Literal {
    fn scaled(&self, scale: i32) -> AffineView<Literal> {
        AffineView::new(*self, scale, 0)
    }

    fn offset(&self, offset: i32) -> AffineView<Literal> {
        AffineView::new(*self, 1, offset)
    }
}
