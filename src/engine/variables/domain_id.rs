use enumset::EnumSet;

use crate::containers::KeyedVec;
use crate::containers::StorageKey;
use crate::engine::cp::watch_lists::Watchers;
use crate::engine::variables::AffineView;
use crate::engine::variables::IntegerVariable;
use crate::engine::variables::TransformableVariable;
use crate::engine::Assignments;
use crate::engine::EmptyDomain;
use crate::engine::IntDomainEvent;
use crate::engine::OpaqueDomainEvent;

/// A handle to a domain registered in the [`Assignments`].
#[derive(Clone, PartialEq, Eq, Copy, Hash)]
pub struct DomainId {
    pub id: u32,
}

impl DomainId {
    pub fn new(id: u32) -> Self {
        DomainId { id }
    }
}

impl IntegerVariable for DomainId {
    type AffineView = AffineView<Self>;

    fn lower_bound(&self, assignment: &Assignments) -> i32 {
        assignment.get_lower_bound(*self)
    }

    fn upper_bound(&self, assignment: &Assignments) -> i32 {
        assignment.get_upper_bound(*self)
    }

    fn contains(&self, assignment: &Assignments, value: i32) -> bool {
        assignment.is_value_in_domain(*self, value)
    }

    fn iterate_domain(&self, assignment: &Assignments) -> impl Iterator<Item = i32> {
        assignment.domain_iterator(*self)
    }

    fn remove(&self, assignment: &mut Assignments, value: i32) -> Result<bool, EmptyDomain> {
        assignment.remove_value_from_domain(*self, value)
    }

    fn set_lower_bound(
        &self,
        assignment: &mut Assignments,
        value: i32,
    ) -> Result<bool, EmptyDomain> {
        assignment.tighten_lower_bound(*self, value)
    }

    fn set_upper_bound(
        &self,
        assignment: &mut Assignments,
        value: i32,
    ) -> Result<bool, EmptyDomain> {
        assignment.tighten_upper_bound(*self, value)
    }

    fn instantiate_to(
        &self,
        assignment: &mut Assignments,
        value: i32,
    ) -> Result<bool, EmptyDomain> {
        assignment.make_assignment(*self, value)
    }

    fn watch_all(&self, watchers: &mut Watchers<'_>, events: EnumSet<IntDomainEvent>) {
        watchers.watch_all(*self, events);
    }

    fn unpack_event(&self, event: OpaqueDomainEvent) -> IntDomainEvent {
        event.unwrap()
    }

    fn evaluate_assignment(&self, values: &KeyedVec<DomainId, i32>) -> i32 {
        values[*self]
    }
}

impl TransformableVariable<AffineView<DomainId>> for DomainId {
    fn scaled(&self, scale: i32) -> AffineView<DomainId> {
        AffineView::new(*self, scale, 0)
    }

    fn offset(&self, offset: i32) -> AffineView<DomainId> {
        AffineView::new(*self, 1, offset)
    }
}

impl StorageKey for DomainId {
    fn index(&self) -> usize {
        self.id as usize
    }

    fn create_from_index(index: usize) -> Self {
        DomainId { id: index as u32 }
    }
}

impl std::fmt::Display for DomainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "x{}", self.id)
    }
}

impl std::fmt::Debug for DomainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "x{}", self.id)
    }
}
