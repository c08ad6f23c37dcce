use enumset::EnumSet;

use crate::containers::KeyedVec;
use crate::engine::cp::watch_lists::Watchers;
use crate::engine::variables::DomainId;
use crate::engine::variables::IntegerVariable;
use crate::engine::variables::TransformableVariable;
use crate::engine::Assignments;
use crate::engine::EmptyDomain;
use crate::engine::IntDomainEvent;
use crate::engine::OpaqueDomainEvent;
use crate::math::num_ext::NumExt;

/// Models the constraint `y = ax + b`, by expressing the domain of `y` as a transformation of
/// the domain of `x`.
///
/// A view with scale `-1` reverses the time axis, which is how mirror tasks are realised.
#[derive(Clone, Copy, Hash, Eq, PartialEq)]
pub struct AffineView<Inner> {
    pub(crate) inner: Inner,
    scale: i32,
    offset: i32,
}

enum Rounding {
    Up,
    Down,
}

impl<Inner> AffineView<Inner> {
    pub fn new(inner: Inner, scale: i32, offset: i32) -> Self {
        AffineView {
            inner,
            scale,
            offset,
        }
    }

    /// Apply the inverse transformation of this view on a value, to go from the value in the
    /// domain of `self` to a value in the domain of `self.inner`.
    fn invert(&self, value: i32, rounding: Rounding) -> i32 {
        let inverted_translation = value - self.offset;

        match rounding {
            Rounding::Up => NumExt::div_ceil(inverted_translation, self.scale),
            Rounding::Down => NumExt::div_floor(inverted_translation, self.scale),
        }
    }

    fn map(&self, value: i32) -> i32 {
        self.scale * value + self.offset
    }
}

impl<View> IntegerVariable for AffineView<View>
where
    View: IntegerVariable,
{
    type AffineView = Self;

    fn lower_bound(&self, assignment: &Assignments) -> i32 {
        if self.scale < 0 {
            self.map(self.inner.upper_bound(assignment))
        } else {
            self.map(self.inner.lower_bound(assignment))
        }
    }

    fn upper_bound(&self, assignment: &Assignments) -> i32 {
        if self.scale < 0 {
            self.map(self.inner.lower_bound(assignment))
        } else {
            self.map(self.inner.upper_bound(assignment))
        }
    }

    fn contains(&self, assignment: &Assignments, value: i32) -> bool {
        if (value - self.offset) % self.scale == 0 {
            let inverted = self.invert(value, Rounding::Up);
            self.inner.contains(assignment, inverted)
        } else {
            false
        }
    }

    fn iterate_domain(&self, assignment: &Assignments) -> impl Iterator<Item = i32> {
        self.inner
            .iterate_domain(assignment)
            .map(|value| self.map(value))
    }

    fn remove(&self, assignment: &mut Assignments, value: i32) -> Result<bool, EmptyDomain> {
        if (value - self.offset) % self.scale == 0 {
            let inverted = self.invert(value, Rounding::Up);
            self.inner.remove(assignment, inverted)
        } else {
            Ok(false)
        }
    }

    fn set_lower_bound(
        &self,
        assignment: &mut Assignments,
        value: i32,
    ) -> Result<bool, EmptyDomain> {
        if self.scale >= 0 {
            let inverted = self.invert(value, Rounding::Up);
            self.inner.set_lower_bound(assignment, inverted)
        } else {
            let inverted = self.invert(value, Rounding::Down);
            self.inner.set_upper_bound(assignment, inverted)
        }
    }

    fn set_upper_bound(
        &self,
        assignment: &mut Assignments,
        value: i32,
    ) -> Result<bool, EmptyDomain> {
        if self.scale >= 0 {
            let inverted = self.invert(value, Rounding::Down);
            self.inner.set_upper_bound(assignment, inverted)
        } else {
            let inverted = self.invert(value, Rounding::Up);
            self.inner.set_lower_bound(assignment, inverted)
        }
    }

    fn instantiate_to(
        &self,
        assignment: &mut Assignments,
        value: i32,
    ) -> Result<bool, EmptyDomain> {
        if (value - self.offset) % self.scale == 0 {
            let inverted = self.invert(value, Rounding::Up);
            self.inner.instantiate_to(assignment, inverted)
        } else {
            // No value of the inner domain maps onto the requested value.
            Err(EmptyDomain)
        }
    }

    fn watch_all(&self, watchers: &mut Watchers<'_>, mut events: EnumSet<IntDomainEvent>) {
        let bound = IntDomainEvent::LowerBound | IntDomainEvent::UpperBound;
        let intersection = events.intersection(bound);
        if intersection.len() == 1 && self.scale.is_negative() {
            events = events.symmetrical_difference(bound);
        }
        self.inner.watch_all(watchers, events);
    }

    fn unpack_event(&self, event: OpaqueDomainEvent) -> IntDomainEvent {
        if self.scale.is_negative() {
            match self.inner.unpack_event(event) {
                IntDomainEvent::LowerBound => IntDomainEvent::UpperBound,
                IntDomainEvent::UpperBound => IntDomainEvent::LowerBound,
                event => event,
            }
        } else {
            self.inner.unpack_event(event)
        }
    }

    fn evaluate_assignment(&self, values: &KeyedVec<DomainId, i32>) -> i32 {
        self.map(self.inner.evaluate_assignment(values))
    }
}

impl<View> TransformableVariable<AffineView<View>> for AffineView<View>
where
    View: IntegerVariable,
{
    fn scaled(&self, scale: i32) -> AffineView<View> {
        let mut result = self.clone();
        result.scale *= scale;
        result.offset *= scale;
        result
    }

    fn offset(&self, offset: i32) -> AffineView<View> {
        let mut result = self.clone();
        result.offset += offset;
        result
    }
}

impl<View: std::fmt::Debug> std::fmt::Debug for AffineView<View> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.scale == -1 {
            write!(f, "-")?;
        } else if self.scale != 1 {
            write!(f, "{} * ", self.scale)?;
        }

        write!(f, "({:?})", self.inner)?;

        match self.offset.cmp(&0) {
            std::cmp::Ordering::Less => write!(f, " - {}", -self.offset)?,
            std::cmp::Ordering::Equal => {}
            std::cmp::Ordering::Greater => write!(f, " + {}", self.offset)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Assignments;

    #[test]
    fn scaled_bounds_are_transformed() {
        let mut assignments = Assignments::default();
        let domain = assignments.grow(-3, 4);

        let view = domain.scaled(-1);
        assert_eq!(view.lower_bound(&assignments), -4);
        assert_eq!(view.upper_bound(&assignments), 3);
    }

    #[test]
    fn offset_bounds_are_translated() {
        let mut assignments = Assignments::default();
        let domain = assignments.grow(0, 5);

        let view = domain.offset(7);
        assert_eq!(view.lower_bound(&assignments), 7);
        assert_eq!(view.upper_bound(&assignments), 12);
    }

    #[test]
    fn tightening_a_negatively_scaled_view_updates_the_opposite_bound() {
        let mut assignments = Assignments::default();
        let domain = assignments.grow(0, 10);

        let view = domain.scaled(-1);
        let changed = view
            .set_lower_bound(&mut assignments, -7)
            .expect("no empty domain");

        assert!(changed);
        assert_eq!(assignments.get_upper_bound(domain), 7);
    }
}
