use crate::basic_types::Trail;
use crate::containers::KeyedVec;
use crate::engine::cp::event_sink::EventSink;
use crate::engine::cp::IntDomainEvent;
use crate::engine::variables::DomainId;
use crate::kairos_assert_moderate;
use crate::kairos_assert_simple;

/// The domain store: integer domains with bounds and holes, journaled on a trail so that
/// backtracking restores them, together with an [`EventSink`] capturing the domain events
/// produced by writes.
///
/// A write which would empty a domain reports [`EmptyDomain`] and leaves that domain
/// untouched; domains are therefore never empty. Writes return whether the domain changed.
#[derive(Clone, Default, Debug)]
pub struct Assignments {
    trail: Trail<ConstraintProgrammingTrailEntry>,
    domains: KeyedVec<DomainId, IntegerDomainExplicit>,

    /// Keeps track of the [`IntDomainEvent`]s which occur while propagating/making decisions.
    events: EventSink,
}

/// The error returned by a write which would leave a domain without any value.
#[derive(Clone, Copy, Debug)]
pub struct EmptyDomain;

/// One journaled domain write. The old bounds are always recorded; a hole additionally
/// records the removed value so that it can be re-inserted on backtrack.
#[derive(Clone, Copy, Debug)]
struct ConstraintProgrammingTrailEntry {
    domain_id: DomainId,
    old_lower_bound: i32,
    old_upper_bound: i32,
    removed_value: Option<i32>,
}

impl Assignments {
    pub(crate) fn increase_decision_level(&mut self) {
        self.trail.increase_decision_level()
    }

    pub(crate) fn get_decision_level(&self) -> usize {
        self.trail.get_decision_level()
    }

    pub(crate) fn num_domains(&self) -> u32 {
        self.domains.len() as u32
    }

    pub(crate) fn get_domains(&self) -> impl Iterator<Item = DomainId> {
        (0..self.num_domains()).map(DomainId::new)
    }

    pub(crate) fn num_trail_entries(&self) -> usize {
        self.trail.len()
    }

    /// Registers the domain of a new integer variable.
    pub(crate) fn grow(&mut self, lower_bound: i32, upper_bound: i32) -> DomainId {
        kairos_assert_simple!(
            lower_bound <= upper_bound,
            "cannot create a variable with an empty domain"
        );

        let id = DomainId::new(self.num_domains());

        let _ = self
            .domains
            .push(IntegerDomainExplicit::new(lower_bound, upper_bound, id));

        self.events.grow();

        id
    }

    /// Registers the domain of a new integer variable which contains exactly the given
    /// values. The values do not need to be sorted or unique.
    pub(crate) fn grow_sparse(&mut self, values: &[i32]) -> DomainId {
        kairos_assert_simple!(
            !values.is_empty(),
            "cannot create a variable with an empty domain"
        );

        let lower_bound = *values.iter().min().unwrap();
        let upper_bound = *values.iter().max().unwrap();

        let id = self.grow(lower_bound, upper_bound);

        let domain = &mut self.domains[id];
        domain.is_value_in_domain.fill(false);
        for &value in values {
            domain.is_value_in_domain[(value - lower_bound) as usize] = true;
        }

        id
    }

    pub(crate) fn drain_domain_events(
        &mut self,
    ) -> impl Iterator<Item = (IntDomainEvent, DomainId)> + '_ {
        self.events.drain()
    }
}

// methods for getting info about the domains
impl Assignments {
    pub(crate) fn get_lower_bound(&self, domain_id: DomainId) -> i32 {
        self.domains[domain_id].lower_bound
    }

    pub(crate) fn get_upper_bound(&self, domain_id: DomainId) -> i32 {
        self.domains[domain_id].upper_bound
    }

    pub(crate) fn get_assigned_value(&self, domain_id: DomainId) -> i32 {
        kairos_assert_simple!(self.is_domain_assigned(domain_id));
        self.domains[domain_id].lower_bound
    }

    pub(crate) fn is_value_in_domain(&self, domain_id: DomainId, value: i32) -> bool {
        self.domains[domain_id].contains(value)
    }

    pub(crate) fn is_domain_assigned(&self, domain_id: DomainId) -> bool {
        self.get_lower_bound(domain_id) == self.get_upper_bound(domain_id)
    }

    pub(crate) fn domain_iterator(&self, domain_id: DomainId) -> impl Iterator<Item = i32> + '_ {
        let domain = &self.domains[domain_id];
        (domain.lower_bound..=domain.upper_bound).filter(move |&value| domain.contains(value))
    }
}

// methods to change the domains
impl Assignments {
    pub(crate) fn tighten_lower_bound(
        &mut self,
        domain_id: DomainId,
        new_lower_bound: i32,
    ) -> Result<bool, EmptyDomain> {
        let domain = &self.domains[domain_id];
        if new_lower_bound <= domain.lower_bound {
            return Ok(false);
        }

        // Skip over holes; the effective bound always sits on a present value.
        let mut effective = new_lower_bound;
        while effective <= domain.upper_bound && !domain.value_is_present(effective) {
            effective += 1;
        }
        if effective > domain.upper_bound {
            return Err(EmptyDomain);
        }

        self.push_trail_entry(domain_id, None);

        let domain = &mut self.domains[domain_id];
        domain.lower_bound = effective;
        self.events
            .event_occurred(IntDomainEvent::LowerBound, domain_id);
        if domain.lower_bound == domain.upper_bound {
            self.events.event_occurred(IntDomainEvent::Assign, domain_id);
        }

        Ok(true)
    }

    pub(crate) fn tighten_upper_bound(
        &mut self,
        domain_id: DomainId,
        new_upper_bound: i32,
    ) -> Result<bool, EmptyDomain> {
        let domain = &self.domains[domain_id];
        if new_upper_bound >= domain.upper_bound {
            return Ok(false);
        }

        let mut effective = new_upper_bound;
        while effective >= domain.lower_bound && !domain.value_is_present(effective) {
            effective -= 1;
        }
        if effective < domain.lower_bound {
            return Err(EmptyDomain);
        }

        self.push_trail_entry(domain_id, None);

        let domain = &mut self.domains[domain_id];
        domain.upper_bound = effective;
        self.events
            .event_occurred(IntDomainEvent::UpperBound, domain_id);
        if domain.lower_bound == domain.upper_bound {
            self.events.event_occurred(IntDomainEvent::Assign, domain_id);
        }

        Ok(true)
    }

    pub(crate) fn make_assignment(
        &mut self,
        domain_id: DomainId,
        assigned_value: i32,
    ) -> Result<bool, EmptyDomain> {
        if !self.domains[domain_id].contains(assigned_value) {
            return Err(EmptyDomain);
        }

        let mut changed = false;
        changed |= self.tighten_lower_bound(domain_id, assigned_value)?;
        changed |= self.tighten_upper_bound(domain_id, assigned_value)?;

        kairos_assert_moderate!(self.get_assigned_value(domain_id) == assigned_value);

        Ok(changed)
    }

    pub(crate) fn remove_value_from_domain(
        &mut self,
        domain_id: DomainId,
        removed_value: i32,
    ) -> Result<bool, EmptyDomain> {
        let domain = &self.domains[domain_id];
        if !domain.contains(removed_value) {
            return Ok(false);
        }
        if domain.lower_bound == domain.upper_bound {
            // Removing the only value would empty the domain.
            return Err(EmptyDomain);
        }

        self.push_trail_entry(domain_id, Some(removed_value));

        let domain = &mut self.domains[domain_id];
        let index = (removed_value - domain.initial_lower_bound) as usize;
        domain.is_value_in_domain[index] = false;
        self.events
            .event_occurred(IntDomainEvent::Removal, domain_id);

        if removed_value == domain.lower_bound {
            while !domain.value_is_present(domain.lower_bound) {
                domain.lower_bound += 1;
            }
            self.events
                .event_occurred(IntDomainEvent::LowerBound, domain_id);
        } else if removed_value == domain.upper_bound {
            while !domain.value_is_present(domain.upper_bound) {
                domain.upper_bound -= 1;
            }
            self.events
                .event_occurred(IntDomainEvent::UpperBound, domain_id);
        }

        let domain = &self.domains[domain_id];
        if domain.lower_bound == domain.upper_bound {
            self.events.event_occurred(IntDomainEvent::Assign, domain_id);
        }

        Ok(true)
    }

    fn push_trail_entry(&mut self, domain_id: DomainId, removed_value: Option<i32>) {
        self.trail.push(ConstraintProgrammingTrailEntry {
            domain_id,
            old_lower_bound: self.get_lower_bound(domain_id),
            old_upper_bound: self.get_upper_bound(domain_id),
            removed_value,
        });
    }

    /// Restores the domains to the state they had at the given decision level. Pending
    /// events are discarded since the changes they describe are being undone.
    pub(crate) fn synchronise(&mut self, new_decision_level: usize) {
        self.events.clear();
        let Assignments { trail, domains, .. } = self;
        trail.synchronise(new_decision_level).for_each(|entry| {
            domains[entry.domain_id].undo_trail_entry(&entry);
        });
    }
}

/// The domain of a single variable: bounds plus an explicit membership vector for the values
/// between the initial bounds. The bounds always sit on present values.
#[derive(Clone, Debug)]
struct IntegerDomainExplicit {
    #[allow(dead_code)]
    id: DomainId,

    lower_bound: i32,
    upper_bound: i32,
    initial_lower_bound: i32,

    /// Indicates whether value `initial_lower_bound + i` is in the domain.
    is_value_in_domain: Vec<bool>,
}

impl IntegerDomainExplicit {
    fn new(lower_bound: i32, upper_bound: i32, id: DomainId) -> IntegerDomainExplicit {
        let size = (upper_bound as i64 - lower_bound as i64 + 1) as usize;
        IntegerDomainExplicit {
            id,
            lower_bound,
            upper_bound,
            initial_lower_bound: lower_bound,
            is_value_in_domain: vec![true; size],
        }
    }

    fn contains(&self, value: i32) -> bool {
        self.lower_bound <= value && value <= self.upper_bound && self.value_is_present(value)
    }

    fn value_is_present(&self, value: i32) -> bool {
        let index = value as i64 - self.initial_lower_bound as i64;
        index >= 0
            && (index as usize) < self.is_value_in_domain.len()
            && self.is_value_in_domain[index as usize]
    }

    fn undo_trail_entry(&mut self, entry: &ConstraintProgrammingTrailEntry) {
        if let Some(value) = entry.removed_value {
            let index = (value - self.initial_lower_bound) as usize;
            self.is_value_in_domain[index] = true;
        }
        self.lower_bound = entry.old_lower_bound;
        self.upper_bound = entry.old_upper_bound;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jump_in_bound_change_lower_bound_event_and_assign() {
        let mut assignments = Assignments::default();
        let d1 = assignments.grow(1, 5);

        let changed = assignments
            .tighten_lower_bound(d1, 5)
            .expect("the domain is not empty");

        assert!(changed);
        let events = assignments.drain_domain_events().collect::<Vec<_>>();
        assert!(events.contains(&(IntDomainEvent::LowerBound, d1)));
        assert!(events.contains(&(IntDomainEvent::Assign, d1)));
    }

    #[test]
    fn tightening_below_the_current_bound_does_not_change_the_domain() {
        let mut assignments = Assignments::default();
        let d1 = assignments.grow(1, 5);

        let changed = assignments
            .tighten_lower_bound(d1, 0)
            .expect("the domain is not empty");

        assert!(!changed);
        assert_eq!(assignments.get_lower_bound(d1), 1);
    }

    #[test]
    fn bounds_skip_holes() {
        let mut assignments = Assignments::default();
        let d1 = assignments.grow_sparse(&[0, 6]);

        assert_eq!(assignments.get_lower_bound(d1), 0);
        assert_eq!(assignments.get_upper_bound(d1), 6);
        assert!(!assignments.is_value_in_domain(d1, 3));

        let changed = assignments
            .tighten_upper_bound(d1, 5)
            .expect("the domain is not empty");

        assert!(changed);
        assert_eq!(assignments.get_upper_bound(d1), 0);
        assert!(assignments.is_domain_assigned(d1));
    }

    #[test]
    fn a_failed_write_leaves_the_domain_untouched() {
        let mut assignments = Assignments::default();
        let d1 = assignments.grow(1, 5);

        assert!(assignments.tighten_lower_bound(d1, 6).is_err());

        assert_eq!(assignments.get_lower_bound(d1), 1);
        assert_eq!(assignments.get_upper_bound(d1), 5);
    }

    #[test]
    fn removing_a_value_is_undone_on_backtrack() {
        let mut assignments = Assignments::default();
        let d1 = assignments.grow(1, 5);

        assignments.increase_decision_level();
        let changed = assignments
            .remove_value_from_domain(d1, 3)
            .expect("the domain is not empty");
        assert!(changed);
        assert!(!assignments.is_value_in_domain(d1, 3));

        assignments.synchronise(0);
        assert!(assignments.is_value_in_domain(d1, 3));
    }

    #[test]
    fn removing_the_only_value_is_an_empty_domain() {
        let mut assignments = Assignments::default();
        let d1 = assignments.grow(2, 2);

        assert!(assignments.remove_value_from_domain(d1, 2).is_err());
        assert!(assignments.is_value_in_domain(d1, 2));
    }

    #[test]
    fn instantiating_to_a_hole_is_an_empty_domain() {
        let mut assignments = Assignments::default();
        let d1 = assignments.grow_sparse(&[0, 6]);

        assert!(assignments.make_assignment(d1, 3).is_err());
        assert_eq!(assignments.get_lower_bound(d1), 0);
        assert_eq!(assignments.get_upper_bound(d1), 6);
    }

    #[test]
    fn backtracking_restores_the_bounds() {
        let mut assignments = Assignments::default();
        let d1 = assignments.grow(0, 10);

        assignments.increase_decision_level();
        let _ = assignments.tighten_lower_bound(d1, 4).unwrap();
        let _ = assignments.tighten_upper_bound(d1, 7).unwrap();

        assignments.increase_decision_level();
        let _ = assignments.make_assignment(d1, 5).unwrap();

        assignments.synchronise(1);
        assert_eq!(assignments.get_lower_bound(d1), 4);
        assert_eq!(assignments.get_upper_bound(d1), 7);

        assignments.synchronise(0);
        assert_eq!(assignments.get_lower_bound(d1), 0);
        assert_eq!(assignments.get_upper_bound(d1), 10);
    }
}
