use super::Brancher;
use crate::engine::variables::DomainId;
use crate::engine::Assignments;

/// Branching for scheduling problems following the randomised-restart-free part of Godard,
/// Laborie and Nuijten (ICAPS 2005): among the unfixed start variables, fix the one with the
/// lowest earliest start time at that time.
#[derive(Debug, Clone)]
pub struct SetTimes {
    starts: Vec<DomainId>,
}

impl SetTimes {
    pub fn new(starts: Vec<DomainId>) -> Self {
        SetTimes { starts }
    }
}

impl Brancher for SetTimes {
    fn next_decision(&mut self, assignments: &Assignments) -> Option<(DomainId, i32)> {
        self.starts
            .iter()
            .filter(|&&start| !assignments.is_domain_assigned(start))
            .min_by_key(|&&start| assignments.get_lower_bound(start))
            .map(|&start| (start, assignments.get_lower_bound(start)))
    }
}
