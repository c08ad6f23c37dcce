use crate::containers::KeyedVec;
use crate::engine::variables::DomainId;
use crate::engine::variables::IntegerVariable;
use crate::engine::Assignments;

/// A snapshot of instantiated variable values, taken when the search finds a solution.
#[derive(Clone, Debug, Default)]
pub struct Solution {
    values: KeyedVec<DomainId, i32>,
}

impl Solution {
    pub(crate) fn from_assignments(assignments: &Assignments) -> Self {
        let mut values = KeyedVec::default();
        for domain_id in assignments.get_domains() {
            let _ = values.push(assignments.get_assigned_value(domain_id));
        }
        Solution { values }
    }

    /// The value of the given variable in this solution. Views are evaluated through their
    /// transformation.
    pub fn get_value<Var: IntegerVariable>(&self, variable: Var) -> i32 {
        variable.evaluate_assignment(&self.values)
    }
}
