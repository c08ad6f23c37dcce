use super::Brancher;
use crate::engine::variables::DomainId;
use crate::engine::variables::IntegerVariable;
use crate::engine::Assignments;

/// The tie-breaking rules for [`Smallest`]: which of two tasks comes first when their
/// earliest start times are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArbitrationRule {
    MinEst,
    MaxEst,
    MinLst,
    MaxLst,
    MinEct,
    MaxEct,
    MinLct,
    MaxLct,
}

/// Returns true iff the first task is before the second task according to the rule, where a
/// task is given as its `(start, end)` variable pair.
pub fn before<Var: IntegerVariable>(
    task1: &(DomainId, Var),
    task2: &(DomainId, Var),
    rule: ArbitrationRule,
    assignments: &Assignments,
) -> bool {
    match rule {
        ArbitrationRule::MinEst => {
            assignments.get_lower_bound(task1.0) < assignments.get_lower_bound(task2.0)
        }
        ArbitrationRule::MaxEst => {
            assignments.get_lower_bound(task1.0) > assignments.get_lower_bound(task2.0)
        }
        ArbitrationRule::MinLst => {
            assignments.get_upper_bound(task1.0) < assignments.get_upper_bound(task2.0)
        }
        ArbitrationRule::MaxLst => {
            assignments.get_upper_bound(task1.0) > assignments.get_upper_bound(task2.0)
        }
        ArbitrationRule::MinEct => {
            task1.1.lower_bound(assignments) < task2.1.lower_bound(assignments)
        }
        ArbitrationRule::MaxEct => {
            task1.1.lower_bound(assignments) > task2.1.lower_bound(assignments)
        }
        ArbitrationRule::MinLct => {
            task1.1.upper_bound(assignments) < task2.1.upper_bound(assignments)
        }
        ArbitrationRule::MaxLct => {
            task1.1.upper_bound(assignments) > task2.1.upper_bound(assignments)
        }
    }
}

/// Selects the unfixed start variable with the smallest lower bound, breaking ties with an
/// [`ArbitrationRule`] (by default the smallest earliest completion time).
#[derive(Debug, Clone)]
pub struct Smallest<Var> {
    /// `(start, end)` variable pairs of the tasks.
    tasks: Vec<(DomainId, Var)>,
    rule: ArbitrationRule,
}

impl<Var> Smallest<Var> {
    pub fn new(tasks: Vec<(DomainId, Var)>) -> Self {
        Smallest {
            tasks,
            rule: ArbitrationRule::MinEct,
        }
    }

    pub fn with_rule(tasks: Vec<(DomainId, Var)>, rule: ArbitrationRule) -> Self {
        Smallest { tasks, rule }
    }
}

impl<Var: IntegerVariable> Brancher for Smallest<Var> {
    fn next_decision(&mut self, assignments: &Assignments) -> Option<(DomainId, i32)> {
        let mut selected: Option<usize> = None;
        for index in 0..self.tasks.len() {
            let start = self.tasks[index].0;
            if assignments.is_domain_assigned(start) {
                continue;
            }
            let is_better = match selected {
                None => true,
                Some(best) => {
                    assignments.get_lower_bound(start)
                        < assignments.get_lower_bound(self.tasks[best].0)
                        || (assignments.get_lower_bound(start)
                            == assignments.get_lower_bound(self.tasks[best].0)
                            && before(
                                &self.tasks[index],
                                &self.tasks[best],
                                self.rule,
                                assignments,
                            ))
                }
            };
            if is_better {
                selected = Some(index);
            }
        }
        selected.map(|index| {
            let start = self.tasks[index].0;
            (start, assignments.get_lower_bound(start))
        })
    }
}
