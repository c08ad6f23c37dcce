use crate::basic_types::Entailment;
use crate::basic_types::PropagationStatusCP;
use crate::engine::propagation::LocalId;
use crate::engine::propagation::PropagationContext;
use crate::engine::propagation::PropagationContextMut;
use crate::engine::propagation::Propagator;
use crate::engine::propagation::PropagatorInitialisationContext;
use crate::engine::propagation::ReadDomains;
use crate::engine::variables::IntegerVariable;
use crate::engine::DomainEvents;

/// Bound consistency for `lhs <= rhs`; used by the cumulative factory when the constraint
/// degenerates to a single useful task.
pub(crate) struct LessThanOrEquals<AVar, BVar> {
    lhs: AVar,
    rhs: BVar,
}

impl<AVar: IntegerVariable, BVar: IntegerVariable> LessThanOrEquals<AVar, BVar> {
    pub(crate) fn new(lhs: AVar, rhs: BVar) -> Self {
        LessThanOrEquals { lhs, rhs }
    }
}

impl<AVar: IntegerVariable + 'static, BVar: IntegerVariable + 'static> Propagator
    for LessThanOrEquals<AVar, BVar>
{
    fn name(&self) -> &str {
        "LessThanOrEquals"
    }

    fn priority(&self) -> u32 {
        0
    }

    fn initialise_at_root(
        &mut self,
        context: &mut PropagatorInitialisationContext,
    ) -> PropagationStatusCP {
        let _ = context.register(self.lhs.clone(), DomainEvents::LOWER_BOUND, LocalId::from(0));
        let _ = context.register(self.rhs.clone(), DomainEvents::UPPER_BOUND, LocalId::from(1));
        Ok(())
    }

    fn propagate(&mut self, mut context: PropagationContextMut) -> PropagationStatusCP {
        let rhs_upper_bound = context.as_readonly().upper_bound(&self.rhs);
        let _ = context.set_upper_bound(&self.lhs, rhs_upper_bound)?;

        let lhs_lower_bound = context.as_readonly().lower_bound(&self.lhs);
        let _ = context.set_lower_bound(&self.rhs, lhs_lower_bound)?;

        Ok(())
    }

    fn is_entailed(&self, context: PropagationContext) -> Entailment {
        if context.upper_bound(&self.lhs) <= context.lower_bound(&self.rhs) {
            Entailment::True
        } else if context.lower_bound(&self.lhs) > context.upper_bound(&self.rhs) {
            Entailment::False
        } else {
            Entailment::Undefined
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::cp::test_solver::TestSolver;

    #[test]
    fn bounds_are_propagated_in_both_directions() {
        let mut solver = TestSolver::default();
        let a = solver.new_variable(3, 10);
        let b = solver.new_variable(0, 7);

        let _ = solver
            .new_propagator(LessThanOrEquals::new(a, b))
            .expect("no conflict");

        solver.assert_bounds(a, 3, 7);
        solver.assert_bounds(b, 3, 7);
    }

    #[test]
    fn an_impossible_inequality_fails() {
        let mut solver = TestSolver::default();
        let a = solver.new_variable(8, 10);
        let b = solver.new_variable(0, 7);

        assert!(solver.new_propagator(LessThanOrEquals::new(a, b)).is_err());
    }
}
