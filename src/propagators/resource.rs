//! Shared filtering primitives for the resource propagators.
//!
//! Each `filter_*` primitive attempts a bound update on a task while taking the task's
//! height variable into account: when the height can still drop to zero, an update which
//! would break the feasibility of a mandatory task excludes the task from the resource (by
//! setting the height to zero) instead of failing.

use crate::basic_types::Entailment;
use crate::engine::propagation::PropagationContext;
use crate::engine::propagation::PropagationContextMut;
use crate::engine::propagation::ReadDomains;
use crate::engine::variables::IntegerVariable;
use crate::engine::EmptyDomain;
use crate::propagators::SchedulingTask;

/// Returns true iff the combination of the task and the height variable can be considered as
/// possibly present on the resource.
pub(crate) fn may_be_performed<Var: IntegerVariable, HVar: IntegerVariable>(
    context: PropagationContext,
    task: &SchedulingTask<Var>,
    height: Option<&HVar>,
) -> bool {
    height.map_or(true, |height| context.upper_bound(height) > 0)
        && task.may_be_performed(context)
}

/// Returns true iff the combination of the task and the height variable must be considered
/// as a performed task on the resource.
pub(crate) fn must_be_performed<Var: IntegerVariable, HVar: IntegerVariable>(
    context: PropagationContext,
    task: &SchedulingTask<Var>,
    height: Option<&HVar>,
) -> bool {
    height.map_or(true, |height| context.lower_bound(height) > 0)
        && task.must_be_performed(context)
}

/// Forces the task to be considered as optional. If the task must be performed, the height
/// variable cannot be higher than 0. Otherwise, if the task is optional, it is set as such.
/// Else the conflict is a failure.
pub(crate) fn filter_optional_task<Var: IntegerVariable, HVar: IntegerVariable>(
    context: &mut PropagationContextMut,
    task: &SchedulingTask<Var>,
    height: Option<&HVar>,
) -> Result<bool, EmptyDomain> {
    let is_optional = task.presence.is_some();
    if let Some(height) = height {
        if !is_optional || task.must_be_performed(context.as_readonly()) {
            return context.set_upper_bound(height, 0);
        }
    }
    if is_optional {
        task.force_to_be_optional(context)
    } else {
        Err(EmptyDomain)
    }
}

/// Updates the earliest start time of the task, considering its height variable.
pub(crate) fn filter_est<Var: IntegerVariable, HVar: IntegerVariable>(
    context: &mut PropagationContextMut,
    task: &SchedulingTask<Var>,
    height: Option<&HVar>,
    est: i32,
) -> Result<bool, EmptyDomain> {
    let read = context.as_readonly();
    if let Some(height) = height {
        if context.as_readonly().lower_bound(height) == 0
            && task.must_be_performed(read)
            && est > task.lst(read)
        {
            return context.set_upper_bound(height, 0);
        }
    }
    if height.map_or(true, |height| context.as_readonly().lower_bound(height) > 0)
        || task.presence.is_some()
    {
        task.update_est(context, est)
    } else {
        Ok(false)
    }
}

/// Updates the latest start time of the task, considering its height variable.
pub(crate) fn filter_lst<Var: IntegerVariable, HVar: IntegerVariable>(
    context: &mut PropagationContextMut,
    task: &SchedulingTask<Var>,
    height: Option<&HVar>,
    lst: i32,
) -> Result<bool, EmptyDomain> {
    let read = context.as_readonly();
    if let Some(height) = height {
        if context.as_readonly().lower_bound(height) == 0
            && task.must_be_performed(read)
            && lst < task.est(read)
        {
            return context.set_upper_bound(height, 0);
        }
    }
    if height.map_or(true, |height| context.as_readonly().lower_bound(height) > 0)
        || task.presence.is_some()
    {
        task.update_lst(context, lst)
    } else {
        Ok(false)
    }
}

/// Updates the earliest completion time of the task, considering its height variable.
pub(crate) fn filter_ect<Var: IntegerVariable, HVar: IntegerVariable>(
    context: &mut PropagationContextMut,
    task: &SchedulingTask<Var>,
    height: Option<&HVar>,
    ect: i32,
) -> Result<bool, EmptyDomain> {
    let read = context.as_readonly();
    if let Some(height) = height {
        if context.as_readonly().lower_bound(height) == 0
            && task.must_be_performed(read)
            && ect > task.lct(read)
        {
            return context.set_upper_bound(height, 0);
        }
    }
    if height.map_or(true, |height| context.as_readonly().lower_bound(height) > 0)
        || task.presence.is_some()
    {
        task.update_ect(context, ect)
    } else {
        Ok(false)
    }
}

/// Updates the latest completion time of the task, considering its height variable.
pub(crate) fn filter_lct<Var: IntegerVariable, HVar: IntegerVariable>(
    context: &mut PropagationContextMut,
    task: &SchedulingTask<Var>,
    height: Option<&HVar>,
    lct: i32,
) -> Result<bool, EmptyDomain> {
    let read = context.as_readonly();
    if let Some(height) = height {
        if context.as_readonly().lower_bound(height) == 0
            && task.must_be_performed(read)
            && lct < task.ect(read)
        {
            return context.set_upper_bound(height, 0);
        }
    }
    if height.map_or(true, |height| context.as_readonly().lower_bound(height) > 0)
        || task.presence.is_some()
    {
        task.update_lct(context, lct)
    } else {
        Ok(false)
    }
}

/// Updates the bounds of the task's duration variable, considering its height variable.
pub(crate) fn filter_duration<Var: IntegerVariable, HVar: IntegerVariable>(
    context: &mut PropagationContextMut,
    task: &SchedulingTask<Var>,
    height: Option<&HVar>,
    min_duration: i32,
    max_duration: i32,
) -> Result<bool, EmptyDomain> {
    let read = context.as_readonly();
    if let Some(height) = height {
        if context.as_readonly().lower_bound(height) == 0
            && task.must_be_performed(read)
            && (max_duration < task.min_duration(read) || task.max_duration(read) < min_duration)
        {
            return context.set_upper_bound(height, 0);
        }
    }
    if height.map_or(true, |height| context.as_readonly().lower_bound(height) > 0)
        || task.presence.is_some()
    {
        task.update_duration(context, min_duration, max_duration)
    } else {
        Ok(false)
    }
}

/// Returns true iff the two tasks may be performed and their start windows interleave, i.e.
/// `b.lst < a.ect && a.lst < b.ect`.
pub(crate) fn intersect<Var: IntegerVariable>(
    context: PropagationContext,
    a: &SchedulingTask<Var>,
    b: &SchedulingTask<Var>,
) -> bool {
    a.may_be_performed(context)
        && b.may_be_performed(context)
        && b.lst(context) < a.ect(context)
        && a.lst(context) < b.ect(context)
}

/// The entailment status of a resource constraint (disjunctive or cumulative): checks that
/// the task relation is respected, that no two mandatory tasks intersect (disjunctive) or
/// that the mandatory load stays within the capacity (cumulative), and that every involved
/// variable is instantiated before concluding `True`.
pub(crate) fn is_entailed<Var: IntegerVariable, HVar: IntegerVariable>(
    context: PropagationContext,
    is_disjunctive: bool,
    tasks: &[SchedulingTask<Var>],
    heights: &[HVar],
    capacity: &HVar,
) -> Entailment {
    let n = tasks.len();
    let mut min = i32::MAX;
    let mut max = i32::MIN;

    // check start + duration = end
    for task in tasks.iter() {
        if task.must_be_performed(context) {
            min = min.min(task.lst(context));
            max = max.max(task.ect(context));
            if task.est(context) + context.lower_bound(&task.duration) > task.lct(context)
                || task.lst(context) + context.upper_bound(&task.duration) < task.ect(context)
            {
                return Entailment::False;
            }
        }
    }

    // check the resource
    let mut max_load = 0;
    if min <= max {
        if !is_disjunctive {
            let mut conso_min = vec![0i32; (max - min) as usize];
            for (task, height) in tasks.iter().zip(heights.iter()) {
                if task.must_be_performed(context) {
                    for t in task.lst(context)..task.ect(context) {
                        let slot = &mut conso_min[(t - min) as usize];
                        *slot += context.lower_bound(height);
                        if *slot > context.upper_bound(capacity) {
                            return Entailment::False;
                        }
                        max_load = max_load.max(*slot);
                    }
                }
            }
        } else {
            for i in 0..n {
                for j in (i + 1)..n {
                    if tasks[i].must_be_performed(context)
                        && context.lower_bound(&heights[i]) > 0
                        && tasks[j].must_be_performed(context)
                        && context.lower_bound(&heights[j]) > 0
                        && intersect(context, &tasks[i], &tasks[j])
                        && tasks[i].min_duration(context) > 0
                        && tasks[j].min_duration(context) > 0
                    {
                        return Entailment::False;
                    }
                }
            }
        }
    }

    // check variables are instantiated
    for (task, height) in tasks.iter().zip(heights.iter()) {
        if !context.is_fixed(&task.start)
            || !context.is_fixed(&task.duration)
            || !context.is_fixed(&task.end)
            || !context.is_fixed(height)
            || (task.may_be_performed(context) && !task.must_be_performed(context))
        {
            return Entailment::Undefined;
        }
    }
    if !context.is_fixed(capacity) {
        return Entailment::Undefined;
    }

    if min <= max && max_load <= context.lower_bound(capacity) {
        return Entailment::True;
    }
    Entailment::Undefined
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::cp::test_solver::TestSolver;
    use crate::engine::propagation::LocalId;
    use crate::engine::variables::DomainId;

    fn new_task(
        solver: &mut TestSolver,
        start: (i32, i32),
        duration: (i32, i32),
        end: (i32, i32),
        id: u32,
    ) -> SchedulingTask<DomainId> {
        SchedulingTask {
            start: solver.new_variable(start.0, start.1),
            duration: solver.new_variable(duration.0, duration.1),
            end: solver.new_variable(end.0, end.1),
            presence: None,
            id: LocalId::from(id),
        }
    }

    #[test]
    fn an_infeasible_update_excludes_the_task_when_its_height_can_drop() {
        let mut solver = TestSolver::default();
        let task = new_task(&mut solver, (0, 3), (2, 2), (2, 5), 0);
        let height = solver.new_variable(0, 4);

        let mut context =
            PropagationContextMut::new(&mut solver.trailed_values, &mut solver.assignments);

        // pushing the est beyond the lst cannot hold for a mandatory task, so the task is
        // taken off the resource instead
        let changed = filter_est(&mut context, &task, Some(&height), 7).expect("no conflict");

        assert!(changed);
        solver.assert_bounds(height, 0, 0);
        // the start is untouched
        solver.assert_bounds(task.start, 0, 3);
    }

    #[test]
    fn feasible_updates_are_applied_to_the_task() {
        let mut solver = TestSolver::default();
        let task = new_task(&mut solver, (0, 6), (2, 4), (2, 10), 0);
        let height = solver.new_variable(1, 4);

        let mut context =
            PropagationContextMut::new(&mut solver.trailed_values, &mut solver.assignments);

        assert!(filter_lst(&mut context, &task, Some(&height), 5).expect("no conflict"));
        assert!(filter_ect(&mut context, &task, Some(&height), 3).expect("no conflict"));
        assert!(filter_lct(&mut context, &task, Some(&height), 9).expect("no conflict"));
        assert!(filter_duration(&mut context, &task, Some(&height), 3, 4).expect("no conflict"));

        solver.assert_bounds(task.start, 0, 5);
        solver.assert_bounds(task.end, 3, 9);
        solver.assert_bounds(task.duration, 3, 4);
    }

    #[test]
    fn a_mandatory_task_cannot_be_made_optional() {
        let mut solver = TestSolver::default();
        let task = new_task(&mut solver, (0, 3), (2, 2), (2, 5), 0);

        let mut context =
            PropagationContextMut::new(&mut solver.trailed_values, &mut solver.assignments);

        let result = filter_optional_task::<DomainId, DomainId>(&mut context, &task, None);
        assert!(result.is_err());
    }

    #[test]
    fn interleaving_windows_intersect() {
        let mut solver = TestSolver::default();
        let a = new_task(&mut solver, (0, 1), (4, 4), (4, 5), 0);
        let b = new_task(&mut solver, (3, 4), (3, 3), (6, 7), 1);
        let c = new_task(&mut solver, (6, 9), (2, 2), (8, 11), 2);

        let context = PropagationContext::new(&solver.assignments);
        assert!(intersect(context, &a, &b));
        assert!(!intersect(context, &a, &c));
    }

    #[test]
    fn entailment_requires_every_variable_to_be_fixed() {
        let mut solver = TestSolver::default();
        let a = new_task(&mut solver, (0, 0), (2, 2), (2, 2), 0);
        let b = new_task(&mut solver, (2, 5), (2, 2), (4, 7), 1);
        let heights = vec![solver.new_variable(1, 1), solver.new_variable(1, 1)];
        let capacity = solver.new_variable(1, 1);

        let context = PropagationContext::new(&solver.assignments);
        assert_eq!(
            is_entailed(context, true, &[a.clone(), b.clone()], &heights, &capacity),
            Entailment::Undefined
        );

        let _ = solver.assignments.make_assignment(b.start, 2).unwrap();
        let _ = solver.assignments.make_assignment(b.end, 4).unwrap();
        let context = PropagationContext::new(&solver.assignments);
        assert_eq!(
            is_entailed(context, true, &[a, b], &heights, &capacity),
            Entailment::True
        );
    }

    #[test]
    fn overlapping_mandatory_tasks_are_a_violation() {
        let mut solver = TestSolver::default();
        let a = new_task(&mut solver, (0, 0), (4, 4), (4, 4), 0);
        let b = new_task(&mut solver, (2, 2), (4, 4), (6, 6), 1);
        let heights = vec![solver.new_variable(1, 1), solver.new_variable(1, 1)];
        let capacity = solver.new_variable(1, 1);

        let context = PropagationContext::new(&solver.assignments);
        assert_eq!(
            is_entailed(context, true, &[a, b], &heights, &capacity),
            Entailment::False
        );
    }
}
