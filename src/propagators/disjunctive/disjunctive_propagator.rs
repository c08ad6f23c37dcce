use std::cmp::Reverse;
use std::collections::HashMap;

use super::AscendantSetSearchTree;
use super::ThetaTree;
use crate::basic_types::Entailment;
use crate::basic_types::Inconsistency;
use crate::basic_types::PropagationStatusCP;
use crate::engine::propagation::LocalId;
use crate::engine::propagation::PropagationContext;
use crate::engine::propagation::PropagationContextMut;
use crate::engine::propagation::Propagator;
use crate::engine::propagation::PropagatorInitialisationContext;
use crate::engine::propagation::ReadDomains;
use crate::engine::variables::IntegerVariable;
use crate::engine::DomainEvents;
use crate::propagators::resource;
use crate::propagators::SchedulingTask;

/// Propagator for the disjunctive constraint over any number of tasks.
///
/// It composes, to a fixpoint:
/// * the overload checking, detectable precedences and not-first/not-last rules of Vilim
///   (CPAIOR 2004), driven by a [`ThetaTree`];
/// * the edge-finding and immediate selections of Carlier and Pinson (EJOR 1994), driven by
///   an [`AscendantSetSearchTree`].
///
/// Every rule also runs on the mirror tasks, which yields the time-reversed deduction (e.g.
/// not-last from not-first, tail adjustment from head adjustment).
pub(crate) struct Disjunctive<Var: IntegerVariable, HVar> {
    tasks: Vec<SchedulingTask<Var>>,
    mirror_tasks: Vec<SchedulingTask<Var::AffineView>>,
    heights: Vec<HVar>,
    capacity: HVar,
    theta_tree: ThetaTree,
    ascendant_set_search_tree: AscendantSetSearchTree,
}

impl<Var: IntegerVariable, HVar: IntegerVariable> Disjunctive<Var, HVar> {
    pub(crate) fn new(tasks: Vec<SchedulingTask<Var>>, heights: Vec<HVar>, capacity: HVar) -> Self {
        let num_tasks = tasks.len();
        let mirror_tasks = tasks.iter().map(SchedulingTask::mirror).collect();
        Disjunctive {
            tasks,
            mirror_tasks,
            heights,
            capacity,
            theta_tree: ThetaTree::new(num_tasks),
            ascendant_set_search_tree: AscendantSetSearchTree::new(num_tasks),
        }
    }

    /// The tasks which are known to be on the resource, together with their mirrors.
    fn compute_performed_tasks(
        &self,
        context: PropagationContext,
    ) -> (
        Vec<SchedulingTask<Var>>,
        Vec<SchedulingTask<Var::AffineView>>,
    ) {
        let mut performed = Vec::with_capacity(self.tasks.len());
        let mut performed_mirror = Vec::with_capacity(self.tasks.len());
        for (index, task) in self.tasks.iter().enumerate() {
            if context.lower_bound(&self.heights[index]) > 0 && task.must_be_performed(context) {
                performed.push(task.clone());
                performed_mirror.push(self.mirror_tasks[index].clone());
            }
        }
        (performed, performed_mirror)
    }

    fn enforce_task_variables_relation(
        &self,
        context: &mut PropagationContextMut,
    ) -> PropagationStatusCP {
        for task in &self.tasks {
            let _ = task.propagate_relation(context)?;
        }
        Ok(())
    }
}

/// Fails when some prefix of the tasks ordered by lct cannot be completed in its window.
fn overload_checking<Var: IntegerVariable>(
    context: PropagationContext,
    tasks: &[SchedulingTask<Var>],
    tree: &mut ThetaTree,
) -> PropagationStatusCP {
    tree.init(tasks, context);
    let mut indexes: Vec<usize> = (0..tasks.len()).collect();
    indexes.sort_by_key(|&i| tasks[i].lct(context));
    for id in indexes {
        tree.add(id);
        if tree.ect() > tasks[id].lct(context) {
            return Err(Inconsistency::Conflict);
        }
    }
    Ok(())
}

/// Pushes the earliest start of each task after the completion of the set of tasks which
/// must precede it.
fn detectable_precedences<Var: IntegerVariable>(
    context: &mut PropagationContextMut,
    tasks: &[SchedulingTask<Var>],
    tree: &mut ThetaTree,
) -> Result<bool, Inconsistency> {
    let mut has_filtered = false;
    tree.init(tasks, context.as_readonly());
    let mut queue: Vec<usize> = (0..tasks.len()).collect();
    let mut indexes: Vec<usize> = (0..tasks.len()).collect();
    {
        let read = context.as_readonly();
        queue.sort_by_key(|&i| tasks[i].lst(read));
        indexes.sort_by_key(|&i| tasks[i].ect(read));
    }
    let mut q = 0;
    for id in indexes {
        while q < queue.len()
            && tasks[id].ect(context.as_readonly()) > tasks[queue[q]].lst(context.as_readonly())
        {
            tree.add(queue[q]);
            q += 1;
        }
        let ect = if tree.is_present(id) {
            tree.ect_without(id)
        } else {
            tree.ect()
        };
        has_filtered |= tasks[id].update_est(context, ect)?;
    }
    Ok(has_filtered)
}

/// Tightens the latest completion of a task which cannot be scheduled last among the tasks
/// it competes with.
fn not_first_not_last<Var: IntegerVariable>(
    context: &mut PropagationContextMut,
    tasks: &[SchedulingTask<Var>],
    tree: &mut ThetaTree,
) -> Result<bool, Inconsistency> {
    let mut has_filtered = false;
    tree.init(tasks, context.as_readonly());
    let mut queue: Vec<usize> = (0..tasks.len()).collect();
    let mut indexes: Vec<usize> = (0..tasks.len()).collect();
    {
        let read = context.as_readonly();
        queue.sort_by_key(|&i| tasks[i].lst(read));
        indexes.sort_by_key(|&i| tasks[i].lct(read));
    }
    let mut q = 0;
    for id in indexes {
        while q < queue.len()
            && tasks[id].lct(context.as_readonly()) > tasks[queue[q]].lst(context.as_readonly())
        {
            tree.add(queue[q]);
            q += 1;
        }
        if tree.is_present(id)
            && tree.ect_without(id) > tasks[id].lst(context.as_readonly())
        {
            let lst = tasks[queue[q - 1]].lst(context.as_readonly());
            has_filtered |= tasks[id].update_lct(context, lst)?;
        }
    }
    Ok(has_filtered)
}

/// Carlier-Pinson immediate selections: sweeps the tasks by decreasing lst and decreasing
/// ect in lockstep; when a task cannot precede the remaining ones, it is pushed after all of
/// them and they are pushed before it. The updates are recorded and applied as a batch.
fn immediate_selections<Var: IntegerVariable>(
    context: &mut PropagationContextMut,
    tasks: &[SchedulingTask<Var>],
) -> Result<bool, Inconsistency> {
    if tasks.is_empty() {
        return Ok(false);
    }
    let mut l1: Vec<usize> = (0..tasks.len()).collect();
    let mut l2: Vec<usize> = (0..tasks.len()).collect();
    {
        let read = context.as_readonly();
        l1.sort_by_key(|&i| Reverse(tasks[i].lst(read)));
        l2.sort_by_key(|&i| Reverse(tasks[i].ect(read)));
    }
    let mut i1 = 0;
    let mut i2 = 0;

    let mut has_filtered = false;
    let mut new_est: HashMap<usize, i32> = HashMap::new();
    let mut new_lct: HashMap<usize, i32> = HashMap::new();
    while i1 < l1.len() && i2 < l2.len() {
        let read = context.as_readonly();
        let t1 = &tasks[l1[i1]];
        let t2 = &tasks[l2[i2]];
        if l1[i1] == l2[i2]
            || t2.est(read) + t2.min_duration(read) + t1.min_duration(read) <= t1.lct(read)
        {
            i1 += 1;
        } else {
            // the task at i2 runs after every task at i1 and beyond
            for j in i1..l1.len() {
                if l1[j] != l2[i2] {
                    let ect = tasks[l1[j]].ect(read);
                    let entry = new_est.entry(l2[i2]).or_insert(ect);
                    *entry = (*entry).max(ect);
                    let lst = t2.lst(read);
                    let entry = new_lct.entry(l1[j]).or_insert(lst);
                    *entry = (*entry).min(lst);
                }
            }
            i2 += 1;
        }
    }
    for (&id, &est) in new_est.iter() {
        has_filtered |= tasks[id].update_est(context, est)?;
    }
    for (&id, &lct) in new_lct.iter() {
        has_filtered |= tasks[id].update_lct(context, lct)?;
    }
    Ok(has_filtered)
}

impl<Var, HVar> Propagator for Disjunctive<Var, HVar>
where
    Var: IntegerVariable + 'static,
    HVar: IntegerVariable + 'static,
{
    fn name(&self) -> &str {
        "Disjunctive"
    }

    fn priority(&self) -> u32 {
        3
    }

    fn initialise_at_root(
        &mut self,
        context: &mut PropagatorInitialisationContext,
    ) -> PropagationStatusCP {
        let num_tasks = self.tasks.len();
        for (index, task) in self.tasks.iter().enumerate() {
            let local_id = 4 * index as u32;
            let _ = context.register(task.start.clone(), DomainEvents::BOUNDS, LocalId::from(local_id));
            let _ = context.register(
                task.duration.clone(),
                DomainEvents::BOUNDS,
                LocalId::from(local_id + 1),
            );
            let _ = context.register(
                task.end.clone(),
                DomainEvents::BOUNDS,
                LocalId::from(local_id + 2),
            );
            let _ = context.register(
                self.heights[index].clone(),
                DomainEvents::LOWER_BOUND_AND_ASSIGN,
                LocalId::from(local_id + 3),
            );
        }
        let _ = context.register(
            self.capacity.clone(),
            DomainEvents::UPPER_BOUND_AND_ASSIGN,
            LocalId::from(4 * num_tasks as u32),
        );
        for (index, presence) in self
            .tasks
            .iter()
            .filter_map(|task| task.presence)
            .enumerate()
        {
            let _ = context.register(
                presence,
                DomainEvents::BOUNDS,
                LocalId::from((4 * num_tasks + 1 + index) as u32),
            );
        }
        Ok(())
    }

    fn propagate(&mut self, mut context: PropagationContextMut) -> PropagationStatusCP {
        let (performed, performed_mirror) =
            self.compute_performed_tasks(context.as_readonly());

        let mut has_filtered = true;
        while has_filtered {
            while has_filtered {
                while has_filtered {
                    while has_filtered {
                        overload_checking(
                            context.as_readonly(),
                            &performed,
                            &mut self.theta_tree,
                        )?;
                        has_filtered =
                            detectable_precedences(&mut context, &performed, &mut self.theta_tree)?
                                || detectable_precedences(
                                    &mut context,
                                    &performed_mirror,
                                    &mut self.theta_tree,
                                )?;
                        if has_filtered {
                            self.enforce_task_variables_relation(&mut context)?;
                        }
                    }
                    has_filtered =
                        not_first_not_last(&mut context, &performed, &mut self.theta_tree)?
                            || not_first_not_last(
                                &mut context,
                                &performed_mirror,
                                &mut self.theta_tree,
                            )?;
                    if has_filtered {
                        self.enforce_task_variables_relation(&mut context)?;
                    }
                }
                has_filtered = self
                    .ascendant_set_search_tree
                    .adjust(&mut context, &performed)?
                    || self
                        .ascendant_set_search_tree
                        .adjust(&mut context, &performed_mirror)?;
                if has_filtered {
                    self.enforce_task_variables_relation(&mut context)?;
                }
            }
            has_filtered = immediate_selections(&mut context, &performed)?;
            if has_filtered {
                self.enforce_task_variables_relation(&mut context)?;
            }
        }
        Ok(())
    }

    fn is_entailed(&self, context: PropagationContext) -> Entailment {
        resource::is_entailed(context, true, &self.tasks, &self.heights, &self.capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::cp::test_solver::TestSolver;
    use crate::engine::variables::DomainId;

    fn new_task(
        solver: &mut TestSolver,
        est: i32,
        duration: i32,
        lct: i32,
        id: u32,
    ) -> SchedulingTask<DomainId> {
        SchedulingTask {
            start: solver.new_variable(est, lct - duration),
            duration: solver.new_variable(duration, duration),
            end: solver.new_variable(est + duration, lct),
            presence: None,
            id: LocalId::from(id),
        }
    }

    fn unit_resource(
        solver: &mut TestSolver,
        num_tasks: usize,
    ) -> (Vec<DomainId>, DomainId) {
        let heights = (0..num_tasks).map(|_| solver.new_variable(1, 1)).collect();
        let capacity = solver.new_variable(1, 1);
        (heights, capacity)
    }

    #[test]
    fn edge_finding_pushes_the_flexible_task() {
        let mut solver = TestSolver::default();
        let tasks = vec![
            new_task(&mut solver, 0, 3, 5, 0),
            new_task(&mut solver, 1, 3, 6, 1),
            new_task(&mut solver, 0, 3, 10, 2),
        ];
        let start_c = tasks[2].start;
        let (heights, capacity) = unit_resource(&mut solver, 3);

        let _ = solver
            .new_propagator(Disjunctive::new(tasks, heights, capacity))
            .expect("no conflict");

        assert_eq!(solver.lower_bound(start_c), 6);
    }

    #[test]
    fn a_window_too_small_for_two_tasks_fails() {
        let mut solver = TestSolver::default();
        let tasks = vec![
            new_task(&mut solver, 0, 3, 5, 0),
            new_task(&mut solver, 1, 3, 5, 1),
            new_task(&mut solver, 0, 3, 10, 2),
        ];
        let (heights, capacity) = unit_resource(&mut solver, 3);

        assert!(solver
            .new_propagator(Disjunctive::new(tasks, heights, capacity))
            .is_err());
    }

    #[test]
    fn detectable_precedences_leave_a_consistent_instance_untouched() {
        let mut solver = TestSolver::default();
        let tasks = vec![
            new_task(&mut solver, 0, 3, 5, 0),
            new_task(&mut solver, 4, 3, 10, 1),
        ];
        let start_b = tasks[1].start;
        let end_a = tasks[0].end;
        let (heights, capacity) = unit_resource(&mut solver, 2);

        let propagator_args = Disjunctive::new(tasks, heights, capacity);
        let propagator = solver
            .new_propagator(propagator_args)
            .expect("no conflict");

        assert_eq!(solver.lower_bound(start_b), 4);
        // A cannot end after B has started running
        assert!(solver.upper_bound(end_a) <= 5);

        let context = PropagationContext::new(&solver.assignments);
        assert_eq!(
            solver.propagator_store[propagator].is_entailed(context),
            Entailment::Undefined
        );
    }

    #[test]
    fn propagation_is_idempotent() {
        let mut solver = TestSolver::default();
        let tasks = vec![
            new_task(&mut solver, 0, 3, 5, 0),
            new_task(&mut solver, 1, 3, 6, 1),
            new_task(&mut solver, 0, 3, 10, 2),
        ];
        let (heights, capacity) = unit_resource(&mut solver, 3);

        let propagator = solver
            .new_propagator(Disjunctive::new(tasks, heights, capacity))
            .expect("no conflict");

        let num_trail_entries = solver.assignments.num_trail_entries();
        solver.propagate(propagator).expect("no conflict");
        assert_eq!(solver.assignments.num_trail_entries(), num_trail_entries);
    }

    #[test]
    fn an_overloaded_window_fails() {
        let mut solver = TestSolver::default();
        let tasks = vec![
            new_task(&mut solver, 0, 3, 5, 0),
            new_task(&mut solver, 0, 3, 5, 1),
            new_task(&mut solver, 0, 3, 5, 2),
        ];
        let (heights, capacity) = unit_resource(&mut solver, 3);

        assert!(solver
            .new_propagator(Disjunctive::new(tasks, heights, capacity))
            .is_err());
    }

    #[test]
    fn zero_duration_tasks_in_an_occupied_window() {
        let mut solver = TestSolver::default();
        // a fixed task occupying [0, 9) and a task with duration either 0 or 6 which has to
        // start at 8: neither duration fits
        let t1 = new_task(&mut solver, 0, 9, 9, 0);
        let t2 = SchedulingTask {
            start: solver.new_variable(8, 8),
            duration: solver.new_sparse_variable(&[0, 6]),
            end: solver.new_variable(8, 14),
            presence: None,
            id: LocalId::from(1),
        };
        let (heights, capacity) = unit_resource(&mut solver, 2);

        assert!(solver
            .new_propagator(Disjunctive::new(vec![t1, t2], heights, capacity))
            .is_err());
    }

    #[test]
    fn three_tasks_with_a_zero_duration_candidate_fail() {
        let mut solver = TestSolver::default();
        let t1 = new_task(&mut solver, 0, 9, 9, 0);
        let t2 = SchedulingTask {
            start: solver.new_variable(8, 8),
            duration: solver.new_sparse_variable(&[0, 6]),
            end: solver.new_variable(8, 14),
            presence: None,
            id: LocalId::from(1),
        };
        let t3 = new_task(&mut solver, 9, 6, 15, 2);
        let (heights, capacity) = unit_resource(&mut solver, 3);

        assert!(solver
            .new_propagator(Disjunctive::new(vec![t1, t2, t3], heights, capacity))
            .is_err());
    }
}
