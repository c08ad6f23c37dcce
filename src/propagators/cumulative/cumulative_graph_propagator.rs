use std::collections::HashMap;

use fixedbitset::FixedBitSet;

use crate::basic_types::Entailment;
use crate::basic_types::Inconsistency;
use crate::basic_types::PropagationStatusCP;
use crate::engine::propagation::EnqueueDecision;
use crate::engine::propagation::LocalId;
use crate::engine::propagation::PropagationContext;
use crate::engine::propagation::PropagationContextMut;
use crate::engine::propagation::Propagator;
use crate::engine::propagation::PropagatorInitialisationContext;
use crate::engine::propagation::ReadDomains;
use crate::engine::variables::IntegerVariable;
use crate::engine::DomainEvents;
use crate::engine::OpaqueDomainEvent;
use crate::propagators::cumulative::Profile;
use crate::propagators::resource;
use crate::propagators::SchedulingTask;

/// The graph-partitioned variant of the cumulative propagator.
///
/// An undirected overlap graph links the pairs of tasks whose time windows intersect. Fine
/// grained events tighten the changed task's neighbourhood; while the touched
/// neighbourhoods stay small the three filters (time-table, overload check, height update)
/// run on the local neighbourhood only, and otherwise the computation falls back to the
/// full task set. The profile is transient and rebuilt within each propagation.
pub(crate) struct CumulativeGraph<Var: IntegerVariable, HVar> {
    tasks: Vec<SchedulingTask<Var>>,
    heights: Vec<HVar>,
    capacity: HVar,
    profile: Profile,
    graph: Vec<FixedBitSet>,
    to_compute: Vec<usize>,
    tasks_with_free_parts: Vec<usize>,
    tt_after: HashMap<i32, i64>,
    full: bool,
    graph_initialised: bool,
}

fn free_duration<Var: IntegerVariable>(
    context: PropagationContext,
    task: &SchedulingTask<Var>,
) -> i32 {
    let p_tt = 0.max(task.ect(context) - task.lst(context));
    task.min_duration(context) - p_tt
}

impl<Var: IntegerVariable, HVar: IntegerVariable> CumulativeGraph<Var, HVar> {
    pub(crate) fn new(tasks: Vec<SchedulingTask<Var>>, heights: Vec<HVar>, capacity: HVar) -> Self {
        let num_tasks = tasks.len();
        CumulativeGraph {
            tasks,
            heights,
            capacity,
            profile: Profile::new(num_tasks),
            graph: vec![FixedBitSet::with_capacity(num_tasks); num_tasks],
            to_compute: Vec::with_capacity(num_tasks),
            tasks_with_free_parts: Vec::with_capacity(num_tasks),
            tt_after: HashMap::new(),
            full: false,
            graph_initialised: false,
        }
    }

    fn compute_tasks_and_heights(
        &self,
        context: PropagationContext,
    ) -> (Vec<SchedulingTask<Var>>, Vec<HVar>) {
        let mut tasks = Vec::with_capacity(self.tasks.len());
        let mut heights = Vec::with_capacity(self.tasks.len());
        for (task, height) in self.tasks.iter().zip(self.heights.iter()) {
            if resource::may_be_performed(context, task, Some(height)) {
                tasks.push(task.clone());
                heights.push(height.clone());
            }
        }
        (tasks, heights)
    }

    fn disjoint(&self, context: PropagationContext, i: usize, j: usize) -> bool {
        self.tasks[i].est(context) >= self.tasks[j].lct(context)
            || self.tasks[j].est(context) >= self.tasks[i].lct(context)
    }

    fn remove_edge(&mut self, i: usize, j: usize) {
        self.graph[i].set(j, false);
        self.graph[j].set(i, false);
    }

    fn graph_computation(&mut self, context: PropagationContext) {
        for i in 0..self.tasks.len() {
            self.graph[i].clear();
        }
        for i in 0..self.tasks.len() {
            for j in 0..self.tasks.len() {
                if i != j && !self.disjoint(context, i, j) {
                    self.graph[i].insert(j);
                }
            }
        }
    }

    fn build_profile(
        &mut self,
        context: &mut PropagationContextMut,
        tasks: &[SchedulingTask<Var>],
        heights: &[HVar],
    ) -> PropagationStatusCP {
        let max_height = self
            .profile
            .build_profile(context.as_readonly(), tasks, heights);
        let _ = context.set_lower_bound(&self.capacity, max_height)?;
        Ok(())
    }

    fn scalable_time_table(
        &mut self,
        context: &mut PropagationContextMut,
        tasks: &[SchedulingTask<Var>],
        heights: &[HVar],
    ) -> PropagationStatusCP {
        loop {
            self.build_profile(context, tasks, heights)?;
            if !self.scalable_time_table_filter(context, tasks, heights)? {
                return Ok(());
            }
        }
    }

    fn scalable_time_table_filter(
        &self,
        context: &mut PropagationContextMut,
        tasks: &[SchedulingTask<Var>],
        heights: &[HVar],
    ) -> Result<bool, Inconsistency> {
        let mut has_filtered = false;
        for (task, height) in tasks.iter().zip(heights.iter()) {
            if self.scalable_time_table_filter_est(context, task, height)? {
                has_filtered = true;
                let _ = task.propagate_relation(context)?;
            }
            if self.scalable_time_table_filter_lct(context, task, height)? {
                has_filtered = true;
                let _ = task.propagate_relation(context)?;
            }
        }
        Ok(has_filtered)
    }

    fn scalable_time_table_filter_est(
        &self,
        context: &mut PropagationContextMut,
        task: &SchedulingTask<Var>,
        height: &HVar,
    ) -> Result<bool, Inconsistency> {
        let mut has_filtered = false;
        if context.as_readonly().is_fixed(&task.start) {
            return Ok(false);
        }
        let mut j = self.profile.find(task.est(context.as_readonly()));
        while j < self.profile.size()
            && self.profile.start_rectangle(j)
                < task
                    .ect(context.as_readonly())
                    .min(task.lst(context.as_readonly()))
        {
            if context.as_readonly().upper_bound(&self.capacity)
                - context.as_readonly().lower_bound(height)
                < self.profile.height_rectangle(j)
            {
                let new_est = task
                    .lst(context.as_readonly())
                    .min(self.profile.end_rectangle(j));
                has_filtered |= resource::filter_est(context, task, Some(height), new_est)?
                    && resource::must_be_performed(context.as_readonly(), task, Some(height));
            }
            j += 1;
        }
        Ok(has_filtered)
    }

    fn scalable_time_table_filter_lct(
        &self,
        context: &mut PropagationContextMut,
        task: &SchedulingTask<Var>,
        height: &HVar,
    ) -> Result<bool, Inconsistency> {
        let mut has_filtered = false;
        if context.as_readonly().is_fixed(&task.end) {
            return Ok(false);
        }
        let mut j = self.profile.find(task.lct(context.as_readonly()) - 1);
        while j >= 1
            && self.profile.end_rectangle(j)
                > task
                    .lst(context.as_readonly())
                    .max(task.ect(context.as_readonly()))
        {
            if context.as_readonly().upper_bound(&self.capacity)
                - context.as_readonly().lower_bound(height)
                < self.profile.height_rectangle(j)
            {
                let new_lct = self
                    .profile
                    .start_rectangle(j)
                    .max(task.ect(context.as_readonly()));
                has_filtered |= resource::filter_lct(context, task, Some(height), new_lct)?
                    && resource::must_be_performed(context.as_readonly(), task, Some(height));
            }
            j -= 1;
        }
        Ok(has_filtered)
    }

    fn update_heights(
        &self,
        context: &mut PropagationContextMut,
        tasks: &[SchedulingTask<Var>],
        heights: &[HVar],
    ) -> PropagationStatusCP {
        for (task, height) in tasks.iter().zip(heights.iter()) {
            if task.has_compulsory_part(context.as_readonly())
                && task.must_be_performed(context.as_readonly())
            {
                let mut j = self.profile.find(task.lst(context.as_readonly()));
                while j < self.profile.size()
                    && self.profile.start_rectangle(j) < task.ect(context.as_readonly())
                {
                    let bound = context.as_readonly().upper_bound(&self.capacity)
                        - (self.profile.height_rectangle(j)
                            - context.as_readonly().lower_bound(height));
                    let _ = context.set_upper_bound(height, bound)?;
                    j += 1;
                }
            }
        }
        Ok(())
    }

    /// Computes the areas to the right of the given est and lct in one backward walk of the
    /// profile.
    fn compute_tt_after_pair(&mut self, est: i32, lct: i32) {
        let mut tt_after_time: i64 = 0;
        let mut idx = self.profile.size() as isize - 1;
        while idx >= 0 && lct <= self.profile.start_rectangle(idx as usize) {
            let j = idx as usize;
            tt_after_time += self.profile.height_rectangle(j) as i64
                * (self.profile.end_rectangle(j) as i64 - self.profile.start_rectangle(j) as i64);
            idx -= 1;
        }
        if idx >= 0 && lct < self.profile.end_rectangle(idx as usize) {
            let j = idx as usize;
            let _ = self.tt_after.insert(
                lct,
                tt_after_time
                    + self.profile.height_rectangle(j) as i64
                        * (self.profile.end_rectangle(j) as i64 - lct as i64),
            );
        } else {
            let _ = self.tt_after.insert(lct, tt_after_time);
        }
        while idx >= 0 && est <= self.profile.start_rectangle(idx as usize) {
            let j = idx as usize;
            tt_after_time += self.profile.height_rectangle(j) as i64
                * (self.profile.end_rectangle(j) as i64 - self.profile.start_rectangle(j) as i64);
            idx -= 1;
        }
        if idx >= 0 && est < self.profile.end_rectangle(idx as usize) {
            let j = idx as usize;
            let _ = self.tt_after.insert(
                est,
                tt_after_time
                    + self.profile.height_rectangle(j) as i64
                        * (self.profile.end_rectangle(j) as i64 - est as i64),
            );
        } else {
            let _ = self.tt_after.insert(est, tt_after_time);
        }
    }

    fn compute_tt_after(&mut self, context: PropagationContext, tasks: &[SchedulingTask<Var>]) {
        self.tt_after.clear();
        for task in tasks {
            let est = task.est(context);
            let lct = task.lct(context);
            if !self.tt_after.contains_key(&est) || !self.tt_after.contains_key(&lct) {
                self.compute_tt_after_pair(est, lct);
            }
        }
    }

    fn compute_tasks_with_free_parts(
        &mut self,
        context: PropagationContext,
        tasks: &[SchedulingTask<Var>],
        heights: &[HVar],
    ) {
        self.tasks_with_free_parts.clear();
        for (index, task) in tasks.iter().enumerate() {
            if resource::must_be_performed(context, task, Some(&heights[index]))
                && free_duration(context, task) > 0
            {
                self.tasks_with_free_parts.push(index);
            }
        }
        self.tasks_with_free_parts.sort_by_key(|&i| {
            (
                tasks[i].est(context),
                tasks[i].est(context) + free_duration(context, &tasks[i]),
            )
        });
    }

    fn overload_checking(
        &mut self,
        context: &mut PropagationContextMut,
        tasks: &[SchedulingTask<Var>],
        heights: &[HVar],
    ) -> PropagationStatusCP {
        self.compute_tt_after(context.as_readonly(), tasks);
        self.compute_tasks_with_free_parts(context.as_readonly(), tasks, heights);

        let read = context.as_readonly();
        for i in 0..self.tasks_with_free_parts.len() {
            let b = self.tasks_with_free_parts[i];
            let lct_b = tasks[b].lct(read);
            let mut e_ef: i64 = 0;
            for k in (0..self.tasks_with_free_parts.len()).rev() {
                let a = self.tasks_with_free_parts[k];
                if tasks[a].lct(read) <= tasks[b].lct(read)
                    && resource::must_be_performed(read, &tasks[a], Some(&heights[a]))
                {
                    let est_a = tasks[a].est(read);
                    e_ef +=
                        free_duration(read, &tasks[a]) as i64 * read.lower_bound(&heights[a]) as i64;
                    if (read.upper_bound(&self.capacity) as i64) * (lct_b as i64 - est_a as i64)
                        < e_ef + self.tt_after.get(&est_a).copied().unwrap_or(0)
                            - self.tt_after.get(&lct_b).copied().unwrap_or(0)
                    {
                        return Err(Inconsistency::Conflict);
                    }
                }
            }
        }
        Ok(())
    }

    fn filter(
        &mut self,
        context: &mut PropagationContextMut,
        tasks: &[SchedulingTask<Var>],
        heights: &[HVar],
    ) -> PropagationStatusCP {
        self.scalable_time_table(context, tasks, heights)?;
        self.overload_checking(context, tasks, heights)?;
        self.update_heights(context, tasks, heights)?;
        Ok(())
    }

    fn filter_around(
        &mut self,
        context: &mut PropagationContextMut,
        task_index: usize,
    ) -> PropagationStatusCP {
        let mut tasks = vec![self.tasks[task_index].clone()];
        let mut heights = vec![self.heights[task_index].clone()];
        for neighbour in self.graph[task_index].ones() {
            tasks.push(self.tasks[neighbour].clone());
            heights.push(self.heights[neighbour].clone());
        }
        self.filter(context, &tasks, &heights)
    }
}

impl<Var, HVar> Propagator for CumulativeGraph<Var, HVar>
where
    Var: IntegerVariable + 'static,
    HVar: IntegerVariable + 'static,
{
    fn name(&self) -> &str {
        "CumulativeGraph"
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

    fn notify(
        &mut self,
        context: PropagationContext,
        local_id: LocalId,
        _event: OpaqueDomainEvent,
    ) -> EnqueueDecision {
        let index = local_id.unpack() as usize;
        if index < 4 * self.tasks.len() {
            let v = index / 4;
            if context.upper_bound(&self.heights[v]) == 0
                || self.tasks[v].max_duration(context) == 0
            {
                let neighbours: Vec<usize> = self.graph[v].ones().collect();
                for neighbour in neighbours {
                    self.remove_edge(v, neighbour);
                }
            } else {
                self.to_compute.push(v);
            }
        } else {
            self.full = true;
        }
        EnqueueDecision::Enqueue
    }

    fn synchronise(&mut self, context: PropagationContext) {
        self.to_compute.clear();
        self.full = false;
        if self.graph_initialised {
            self.graph_computation(context);
        }
    }

    fn propagate(&mut self, mut context: PropagationContextMut) -> PropagationStatusCP {
        let (tasks, heights) = self.compute_tasks_and_heights(context.as_readonly());

        if !self.graph_initialised {
            self.filter(&mut context, &tasks, &heights)?;
            self.graph_computation(context.as_readonly());
            self.graph_initialised = true;
        } else if self.full {
            self.filter(&mut context, &tasks, &heights)?;
        } else {
            let mut count = 0;
            let pending = self.to_compute.clone();
            for &i in &pending {
                let neighbours: Vec<usize> = self.graph[i].ones().collect();
                for j in neighbours {
                    if self.disjoint(context.as_readonly(), i, j)
                        || context.as_readonly().upper_bound(&self.heights[i]) == 0
                        || self.tasks[i].max_duration(context.as_readonly()) == 0
                    {
                        self.remove_edge(i, j);
                    }
                }
                count += self.graph[i].count_ones(..);
                if count >= 2 * self.tasks.len() {
                    break;
                }
            }
            if count >= 2 * self.tasks.len() {
                self.filter(&mut context, &tasks, &heights)?;
            } else {
                for i in pending {
                    self.filter_around(&mut context, i)?;
                }
            }
        }

        self.to_compute.clear();
        self.full = false;
        Ok(())
    }

    fn is_entailed(&self, context: PropagationContext) -> Entailment {
        resource::is_entailed(context, false, &self.tasks, &self.heights, &self.capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::cp::test_solver::TestSolver;
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
    fn the_graph_variant_filters_like_the_time_table() {
        let mut solver = TestSolver::default();
        let t1 = new_task(&mut solver, (2, 2), (3, 3), (5, 5), 0);
        let t2 = new_task(&mut solver, (0, 10), (4, 4), (4, 14), 1);
        let start2 = t2.start;
        let heights = vec![solver.new_variable(1, 1), solver.new_variable(1, 1)];
        let capacity = solver.new_variable(1, 1);

        let propagator = solver
            .new_propagator(CumulativeGraph::new(vec![t1, t2], heights, capacity))
            .expect("no conflict");
        solver
            .propagate_until_fixed_point(propagator)
            .expect("no conflict");

        assert_eq!(solver.lower_bound(start2), 5);
    }

    #[test]
    fn incremental_events_keep_the_filtering_sound() {
        let mut solver = TestSolver::default();
        let t1 = new_task(&mut solver, (0, 6), (3, 3), (3, 9), 0);
        let t2 = new_task(&mut solver, (0, 10), (4, 4), (4, 14), 1);
        let start1 = t1.start;
        let start2 = t2.start;
        let heights = vec![solver.new_variable(1, 1), solver.new_variable(1, 1)];
        let capacity = solver.new_variable(1, 1);

        let propagator = solver
            .new_propagator(CumulativeGraph::new(vec![t1, t2], heights, capacity))
            .expect("no conflict");

        // fixing the first task to [2, 5) creates a compulsory part in the way of the other
        let _ = solver.increase_lower_bound_and_notify(propagator, 0, start1, 2);
        let _ = solver.decrease_upper_bound_and_notify(propagator, 0, start1, 2);
        solver
            .propagate_until_fixed_point(propagator)
            .expect("no conflict");

        assert_eq!(solver.lower_bound(start2), 5);
    }

    #[test]
    fn an_energy_excess_in_the_neighbourhood_fails() {
        let mut solver = TestSolver::default();
        let tasks: Vec<_> = (0..4)
            .map(|i| new_task(&mut solver, (0, 2), (2, 2), (2, 4), i))
            .collect();
        let heights = (0..4).map(|_| solver.new_variable(1, 1)).collect();
        let capacity = solver.new_variable(1, 1);

        assert!(solver
            .new_propagator(CumulativeGraph::new(tasks, heights, capacity))
            .is_err());
    }
}
