use std::collections::HashMap;

use crate::basic_types::Entailment;
use crate::basic_types::PropagationStatusCP;
use crate::engine::propagation::EnqueueDecision;
use crate::engine::propagation::LocalId;
use crate::engine::propagation::ManipulateTrailedValues;
use crate::engine::propagation::PropagationContext;
use crate::engine::propagation::PropagationContextMut;
use crate::engine::propagation::Propagator;
use crate::engine::propagation::PropagatorInitialisationContext;
use crate::engine::propagation::ReadDomains;
use crate::engine::variables::IntegerVariable;
use crate::engine::DomainEvents;
use crate::engine::OpaqueDomainEvent;
use crate::engine::TrailedInteger;
use crate::propagators::cumulative::BacktrackableProfile;
use crate::propagators::resource;
use crate::propagators::SchedulingTask;

/// Propagator for the cumulative constraint, composing to a local fixpoint:
/// * the scalable time-table filtering of Gay, Hartert and Schaus (CP 2015) over the
///   compulsory-part profile;
/// * the overload checking of Vilim (CPAIOR 2011) over the time-table areas;
/// * the tightening of the height variables against the profile.
///
/// The profile and the `tt_after` area table are stored in trailed integers, so that on
/// backtrack they return to the state matching the restored domains and need not be rebuilt.
pub(crate) struct Cumulative<Var: IntegerVariable, HVar> {
    tasks: Vec<SchedulingTask<Var>>,
    heights: Vec<HVar>,
    capacity: HVar,
    profile: Option<BacktrackableProfile>,

    // storage for the overload checking
    time_values: Vec<TrailedInteger>,
    tt_after: Vec<TrailedInteger>,
    size_tt_after: TrailedInteger,
    tt_after_map: HashMap<i32, i64>,
    tasks_with_free_parts: Vec<usize>,

    should_recompute_time_table: bool,
    has_recomputed_time_table: bool,
    /// When false, the profile is rebuilt at the start of every propagation instead of only
    /// when a compulsory part changed.
    incremental: bool,
}

/// The free duration of a task: the part of its minimal duration not already covered by its
/// compulsory part.
fn free_duration<Var: IntegerVariable>(
    context: PropagationContext,
    task: &SchedulingTask<Var>,
) -> i32 {
    let p_tt = 0.max(task.ect(context) - task.lst(context));
    task.min_duration(context) - p_tt
}

impl<Var: IntegerVariable, HVar: IntegerVariable> Cumulative<Var, HVar> {
    pub(crate) fn new(tasks: Vec<SchedulingTask<Var>>, heights: Vec<HVar>, capacity: HVar) -> Self {
        Cumulative {
            tasks,
            heights,
            capacity,
            profile: None,
            time_values: Vec::new(),
            tt_after: Vec::new(),
            size_tt_after: TrailedInteger::default(),
            tt_after_map: HashMap::new(),
            tasks_with_free_parts: Vec::new(),
            should_recompute_time_table: true,
            has_recomputed_time_table: false,
            incremental: true,
        }
    }

    /// The variant whose profile is rebuilt within every propagation.
    pub(crate) fn new_transient(
        tasks: Vec<SchedulingTask<Var>>,
        heights: Vec<HVar>,
        capacity: HVar,
    ) -> Self {
        Cumulative {
            incremental: false,
            ..Cumulative::new(tasks, heights, capacity)
        }
    }

    /// The tasks which may still be present on the resource, with their heights.
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

    fn build_profile(
        &mut self,
        context: &mut PropagationContextMut,
        profile: &mut BacktrackableProfile,
        tasks: &[SchedulingTask<Var>],
        heights: &[HVar],
    ) -> PropagationStatusCP {
        let max_height = profile.build_profile(context, tasks, heights);
        let _ = context.set_lower_bound(&self.capacity, max_height)?;
        Ok(())
    }

    fn scalable_time_table(
        &mut self,
        context: &mut PropagationContextMut,
        profile: &mut BacktrackableProfile,
        tasks: &[SchedulingTask<Var>],
        heights: &[HVar],
    ) -> PropagationStatusCP {
        loop {
            if self.should_recompute_time_table {
                self.build_profile(context, profile, tasks, heights)?;
                self.should_recompute_time_table = false;
                self.has_recomputed_time_table = true;
            }
            if !self.scalable_time_table_filter(context, profile, tasks, heights)? {
                return Ok(());
            }
        }
    }

    fn scalable_time_table_filter(
        &mut self,
        context: &mut PropagationContextMut,
        profile: &BacktrackableProfile,
        tasks: &[SchedulingTask<Var>],
        heights: &[HVar],
    ) -> Result<bool, crate::basic_types::Inconsistency> {
        let mut has_filtered = false;
        for (task, height) in tasks.iter().zip(heights.iter()) {
            if self.scalable_time_table_filter_est(context, profile, task, height)? {
                has_filtered = true;
                let _ = task.propagate_relation(context)?;
                self.should_recompute_time_table |= task.has_compulsory_part(context.as_readonly())
                    && resource::must_be_performed(context.as_readonly(), task, Some(height));
            }
            if self.scalable_time_table_filter_lct(context, profile, task, height)? {
                has_filtered = true;
                let _ = task.propagate_relation(context)?;
                self.should_recompute_time_table |= task.has_compulsory_part(context.as_readonly())
                    && resource::must_be_performed(context.as_readonly(), task, Some(height));
            }
        }
        Ok(has_filtered)
    }

    /// Sweeps the profile rectangles which overlap `[est, min(ect, lst))` from the left and
    /// pushes the earliest start past every rectangle the task does not fit on.
    fn scalable_time_table_filter_est(
        &self,
        context: &mut PropagationContextMut,
        profile: &BacktrackableProfile,
        task: &SchedulingTask<Var>,
        height: &HVar,
    ) -> Result<bool, crate::basic_types::Inconsistency> {
        let mut has_filtered = false;
        if context.as_readonly().is_fixed(&task.start) {
            return Ok(false);
        }
        let mut j = profile.find(context, task.est(context.as_readonly()));
        while j < profile.size(context)
            && profile.start_rectangle(context, j)
                < task
                    .ect(context.as_readonly())
                    .min(task.lst(context.as_readonly()))
        {
            if context.as_readonly().upper_bound(&self.capacity)
                - context.as_readonly().lower_bound(height)
                < profile.height_rectangle(context, j)
            {
                let new_est = task
                    .lst(context.as_readonly())
                    .min(profile.end_rectangle(context, j));
                has_filtered |= resource::filter_est(context, task, Some(height), new_est)?
                    && resource::must_be_performed(context.as_readonly(), task, Some(height));
            }
            j += 1;
        }
        Ok(has_filtered)
    }

    /// The symmetric right-to-left sweep pulling the latest completion before every
    /// rectangle the task does not fit on.
    fn scalable_time_table_filter_lct(
        &self,
        context: &mut PropagationContextMut,
        profile: &BacktrackableProfile,
        task: &SchedulingTask<Var>,
        height: &HVar,
    ) -> Result<bool, crate::basic_types::Inconsistency> {
        let mut has_filtered = false;
        if context.as_readonly().is_fixed(&task.end) {
            return Ok(false);
        }
        let mut j = profile.find(context, task.lct(context.as_readonly()) - 1);
        while j >= 1
            && profile.end_rectangle(context, j)
                > task
                    .lst(context.as_readonly())
                    .max(task.ect(context.as_readonly()))
        {
            if context.as_readonly().upper_bound(&self.capacity)
                - context.as_readonly().lower_bound(height)
                < profile.height_rectangle(context, j)
            {
                let new_lct = profile
                    .start_rectangle(context, j)
                    .max(task.ect(context.as_readonly()));
                has_filtered |= resource::filter_lct(context, task, Some(height), new_lct)?
                    && resource::must_be_performed(context.as_readonly(), task, Some(height));
            }
            j -= 1;
        }
        Ok(has_filtered)
    }

    /// Tightens the height of every mandatory task against the rectangles overlapping its
    /// compulsory part (the task's own contribution is subtracted out).
    fn update_heights(
        &self,
        context: &mut PropagationContextMut,
        profile: &BacktrackableProfile,
        tasks: &[SchedulingTask<Var>],
        heights: &[HVar],
    ) -> PropagationStatusCP {
        for (task, height) in tasks.iter().zip(heights.iter()) {
            if task.has_compulsory_part(context.as_readonly())
                && task.must_be_performed(context.as_readonly())
            {
                let mut j = profile.find(context, task.lst(context.as_readonly()));
                while j < profile.size(context)
                    && profile.start_rectangle(context, j) < task.ect(context.as_readonly())
                {
                    let bound = context.as_readonly().upper_bound(&self.capacity)
                        - (profile.height_rectangle(context, j)
                            - context.as_readonly().lower_bound(height));
                    let _ = context.set_upper_bound(height, bound)?;
                    j += 1;
                }
            }
        }
        Ok(())
    }

    /// One backward sweep of the profile computing the total area strictly to the right of
    /// every distinct est and lct; the table is stored in trailed integers.
    fn compute_tt_after(
        &mut self,
        context: &mut PropagationContextMut,
        profile: &BacktrackableProfile,
        tasks: &[SchedulingTask<Var>],
    ) {
        let mut times: Vec<i32> = Vec::with_capacity(2 * tasks.len());
        for task in tasks {
            times.push(task.est(context.as_readonly()));
            times.push(task.lct(context.as_readonly()));
        }
        times.sort_unstable();
        times.dedup();

        let mut tt_after_time: i64 = 0;
        let mut idx = profile.size(context) as isize - 1;
        for k in 0..times.len() {
            let position = times.len() - 1 - k;
            let time = times[position];
            while idx >= 0 && time <= profile.start_rectangle(context, idx as usize) {
                let j = idx as usize;
                tt_after_time += profile.height_rectangle(context, j) as i64
                    * (profile.end_rectangle(context, j) as i64
                        - profile.start_rectangle(context, j) as i64);
                idx -= 1;
            }
            let value = if idx >= 0 && time < profile.end_rectangle(context, idx as usize) {
                let j = idx as usize;
                tt_after_time
                    + profile.height_rectangle(context, j) as i64
                        * (profile.end_rectangle(context, j) as i64 - time as i64)
            } else {
                tt_after_time
            };
            context.assign(self.time_values[position], time as i64);
            context.assign(self.tt_after[position], value);
        }
        context.assign(self.size_tt_after, times.len() as i64);
    }

    fn fill_tt_after_map(&mut self, context: &PropagationContextMut) {
        self.tt_after_map.clear();
        for i in 0..context.value(self.size_tt_after) as usize {
            let _ = self
                .tt_after_map
                .insert(context.value(self.time_values[i]) as i32, context.value(self.tt_after[i]));
        }
    }

    fn get_tt_after(&self, time: i32) -> i64 {
        self.tt_after_map.get(&time).copied().unwrap_or(0)
    }

    fn compute_tasks_with_free_parts(
        &mut self,
        context: PropagationContext,
        tasks: &[SchedulingTask<Var>],
    ) {
        self.tasks_with_free_parts.clear();
        for (index, task) in tasks.iter().enumerate() {
            if free_duration(context, task) > 0 {
                self.tasks_with_free_parts.push(index);
            }
        }
        self.tasks_with_free_parts
            .sort_by_key(|&i| (tasks[i].est(context), tasks[i].est(context) + free_duration(context, &tasks[i])));
    }

    /// The overload check of Vilim (2011): when the free energy of the tasks ending by some
    /// deadline plus the time-table area in their window exceeds the available area, the
    /// candidate task cannot be present.
    fn overload_checking(
        &mut self,
        context: &mut PropagationContextMut,
        profile: &BacktrackableProfile,
        tasks: &[SchedulingTask<Var>],
        heights: &[HVar],
    ) -> PropagationStatusCP {
        if self.has_recomputed_time_table {
            self.compute_tt_after(context, profile, tasks);
        }
        self.fill_tt_after_map(context);
        self.compute_tasks_with_free_parts(context.as_readonly(), tasks);

        for i in 0..self.tasks_with_free_parts.len() {
            let b = self.tasks_with_free_parts[i];
            let lct_b = tasks[b].lct(context.as_readonly());
            let mut e_ef: i64 = 0;
            for k in (0..self.tasks_with_free_parts.len()).rev() {
                let a = self.tasks_with_free_parts[k];
                let read = context.as_readonly();
                if tasks[a].lct(read) <= tasks[b].lct(read)
                    && resource::must_be_performed(read, &tasks[a], Some(&heights[a]))
                {
                    let est_a = tasks[a].est(read);
                    e_ef += free_duration(read, &tasks[a]) as i64
                        * read.lower_bound(&heights[a]) as i64;
                    if (read.upper_bound(&self.capacity) as i64) * (lct_b as i64 - est_a as i64)
                        < e_ef + self.get_tt_after(est_a) - self.get_tt_after(lct_b)
                    {
                        let _ =
                            resource::filter_optional_task(context, &tasks[b], Some(&heights[b]))?;
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    fn filter(
        &mut self,
        context: &mut PropagationContextMut,
        profile: &mut BacktrackableProfile,
        tasks: &[SchedulingTask<Var>],
        heights: &[HVar],
    ) -> PropagationStatusCP {
        self.scalable_time_table(context, profile, tasks, heights)?;
        self.overload_checking(context, profile, tasks, heights)?;
        self.update_heights(context, profile, tasks, heights)?;
        Ok(())
    }
}

impl<Var, HVar> Propagator for Cumulative<Var, HVar>
where
    Var: IntegerVariable + 'static,
    HVar: IntegerVariable + 'static,
{
    fn name(&self) -> &str {
        "Cumulative"
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

        self.profile = Some(BacktrackableProfile::new(num_tasks, context));
        self.time_values = (0..2 * num_tasks)
            .map(|_| context.new_trailed_integer(0))
            .collect();
        self.tt_after = (0..2 * num_tasks)
            .map(|_| context.new_trailed_integer(0))
            .collect();
        self.size_tt_after = context.new_trailed_integer(0);

        Ok(())
    }

    fn notify(
        &mut self,
        context: PropagationContext,
        local_id: LocalId,
        _event: OpaqueDomainEvent,
    ) -> EnqueueDecision {
        let index = local_id.unpack() as usize;
        if index >= 4 * self.tasks.len() {
            self.should_recompute_time_table = true;
        } else {
            let task = &self.tasks[index / 4];
            if task.has_compulsory_part(context)
                && resource::must_be_performed(context, task, Some(&self.heights[index / 4]))
            {
                self.should_recompute_time_table = true;
            }
        }
        EnqueueDecision::Enqueue
    }

    fn propagate(&mut self, mut context: PropagationContextMut) -> PropagationStatusCP {
        self.has_recomputed_time_table = false;
        self.should_recompute_time_table |= !self.incremental;
        let mut profile = self.profile.take().expect("initialised at root");
        let (tasks, heights) = self.compute_tasks_and_heights(context.as_readonly());
        let result = self.filter(&mut context, &mut profile, &tasks, &heights);
        self.profile = Some(profile);
        result
    }

    fn is_entailed(&self, context: PropagationContext) -> Entailment {
        resource::is_entailed(context, false, &self.tasks, &self.heights, &self.capacity)
    }
}
