use crate::engine::propagation::LocalId;
use crate::engine::propagation::PropagationContext;
use crate::engine::propagation::PropagationContextMut;
use crate::engine::propagation::ReadDomains;
use crate::engine::variables::IntegerVariable;
use crate::engine::variables::Literal;
use crate::engine::variables::TransformableVariable;
use crate::engine::EmptyDomain;

/// The sentinel horizon: time bounds reported for absent optional tasks are `±HORIZON`.
/// Using half of the integer range keeps all of the arithmetic performed by the filtering
/// algorithms free of overflow.
pub(crate) const HORIZON: i32 = i32::MAX / 2;

/// A task passed as argument to the scheduling constraints: the `(start, duration, end)`
/// variable triple with the invariant `start + duration = end`, optionally guarded by a
/// presence literal. Construct these through the [`Solver`] task methods.
///
/// [`Solver`]: crate::Solver
#[derive(Debug, Clone)]
pub struct ArgTask<Var> {
    pub start: Var,
    pub duration: Var,
    pub end: Var,
    pub presence: Option<Literal>,
}

/// The internal task entity used by the scheduling propagators; the [`LocalId`] corresponds
/// to the index of the task within its propagator.
#[derive(Debug)]
pub(crate) struct SchedulingTask<Var> {
    pub(crate) start: Var,
    pub(crate) duration: Var,
    pub(crate) end: Var,
    pub(crate) presence: Option<Literal>,
    pub(crate) id: LocalId,
}

impl<Var: Clone> Clone for SchedulingTask<Var> {
    fn clone(&self) -> Self {
        SchedulingTask {
            start: self.start.clone(),
            duration: self.duration.clone(),
            end: self.end.clone(),
            presence: self.presence,
            id: self.id,
        }
    }
}

impl<Var: IntegerVariable> SchedulingTask<Var> {
    pub(crate) fn from_arg_tasks(arg_tasks: impl IntoIterator<Item = ArgTask<Var>>) -> Vec<Self> {
        arg_tasks
            .into_iter()
            .enumerate()
            .map(|(index, arg_task)| SchedulingTask {
                start: arg_task.start,
                duration: arg_task.duration,
                end: arg_task.end,
                presence: arg_task.presence,
                id: LocalId::from(index as u32),
            })
            .collect()
    }

    /// The time-reversed view of this task: running a filtering algorithm on the mirror
    /// applies the symmetric rule on the original, since the mirror reads
    /// `est = -lct(original)` and writes through the reversal as well.
    pub(crate) fn mirror(&self) -> SchedulingTask<Var::AffineView> {
        SchedulingTask {
            start: self.end.scaled(-1),
            duration: self.duration.scaled(1),
            end: self.start.scaled(-1),
            presence: self.presence,
            id: self.id,
        }
    }

    pub(crate) fn may_be_performed(&self, context: PropagationContext) -> bool {
        self.presence
            .map_or(true, |presence| context.upper_bound(&presence) >= 1)
    }

    pub(crate) fn must_be_performed(&self, context: PropagationContext) -> bool {
        self.presence
            .map_or(true, |presence| context.lower_bound(&presence) >= 1)
    }

    pub(crate) fn est(&self, context: PropagationContext) -> i32 {
        if self.may_be_performed(context) {
            context.lower_bound(&self.start)
        } else {
            -HORIZON
        }
    }

    pub(crate) fn lst(&self, context: PropagationContext) -> i32 {
        if self.may_be_performed(context) {
            context.upper_bound(&self.start)
        } else {
            -HORIZON
        }
    }

    pub(crate) fn ect(&self, context: PropagationContext) -> i32 {
        if self.may_be_performed(context) {
            context.lower_bound(&self.end)
        } else {
            HORIZON
        }
    }

    pub(crate) fn lct(&self, context: PropagationContext) -> i32 {
        if self.may_be_performed(context) {
            context.upper_bound(&self.end)
        } else {
            HORIZON
        }
    }

    pub(crate) fn min_duration(&self, context: PropagationContext) -> i32 {
        if self.may_be_performed(context) {
            context.lower_bound(&self.duration)
        } else {
            0
        }
    }

    pub(crate) fn max_duration(&self, context: PropagationContext) -> i32 {
        if self.may_be_performed(context) {
            context.upper_bound(&self.duration)
        } else {
            HORIZON
        }
    }

    /// Whether the task has a compulsory part, i.e. `lst < ect`. Callers combine this with
    /// [`SchedulingTask::must_be_performed`] where mandatory presence is required.
    pub(crate) fn has_compulsory_part(&self, context: PropagationContext) -> bool {
        self.lst(context) < self.ect(context)
    }

    /// Forces the presence of the task; fails when the task is already known absent.
    pub(crate) fn force_to_be_performed(
        &self,
        context: &mut PropagationContextMut,
    ) -> Result<bool, EmptyDomain> {
        match self.presence {
            Some(presence) => context.set_lower_bound(&presence, 1),
            None => Ok(false),
        }
    }

    /// Makes the task absent. A task without a presence literal cannot be made absent, which
    /// is a failure.
    pub(crate) fn force_to_be_optional(
        &self,
        context: &mut PropagationContextMut,
    ) -> Result<bool, EmptyDomain> {
        match self.presence {
            Some(presence) => context.set_upper_bound(&presence, 0),
            None => Err(EmptyDomain),
        }
    }

    /// Intercepts a failed bound update: an optional task whose presence is not yet fixed
    /// absorbs the failure by becoming absent; otherwise the failure is re-raised.
    fn absorb_failure(&self, context: &mut PropagationContextMut) -> Result<bool, EmptyDomain> {
        match self.presence {
            Some(presence) if !presence.is_true(context.assignments) => {
                let _ = context.set_upper_bound(&presence, 0)?;
                Ok(false)
            }
            _ => Err(EmptyDomain),
        }
    }

    pub(crate) fn update_est(
        &self,
        context: &mut PropagationContextMut,
        est: i32,
    ) -> Result<bool, EmptyDomain> {
        if !self.may_be_performed(context.as_readonly()) {
            return Ok(false);
        }
        match context.set_lower_bound(&self.start, est) {
            Ok(changed) => Ok(changed),
            Err(EmptyDomain) => self.absorb_failure(context),
        }
    }

    pub(crate) fn update_lst(
        &self,
        context: &mut PropagationContextMut,
        lst: i32,
    ) -> Result<bool, EmptyDomain> {
        if !self.may_be_performed(context.as_readonly()) {
            return Ok(false);
        }
        match context.set_upper_bound(&self.start, lst) {
            Ok(changed) => Ok(changed),
            Err(EmptyDomain) => self.absorb_failure(context),
        }
    }

    pub(crate) fn update_ect(
        &self,
        context: &mut PropagationContextMut,
        ect: i32,
    ) -> Result<bool, EmptyDomain> {
        if !self.may_be_performed(context.as_readonly()) {
            return Ok(false);
        }
        match context.set_lower_bound(&self.end, ect) {
            Ok(changed) => Ok(changed),
            Err(EmptyDomain) => self.absorb_failure(context),
        }
    }

    pub(crate) fn update_lct(
        &self,
        context: &mut PropagationContextMut,
        lct: i32,
    ) -> Result<bool, EmptyDomain> {
        if !self.may_be_performed(context.as_readonly()) {
            return Ok(false);
        }
        match context.set_upper_bound(&self.end, lct) {
            Ok(changed) => Ok(changed),
            Err(EmptyDomain) => self.absorb_failure(context),
        }
    }

    pub(crate) fn update_min_duration(
        &self,
        context: &mut PropagationContextMut,
        min_duration: i32,
    ) -> Result<bool, EmptyDomain> {
        if !self.may_be_performed(context.as_readonly()) {
            return Ok(false);
        }
        match context.set_lower_bound(&self.duration, min_duration) {
            Ok(changed) => Ok(changed),
            Err(EmptyDomain) => self.absorb_failure(context),
        }
    }

    pub(crate) fn update_max_duration(
        &self,
        context: &mut PropagationContextMut,
        max_duration: i32,
    ) -> Result<bool, EmptyDomain> {
        if !self.may_be_performed(context.as_readonly()) {
            return Ok(false);
        }
        match context.set_upper_bound(&self.duration, max_duration) {
            Ok(changed) => Ok(changed),
            Err(EmptyDomain) => self.absorb_failure(context),
        }
    }

    pub(crate) fn update_duration(
        &self,
        context: &mut PropagationContextMut,
        min_duration: i32,
        max_duration: i32,
    ) -> Result<bool, EmptyDomain> {
        if !self.may_be_performed(context.as_readonly()) {
            return Ok(false);
        }
        match context.set_bounds(&self.duration, min_duration, max_duration) {
            Ok(changed) => Ok(changed),
            Err(EmptyDomain) => self.absorb_failure(context),
        }
    }

    pub(crate) fn instantiate_start_at(
        &self,
        context: &mut PropagationContextMut,
        time: i32,
    ) -> Result<bool, EmptyDomain> {
        if !self.may_be_performed(context.as_readonly()) {
            return Ok(false);
        }
        match context.instantiate_to(&self.start, time) {
            Ok(changed) => Ok(changed),
            Err(EmptyDomain) => self.absorb_failure(context),
        }
    }

    pub(crate) fn instantiate_end_at(
        &self,
        context: &mut PropagationContextMut,
        time: i32,
    ) -> Result<bool, EmptyDomain> {
        if !self.may_be_performed(context.as_readonly()) {
            return Ok(false);
        }
        match context.instantiate_to(&self.end, time) {
            Ok(changed) => Ok(changed),
            Err(EmptyDomain) => self.absorb_failure(context),
        }
    }

    /// One fixpoint run of bound consistency on `start + duration = end`, gated on the task
    /// being possibly present; failed updates are absorbed into the presence as usual.
    pub(crate) fn propagate_relation(
        &self,
        context: &mut PropagationContextMut,
    ) -> Result<bool, EmptyDomain> {
        let mut has_filtered = false;
        loop {
            if !self.may_be_performed(context.as_readonly()) {
                return Ok(has_filtered);
            }

            let mut changed = false;

            let end_lb = context.as_readonly().lower_bound(&self.end);
            let end_ub = context.as_readonly().upper_bound(&self.end);
            let duration_lb = context.as_readonly().lower_bound(&self.duration);
            let duration_ub = context.as_readonly().upper_bound(&self.duration);
            changed |= self.update_est(context, end_lb - duration_ub)?;
            changed |= self.update_lst(context, end_ub - duration_lb)?;

            let start_lb = context.as_readonly().lower_bound(&self.start);
            let start_ub = context.as_readonly().upper_bound(&self.start);
            let duration_lb = context.as_readonly().lower_bound(&self.duration);
            let duration_ub = context.as_readonly().upper_bound(&self.duration);
            changed |= self.update_ect(context, start_lb + duration_lb)?;
            changed |= self.update_lct(context, start_ub + duration_ub)?;

            let start_lb = context.as_readonly().lower_bound(&self.start);
            let start_ub = context.as_readonly().upper_bound(&self.start);
            let end_lb = context.as_readonly().lower_bound(&self.end);
            let end_ub = context.as_readonly().upper_bound(&self.end);
            changed |= self.update_duration(context, end_lb - start_ub, end_ub - start_lb)?;

            if !changed {
                return Ok(has_filtered);
            }
            has_filtered = true;
        }
    }
}
