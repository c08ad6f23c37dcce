use crate::engine::propagation::ManipulateTrailedValues;
use crate::engine::propagation::PropagationContext;
use crate::engine::propagation::PropagationContextMut;
use crate::engine::propagation::PropagatorInitialisationContext;
use crate::engine::propagation::ReadDomains;
use crate::engine::variables::IntegerVariable;
use crate::engine::TrailedInteger;
use crate::kairos_assert_moderate;
use crate::propagators::cumulative::EventPointSeries;
use crate::propagators::cumulative::EventType;
use crate::propagators::SchedulingTask;
use crate::propagators::HORIZON;

/// The compulsory-part profile: a step function over time stored as contiguous rectangles
/// `(start, end, height)` bracketed by zero-height sentinel rectangles at `-HORIZON` and
/// `HORIZON`. Rectangle `j` spans `[time_points[j], time_points[j + 1])`.
///
/// This transient variant is rebuilt from scratch within every propagation; see
/// [`BacktrackableProfile`] for the variant whose storage survives backtracking.
#[derive(Debug)]
pub(crate) struct Profile {
    time_points: Vec<i32>,
    heights: Vec<i32>,
    event_point_series: EventPointSeries,
}

impl Profile {
    pub(crate) fn new(nb_tasks: usize) -> Self {
        Profile {
            time_points: Vec::with_capacity(2 * (nb_tasks + 1)),
            heights: Vec::with_capacity(2 * (nb_tasks + 1)),
            event_point_series: EventPointSeries::new(nb_tasks, 2),
        }
    }

    pub(crate) fn size(&self) -> usize {
        self.time_points.len() - 2
    }

    pub(crate) fn start_rectangle(&self, j: usize) -> i32 {
        self.time_points[j]
    }

    pub(crate) fn end_rectangle(&self, j: usize) -> i32 {
        self.time_points[j + 1]
    }

    pub(crate) fn height_rectangle(&self, j: usize) -> i32 {
        self.heights[j]
    }

    /// Sweeps the compulsory-part events of the mandatory tasks and rebuilds the rectangle
    /// sequence; returns the maximum interior height.
    pub(crate) fn build_profile<Var: IntegerVariable, HVar: IntegerVariable>(
        &mut self,
        context: PropagationContext,
        tasks: &[SchedulingTask<Var>],
        heights: &[HVar],
    ) -> i32 {
        self.time_points.clear();
        self.heights.clear();
        self.time_points.push(-HORIZON);
        self.heights.push(0);

        let mut max_height = 0;
        self.event_point_series
            .generate_events(tasks, context, false, false, false);
        if !self.event_point_series.is_empty() {
            let mut h = 0;
            while !self.event_point_series.is_empty() {
                let date = self.event_point_series.peek().date;
                self.time_points.push(date);
                while !self.event_point_series.is_empty()
                    && self.event_point_series.peek().date == date
                {
                    let event = self.event_point_series.remove_event();
                    let height = context.lower_bound(&heights[event.task_index]);
                    h += if event.event_type == EventType::Scp {
                        height
                    } else {
                        -height
                    };
                }
                self.heights.push(h);
                max_height = max_height.max(h);
                kairos_assert_moderate!(h >= 0);
            }
            kairos_assert_moderate!(self.heights.last() == Some(&0));
        }
        self.time_points.push(HORIZON);
        self.heights.push(0);
        max_height
    }

    /// Binary search for the rectangle containing the date; the sentinels guarantee a hit.
    pub(crate) fn find(&self, date: i32) -> usize {
        let mut i1 = 0;
        let mut i2 = self.size();
        while i1 < i2 {
            let im = (i1 + i2) / 2;
            if self.time_points[im] <= date && date < self.time_points[im + 1] {
                i1 = im;
                i2 = im;
            } else if self.time_points[im] < date {
                i1 = im + 1;
            } else {
                i2 = im - 1;
            }
        }
        i1
    }
}

/// A [`Profile`] whose rectangle storage lives in trailed integers, so that on backtrack the
/// profile returns to its prior state without recomputation.
#[derive(Debug)]
pub(crate) struct BacktrackableProfile {
    time_points: Vec<TrailedInteger>,
    heights: Vec<TrailedInteger>,
    idx: TrailedInteger,
    event_point_series: EventPointSeries,
}

impl BacktrackableProfile {
    pub(crate) fn new(nb_tasks: usize, context: &mut PropagatorInitialisationContext) -> Self {
        let size = 2 * (nb_tasks + 1);
        BacktrackableProfile {
            time_points: (0..size).map(|_| context.new_trailed_integer(0)).collect(),
            heights: (0..size).map(|_| context.new_trailed_integer(0)).collect(),
            idx: context.new_trailed_integer(0),
            event_point_series: EventPointSeries::new(nb_tasks, 2),
        }
    }

    pub(crate) fn size(&self, context: &PropagationContextMut) -> usize {
        (context.value(self.idx) - 2) as usize
    }

    pub(crate) fn start_rectangle(&self, context: &PropagationContextMut, j: usize) -> i32 {
        context.value(self.time_points[j]) as i32
    }

    pub(crate) fn end_rectangle(&self, context: &PropagationContextMut, j: usize) -> i32 {
        context.value(self.time_points[j + 1]) as i32
    }

    pub(crate) fn height_rectangle(&self, context: &PropagationContextMut, j: usize) -> i32 {
        context.value(self.heights[j]) as i32
    }

    /// See [`Profile::build_profile`]; the rectangles are written through the trail.
    pub(crate) fn build_profile<Var: IntegerVariable, HVar: IntegerVariable>(
        &mut self,
        context: &mut PropagationContextMut,
        tasks: &[SchedulingTask<Var>],
        heights: &[HVar],
    ) -> i32 {
        let series = &mut self.event_point_series;

        let mut idx = 0;
        context.assign(self.time_points[idx], -HORIZON as i64);
        context.assign(self.heights[idx], 0);
        idx += 1;

        let mut max_height = 0;
        series.generate_events(tasks, context.as_readonly(), false, false, false);
        if !series.is_empty() {
            let mut h: i64 = 0;
            while !series.is_empty() {
                let date = series.peek().date;
                context.assign(self.time_points[idx], date as i64);
                while !series.is_empty() && series.peek().date == date {
                    let event = series.remove_event();
                    let height =
                        context.as_readonly().lower_bound(&heights[event.task_index]) as i64;
                    h += if event.event_type == EventType::Scp {
                        height
                    } else {
                        -height
                    };
                }
                context.assign(self.heights[idx], h);
                idx += 1;
                max_height = max_height.max(h as i32);
                kairos_assert_moderate!(h >= 0);
            }
            kairos_assert_moderate!(h == 0);
        }
        context.assign(self.time_points[idx], HORIZON as i64);
        context.assign(self.heights[idx], 0);
        idx += 1;
        context.assign(self.idx, idx as i64);

        max_height
    }

    /// Binary search for the rectangle containing the date; the sentinels guarantee a hit.
    pub(crate) fn find(&self, context: &PropagationContextMut, date: i32) -> usize {
        let mut i1 = 0;
        let mut i2 = self.size(context);
        while i1 < i2 {
            let im = (i1 + i2) / 2;
            if self.start_rectangle(context, im) <= date && date < self.start_rectangle(context, im + 1)
            {
                i1 = im;
                i2 = im;
            } else if self.start_rectangle(context, im) < date {
                i1 = im + 1;
            } else {
                i2 = im - 1;
            }
        }
        i1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::cp::test_solver::TestSolver;
    use crate::engine::propagation::LocalId;
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

    #[test]
    fn the_profile_aggregates_overlapping_compulsory_parts() {
        let mut solver = TestSolver::default();
        // compulsory parts [2, 5) with height 2 and [4, 8) with height 3
        let tasks = vec![
            new_task(&mut solver, 0, 5, 7, 0),
            new_task(&mut solver, 4, 4, 8, 1),
        ];
        let heights = vec![solver.new_variable(2, 2), solver.new_variable(3, 3)];

        let mut profile = Profile::new(tasks.len());
        let context = PropagationContext::new(&solver.assignments);
        let max_height = profile.build_profile(context, &tasks, &heights);

        assert_eq!(max_height, 5);

        // rectangles: sentinel, [2,4)@2, [4,5)@5, [5,8)@3, then the closing zero rectangle
        assert_eq!(profile.start_rectangle(1), 2);
        assert_eq!(profile.end_rectangle(1), 4);
        assert_eq!(profile.height_rectangle(1), 2);
        assert_eq!(profile.height_rectangle(2), 5);
        assert_eq!(profile.height_rectangle(3), 3);
        assert_eq!(profile.height_rectangle(4), 0);
    }

    #[test]
    fn find_locates_the_containing_rectangle() {
        let mut solver = TestSolver::default();
        let tasks = vec![
            new_task(&mut solver, 0, 5, 7, 0),
            new_task(&mut solver, 4, 4, 8, 1),
        ];
        let heights = vec![solver.new_variable(2, 2), solver.new_variable(3, 3)];

        let mut profile = Profile::new(tasks.len());
        let context = PropagationContext::new(&solver.assignments);
        let _ = profile.build_profile(context, &tasks, &heights);

        assert_eq!(profile.find(-100), 0);
        assert_eq!(profile.find(2), 1);
        assert_eq!(profile.find(3), 1);
        assert_eq!(profile.find(4), 2);
        assert_eq!(profile.find(6), 3);
        assert_eq!(profile.height_rectangle(profile.find(100)), 0);
    }

    #[test]
    fn an_empty_profile_is_the_two_sentinels() {
        let mut solver = TestSolver::default();
        let tasks = vec![new_task(&mut solver, 0, 2, 10, 0)];
        let heights = vec![solver.new_variable(1, 1)];

        let mut profile = Profile::new(tasks.len());
        let context = PropagationContext::new(&solver.assignments);
        let max_height = profile.build_profile(context, &tasks, &heights);

        assert_eq!(max_height, 0);
        assert_eq!(profile.size(), 0);
        assert_eq!(profile.height_rectangle(profile.find(3)), 0);
    }
}
