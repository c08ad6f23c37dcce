use crate::engine::propagation::PropagationContext;
use crate::engine::propagation::ReadDomains;
use crate::engine::variables::IntegerVariable;
use crate::propagators::SchedulingTask;

/// The kinds of sweep events; the discriminant order is the tie-breaking order of events
/// sharing a date.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum EventType {
    /// Start of a compulsory part.
    Scp,
    /// End of a compulsory part.
    Ecp,
    /// Conditional compulsory part: the task would obtain a compulsory part were it to start
    /// at its latest start time.
    Ccp,
    /// Profile-reduction event at the earliest start of a task whose start is not fixed.
    Pr,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Event {
    pub(crate) event_type: EventType,
    pub(crate) task_index: usize,
    pub(crate) date: i32,
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.date, self.event_type).cmp(&(other.date, other.event_type))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// An ordered series of sweep events, sorted by `(date, type)`. The series is rebuilt for
/// every profile construction and additionally supports in-place insertion and update while
/// keeping the order intact.
#[derive(Debug)]
pub(crate) struct EventPointSeries {
    events: Vec<Event>,
    time_index: usize,
}

impl EventPointSeries {
    pub(crate) fn new(nb_tasks: usize, nb_max_events_per_task: usize) -> Self {
        EventPointSeries {
            events: Vec::with_capacity(nb_tasks * nb_max_events_per_task),
            time_index: 0,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.time_index >= self.events.len()
    }

    pub(crate) fn size(&self) -> usize {
        self.events.len() - self.time_index
    }

    /// Emits the events of the mandatory tasks: the compulsory-part events, and optionally
    /// the profile-reduction and conditional-compulsory-part events.
    pub(crate) fn generate_events<Var: IntegerVariable>(
        &mut self,
        tasks: &[SchedulingTask<Var>],
        context: PropagationContext,
        generate_pr_events: bool,
        generate_ccp_events: bool,
        merge_scp_and_ccp_events: bool,
    ) {
        self.events.clear();
        self.time_index = 0;
        for (index, task) in tasks.iter().enumerate() {
            if !task.must_be_performed(context) {
                continue;
            }
            if generate_pr_events && !context.is_fixed(&task.start) {
                // start min can be filtered
                self.events.push(Event {
                    event_type: EventType::Pr,
                    task_index: index,
                    date: task.est(context),
                });
            }
            if merge_scp_and_ccp_events {
                self.events.push(Event {
                    event_type: EventType::Scp,
                    task_index: index,
                    date: task.lst(context),
                });
                if task.lst(context) < task.ect(context) {
                    self.events.push(Event {
                        event_type: EventType::Ecp,
                        task_index: index,
                        date: task.ect(context),
                    });
                }
            } else if task.lst(context) < task.ect(context) {
                // a compulsory part exists
                self.events.push(Event {
                    event_type: EventType::Scp,
                    task_index: index,
                    date: task.lst(context),
                });
                self.events.push(Event {
                    event_type: EventType::Ecp,
                    task_index: index,
                    date: task.ect(context),
                });
            } else if generate_ccp_events {
                self.events.push(Event {
                    event_type: EventType::Ccp,
                    task_index: index,
                    date: task.lst(context),
                });
            }
        }
        self.events.sort();
    }

    pub(crate) fn peek(&self) -> Event {
        self.events[self.time_index]
    }

    pub(crate) fn remove_event(&mut self) -> Event {
        let event = self.events[self.time_index];
        self.time_index += 1;
        event
    }

    pub(crate) fn swap(&mut self, index1: usize, index2: usize) {
        self.events.swap(index1, index2);
    }

    /// Inserts an event, bubbling it down from the tail to its ordered position.
    pub(crate) fn add_event(&mut self, event_type: EventType, task_index: usize, date: i32) {
        self.events.push(Event {
            event_type,
            task_index,
            date,
        });
        let mut pos = self.events.len() - 1;
        while pos > self.time_index && self.events[pos - 1] > self.events[pos] {
            self.swap(pos - 1, pos);
            pos -= 1;
        }
    }

    /// Updates the first pending event of the given type and task, restoring the order by
    /// bubbling the changed event towards the tail.
    pub(crate) fn update_event(
        &mut self,
        event_type: EventType,
        task_index: usize,
        update: impl FnOnce(&mut Event),
    ) {
        let mut pos = self.time_index;
        while pos < self.events.len()
            && (self.events[pos].event_type != event_type
                || self.events[pos].task_index != task_index)
        {
            pos += 1;
        }
        if pos < self.events.len() {
            update(&mut self.events[pos]);
            while pos + 1 < self.events.len() && self.events[pos] > self.events[pos + 1] {
                self.swap(pos, pos + 1);
                pos += 1;
            }
        }
    }

    /// Moves the compulsory-part events of the given task to its current bounds.
    pub(crate) fn update_compulsory_part_events<Var: IntegerVariable>(
        &mut self,
        task_index: usize,
        task: &SchedulingTask<Var>,
        context: PropagationContext,
    ) {
        if task.lst(context) < task.ect(context) {
            let lst = task.lst(context);
            self.update_event(EventType::Scp, task_index, |event| event.date = lst);
            let ect = task.ect(context);
            self.update_event(EventType::Ecp, task_index, |event| event.date = ect);
        }
    }

    /// The next distinct date after the pending event, or the pending date when the series
    /// ends with it.
    pub(crate) fn next_date(&self) -> i32 {
        let mut pos = self.time_index;
        let date = self.events[pos].date;
        while pos < self.events.len() && self.events[pos].date == date {
            pos += 1;
        }
        if pos < self.events.len() {
            self.events[pos].date
        } else {
            date
        }
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
    fn events_are_sorted_by_date_then_type() {
        let mut solver = TestSolver::default();
        // compulsory parts [2, 5) and [5, 8)
        let tasks = vec![
            new_task(&mut solver, 0, 5, 7, 0),
            new_task(&mut solver, 4, 4, 9, 1),
        ];

        let mut series = EventPointSeries::new(tasks.len(), 2);
        let context = PropagationContext::new(&solver.assignments);
        series.generate_events(&tasks, context, false, false, false);

        assert_eq!(series.size(), 4);
        let collected: Vec<_> = (0..4).map(|_| series.remove_event()).collect();
        assert_eq!(
            collected,
            vec![
                Event {
                    event_type: EventType::Scp,
                    task_index: 0,
                    date: 2
                },
                Event {
                    event_type: EventType::Scp,
                    task_index: 1,
                    date: 5
                },
                Event {
                    event_type: EventType::Ecp,
                    task_index: 0,
                    date: 5
                },
                Event {
                    event_type: EventType::Ecp,
                    task_index: 1,
                    date: 8
                },
            ]
        );
    }

    #[test]
    fn tasks_without_compulsory_part_emit_nothing() {
        let mut solver = TestSolver::default();
        let tasks = vec![new_task(&mut solver, 0, 2, 10, 0)];

        let mut series = EventPointSeries::new(tasks.len(), 2);
        let context = PropagationContext::new(&solver.assignments);
        series.generate_events(&tasks, context, false, false, false);

        assert!(series.is_empty());
    }

    #[test]
    fn conditional_events_mark_the_latest_start() {
        let mut solver = TestSolver::default();
        let tasks = vec![new_task(&mut solver, 0, 2, 10, 0)];

        let mut series = EventPointSeries::new(tasks.len(), 2);
        let context = PropagationContext::new(&solver.assignments);
        series.generate_events(&tasks, context, false, true, false);

        assert_eq!(series.size(), 1);
        let event = series.remove_event();
        assert_eq!(event.event_type, EventType::Ccp);
        assert_eq!(event.date, 8);
    }

    #[test]
    fn updated_events_keep_the_order() {
        let mut solver = TestSolver::default();
        let tasks = vec![
            new_task(&mut solver, 0, 5, 7, 0),
            new_task(&mut solver, 4, 4, 9, 1),
        ];

        let mut series = EventPointSeries::new(tasks.len(), 2);
        let context = PropagationContext::new(&solver.assignments);
        series.generate_events(&tasks, context, false, false, false);

        assert_eq!(series.next_date(), 5);

        // tightening the second task's start to 5 moves its compulsory part to [5, 9)
        let _ = solver
            .assignments
            .tighten_lower_bound(tasks[1].start, 5)
            .expect("the domain is not empty");
        let _ = solver
            .assignments
            .tighten_lower_bound(tasks[1].end, 9)
            .expect("the domain is not empty");
        let context = PropagationContext::new(&solver.assignments);
        series.update_compulsory_part_events(1, &tasks[1], context);

        let mut previous = series.remove_event();
        let mut last_date = previous.date;
        while !series.is_empty() {
            let next = series.remove_event();
            assert!(previous <= next);
            previous = next;
            last_date = next.date;
        }
        assert_eq!(last_date, 9);
    }

    #[test]
    fn added_events_keep_the_order() {
        let mut solver = TestSolver::default();
        let tasks = vec![
            new_task(&mut solver, 0, 5, 7, 0),
            new_task(&mut solver, 4, 4, 9, 1),
        ];

        let mut series = EventPointSeries::new(tasks.len(), 3);
        let context = PropagationContext::new(&solver.assignments);
        series.generate_events(&tasks, context, false, false, false);

        series.add_event(EventType::Pr, 1, 4);
        let mut previous = series.remove_event();
        while !series.is_empty() {
            let next = series.remove_event();
            assert!(previous <= next);
            previous = next;
        }
    }
}
