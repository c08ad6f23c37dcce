use super::CompleteBinaryTree;
use crate::basic_types::Inconsistency;
use crate::containers::IntQueueSet;
use crate::engine::propagation::PropagationContext;
use crate::engine::propagation::PropagationContextMut;
use crate::engine::variables::IntegerVariable;
use crate::propagators::SchedulingTask;
use crate::propagators::HORIZON;

const INF: i32 = HORIZON;

/// Implementation of a tree used for searching ascendant sets of an element, as described
/// in: Carlier, J., Pinson, E.: Adjustment of heads and tails for the job-shop problem.
/// European Journal of Operational Research, Volume 78, pp. 146-161 (1994).
///
/// Tasks fill the tree in order of decreasing latest completion time (the rightmost leaf
/// has the smallest lct). Each node carries the partial sums `sigma` and `tau` of remaining
/// processing time and the upper envelope `ksi` used to locate the tightest ascendant set.
#[derive(Debug)]
pub(crate) struct AscendantSetSearchTree {
    tree: CompleteBinaryTree,
    est: Vec<i32>,
    p: Vec<i32>,
    lct: Vec<i32>,

    /// The processing time of each node's task that has not yet been consumed by the sweep.
    p_plus: Vec<i32>,
    sigma: Vec<i32>,
    tau: Vec<i32>,
    ksi: Vec<i32>,
    /// Per task: the id of its super-critical task once found, `-INF` otherwise.
    sc: Vec<i32>,

    queue: IntQueueSet,
    epsilon: i32,
    current: Option<usize>,
    ub: i32,

    /// Tasks whose est lies beyond the current time, sorted by decreasing est.
    set_u: Vec<usize>,
    /// Tasks available at the current time.
    set_a: Vec<usize>,
    /// Tasks with remaining processing time, sorted by lct.
    set_s: Vec<usize>,
    /// Tasks whose super-critical task is known.
    set_d: Vec<usize>,
}

impl AscendantSetSearchTree {
    pub(crate) fn new(max_size: usize) -> Self {
        let mut tree = AscendantSetSearchTree {
            tree: CompleteBinaryTree::new(max_size),
            est: vec![0; max_size],
            p: vec![0; max_size],
            lct: vec![0; max_size],
            p_plus: vec![0; max_size],
            sigma: vec![0; max_size],
            tau: vec![0; max_size],
            ksi: vec![-INF; max_size],
            sc: vec![-INF; max_size],
            queue: IntQueueSet::new(max_size),
            epsilon: 0,
            current: None,
            ub: -INF,
            set_u: Vec::with_capacity(max_size),
            set_a: Vec::with_capacity(max_size),
            set_s: Vec::with_capacity(max_size),
            set_d: Vec::with_capacity(max_size),
        };
        tree.reset();
        tree
    }

    fn reset(&mut self) {
        for i in 0..self.est.len() {
            self.tree.reset_node(i);
            self.est[i] = 0;
            self.p[i] = 0;
            self.lct[i] = 0;
            self.p_plus[i] = 0;
            self.sigma[i] = 0;
            self.tau[i] = 0;
            self.ksi[i] = -INF;
            self.sc[i] = -INF;
        }
        self.tree.ids.clear();
        self.queue.clear();
    }

    fn initialize<Var: IntegerVariable>(
        &mut self,
        tasks: &[SchedulingTask<Var>],
        context: PropagationContext,
    ) {
        self.queue.clear();
        self.tree.ids.clear();
        self.tree.ids.extend(0..tasks.len());
        // sort by decreasing lct
        self.tree
            .ids
            .sort_by_key(|&id| std::cmp::Reverse(tasks[id].lct(context)));

        self.tree.root = self.est.len();
        self.ub = -INF;
        for k in 0..tasks.len() {
            let id = self.tree.ids[k];
            let i = self.tree.indexes[k];
            self.tree.at[i] = id;
            self.tree.pos[id] = i;
            if self.tree.root > i {
                // root of the tree is the smallest index used to fill the tree
                self.tree.root = i;
            }
            self.est[i] = tasks[id].est(context);
            self.p[i] = tasks[id].min_duration(context);
            self.lct[i] = tasks[id].lct(context);
            if self.ub < self.lct[i] {
                self.ub = self.lct[i];
            }
            self.p_plus[i] = self.p[i];
            self.sigma[i] = 0;
            self.tau[i] = 0;
            self.ksi[i] = -INF;
            self.sc[i] = -INF;
            if self.tree.is_leaf(i) {
                self.queue.add(i);
            }
        }
        self.ub += 1;
        // reset the rest of the tree
        for k in tasks.len()..self.tree.indexes.len() {
            let i = self.tree.indexes[k];
            self.tree.at[i] = CompleteBinaryTree::EMPTY;
            self.est[i] = -INF;
            self.p[i] = -1;
            self.lct[i] = INF;
            self.p_plus[i] = self.p[i];
            self.sigma[i] = 0;
            self.tau[i] = 0;
            self.ksi[i] = -INF;
            self.sc[i] = -INF;
        }
        self.epsilon = 0;
        self.current = None;
        while let Some(i) = self.queue.remove() {
            // partial sums take a different form while the tree is being built bottom-up
            self.sigma[i] = self.p[i]
                + if self.tree.has_right(i) {
                    self.tau[self.tree.right(i)]
                } else {
                    0
                };
            self.tau[i] = self.p[i]
                + if self.tree.has_left(i) {
                    self.tau[self.tree.left(i)]
                } else {
                    0
                }
                + if self.tree.has_right(i) {
                    self.tau[self.tree.right(i)]
                } else {
                    0
                };
            self.update_at(i);
            if i != self.tree.root && self.tree.has_above(i) {
                self.queue.add(self.tree.above(i));
            }
        }
    }

    fn update_at(&mut self, i: usize) {
        let ksi_left = if self.tree.has_left(i) {
            self.ksi[self.tree.left(i)]
        } else {
            -INF
        };
        let ksi_right = if self.tree.has_right(i) {
            self.ksi[self.tree.right(i)]
        } else {
            -INF
        };
        if let Some(current) = self.current {
            if current == i
                || self.lct[i] > self.lct[current]
                || (self.lct[i] == self.lct[current] && self.tree.is_in_right_subtree(i, current))
            {
                self.sigma[i] += self.epsilon;
            }
        }
        if self.p_plus[i] == 0 {
            self.ksi[i] = (ksi_left + self.sigma[i]).max(ksi_right);
        } else {
            self.ksi[i] = (ksi_left + self.sigma[i])
                .max(self.ub - self.lct[i] + self.sigma[i])
                .max(ksi_right);
        }
    }

    fn update_up_to_root(&mut self, from: usize) {
        let mut i = from;
        while self.tree.has_above(i) && i != self.tree.root {
            self.update_at(i);
            i = self.tree.above(i);
        }
        self.update_at(i);
    }

    /// Re-derives the ancestor caches after injecting `epsilon` at the given leaf node.
    fn update(&mut self, k: usize, epsilon: i32) {
        self.current = Some(k);
        self.epsilon = epsilon;
        self.update_up_to_root(k);
        self.current = None;
        self.epsilon = 0;
    }

    /// Locates the tightest super-critical task for task `c`; returns its id, or `INF` when
    /// there is none. Temporarily retracts `c`'s remaining processing time from the tree.
    fn find_sc(&mut self, c: usize) -> i32 {
        if self.sc[c] != -INF {
            return self.sc[c];
        }
        let i = self.tree.pos[c];
        self.update(i, -self.p_plus[i]);
        let mut sc = INF;
        let mut delta = self.ub - (self.est[i] + self.p[i]);
        let mut k = self.tree.root;
        while sc == INF && self.ksi[k] > delta {
            let ksi_left = if self.tree.has_left(k) {
                self.ksi[self.tree.left(k)]
            } else {
                -INF
            };
            if ksi_left + self.sigma[k] > delta {
                delta -= self.sigma[k];
                k = self.tree.left(k);
            } else if self.ub - self.lct[k] + self.sigma[k] > delta && self.p_plus[k] != 0 {
                sc = k as i32;
            } else if self.tree.has_right(k) {
                k = self.tree.right(k);
            } else {
                break;
            }
        }
        self.update(i, self.p_plus[i]);
        if sc != INF {
            self.tree.at[sc as usize] as i32
        } else {
            sc
        }
    }

    fn adjust_init<Var: IntegerVariable>(
        &mut self,
        tasks: &[SchedulingTask<Var>],
        context: PropagationContext,
    ) -> i32 {
        self.set_u.clear();
        self.set_a.clear();
        self.set_s.clear();
        self.set_d.clear();
        let mut t = INF;
        for (i, task) in tasks.iter().enumerate() {
            let est = task.est(context);
            if est < t {
                t = est;
                let available = std::mem::take(&mut self.set_a);
                self.set_u.extend(available);
                self.set_a.push(i);
            } else if est == t {
                self.set_a.push(i);
            } else {
                self.set_u.push(i);
            }
            self.set_s.push(i);
        }
        t
    }

    /// The Carlier-Pinson head adjustment: sweeps time forward, consuming the remaining
    /// processing time of the available task with the smallest lct, and pushes the earliest
    /// start of every task whose super-critical task completes. Returns whether a bound was
    /// filtered; applying it on mirror tasks yields the symmetric tail adjustment.
    pub(crate) fn adjust<Var: IntegerVariable>(
        &mut self,
        context: &mut PropagationContextMut,
        tasks: &[SchedulingTask<Var>],
    ) -> Result<bool, Inconsistency> {
        let mut has_filtered = false;
        self.initialize(tasks, context.as_readonly());
        let mut t = self.adjust_init(tasks, context.as_readonly());

        // set_u holds the elements j such that est[j] > t (the others are in set_a or
        // set_d); removing from the back of a Vec is cheaper than from the front.
        {
            let read = context.as_readonly();
            self.set_u
                .sort_by_key(|&i| std::cmp::Reverse(tasks[i].est(read)));
            self.set_s.sort_by_key(|&i| tasks[i].lct(read));
        }

        while !self.set_s.is_empty() {
            let available = self.set_a.clone();
            for c in available {
                if self.est[self.tree.pos[c]] == t {
                    let sc = self.find_sc(c);
                    if sc != INF {
                        self.sc[c] = sc;
                        self.set_a.retain(|&x| x != c);
                        self.set_d.push(c);
                    }
                }
            }

            if t >= self.ub {
                // Might happen for infeasible schedules
                return Err(Inconsistency::Conflict);
            }

            // i is the element in set_a with minimum lct
            let i = self
                .set_a
                .iter()
                .copied()
                .min_by_key(|&x| self.lct[self.tree.pos[x]]);
            // t_prime is the smallest est[j] for j in set_u
            let t_prime = match self.set_u.last() {
                Some(&j) => tasks[j].est(context.as_readonly()),
                None => INF,
            };
            let epsilon = match i {
                Some(i) => self.p_plus[self.tree.pos[i]].min(t_prime - t),
                None => t_prime - t,
            };
            t += epsilon;
            if let Some(i) = i {
                let pos = self.tree.pos[i];
                self.p_plus[pos] -= epsilon;
                self.update(pos, -epsilon);
                if self.p_plus[pos] == 0 {
                    self.set_s.retain(|&x| x != i);
                    self.set_a.retain(|&x| x != i);
                }
            }

            // nu is the task with smallest lct whose processing time remains
            if self.set_s.is_empty() {
                return Ok(has_filtered);
            }
            let nu = self.set_s[0];

            // move the tasks whose super-critical task became stale back to set_a, pushing
            // their earliest start to the current time
            let known = self.set_d.clone();
            for j in known {
                let sj = self.find_sc(j);
                let stale = (sj >= 0 && self.p_plus[self.tree.pos[sj as usize]] == 0)
                    || tasks[nu].lct(context.as_readonly())
                        > tasks[self.sc[j] as usize].lct(context.as_readonly());
                if stale {
                    self.set_d.retain(|&x| x != j);
                    self.set_a.push(j);
                    self.sc[j] = -INF;
                    has_filtered |= tasks[j].update_est(context, t)?;
                }
            }

            if self.set_a.is_empty() && !self.set_u.is_empty() {
                t = tasks[*self.set_u.last().unwrap()].est(context.as_readonly());
            }
            // make available every j in set_u such that est[j] == t
            while let Some(&j) = self.set_u.last() {
                if tasks[j].est(context.as_readonly()) != t {
                    break;
                }
                self.set_a.push(j);
                let _ = self.set_u.pop();
            }
        }
        Ok(has_filtered)
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
    fn edge_finding_pushes_the_dominated_task() {
        let mut solver = TestSolver::default();
        let tasks = vec![
            new_task(&mut solver, 0, 3, 5, 0),
            new_task(&mut solver, 1, 3, 6, 1),
            new_task(&mut solver, 0, 3, 10, 2),
        ];
        let start_b = tasks[1].start;
        let start_c = tasks[2].start;

        let mut tree = AscendantSetSearchTree::new(tasks.len());
        let mut context =
            PropagationContextMut::new(&mut solver.trailed_values, &mut solver.assignments);

        let has_filtered = tree.adjust(&mut context, &tasks).expect("no conflict");

        // {A, B} fills [0, 6); C must come after both
        assert!(has_filtered);
        assert_eq!(solver.assignments.get_lower_bound(start_b), 3);
        assert_eq!(solver.assignments.get_lower_bound(start_c), 6);
    }

    #[test]
    fn an_overloaded_instance_fails() {
        let mut solver = TestSolver::default();
        let tasks = vec![
            new_task(&mut solver, 0, 3, 5, 0),
            new_task(&mut solver, 0, 3, 5, 1),
            new_task(&mut solver, 0, 3, 5, 2),
        ];

        let mut tree = AscendantSetSearchTree::new(tasks.len());
        let mut context =
            PropagationContextMut::new(&mut solver.trailed_values, &mut solver.assignments);

        assert!(tree.adjust(&mut context, &tasks).is_err());
    }
}
