use super::CompleteBinaryTree;
use crate::engine::propagation::PropagationContext;
use crate::engine::variables::IntegerVariable;
use crate::propagators::SchedulingTask;
use crate::propagators::HORIZON;

/// A theta-tree (Vilim): a complete binary tree over tasks ordered by earliest start time,
/// supporting O(log n) maintenance of the earliest completion time of the set of present
/// tasks.
///
/// Each node carries the `(est, proc)` pair of its task together with the cached sum of
/// processing times (`sigma_p`) and earliest completion time (`ect`) of its subtree,
/// restricted to present tasks.
#[derive(Debug)]
pub(crate) struct ThetaTree {
    tree: CompleteBinaryTree,
    present: Vec<bool>,
    est: Vec<i32>,
    proc: Vec<i32>,
    sigma_p: Vec<i32>,
    ect: Vec<i32>,
}

impl ThetaTree {
    pub(crate) fn new(max_size: usize) -> Self {
        ThetaTree {
            tree: CompleteBinaryTree::new(max_size),
            present: vec![false; max_size],
            est: vec![0; max_size],
            proc: vec![0; max_size],
            sigma_p: vec![0; max_size],
            ect: vec![-HORIZON; max_size],
        }
    }

    fn reset(&mut self) {
        for i in 0..self.present.len() {
            self.tree.reset_node(i);
            self.present[i] = false;
            self.est[i] = 0;
            self.proc[i] = 0;
            self.sigma_p[i] = 0;
            self.ect[i] = -HORIZON;
        }
        self.tree.ids.clear();
    }

    /// Loads the `(est, min duration)` of the given tasks into the tree, in order of
    /// increasing est; all tasks start out absent.
    pub(crate) fn init<Var: IntegerVariable>(
        &mut self,
        tasks: &[SchedulingTask<Var>],
        context: PropagationContext,
    ) {
        self.reset();

        self.tree.ids.extend(0..tasks.len());
        let est_of = |&id: &usize| tasks[id].est(context);
        self.tree.ids.sort_by_key(est_of);

        for k in 0..tasks.len() {
            let id = self.tree.ids[k];
            let i = self.tree.indexes[k];
            self.tree.pos[id] = i;
            self.tree.at[i] = id;
            self.est[i] = tasks[id].est(context);
            self.proc[i] = tasks[id].min_duration(context);
            self.sigma_p[i] = 0;
            self.ect[i] = -HORIZON;
            self.present[i] = false;
        }
    }

    fn update_at(&mut self, i: usize) {
        let p = if self.present[i] { self.proc[i] } else { 0 };
        let e = if self.present[i] { self.est[i] } else { -HORIZON };
        self.sigma_p[i] = p;
        let mut ect_left = -HORIZON;
        let mut ect_right = -HORIZON;
        let mut sigma_p_right = 0;
        if self.tree.has_left(i) {
            self.sigma_p[i] += self.sigma_p[self.tree.left(i)];
            ect_left = self.ect[self.tree.left(i)];
        }
        if self.tree.has_right(i) {
            self.sigma_p[i] += self.sigma_p[self.tree.right(i)];
            ect_right = self.ect[self.tree.right(i)];
            sigma_p_right = self.sigma_p[self.tree.right(i)];
        }
        self.ect[i] = (ect_left + p + sigma_p_right)
            .max(e + p + sigma_p_right)
            .max(ect_right);
    }

    fn update_up_to_root(&mut self, from: usize) {
        let mut i = from;
        while self.tree.has_above(i) && i != self.tree.root {
            self.update_at(i);
            i = self.tree.above(i);
        }
        self.update_at(i);
    }

    pub(crate) fn add(&mut self, id: usize) {
        let i = self.tree.pos[id];
        self.present[i] = true;
        self.update_up_to_root(i);
    }

    pub(crate) fn remove(&mut self, id: usize) {
        let i = self.tree.pos[id];
        self.present[i] = false;
        self.update_up_to_root(i);
    }

    pub(crate) fn is_present(&self, id: usize) -> bool {
        self.present[self.tree.pos[id]]
    }

    /// The earliest completion time of the present tasks without the given one; the tree is
    /// left unchanged.
    pub(crate) fn ect_without(&mut self, id: usize) -> i32 {
        if !self.is_present(id) {
            return self.ect();
        }
        self.remove(id);
        let ect = self.ect();
        self.add(id);
        ect
    }

    pub(crate) fn ect(&self) -> i32 {
        self.ect[self.tree.root]
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
    fn ect_of_a_growing_set() {
        let mut solver = TestSolver::default();
        let tasks = vec![
            new_task(&mut solver, 0, 5, 20, 0),
            new_task(&mut solver, 2, 3, 20, 1),
            new_task(&mut solver, 7, 2, 20, 2),
        ];

        let mut tree = ThetaTree::new(tasks.len());
        let context = PropagationContext::new(&solver.assignments);
        tree.init(&tasks, context);

        assert_eq!(tree.ect(), -HORIZON);

        tree.add(0);
        assert_eq!(tree.ect(), 5);

        tree.add(1);
        // {0, 1} packs 0..5 and 2..5 -> completes at 8
        assert_eq!(tree.ect(), 8);

        tree.add(2);
        assert_eq!(tree.ect(), 10);

        assert_eq!(tree.ect_without(2), 8);
        assert_eq!(tree.ect(), 10);

        tree.remove(0);
        assert_eq!(tree.ect(), 9);
    }

    #[test]
    fn ect_matches_the_strongest_subset() {
        let mut solver = TestSolver::default();
        let tasks = vec![
            new_task(&mut solver, 0, 3, 30, 0),
            new_task(&mut solver, 10, 4, 30, 1),
            new_task(&mut solver, 1, 2, 30, 2),
        ];

        let mut tree = ThetaTree::new(tasks.len());
        let context = PropagationContext::new(&solver.assignments);
        tree.init(&tasks, context);

        tree.add(0);
        tree.add(1);
        tree.add(2);

        // the subset {1} alone dominates: 10 + 4
        assert_eq!(tree.ect(), 14);
    }
}
