//! End-to-end scenarios for the scheduling constraints, driven through the public API.

use kairos_solver::constraints;
use kairos_solver::results::SatisfactionResult;
use kairos_solver::Solver;

#[test]
fn disjunctive_two_tasks_with_no_placement_fails() {
    let mut solver = Solver::default();

    let start1 = solver.new_bounded_integer(0, 0);
    let duration1 = solver.new_bounded_integer(9, 9);
    let end1 = solver.new_bounded_integer(9, 9);
    let t1 = solver.new_task(start1, duration1, end1).expect("feasible task");

    let start2 = solver.new_bounded_integer(8, 8);
    let duration2 = solver.new_sparse_integer(&[0, 6]);
    let end2 = solver.new_bounded_integer(8, 14);
    let t2 = solver.new_task(start2, duration2, end2).expect("feasible task");

    let result = solver
        .add_constraint(constraints::disjunctive(vec![t1, t2]))
        .post();

    assert!(result.is_err());
}

#[test]
fn disjunctive_three_tasks_with_no_placement_fails() {
    let mut solver = Solver::default();

    let start1 = solver.new_bounded_integer(0, 0);
    let duration1 = solver.new_bounded_integer(9, 9);
    let end1 = solver.new_bounded_integer(9, 9);
    let t1 = solver.new_task(start1, duration1, end1).expect("feasible task");

    let start2 = solver.new_bounded_integer(8, 8);
    let duration2 = solver.new_sparse_integer(&[0, 6]);
    let end2 = solver.new_bounded_integer(8, 14);
    let t2 = solver.new_task(start2, duration2, end2).expect("feasible task");

    let start3 = solver.new_bounded_integer(9, 9);
    let duration3 = solver.new_bounded_integer(6, 6);
    let end3 = solver.new_bounded_integer(15, 15);
    let t3 = solver.new_task(start3, duration3, end3).expect("feasible task");

    let result = solver
        .add_constraint(constraints::disjunctive(vec![t1, t2, t3]))
        .post();

    assert!(result.is_err());
}

#[test]
fn cumulative_collapses_the_duration_of_a_task_which_cannot_run() {
    let mut solver = Solver::default();

    let start1 = solver.new_bounded_integer(9, 9);
    let duration1 = solver.new_bounded_integer(6, 6);
    let end1 = solver.new_bounded_integer(15, 15);
    let t1 = solver.new_task(start1, duration1, end1).expect("feasible task");

    let start2 = solver.new_bounded_integer(8, 8);
    let duration2 = solver.new_sparse_integer(&[0, 6]);
    let end2 = solver.new_bounded_integer(8, 14);
    let t2 = solver.new_task(start2, duration2, end2).expect("feasible task");

    let heights = vec![solver.new_bounded_integer(1, 1), solver.new_bounded_integer(1, 1)];
    let capacity = solver.new_bounded_integer(1, 1);

    solver
        .add_constraint(constraints::cumulative(vec![t1, t2], heights, capacity))
        .post()
        .expect("no conflict");

    assert_eq!(solver.upper_bound(&duration2), 0);
    assert_eq!(solver.lower_bound(&duration2), 0);
}

#[test]
fn every_cumulative_solution_respects_the_capacity() {
    let heights = [0, 1, 3, 5, 1, 4, 4, 3, 4, 3, 0];
    let capacity_max = 10;

    let mut solver = Solver::default();
    let starts: Vec<_> = (0..11).map(|_| solver.new_bounded_integer(0, 3)).collect();
    let tasks: Vec<_> = starts
        .iter()
        .map(|&start| solver.new_fixed_duration_task(start, 1))
        .collect();
    let height_variables: Vec<_> = heights
        .iter()
        .map(|&height| solver.new_bounded_integer(height, height))
        .collect();
    let capacity = solver.new_bounded_integer(capacity_max, capacity_max);

    solver
        .add_constraint(constraints::cumulative(tasks, height_variables, capacity))
        .post()
        .expect("no conflict");

    // the instance has millions of solutions; checking a large prefix keeps the test fast
    let enumeration_limit = 50_000;
    let mut checked = 0u64;
    let mut brancher = solver.default_brancher();
    let num_solutions = solver.enumerate_solutions(&mut brancher, |solution| {
        for time in 0..4 {
            let load: i32 = starts
                .iter()
                .enumerate()
                .filter(|&(_, &start)| solution.get_value(start) == time)
                .map(|(index, _)| heights[index])
                .sum();
            assert!(load <= capacity_max);
        }
        checked += 1;
        checked < enumeration_limit
    });

    assert!(num_solutions > 0);
}

#[test]
fn edge_finding_pushes_the_task_which_must_run_last() {
    let mut solver = Solver::default();

    let start_a = solver.new_bounded_integer(0, 2);
    let start_b = solver.new_bounded_integer(1, 3);
    let start_c = solver.new_bounded_integer(0, 7);
    let task_a = solver.new_fixed_duration_task(start_a, 3);
    let task_b = solver.new_fixed_duration_task(start_b, 3);
    let task_c = solver.new_fixed_duration_task(start_c, 3);

    solver
        .add_constraint(constraints::disjunctive(vec![task_a, task_b, task_c]))
        .post()
        .expect("no conflict");

    // {A, B} fills [0, 6), so C runs last
    assert_eq!(solver.lower_bound(&start_c), 6);
}

#[test]
fn edge_finding_fails_when_the_shared_window_is_too_small() {
    let mut solver = Solver::default();

    let start_a = solver.new_bounded_integer(0, 2);
    let start_b = solver.new_bounded_integer(1, 2);
    let start_c = solver.new_bounded_integer(0, 7);
    let task_a = solver.new_fixed_duration_task(start_a, 3);
    let task_b = solver.new_fixed_duration_task(start_b, 3);
    let task_c = solver.new_fixed_duration_task(start_c, 3);

    // A and B both have to finish by 5, which cannot accommodate 6 units of work
    let result = solver
        .add_constraint(constraints::disjunctive(vec![task_a, task_b, task_c]))
        .post();

    assert!(result.is_err());
}

#[test]
fn detectable_precedences_leave_a_consistent_pair_untouched() {
    let mut solver = Solver::default();

    let start_a = solver.new_bounded_integer(0, 2);
    let start_b = solver.new_bounded_integer(4, 7);
    let task_a = solver.new_fixed_duration_task(start_a, 3);
    let end_a = task_a.end;
    let task_b = solver.new_fixed_duration_task(start_b, 3);

    solver
        .add_constraint(constraints::disjunctive(vec![task_a, task_b]))
        .post()
        .expect("no conflict");

    assert_eq!(solver.lower_bound(&start_b), 4);
    assert!(solver.upper_bound(&end_a) <= 5);
}

#[test]
fn the_overload_check_fails_an_energy_dense_instance() {
    let mut solver = Solver::default();

    // five tasks of length 2 and height 2 in the window [0, 4] on a capacity of 4: the
    // energy 5 * 2 * 2 exceeds the area 4 * 4
    let tasks: Vec<_> = (0..5)
        .map(|_| {
            let start = solver.new_bounded_integer(0, 2);
            solver.new_fixed_duration_task(start, 2)
        })
        .collect();
    let heights: Vec<_> = (0..5).map(|_| solver.new_bounded_integer(2, 2)).collect();
    let capacity = solver.new_bounded_integer(4, 4);

    let result = solver
        .add_constraint(constraints::cumulative(tasks, heights, capacity))
        .post();

    assert!(result.is_err());
}

#[test]
fn cumulative_with_variable_durations_and_heights_has_eight_solutions() {
    let starts = [(1, 5), (2, 7), (3, 6), (1, 8)];
    let durations = [(4, 4), (6, 6), (3, 6), (2, 3)];
    let ends = [(1, 9), (1, 9), (1, 9), (1, 9)];
    let height_bounds = [(2, 6), (3, 3), (1, 2), (3, 4)];

    let mut solver = Solver::default();
    let tasks: Vec<_> = (0..4)
        .map(|i| {
            let start = solver.new_bounded_integer(starts[i].0, starts[i].1);
            let duration = solver.new_bounded_integer(durations[i].0, durations[i].1);
            let end = solver.new_bounded_integer(ends[i].0, ends[i].1);
            solver.new_task(start, duration, end).expect("feasible task")
        })
        .collect();
    let heights: Vec<_> = (0..4)
        .map(|i| solver.new_bounded_integer(height_bounds[i].0, height_bounds[i].1))
        .collect();
    let capacity = solver.new_bounded_integer(5, 5);

    solver
        .add_constraint(constraints::cumulative(tasks, heights, capacity))
        .post()
        .expect("no conflict");

    let mut brancher = solver.default_brancher();
    let num_solutions = solver.enumerate_solutions(&mut brancher, |_| true);

    assert_eq!(num_solutions, 8);
}

#[test]
fn an_optional_task_which_cannot_fit_is_dropped_from_the_schedule() {
    let mut solver = Solver::default();

    let start1 = solver.new_bounded_integer(0, 0);
    let duration1 = solver.new_bounded_integer(9, 9);
    let end1 = solver.new_bounded_integer(9, 9);
    let t1 = solver.new_task(start1, duration1, end1).expect("feasible task");

    let presence = solver.new_literal();
    let start2 = solver.new_bounded_integer(8, 8);
    let t2 = solver.new_optional_fixed_duration_task(start2, 6, presence);

    solver
        .add_constraint(constraints::disjunctive(vec![t1, t2]))
        .post()
        .expect("the conflict is absorbed by the presence");

    assert_eq!(solver.upper_bound(&presence), 0);

    let mut brancher = solver.default_brancher();
    assert!(matches!(
        solver.satisfy(&mut brancher),
        SatisfactionResult::Satisfiable(_)
    ));
}

#[test]
fn the_graph_variant_solves_the_same_instances() {
    let mut solver = Solver::default();

    let start1 = solver.new_bounded_integer(9, 9);
    let duration1 = solver.new_bounded_integer(6, 6);
    let end1 = solver.new_bounded_integer(15, 15);
    let t1 = solver.new_task(start1, duration1, end1).expect("feasible task");

    let start2 = solver.new_bounded_integer(8, 8);
    let duration2 = solver.new_sparse_integer(&[0, 6]);
    let end2 = solver.new_bounded_integer(8, 14);
    let t2 = solver.new_task(start2, duration2, end2).expect("feasible task");

    let heights = vec![solver.new_bounded_integer(1, 1), solver.new_bounded_integer(1, 1)];
    let capacity = solver.new_bounded_integer(2, 2);

    solver
        .add_constraint(constraints::cumulative_with_options(
            vec![t1, t2],
            heights,
            capacity,
            constraints::CumulativeOptions {
                variant: constraints::CumulativeVariant::Graph,
            },
        ))
        .post()
        .expect("no conflict");

    let mut brancher = solver.default_brancher();
    assert!(matches!(
        solver.satisfy(&mut brancher),
        SatisfactionResult::Satisfiable(_)
    ));
}
