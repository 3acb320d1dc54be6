use crate::analysis::FullyPreemptive;
use crate::config::Config;
use crate::elimination::{find_cutoff, find_eliminated_periods};
use crate::task::{EliminationMask, ResponseTimes, Task, TaskSet};
use crate::tests::{reference_task_set, ts};

#[test]
fn cutoff_grows_probe_until_tail_is_tight() {
    let tasks = reference_task_set();
    let rta = FullyPreemptive::new();
    let config = Config::default();
    let candidate = tasks.execution_times();
    // probes 1, 2, ..., 16 leave every task slack; at 32, task 2 reaches 519 > 500
    assert_eq!(find_cutoff(&rta, &tasks, &candidate, None, None, &config), Ok(Some(2)));

    let warm = ResponseTimes::from(vec![12.0, 265.0, 282.0]);
    assert_eq!(
        find_cutoff(&rta, &tasks, &candidate, None, Some(&warm), &config),
        Ok(Some(2))
    );
}

#[test]
fn cutoff_returns_highest_tight_index() {
    let rta = FullyPreemptive::new();
    let config = Config::default();

    // task 1 finishes at 266 once its execution time grows by one
    let tasks: TaskSet = vec![
        Task::implicit(50.0, 12.0),
        Task::new(300.0, 266.0, 193.0),
        Task::implicit(500.0, 17.0),
    ]
    .into();
    let candidate = tasks.execution_times();
    assert_eq!(find_cutoff(&rta, &tasks, &candidate, None, None, &config), Ok(Some(1)));

    // now task 2 is tight as well, and wins
    let mut tasks = tasks;
    tasks[2].deadline = 283.0;
    assert_eq!(find_cutoff(&rta, &tasks, &candidate, None, None, &config), Ok(Some(2)));
}

#[test]
fn cutoff_never_moves_backwards() {
    let tasks = reference_task_set();
    let rta = FullyPreemptive::new();
    let candidate = tasks.execution_times();
    let config = Config::default();
    assert_eq!(
        find_cutoff(&rta, &tasks, &candidate, Some(2), None, &config),
        Ok(Some(2))
    );
    assert_eq!(
        find_cutoff(&rta, &tasks, &candidate, Some(1), None, &config),
        Ok(Some(2))
    );

    // probes 1, 2, and 4 are too small to make task 2 tight
    let impatient = Config {
        eliminate_max_iterations: 3,
        ..Config::default()
    };
    assert_eq!(
        find_cutoff(&rta, &tasks, &candidate, Some(1), None, &impatient),
        Ok(Some(1))
    );
    assert_eq!(find_cutoff(&rta, &tasks, &candidate, None, None, &impatient), Ok(None));
}

#[test]
fn cutoff_at_execution_time_cap() {
    let tasks = reference_task_set();
    let rta = FullyPreemptive::new();
    let config = Config {
        eliminate_max_iterations: 1,
        ..Config::default()
    };
    // the cap of task 2 is 2 * 17
    let candidate = [12.0, 193.0, 34.0];
    assert_eq!(find_cutoff(&rta, &tasks, &candidate, None, None, &config), Ok(Some(2)));

    let uncapped = Config {
        enable_max_execution_time: false,
        ..config
    };
    assert_eq!(find_cutoff(&rta, &tasks, &candidate, None, None, &uncapped), Ok(None));
}

#[test]
fn tight_period_is_frozen_immediately() {
    // task 1 finishes exactly at its period
    let tasks = ts(&[(10, 2), (14, 10)]);
    let mut mask = EliminationMask::new(2);
    let newly = find_eliminated_periods(&FullyPreemptive::new(), &tasks, &mut mask, &Config::default());
    assert_eq!(newly, Ok(true));
    assert_eq!(mask, EliminationMask::from(vec![false, true]));
}

#[test]
fn period_probe_grows_until_something_is_frozen() {
    let tasks = ts(&[(10, 2), (50, 10)]);
    let rta = FullyPreemptive::new();
    let mut mask = EliminationMask::new(2);
    // at a probe of 8.192, task 0's period drops below its execution time
    assert_eq!(find_eliminated_periods(&rta, &tasks, &mut mask, &Config::default()), Ok(true));
    assert_eq!(mask, EliminationMask::from(vec![true, false]));

    let mut mask = EliminationMask::new(2);
    let config = Config {
        disturb_max: 0.01,
        ..Config::default()
    };
    assert_eq!(find_eliminated_periods(&rta, &tasks, &mut mask, &config), Ok(false));
    assert_eq!(mask, EliminationMask::new(2));
}

#[test]
fn frozen_periods_stay_frozen() {
    let tasks = ts(&[(10, 2), (14, 10)]);
    let rta = FullyPreemptive::new();
    let mut mask = EliminationMask::from(vec![false, true]);
    // task 1 is found again but does not count as new; task 0 breaks
    // task 1's deadline once its period drops below 7
    assert_eq!(find_eliminated_periods(&rta, &tasks, &mut mask, &Config::default()), Ok(true));
    assert_eq!(mask, EliminationMask::from(vec![true, true]));

    assert_eq!(find_eliminated_periods(&rta, &tasks, &mut mask, &Config::default()), Ok(false));
    assert_eq!(mask, EliminationMask::from(vec![true, true]));
}
