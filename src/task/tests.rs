use assert_approx_eq::assert_approx_eq;

use crate::task::{EliminationMask, ResponseTimes, Task, TaskSet};
use crate::tests::{reference_task_set, ts};
use crate::time::UNSCHEDULABLE;

#[test]
fn utilization() {
    let tasks = ts(&[(50, 12), (100, 40), (1000, 200)]);
    assert_approx_eq!(tasks.utilization(), 0.84);
    assert_approx_eq!(tasks.utilization_above(0), 0.0);
    assert_approx_eq!(tasks.utilization_above(2), 0.64);
}

#[test]
fn response_time_bound_is_min_of_deadline_and_period() {
    let t = Task::new(100.0, 80.0, 10.0);
    assert_eq!(t.response_time_bound(), 80.0);
    let t = Task::new(100.0, 120.0, 10.0);
    assert_eq!(t.response_time_bound(), 100.0);
}

#[test]
fn substitution_leaves_original_untouched() {
    let tasks = reference_task_set();
    let modified = tasks.with_execution_times(&[1.0, 2.0, 3.0]);
    assert_eq!(modified.execution_times(), vec![1.0, 2.0, 3.0]);
    assert_eq!(tasks.execution_times(), vec![12.0, 193.0, 17.0]);
    // the original values are carried along
    assert_eq!(modified[1].execution_time_org, 193.0);

    let modified = tasks.with_periods(&[60.0, 310.0, 510.0]);
    assert_eq!(modified.periods(), vec![60.0, 310.0, 510.0]);
    assert_eq!(modified[1].period_org, 300.0);
}

#[test]
fn collect_task_set() {
    let tasks: TaskSet = (1..=3)
        .map(|i| Task::implicit(10.0 * i as f64, i as f64).with_overhead(0.5))
        .collect();
    assert_eq!(tasks.len(), 3);
    assert_eq!(tasks[2].period, 30.0);
    assert_eq!(tasks[2].overhead, 0.5);
}

#[test]
fn mask_grows_monotonically() {
    let mut mask = EliminationMask::new(4);
    assert!(mask.any_free());
    assert!(mask.freeze(2));
    assert!(!mask.freeze(2));
    assert!(mask.is_frozen(2));
    assert_eq!(mask.free_indices().collect::<Vec<_>>(), vec![0, 1, 3]);
    assert_eq!(mask.frozen_indices().collect::<Vec<_>>(), vec![2]);
}

#[test]
fn mask_from_cutoff() {
    let mask = EliminationMask::from_cutoff(4, Some(1));
    assert_eq!(*mask, vec![true, true, false, false]);
    let mask = EliminationMask::from_cutoff(4, None);
    assert_eq!(*mask, vec![false; 4]);
    let mask = EliminationMask::from_cutoff(2, Some(1));
    assert!(!mask.any_free());
}

#[test]
fn response_time_marker() {
    let mut rts = ResponseTimes::from(vec![12.0, 265.0, 282.0]);
    assert!(!rts.is_unschedulable());
    rts.mark_unschedulable();
    assert!(rts.is_unschedulable());
    assert_eq!(rts[0], UNSCHEDULABLE);
    assert_eq!(rts[2], 282.0);
}
