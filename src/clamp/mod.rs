/*! Rounding continuous optimizer output to schedulable integers

The optimizer works on continuous execution times and periods, but the
final configuration must be integral. Naive rounding can push a task
just over its deadline, so the [RoundingMode::Fine] mode performs a
priority-ordered binary search per variable that keeps the task set
schedulable by construction:

- execution times are rounded to the *largest* schedulable integer in
  `[floor(C), ceil(C)]` (capped by the execution-time limit), and
- periods are rounded to the *smallest* schedulable integer in
  `[ceil(R), ceil(P)]`, where `R` is the task's current response time.

Variables are visited in order of decreasing cost sensitivity, so that
the variables that are most expensive to round conservatively get the
first claim on the schedulable slack.
*/

use itertools::Itertools;
use log::{trace, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analysis::{AnalysisError, ResponseTimeAnalysis};
use crate::schedulability;
use crate::task::{ResponseTimes, TaskSet};
use crate::time::Time;

mod execution_time;
mod period;

pub use execution_time::clamp_execution_times;
pub use period::round_periods;

/// How to round continuous results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundingMode {
    /// Leave values untouched.
    None,
    /// Round every frozen value in the direction that cannot hurt
    /// schedulability, without re-checking.
    Rough,
    /// Round frozen values via a schedulability-preserving binary search.
    Fine,
}

/// Fatal failures of the clamping engine.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum ClampError {
    /// The search interval of a variable is empty, which means the
    /// input was not schedulable to begin with.
    #[error("empty search interval [{left}, {right}] for task {index}")]
    InvalidInterval { index: usize, left: Time, right: Time },
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

pub type ClampResult = Result<Vec<Time>, ClampError>;

/// Order the candidate indices by decreasing absolute cost sensitivity.
fn by_sensitivity(candidates: impl Iterator<Item = usize>, sensitivity: &[f64]) -> Vec<usize> {
    candidates
        .sorted_by(|a, b| sensitivity[*b].abs().total_cmp(&sensitivity[*a].abs()))
        .collect()
}

/// The direction in which a binary search moves towards feasibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Seek {
    /// Find the largest feasible value (feasibility is downward closed).
    Largest,
    /// Find the smallest feasible value (feasibility is upward closed).
    Smallest,
}

/// Binary-search the integer interval `[left, right]` for the extreme
/// feasible value according to `seek`, given a feasibility predicate.
///
/// The predicate is consulted only for interior probes: the end of
/// the interval opposite to the sought extreme is assumed feasible.
fn binary_search<F>(
    index: usize,
    mut left: i64,
    mut right: i64,
    seek: Seek,
    mut feasible: F,
) -> Result<i64, ClampError>
where
    F: FnMut(i64) -> Result<bool, AnalysisError>,
{
    if left > right {
        return Err(ClampError::InvalidInterval {
            index,
            left: left as Time,
            right: right as Time,
        });
    }
    while left < right {
        match seek {
            Seek::Smallest => {
                let mid = left + (right - left) / 2;
                if feasible(mid)? {
                    right = mid;
                } else {
                    left = mid + 1;
                }
            }
            Seek::Largest => {
                // round the midpoint up so that the interval always shrinks
                let mid = left + (right - left + 1) / 2;
                if feasible(mid)? {
                    left = mid;
                } else {
                    right = mid - 1;
                }
            }
        }
        trace!("task {}: search interval narrowed to [{}, {}]", index, left, right);
    }
    Ok(left)
}

/// Shared driver of the fine rounding mode.
///
/// Processes the `pending` indices in sensitivity order. For each, it
/// searches the integer interval returned by `interval`, writing probes
/// into the task set via `assign`. Once a variable is fixed, pending
/// higher-priority entries lose their claim to a search, since their
/// slack is now constrained by the fixed choice; they (and anything
/// left over when the iteration cap hits) are rounded via
/// `conservative`, which must never hurt schedulability.
#[allow(clippy::too_many_arguments)]
fn fine_rounding<RTA, I, A, C>(
    analysis: &RTA,
    tasks: &mut TaskSet,
    pending: Vec<usize>,
    baseline: &ResponseTimes,
    seek: Seek,
    interval: I,
    assign: A,
    conservative: C,
) -> Result<(), ClampError>
where
    RTA: ResponseTimeAnalysis + ?Sized,
    I: Fn(&TaskSet, usize) -> (i64, i64),
    A: Fn(&mut TaskSet, usize, Time),
    C: Fn(&mut TaskSet, usize),
{
    let n = tasks.len();
    let mut pending = pending;
    let mut iterations = 0;
    while let Some(&current) = pending.first() {
        if iterations >= n {
            warn!(
                "clamping stopped after {} iterations; rounding {} remaining values conservatively",
                iterations,
                pending.len()
            );
            break;
        }
        iterations += 1;

        let (left, right) = interval(tasks, current);
        let before = tasks[current];
        let fixed = binary_search(current, left, right, seek, |mid| {
            assign(tasks, current, mid as Time);
            let ok = schedulability::is_schedulable(analysis, tasks, Some(baseline), 0.0)?;
            if !ok {
                // revert the tentative value
                tasks[current] = before;
            }
            Ok(ok)
        })?;
        assign(tasks, current, fixed as Time);
        trace!("task {} rounded to {}", current, fixed);

        let (dropped, kept): (Vec<usize>, Vec<usize>) =
            pending.into_iter().filter(|&i| i != current).partition(|&i| i < current);
        for i in dropped {
            conservative(tasks, i);
        }
        pending = kept;
    }
    for i in pending {
        conservative(tasks, i);
    }
    Ok(())
}
