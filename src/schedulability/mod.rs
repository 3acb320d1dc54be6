/*! Whole-task-set schedulability tests

The tests apply a [ResponseTimeAnalysis] to every task in priority
order. The evaluation is sequential by construction: the check of a
lower-priority task assumes that all higher-priority tasks' parameters
are already fixed in the snapshot it is handed.
*/

use log::trace;

use crate::analysis::{AnalysisError, ResponseTimeAnalysis};
use crate::task::{ResponseTimes, TaskSet};
use crate::time::Time;

/// Pick the warm start for task `index`: the previous response time
/// when available, else the task's own execution time.
fn warm_start_for(tasks: &TaskSet, warm_start: Option<&ResponseTimes>, index: usize) -> Time {
    warm_start.map_or(tasks[index].execution_time, |ws| ws[index])
}

/// Check whether every task's response time is within
/// `min(deadline, period) - tolerance`.
///
/// A positive `tolerance` makes the check more strict. The test
/// short-circuits at the first task that misses its bound.
pub fn is_schedulable<RTA>(
    analysis: &RTA,
    tasks: &TaskSet,
    warm_start: Option<&ResponseTimes>,
    tolerance: Time,
) -> Result<bool, AnalysisError>
where
    RTA: ResponseTimeAnalysis + ?Sized,
{
    for (i, task) in tasks.iter().enumerate() {
        let rta = analysis.response_time(tasks, warm_start_for(tasks, warm_start, i), i)?;
        trace!(
            "response time for task {} is {} and its bound is {}",
            i,
            rta,
            task.response_time_bound()
        );
        if rta + tolerance > task.response_time_bound() {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Compute every task's response time, without judging the result.
pub fn response_times<RTA>(
    analysis: &RTA,
    tasks: &TaskSet,
    warm_start: Option<&ResponseTimes>,
) -> Result<ResponseTimes, AnalysisError>
where
    RTA: ResponseTimeAnalysis + ?Sized,
{
    (0..tasks.len())
        .map(|i| analysis.response_time(tasks, warm_start_for(tasks, warm_start, i), i))
        .collect::<Result<Vec<_>, _>>()
        .map(ResponseTimes::from)
}

/// Compute every task's response time and, if any task misses its
/// bound, mark the result as unschedulable by overwriting the first
/// slot with the sentinel.
///
/// Unlike [is_schedulable], this always evaluates every task, since
/// the vector itself is typically consumed downstream.
pub fn all_response_times<RTA>(
    analysis: &RTA,
    tasks: &TaskSet,
    warm_start: Option<&ResponseTimes>,
) -> Result<ResponseTimes, AnalysisError>
where
    RTA: ResponseTimeAnalysis + ?Sized,
{
    let mut rts = response_times(analysis, tasks, warm_start)?;
    if !meets_deadlines(tasks, &rts) {
        rts.mark_unschedulable();
    }
    Ok(rts)
}

/// Check precomputed response times against each task's bound.
pub fn meets_deadlines(tasks: &TaskSet, rts: &[Time]) -> bool {
    tasks
        .iter()
        .zip(rts)
        .all(|(task, r)| *r <= task.response_time_bound())
}
