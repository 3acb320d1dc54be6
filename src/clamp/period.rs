use log::debug;

use super::{by_sensitivity, fine_rounding, ClampResult, RoundingMode, Seek};
use crate::analysis::ResponseTimeAnalysis;
use crate::schedulability;
use crate::task::{EliminationMask, TaskSet};

/// Round the periods of the tasks frozen in `mask` to integers.
///
/// Assumes that `tasks` is schedulable with its current (continuous)
/// periods. [RoundingMode::Fine] looks for the smallest schedulable
/// integer period of each frozen task, visiting tasks by decreasing
/// `sensitivity`.
pub fn round_periods<RTA>(
    analysis: &RTA,
    tasks: &TaskSet,
    mask: &EliminationMask,
    sensitivity: &[f64],
    mode: RoundingMode,
) -> ClampResult
where
    RTA: ResponseTimeAnalysis + ?Sized,
{
    match mode {
        RoundingMode::None => Ok(tasks.periods()),
        RoundingMode::Rough => Ok(tasks
            .iter()
            .enumerate()
            .map(|(i, t)| if mask.is_frozen(i) { t.period.ceil() } else { t.period })
            .collect()),
        RoundingMode::Fine => {
            let pending = by_sensitivity(
                mask.frozen_indices().filter(|i| tasks[*i].period.fract() != 0.0),
                sensitivity,
            );
            if pending.is_empty() {
                return Ok(tasks.periods());
            }
            debug!("fine rounding of periods {:?}", pending);
            let mut tasks = tasks.clone();
            let baseline = schedulability::response_times(analysis, &tasks, None)?;
            fine_rounding(
                analysis,
                &mut tasks,
                pending,
                &baseline,
                Seek::Smallest,
                |ts, i| (baseline[i].ceil() as i64, ts[i].period.ceil() as i64),
                |ts, i, value| ts[i].period = value,
                |ts, i| ts[i].period = ts[i].period.ceil(),
            )?;
            Ok(tasks.periods())
        }
    }
}
