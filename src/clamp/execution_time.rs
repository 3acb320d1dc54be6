use log::debug;

use super::{by_sensitivity, fine_rounding, ClampResult, RoundingMode, Seek};
use crate::analysis::ResponseTimeAnalysis;
use crate::config::Config;
use crate::schedulability;
use crate::task::{EliminationMask, ResponseTimes, TaskSet};
use crate::time::{Service, Time};

/// Round the execution times of the frozen tasks `0..=cutoff` to integers.
///
/// `execution_times` holds the continuous candidate values for all
/// tasks, `sensitivity` the derivative of the objective with respect
/// to each of them. In [RoundingMode::Fine], the result is schedulable
/// whenever the candidate is.
#[allow(clippy::too_many_arguments)]
pub fn clamp_execution_times<RTA>(
    analysis: &RTA,
    tasks: &TaskSet,
    execution_times: &[Service],
    cutoff: Option<usize>,
    warm_start: Option<&ResponseTimes>,
    sensitivity: &[f64],
    mode: RoundingMode,
    config: &Config,
) -> ClampResult
where
    RTA: ResponseTimeAnalysis + ?Sized,
{
    let mask = EliminationMask::from_cutoff(tasks.len(), cutoff);
    let caps: Vec<Option<Time>> = tasks
        .iter()
        .map(|t| config.execution_time_cap(t.execution_time_org))
        .collect();
    let capped: Vec<Service> = execution_times
        .iter()
        .zip(&caps)
        .map(|(c, cap)| cap.map_or(*c, |cap| c.min(cap)))
        .collect();

    match mode {
        RoundingMode::None => Ok(execution_times.to_vec()),
        RoundingMode::Rough => Ok(capped
            .iter()
            .enumerate()
            .map(|(i, c)| if mask.is_frozen(i) { c.floor() } else { *c })
            .collect()),
        RoundingMode::Fine => {
            let mut tasks = tasks.with_execution_times(&capped);
            let baseline = schedulability::response_times(analysis, &tasks, warm_start)?;
            let pending = by_sensitivity(
                mask.frozen_indices().filter(|i| capped[*i].fract() != 0.0),
                sensitivity,
            );
            debug!("fine clamping of execution times {:?}", pending);
            fine_rounding(
                analysis,
                &mut tasks,
                pending,
                &baseline,
                Seek::Largest,
                |ts, i| {
                    let c = ts[i].execution_time;
                    let upper = caps[i].map_or(c.ceil(), |cap| c.ceil().min(cap.floor()));
                    (c.floor() as i64, upper as i64)
                },
                |ts, i, value| ts[i].execution_time = value,
                |ts, i| ts[i].execution_time = ts[i].execution_time.floor(),
            )?;
            Ok(tasks.execution_times())
        }
    }
}
