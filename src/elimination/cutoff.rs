use log::{debug, trace, warn};

use crate::analysis::{AnalysisError, ResponseTimeAnalysis};
use crate::config::Config;
use crate::task::{ResponseTimes, TaskSet};
use crate::time::Service;

/// Find the lowest-priority task whose execution time cannot grow any
/// further, scanning from the tail of the priority order down to just
/// above `previous`.
///
/// A task is *tight* if raising its candidate execution time by the
/// current probe brings its response time within
/// `config.elimination_tolerance` of its bound (or past it), or if its
/// candidate already touches the execution-time cap. The first tight
/// task found is returned as the new cutoff, i.e., tasks `0..=cutoff`
/// no longer need to be optimized.
///
/// If no task is tight, the probe is grown by `config.eliminate_step`
/// and the scan retried. After `config.eliminate_max_iterations`
/// growths, the search gives up and returns `previous` unchanged.
pub fn find_cutoff<RTA>(
    analysis: &RTA,
    tasks: &TaskSet,
    candidate: &[Service],
    previous: Option<usize>,
    warm_start: Option<&ResponseTimes>,
    config: &Config,
) -> Result<Option<usize>, AnalysisError>
where
    RTA: ResponseTimeAnalysis + ?Sized,
{
    let first = previous.map_or(0, |p| p + 1);
    if first >= tasks.len() {
        return Ok(previous);
    }
    let tasks = tasks.with_execution_times(candidate);
    let mut probe = config.eliminate_tol;
    for _ in 0..config.eliminate_max_iterations {
        for i in (first..tasks.len()).rev() {
            if is_tight(analysis, &tasks, i, probe, warm_start, config)? {
                debug!("tasks 0..={} are tight at probe {}", i, probe);
                return Ok(Some(i));
            }
        }
        probe *= config.eliminate_step;
    }
    warn!(
        "no tight task found after {} probe growths; keeping cutoff {:?}",
        config.eliminate_max_iterations, previous
    );
    Ok(previous)
}

fn is_tight<RTA>(
    analysis: &RTA,
    tasks: &TaskSet,
    index: usize,
    probe: Service,
    warm_start: Option<&ResponseTimes>,
    config: &Config,
) -> Result<bool, AnalysisError>
where
    RTA: ResponseTimeAnalysis + ?Sized,
{
    let task = tasks[index];
    let at_cap = config
        .execution_time_cap(task.execution_time_org)
        .map_or(false, |cap| task.execution_time + config.elimination_tolerance > cap);
    if at_cap {
        trace!("task {} touches its execution-time cap", index);
        return Ok(true);
    }

    let mut probed = tasks.clone();
    probed[index].execution_time += probe;
    // the unperturbed response time never exceeds the perturbed one
    let begin = warm_start.map_or(probed[index].execution_time, |ws| ws[index]);
    let rt = analysis.response_time(&probed, begin, index)?;
    trace!("task {}: probed response time {} vs. bound {}", index, rt, task.response_time_bound());
    Ok(rt >= task.response_time_bound() - config.elimination_tolerance)
}
