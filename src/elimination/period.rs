use log::{debug, trace};

use crate::analysis::{AnalysisError, ResponseTimeAnalysis};
use crate::config::Config;
use crate::schedulability::{meets_deadlines, response_times};
use crate::task::{EliminationMask, TaskSet};

/// Freeze in `mask` every task whose period cannot shrink without
/// breaking schedulability.
///
/// Each task's period is lowered in turn by a probe `disturb`
/// (starting at `config.disturb_init`) and the whole task set is
/// re-analyzed, warm-started from the unperturbed response times. If a
/// full pass freezes nothing new, the probe is grown by
/// `config.disturb_step` and the pass repeated, until the probe
/// exceeds `config.disturb_max`.
///
/// Returns whether any task was newly frozen.
pub fn find_eliminated_periods<RTA>(
    analysis: &RTA,
    tasks: &TaskSet,
    mask: &mut EliminationMask,
    config: &Config,
) -> Result<bool, AnalysisError>
where
    RTA: ResponseTimeAnalysis + ?Sized,
{
    let baseline = response_times(analysis, tasks, None)?;
    let mut probed = tasks.clone();
    let mut disturb = config.disturb_init;
    let mut newly_frozen = false;
    while !newly_frozen && disturb <= config.disturb_max {
        for i in 0..tasks.len() {
            let shrunk = tasks[i].period - disturb;
            // R_i >= C_i, so a period below the execution time is hopeless
            let pinned = if shrunk <= 0.0 || shrunk < tasks[i].execution_time {
                true
            } else {
                probed[i].period = shrunk;
                let rts = response_times(analysis, &probed, Some(&baseline))?;
                let missed = !meets_deadlines(&probed, &rts);
                probed[i].period = tasks[i].period;
                missed
            };
            if pinned && mask.freeze(i) {
                trace!("period of task {} frozen at probe {}", i, disturb);
                newly_frozen = true;
            }
        }
        if !newly_frozen {
            disturb *= config.disturb_step;
        }
    }
    debug!("period elimination mask: {:?}", mask);
    Ok(newly_frozen)
}

