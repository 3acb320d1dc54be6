use super::{check_inputs, interference_fixed_point, saturated, AnalysisResult, ResponseTimeAnalysis};
use crate::task::TaskSet;
use crate::time::{Time, UNSCHEDULABLE};

/// The classic RTA for fully-preemptive fixed-priority scheduling of
/// periodic tasks (Joseph & Pandya; Audsley et al.):
///
/// `R_(n+1) = C_i + Σ_{j<i} ceil(R_n / P_j) * C_j`
///
/// If the utilization of the higher-priority tasks exceeds one, the
/// recurrence cannot converge and [UNSCHEDULABLE] is returned right
/// away. Negative execution times or warm starts are rejected with an
/// [AnalysisError][super::AnalysisError].
#[derive(Debug, Clone, Copy, Default)]
pub struct FullyPreemptive;

impl FullyPreemptive {
    pub fn new() -> Self {
        FullyPreemptive
    }
}

impl ResponseTimeAnalysis for FullyPreemptive {
    fn response_time(&self, tasks: &TaskSet, begin: Time, index: usize) -> AnalysisResult {
        check_inputs(tasks, begin, index)?;
        let own_demand = tasks[index].execution_time;
        if saturated(tasks, index, own_demand) {
            return Ok(UNSCHEDULABLE);
        }
        interference_fixed_point(index, own_demand, &tasks[..index], begin)
    }
}
