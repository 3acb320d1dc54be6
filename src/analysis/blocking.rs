//! RTA for FP scheduling with bounded priority inversion

use super::{check_inputs, interference_fixed_point, saturated, AnalysisResult, ResponseTimeAnalysis};
use crate::task::TaskSet;
use crate::time::{Service, Time, UNSCHEDULABLE};

/// Fixed-priority RTA that accounts for priority inversion caused by
/// lower-priority tasks.
///
/// Each task's `overhead` is the longest stretch during which it
/// cannot be preempted once started (e.g., to commit or abort its
/// work). The blocking bound of the task under analysis is the largest
/// overhead of any lower-priority task, and it is charged once:
///
/// `R_(n+1) = B_i + C_i + Σ_{j<i} ceil(R_n / P_j) * C_j`
#[derive(Debug, Clone, Copy, Default)]
pub struct Blocking;

impl Blocking {
    pub fn new() -> Self {
        Blocking
    }

    /// The maximum priority inversion suffered by the task at `index`.
    pub fn blocking_bound(tasks: &TaskSet, index: usize) -> Service {
        tasks[index + 1..]
            .iter()
            .map(|t| t.overhead)
            .fold(0.0, Service::max)
    }
}

impl ResponseTimeAnalysis for Blocking {
    fn response_time(&self, tasks: &TaskSet, begin: Time, index: usize) -> AnalysisResult {
        check_inputs(tasks, begin, index)?;
        // considering the blocking bound to account for priority inversion
        let own_demand = Self::blocking_bound(tasks, index) + tasks[index].execution_time;
        if saturated(tasks, index, own_demand) {
            return Ok(UNSCHEDULABLE);
        }
        interference_fixed_point(index, own_demand, &tasks[..index], begin)
    }
}
