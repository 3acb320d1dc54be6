/*! Response-time analyses for fixed-priority (**FP**) scheduling

This module provides a central trait, [ResponseTimeAnalysis], which
abstracts over the concrete flavor of RTA. Everything downstream (the
schedulability test, the elimination heuristics, and the clamping
engine) is written against this trait only.

All analyses assume periodic tasks on a dedicated uniprocessor,
indexed in priority order. They are pure functions of the task-set
snapshot they are handed and can be called freely from numerical
differentiation routines.
*/

use auto_impl::auto_impl;
use thiserror::Error;

use crate::fixed_point::{self, SearchFailure};
use crate::task::{Task, TaskSet};
use crate::time::{Duration, Service, Time, UNSCHEDULABLE};

mod blocking;
mod fully_preemptive;

pub use blocking::Blocking;
pub use fully_preemptive::FullyPreemptive;

/// Fatal failures of an RTA. These indicate that a precondition was
/// broken (e.g., an optimizer let a variable escape its bounds), not
/// that the task set is unschedulable.
#[derive(Debug, Error, Copy, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("warm start {begin} for task {index} is negative")]
    NegativeBeginTime { index: usize, begin: Time },
    #[error("task {index} has a negative execution time ({execution_time})")]
    NegativeExecutionTime { index: usize, execution_time: Service },
    #[error("task {index} has a NaN execution time or warm start")]
    NotANumber { index: usize },
    #[error("response-time recurrence of task {index} does not settle: {source}")]
    NoConvergence {
        index: usize,
        #[source]
        source: SearchFailure,
    },
}

pub type AnalysisResult = Result<Duration, AnalysisError>;

/// The interface shared by all flavors of response-time analysis.
#[auto_impl(&, Box, Rc)]
pub trait ResponseTimeAnalysis {
    /// Bound the worst-case response time of the task at position
    /// `index` of `tasks`, seeding the fixed-point iteration with
    /// `begin`. Tasks `0..index` are the higher-priority interference.
    ///
    /// Returns [UNSCHEDULABLE] if the response time is unbounded.
    fn response_time(&self, tasks: &TaskSet, begin: Time, index: usize) -> AnalysisResult;

    /// Same as [ResponseTimeAnalysis::response_time], with the
    /// default seed: the sum of the execution times of the task and
    /// all higher-priority tasks.
    fn cold_response_time(&self, tasks: &TaskSet, index: usize) -> AnalysisResult {
        let begin = tasks[..=index].iter().map(|t| t.execution_time).sum();
        self.response_time(tasks, begin, index)
    }
}

/// Validate the inputs of an RTA for the task at `index`.
fn check_inputs(tasks: &TaskSet, begin: Time, index: usize) -> Result<(), AnalysisError> {
    if begin.is_nan() {
        return Err(AnalysisError::NotANumber { index });
    }
    if begin < 0.0 {
        return Err(AnalysisError::NegativeBeginTime { index, begin });
    }
    for (j, task) in tasks[..=index].iter().enumerate() {
        if task.execution_time.is_nan() {
            return Err(AnalysisError::NotANumber { index: j });
        }
        if task.execution_time < 0.0 {
            return Err(AnalysisError::NegativeExecutionTime {
                index: j,
                execution_time: task.execution_time,
            });
        }
    }
    Ok(())
}

/// Is the processor saturated by the tasks above `index`, so that a
/// task with `own_demand` can never complete?
fn saturated(tasks: &TaskSet, index: usize, own_demand: Service) -> bool {
    let u = tasks.utilization_above(index);
    u > 1.0 || (u >= 1.0 && own_demand > 0.0)
}

/// Solve `R = own_demand + Σ_{j in hp} ceil(R / P_j) * C_j`, starting
/// from `begin`. Shared by all analyses in this module.
fn interference_fixed_point(
    index: usize,
    own_demand: Service,
    higher_priority: &[Task],
    begin: Time,
) -> AnalysisResult {
    let rhs = |r: Time| {
        higher_priority
            .iter()
            .fold(own_demand, |acc, hp| acc + (r / hp.period).ceil() * hp.execution_time)
    };
    match fixed_point::search(begin, UNSCHEDULABLE, rhs) {
        Ok(r) => Ok(r),
        Err(SearchFailure::DivergenceLimitExceeded { .. }) => Ok(UNSCHEDULABLE),
        Err(source) => Err(AnalysisError::NoConvergence { index, source }),
    }
}
