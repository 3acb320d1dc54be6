/*! The periodic task model.

A [TaskSet] is a dense sequence of [Task]s whose index order *is* the
fixed-priority order: index 0 is the highest-priority task. Task sets
are cheap to clone, and the analyses and heuristics in this crate clone
them freely whenever they need to evaluate a "what-if" scenario (perturb
one parameter, re-run the RTA, restore).
*/

use derive_more::{Deref, DerefMut, From, Into};
use serde::{Deserialize, Serialize};

use crate::time::{Duration, Service};

mod mask;
mod response;

pub use mask::EliminationMask;
pub use response::ResponseTimes;

/// A periodic task with a constrained (or implicit) deadline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// The separation between two consecutive job releases.
    pub period: Duration,
    /// The relative deadline of each job.
    pub deadline: Duration,
    /// The (possibly fractional) worst-case execution time.
    pub execution_time: Service,
    /// Task-specific overhead, which lower-priority tasks must account
    /// for as blocking in the [Blocking][crate::analysis::Blocking]
    /// analysis.
    #[serde(default)]
    pub overhead: Service,
    /// The period the task was created with.
    pub period_org: Duration,
    /// The execution time the task was created with.
    pub execution_time_org: Service,
}

impl Task {
    /// Create a task with the given period, deadline, and execution time.
    pub fn new(period: Duration, deadline: Duration, execution_time: Service) -> Self {
        Task {
            period,
            deadline,
            execution_time,
            overhead: 0.0,
            period_org: period,
            execution_time_org: execution_time,
        }
    }

    /// Create a task whose deadline equals its period.
    pub fn implicit(period: Duration, execution_time: Service) -> Self {
        Self::new(period, period, execution_time)
    }

    /// Attach a task-specific overhead.
    pub fn with_overhead(mut self, overhead: Service) -> Self {
        self.overhead = overhead;
        self
    }

    /// The latest admissible response time: `min(deadline, period)`.
    pub fn response_time_bound(&self) -> Duration {
        self.deadline.min(self.period)
    }

    /// The fraction of the processor consumed by this task.
    pub fn utilization(&self) -> f64 {
        self.execution_time / self.period
    }
}

/// An ordered collection of tasks, highest priority first.
#[derive(Debug, Clone, Default, PartialEq, Deref, DerefMut, From, Into, Serialize, Deserialize)]
pub struct TaskSet(Vec<Task>);

impl TaskSet {
    pub fn new(tasks: Vec<Task>) -> Self {
        TaskSet(tasks)
    }

    /// Total utilization of all tasks in the set.
    pub fn utilization(&self) -> f64 {
        self.iter().map(Task::utilization).sum()
    }

    /// Total utilization of the tasks with a higher priority than the
    /// task at position `index`.
    pub fn utilization_above(&self, index: usize) -> f64 {
        self[..index].iter().map(Task::utilization).sum()
    }

    pub fn periods(&self) -> Vec<Duration> {
        self.iter().map(|t| t.period).collect()
    }

    pub fn execution_times(&self) -> Vec<Service> {
        self.iter().map(|t| t.execution_time).collect()
    }

    /// Overwrite every task's period with the corresponding entry of `periods`.
    pub fn set_periods(&mut self, periods: &[Duration]) {
        debug_assert_eq!(periods.len(), self.len());
        for (task, p) in self.iter_mut().zip(periods) {
            task.period = *p;
        }
    }

    /// Overwrite every task's execution time with the corresponding
    /// entry of `execution_times`.
    pub fn set_execution_times(&mut self, execution_times: &[Service]) {
        debug_assert_eq!(execution_times.len(), self.len());
        for (task, c) in self.iter_mut().zip(execution_times) {
            task.execution_time = *c;
        }
    }

    /// Clone the task set with the given execution times substituted.
    pub fn with_execution_times(&self, execution_times: &[Service]) -> Self {
        let mut ts = self.clone();
        ts.set_execution_times(execution_times);
        ts
    }

    /// Clone the task set with the given periods substituted.
    pub fn with_periods(&self, periods: &[Duration]) -> Self {
        let mut ts = self.clone();
        ts.set_periods(periods);
        ts
    }
}

impl FromIterator<Task> for TaskSet {
    fn from_iter<I: IntoIterator<Item = Task>>(iter: I) -> Self {
        TaskSet(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a TaskSet {
    type Item = &'a Task;
    type IntoIter = std::slice::Iter<'a, Task>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests;
