/*! Models of the energy consumed by a task at a given operating point

This module provides the trait [EnergyModel], the interface through
which the execution-time optimization prices a task set, and a simple
reference model based on frequency scaling. */

use auto_impl::auto_impl;
use serde::{Deserialize, Serialize};

use crate::task::{Task, TaskSet};

/// Generic interface for energy models.
#[auto_impl(&, Box, Rc)]
pub trait EnergyModel {
    /// The energy consumed per time unit by `task` at its current
    /// period and execution time.
    fn task_energy(&self, task: &Task) -> f64;

    /// The energy consumed per time unit by all tasks of `tasks`.
    fn energy(&self, tasks: &TaskSet) -> f64 {
        tasks.iter().map(|t| self.task_energy(t)).sum()
    }
}

/// Dynamic power proportional to the cube of the processor frequency.
///
/// Stretching a task's execution time from `C_org` to `C` corresponds
/// to running it at the relative frequency `f = C_org / C`, so that
/// each job costs `C * f^3` and the task costs `weight * C * f^3 / P`
/// per time unit. Longer execution times are therefore cheaper.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CubicFrequency {
    pub weight: f64,
}

impl CubicFrequency {
    pub fn new(weight: f64) -> Self {
        CubicFrequency { weight }
    }
}

impl Default for CubicFrequency {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl EnergyModel for CubicFrequency {
    fn task_energy(&self, task: &Task) -> f64 {
        // a task without work consumes nothing
        if task.execution_time == 0.0 {
            return 0.0;
        }
        let frequency = task.execution_time_org / task.execution_time;
        self.weight * task.execution_time * frequency.powi(3) / task.period
    }
}
