/*! Tunable parameters of the optimization

All parameters are request-scoped: they are handed explicitly to the
functions that need them (usually via an
[optimize::Context][crate::optimize::Context]), never read from global
state. [Config] (de)serializes with any `serde` format; missing fields
take their [Default] values.
*/

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clamp::RoundingMode;
use crate::numerical::Scheme;

/// Reasons for rejecting a [Config].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be positive, but is {value}")]
    NotPositive { name: &'static str, value: f64 },
    #[error("growth factor {name} must exceed one, but is {value}")]
    NoGrowth { name: &'static str, value: f64 },
    #[error("schedulability weight range [{min}, {max}] is empty")]
    EmptyWeightRange { min: f64, max: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Initial upward probe applied to an execution time when looking
    /// for tight tasks.
    pub eliminate_tol: f64,
    /// Factor by which the execution-time probe grows when no task is tight.
    pub eliminate_step: f64,
    /// Maximum number of probe growths before giving up on elimination.
    pub eliminate_max_iterations: usize,
    /// Distance to the deadline below which a task counts as tight.
    pub elimination_tolerance: f64,

    /// Initial downward probe applied to a period.
    pub disturb_init: f64,
    /// Factor by which the period probe grows when nothing got eliminated.
    pub disturb_step: f64,
    /// Largest period probe tried.
    pub disturb_max: f64,

    /// Restrict execution times to `max_execution_time_factor` times
    /// their original value.
    pub enable_max_execution_time: bool,
    pub max_execution_time_factor: f64,

    /// Step size of finite-difference derivatives.
    pub finite_difference_step: f64,
    pub finite_difference: Scheme,

    /// Weight of the energy term in the execution-time objective.
    pub weight_energy: f64,
    /// Annealing schedule of the schedulability-penalty weight: from
    /// `weight_schedulability_min` to `weight_schedulability_max`,
    /// multiplied by `weight_schedulability_step` each round.
    pub weight_schedulability_min: f64,
    pub weight_schedulability_max: f64,
    pub weight_schedulability_step: f64,

    /// Stop the outer loop once the objective improves by less than
    /// this fraction.
    pub relative_tolerance_outer: f64,
    /// The outer loop runs at most this many times per task.
    pub max_loops_per_task: usize,

    /// Rounding applied between outer iterations.
    pub clamp_middle: RoundingMode,
    /// Rounding applied to the final result.
    pub clamp_final: RoundingMode,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            eliminate_tol: 1.0,
            eliminate_step: 2.0,
            eliminate_max_iterations: 16,
            elimination_tolerance: 1e-2,
            disturb_init: 1e-3,
            disturb_step: 2.0,
            disturb_max: 100.0,
            enable_max_execution_time: true,
            max_execution_time_factor: 2.0,
            finite_difference_step: 1e-3,
            finite_difference: Scheme::Central,
            weight_energy: 1.0,
            weight_schedulability_min: 1.0,
            weight_schedulability_max: 1e4,
            weight_schedulability_step: 10.0,
            relative_tolerance_outer: 1e-5,
            max_loops_per_task: 10,
            clamp_middle: RoundingMode::Rough,
            clamp_final: RoundingMode::Fine,
        }
    }
}

impl Config {
    /// Check the parameters for consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("eliminate_tol", self.eliminate_tol),
            ("disturb_init", self.disturb_init),
            ("disturb_max", self.disturb_max),
            ("max_execution_time_factor", self.max_execution_time_factor),
            ("finite_difference_step", self.finite_difference_step),
            ("weight_energy", self.weight_energy),
            ("weight_schedulability_min", self.weight_schedulability_min),
        ];
        for (name, value) in positive {
            if !(value > 0.0) {
                return Err(ConfigError::NotPositive { name, value });
            }
        }
        let growth = [
            ("eliminate_step", self.eliminate_step),
            ("disturb_step", self.disturb_step),
            ("weight_schedulability_step", self.weight_schedulability_step),
        ];
        for (name, value) in growth {
            if !(value > 1.0) {
                return Err(ConfigError::NoGrowth { name, value });
            }
        }
        if self.weight_schedulability_min > self.weight_schedulability_max {
            return Err(ConfigError::EmptyWeightRange {
                min: self.weight_schedulability_min,
                max: self.weight_schedulability_max,
            });
        }
        Ok(())
    }

    /// The upper bound on a task's execution time, if one is enforced.
    pub fn execution_time_cap(&self, execution_time_org: f64) -> Option<f64> {
        self.enable_max_execution_time
            .then(|| execution_time_org * self.max_execution_time_factor)
    }

    /// The schedulability-penalty weights to visit, in order.
    pub fn weight_schedule(&self) -> impl Iterator<Item = f64> {
        let (max, step) = (self.weight_schedulability_max, self.weight_schedulability_step);
        std::iter::successors(Some(self.weight_schedulability_min), move |w| Some(w * step))
            .take_while(move |w| *w <= max * (1.0 + 1e-9))
    }

    /// The maximum number of outer loops for a task set of `n` tasks.
    pub fn max_outer_loops(&self, n: usize) -> usize {
        self.max_loops_per_task * n.max(1)
    }
}
