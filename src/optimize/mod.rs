/*! The outer optimization loops

Both loops follow the same pattern. Starting from a schedulable task
set, they repeatedly

1. hand the free variables to a [Solver] for a sequence of
   geometrically growing schedulability-penalty weights, keeping the
   last schedulable result,
2. freeze the variables that are pinned against a constraint (see
   [elimination][crate::elimination]), and
3. round the frozen variables ([Config::clamp_middle]),

until the objective stops improving, every variable is frozen, or the
loop budget runs out. The final result is rounded with
[Config::clamp_final] and is never worse than the input.

[optimize_execution_times] minimizes energy by stretching execution
times; [optimize_periods] minimizes a linear [ControlCost] of periods
and response times.

All state of one optimization call lives in a [Context]; in particular,
the [OptimumTracker] is reset at the start of every call.
*/

use std::cell::{Cell, Ref, RefCell};

use log::{debug, warn};
use thiserror::Error;

use crate::analysis::{AnalysisError, ResponseTimeAnalysis};
use crate::clamp::ClampError;
use crate::config::{Config, ConfigError};
use crate::schedulability::is_schedulable;
use crate::solver::{Problem, Solver};
use crate::task::{ResponseTimes, TaskSet};
use crate::time::{Time, UNSCHEDULABLE};

mod execution_time;
mod period;
mod tracker;

pub use execution_time::optimize_execution_times;
pub use period::{optimize_periods, ControlCost};
pub use tracker::{Optimum, OptimumTracker};

/// The value reported by [Outcome::ratio_or_sentinel] for task sets
/// that are unschedulable to begin with.
pub const UNSCHEDULABLE_RATIO: f64 = -1.0;

/// Fatal failures of an optimization call.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OptimizationError {
    #[error("cannot optimize an empty task set")]
    EmptyTaskSet,
    #[error("expected {expected} control-cost coefficients, got {found}")]
    CoefficientMismatch { expected: usize, found: usize },
    #[error("control-cost coefficient {index} is negative ({value})")]
    NegativeCoefficient { index: usize, value: f64 },
    #[error("objective evaluates to {0}")]
    NonFiniteObjective(f64),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error(transparent)]
    Clamp(#[from] ClampError),
}

/// Why the outer loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The relative improvement fell below the configured tolerance.
    Converged,
    /// Every variable got frozen.
    AllEliminated,
    /// The loop budget ran out; the result is the best point seen.
    LoopLimit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// One value per task (execution times or periods).
    pub values: Vec<f64>,
    pub objective: f64,
    pub initial_objective: f64,
    pub outer_loops: usize,
    /// How often a solver failure was answered with the best known point.
    pub fallbacks: usize,
    pub termination: Termination,
}

impl Solution {
    /// The final objective relative to the initial one.
    pub fn ratio(&self) -> f64 {
        self.objective / self.initial_objective
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Optimized(Solution),
    /// The input task set is not schedulable; there is nothing to optimize.
    Unschedulable,
}

impl Outcome {
    pub fn solution(&self) -> Option<&Solution> {
        match self {
            Outcome::Optimized(solution) => Some(solution),
            Outcome::Unschedulable => None,
        }
    }

    /// The objective ratio, or [UNSCHEDULABLE_RATIO] for
    /// unschedulable input.
    pub fn ratio_or_sentinel(&self) -> f64 {
        self.solution().map_or(UNSCHEDULABLE_RATIO, Solution::ratio)
    }
}

/// Everything one optimization call needs: the configuration, the
/// analysis used as the schedulability oracle, the solver backend, and
/// the tracker of the best feasible point.
///
/// A context must not be shared by concurrent optimization calls.
pub struct Context<A, S> {
    pub config: Config,
    pub analysis: A,
    pub solver: S,
    tracker: RefCell<OptimumTracker>,
}

impl<A, S> Context<A, S>
where
    A: ResponseTimeAnalysis,
    S: Solver,
{
    pub fn new(config: Config, analysis: A, solver: S) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Context {
            config,
            analysis,
            solver,
            tracker: RefCell::new(OptimumTracker::new()),
        })
    }

    /// The best feasible point seen during the last optimization call.
    pub fn tracker(&self) -> Ref<'_, OptimumTracker> {
        self.tracker.borrow()
    }
}

/// A [Problem] whose free variables are a subset of one per-task
/// parameter.
pub(crate) trait Formulation: Problem {
    /// The full per-task vector with the free variables taken from `x`.
    fn expand(&self, x: &[f64]) -> Vec<f64>;

    /// The first fatal analysis failure met during evaluation, if any.
    fn take_failure(&self) -> Option<AnalysisError>;
}

/// Reject NaN and infinite objective values, which would otherwise
/// compare as "no improvement" and end the outer loop as converged.
pub(crate) fn finite_objective(objective: f64) -> Result<f64, OptimizationError> {
    if objective.is_finite() {
        Ok(objective)
    } else {
        Err(OptimizationError::NonFiniteObjective(objective))
    }
}

/// `max(0, x)`
pub(crate) fn hinge(x: f64) -> f64 {
    x.max(0.0)
}

/// Response times of a solver iterate.
///
/// Out-of-range iterates (negative execution times, non-positive
/// periods) are transient and yield [UNSCHEDULABLE] for every task. A
/// fatal analysis failure also yields the sentinel, but is recorded in
/// `failure` so that the optimization loop can abort once the solver
/// returns.
pub(crate) fn iterate_response_times<A>(
    analysis: &A,
    tasks: &TaskSet,
    warm_start: Option<&ResponseTimes>,
    failure: &Cell<Option<AnalysisError>>,
) -> Vec<Time>
where
    A: ResponseTimeAnalysis + ?Sized,
{
    let out_of_range = tasks
        .iter()
        .any(|t| !(t.execution_time >= 0.0) || !(t.period > 0.0));
    if out_of_range {
        return vec![UNSCHEDULABLE; tasks.len()];
    }
    (0..tasks.len())
        .map(|i| {
            let begin = warm_start.map_or(tasks[i].execution_time, |ws| ws[i]);
            analysis.response_time(tasks, begin, i).unwrap_or_else(|e| {
                if failure.get().is_none() {
                    failure.set(Some(e));
                }
                UNSCHEDULABLE
            })
        })
        .collect()
}

/// Run the solver for each weight of the annealing schedule, starting
/// from `start` and keeping the last schedulable result.
///
/// `apply` substitutes a full per-task vector into `tasks`, and `build`
/// creates the subproblem for a task set and a penalty weight. A solver
/// failure is answered with the tracker's best point; an unschedulable
/// result ends the schedule.
#[allow(clippy::too_many_arguments)]
pub(crate) fn anneal<A, S, P, F>(
    solver: &mut S,
    analysis: &A,
    config: &Config,
    tracker: &RefCell<OptimumTracker>,
    tasks: &TaskSet,
    apply: fn(&TaskSet, &[Time]) -> TaskSet,
    start: Vec<Time>,
    free: &[usize],
    mut build: F,
    fallbacks: &mut usize,
) -> Result<Vec<Time>, OptimizationError>
where
    A: ResponseTimeAnalysis + ?Sized,
    S: Solver + ?Sized,
    P: Formulation,
    F: FnMut(TaskSet, f64) -> P,
{
    let mut accepted = start;
    for weight in config.weight_schedule() {
        let problem = build(apply(tasks, &accepted), weight);
        let initial: Vec<Time> = free.iter().map(|&i| accepted[i]).collect();
        let candidate = match solver.solve(&problem, &initial) {
            Ok(mut x) => {
                problem.bounds().project(&mut x);
                problem.expand(&x)
            }
            Err(failure) => {
                *fallbacks += 1;
                warn!("solver failed at weight {}: {}; using the best known point", weight, failure);
                let best = tracker.borrow().best().map(|b| b.values.clone());
                best.unwrap_or_else(|| accepted.clone())
            }
        };
        if let Some(failure) = problem.take_failure() {
            return Err(failure.into());
        }
        if !is_schedulable(analysis, &apply(tasks, &candidate), None, 0.0)? {
            debug!("result for weight {} is unschedulable; keeping the previous one", weight);
            break;
        }
        accepted = candidate;
    }
    Ok(accepted)
}

#[cfg(test)]
mod tests;
