use std::cell::{Cell, RefCell};

use derive_more::From;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::{
    anneal, finite_objective, hinge, iterate_response_times, Context, Formulation, OptimizationError,
    OptimumTracker, Outcome, Solution, Termination,
};
use crate::analysis::{AnalysisError, ResponseTimeAnalysis};
use crate::clamp::round_periods;
use crate::elimination::find_eliminated_periods;
use crate::schedulability::{is_schedulable, meets_deadlines, response_times};
use crate::solver::{Bounds, Problem, Solver};
use crate::task::{EliminationMask, ResponseTimes, TaskSet};
use crate::time::{Duration, Time};

/// A linear control cost `Σ_i coeff[2i] * P_i + coeff[2i+1] * R_i`
/// over the periods `P_i` and response times `R_i` of all tasks.
#[derive(Debug, Clone, PartialEq, From, Serialize, Deserialize)]
pub struct ControlCost {
    coefficients: Vec<f64>,
}

impl ControlCost {
    pub fn new(coefficients: Vec<f64>) -> Self {
        ControlCost { coefficients }
    }

    pub fn period_weight(&self, index: usize) -> f64 {
        self.coefficients[2 * index]
    }

    pub fn response_weight(&self, index: usize) -> f64 {
        self.coefficients[2 * index + 1]
    }

    /// The cost of `tasks` with the response times `rts`.
    pub fn evaluate(&self, tasks: &TaskSet, rts: &[Time]) -> f64 {
        tasks
            .iter()
            .zip(rts)
            .enumerate()
            .map(|(i, (t, r))| self.period_weight(i) * t.period + self.response_weight(i) * r)
            .sum()
    }

    fn check(&self, n: usize) -> Result<(), OptimizationError> {
        if self.coefficients.len() != 2 * n {
            return Err(OptimizationError::CoefficientMismatch {
                expected: 2 * n,
                found: self.coefficients.len(),
            });
        }
        match self.coefficients.iter().position(|c| !(*c >= 0.0)) {
            Some(index) => Err(OptimizationError::NegativeCoefficient {
                index,
                value: self.coefficients[index],
            }),
            None => Ok(()),
        }
    }
}

/// The control-cost subproblem over the periods of the tasks in `free`.
///
/// Like the execution-time subproblem, half the squared norm of the
/// residuals is the cost plus `weight^2` times the total deadline
/// violation. Response times are warm-started from those of the task
/// set the problem was built for.
pub(super) struct PeriodProblem<'a, A: ?Sized> {
    analysis: &'a A,
    cost: &'a ControlCost,
    tracker: &'a RefCell<OptimumTracker>,
    tasks: TaskSet,
    baseline: ResponseTimes,
    free: &'a [usize],
    bounds: Bounds,
    weight: f64,
    failure: Cell<Option<AnalysisError>>,
}

impl<'a, A> PeriodProblem<'a, A>
where
    A: ResponseTimeAnalysis + ?Sized,
{
    pub(super) fn new(
        analysis: &'a A,
        cost: &'a ControlCost,
        tracker: &'a RefCell<OptimumTracker>,
        tasks: TaskSet,
        free: &'a [usize],
        weight: f64,
    ) -> Self {
        let failure = Cell::new(None);
        let baseline = ResponseTimes::from(iterate_response_times(analysis, &tasks, None, &failure));
        // periods range from the execution time up to five times the total workload
        let longest: Duration = 5.0 * tasks.iter().map(|t| t.execution_time).sum::<f64>();
        let lower = free.iter().map(|&i| tasks[i].execution_time).collect();
        let upper = free.iter().map(|&i| longest.max(tasks[i].period)).collect();
        PeriodProblem {
            analysis,
            cost,
            tracker,
            tasks,
            baseline,
            free,
            bounds: Bounds::new(lower, upper),
            weight,
            failure,
        }
    }

    fn evaluate(&self, x: &[f64]) -> (TaskSet, Vec<Time>) {
        let tasks = self.tasks.with_periods(&self.expand(x));
        let rts = iterate_response_times(self.analysis, &tasks, Some(&self.baseline), &self.failure);
        (tasks, rts)
    }
}

impl<'a, A> Problem for PeriodProblem<'a, A>
where
    A: ResponseTimeAnalysis + ?Sized,
{
    fn dimension(&self) -> usize {
        self.free.len()
    }

    fn bounds(&self) -> Bounds {
        self.bounds.clone()
    }

    fn residuals(&self, x: &[f64]) -> Vec<f64> {
        let (tasks, rts) = self.evaluate(x);
        if self.bounds.contains(x) && meets_deadlines(&tasks, &rts) {
            self.tracker
                .borrow_mut()
                .offer(self.cost.evaluate(&tasks, &rts), &tasks.periods());
        }
        let cost = tasks
            .iter()
            .zip(&rts)
            .enumerate()
            .map(|(i, (t, r))| (self.cost.period_weight(i) * t.period + self.cost.response_weight(i) * r).sqrt());
        let penalty = tasks
            .iter()
            .zip(&rts)
            .map(|(t, r)| self.weight * hinge(r - t.response_time_bound()).sqrt());
        cost.chain(penalty).collect()
    }

    fn schedulability_constraint(&self, x: &[f64]) -> f64 {
        let (tasks, rts) = self.evaluate(x);
        if meets_deadlines(&tasks, &rts) {
            0.0
        } else {
            1.0
        }
    }
}

impl<'a, A> Formulation for PeriodProblem<'a, A>
where
    A: ResponseTimeAnalysis + ?Sized,
{
    fn expand(&self, x: &[f64]) -> Vec<f64> {
        let mut full = self.tasks.periods();
        for (&i, xi) in self.free.iter().zip(x) {
            full[i] = *xi;
        }
        full
    }

    fn take_failure(&self) -> Option<AnalysisError> {
        self.failure.take()
    }
}

/// Minimize the control cost of `tasks` by adjusting periods, subject
/// to schedulability under `ctx.analysis`.
///
/// `cost` must hold two non-negative coefficients per task. Returns
/// [Outcome::Unschedulable] if `tasks` is not schedulable to begin with.
pub fn optimize_periods<A, S>(
    ctx: &mut Context<A, S>,
    cost: &ControlCost,
    tasks: &TaskSet,
) -> Result<Outcome, OptimizationError>
where
    A: ResponseTimeAnalysis,
    S: Solver,
{
    let config = &ctx.config;
    let analysis = &ctx.analysis;
    let tracker = &ctx.tracker;
    let solver = &mut ctx.solver;

    let n = tasks.len();
    if n == 0 {
        return Err(OptimizationError::EmptyTaskSet);
    }
    cost.check(n)?;
    tracker.borrow_mut().reset();
    if !is_schedulable(analysis, tasks, None, 0.0)? {
        warn!("task set is not schedulable; nothing to optimize");
        return Ok(Outcome::Unschedulable);
    }

    let objective = |ts: &TaskSet| -> Result<f64, OptimizationError> {
        let rts = response_times(analysis, ts, None)?;
        finite_objective(cost.evaluate(ts, &rts))
    };
    // the direct cost of each period orders the rounding
    let sensitivity: Vec<f64> = (0..n).map(|i| cost.period_weight(i)).collect();
    let initial_objective = objective(tasks)?;
    tracker.borrow_mut().offer(initial_objective, &tasks.periods());

    let mut current = tasks.clone();
    let mut mask = EliminationMask::new(n);
    let mut previous_objective = f64::INFINITY;
    let mut current_objective = initial_objective;
    let mut outer_loops = 0;
    let mut fallbacks = 0;
    let termination = loop {
        if !mask.any_free() {
            break Termination::AllEliminated;
        }
        if !(current_objective < previous_objective * (1.0 - config.relative_tolerance_outer)) {
            break Termination::Converged;
        }
        if outer_loops >= config.max_outer_loops(n) {
            warn!("outer loop limit of {} reached", outer_loops);
            break Termination::LoopLimit;
        }
        previous_objective = current_objective;
        outer_loops += 1;

        let free_indices: Vec<usize> = mask.free_indices().collect();
        let free = free_indices.as_slice();
        let candidate = anneal(
            &mut *solver,
            analysis,
            config,
            tracker,
            &current,
            TaskSet::with_periods,
            current.periods(),
            free,
            |ts, weight| PeriodProblem::new(analysis, cost, tracker, ts, free, weight),
            &mut fallbacks,
        )?;
        current.set_periods(&candidate);

        find_eliminated_periods(analysis, &current, &mut mask, config)?;
        let rounded = round_periods(analysis, &current, &mask, &sensitivity, config.clamp_middle)?;
        current.set_periods(&rounded);
        current_objective = objective(&current)?;
        debug!(
            "outer loop {}: control cost {}, mask {:?}",
            outer_loops, current_objective, mask
        );
    };

    let values = match termination {
        Termination::LoopLimit => tracker
            .borrow()
            .best()
            .map_or_else(|| current.periods(), |best| best.values.clone()),
        _ => current.periods(),
    };
    let best = current.with_periods(&values);
    let all = EliminationMask::from_cutoff(n, Some(n - 1));
    let rounded = round_periods(analysis, &best, &all, &sensitivity, config.clamp_final)?;
    let mut result = current.with_periods(&rounded);
    if !is_schedulable(analysis, &result, None, 0.0)? {
        warn!("rounded periods are unschedulable; rounding up instead");
        let ceiled: Vec<Duration> = values.iter().map(|p| p.ceil()).collect();
        result = current.with_periods(&ceiled);
    }
    if !is_schedulable(analysis, &result, None, 0.0)? || objective(&result)? > initial_objective {
        debug!("optimization did not improve on the input");
        result = tasks.clone();
    }

    Ok(Outcome::Optimized(Solution {
        values: result.periods(),
        objective: objective(&result)?,
        initial_objective,
        outer_loops,
        fallbacks,
        termination,
    }))
}
