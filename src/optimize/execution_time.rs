use std::cell::{Cell, RefCell};

use log::{debug, warn};

use super::{
    anneal, finite_objective, hinge, iterate_response_times, Context, Formulation, OptimizationError,
    OptimumTracker, Outcome, Solution, Termination,
};
use crate::analysis::{AnalysisError, ResponseTimeAnalysis};
use crate::clamp::clamp_execution_times;
use crate::config::Config;
use crate::elimination::find_cutoff;
use crate::energy::EnergyModel;
use crate::numerical;
use crate::schedulability::{is_schedulable, meets_deadlines, response_times};
use crate::solver::{Bounds, Problem, Solver};
use crate::task::TaskSet;
use crate::time::{Service, Time};

/// The energy-minimization subproblem over the execution times of the
/// tasks in `free`.
///
/// Half the squared norm of the residuals is the weighted energy plus
/// `weight^2` times the total deadline violation, an exact penalty: for
/// a large enough weight, the constrained and the penalized minimum
/// coincide.
pub(super) struct ExecutionTimeProblem<'a, A: ?Sized, E: ?Sized> {
    analysis: &'a A,
    energy: &'a E,
    config: &'a Config,
    tracker: &'a RefCell<OptimumTracker>,
    tasks: TaskSet,
    free: &'a [usize],
    bounds: Bounds,
    weight: f64,
    failure: Cell<Option<AnalysisError>>,
}

impl<'a, A, E> ExecutionTimeProblem<'a, A, E>
where
    A: ResponseTimeAnalysis + ?Sized,
    E: EnergyModel + ?Sized,
{
    pub(super) fn new(
        analysis: &'a A,
        energy: &'a E,
        config: &'a Config,
        tracker: &'a RefCell<OptimumTracker>,
        tasks: TaskSet,
        free: &'a [usize],
        weight: f64,
    ) -> Self {
        // a task can run at most at its original speed, and no slower
        // than its cap (or its deadline) allows
        let lower = free.iter().map(|&i| tasks[i].execution_time_org).collect();
        let upper = free
            .iter()
            .map(|&i| {
                let task = tasks[i];
                config
                    .execution_time_cap(task.execution_time_org)
                    .unwrap_or_else(|| task.response_time_bound())
                    .max(task.execution_time_org)
            })
            .collect();
        ExecutionTimeProblem {
            analysis,
            energy,
            config,
            tracker,
            tasks,
            free,
            bounds: Bounds::new(lower, upper),
            weight,
            failure: Cell::new(None),
        }
    }

    fn evaluate(&self, x: &[f64]) -> (TaskSet, Vec<Time>) {
        let tasks = self.tasks.with_execution_times(&self.expand(x));
        let rts = iterate_response_times(self.analysis, &tasks, None, &self.failure);
        (tasks, rts)
    }
}

impl<'a, A, E> Problem for ExecutionTimeProblem<'a, A, E>
where
    A: ResponseTimeAnalysis + ?Sized,
    E: EnergyModel + ?Sized,
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
            let objective = self.config.weight_energy * self.energy.energy(&tasks);
            self.tracker.borrow_mut().offer(objective, &tasks.execution_times());
        }
        let energy = tasks
            .iter()
            .map(|t| (self.config.weight_energy * self.energy.task_energy(t)).sqrt());
        let penalty = tasks
            .iter()
            .zip(&rts)
            .map(|(t, r)| self.weight * hinge(r - t.response_time_bound()).sqrt());
        energy.chain(penalty).collect()
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

impl<'a, A, E> Formulation for ExecutionTimeProblem<'a, A, E>
where
    A: ResponseTimeAnalysis + ?Sized,
    E: EnergyModel + ?Sized,
{
    fn expand(&self, x: &[f64]) -> Vec<f64> {
        let mut full = self.tasks.execution_times();
        for (&i, xi) in self.free.iter().zip(x) {
            full[i] = *xi;
        }
        full
    }

    fn take_failure(&self) -> Option<AnalysisError> {
        self.failure.take()
    }
}

/// Derivative of the weighted energy with respect to each execution time.
fn sensitivities<E>(energy: &E, config: &Config, tasks: &TaskSet, execution_times: &[Service]) -> Vec<f64>
where
    E: EnergyModel + ?Sized,
{
    numerical::gradient(
        |c| config.weight_energy * energy.energy(&tasks.with_execution_times(c)),
        execution_times,
        config.finite_difference_step,
        config.finite_difference,
    )
}

/// Minimize the energy consumed by `tasks` by stretching execution
/// times, subject to schedulability under `ctx.analysis`.
///
/// Returns [Outcome::Unschedulable] if `tasks` is not schedulable to
/// begin with. Solver failures are never fatal; they are counted in
/// [Solution::fallbacks].
pub fn optimize_execution_times<A, S, E>(
    ctx: &mut Context<A, S>,
    energy: &E,
    tasks: &TaskSet,
) -> Result<Outcome, OptimizationError>
where
    A: ResponseTimeAnalysis,
    S: Solver,
    E: EnergyModel + ?Sized,
{
    let config = &ctx.config;
    let analysis = &ctx.analysis;
    let tracker = &ctx.tracker;
    let solver = &mut ctx.solver;

    let n = tasks.len();
    let last = n.checked_sub(1).ok_or(OptimizationError::EmptyTaskSet)?;
    tracker.borrow_mut().reset();
    if !is_schedulable(analysis, tasks, None, 0.0)? {
        warn!("task set is not schedulable; nothing to optimize");
        return Ok(Outcome::Unschedulable);
    }

    let objective = |ts: &TaskSet| finite_objective(config.weight_energy * energy.energy(ts));
    let initial_objective = objective(tasks)?;
    tracker.borrow_mut().offer(initial_objective, &tasks.execution_times());

    let mut current = tasks.clone();
    let mut cutoff = None;
    let mut previous_objective = f64::INFINITY;
    let mut current_objective = initial_objective;
    let mut outer_loops = 0;
    let mut fallbacks = 0;
    let termination = loop {
        if cutoff == Some(last) {
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

        let free_indices: Vec<usize> = (cutoff.map_or(0, |c| c + 1)..n).collect();
        let free = free_indices.as_slice();
        let candidate = anneal(
            &mut *solver,
            analysis,
            config,
            tracker,
            &current,
            TaskSet::with_execution_times,
            current.execution_times(),
            free,
            |ts, weight| ExecutionTimeProblem::new(analysis, energy, config, tracker, ts, free, weight),
            &mut fallbacks,
        )?;

        let warm_start = response_times(analysis, &current.with_execution_times(&candidate), None)?;
        cutoff = find_cutoff(analysis, &current, &candidate, cutoff, Some(&warm_start), config)?;
        let sensitivity = sensitivities(energy, config, &current, &candidate);
        let rounded = clamp_execution_times(
            analysis,
            &current,
            &candidate,
            cutoff,
            Some(&warm_start),
            &sensitivity,
            config.clamp_middle,
            config,
        )?;
        current.set_execution_times(&rounded);
        current_objective = objective(&current)?;
        debug!(
            "outer loop {}: energy {}, cutoff {:?}",
            outer_loops, current_objective, cutoff
        );
    };

    let values = match termination {
        Termination::LoopLimit => tracker
            .borrow()
            .best()
            .map_or_else(|| current.execution_times(), |best| best.values.clone()),
        _ => current.execution_times(),
    };
    let sensitivity = sensitivities(energy, config, &current, &values);
    let rounded = clamp_execution_times(
        analysis,
        &current.with_execution_times(&values),
        &values,
        Some(last),
        None,
        &sensitivity,
        config.clamp_final,
        config,
    )?;
    let mut result = current.with_execution_times(&rounded);
    if !is_schedulable(analysis, &result, None, 0.0)? {
        warn!("rounded execution times are unschedulable; rounding down instead");
        let floored: Vec<Service> = values.iter().map(|c| c.floor()).collect();
        result = current.with_execution_times(&floored);
    }
    if objective(&result)? > initial_objective || !is_schedulable(analysis, &result, None, 0.0)? {
        debug!("optimization did not improve on the input");
        result = tasks.clone();
    }

    Ok(Outcome::Optimized(Solution {
        values: result.execution_times(),
        objective: objective(&result)?,
        initial_objective,
        outer_loops,
        fallbacks,
        termination,
    }))
}
