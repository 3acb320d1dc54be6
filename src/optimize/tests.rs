use std::cell::RefCell;

use assert_approx_eq::assert_approx_eq;

use super::execution_time::ExecutionTimeProblem;
use super::period::PeriodProblem;
use super::Formulation;
use crate::analysis::{AnalysisError, AnalysisResult, FullyPreemptive, ResponseTimeAnalysis};
use crate::config::{Config, ConfigError};
use crate::energy::{CubicFrequency, EnergyModel};
use crate::fixed_point::{SearchFailure, ITERATION_LIMIT};
use crate::optimize::{
    optimize_execution_times, optimize_periods, Context, ControlCost, OptimizationError, OptimumTracker, Outcome,
    Termination, UNSCHEDULABLE_RATIO,
};
use crate::schedulability::is_schedulable;
use crate::solver::{Problem, ProjectedGradient, SolveResult, Solver, SolverFailure};
use crate::task::{Task, TaskSet};
use crate::tests::{reference_task_set, ts};
use crate::time::Time;

/// A backend that always gives up.
struct Failing;

impl Solver for Failing {
    fn solve(&mut self, _problem: &dyn Problem, _initial: &[f64]) -> SolveResult {
        Err(SolverFailure::SingularJacobian)
    }
}

/// A backend that ignores the bounds it was given.
struct Escaping;

impl Solver for Escaping {
    fn solve(&mut self, _problem: &dyn Problem, initial: &[f64]) -> SolveResult {
        Ok(vec![-1e6; initial.len()])
    }
}

/// An analysis whose recurrence never settles once an execution time
/// leaves its original value.
struct Fragile;

impl ResponseTimeAnalysis for Fragile {
    fn response_time(&self, tasks: &TaskSet, begin: Time, index: usize) -> AnalysisResult {
        let task = tasks[index];
        if task.execution_time != task.execution_time_org {
            return Err(AnalysisError::NoConvergence {
                index,
                source: SearchFailure::IterationLimitExceeded {
                    begin,
                    iterations: ITERATION_LIMIT,
                },
            });
        }
        FullyPreemptive::new().response_time(tasks, begin, index)
    }
}

/// An energy model that cannot price anything.
struct Undefined;

impl EnergyModel for Undefined {
    fn task_energy(&self, _task: &Task) -> f64 {
        f64::NAN
    }
}

fn context<S: Solver>(solver: S) -> Context<FullyPreemptive, S> {
    Context::new(Config::default(), FullyPreemptive::new(), solver).unwrap()
}

fn unit_cost(n: usize) -> ControlCost {
    ControlCost::new(vec![1.0; 2 * n])
}

#[test]
fn context_rejects_invalid_config() {
    let config = Config {
        disturb_step: 0.5,
        ..Config::default()
    };
    let ctx = Context::new(config, FullyPreemptive::new(), ProjectedGradient::new());
    assert!(matches!(ctx, Err(ConfigError::NoGrowth { .. })));
}

#[test]
fn unschedulable_input_yields_sentinel() {
    // task 1 finishes at 19 > 12
    let tasks = ts(&[(10, 6), (12, 7)]);
    let mut ctx = context(ProjectedGradient::new());
    let outcome = optimize_execution_times(&mut ctx, &CubicFrequency::default(), &tasks).unwrap();
    assert_eq!(outcome, Outcome::Unschedulable);
    assert_eq!(outcome.ratio_or_sentinel(), UNSCHEDULABLE_RATIO);

    let outcome = optimize_periods(&mut ctx, &unit_cost(2), &tasks).unwrap();
    assert_eq!(outcome, Outcome::Unschedulable);
    assert_eq!(outcome.ratio_or_sentinel(), -1.0);
}

#[test]
fn invalid_requests() {
    let mut ctx = context(ProjectedGradient::new());
    let empty = ts(&[]);
    assert_eq!(
        optimize_execution_times(&mut ctx, &CubicFrequency::default(), &empty),
        Err(OptimizationError::EmptyTaskSet)
    );
    let tasks = ts(&[(10, 2), (50, 10)]);
    assert_eq!(
        optimize_periods(&mut ctx, &unit_cost(3), &tasks),
        Err(OptimizationError::CoefficientMismatch { expected: 4, found: 6 })
    );
    let cost = ControlCost::new(vec![1.0, 1.0, -2.0, 1.0]);
    assert_eq!(
        optimize_periods(&mut ctx, &cost, &tasks),
        Err(OptimizationError::NegativeCoefficient { index: 2, value: -2.0 })
    );
}

#[test]
fn non_finite_objective_is_an_error() {
    let mut ctx = context(ProjectedGradient::new());
    let result = optimize_execution_times(&mut ctx, &Undefined, &reference_task_set());
    assert!(matches!(result, Err(OptimizationError::NonFiniteObjective(v)) if v.is_nan()));
}

#[test]
fn zero_execution_time_is_optimized_around() {
    let tasks = ts(&[(50, 12), (100, 0), (300, 40)]);
    let config = Config::default();
    let solver = ProjectedGradient::from_config(&config);
    let mut ctx = Context::new(config, FullyPreemptive::new(), solver).unwrap();
    let outcome = optimize_execution_times(&mut ctx, &CubicFrequency::default(), &tasks).unwrap();
    let solution = outcome.solution().unwrap();

    assert_approx_eq!(solution.initial_objective, 12.0 / 50.0 + 40.0 / 300.0, 1e-12);
    assert!(solution.objective.is_finite());
    assert!(solution.ratio() < 1.0);
    assert_eq!(solution.values[1], 0.0);
    let optimized = tasks.with_execution_times(&solution.values);
    assert_eq!(is_schedulable(&ctx.analysis, &optimized, None, 0.0), Ok(true));
}

#[test]
fn analysis_failure_inside_solver_is_fatal() {
    let tasks = reference_task_set();
    let mut ctx = Context::new(Config::default(), Fragile, ProjectedGradient::new()).unwrap();
    let result = optimize_execution_times(&mut ctx, &CubicFrequency::default(), &tasks);
    assert!(matches!(
        result,
        Err(OptimizationError::Analysis(AnalysisError::NoConvergence {
            source: SearchFailure::IterationLimitExceeded { .. },
            ..
        }))
    ));
}

#[test]
fn execution_times_reduce_energy() {
    let tasks = reference_task_set();
    let config = Config::default();
    let solver = ProjectedGradient::from_config(&config);
    let mut ctx = Context::new(config, FullyPreemptive::new(), solver).unwrap();
    let energy = CubicFrequency::default();
    let outcome = optimize_execution_times(&mut ctx, &energy, &tasks).unwrap();
    let solution = outcome.solution().unwrap();

    assert!(solution.ratio() < 1.0);
    assert_eq!(outcome.ratio_or_sentinel(), solution.ratio());
    assert_eq!(solution.fallbacks, 0);
    assert!(solution.outer_loops >= 1);
    for (c, task) in solution.values.iter().zip(tasks.iter()) {
        assert_eq!(c.fract(), 0.0);
        assert!(*c >= task.execution_time_org);
        assert!(*c <= 2.0 * task.execution_time_org);
    }
    let optimized = tasks.with_execution_times(&solution.values);
    assert_eq!(is_schedulable(&ctx.analysis, &optimized, None, 0.0), Ok(true));

    let best = ctx.tracker().best().map(|b| b.objective).unwrap();
    assert!(best <= solution.initial_objective);
}

#[test]
fn solver_failures_fall_back_to_best_known_point() {
    let tasks = reference_task_set();
    let mut ctx = context(Failing);
    let outcome = optimize_execution_times(&mut ctx, &CubicFrequency::default(), &tasks).unwrap();
    let solution = outcome.solution().unwrap();
    // one failure per penalty weight: 1, 10, 100, 1000, 10000
    assert_eq!(solution.fallbacks, 5);
    assert_eq!(solution.outer_loops, 1);
    assert_eq!(solution.values, tasks.execution_times());
    assert_eq!(solution.ratio(), 1.0);
    // probing task 2 by 32 makes it miss its deadline
    assert_eq!(solution.termination, Termination::AllEliminated);

    let tasks = ts(&[(10, 2), (50, 10)]);
    let outcome = optimize_periods(&mut ctx, &unit_cost(2), &tasks).unwrap();
    let solution = outcome.solution().unwrap();
    assert_eq!(solution.fallbacks, 5);
    assert_eq!(solution.values, vec![10.0, 50.0]);
    assert_eq!(solution.termination, Termination::Converged);
}

#[test]
fn escaped_iterates_are_projected() {
    let tasks = reference_task_set();
    let mut ctx = context(Escaping);
    let outcome = optimize_execution_times(&mut ctx, &CubicFrequency::default(), &tasks).unwrap();
    let solution = outcome.solution().unwrap();
    assert_eq!(solution.fallbacks, 0);
    assert_eq!(solution.values, tasks.execution_times());
}

#[test]
fn periods_reduce_control_cost() {
    let tasks = ts(&[(10, 2), (50, 10)]);
    let config = Config::default();
    let solver = ProjectedGradient::from_config(&config);
    let mut ctx = Context::new(config, FullyPreemptive::new(), solver).unwrap();
    let outcome = optimize_periods(&mut ctx, &unit_cost(2), &tasks).unwrap();
    let solution = outcome.solution().unwrap();

    // 10 + 50 + 2 + 14
    assert_eq!(solution.initial_objective, 76.0);
    assert!(solution.ratio() <= 1.0);
    for (p, task) in solution.values.iter().zip(tasks.iter()) {
        assert_eq!(p.fract(), 0.0);
        assert!(*p >= task.execution_time);
    }
    let optimized = tasks.with_periods(&solution.values);
    assert_eq!(is_schedulable(&ctx.analysis, &optimized, None, 0.0), Ok(true));
}

#[test]
fn execution_time_problem_evaluation() {
    let tasks = reference_task_set();
    let config = Config::default();
    let tracker = RefCell::new(OptimumTracker::new());
    let rta = FullyPreemptive::new();
    let energy = CubicFrequency::default();
    let free = [0usize, 1, 2];
    let problem = ExecutionTimeProblem::new(&rta, &energy, &config, &tracker, tasks.clone(), &free, 1.0);

    assert_eq!(problem.dimension(), 3);
    let r = problem.residuals(&[12.0, 193.0, 17.0]);
    assert_eq!(r.len(), 6);
    assert_approx_eq!(r[0] * r[0], 12.0 / 50.0, 1e-12);
    assert_eq!(&r[3..], &[0.0, 0.0, 0.0]);
    assert!(tracker.borrow().best().is_some());
    assert_eq!(problem.schedulability_constraint(&[12.0, 193.0, 17.0]), 0.0);

    // task 1 cannot finish by 300 with an execution time of 300
    let r = problem.residuals(&[12.0, 300.0, 17.0]);
    assert!(r[4] > 0.0);
    assert_eq!(problem.schedulability_constraint(&[12.0, 300.0, 17.0]), 1.0);

    // negative execution times are a soft failure
    assert_eq!(problem.schedulability_constraint(&[12.0, -1.0, 17.0]), 1.0);
    assert_eq!(problem.take_failure(), None);
    assert_eq!(problem.expand(&[1.0, 2.0, 3.0]), vec![1.0, 2.0, 3.0]);
}

#[test]
fn period_problem_evaluation() {
    let tasks = ts(&[(10, 2), (50, 10)]);
    let cost = unit_cost(2);
    let tracker = RefCell::new(OptimumTracker::new());
    let rta = FullyPreemptive::new();
    let free = [1usize];
    let problem = PeriodProblem::new(&rta, &cost, &tracker, tasks, &free, 1.0);

    assert_eq!(problem.dimension(), 1);
    assert_eq!(problem.expand(&[20.0]), vec![10.0, 20.0]);
    let r = problem.residuals(&[50.0]);
    assert_eq!(r.len(), 4);
    assert_approx_eq!(r[0] * r[0], 12.0, 1e-12);
    assert_approx_eq!(r[1] * r[1], 64.0, 1e-12);
    assert_eq!(tracker.borrow().best().map(|b| b.objective), Some(76.0));

    // task 1 finishes at 14
    assert_eq!(problem.schedulability_constraint(&[14.0]), 0.0);
    assert_eq!(problem.schedulability_constraint(&[13.0]), 1.0);
    assert_eq!(problem.schedulability_constraint(&[-1.0]), 1.0);
    assert_eq!(problem.take_failure(), None);
}
