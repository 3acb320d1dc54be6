use log::{debug, trace};

use super::{Problem, SolveResult, Solver, SolverFailure};
use crate::config::Config;
use crate::numerical::Scheme;

/// Projected steepest descent with a backtracking line search.
///
/// Each iteration steps along the normalized negative projected
/// gradient (components pushing against an active bound are dropped),
/// projects the result onto the bounds, and halves the step length
/// until the cost decreases. The search stops once no step above
/// `min_step` decreases the cost, once the relative decrease drops
/// below `tolerance`, or after `max_iterations` iterations.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedGradient {
    pub max_iterations: usize,
    /// Length of the first step tried, in the units of the variables.
    pub initial_step: f64,
    pub min_step: f64,
    pub tolerance: f64,
    pub finite_difference_step: f64,
    pub scheme: Scheme,
}

impl Default for ProjectedGradient {
    fn default() -> Self {
        ProjectedGradient {
            max_iterations: 200,
            initial_step: 16.0,
            min_step: 1e-6,
            tolerance: 1e-9,
            finite_difference_step: 1e-3,
            scheme: Scheme::Central,
        }
    }
}

impl ProjectedGradient {
    pub fn new() -> Self {
        Self::default()
    }

    /// A solver that differentiates with the settings of `config`.
    pub fn from_config(config: &Config) -> Self {
        ProjectedGradient {
            finite_difference_step: config.finite_difference_step,
            scheme: config.finite_difference,
            ..Self::default()
        }
    }
}

impl Solver for ProjectedGradient {
    fn solve(&mut self, problem: &dyn Problem, initial: &[f64]) -> SolveResult {
        let bounds = problem.bounds();
        if initial.len() != problem.dimension() || bounds.dimension() != problem.dimension() {
            return Err(SolverFailure::DimensionMismatch {
                expected: problem.dimension(),
                found: initial.len(),
            });
        }
        let mut x = initial.to_vec();
        bounds.project(&mut x);
        let mut cost = problem.cost(&x);
        if !cost.is_finite() {
            return Err(SolverFailure::NotFinite { iteration: 0 });
        }

        let mut step = self.initial_step;
        for iteration in 0..self.max_iterations {
            let mut g = problem.gradient(&x, self.finite_difference_step, self.scheme);
            if g.iter().any(|gi| !gi.is_finite()) {
                return Err(SolverFailure::NotFinite { iteration });
            }
            // pinned variables must not eat up the step length
            bounds.project_gradient(&x, &mut g);
            let norm = g.iter().map(|gi| gi * gi).sum::<f64>().sqrt();
            if norm == 0.0 {
                debug!("projected gradient vanishes after {} iterations", iteration);
                break;
            }

            let mut accepted = None;
            while step >= self.min_step {
                let mut candidate: Vec<f64> = x.iter().zip(&g).map(|(xi, gi)| xi - step * gi / norm).collect();
                bounds.project(&mut candidate);
                let candidate_cost = problem.cost(&candidate);
                trace!("step {} yields cost {}", step, candidate_cost);
                if candidate_cost < cost {
                    accepted = Some((candidate, candidate_cost));
                    break;
                }
                step /= 2.0;
            }
            let Some((candidate, candidate_cost)) = accepted else {
                debug!("no descent step left after {} iterations", iteration);
                break;
            };

            let decrease = cost - candidate_cost;
            x = candidate;
            cost = candidate_cost;
            if decrease <= self.tolerance * cost.abs().max(f64::MIN_POSITIVE) {
                debug!("relative decrease below tolerance after {} iterations", iteration + 1);
                break;
            }
            // let the next line search start a bit more optimistically
            step *= 2.0;
        }
        Ok(x)
    }
}
