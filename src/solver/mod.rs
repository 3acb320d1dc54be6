/*! The interface to continuous box-constrained solvers

The optimization loops in [optimize][crate::optimize] do not solve the
continuous subproblems themselves. They describe each subproblem as a
[Problem], a bundle of pure, repeatable evaluation functions over the
free variables, and hand it to a [Solver]. Any nonlinear least-squares
or NLP backend can be plugged in by implementing [Solver];
[ProjectedGradient] is a small self-contained backend.

Derivatives are obtained by finite differences (see
[numerical][crate::numerical]), since the response time is only
piecewise smooth in the task parameters.
*/

use auto_impl::auto_impl;
use thiserror::Error;

use crate::numerical::{self, Scheme};

mod gradient;

pub use gradient::ProjectedGradient;

/// Numerical failures of a solver backend. These are never fatal: the
/// optimization loops catch them and fall back to the best known
/// feasible point.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SolverFailure {
    #[error("objective or gradient is not finite in iteration {iteration}")]
    NotFinite { iteration: usize },
    #[error("Jacobian is singular")]
    SingularJacobian,
    #[error("expected {expected} variables, got {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("solver backend failed: {0}")]
    Backend(String),
}

pub type SolveResult = Result<Vec<f64>, SolverFailure>;

/// Per-variable lower and upper bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl Bounds {
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> Self {
        debug_assert_eq!(lower.len(), upper.len());
        Bounds { lower, upper }
    }

    pub fn dimension(&self) -> usize {
        self.lower.len()
    }

    /// Move `x` to the closest point within the bounds.
    pub fn project(&self, x: &mut [f64]) {
        for ((xi, lo), hi) in x.iter_mut().zip(&self.lower).zip(&self.upper) {
            *xi = xi.max(*lo).min(*hi);
        }
    }

    /// Zero every component of the gradient `g` at `x` that pushes
    /// against a bound `x` already sits on. What remains is the
    /// projected gradient; it vanishes at a constrained stationary point.
    pub fn project_gradient(&self, x: &[f64], g: &mut [f64]) {
        for (gi, ((xi, lo), hi)) in g.iter_mut().zip(x.iter().zip(&self.lower).zip(&self.upper)) {
            if (*xi <= *lo && *gi > 0.0) || (*xi >= *hi && *gi < 0.0) {
                *gi = 0.0;
            }
        }
    }

    pub fn contains(&self, x: &[f64]) -> bool {
        x.iter()
            .zip(&self.lower)
            .zip(&self.upper)
            .all(|((xi, lo), hi)| lo <= xi && xi <= hi)
    }
}

/// A continuous subproblem over the free variables.
///
/// All evaluation functions must be pure functions of `x`: they may be
/// called any number of times, in any order, by a solver or by a
/// finite-difference routine.
pub trait Problem {
    /// The number of free variables.
    fn dimension(&self) -> usize;

    fn bounds(&self) -> Bounds;

    /// The residual vector whose squared norm is minimized.
    fn residuals(&self, x: &[f64]) -> Vec<f64>;

    /// The schedulability constraint: `0` if `x` yields a schedulable
    /// task set, `1` otherwise. Backends that support equality
    /// constraints should pin it to zero.
    fn schedulability_constraint(&self, x: &[f64]) -> f64;

    /// The scalar cost `0.5 * |residuals(x)|^2`.
    fn cost(&self, x: &[f64]) -> f64 {
        0.5 * self.residuals(x).iter().map(|r| r * r).sum::<f64>()
    }

    fn gradient(&self, x: &[f64], step: f64, scheme: Scheme) -> Vec<f64> {
        numerical::gradient(|x| self.cost(x), x, step, scheme)
    }

    fn jacobian(&self, x: &[f64], step: f64, scheme: Scheme) -> Vec<Vec<f64>> {
        numerical::jacobian(|x| self.residuals(x), x, step, scheme)
    }
}

/// Generic interface for continuous solver backends.
#[auto_impl(&mut, Box)]
pub trait Solver {
    /// Minimize the cost of `problem`, starting from `initial`, and
    /// return the best point found.
    fn solve(&mut self, problem: &dyn Problem, initial: &[f64]) -> SolveResult;
}
