//! Finite-difference derivatives of pure evaluation functions.
//!
//! The evaluation functions of this crate are piecewise constant in
//! places (the response time only changes when a ceiling flips), so
//! analytic derivatives are not available; the solvers get numerical
//! ones at a configured step size instead.

use serde::{Deserialize, Serialize};

/// The finite-difference formula to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// `(f(x + h) - f(x - h)) / 2h`
    Central,
    /// `(f(x + h) - f(x)) / h`
    Forward,
}

/// Numerically differentiate the scalar function `f` at `x`.
pub fn gradient<F>(f: F, x: &[f64], step: f64, scheme: Scheme) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64,
{
    let mut probe = x.to_vec();
    let base = match scheme {
        Scheme::Forward => f(x),
        Scheme::Central => 0.0,
    };
    (0..x.len())
        .map(|i| {
            let xi = probe[i];
            probe[i] = xi + step;
            let upper = f(&probe);
            let d = match scheme {
                Scheme::Forward => (upper - base) / step,
                Scheme::Central => {
                    probe[i] = xi - step;
                    (upper - f(&probe)) / (2.0 * step)
                }
            };
            probe[i] = xi;
            d
        })
        .collect()
}

/// Numerically differentiate the vector-valued function `f` at `x`.
///
/// Returns the Jacobian in row-major order: `jac[r][c]` is the
/// derivative of output `r` with respect to input `c`.
pub fn jacobian<F>(f: F, x: &[f64], step: f64, scheme: Scheme) -> Vec<Vec<f64>>
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    let mut probe = x.to_vec();
    let base = f(x);
    let mut jac = vec![vec![0.0; x.len()]; base.len()];
    for c in 0..x.len() {
        let xc = probe[c];
        probe[c] = xc + step;
        let upper = f(&probe);
        let (lower, width) = match scheme {
            Scheme::Forward => (base.clone(), step),
            Scheme::Central => {
                probe[c] = xc - step;
                (f(&probe), 2.0 * step)
            }
        };
        probe[c] = xc;
        for (r, (u, l)) in upper.iter().zip(&lower).enumerate() {
            jac[r][c] = (u - l) / width;
        }
    }
    jac
}
