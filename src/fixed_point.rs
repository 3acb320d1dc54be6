use std::iter;

use itertools::Itertools;
use thiserror::Error;

use crate::time::{Duration, Time};

/// Upper bound on the number of iterations of any single fixed-point
/// search. A schedulable workload converges long before this; reaching
/// it means the recurrence is not monotone.
pub const ITERATION_LIMIT: usize = 1 << 20;

/// Error type returned when a fixed point search fails.
#[derive(Debug, Error, Copy, Clone, PartialEq, PartialOrd)]
pub enum SearchFailure {
    /// No fixed point found below the given divergence threshold.
    #[error("no fixed point less than {limit} found when starting from {begin}")]
    DivergenceLimitExceeded { begin: Time, limit: Duration },
    /// The iteration did not settle within [ITERATION_LIMIT] steps.
    #[error("fixed point search starting from {begin} did not settle after {iterations} iterations")]
    IterationLimitExceeded { begin: Time, iterations: usize },
}

pub type SearchResult = Result<Duration, SearchFailure>;

/// The sequence of estimates `R_0 = begin, R_(n+1) = workload(R_n)`.
pub fn trajectory<RHS>(begin: Time, workload: RHS) -> impl Iterator<Item = Time>
where
    RHS: Fn(Time) -> Time,
{
    iter::successors(Some(begin), move |r| Some(workload(*r)))
}

/// Conduct an iterative fixed point search starting from `begin`, up
/// to a given divergence threshold.
///
/// The search terminates when two consecutive estimates are
/// bit-identical. Starting from any `begin` no larger than the least
/// fixed point, the iteration yields the least fixed point; larger
/// starting points yield some fixed point at least as large.
pub fn search<RHS>(begin: Time, divergence_limit: Duration, workload: RHS) -> SearchResult
where
    RHS: Fn(Time) -> Time,
{
    let outcome = trajectory(begin, workload)
        .tuple_windows()
        .take(ITERATION_LIMIT)
        .find(|(before, after)| before == after || *after > divergence_limit);
    match outcome {
        // we have converged
        Some((_, after)) if after <= divergence_limit => Ok(after),
        // we have passed the limit => no solution
        Some(_) => Err(SearchFailure::DivergenceLimitExceeded {
            begin,
            limit: divergence_limit,
        }),
        None => Err(SearchFailure::IterationLimitExceeded {
            begin,
            iterations: ITERATION_LIMIT,
        }),
    }
}
