/*! Heuristics that freeze optimization variables pinned against a constraint

A gradient-based optimizer cannot usefully move a variable that already
sits on a hard constraint (a deadline or the execution-time cap), and
keeping such variables free only makes the problem ill-conditioned near
the boundary. The heuristics in this module detect these variables by
perturbing them slightly and re-running the RTA:

- [find_cutoff] works on execution times and returns a cutoff index:
  all tasks up to and including the cutoff are frozen.
- [find_eliminated_periods] works on periods and freezes tasks
  individually in an [EliminationMask][crate::task::EliminationMask].

Both heuristics only ever freeze more variables; they never unfreeze.
*/

mod cutoff;
mod period;

pub use cutoff::find_cutoff;
pub use period::find_eliminated_periods;

#[cfg(test)]
mod tests;
