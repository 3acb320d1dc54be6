/*! Response-time analysis as a schedulability oracle for energy and period optimization

This crate analyzes whether a set of fixed-priority periodic tasks
meets its deadlines, and uses that analysis inside a search over task
execution times (energy minimization) and periods (control-cost
minimization) that produces integer, schedulability-preserving results.

The pieces, leaf-first:

- [task]: the task model; index order is priority order.
- [analysis]: the RTA engines behind the [analysis::ResponseTimeAnalysis] trait.
- [schedulability]: whole-task-set schedulability tests built on top.
- [elimination]: heuristics that freeze variables pinned against a constraint.
- [clamp]: rounding of continuous results to schedulable integers.
- [solver] and [numerical]: the interface to (and a small reference
  implementation of) a continuous box-constrained solver.
- [optimize]: the outer iteration that ties everything together.
*/

pub mod analysis;
pub mod clamp;
pub mod config;
pub mod elimination;
pub mod energy;
pub mod fixed_point;
pub mod numerical;
pub mod optimize;
pub mod schedulability;
pub mod solver;
pub mod task;
pub mod time;
