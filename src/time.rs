/// This library uses a continuous time model: execution times and
/// periods become fractional while the optimizer works on them and are
/// rounded back to integers only at the end.
pub type Time = f64;

/// Syntactic sugar to give a hint that a time value denotes an
/// interval length (e.g., a period or a response time).
pub type Duration = Time;

/// Syntactic sugar to give a hint that a time value represents some
/// amount of processor service (e.g., an execution time).
pub type Service = Time;

/// Reserved response time reported for tasks whose response time is
/// unbounded (higher-priority utilization above one, or a divergent
/// fixed-point iteration).
pub const UNSCHEDULABLE: Time = i32::MAX as Time;

/// Response times within this distance of [UNSCHEDULABLE] are treated
/// as the sentinel, since they may have picked up some rounding on
/// the way.
const SENTINEL_SLACK: Time = 10_000.0;

/// Does `t` denote the "unschedulable" sentinel?
pub fn is_unschedulable(t: Time) -> bool {
    t.is_nan() || t >= UNSCHEDULABLE - SENTINEL_SLACK
}
