use derive_more::{Deref, DerefMut, From, Into};

use crate::time::{self, Time, UNSCHEDULABLE};

/// Per-task worst-case response times, indexed by priority.
///
/// The vector doubles as the warm start of the next RTA call. A vector
/// whose first slot holds [UNSCHEDULABLE] signals that the task set it
/// was computed for is not schedulable.
#[derive(Debug, Clone, PartialEq, Deref, DerefMut, From, Into)]
pub struct ResponseTimes(Vec<Time>);

impl ResponseTimes {
    /// Does the vector carry the "unschedulable" marker?
    pub fn is_unschedulable(&self) -> bool {
        self.0.first().map_or(false, |r| time::is_unschedulable(*r))
    }

    /// Overwrite the first slot with the "unschedulable" marker.
    pub(crate) fn mark_unschedulable(&mut self) {
        if let Some(first) = self.0.first_mut() {
            *first = UNSCHEDULABLE;
        }
    }
}
