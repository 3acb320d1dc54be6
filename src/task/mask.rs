use derive_more::{Deref, From};
use itertools::Itertools;

/// Per-task flags recording which tasks' variables are frozen, i.e.,
/// excluded from the optimizer's set of free variables.
///
/// Within one top-level optimization call, flags only ever turn on.
#[derive(Debug, Clone, PartialEq, Eq, Deref, From)]
pub struct EliminationMask(Vec<bool>);

impl EliminationMask {
    /// A mask for `n` tasks with nothing frozen yet.
    pub fn new(n: usize) -> Self {
        EliminationMask(vec![false; n])
    }

    /// A mask in which exactly the tasks `0..=cutoff` are frozen.
    pub fn from_cutoff(n: usize, cutoff: Option<usize>) -> Self {
        let mut mask = Self::new(n);
        if let Some(c) = cutoff {
            for i in 0..=c.min(n.saturating_sub(1)) {
                mask.freeze(i);
            }
        }
        mask
    }

    /// Freeze the task at `index`. Returns `true` if it was not frozen before.
    pub fn freeze(&mut self, index: usize) -> bool {
        let newly = !self.0[index];
        self.0[index] = true;
        newly
    }

    pub fn is_frozen(&self, index: usize) -> bool {
        self.0[index]
    }

    /// Is there any task left whose variables are still free?
    pub fn any_free(&self) -> bool {
        self.0.iter().any(|frozen| !frozen)
    }

    /// Indices of the tasks whose variables are still free.
    pub fn free_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().positions(|frozen| !frozen)
    }

    /// Indices of the frozen tasks.
    pub fn frozen_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().positions(|frozen| *frozen)
    }
}
