/// A feasible point together with its objective value.
#[derive(Debug, Clone, PartialEq)]
pub struct Optimum {
    pub objective: f64,
    /// One value per task (execution times or periods).
    pub values: Vec<f64>,
}

/// Remembers the best feasible point seen during one optimization call.
///
/// Intermediate solver iterates may violate the schedulability
/// constraint, and a solver may fail outright; the tracker provides the
/// point to fall back to in either case. It is reset at the start of
/// every top-level optimization call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptimumTracker {
    best: Option<Optimum>,
}

impl OptimumTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.best = None;
    }

    /// Record a feasible point. Returns `true` if it improves on the
    /// best point seen so far. Non-finite objectives are ignored.
    pub fn offer(&mut self, objective: f64, values: &[f64]) -> bool {
        let improves = objective.is_finite()
            && self.best.as_ref().map_or(true, |best| objective < best.objective);
        if improves {
            self.best = Some(Optimum {
                objective,
                values: values.to_vec(),
            });
        }
        improves
    }

    pub fn best(&self) -> Option<&Optimum> {
        self.best.as_ref()
    }
}
