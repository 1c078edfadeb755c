use super::Model;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// A `(workday, crew)` pair a job is assigned to.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Slot {
    pub day: usize,
    pub crew: usize,
}

impl Slot {
    /// Creates a new slot.
    #[must_use]
    pub const fn new(day: usize, crew: usize) -> Self {
        Self { day, crew }
    }
}

/// Terminal state of a solve.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolveStatus {
    /// A solution was found and proven to have the minimal number of late jobs.
    Optimal,
    /// A solution was found but the search stopped before proving optimality.
    Feasible,
    /// It is proven that no assignment exists.
    Infeasible,
    /// The search stopped before finding any solution.
    Unknown,
}

impl SolveStatus {
    /// Returns whether the status carries an assignment.
    #[must_use]
    pub const fn has_solution(self) -> bool {
        matches!(self, Self::Optimal | Self::Feasible)
    }
}

impl Display for SolveStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            Self::Optimal => "OPTIMAL",
            Self::Feasible => "FEASIBLE",
            Self::Infeasible => "INFEASIBLE",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(status)
    }
}

/// Result of solving a model.
/// Contains the slot of every job when a solution was found, nothing otherwise.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Solution<'a> {
    model: &'a Model,
    status: SolveStatus,
    slots: Vec<Slot>,
    nodes: u64,
}

impl<'a> Solution<'a> {
    /// Creates a solution from a full assignment.
    /// The status must be `Optimal` or `Feasible`.
    #[must_use]
    pub fn found(model: &'a Model, status: SolveStatus, slots: Vec<Slot>) -> Self {
        debug_assert!(status.has_solution());
        debug_assert_eq!(slots.len(), model.jobs.len());
        Self {
            model,
            status,
            slots,
            nodes: 0,
        }
    }

    /// Creates a solution without assignment.
    /// The status must be `Infeasible` or `Unknown`.
    #[must_use]
    pub fn empty(model: &'a Model, status: SolveStatus) -> Self {
        debug_assert!(!status.has_solution());
        Self {
            model,
            status,
            slots: Vec::new(),
            nodes: 0,
        }
    }

    /// Sets the number of search nodes explored to get this solution.
    #[must_use]
    pub fn with_nodes(mut self, nodes: u64) -> Self {
        self.nodes = nodes;
        self
    }

    /// Returns the status.
    #[must_use]
    pub const fn status(&self) -> SolveStatus {
        self.status
    }

    /// Returns the slot of every job, or an empty slice if there is no solution.
    #[must_use]
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Returns the number of explored search nodes.
    #[must_use]
    pub const fn nodes(&self) -> u64 {
        self.nodes
    }

    /// Returns whether the solution is proven to be optimal.
    #[must_use]
    pub fn is_proven_optimal(&self) -> bool {
        self.status == SolveStatus::Optimal
    }

    /// Returns the late flag of every job.
    #[must_use]
    pub fn late_flags(&self) -> Vec<bool> {
        let iter = self.slots.iter().zip(&self.model.jobs);
        iter.map(|(slot, job)| job.lateness.is_late(slot.day))
            .collect()
    }

    /// Calculates the number of late jobs. Returns `None` when there is no solution.
    #[must_use]
    pub fn late_count(&self) -> Option<usize> {
        if self.status.has_solution() {
            Some(self.late_flags().into_iter().filter(|&late| late).count())
        } else {
            None
        }
    }

    /// Verifies that the solution satisfies every hard constraint:
    /// each job exactly once, no job before its release and no crew over capacity.
    #[must_use]
    pub fn verify(&self) -> bool {
        if !self.status.has_solution() {
            return self.slots.is_empty();
        }

        let model = self.model;
        if self.slots.len() != model.jobs.len() {
            return false;
        }

        let mut used = vec![0u64; model.days * model.crews];

        for (slot, job) in self.slots.iter().zip(&model.jobs) {
            if slot.day >= model.days || slot.crew >= model.crews || slot.day < job.release {
                return false;
            }
            used[slot.day * model.crews + slot.crew] += job.duration;
        }

        used.iter().all(|&used| used <= model.capacity)
    }
}
