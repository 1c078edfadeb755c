use super::bound::Bounds;
use crate::core::{urgency_comparator, JobWithId, Model, PartialAssignment, Slot, Solution};
use crate::core::{SolveStatus, Solver};

/// Simple list scheduling algorithm.
/// Jobs are taken by urgency and put on the earliest day with a crew able to take them,
/// picking the fullest such crew. Returns `None` if some job fits nowhere.
pub(super) fn assign(model: &Model) -> Option<PartialAssignment> {
    let mut assignment = PartialAssignment::new(model);

    let mut jobs: Vec<JobWithId> = model.jobs.iter().copied().enumerate().collect();
    jobs.sort_unstable_by(|first, second| urgency_comparator(model.days, first, second));

    for (id, job) in jobs {
        let loads = assignment.loads();
        let slot = model.allowed_days(id).find_map(|day| {
            let crew = loads.best_fit(day, job.duration);
            crew.map(|crew| Slot::new(day, crew))
        })?;

        assignment.assign(id, slot);
    }

    Some(assignment)
}

/// Simple list scheduling algorithm.
/// The solution is reported optimal only when it meets the root lower bound.
#[derive(Clone, Debug, Default)]
pub struct List;

impl Solver for List {
    fn solve<'a>(&mut self, model: &'a Model) -> Solution<'a> {
        if !model.unplaceable().is_empty() {
            return Solution::empty(model, SolveStatus::Infeasible);
        }

        let Some(assignment) = assign(model) else {
            return Solution::empty(model, SolveStatus::Unknown);
        };
        let Some(slots) = assignment.to_slots() else {
            unreachable!("List scheduling assigns every job");
        };

        let bound = Bounds::new(model).lower(&PartialAssignment::new(model));
        let status = if assignment.late() <= bound {
            SolveStatus::Optimal
        } else {
            SolveStatus::Feasible
        };

        Solution::found(model, status, slots).with_nodes(1)
    }

    fn exact(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "List"
    }
}

#[allow(unsafe_code)]
#[linkme::distributed_slice(super::SOLVERS)]
static INSTANCE: fn(&super::SolverConfig) -> Box<dyn Solver> = |_| Box::new(List);
