#![deny(clippy::all, clippy::cargo, clippy::expect_used, clippy::unwrap_used)]
#![deny(clippy::pedantic, clippy::nursery, unsafe_code)]
#![warn(clippy::unimplemented, clippy::redundant_type_annotations)]

use ahash::HashSet;
use anyhow::Result;
use chrono::NaiveDate;
use crate::core::{Exclusion, Instance, Intake, JobRecord, Model, Schedule, Scope};
use crate::core::{SolveStatus, Solver};
use std::fmt::{Display, Formatter};
use std::io::Read;

pub mod algo;
pub mod core;
pub mod data;

/// Planning horizon and resources of a run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Plan {
    pub year: i32,
    pub month: u32,
    pub holidays: HashSet<NaiveDate>,
    pub crews: usize,
    pub shift_hours: u64,
    pub scope: Scope,
}

impl Default for Plan {
    fn default() -> Self {
        Self {
            year: 2023,
            month: 1,
            holidays: HashSet::default(),
            crews: 3,
            shift_hours: 8,
            scope: Scope::default(),
        }
    }
}

/// Result of a run: the schedule and what is reported about it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Outcome {
    pub status: SolveStatus,
    pub late: Option<usize>,
    pub nodes: u64,
    pub jobs: usize,
    pub excluded: Vec<Exclusion>,
    pub out_of_scope: usize,
    pub schedule: Schedule,
}

impl Outcome {
    /// Returns whether the number of late jobs is proven minimal.
    #[must_use]
    pub fn is_proven(&self) -> bool {
        self.status == SolveStatus::Optimal
    }
}

impl Display for Outcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Status: {}", self.status)?;
        writeln!(f, "Jobs: {} ({} out of scope)", self.jobs, self.out_of_scope)?;
        match self.late {
            Some(late) => writeln!(f, "Late jobs: {late} (proven minimal: {})", self.is_proven())?,
            None => writeln!(f, "Late jobs: -")?,
        }
        writeln!(f, "Nodes: {}", self.nodes)?;
        for exclusion in &self.excluded {
            writeln!(f, "Excluded {}: {}", exclusion.id, exclusion.reason)?;
        }
        Ok(())
    }
}

/// Validates the records, builds the instance of the plan and solves it.
///
/// # Errors
/// - If the plan describes no valid calendar or resources.
///
/// # Panics
/// - If the solution is invalid in debug mode.
pub fn solve(solver: &mut dyn Solver, plan: &Plan, records: Vec<JobRecord>) -> Result<Outcome> {
    let intake = Intake::new(records, &plan.scope);
    let jobs = intake.jobs.len();
    let instance = Instance::for_month(
        plan.year,
        plan.month,
        &plan.holidays,
        plan.crews,
        plan.shift_hours,
        intake.jobs,
    )?;

    let model = Model::new(&instance);
    let solution = solver.solve(&model);

    debug_assert!(solution.verify(), "Solution is invalid: {solution:?}");

    tracing::info!(
        solver = solver.name(),
        status = %solution.status(),
        late = ?solution.late_count(),
        nodes = solution.nodes(),
        "solved"
    );

    Ok(Outcome {
        status: solution.status(),
        late: solution.late_count(),
        nodes: solution.nodes(),
        jobs,
        excluded: intake.excluded,
        out_of_scope: intake.out_of_scope,
        schedule: Schedule::extract(&instance, &solution),
    })
}

/// Runs the given solver on the jobs read from reader.
///
/// # Errors
/// - If the jobs could not be read from the reader.
/// - If the plan describes no valid calendar or resources.
///
/// # Panics
/// - If the solution is invalid in debug mode.
pub fn run_reader(solver: &mut dyn Solver, plan: &Plan, reader: impl Read) -> Result<Outcome> {
    let records = data::read_jobs(reader)?;
    solve(solver, plan, records)
}
