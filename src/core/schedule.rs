use super::{Instance, Solution};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A scheduled job. Field order is the column order of the persisted schedule.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct ScheduleRecord {
    pub job_id: String,
    pub earliest_start_date: NaiveDate,
    pub due_date: NaiveDate,
    pub scheduled_date: NaiveDate,
}

impl ScheduleRecord {
    /// Returns whether the job is scheduled after its due date.
    #[must_use]
    pub fn is_late(&self) -> bool {
        self.scheduled_date > self.due_date
    }
}

/// The schedule of a run. One record per job in job input order, or nothing at all.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Schedule {
    records: Vec<ScheduleRecord>,
}

impl Schedule {
    /// Extracts the schedule from a solution of the given instance.
    /// Returns an empty schedule if the solution carries no assignment.
    #[must_use]
    pub fn extract(instance: &Instance, solution: &Solution) -> Self {
        if !solution.status().has_solution() {
            return Self::default();
        }

        let iter = instance.jobs.iter().zip(solution.slots());
        let records = iter
            .map(|(job, slot)| ScheduleRecord {
                job_id: job.id.clone(),
                earliest_start_date: job.earliest_start,
                due_date: job.due,
                scheduled_date: instance.workdays[slot.day],
            })
            .collect();

        Self { records }
    }

    /// Returns the records.
    #[must_use]
    pub fn records(&self) -> &[ScheduleRecord] {
        &self.records
    }

    /// Returns whether the schedule is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the number of late jobs.
    #[must_use]
    pub fn late_count(&self) -> usize {
        self.records.iter().filter(|record| record.is_late()).count()
    }
}
