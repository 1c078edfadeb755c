use super::Instance;
use std::ops::Range;

/// Lateness of a job expressed over workday indices.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Lateness {
    /// Every workday of the horizon is on or before the due date.
    Never,
    /// The job is late when assigned to this workday index or any later one.
    From(usize),
}

impl Lateness {
    /// Returns whether the job is late on the given day.
    #[must_use]
    pub const fn is_late(self, day: usize) -> bool {
        match self {
            Self::Never => false,
            Self::From(first) => day >= first,
        }
    }

    /// Returns the first late day or the horizon length if the job is never late.
    #[must_use]
    pub const fn first_late_day(self, days: usize) -> usize {
        match self {
            Self::Never => days,
            Self::From(first) => first,
        }
    }
}

/// A job reduced to workday indices.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct JobModel {
    pub duration: u64,
    /// First workday index on or after the earliest start. Equal to the horizon length
    /// when the job cannot be started within the horizon.
    pub release: usize,
    pub lateness: Lateness,
}

/// The constraint model of an instance.
///
/// The decision `assign[j][d][c]` is represented implicitly: job `j` may take any
/// `(d, c)` with `d` within [`Model::allowed_days`] and every `(d, c)` has the same capacity.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Model {
    pub days: usize,
    pub crews: usize,
    pub capacity: u64,
    pub jobs: Vec<JobModel>,
}

impl Model {
    /// Builds the model of the given instance.
    #[must_use]
    pub fn new(instance: &Instance) -> Self {
        let workdays = &instance.workdays;

        let jobs = instance
            .jobs
            .iter()
            .map(|job| {
                let release = workdays.partition_point(|&day| day < job.earliest_start);
                let first_late = workdays.partition_point(|&day| day <= job.due);
                let lateness = if first_late < workdays.len() {
                    Lateness::From(first_late)
                } else {
                    Lateness::Never
                };
                JobModel {
                    duration: job.duration,
                    release,
                    lateness,
                }
            })
            .collect();

        let model = Self {
            days: workdays.len(),
            crews: instance.crews,
            capacity: instance.capacity,
            jobs,
        };

        tracing::debug!(
            jobs = model.jobs.len(),
            days = model.days,
            crews = model.crews,
            variables = model.variable_count(),
            "model built"
        );

        model
    }

    /// Returns the days a job may be assigned to.
    #[must_use]
    pub fn allowed_days(&self, job: usize) -> Range<usize> {
        self.jobs[job].release..self.days
    }

    /// Returns the days a job is on time.
    #[must_use]
    pub fn on_time_days(&self, job: usize) -> Range<usize> {
        let model = self.jobs[job];
        model.release..model.lateness.first_late_day(self.days)
    }

    /// Returns whether the job is late on every allowed day.
    #[must_use]
    pub fn is_forced_late(&self, job: usize) -> bool {
        self.on_time_days(job).is_empty()
    }

    /// Returns the jobs that cannot be placed on any `(day, crew)` pair,
    /// because their release is past the horizon or they exceed the crew capacity.
    #[must_use]
    pub fn unplaceable(&self) -> Vec<usize> {
        let iter = self.jobs.iter().enumerate();
        iter.filter(|(_, job)| job.release >= self.days || job.duration > self.capacity)
            .map(|(j, _)| j)
            .collect()
    }

    /// Returns the number of boolean decisions `assign[j][d][c]` left after release filtering.
    #[must_use]
    pub fn variable_count(&self) -> usize {
        let iter = self.jobs.iter();
        iter.map(|job| self.days.saturating_sub(job.release) * self.crews)
            .sum()
    }
}
