use super::{workdays_in_month, Error};
use ahash::{HashSet, HashSetExt};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// A field-service job. Contains the duration in seconds and the dates bounding its execution.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Serialize, PartialEq)]
pub struct Job {
    pub id: String,
    pub duration: u64,
    pub earliest_start: NaiveDate,
    pub due: NaiveDate,
}

impl Job {
    /// Creates a new job.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        duration: u64,
        earliest_start: NaiveDate,
        due: NaiveDate,
    ) -> Self {
        let id = id.into();
        Self {
            id,
            duration,
            earliest_start,
            due,
        }
    }
}

/// A job as delivered by the intake, before validation.
#[derive(Clone, Debug, Deserialize, Eq, Serialize, PartialEq)]
pub struct JobRecord {
    #[serde(alias = "CALLID")]
    pub id: String,
    #[serde(alias = "DURATION")]
    pub duration: Option<String>,
    #[serde(alias = "EARLYSTART")]
    pub earliest_start: String,
    #[serde(alias = "DUEDATE")]
    pub due: String,
    #[serde(default, alias = "DISTRICT")]
    pub district: Option<String>,
}

/// Planning scope the jobs are filtered to.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Scope {
    pub district: Option<String>,
    pub due_cutoff: Option<NaiveDateTime>,
}

impl Scope {
    fn covers_district(&self, record: &JobRecord) -> bool {
        self.district.as_ref().map_or(true, |district| {
            record.district.as_ref().is_some_and(|other| other == district)
        })
    }

    fn covers_due(&self, due: NaiveDateTime) -> bool {
        self.due_cutoff.map_or(true, |cutoff| due <= cutoff)
    }
}

/// Reason of excluding a job from the run.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ExclusionReason {
    StartAfterDue,
    MissingDuration,
    InvalidDuration,
    InvalidTimestamp,
    DuplicateId,
}

impl Display for ExclusionReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            Self::StartAfterDue => "earliest start after due date",
            Self::MissingDuration => "missing duration",
            Self::InvalidDuration => "invalid duration",
            Self::InvalidTimestamp => "invalid timestamp",
            Self::DuplicateId => "duplicate id",
        };
        f.write_str(reason)
    }
}

/// A job excluded from the run.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Exclusion {
    pub id: String,
    pub reason: ExclusionReason,
}

/// Result of the intake. Valid jobs in input order and the excluded ones.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Intake {
    pub jobs: Vec<Job>,
    pub excluded: Vec<Exclusion>,
    pub out_of_scope: usize,
}

impl Intake {
    /// Validates the records and keeps the ones within the scope.
    /// Invalid records are excluded and reported, they never fail the whole batch.
    pub fn new(records: impl IntoIterator<Item = JobRecord>, scope: &Scope) -> Self {
        let mut intake = Self::default();
        let mut seen = HashSet::new();

        for record in records {
            if !scope.covers_district(&record) {
                intake.out_of_scope += 1;
                continue;
            }

            let (Ok(earliest_start), Ok(due)) = (
                parse_timestamp(&record.earliest_start),
                parse_timestamp(&record.due),
            ) else {
                intake.exclude(record.id, ExclusionReason::InvalidTimestamp);
                continue;
            };

            if !scope.covers_due(due) {
                intake.out_of_scope += 1;
                continue;
            }

            let duration = match parse_duration(record.duration.as_deref()) {
                Ok(duration) => duration,
                Err(reason) => {
                    intake.exclude(record.id, reason);
                    continue;
                }
            };

            if earliest_start.date() > due.date() {
                intake.exclude(record.id, ExclusionReason::StartAfterDue);
                continue;
            }

            if !seen.insert(record.id.clone()) {
                intake.exclude(record.id, ExclusionReason::DuplicateId);
                continue;
            }

            let job = Job::new(record.id, duration, earliest_start.date(), due.date());
            intake.jobs.push(job);
        }

        intake
    }

    fn exclude(&mut self, id: String, reason: ExclusionReason) {
        tracing::warn!(job = %id, %reason, "job excluded");
        self.excluded.push(Exclusion { id, reason });
    }
}

/// Parses a positive duration in seconds. Whole numbers written with a zero fraction
/// such as `5400.0` are accepted.
fn parse_duration(value: Option<&str>) -> Result<u64, ExclusionReason> {
    let value = value.map(str::trim).unwrap_or_default();
    if value.is_empty() {
        return Err(ExclusionReason::MissingDuration);
    }

    let whole = match value.split_once('.') {
        Some((whole, fraction)) if fraction.bytes().all(|digit| digit == b'0') => whole,
        Some(_) => return Err(ExclusionReason::InvalidDuration),
        None => value,
    };

    match whole.parse::<u64>() {
        Ok(0) => Err(ExclusionReason::MissingDuration),
        Ok(duration) => Ok(duration),
        Err(_) => Err(ExclusionReason::InvalidDuration),
    }
}

/// Parses a timestamp in one of the accepted formats.
/// Dates without time are treated as midnight.
///
/// # Errors
/// - If the timestamp matches none of the formats.
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, Error> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
    ];

    let value = value.trim();

    FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| Error::InvalidTimestamp(value.into()))
}

/// An instance of the crew scheduling problem.
/// Workdays are ordered chronologically, the capacity is the net shift duration in seconds.
#[non_exhaustive]
#[derive(Clone, Debug, Deserialize, Eq, Serialize, PartialEq)]
pub struct Instance {
    pub workdays: Vec<NaiveDate>,
    pub crews: usize,
    pub capacity: u64,
    pub jobs: Vec<Job>,
}

impl Instance {
    /// Creates a new instance over the given workdays.
    ///
    /// # Errors
    /// - If there are no crews.
    /// - If the capacity is zero.
    pub fn new(
        mut workdays: Vec<NaiveDate>,
        crews: usize,
        capacity: u64,
        jobs: Vec<Job>,
    ) -> Result<Self, Error> {
        if crews == 0 {
            return Err(Error::EmptyCrew);
        }
        if capacity == 0 {
            return Err(Error::ZeroCapacity);
        }

        workdays.sort_unstable();
        workdays.dedup();

        Ok(Self {
            workdays,
            crews,
            capacity,
            jobs,
        })
    }

    /// Creates a new instance spanning the workdays of the given month.
    ///
    /// # Errors
    /// - If the calendar input is invalid.
    /// - If there are no crews or the shift is empty.
    pub fn for_month(
        year: i32,
        month: u32,
        holidays: &HashSet<NaiveDate>,
        crews: usize,
        shift_hours: u64,
        jobs: Vec<Job>,
    ) -> Result<Self, Error> {
        let workdays = workdays_in_month(year, month, holidays)?;
        Self::new(workdays, crews, shift_hours.saturating_mul(3600), jobs)
    }
}
