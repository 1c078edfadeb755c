mod run;

pub use run::*;

use crate::core::{JobRecord, Schedule};
use anyhow::Result;
use std::io::{Read, Write};

/// Columns of the persisted schedule.
pub const SCHEDULE_HEADER: [&str; 4] =
    ["job_id", "earliest_start_date", "due_date", "scheduled_date"];

/// Reads job records from CSV with a header row.
///
/// # Errors
/// - If the CSV is malformed or a required column is missing.
pub fn read_jobs(reader: impl Read) -> Result<Vec<JobRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let records = reader.deserialize().collect::<Result<Vec<JobRecord>, _>>()?;
    Ok(records)
}

/// Writes job records as CSV with a header row.
///
/// # Errors
/// - If writing fails.
pub fn write_jobs(writer: impl Write, records: &[JobRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes the schedule as CSV. The header is written even for an empty schedule.
///
/// # Errors
/// - If writing fails.
pub fn write_schedule(writer: impl Write, schedule: &Schedule) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    writer.write_record(SCHEDULE_HEADER)?;
    for record in schedule.records() {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::{Instance, Job, Model, Slot, Solution, SolveStatus};
    use chrono::NaiveDate;

    #[test]
    fn jobs_should_read_both_header_styles() -> Result<()> {
        let native = "id,duration,earliest_start,due\n\
                      A,3600,2023-01-03,2023-01-10\n\
                      B,,2023-01-03,2023-01-10\n";
        let records = read_jobs(native.as_bytes())?;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].duration.as_deref(), Some("3600"));
        assert_eq!(records[1].duration, None);
        assert_eq!(records[1].district, None);

        let legacy = "CALLID,DURATION,EARLYSTART,DUEDATE,DISTRICT\n\
                      7, 5400 ,2023-01-03 08:00:00,2023-04-30 23:59:00,METRO-ELECTRIC\n";
        let records = read_jobs(legacy.as_bytes())?;
        assert_eq!(records[0].id, "7");
        assert_eq!(records[0].duration.as_deref(), Some("5400"));
        assert_eq!(records[0].district.as_deref(), Some("METRO-ELECTRIC"));
        Ok(())
    }

    #[test]
    fn malformed_durations_do_not_fail_reading() -> Result<()> {
        let jobs = "id,duration,earliest_start,due\n\
                    A,3600,2023-01-03,2023-01-10\n\
                    B,5400.0,2023-01-03,2023-01-10\n\
                    C,-60,2023-01-03,2023-01-10\n";
        let records = read_jobs(jobs.as_bytes())?;
        let durations: Vec<_> = records.iter().map(|record| record.duration.as_deref()).collect();
        assert_eq!(durations, [Some("3600"), Some("5400.0"), Some("-60")]);
        Ok(())
    }

    #[test]
    fn jobs_should_round_trip() -> Result<()> {
        let jobs = "id,duration,earliest_start,due,district\nA,60,2023-01-03,2023-01-04,N\n";
        let records = read_jobs(jobs.as_bytes())?;
        let mut buffer = Vec::new();
        write_jobs(&mut buffer, &records)?;
        assert_eq!(read_jobs(buffer.as_slice())?, records);
        Ok(())
    }

    #[test]
    fn schedule_columns_are_ordered() -> Result<()> {
        let date = |day| NaiveDate::from_ymd_opt(2023, 1, day).unwrap_or_default();
        let jobs = vec![Job::new("A", 60, date(3), date(3))];
        let instance = Instance::new(vec![date(3), date(4)], 1, 60, jobs)?;
        let model = Model::new(&instance);
        let solution = Solution::found(&model, SolveStatus::Optimal, vec![Slot::new(1, 0)]);

        let mut buffer = Vec::new();
        write_schedule(&mut buffer, &Schedule::extract(&instance, &solution))?;
        assert_eq!(
            String::from_utf8(buffer)?,
            "job_id,earliest_start_date,due_date,scheduled_date\n\
             A,2023-01-03,2023-01-03,2023-01-04\n"
        );

        let mut buffer = Vec::new();
        write_schedule(&mut buffer, &Schedule::default())?;
        assert_eq!(
            String::from_utf8(buffer)?,
            "job_id,earliest_start_date,due_date,scheduled_date\n"
        );
        Ok(())
    }
}
