use super::read_jobs;
use crate::core::{Instance, Intake, Model, SolveStatus, Solver};
use crate::Plan;
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result};
use std::fs::File;
use std::io::BufReader;

/// Report of running a directory of samples.
#[derive(Debug, Deserialize, Serialize)]
pub struct Report {
    solver: String,
    entries: Vec<ReportEntry>,
}

impl Report {
    fn new(solver: String) -> Self {
        let entries = Vec::new();
        Self { solver, entries }
    }

    /// Get the solver name.
    #[must_use]
    pub fn solver_name(&self) -> &str {
        &self.solver
    }

    /// Get the entries.
    #[must_use]
    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        writeln!(f, "Solver: {}", self.solver)?;
        for entry in &self.entries {
            writeln!(f, "{entry}")?;
        }
        writeln!(f, "-------------------")
    }
}

/// Report of running a single sample.
#[non_exhaustive]
#[derive(Debug, Deserialize, Serialize)]
pub struct ReportEntry {
    pub name: String,
    pub status: SolveStatus,
    pub late: Option<usize>,
    pub nodes: u64,
    pub time: f64,
}

impl Display for ReportEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let late = self.late.map_or_else(|| "-".into(), |late| late.to_string());
        write!(
            f,
            "{}: {} with {late} late, {} nodes in {:.2} sec",
            self.name, self.status, self.nodes, self.time
        )
    }
}

/// Plan the bundled samples are written against: January 2023 with two holidays, 8 hour shifts.
fn sample_plan() -> Plan {
    let holidays = ["2023-01-02", "2023-01-16"]
        .iter()
        .filter_map(|date| date.parse().ok())
        .collect();
    Plan {
        year: 2023,
        month: 1,
        holidays,
        ..Plan::default()
    }
}

/// Run all samples in the `samples` directory.
/// Print the report to stdout.
///
/// # Arguments
/// - `valid` is true, check if the number of late jobs is the expected one.
/// - `solver` is the solver to run.
///
/// # Errors
/// - If a file cannot be read.
/// - If no samples are found.
///
/// # Panics
/// - If a solution is invalid.
/// - If the number of late jobs is incorrect and `valid` is true.
pub fn samples(valid: bool, solver: &mut dyn Solver) -> anyhow::Result<()> {
    run("samples", valid, solver, &sample_plan()).and_then(|report| {
        if report.entries.is_empty() {
            Err(anyhow!("No samples found"))
        } else {
            println!("{report}");
            Ok(())
        }
    })
}

/// Run all samples in the `dir` directory.
/// The crew count is taken from the file name, everything else from the plan.
///
/// # Arguments
/// - `valid` is true, check if the number of late jobs is the expected one.
/// - `solver` is the solver to run.
///
/// # Errors
/// - If a file cannot be read.
/// - If the plan describes no valid calendar.
///
/// # Panics
/// - If a solution is invalid.
/// - If the number of late jobs is incorrect and `valid` is true.
pub fn run(dir: &str, valid: bool, solver: &mut dyn Solver, plan: &Plan) -> anyhow::Result<Report> {
    let mut report = Report::new(solver.name().into());

    let mut files = std::fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;
    files.sort_unstable_by_key(std::fs::DirEntry::file_name);

    for file in files {
        let (name, crews, expected) = parse_filename(&file.file_name())?;

        let records = read_jobs(BufReader::new(File::open(file.path())?))?;
        let intake = Intake::new(records, &plan.scope);
        let instance = Instance::for_month(
            plan.year,
            plan.month,
            &plan.holidays,
            crews,
            plan.shift_hours,
            intake.jobs,
        )?;
        let model = Model::new(&instance);

        let time = std::time::Instant::now();
        let solution = solver.solve(&model);
        let time = time.elapsed().as_secs_f64();

        assert!(solution.verify(), "Invalid solution created for {name}");

        let late = solution.late_count();
        if valid && solver.exact() && expected.is_some() {
            assert_eq!(late, expected, "Invalid number of late jobs {name}");
        }

        let status = solution.status();
        let nodes = solution.nodes();
        report.entries.push(ReportEntry {
            name,
            status,
            late,
            nodes,
            time,
        });
    }

    Ok(report)
}

/// Splits `{crews}_{late}_{index}.csv`, where `late` is `x` when the optimum is not known.
fn parse_filename(filename: &std::ffi::OsStr) -> anyhow::Result<(String, usize, Option<usize>)> {
    static NAME_ERR: &str = "Cannot read filename";

    let name = filename.to_str().ok_or_else(|| anyhow!(NAME_ERR))?;
    let mut parts = name.split('.');
    let mut parts = parts.next().ok_or_else(|| anyhow!(NAME_ERR))?.split('_');
    let crews = parts.next().ok_or_else(|| anyhow!(NAME_ERR))?.parse()?;
    let late = match parts.next().ok_or_else(|| anyhow!(NAME_ERR))? {
        "x" => None,
        late => Some(late.parse()?),
    };
    let _: usize = parts.next().ok_or_else(|| anyhow!(NAME_ERR))?.parse()?;
    Ok((name.into(), crews, late))
}

#[cfg(test)]
mod test {
    use super::*;
    use std::ffi::OsStr;

    #[test]
    fn test_parse_filename() -> anyhow::Result<()> {
        let (name, crews, late) = parse_filename(OsStr::new("10_12_0.csv"))?;
        assert_eq!(name, "10_12_0.csv");
        assert_eq!(crews, 10);
        assert_eq!(late, Some(12));

        let (name, crews, late) = parse_filename(OsStr::new("3_x_2.csv"))?;
        assert_eq!(name, "3_x_2.csv");
        assert_eq!(crews, 3);
        assert_eq!(late, None);
        Ok(())
    }

    #[test]
    fn test_parse_filename_errors() {
        assert!(parse_filename(OsStr::new("")).is_err());
        assert!(parse_filename(OsStr::new(".csv")).is_err());
        assert!(parse_filename(OsStr::new("10.csv")).is_err());
        assert!(parse_filename(OsStr::new("10_12.csv")).is_err());
        assert!(parse_filename(OsStr::new("10_1a2_0.csv")).is_err());
        assert!(parse_filename(OsStr::new("1a0_12_0.csv")).is_err());
        assert!(parse_filename(OsStr::new("10_12_0a2.csv")).is_err());
    }

    #[test]
    fn sample_plan_skips_holidays() -> anyhow::Result<()> {
        let plan = sample_plan();
        let workdays = crate::core::workdays_in_month(plan.year, plan.month, &plan.holidays)?;
        assert_eq!(plan.holidays.len(), 2);
        assert_eq!(workdays.len(), 20);
        Ok(())
    }
}
