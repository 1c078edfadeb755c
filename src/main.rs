use chrono::{NaiveDate, NaiveDateTime};
use clap::{Args, Parser, ValueEnum};
use crew_scheduling::algo::{self, SolverConfig};
use crew_scheduling::core::{last_day_of_month, parse_timestamp, workdays_in_month, JobRecord};
use crew_scheduling::core::{Scope, Solver};
use crew_scheduling::{data, run_reader, Plan};
use rand::prelude::*;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::num::NonZero;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Copy, Clone, Debug)]
struct Algorithm(usize, &'static str);

impl Algorithm {
    fn init(self, config: &SolverConfig) -> Box<dyn Solver> {
        algo::SOLVERS[self.0](config)
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.1)
    }
}

impl ValueEnum for Algorithm {
    fn value_variants<'a>() -> &'a [Self] {
        static ALGORITHMS: std::sync::LazyLock<Vec<Algorithm>> = std::sync::LazyLock::new(|| {
            let config = SolverConfig::default();
            let iter = algo::SOLVERS.iter().enumerate();
            iter.map(|(i, init)| Algorithm(i, init(&config).name())).collect()
        });

        ALGORITHMS.as_slice()
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(self.1))
    }
}

/// Planning horizon, resources and solver limits.
#[derive(Args, Debug)]
struct PlanArgs {
    /// Year of the planned month.
    #[clap(long, default_value = "2023")]
    year: i32,
    /// The planned month.
    #[clap(long, default_value = "1")]
    month: u32,
    /// Holidays within the month, comma separated.
    #[clap(long, value_delimiter = ',')]
    holidays: Vec<NaiveDate>,
    /// Number of crews.
    #[clap(long, default_value = "3")]
    crews: NonZero<usize>,
    /// Net shift length in hours.
    #[clap(long, default_value = "8")]
    shift_hours: NonZero<u64>,
    /// Time limit of the search in seconds.
    #[clap(long, default_value = "60")]
    time_limit: u64,
    /// Number of search workers.
    #[clap(long, default_value = "8")]
    workers: NonZero<usize>,
    /// Keep only the jobs of this district.
    #[clap(long)]
    district: Option<String>,
    /// Keep only the jobs due on or before this timestamp.
    #[clap(long, value_parser = parse_timestamp)]
    due_cutoff: Option<NaiveDateTime>,
}

impl PlanArgs {
    fn plan(&self) -> Plan {
        Plan {
            year: self.year,
            month: self.month,
            holidays: self.holidays.iter().copied().collect(),
            crews: self.crews.get(),
            shift_hours: self.shift_hours.get(),
            scope: Scope {
                district: self.district.clone(),
                due_cutoff: self.due_cutoff,
            },
        }
    }

    const fn config(&self) -> SolverConfig {
        SolverConfig {
            time_limit: Duration::from_secs(self.time_limit),
            workers: self.workers,
        }
    }
}

/// Application scheduling field-service jobs onto crews with the least late jobs.
#[derive(Debug, Parser)]
enum Application {
    /// Solve one job file and write the schedule.
    Run {
        algorithm: Algorithm,
        /// The job file. Read from stdin if omitted.
        input: Option<PathBuf>,
        /// Path of the schedule file.
        #[clap(short, long, default_value = "schedule.csv")]
        output: PathBuf,
        #[clap(flatten)]
        plan: PlanArgs,
    },
    /// Run benchmarks on a set of job files.
    /// The number of crews is read from the file names.
    Bench {
        /// The input directory.
        input: String,
        /// Exclude solvers.
        #[clap(short, long, value_delimiter = ',')]
        exclude: Vec<Algorithm>,
        /// Check the number of late jobs encoded in the file names.
        #[clap(short, long)]
        validate: bool,
        #[clap(flatten)]
        plan: PlanArgs,
    },
    /// Generate job files for a month.
    Gen {
        /// The number of crews.
        crews: NonZero<usize>,
        /// Ratio of the total job duration to the total crew capacity of the month.
        #[clap(short, long, default_value = "1.0")]
        load: f64,
        /// Year of the month.
        #[clap(long, default_value = "2023")]
        year: i32,
        /// The month.
        #[clap(long, default_value = "1")]
        month: u32,
        /// Net shift length in hours.
        #[clap(short, long, default_value = "8")]
        shift_hours: NonZero<u64>,
        /// Number of job files to generate.
        #[clap(short, long, default_value = "1")]
        amount: NonZero<u64>,
        /// Path to output the generated files. If the directory does not exist, it will be created.
        #[clap(short, long, default_value = "output")]
        output: String,
    },
}

fn solvers<'a>(
    exclude: &'a [Algorithm],
    config: &'a SolverConfig,
) -> impl Iterator<Item = Box<dyn Solver>> + 'a {
    let iter = algo::SOLVERS.iter().map(|init| init(config));
    iter.filter(|solver| !exclude.iter().any(|name| name.1 == solver.name()))
}

fn gen_jobs(
    workdays: &[NaiveDate],
    last_day: NaiveDate,
    capacity: u64,
    shift: u64,
    load: f64,
) -> Vec<JobRecord> {
    const HALF_HOUR: u64 = 1800;

    let mut rng = thread_rng();
    let target = (capacity as f64 * load).ceil() as u64;
    let mut jobs = Vec::new();
    let mut total = 0;

    while total < target && !workdays.is_empty() {
        let duration = rng.gen_range(1..=shift / HALF_HOUR) * HALF_HOUR;
        let start = rng.gen_range(0..workdays.len());
        let due = if rng.gen_bool(0.1) {
            last_day
        } else {
            workdays[rng.gen_range(start..workdays.len())]
        };

        jobs.push(JobRecord {
            id: jobs.len().to_string(),
            duration: Some(duration.to_string()),
            earliest_start: workdays[start].format("%Y-%m-%d 08:00:00").to_string(),
            due: due.format("%Y-%m-%d 23:59:00").to_string(),
            district: None,
        });
        total += duration;
    }

    jobs
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match Application::parse() {
        Application::Run {
            algorithm,
            input,
            output,
            plan,
        } => {
            let mut solver = algorithm.init(&plan.config());
            let outcome = match input {
                Some(input) => {
                    let reader = BufReader::new(File::open(input)?);
                    run_reader(solver.as_mut(), &plan.plan(), reader)?
                }
                None => run_reader(solver.as_mut(), &plan.plan(), std::io::stdin().lock())?,
            };

            print!("{outcome}");
            data::write_schedule(BufWriter::new(File::create(&output)?), &outcome.schedule)?;
            tracing::info!(
                path = %output.display(),
                records = outcome.schedule.records().len(),
                "schedule written"
            );
            Ok(())
        }
        Application::Bench {
            input,
            exclude,
            validate,
            plan,
        } => {
            let config = plan.config();
            for mut solver in solvers(&exclude, &config) {
                println!("{}", data::run(&input, validate, solver.as_mut(), &plan.plan())?);
            }
            Ok(())
        }
        Application::Gen {
            crews,
            load,
            year,
            month,
            shift_hours,
            amount,
            output,
        } => {
            let crews = crews.get();
            let shift = shift_hours.get().saturating_mul(3600);
            let workdays = workdays_in_month(year, month, &ahash::HashSet::default())?;
            let Some(&first) = workdays.first() else {
                anyhow::bail!("No workdays in {year}-{month}");
            };
            let capacity = u64::try_from(workdays.len() * crews)? * shift;

            let output = std::path::Path::new(&output);
            if !output.try_exists()? {
                std::fs::create_dir_all(output)?;
            }

            for i in 0..amount.get() {
                let jobs = gen_jobs(&workdays, last_day_of_month(first), capacity, shift, load);
                let filename = format!("{crews}_x_{i}.csv");
                data::write_jobs(BufWriter::new(File::create(output.join(filename))?), &jobs)?;
            }
            Ok(())
        }
    }
}
