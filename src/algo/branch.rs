use super::bound::Bounds;
use super::SolverConfig;
use crate::core::{urgency_comparator, JobWithId, Model, PartialAssignment, Slot, Solution};
use crate::core::{SolveStatus, Solver};
use parking_lot::Mutex;
use rayon::prelude::*;
use std::num::NonZero;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// The deadline is checked once per this many explored nodes.
const CHECK_INTERVAL: u64 = 64;

/// Number of subtrees created per worker before the search starts.
const SUBTREES_PER_WORKER: usize = 8;

/// Maximum depth of the initial split into subtrees.
const MAX_SPLIT_DEPTH: usize = 4;

/// Best objective value while no solution is known.
const NO_SOLUTION: usize = usize::MAX;

/// Parallel branch-and-bound.
///
/// Jobs are decided one per depth in order of urgency. Every decision takes one `(day, crew)`
/// slot of the job, days in chronological order so on-time slots are tried before late ones.
/// Slots of crews with the same load as a lower crew on that day are skipped.
/// A node is pruned when the capacity left cannot take the remaining jobs
/// or when its lower bound reaches the best known late count.
///
/// The tree is split into subtrees explored by a pool of workers. Workers share the best
/// late count through an atomic and the best assignment through a lock.
#[derive(Clone, Debug)]
pub struct BranchAndBound {
    time_limit: Duration,
    workers: NonZero<usize>,
}

impl BranchAndBound {
    /// Creates a new solver stopping after the time limit.
    #[must_use]
    pub const fn new(time_limit: Duration, workers: NonZero<usize>) -> Self {
        Self {
            time_limit,
            workers,
        }
    }
}

impl Default for BranchAndBound {
    fn default() -> Self {
        let config = SolverConfig::default();
        Self::new(config.time_limit, config.workers)
    }
}

impl Solver for BranchAndBound {
    fn solve<'a>(&mut self, model: &'a Model) -> Solution<'a> {
        let deadline = Instant::now().checked_add(self.time_limit);

        let unplaceable = model.unplaceable();
        if !unplaceable.is_empty() {
            tracing::info!(jobs = ?unplaceable, "jobs cannot be placed on any workday");
            return Solution::empty(model, SolveStatus::Infeasible);
        }

        let bounds = Bounds::new(model);
        let root = PartialAssignment::new(model);
        if !bounds.is_feasible(&root) {
            tracing::info!("remaining capacity cannot take the jobs");
            return Solution::empty(model, SolveStatus::Infeasible);
        }

        let root_bound = bounds.lower(&root);
        let shared = Shared::new(model, bounds, root_bound, deadline);

        if let Some(assignment) = super::list::assign(model) {
            shared.offer(&assignment);
        }

        tracing::info!(
            jobs = model.jobs.len(),
            root_bound,
            initial = shared.best.load(Ordering::Acquire),
            workers = self.workers.get(),
            "branch and bound started"
        );

        if !shared.stop.load(Ordering::Acquire) {
            let subtrees = split(&shared, self.workers.get() * SUBTREES_PER_WORKER);
            tracing::debug!(subtrees = subtrees.len(), "search tree split");

            let search = || {
                subtrees.par_iter().for_each_init(
                    || Worker::new(&shared),
                    |worker, prefix| {
                        if !shared.stop.load(Ordering::Acquire) {
                            worker.run(prefix);
                        }
                    },
                );
            };

            match rayon::ThreadPoolBuilder::new()
                .num_threads(self.workers.get())
                .build()
            {
                Ok(pool) => pool.install(search),
                Err(err) => {
                    tracing::warn!(error = %err, "cannot build worker pool, using the global one");
                    search();
                }
            }
        }

        shared.into_solution()
    }

    fn name(&self) -> &'static str {
        "BranchAndBound"
    }
}

#[allow(unsafe_code)]
#[linkme::distributed_slice(super::SOLVERS)]
static INSTANCE: fn(&SolverConfig) -> Box<dyn Solver> =
    |config| Box::new(BranchAndBound::new(config.time_limit, config.workers));

/// Search state shared by the workers. The model, order and bounds are read-only.
struct Shared<'a> {
    model: &'a Model,
    order: Vec<usize>,
    bounds: Bounds<'a>,
    root_bound: usize,
    deadline: Option<Instant>,
    best: AtomicUsize,
    incumbent: Mutex<Option<Vec<Slot>>>,
    stop: AtomicBool,
    timed_out: AtomicBool,
    nodes: AtomicU64,
}

impl<'a> Shared<'a> {
    fn new(
        model: &'a Model,
        bounds: Bounds<'a>,
        root_bound: usize,
        deadline: Option<Instant>,
    ) -> Self {
        let mut jobs: Vec<JobWithId> = model.jobs.iter().copied().enumerate().collect();
        jobs.sort_unstable_by(|first, second| urgency_comparator(model.days, first, second));

        Self {
            model,
            order: jobs.into_iter().map(|(id, _)| id).collect(),
            bounds,
            root_bound,
            deadline,
            best: AtomicUsize::new(NO_SOLUTION),
            incumbent: Mutex::new(None),
            stop: AtomicBool::new(false),
            timed_out: AtomicBool::new(false),
            nodes: AtomicU64::new(0),
        }
    }

    fn best(&self) -> usize {
        self.best.load(Ordering::Acquire)
    }

    /// Replaces the incumbent if the complete assignment has fewer late jobs.
    /// Stops the search once the root bound is met.
    fn offer(&self, assignment: &PartialAssignment) -> bool {
        let late = assignment.late();
        if late >= self.best() {
            return false;
        }

        let Some(slots) = assignment.to_slots() else {
            return false;
        };

        let mut incumbent = self.incumbent.lock();
        if late >= self.best() {
            return false;
        }
        *incumbent = Some(slots);
        self.best.store(late, Ordering::Release);
        drop(incumbent);

        tracing::debug!(late, "incumbent improved");

        if late <= self.root_bound {
            self.stop.store(true, Ordering::Release);
        }

        true
    }

    /// Returns whether the workers should stop. Checks the deadline every few nodes.
    fn should_stop(&self, nodes: u64) -> bool {
        if self.stop.load(Ordering::Acquire) {
            return true;
        }

        let check = nodes % CHECK_INTERVAL == 0;
        if check && self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            self.timed_out.store(true, Ordering::Release);
            self.stop.store(true, Ordering::Release);
            return true;
        }

        false
    }

    fn into_solution(self) -> Solution<'a> {
        let timed_out = self.timed_out.load(Ordering::Acquire);
        let best = self.best.load(Ordering::Acquire);
        let nodes = self.nodes.load(Ordering::Acquire);
        let model = self.model;

        let solution = match self.incumbent.into_inner() {
            Some(slots) if !timed_out || best <= self.root_bound => {
                Solution::found(model, SolveStatus::Optimal, slots)
            }
            Some(slots) => Solution::found(model, SolveStatus::Feasible, slots),
            None if timed_out => Solution::empty(model, SolveStatus::Unknown),
            None => Solution::empty(model, SolveStatus::Infeasible),
        };

        tracing::info!(
            status = %solution.status(),
            late = ?solution.late_count(),
            nodes,
            "branch and bound finished"
        );

        solution.with_nodes(nodes)
    }
}

/// A decision of the job at `depth` of the order. `cursor` indexes the next slot to try.
#[derive(Clone, Copy, Debug)]
struct Frame {
    depth: usize,
    cursor: usize,
}

/// A search worker owning its partial assignment and stack of frames.
struct Worker<'s, 'a> {
    shared: &'s Shared<'a>,
    assignment: PartialAssignment<'a>,
    frames: Vec<Frame>,
    nodes: u64,
}

impl<'s, 'a> Worker<'s, 'a> {
    fn new(shared: &'s Shared<'a>) -> Self {
        Self {
            shared,
            assignment: PartialAssignment::new(shared.model),
            frames: Vec::with_capacity(shared.order.len()),
            nodes: 0,
        }
    }

    /// Replaces the assignment with the given prefix of decisions.
    fn load(&mut self, prefix: &[Slot]) {
        self.assignment.clear();
        for (&job, &slot) in self.shared.order.iter().zip(prefix) {
            self.assignment.assign(job, slot);
        }
    }

    /// Explores the subtree below the prefix.
    fn run(&mut self, prefix: &[Slot]) {
        self.load(prefix);
        if self.promising() {
            self.explore(prefix.len());
        }
        self.shared.nodes.fetch_add(self.nodes, Ordering::Relaxed);
        self.nodes = 0;
    }

    /// Returns whether the current node may lead to a better solution.
    fn promising(&self) -> bool {
        let bounds = &self.shared.bounds;
        bounds.lower(&self.assignment) < self.shared.best() && bounds.is_feasible(&self.assignment)
    }

    /// Returns the next slot the job may take, starting at the cursor.
    /// Stops at late slots once a late job cannot beat the best known solution.
    fn next_slot(&self, job: usize, cursor: &mut usize) -> Option<Slot> {
        let model = self.shared.model;
        let job_model = model.jobs[job];
        let loads = self.assignment.loads();
        let total = model.allowed_days(job).len() * model.crews;

        while *cursor < total {
            let slot = Slot::new(job_model.release + *cursor / model.crews, *cursor % model.crews);
            *cursor += 1;

            let late = job_model.lateness.is_late(slot.day);
            if late && self.assignment.late() + 1 >= self.shared.best() {
                return None;
            }

            if loads.fits(slot, job_model.duration) && !loads.is_symmetric(slot) {
                return Some(slot);
            }
        }

        None
    }

    /// Depth-first search over the frames starting at the given depth.
    fn explore(&mut self, depth: usize) {
        let shared = self.shared;
        let order = &shared.order;

        if depth == order.len() {
            shared.offer(&self.assignment);
            return;
        }

        self.frames.clear();
        self.frames.push(Frame { depth, cursor: 0 });

        while let Some(&Frame { depth, mut cursor }) = self.frames.last() {
            if shared.should_stop(self.nodes) {
                self.unwind();
                return;
            }
            self.nodes += 1;

            let job = order[depth];
            self.assignment.unassign(job);

            let slot = self.next_slot(job, &mut cursor);
            if let Some(frame) = self.frames.last_mut() {
                frame.cursor = cursor;
            }

            let Some(slot) = slot else {
                self.frames.pop();
                continue;
            };

            self.assignment.assign(job, slot);

            if !self.promising() {
                continue;
            }

            if depth + 1 == order.len() {
                shared.offer(&self.assignment);
            } else {
                self.frames.push(Frame {
                    depth: depth + 1,
                    cursor: 0,
                });
            }
        }
    }

    /// Removes the decisions of every open frame.
    fn unwind(&mut self) {
        for frame in self.frames.drain(..) {
            self.assignment.unassign(self.shared.order[frame.depth]);
        }
    }
}

/// Splits the search tree into disjoint subtrees given by prefixes of decisions.
/// Splitting stops once there are enough subtrees or the maximum depth is reached.
fn split(shared: &Shared, target: usize) -> Vec<Vec<Slot>> {
    let mut worker = Worker::new(shared);
    let mut prefixes = vec![Vec::new()];

    for depth in 0..shared.order.len().min(MAX_SPLIT_DEPTH) {
        if prefixes.len() >= target {
            break;
        }

        let job = shared.order[depth];
        let mut next = Vec::new();

        for prefix in &prefixes {
            worker.load(prefix);
            let mut cursor = 0;

            while let Some(slot) = worker.next_slot(job, &mut cursor) {
                worker.assignment.assign(job, slot);
                if worker.promising() {
                    let mut prefix = prefix.clone();
                    prefix.push(slot);
                    next.push(prefix);
                }
                worker.assignment.unassign(job);
            }
        }

        prefixes = next;
    }

    prefixes
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::{Instance, Job, JobModel, Lateness};
    use crate::data::samples;
    use chrono::{Days, NaiveDate};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const HOUR: u64 = 3600;

    fn solver() -> BranchAndBound {
        BranchAndBound::new(Duration::from_secs(30), NonZero::<usize>::MIN.saturating_add(3))
    }

    fn day(index: u64) -> NaiveDate {
        let monday = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default();
        let week = index / 5 * 7 + index % 5;
        monday.checked_add_days(Days::new(week)).unwrap_or_default()
    }

    fn instance(days: u64, crews: usize, hours: u64, jobs: Vec<Job>) -> anyhow::Result<Instance> {
        let workdays = (0..days).map(day).collect();
        Ok(Instance::new(workdays, crews, hours * HOUR, jobs)?)
    }

    fn jobs(count: usize, hours: u64, start: u64, due: u64) -> Vec<Job> {
        (0..count)
            .map(|i| Job::new(format!("J{i}"), hours * HOUR, day(start), day(due)))
            .collect()
    }

    /// Enumerates every assignment of a tiny model and returns the minimal late count.
    fn brute_force(model: &Model) -> Option<usize> {
        fn go(model: &Model, job: usize, assignment: &mut PartialAssignment) -> Option<usize> {
            if job == model.jobs.len() {
                return Some(assignment.late());
            }
            let mut best = None;
            for day in model.allowed_days(job) {
                for crew in 0..model.crews {
                    let slot = Slot::new(day, crew);
                    if assignment.loads().fits(slot, model.jobs[job].duration) {
                        assignment.assign(job, slot);
                        let late = go(model, job + 1, assignment);
                        assignment.unassign(job);
                        best = match (best, late) {
                            (Some(best), Some(late)) => Some(usize::min(best, late)),
                            (best, late) => best.or(late),
                        };
                    }
                }
            }
            best
        }

        go(model, 0, &mut PartialAssignment::new(model))
    }

    fn random_model(rng: &mut StdRng) -> Model {
        let days = rng.gen_range(1..=3);
        let jobs = (0..rng.gen_range(1..=5))
            .map(|_| {
                let release = rng.gen_range(0..days);
                let first_late = rng.gen_range(0..=days);
                JobModel {
                    duration: rng.gen_range(1..=8),
                    release,
                    lateness: if first_late == days {
                        Lateness::Never
                    } else {
                        Lateness::From(first_late)
                    },
                }
            })
            .collect();

        Model {
            days,
            crews: rng.gen_range(1..=2),
            capacity: 8,
            jobs,
        }
    }

    #[test]
    fn test_branch_and_bound() {
        assert!(samples(true, &mut solver()).is_ok());
    }

    #[test]
    fn spread_jobs_are_all_on_time() -> anyhow::Result<()> {
        let instance = instance(5, 1, 8, jobs(5, 3, 0, 4))?;
        let model = Model::new(&instance);
        let solution = solver().solve(&model);

        assert_eq!(solution.status(), SolveStatus::Optimal);
        assert_eq!(solution.late_count(), Some(0));
        assert!(solution.verify());
        Ok(())
    }

    #[test]
    fn overloaded_day_makes_one_job_late() -> anyhow::Result<()> {
        let instance = instance(2, 1, 8, jobs(3, 3, 0, 0))?;
        let model = Model::new(&instance);
        let solution = solver().solve(&model);

        assert_eq!(solution.status(), SolveStatus::Optimal);
        assert_eq!(solution.late_count(), Some(1));
        assert!(solution.verify());
        Ok(())
    }

    #[test]
    fn start_after_horizon_is_infeasible() -> anyhow::Result<()> {
        let mut jobs = jobs(2, 2, 0, 4);
        jobs.push(Job::new("late start", 2 * HOUR, day(7), day(9)));
        let instance = instance(5, 2, 8, jobs)?;
        let model = Model::new(&instance);
        let solution = solver().solve(&model);

        assert_eq!(solution.status(), SolveStatus::Infeasible);
        assert!(solution.slots().is_empty());
        assert_eq!(solution.late_count(), None);
        Ok(())
    }

    #[test]
    fn exhausted_capacity_is_infeasible() -> anyhow::Result<()> {
        let instance = instance(2, 1, 8, jobs(3, 5, 0, 1))?;
        let model = Model::new(&instance);
        assert_eq!(solver().solve(&model).status(), SolveStatus::Infeasible);
        Ok(())
    }

    #[test]
    fn zero_budget_keeps_feasible_solution() -> anyhow::Result<()> {
        let instance = instance(23, 4, 8, jobs(60, 6, 0, 9))?;
        let model = Model::new(&instance);
        let mut solver = BranchAndBound::new(Duration::ZERO, NonZero::<usize>::MIN);
        let solution = solver.solve(&model);

        assert_eq!(solution.status(), SolveStatus::Feasible);
        assert!(!solution.is_proven_optimal());
        assert_eq!(solution.slots().len(), 60);
        assert_eq!(solution.late_count(), Some(20));
        assert!(solution.verify());
        Ok(())
    }

    #[test]
    fn bin_packing_is_solved_exactly() -> anyhow::Result<()> {
        let durations = [5, 4, 3, 3, 3, 2, 2, 2];
        let jobs = durations
            .iter()
            .enumerate()
            .map(|(i, &hours)| Job::new(format!("J{i}"), hours * HOUR, day(0), day(2)))
            .collect();
        let instance = instance(5, 1, 8, jobs)?;
        let model = Model::new(&instance);
        let solution = solver().solve(&model);

        assert_eq!(solution.status(), SolveStatus::Optimal);
        assert_eq!(solution.late_count(), Some(0));
        assert!(solution.verify());
        Ok(())
    }

    #[test]
    fn more_resources_never_increase_late_jobs() -> anyhow::Result<()> {
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..20 {
            let jobs: Vec<_> = (0..8)
                .map(|i| {
                    let start = rng.gen_range(0..4);
                    let due = rng.gen_range(start..6);
                    let hours = rng.gen_range(1..=6);
                    Job::new(format!("J{i}"), hours * HOUR, day(start), day(due))
                })
                .collect();

            let mut previous = usize::MAX;
            for (days, crews) in [(6, 1), (6, 2), (8, 2), (8, 3)] {
                let instance = instance(days, crews, 8, jobs.clone())?;
                let model = Model::new(&instance);
                let solution = solver().solve(&model);

                assert!(solution.verify());
                assert_ne!(solution.status(), SolveStatus::Feasible);
                assert_ne!(solution.status(), SolveStatus::Unknown);
                let late = solution.late_count().unwrap_or(usize::MAX);
                assert!(late <= previous);
                previous = late;
            }
        }
        Ok(())
    }

    #[test]
    fn resolving_gives_same_objective() -> anyhow::Result<()> {
        let mut rng = StdRng::seed_from_u64(11);
        let jobs: Vec<_> = (0..14)
            .map(|i| {
                let start = rng.gen_range(0..5);
                let due = rng.gen_range(start..10);
                Job::new(format!("J{i}"), rng.gen_range(1..=5) * HOUR, day(start), day(due))
            })
            .collect();
        let instance = instance(10, 2, 8, jobs)?;
        let model = Model::new(&instance);

        let first = solver().solve(&model);
        let second = solver().solve(&model);

        assert_eq!(first.status(), SolveStatus::Optimal);
        assert_eq!(first.status(), second.status());
        assert_eq!(first.late_count(), second.late_count());
        Ok(())
    }

    #[test]
    fn matches_exhaustive_enumeration() {
        let mut rng = StdRng::seed_from_u64(3);

        for _ in 0..200 {
            let model = random_model(&mut rng);
            let solution = solver().solve(&model);

            match brute_force(&model) {
                Some(late) => {
                    assert_eq!(solution.status(), SolveStatus::Optimal, "{model:?}");
                    assert_eq!(solution.late_count(), Some(late), "{model:?}");
                    assert!(solution.verify());
                }
                None => assert_eq!(solution.status(), SolveStatus::Infeasible, "{model:?}"),
            }
        }
    }
}
