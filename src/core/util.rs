use super::{JobModel, Model, Slot};
use std::cmp::Ordering;
use std::ops::Range;

/// Job model with its index.
pub type JobWithId = (usize, JobModel);

/// Compares two jobs by urgency.
/// Jobs turning late sooner come first, ties are broken by longer duration and then by release.
#[must_use]
pub fn urgency_comparator(days: usize, first: &JobWithId, second: &JobWithId) -> Ordering {
    let key = |job: &JobModel| job.lateness.first_late_day(days);
    key(&first.1)
        .cmp(&key(&second.1))
        .then_with(|| second.1.duration.cmp(&first.1.duration))
        .then_with(|| first.1.release.cmp(&second.1.release))
        .then_with(|| first.0.cmp(&second.0))
}

/// Used capacity of every `(day, crew)` pair, stored in one flat arena.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Loads {
    crews: usize,
    capacity: u64,
    used: Vec<u64>,
}

impl Loads {
    /// Creates empty loads for the model.
    #[must_use]
    pub fn new(model: &Model) -> Self {
        Self {
            crews: model.crews,
            capacity: model.capacity,
            used: vec![0; model.days * model.crews],
        }
    }

    const fn index(&self, slot: Slot) -> usize {
        slot.day * self.crews + slot.crew
    }

    /// Returns the free capacity of a slot.
    #[must_use]
    pub fn free(&self, slot: Slot) -> u64 {
        self.capacity - self.used[self.index(slot)]
    }

    /// Returns whether a job of the given duration fits into a slot.
    #[must_use]
    pub fn fits(&self, slot: Slot, duration: u64) -> bool {
        self.free(slot) >= duration
    }

    /// Returns whether a lower crew of the same day has exactly the same load.
    /// Crews are identical, so such a slot leads to a search state already covered.
    #[must_use]
    pub fn is_symmetric(&self, slot: Slot) -> bool {
        let day = slot.day * self.crews;
        let used = self.used[day + slot.crew];
        self.used[day..day + slot.crew].contains(&used)
    }

    /// Returns the fitting crew with the least free capacity left on the given day.
    #[must_use]
    pub fn best_fit(&self, day: usize, duration: u64) -> Option<usize> {
        (0..self.crews)
            .map(|crew| (crew, self.free(Slot::new(day, crew))))
            .filter(|&(_, free)| free >= duration)
            .min_by_key(|&(crew, free)| (free, crew))
            .map(|(crew, _)| crew)
    }

    /// Returns the total free capacity over the given days.
    #[must_use]
    pub fn free_in(&self, days: Range<usize>) -> u64 {
        let arena = &self.used[days.start * self.crews..days.end * self.crews];
        arena.iter().map(|&used| self.capacity - used).sum()
    }

    /// Returns the largest free capacity of a single slot over the given days.
    #[must_use]
    pub fn largest_free_in(&self, days: Range<usize>) -> u64 {
        let arena = &self.used[days.start * self.crews..days.end * self.crews];
        arena.iter().map(|&used| self.capacity - used).max().unwrap_or_default()
    }

    fn add(&mut self, slot: Slot, duration: u64) {
        let index = self.index(slot);
        self.used[index] += duration;
    }

    fn sub(&mut self, slot: Slot, duration: u64) {
        let index = self.index(slot);
        self.used[index] -= duration;
    }
}

/// A partial assignment of jobs to slots with the loads and late count it implies.
#[derive(Clone, Debug)]
pub struct PartialAssignment<'a> {
    model: &'a Model,
    slots: Vec<Option<Slot>>,
    loads: Loads,
    late: usize,
    assigned: usize,
}

impl<'a> PartialAssignment<'a> {
    /// Creates an empty assignment.
    #[must_use]
    pub fn new(model: &'a Model) -> Self {
        Self {
            model,
            slots: vec![None; model.jobs.len()],
            loads: Loads::new(model),
            late: 0,
            assigned: 0,
        }
    }

    /// Assigns a job to a slot.
    /// The job must be unassigned and fit into the slot.
    pub fn assign(&mut self, job: usize, slot: Slot) {
        debug_assert!(self.slots[job].is_none());
        debug_assert!(self.loads.fits(slot, self.model.jobs[job].duration));

        let model = self.model.jobs[job];
        self.loads.add(slot, model.duration);
        self.late += usize::from(model.lateness.is_late(slot.day));
        self.assigned += 1;
        self.slots[job] = Some(slot);
    }

    /// Removes a job from its slot.
    pub fn unassign(&mut self, job: usize) {
        if let Some(slot) = self.slots[job].take() {
            let model = self.model.jobs[job];
            self.loads.sub(slot, model.duration);
            self.late -= usize::from(model.lateness.is_late(slot.day));
            self.assigned -= 1;
        }
    }

    /// Removes every job.
    pub fn clear(&mut self) {
        for job in 0..self.slots.len() {
            self.unassign(job);
        }
    }

    /// Returns whether the job is assigned.
    #[must_use]
    pub fn is_assigned(&self, job: usize) -> bool {
        self.slots[job].is_some()
    }

    /// Returns the loads.
    #[must_use]
    pub const fn loads(&self) -> &Loads {
        &self.loads
    }

    /// Returns the number of late jobs among the assigned ones.
    #[must_use]
    pub const fn late(&self) -> usize {
        self.late
    }

    /// Returns whether every job is assigned.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.assigned == self.slots.len()
    }

    /// Returns the slots if every job is assigned.
    #[must_use]
    pub fn to_slots(&self) -> Option<Vec<Slot>> {
        self.slots.iter().copied().collect()
    }
}
