use crate::core::{Lateness, Model, PartialAssignment};

/// Bounds of the late job count and capacity checks for partial assignments.
#[derive(Clone, Debug)]
pub struct Bounds<'a> {
    model: &'a Model,
    /// Jobs late on every allowed day.
    forced: Vec<usize>,
    /// For every distinct first late day `t`, the other jobs turning late at or before `t`
    /// ordered by ascending duration.
    groups: Vec<(usize, Vec<usize>)>,
}

impl<'a> Bounds<'a> {
    /// Prepares the bounds of the model.
    #[must_use]
    pub fn new(model: &'a Model) -> Self {
        let forced: Vec<_> = (0..model.jobs.len())
            .filter(|&job| model.is_forced_late(job))
            .collect();

        let mut candidates: Vec<(usize, usize)> = model
            .jobs
            .iter()
            .enumerate()
            .filter(|&(job, _)| !model.is_forced_late(job))
            .filter_map(|(job, model)| match model.lateness {
                Lateness::From(first) => Some((first, job)),
                Lateness::Never => None,
            })
            .collect();
        candidates.sort_unstable();

        let mut groups: Vec<(usize, Vec<usize>)> = Vec::new();
        for (end, &(first, _)) in candidates.iter().enumerate() {
            if candidates.get(end + 1).is_some_and(|next| next.0 == first) {
                continue;
            }
            let mut jobs: Vec<_> = candidates[..=end].iter().map(|&(_, job)| job).collect();
            jobs.sort_unstable_by_key(|&job| (model.jobs[job].duration, job));
            groups.push((first, jobs));
        }

        Self {
            model,
            forced,
            groups,
        }
    }

    /// Calculates a lower bound of the late job count of every completion of the assignment.
    ///
    /// Jobs of a group can only be on time within the days before the group's first late day,
    /// so at most the shortest ones fitting into the free capacity of those days are on time.
    #[must_use]
    pub fn lower(&self, assignment: &PartialAssignment) -> usize {
        let forced = self.forced.iter();
        let forced = forced.filter(|&&job| !assignment.is_assigned(job)).count();

        let dropped = self.groups.iter().map(|(first, jobs)| {
            let loads = assignment.loads();
            let mut free = loads.free_in(0..*first);
            let largest = loads.largest_free_in(0..*first);
            let mut dropped = 0;

            for &job in jobs.iter().filter(|&&job| !assignment.is_assigned(job)) {
                let duration = self.model.jobs[job].duration;
                if duration <= largest && duration <= free {
                    free -= duration;
                } else {
                    dropped += 1;
                }
            }

            dropped
        });

        assignment.late() + forced + dropped.max().unwrap_or_default()
    }

    /// Returns whether the unassigned jobs may still fit into the capacity left.
    /// Jobs released on a day or later must fit into the free capacity of those days,
    /// and every job needs a single slot large enough within its allowed days.
    #[must_use]
    pub fn is_feasible(&self, assignment: &PartialAssignment) -> bool {
        let model = self.model;
        let loads = assignment.loads();

        let mut demand = vec![0u64; model.days + 1];
        let mut longest = vec![0u64; model.days + 1];

        for (job, job_model) in model.jobs.iter().enumerate() {
            if assignment.is_assigned(job) {
                continue;
            }
            if job_model.release >= model.days {
                return false;
            }
            demand[job_model.release] += job_model.duration;
            longest[job_model.release] = longest[job_model.release].max(job_model.duration);
        }

        let mut required = 0;
        let mut available = 0;
        let mut largest = 0;
        let mut needed = 0;

        for day in (0..model.days).rev() {
            required += demand[day];
            available += loads.free_in(day..day + 1);
            largest = largest.max(loads.largest_free_in(day..day + 1));
            needed = needed.max(longest[day]);

            if required > available || needed > largest {
                return false;
            }
        }

        true
    }
}
