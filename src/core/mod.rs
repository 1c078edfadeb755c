mod calendar;
mod error;
mod model;
mod problem;
mod schedule;
mod solution;
mod util;

pub use calendar::*;
pub use error::*;
pub use model::*;
pub use problem::*;
pub use schedule::*;
pub use solution::*;
pub use util::*;

/// Solves the constraint model of an instance.
pub trait Solver {
    /// Solves the given model.
    /// Always returns a solution, its status tells whether it carries an assignment.
    fn solve<'a>(&mut self, model: &'a Model) -> Solution<'a>;

    /// Returns whether the solver can prove optimality and infeasibility.
    fn exact(&self) -> bool {
        true
    }

    /// Returns the name of the solver.
    fn name(&self) -> &'static str;
}
