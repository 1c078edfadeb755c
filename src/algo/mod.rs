mod bound;
mod branch;
mod list;

use crate::core::Solver;
use std::num::NonZero;
use std::time::Duration;

pub use bound::Bounds;
pub use branch::BranchAndBound;
pub use list::List;

/// Parameters shared by the registered solvers.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SolverConfig {
    pub time_limit: Duration,
    pub workers: NonZero<usize>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit: Duration::from_secs(60),
            workers: NonZero::<usize>::MIN.saturating_add(7),
        }
    }
}

/// Every registered solver.
#[allow(unsafe_code)]
#[linkme::distributed_slice]
pub static SOLVERS: [fn(&SolverConfig) -> Box<dyn Solver>];
