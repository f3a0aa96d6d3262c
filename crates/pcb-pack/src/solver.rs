//! Cooperative stepping contract shared by every solver.
//!
//! `setup` is idempotent, `step` does one bounded unit of work and is safe
//! to call after the solver has finished. Parents own at most one active
//! child and advance it at most once per parent step, so any intermediate
//! state can be inspected between steps.

use crate::error::{PackError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverStatus {
    Running,
    Solved,
    Failed,
}

impl SolverStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, SolverStatus::Running)
    }
}

pub trait Solver {
    fn setup(&mut self);

    fn step(&mut self);

    fn status(&self) -> SolverStatus;

    /// Why the solver failed, once it has.
    fn failure(&self) -> Option<&PackError>;

    /// Steps until the solver finishes, giving up after `max_iterations`.
    fn solve(&mut self, max_iterations: usize) -> Result<()> {
        self.setup();
        let mut iterations = 0;
        while !self.status().is_terminal() {
            if iterations >= max_iterations {
                return Err(PackError::IterationLimit {
                    limit: max_iterations,
                });
            }
            self.step();
            iterations += 1;
        }
        match self.failure() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Countdown {
        remaining: usize,
        setups: usize,
    }

    impl Solver for Countdown {
        fn setup(&mut self) {
            self.setups += 1;
        }

        fn step(&mut self) {
            self.remaining = self.remaining.saturating_sub(1);
        }

        fn status(&self) -> SolverStatus {
            if self.remaining == 0 {
                SolverStatus::Solved
            } else {
                SolverStatus::Running
            }
        }

        fn failure(&self) -> Option<&PackError> {
            None
        }
    }

    #[test]
    fn test_solve_runs_to_completion() {
        let mut countdown = Countdown {
            remaining: 3,
            setups: 0,
        };
        assert_eq!(countdown.solve(10), Ok(()));
        assert_eq!(countdown.status(), SolverStatus::Solved);
    }

    #[test]
    fn test_solve_reports_iteration_limit() {
        let mut countdown = Countdown {
            remaining: 30,
            setups: 0,
        };
        assert_eq!(
            countdown.solve(10),
            Err(PackError::IterationLimit { limit: 10 })
        );
        assert_eq!(countdown.setups, 1);
    }
}
