//! Common interface of the time-step controllers and the solution change metric they consume.
use super::hardcoded::HardcodedTimeStepControl;
use super::iteration_count::SimpleIterationCountTimeStepControl;
use super::pid::PIDTimeStepControl;
use super::pid_iteration::PIDAndIterationCountTimeStepControl;
use super::substep_timer::SubstepTimer;
use super::third_order::General3rdOrderController;
use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

pub const SECONDS_PER_DAY: f64 = 86400.0;

/// Relative change of the solution over the last step.
pub trait RelativeChange {
    fn relative_change(&self) -> f64;
}

impl RelativeChange for f64 {
    fn relative_change(&self) -> f64 {
        *self
    }
}

/// `sqrt(sum (u - u_prev)^2 / sum u_prev^2)` over two solution vectors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolutionRelativeChange(pub f64);

impl SolutionRelativeChange {
    pub fn between(previous: &[f64], current: &[f64]) -> f64 {
        debug_assert_eq!(previous.len(), current.len());
        let (delta, norm) = previous
            .iter()
            .zip(current.iter())
            .fold((0.0, 0.0), |(delta, norm), (p, c)| (delta + (c - p) * (c - p), norm + p * p));
        if norm > 0.0 { (delta / norm).sqrt() } else { delta.sqrt() }
    }

    pub fn new(previous: &[f64], current: &[f64]) -> Self {
        Self(Self::between(previous, current))
    }
}

impl RelativeChange for SolutionRelativeChange {
    fn relative_change(&self) -> f64 {
        self.0
    }
}

#[enum_dispatch]
pub trait TimeStepControlInterface {
    /// Proposes the length of the next substep after a converged step of length `dt`.
    /// Controllers with history update it on every call.
    fn compute_time_step_size(
        &mut self,
        dt: f64,
        iterations: usize,
        relative_change: &dyn RelativeChange,
        substep_timer: &SubstepTimer,
    ) -> f64;

    /// Whether a converged step with the given error may be kept.
    fn time_step_accepted(&self, _error: f64) -> bool {
        true
    }
}

#[enum_dispatch(TimeStepControlInterface)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TimeStepController {
    SimpleIterationCount(SimpleIterationCountTimeStepControl),
    Hardcoded(HardcodedTimeStepControl),
    PID(PIDTimeStepControl),
    PIDAndIterationCount(PIDAndIterationCountTimeStepControl),
    General3rdOrder(General3rdOrderController),
}
