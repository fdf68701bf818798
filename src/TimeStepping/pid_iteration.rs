use super::errors::TimeStepError;
use super::pid::PIDTimeStepControl;
use super::substep_timer::SubstepTimer;
use super::time_step_control::{RelativeChange, TimeStepControlInterface};
use serde::{Deserialize, Serialize};

/// PID control combined with an iteration target; the smaller estimate wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PIDAndIterationCountTimeStepControl {
    pid: PIDTimeStepControl,
    target_iterations: usize,
    decay_damping_factor: f64,
    growth_damping_factor: f64,
    min_time_step_based_on_iterations: f64,
}

impl PIDAndIterationCountTimeStepControl {
    pub fn new(
        target_iterations: usize,
        decay_damping_factor: f64,
        growth_damping_factor: f64,
        tol: f64,
        min_time_step_based_on_iterations: f64,
        verbose: bool,
    ) -> Result<Self, TimeStepError> {
        if target_iterations == 0 {
            return Err(TimeStepError::InvalidParameter(
                "PIDAndIterationCountTimeStepControl: target iterations must be positive".to_string(),
            ));
        }
        Ok(Self {
            pid: PIDTimeStepControl::new(tol, verbose),
            target_iterations,
            decay_damping_factor,
            growth_damping_factor,
            min_time_step_based_on_iterations,
        })
    }

    pub fn serialization_test_object() -> Self {
        Self {
            pid: PIDTimeStepControl::new(4.0, true),
            target_iterations: 1,
            decay_damping_factor: 2.0,
            growth_damping_factor: 3.0,
            min_time_step_based_on_iterations: 5.0,
        }
    }

    pub fn pid(&self) -> &PIDTimeStepControl {
        &self.pid
    }

    fn iteration_estimate(&self, dt: f64, iterations: usize) -> f64 {
        let target = self.target_iterations as f64;
        let iterations = iterations as f64;
        if iterations > target {
            let off_target_fraction = (iterations - target) / target;
            let dt_estimate = dt / (1.0 + off_target_fraction * self.decay_damping_factor);
            dt_estimate.max(self.min_time_step_based_on_iterations)
        } else {
            // growth is damped harder than decay
            let off_target_fraction = (target - iterations) / target;
            dt * (1.0 + off_target_fraction * self.growth_damping_factor)
        }
    }
}

impl TimeStepControlInterface for PIDAndIterationCountTimeStepControl {
    fn compute_time_step_size(
        &mut self,
        dt: f64,
        iterations: usize,
        relative_change: &dyn RelativeChange,
        _substep_timer: &SubstepTimer,
    ) -> f64 {
        let dt_pid = self.pid.pid_estimate(dt, relative_change.relative_change());
        dt_pid.min(self.iteration_estimate(dt, iterations))
    }
}
