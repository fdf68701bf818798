use super::substep_timer::SubstepTimer;
use super::time_step_control::{RelativeChange, SECONDS_PER_DAY, TimeStepControlInterface};
use log::info;
use serde::{Deserialize, Serialize};

const BETA: [f64; 3] = [0.125, 0.25, 0.125];
const ALPHA: [f64; 2] = [0.375, 0.125];

/// General third order step size controller; an I controller is used for the first
/// steps of a report step and for one extra step after a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct General3rdOrderController {
    tolerance: f64,
    safety_factor: f64,
    reject_completed_step: bool,
    errors: [f64; 3],
    time_steps: [f64; 3],
    counter_since_failure: usize,
    verbose: bool,
}

impl General3rdOrderController {
    pub fn new(tolerance: f64, safety_factor: f64, reject_completed_step: bool, verbose: bool) -> Self {
        Self {
            tolerance,
            safety_factor,
            reject_completed_step,
            errors: [tolerance; 3],
            time_steps: [1.0; 3],
            counter_since_failure: 0,
            verbose,
        }
    }

    pub fn serialization_test_object() -> Self {
        let mut result = Self::new(1.0, 0.8, true, false);
        result.errors[0] = 2.0;
        result.errors[1] = 3.0;
        result
    }

    pub fn counter_since_failure(&self) -> usize {
        self.counter_since_failure
    }

    fn log(&self, new_dt: f64) {
        if self.verbose {
            info!("Computed step size (pow): {} days", new_dt / SECONDS_PER_DAY);
        }
    }
}

impl TimeStepControlInterface for General3rdOrderController {
    fn compute_time_step_size(
        &mut self,
        dt: f64,
        _iterations: usize,
        relative_change: &dyn RelativeChange,
        substep_timer: &SubstepTimer,
    ) -> f64 {
        self.errors.rotate_left(1);
        self.time_steps.rotate_left(1);
        self.errors[2] = relative_change.relative_change();
        self.time_steps[2] = dt;
        debug_assert!(self.errors.iter().all(|e| e.is_finite()));

        if self.errors.iter().any(|e| *e == 0.0) {
            if self.verbose {
                info!(
                    "The solution between time steps does not change, there is no time step constraint from the controller."
                );
            }
            return f64::MAX;
        }

        let target = self.safety_factor * self.tolerance;
        let [e0, e1, e2] = self.errors;
        if substep_timer.current_step_num() < 3
            || substep_timer.last_step_failed()
            || self.counter_since_failure > 0
        {
            if substep_timer.last_step_failed() || self.counter_since_failure > 0 {
                self.counter_since_failure += 1;
            }
            if self.counter_since_failure > 1 {
                self.counter_since_failure = 0;
            }
            let new_dt = dt * (target / e2).powf(0.35);
            self.log(new_dt);
            return new_dt;
        }

        let [ts0, ts1, ts2] = self.time_steps;
        let new_dt = dt
            * (target / e2).powf(BETA[0])
            * (target / e1).powf(BETA[1])
            * (target / e0).powf(BETA[2])
            * (ts2 / ts1).powf(-ALPHA[0])
            * (ts1 / ts0).powf(-ALPHA[1]);
        self.log(new_dt);
        new_dt
    }

    fn time_step_accepted(&self, error: f64) -> bool {
        !(self.reject_completed_step && error > self.tolerance)
    }
}
