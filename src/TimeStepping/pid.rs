use super::substep_timer::SubstepTimer;
use super::time_step_control::{RelativeChange, SECONDS_PER_DAY, TimeStepControlInterface};
use log::info;
use serde::{Deserialize, Serialize};

// gains from Turek's time stepping paper
const K_P: f64 = 0.075;
const K_I: f64 = 0.175;
const K_D: f64 = 0.01;

/// PID control of the relative solution change, errors oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PIDTimeStepControl {
    tol: f64,
    errors: [f64; 3],
    verbose: bool,
}

impl PIDTimeStepControl {
    pub fn new(tol: f64, verbose: bool) -> Self {
        Self {
            tol,
            errors: [tol; 3],
            verbose,
        }
    }

    /// Two errors set explicitly, the newest keeps its initial value.
    pub fn serialization_test_object() -> Self {
        let mut result = Self::new(1.0, true);
        result.errors[0] = 2.0;
        result.errors[1] = 3.0;
        result
    }

    pub fn tolerance(&self) -> f64 {
        self.tol
    }

    pub fn errors(&self) -> &[f64; 3] {
        &self.errors
    }

    /// Shifts the history, stores `error` and applies the PID law.
    pub(crate) fn pid_estimate(&mut self, dt: f64, error: f64) -> f64 {
        self.errors.rotate_left(1);
        self.errors[2] = error;
        debug_assert!(self.errors.iter().all(|e| e.is_finite()));

        if self.errors[2] > self.tol {
            let new_dt = dt * self.tol / error;
            if self.verbose {
                info!("Computed step size (tol): {} days", new_dt / SECONDS_PER_DAY);
            }
            new_dt
        } else if self.errors.iter().any(|e| *e == 0.0) {
            if self.verbose {
                info!(
                    "The solution between time steps does not change, there is no time step constraint from the PID time step control"
                );
            }
            f64::MAX
        } else {
            let [e0, e1, e2] = self.errors;
            let new_dt = dt
                * (e1 / e2).powf(K_P)
                * (self.tol / e2).powf(K_I)
                * (e1 * e1 / e0 / e2).powf(K_D);
            if self.verbose {
                info!("Computed step size (pow): {} days", new_dt / SECONDS_PER_DAY);
            }
            new_dt
        }
    }
}

impl TimeStepControlInterface for PIDTimeStepControl {
    fn compute_time_step_size(
        &mut self,
        dt: f64,
        _iterations: usize,
        relative_change: &dyn RelativeChange,
        _substep_timer: &SubstepTimer,
    ) -> f64 {
        self.pid_estimate(dt, relative_change.relative_change())
    }
}
