use super::errors::TimeStepError;
use super::substep_timer::SubstepTimer;
use super::time_step_control::{RelativeChange, SECONDS_PER_DAY, TimeStepControlInterface};
use log::info;
use serde::{Deserialize, Serialize};

/// Shrinks the step by `decayrate` when more than `target_iterations` were needed and
/// grows it by `growthrate` when fewer were needed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleIterationCountTimeStepControl {
    target_iterations: usize,
    decayrate: f64,
    growthrate: f64,
    verbose: bool,
}

impl SimpleIterationCountTimeStepControl {
    pub fn new(target_iterations: usize, decayrate: f64, growthrate: f64, verbose: bool) -> Result<Self, TimeStepError> {
        if decayrate > 1.0 {
            return Err(TimeStepError::InvalidParameter(format!(
                "SimpleIterationCountTimeStepControl: decay should be <= 1 {}",
                decayrate
            )));
        }
        if growthrate < 1.0 {
            return Err(TimeStepError::InvalidParameter(format!(
                "SimpleIterationCountTimeStepControl: growth should be >= 1 {}",
                growthrate
            )));
        }
        Ok(Self {
            target_iterations,
            decayrate,
            growthrate,
            verbose,
        })
    }

    pub fn serialization_test_object() -> Self {
        Self {
            target_iterations: 1,
            decayrate: 1.0,
            growthrate: 2.0,
            verbose: true,
        }
    }
}

impl TimeStepControlInterface for SimpleIterationCountTimeStepControl {
    fn compute_time_step_size(
        &mut self,
        dt: f64,
        iterations: usize,
        _relative_change: &dyn RelativeChange,
        _substep_timer: &SubstepTimer,
    ) -> f64 {
        let mut dt_estimate = dt;
        if iterations > self.target_iterations {
            dt_estimate *= self.decayrate;
        } else if iterations < self.target_iterations {
            dt_estimate *= self.growthrate;
        }
        if self.verbose {
            info!("Computed step size (iterations): {} days", dt_estimate / SECONDS_PER_DAY);
        }
        dt_estimate
    }
}
