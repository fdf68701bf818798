//! Controller selection as it appears in the run configuration.
//!
//! ```json
//! { "type": "pid+newtoniteration", "tolerance": 0.1, "target_newton_iterations": 8 }
//! ```
//! Missing fields take the simulator defaults.
use super::errors::TimeStepError;
use super::hardcoded::HardcodedTimeStepControl;
use super::iteration_count::SimpleIterationCountTimeStepControl;
use super::pid::PIDTimeStepControl;
use super::pid_iteration::PIDAndIterationCountTimeStepControl;
use super::third_order::General3rdOrderController;
use super::time_step_control::TimeStepController;
use serde::{Deserialize, Serialize};

fn default_tolerance() -> f64 {
    1e-1
}
fn default_target_iterations() -> usize {
    30
}
fn default_target_newton_iterations() -> usize {
    8
}
fn default_decay_rate() -> f64 {
    0.75
}
fn default_growth_rate() -> f64 {
    1.25
}
fn default_decay_damping_factor() -> f64 {
    1.0
}
fn default_growth_damping_factor() -> f64 {
    3.2
}
fn default_safety_factor() -> f64 {
    0.8
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TimeStepControlConfig {
    #[serde(rename = "pid")]
    Pid {
        #[serde(default = "default_tolerance")]
        tolerance: f64,
        #[serde(default)]
        verbose: bool,
    },
    /// PID combined with the linear iteration count
    #[serde(rename = "pid+iteration")]
    PidIteration {
        #[serde(default = "default_tolerance")]
        tolerance: f64,
        #[serde(default = "default_target_iterations")]
        target_iterations: usize,
        #[serde(default = "default_decay_damping_factor")]
        decay_damping_factor: f64,
        #[serde(default = "default_growth_damping_factor")]
        growth_damping_factor: f64,
        #[serde(default)]
        min_time_step_based_on_iterations: f64,
        #[serde(default)]
        verbose: bool,
    },
    /// PID combined with the Newton iteration count
    #[serde(rename = "pid+newtoniteration")]
    PidNewtonIteration {
        #[serde(default = "default_tolerance")]
        tolerance: f64,
        #[serde(default = "default_target_newton_iterations")]
        target_newton_iterations: usize,
        #[serde(default = "default_decay_damping_factor")]
        decay_damping_factor: f64,
        #[serde(default = "default_growth_damping_factor")]
        growth_damping_factor: f64,
        #[serde(default)]
        min_time_step_based_on_newton_iterations: f64,
        #[serde(default)]
        verbose: bool,
    },
    #[serde(rename = "iterationcount")]
    IterationCount {
        #[serde(default = "default_target_iterations")]
        target_iterations: usize,
        #[serde(default = "default_decay_rate")]
        decay_rate: f64,
        #[serde(default = "default_growth_rate")]
        growth_rate: f64,
        #[serde(default)]
        verbose: bool,
    },
    #[serde(rename = "newtoniterationcount")]
    NewtonIterationCount {
        #[serde(default = "default_target_newton_iterations")]
        target_newton_iterations: usize,
        #[serde(default = "default_decay_rate")]
        decay_rate: f64,
        #[serde(default = "default_growth_rate")]
        growth_rate: f64,
        #[serde(default)]
        verbose: bool,
    },
    /// schedule file with one time in days per line
    #[serde(rename = "hardcoded")]
    Hardcoded { file_name: String },
    #[serde(rename = "general3rdorder")]
    General3rdOrder {
        #[serde(default = "default_tolerance")]
        tolerance: f64,
        #[serde(default = "default_safety_factor")]
        safety_factor: f64,
        #[serde(default)]
        reject_completed_step: bool,
        #[serde(default)]
        verbose: bool,
    },
}

impl Default for TimeStepControlConfig {
    fn default() -> Self {
        TimeStepControlConfig::PidNewtonIteration {
            tolerance: default_tolerance(),
            target_newton_iterations: default_target_newton_iterations(),
            decay_damping_factor: default_decay_damping_factor(),
            growth_damping_factor: default_growth_damping_factor(),
            min_time_step_based_on_newton_iterations: 0.0,
            verbose: false,
        }
    }
}

impl TimeStepControlConfig {
    pub fn create_controller(&self) -> Result<TimeStepController, TimeStepError> {
        let controller: TimeStepController = match self {
            Self::Pid { tolerance, verbose } => PIDTimeStepControl::new(*tolerance, *verbose).into(),
            Self::PidIteration {
                tolerance,
                target_iterations,
                decay_damping_factor,
                growth_damping_factor,
                min_time_step_based_on_iterations,
                verbose,
            } => PIDAndIterationCountTimeStepControl::new(
                *target_iterations,
                *decay_damping_factor,
                *growth_damping_factor,
                *tolerance,
                *min_time_step_based_on_iterations,
                *verbose,
            )?
            .into(),
            Self::PidNewtonIteration {
                tolerance,
                target_newton_iterations,
                decay_damping_factor,
                growth_damping_factor,
                min_time_step_based_on_newton_iterations,
                verbose,
            } => PIDAndIterationCountTimeStepControl::new(
                *target_newton_iterations,
                *decay_damping_factor,
                *growth_damping_factor,
                *tolerance,
                *min_time_step_based_on_newton_iterations,
                *verbose,
            )?
            .into(),
            Self::IterationCount {
                target_iterations,
                decay_rate,
                growth_rate,
                verbose,
            } => SimpleIterationCountTimeStepControl::new(*target_iterations, *decay_rate, *growth_rate, *verbose)?
                .into(),
            Self::NewtonIterationCount {
                target_newton_iterations,
                decay_rate,
                growth_rate,
                verbose,
            } => SimpleIterationCountTimeStepControl::new(
                *target_newton_iterations,
                *decay_rate,
                *growth_rate,
                *verbose,
            )?
            .into(),
            Self::Hardcoded { file_name } => HardcodedTimeStepControl::from_file(file_name)?.into(),
            Self::General3rdOrder {
                tolerance,
                safety_factor,
                reject_completed_step,
                verbose,
            } => General3rdOrderController::new(*tolerance, *safety_factor, *reject_completed_step, *verbose).into(),
        };
        Ok(controller)
    }

    /// Whether the controller counts Newton rather than linear iterations.
    pub fn uses_newton_iterations(&self) -> bool {
        matches!(
            self,
            Self::PidNewtonIteration { .. } | Self::NewtonIterationCount { .. } | Self::General3rdOrder { .. }
        )
    }
}
