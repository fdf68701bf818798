//! # Adaptive substepping of a report step
//!
//! ## Purpose
//! Splits one report step into substeps whose lengths are proposed by a [`TimeStepController`].
//! A substep whose nonlinear solve fails is retried with the step cut by the restart factor;
//! a converged substep rejected by the controller is retried with the controller's estimate.
//!
//! ## Main Structures
//! - [`AdaptiveTimeSteppingConfig`]: restart/growth limits, step bounds and the controller choice
//! - [`SubstepSolver`]: the nonlinear solve of one substep, implemented by the simulator
//! - [`AdaptiveTimeStepping`]: the driver
//! - [`StepReport`]: one line of the substep log
use super::controller_config::TimeStepControlConfig;
use super::errors::TimeStepError;
use super::substep_timer::SubstepTimer;
use super::time_step_control::{SECONDS_PER_DAY, SolutionRelativeChange, TimeStepControlInterface, TimeStepController};
use log::{info, warn};
use prettytable::{Table, row};
use serde::{Deserialize, Serialize};

fn default_restart_factor() -> f64 {
    0.33
}
fn default_growth_factor() -> f64 {
    2.0
}
fn default_max_growth() -> f64 {
    3.0
}
fn default_min_time_step() -> f64 {
    1e-12 * SECONDS_PER_DAY
}
fn default_max_time_step() -> f64 {
    365.0 * SECONDS_PER_DAY
}
fn default_max_restarts() -> usize {
    10
}
fn default_initial_time_step() -> f64 {
    SECONDS_PER_DAY
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveTimeSteppingConfig {
    /// factor applied to a substep that failed to converge
    #[serde(default = "default_restart_factor")]
    pub restart_factor: f64,
    /// growth limit for the step right after a chopped one
    #[serde(default = "default_growth_factor")]
    pub growth_factor: f64,
    #[serde(default = "default_max_growth")]
    pub max_growth: f64,
    /// seconds
    #[serde(default = "default_min_time_step")]
    pub min_time_step: f64,
    /// seconds
    #[serde(default = "default_max_time_step")]
    pub max_time_step: f64,
    #[serde(default = "default_max_restarts")]
    pub max_restarts: usize,
    /// seconds, first substep of the first report step
    #[serde(default = "default_initial_time_step")]
    pub initial_time_step: f64,
    #[serde(default)]
    pub controller: TimeStepControlConfig,
}

impl Default for AdaptiveTimeSteppingConfig {
    fn default() -> Self {
        Self {
            restart_factor: default_restart_factor(),
            growth_factor: default_growth_factor(),
            max_growth: default_max_growth(),
            min_time_step: default_min_time_step(),
            max_time_step: default_max_time_step(),
            max_restarts: default_max_restarts(),
            initial_time_step: default_initial_time_step(),
            controller: TimeStepControlConfig::default(),
        }
    }
}

impl AdaptiveTimeSteppingConfig {
    pub fn validate(&self) -> Result<(), TimeStepError> {
        if !(self.restart_factor > 0.0 && self.restart_factor < 1.0) {
            return Err(TimeStepError::InvalidParameter(format!(
                "restart factor must lie in (0, 1), got {}",
                self.restart_factor
            )));
        }
        if self.growth_factor < 1.0 || self.max_growth < 1.0 {
            return Err(TimeStepError::InvalidParameter(format!(
                "growth limits must be >= 1, got {} and {}",
                self.growth_factor, self.max_growth
            )));
        }
        if self.min_time_step <= 0.0 || self.min_time_step > self.max_time_step {
            return Err(TimeStepError::InvalidParameter(format!(
                "invalid time step bounds [{}, {}]",
                self.min_time_step, self.max_time_step
            )));
        }
        if self.initial_time_step <= 0.0 {
            return Err(TimeStepError::InvalidParameter(format!(
                "initial time step must be positive, got {}",
                self.initial_time_step
            )));
        }
        Ok(())
    }
}

/// Result of a converged substep.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SubstepOutcome {
    pub newton_iterations: usize,
    pub linear_iterations: usize,
    pub relative_change: f64,
}

/// Nonlinear solve of a single substep. The solver keeps the tentative solution until
/// the driver calls `accept` or `reject`.
pub trait SubstepSolver {
    /// Solves `[time, time + dt]`. `TimeStepError::Nonconvergence` makes the driver retry
    /// with a smaller step, any other error aborts the report step.
    fn solve(&mut self, time: f64, dt: f64) -> Result<SubstepOutcome, TimeStepError>;
    fn accept(&mut self);
    fn reject(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    Accepted,
    /// converged but refused by the controller
    Rejected,
    /// nonlinear solve failed
    Chopped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    pub report_step: usize,
    pub time: f64,
    pub dt: f64,
    pub newton_iterations: usize,
    pub linear_iterations: usize,
    pub relative_change: f64,
    pub status: StepStatus,
}

pub struct AdaptiveTimeStepping {
    config: AdaptiveTimeSteppingConfig,
    controller: TimeStepController,
    uses_newton_iterations: bool,
    suggested_next_time_step: Option<f64>,
    report_step: usize,
    reports: Vec<StepReport>,
}

impl AdaptiveTimeStepping {
    pub fn new(config: AdaptiveTimeSteppingConfig) -> Result<Self, TimeStepError> {
        config.validate()?;
        let controller = config.controller.create_controller()?;
        let uses_newton_iterations = config.controller.uses_newton_iterations();
        Ok(Self {
            config,
            controller,
            uses_newton_iterations,
            suggested_next_time_step: None,
            report_step: 0,
            reports: Vec::new(),
        })
    }

    pub fn with_controller(config: AdaptiveTimeSteppingConfig, controller: TimeStepController) -> Result<Self, TimeStepError> {
        config.validate()?;
        let uses_newton_iterations = config.controller.uses_newton_iterations();
        Ok(Self {
            config,
            controller,
            uses_newton_iterations,
            suggested_next_time_step: None,
            report_step: 0,
            reports: Vec::new(),
        })
    }

    pub fn config(&self) -> &AdaptiveTimeSteppingConfig {
        &self.config
    }

    pub fn controller(&self) -> &TimeStepController {
        &self.controller
    }

    pub fn suggested_next_time_step(&self) -> Option<f64> {
        self.suggested_next_time_step
    }

    pub fn reports(&self) -> &[StepReport] {
        &self.reports
    }

    /// Advances `solver` over `[start_time, start_time + report_step_length]` and returns
    /// the timer holding the accepted substeps.
    pub fn step(
        &mut self,
        start_time: f64,
        report_step_length: f64,
        solver: &mut dyn SubstepSolver,
    ) -> Result<SubstepTimer, TimeStepError> {
        if report_step_length <= 0.0 {
            return Err(TimeStepError::InvalidParameter(format!(
                "report step length must be positive, got {}",
                report_step_length
            )));
        }
        let first_dt = self
            .suggested_next_time_step
            .unwrap_or(self.config.initial_time_step)
            .min(self.config.max_time_step);
        let mut timer = SubstepTimer::new(start_time, report_step_length, first_dt, self.config.max_time_step);
        let mut restarts = 0usize;
        let mut contiguous_failures = 0usize;
        let mut last_estimate = first_dt;

        while !timer.done() {
            let dt = timer.current_step_length();
            let time = timer.simulation_time_elapsed();
            match solver.solve(time, dt) {
                Ok(outcome) => {
                    let iterations = if self.uses_newton_iterations {
                        outcome.newton_iterations
                    } else {
                        outcome.linear_iterations
                    };
                    let relative_change = SolutionRelativeChange(outcome.relative_change);
                    // controllers see the timer after the substep, the failure flag still
                    // describes the substep before it
                    let mut advanced = timer.clone();
                    advanced.advance();
                    let mut dt_estimate =
                        self.controller
                            .compute_time_step_size(dt, iterations, &relative_change, &advanced);
                    dt_estimate = dt_estimate.min(self.config.max_growth * dt);
                    if contiguous_failures > 0 {
                        dt_estimate = dt_estimate.min(self.config.growth_factor * dt);
                    }
                    last_estimate = dt_estimate;

                    if !self.controller.time_step_accepted(outcome.relative_change) {
                        self.record(time, dt, &outcome, StepStatus::Rejected);
                        solver.reject();
                        restarts += 1;
                        contiguous_failures += 1;
                        if restarts > self.config.max_restarts {
                            return Err(TimeStepError::TooManyRestarts(restarts));
                        }
                        info!(
                            "Substep of {} days rejected by the controller, retrying with {} days",
                            dt / SECONDS_PER_DAY,
                            dt_estimate / SECONDS_PER_DAY
                        );
                        timer.provide_time_step_estimate(dt_estimate);
                        timer.set_last_step_failed(true);
                        continue;
                    }

                    self.record(time, dt, &outcome, StepStatus::Accepted);
                    solver.accept();
                    timer = advanced;
                    timer.set_last_step_failed(false);
                    timer.provide_time_step_estimate(dt_estimate);
                    contiguous_failures = 0;
                }
                Err(TimeStepError::Nonconvergence(msg)) => {
                    self.record(time, dt, &SubstepOutcome::default(), StepStatus::Chopped);
                    solver.reject();
                    restarts += 1;
                    contiguous_failures += 1;
                    if restarts > self.config.max_restarts {
                        return Err(TimeStepError::TooManyRestarts(restarts));
                    }
                    let new_dt = dt * self.config.restart_factor;
                    if new_dt < self.config.min_time_step {
                        return Err(TimeStepError::MinTimeStepViolated {
                            dt: new_dt,
                            min_dt: self.config.min_time_step,
                        });
                    }
                    warn!(
                        "{}; chopping the substep from {} to {} days",
                        msg,
                        dt / SECONDS_PER_DAY,
                        new_dt / SECONDS_PER_DAY
                    );
                    timer.provide_time_step_estimate(new_dt);
                    timer.set_last_step_failed(true);
                }
                Err(e) => return Err(e),
            }
        }

        self.suggested_next_time_step = Some(last_estimate.min(self.config.max_time_step));
        self.report_step += 1;
        info!(
            "report step finished after {} substeps ({} restarts), average substep {} days",
            timer.current_step_num(),
            restarts,
            timer.average_step_length() / SECONDS_PER_DAY
        );
        Ok(timer)
    }

    fn record(&mut self, time: f64, dt: f64, outcome: &SubstepOutcome, status: StepStatus) {
        self.reports.push(StepReport {
            report_step: self.report_step,
            time,
            dt,
            newton_iterations: outcome.newton_iterations,
            linear_iterations: outcome.linear_iterations,
            relative_change: outcome.relative_change,
            status,
        });
    }

    pub fn report_table(&self) -> Table {
        step_report_table(&self.reports)
    }

    pub fn print_report(&self) {
        self.report_table().printstd();
    }
}

/// Substep log as a table, times in days.
pub fn step_report_table(reports: &[StepReport]) -> Table {
    let mut table = Table::new();
    table.add_row(row![
        "Report", "Time [d]", "dt [d]", "Newton its", "Linear its", "Rel. change", "Status"
    ]);
    for report in reports {
        table.add_row(row![
            report.report_step,
            format!("{:.4}", report.time / SECONDS_PER_DAY),
            format!("{:.4e}", report.dt / SECONDS_PER_DAY),
            report.newton_iterations,
            report.linear_iterations,
            format!("{:.3e}", report.relative_change),
            format!("{:?}", report.status)
        ]);
    }
    table
}
