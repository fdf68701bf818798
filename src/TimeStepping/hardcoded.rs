use super::errors::TimeStepError;
use super::substep_timer::SubstepTimer;
use super::time_step_control::{RelativeChange, SECONDS_PER_DAY, TimeStepControlInterface};
use log::{info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Substep end times taken from a schedule, seconds since the start of the simulation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HardcodedTimeStepControl {
    sub_step_time: Vec<f64>,
}

impl HardcodedTimeStepControl {
    /// Schedule given in seconds; must be ascending.
    pub fn new(sub_step_time: Vec<f64>) -> Result<Self, TimeStepError> {
        if sub_step_time.windows(2).any(|w| w[1] < w[0]) {
            return Err(TimeStepError::ScheduleFile(
                "substep times must be in ascending order".to_string(),
            ));
        }
        Ok(Self { sub_step_time })
    }

    /// One time in days per line; the first number of a line counts, lines starting with
    /// '-' and empty lines are skipped.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TimeStepError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(TimeStepError::ScheduleFile(format!(
                "Incorrect or no filename is provided to the hardcoded time step control: '{}'",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_schedule_str(&content)
    }

    pub fn from_schedule_str(content: &str) -> Result<Self, TimeStepError> {
        let number = Regex::new(r"^\s*([+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?)")
            .map_err(|e| TimeStepError::ScheduleFile(e.to_string()))?;
        let mut times = Vec::new();
        for line in content.lines() {
            if line.starts_with('-') || line.trim().is_empty() {
                continue;
            }
            let caps = number
                .captures(line)
                .ok_or(TimeStepError::Parse(line.to_string()))?;
            let days: f64 = caps[1]
                .parse()
                .map_err(|_| TimeStepError::Parse(line.to_string()))?;
            times.push(days * SECONDS_PER_DAY);
        }
        info!("hardcoded schedule with {} substep times", times.len());
        Self::new(times)
    }

    pub fn serialization_test_object() -> Self {
        Self {
            sub_step_time: vec![1.0, 2.0],
        }
    }

    pub fn sub_step_time(&self) -> &[f64] {
        &self.sub_step_time
    }
}

impl TimeStepControlInterface for HardcodedTimeStepControl {
    /// Distance to the first scheduled time strictly after the elapsed time.
    fn compute_time_step_size(
        &mut self,
        _dt: f64,
        _iterations: usize,
        _relative_change: &dyn RelativeChange,
        substep_timer: &SubstepTimer,
    ) -> f64 {
        let elapsed = substep_timer.simulation_time_elapsed();
        let next = self.sub_step_time.partition_point(|t| *t <= elapsed);
        match self.sub_step_time.get(next) {
            Some(next_time) => next_time - elapsed,
            None => {
                warn!("hardcoded schedule exhausted at {} days", elapsed / SECONDS_PER_DAY);
                f64::MAX
            }
        }
    }
}
