/// Time within one report step, advanced substep by substep.
#[derive(Debug, Clone, PartialEq)]
pub struct SubstepTimer {
    start_time: f64,
    total_time: f64,
    current_time: f64,
    dt: f64,
    current_step: usize,
    steps: Vec<f64>,
    last_step_failed: bool,
    max_time_step: f64,
}

impl SubstepTimer {
    /// Report step `[start_time, start_time + report_step_length]`, first substep `first_dt`.
    pub fn new(start_time: f64, report_step_length: f64, first_dt: f64, max_time_step: f64) -> Self {
        let mut timer = Self {
            start_time,
            total_time: start_time + report_step_length,
            current_time: start_time,
            dt: first_dt,
            current_step: 0,
            steps: Vec::new(),
            last_step_failed: false,
            max_time_step,
        };
        timer.provide_time_step_estimate(first_dt);
        timer
    }

    /// Accepts the current substep.
    pub fn advance(&mut self) {
        self.current_time += self.dt;
        self.current_step += 1;
        self.steps.push(self.dt);
    }

    /// Sets the next substep length: capped by the maximum step, stretched to the end
    /// of the report step when close to it, halved when a tiny last step would remain.
    pub fn provide_time_step_estimate(&mut self, dt_estimate: f64) {
        let remaining = self.total_time - self.current_time;
        self.dt = dt_estimate.min(self.max_time_step);
        if remaining > 0.0 {
            if 1.05 * self.dt > remaining {
                self.dt = remaining;
                if self.dt > self.max_time_step {
                    self.dt = 0.5 * remaining;
                }
                return;
            }
            if 1.5 * self.dt > remaining {
                self.dt = 0.5 * remaining;
            }
        }
    }

    pub fn done(&self) -> bool {
        self.total_time - self.current_time <= 1e-12 * self.total_time.abs().max(1.0)
    }

    pub fn current_step_num(&self) -> usize {
        self.current_step
    }

    pub fn current_step_length(&self) -> f64 {
        self.dt
    }

    /// seconds since the start of the simulation
    pub fn simulation_time_elapsed(&self) -> f64 {
        self.current_time
    }

    pub fn report_step_start(&self) -> f64 {
        self.start_time
    }

    pub fn report_step_length(&self) -> f64 {
        self.total_time - self.start_time
    }

    pub fn set_last_step_failed(&mut self, failed: bool) {
        self.last_step_failed = failed;
    }

    pub fn last_step_failed(&self) -> bool {
        self.last_step_failed
    }

    pub fn max_time_step(&self) -> f64 {
        self.max_time_step
    }

    /// accepted substep lengths so far
    pub fn step_lengths(&self) -> &[f64] {
        &self.steps
    }

    pub fn average_step_length(&self) -> f64 {
        if self.steps.is_empty() {
            return 0.0;
        }
        self.steps.iter().sum::<f64>() / self.steps.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn last_substep_hits_the_report_time() {
        let mut timer = SubstepTimer::new(10.0, 10.0, 4.0, f64::MAX);
        assert_eq!(timer.current_step_length(), 4.0);
        timer.advance();
        // 6 remain: 1.5 * 4 is not above 6, keep 4
        timer.provide_time_step_estimate(4.0);
        assert_eq!(timer.current_step_length(), 4.0);
        timer.advance();
        // 2 remain: stretch to the end
        timer.provide_time_step_estimate(1.95);
        assert_eq!(timer.current_step_length(), 2.0);
        timer.advance();
        assert!(timer.done());
        assert_eq!(timer.current_step_num(), 3);
        assert_relative_eq!(timer.simulation_time_elapsed(), 20.0);
        assert_relative_eq!(timer.average_step_length(), 10.0 / 3.0);
    }

    #[test]
    fn tiny_remainder_is_avoided_and_max_step_applies() {
        let timer = SubstepTimer::new(0.0, 10.0, 7.0, f64::MAX);
        // 1.5 * 7 > 10: take half of the report step
        assert_eq!(timer.current_step_length(), 5.0);
        let timer = SubstepTimer::new(0.0, 100.0, 50.0, 20.0);
        assert_eq!(timer.current_step_length(), 20.0);
        assert!(!timer.done());
        assert!(!timer.last_step_failed());
    }
}
