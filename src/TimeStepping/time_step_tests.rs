use super::adaptive_time_stepping::{
    AdaptiveTimeStepping, AdaptiveTimeSteppingConfig, StepStatus, SubstepOutcome, SubstepSolver,
};
use super::controller_config::TimeStepControlConfig;
use super::errors::TimeStepError;
use super::hardcoded::HardcodedTimeStepControl;
use super::iteration_count::SimpleIterationCountTimeStepControl;
use super::pid::PIDTimeStepControl;
use super::pid_iteration::PIDAndIterationCountTimeStepControl;
use super::substep_timer::SubstepTimer;
use super::third_order::General3rdOrderController;
use super::time_step_control::{SECONDS_PER_DAY, TimeStepControlInterface, TimeStepController};
use approx::assert_relative_eq;
use std::io::Write;
use tempfile::NamedTempFile;

fn fresh_timer() -> SubstepTimer {
    SubstepTimer::new(0.0, 100.0 * SECONDS_PER_DAY, SECONDS_PER_DAY, f64::MAX)
}

#[test]
fn iteration_count_decays_grows_and_holds() {
    let timer = fresh_timer();
    let mut ctrl = SimpleIterationCountTimeStepControl::new(10, 0.5, 1.5, false).unwrap();
    assert_relative_eq!(ctrl.compute_time_step_size(1.0, 12, &0.0f64, &timer), 0.5);
    assert_relative_eq!(ctrl.compute_time_step_size(1.0, 8, &0.0f64, &timer), 1.5);
    assert_relative_eq!(ctrl.compute_time_step_size(1.0, 10, &0.0f64, &timer), 1.0);
}

#[test]
fn iteration_count_rejects_invalid_rates() {
    assert!(matches!(
        SimpleIterationCountTimeStepControl::new(10, 1.5, 1.5, false),
        Err(TimeStepError::InvalidParameter(_))
    ));
    assert!(matches!(
        SimpleIterationCountTimeStepControl::new(10, 0.5, 0.9, false),
        Err(TimeStepError::InvalidParameter(_))
    ));
}

#[test]
fn pid_shrinks_above_tolerance() {
    let timer = fresh_timer();
    let mut ctrl = PIDTimeStepControl::new(0.1, false);
    assert_relative_eq!(ctrl.compute_time_step_size(10.0, 3, &0.5f64, &timer), 2.0, epsilon = 1e-12);
    assert_eq!(ctrl.errors(), &[0.1, 0.1, 0.5]);
}

#[test]
fn pid_without_change_is_unbounded() {
    let timer = fresh_timer();
    let mut ctrl = PIDTimeStepControl::new(0.1, false);
    assert_eq!(ctrl.compute_time_step_size(1.0, 3, &0.0f64, &timer), f64::MAX);
    assert_eq!(ctrl.compute_time_step_size(1.0, 3, &0.0f64, &timer), f64::MAX);
    assert_eq!(ctrl.compute_time_step_size(1.0, 3, &0.0f64, &timer), f64::MAX);
}

#[test]
fn pid_law_below_tolerance() {
    let timer = fresh_timer();
    let mut ctrl = PIDTimeStepControl::new(1.0, false);
    // errors [1, 1, 0.5]
    let expected = 2.0f64.powf(0.075) * 2.0f64.powf(0.175) * 2.0f64.powf(0.01);
    assert_relative_eq!(ctrl.compute_time_step_size(1.0, 3, &0.5f64, &timer), expected, epsilon = 1e-12);
}

#[test]
fn pid_and_iterations_takes_the_smaller_estimate() {
    let timer = fresh_timer();
    // PID alone gives 10^0.26 for errors [0.1, 0.1, 0.01]
    let pid_estimate = 10.0f64.powf(0.26);

    let mut ctrl = PIDAndIterationCountTimeStepControl::new(5, 1.0, 3.2, 0.1, 0.0, false).unwrap();
    assert_relative_eq!(ctrl.compute_time_step_size(1.0, 10, &0.01f64, &timer), 0.5, epsilon = 1e-12);

    let mut ctrl = PIDAndIterationCountTimeStepControl::new(5, 1.0, 3.2, 0.1, 0.0, false).unwrap();
    assert_relative_eq!(
        ctrl.compute_time_step_size(1.0, 0, &0.01f64, &timer),
        pid_estimate,
        epsilon = 1e-12
    );

    let mut ctrl = PIDAndIterationCountTimeStepControl::new(5, 1.0, 3.2, 0.1, 0.0, false).unwrap();
    assert_relative_eq!(ctrl.compute_time_step_size(1.0, 4, &0.5f64, &timer), 0.2, epsilon = 1e-12);

    // floor on the iteration based estimate
    let mut ctrl = PIDAndIterationCountTimeStepControl::new(5, 1.0, 3.2, 0.1, 0.8, false).unwrap();
    assert_relative_eq!(ctrl.compute_time_step_size(1.0, 10, &0.01f64, &timer), 0.8, epsilon = 1e-12);
}

#[test]
fn pid_and_iterations_rejects_zero_target() {
    assert!(matches!(
        PIDAndIterationCountTimeStepControl::new(0, 1.0, 3.2, 0.1, 0.0, false),
        Err(TimeStepError::InvalidParameter(_))
    ));
    let config = TimeStepControlConfig::PidIteration {
        tolerance: 0.1,
        target_iterations: 0,
        decay_damping_factor: 1.0,
        growth_damping_factor: 3.2,
        min_time_step_based_on_iterations: 0.0,
        verbose: false,
    };
    assert!(matches!(config.create_controller(), Err(TimeStepError::InvalidParameter(_))));
}

#[test]
fn third_order_uses_i_law_for_first_steps() {
    let timer = fresh_timer();
    let mut ctrl = General3rdOrderController::new(1.0, 0.8, true, false);
    assert_relative_eq!(
        ctrl.compute_time_step_size(1.0, 3, &0.5f64, &timer),
        (0.8f64 / 0.5).powf(0.35),
        epsilon = 1e-12
    );
    assert_eq!(ctrl.counter_since_failure(), 0);
}

#[test]
fn third_order_full_law_after_three_steps() {
    let mut timer = fresh_timer();
    for _ in 0..3 {
        timer.advance();
    }
    let mut ctrl = General3rdOrderController::new(1.0, 0.8, true, false);
    // errors [1, 1, 0.4], time steps [1, 1, 2]
    let expected = 2.0
        * (0.8f64 / 0.4).powf(0.125)
        * 0.8f64.powf(0.25)
        * 0.8f64.powf(0.125)
        * 2.0f64.powf(-0.375);
    assert_relative_eq!(ctrl.compute_time_step_size(2.0, 3, &0.4f64, &timer), expected, epsilon = 1e-12);
}

#[test]
fn third_order_falls_back_for_one_extra_step_after_failure() {
    let mut timer = fresh_timer();
    for _ in 0..3 {
        timer.advance();
    }
    let mut ctrl = General3rdOrderController::new(1.0, 0.8, true, false);
    let i_law = |dt: f64, e: f64| dt * (0.8 / e).powf(0.35);

    timer.set_last_step_failed(true);
    assert_relative_eq!(ctrl.compute_time_step_size(1.0, 3, &0.5f64, &timer), i_law(1.0, 0.5), epsilon = 1e-12);
    assert_eq!(ctrl.counter_since_failure(), 1);

    timer.set_last_step_failed(false);
    assert_relative_eq!(ctrl.compute_time_step_size(1.0, 3, &0.5f64, &timer), i_law(1.0, 0.5), epsilon = 1e-12);
    assert_eq!(ctrl.counter_since_failure(), 0);

    // back to the third order law: errors [0.5, 0.5, 0.5], equal steps
    let expected = (0.8f64 / 0.5).powf(0.5);
    assert_relative_eq!(ctrl.compute_time_step_size(1.0, 3, &0.5f64, &timer), expected, epsilon = 1e-12);
}

#[test]
fn third_order_acceptance_policy() {
    let ctrl = General3rdOrderController::new(1.0, 0.8, true, false);
    assert!(!ctrl.time_step_accepted(1.5));
    assert!(ctrl.time_step_accepted(0.9));
    let lenient = General3rdOrderController::new(1.0, 0.8, false, false);
    assert!(lenient.time_step_accepted(1.5));
    let timer = fresh_timer();
    let mut ctrl = ctrl;
    assert_eq!(ctrl.compute_time_step_size(1.0, 3, &0.0f64, &timer), f64::MAX);
    // other controllers never reject
    assert!(PIDTimeStepControl::new(0.1, false).time_step_accepted(100.0));
}

#[test]
fn hardcoded_schedule_from_text() {
    let ctrl = HardcodedTimeStepControl::from_schedule_str("-- times in days\n0.5\n1.0\n\n2.5 after a comment\n").unwrap();
    assert_eq!(
        ctrl.sub_step_time(),
        &[0.5 * SECONDS_PER_DAY, SECONDS_PER_DAY, 2.5 * SECONDS_PER_DAY]
    );
    let mut ctrl = ctrl;
    // elapsed equal to an entry: the next entry is used
    let timer = SubstepTimer::new(0.5 * SECONDS_PER_DAY, 10.0 * SECONDS_PER_DAY, SECONDS_PER_DAY, f64::MAX);
    assert_relative_eq!(ctrl.compute_time_step_size(1.0, 1, &0.0f64, &timer), 0.5 * SECONDS_PER_DAY);
    let timer = SubstepTimer::new(1.2 * SECONDS_PER_DAY, 10.0 * SECONDS_PER_DAY, SECONDS_PER_DAY, f64::MAX);
    assert_relative_eq!(
        ctrl.compute_time_step_size(1.0, 1, &0.0f64, &timer),
        1.3 * SECONDS_PER_DAY,
        epsilon = 1e-6
    );
    let timer = SubstepTimer::new(3.0 * SECONDS_PER_DAY, 10.0 * SECONDS_PER_DAY, SECONDS_PER_DAY, f64::MAX);
    assert_eq!(ctrl.compute_time_step_size(1.0, 1, &0.0f64, &timer), f64::MAX);

    assert!(matches!(
        HardcodedTimeStepControl::from_schedule_str("1.0\nabc\n"),
        Err(TimeStepError::Parse(_))
    ));
    assert!(HardcodedTimeStepControl::new(vec![2.0, 1.0]).is_err());
}

#[test]
fn hardcoded_schedule_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(temp_file, "-- schedule").unwrap();
    writeln!(temp_file, "1").unwrap();
    writeln!(temp_file, "2").unwrap();
    let path = temp_file.path().to_str().unwrap().to_string();
    let ctrl = HardcodedTimeStepControl::from_file(&path).unwrap();
    assert_eq!(ctrl.sub_step_time(), &[SECONDS_PER_DAY, 2.0 * SECONDS_PER_DAY]);

    let config: TimeStepControlConfig =
        serde_json::from_str(&format!("{{\"type\": \"hardcoded\", \"file_name\": {:?}}}", path)).unwrap();
    assert_eq!(config.create_controller().unwrap(), TimeStepController::from(ctrl));

    assert!(matches!(
        HardcodedTimeStepControl::from_file("no/such/schedule.txt"),
        Err(TimeStepError::ScheduleFile(_))
    ));
}

#[test]
fn serialization_test_objects_survive_json() {
    let controllers: Vec<TimeStepController> = vec![
        SimpleIterationCountTimeStepControl::serialization_test_object().into(),
        HardcodedTimeStepControl::serialization_test_object().into(),
        PIDTimeStepControl::serialization_test_object().into(),
        PIDAndIterationCountTimeStepControl::serialization_test_object().into(),
        General3rdOrderController::serialization_test_object().into(),
    ];
    for controller in controllers {
        let json = serde_json::to_string(&controller).unwrap();
        let back: TimeStepController = serde_json::from_str(&json).unwrap();
        assert_eq!(back, controller);
    }
    let pid = PIDTimeStepControl::serialization_test_object();
    assert_eq!(pid.errors(), &[2.0, 3.0, 1.0]);
    assert_ne!(
        TimeStepController::from(pid),
        TimeStepController::from(PIDTimeStepControl::new(1.0, true))
    );
}

#[test]
fn controller_config_defaults_and_names() {
    let config: TimeStepControlConfig = serde_json::from_str(r#"{"type": "pid+newtoniteration"}"#).unwrap();
    assert_eq!(config, TimeStepControlConfig::default());
    assert!(config.uses_newton_iterations());
    assert_eq!(
        config.create_controller().unwrap(),
        TimeStepController::from(PIDAndIterationCountTimeStepControl::new(8, 1.0, 3.2, 0.1, 0.0, false).unwrap())
    );

    let config: TimeStepControlConfig = serde_json::from_str(r#"{"type": "pid+iteration"}"#).unwrap();
    assert!(!config.uses_newton_iterations());
    assert_eq!(
        config.create_controller().unwrap(),
        TimeStepController::from(PIDAndIterationCountTimeStepControl::new(30, 1.0, 3.2, 0.1, 0.0, false).unwrap())
    );

    let config: TimeStepControlConfig =
        serde_json::from_str(r#"{"type": "general3rdorder", "reject_completed_step": true}"#).unwrap();
    assert_eq!(
        config.create_controller().unwrap(),
        TimeStepController::from(General3rdOrderController::new(0.1, 0.8, true, false))
    );

    let config: TimeStepControlConfig =
        serde_json::from_str(r#"{"type": "iterationcount", "decay_rate": 1.5}"#).unwrap();
    assert!(matches!(config.create_controller(), Err(TimeStepError::InvalidParameter(_))));

    assert!(serde_json::from_str::<TimeStepControlConfig>(r#"{"type": "unknown"}"#).is_err());
}

/// Fails `failures` times, then converges with the scripted relative changes
/// (the last one repeats).
struct ScriptedSolver {
    failures: usize,
    newton_iterations: usize,
    relative_changes: Vec<f64>,
    converged_calls: usize,
    pending: Option<f64>,
    accepted: Vec<f64>,
    rejected: usize,
}

impl ScriptedSolver {
    fn new(failures: usize, newton_iterations: usize, relative_changes: Vec<f64>) -> Self {
        Self {
            failures,
            newton_iterations,
            relative_changes,
            converged_calls: 0,
            pending: None,
            accepted: Vec::new(),
            rejected: 0,
        }
    }
}

impl SubstepSolver for ScriptedSolver {
    fn solve(&mut self, _time: f64, dt: f64) -> Result<SubstepOutcome, TimeStepError> {
        if self.failures > 0 {
            self.failures -= 1;
            return Err(TimeStepError::Nonconvergence("scripted failure".to_string()));
        }
        let idx = self.converged_calls.min(self.relative_changes.len() - 1);
        self.converged_calls += 1;
        self.pending = Some(dt);
        Ok(SubstepOutcome {
            newton_iterations: self.newton_iterations,
            linear_iterations: 10 * self.newton_iterations,
            relative_change: self.relative_changes[idx],
        })
    }

    fn accept(&mut self) {
        if let Some(dt) = self.pending.take() {
            self.accepted.push(dt);
        }
    }

    fn reject(&mut self) {
        self.pending = None;
        self.rejected += 1;
    }
}

fn iteration_count_config(target: usize) -> AdaptiveTimeSteppingConfig {
    AdaptiveTimeSteppingConfig {
        controller: TimeStepControlConfig::NewtonIterationCount {
            target_newton_iterations: target,
            decay_rate: 0.5,
            growth_rate: 2.0,
            verbose: false,
        },
        ..AdaptiveTimeSteppingConfig::default()
    }
}

#[test]
fn driver_grows_steps_and_lands_on_report_time() {
    let mut stepping = AdaptiveTimeStepping::new(iteration_count_config(5)).unwrap();
    let mut solver = ScriptedSolver::new(0, 3, vec![0.01]);
    let timer = stepping.step(0.0, 10.0 * SECONDS_PER_DAY, &mut solver).unwrap();
    assert!(timer.done());
    let days: Vec<f64> = solver.accepted.iter().map(|dt| dt / SECONDS_PER_DAY).collect();
    assert_eq!(days, vec![1.0, 2.0, 4.0, 3.0]);
    assert_eq!(timer.step_lengths(), solver.accepted.as_slice());
    assert_relative_eq!(stepping.suggested_next_time_step().unwrap(), 6.0 * SECONDS_PER_DAY);
    assert!(stepping.reports().iter().all(|r| r.status == StepStatus::Accepted));
    assert_eq!(stepping.report_table().len(), stepping.reports().len() + 1);
}

#[test]
fn driver_chops_nonconverged_substeps() {
    let mut stepping = AdaptiveTimeStepping::new(iteration_count_config(5)).unwrap();
    let mut solver = ScriptedSolver::new(2, 5, vec![0.01]);
    let timer = stepping.step(0.0, SECONDS_PER_DAY, &mut solver).unwrap();
    assert!(timer.done());
    assert_eq!(solver.rejected, 2);
    assert_relative_eq!(solver.accepted[0], 0.33 * 0.33 * SECONDS_PER_DAY, epsilon = 1e-6);
    let chopped = stepping
        .reports()
        .iter()
        .filter(|r| r.status == StepStatus::Chopped)
        .count();
    assert_eq!(chopped, 2);
    assert_relative_eq!(solver.accepted.iter().sum::<f64>(), SECONDS_PER_DAY, epsilon = 1e-6);
}

#[test]
fn driver_gives_up() {
    let config = AdaptiveTimeSteppingConfig {
        max_restarts: 3,
        ..iteration_count_config(5)
    };
    let mut stepping = AdaptiveTimeStepping::new(config).unwrap();
    let mut solver = ScriptedSolver::new(usize::MAX, 5, vec![0.01]);
    assert!(matches!(
        stepping.step(0.0, SECONDS_PER_DAY, &mut solver),
        Err(TimeStepError::TooManyRestarts(4))
    ));

    let config = AdaptiveTimeSteppingConfig {
        min_time_step: 0.5 * SECONDS_PER_DAY,
        ..iteration_count_config(5)
    };
    let mut stepping = AdaptiveTimeStepping::new(config).unwrap();
    let mut solver = ScriptedSolver::new(usize::MAX, 5, vec![0.01]);
    assert!(matches!(
        stepping.step(0.0, SECONDS_PER_DAY, &mut solver),
        Err(TimeStepError::MinTimeStepViolated { .. })
    ));
}

struct BrokenSolver;

impl SubstepSolver for BrokenSolver {
    fn solve(&mut self, _time: f64, _dt: f64) -> Result<SubstepOutcome, TimeStepError> {
        Err(TimeStepError::Solver("singular matrix".to_string()))
    }
    fn accept(&mut self) {}
    fn reject(&mut self) {}
}

#[test]
fn driver_propagates_other_solver_errors() {
    let mut stepping = AdaptiveTimeStepping::new(iteration_count_config(5)).unwrap();
    assert!(matches!(
        stepping.step(0.0, SECONDS_PER_DAY, &mut BrokenSolver),
        Err(TimeStepError::Solver(_))
    ));
    assert!(stepping.reports().is_empty());
}

#[test]
fn driver_repeats_steps_rejected_by_the_controller() {
    let config = AdaptiveTimeSteppingConfig {
        controller: TimeStepControlConfig::General3rdOrder {
            tolerance: 0.1,
            safety_factor: 0.8,
            reject_completed_step: true,
            verbose: false,
        },
        ..AdaptiveTimeSteppingConfig::default()
    };
    let mut stepping = AdaptiveTimeStepping::new(config).unwrap();
    let mut solver = ScriptedSolver::new(0, 3, vec![0.5, 0.05]);
    let timer = stepping.step(0.0, 2.0 * SECONDS_PER_DAY, &mut solver).unwrap();
    assert!(timer.done());
    assert_eq!(solver.rejected, 1);
    assert_eq!(stepping.reports()[0].status, StepStatus::Rejected);
    assert_relative_eq!(
        solver.accepted[0],
        SECONDS_PER_DAY * (0.08f64 / 0.5).powf(0.35),
        epsilon = 1e-6
    );
}

#[test]
fn driver_config_validation() {
    let config = AdaptiveTimeSteppingConfig {
        restart_factor: 1.5,
        ..AdaptiveTimeSteppingConfig::default()
    };
    assert!(AdaptiveTimeStepping::new(config).is_err());
    let config: AdaptiveTimeSteppingConfig =
        serde_json::from_str(r#"{"max_restarts": 4, "controller": {"type": "pid"}}"#).unwrap();
    assert_eq!(config.max_restarts, 4);
    assert_relative_eq!(config.restart_factor, 0.33);
    assert!(!config.controller.uses_newton_iterations());
}

#[test]
fn driver_follows_hardcoded_schedule() {
    let schedule: Vec<f64> = [1.0, 3.0, 6.0, 10.0].iter().map(|d| d * SECONDS_PER_DAY).collect();
    let controller: TimeStepController = HardcodedTimeStepControl::new(schedule).unwrap().into();
    let mut stepping =
        AdaptiveTimeStepping::with_controller(AdaptiveTimeSteppingConfig::default(), controller).unwrap();
    let mut solver = ScriptedSolver::new(0, 3, vec![0.01]);
    let timer = stepping.step(0.0, 10.0 * SECONDS_PER_DAY, &mut solver).unwrap();
    assert!(timer.done());
    let mut end = 0.0;
    let end_days: Vec<f64> = solver
        .accepted
        .iter()
        .map(|dt| {
            end += dt / SECONDS_PER_DAY;
            end
        })
        .collect();
    assert_eq!(end_days.len(), 4);
    for (got, want) in end_days.iter().zip([1.0, 3.0, 6.0, 10.0]) {
        assert_relative_eq!(*got, want, epsilon = 1e-9);
    }
}

#[test]
fn driver_gives_third_order_controller_the_advanced_step_number() {
    let config = AdaptiveTimeSteppingConfig {
        controller: TimeStepControlConfig::General3rdOrder {
            tolerance: 0.1,
            safety_factor: 0.8,
            reject_completed_step: false,
            verbose: false,
        },
        max_growth: 100.0,
        ..AdaptiveTimeSteppingConfig::default()
    };
    let mut stepping = AdaptiveTimeStepping::new(config).unwrap();
    // target error is 0.08
    let mut solver = ScriptedSolver::new(0, 3, vec![0.04, 0.04, 0.08]);
    stepping.step(0.0, 10.0 * SECONDS_PER_DAY, &mut solver).unwrap();
    let grow = 2.0f64.powf(0.35);
    let days: Vec<f64> = solver.accepted.iter().take(4).map(|dt| dt / SECONDS_PER_DAY).collect();
    // I-law after the first and second substep
    assert_relative_eq!(days[0], 1.0, epsilon = 1e-9);
    assert_relative_eq!(days[1], grow, epsilon = 1e-9);
    assert_relative_eq!(days[2], grow * grow, epsilon = 1e-9);
    // full law after the third: errors [0.04, 0.04, 0.08], steps [1, grow, grow^2]
    let full = grow * grow
        * 2.0f64.powf(0.25)
        * 2.0f64.powf(0.125)
        * grow.powf(-0.375)
        * grow.powf(-0.125);
    assert_relative_eq!(days[3], full, epsilon = 1e-9);
}
