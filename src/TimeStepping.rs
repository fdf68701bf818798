//! # TimeStepping
//!
//! ## Purpose
//! Step size selection inside a report step. A family of controllers proposes the next
//! substep length from the last one, the iteration count and the relative change of the
//! solution; the adaptive driver runs the substeps, chops failed ones and keeps a log.
//!
//! ## Main Structures
//! - `time_step_control`: `TimeStepControlInterface` and the `TimeStepController` enum
//!   dispatching over all variants; the `RelativeChange` metric.
//! - `iteration_count`, `hardcoded`, `pid`, `pid_iteration`, `third_order`: the controllers.
//! - `controller_config`: serde configuration choosing a controller by name.
//! - `substep_timer`: time bookkeeping within one report step.
//! - `adaptive_time_stepping`: the substep driver and its `SubstepSolver` collaborator.
pub mod adaptive_time_stepping;
pub mod controller_config;
pub mod errors;
pub mod hardcoded;
pub mod iteration_count;
pub mod pid;
pub mod pid_iteration;
pub mod substep_timer;
pub mod third_order;
pub mod time_step_control;
#[cfg(test)]
mod time_step_tests;
