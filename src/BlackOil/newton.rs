//! Newton-Raphson solve of one implicit time step.
use super::biofilm_module::{BIOFILM_UNIT_SCALE, BiofilmModule};
use super::errors::BlackOilError;
use super::fluid_system::FluidSystem;
use super::indices::{
    BIOFILMS_CONCENTRATION_IDX, CONTI_BIOFILMS_EQ_IDX, NUM_EQ, PrimaryVariables, WATER_SATURATION_IDX,
};
use super::problem::Problem;
use super::tpfa_linearizer::{JacobianMatrix, TpfaLinearizer};
use crate::Numerics::block_sparse::{flatten, unflatten};
use crate::TimeStepping::time_step_control::SolutionRelativeChange;
use log::{debug, info};
use nalgebra::SVector;
use serde::{Deserialize, Serialize};

/// Solves `J dx = r` for the Newton update.
pub trait LinearSolverBackend {
    fn solve(
        &mut self,
        matrix: &JacobianMatrix,
        rhs: &[SVector<f64, NUM_EQ>],
    ) -> Result<Vec<SVector<f64, NUM_EQ>>, BlackOilError>;
}

/// Dense LU of the assembled matrix; meant for small grids.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenseLuBackend;

impl LinearSolverBackend for DenseLuBackend {
    fn solve(
        &mut self,
        matrix: &JacobianMatrix,
        rhs: &[SVector<f64, NUM_EQ>],
    ) -> Result<Vec<SVector<f64, NUM_EQ>>, BlackOilError> {
        let dense = matrix.to_dense();
        let x = dense
            .lu()
            .solve(&flatten(rhs))
            .ok_or(BlackOilError::LinearSolver("singular Jacobian".to_string()))?;
        Ok(unflatten(&x))
    }
}

fn default_tolerance() -> f64 {
    1e-7
}
fn default_max_iterations() -> usize {
    12
}
fn default_min_iterations() -> usize {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NewtonConfig {
    /// on the scaled residual `dt |R| / (phi V)`
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default = "default_min_iterations")]
    pub min_iterations: usize,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
            max_iterations: default_max_iterations(),
            min_iterations: default_min_iterations(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewtonReport {
    pub iterations: usize,
    pub linear_iterations: usize,
    /// change of the solution over the step, see `SolutionRelativeChange`
    pub relative_change: f64,
    pub residual: f64,
}

pub struct NewtonSolver {
    config: NewtonConfig,
    linearizer: TpfaLinearizer,
    backend: Box<dyn LinearSolverBackend>,
}

impl NewtonSolver {
    pub fn new(problem: &dyn Problem, config: NewtonConfig) -> Result<Self, BlackOilError> {
        Self::with_backend(problem, config, Box::new(DenseLuBackend))
    }

    pub fn with_backend(
        problem: &dyn Problem,
        config: NewtonConfig,
        backend: Box<dyn LinearSolverBackend>,
    ) -> Result<Self, BlackOilError> {
        Ok(Self {
            config,
            linearizer: TpfaLinearizer::new(problem)?,
            backend,
        })
    }

    pub fn config(&self) -> &NewtonConfig {
        &self.config
    }

    pub fn linearizer(&self) -> &TpfaLinearizer {
        &self.linearizer
    }

    /// max over cells and equations of `dt |R| / (phi V)`, biofilm row unscaled
    fn scaled_residual<const B: bool>(&self, problem: &dyn Problem, dt: f64) -> f64 {
        let mut weights = [1.0; NUM_EQ];
        if BiofilmModule::<B>::eq_applies(CONTI_BIOFILMS_EQ_IDX) {
            weights[CONTI_BIOFILMS_EQ_IDX] = BiofilmModule::<B>::eq_weight(CONTI_BIOFILMS_EQ_IDX) / BIOFILM_UNIT_SCALE;
        }
        let mut max = 0.0f64;
        for (cell, r) in self.linearizer.residual().iter().enumerate() {
            let pore_volume = problem.reference_porosity(cell) * problem.dof_total_volume(cell);
            let scale = if pore_volume > 0.0 { dt / pore_volume } else { dt };
            for eq in 0..NUM_EQ {
                max = max.max((r[eq] * weights[eq] * scale).abs());
            }
        }
        max
    }

    /// Updates `solution` in place from the state `old_solution` over `dt`.
    pub fn solve_time_step<const B: bool>(
        &mut self,
        problem: &dyn Problem,
        fluid_system: &FluidSystem,
        module: &BiofilmModule<B>,
        solution: &mut [PrimaryVariables],
        old_solution: &[PrimaryVariables],
        dt: f64,
    ) -> Result<NewtonReport, BlackOilError> {
        let mut residual = f64::INFINITY;
        for iteration in 0..=self.config.max_iterations {
            self.linearizer
                .linearize(problem, fluid_system, module, solution, old_solution, dt)?;
            residual = self.scaled_residual::<B>(problem, dt);
            debug!("Newton iteration {}: scaled residual {:e}", iteration, residual);
            if residual < self.config.tolerance && iteration >= self.config.min_iterations {
                let previous: Vec<f64> = old_solution.iter().flat_map(|pv| pv.0).collect();
                let current: Vec<f64> = solution.iter().flat_map(|pv| pv.0).collect();
                let relative_change = SolutionRelativeChange::between(&previous, &current);
                info!(
                    "Newton converged in {} iterations, relative change {:e}",
                    iteration, relative_change
                );
                return Ok(NewtonReport {
                    iterations: iteration,
                    linear_iterations: iteration,
                    relative_change,
                    residual,
                });
            }
            if iteration == self.config.max_iterations {
                break;
            }
            let update = self
                .backend
                .solve(self.linearizer.jacobian(), self.linearizer.residual())?;
            for (pv, dx) in solution.iter_mut().zip(update.iter()) {
                for idx in 0..NUM_EQ {
                    pv[idx] -= dx[idx];
                }
                pv[WATER_SATURATION_IDX] = pv[WATER_SATURATION_IDX].clamp(0.0, 1.0);
                pv[BIOFILMS_CONCENTRATION_IDX] = pv[BIOFILMS_CONCENTRATION_IDX].clamp(0.0, 1.0);
            }
        }
        Err(BlackOilError::Nonconvergence {
            iterations: self.config.max_iterations,
            residual,
        })
    }
}
