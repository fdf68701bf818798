//! Global residual and Jacobian assembly with two-point fluxes.
//!
//! Each cell is visited once as the focus of an element context. Its storage and source
//! terms go to its own row; every face flux is evaluated from the focus side only, with
//! derivatives with respect to the focus cell, and is added to the focus row and
//! subtracted from the neighbour row. Column `i` of the Jacobian is thus complete after
//! cell `i` has been visited.
use super::biofilm_module::BiofilmModule;
use super::element_context::ElementContext;
use super::errors::BlackOilError;
use super::fluid_system::FluidSystem;
use super::indices::{
    BIOFILMS_CONCENTRATION_IDX, CONTI_BIOFILMS_EQ_IDX, EqVector, NUM_EQ, PrimaryVariables, zero_eq_vector,
};
use super::local_residual::BlackOilLocalResidual;
use super::problem::Problem;
use crate::Numerics::block_sparse::BlockSparseMatrix;
use crate::Numerics::evaluation::derivatives;
use log::debug;
use nalgebra::{SMatrix, SVector};

pub type JacobianMatrix = BlockSparseMatrix<NUM_EQ, NUM_EQ>;

fn values(v: &EqVector) -> SVector<f64, NUM_EQ> {
    SVector::<f64, NUM_EQ>::from_fn(|eq, _| v[eq].re)
}

fn jacobian_block(v: &EqVector) -> SMatrix<f64, NUM_EQ, NUM_EQ> {
    let rows: Vec<SVector<f64, NUM_EQ>> = v.iter().map(derivatives).collect();
    SMatrix::<f64, NUM_EQ, NUM_EQ>::from_fn(|eq, pv| rows[eq][pv])
}

#[derive(Debug, Clone)]
pub struct TpfaLinearizer {
    jacobian: JacobianMatrix,
    residual: Vec<SVector<f64, NUM_EQ>>,
}

impl TpfaLinearizer {
    /// Pattern: every cell couples to itself and its neighbours.
    pub fn new(problem: &dyn Problem) -> Result<Self, BlackOilError> {
        let n = problem.num_cells();
        let pattern: Vec<Vec<usize>> = (0..n)
            .map(|cell| {
                let mut cols: Vec<usize> = problem.neighbors(cell).iter().map(|nb| nb.cell).collect();
                cols.push(cell);
                cols
            })
            .collect();
        let jacobian = BlockSparseMatrix::from_pattern(n, &pattern).map_err(BlackOilError::InvalidGrid)?;
        Ok(Self {
            jacobian,
            residual: vec![SVector::zeros(); n],
        })
    }

    pub fn linearize<const B: bool>(
        &mut self,
        problem: &dyn Problem,
        fluid_system: &FluidSystem,
        module: &BiofilmModule<B>,
        solution: &[PrimaryVariables],
        old_solution: &[PrimaryVariables],
        dt: f64,
    ) -> Result<(), BlackOilError> {
        let n = problem.num_cells();
        if solution.len() != n || old_solution.len() != n {
            return Err(BlackOilError::InvalidIndex(format!(
                "grid has {} cells, solutions have {} and {}",
                n,
                solution.len(),
                old_solution.len()
            )));
        }
        self.jacobian.clear_values();
        self.residual.iter_mut().for_each(|r| r.fill(0.0));

        let mut ctx = ElementContext::new(problem, fluid_system, module);
        for cell in 0..n {
            ctx.update_all(cell, solution, old_solution)?;
            let volume = problem.dof_total_volume(cell);

            let mut storage_new = zero_eq_vector();
            let mut storage_old = zero_eq_vector();
            BlackOilLocalResidual::compute_storage(&mut storage_new, &ctx, 0, 0)?;
            BlackOilLocalResidual::compute_storage(&mut storage_old, &ctx, 0, 1)?;
            let mut source = zero_eq_vector();
            BlackOilLocalResidual::compute_source(&mut source, &ctx, 0, 0)?;

            let mut local = zero_eq_vector();
            for eq in 0..NUM_EQ {
                local[eq] = (storage_new[eq] - storage_old[eq].re) * (volume / dt) - source[eq] * volume;
            }
            self.residual[cell] += values(&local);
            self.add_block(cell, cell, &jacobian_block(&local))?;
            if !BiofilmModule::<B>::eq_applies(CONTI_BIOFILMS_EQ_IDX) {
                // unused row: identity keeps the Jacobian regular and the unknown fixed
                let mut identity = SMatrix::<f64, NUM_EQ, NUM_EQ>::zeros();
                identity[(CONTI_BIOFILMS_EQ_IDX, BIOFILMS_CONCENTRATION_IDX)] = 1.0;
                self.add_block(cell, cell, &identity)?;
            }

            for face in 0..ctx.num_interior_faces() {
                let mut flux = zero_eq_vector();
                BlackOilLocalResidual::compute_flux(&mut flux, &ctx, face, 0)?;
                let neighbor = ctx.global_space_index(ctx.interior_face(face).exterior_index);
                let area = problem.face_area(cell, neighbor);
                for f in flux.iter_mut() {
                    *f = *f * area;
                }
                let block = jacobian_block(&flux);
                self.residual[cell] += values(&flux);
                self.add_block(cell, cell, &block)?;
                self.add_block(neighbor, cell, &(-block))?;
            }
        }
        debug!("linearized {} cells, residual max-norm {:e}", n, self.residual_max_norm());
        Ok(())
    }

    fn add_block(&mut self, row: usize, col: usize, block: &SMatrix<f64, NUM_EQ, NUM_EQ>) -> Result<(), BlackOilError> {
        self.jacobian
            .add_to_block(row, col, block)
            .map_err(BlackOilError::InvalidIndex)
    }

    pub fn jacobian(&self) -> &JacobianMatrix {
        &self.jacobian
    }

    pub fn residual(&self) -> &[SVector<f64, NUM_EQ>] {
        &self.residual
    }

    pub fn residual_max_norm(&self) -> f64 {
        self.residual
            .iter()
            .map(|r| r.amax())
            .fold(0.0, f64::max)
    }
}
