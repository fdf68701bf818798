//! Matrices and residual of one multisegment well.
//!
//! `B` (segment rows, cell columns) couples the reservoir unknowns into the well equations,
//! `C` (same shape) couples the well unknowns into the reservoir equations through `C^T`,
//! and `D` holds the well equations with respect to the segment unknowns. The pattern of `D`
//! has the diagonal block of every segment plus the blocks towards its outlet and its inlets.
//!
//! Lifecycle within one nonlinear iteration:
//! `init` (once per topology) -> `add_*` -> `create_solver` -> `apply`/`solve` -> `clear`.
use super::errors::WellError;
use super::segment_topology::MultisegmentWellTopology;
use crate::Numerics::block_sparse::{BlockSparseMatrix, flatten, unflatten};
use log::debug;
use nalgebra::{DVector, Dyn, LU, SMatrix, SVector};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WellSystemState {
    Uninitialized,
    /// pattern fixed, values zero
    Initialized,
    Assembled,
    Factorized,
    Solved,
}

pub type WellVector<const NUM_WELL_EQ: usize> = Vec<SVector<f64, NUM_WELL_EQ>>;
pub type ReservoirVector<const NUM_EQ: usize> = Vec<SVector<f64, NUM_EQ>>;

#[derive(Debug, Clone)]
pub struct MultisegmentWellEquations<const NUM_EQ: usize, const NUM_WELL_EQ: usize> {
    topology: MultisegmentWellTopology,
    num_cells: usize,
    dune_b: BlockSparseMatrix<NUM_WELL_EQ, NUM_EQ>,
    dune_c: BlockSparseMatrix<NUM_WELL_EQ, NUM_EQ>,
    dune_d: BlockSparseMatrix<NUM_WELL_EQ, NUM_WELL_EQ>,
    res_well: WellVector<NUM_WELL_EQ>,
    dune_d_solver: Option<LU<f64, Dyn, Dyn>>,
    state: WellSystemState,
}

impl<const NUM_EQ: usize, const NUM_WELL_EQ: usize> MultisegmentWellEquations<NUM_EQ, NUM_WELL_EQ> {
    pub fn new(topology: MultisegmentWellTopology) -> Self {
        Self {
            topology,
            num_cells: 0,
            dune_b: BlockSparseMatrix::default(),
            dune_c: BlockSparseMatrix::default(),
            dune_d: BlockSparseMatrix::default(),
            res_well: Vec::new(),
            dune_d_solver: None,
            state: WellSystemState::Uninitialized,
        }
    }

    /// Builds the sparsity patterns. `cells[perf]` is the reservoir cell of perforation `perf`.
    pub fn init(&mut self, num_cells: usize, num_perfs: usize, cells: &[usize]) -> Result<(), WellError> {
        if cells.len() != num_perfs {
            return Err(WellError::DimensionMismatch(format!(
                "{} perforation cells given for {} perforations",
                cells.len(),
                num_perfs
            )));
        }
        let num_segments = self.topology.number_of_segments();

        let mut d_pattern = Vec::with_capacity(num_segments);
        let mut coupling_pattern = Vec::with_capacity(num_segments);
        for seg in 0..num_segments {
            let mut row = Vec::with_capacity(2 + self.topology.segment_inlets()[seg].len());
            if let Some(outlet) = self.topology.outlet_index(seg) {
                row.push(outlet);
            }
            row.push(seg);
            row.extend_from_slice(&self.topology.segment_inlets()[seg]);
            d_pattern.push(row);

            let mut perf_cells = Vec::new();
            for &perf in self.topology.segment_perforations(seg) {
                let cell = *cells.get(perf).ok_or_else(|| {
                    WellError::DimensionMismatch(format!(
                        "perforation {} of segment {} exceeds the {} perforations",
                        perf,
                        self.topology.segment_set()[seg].segment_number,
                        num_perfs
                    ))
                })?;
                perf_cells.push(cell);
            }
            coupling_pattern.push(perf_cells);
        }

        self.dune_d =
            BlockSparseMatrix::from_pattern(num_segments, &d_pattern).map_err(WellError::Topology)?;
        self.dune_b = BlockSparseMatrix::from_pattern(num_cells, &coupling_pattern)
            .map_err(WellError::DimensionMismatch)?;
        self.dune_c = BlockSparseMatrix::from_pattern(num_cells, &coupling_pattern)
            .map_err(WellError::DimensionMismatch)?;
        self.res_well = vec![SVector::zeros(); num_segments];
        self.num_cells = num_cells;
        self.dune_d_solver = None;
        self.state = WellSystemState::Initialized;
        debug!(
            "multisegment well system: {} segments, {} blocks in D, {} perforations",
            num_segments,
            self.dune_d.nnz(),
            num_perfs
        );
        Ok(())
    }

    /// Zeroes all values and drops the factorization; the pattern is kept.
    pub fn clear(&mut self) -> Result<(), WellError> {
        if self.state == WellSystemState::Uninitialized {
            return Err(WellError::InvalidState {
                expected: "an initialized system",
                found: self.state,
            });
        }
        self.dune_b.clear_values();
        self.dune_c.clear_values();
        self.dune_d.clear_values();
        self.res_well.iter_mut().for_each(|r| r.fill(0.0));
        self.dune_d_solver = None;
        self.state = WellSystemState::Initialized;
        Ok(())
    }

    fn check_assembling(&self) -> Result<(), WellError> {
        match self.state {
            WellSystemState::Initialized | WellSystemState::Assembled => Ok(()),
            found => Err(WellError::InvalidState {
                expected: "an initialized or assembling system (call clear first)",
                found,
            }),
        }
    }

    pub fn add_d(
        &mut self,
        seg: usize,
        other_seg: usize,
        value: &SMatrix<f64, NUM_WELL_EQ, NUM_WELL_EQ>,
    ) -> Result<(), WellError> {
        self.check_assembling()?;
        self.dune_d
            .add_to_block(seg, other_seg, value)
            .map_err(|_| WellError::PatternViolation {
                matrix: "D",
                row: seg,
                col: other_seg,
            })?;
        self.state = WellSystemState::Assembled;
        Ok(())
    }

    pub fn add_b(&mut self, seg: usize, cell: usize, value: &SMatrix<f64, NUM_WELL_EQ, NUM_EQ>) -> Result<(), WellError> {
        self.check_assembling()?;
        self.dune_b
            .add_to_block(seg, cell, value)
            .map_err(|_| WellError::PatternViolation {
                matrix: "B",
                row: seg,
                col: cell,
            })?;
        self.state = WellSystemState::Assembled;
        Ok(())
    }

    pub fn add_c(&mut self, seg: usize, cell: usize, value: &SMatrix<f64, NUM_WELL_EQ, NUM_EQ>) -> Result<(), WellError> {
        self.check_assembling()?;
        self.dune_c
            .add_to_block(seg, cell, value)
            .map_err(|_| WellError::PatternViolation {
                matrix: "C",
                row: seg,
                col: cell,
            })?;
        self.state = WellSystemState::Assembled;
        Ok(())
    }

    pub fn add_residual(&mut self, seg: usize, value: &SVector<f64, NUM_WELL_EQ>) -> Result<(), WellError> {
        self.check_assembling()?;
        let entry = self.res_well.get_mut(seg).ok_or_else(|| {
            WellError::DimensionMismatch(format!("segment index {} out of range", seg))
        })?;
        *entry += value;
        self.state = WellSystemState::Assembled;
        Ok(())
    }

    /// Factorizes D; does nothing if D is already factorized since the last `clear`.
    #[cfg(feature = "direct-solver")]
    pub fn create_solver(&mut self) -> Result<(), WellError> {
        if self.dune_d_solver.is_some() {
            return Ok(());
        }
        if self.state == WellSystemState::Uninitialized {
            return Err(WellError::InvalidState {
                expected: "an assembled system",
                found: self.state,
            });
        }
        let lu = self.dune_d.to_dense().lu();
        if !lu.is_invertible() {
            return Err(WellError::SingularMatrix);
        }
        self.dune_d_solver = Some(lu);
        self.state = WellSystemState::Factorized;
        Ok(())
    }

    #[cfg(not(feature = "direct-solver"))]
    pub fn create_solver(&mut self) -> Result<(), WellError> {
        Err(WellError::MissingDirectSolver)
    }

    fn inv_d(&self, rhs: &[SVector<f64, NUM_WELL_EQ>]) -> Result<WellVector<NUM_WELL_EQ>, WellError> {
        let solver = self.dune_d_solver.as_ref().ok_or(WellError::InvalidState {
            expected: "a factorized system (call create_solver first)",
            found: self.state,
        })?;
        let solution: DVector<f64> = solver.solve(&flatten(rhs)).ok_or(WellError::SingularMatrix)?;
        Ok(unflatten(&solution))
    }

    fn check_reservoir_len(&self, len: usize) -> Result<(), WellError> {
        if len != self.num_cells {
            return Err(WellError::DimensionMismatch(format!(
                "reservoir vector has {} blocks, the well was initialized for {} cells",
                len, self.num_cells
            )));
        }
        Ok(())
    }

    /// `Ax -= C^T D^-1 B x`
    pub fn apply(&self, x: &[SVector<f64, NUM_EQ>], ax: &mut [SVector<f64, NUM_EQ>]) -> Result<(), WellError> {
        self.check_reservoir_len(x.len())?;
        self.check_reservoir_len(ax.len())?;
        let bx = self.dune_b.mv(x);
        let inv_dbx = self.inv_d(&bx)?;
        self.dune_c.mmtv(&inv_dbx, ax);
        Ok(())
    }

    /// `r -= C^T D^-1 r_well`
    pub fn apply_residual(&self, r: &mut [SVector<f64, NUM_EQ>]) -> Result<(), WellError> {
        self.check_reservoir_len(r.len())?;
        let inv_drw = self.inv_d(&self.res_well)?;
        self.dune_c.mmtv(&inv_drw, r);
        Ok(())
    }

    /// `D^-1 r_well`
    pub fn solve(&mut self) -> Result<WellVector<NUM_WELL_EQ>, WellError> {
        let dx_well = self.inv_d(&self.res_well)?;
        self.state = WellSystemState::Solved;
        Ok(dx_well)
    }

    /// Well update for a reservoir update `x`: `D^-1 (r_well - B x)`.
    pub fn recover_solution_well(&self, x: &[SVector<f64, NUM_EQ>]) -> Result<WellVector<NUM_WELL_EQ>, WellError> {
        self.check_reservoir_len(x.len())?;
        let bx = self.dune_b.mv(x);
        let rhs: WellVector<NUM_WELL_EQ> = self.res_well.iter().zip(bx.iter()).map(|(r, b)| r - b).collect();
        self.inv_d(&rhs)
    }

    pub fn state(&self) -> WellSystemState {
        self.state
    }

    pub fn topology(&self) -> &MultisegmentWellTopology {
        &self.topology
    }

    pub fn num_cells(&self) -> usize {
        self.num_cells
    }

    pub fn d(&self) -> &BlockSparseMatrix<NUM_WELL_EQ, NUM_WELL_EQ> {
        &self.dune_d
    }

    pub fn b(&self) -> &BlockSparseMatrix<NUM_WELL_EQ, NUM_EQ> {
        &self.dune_b
    }

    pub fn c(&self) -> &BlockSparseMatrix<NUM_WELL_EQ, NUM_EQ> {
        &self.dune_c
    }

    pub fn residual(&self) -> &[SVector<f64, NUM_WELL_EQ>] {
        &self.res_well
    }
}
