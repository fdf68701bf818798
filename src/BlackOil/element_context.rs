//! Local view of the grid around one focus cell for two time levels.
//!
//! Local degree of freedom 0 is the focus cell, the neighbours follow in the order the
//! problem lists them. Face `f` joins the focus cell (interior) with local dof `f + 1`
//! (exterior). Time level 0 is the new solution, time level 1 the old one; derivatives
//! are only carried by the focus cell at time level 0.
use super::biofilm_module::BiofilmModule;
use super::errors::BlackOilError;
use super::extensive_quantities::ExtensiveQuantities;
use super::fluid_system::FluidSystem;
use super::indices::PrimaryVariables;
use super::intensive_quantities::IntensiveQuantities;
use super::problem::Problem;

pub const NUM_TIME_LEVELS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StencilFace {
    pub interior_index: usize,
    pub exterior_index: usize,
}

pub struct ElementContext<'a, const B: bool> {
    problem: &'a dyn Problem,
    fluid_system: &'a FluidSystem,
    biofilm: &'a BiofilmModule<B>,
    dofs: Vec<usize>,
    faces: Vec<StencilFace>,
    primary_vars: [Vec<PrimaryVariables>; NUM_TIME_LEVELS],
    int_quants: [Vec<IntensiveQuantities<B>>; NUM_TIME_LEVELS],
    ext_quants: Vec<ExtensiveQuantities<B>>,
}

impl<'a, const B: bool> ElementContext<'a, B> {
    pub fn new(problem: &'a dyn Problem, fluid_system: &'a FluidSystem, biofilm: &'a BiofilmModule<B>) -> Self {
        Self {
            problem,
            fluid_system,
            biofilm,
            dofs: Vec::new(),
            faces: Vec::new(),
            primary_vars: [Vec::new(), Vec::new()],
            int_quants: [Vec::new(), Vec::new()],
            ext_quants: Vec::new(),
        }
    }

    /// Builds the stencil of `cell`; invalidates all previously computed quantities.
    pub fn update_stencil(&mut self, cell: usize) {
        self.dofs.clear();
        self.faces.clear();
        self.dofs.push(cell);
        for (face, neighbor) in self.problem.neighbors(cell).iter().enumerate() {
            self.dofs.push(neighbor.cell);
            self.faces.push(StencilFace {
                interior_index: 0,
                exterior_index: face + 1,
            });
        }
        for level in 0..NUM_TIME_LEVELS {
            self.primary_vars[level].clear();
            self.int_quants[level].clear();
        }
        self.ext_quants.clear();
    }

    pub fn update_primary_variables(
        &mut self,
        solution: &[PrimaryVariables],
        time_idx: usize,
    ) -> Result<(), BlackOilError> {
        let mut vars = Vec::with_capacity(self.dofs.len());
        for &global in &self.dofs {
            let pv = solution.get(global).ok_or(BlackOilError::InvalidIndex(format!(
                "solution has {} cells, stencil needs cell {}",
                solution.len(),
                global
            )))?;
            vars.push(*pv);
        }
        self.primary_vars[time_idx] = vars;
        Ok(())
    }

    pub fn update_intensive_quantities(&mut self, time_idx: usize) -> Result<(), BlackOilError> {
        let mut quants = std::mem::take(&mut self.int_quants[time_idx]);
        quants.clear();
        quants.resize_with(self.dofs.len(), IntensiveQuantities::new);
        for (dof, iq) in quants.iter_mut().enumerate() {
            iq.update(self, dof, time_idx)?;
        }
        self.int_quants[time_idx] = quants;
        Ok(())
    }

    /// Needs the intensive quantities of `time_idx`.
    pub fn update_extensive_quantities(&mut self, time_idx: usize) -> Result<(), BlackOilError> {
        let mut quants = std::mem::take(&mut self.ext_quants);
        quants.clear();
        quants.resize_with(self.faces.len(), ExtensiveQuantities::new);
        for (face, eq) in quants.iter_mut().enumerate() {
            eq.update(self, face, time_idx)?;
        }
        self.ext_quants = quants;
        Ok(())
    }

    /// Primary variables, intensive and extensive quantities of the focus stencil in one go.
    pub fn update_all(
        &mut self,
        cell: usize,
        solution: &[PrimaryVariables],
        old_solution: &[PrimaryVariables],
    ) -> Result<(), BlackOilError> {
        self.update_stencil(cell);
        self.update_primary_variables(solution, 0)?;
        self.update_primary_variables(old_solution, 1)?;
        self.update_intensive_quantities(0)?;
        self.update_intensive_quantities(1)?;
        self.update_extensive_quantities(0)
    }

    pub fn problem(&self) -> &'a dyn Problem {
        self.problem
    }

    pub fn fluid_system(&self) -> &'a FluidSystem {
        self.fluid_system
    }

    pub fn biofilm_module(&self) -> &'a BiofilmModule<B> {
        self.biofilm
    }

    pub fn num_dof(&self) -> usize {
        self.dofs.len()
    }

    /// only the focus cell is a primary dof with TPFA
    pub fn num_primary_dof(&self) -> usize {
        1.min(self.dofs.len())
    }

    pub fn num_interior_faces(&self) -> usize {
        self.faces.len()
    }

    pub fn global_space_index(&self, dof: usize) -> usize {
        self.dofs[dof]
    }

    pub fn is_focus(&self, dof: usize, time_idx: usize) -> bool {
        dof == 0 && time_idx == 0
    }

    pub fn interior_face(&self, face: usize) -> &StencilFace {
        &self.faces[face]
    }

    pub fn primary_vars(&self, dof: usize, time_idx: usize) -> &PrimaryVariables {
        &self.primary_vars[time_idx][dof]
    }

    pub fn intensive_quantities(&self, dof: usize, time_idx: usize) -> &IntensiveQuantities<B> {
        &self.int_quants[time_idx][dof]
    }

    pub fn extensive_quantities(&self, face: usize) -> &ExtensiveQuantities<B> {
        &self.ext_quants[face]
    }
}
