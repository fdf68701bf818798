use super::biofilm_quantities::BiofilmIntensiveQuantities;
use super::element_context::ElementContext;
use super::errors::BlackOilError;
use super::fluid_system::{FluidState, NUM_PHASES};
use super::indices::{PRESSURE_SWITCH_IDX, WATER_SATURATION_IDX};
use crate::Numerics::evaluation::{Evaluation, constant};

/// Volumetric quantities of one cell at one time level.
#[derive(Debug, Clone, PartialEq)]
pub struct IntensiveQuantities<const B: bool> {
    pub fluid_state: FluidState,
    pub reference_porosity: f64,
    pub porosity: Evaluation,
    pub relative_permeability: [Evaluation; NUM_PHASES],
    pub mobility: [Evaluation; NUM_PHASES],
    pub biofilm: BiofilmIntensiveQuantities<B>,
}

impl<const B: bool> Default for IntensiveQuantities<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const B: bool> IntensiveQuantities<B> {
    pub fn new() -> Self {
        Self {
            fluid_state: FluidState::default(),
            reference_porosity: 0.0,
            porosity: constant(0.0),
            relative_permeability: [constant(0.0); NUM_PHASES],
            mobility: [constant(0.0); NUM_PHASES],
            biofilm: BiofilmIntensiveQuantities::default(),
        }
    }

    pub fn update(&mut self, ctx: &ElementContext<B>, dof: usize, time_idx: usize) -> Result<(), BlackOilError> {
        let problem = ctx.problem();
        let fluid_system = ctx.fluid_system();
        let global = ctx.global_space_index(dof);
        let pv = ctx.primary_vars(dof, time_idx);
        let focus = ctx.is_focus(dof, time_idx);

        let pressure = pv.make_evaluation(PRESSURE_SWITCH_IDX, focus);
        let sw = pv.make_evaluation(WATER_SATURATION_IDX, focus);
        self.fluid_state
            .update(fluid_system, pressure, sw, problem.pvt_region_index(global))?;

        self.reference_porosity = problem.reference_porosity(global);
        self.porosity = constant(self.reference_porosity);

        // linear relative permeabilities
        let pvt = self.fluid_state.pvt_region_index;
        for phase_idx in 0..NUM_PHASES {
            if !fluid_system.phase_is_active(phase_idx) {
                self.relative_permeability[phase_idx] = constant(0.0);
                self.mobility[phase_idx] = constant(0.0);
                continue;
            }
            let kr = self.fluid_state.saturation[phase_idx];
            self.relative_permeability[phase_idx] = kr;
            self.mobility[phase_idx] = kr / fluid_system.viscosity(phase_idx, pvt)?;
        }

        self.biofilm
            .update(ctx, dof, time_idx, self.reference_porosity, &mut self.mobility)
    }
}
