//! Biofilm parts of the intensive (per cell) and extensive (per face) quantities.
//! Both structs are members of the aggregate black-oil quantities and are updated by
//! them; with `B == false` every update is a no-op and every accessor fails.
use super::element_context::ElementContext;
use super::errors::BlackOilError;
use super::extensive_quantities::{apply_threshold_pressure, upstream_downstream};
use super::fluid_system::{GAS_PHASE_IDX, NUM_PHASES};
use super::indices::BIOFILMS_CONCENTRATION_IDX;
use crate::Numerics::evaluation::{Evaluation, constant, min_with, value_only};

#[derive(Debug, Clone, PartialEq)]
pub struct BiofilmIntensiveQuantities<const B: bool> {
    biofilms_concentration: Evaluation,
    biofilm_mass: Evaluation,
    biofilm_density: Evaluation,
    biofilm_mobility: Evaluation,
    perm_poro: Evaluation,
}

impl<const B: bool> Default for BiofilmIntensiveQuantities<B> {
    fn default() -> Self {
        Self {
            biofilms_concentration: constant(0.0),
            biofilm_mass: constant(0.0),
            biofilm_density: constant(0.0),
            biofilm_mobility: constant(1.0),
            perm_poro: constant(1.0),
        }
    }
}

fn disabled<T>(accessor: &'static str) -> Result<T, BlackOilError> {
    Err(BlackOilError::FeatureDisabled { accessor })
}

impl<const B: bool> BiofilmIntensiveQuantities<B> {
    /// Reads the biofilm concentration of `dof` and scales the phase mobilities by the
    /// permeability-porosity multiplier. Must run after the base mobilities are set.
    pub fn update(
        &mut self,
        ctx: &ElementContext<B>,
        dof: usize,
        time_idx: usize,
        reference_porosity: f64,
        mobility: &mut [Evaluation; NUM_PHASES],
    ) -> Result<(), BlackOilError> {
        if !B {
            return Ok(());
        }
        let problem = ctx.problem();
        let module = ctx.biofilm_module();
        let global = ctx.global_space_index(dof);
        let region = problem.satnum_region_index(global);

        self.biofilms_concentration = ctx
            .primary_vars(dof, time_idx)
            .make_evaluation(BIOFILMS_CONCENTRATION_IDX, ctx.is_focus(dof, time_idx));
        // phi / phi_ref
        let porosity_factor = min_with(-self.biofilms_concentration + 1.0, 1.0);

        // kg of biofilm in the cell and kg per m^3 of reference pore volume
        let tot_volume = problem.dof_total_volume(global);
        let rho_b = module.biofilm_density(region)?;
        self.biofilm_mass = self.biofilms_concentration * (rho_b * reference_porosity * tot_volume);
        let pore_volume = tot_volume * reference_porosity;
        self.biofilm_density = if pore_volume > 0.0 {
            self.biofilm_mass / pore_volume
        } else {
            self.biofilms_concentration * rho_b
        };

        let table = module.permporo_table(region)?;
        self.perm_poro = table
            .eval_evaluation(&porosity_factor, true)
            .map_err(BlackOilError::InvalidTable)?;
        self.biofilm_mobility = self.perm_poro;
        let fluid_system = ctx.fluid_system();
        for (phase_idx, mob) in mobility.iter_mut().enumerate() {
            if !fluid_system.phase_is_active(phase_idx) {
                continue;
            }
            *mob = *mob * self.perm_poro;
        }
        Ok(())
    }

    pub fn biofilms_concentration(&self) -> Result<&Evaluation, BlackOilError> {
        if !B {
            return disabled("biofilmsConcentration");
        }
        Ok(&self.biofilms_concentration)
    }

    pub fn biofilm_mass(&self) -> Result<&Evaluation, BlackOilError> {
        if !B {
            return disabled("biofilmMass");
        }
        Ok(&self.biofilm_mass)
    }

    pub fn biofilm_density(&self) -> Result<&Evaluation, BlackOilError> {
        if !B {
            return disabled("biofilmDensity");
        }
        Ok(&self.biofilm_density)
    }

    pub fn biofilm_mobility(&self) -> Result<&Evaluation, BlackOilError> {
        if !B {
            return disabled("biofilmMobility");
        }
        Ok(&self.biofilm_mobility)
    }

    pub fn perm_poro(&self) -> Result<&Evaluation, BlackOilError> {
        if !B {
            return disabled("permPoro");
        }
        Ok(&self.perm_poro)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BiofilmExtensiveQuantities<const B: bool> {
    biofilm_volume_flux: Evaluation,
    upstream_index: usize,
    downstream_index: usize,
}

impl<const B: bool> Default for BiofilmExtensiveQuantities<B> {
    fn default() -> Self {
        Self {
            biofilm_volume_flux: constant(0.0),
            upstream_index: 0,
            downstream_index: 0,
        }
    }
}

impl<const B: bool> BiofilmExtensiveQuantities<B> {
    /// Volume flux driven by the gas pressure potential across `face`. The exterior
    /// side enters without derivatives.
    pub fn update_flux_trans(
        &mut self,
        ctx: &ElementContext<B>,
        face: usize,
        time_idx: usize,
    ) -> Result<(), BlackOilError> {
        if !B {
            return Ok(());
        }
        let stencil_face = ctx.interior_face(face);
        let interior = stencil_face.interior_index;
        let exterior = stencil_face.exterior_index;
        debug_assert_ne!(interior, exterior);

        let iq_in = ctx.intensive_quantities(interior, time_idx);
        let iq_ex = ctx.intensive_quantities(exterior, time_idx);
        let problem = ctx.problem();
        let global_in = ctx.global_space_index(interior);
        let global_ex = ctx.global_space_index(exterior);

        let thpres = problem.threshold_pressure(global_in, global_ex);
        let trans = problem.transmissibility(global_in, global_ex);
        let face_area = problem.face_area(global_in, global_ex);
        let g = problem.gravity();
        let dist_z = problem.dof_center_depth(global_in) - problem.dof_center_depth(global_ex);

        let rho_in = *iq_in.biofilm.biofilm_density()?;
        let rho_ex = iq_ex.biofilm.biofilm_density()?.re;
        let rho_avg = rho_in * 0.5 + rho_ex * 0.5;

        let pressure_in = iq_in.fluid_state.pressure[GAS_PHASE_IDX];
        let pressure_ex = value_only(&iq_ex.fluid_state.pressure[GAS_PHASE_IDX]) + rho_avg * (dist_z * g);

        let diff = apply_threshold_pressure(pressure_ex - pressure_in, thpres);
        let (up, down) = upstream_downstream(diff.re, interior, exterior, global_in, global_ex);
        self.upstream_index = up;
        self.downstream_index = down;
        if diff.re == 0.0 {
            self.biofilm_volume_flux = constant(0.0);
            return Ok(());
        }

        let mobility = *ctx.intensive_quantities(up, time_idx).biofilm.biofilm_mobility()?;
        let mobility = if up == interior { mobility } else { value_only(&mobility) };
        self.biofilm_volume_flux = mobility * diff * (-trans / face_area);
        Ok(())
    }

    pub fn biofilm_upstream_index(&self) -> Result<usize, BlackOilError> {
        if !B {
            return disabled("biofilmUpstreamIndex");
        }
        Ok(self.upstream_index)
    }

    pub fn biofilm_downstream_index(&self) -> Result<usize, BlackOilError> {
        if !B {
            return disabled("biofilmDownstreamIndex");
        }
        Ok(self.downstream_index)
    }

    pub fn biofilm_volume_flux(&self) -> Result<&Evaluation, BlackOilError> {
        if !B {
            return disabled("biofilmVolumeFlux");
        }
        Ok(&self.biofilm_volume_flux)
    }
}
