//! Biofilm conservation equation of the black-oil model.
//!
//! ## Purpose
//! Tracks the volume fraction of pore space occupied by biofilm. The biofilm grows by
//! consuming gas dissolved in water (Monod kinetics), decays at a constant rate, is
//! transported with a gas-pressure driven volume flux and clogs the pores, which scales
//! every phase mobility through the PERMFACT permeability-porosity table.
//!
//! ## Main Structures
//! - `BiofilmModule<B>`: parameters plus the storage, flux and source contributions.
//!   `B` is the compile-time switch; with `B == false` every contribution is a no-op
//!   and every physical accessor returns `BlackOilError::FeatureDisabled`.
//! - `Biofilm`: the module as selected by the `biofilm` cargo feature.
//!
//! The module owns its parameters; nothing is shared through global state. Storage,
//! flux and source are scaled by `BIOFILM_UNIT_SCALE` to keep the biofilm row of the
//! Jacobian in the range of the mass balance rows.
use super::biofilm_output::BiofilmOutputModule;
use super::biofilm_params::{BiofilmDeck, BiofilmParams};
use super::element_context::ElementContext;
use super::errors::BlackOilError;
use super::fluid_system::{FluidSystem, GAS_COMP_IDX, GAS_PHASE_IDX, WATER_PHASE_IDX};
use super::indices::{CONTI_BIOFILMS_EQ_IDX, EqVector, canonical_to_active_component_index};
use super::intensive_quantities::IntensiveQuantities;
use crate::Numerics::evaluation::{Evaluation, value_only};
use crate::Numerics::tabulated::Tabulated1DFunction;
use crate::Utils::parameters::ParameterRegistry;

pub const ENABLE_BIOFILM: bool = cfg!(feature = "biofilm");

pub const BIOFILM_UNIT_SCALE: f64 = 1e-6;

pub type Biofilm = BiofilmModule<ENABLE_BIOFILM>;

/// Monod growth rate `mu xG rho_w / (xG rho_w + Kn)`. A negative dissolved mass fraction
/// (possible in Newton iterates) uses the linear law `mu xG rho_w / Kn` instead.
pub fn monod_growth_rate(mu: f64, x_g: Evaluation, rho_w: Evaluation, kn: f64) -> Evaluation {
    let substrate = x_g * rho_w;
    if x_g.re < 0.0 {
        substrate * (mu / kn)
    } else {
        substrate / (substrate + kn) * mu
    }
}

/// Mass fraction of dissolved gas in water for a given Rsw.
pub fn rsw_to_mass_fraction(rsw: Evaluation, rho_w_ref: f64, rho_g_ref: f64) -> Evaluation {
    let rho_w_g = rsw * rho_g_ref;
    rho_w_g / (rho_w_g + rho_w_ref)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BiofilmModule<const B: bool> {
    params: BiofilmParams,
}

impl<const B: bool> BiofilmModule<B> {
    pub const ENABLED: bool = B;

    pub fn new(params: BiofilmParams) -> Self {
        Self { params }
    }

    pub fn from_deck(deck: &BiofilmDeck) -> Result<Self, BlackOilError> {
        Ok(Self::new(BiofilmParams::init_from_deck::<B>(deck)?))
    }

    pub fn set_params(&mut self, params: BiofilmParams) {
        self.params = params;
    }

    pub fn params(&self) -> &BiofilmParams {
        &self.params
    }

    pub fn register_parameters(registry: &mut ParameterRegistry) {
        if !B {
            return;
        }
        BiofilmOutputModule::<B>::register_parameters(registry);
    }

    /// the biofilm output module, `None` when biofilms are switched off
    pub fn register_output_modules(
        &self,
        registry: &ParameterRegistry,
    ) -> Result<Option<BiofilmOutputModule<B>>, BlackOilError> {
        if !B {
            return Ok(None);
        }
        Ok(Some(BiofilmOutputModule::new(registry)?))
    }

    pub fn eq_applies(eq_idx: usize) -> bool {
        B && eq_idx == CONTI_BIOFILMS_EQ_IDX
    }

    pub fn eq_weight(eq_idx: usize) -> f64 {
        debug_assert!(Self::eq_applies(eq_idx));
        1.0
    }

    /// Adds the biofilm storage term. Must be called after the water storage is set.
    pub fn add_storage(&self, storage: &mut EqVector, iq: &IntensiveQuantities<B>) -> Result<(), BlackOilError> {
        if !B {
            return Ok(());
        }
        let solid_biofilm = *iq.biofilm.biofilms_concentration()? * iq.reference_porosity;
        storage[CONTI_BIOFILMS_EQ_IDX] += solid_biofilm * BIOFILM_UNIT_SCALE;
        Ok(())
    }

    /// Sets the biofilm flux over `face`, upwinded with the water phase.
    pub fn compute_flux(
        &self,
        flux: &mut EqVector,
        ctx: &ElementContext<B>,
        face: usize,
        time_idx: usize,
    ) -> Result<(), BlackOilError> {
        if !B {
            return Ok(());
        }
        let ext = ctx.extensive_quantities(face);
        let up_idx = ext.upstream_index(WATER_PHASE_IDX);
        let in_idx = ext.interior_index();
        let up = ctx.intensive_quantities(up_idx, time_idx);

        let volume_flux = *ext.biofilm.biofilm_volume_flux()?;
        let concentration = *up.biofilm.biofilms_concentration()?;
        let concentration = if up_idx == in_idx {
            concentration
        } else {
            value_only(&concentration)
        };
        flux[CONTI_BIOFILMS_EQ_IDX] = volume_flux * concentration * BIOFILM_UNIT_SCALE;
        Ok(())
    }

    /// Growth and decay of the biofilm and the dissolved gas it consumes.
    pub fn add_source(
        &self,
        source: &mut EqVector,
        iq: &IntensiveQuantities<B>,
        satnum_region_idx: usize,
        fluid_system: &FluidSystem,
    ) -> Result<(), BlackOilError> {
        if !B {
            return Ok(());
        }
        let rho_b = self.biofilm_density(satnum_region_idx)?;
        let mu = self.max_growth_rate(satnum_region_idx)?;
        let kn = self.half_velocity_coeff(satnum_region_idx)?;
        let y = self.yield_coeff(satnum_region_idx)?;
        let kd = self.decay_coeff(satnum_region_idx)?;

        let fs = &iq.fluid_state;
        let pvt = fs.pvt_region_index;
        let rho_w_ref = fluid_system.reference_density(WATER_PHASE_IDX, pvt)?;
        let rho_g_ref = fluid_system.reference_density(GAS_PHASE_IDX, pvt)?;
        let x_g = rsw_to_mass_fraction(fs.rsw, rho_w_ref, rho_g_ref);
        let rho_w = fs.density[WATER_PHASE_IDX];

        let c_biof = *iq.biofilm.biofilms_concentration()? * iq.reference_porosity;
        let kg = monod_growth_rate(mu, x_g, rho_w, kn);

        source[CONTI_BIOFILMS_EQ_IDX] += (kg - kd) * c_biof * BIOFILM_UNIT_SCALE;

        let active_gas_comp_idx = canonical_to_active_component_index(GAS_COMP_IDX)?;
        source[active_gas_comp_idx] -= c_biof * kg * (rho_b / (y * rho_g_ref));
        Ok(())
    }

    pub fn add_source_from_context(
        &self,
        source: &mut EqVector,
        ctx: &ElementContext<B>,
        dof: usize,
        time_idx: usize,
    ) -> Result<(), BlackOilError> {
        if !B {
            return Ok(());
        }
        let region = ctx.problem().satnum_region_index(ctx.global_space_index(dof));
        self.add_source(source, ctx.intensive_quantities(dof, time_idx), region, ctx.fluid_system())
    }

    fn checked<'p, T>(&self, what: &'static str, values: &'p [T], region: usize) -> Result<&'p T, BlackOilError> {
        if !B {
            return Err(BlackOilError::FeatureDisabled { accessor: what });
        }
        values.get(region).ok_or(BlackOilError::RegionOutOfRange {
            what,
            region,
            num_regions: values.len(),
        })
    }

    pub fn permporo_table(&self, satnum_region_idx: usize) -> Result<&Tabulated1DFunction, BlackOilError> {
        self.checked("permporoTable", &self.params.permfact_table, satnum_region_idx)
    }

    pub fn pcfact_table(&self, satnum_region_idx: usize) -> Result<&Tabulated1DFunction, BlackOilError> {
        self.checked("pcfactTable", &self.params.pcfact_table, satnum_region_idx)
    }

    pub fn biofilm_density(&self, satnum_region_idx: usize) -> Result<f64, BlackOilError> {
        self.checked("biofilmDensity", &self.params.density_biofilm, satnum_region_idx)
            .copied()
    }

    pub fn max_growth_rate(&self, satnum_region_idx: usize) -> Result<f64, BlackOilError> {
        self.checked("maxGrowthRate", &self.params.maximum_growth_rate, satnum_region_idx)
            .copied()
    }

    pub fn half_velocity_coeff(&self, satnum_region_idx: usize) -> Result<f64, BlackOilError> {
        self.checked("halfVelocityCoeff", &self.params.half_velocity_oxygen, satnum_region_idx)
            .copied()
    }

    pub fn yield_coeff(&self, satnum_region_idx: usize) -> Result<f64, BlackOilError> {
        self.checked("yieldCoeff", &self.params.yield_growth_coefficient, satnum_region_idx)
            .copied()
    }

    pub fn decay_coeff(&self, satnum_region_idx: usize) -> Result<f64, BlackOilError> {
        self.checked("decayCoeff", &self.params.microbial_death_rate, satnum_region_idx)
            .copied()
    }

    pub fn has_pcfact_tables(&self) -> bool {
        B && !self.params.pcfact_table.is_empty()
    }
}
