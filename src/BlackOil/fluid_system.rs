//! Water-gas black-oil fluid system with gas dissolving into water (Rsw).
//!
//! PVT relations are linearized around a reference pressure per PVT region:
//! `1/B = 1 + c (p - p_ref)` for both phases and `Rsw = r p` for the saturated
//! dissolved-gas ratio. Densities follow the usual black-oil composition rule
//! `rho_w = (rho_w,ref + Rsw rho_g,ref) / B_w` and `rho_g = rho_g,ref / B_g`.
use super::errors::BlackOilError;
use crate::Numerics::evaluation::{Evaluation, constant, max_with};
use serde::{Deserialize, Serialize};

pub const NUM_PHASES: usize = 3;

// canonical phase indices
pub const WATER_PHASE_IDX: usize = 0;
pub const OIL_PHASE_IDX: usize = 1;
pub const GAS_PHASE_IDX: usize = 2;

// canonical component indices
pub const OIL_COMP_IDX: usize = 0;
pub const WATER_COMP_IDX: usize = 1;
pub const GAS_COMP_IDX: usize = 2;

/// PVT data of one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PvtRegion {
    /// surface densities, kg/m^3, canonical phase order
    pub reference_density: [f64; NUM_PHASES],
    /// Pa
    pub reference_pressure: f64,
    /// 1/Pa
    pub water_compressibility: f64,
    /// 1/Pa
    pub gas_compressibility: f64,
    /// saturated Rsw per Pa
    pub dissolution_factor: f64,
    /// Pa s, canonical phase order
    pub viscosity: [f64; NUM_PHASES],
}

impl Default for PvtRegion {
    fn default() -> Self {
        Self {
            reference_density: [1000.0, 800.0, 1.8],
            reference_pressure: 1.0e5,
            water_compressibility: 4.5e-10,
            gas_compressibility: 1.0e-7,
            dissolution_factor: 1.5e-7,
            viscosity: [1.0e-3, 1.0e-3, 2.0e-5],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FluidSystem {
    pub regions: Vec<PvtRegion>,
}

impl Default for FluidSystem {
    fn default() -> Self {
        Self {
            regions: vec![PvtRegion::default()],
        }
    }
}

impl FluidSystem {
    pub fn new(regions: Vec<PvtRegion>) -> Result<Self, BlackOilError> {
        if regions.is_empty() {
            return Err(BlackOilError::InvalidTable(
                "fluid system needs at least one PVT region".to_string(),
            ));
        }
        Ok(Self { regions })
    }

    pub fn num_regions(&self) -> usize {
        self.regions.len()
    }

    pub fn phase_is_active(&self, phase_idx: usize) -> bool {
        phase_idx == WATER_PHASE_IDX || phase_idx == GAS_PHASE_IDX
    }

    pub fn region(&self, pvt_region_idx: usize) -> Result<&PvtRegion, BlackOilError> {
        self.regions
            .get(pvt_region_idx)
            .ok_or(BlackOilError::RegionOutOfRange {
                what: "PVT region",
                region: pvt_region_idx,
                num_regions: self.regions.len(),
            })
    }

    pub fn reference_density(&self, phase_idx: usize, pvt_region_idx: usize) -> Result<f64, BlackOilError> {
        Ok(self.region(pvt_region_idx)?.reference_density[phase_idx])
    }

    pub fn viscosity(&self, phase_idx: usize, pvt_region_idx: usize) -> Result<f64, BlackOilError> {
        Ok(self.region(pvt_region_idx)?.viscosity[phase_idx])
    }

    /// 1/B of an active phase at pressure `p`; zero for the inactive oil phase
    pub fn inverse_formation_volume_factor(
        &self,
        phase_idx: usize,
        p: &Evaluation,
        pvt_region_idx: usize,
    ) -> Result<Evaluation, BlackOilError> {
        let region = self.region(pvt_region_idx)?;
        let compressibility = match phase_idx {
            WATER_PHASE_IDX => region.water_compressibility,
            GAS_PHASE_IDX => region.gas_compressibility,
            _ => return Ok(constant(0.0)),
        };
        let dp = *p - region.reference_pressure;
        // keep 1/B positive for unphysical Newton iterates
        Ok(max_with(dp * compressibility + 1.0, 1.0e-3))
    }

    /// saturated gas-in-water ratio, surface volumes
    pub fn saturated_rsw(&self, p: &Evaluation, pvt_region_idx: usize) -> Result<Evaluation, BlackOilError> {
        let region = self.region(pvt_region_idx)?;
        Ok(*p * region.dissolution_factor)
    }
}

/// Thermodynamic state of one cell, canonical phase order.
#[derive(Debug, Clone, PartialEq)]
pub struct FluidState {
    pub pressure: [Evaluation; NUM_PHASES],
    pub saturation: [Evaluation; NUM_PHASES],
    pub inv_b: [Evaluation; NUM_PHASES],
    pub density: [Evaluation; NUM_PHASES],
    pub rsw: Evaluation,
    pub pvt_region_index: usize,
}

impl Default for FluidState {
    fn default() -> Self {
        Self {
            pressure: [constant(0.0); NUM_PHASES],
            saturation: [constant(0.0); NUM_PHASES],
            inv_b: [constant(0.0); NUM_PHASES],
            density: [constant(0.0); NUM_PHASES],
            rsw: constant(0.0),
            pvt_region_index: 0,
        }
    }
}

impl FluidState {
    /// Fills the state from pressure and water saturation; capillary pressure is neglected.
    pub fn update(
        &mut self,
        fluid_system: &FluidSystem,
        pressure: Evaluation,
        water_saturation: Evaluation,
        pvt_region_idx: usize,
    ) -> Result<(), BlackOilError> {
        self.pvt_region_index = pvt_region_idx;
        for phase_idx in 0..NUM_PHASES {
            self.pressure[phase_idx] = pressure;
        }
        self.saturation[WATER_PHASE_IDX] = water_saturation;
        self.saturation[GAS_PHASE_IDX] = -water_saturation + 1.0;
        self.saturation[OIL_PHASE_IDX] = constant(0.0);

        for phase_idx in 0..NUM_PHASES {
            self.inv_b[phase_idx] =
                fluid_system.inverse_formation_volume_factor(phase_idx, &pressure, pvt_region_idx)?;
        }
        self.rsw = fluid_system.saturated_rsw(&pressure, pvt_region_idx)?;

        let rho_w_ref = fluid_system.reference_density(WATER_PHASE_IDX, pvt_region_idx)?;
        let rho_g_ref = fluid_system.reference_density(GAS_PHASE_IDX, pvt_region_idx)?;
        self.density[WATER_PHASE_IDX] = self.inv_b[WATER_PHASE_IDX] * (self.rsw * rho_g_ref + rho_w_ref);
        self.density[GAS_PHASE_IDX] = self.inv_b[GAS_PHASE_IDX] * rho_g_ref;
        self.density[OIL_PHASE_IDX] = constant(0.0);
        Ok(())
    }
}
