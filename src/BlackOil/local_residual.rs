//! Storage, flux and source terms of the conservation equations of one cell.
use super::element_context::ElementContext;
use super::errors::BlackOilError;
use super::extensive_quantities::ExtensiveQuantities;
use super::fluid_system::{GAS_COMP_IDX, GAS_PHASE_IDX, WATER_COMP_IDX, WATER_PHASE_IDX};
use super::indices::{EqVector, canonical_to_active_component_index};
use super::intensive_quantities::IntensiveQuantities;
use crate::Numerics::evaluation::{Evaluation, value_only};

/// Quantity of the upstream cell of a phase; without derivatives unless it is the interior.
fn upstream_value<const B: bool>(
    ctx: &ElementContext<B>,
    ext: &ExtensiveQuantities<B>,
    phase_idx: usize,
    time_idx: usize,
    f: impl Fn(&IntensiveQuantities<B>) -> Evaluation,
) -> Evaluation {
    let up = ext.upstream_index(phase_idx);
    let value = f(ctx.intensive_quantities(up, time_idx));
    if up == ext.interior_index() { value } else { value_only(&value) }
}

pub struct BlackOilLocalResidual;

impl BlackOilLocalResidual {
    /// Surface volumes of water and gas per unit bulk volume, then the module terms.
    pub fn compute_storage<const B: bool>(
        storage: &mut EqVector,
        ctx: &ElementContext<B>,
        dof: usize,
        time_idx: usize,
    ) -> Result<(), BlackOilError> {
        let iq = ctx.intensive_quantities(dof, time_idx);
        let water = canonical_to_active_component_index(WATER_COMP_IDX)?;
        let gas = canonical_to_active_component_index(GAS_COMP_IDX)?;
        let fs = &iq.fluid_state;
        let water_volume = fs.saturation[WATER_PHASE_IDX] * fs.inv_b[WATER_PHASE_IDX];
        storage[water] = iq.porosity * water_volume;
        storage[gas] = iq.porosity
            * (fs.saturation[GAS_PHASE_IDX] * fs.inv_b[GAS_PHASE_IDX] + water_volume * fs.rsw);
        ctx.biofilm_module().add_storage(storage, iq)
    }

    /// Surface volume fluxes over `face` per unit area, then the module terms.
    pub fn compute_flux<const B: bool>(
        flux: &mut EqVector,
        ctx: &ElementContext<B>,
        face: usize,
        time_idx: usize,
    ) -> Result<(), BlackOilError> {
        let ext = ctx.extensive_quantities(face);
        let water = canonical_to_active_component_index(WATER_COMP_IDX)?;
        let gas = canonical_to_active_component_index(GAS_COMP_IDX)?;

        let water_flux = *ext.volume_flux(WATER_PHASE_IDX)
            * upstream_value(ctx, ext, WATER_PHASE_IDX, time_idx, |iq| iq.fluid_state.inv_b[WATER_PHASE_IDX]);
        let dissolved = water_flux * upstream_value(ctx, ext, WATER_PHASE_IDX, time_idx, |iq| iq.fluid_state.rsw);
        let free_gas = *ext.volume_flux(GAS_PHASE_IDX)
            * upstream_value(ctx, ext, GAS_PHASE_IDX, time_idx, |iq| iq.fluid_state.inv_b[GAS_PHASE_IDX]);
        flux[water] = water_flux;
        flux[gas] = free_gas + dissolved;
        ctx.biofilm_module().compute_flux(flux, ctx, face, time_idx)
    }

    /// Volumetric sources per unit bulk volume; only modules contribute.
    pub fn compute_source<const B: bool>(
        source: &mut EqVector,
        ctx: &ElementContext<B>,
        dof: usize,
        time_idx: usize,
    ) -> Result<(), BlackOilError> {
        ctx.biofilm_module()
            .add_source_from_context(source, ctx, dof, time_idx)
    }
}
