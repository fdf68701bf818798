//! Index layout of the two-phase (water, gas) black-oil model with gas dissolved in
//! water and one extra conservation equation for the biofilm. The layout is fixed at
//! compile time; a disabled biofilm module simply never touches its row.
use super::errors::BlackOilError;
use super::fluid_system::{GAS_COMP_IDX, OIL_COMP_IDX, WATER_COMP_IDX};
use crate::Numerics::evaluation::{Evaluation, constant, variable};
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// number of equations == number of primary variables per cell
pub const NUM_EQ: usize = 3;

pub const PRESSURE_SWITCH_IDX: usize = 0;
pub const WATER_SATURATION_IDX: usize = 1;
pub const BIOFILMS_CONCENTRATION_IDX: usize = 2;

/// first component conservation equation (water)
pub const CONTI0_EQ_IDX: usize = 0;
pub const CONTI_BIOFILMS_EQ_IDX: usize = 2;

/// Residual/storage/flux/source vector of one cell.
pub type EqVector = [Evaluation; NUM_EQ];

pub fn zero_eq_vector() -> EqVector {
    [constant(0.0); NUM_EQ]
}

/// Maps a canonical component index of the fluid system to its equation row.
/// The oil component is disabled in this layout.
pub fn canonical_to_active_component_index(comp_idx: usize) -> Result<usize, BlackOilError> {
    match comp_idx {
        WATER_COMP_IDX => Ok(CONTI0_EQ_IDX),
        GAS_COMP_IDX => Ok(CONTI0_EQ_IDX + 1),
        OIL_COMP_IDX => Err(BlackOilError::InvalidIndex(
            "the oil component is not active in the water-gas model".to_string(),
        )),
        _ => Err(BlackOilError::InvalidIndex(format!(
            "unknown component index {}",
            comp_idx
        ))),
    }
}

pub fn active_to_canonical_component_index(eq_idx: usize) -> Result<usize, BlackOilError> {
    match eq_idx {
        0 => Ok(WATER_COMP_IDX),
        1 => Ok(GAS_COMP_IDX),
        _ => Err(BlackOilError::InvalidIndex(format!(
            "equation {} is not a component conservation equation",
            eq_idx
        ))),
    }
}

/// Unknowns of one cell: pressure, water saturation, biofilm volume fraction.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PrimaryVariables(pub [f64; NUM_EQ]);

impl PrimaryVariables {
    pub fn new(pressure: f64, water_saturation: f64, biofilms_concentration: f64) -> Self {
        Self([pressure, water_saturation, biofilms_concentration])
    }

    /// Evaluation of unknown `pv_idx`; derivatives are only seeded for the focus cell.
    pub fn make_evaluation(&self, pv_idx: usize, with_derivatives: bool) -> Evaluation {
        if with_derivatives {
            variable(self.0[pv_idx], pv_idx)
        } else {
            constant(self.0[pv_idx])
        }
    }
}

impl Index<usize> for PrimaryVariables {
    type Output = f64;
    fn index(&self, idx: usize) -> &f64 {
        &self.0[idx]
    }
}

impl IndexMut<usize> for PrimaryVariables {
    fn index_mut(&mut self, idx: usize) -> &mut f64 {
        &mut self.0[idx]
    }
}
