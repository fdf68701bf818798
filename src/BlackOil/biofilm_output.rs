//! Cell-wise output of the biofilm volume fraction.
use super::element_context::ElementContext;
use super::errors::BlackOilError;
use crate::Utils::parameters::ParameterRegistry;
use log::debug;
use serde_json::json;
use std::collections::HashMap;

pub const ENABLE_VTK_OUTPUT: &str = "EnableVtkOutput";
pub const VTK_WRITE_BIOFILM_CONCENTRATION: &str = "VtkWriteBiofilmConcentration";
pub const BIOFILM_FRACTION_BUFFER: &str = "biofilm fraction";

/// Receives named per-cell scalar fields at the end of an output step.
pub trait OutputWriter {
    fn attach_scalar_cell_data(&mut self, name: &str, values: &[f64]);
}

/// Keeps the attached fields in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryOutputWriter {
    pub buffers: HashMap<String, Vec<f64>>,
}

impl OutputWriter for MemoryOutputWriter {
    fn attach_scalar_cell_data(&mut self, name: &str, values: &[f64]) {
        self.buffers.insert(name.to_string(), values.to_vec());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BiofilmOutputParams {
    pub biofilms_concentration_output: bool,
}

impl BiofilmOutputParams {
    pub fn register_parameters(registry: &mut ParameterRegistry) {
        registry.register(
            VTK_WRITE_BIOFILM_CONCENTRATION,
            json!(true),
            "Include the concentration of the biofilm component in the water phase in the VTK output files",
        );
    }

    pub fn read(registry: &ParameterRegistry) -> Result<Self, BlackOilError> {
        let biofilms_concentration_output = registry
            .get_bool(VTK_WRITE_BIOFILM_CONCENTRATION)
            .map_err(BlackOilError::Parameter)?;
        Ok(Self {
            biofilms_concentration_output,
        })
    }
}

#[derive(Debug, Clone)]
pub struct BiofilmOutputModule<const B: bool> {
    enable_output: bool,
    params: BiofilmOutputParams,
    biofilms_concentration: Vec<f64>,
}

impl<const B: bool> BiofilmOutputModule<B> {
    /// Reads the output switches; a missing global `EnableVtkOutput` means no output.
    pub fn new(registry: &ParameterRegistry) -> Result<Self, BlackOilError> {
        let mut module = Self {
            enable_output: false,
            params: BiofilmOutputParams::default(),
            biofilms_concentration: Vec::new(),
        };
        if B {
            module.params = BiofilmOutputParams::read(registry)?;
            module.enable_output = registry.get_bool(ENABLE_VTK_OUTPUT).unwrap_or(false);
        }
        Ok(module)
    }

    pub fn register_parameters(registry: &mut ParameterRegistry) {
        if B {
            BiofilmOutputParams::register_parameters(registry);
        }
    }

    fn active(&self) -> bool {
        B && self.enable_output && self.params.biofilms_concentration_output
    }

    pub fn alloc_buffers(&mut self, num_cells: usize) {
        if !self.active() {
            return;
        }
        self.biofilms_concentration.clear();
        self.biofilms_concentration.resize(num_cells, 0.0);
    }

    /// Copies the current biofilm fraction of the primary dofs of `ctx` into the buffer.
    pub fn process_element(&mut self, ctx: &ElementContext<B>) -> Result<(), BlackOilError> {
        if !self.active() {
            return Ok(());
        }
        for dof in 0..ctx.num_primary_dof() {
            let iq = ctx.intensive_quantities(dof, 0);
            let global = ctx.global_space_index(dof);
            let value = iq.biofilm.biofilms_concentration()?.re;
            match self.biofilms_concentration.get_mut(global) {
                Some(slot) => *slot = value,
                None => {
                    return Err(BlackOilError::InvalidIndex(format!(
                        "output buffer holds {} cells, got cell {}",
                        self.biofilms_concentration.len(),
                        global
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn commit_buffers(&self, writer: &mut dyn OutputWriter) {
        if !self.active() {
            return;
        }
        debug!("committing {} biofilm fraction values", self.biofilms_concentration.len());
        writer.attach_scalar_cell_data(BIOFILM_FRACTION_BUFFER, &self.biofilms_concentration);
    }

    pub fn buffer(&self) -> &[f64] {
        &self.biofilms_concentration
    }
}
