//! # Biofilm column simulator
//!
//! ## Purpose
//! Runs the black-oil model with the biofilm equation on a one-dimensional vertical column,
//! report step by report step, with substeps chosen by the adaptive time stepping.
//!
//! ## Main Structures
//! - [`SimulationConfig`]: everything a run needs, read from a JSON file (optionally under a
//!   `SIMULATION` header, see `Utils::load_from_file`).
//! - [`BiofilmColumnSolver`]: the Newton solve of one substep behind the `SubstepSolver` seam.
//! - [`run_simulation`]: builds the model, runs all report steps, collects output.
use crate::BlackOil::biofilm_module::{BiofilmModule, Biofilm, ENABLE_BIOFILM};
use crate::BlackOil::biofilm_output::{BiofilmOutputModule, ENABLE_VTK_OUTPUT, MemoryOutputWriter};
use crate::BlackOil::biofilm_params::{BiofilmDeck, BiofparaRecord, FactorTable};
use crate::BlackOil::element_context::ElementContext;
use crate::BlackOil::errors::BlackOilError;
use crate::BlackOil::fluid_system::{FluidSystem, PvtRegion};
use crate::BlackOil::indices::PrimaryVariables;
use crate::BlackOil::newton::{NewtonConfig, NewtonSolver};
use crate::BlackOil::problem::{ConnectionGraphProblem, Problem};
use crate::TimeStepping::adaptive_time_stepping::{
    AdaptiveTimeStepping, AdaptiveTimeSteppingConfig, StepReport, SubstepOutcome, SubstepSolver, step_report_table,
};
use crate::TimeStepping::errors::TimeStepError;
use crate::TimeStepping::time_step_control::SECONDS_PER_DAY;
use crate::Utils::load_from_file::LoadData;
use crate::Utils::parameters::ParameterRegistry;
use crate::Wells::errors::WellError;
use log::info;
use prettytable::Table;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    BlackOil(#[from] BlackOilError),
    #[error(transparent)]
    TimeStepping(#[from] TimeStepError),
    #[error(transparent)]
    Well(#[from] WellError),
    #[error("Configuration error: {0}")]
    Config(String),
}

fn default_num_cells() -> usize {
    10
}

/// Vertical column of equal cells with a uniform initial state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnConfig {
    #[serde(default = "default_num_cells")]
    pub num_cells: usize,
    /// m
    pub cell_height: f64,
    /// m^2
    pub area: f64,
    /// m^2
    pub permeability: f64,
    pub porosity: f64,
    /// m
    pub top_depth: f64,
    /// Pa, at the top cell; lower cells start hydrostatic with the water density
    pub initial_pressure: f64,
    pub initial_water_saturation: f64,
    pub initial_biofilm_concentration: f64,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            num_cells: default_num_cells(),
            cell_height: 1.0,
            area: 1.0,
            permeability: 1.0e-13,
            porosity: 0.2,
            top_depth: 1000.0,
            initial_pressure: 1.0e7,
            initial_water_saturation: 0.8,
            initial_biofilm_concentration: 0.01,
        }
    }
}

impl ColumnConfig {
    pub fn build_problem(&self) -> Result<ConnectionGraphProblem, BlackOilError> {
        ConnectionGraphProblem::vertical_column(
            self.num_cells,
            self.cell_height,
            self.area,
            self.permeability,
            self.porosity,
            self.top_depth,
        )
    }

    pub fn initial_solution(&self, problem: &dyn Problem, fluid_system: &FluidSystem) -> Result<Vec<PrimaryVariables>, BlackOilError> {
        let rho_w = fluid_system.region(0)?.reference_density[0];
        let top = problem.dof_center_depth(0);
        Ok((0..problem.num_cells())
            .map(|cell| {
                let p = self.initial_pressure + rho_w * problem.gravity() * (problem.dof_center_depth(cell) - top);
                PrimaryVariables::new(p, self.initial_water_saturation, self.initial_biofilm_concentration)
            })
            .collect())
    }
}

/// Single region biofilm deck matching the compiled biofilm switch.
pub fn default_biofilm_deck() -> BiofilmDeck {
    BiofilmDeck {
        biofilm: ENABLE_BIOFILM,
        num_sat_regions: 1,
        biofpara: vec![BiofparaRecord {
            density_biofilm: 35.0,
            microbial_death_rate: 3.18e-7,
            maximum_growth_rate: 1.0e-6,
            half_velocity_oxygen: 2.0e-5,
            yield_growth_coefficient: 0.5,
        }],
        permfact: vec![FactorTable {
            porosity_change: vec![0.0, 0.5, 1.0],
            multiplier: vec![0.0, 0.3, 1.0],
        }],
        pcfact: Vec::new(),
    }
}

fn default_pvt_regions() -> Vec<PvtRegion> {
    vec![PvtRegion::default()]
}

fn default_report_steps() -> Vec<f64> {
    vec![1.0; 10]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default)]
    pub column: ColumnConfig,
    #[serde(default = "default_biofilm_deck")]
    pub biofilm: BiofilmDeck,
    #[serde(default = "default_pvt_regions")]
    pub pvt_regions: Vec<PvtRegion>,
    #[serde(default)]
    pub newton: NewtonConfig,
    #[serde(default)]
    pub time_stepping: AdaptiveTimeSteppingConfig,
    /// report step lengths in days
    #[serde(default = "default_report_steps")]
    pub report_steps: Vec<f64>,
    /// write the biofilm fraction after every report step
    #[serde(default)]
    pub enable_output: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            column: ColumnConfig::default(),
            biofilm: default_biofilm_deck(),
            pvt_regions: default_pvt_regions(),
            newton: NewtonConfig::default(),
            time_stepping: AdaptiveTimeSteppingConfig::default(),
            report_steps: default_report_steps(),
            enable_output: false,
        }
    }
}

impl SimulationConfig {
    /// The `SIMULATION` section if the file has one, the whole file otherwise.
    pub fn from_file(path: &str) -> Result<Self, SimulationError> {
        let loader = LoadData::new(path.to_string());
        let config = if loader.has_section(&["SIMULATION"]).map_err(SimulationError::Config)? {
            loader.load_section(&["SIMULATION"])
        } else {
            loader.load()
        };
        config.map_err(SimulationError::Config)
    }
}

/// Newton solve of one substep. Keeps the last accepted state and a tentative one.
pub struct BiofilmColumnSolver<'a, const B: bool> {
    problem: &'a dyn Problem,
    fluid_system: &'a FluidSystem,
    module: &'a BiofilmModule<B>,
    newton: NewtonSolver,
    solution: Vec<PrimaryVariables>,
    tentative: Vec<PrimaryVariables>,
}

impl<'a, const B: bool> BiofilmColumnSolver<'a, B> {
    pub fn new(
        problem: &'a dyn Problem,
        fluid_system: &'a FluidSystem,
        module: &'a BiofilmModule<B>,
        newton_config: NewtonConfig,
        initial: Vec<PrimaryVariables>,
    ) -> Result<Self, BlackOilError> {
        if initial.len() != problem.num_cells() {
            return Err(BlackOilError::InvalidGrid(format!(
                "{} initial states for {} cells",
                initial.len(),
                problem.num_cells()
            )));
        }
        Ok(Self {
            problem,
            fluid_system,
            module,
            newton: NewtonSolver::new(problem, newton_config)?,
            tentative: initial.clone(),
            solution: initial,
        })
    }

    pub fn solution(&self) -> &[PrimaryVariables] {
        &self.solution
    }
}

impl<const B: bool> SubstepSolver for BiofilmColumnSolver<'_, B> {
    fn solve(&mut self, _time: f64, dt: f64) -> Result<SubstepOutcome, TimeStepError> {
        self.tentative.clone_from(&self.solution);
        let report = self
            .newton
            .solve_time_step(
                self.problem,
                self.fluid_system,
                self.module,
                &mut self.tentative,
                &self.solution,
                dt,
            )
            .map_err(|e| match e {
                BlackOilError::Nonconvergence { .. } | BlackOilError::LinearSolver(_) => {
                    TimeStepError::Nonconvergence(e.to_string())
                }
                other => TimeStepError::Solver(other.to_string()),
            })?;
        Ok(SubstepOutcome {
            newton_iterations: report.iterations,
            linear_iterations: report.linear_iterations,
            relative_change: report.relative_change,
        })
    }

    fn accept(&mut self) {
        std::mem::swap(&mut self.solution, &mut self.tentative);
    }

    fn reject(&mut self) {
        self.tentative.clone_from(&self.solution);
    }
}

/// Result of a run.
#[derive(Debug, Clone)]
pub struct SimulationSummary {
    /// seconds
    pub final_time: f64,
    pub solution: Vec<PrimaryVariables>,
    pub steps: Vec<StepReport>,
    pub output: MemoryOutputWriter,
}

impl SimulationSummary {
    pub fn step_table(&self) -> Table {
        step_report_table(&self.steps)
    }
}

fn write_output<const B: bool>(
    output: &mut BiofilmOutputModule<B>,
    problem: &dyn Problem,
    fluid_system: &FluidSystem,
    module: &BiofilmModule<B>,
    solution: &[PrimaryVariables],
    writer: &mut MemoryOutputWriter,
) -> Result<(), BlackOilError> {
    output.alloc_buffers(problem.num_cells());
    let mut ctx = ElementContext::new(problem, fluid_system, module);
    for cell in 0..problem.num_cells() {
        ctx.update_all(cell, solution, solution)?;
        output.process_element(&ctx)?;
    }
    output.commit_buffers(writer);
    Ok(())
}

pub fn run_simulation(config: &SimulationConfig) -> Result<SimulationSummary, SimulationError> {
    if config.report_steps.iter().any(|len| *len <= 0.0) {
        return Err(SimulationError::Config("report steps must have positive length".to_string()));
    }
    let problem = config.column.build_problem()?;
    let fluid_system = FluidSystem::new(config.pvt_regions.clone())?;
    let module = Biofilm::from_deck(&config.biofilm)?;

    let mut registry = ParameterRegistry::new();
    registry.register(ENABLE_VTK_OUTPUT, json!(false), "Global switch for the cell output");
    Biofilm::register_parameters(&mut registry);
    registry
        .set(ENABLE_VTK_OUTPUT, json!(config.enable_output))
        .map_err(SimulationError::Config)?;
    let mut output = module.register_output_modules(&registry)?;
    let mut writer = MemoryOutputWriter::default();

    let initial = config.column.initial_solution(&problem, &fluid_system)?;
    let mut solver = BiofilmColumnSolver::new(&problem, &fluid_system, &module, config.newton, initial)?;
    let mut stepping = AdaptiveTimeStepping::new(config.time_stepping.clone())?;

    info!(
        "biofilm column: {} cells, {} report steps, biofilm equation {}",
        problem.num_cells(),
        config.report_steps.len(),
        if ENABLE_BIOFILM { "on" } else { "off" }
    );
    let mut time = 0.0;
    for (report_idx, length_days) in config.report_steps.iter().enumerate() {
        let length = length_days * SECONDS_PER_DAY;
        let timer = stepping.step(time, length, &mut solver)?;
        time += length;
        info!(
            "report step {} done at {} days with {} substeps",
            report_idx,
            time / SECONDS_PER_DAY,
            timer.current_step_num()
        );
        if let Some(output) = output.as_mut() {
            write_output(output, &problem, &fluid_system, &module, solver.solution(), &mut writer)?;
        }
    }

    Ok(SimulationSummary {
        final_time: time,
        solution: solver.solution().to_vec(),
        steps: stepping.reports().to_vec(),
        output: writer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BlackOil::biofilm_output::BIOFILM_FRACTION_BUFFER;
    use crate::BlackOil::indices::BIOFILMS_CONCENTRATION_IDX;
    use crate::TimeStepping::adaptive_time_stepping::StepStatus;
    use approx::assert_relative_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn small_config() -> SimulationConfig {
        SimulationConfig {
            column: ColumnConfig {
                num_cells: 3,
                ..ColumnConfig::default()
            },
            report_steps: vec![1.0, 2.0],
            enable_output: true,
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn column_run_reaches_the_end_time() {
        let config = small_config();
        let summary = run_simulation(&config).unwrap();
        assert_relative_eq!(summary.final_time, 3.0 * SECONDS_PER_DAY);
        assert_eq!(summary.solution.len(), 3);
        let accepted: f64 = summary
            .steps
            .iter()
            .filter(|s| s.status == StepStatus::Accepted)
            .map(|s| s.dt)
            .sum();
        assert_relative_eq!(accepted, 3.0 * SECONDS_PER_DAY, epsilon = 1e-6);
        assert_eq!(summary.step_table().len(), summary.steps.len() + 1);

        if ENABLE_BIOFILM {
            let fraction = &summary.output.buffers[BIOFILM_FRACTION_BUFFER];
            assert_eq!(fraction.len(), 3);
            for (value, pv) in fraction.iter().zip(summary.solution.iter()) {
                assert_relative_eq!(*value, pv[BIOFILMS_CONCENTRATION_IDX]);
                assert!(*value > config.column.initial_biofilm_concentration);
            }
        } else {
            assert!(summary.output.buffers.is_empty());
        }
    }

    #[test]
    fn output_is_skipped_when_disabled() {
        let config = SimulationConfig {
            enable_output: false,
            report_steps: vec![0.5],
            ..small_config()
        };
        let summary = run_simulation(&config).unwrap();
        assert!(summary.output.buffers.is_empty());
    }

    #[test]
    fn deck_contradicting_the_build_is_rejected() {
        let mut config = small_config();
        config.biofilm.biofilm = !ENABLE_BIOFILM;
        assert!(matches!(
            run_simulation(&config),
            Err(SimulationError::BlackOil(BlackOilError::ModuleMismatch(_)))
        ));
        let config = SimulationConfig {
            report_steps: vec![1.0, 0.0],
            ..small_config()
        };
        assert!(matches!(run_simulation(&config), Err(SimulationError::Config(_))));
    }

    #[test]
    fn config_from_sectioned_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "SIMULATION").unwrap();
        writeln!(
            temp_file,
            r#"{{ "column": {{ "num_cells": 4, "cell_height": 2.0, "area": 1.0, "permeability": 1e-13,
                "porosity": 0.3, "top_depth": 500.0, "initial_pressure": 5e6,
                "initial_water_saturation": 0.9, "initial_biofilm_concentration": 0.0 }},
               "report_steps": [0.5, 0.5],
               "time_stepping": {{ "initial_time_step": 3600.0, "controller": {{ "type": "pid" }} }} }}"#
        )
        .unwrap();
        let path = temp_file.path().to_str().unwrap().to_string();
        let config = SimulationConfig::from_file(&path).unwrap();
        assert_eq!(config.column.num_cells, 4);
        assert_eq!(config.report_steps, vec![0.5, 0.5]);
        assert_eq!(config.time_stepping.initial_time_step, 3600.0);
        assert_eq!(config.biofilm, default_biofilm_deck());
        assert_eq!(config.newton, NewtonConfig::default());
        assert!(SimulationConfig::from_file("no/such/config.json").is_err());
    }

    #[test]
    fn hydrostatic_initial_state() {
        let config = ColumnConfig::default();
        let problem = config.build_problem().unwrap();
        let fs = FluidSystem::default();
        let initial = config.initial_solution(&problem, &fs).unwrap();
        assert_relative_eq!(initial[0][0], config.initial_pressure);
        assert_relative_eq!(
            initial[1][0] - initial[0][0],
            1000.0 * 9.80665 * config.cell_height,
            epsilon = 1e-6
        );
    }
}
