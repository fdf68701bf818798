//! # BlackOil
//!
//! ## Purpose
//! Residual and Jacobian assembly of a two-phase (water, gas) black-oil model with gas
//! dissolved in water, extended by an optional biofilm conservation equation.
//!
//! ## Main Structures
//! - `indices`: the fixed equation/primary variable layout and `PrimaryVariables`.
//! - `fluid_system`: PVT relations and the per-cell `FluidState`.
//! - `problem`: the `Problem` trait (grid context) and `ConnectionGraphProblem`.
//! - `element_context`: local stencil around one focus cell for two time levels.
//! - `intensive_quantities` / `extensive_quantities`: per-cell and per-face derived
//!   quantities; each aggregate owns the biofilm part (`biofilm_quantities`).
//! - `biofilm_params` / `biofilm_module` / `biofilm_output`: the biofilm equation,
//!   its deck input and its cell-wise output.
//! - `local_residual`, `tpfa_linearizer`, `newton`: storage/flux/source terms, global
//!   assembly into a block-sparse Jacobian and the Newton loop.
//!
//! ## Usage
//! ```rust, ignore
//! let deck = BiofilmDeck::from_file("biofilm.json")?;
//! let module = Biofilm::from_deck(&deck)?;
//! let problem = ConnectionGraphProblem::vertical_column(10, 1.0, 1.0, 1e-13, 0.2, 1000.0)?;
//! let mut newton = NewtonSolver::new(&problem, NewtonConfig::default())?;
//! let report = newton.solve_time_step(&problem, &FluidSystem::default(), &module, &mut x, &x_old, dt)?;
//! ```
pub mod biofilm_module;
pub mod biofilm_output;
pub mod biofilm_params;
pub mod biofilm_quantities;
pub mod element_context;
pub mod errors;
pub mod extensive_quantities;
pub mod fluid_system;
pub mod indices;
pub mod intensive_quantities;
pub mod local_residual;
pub mod newton;
pub mod problem;
pub mod tpfa_linearizer;
