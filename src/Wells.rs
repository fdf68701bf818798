//! # Wells
//!
//! ## Purpose
//! Local linear system of a multisegment well and its elimination from the reservoir system.
//! The well unknowns live on segments connected in a tree (each segment has one outlet towards
//! the top segment and any number of inlets). The coupled system reads
//! ```text
//! | A  C^T | | x |   | r     |
//! | B  D   | | y | = | r_well|
//! ```
//! and the reservoir solver only ever sees `A - C^T D^-1 B`, applied on the fly.
//!
//! ## Main Structures
//! - `segment_topology`: segments, outlets, inlets and perforations of one well.
//! - `ms_well_equations`: the B, C, D blocks, the well residual and the factorized D.
pub mod errors;
pub mod ms_well_equations;
pub mod segment_topology;
#[cfg(test)]
mod ms_well_tests;
