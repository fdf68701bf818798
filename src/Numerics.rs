//! # Numerics
//!
//! Small numerical building blocks the discretization is written against:
//!
//! - [`evaluation`]: the automatic-differentiation scalar (`Evaluation`) used for every
//!   quantity that enters the residual. Derivatives are carried only for the primary
//!   variables of the focus degree of freedom, all other values enter as constants.
//! - [`tabulated`]: one-dimensional piecewise linear tables (permeability-porosity
//!   multipliers and friends) evaluated either on plain `f64` or on `Evaluation`.
//! - [`block_sparse`]: block compressed-row matrices with a fixed pattern, used for the
//!   reservoir Jacobian and for the well coupling blocks.
pub mod block_sparse;
pub mod evaluation;
pub mod tabulated;
