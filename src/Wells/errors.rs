use super::ms_well_equations::WellSystemState;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum WellError {
    #[error(
        "MultisegmentWell support requires a direct solver. Rebuild with the `direct-solver` feature enabled."
    )]
    MissingDirectSolver,
    #[error("Well system is {found:?}, operation requires {expected}")]
    InvalidState {
        expected: &'static str,
        found: WellSystemState,
    },
    #[error("Well-local matrix D is singular")]
    SingularMatrix,
    #[error("Block ({row}, {col}) of {matrix} is outside the sparsity pattern")]
    PatternViolation {
        matrix: &'static str,
        row: usize,
        col: usize,
    },
    #[error("Invalid segment topology: {0}")]
    Topology(String),
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),
}
