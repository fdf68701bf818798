use thiserror::Error;

/// Errors of the black-oil layer and its equation modules.
#[derive(Debug, Error)]
pub enum BlackOilError {
    /// a physical accessor of a module that is switched off
    #[error("{accessor}() called but biofilms are disabled")]
    FeatureDisabled { accessor: &'static str },
    #[error("{what}: region index {region} is out of range, {num_regions} regions are configured")]
    RegionOutOfRange {
        what: &'static str,
        region: usize,
        num_regions: usize,
    },
    /// compile-time switch and deck disagree
    #[error("{0}")]
    ModuleMismatch(String),
    #[error("BIOFILM requires the {0} keyword")]
    MissingKeyword(&'static str),
    #[error("Invalid table: {0}")]
    InvalidTable(String),
    #[error("Invalid index: {0}")]
    InvalidIndex(String),
    #[error("Run-time parameter: {0}")]
    Parameter(String),
    #[error("Invalid grid: {0}")]
    InvalidGrid(String),
    #[error("Linear solver failed: {0}")]
    LinearSolver(String),
    #[error("Newton solver did not converge in {iterations} iterations (residual {residual:e})")]
    Nonconvergence { iterations: usize, residual: f64 },
    #[error("Failed to parse the deck: {0}")]
    Deck(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
