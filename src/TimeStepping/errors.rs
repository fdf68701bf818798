use thiserror::Error;

#[derive(Debug, Error)]
pub enum TimeStepError {
    #[error("{0}")]
    InvalidParameter(String),
    #[error("{0}")]
    ScheduleFile(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse '{0}' as a time in days")]
    Parse(String),
    /// the substep may be retried with a smaller step
    #[error("Nonlinear solver did not converge: {0}")]
    Nonconvergence(String),
    /// any other failure of the substep solver, never retried
    #[error("Substep solver failed: {0}")]
    Solver(String),
    #[error("Time step {dt} s fell below the minimum time step {min_dt} s")]
    MinTimeStepViolated { dt: f64, min_dt: f64 },
    #[error("Solver failed to converge after cutting the time step {0} times")]
    TooManyRestarts(usize),
}
