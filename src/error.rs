use thiserror::Error;

/// Errors raised while indexing lattices, picking reference points or running estimations.
///
/// Empty distance bins are not errors: they show up as NaN in the returned estimates.
#[derive(Debug, Error)]
pub enum VariographyError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("precondition violated: {0}")]
    PreconditionViolation(String),

    #[error("realization has {actual} values but the lattice has {expected} cells")]
    RealizationShape { expected: usize, actual: usize },

    /// Failure inside the simulator. The simulator's own error is kept as the source.
    #[error("simulation failed")]
    Simulation(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl VariographyError {
    pub(crate) fn simulation<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        VariographyError::Simulation(Box::new(error))
    }
}

pub type Result<T> = std::result::Result<T, VariographyError>;
