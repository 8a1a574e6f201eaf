use std::error::Error as StdError;

use thiserror::Error;

/// Boxed failure raised by a user-supplied stage function.
pub type StageFailure = Box<dyn StdError + Send + Sync + 'static>;

/// Errors surfaced while evaluating a task graph.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A fallible stage returned an error.  The original error is kept as-is in `source`.
    #[error("stage {stage} failed: {source}")]
    StageFailed {
        /// Label of the failing stage
        stage: String,
        /// Error returned by the stage function
        source: StageFailure,
    },

    /// A stage was handed inputs of a type it was not built for.
    #[error("stage {stage} received inputs of an unexpected type")]
    TypeMismatch {
        /// Label of the stage
        stage: String,
    },

    /// A value was requested that the graph never produced.
    #[error("no value was produced for {0}")]
    MissingOutput(String),

    /// The worker pool could not be started.
    #[error("unable to start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

impl EngineError {
    /// Takes back the boxed stage error if it is of type `E`.  Any other error is returned
    /// unchanged.
    pub fn into_stage_error<E: StdError + Send + Sync + 'static>(self) -> Result<E, EngineError> {
        match self {
            EngineError::StageFailed { stage, source } => match source.downcast::<E>() {
                Ok(e) => Ok(*e),
                Err(source) => Err(EngineError::StageFailed { stage, source }),
            },
            other => Err(other),
        }
    }
}
