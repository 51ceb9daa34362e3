use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChoiceError {
    /// Malformed node specification, rejected before any traversal runs.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown identifier or malformed parameter supplied by the caller.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Failure while computing terminal payoffs or rolling back values.
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type ChoiceResult<T> = Result<T, ChoiceError>;
