use thiserror::Error;

/// Errors raised by a clustering engine or dimensionality reducer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("The dataset provided is empty")]
    EmptyDataset,

    #[error("Input vectors have mismatched dimensions: {0}")]
    WrongDimension(String),

    #[error("Non finite coordinate: {0}")]
    NonFiniteCoordinate(String),

    #[error("No clusters available to compute membership against")]
    NoClusters,

    #[error("Membership vectors unavailable: clustering was run without prediction data")]
    MembershipUnavailable,

    #[error("Collaborator contract violated: {0}")]
    ContractViolation(String),
}

/// A single hierarchy level could not be built.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HierarchyError {
    #[error("Malformed merge tree row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },
}

/// Fatal errors that abort a report run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid input: missing {0} field")]
    MissingField(&'static str),

    #[error("No valid embeddings found")]
    NoValidEmbeddings,

    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] serde_json::Error),

    #[error("Clustering engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Stable name of the error variant, reported as the `type` of a failure response.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::MissingField(_) => "MissingField",
            PipelineError::NoValidEmbeddings => "NoValidEmbeddings",
            PipelineError::InvalidRequest(_) => "InvalidRequest",
            PipelineError::Engine(_) => "EngineError",
            PipelineError::Config(_) => "ConfigError",
            PipelineError::Io(_) => "IoError",
        }
    }
}
