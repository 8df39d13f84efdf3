use thiserror::Error;

/// Classified errors produced by the scoring and reporting core.
///
/// Missing or malformed risk data always fails loudly; it is never
/// substituted with default values.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// A layer score was missing, non-numeric, or outside [0,1].
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An incomplete analysis result was passed to the report generator.
    #[error("missing field: {0}")]
    MissingField(String),

    /// The external analysis service rejected a request.
    #[error("upstream failure: {0}")]
    UpstreamFailure(String),
}
