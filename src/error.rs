use thiserror::Error;

/// Failure of a single backend call. `Status` and `Transport` are the two
/// classes the image renderer retries; the distinction is kept so retry
/// warnings can report the HTTP code when there is one.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("HTTP {status}")]
    Status { status: u16 },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("API key not set")]
    MissingKey,
    #[error("no usable content in response")]
    NoContent,
}

/// Rejection of a backend response that is not a well-formed list of
/// single-element lists of strings. Always fatal to the run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected {expected} at byte {offset}")]
    Unexpected {
        expected: &'static str,
        offset: usize,
    },
    #[error("unterminated string literal starting at byte {offset}")]
    UnterminatedString { offset: usize },
    #[error("trailing characters after the list at byte {offset}")]
    Trailing { offset: usize },
    #[error("scene group {index} contains no prompt string")]
    EmptyGroup { index: usize },
    #[error("scene group {index} has an empty prompt")]
    EmptyPrompt { index: usize },
}

/// Why prompt expansion failed. Either way there is no scene text to
/// render, so the orchestrator aborts the run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExpandError {
    #[error("prompt request failed: {0}")]
    Backend(#[from] BackendError),
    #[error("prompt response rejected: {0}")]
    Parse(#[from] ParseError),
}

/// Caller-side request validation failures. The pipeline assumes a
/// validated request and does not re-check these.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("story must be at least {min} words (got {got})")]
    StoryTooShort { got: usize, min: usize },
    #[error("scene count must be between {min} and {max} (got {got})")]
    SceneCountOutOfRange { got: u8, min: u8, max: u8 },
}

/// Errors `Pipeline::run` can return. Guide and render failures are
/// absorbed in-stage and never surface here.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("unknown art style: {0}")]
    UnknownStyle(String),
    #[error("prompt expansion failed: {0}")]
    Expand(#[from] ExpandError),
}
