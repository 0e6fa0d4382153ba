use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("regex error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("backend error: {0}")]
    Backend(#[from] RagError),
}

#[derive(Debug, Error)]
pub enum RagError {
    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("request failed: {0}")]
    Request(String),

    #[error("generation backend error: {0}")]
    Generation(String),
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("question must be between {min} and {max} characters, got {actual}")]
    QuestionLength {
        min: usize,
        max: usize,
        actual: usize,
    },

    #[error("selected context must be at most {max} characters, got {actual}")]
    SelectedContextLength { max: usize, actual: usize },
}

pub type Result<T, E = RagError> = std::result::Result<T, E>;
