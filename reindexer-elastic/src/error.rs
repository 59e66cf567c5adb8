use thiserror::Error;

#[derive(Error, Debug)]
pub enum ElasticError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request failed ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl ElasticError {
    /// HTTP status of a failed request, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ElasticError::Status { status, .. } => Some(*status),
            ElasticError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<ElasticError> for reindexer::Error {
    fn from(err: ElasticError) -> Self {
        reindexer::Error::Engine(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ElasticError>;
