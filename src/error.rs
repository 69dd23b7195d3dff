use thiserror::Error;

#[derive(Error, Debug)]
pub enum CovrepError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unable to lookup source: {0}")]
    SourceNotFound(String),

    #[error("Invalid report format [{0}]")]
    InvalidFormat(String),
}

pub type Result<T> = std::result::Result<T, CovrepError>;
