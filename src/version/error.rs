use thiserror::Error;

#[derive(Debug, Error)]
pub enum VersionError {
    #[error("Invalid version format: {0}")]
    InvalidFormat(String),
}

#[derive(Debug, Error)]
pub enum MatrixError {
    #[error("Failed to read matrix file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse matrix file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Version(#[from] VersionError),

    #[error("Matrix contains no entries")]
    Empty,
}
