use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProxydiffError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Path does not exist: {0}")]
    PathNotFound(String),

    #[error("Metadata probe unavailable: {0}")]
    ProbeUnavailable(String),

    #[error("Scan error: {0}")]
    Scan(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Export error: {0}")]
    Export(String),
}

pub type Result<T> = std::result::Result<T, ProxydiffError>;
