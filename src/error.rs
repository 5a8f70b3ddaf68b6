use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InspireError {
    #[error("File {} not found.", .0.display())]
    MissingInputFile(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("API error: {0}")]
    ApiError(String),
}
