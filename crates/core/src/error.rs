use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Input document must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

pub type Result<T> = std::result::Result<T, ReviewError>;
