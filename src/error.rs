use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipewatchError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("GitLab API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Project not found or access denied: {0}")]
    ProjectNotFound(String),

    #[error("Retry of job '{job}' rejected: {message}")]
    Retry { job: String, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipewatchError>;
