use thiserror::Error;
use tokio::io;

use crate::store::ValidationError;

pub type ServiceResult<T> = core::result::Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    SerdeJsonError(#[from] serde_json::Error),
    #[error("{0}")]
    Prompt(#[from] dialoguer::Error),
    #[error("Project not found: {0}")]
    ProjectNotFound(String),
    #[error("Milestone not found: {0}")]
    MilestoneNotFound(String),
    #[error("Reward not found: {0}")]
    RewardNotFound(String),
    #[error("{0}")]
    Other(String),
}
