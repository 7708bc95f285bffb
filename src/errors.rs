//! Error handling for the engine façade.

use image_perceiver::PerceiverError;
use lcp_tracker::LcpError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine is not active")]
    Inactive,

    #[error("configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("invalid snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error(transparent)]
    Perceiver(#[from] PerceiverError),

    #[error("lcp: {0}")]
    Lcp(#[from] LcpError),
}

pub type EngineResult<T> = Result<T, EngineError>;
