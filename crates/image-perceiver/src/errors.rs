use lazyscope_core_types::{LazyscopeError, NodeId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PerceiverError {
    #[error("element not tracked: {0}")]
    UnknownElement(NodeId),
    #[error("internal error: {0}")]
    Internal(String),
}

impl PerceiverError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<PerceiverError> for LazyscopeError {
    fn from(value: PerceiverError) -> Self {
        LazyscopeError::new(value.to_string())
    }
}
