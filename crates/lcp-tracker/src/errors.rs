use thiserror::Error;

#[derive(Clone, Debug, Error)]
pub enum LcpError {
    #[error("tracker not armed")]
    NotArmed,
    #[error("measurement finalized")]
    Finalized,
}
