use thiserror::Error;

use crate::runtime::Lifecycle;
use crate::transport::TransportError;

/// Standard Result type for the robot runtime
pub type Result<T> = std::result::Result<T, RobotError>;

#[derive(Debug, Error)]
pub enum RobotError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid lifecycle transition: expected {expected:?}, robot is {actual:?}")]
    InvalidState {
        expected: Lifecycle,
        actual: Lifecycle,
    },

    #[error("Activity task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
