//! High-level error types

use faceid_core::{AuthenticateStatus, EnrollStatus, Status};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Transport error: {0}")]
    Transport(#[from] faceid_transport::Error),
    
    #[error("Type error: {0}")]
    Types(#[from] faceid_types::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("GPIO index {index} of bank {chip} has no pin number")]
    InvalidPin { chip: u32, index: u32 },

    #[error("GPIO error on pin {pin}: {source}")]
    Gpio {
        pin: u32,
        #[source]
        source: std::io::Error,
    },
    
    #[error("Device returned {0}")]
    Device(Status),

    #[error("Authentication failed: {0}")]
    Authentication(AuthenticateStatus),

    #[error("Enrollment failed: {0}")]
    Enrollment(EnrollStatus),

    #[error("Preview is {0}")]
    PreviewState(&'static str),

    #[error("Preview backend failure: {0}")]
    Preview(String),
}

impl Error {
    /// Failure was reported by the serial link rather than the algorithm
    pub fn is_transport(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Device(status) => !matches!(status, Status::Ok | Status::Error),
            Self::Authentication(status) => status.is_serial(),
            Self::Enrollment(status) => status.is_serial(),
            _ => false,
        }
    }

    /// Check if error is recoverable (retry might succeed)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_recoverable(),
            Self::Authentication(_) | Self::Enrollment(_) => true,
            _ => false,
        }
    }
}
