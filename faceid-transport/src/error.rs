//! Transport errors

use std::io;

use faceid_core::SerialStatus;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Not connected")]
    NotConnected,
    
    #[error("Already connected")]
    AlreadyConnected,
    
    #[error("Read timeout")]
    ReadTimeout,
    
    #[error("Port closed by remote")]
    ConnectionClosed,
    
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    
    #[error("Invalid port: {0}")]
    InvalidPort(String),

    #[error("Unsupported baud rate: {0}")]
    UnsupportedBaudRate(u32),
}

impl Error {
    /// Serial-layer status equivalent of this error
    pub fn serial_status(&self) -> SerialStatus {
        match self {
            Self::ReadTimeout => SerialStatus::RecvTimeout,
            Self::NotConnected | Self::AlreadyConnected => SerialStatus::SendFailed,
            Self::ConnectionClosed
            | Self::Io(_)
            | Self::InvalidPort(_)
            | Self::UnsupportedBaudRate(_) => SerialStatus::RecvFailed,
        }
    }

    /// Check if error is recoverable (retry might succeed)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::ReadTimeout | Self::Io(_))
    }
}
