//! Transport layer for faceid peripherals
//!
//! Provides serial communication with auxiliary boards (e.g. the relay
//! controller that drives a gate in host mode).

pub mod error;
pub mod serial;

pub use error::{Error, Result};
pub use serial::SerialTransport;

use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;

/// Transport trait for different communication methods
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the link
    async fn connect(&mut self) -> Result<()>;
    
    /// Close the link
    async fn disconnect(&mut self) -> Result<()>;
    
    /// Check if connected
    fn is_connected(&self) -> bool;
    
    /// Send raw bytes
    async fn send(&mut self, data: &[u8]) -> Result<()>;
    
    /// Receive whatever bytes arrive before `timeout` elapses
    async fn receive(&mut self, timeout: Duration) -> Result<BytesMut>;
    
    /// Port name, for logging
    fn port_name(&self) -> String;
}
