//! # faceid-core
//!
//! Core definitions shared by every faceid crate:
//! - Status codes and their description tables
//! - Serial transport status mapping
//! - Device configuration values
//! - Library version and firmware compatibility

#[macro_use]
mod describe;

pub mod device_config;
pub mod error;
pub mod status;
pub mod version;

pub use device_config::{
    AlgoFlow, CameraRotation, DeviceConfig, FaceSelectionPolicy, PreviewMode, SecurityLevel,
};
pub use error::{Error, Result};
pub use status::{AuthenticateStatus, EnrollStatus, FacePose, SerialStatus, Status, SERIAL_BASE};
