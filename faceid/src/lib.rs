//! # faceid
//!
//! Host-side API for a face-authentication camera.
//!
//! ## Features
//!
//! - Async authentication / enrollment API with callback observers
//! - Host-side faceprint storage and matching
//! - Camera preview abstraction with RAW10 conversion
//! - Host-mode relay gate controller (serial commands + sysfs GPIO)
//! - Simulated camera for running every flow without hardware
//!
//! ## Quick Start
//!
//! ```no_run
//! use faceid::{AuthenticationCallback, FaceAuthenticator, SimulatedDevice};
//! use faceid::{AuthenticateStatus, SerialConfig, Status};
//!
//! struct Print;
//!
//! impl AuthenticationCallback for Print {
//!     fn on_result(&mut self, status: AuthenticateStatus, user_id: Option<&str>) {
//!         println!("{} {:?}", status, user_id);
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut device = SimulatedDevice::new();
//!     if device.connect(&SerialConfig::default()).await != Status::Ok {
//!         return;
//!     }
//!
//!     device.push_authenticated("alice");
//!     device.authenticate(&mut Print).await;
//!     device.disconnect().await;
//! }
//! ```

pub mod authenticator;
pub mod config;
pub mod error;
pub mod faceprint_db;
pub mod gpio;
pub mod preview;
pub mod relay;
pub mod simulator;

pub use authenticator::{
    AuthFaceprintsExtractionCallback, AuthenticationCallback, EnrollFaceprintsExtractionCallback,
    EnrollmentCallback, FaceAuthenticator, FaceprintMatcher,
};
pub use crate::config::{FaceprintsConfig, HostModeConfig};
pub use error::{Error, Result};
pub use faceprint_db::{authenticate_faceprints, enroll_faceprints, FaceprintDb, FaceprintMatch};
pub use gpio::{Direction, Gpio, Level, OutputPin};
pub use preview::{
    raw10_to_rgb, Preview, PreviewConfig, PreviewFeed, PreviewImageReadyCallback, PreviewState,
    SimulatedPreview,
};
pub use relay::{CommandReader, ControllerState, HostCommand, RelayController};
pub use simulator::SimulatedDevice;

// Re-export lower layers
pub use faceid_core::{
    version, AuthenticateStatus, DeviceConfig, EnrollStatus, FacePose, PreviewMode, Status,
};
pub use faceid_transport::{SerialTransport, Transport};
pub use faceid_types::{
    AuthenticationRecord, FaceRect, Faceprints, Image, ImageMetadata, ImageMut, ImageRef,
    MatchResult, OwnedImage, SerialConfig,
};
