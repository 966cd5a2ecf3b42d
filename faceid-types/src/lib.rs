//! Type definitions for faceid

pub mod error;
pub mod face;
pub mod faceprints;
pub mod image;
pub mod serial;

pub use error::{Error, Result};
pub use face::{AuthenticationRecord, FaceRect};
pub use faceprints::{Descriptor, Faceprints, MatchResult, DESCRIPTOR_SIZE, FACEPRINTS_VERSION};
pub use image::{Image, ImageMetadata, ImageMut, ImageRef, OwnedImage};
pub use serial::{Framing, Parity, SerialConfig, DEFAULT_CAMERA_PORT};
