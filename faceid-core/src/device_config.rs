//! Device configuration values

use std::fmt;

use serde::{Deserialize, Serialize};

described_enum! {
    /// Sensor mounting orientation
    #[derive(Default, Serialize, Deserialize)]
    pub enum CameraRotation ("Unknown Value") {
        #[default]
        Rotation0Deg = 0 => "0 Degrees",
        Rotation180Deg = 1 => "180 Degrees",
    }
}

described_enum! {
    /// Which algorithm stages run on the device
    #[derive(Default, Serialize, Deserialize)]
    pub enum AlgoFlow ("Unknown Value") {
        #[default]
        All = 0,
        FaceDetectionOnly = 1,
        SpoofOnly = 2,
        RecognitionOnly = 3,
    }
}

described_enum! {
    /// Anti-spoof strictness
    #[derive(Default, Serialize, Deserialize)]
    pub enum SecurityLevel ("Unknown Value") {
        High = 0,
        #[default]
        Medium = 1,
    }
}

described_enum! {
    /// Faces considered when several are in frame
    #[derive(Default, Serialize, Deserialize)]
    pub enum FaceSelectionPolicy ("Unknown Value") {
        #[default]
        Single = 0,
        All = 1,
    }
}

described_enum! {
    /// Preview stream format
    #[derive(Default, Serialize, Deserialize)]
    #[allow(non_camel_case_types)]
    pub enum PreviewMode ("Unknown Value") {
        #[default]
        Mjpeg1080p = 0 => "MJPEG_1080P",
        Mjpeg720p = 1 => "MJPEG_720P",
        Raw10_1080p = 2 => "RAW10_1080P",
    }
}

/// Device-side algorithm configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub camera_rotation: CameraRotation,
    pub security_level: SecurityLevel,
    pub algo_flow: AlgoFlow,
    pub face_selection_policy: FaceSelectionPolicy,
}

impl fmt::Display for DeviceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rotation={} security={} flow={} faces={}",
            self.camera_rotation, self.security_level, self.algo_flow, self.face_selection_policy
        )
    }
}
