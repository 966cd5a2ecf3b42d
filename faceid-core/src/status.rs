//! Device status codes
//!
//! Transport-layer outcomes are packed into the upper range of
//! [`EnrollStatus`] and [`AuthenticateStatus`] using the same codes as the
//! matching [`Status`] value, so `code >= SERIAL_BASE` separates "the serial
//! link failed" from "the algorithm produced a result".

/// First code of the serial transport range
pub const SERIAL_BASE: i32 = 100;

described_enum! {
    /// Result of a general device operation
    pub enum Status ("Unknown Status") {
        Ok = 100,
        Error = 101,
        SerialError = 102,
        SecurityError = 103 => "SerialSecurityError",
        VersionMismatch = 104,
        CrcError = 105,
    }
}

described_enum! {
    /// Enrollment result and hints
    pub enum EnrollStatus ("Unknown Status") serial Status {
        Success = 0,
        NoFaceDetected = 1,
        FaceDetected = 2,
        LedFlowSuccess = 3,
        FaceIsTooFarToTheTop = 4,
        FaceIsTooFarToTheBottom = 5,
        FaceIsTooFarToTheRight = 6,
        FaceIsTooFarToTheLeft = 7,
        FaceTiltIsTooUp = 8,
        FaceTiltIsTooDown = 9,
        FaceTiltIsTooRight = 10,
        FaceTiltIsTooLeft = 11,
        FaceIsNotFrontal = 12,
        CameraStarted = 13,
        CameraStopped = 14,
        MultipleFacesDetected = 15,
        Failure = 16,
        DeviceError = 17,
        SerialOk = 100,
        SerialError = 102,
        SerialSecurityError = 103,
        VersionMismatch = 104,
        CrcError = 105,
        Reserved1 = 120,
        Reserved2 = 121,
        Reserved3 = 122,
    }
}

described_enum! {
    /// Authentication result and hints
    pub enum AuthenticateStatus ("Unknown Status") serial Status {
        Success = 0,
        NoFaceDetected = 1,
        FaceDetected = 2,
        LedFlowSuccess = 3,
        FaceIsTooFarToTheTop = 4,
        FaceIsTooFarToTheBottom = 5,
        FaceIsTooFarToTheRight = 6,
        FaceIsTooFarToTheLeft = 7,
        FaceTiltIsTooUp = 8,
        FaceTiltIsTooDown = 9,
        FaceTiltIsTooRight = 10,
        FaceTiltIsTooLeft = 11,
        CameraStarted = 12,
        CameraStopped = 13,
        MaskDetectedInHighSecurity = 14,
        Spoof = 15,
        Forbidden = 16,
        DeviceError = 17,
        Failure = 18,
        SerialOk = 100,
        SerialError = 102,
        SerialSecurityError = 103,
        VersionMismatch = 104,
        CrcError = 105,
        Reserved1 = 120,
        Reserved2 = 121,
        Reserved3 = 122,
    }
}

described_enum! {
    /// Head pose requested during enrollment
    pub enum FacePose ("Unknown Pose") {
        Center = 0,
        Up = 1,
        Down = 2,
        Left = 3,
        Right = 4,
    }
}

described_enum! {
    /// Outcome reported by the serial packet layer
    pub enum SerialStatus ("Unknown Serial Status") {
        Ok = 0,
        RecvTimeout = 1,
        RecvFailed = 2,
        SendFailed = 3,
        SecurityError = 4,
        VersionMismatch = 5,
        CrcError = 6,
    }
}

impl Status {
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

impl EnrollStatus {
    /// Code lies in the serial transport range
    pub fn is_serial(self) -> bool {
        self.code() >= SERIAL_BASE
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl AuthenticateStatus {
    /// Code lies in the serial transport range
    pub fn is_serial(self) -> bool {
        self.code() >= SERIAL_BASE
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl From<SerialStatus> for Status {
    fn from(status: SerialStatus) -> Self {
        match status {
            SerialStatus::Ok => Self::Ok,
            SerialStatus::SecurityError => Self::SecurityError,
            SerialStatus::VersionMismatch => Self::VersionMismatch,
            SerialStatus::CrcError => Self::CrcError,
            _ => Self::SerialError,
        }
    }
}

impl From<SerialStatus> for EnrollStatus {
    fn from(status: SerialStatus) -> Self {
        match status {
            SerialStatus::Ok => Self::SerialOk,
            SerialStatus::SecurityError => Self::SerialSecurityError,
            SerialStatus::VersionMismatch => Self::VersionMismatch,
            SerialStatus::CrcError => Self::CrcError,
            _ => Self::SerialError,
        }
    }
}

impl From<SerialStatus> for AuthenticateStatus {
    fn from(status: SerialStatus) -> Self {
        match status {
            SerialStatus::Ok => Self::SerialOk,
            SerialStatus::SecurityError => Self::SerialSecurityError,
            SerialStatus::VersionMismatch => Self::VersionMismatch,
            SerialStatus::CrcError => Self::CrcError,
            _ => Self::SerialError,
        }
    }
}
