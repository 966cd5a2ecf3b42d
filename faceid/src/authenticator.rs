//! Authentication and enrollment API
//!
//! [`FaceAuthenticator`] is the contract of a connected camera. Every call
//! blocks (awaits) until the device reports a final result; progress, hints
//! and face rectangles are delivered synchronously to the observer passed in
//! along the way.

use async_trait::async_trait;
use tracing::debug;

use faceid_core::{AuthenticateStatus, EnrollStatus, FacePose, Status};
use faceid_types::{FaceRect, Faceprints, MatchResult, SerialConfig};

/// Observer for [`FaceAuthenticator::authenticate`]
pub trait AuthenticationCallback: Send {
    /// Final result; `user_id` is set on success
    fn on_result(&mut self, status: AuthenticateStatus, user_id: Option<&str>);

    /// Intermediate hint (face too far, camera started, ...)
    fn on_hint(&mut self, hint: AuthenticateStatus) {
        debug!(%hint, "Authentication hint");
    }

    /// Faces found in the current frame
    fn on_face_detected(&mut self, faces: &[FaceRect], timestamp: u32) {
        log_faces(faces, timestamp);
    }
}

/// Observer for [`FaceAuthenticator::enroll`]
pub trait EnrollmentCallback: Send {
    /// Final result
    fn on_result(&mut self, status: EnrollStatus);

    /// A required pose was captured
    fn on_progress(&mut self, pose: FacePose) {
        debug!(%pose, "Enrollment progress");
    }

    /// Intermediate hint
    fn on_hint(&mut self, hint: EnrollStatus) {
        debug!(%hint, "Enrollment hint");
    }

    /// Faces found in the current frame
    fn on_face_detected(&mut self, faces: &[FaceRect], timestamp: u32) {
        log_faces(faces, timestamp);
    }
}

/// Observer for [`FaceAuthenticator::extract_faceprints_for_auth`]
pub trait AuthFaceprintsExtractionCallback: Send {
    /// Final result; `faceprints` is set on success
    fn on_result(&mut self, status: AuthenticateStatus, faceprints: Option<&Faceprints>);

    fn on_hint(&mut self, hint: AuthenticateStatus) {
        debug!(%hint, "Extraction hint");
    }

    fn on_face_detected(&mut self, faces: &[FaceRect], timestamp: u32) {
        log_faces(faces, timestamp);
    }
}

/// Observer for [`FaceAuthenticator::extract_faceprints_for_enroll`]
pub trait EnrollFaceprintsExtractionCallback: Send {
    /// Final result; `faceprints` is set on success
    fn on_result(&mut self, status: EnrollStatus, faceprints: Option<&Faceprints>);

    fn on_progress(&mut self, pose: FacePose) {
        debug!(%pose, "Extraction progress");
    }

    fn on_hint(&mut self, hint: EnrollStatus) {
        debug!(%hint, "Extraction hint");
    }

    fn on_face_detected(&mut self, faces: &[FaceRect], timestamp: u32) {
        log_faces(faces, timestamp);
    }
}

/// Host-side faceprint comparison
pub trait FaceprintMatcher {
    /// Compare `new` against `existing`.
    ///
    /// On success `updated` receives the stored faceprints with the adaptive
    /// vector moved towards `new`; the caller persists it when
    /// [`MatchResult::should_update`] is set.
    fn match_faceprints(
        &self,
        new: &Faceprints,
        existing: &Faceprints,
        updated: &mut Faceprints,
    ) -> MatchResult;
}

/// Connected face-authentication camera
#[async_trait]
pub trait FaceAuthenticator: FaceprintMatcher + Send + Sync {
    /// Open the serial link and complete the security handshake
    async fn connect(&mut self, config: &SerialConfig) -> Status;

    /// Close the serial link
    async fn disconnect(&mut self) -> Status;

    /// Authenticate the user in front of the camera against users stored on the device
    async fn authenticate(&mut self, callback: &mut dyn AuthenticationCallback) -> Status;

    /// Enroll the user in front of the camera under `user_id`
    async fn enroll(&mut self, callback: &mut dyn EnrollmentCallback, user_id: &str) -> Status;

    /// Capture faceprints for host-side matching
    async fn extract_faceprints_for_auth(
        &mut self,
        callback: &mut dyn AuthFaceprintsExtractionCallback,
    ) -> Status;

    /// Capture faceprints for host-side storage
    async fn extract_faceprints_for_enroll(
        &mut self,
        callback: &mut dyn EnrollFaceprintsExtractionCallback,
    ) -> Status;

    /// Number of users stored on the device
    async fn query_number_of_users(&mut self) -> std::result::Result<u32, Status>;
}

fn log_faces(faces: &[FaceRect], timestamp: u32) {
    for face in faces {
        debug!(%face, timestamp, "Detected face");
    }
}
