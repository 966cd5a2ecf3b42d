//! Simulated camera
//!
//! [`SimulatedDevice`] implements [`FaceAuthenticator`] with scripted
//! outcomes so host flows can run without hardware. Authentication results,
//! enrollment results and scanned descriptors are queued up front and consumed
//! one per call; an empty queue yields a "nothing in front of the camera"
//! result. Host-side matching uses cosine similarity with a running-average
//! update of the adaptive vector.

use std::collections::VecDeque;

use async_trait::async_trait;
use tracing::{debug, info};

use faceid_core::{AuthenticateStatus, EnrollStatus, FacePose, Status};
use faceid_types::{
    Descriptor, FaceRect, Faceprints, MatchResult, SerialConfig, DESCRIPTOR_SIZE,
};

use crate::authenticator::{
    AuthFaceprintsExtractionCallback, AuthenticationCallback, EnrollFaceprintsExtractionCallback,
    EnrollmentCallback, FaceAuthenticator, FaceprintMatcher,
};

/// Minimum cosine similarity accepted as the same person
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.9;

const SIMULATED_FACE: FaceRect = FaceRect {
    x: 420,
    y: 260,
    w: 380,
    h: 460,
};

/// Scripted face-authentication camera
#[derive(Debug)]
pub struct SimulatedDevice {
    port: Option<String>,
    connect_status: Status,
    users: Vec<String>,
    authentications: VecDeque<(AuthenticateStatus, Option<String>)>,
    enrollments: VecDeque<EnrollStatus>,
    scans: VecDeque<Descriptor>,
    match_threshold: f64,
    timestamp: u32,
}

impl SimulatedDevice {
    /// Create a device with no users and nothing scripted
    pub fn new() -> Self {
        Self {
            port: None,
            connect_status: Status::Ok,
            users: Vec::new(),
            authentications: VecDeque::new(),
            enrollments: VecDeque::new(),
            scans: VecDeque::new(),
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            timestamp: 0,
        }
    }

    /// Make `connect` fail with `status`
    pub fn with_connect_status(mut self, status: Status) -> Self {
        self.connect_status = status;
        self
    }

    /// Add a user already stored on the device
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.users.push(user_id.into());
        self
    }

    /// Set minimum cosine similarity for a match
    pub fn with_match_threshold(mut self, threshold: f64) -> Self {
        self.match_threshold = threshold;
        self
    }

    /// Queue a successful authentication of `user_id`
    pub fn push_authenticated(&mut self, user_id: impl Into<String>) {
        self.authentications
            .push_back((AuthenticateStatus::Success, Some(user_id.into())));
    }

    /// Queue a failed authentication
    pub fn push_authentication_failure(&mut self, status: AuthenticateStatus) {
        self.authentications.push_back((status, None));
    }

    /// Queue the result of the next enrollment
    pub fn push_enrollment(&mut self, status: EnrollStatus) {
        self.enrollments.push_back(status);
    }

    /// Queue the descriptor captured by the next faceprint extraction
    pub fn push_scan(&mut self, descriptor: Descriptor) {
        self.scans.push_back(descriptor);
    }

    pub fn is_connected(&self) -> bool {
        self.port.is_some()
    }

    /// Users stored on the device
    pub fn users(&self) -> &[String] {
        &self.users
    }

    fn next_timestamp(&mut self) -> u32 {
        self.timestamp = self.timestamp.wrapping_add(33);
        self.timestamp
    }

    fn call_status(&self) -> Option<Status> {
        if self.is_connected() {
            None
        } else {
            debug!("Simulated device used before connect");
            Some(Status::Error)
        }
    }
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new()
    }
}

/// Status returned by the call itself for a given result code
fn call_result(code: i32) -> Status {
    if code >= faceid_core::SERIAL_BASE {
        Status::try_from(code).unwrap_or(Status::SerialError)
    } else {
        Status::Ok
    }
}

impl FaceprintMatcher for SimulatedDevice {
    fn match_faceprints(
        &self,
        new: &Faceprints,
        existing: &Faceprints,
        updated: &mut Faceprints,
    ) -> MatchResult {
        if new.version != existing.version {
            debug!(
                new = new.version,
                existing = existing.version,
                "Faceprint version mismatch"
            );
            return MatchResult::default();
        }

        let scanned = &new.adaptive_descriptor_without_mask;
        let similarity = cosine_similarity(scanned, &existing.adaptive_descriptor_without_mask)
            .max(cosine_similarity(scanned, &existing.enrollment_descriptor));

        if similarity < self.match_threshold {
            debug!(similarity, "No match");
            return MatchResult::default();
        }

        *updated = existing.clone();
        updated.adaptive_descriptor_without_mask =
            average(&existing.adaptive_descriptor_without_mask, scanned);

        let should_update =
            updated.adaptive_descriptor_without_mask != existing.adaptive_descriptor_without_mask;
        debug!(similarity, should_update, "Matched faceprints");

        MatchResult {
            success: true,
            should_update,
        }
    }
}

#[async_trait]
impl FaceAuthenticator for SimulatedDevice {
    async fn connect(&mut self, config: &SerialConfig) -> Status {
        if self.connect_status != Status::Ok {
            return self.connect_status;
        }

        info!("Simulated device connected on {}", config);
        self.port = Some(config.port.clone());
        Status::Ok
    }

    async fn disconnect(&mut self) -> Status {
        if let Some(port) = self.port.take() {
            info!("Simulated device on {} disconnected", port);
        }
        Status::Ok
    }

    async fn authenticate(&mut self, callback: &mut dyn AuthenticationCallback) -> Status {
        if let Some(status) = self.call_status() {
            return status;
        }

        let (status, user_id) = self
            .authentications
            .pop_front()
            .unwrap_or((AuthenticateStatus::NoFaceDetected, None));

        callback.on_hint(AuthenticateStatus::CameraStarted);
        if status != AuthenticateStatus::NoFaceDetected {
            let ts = self.next_timestamp();
            callback.on_face_detected(&[SIMULATED_FACE], ts);
        }
        callback.on_hint(AuthenticateStatus::CameraStopped);
        callback.on_result(status, user_id.as_deref());

        call_result(status.code())
    }

    async fn enroll(&mut self, callback: &mut dyn EnrollmentCallback, user_id: &str) -> Status {
        if let Some(status) = self.call_status() {
            return status;
        }

        let status = self.enrollments.pop_front().unwrap_or(EnrollStatus::Success);

        callback.on_hint(EnrollStatus::CameraStarted);
        if status.is_success() {
            for &pose in FacePose::ALL {
                let ts = self.next_timestamp();
                callback.on_face_detected(&[SIMULATED_FACE], ts);
                callback.on_progress(pose);
            }
            if !self.users.iter().any(|u| u == user_id) {
                self.users.push(user_id.to_string());
            }
        }
        callback.on_hint(EnrollStatus::CameraStopped);
        callback.on_result(status);

        call_result(status.code())
    }

    async fn extract_faceprints_for_auth(
        &mut self,
        callback: &mut dyn AuthFaceprintsExtractionCallback,
    ) -> Status {
        if let Some(status) = self.call_status() {
            return status;
        }

        match self.scans.pop_front() {
            Some(descriptor) => {
                let ts = self.next_timestamp();
                callback.on_face_detected(&[SIMULATED_FACE], ts);

                let mut faceprints = Faceprints::default();
                faceprints.adaptive_descriptor_without_mask = descriptor;
                callback.on_result(AuthenticateStatus::Success, Some(&faceprints));
            }
            None => callback.on_result(AuthenticateStatus::NoFaceDetected, None),
        }

        Status::Ok
    }

    async fn extract_faceprints_for_enroll(
        &mut self,
        callback: &mut dyn EnrollFaceprintsExtractionCallback,
    ) -> Status {
        if let Some(status) = self.call_status() {
            return status;
        }

        match self.scans.pop_front() {
            Some(descriptor) => {
                for &pose in FacePose::ALL {
                    let ts = self.next_timestamp();
                    callback.on_face_detected(&[SIMULATED_FACE], ts);
                    callback.on_progress(pose);
                }

                let faceprints = Faceprints::from_descriptor(descriptor);
                callback.on_result(EnrollStatus::Success, Some(&faceprints));
            }
            None => callback.on_result(EnrollStatus::NoFaceDetected, None),
        }

        Status::Ok
    }

    async fn query_number_of_users(&mut self) -> std::result::Result<u32, Status> {
        if let Some(status) = self.call_status() {
            return Err(status);
        }
        Ok(self.users.len() as u32)
    }
}

/// Deterministic descriptor for a synthetic face named `seed`
///
/// Different seeds give nearly orthogonal vectors.
pub fn synthetic_descriptor(seed: &str) -> Descriptor {
    // FNV-1a seed, xorshift stream
    let mut state = seed
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325u64, |h, b| (h ^ b as u64).wrapping_mul(0x100_0000_01b3))
        | 1;

    let mut descriptor = [0i16; DESCRIPTOR_SIZE];
    for value in descriptor.iter_mut() {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        *value = ((state % 2001) as i32 - 1000) as i16;
    }
    descriptor
}

/// Copy of `descriptor` with every feature nudged by up to `amount`
pub fn jittered(descriptor: &Descriptor, amount: i16) -> Descriptor {
    let mut out = *descriptor;
    for (i, value) in out.iter_mut().enumerate() {
        let delta = if i % 2 == 0 { amount } else { -amount };
        *value = value.saturating_add(delta);
    }
    out
}

fn cosine_similarity(lhs: &Descriptor, rhs: &Descriptor) -> f64 {
    let mut dot = 0.0;
    let mut norm_lhs = 0.0;
    let mut norm_rhs = 0.0;

    for (&l, &r) in lhs.iter().zip(rhs.iter()) {
        let (l, r) = (l as f64, r as f64);
        dot += l * r;
        norm_lhs += l * l;
        norm_rhs += r * r;
    }

    if norm_lhs == 0.0 || norm_rhs == 0.0 {
        return 0.0;
    }
    dot / (norm_lhs.sqrt() * norm_rhs.sqrt())
}

fn average(lhs: &Descriptor, rhs: &Descriptor) -> Descriptor {
    let mut out = [0i16; DESCRIPTOR_SIZE];
    for ((o, &l), &r) in out.iter_mut().zip(lhs.iter()).zip(rhs.iter()) {
        *o = ((l as i32 + r as i32) / 2) as i16;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct RecordingAuth {
        results: Vec<(AuthenticateStatus, Option<String>)>,
        hints: Vec<AuthenticateStatus>,
        faces: usize,
    }

    impl AuthenticationCallback for RecordingAuth {
        fn on_result(&mut self, status: AuthenticateStatus, user_id: Option<&str>) {
            self.results.push((status, user_id.map(str::to_string)));
        }

        fn on_hint(&mut self, hint: AuthenticateStatus) {
            self.hints.push(hint);
        }

        fn on_face_detected(&mut self, faces: &[FaceRect], _timestamp: u32) {
            self.faces += faces.len();
        }
    }

    #[derive(Default)]
    struct RecordingEnroll {
        results: Vec<EnrollStatus>,
        poses: Vec<FacePose>,
    }

    impl EnrollmentCallback for RecordingEnroll {
        fn on_result(&mut self, status: EnrollStatus) {
            self.results.push(status);
        }

        fn on_progress(&mut self, pose: FacePose) {
            self.poses.push(pose);
        }
    }

    async fn connected() -> SimulatedDevice {
        let mut device = SimulatedDevice::new();
        assert_eq!(device.connect(&SerialConfig::default()).await, Status::Ok);
        device
    }

    #[tokio::test]
    async fn test_calls_before_connect_fail() {
        let mut device = SimulatedDevice::new();
        let mut clbk = RecordingAuth::default();

        assert_eq!(device.authenticate(&mut clbk).await, Status::Error);
        assert!(clbk.results.is_empty());
        assert_eq!(device.query_number_of_users().await, Err(Status::Error));
    }

    #[tokio::test]
    async fn test_connect_failure() {
        let mut device = SimulatedDevice::new().with_connect_status(Status::SerialError);
        assert_eq!(device.connect(&SerialConfig::default()).await, Status::SerialError);
        assert!(!device.is_connected());
    }

    #[tokio::test]
    async fn test_scripted_authentication() {
        let mut device = connected().await;
        device.push_authenticated("alice");
        device.push_authentication_failure(AuthenticateStatus::Spoof);

        let mut clbk = RecordingAuth::default();
        assert_eq!(device.authenticate(&mut clbk).await, Status::Ok);
        assert_eq!(device.authenticate(&mut clbk).await, Status::Ok);
        assert_eq!(device.authenticate(&mut clbk).await, Status::Ok);

        assert_eq!(
            clbk.results,
            vec![
                (AuthenticateStatus::Success, Some("alice".to_string())),
                (AuthenticateStatus::Spoof, None),
                (AuthenticateStatus::NoFaceDetected, None),
            ]
        );
        assert_eq!(clbk.faces, 2);
        assert_eq!(clbk.hints.first(), Some(&AuthenticateStatus::CameraStarted));
    }

    #[tokio::test]
    async fn test_serial_failure_is_returned() {
        let mut device = connected().await;
        device.push_authentication_failure(AuthenticateStatus::CrcError);

        let mut clbk = RecordingAuth::default();
        assert_eq!(device.authenticate(&mut clbk).await, Status::CrcError);
    }

    #[tokio::test]
    async fn test_enroll_adds_user() {
        let mut device = connected().await;
        let mut clbk = RecordingEnroll::default();

        assert_eq!(device.enroll(&mut clbk, "bob").await, Status::Ok);
        assert_eq!(clbk.results, vec![EnrollStatus::Success]);
        assert_eq!(clbk.poses, FacePose::ALL.to_vec());
        assert_eq!(device.query_number_of_users().await, Ok(1));
    }

    #[tokio::test]
    async fn test_failed_enroll_adds_nobody() {
        let mut device = connected().await;
        device.push_enrollment(EnrollStatus::MultipleFacesDetected);

        let mut clbk = RecordingEnroll::default();
        device.enroll(&mut clbk, "bob").await;
        assert_eq!(clbk.results, vec![EnrollStatus::MultipleFacesDetected]);
        assert!(clbk.poses.is_empty());
        assert!(device.users().is_empty());
    }

    #[test]
    fn test_match_same_face() {
        let device = SimulatedDevice::new();
        let stored = Faceprints::from_descriptor(synthetic_descriptor("alice"));
        let mut scanned = Faceprints::default();
        scanned.adaptive_descriptor_without_mask = jittered(&synthetic_descriptor("alice"), 20);

        let mut updated = Faceprints::default();
        let result = device.match_faceprints(&scanned, &stored, &mut updated);

        assert!(result.success);
        assert!(result.should_update);
        assert_eq!(updated.enrollment_descriptor, stored.enrollment_descriptor);
        assert_ne!(
            updated.adaptive_descriptor_without_mask,
            stored.adaptive_descriptor_without_mask
        );
    }

    #[test]
    fn test_match_other_face() {
        let device = SimulatedDevice::new();
        let stored = Faceprints::from_descriptor(synthetic_descriptor("alice"));
        let scanned = Faceprints::from_descriptor(synthetic_descriptor("mallory"));

        let mut updated = Faceprints::default();
        let result = device.match_faceprints(&scanned, &stored, &mut updated);
        assert_eq!(result, MatchResult::default());
        assert_eq!(updated, Faceprints::default());
    }

    #[test]
    fn test_match_version_mismatch() {
        let device = SimulatedDevice::new();
        let stored = Faceprints::from_descriptor(synthetic_descriptor("alice"));
        let mut scanned = stored.clone();
        scanned.version += 1;

        let mut updated = Faceprints::default();
        assert!(!device.match_faceprints(&scanned, &stored, &mut updated).success);
    }

    #[test]
    fn test_identical_scan_needs_no_update() {
        let device = SimulatedDevice::new();
        let stored = Faceprints::from_descriptor(synthetic_descriptor("alice"));

        let mut updated = Faceprints::default();
        let result = device.match_faceprints(&stored, &stored, &mut updated);
        assert!(result.success);
        assert!(!result.should_update);
    }

    #[test]
    fn test_synthetic_descriptors() {
        assert_eq!(synthetic_descriptor("alice"), synthetic_descriptor("alice"));
        let similarity =
            cosine_similarity(&synthetic_descriptor("alice"), &synthetic_descriptor("bob"));
        assert!(similarity.abs() < 0.3, "similarity {similarity}");
    }
}
