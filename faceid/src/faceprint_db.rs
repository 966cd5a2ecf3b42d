//! In-memory faceprint database for host-mode matching
//!
//! Users are enrolled by storing the faceprints extracted by the camera; a
//! later scan is matched on the host by walking every stored user. The
//! database is owned by a single task and is not shared.

use std::collections::BTreeMap;

use tracing::{debug, info};

use faceid_core::{AuthenticateStatus, EnrollStatus};
use faceid_types::Faceprints;

use crate::authenticator::{
    AuthFaceprintsExtractionCallback, EnrollFaceprintsExtractionCallback, FaceAuthenticator,
    FaceprintMatcher,
};
use crate::error::{Error, Result};

/// Match found by [`FaceprintDb::find_match`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaceprintMatch {
    pub user_id: String,

    /// Stored adaptive vector was replaced
    pub updated: bool,
}

/// user id → faceprints
#[derive(Debug, Default)]
pub struct FaceprintDb {
    users: BTreeMap<String, Faceprints>,
}

impl FaceprintDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn get(&self, user_id: &str) -> Option<&Faceprints> {
        self.users.get(user_id)
    }

    pub fn remove(&mut self, user_id: &str) -> Option<Faceprints> {
        self.users.remove(user_id)
    }

    pub fn user_ids(&self) -> impl Iterator<Item = &str> {
        self.users.keys().map(String::as_str)
    }

    /// Store freshly extracted faceprints for `user_id`.
    ///
    /// The extracted adaptive vector seeds both the enrollment and the
    /// adaptive slot; an existing entry is replaced.
    pub fn store_enrollment(&mut self, user_id: impl Into<String>, extracted: &Faceprints) {
        let user_id = user_id.into();
        let entry = self.users.entry(user_id.clone()).or_default();

        entry.version = extracted.version;
        entry.adaptive_descriptor_without_mask = extracted.adaptive_descriptor_without_mask;
        entry.enrollment_descriptor = extracted.adaptive_descriptor_without_mask;

        info!(%user_id, users = self.users.len(), "Stored faceprints");
    }

    /// Find the first stored user matching `scanned`.
    ///
    /// When the matcher asks for it, the user's adaptive vector is replaced
    /// by the updated one.
    pub fn find_match<M>(&mut self, matcher: &M, scanned: &Faceprints) -> Option<FaceprintMatch>
    where
        M: FaceprintMatcher + ?Sized,
    {
        debug!(users = self.users.len(), "Searching faceprints");

        for (user_id, existing) in self.users.iter_mut() {
            let mut updated = existing.clone();
            let result = matcher.match_faceprints(scanned, existing, &mut updated);

            if !result.success {
                continue;
            }

            if result.should_update {
                *existing = updated;
                debug!(%user_id, "Updated adaptive faceprint");
            }

            info!(%user_id, "Faceprint match");
            return Some(FaceprintMatch {
                user_id: user_id.clone(),
                updated: result.should_update,
            });
        }

        info!("Forbidden (no faceprint matched)");
        None
    }
}

/// Extract faceprints of the person in front of the camera and store them
/// under `user_id`
pub async fn enroll_faceprints<A>(
    authenticator: &mut A,
    db: &mut FaceprintDb,
    user_id: &str,
) -> Result<()>
where
    A: FaceAuthenticator + ?Sized,
{
    let mut clbk = EnrollExtraction::default();
    let status = authenticator.extract_faceprints_for_enroll(&mut clbk).await;
    if !status.is_ok() {
        return Err(Error::Device(status));
    }

    match clbk.result {
        Some((EnrollStatus::Success, Some(faceprints))) => {
            db.store_enrollment(user_id, &faceprints);
            Ok(())
        }
        Some((status, _)) => Err(Error::Enrollment(status)),
        None => Err(Error::Enrollment(EnrollStatus::Failure)),
    }
}

/// Extract faceprints of the person in front of the camera and match them
/// against `db`.
///
/// Returns `Ok(None)` when the scan succeeded but nobody matched.
pub async fn authenticate_faceprints<A>(
    authenticator: &mut A,
    db: &mut FaceprintDb,
) -> Result<Option<FaceprintMatch>>
where
    A: FaceAuthenticator + ?Sized,
{
    let mut clbk = AuthExtraction::default();
    let status = authenticator.extract_faceprints_for_auth(&mut clbk).await;
    if !status.is_ok() {
        return Err(Error::Device(status));
    }

    match clbk.result {
        Some((AuthenticateStatus::Success, Some(scanned))) => {
            Ok(db.find_match(&*authenticator, &scanned))
        }
        Some((status, _)) => Err(Error::Authentication(status)),
        None => Err(Error::Authentication(AuthenticateStatus::Failure)),
    }
}

#[derive(Default)]
struct EnrollExtraction {
    result: Option<(EnrollStatus, Option<Faceprints>)>,
}

impl EnrollFaceprintsExtractionCallback for EnrollExtraction {
    fn on_result(&mut self, status: EnrollStatus, faceprints: Option<&Faceprints>) {
        debug!(%status, "Enroll extraction result");
        self.result = Some((status, faceprints.cloned()));
    }
}

#[derive(Default)]
struct AuthExtraction {
    result: Option<(AuthenticateStatus, Option<Faceprints>)>,
}

impl AuthFaceprintsExtractionCallback for AuthExtraction {
    fn on_result(&mut self, status: AuthenticateStatus, faceprints: Option<&Faceprints>) {
        debug!(%status, "Auth extraction result");
        self.result = Some((status, faceprints.cloned()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::{jittered, synthetic_descriptor, SimulatedDevice};
    use faceid_core::Status;
    use faceid_types::{MatchResult, SerialConfig};
    use pretty_assertions::assert_eq;

    async fn connected() -> SimulatedDevice {
        let mut device = SimulatedDevice::new();
        assert_eq!(device.connect(&SerialConfig::default()).await, Status::Ok);
        device
    }

    struct NeverMatch;

    impl FaceprintMatcher for NeverMatch {
        fn match_faceprints(&self, _: &Faceprints, _: &Faceprints, _: &mut Faceprints) -> MatchResult {
            MatchResult::default()
        }
    }

    #[test]
    fn test_store_enrollment_seeds_both_vectors() {
        let mut db = FaceprintDb::new();
        let mut extracted = Faceprints::default();
        extracted.adaptive_descriptor_without_mask = synthetic_descriptor("alice");

        db.store_enrollment("alice", &extracted);

        let stored = db.get("alice").unwrap();
        assert_eq!(stored.enrollment_descriptor, synthetic_descriptor("alice"));
        assert_eq!(stored.adaptive_descriptor_without_mask, synthetic_descriptor("alice"));
        assert_eq!(db.len(), 1);
    }

    #[test]
    fn test_no_match_leaves_db_untouched() {
        let mut db = FaceprintDb::new();
        db.store_enrollment("alice", &Faceprints::from_descriptor(synthetic_descriptor("alice")));
        let before = db.get("alice").cloned();

        let scanned = Faceprints::from_descriptor(synthetic_descriptor("alice"));
        assert_eq!(db.find_match(&NeverMatch, &scanned), None);
        assert_eq!(db.get("alice").cloned(), before);
    }

    #[test]
    fn test_match_updates_adaptive_vector() {
        let device = SimulatedDevice::new();
        let mut db = FaceprintDb::new();
        db.store_enrollment("alice", &Faceprints::from_descriptor(synthetic_descriptor("alice")));
        db.store_enrollment("bob", &Faceprints::from_descriptor(synthetic_descriptor("bob")));

        let mut scanned = Faceprints::default();
        scanned.adaptive_descriptor_without_mask = jittered(&synthetic_descriptor("bob"), 30);

        let found = db.find_match(&device, &scanned).unwrap();
        assert_eq!(
            found,
            FaceprintMatch {
                user_id: "bob".into(),
                updated: true
            }
        );

        let bob = db.get("bob").unwrap();
        assert_eq!(bob.enrollment_descriptor, synthetic_descriptor("bob"));
        assert_ne!(bob.adaptive_descriptor_without_mask, synthetic_descriptor("bob"));
        assert_eq!(
            db.get("alice").unwrap().adaptive_descriptor_without_mask,
            synthetic_descriptor("alice")
        );
    }

    #[tokio::test]
    async fn test_enroll_then_authenticate() {
        let mut device = connected().await;
        let mut db = FaceprintDb::new();

        device.push_scan(synthetic_descriptor("my-username"));
        enroll_faceprints(&mut device, &mut db, "my-username").await.unwrap();
        assert_eq!(db.user_ids().collect::<Vec<_>>(), vec!["my-username"]);

        device.push_scan(jittered(&synthetic_descriptor("my-username"), 10));
        let found = authenticate_faceprints(&mut device, &mut db).await.unwrap();
        assert_eq!(found.map(|m| m.user_id), Some("my-username".to_string()));

        device.push_scan(synthetic_descriptor("stranger"));
        let found = authenticate_faceprints(&mut device, &mut db).await.unwrap();
        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn test_extraction_without_face() {
        let mut device = connected().await;
        let mut db = FaceprintDb::new();

        let err = enroll_faceprints(&mut device, &mut db, "ghost").await.unwrap_err();
        assert!(matches!(err, Error::Enrollment(EnrollStatus::NoFaceDetected)));
        assert!(db.is_empty());

        let err = authenticate_faceprints(&mut device, &mut db).await.unwrap_err();
        assert!(matches!(err, Error::Authentication(AuthenticateStatus::NoFaceDetected)));
    }

    #[tokio::test]
    async fn test_extraction_while_disconnected() {
        let mut device = SimulatedDevice::new();
        let mut db = FaceprintDb::new();

        let err = authenticate_faceprints(&mut device, &mut db).await.unwrap_err();
        assert!(matches!(err, Error::Device(Status::Error)));
    }
}
