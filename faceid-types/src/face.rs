//! Face detection and authentication records

use std::fmt;

use chrono::{DateTime, Utc};

/// Bounding box of a detected face in sensor coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FaceRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl FaceRect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
}

impl fmt::Display for FaceRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{} {}x{}", self.x, self.y, self.w, self.h)
    }
}

/// A successful authentication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationRecord {
    /// Authenticated user id
    pub user_id: String,

    /// Host time at which the result was received
    pub at: DateTime<Utc>,
}

impl AuthenticationRecord {
    pub fn now(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            at: Utc::now(),
        }
    }
}

impl fmt::Display for AuthenticationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.user_id, self.at.to_rfc3339())
    }
}
