//! Faceprint descriptors

use std::fmt;

/// Number of features in a faceprint descriptor vector
pub const DESCRIPTOR_SIZE: usize = 515;

/// Faceprint format version produced by current firmware
pub const FACEPRINTS_VERSION: i32 = 5;

/// Fixed-size numeric descriptor vector
pub type Descriptor = [i16; DESCRIPTOR_SIZE];

/// Faceprints of a single user
///
/// Holds the vector captured at enrollment and an adaptive vector that is
/// averaged with every successful match.
#[derive(Clone, PartialEq, Eq)]
pub struct Faceprints {
    /// Descriptor format version
    pub version: i32,

    /// Vector captured at enrollment, never updated
    pub enrollment_descriptor: Descriptor,

    /// Running-average vector (without mask)
    pub adaptive_descriptor_without_mask: Descriptor,
}

impl Faceprints {
    /// Build faceprints whose enrollment and adaptive vectors are both `descriptor`
    pub fn from_descriptor(descriptor: Descriptor) -> Self {
        Self {
            version: FACEPRINTS_VERSION,
            enrollment_descriptor: descriptor,
            adaptive_descriptor_without_mask: descriptor,
        }
    }
}

impl Default for Faceprints {
    fn default() -> Self {
        Self {
            version: FACEPRINTS_VERSION,
            enrollment_descriptor: [0; DESCRIPTOR_SIZE],
            adaptive_descriptor_without_mask: [0; DESCRIPTOR_SIZE],
        }
    }
}

impl fmt::Debug for Faceprints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Faceprints")
            .field("version", &self.version)
            .field("enrollment_descriptor", &&self.enrollment_descriptor[..4])
            .field(
                "adaptive_descriptor_without_mask",
                &&self.adaptive_descriptor_without_mask[..4],
            )
            .finish_non_exhaustive()
    }
}

/// Outcome of comparing a scanned faceprint against a stored one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchResult {
    /// Scanned faceprint belongs to the stored user
    pub success: bool,

    /// Stored adaptive vector should be replaced with the updated one
    pub should_update: bool,
}
