//! Error types for faceid-core

/// Result type alias for faceid-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Numeric code is not declared by the enum's table
    #[error("Unknown {kind} value: {value}")]
    UnknownValue {
        kind: &'static str,
        value: i32,
    },
}
