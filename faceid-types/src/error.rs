//! Errors for plain data validation

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Header fields disagree with the data they describe
    #[error("Validation error: {0}")]
    Validation(String),

    /// Text form could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),
}
