use thiserror::Error;

/// Raised when a provider value cannot be decoded into its declared type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("Invalid coordinate '{value}': {reason}")]
    InvalidCoordinate { value: String, reason: &'static str },

    #[error("Field '{field}' holds '{value}', which is not a number")]
    InvalidNumber { field: String, value: String },

    #[error("Field '{field}' holds '{value}', which is not a YYYY-MM-DD date")]
    InvalidDate { field: String, value: String },

    #[error("Record is missing required field '{0}'")]
    MissingField(String),
}
