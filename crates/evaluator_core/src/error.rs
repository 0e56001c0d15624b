//! crates/evaluator_core/src/error.rs
//!
//! The error taxonomy for every user action handled by the core. The `Display`
//! strings are the messages shown next to the unchanged prior state.

use crate::domain::View;
use crate::ports::PortError;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Please fill in both fields.")]
    MissingField,

    #[error("Invalid email or password.")]
    InvalidCredentials,

    #[error("An account with this email already exists.")]
    DuplicateAccount,

    #[error("Invalid verification code. Access denied.")]
    InvalidVerificationCode,

    #[error("Incorrect old password.")]
    WrongOldCode,

    #[error("New password must be at least {min_len} characters.")]
    CodeTooShort { min_len: usize },

    #[error("Reset must be confirmed before the verification code is restored.")]
    ConfirmationRequired,

    #[error("Invalid code. Access denied.")]
    InvalidAccessCode,

    #[error("Please upload a valid file type (PDF, JPEG, PNG).")]
    UnsupportedMediaType(String),

    #[error("Please select a file first.")]
    NoFileSelected,

    #[error("{0}")]
    EvaluationFailed(String),

    /// Raised by the validator; the evaluation client maps it to `EvaluationFailed`.
    #[error("Invalid JSON structure received from API: {0}")]
    InvalidResponseShape(String),

    #[error("'{event}' is not available from the {from} view")]
    InvalidTransition { from: View, event: &'static str },

    #[error("'{event}' is not available while the evaluation is {state}")]
    InvalidEvaluationTransition {
        state: &'static str,
        event: &'static str,
    },

    #[error("Storage error: {0}")]
    Store(#[from] PortError),
}

pub type CoreResult<T> = Result<T, CoreError>;
