//! crates/evaluator_core/src/domain.rs
//!
//! Defines the core data structures for the evaluator: accounts, sessions, the
//! top-level views a client can be in, uploaded documents and graded results.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, CoreResult};

//=========================================================================================
// Accounts and Sessions
//=========================================================================================

/// A registered account. The email is the case-insensitive unique key; the
/// credential is immutable once the account exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub email: String,
    #[serde(rename = "password")]
    pub credential: String,
    /// Entries written without a timestamp read back as registered now.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(email: &str, credential: &str) -> Self {
        Self {
            email: email.to_string(),
            credential: credential.to_string(),
            created_at: Utc::now(),
        }
    }

    /// Case-insensitive email comparison used for every account lookup.
    pub fn has_email(&self, email: &str) -> bool {
        self.email.to_lowercase() == email.to_lowercase()
    }
}

/// Access tier of a logged-in session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Standard,
    Privileged,
}

/// "Who is logged in, with what role". At most one per client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub identity: String,
    pub role: Role,
}

impl Session {
    pub fn is_privileged(&self) -> bool {
        self.role == Role::Privileged
    }
}

/// The top-level screens a client can be on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum View {
    Auth,
    Evaluator,
    Admin,
    PrivilegedWelcome,
    PrivilegedSecurityCheck,
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            View::Auth => "AUTH",
            View::Evaluator => "EVALUATOR",
            View::Admin => "ADMIN",
            View::PrivilegedWelcome => "PRIVILEGED_WELCOME",
            View::PrivilegedSecurityCheck => "PRIVILEGED_SECURITY_CHECK",
        };
        f.write_str(name)
    }
}

//=========================================================================================
// Documents
//=========================================================================================

/// The media types a document may be uploaded as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Pdf,
    Jpeg,
    Png,
}

impl MediaType {
    /// Parses a declared MIME type, rejecting anything outside the allow-list.
    pub fn from_mime(mime: &str) -> CoreResult<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "application/pdf" => Ok(MediaType::Pdf),
            "image/jpeg" => Ok(MediaType::Jpeg),
            "image/png" => Ok(MediaType::Png),
            other => Err(CoreError::UnsupportedMediaType(other.to_string())),
        }
    }

    pub fn as_mime(&self) -> &'static str {
        match self {
            MediaType::Pdf => "application/pdf",
            MediaType::Jpeg => "image/jpeg",
            MediaType::Png => "image/png",
        }
    }
}

/// A document selected for one evaluation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub file_name: String,
    pub media_type: MediaType,
    pub bytes: Bytes,
}

impl Document {
    /// Builds a document from a declared MIME type. This is the selection-time
    /// gate: unsupported types never reach the evaluation client.
    pub fn new(file_name: &str, mime: &str, bytes: impl Into<Bytes>) -> CoreResult<Self> {
        Ok(Self {
            file_name: file_name.to_string(),
            media_type: MediaType::from_mime(mime)?,
            bytes: bytes.into(),
        })
    }
}

//=========================================================================================
// Evaluation Results
//=========================================================================================

/// One graded question/answer pair as returned by the evaluation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QAPair {
    pub question: String,
    pub answer: String,
    pub feedback: String,
    pub score: f64,
}

/// The full graded result for a document. `evaluations` may be empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub overall_score: f64,
    pub general_feedback: String,
    pub evaluations: Vec<QAPair>,
}

impl EvaluationResult {
    /// Mean of the per-pair scores, `None` when there are no pairs.
    pub fn mean_pair_score(&self) -> Option<f64> {
        if self.evaluations.is_empty() {
            return None;
        }
        let total: f64 = self.evaluations.iter().map(|pair| pair.score).sum();
        Some(total / self.evaluations.len() as f64)
    }
}
