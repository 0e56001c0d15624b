//! crates/evaluator_core/src/auth.rs
//!
//! Login and signup against the credential store, plus the built-in
//! administrator identity that is never stored as an account.

use std::sync::Arc;
use tracing::{info, warn};

use crate::credentials::CredentialStore;
use crate::domain::{Role, Session};
use crate::error::{CoreError, CoreResult};

/// Built-in administrator identity. Matched case-insensitively.
pub const ADMIN_EMAIL: &str = "admin@evaluator.app";
/// Built-in administrator login credential. Matched exactly.
pub const ADMIN_PASSWORD: &str = "test112";

#[derive(Clone)]
pub struct Authenticator {
    credentials: Arc<CredentialStore>,
}

impl Authenticator {
    pub fn new(credentials: Arc<CredentialStore>) -> Self {
        Self { credentials }
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    /// Authenticates an email/credential pair and returns the session it grants.
    pub async fn login(&self, email: &str, credential: &str) -> CoreResult<Session> {
        require_fields(email, credential)?;

        if is_admin_identity(email) && credential == ADMIN_PASSWORD {
            info!("Administrator login accepted");
            return Ok(Session {
                identity: email.to_string(),
                role: Role::Privileged,
            });
        }

        match self.credentials.find_account(email).await? {
            Some(account) if account.credential == credential => {
                info!("Login accepted for {}", account.email);
                Ok(Session {
                    identity: account.email,
                    role: Role::Standard,
                })
            }
            _ => {
                warn!("Rejected login attempt for {}", email);
                Err(CoreError::InvalidCredentials)
            }
        }
    }

    /// Registers a new account and then logs in with the same values.
    pub async fn signup(&self, email: &str, credential: &str) -> CoreResult<Session> {
        require_fields(email, credential)?;

        // The administrator identity is reserved and never becomes an account.
        if is_admin_identity(email) {
            return Err(CoreError::DuplicateAccount);
        }

        self.credentials.create_account(email, credential).await?;
        self.login(email, credential).await
    }
}

fn require_fields(email: &str, credential: &str) -> CoreResult<()> {
    if email.is_empty() || credential.is_empty() {
        return Err(CoreError::MissingField);
    }
    Ok(())
}

fn is_admin_identity(email: &str) -> bool {
    email.to_lowercase() == ADMIN_EMAIL
}
