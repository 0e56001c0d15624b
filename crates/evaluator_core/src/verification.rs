//! crates/evaluator_core/src/verification.rs
//!
//! The two code checks guarding the privileged role: the secondary verification
//! gate that follows an administrator login, and the access code that reveals
//! stored credentials on the admin dashboard.

use std::sync::Arc;
use tracing::{info, warn};

use crate::credentials::CredentialStore;
use crate::error::{CoreError, CoreResult};

/// Minimum length of a new secondary verification code.
pub const MIN_CODE_LEN: usize = 4;
/// Fixed code that reveals stored credentials on the admin dashboard.
pub const CREDENTIAL_ACCESS_CODE: &str = "977845997828";

//=========================================================================================
// Secondary Verification Gate
//=========================================================================================

#[derive(Clone)]
pub struct SecondaryGate {
    credentials: Arc<CredentialStore>,
}

impl SecondaryGate {
    pub fn new(credentials: Arc<CredentialStore>) -> Self {
        Self { credentials }
    }

    /// Exact match against the current code (the default if never overridden).
    pub async fn verify(&self, code: &str) -> CoreResult<bool> {
        let expected = self.credentials.admin_credential().await?;
        Ok(code == expected)
    }

    pub async fn change_code(&self, old: &str, new: &str) -> CoreResult<()> {
        if !self.verify(old).await? {
            warn!("Secondary code change rejected: old code mismatch");
            return Err(CoreError::WrongOldCode);
        }
        if new.chars().count() < MIN_CODE_LEN {
            return Err(CoreError::CodeTooShort {
                min_len: MIN_CODE_LEN,
            });
        }
        self.credentials.set_admin_credential(new).await?;
        info!("Secondary verification code updated");
        Ok(())
    }

    /// Restores the default code. The prior custom code is lost, so the caller
    /// must pass an explicit confirmation.
    pub async fn reset_code(&self, confirmed: bool) -> CoreResult<()> {
        if !confirmed {
            return Err(CoreError::ConfirmationRequired);
        }
        self.credentials.reset_admin_credential().await?;
        info!("Secondary verification code reset to default");
        Ok(())
    }
}

//=========================================================================================
// Credential Reveal Guard
//=========================================================================================

/// What happened when the dashboard's show/hide control was toggled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealToggle {
    Hidden,
    CodeRequired,
}

/// UI-local guard over credential visibility. Hiding is free, showing needs the
/// access code.
#[derive(Debug, Default)]
pub struct RevealGuard {
    visible: bool,
    prompting: bool,
}

impl RevealGuard {
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_prompting(&self) -> bool {
        self.prompting
    }

    pub fn toggle(&mut self) -> RevealToggle {
        if self.visible {
            self.visible = false;
            RevealToggle::Hidden
        } else {
            self.prompting = true;
            RevealToggle::CodeRequired
        }
    }

    pub fn submit_code(&mut self, code: &str) -> CoreResult<()> {
        if code != CREDENTIAL_ACCESS_CODE {
            return Err(CoreError::InvalidAccessCode);
        }
        self.visible = true;
        self.prompting = false;
        Ok(())
    }

    pub fn cancel_prompt(&mut self) {
        self.prompting = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::DEFAULT_ADMIN_CODE;
    use crate::memory::MemoryStore;

    fn gate() -> SecondaryGate {
        SecondaryGate::new(Arc::new(CredentialStore::new(Arc::new(MemoryStore::new()))))
    }

    #[tokio::test]
    async fn verifies_default_code_exactly() {
        let gate = gate();
        assert!(gate.verify(DEFAULT_ADMIN_CODE).await.expect("verify"));
        assert!(!gate.verify("CEO112").await.expect("verify"));
        assert!(!gate.verify("").await.expect("verify"));
    }

    #[tokio::test]
    async fn change_code_checks_old_then_length() {
        let gate = gate();

        let err = gate.change_code("wrong", "abcd").await.expect_err("wrong old");
        assert!(matches!(err, CoreError::WrongOldCode));

        let err = gate.change_code(DEFAULT_ADMIN_CODE, "abc").await.expect_err("short");
        assert!(matches!(err, CoreError::CodeTooShort { min_len: 4 }));
        assert!(gate.verify(DEFAULT_ADMIN_CODE).await.expect("verify"));

        gate.change_code(DEFAULT_ADMIN_CODE, "abcd").await.expect("change");
        assert!(gate.verify("abcd").await.expect("verify"));
        assert!(!gate.verify(DEFAULT_ADMIN_CODE).await.expect("verify"));
    }

    #[tokio::test]
    async fn reset_requires_confirmation() {
        let gate = gate();
        gate.change_code(DEFAULT_ADMIN_CODE, "custom").await.expect("change");

        let err = gate.reset_code(false).await.expect_err("unconfirmed");
        assert!(matches!(err, CoreError::ConfirmationRequired));
        assert!(gate.verify("custom").await.expect("verify"));

        gate.reset_code(true).await.expect("reset");
        assert!(gate.verify(DEFAULT_ADMIN_CODE).await.expect("verify"));
    }

    #[test]
    fn reveal_guard_needs_code_only_to_show() {
        let mut guard = RevealGuard::default();
        assert!(!guard.is_visible());

        assert_eq!(guard.toggle(), RevealToggle::CodeRequired);
        assert!(guard.is_prompting());
        assert!(matches!(guard.submit_code("000"), Err(CoreError::InvalidAccessCode)));
        assert!(!guard.is_visible());

        guard.submit_code(CREDENTIAL_ACCESS_CODE).expect("reveal");
        assert!(guard.is_visible());
        assert!(!guard.is_prompting());

        assert_eq!(guard.toggle(), RevealToggle::Hidden);
        assert!(!guard.is_visible());
    }
}
