//! crates/evaluator_core/src/view.rs
//!
//! The view controller: the state machine selecting which top-level screen a
//! client is on, driven by authentication and verification events.
//!
//! Transitions:
//!
//! | From                      | Event                   | To                        |
//! |---------------------------|-------------------------|---------------------------|
//! | AUTH                      | login/signup, standard  | EVALUATOR                 |
//! | AUTH                      | login, privileged       | PRIVILEGED_SECURITY_CHECK |
//! | PRIVILEGED_SECURITY_CHECK | secondary code verified | PRIVILEGED_WELCOME        |
//! | PRIVILEGED_WELCOME        | welcome delay elapsed   | ADMIN                     |
//! | ADMIN                     | switch to evaluator     | EVALUATOR                 |
//! | any but AUTH              | logout                  | AUTH                      |
//!
//! The welcome delay itself is scheduled by the caller; this type only accepts
//! the resulting event while it is still on the welcome screen.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::auth::Authenticator;
use crate::credentials::CredentialStore;
use crate::domain::{Account, Session, View};
use crate::error::{CoreError, CoreResult};
use crate::evaluation::EvaluationMachine;
use crate::session::SessionStore;
use crate::verification::{RevealGuard, SecondaryGate};

/// How long the privileged welcome screen stays up before the admin view.
pub const WELCOME_DELAY: Duration = Duration::from_secs(4);

pub struct ViewController {
    auth: Authenticator,
    gate: SecondaryGate,
    sessions: SessionStore,
    view: View,
    session: Option<Session>,
    evaluation: EvaluationMachine,
    reveal: RevealGuard,
}

impl ViewController {
    /// Builds the controller for a fresh page load from whatever the transient
    /// store holds. A stored privileged session is never restored: it is
    /// destroyed and the client starts on AUTH. A standard session resumes
    /// straight into EVALUATOR.
    pub async fn start(
        credentials: Arc<CredentialStore>,
        sessions: SessionStore,
    ) -> CoreResult<Self> {
        let mut controller = Self {
            auth: Authenticator::new(credentials.clone()),
            gate: SecondaryGate::new(credentials),
            sessions,
            view: View::Auth,
            session: None,
            evaluation: EvaluationMachine::new(),
            reveal: RevealGuard::default(),
        };

        match controller.sessions.load().await? {
            Some(session) if session.is_privileged() => {
                warn!("Discarding stored privileged session; re-authentication required");
                controller.sessions.clear().await?;
            }
            Some(session) => {
                info!("Resuming session for {}", session.identity);
                controller.session = Some(session);
                controller.view = View::Evaluator;
            }
            None => {}
        }

        Ok(controller)
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn evaluation(&self) -> &EvaluationMachine {
        &self.evaluation
    }

    /// The evaluation machine, only reachable from the evaluator screen.
    pub fn evaluation_mut(&mut self) -> CoreResult<&mut EvaluationMachine> {
        self.expect_view(View::Evaluator, "evaluate")?;
        Ok(&mut self.evaluation)
    }

    pub fn reveal_guard(&self) -> &RevealGuard {
        &self.reveal
    }

    /// The credential reveal guard, only reachable from the admin screen.
    pub fn reveal_guard_mut(&mut self) -> CoreResult<&mut RevealGuard> {
        self.expect_view(View::Admin, "reveal_credentials")?;
        Ok(&mut self.reveal)
    }

    pub async fn login(&mut self, email: &str, credential: &str) -> CoreResult<View> {
        self.expect_view(View::Auth, "login")?;
        let session = self.auth.login(email, credential).await?;
        self.establish(session).await
    }

    pub async fn signup(&mut self, email: &str, credential: &str) -> CoreResult<View> {
        self.expect_view(View::Auth, "signup")?;
        let session = self.auth.signup(email, credential).await?;
        self.establish(session).await
    }

    /// PRIVILEGED_SECURITY_CHECK -> PRIVILEGED_WELCOME on a matching code.
    /// A wrong code leaves the view unchanged.
    pub async fn verify_secondary(&mut self, code: &str) -> CoreResult<View> {
        self.expect_view(View::PrivilegedSecurityCheck, "verify_code")?;
        if !self.gate.verify(code).await? {
            warn!("Secondary verification failed");
            return Err(CoreError::InvalidVerificationCode);
        }
        self.view = View::PrivilegedWelcome;
        Ok(self.view)
    }

    pub async fn change_secondary_code(&self, old: &str, new: &str) -> CoreResult<()> {
        self.expect_view(View::PrivilegedSecurityCheck, "change_code")?;
        self.gate.change_code(old, new).await
    }

    pub async fn reset_secondary_code(&self, confirmed: bool) -> CoreResult<()> {
        self.expect_view(View::PrivilegedSecurityCheck, "reset_code")?;
        self.gate.reset_code(confirmed).await
    }

    /// PRIVILEGED_WELCOME -> ADMIN. Credentials start out masked.
    pub fn welcome_elapsed(&mut self) -> CoreResult<View> {
        self.expect_view(View::PrivilegedWelcome, "welcome_elapsed")?;
        self.reveal = RevealGuard::default();
        self.view = View::Admin;
        Ok(self.view)
    }

    pub fn switch_to_evaluator(&mut self) -> CoreResult<View> {
        self.expect_view(View::Admin, "switch_to_evaluator")?;
        self.view = View::Evaluator;
        Ok(self.view)
    }

    /// Registered accounts for the admin dashboard.
    pub async fn admin_accounts(&self) -> CoreResult<Vec<Account>> {
        self.expect_view(View::Admin, "list_accounts")?;
        self.auth.credentials().accounts().await
    }

    /// Destroys the session, resets the evaluation and returns to AUTH.
    pub async fn logout(&mut self) -> CoreResult<View> {
        if self.view == View::Auth {
            return Err(self.invalid("logout"));
        }
        self.sessions.clear().await?;
        if let Some(session) = self.session.take() {
            info!("Logged out {}", session.identity);
        }
        self.evaluation.clear();
        self.reveal = RevealGuard::default();
        self.view = View::Auth;
        Ok(self.view)
    }

    async fn establish(&mut self, session: Session) -> CoreResult<View> {
        self.sessions.save(&session).await?;
        self.view = if session.is_privileged() {
            View::PrivilegedSecurityCheck
        } else {
            View::Evaluator
        };
        self.session = Some(session);
        Ok(self.view)
    }

    fn expect_view(&self, expected: View, event: &'static str) -> CoreResult<()> {
        if self.view != expected {
            return Err(self.invalid(event));
        }
        Ok(())
    }

    fn invalid(&self, event: &'static str) -> CoreError {
        CoreError::InvalidTransition {
            from: self.view,
            event,
        }
    }
}
