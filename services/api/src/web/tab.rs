//! services/api/src/web/tab.rs
//!
//! The per-connection driver. It owns the view controller for one page load,
//! translates client messages into state machine events and emits the resulting
//! server messages. It also owns the welcome timer.

use crate::web::{
    protocol::{AccountEntry, ClientMessage, ServerMessage},
    state::AppState,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use evaluator_core::{
    credentials::DEFAULT_ADMIN_CODE, CoreError, CoreResult, Document, EvaluationState, Evaluator,
    MediaType, MemoryStore, RevealToggle, SessionStore, View, ViewController,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Events produced by tasks the driver scheduled itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabEvent {
    WelcomeElapsed { generation: u64 },
}

pub struct TabDriver {
    controller: ViewController,
    evaluator: Evaluator,
    welcome_delay: Duration,
    outbound: UnboundedSender<ServerMessage>,
    events: UnboundedSender<TabEvent>,
    /// Cancels the pending welcome timer, if any.
    welcome_timer: Option<CancellationToken>,
    welcome_generation: u64,
}

impl TabDriver {
    /// Starts a page load for the given tab and announces the initial view.
    pub async fn start(
        app_state: &AppState,
        tab_store: Arc<MemoryStore>,
        outbound: UnboundedSender<ServerMessage>,
        events: UnboundedSender<TabEvent>,
    ) -> CoreResult<Self> {
        let controller =
            ViewController::start(app_state.credentials.clone(), SessionStore::new(tab_store))
                .await?;

        let driver = Self {
            controller,
            evaluator: app_state.evaluator.clone(),
            welcome_delay: app_state.config.welcome_delay,
            outbound,
            events,
            welcome_timer: None,
            welcome_generation: 0,
        };
        driver.emit_view();
        Ok(driver)
    }

    pub fn view(&self) -> View {
        self.controller.view()
    }

    /// Handles one message from the client. Errors are reported to the client
    /// and leave the state unchanged.
    pub async fn handle_client_message(&mut self, message: ClientMessage) {
        if let Err(e) = self.dispatch(message).await {
            match &e {
                CoreError::InvalidTransition { .. } | CoreError::InvalidEvaluationTransition { .. } => {
                    warn!("Rejected client action: {}", e)
                }
                _ => debug!("Client action failed: {}", e),
            }
            self.emit(ServerMessage::error(e.to_string()));
        }
    }

    /// Handles an event from a task this driver scheduled.
    pub async fn handle_event(&mut self, event: TabEvent) {
        match event {
            TabEvent::WelcomeElapsed { generation } => {
                if self.welcome_timer.is_none() || generation != self.welcome_generation {
                    debug!("Ignoring stale welcome timer {}", generation);
                    return;
                }
                self.welcome_timer = None;
                match self.controller.welcome_elapsed() {
                    Ok(_) => {
                        self.emit_view();
                        if let Err(e) = self.emit_dashboard().await {
                            self.emit(ServerMessage::error(e.to_string()));
                        }
                    }
                    Err(e) => debug!("Welcome timer fired outside the welcome view: {}", e),
                }
            }
        }
    }

    /// Cancels anything still scheduled for this page load.
    pub fn shutdown(&mut self) {
        self.cancel_welcome();
    }

    async fn dispatch(&mut self, message: ClientMessage) -> CoreResult<()> {
        match message {
            ClientMessage::Init { .. } => {
                warn!("Received subsequent Init message, which is ignored.");
            }
            ClientMessage::Login { email, password } => {
                self.controller.login(&email, &password).await?;
                self.emit_view();
            }
            ClientMessage::Signup { email, password } => {
                self.controller.signup(&email, &password).await?;
                self.emit_view();
            }
            ClientMessage::Logout => {
                self.cancel_welcome();
                self.controller.logout().await?;
                self.emit_view();
            }
            ClientMessage::VerifyCode { code } => {
                self.controller.verify_secondary(&code).await?;
                self.emit_view();
                self.schedule_welcome();
            }
            ClientMessage::ChangeCode { old_code, new_code } => {
                self.controller.change_secondary_code(&old_code, &new_code).await?;
                self.emit(ServerMessage::Notice {
                    message: "Password updated successfully!".to_string(),
                });
            }
            ClientMessage::ResetCode { confirmed } => {
                self.controller.reset_secondary_code(confirmed).await?;
                self.emit(ServerMessage::Notice {
                    message: format!("Password reset to default ({}).", DEFAULT_ADMIN_CODE),
                });
            }
            ClientMessage::SwitchToEvaluator => {
                self.controller.switch_to_evaluator()?;
                self.emit_view();
            }
            ClientMessage::ToggleCredentials => match self.controller.reveal_guard_mut()?.toggle() {
                RevealToggle::Hidden => self.emit_dashboard().await?,
                RevealToggle::CodeRequired => self.emit(ServerMessage::AccessCodeRequired),
            },
            ClientMessage::RevealCredentials { code } => {
                self.controller.reveal_guard_mut()?.submit_code(&code)?;
                self.emit_dashboard().await?;
            }
            ClientMessage::CancelReveal => {
                self.controller.reveal_guard_mut()?.cancel_prompt();
            }
            ClientMessage::SelectDocument {
                file_name,
                media_type,
                data,
            } => {
                // The media type is checked before the payload is decoded.
                MediaType::from_mime(&media_type)?;
                let bytes = match STANDARD.decode(data.as_bytes()) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!("Undecodable upload {}: {}", file_name, e);
                        self.emit(ServerMessage::error("The selected file could not be read."));
                        return Ok(());
                    }
                };
                let document = Document::new(&file_name, &media_type, bytes)?;
                self.controller.evaluation_mut()?.select_document(document)?;
                self.emit(ServerMessage::DocumentSelected { file_name });
            }
            ClientMessage::Submit => self.submit().await?,
            ClientMessage::Reset => {
                self.controller.evaluation_mut()?.reset()?;
                self.emit(ServerMessage::EvaluationReset);
            }
        }
        Ok(())
    }

    /// Runs one evaluation. The connection handles nothing else until the
    /// backend answers, so only one evaluation is ever in flight per tab.
    async fn submit(&mut self) -> CoreResult<()> {
        let evaluator = self.evaluator.clone();
        let outbound = self.outbound.clone();
        let machine = self.controller.evaluation_mut()?;

        if machine.state() == &EvaluationState::Idle
            && machine.document().is_some()
            && outbound.send(ServerMessage::EvaluationStarted).is_err()
        {
            debug!("Outbound channel closed; dropping server message.");
        }

        let message = match machine.run(&evaluator).await? {
            EvaluationState::Results(result) => ServerMessage::EvaluationCompleted {
                result: result.clone(),
            },
            EvaluationState::Error(message) => ServerMessage::EvaluationFailed {
                message: message.clone(),
            },
            other => {
                warn!("Evaluation ended in unexpected state {}", other.name());
                return Ok(());
            }
        };
        self.emit(message);
        Ok(())
    }

    fn schedule_welcome(&mut self) {
        self.cancel_welcome();
        self.welcome_generation += 1;

        let generation = self.welcome_generation;
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let events = self.events.clone();
        let delay = self.welcome_delay;

        tokio::spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {
                    debug!("Welcome timer {} cancelled.", generation);
                }
                _ = tokio::time::sleep(delay) => {
                    let _ = events.send(TabEvent::WelcomeElapsed { generation });
                }
            }
        });

        info!("Welcome timer {} scheduled for {:?}", generation, delay);
        self.welcome_timer = Some(token);
    }

    fn cancel_welcome(&mut self) {
        if let Some(token) = self.welcome_timer.take() {
            token.cancel();
        }
    }

    async fn emit_dashboard(&self) -> CoreResult<()> {
        let visible = self.controller.reveal_guard().is_visible();
        let accounts = self
            .controller
            .admin_accounts()
            .await?
            .into_iter()
            .map(|account| AccountEntry::from_account(account, visible))
            .collect();
        self.emit(ServerMessage::AdminDashboard {
            accounts,
            credentials_visible: visible,
        });
        Ok(())
    }

    fn emit_view(&self) {
        self.emit(ServerMessage::view_changed(
            self.controller.view(),
            self.controller.session(),
        ));
    }

    fn emit(&self, message: ServerMessage) {
        if self.outbound.send(message).is_err() {
            debug!("Outbound channel closed; dropping server message.");
        }
    }
}

impl Drop for TabDriver {
    fn drop(&mut self) {
        self.cancel_welcome();
    }
}
