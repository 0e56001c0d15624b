//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser client and the API
//! server. One connection corresponds to one page load of a tab.

use chrono::{DateTime, Utc};
use evaluator_core::{Account, EvaluationResult, Role, Session, View};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Attaches the connection to a tab. This must be the first message sent.
    Init { tab_id: Uuid },

    Login { email: String, password: String },

    Signup { email: String, password: String },

    Logout,

    /// Secondary verification after an administrator login.
    VerifyCode { code: String },

    ChangeCode { old_code: String, new_code: String },

    /// Restores the default verification code. `confirmed` must be true.
    ResetCode { confirmed: bool },

    SwitchToEvaluator,

    /// Show/hide control for stored credentials on the admin dashboard.
    ToggleCredentials,

    RevealCredentials { code: String },

    CancelReveal,

    /// Selects a document for evaluation. `data` is base64.
    SelectDocument {
        file_name: String,
        media_type: String,
        data: String,
    },

    Submit,

    Reset,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// A registered account as shown on the admin dashboard.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct AccountEntry {
    pub email: String,
    /// `None` while credentials are masked.
    pub password: Option<String>,
    pub registered_at: DateTime<Utc>,
}

impl AccountEntry {
    pub fn from_account(account: Account, visible: bool) -> Self {
        Self {
            email: account.email,
            password: visible.then_some(account.credential),
            registered_at: account.created_at,
        }
    }
}

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The active screen changed (also sent once after `init`).
    ViewChanged {
        view: View,
        identity: Option<String>,
        role: Option<Role>,
    },

    /// A recoverable error; the prior state is unchanged.
    Error { message: String },

    /// A confirmation message (e.g. the verification code was updated).
    Notice { message: String },

    AdminDashboard {
        accounts: Vec<AccountEntry>,
        credentials_visible: bool,
    },

    /// Revealing credentials needs the access code.
    AccessCodeRequired,

    DocumentSelected { file_name: String },

    EvaluationStarted,

    EvaluationCompleted { result: EvaluationResult },

    EvaluationFailed { message: String },

    EvaluationReset,
}

impl ServerMessage {
    pub fn view_changed(view: View, session: Option<&Session>) -> Self {
        ServerMessage::ViewChanged {
            view,
            identity: session.map(|s| s.identity.clone()),
            role: session.map(|s| s.role),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_messages_are_type_tagged() {
        let msg: ClientMessage = serde_json::from_value(json!({
            "type": "select_document",
            "file_name": "a.pdf",
            "media_type": "application/pdf",
            "data": "aGVsbG8="
        }))
        .expect("parse");
        assert!(matches!(msg, ClientMessage::SelectDocument { .. }));

        let msg: ClientMessage =
            serde_json::from_value(json!({"type": "reset_code", "confirmed": true})).expect("parse");
        assert!(matches!(msg, ClientMessage::ResetCode { confirmed: true }));
    }

    #[test]
    fn view_changed_serializes_screaming_view_names() {
        let session = Session {
            identity: "a@x.com".into(),
            role: Role::Standard,
        };
        let value = serde_json::to_value(ServerMessage::view_changed(
            View::PrivilegedSecurityCheck,
            Some(&session),
        ))
        .expect("serialize");
        assert_eq!(value["type"], "view_changed");
        assert_eq!(value["view"], "PRIVILEGED_SECURITY_CHECK");
        assert_eq!(value["role"], "STANDARD");
    }

    #[test]
    fn masked_accounts_hide_the_password() {
        let account = Account::new("a@x.com", "pw1");
        assert_eq!(AccountEntry::from_account(account.clone(), false).password, None);
        assert_eq!(
            AccountEntry::from_account(account, true).password,
            Some("pw1".to_string())
        );
    }
}
