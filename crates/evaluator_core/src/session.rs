//! crates/evaluator_core/src/session.rs
//!
//! Persists the active `Session` in the tab-scoped transient store.

use std::sync::Arc;

use crate::domain::{Role, Session};
use crate::error::CoreResult;
use crate::ports::KeyValueStore;

pub const SESSION_USER_KEY: &str = "handwriting-eval-user";
pub const SESSION_PRIVILEGED_KEY: &str = "handwriting-eval-isAdmin";

#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Reads back whatever session the transient store holds. A missing role flag
    /// reads as standard; callers decide whether a privileged session may be trusted.
    pub async fn load(&self) -> CoreResult<Option<Session>> {
        let Some(identity) = self.store.get(SESSION_USER_KEY).await? else {
            return Ok(None);
        };
        if identity.is_empty() {
            return Ok(None);
        }
        let privileged = self.store.get(SESSION_PRIVILEGED_KEY).await?.as_deref() == Some("true");
        let role = if privileged { Role::Privileged } else { Role::Standard };
        Ok(Some(Session { identity, role }))
    }

    pub async fn save(&self, session: &Session) -> CoreResult<()> {
        self.store.set(SESSION_USER_KEY, &session.identity).await?;
        let flag = if session.is_privileged() { "true" } else { "false" };
        self.store.set(SESSION_PRIVILEGED_KEY, flag).await?;
        Ok(())
    }

    pub async fn clear(&self) -> CoreResult<()> {
        self.store.remove(SESSION_USER_KEY).await?;
        self.store.remove(SESSION_PRIVILEGED_KEY).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    #[tokio::test]
    async fn save_load_clear() {
        let sessions = SessionStore::new(Arc::new(MemoryStore::new()));
        assert_eq!(sessions.load().await.expect("load"), None);

        let session = Session {
            identity: "a@x.com".into(),
            role: Role::Privileged,
        };
        sessions.save(&session).await.expect("save");
        assert_eq!(sessions.load().await.expect("load"), Some(session));

        sessions.clear().await.expect("clear");
        assert_eq!(sessions.load().await.expect("load"), None);
    }

    #[tokio::test]
    async fn missing_role_flag_reads_as_standard() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(SESSION_USER_KEY, "a@x.com").await.expect("seed");
        let sessions = SessionStore::new(kv);

        let session = sessions.load().await.expect("load").expect("session");
        assert_eq!(session.role, Role::Standard);
    }
}
