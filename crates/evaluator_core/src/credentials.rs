//! crates/evaluator_core/src/credentials.rs
//!
//! The durable credential store: registered accounts plus the single secondary
//! verification code slot used by the privileged gate.

use futures::lock::Mutex;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::domain::Account;
use crate::error::{CoreError, CoreResult};
use crate::ports::{KeyValueStore, PortError};

/// Durable key holding the JSON array of registered accounts.
pub const ACCOUNTS_KEY: &str = "handwriting-eval-users";
/// Durable key holding the secondary verification code override.
pub const ADMIN_CODE_KEY: &str = "admin_code";
/// Secondary verification code used until it is overridden.
pub const DEFAULT_ADMIN_CODE: &str = "ceo112";

/// Accounts and the secondary code, persisted through a `KeyValueStore`.
///
/// Account creation is a read-modify-write on a single key, so writes are
/// serialized through `write_lock` when the store is shared between clients.
pub struct CredentialStore {
    store: Arc<dyn KeyValueStore>,
    write_lock: Mutex<()>,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// All registered accounts in registration order. An unreadable list reads
    /// as empty here; `create_account` refuses to write over it.
    pub async fn accounts(&self) -> CoreResult<Vec<Account>> {
        match self.read_accounts().await? {
            Ok(accounts) => Ok(accounts),
            Err(e) => {
                warn!("Stored account list is unreadable, treating it as empty: {}", e);
                Ok(Vec::new())
            }
        }
    }

    /// The stored list with its parse outcome kept separate from store failures.
    async fn read_accounts(&self) -> CoreResult<Result<Vec<Account>, serde_json::Error>> {
        let Some(raw) = self.store.get(ACCOUNTS_KEY).await? else {
            return Ok(Ok(Vec::new()));
        };
        Ok(serde_json::from_str::<Vec<Account>>(&raw))
    }

    /// Looks up an account by case-insensitive email.
    pub async fn find_account(&self, email: &str) -> CoreResult<Option<Account>> {
        let accounts = self.accounts().await?;
        Ok(accounts.into_iter().find(|account| account.has_email(email)))
    }

    /// Registers a new account, failing if the email is already taken (ignoring case).
    /// Fails without writing when the stored list cannot be read, so existing
    /// accounts are never overwritten.
    pub async fn create_account(&self, email: &str, credential: &str) -> CoreResult<Account> {
        let _guard = self.write_lock.lock().await;

        let mut accounts = self.read_accounts().await?.map_err(|e| {
            error!("Refusing to register {}: stored account list is unreadable: {}", email, e);
            PortError::Unexpected(format!("stored account list is unreadable: {e}"))
        })?;
        if accounts.iter().any(|account| account.has_email(email)) {
            return Err(CoreError::DuplicateAccount);
        }

        let account = Account::new(email, credential);
        accounts.push(account.clone());
        let serialized = serde_json::to_string(&accounts)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        self.store.set(ACCOUNTS_KEY, &serialized).await?;

        info!("Registered account for {}", account.email);
        Ok(account)
    }

    /// The current secondary code: the override if one is set, else the default.
    pub async fn admin_credential(&self) -> CoreResult<String> {
        let stored = self.store.get(ADMIN_CODE_KEY).await?;
        Ok(stored
            .filter(|code| !code.is_empty())
            .unwrap_or_else(|| DEFAULT_ADMIN_CODE.to_string()))
    }

    pub async fn set_admin_credential(&self, new_value: &str) -> CoreResult<()> {
        let _guard = self.write_lock.lock().await;
        self.store.set(ADMIN_CODE_KEY, new_value).await?;
        Ok(())
    }

    pub async fn reset_admin_credential(&self) -> CoreResult<()> {
        let _guard = self.write_lock.lock().await;
        self.store.remove(ADMIN_CODE_KEY).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn store() -> CredentialStore {
        CredentialStore::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn create_then_find_ignores_case() {
        let credentials = store();
        credentials.create_account("a@x.com", "pw1").await.expect("create");

        let found = credentials
            .find_account("A@X.COM")
            .await
            .expect("find")
            .expect("account present");
        assert_eq!(found.email, "a@x.com");
        assert_eq!(found.credential, "pw1");
        assert!(credentials.find_account("b@x.com").await.expect("find").is_none());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_ignoring_case() {
        let credentials = store();
        credentials.create_account("a@x.com", "pw1").await.expect("create");

        let err = credentials
            .create_account("A@x.Com", "other")
            .await
            .expect_err("duplicate");
        assert!(matches!(err, CoreError::DuplicateAccount));
        assert_eq!(credentials.accounts().await.expect("accounts").len(), 1);
    }

    #[tokio::test]
    async fn accounts_keep_registration_order() {
        let credentials = store();
        credentials.create_account("first@x.com", "1").await.expect("create");
        credentials.create_account("second@x.com", "2").await.expect("create");

        let emails: Vec<_> = credentials
            .accounts()
            .await
            .expect("accounts")
            .into_iter()
            .map(|account| account.email)
            .collect();
        assert_eq!(emails, vec!["first@x.com", "second@x.com"]);
    }

    #[tokio::test]
    async fn unreadable_account_list_reads_as_empty() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(ACCOUNTS_KEY, "not json").await.expect("seed");
        let credentials = CredentialStore::new(kv);
        assert!(credentials.accounts().await.expect("accounts").is_empty());
    }

    #[tokio::test]
    async fn signup_never_overwrites_an_unreadable_list() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(ACCOUNTS_KEY, r#"[{"email":"alice@x.com","password":1}]"#)
            .await
            .expect("seed");
        let credentials = CredentialStore::new(kv.clone());

        let err = credentials
            .create_account("carol@x.com", "pw3")
            .await
            .expect_err("unreadable list");
        assert!(matches!(err, CoreError::Store(PortError::Unexpected(_))));

        let raw = kv.get(ACCOUNTS_KEY).await.expect("get").expect("still stored");
        assert!(raw.contains("alice@x.com"));
        assert!(!raw.contains("carol@x.com"));
    }

    #[tokio::test]
    async fn entries_without_timestamp_survive_a_signup() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(
            ACCOUNTS_KEY,
            r#"[{"email":"alice@x.com","password":"pw1","createdAt":"2024-01-01T00:00:00Z"},{"email":"bob@x.com","password":"pw2"}]"#,
        )
        .await
        .expect("seed");
        let credentials = CredentialStore::new(kv.clone());

        credentials.create_account("carol@x.com", "pw3").await.expect("create");

        let emails: Vec<_> = credentials
            .accounts()
            .await
            .expect("accounts")
            .into_iter()
            .map(|account| account.email)
            .collect();
        assert_eq!(emails, vec!["alice@x.com", "bob@x.com", "carol@x.com"]);
    }

    /// Store whose reads yield to the scheduler, so unserialized read-modify-write
    /// cycles would interleave and lose updates.
    #[derive(Default)]
    struct YieldingStore {
        inner: MemoryStore,
    }

    #[async_trait::async_trait]
    impl KeyValueStore for YieldingStore {
        async fn get(&self, key: &str) -> crate::ports::PortResult<Option<String>> {
            let value = self.inner.get(key).await;
            tokio::task::yield_now().await;
            value
        }

        async fn set(&self, key: &str, value: &str) -> crate::ports::PortResult<()> {
            tokio::task::yield_now().await;
            self.inner.set(key, value).await
        }

        async fn remove(&self, key: &str) -> crate::ports::PortResult<()> {
            self.inner.remove(key).await
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_signups_are_serialized() {
        let credentials = Arc::new(CredentialStore::new(Arc::new(YieldingStore::default())));

        let emails = [
            "one@x.com",
            "two@x.com",
            "three@x.com",
            "four@x.com",
            "dup@x.com",
            "DUP@x.com",
        ];
        let handles: Vec<_> = emails
            .iter()
            .map(|email| {
                let credentials = credentials.clone();
                let email = email.to_string();
                tokio::spawn(async move { credentials.create_account(&email, "pw").await })
            })
            .collect();

        let mut duplicate_outcomes = Vec::new();
        for (email, handle) in emails.iter().zip(handles) {
            let outcome = handle.await.expect("task");
            if email.eq_ignore_ascii_case("dup@x.com") {
                duplicate_outcomes.push(outcome);
            } else {
                outcome.expect("distinct email registers");
            }
        }

        assert_eq!(duplicate_outcomes.iter().filter(|o| o.is_ok()).count(), 1);
        assert!(duplicate_outcomes
            .iter()
            .any(|o| matches!(o, Err(CoreError::DuplicateAccount))));

        let accounts = credentials.accounts().await.expect("accounts");
        assert_eq!(accounts.len(), 5);
        for email in ["one@x.com", "two@x.com", "three@x.com", "four@x.com", "dup@x.com"] {
            assert!(accounts.iter().any(|account| account.has_email(email)));
        }
    }

    #[tokio::test]
    async fn admin_credential_override_and_reset() {
        let credentials = store();
        assert_eq!(credentials.admin_credential().await.expect("get"), DEFAULT_ADMIN_CODE);

        credentials.set_admin_credential("n3wcode").await.expect("set");
        assert_eq!(credentials.admin_credential().await.expect("get"), "n3wcode");

        credentials.reset_admin_credential().await.expect("reset");
        assert_eq!(credentials.admin_credential().await.expect("get"), DEFAULT_ADMIN_CODE);
    }
}
