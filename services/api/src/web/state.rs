//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the registry of open tabs.

use crate::config::Config;
use evaluator_core::{CredentialStore, Evaluator, MemoryStore};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::{sync::Mutex, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub credentials: Arc<CredentialStore>,
    pub evaluator: Evaluator,
    pub tabs: Arc<TabRegistry>,
}

//=========================================================================================
// TabRegistry (Transient Stores, One Per Browser Tab)
//=========================================================================================

struct TabEntry {
    store: Arc<MemoryStore>,
    /// Open WebSocket connections (page loads) currently using the tab.
    connections: usize,
    last_seen: Instant,
}

/// Holds the tab-scoped transient stores. A tab outlives individual WebSocket
/// connections (page reloads). It ends when it is closed explicitly or when it
/// has had no connection for longer than the idle timeout.
#[derive(Default)]
pub struct TabRegistry {
    tabs: Mutex<HashMap<Uuid, TabEntry>>,
}

impl TabRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new tab with an empty transient store.
    pub async fn open(&self) -> Uuid {
        let tab_id = Uuid::new_v4();
        self.tabs.lock().await.insert(
            tab_id,
            TabEntry {
                store: Arc::new(MemoryStore::new()),
                connections: 0,
                last_seen: Instant::now(),
            },
        );
        info!("Opened tab {}", tab_id);
        tab_id
    }

    /// Attaches a connection to a tab and hands back its store.
    pub async fn attach(&self, tab_id: Uuid) -> Option<Arc<MemoryStore>> {
        let mut tabs = self.tabs.lock().await;
        let entry = tabs.get_mut(&tab_id)?;
        entry.connections += 1;
        entry.last_seen = Instant::now();
        Some(entry.store.clone())
    }

    /// Detaches a connection; the idle clock starts from here.
    pub async fn detach(&self, tab_id: Uuid) {
        if let Some(entry) = self.tabs.lock().await.get_mut(&tab_id) {
            entry.connections = entry.connections.saturating_sub(1);
            entry.last_seen = Instant::now();
        }
    }

    /// Closes a tab, dropping its transient store. Returns whether it existed.
    pub async fn close(&self, tab_id: Uuid) -> bool {
        let removed = self.tabs.lock().await.remove(&tab_id).is_some();
        if removed {
            info!("Closed tab {}", tab_id);
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.tabs.lock().await.len()
    }

    /// Drops tabs without connections that were last seen more than `max_idle`
    /// before `now`. Returns how many were dropped.
    pub async fn sweep_idle(&self, now: Instant, max_idle: Duration) -> usize {
        let mut tabs = self.tabs.lock().await;
        let before = tabs.len();
        tabs.retain(|_, entry| {
            entry.connections > 0 || now.saturating_duration_since(entry.last_seen) <= max_idle
        });
        let swept = before - tabs.len();
        if swept > 0 {
            info!("Expired {} idle tab(s)", swept);
        }
        swept
    }
}

/// Periodically expires idle tabs until the token is cancelled.
pub fn spawn_tab_sweeper(
    tabs: Arc<TabRegistry>,
    max_idle: Duration,
    every: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    tabs.sweep_idle(Instant::now(), max_idle).await;
                }
            }
        }
    })
}
