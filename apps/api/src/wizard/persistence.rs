#![allow(dead_code)]

//! Persistence Adapter: best-effort snapshots of a `WizardSession`.
//!
//! Persistence is a durability nicety: save/clear failures are logged and
//! swallowed, and anything unreadable on load counts as "no snapshot".

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::storage::{storage_key, KeyValueStore};
use crate::wizard::registry::StepName;
use crate::wizard::session::WizardSession;

#[derive(Clone)]
pub struct SnapshotStore {
    store: Arc<dyn KeyValueStore>,
    key: String,
    ttl: Option<Duration>,
}

impl SnapshotStore {
    /// One adapter per (visitor scope, flow storage key).
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        namespace: &str,
        scope: &str,
        flow_key: &str,
        ttl: Option<Duration>,
    ) -> Self {
        Self {
            store,
            key: storage_key(namespace, scope, flow_key),
            ttl,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub async fn save<S: StepName>(&self, session: &WizardSession<S>) {
        let raw = match serde_json::to_string(session) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key = %self.key, "Skipping snapshot save, serialization failed: {e}");
                return;
            }
        };
        match self.store.set(&self.key, raw, self.ttl).await {
            Ok(()) => debug!(key = %self.key, "Snapshot saved"),
            Err(e) => warn!(key = %self.key, "Skipping snapshot save: {e}"),
        }
    }

    /// Returns the stored session if present and structurally valid.
    pub async fn load<S: StepName>(&self) -> Option<WizardSession<S>> {
        let raw = match self.store.get(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %self.key, "Snapshot load failed, starting fresh: {e}");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!(key = %self.key, "Discarding malformed snapshot: {e}");
                None
            }
        }
    }

    pub async fn clear(&self) {
        if let Err(e) = self.store.remove(&self.key).await {
            warn!(key = %self.key, "Snapshot clear failed: {e}");
        }
    }
}
