use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;
use crate::storage::KeyValueStore;
use crate::submission::SubmissionClient;
use crate::wizard::controller::{WizardController, WizardStatus};
use crate::wizard::persistence::SnapshotStore;
use crate::wizard::registry::Flow;
use crate::wizard::session::PathVariant;

pub type ControllerHandle<F> = Arc<Mutex<WizardController<F>>>;

/// Idle limit for live controllers when snapshots never expire.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

struct Slot<F: Flow> {
    handle: ControllerHandle<F>,
    last_touched: Instant,
}

impl<F: Flow> Slot<F> {
    /// Busy controllers are never idle.
    fn is_idle(&self, now: Instant, timeout: Duration) -> bool {
        now.duration_since(self.last_touched) >= timeout && self.handle.try_lock().is_ok()
    }

    fn is_reusable(&self) -> bool {
        match self.handle.try_lock() {
            Ok(controller) => controller.status() != WizardStatus::Completed,
            Err(_) => true,
        }
    }
}

/// Live controllers for one flow, keyed by visitor.
///
/// The visitor id scopes storage the way a browser origin scopes local
/// storage. One controller per visitor; a request that finds it locked is
/// turned away rather than queued. Controllers idle longer than the snapshot
/// TTL (or [`DEFAULT_IDLE_TIMEOUT`]) are dropped; the snapshot stays the
/// durable copy and `open` resumes from it.
pub struct WizardService<F: Flow> {
    store: Arc<dyn KeyValueStore>,
    client: Arc<dyn SubmissionClient>,
    namespace: String,
    snapshot_ttl: Option<Duration>,
    idle_timeout: Duration,
    sessions: Mutex<HashMap<Uuid, Slot<F>>>,
}

impl<F: Flow> WizardService<F> {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        client: Arc<dyn SubmissionClient>,
        namespace: impl Into<String>,
        snapshot_ttl: Option<Duration>,
    ) -> Self {
        Self {
            store,
            client,
            namespace: namespace.into(),
            snapshot_ttl,
            idle_timeout: snapshot_ttl.unwrap_or(DEFAULT_IDLE_TIMEOUT),
            sessions: Mutex::default(),
        }
    }

    pub fn snapshots_for(&self, visitor_id: Uuid) -> SnapshotStore {
        SnapshotStore::new(
            self.store.clone(),
            &self.namespace,
            &visitor_id.to_string(),
            F::STORAGE_KEY,
            self.snapshot_ttl,
        )
    }

    /// Returns the visitor's live controller, or starts one (resuming any
    /// persisted snapshot). Completed controllers are replaced.
    pub async fn open(&self, visitor_id: Uuid, variant: PathVariant) -> ControllerHandle<F> {
        if let Some(existing) = self.touch(visitor_id, true).await {
            return existing;
        }

        let controller =
            WizardController::start(self.snapshots_for(visitor_id), self.client.clone(), variant)
                .await;

        // Another request may have started this visitor while we awaited.
        let mut sessions = self.sessions.lock().await;
        let now = Instant::now();
        if let Some(slot) = sessions.get_mut(&visitor_id) {
            if slot.is_reusable() {
                slot.last_touched = now;
                return slot.handle.clone();
            }
        }

        let handle = Arc::new(Mutex::new(controller));
        sessions.insert(
            visitor_id,
            Slot {
                handle: handle.clone(),
                last_touched: now,
            },
        );
        handle
    }

    pub async fn get(&self, visitor_id: Uuid) -> Option<ControllerHandle<F>> {
        self.touch(visitor_id, false).await
    }

    pub async fn forget(&self, visitor_id: Uuid) {
        self.sessions.lock().await.remove(&visitor_id);
    }

    /// Evicts idle controllers, then returns and touches the visitor's slot.
    /// With `reusable_only`, completed controllers are not returned.
    async fn touch(&self, visitor_id: Uuid, reusable_only: bool) -> Option<ControllerHandle<F>> {
        let mut sessions = self.sessions.lock().await;
        let now = Instant::now();
        let before = sessions.len();
        sessions.retain(|_, slot| !slot.is_idle(now, self.idle_timeout));
        if sessions.len() < before {
            debug!(
                flow = F::NAME,
                evicted = before - sessions.len(),
                "Evicted idle wizard controllers"
            );
        }

        let slot = sessions.get_mut(&visitor_id)?;
        if reusable_only && !slot.is_reusable() {
            return None;
        }
        slot.last_touched = now;
        Some(slot.handle.clone())
    }

    #[cfg(test)]
    async fn live_sessions(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

/// Takes the controller lock without waiting.
pub fn acquire<F: Flow>(
    handle: &ControllerHandle<F>,
) -> Result<MutexGuard<'_, WizardController<F>>, AppError> {
    handle.try_lock().map_err(|_| {
        AppError::Conflict("Another request for this session is still in progress".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flows::career_os::{CareerOsFlow, CareerOsStep};
    use crate::storage::MemoryStore;
    use crate::submission::{Receipt, SubmissionError, SubmissionMetadata, SubmissionPayload};
    use crate::wizard::registry::Cursor;
    use async_trait::async_trait;
    use serde_json::json;

    struct AcceptAll;

    #[async_trait]
    impl SubmissionClient for AcceptAll {
        async fn submit(&self, _: &SubmissionPayload) -> Result<Receipt, SubmissionError> {
            Ok(Receipt::default())
        }
    }

    fn service() -> WizardService<CareerOsFlow> {
        WizardService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(AcceptAll),
            "funnel",
            None,
        )
    }

    #[tokio::test]
    async fn test_open_reuses_live_controller() {
        let svc = service();
        let visitor = Uuid::new_v4();
        let a = svc.open(visitor, PathVariant::Guided).await;
        let b = svc.open(visitor, PathVariant::Fast).await;
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn test_acquire_rejects_busy_controller() {
        let svc = service();
        let handle = svc.open(Uuid::new_v4(), PathVariant::Guided).await;
        let _held = acquire(&handle).unwrap();
        assert!(matches!(acquire(&handle), Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_open_replaces_completed_controller() {
        let svc = service();
        let visitor = Uuid::new_v4();
        let first = svc.open(visitor, PathVariant::Fast).await;
        {
            let mut c = acquire(&first).unwrap();
            c.submit_step(json!({"name": "A", "email": "a@x.com"}).as_object().cloned().unwrap())
                .await
                .unwrap();
            c.complete(SubmissionMetadata::default()).await.unwrap();
        }
        let second = svc.open(visitor, PathVariant::Fast).await;
        assert!(!Arc::ptr_eq(&first, &second));
        let c = acquire(&second).unwrap();
        assert_eq!(c.current_step(), Cursor::Step(CareerOsStep::Contact));
    }

    #[tokio::test]
    async fn test_concurrent_open_shares_one_controller() {
        let svc = service();
        let visitor = Uuid::new_v4();
        let (a, b) = tokio::join!(
            svc.open(visitor, PathVariant::Guided),
            svc.open(visitor, PathVariant::Guided)
        );
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(svc.live_sessions().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_controllers_are_evicted_after_ttl() {
        let svc: WizardService<CareerOsFlow> = WizardService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(AcceptAll),
            "funnel",
            Some(Duration::from_secs(60)),
        );
        for _ in 0..100 {
            svc.open(Uuid::new_v4(), PathVariant::Guided).await;
        }
        assert_eq!(svc.live_sessions().await, 100);

        tokio::time::advance(Duration::from_secs(3600)).await;
        let fresh = Uuid::new_v4();
        svc.open(fresh, PathVariant::Guided).await;
        assert_eq!(svc.live_sessions().await, 1);
        assert!(svc.get(fresh).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_controller_is_not_evicted() {
        let svc = service();
        let visitor = Uuid::new_v4();
        let handle = svc.open(visitor, PathVariant::Guided).await;
        let _held = acquire(&handle).unwrap();

        tokio::time::advance(DEFAULT_IDLE_TIMEOUT * 2).await;
        assert!(svc.get(visitor).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_evicted_visitor_resumes_from_snapshot() {
        let svc = service();
        let visitor = Uuid::new_v4();
        {
            let handle = svc.open(visitor, PathVariant::Guided).await;
            let mut c = acquire(&handle).unwrap();
            c.submit_step(json!({"name": "A", "email": "a@x.com"}).as_object().cloned().unwrap())
                .await
                .unwrap();
        }

        tokio::time::advance(DEFAULT_IDLE_TIMEOUT + Duration::from_secs(1)).await;
        assert!(svc.get(visitor).await.is_none());

        let handle = svc.open(visitor, PathVariant::Guided).await;
        let c = acquire(&handle).unwrap();
        assert_eq!(c.current_step(), Cursor::Step(CareerOsStep::Background));
    }

    #[tokio::test]
    async fn test_visitors_do_not_share_snapshots() {
        let svc = service();
        assert_ne!(
            svc.snapshots_for(Uuid::new_v4()).key(),
            svc.snapshots_for(Uuid::new_v4()).key()
        );
    }
}
