//! Change event routing.
//!
//! Every active view gets a worker task with its own queue. Dispatching an
//! event enqueues it once per view and returns immediately, so:
//!
//! - events for one view are handled in arrival order, one at a time
//! - views are refreshed independently; a failing refresh in one view is
//!   logged and never holds up the others or later events
//! - the notifier is never blocked
//!
//! The set of active views is an explicit [`ViewRegistry`] handle rather
//! than global state.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::refresh::RefreshEngine;
use crate::store::{DocumentStore, ReferenceIndex};
use crate::types::{ChangeEvent, RefreshReport};
use crate::view::{GraphView, ViewId};

/// Result of one view's refresh.
pub type RefreshResult = Result<RefreshReport, SyncError>;

/// Shared handle to the set of active graph views.
#[derive(Clone, Default)]
pub struct ViewRegistry {
    views: Arc<RwLock<BTreeMap<ViewId, Arc<dyn GraphView>>>>,
}

impl std::fmt::Debug for ViewRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewRegistry")
            .field("views", &self.views.read().keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ViewRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a view and return its id.
    pub fn register(&self, view: Arc<dyn GraphView>) -> ViewId {
        let id = view.view_id();
        self.views.write().insert(id, view);
        info!(view = %id, "Registered graph view");
        id
    }

    /// Unregister a view. Its worker stops once its queue drains.
    pub fn unregister(&self, id: &ViewId) -> bool {
        let removed = self.views.write().remove(id).is_some();
        if removed {
            info!(view = %id, "Unregistered graph view");
        }
        removed
    }

    /// Whether a view is registered.
    pub fn contains(&self, id: &ViewId) -> bool {
        self.views.read().contains_key(id)
    }

    /// Look up a registered view.
    pub fn get(&self, id: &ViewId) -> Option<Arc<dyn GraphView>> {
        self.views.read().get(id).cloned()
    }

    /// All registered views, ordered by id.
    pub fn snapshot(&self) -> Vec<(ViewId, Arc<dyn GraphView>)> {
        self.views
            .read()
            .iter()
            .map(|(id, view)| (*id, Arc::clone(view)))
            .collect()
    }

    /// Number of registered views.
    pub fn len(&self) -> usize {
        self.views.read().len()
    }

    /// Whether no view is registered.
    pub fn is_empty(&self) -> bool {
        self.views.read().is_empty()
    }
}

struct Job {
    event: ChangeEvent,
    reply: oneshot::Sender<RefreshResult>,
}

/// Pending per-view results of one dispatched event.
///
/// Dropping the ticket does not cancel anything.
#[derive(Debug)]
pub struct DispatchTicket {
    pending: Vec<(ViewId, oneshot::Receiver<RefreshResult>)>,
}

impl DispatchTicket {
    /// Number of views the event was sent to.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether the event reached no view.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Wait for every view's refresh to finish.
    pub async fn wait(self) -> Vec<(ViewId, RefreshResult)> {
        let mut results = Vec::with_capacity(self.pending.len());
        for (id, rx) in self.pending {
            let result = rx.await.unwrap_or(Err(SyncError::ViewClosed(id)));
            results.push((id, result));
        }
        results
    }
}

/// Fans change events out to every active view.
pub struct ChangeEventRouter<S, I> {
    engine: Arc<RefreshEngine<S, I>>,
    registry: ViewRegistry,
    workers: Mutex<BTreeMap<ViewId, mpsc::UnboundedSender<Job>>>,
}

impl<S, I> ChangeEventRouter<S, I>
where
    S: DocumentStore + 'static,
    I: ReferenceIndex + 'static,
{
    /// Create a router over an engine and a view registry.
    pub fn new(engine: Arc<RefreshEngine<S, I>>, registry: ViewRegistry) -> Self {
        Self {
            engine,
            registry,
            workers: Mutex::new(BTreeMap::new()),
        }
    }

    /// The registry this router dispatches to.
    pub fn registry(&self) -> &ViewRegistry {
        &self.registry
    }

    /// Enqueue `event` for every registered view.
    ///
    /// Workers are spawned on the current tokio runtime the first time a
    /// view receives an event. Fails with [`SyncError::NoRuntime`] if a
    /// worker is needed but no runtime is running; nothing is enqueued then.
    pub fn dispatch(&self, event: ChangeEvent) -> Result<DispatchTicket, SyncError> {
        let views = self.registry.snapshot();
        let mut workers = self.workers.lock();
        workers.retain(|id, tx| self.registry.contains(id) && !tx.is_closed());

        let runtime = Handle::try_current().ok();
        if runtime.is_none() && views.iter().any(|(id, _)| !workers.contains_key(id)) {
            warn!(event = ?event, "No tokio runtime to spawn view workers on");
            return Err(SyncError::NoRuntime);
        }

        let mut pending = Vec::with_capacity(views.len());
        for (id, view) in views {
            let tx = match (workers.entry(id), &runtime) {
                (Entry::Occupied(entry), _) => entry.into_mut(),
                (Entry::Vacant(entry), Some(handle)) => {
                    entry.insert(spawn_worker(handle, Arc::clone(&self.engine), id, view))
                }
                (Entry::Vacant(_), None) => return Err(SyncError::NoRuntime),
            };
            let (reply, rx) = oneshot::channel();
            let job = Job {
                event: event.clone(),
                reply,
            };
            if tx.send(job).is_err() {
                warn!(view = %id, "View worker gone, dropping event");
                workers.remove(&id);
                continue;
            }
            pending.push((id, rx));
        }
        debug!(event = ?event, views = pending.len(), "Dispatched change event");
        Ok(DispatchTicket { pending })
    }

    /// Dispatch every event received on `events` until the channel closes.
    pub async fn run(&self, mut events: mpsc::UnboundedReceiver<ChangeEvent>) {
        while let Some(event) = events.recv().await {
            if let Err(e) = self.dispatch(event) {
                warn!(error = %e, "Dropped change event");
            }
        }
        debug!("Change event stream closed");
    }

    /// Spawn [`ChangeEventRouter::run`] as a background task.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn listen(self: Arc<Self>, events: mpsc::UnboundedReceiver<ChangeEvent>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(events).await })
    }
}

fn spawn_worker<S, I>(
    runtime: &Handle,
    engine: Arc<RefreshEngine<S, I>>,
    id: ViewId,
    view: Arc<dyn GraphView>,
) -> mpsc::UnboundedSender<Job>
where
    S: DocumentStore + 'static,
    I: ReferenceIndex + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
    runtime.spawn(async move {
        while let Some(job) = rx.recv().await {
            let result = engine.handle(view.as_ref(), &job.event).await;
            if let Err(e) = &result {
                warn!(view = %id, event = ?job.event, error = %e, "Refresh failed");
            }
            // The ticket may have been dropped.
            let _ = job.reply.send(result);
        }
        debug!(view = %id, "View worker stopped");
    });
    tx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use crate::store::InMemoryVault;
    use crate::view::InMemoryGraphView;

    fn setup() -> (Arc<InMemoryVault>, ChangeEventRouter<InMemoryVault, InMemoryVault>) {
        let vault = Arc::new(InMemoryVault::new());
        let engine =
            RefreshEngine::new(Arc::clone(&vault), Arc::clone(&vault), SyncConfig::default())
                .unwrap();
        let router = ChangeEventRouter::new(Arc::new(engine), ViewRegistry::new());
        (vault, router)
    }

    #[tokio::test]
    async fn test_dispatch_reaches_every_view() {
        let (vault, router) = setup();
        vault.put("A.md", "");
        let v1 = Arc::new(InMemoryGraphView::new());
        let v2 = Arc::new(InMemoryGraphView::new());
        router.registry().register(v1.clone());
        router.registry().register(v2.clone());

        let results = router
            .dispatch(ChangeEvent::content_changed("A.md"))
            .unwrap()
            .wait()
            .await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|(_, r)| r.is_ok()));
        assert!(v1.lookup("core:A").is_some());
        assert!(v2.lookup("core:A").is_some());
    }

    #[tokio::test]
    async fn test_no_views_no_work() {
        let (_vault, router) = setup();
        let ticket = router.dispatch(ChangeEvent::deleted("A.md")).unwrap();
        assert!(ticket.is_empty());
    }

    #[tokio::test]
    async fn test_unregistered_view_stops_receiving() {
        let (vault, router) = setup();
        vault.put("A.md", "");
        let view = Arc::new(InMemoryGraphView::new());
        let id = router.registry().register(view.clone());
        router
            .dispatch(ChangeEvent::content_changed("A.md"))
            .unwrap()
            .wait()
            .await;

        assert!(router.registry().unregister(&id));
        vault.put("B.md", "");
        let ticket = router.dispatch(ChangeEvent::content_changed("B.md")).unwrap();
        assert!(ticket.is_empty());
        assert!(view.lookup("core:B").is_none());
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_later_events() {
        let (vault, router) = setup();
        vault.put("A.md", "");
        vault.put("B.md", "");
        vault.set_read_failure("A.md", true);
        let view = Arc::new(InMemoryGraphView::new());
        router.registry().register(view.clone());

        let failed = router.dispatch(ChangeEvent::content_changed("A.md")).unwrap();
        let ok = router.dispatch(ChangeEvent::content_changed("B.md")).unwrap();

        let failed = failed.wait().await;
        assert!(matches!(failed[0].1, Err(SyncError::Store(_))));
        let ok = ok.wait().await;
        assert!(ok[0].1.is_ok());
        assert!(view.lookup("core:B").is_some());
    }

    #[test]
    fn test_dispatch_without_runtime_fails() {
        let (vault, router) = setup();
        vault.put("A.md", "");
        let view = Arc::new(InMemoryGraphView::new());
        router.registry().register(view.clone());

        let result = router.dispatch(ChangeEvent::content_changed("A.md"));
        assert!(matches!(result, Err(SyncError::NoRuntime)));
        assert!(view.lookup("core:A").is_none());

        // No views means no workers to spawn.
        let (_vault, empty) = setup();
        assert!(empty.dispatch(ChangeEvent::deleted("A.md")).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_listen_consumes_channel() {
        let (vault, router) = setup();
        vault.put("A.md", "");
        let view = Arc::new(InMemoryGraphView::new());
        router.registry().register(view.clone());

        let router = Arc::new(router);
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = Arc::clone(&router).listen(rx);
        tx.send(ChangeEvent::content_changed("A.md")).unwrap();
        drop(tx);
        handle.await.unwrap();

        // The listener only enqueues; a follow-up event on the same worker
        // completes after the first one.
        router
            .dispatch(ChangeEvent::content_changed("A.md"))
            .unwrap()
            .wait()
            .await;
        assert!(view.lookup("core:A").is_some());
    }
}
