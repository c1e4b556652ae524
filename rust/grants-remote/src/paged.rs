use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::{QueryError, QueryExecutor, QueryPage, QueryRequest, RecordStore};

/// What a paged view shows at any moment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageState {
    /// The most recent page received. Kept while a newer one loads.
    pub page: Option<Arc<QueryPage>>,
    /// A load is in progress
    pub fetching: bool,
    /// The most recent load failed
    pub error: Option<QueryError>,
}

/// Drives a paged view: loads pages in the background and keeps showing the
/// previous page until the next one arrives.
///
/// Starting a new load aborts the one in flight. Dropping the `PagedQuery`
/// aborts it too. A load whose response was superseded by an identical
/// request made elsewhere on the same executor leaves the state untouched.
pub struct PagedQuery<S> {
    executor: QueryExecutor<S>,
    state: Arc<watch::Sender<PageState>>,
    loads: Arc<AtomicU64>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<S> PagedQuery<S>
where
    S: RecordStore + 'static,
{
    /// A paged view over `executor`, initially empty
    pub fn new(executor: QueryExecutor<S>) -> Self {
        let (state, _) = watch::channel(PageState::default());
        Self {
            executor,
            state: Arc::new(state),
            loads: Arc::new(AtomicU64::new(0)),
            task: Mutex::new(None),
        }
    }

    /// Start loading `request` without waiting for it
    pub fn load(&self, request: QueryRequest) {
        let load = self.loads.fetch_add(1, Ordering::SeqCst) + 1;

        let mut task = self.task.lock();
        if let Some(previous) = task.take() {
            previous.abort();
        }

        self.state.send_modify(|state| {
            state.fetching = true;
        });

        let executor = self.executor.clone();
        let state = Arc::clone(&self.state);
        let loads = Arc::clone(&self.loads);
        *task = Some(tokio::spawn(async move {
            let result = executor.query(request).await;
            state.send_if_modified(|state| {
                if loads.load(Ordering::SeqCst) != load {
                    return false;
                }
                match result {
                    Ok(page) => {
                        state.page = Some(page);
                        state.error = None;
                    }
                    Err(QueryError::Superseded { .. }) => return false,
                    Err(error) => {
                        tracing::debug!(%error, "page load failed");
                        state.error = Some(error);
                    }
                }
                state.fetching = false;
                true
            });
        }));
    }

    /// The current state
    pub fn state(&self) -> PageState {
        self.state.borrow().clone()
    }

    /// Observe state changes
    pub fn subscribe(&self) -> watch::Receiver<PageState> {
        self.state.subscribe()
    }
}

impl<S> Drop for PagedQuery<S> {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}
