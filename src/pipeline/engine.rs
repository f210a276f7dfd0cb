//! Lazily initialised, process-wide rendering engine.
//!
//! [`EngineCell`] is uninitialised until the first caller asks for the
//! engine. That caller starts the initialiser; every caller arriving while it
//! is in flight awaits the same attempt and sees its result, success or
//! failure. Once ready, the engine is shared for the rest of the process. A
//! failed attempt is forgotten when it settles, so only calls made after the
//! failure start a new one.
//!
//! The PDFium engine itself lives in a `static` cell; see [`pdfium`].

use crate::error::ConvertError;
use futures::future::{BoxFuture, FutureExt, Shared, TryFutureExt};
use pdfium_render::prelude::Pdfium;
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use tracing::{debug, info};

type Attempt<E, Err> = Shared<BoxFuture<'static, Result<Arc<E>, Err>>>;

/// Memoises a single asynchronous initialisation, including the in-flight one.
pub struct EngineCell<E, Err> {
    ready: OnceLock<Arc<E>>,
    pending: Mutex<Option<Attempt<E, Err>>>,
}

impl<E, Err> EngineCell<E, Err>
where
    E: Send + Sync + 'static,
    Err: Clone + Send + Sync + 'static,
{
    pub const fn new() -> Self {
        Self {
            ready: OnceLock::new(),
            pending: Mutex::new(None),
        }
    }

    /// The engine, if already initialised.
    pub fn get(&self) -> Option<Arc<E>> {
        self.ready.get().cloned()
    }

    pub fn is_ready(&self) -> bool {
        self.ready.get().is_some()
    }

    /// Return the engine, running `init` only if no initialisation has
    /// succeeded yet and none is in flight.
    pub async fn get_or_try_init<F, Fut>(&self, init: F) -> Result<Arc<E>, Err>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<E, Err>> + Send + 'static,
    {
        if let Some(engine) = self.get() {
            return Ok(engine);
        }

        let attempt = {
            let mut pending = self.lock_pending();
            if let Some(engine) = self.get() {
                return Ok(engine);
            }
            match pending.as_ref() {
                Some(in_flight) => in_flight.clone(),
                None => {
                    let started = init().map_ok(Arc::new).boxed().shared();
                    *pending = Some(started.clone());
                    started
                }
            }
        };

        let result = attempt.clone().await;

        // First waiter to observe the outcome settles the cell.
        let mut pending = self.lock_pending();
        if pending.as_ref().is_some_and(|p| p.ptr_eq(&attempt)) {
            if let Ok(ref engine) = result {
                let _ = self.ready.set(Arc::clone(engine));
            }
            *pending = None;
        }
        result
    }

    fn lock_pending(&self) -> MutexGuard<'_, Option<Attempt<E, Err>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<E, Err> Default for EngineCell<E, Err>
where
    E: Send + Sync + 'static,
    Err: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

static PDFIUM: EngineCell<Pdfium, ConvertError> = EngineCell::new();
static PDFIUM_INITS: AtomicUsize = AtomicUsize::new(0);

/// Number of times the PDFium engine was actually bound in this process.
pub fn engine_init_count() -> usize {
    PDFIUM_INITS.load(Ordering::SeqCst)
}

/// The shared PDFium engine, bound on first use.
///
/// `library` is only consulted by the call that performs the initialisation;
/// later calls get the already-bound engine whatever they pass. Locating the
/// library may download it, so the work runs on a blocking thread.
pub async fn pdfium(library: Option<PathBuf>) -> Result<Arc<Pdfium>, ConvertError> {
    if let Some(engine) = PDFIUM.get() {
        return Ok(engine);
    }

    PDFIUM
        .get_or_try_init(|| async move {
            debug!("Binding PDFium engine");
            let bound = tokio::task::spawn_blocking(move || pdfium_loader::bind(library.as_deref()))
                .await
                .map_err(|e| ConvertError::Internal(format!("Engine init task panicked: {e}")))?
                .map_err(|e| ConvertError::EngineUnavailable(e.to_string()))?;
            let n = PDFIUM_INITS.fetch_add(1, Ordering::SeqCst) + 1;
            info!("PDFium engine ready (init #{n})");
            Ok(bound)
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;
    use std::time::Duration;

    struct FakeEngine {
        serial: usize,
    }

    type Cell = EngineCell<FakeEngine, String>;

    /// Spawn `n` callers at once; each init bumps `inits`, sleeps, then
    /// succeeds or fails.
    async fn race(
        cell: &Arc<Cell>,
        inits: &Arc<AtomicUsize>,
        n: usize,
        succeed: bool,
    ) -> Vec<Result<Arc<FakeEngine>, String>> {
        let callers = (0..n).map(|_| {
            let cell = Arc::clone(cell);
            let inits = Arc::clone(inits);
            tokio::spawn(async move {
                cell.get_or_try_init(move || async move {
                    let serial = inits.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    if succeed {
                        Ok(FakeEngine { serial })
                    } else {
                        Err(format!("download failed (attempt {serial})"))
                    }
                })
                .await
            })
        });
        join_all(callers)
            .await
            .into_iter()
            .map(|joined| joined.unwrap())
            .collect()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_calls_share_one_init() {
        let cell = Arc::new(Cell::new());
        let inits = Arc::new(AtomicUsize::new(0));

        let engines: Vec<_> = race(&cell, &inits, 16, true)
            .await
            .into_iter()
            .map(Result::unwrap)
            .collect();

        assert_eq!(inits.load(Ordering::SeqCst), 1);
        assert!(engines.iter().all(|e| Arc::ptr_eq(e, &engines[0])));
        assert_eq!(engines[0].serial, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_calls_share_one_failure() {
        let cell = Arc::new(Cell::new());
        let inits = Arc::new(AtomicUsize::new(0));

        let results = race(&cell, &inits, 8, false).await;

        assert_eq!(inits.load(Ordering::SeqCst), 1);
        assert!(results
            .iter()
            .all(|r| r.as_ref().err().map(String::as_str) == Some("download failed (attempt 0)")));
        assert!(!cell.is_ready());

        // Calls made after the failure start a fresh attempt.
        let retried = race(&cell, &inits, 4, true).await;
        assert_eq!(inits.load(Ordering::SeqCst), 2);
        assert!(retried.iter().all(|r| r.as_ref().map(|e| e.serial).ok() == Some(1)));
        assert!(cell.is_ready());
    }

    #[tokio::test]
    async fn failed_init_can_be_retried() {
        let cell = EngineCell::<FakeEngine, &str>::new();

        let first = cell
            .get_or_try_init(|| async { Err::<FakeEngine, _>("no library") })
            .await;
        assert_eq!(first.err(), Some("no library"));
        assert!(!cell.is_ready());

        let second = cell
            .get_or_try_init(|| async { Ok::<_, &str>(FakeEngine { serial: 7 }) })
            .await
            .unwrap();
        assert_eq!(second.serial, 7);
        assert!(cell.is_ready());
    }

    #[tokio::test]
    async fn ready_cell_skips_init() {
        let cell = EngineCell::<FakeEngine, ()>::new();
        cell.get_or_try_init(|| async { Ok(FakeEngine { serial: 1 }) })
            .await
            .unwrap();

        let reran = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&reran);
        let again = cell
            .get_or_try_init(move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(FakeEngine { serial: 2 })
            })
            .await
            .unwrap();
        assert_eq!(reran.load(Ordering::SeqCst), 0);
        assert_eq!(again.serial, 1);
        assert_eq!(cell.get().map(|e| e.serial), Some(1));
    }
}
