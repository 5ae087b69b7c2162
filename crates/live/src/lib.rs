//! Live query subscriptions over the embedded store.
//!
//! Mutations in `db` append table-level rows to the `change_log` outbox
//! inside their own transactions. A flush worker drains that outbox and
//! re-evaluates every subscription whose last-observed read set intersects
//! the changed tables. Queries declare their reads through [`QueryCtx::read`],
//! so dependencies follow whatever the query actually touched on its latest
//! run.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use db::{DBService, models::change_log::ChangeLog, types::Table};
use futures::future::BoxFuture;
use sea_orm::{DatabaseTransaction, DbErr, Iterable, TransactionTrait};
use thiserror::Error;
use tokio::sync::watch;

const FLUSH_INTERVAL: Duration = Duration::from_millis(50);
const FLUSH_BATCH_LIMIT: u64 = 256;

#[derive(Debug, Clone, Error)]
pub enum LiveError {
    #[error("query evaluation failed: {0}")]
    Query(Arc<DbErr>),
}

impl From<DbErr> for LiveError {
    fn from(err: DbErr) -> Self {
        LiveError::Query(Arc::new(err))
    }
}

pub type QueryResult<T> = Result<T, LiveError>;

type QueryFn<T> =
    dyn for<'a> Fn(&'a QueryCtx) -> BoxFuture<'a, Result<T, DbErr>> + Send + Sync;
type RerunFn = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;
type Registry = Arc<Mutex<HashMap<u64, SubEntry>>>;

/// One evaluation's view of the database. All reads go through the same
/// transaction, so a query never sees a half-applied mutation, and every
/// table it declares is recorded as a dependency for the run.
pub struct QueryCtx {
    txn: DatabaseTransaction,
    reads: Mutex<HashSet<Table>>,
}

impl QueryCtx {
    pub fn read(&self, table: Table) -> &DatabaseTransaction {
        lock(&self.reads).insert(table);
        &self.txn
    }
}

struct SubEntry {
    deps: Arc<Mutex<HashSet<Table>>>,
    rerun: RerunFn,
}

/// A handle to one live query. Holds the latest result; dropping it
/// unregisters the query.
pub struct Subscription<T> {
    id: u64,
    rx: watch::Receiver<QueryResult<T>>,
    registry: Registry,
}

impl<T: Clone> Subscription<T> {
    pub fn current(&self) -> QueryResult<T> {
        self.rx.borrow().clone()
    }

    /// Resolves after the next re-evaluation publishes a result. Returns
    /// `false` once the service side is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        lock(&self.registry).remove(&self.id);
    }
}

#[derive(Clone)]
pub struct LiveQueryService {
    db: DBService,
    registry: Registry,
    next_id: Arc<AtomicU64>,
}

impl LiveQueryService {
    pub fn new(db: DBService) -> Self {
        let service = Self::bare(db);
        service.spawn_flush_worker();
        service
    }

    /// Construction without the background worker; flushes are then driven
    /// by explicit `flush_pending` calls.
    fn bare(db: DBService) -> Self {
        Self {
            db,
            registry: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    fn spawn_flush_worker(&self) {
        let service = self.clone();
        tokio::spawn(async move {
            loop {
                if let Err(err) = service.flush_pending().await {
                    tracing::error!(error = %err, "change log flush failed");
                }
                tokio::time::sleep(FLUSH_INTERVAL).await;
            }
        });
    }

    /// Runs the query once and registers it for re-evaluation. The returned
    /// subscription starts out holding the first result, success or not.
    pub async fn subscribe<T, F>(&self, query: F) -> Subscription<T>
    where
        T: Clone + Send + Sync + 'static,
        F: for<'a> Fn(&'a QueryCtx) -> BoxFuture<'a, Result<T, DbErr>> + Send + Sync + 'static,
    {
        let query: Arc<QueryFn<T>> = Arc::new(query);
        let (result, reads) = evaluate(&self.db, query.as_ref()).await;

        let deps = Arc::new(Mutex::new(HashSet::new()));
        apply_deps(&deps, &result, reads);

        let (tx, rx) = watch::channel(result.map_err(LiveError::from));
        let tx = Arc::new(tx);

        let rerun: RerunFn = {
            let db = self.db.clone();
            let deps = deps.clone();
            Arc::new(move || {
                let db = db.clone();
                let query = query.clone();
                let deps = deps.clone();
                let tx = tx.clone();
                Box::pin(async move {
                    let (result, reads) = evaluate(&db, query.as_ref()).await;
                    apply_deps(&deps, &result, reads);
                    let _ = tx.send(result.map_err(LiveError::from));
                })
            })
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.registry).insert(id, SubEntry { deps, rerun });

        Subscription {
            id,
            rx,
            registry: self.registry.clone(),
        }
    }

    /// Drains unpublished change log rows and re-evaluates every
    /// subscription whose dependency set intersects the changed tables.
    /// The background worker calls this on an interval; tests call it
    /// directly.
    pub async fn flush_pending(&self) -> Result<(), DbErr> {
        let entries = ChangeLog::fetch_unpublished(&self.db.conn, FLUSH_BATCH_LIMIT).await?;
        if entries.is_empty() {
            return Ok(());
        }

        let changed: HashSet<Table> = entries.iter().map(|entry| entry.table_name).collect();
        let ids: Vec<i64> = entries.iter().map(|entry| entry.id).collect();
        ChangeLog::mark_published(&self.db.conn, &ids).await?;

        let reruns: Vec<RerunFn> = {
            let registry = lock(&self.registry);
            registry
                .values()
                .filter(|entry| !lock(&entry.deps).is_disjoint(&changed))
                .map(|entry| entry.rerun.clone())
                .collect()
        };

        for rerun in reruns {
            rerun().await;
        }
        Ok(())
    }
}

/// On success the dependency set is replaced wholesale, so conditional reads
/// retrack. On failure the observed reads merge into the old set, and an
/// empty result falls back to every table, so the query keeps getting
/// retried on later writes.
fn apply_deps<T>(
    deps: &Arc<Mutex<HashSet<Table>>>,
    result: &Result<T, DbErr>,
    reads: HashSet<Table>,
) {
    let mut guard = lock(deps);
    match result {
        Ok(_) => *guard = reads,
        Err(_) => {
            guard.extend(reads);
            if guard.is_empty() {
                guard.extend(Table::iter());
            }
        }
    }
}

async fn evaluate<T>(db: &DBService, query: &QueryFn<T>) -> (Result<T, DbErr>, HashSet<Table>) {
    let txn = match db.conn.begin().await {
        Ok(txn) => txn,
        Err(err) => return (Err(err), HashSet::new()),
    };
    let ctx = QueryCtx {
        txn,
        reads: Mutex::new(HashSet::new()),
    };
    let result = query(&ctx).await;

    let QueryCtx { txn, reads } = ctx;
    let reads = reads.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner());

    // Read-only transaction; a failed commit still invalidates the result.
    let result = match (result, txn.commit().await) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(err)) => Err(err),
        (Err(err), _) => Err(err),
    };
    (result, reads)
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
