//! Request-scoped database runtime accounting.
//!
//! Each request gets its own [`DbRuntime`]. The middleware polls the
//! downstream future inside a task-local scope holding it, so query timings
//! reported from anywhere inside that future land on the right request and
//! never on a concurrent one.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::parameters::round2;

pub mod subscriber;

pub use subscriber::DbRuntimeLayer;

tokio::task_local! {
    static CURRENT: DbRuntime;
}

/// Accumulated database time of one request.
#[derive(Debug, Clone, Default)]
pub struct DbRuntime {
    nanos: Arc<AtomicU64>,
}

impl DbRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&self) {
        self.nanos.store(0, Ordering::Relaxed);
    }

    pub fn append(&self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.nanos.fetch_add(nanos, Ordering::Relaxed);
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::Relaxed))
    }

    /// Accumulated time in milliseconds, rounded to two decimals.
    pub fn read_ms(&self) -> f64 {
        round2(self.elapsed().as_secs_f64() * 1000.0)
    }

    /// Run `future` with this accumulator as the current request's.
    pub async fn scope<F: Future>(&self, future: F) -> F::Output {
        CURRENT.scope(self.clone(), future).await
    }

    /// Run `f` with this accumulator as the current request's.
    pub fn enter<R>(&self, f: impl FnOnce() -> R) -> R {
        CURRENT.sync_scope(self.clone(), f)
    }
}

/// The accumulator of the request being polled, if any.
pub fn current() -> Option<DbRuntime> {
    CURRENT.try_with(DbRuntime::clone).ok()
}

/// Add `elapsed` to the current request's database time. Outside a request
/// scope this does nothing.
pub fn append_db_runtime(elapsed: Duration) {
    let _ = CURRENT.try_with(|runtime| runtime.append(elapsed));
}

/// Time `query` and count it as database time of the current request.
pub async fn measure<F: Future>(query: F) -> F::Output {
    let start = Instant::now();
    let output = query.await;
    append_db_runtime(start.elapsed());
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_read() {
        let runtime = DbRuntime::new();
        runtime.append(Duration::from_micros(1_500));
        runtime.append(Duration::from_micros(2_254));
        assert_eq!(runtime.read_ms(), 3.75);

        runtime.reset();
        assert_eq!(runtime.read_ms(), 0.0);
    }

    #[tokio::test]
    async fn test_append_outside_scope_is_ignored() {
        append_db_runtime(Duration::from_millis(5));
        assert!(current().is_none());
    }

    #[tokio::test]
    async fn test_scoped_append_reaches_only_its_runtime() {
        let first = DbRuntime::new();
        let second = DbRuntime::new();

        first
            .scope(async { append_db_runtime(Duration::from_millis(3)) })
            .await;
        second
            .scope(async { append_db_runtime(Duration::from_millis(7)) })
            .await;

        assert_eq!(first.read_ms(), 3.0);
        assert_eq!(second.read_ms(), 7.0);
    }

    #[test]
    fn test_enter_scopes_synchronous_work() {
        let runtime = DbRuntime::new();
        runtime.enter(|| append_db_runtime(Duration::from_millis(4)));
        assert_eq!(runtime.read_ms(), 4.0);
        assert!(current().is_none());
    }

    #[tokio::test]
    async fn test_measure_counts_elapsed_time() {
        let runtime = DbRuntime::new();
        let rows = runtime
            .scope(measure(async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                42
            }))
            .await;

        assert_eq!(rows, 42);
        assert!(runtime.read_ms() >= 10.0);
    }
}
