//! Async façade over [`vellum_core::Database`].
//!
//! The synchronous core is strictly CPU-bound and runs to completion on
//! the caller's thread. This crate dispatches each call onto a Tokio
//! blocking-pool worker via [`tokio::task::spawn_blocking`] so the
//! calling task can keep making progress on the async runtime, and
//! offers a cancellable row stream for `SELECT` built from a bounded
//! [`tokio::sync::mpsc`] channel.
//!
//! Only one worker touches the wrapped `Database` at a time; concurrent
//! calls on the same [`AsyncDatabase`] serialize through an internal
//! [`tokio::sync::Mutex`].

pub mod error;

pub use error::{Error, Result};

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio_util::sync::CancellationToken;

use vellum_core::{Database, Value};

/// Row buffer depth for [`AsyncDatabase::query_stream`]; bounds how far
/// the blocking producer can run ahead of a slow consumer.
const ROW_STREAM_BUFFER: usize = 64;

/// A [`Database`] wrapped for use from async code.
#[derive(Clone)]
pub struct AsyncDatabase {
    inner: Arc<AsyncMutex<Database>>,
}

impl Default for AsyncDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl AsyncDatabase {
    /// Wraps a freshly created, empty [`Database`].
    #[must_use]
    pub fn new() -> Self {
        Self::from_database(Database::new())
    }

    /// Wraps an existing [`Database`] (e.g. one restored from a snapshot).
    #[must_use]
    pub fn from_database(db: Database) -> Self {
        Self {
            inner: Arc::new(AsyncMutex::new(db)),
        }
    }

    /// Runs a DDL or DML statement on the blocking pool, returning the
    /// number of rows affected (0 for DDL).
    pub async fn execute_non_query(&self, sql: impl Into<String>) -> Result<u64> {
        let inner = Arc::clone(&self.inner);
        let sql = sql.into();
        tokio::task::spawn_blocking(move || {
            let mut db = inner.blocking_lock();
            db.execute_non_query(&sql).map_err(Error::from)
        })
        .await?
    }

    /// Runs a `SELECT` on the blocking pool, returning headers and rows
    /// as a single materialized batch. Use [`Self::query_stream`] for
    /// incremental, cancellable consumption.
    pub async fn execute_reader(&self, sql: impl Into<String>) -> Result<(Vec<String>, Vec<Vec<Value>>)> {
        let inner = Arc::clone(&self.inner);
        let sql = sql.into();
        tokio::task::spawn_blocking(move || {
            let db = inner.blocking_lock();
            db.execute_reader(&sql).map_err(Error::from)
        })
        .await?
    }

    /// Runs `sql` on the blocking pool: for `SELECT`, the first column
    /// of the first row (or `Null`); for DML, the affected count.
    pub async fn execute_scalar(&self, sql: impl Into<String>) -> Result<Value> {
        let inner = Arc::clone(&self.inner);
        let sql = sql.into();
        tokio::task::spawn_blocking(move || {
            let mut db = inner.blocking_lock();
            db.execute_scalar(&sql).map_err(Error::from)
        })
        .await?
    }

    /// Streams the rows of a `SELECT`, cancellable with the returned
    /// stream's own [`CancellationToken`]. Equivalent to
    /// [`Self::query_stream_with_token`] with a fresh token.
    #[must_use]
    pub fn query_stream(&self, sql: impl Into<String>) -> RowStream {
        self.query_stream_with_token(sql, CancellationToken::new())
    }

    /// Like [`Self::query_stream`], but lets the caller supply the
    /// [`CancellationToken`] up front — for example, one also tied to a
    /// `tokio::time::timeout`.
    #[must_use]
    pub fn query_stream_with_token(&self, sql: impl Into<String>, token: CancellationToken) -> RowStream {
        let inner = Arc::clone(&self.inner);
        let sql = sql.into();
        let (tx, rx) = mpsc::channel(ROW_STREAM_BUFFER);
        let worker_token = token.clone();

        tokio::task::spawn_blocking(move || {
            let db = inner.blocking_lock();
            let cancel_check = || worker_token.is_cancelled();
            let result = db.execute_reader_cancellable(&sql, Some(&cancel_check));
            match result {
                Ok((_, rows)) => {
                    for row in rows {
                        if worker_token.is_cancelled() {
                            let _ = tx.blocking_send(Err(Error::from(vellum_core::Error::Cancelled)));
                            return;
                        }
                        if tx.blocking_send(Ok(row)).is_err() {
                            return;
                        }
                    }
                }
                Err(err) => {
                    let _ = tx.blocking_send(Err(Error::from(err)));
                }
            }
        });

        RowStream {
            receiver: rx,
            cancel: token,
        }
    }
}

/// A cancellable, asynchronous sequence of already-computed `SELECT`
/// rows, fed from a [`tokio::task::spawn_blocking`] worker through a
/// bounded channel.
///
/// Cancelling does not interrupt an add-in call already running inside
/// a row; the producer only observes cancellation between rows. A
/// caller that needs a hard deadline should race the stream against
/// `tokio::time::timeout` instead of relying on `cancel` alone.
pub struct RowStream {
    receiver: mpsc::Receiver<Result<Vec<Value>>>,
    cancel: CancellationToken,
}

impl RowStream {
    /// Requests cancellation; the producer observes it before its next
    /// row and reports [`vellum_core::Error::Cancelled`] on the stream.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns a clone of this stream's cancellation token.
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl Stream for RowStream {
    type Item = Result<Vec<Value>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::poll_fn;

    async fn seeded_db() -> AsyncDatabase {
        let db = AsyncDatabase::new();
        db.execute_non_query("CREATE TABLE items (id INT, name TEXT)")
            .await
            .unwrap();
        db.execute_non_query("INSERT INTO items (id, name) VALUES (1, 'a')")
            .await
            .unwrap();
        db.execute_non_query("INSERT INTO items (id, name) VALUES (2, 'b')")
            .await
            .unwrap();
        db
    }

    #[tokio::test]
    async fn execute_reader_round_trips_through_blocking_worker() {
        let db = seeded_db().await;
        let (headers, rows) = db.execute_reader("SELECT id, name FROM items ORDER BY id").await.unwrap();
        assert_eq!(headers, vec!["id".to_string(), "name".to_string()]);
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn execute_scalar_returns_affected_count_for_dml() {
        let db = seeded_db().await;
        let affected = db
            .execute_scalar("UPDATE items SET name = 'z' WHERE id = 1")
            .await
            .unwrap();
        assert!(matches!(affected, Value::Int(1)));
    }

    #[tokio::test]
    async fn query_stream_yields_every_row_when_not_cancelled() {
        let db = seeded_db().await;
        let mut stream = db.query_stream("SELECT id FROM items ORDER BY id");
        let mut collected = Vec::new();
        while let Some(item) = poll_fn(|cx| Pin::new(&mut stream).poll_next(cx)).await {
            collected.push(item.unwrap());
        }
        assert_eq!(collected.len(), 2);
    }

    #[tokio::test]
    async fn query_stream_reports_cancelled_when_token_preset() {
        let db = seeded_db().await;
        let token = CancellationToken::new();
        token.cancel();
        let mut stream = db.query_stream_with_token("SELECT id FROM items", token);
        let first = poll_fn(|cx| Pin::new(&mut stream).poll_next(cx)).await;
        assert!(matches!(first, Some(Err(Error::Core(vellum_core::Error::Cancelled)))));
    }
}
