use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rusqlite::Connection;
use tracing::warn;

/// Upper bound for any single request's database work.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(30);

/// How many SQLite VM instructions run between deadline checks.
const CHECK_EVERY_OPS: i32 = 1_000;

/// Per-request bound on database work: an expiry instant plus a cancel flag
/// shared by every clone.
///
/// Stores check it before touching the connection, and while statements run
/// a progress handler interrupts execution once it has expired or been
/// cancelled. Interrupted statements surface as `ConnectionFailed`.
#[derive(Debug, Clone)]
pub struct Deadline {
    expires_at: Instant,
    cancelled: Arc<AtomicBool>,
}

impl Deadline {
    /// Timeouts above [`MAX_TIMEOUT`] are clamped.
    pub fn after(timeout: Duration) -> Self {
        let timeout = if timeout > MAX_TIMEOUT {
            warn!(
                requested_ms = timeout.as_millis() as u64,
                "request timeout above ceiling, clamping to {}s",
                MAX_TIMEOUT.as_secs()
            );
            MAX_TIMEOUT
        } else {
            timeout
        };
        Self {
            expires_at: Instant::now() + timeout,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn is_expired(&self) -> bool {
        self.is_cancelled() || Instant::now() >= self.expires_at
    }

    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    /// Cancels the deadline when the returned guard is dropped. Held by the
    /// async side of a request so that a dropped request future stops the
    /// blocking database work it spawned.
    pub fn cancel_on_drop(&self) -> CancelOnDrop {
        CancelOnDrop(self.clone())
    }

    pub(crate) fn arm(&self, conn: &Connection) {
        let expires_at = self.expires_at;
        let cancelled = Arc::clone(&self.cancelled);
        conn.progress_handler(
            CHECK_EVERY_OPS,
            Some(move || cancelled.load(Ordering::Relaxed) || Instant::now() >= expires_at),
        );
    }

    pub(crate) fn disarm(conn: &Connection) {
        conn.progress_handler(0, None::<fn() -> bool>);
    }
}

pub struct CancelOnDrop(Deadline);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_to_ceiling() {
        let deadline = Deadline::after(Duration::from_secs(300));
        assert!(deadline.remaining() <= MAX_TIMEOUT);
    }

    #[test]
    fn zero_timeout_is_already_expired() {
        assert!(Deadline::after(Duration::ZERO).is_expired());
    }

    #[test]
    fn cancel_is_shared_between_clones() {
        let deadline = Deadline::after(Duration::from_secs(5));
        let clone = deadline.clone();
        assert!(!clone.is_expired());
        deadline.cancel();
        assert!(clone.is_cancelled());
        assert!(clone.is_expired());
    }

    #[test]
    fn guard_cancels_on_drop() {
        let deadline = Deadline::after(Duration::from_secs(5));
        {
            let _guard = deadline.cancel_on_drop();
        }
        assert!(deadline.is_cancelled());
    }

    #[test]
    fn armed_connection_interrupts_long_statement() {
        let conn = Connection::open_in_memory().unwrap();
        let deadline = Deadline::after(Duration::from_secs(5));
        deadline.cancel();
        deadline.arm(&conn);
        let result: rusqlite::Result<i64> = conn.query_row(
            "WITH RECURSIVE n(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM n WHERE x < 10000000)
             SELECT count(*) FROM n",
            [],
            |row| row.get(0),
        );
        Deadline::disarm(&conn);
        let err = result.unwrap_err();
        assert_eq!(err.sqlite_error_code(), Some(rusqlite::ErrorCode::OperationInterrupted));

        let ok: i64 = conn.query_row("SELECT 1", [], |row| row.get(0)).unwrap();
        assert_eq!(ok, 1);
    }
}
