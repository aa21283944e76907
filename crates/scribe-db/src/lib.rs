pub mod articles;
pub mod categories;
pub mod comments;
pub mod deadline;
pub mod error;
pub mod filters;
pub mod followers;
pub mod migrations;
mod named;
pub mod reset_tokens;
mod rows;
pub mod tags;
pub mod users;

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::{info, warn};

pub use deadline::Deadline;
pub use error::{Classify, DbError, DbResult, ErrorKind, classify};

use articles::ArticleStore;
use categories::CategoryStore;
use comments::CommentStore;
use followers::FollowerStore;
use reset_tokens::ResetTokenStore;
use tags::TagStore;
use users::UserStore;

/// Shared connection handle. Injected into every store; stores never hold
/// the connection beyond a single call.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;
        let db = Self::bootstrap(conn)?;

        info!("Database opened at {}", path.display());
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::bootstrap(Connection::open_in_memory()?)
    }

    fn bootstrap(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run `f` against the connection, classifying any failure under
    /// `operation`. The deadline is enforced for the duration of `f`.
    pub fn with_conn<F, T>(&self, deadline: &Deadline, operation: &'static str, f: F) -> DbResult<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let conn = self.lock(deadline, operation)?;
        deadline.arm(&conn);
        let result = f(&conn);
        Deadline::disarm(&conn);
        result.classify(operation)
    }

    /// Scoped transaction: begins, hands the transaction to `f`, and commits
    /// only if `f` returns `Ok`. Any early return (an `Err` from `f`, a failed
    /// commit, a panic, an interrupted statement) drops the transaction,
    /// which rolls it back.
    pub fn with_tx<F, T>(&self, deadline: &Deadline, operation: &'static str, f: F) -> DbResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> DbResult<T>,
    {
        let mut conn = self.lock(deadline, operation)?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .classify(operation)?;

        deadline.arm(&tx);
        let outcome = f(&tx);
        Deadline::disarm(&tx);

        let value = outcome?;
        tx.commit().classify(operation)?;
        Ok(value)
    }

    fn lock(&self, deadline: &Deadline, operation: &'static str) -> DbResult<MutexGuard<'_, Connection>> {
        if deadline.is_expired() {
            return Err(DbError::new(
                ErrorKind::ConnectionFailed,
                operation,
                "deadline exceeded before the statement was issued",
            ));
        }
        let conn = match self.conn.lock() {
            Ok(conn) => conn,
            Err(poisoned) => {
                // A caller panicked while holding the connection. Drop
                // whatever it left open and carry on.
                warn!(operation, "connection lock poisoned, recovering");
                let conn = poisoned.into_inner();
                if !conn.is_autocommit() {
                    conn.execute_batch("ROLLBACK").classify(operation)?;
                }
                self.conn.clear_poison();
                conn
            }
        };
        if deadline.is_expired() {
            return Err(DbError::new(
                ErrorKind::ConnectionFailed,
                operation,
                "deadline exceeded while waiting for the connection",
            ));
        }
        Ok(conn)
    }
}

/// One store per entity, all sharing the same handle.
#[derive(Clone)]
pub struct Stores {
    pub articles: ArticleStore,
    pub users: UserStore,
    pub tags: TagStore,
    pub categories: CategoryStore,
    pub comments: CommentStore,
    pub followers: FollowerStore,
    pub reset_tokens: ResetTokenStore,
}

impl Stores {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            articles: ArticleStore::new(db.clone()),
            users: UserStore::new(db.clone()),
            tags: TagStore::new(db.clone()),
            categories: CategoryStore::new(db.clone()),
            comments: CommentStore::new(db.clone()),
            followers: FollowerStore::new(db.clone()),
            reset_tokens: ResetTokenStore::new(db),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn deadline() -> Deadline {
        Deadline::after(Duration::from_secs(5))
    }

    #[test]
    fn with_tx_rolls_back_on_error() {
        let db = Database::open_in_memory().unwrap();
        let result: DbResult<()> = db.with_tx(&deadline(), "tag_create", |tx| {
            tx.execute(
                "INSERT INTO tags (name, created_at, updated_at) VALUES ('go', '2024-01-01 00:00:00', '2024-01-01 00:00:00')",
                [],
            )
            .classify("tag_create")?;
            Err(DbError::new(ErrorKind::Uncategorized, "tag_create", "boom"))
        });
        assert!(result.is_err());

        let count: i64 = db
            .with_conn(&deadline(), "tag_count", |conn| {
                conn.query_row("SELECT count(*) FROM tags", [], |row| row.get(0))
            })
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn expired_deadline_never_reaches_the_connection() {
        let db = Database::open_in_memory().unwrap();
        let expired = Deadline::after(Duration::ZERO);
        let err = db
            .with_conn(&expired, "tag_getall", |conn| {
                conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectionFailed);
        assert_eq!(err.operation(), "tag_getall");
    }

    #[test]
    fn cancelled_transaction_leaves_no_open_transaction() {
        let db = Database::open_in_memory().unwrap();
        let deadline = deadline();
        let result: DbResult<i64> = db.with_tx(&deadline, "article_create", |tx| {
            deadline.cancel();
            tx.query_row(
                "WITH RECURSIVE n(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM n WHERE x < 10000000)
                 SELECT count(*) FROM n",
                [],
                |row| row.get(0),
            )
            .classify("article_create")
        });
        assert_eq!(result.unwrap_err().kind(), ErrorKind::ConnectionFailed);

        let conn = db.conn.lock().unwrap();
        assert!(conn.is_autocommit());
    }

    #[test]
    fn panicked_caller_does_not_disable_the_database() {
        let db = Arc::new(Database::open_in_memory().unwrap());

        let shared = db.clone();
        let joined = std::thread::spawn(move || {
            let _ = shared.with_conn(&deadline(), "tag_create", |conn| -> rusqlite::Result<()> {
                conn.execute_batch(
                    "BEGIN;
                     INSERT INTO tags (name, created_at, updated_at)
                     VALUES ('go', '2024-01-01 00:00:00', '2024-01-01 00:00:00');",
                )?;
                panic!("caller blew up mid-transaction");
            });
        })
        .join();
        assert!(joined.is_err());
        assert!(db.conn.is_poisoned());

        let count: i64 = db
            .with_conn(&deadline(), "tag_count", |conn| {
                conn.query_row("SELECT count(*) FROM tags", [], |row| row.get(0))
            })
            .unwrap();
        assert_eq!(count, 0);
        assert!(!db.conn.is_poisoned());

        db.with_tx(&deadline(), "tag_create", |tx| {
            tx.execute(
                "INSERT INTO tags (name, created_at, updated_at) VALUES ('rust', '2024-01-01 00:00:00', '2024-01-01 00:00:00')",
                [],
            )
            .classify("tag_create")
        })
        .unwrap();
    }
}
