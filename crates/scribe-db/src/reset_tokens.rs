//! Password-reset tokens. A user has at most one row; issuing a new token
//! overwrites the previous one in place.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use scribe_types::models::{ModifiedData, ResetToken};
use tracing::debug;
use uuid::Uuid;

use crate::rows::{self, modified};
use crate::{Classify, Database, DbResult, Deadline};

const TOKEN_COLUMNS: &str = "id, user_id, reset_token, expiration, used";

#[derive(Clone)]
pub struct ResetTokenStore {
    db: Arc<Database>,
}

impl ResetTokenStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn create(
        &self,
        deadline: &Deadline,
        user_id: Uuid,
        token: &str,
        expiration: DateTime<Utc>,
    ) -> DbResult<ResetToken> {
        self.db.with_conn(deadline, "resettoken_create", |conn| {
            insert(conn, user_id, token, expiration)
        })
    }

    pub fn get_by_user_id(&self, deadline: &Deadline, user_id: Uuid) -> DbResult<ResetToken> {
        self.db.with_conn(deadline, "resettoken_getbyuserid", |conn| {
            conn.query_row(
                &format!("SELECT {TOKEN_COLUMNS} FROM reset_tokens WHERE user_id = ?1"),
                [user_id.to_string()],
                rows::reset_token,
            )
        })
    }

    pub fn get_by_token(&self, deadline: &Deadline, token: &str) -> DbResult<ResetToken> {
        self.db.with_conn(deadline, "resettoken_getbytoken", |conn| {
            conn.query_row(
                &format!("SELECT {TOKEN_COLUMNS} FROM reset_tokens WHERE reset_token = ?1"),
                [token],
                rows::reset_token,
            )
        })
    }

    /// Replaces the user's token and expiration and clears `used`.
    pub fn update(
        &self,
        deadline: &Deadline,
        user_id: Uuid,
        token: &str,
        expiration: DateTime<Utc>,
    ) -> DbResult<ResetToken> {
        self.db.with_conn(deadline, "resettoken_update", |conn| {
            overwrite(conn, user_id, token, expiration)
        })
    }

    pub fn delete_by_user_id(&self, deadline: &Deadline, user_id: Uuid) -> DbResult<ModifiedData> {
        let id: i64 = self.db.with_conn(deadline, "resettoken_deletebyuserid", |conn| {
            conn.query_row(
                "DELETE FROM reset_tokens WHERE user_id = ?1 RETURNING id",
                [user_id.to_string()],
                |row| row.get(0),
            )
        })?;
        Ok(modified(id, Utc::now()))
    }

    pub fn delete_by_token(&self, deadline: &Deadline, token: &str) -> DbResult<ModifiedData> {
        let id: i64 = self.db.with_conn(deadline, "resettoken_deletebytoken", |conn| {
            conn.query_row(
                "DELETE FROM reset_tokens WHERE reset_token = ?1 RETURNING id",
                [token],
                |row| row.get(0),
            )
        })?;
        Ok(modified(id, Utc::now()))
    }

    /// Update-or-create in one transaction, so concurrent requests for the
    /// same user never leave two rows or a half-written token.
    pub fn issue(
        &self,
        deadline: &Deadline,
        user_id: Uuid,
        token: &str,
        expiration: DateTime<Utc>,
    ) -> DbResult<ResetToken> {
        self.db.with_tx(deadline, "resettoken_issue", |tx| {
            let existing = overwrite(tx, user_id, token, expiration)
                .optional()
                .classify("resettoken_issue")?;
            let issued = match existing {
                Some(issued) => issued,
                None => insert(tx, user_id, token, expiration).classify("resettoken_issue")?,
            };
            debug!(user_id = %user_id, "reset token issued");
            Ok(issued)
        })
    }

    /// Deletes the token and stores the new password hash in one
    /// transaction. A token that is unknown or flagged used is
    /// `RecordNotFound` and nothing is written.
    pub fn redeem(
        &self,
        deadline: &Deadline,
        token: &str,
        password_hash: &str,
    ) -> DbResult<ModifiedData> {
        self.db.with_tx(deadline, "resettoken_redeem", |tx| {
            let user_id: String = tx
                .query_row(
                    "DELETE FROM reset_tokens
                     WHERE reset_token = ?1 AND used = 0
                     RETURNING user_id",
                    [token],
                    |row| row.get(0),
                )
                .classify("resettoken_redeem")?;

            let now = Utc::now();
            tx.execute(
                "UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE id = ?3",
                params![password_hash, now, user_id],
            )
            .classify("resettoken_redeem")?;

            debug!(user_id = %user_id, "reset token redeemed");
            Ok(modified(user_id, now))
        })
    }
}

fn insert(
    conn: &Connection,
    user_id: Uuid,
    token: &str,
    expiration: DateTime<Utc>,
) -> rusqlite::Result<ResetToken> {
    conn.query_row(
        &format!(
            "INSERT INTO reset_tokens (user_id, reset_token, expiration, used)
             VALUES (?1, ?2, ?3, 0)
             RETURNING {TOKEN_COLUMNS}"
        ),
        params![user_id.to_string(), token, expiration],
        rows::reset_token,
    )
}

fn overwrite(
    conn: &Connection,
    user_id: Uuid,
    token: &str,
    expiration: DateTime<Utc>,
) -> rusqlite::Result<ResetToken> {
    conn.query_row(
        &format!(
            "UPDATE reset_tokens SET reset_token = ?1, expiration = ?2, used = 0
             WHERE user_id = ?3
             RETURNING {TOKEN_COLUMNS}"
        ),
        params![token, expiration, user_id.to_string()],
        rows::reset_token,
    )
}
