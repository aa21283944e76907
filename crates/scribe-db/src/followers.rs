use std::sync::Arc;

use chrono::Utc;
use rusqlite::params;
use scribe_types::models::{Follower, ModifiedData};
use uuid::Uuid;

use crate::rows::{self, modified};
use crate::{Database, DbResult, Deadline};

#[derive(Clone)]
pub struct FollowerStore {
    db: Arc<Database>,
}

impl FollowerStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Following twice is `DuplicateKey`; following yourself is
    /// `CheckConstraint`.
    pub fn follow(&self, deadline: &Deadline, follower_id: Uuid, followed_id: Uuid) -> DbResult<Follower> {
        self.db.with_conn(deadline, "follower_follow", |conn| {
            conn.query_row(
                "INSERT INTO followers (follower_id, followed_id, created_at) VALUES (?1, ?2, ?3)
                 RETURNING follower_id, followed_id, created_at",
                params![follower_id.to_string(), followed_id.to_string(), Utc::now()],
                rows::follower,
            )
        })
    }

    pub fn unfollow(&self, deadline: &Deadline, follower_id: Uuid, followed_id: Uuid) -> DbResult<ModifiedData> {
        let id: String = self.db.with_conn(deadline, "follower_unfollow", |conn| {
            conn.query_row(
                "DELETE FROM followers WHERE follower_id = ?1 AND followed_id = ?2 RETURNING followed_id",
                [follower_id.to_string(), followed_id.to_string()],
                |row| row.get(0),
            )
        })?;
        Ok(modified(id, Utc::now()))
    }

    /// Who follows `user_id`.
    pub fn list_followers(&self, deadline: &Deadline, user_id: Uuid) -> DbResult<Vec<Follower>> {
        self.list("follower_listfollowers", "followed_id", deadline, user_id)
    }

    /// Whom `user_id` follows.
    pub fn list_followed(&self, deadline: &Deadline, user_id: Uuid) -> DbResult<Vec<Follower>> {
        self.list("follower_listfollowed", "follower_id", deadline, user_id)
    }

    fn list(
        &self,
        operation: &'static str,
        column: &str,
        deadline: &Deadline,
        user_id: Uuid,
    ) -> DbResult<Vec<Follower>> {
        let sql = format!(
            "SELECT follower_id, followed_id, created_at FROM followers
             WHERE {column} = ?1
             ORDER BY created_at DESC"
        );
        self.db.with_conn(deadline, operation, |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id.to_string()], rows::follower)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }
}
