use std::sync::Arc;

use chrono::Utc;
use rusqlite::params;
use scribe_types::models::{Comment, ModifiedData};
use uuid::Uuid;

use crate::rows::{self, modified};
use crate::{Database, DbResult, Deadline};

const COMMENT_COLUMNS: &str = "id, user_id, article_id, content, created_at";

#[derive(Clone)]
pub struct CommentStore {
    db: Arc<Database>,
}

impl CommentStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn create(
        &self,
        deadline: &Deadline,
        user_id: Uuid,
        article_id: Uuid,
        content: &str,
    ) -> DbResult<Comment> {
        self.db.with_conn(deadline, "comment_create", |conn| {
            conn.query_row(
                &format!(
                    "INSERT INTO comments (user_id, article_id, content, created_at)
                     VALUES (?1, ?2, ?3, ?4)
                     RETURNING {COMMENT_COLUMNS}"
                ),
                params![user_id.to_string(), article_id.to_string(), content, Utc::now()],
                rows::comment,
            )
        })
    }

    pub fn get_by_id(&self, deadline: &Deadline, id: Uuid) -> DbResult<Comment> {
        self.db.with_conn(deadline, "comment_getbyid", |conn| {
            conn.query_row(
                &format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?1"),
                [id.to_string()],
                rows::comment,
            )
        })
    }

    pub fn delete(&self, deadline: &Deadline, id: Uuid) -> DbResult<ModifiedData> {
        let id: String = self.db.with_conn(deadline, "comment_delete", |conn| {
            conn.query_row(
                "DELETE FROM comments WHERE id = ?1 RETURNING id",
                [id.to_string()],
                |row| row.get(0),
            )
        })?;
        Ok(modified(id, Utc::now()))
    }

    /// Oldest first, so threads read top to bottom.
    pub fn list_for_article(&self, deadline: &Deadline, article_id: Uuid) -> DbResult<Vec<Comment>> {
        self.db.with_conn(deadline, "comment_listforarticle", |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COMMENT_COLUMNS} FROM comments
                 WHERE article_id = ?1
                 ORDER BY created_at ASC, rowid ASC"
            ))?;
            let comments = stmt
                .query_map([article_id.to_string()], rows::comment)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(comments)
        })
    }
}
