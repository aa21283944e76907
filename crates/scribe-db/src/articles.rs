//! Article persistence, including the atomic article + tag-association writes
//! and article engagement (likes, saves).
//!
//! Create and update run inside [`Database::with_tx`]: the primary row write
//! and the tag replacement either both commit or both roll back. Tag
//! replacement always deletes every existing association before inserting
//! the supplied ids, using the id returned by the primary write.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, params, params_from_iter};
use scribe_types::envelope::Pagination;
use scribe_types::models::{
    Article, ArticleStatus, LikedArticle, ModifiedData, SavedArticle, Tag,
};
use tracing::debug;
use uuid::Uuid;

use crate::filters::{Filters, calculate_metadata};
use crate::rows::{self, ARTICLE_COLUMNS, NamedRow, modified, status_at, uuid_at};
use crate::{Classify, Database, DbError, DbResult, Deadline, ErrorKind};

/// Fields for a new article. The id and timestamps are assigned on insert.
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
    pub status: ArticleStatus,
    pub category_id: Option<i64>,
    /// Attached in caller order. Empty means no associations.
    pub tag_ids: Vec<i64>,
}

/// Partial update. `None` leaves the stored value untouched. `tag_ids`
/// replaces the whole set only when present and non-empty.
#[derive(Debug, Clone, Default)]
pub struct ArticlePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub status: Option<ArticleStatus>,
    pub category_id: Option<i64>,
    pub tag_ids: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Default)]
pub struct ArticleFilter {
    pub author_id: Option<Uuid>,
    pub status: Option<ArticleStatus>,
    pub category_id: Option<i64>,
}

#[derive(Clone)]
pub struct ArticleStore {
    db: Arc<Database>,
}

impl ArticleStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn create(&self, deadline: &Deadline, new: &NewArticle) -> DbResult<Article> {
        self.db.with_tx(deadline, "article_create", |tx| {
            let now = Utc::now();
            let published_at = (new.status == ArticleStatus::Published).then_some(now);

            let mut article = tx
                .query_row(
                    &format!(
                        "INSERT INTO articles
                            (author_id, title, content, status, category_id, created_at, updated_at, published_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, ?7)
                         RETURNING {ARTICLE_COLUMNS}"
                    ),
                    params![
                        new.author_id.to_string(),
                        new.title,
                        new.content,
                        new.status.as_str(),
                        new.category_id,
                        now,
                        published_at,
                    ],
                    rows::article,
                )
                .classify("article_create")?;

            let article_id = article.id.to_string();
            if !new.tag_ids.is_empty() {
                replace_tags(tx, &article_id, &new.tag_ids).classify("article_attachtags")?;
            }
            article.tags = load_tags(tx, &article_id).classify("article_create")?;

            debug!(article_id = %article.id, tags = article.tags.len(), "article created");
            Ok(article)
        })
    }

    pub fn get_by_id(&self, deadline: &Deadline, id: Uuid) -> DbResult<Article> {
        let id = id.to_string();
        self.db.with_conn(deadline, "article_getbyid", |conn| {
            let mut article = conn.query_row(
                &format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = ?1"),
                [&id],
                rows::article,
            )?;
            article.tags = load_tags(conn, &id)?;
            Ok(article)
        })
    }

    /// Applies `patch` to the article. Status changes are checked against
    /// [`ArticleStatus::can_transition_to`]; moving to `published` stamps
    /// `published_at` the first time.
    pub fn update(&self, deadline: &Deadline, id: Uuid, patch: &ArticlePatch) -> DbResult<ModifiedData> {
        let id = id.to_string();
        self.db.with_tx(deadline, "article_update", |tx| {
            let (current, published_at): (ArticleStatus, Option<DateTime<Utc>>) = tx
                .query_row(
                    "SELECT status, published_at FROM articles WHERE id = ?1",
                    [&id],
                    |row| Ok((status_at(row, 0)?, row.get(1)?)),
                )
                .classify("article_update")?;

            let target = patch.status.unwrap_or(current);
            if !current.can_transition_to(target) {
                return Err(DbError::new(
                    ErrorKind::CheckConstraint,
                    "article_update",
                    format!("illegal status transition {current} -> {target}"),
                ));
            }

            let now = Utc::now();
            let published_at = match (target, published_at) {
                (ArticleStatus::Published, None) => Some(now),
                (_, existing) => existing,
            };

            let updated_id: String = tx
                .query_row(
                    "UPDATE articles
                     SET title = COALESCE(?1, title),
                         content = COALESCE(?2, content),
                         status = ?3,
                         category_id = COALESCE(?4, category_id),
                         updated_at = ?5,
                         published_at = ?6
                     WHERE id = ?7
                     RETURNING id",
                    params![
                        patch.title,
                        patch.content,
                        target.as_str(),
                        patch.category_id,
                        now,
                        published_at,
                        id,
                    ],
                    |row| row.get(0),
                )
                .classify("article_update")?;

            if let Some(tag_ids) = patch.tag_ids.as_deref().filter(|ids| !ids.is_empty()) {
                replace_tags(tx, &updated_id, tag_ids).classify("article_attachtags")?;
            }

            Ok(modified(updated_id, now))
        })
    }

    /// Hard delete. Tag associations, comments, likes and saves go with it
    /// through `ON DELETE CASCADE`.
    pub fn delete(&self, deadline: &Deadline, id: Uuid) -> DbResult<ModifiedData> {
        let deleted: String = self.db.with_conn(deadline, "article_delete", |conn| {
            conn.query_row(
                "DELETE FROM articles WHERE id = ?1 RETURNING id",
                [id.to_string()],
                |row| row.get(0),
            )
        })?;
        Ok(modified(deleted, Utc::now()))
    }

    /// Newest first, with tags loaded for the whole page in one query.
    pub fn list(
        &self,
        deadline: &Deadline,
        filters: &Filters,
        filter: &ArticleFilter,
    ) -> DbResult<(Vec<Article>, Pagination)> {
        let mut clauses = Vec::new();
        let mut bind: Vec<Value> = Vec::new();
        if let Some(author_id) = filter.author_id {
            bind.push(Value::Text(author_id.to_string()));
            clauses.push(format!("author_id = ?{}", bind.len()));
        }
        if let Some(status) = filter.status {
            bind.push(Value::Text(status.as_str().to_string()));
            clauses.push(format!("status = ?{}", bind.len()));
        }
        if let Some(category_id) = filter.category_id {
            bind.push(Value::Integer(category_id));
            clauses.push(format!("category_id = ?{}", bind.len()));
        }
        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };

        self.db.with_conn(deadline, "article_list", |conn| {
            let total: i64 = conn.query_row(
                &format!("SELECT count(*) FROM articles{where_sql}"),
                params_from_iter(bind.iter()),
                |row| row.get(0),
            )?;

            let mut page_bind = bind.clone();
            page_bind.push(Value::Integer(filters.limit()));
            page_bind.push(Value::Integer(filters.offset()));
            let sql = format!(
                "SELECT {ARTICLE_COLUMNS} FROM articles{where_sql}
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?{} OFFSET ?{}",
                bind.len() + 1,
                bind.len() + 2
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut articles = stmt
                .query_map(params_from_iter(page_bind.iter()), rows::article)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let ids: Vec<String> = articles.iter().map(|a| a.id.to_string()).collect();
            let mut tags = load_tags_for(conn, &ids)?;
            for article in &mut articles {
                article.tags = tags.remove(&article.id.to_string()).unwrap_or_default();
            }

            let meta = calculate_metadata(total.max(0) as u64, filters.page, filters.page_size);
            Ok((articles, meta))
        })
    }

    // -- Engagement --

    pub fn like(&self, deadline: &Deadline, user_id: Uuid, article_id: Uuid) -> DbResult<LikedArticle> {
        self.db.with_conn(deadline, "article_like", |conn| {
            conn.query_row(
                "INSERT INTO liked_articles (user_id, article_id, liked_at) VALUES (?1, ?2, ?3)
                 RETURNING user_id, article_id, liked_at",
                params![user_id.to_string(), article_id.to_string(), Utc::now()],
                |row| {
                    Ok(LikedArticle {
                        user_id: uuid_at(row, 0)?,
                        article_id: uuid_at(row, 1)?,
                        liked_at: row.get(2)?,
                    })
                },
            )
        })
    }

    pub fn unlike(&self, deadline: &Deadline, user_id: Uuid, article_id: Uuid) -> DbResult<ModifiedData> {
        let removed: String = self.db.with_conn(deadline, "article_unlike", |conn| {
            conn.query_row(
                "DELETE FROM liked_articles WHERE user_id = ?1 AND article_id = ?2 RETURNING article_id",
                [user_id.to_string(), article_id.to_string()],
                |row| row.get(0),
            )
        })?;
        Ok(modified(removed, Utc::now()))
    }

    pub fn list_likes(&self, deadline: &Deadline, article_id: Uuid) -> DbResult<Vec<LikedArticle>> {
        self.db.with_conn(deadline, "article_listlikes", |conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, article_id, liked_at FROM liked_articles
                 WHERE article_id = ?1
                 ORDER BY liked_at DESC",
            )?;
            let likes = stmt
                .query_map([article_id.to_string()], |row| {
                    Ok(LikedArticle {
                        user_id: uuid_at(row, 0)?,
                        article_id: uuid_at(row, 1)?,
                        liked_at: row.get(2)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(likes)
        })
    }

    pub fn save(&self, deadline: &Deadline, user_id: Uuid, article_id: Uuid) -> DbResult<SavedArticle> {
        self.db.with_conn(deadline, "article_save", |conn| {
            conn.query_row(
                "INSERT INTO saved_articles (user_id, article_id, saved_at) VALUES (?1, ?2, ?3)
                 RETURNING user_id, article_id, saved_at",
                params![user_id.to_string(), article_id.to_string(), Utc::now()],
                saved_article,
            )
        })
    }

    pub fn unsave(&self, deadline: &Deadline, user_id: Uuid, article_id: Uuid) -> DbResult<ModifiedData> {
        let removed: String = self.db.with_conn(deadline, "article_unsave", |conn| {
            conn.query_row(
                "DELETE FROM saved_articles WHERE user_id = ?1 AND article_id = ?2 RETURNING article_id",
                [user_id.to_string(), article_id.to_string()],
                |row| row.get(0),
            )
        })?;
        Ok(modified(removed, Utc::now()))
    }

    pub fn list_saved(&self, deadline: &Deadline, user_id: Uuid) -> DbResult<Vec<SavedArticle>> {
        self.db.with_conn(deadline, "article_listsaved", |conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, article_id, saved_at FROM saved_articles
                 WHERE user_id = ?1
                 ORDER BY saved_at DESC",
            )?;
            let saved = stmt
                .query_map([user_id.to_string()], saved_article)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(saved)
        })
    }
}

fn saved_article(row: &rusqlite::Row<'_>) -> rusqlite::Result<SavedArticle> {
    Ok(SavedArticle {
        user_id: uuid_at(row, 0)?,
        article_id: uuid_at(row, 1)?,
        saved_at: row.get(2)?,
    })
}

/// Delete-then-insert. Never diffs against the current set. Repeated ids
/// are attached once.
fn replace_tags(conn: &Connection, article_id: &str, tag_ids: &[i64]) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM article_tags WHERE article_id = ?1", [article_id])?;

    let mut insert =
        conn.prepare_cached("INSERT INTO article_tags (article_id, tag_id) VALUES (?1, ?2)")?;
    let mut seen = HashSet::new();
    for tag_id in tag_ids.iter().filter(|id| seen.insert(**id)) {
        insert.execute(params![article_id, tag_id])?;
    }
    Ok(())
}

fn load_tags(conn: &Connection, article_id: &str) -> rusqlite::Result<Vec<Tag>> {
    let mut stmt = conn.prepare_cached(
        "SELECT t.id, t.name, t.created_at, t.updated_at
         FROM article_tags at
         INNER JOIN tags t ON t.id = at.tag_id
         WHERE at.article_id = ?1",
    )?;
    let tags = stmt
        .query_map([article_id], NamedRow::from_row)?
        .map(|row| row.map(Tag::from))
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(tags)
}

/// Batch-fetch tags for a set of article ids, grouped by article id.
fn load_tags_for(conn: &Connection, article_ids: &[String]) -> rusqlite::Result<HashMap<String, Vec<Tag>>> {
    let mut grouped: HashMap<String, Vec<Tag>> = HashMap::new();
    if article_ids.is_empty() {
        return Ok(grouped);
    }

    let placeholders: Vec<String> = (1..=article_ids.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "SELECT at.article_id, t.id, t.name, t.created_at, t.updated_at
         FROM article_tags at
         INNER JOIN tags t ON t.id = at.tag_id
         WHERE at.article_id IN ({})",
        placeholders.join(", ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(article_ids.iter()))?;
    while let Some(row) = rows.next()? {
        let article_id: String = row.get(0)?;
        let tag = Tag {
            id: row.get(1)?,
            name: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        };
        grouped.entry(article_id).or_default().push(tag);
    }
    Ok(grouped)
}
