//! Row mapping shared by the stores.

use chrono::{DateTime, Utc};
use rusqlite::Row;
use rusqlite::types::Type;
use scribe_types::models::{
    Article, ArticleStatus, Category, Comment, Follower, ModifiedData, ResetToken, Tag, User,
};
use uuid::Uuid;

pub(crate) fn uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let text: String = row.get(idx)?;
    Uuid::parse_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn status_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<ArticleStatus> {
    let text: String = row.get(idx)?;
    text.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn modified(id: impl ToString, timestamp: DateTime<Utc>) -> ModifiedData {
    ModifiedData {
        id: id.to_string(),
        timestamp,
    }
}

pub(crate) const ARTICLE_COLUMNS: &str =
    "id, author_id, title, content, status, category_id, created_at, updated_at, published_at";

/// Expects [`ARTICLE_COLUMNS`] order. Tags are filled in separately.
pub(crate) fn article(row: &Row<'_>) -> rusqlite::Result<Article> {
    Ok(Article {
        id: uuid_at(row, 0)?,
        author_id: uuid_at(row, 1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        status: status_at(row, 4)?,
        category_id: row.get(5)?,
        tags: Vec::new(),
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
        published_at: row.get(8)?,
    })
}

pub(crate) const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, bio, \
    profile_picture_url, activated, created_at, updated_at";

pub(crate) fn user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: uuid_at(row, 0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        bio: row.get(5)?,
        profile_picture_url: row.get(6)?,
        activated: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

/// `id, name, created_at, updated_at` of a categories or tags row.
pub(crate) struct NamedRow {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NamedRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            created_at: row.get(2)?,
            updated_at: row.get(3)?,
        })
    }
}

impl From<NamedRow> for Tag {
    fn from(row: NamedRow) -> Self {
        Tag {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<NamedRow> for Category {
    fn from(row: NamedRow) -> Self {
        Category {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub(crate) fn comment(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: uuid_at(row, 0)?,
        user_id: uuid_at(row, 1)?,
        article_id: uuid_at(row, 2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
    })
}

pub(crate) fn follower(row: &Row<'_>) -> rusqlite::Result<Follower> {
    Ok(Follower {
        follower_id: uuid_at(row, 0)?,
        followed_id: uuid_at(row, 1)?,
        created_at: row.get(2)?,
    })
}

pub(crate) fn reset_token(row: &Row<'_>) -> rusqlite::Result<ResetToken> {
    Ok(ResetToken {
        id: row.get(0)?,
        user_id: uuid_at(row, 1)?,
        reset_token: row.get(2)?,
        expiration: row.get(3)?,
        used: row.get(4)?,
    })
}
