use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

/// Produces a random RFC 4122 version-4 UUID in canonical text form.
const UUID_V4_SQL: &str = "(lower(hex(randomblob(4))) || '-' || lower(hex(randomblob(2))) || '-4' || \
    substr(lower(hex(randomblob(2))), 2) || '-' || substr('89ab', 1 + (abs(random()) % 4), 1) || \
    substr(lower(hex(randomblob(2))), 2) || '-' || lower(hex(randomblob(6))))";

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(&v1_schema())?;
    }

    info!("Database migrations complete");
    Ok(())
}

fn v1_schema() -> String {
    format!(
        "
        BEGIN;

        CREATE TABLE users (
            id                  TEXT PRIMARY KEY DEFAULT {uuid},
            email               TEXT NOT NULL UNIQUE,
            password_hash       TEXT NOT NULL,
            first_name          TEXT NOT NULL,
            last_name           TEXT NOT NULL,
            bio                 TEXT NOT NULL,
            profile_picture_url TEXT NOT NULL,
            activated           INTEGER NOT NULL DEFAULT 0 CHECK (activated IN (0, 1)),
            created_at          TEXT NOT NULL,
            updated_at          TEXT NOT NULL
        );

        CREATE TABLE categories (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            name        TEXT NOT NULL UNIQUE,
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        );

        CREATE TABLE tags (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            name        TEXT NOT NULL UNIQUE,
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        );

        CREATE TABLE articles (
            id           TEXT PRIMARY KEY DEFAULT {uuid},
            author_id    TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            title        TEXT NOT NULL DEFAULT '',
            content      TEXT NOT NULL DEFAULT '',
            status       TEXT NOT NULL DEFAULT 'draft'
                         CHECK (status IN ('draft', 'published', 'archived')),
            category_id  INTEGER REFERENCES categories(id) ON DELETE SET NULL,
            created_at   TEXT NOT NULL,
            updated_at   TEXT NOT NULL,
            published_at TEXT,
            CHECK (status <> 'published' OR (length(trim(title)) > 0 AND length(trim(content)) > 0))
        );

        CREATE INDEX idx_articles_author ON articles(author_id, created_at);

        CREATE TABLE article_tags (
            article_id  TEXT NOT NULL REFERENCES articles(id) ON DELETE CASCADE,
            tag_id      INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
            PRIMARY KEY (article_id, tag_id)
        );

        CREATE INDEX idx_article_tags_tag ON article_tags(tag_id);

        CREATE TABLE comments (
            id          TEXT PRIMARY KEY DEFAULT {uuid},
            user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            article_id  TEXT NOT NULL REFERENCES articles(id) ON DELETE CASCADE,
            content     TEXT NOT NULL CHECK (length(trim(content)) > 0),
            created_at  TEXT NOT NULL
        );

        CREATE INDEX idx_comments_article ON comments(article_id, created_at);

        CREATE TABLE liked_articles (
            user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            article_id  TEXT NOT NULL REFERENCES articles(id) ON DELETE CASCADE,
            liked_at    TEXT NOT NULL,
            PRIMARY KEY (user_id, article_id)
        );

        CREATE TABLE saved_articles (
            user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            article_id  TEXT NOT NULL REFERENCES articles(id) ON DELETE CASCADE,
            saved_at    TEXT NOT NULL,
            PRIMARY KEY (user_id, article_id)
        );

        CREATE TABLE followers (
            follower_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            followed_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at  TEXT NOT NULL,
            PRIMARY KEY (follower_id, followed_id),
            CHECK (follower_id <> followed_id)
        );

        -- One live token per user.
        CREATE TABLE reset_tokens (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id     TEXT NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
            reset_token TEXT NOT NULL UNIQUE,
            expiration  TEXT NOT NULL,
            used        INTEGER NOT NULL DEFAULT 0 CHECK (used IN (0, 1))
        );

        INSERT INTO schema_version (version) VALUES (1);

        COMMIT;
        ",
        uuid = UUID_V4_SQL
    )
}
