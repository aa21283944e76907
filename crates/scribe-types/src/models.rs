use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- Articles --

/// Lifecycle of an article. Stored as lowercase text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    Draft,
    Published,
    Archived,
}

impl ArticleStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Archived => "archived",
        }
    }

    /// Legal moves are staying put, `draft -> published` and
    /// `published -> archived`. Archived articles are terminal.
    pub fn can_transition_to(self, target: ArticleStatus) -> bool {
        matches!(
            (self, target),
            (Self::Draft, Self::Draft)
                | (Self::Published, Self::Published)
                | (Self::Archived, Self::Archived)
                | (Self::Draft, Self::Published)
                | (Self::Published, Self::Archived)
        )
    }
}

impl fmt::Display for ArticleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown article status '{}'", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for ArticleStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            "archived" => Ok(Self::Archived),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
    pub status: ArticleStatus,
    pub category_id: Option<i64>,
    /// Read back from the join table; no ordering guarantee.
    pub tags: Vec<Tag>,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "last_updated_at")]
    pub updated_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikedArticle {
    pub user_id: Uuid,
    pub article_id: Uuid,
    pub liked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedArticle {
    pub user_id: Uuid,
    pub article_id: Uuid,
    pub saved_at: DateTime<Utc>,
}

// -- Users --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    /// Argon2 PHC string. Never leaves the server.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub profile_picture_url: String,
    pub activated: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// -- Taxonomy --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "last_updated_at")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "last_updated_at")]
    pub updated_at: DateTime<Utc>,
}

// -- Engagement --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub article_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Follower {
    pub follower_id: Uuid,
    pub followed_id: Uuid,
    pub created_at: DateTime<Utc>,
}

// -- Password reset --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetToken {
    pub id: i64,
    pub user_id: Uuid,
    pub reset_token: String,
    pub expiration: DateTime<Utc>,
    pub used: bool,
}

impl ResetToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration < now
    }
}

/// Uniform result of an update or delete: which row, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifiedData {
    pub id: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_text() {
        for status in [ArticleStatus::Draft, ArticleStatus::Published, ArticleStatus::Archived] {
            assert_eq!(status.as_str().parse::<ArticleStatus>(), Ok(status));
        }
        assert!("deleted".parse::<ArticleStatus>().is_err());
    }

    #[test]
    fn status_transitions() {
        use ArticleStatus::*;
        assert!(Draft.can_transition_to(Published));
        assert!(Published.can_transition_to(Archived));
        assert!(Draft.can_transition_to(Draft));
        assert!(!Published.can_transition_to(Draft));
        assert!(!Archived.can_transition_to(Published));
        assert!(!Draft.can_transition_to(Archived));
    }

    #[test]
    fn password_hash_is_not_serialized() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: "a@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            first_name: "A".into(),
            last_name: "B".into(),
            bio: String::new(),
            profile_picture_url: String::new(),
            activated: false,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "a@example.com");
    }

    #[test]
    fn expired_token_detection() {
        let now = Utc::now();
        let token = ResetToken {
            id: 1,
            user_id: Uuid::new_v4(),
            reset_token: "t".into(),
            expiration: now - chrono::Duration::minutes(1),
            used: false,
        };
        assert!(token.is_expired(now));
        assert!(!token.is_expired(now - chrono::Duration::minutes(5)));
    }
}
