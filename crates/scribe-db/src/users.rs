use std::sync::Arc;

use chrono::Utc;
use rusqlite::params;
use scribe_types::models::{ModifiedData, User};
use uuid::Uuid;

use crate::rows::{self, USER_COLUMNS, modified};
use crate::{Database, DbResult, Deadline};

pub const DEFAULT_BIO: &str = "Enter your bio";
pub const DEFAULT_PROFILE_PICTURE_URL: &str = "https://placehold.co/400?text=U";

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    /// Empty falls back to [`DEFAULT_BIO`].
    pub bio: String,
    /// Empty falls back to [`DEFAULT_PROFILE_PICTURE_URL`].
    pub profile_picture_url: String,
}

/// Profile fields a user may change. `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub profile_picture_url: Option<String>,
    pub activated: Option<bool>,
}

#[derive(Clone)]
pub struct UserStore {
    db: Arc<Database>,
}

impl UserStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn create(&self, deadline: &Deadline, new: &NewUser) -> DbResult<User> {
        let bio = non_empty_or(&new.bio, DEFAULT_BIO);
        let picture = non_empty_or(&new.profile_picture_url, DEFAULT_PROFILE_PICTURE_URL);
        let now = Utc::now();
        self.db.with_conn(deadline, "user_create", |conn| {
            conn.query_row(
                &format!(
                    "INSERT INTO users
                        (email, password_hash, first_name, last_name, bio, profile_picture_url, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
                     RETURNING {USER_COLUMNS}"
                ),
                params![
                    new.email,
                    new.password_hash,
                    new.first_name,
                    new.last_name,
                    bio,
                    picture,
                    now,
                ],
                rows::user,
            )
        })
    }

    pub fn get_by_email(&self, deadline: &Deadline, email: &str) -> DbResult<User> {
        self.db.with_conn(deadline, "user_getbyemail", |conn| {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                [email],
                rows::user,
            )
        })
    }

    pub fn get_by_id(&self, deadline: &Deadline, id: Uuid) -> DbResult<User> {
        self.db.with_conn(deadline, "user_getbyid", |conn| {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                [id.to_string()],
                rows::user,
            )
        })
    }

    pub fn update_details(&self, deadline: &Deadline, id: Uuid, patch: &UserPatch) -> DbResult<User> {
        self.db.with_conn(deadline, "user_updatedetails", |conn| {
            conn.query_row(
                &format!(
                    "UPDATE users
                     SET first_name = COALESCE(?1, first_name),
                         last_name = COALESCE(?2, last_name),
                         bio = COALESCE(?3, bio),
                         profile_picture_url = COALESCE(?4, profile_picture_url),
                         activated = COALESCE(?5, activated),
                         updated_at = ?6
                     WHERE id = ?7
                     RETURNING {USER_COLUMNS}"
                ),
                params![
                    patch.first_name,
                    patch.last_name,
                    patch.bio,
                    patch.profile_picture_url,
                    patch.activated,
                    Utc::now(),
                    id.to_string(),
                ],
                rows::user,
            )
        })
    }

    /// Moves the account from `current_email` to `new_email`. A taken
    /// `new_email` is `DuplicateKey`.
    pub fn update_email(
        &self,
        deadline: &Deadline,
        current_email: &str,
        new_email: &str,
    ) -> DbResult<ModifiedData> {
        let now = Utc::now();
        let id: String = self.db.with_conn(deadline, "user_updateemail", |conn| {
            conn.query_row(
                "UPDATE users SET email = ?1, updated_at = ?2 WHERE email = ?3 RETURNING id",
                params![new_email, now, current_email],
                |row| row.get(0),
            )
        })?;
        Ok(modified(id, now))
    }

    pub fn update_password(
        &self,
        deadline: &Deadline,
        email: &str,
        password_hash: &str,
    ) -> DbResult<ModifiedData> {
        let now = Utc::now();
        let id: String = self.db.with_conn(deadline, "user_updatepassword", |conn| {
            conn.query_row(
                "UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE email = ?3 RETURNING id",
                params![password_hash, now, email],
                |row| row.get(0),
            )
        })?;
        Ok(modified(id, now))
    }
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() { fallback } else { value }
}
