//! Categories and tags share one shape: a unique name plus timestamps.

use chrono::Utc;
use rusqlite::params;
use scribe_types::models::ModifiedData;

use crate::rows::{NamedRow, modified};
use crate::{Database, DbResult, Deadline};

pub(crate) struct NamedOps {
    pub create: &'static str,
    pub get_all: &'static str,
    pub get_by_name: &'static str,
    pub get_by_id: &'static str,
    pub update_name: &'static str,
    pub delete_by_id: &'static str,
    pub delete_by_name: &'static str,
}

pub(crate) struct NamedTable {
    pub table: &'static str,
    pub ops: NamedOps,
}

impl NamedTable {
    pub(crate) fn create<T: From<NamedRow>>(
        &self,
        db: &Database,
        deadline: &Deadline,
        name: &str,
    ) -> DbResult<T> {
        let sql = format!(
            "INSERT INTO {} (name, created_at, updated_at) VALUES (?1, ?2, ?2)
             RETURNING id, name, created_at, updated_at",
            self.table
        );
        let now = Utc::now();
        db.with_conn(deadline, self.ops.create, |conn| {
            conn.query_row(&sql, params![name, now], NamedRow::from_row)
        })
        .map(T::from)
    }

    /// Newest first.
    pub(crate) fn get_all<T: From<NamedRow>>(
        &self,
        db: &Database,
        deadline: &Deadline,
    ) -> DbResult<Vec<T>> {
        let sql = format!(
            "SELECT id, name, created_at, updated_at FROM {} ORDER BY created_at DESC, id DESC",
            self.table
        );
        db.with_conn(deadline, self.ops.get_all, |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], NamedRow::from_row)?
                .map(|row| row.map(T::from))
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    pub(crate) fn get_by_name<T: From<NamedRow>>(
        &self,
        db: &Database,
        deadline: &Deadline,
        name: &str,
    ) -> DbResult<T> {
        let sql = format!(
            "SELECT id, name, created_at, updated_at FROM {} WHERE name = ?1",
            self.table
        );
        db.with_conn(deadline, self.ops.get_by_name, |conn| {
            conn.query_row(&sql, [name], NamedRow::from_row)
        })
        .map(T::from)
    }

    pub(crate) fn get_by_id<T: From<NamedRow>>(
        &self,
        db: &Database,
        deadline: &Deadline,
        id: i64,
    ) -> DbResult<T> {
        let sql = format!(
            "SELECT id, name, created_at, updated_at FROM {} WHERE id = ?1",
            self.table
        );
        db.with_conn(deadline, self.ops.get_by_id, |conn| {
            conn.query_row(&sql, [id], NamedRow::from_row)
        })
        .map(T::from)
    }

    pub(crate) fn update_name(
        &self,
        db: &Database,
        deadline: &Deadline,
        id: i64,
        name: &str,
    ) -> DbResult<ModifiedData> {
        let sql = format!(
            "UPDATE {} SET name = ?1, updated_at = ?2 WHERE id = ?3 RETURNING id",
            self.table
        );
        let now = Utc::now();
        let id: i64 = db.with_conn(deadline, self.ops.update_name, |conn| {
            conn.query_row(&sql, params![name, now, id], |row| row.get(0))
        })?;
        Ok(modified(id, now))
    }

    /// The deleted row's id comes back through `RETURNING`, so a miss is
    /// `RecordNotFound` rather than an empty success.
    pub(crate) fn delete_by_id(
        &self,
        db: &Database,
        deadline: &Deadline,
        id: i64,
    ) -> DbResult<ModifiedData> {
        let sql = format!("DELETE FROM {} WHERE id = ?1 RETURNING id", self.table);
        let id: i64 = db.with_conn(deadline, self.ops.delete_by_id, |conn| {
            conn.query_row(&sql, [id], |row| row.get(0))
        })?;
        Ok(modified(id, Utc::now()))
    }

    pub(crate) fn delete_by_name(
        &self,
        db: &Database,
        deadline: &Deadline,
        name: &str,
    ) -> DbResult<ModifiedData> {
        let sql = format!("DELETE FROM {} WHERE name = ?1 RETURNING id", self.table);
        let id: i64 = db.with_conn(deadline, self.ops.delete_by_name, |conn| {
            conn.query_row(&sql, [name], |row| row.get(0))
        })?;
        Ok(modified(id, Utc::now()))
    }
}
