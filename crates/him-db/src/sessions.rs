use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};

use crate::Database;
use crate::error::StoreError;
use crate::models::{parse_ts, to_ts};

impl Database {
    pub fn create_session(
        &self,
        id: &str,
        user_id: &str,
        issued_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO sessions (id, user_id, issued_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![id, user_id, to_ts(issued_at), expires_at.map(to_ts)],
            )?;
            Ok(())
        })
    }

    /// A token only validates while its session row exists and has not
    /// expired. Logged-out sessions are deleted, so they can never
    /// re-validate.
    pub fn session_live(&self, id: &str, now: DateTime<Utc>) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let row: Option<Option<String>> = conn
                .query_row("SELECT expires_at FROM sessions WHERE id = ?1", [id], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(match row {
                None => false,
                Some(None) => true,
                Some(Some(exp)) => parse_ts(&exp) > now,
            })
        })
    }

    /// Idempotent: deleting a session that never existed is still Ok.
    pub fn delete_session(&self, id: &str) -> Result<(), StoreError> {
        self.with_conn_mut(|conn| {
            conn.execute("DELETE FROM sessions WHERE id = ?1", [id])?;
            Ok(())
        })
    }
}
