use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};

use crate::Database;
use crate::error::StoreError;
use crate::models::{ReportRow, to_ts};

const REPORT_COLUMNS: &str =
    "id, reporter_id, target_id, reason, status, created_at, resolved_by, resolved_at";

impl Database {
    pub fn file_report(
        &self,
        id: &str,
        reporter_id: &str,
        target_id: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<ReportRow, StoreError> {
        if reporter_id == target_id {
            return Err(StoreError::SelfReport);
        }
        self.with_conn_mut(|conn| {
            let target: Option<i64> = conn
                .query_row("SELECT 1 FROM users WHERE id = ?1", [target_id], |row| row.get(0))
                .optional()?;
            if target.is_none() {
                return Err(StoreError::UserNotFound);
            }

            conn.execute(
                "INSERT INTO reports (id, reporter_id, target_id, reason, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, 'pending', ?5)",
                params![id, reporter_id, target_id, reason, to_ts(now)],
            )?;

            let sql = format!("SELECT {} FROM reports WHERE id = ?1", REPORT_COLUMNS);
            let row = conn.query_row(&sql, [id], map_report_row)?;
            Ok(row)
        })
    }

    /// Pending reports oldest-first, so the earliest complaints get reviewed
    /// first.
    pub fn list_pending_reports(&self) -> Result<Vec<ReportRow>, StoreError> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM reports WHERE status = 'pending' ORDER BY created_at ASC",
                REPORT_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], map_report_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// One-way pending -> resolved. The UPDATE is guarded on the pending
    /// status, so a second resolve can never overwrite the audit fields.
    pub fn resolve_report(
        &self,
        report_id: &str,
        admin_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.with_conn_mut(|conn| {
            let status: Option<String> = conn
                .query_row("SELECT status FROM reports WHERE id = ?1", [report_id], |row| {
                    row.get(0)
                })
                .optional()?;
            match status.as_deref() {
                None => return Err(StoreError::ReportNotFound),
                Some("resolved") => return Err(StoreError::AlreadyResolved),
                Some(_) => {}
            }

            let updated = conn.execute(
                "UPDATE reports SET status = 'resolved', resolved_by = ?1, resolved_at = ?2
                 WHERE id = ?3 AND status = 'pending'",
                params![admin_id, to_ts(now), report_id],
            )?;
            if updated == 0 {
                return Err(StoreError::AlreadyResolved);
            }
            Ok(())
        })
    }
}

fn map_report_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReportRow> {
    Ok(ReportRow {
        id: row.get(0)?,
        reporter_id: row.get(1)?,
        target_id: row.get(2)?,
        reason: row.get(3)?,
        status: row.get(4)?,
        created_at: row.get(5)?,
        resolved_by: row.get(6)?,
        resolved_at: row.get(7)?,
    })
}
