use chrono::{DateTime, Duration, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use crate::Database;
use crate::error::StoreError;
use crate::models::{UserRow, parse_ts, to_ts};

const USER_COLUMNS: &str = "id, username, custom_id, email, password, him_coins, \
     is_premium, is_verified, is_admin, last_bonus_at, last_seen_at, created_at";

pub struct NewUser<'a> {
    pub id: &'a str,
    pub username: &'a str,
    pub custom_id: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
}

impl Database {
    // -- Identity --

    /// Insert a fresh account: zero coins, no flags. Username/email conflicts
    /// are reported distinctly; a custom-id collision surfaces as
    /// `CustomIdTaken` so the caller can retry with a new candidate.
    pub fn create_user(&self, new: NewUser<'_>, now: DateTime<Utc>) -> Result<UserRow, StoreError> {
        self.with_conn_mut(|conn| {
            if user_exists(conn, "username", new.username)? {
                return Err(StoreError::UsernameTaken);
            }
            if user_exists(conn, "email", new.email)? {
                return Err(StoreError::EmailTaken);
            }

            let res = conn.execute(
                "INSERT INTO users (id, username, custom_id, email, password, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    new.id,
                    new.username,
                    new.custom_id,
                    new.email,
                    new.password_hash,
                    to_ts(now)
                ],
            );
            match res {
                Ok(_) => {}
                Err(e) if e.to_string().contains("users.custom_id") => {
                    return Err(StoreError::CustomIdTaken);
                }
                Err(e) => return Err(e.into()),
            }

            query_user_by_id(conn, new.id)?.ok_or(StoreError::UserNotFound)
        })
    }

    /// Provisioning-time admin account. Never reachable from public
    /// registration; returns false if the username is already present.
    pub fn seed_admin(&self, new: NewUser<'_>, now: DateTime<Utc>) -> Result<bool, StoreError> {
        self.with_conn_mut(|conn| {
            if user_exists(conn, "username", new.username)? {
                return Ok(false);
            }
            conn.execute(
                "INSERT INTO users (id, username, custom_id, email, password,
                                    is_premium, is_verified, is_admin, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 1, 1, 1, ?6)",
                params![
                    new.id,
                    new.username,
                    new.custom_id,
                    new.email,
                    new.password_hash,
                    to_ts(now)
                ],
            )?;
            Ok(true)
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>, StoreError> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>, StoreError> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    pub fn custom_id_taken(&self, custom_id: &str) -> Result<bool, StoreError> {
        self.with_conn(|conn| user_exists(conn, "custom_id", custom_id))
    }

    /// Changing the display handle is a premium capability.
    pub fn update_custom_id(&self, user_id: &str, new_id: &str) -> Result<(), StoreError> {
        self.with_conn_mut(|conn| {
            let user = query_user_by_id(conn, user_id)?.ok_or(StoreError::UserNotFound)?;
            if !user.is_premium {
                return Err(StoreError::NotPremium);
            }
            let taken: Option<String> = conn
                .query_row(
                    "SELECT id FROM users WHERE custom_id = ?1 AND id != ?2",
                    params![new_id, user_id],
                    |row| row.get(0),
                )
                .optional()?;
            if taken.is_some() {
                return Err(StoreError::CustomIdTaken);
            }
            conn.execute(
                "UPDATE users SET custom_id = ?1 WHERE id = ?2",
                params![new_id, user_id],
            )?;
            Ok(())
        })
    }

    pub fn touch_last_seen(&self, user_id: &str, now: DateTime<Utc>) -> Result<(), StoreError> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users SET last_seen_at = ?1 WHERE id = ?2",
                params![to_ts(now), user_id],
            )?;
            Ok(())
        })
    }

    // -- Currency ledger --

    /// Credit the daily bonus and return the new balance. A cooldown of zero
    /// seconds reproduces the reference behavior (every claim succeeds).
    pub fn claim_bonus(
        &self,
        user_id: &str,
        amount: i64,
        cooldown_secs: u64,
        now: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        self.with_conn_mut(|conn| {
            let row: Option<(i64, Option<String>)> = conn
                .query_row(
                    "SELECT him_coins, last_bonus_at FROM users WHERE id = ?1",
                    [user_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            let (balance, last_bonus_at) = row.ok_or(StoreError::UserNotFound)?;

            if cooldown_secs > 0 {
                if let Some(last) = last_bonus_at.as_deref() {
                    let elapsed = now - parse_ts(last);
                    if elapsed < Duration::seconds(cooldown_secs as i64) {
                        return Err(StoreError::BonusCooldown);
                    }
                }
            }

            conn.execute(
                "UPDATE users SET him_coins = him_coins + ?1, last_bonus_at = ?2 WHERE id = ?3",
                params![amount, to_ts(now), user_id],
            )?;
            Ok(balance + amount)
        })
    }

    /// Debit the premium price and set the flag in one guarded statement, so
    /// neither half can ever be observed without the other. Zero rows updated
    /// means the balance check failed and nothing changed.
    pub fn purchase_premium(&self, user_id: &str, price: i64) -> Result<i64, StoreError> {
        self.with_conn_mut(|conn| {
            if !user_exists(conn, "id", user_id)? {
                return Err(StoreError::UserNotFound);
            }
            let updated = conn.execute(
                "UPDATE users SET him_coins = him_coins - ?1, is_premium = 1
                 WHERE id = ?2 AND him_coins >= ?1",
                params![price, user_id],
            )?;
            if updated == 0 {
                return Err(StoreError::InsufficientFunds);
            }
            let balance: i64 =
                conn.query_row("SELECT him_coins FROM users WHERE id = ?1", [user_id], |row| {
                    row.get(0)
                })?;
            Ok(balance)
        })
    }
}

fn user_exists(conn: &Connection, column: &str, value: &str) -> Result<bool, StoreError> {
    // `column` is always a fixed identifier from this module, never input.
    let sql = format!("SELECT 1 FROM users WHERE {} = ?1", column);
    let found: Option<i64> = conn.query_row(&sql, [value], |row| row.get(0)).optional()?;
    Ok(found.is_some())
}

pub(crate) fn query_user_by_username(
    conn: &Connection,
    username: &str,
) -> Result<Option<UserRow>, StoreError> {
    let sql = format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([username], map_user_row).optional()?;
    Ok(row)
}

pub(crate) fn query_user_by_id(conn: &Connection, id: &str) -> Result<Option<UserRow>, StoreError> {
    let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([id], map_user_row).optional()?;
    Ok(row)
}

fn map_user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        custom_id: row.get(2)?,
        email: row.get(3)?,
        password: row.get(4)?,
        him_coins: row.get(5)?,
        is_premium: row.get(6)?,
        is_verified: row.get(7)?,
        is_admin: row.get(8)?,
        last_bonus_at: row.get(9)?,
        last_seen_at: row.get(10)?,
        created_at: row.get(11)?,
    })
}
