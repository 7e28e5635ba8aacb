//! Database row types — these map directly to SQLite rows.
//! Distinct from him-types API models to keep the DB layer independent.

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::warn;
use uuid::Uuid;

use him_types::models::{ChatSummary, Message, Report, ReportStatus, User};

#[derive(Debug)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub custom_id: String,
    pub email: String,
    pub password: String,
    pub him_coins: i64,
    pub is_premium: bool,
    pub is_verified: bool,
    pub is_admin: bool,
    pub last_bonus_at: Option<String>,
    pub last_seen_at: Option<String>,
    pub created_at: String,
}

#[derive(Debug)]
pub struct MessageRow {
    pub seq: i64,
    pub id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub sender_username: String,
    pub sender_custom_id: String,
    pub sender_is_premium: bool,
    pub sender_is_verified: bool,
    pub content: String,
    pub created_at: String,
}

pub struct ChatSummaryRow {
    pub id: String,
    pub name: Option<String>,
    pub last_message: Option<String>,
    pub last_message_at: Option<String>,
    pub unread: i64,
}

#[derive(Debug)]
pub struct ReportRow {
    pub id: String,
    pub reporter_id: String,
    pub target_id: String,
    pub reason: String,
    pub status: String,
    pub created_at: String,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<String>,
}

/// Timestamps are stored as fixed-width RFC 3339 UTC text so that string
/// comparison in SQL agrees with chronological order.
pub(crate) fn to_ts(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", s, e);
            DateTime::default()
        })
}

pub(crate) fn parse_id(s: &str) -> Uuid {
    s.parse().unwrap_or_else(|e| {
        warn!("Corrupt id '{}': {}", s, e);
        Uuid::default()
    })
}

impl UserRow {
    pub fn into_user(self) -> User {
        User {
            id: parse_id(&self.id),
            username: self.username,
            custom_id: self.custom_id,
            email: self.email,
            him_coins: self.him_coins,
            is_premium: self.is_premium,
            is_verified: self.is_verified,
            is_admin: self.is_admin,
            last_seen_at: self.last_seen_at.as_deref().map(parse_ts),
            created_at: parse_ts(&self.created_at),
        }
    }
}

impl MessageRow {
    pub fn into_message(self) -> Message {
        Message {
            id: parse_id(&self.id),
            chat_id: parse_id(&self.chat_id),
            sender_id: parse_id(&self.sender_id),
            sender_username: self.sender_username,
            sender_custom_id: self.sender_custom_id,
            sender_is_premium: self.sender_is_premium,
            sender_is_verified: self.sender_is_verified,
            content: self.content,
            created_at: parse_ts(&self.created_at),
        }
    }
}

impl ChatSummaryRow {
    pub fn into_summary(self) -> ChatSummary {
        ChatSummary {
            id: parse_id(&self.id),
            name: self.name.unwrap_or_else(|| "chat".to_string()),
            last_message: self.last_message,
            last_message_at: self.last_message_at.as_deref().map(parse_ts),
            unread: self.unread,
        }
    }
}

impl ReportRow {
    pub fn into_report(self) -> Report {
        let status = match self.status.as_str() {
            "resolved" => ReportStatus::Resolved,
            _ => ReportStatus::Pending,
        };
        Report {
            id: parse_id(&self.id),
            reporter_id: parse_id(&self.reporter_id),
            target_id: parse_id(&self.target_id),
            reason: self.reason,
            status,
            created_at: parse_ts(&self.created_at),
            resolved_by: self.resolved_by.as_deref().map(parse_id),
            resolved_at: self.resolved_at.as_deref().map(parse_ts),
        }
    }
}
