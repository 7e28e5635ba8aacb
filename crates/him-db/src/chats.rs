use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use crate::Database;
use crate::error::StoreError;
use crate::models::{ChatSummaryRow, MessageRow, to_ts};

impl Database {
    // -- Chats --

    /// Find or create the direct chat for an unordered user pair. Returns the
    /// chat id and whether it was created by this call.
    pub fn get_or_create_chat(
        &self,
        user_a: &str,
        user_b: &str,
        candidate_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(String, bool), StoreError> {
        if user_a == user_b {
            return Err(StoreError::SelfChat);
        }
        self.with_conn_mut(|conn| {
            for uid in [user_a, user_b] {
                let found: Option<i64> = conn
                    .query_row("SELECT 1 FROM users WHERE id = ?1", [uid], |row| row.get(0))
                    .optional()?;
                if found.is_none() {
                    return Err(StoreError::UserNotFound);
                }
            }

            if let Some(existing) = query_pair_chat(conn, user_a, user_b)? {
                return Ok((existing, false));
            }

            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO chats (id, created_at) VALUES (?1, ?2)",
                params![candidate_id, to_ts(now)],
            )?;
            for uid in [user_a, user_b] {
                tx.execute(
                    "INSERT INTO chat_participants (chat_id, user_id) VALUES (?1, ?2)",
                    params![candidate_id, uid],
                )?;
            }
            tx.commit()?;
            Ok((candidate_id.to_string(), true))
        })
    }

    /// Chat list for one viewer, most recent activity first. The display name
    /// of a direct chat is the counterpart's username; unread counts messages
    /// past the viewer's read cursor that the viewer did not send.
    pub fn list_chats(&self, user_id: &str) -> Result<Vec<ChatSummaryRow>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id,
                        (SELECT u.username
                           FROM chat_participants p2
                           JOIN users u ON u.id = p2.user_id
                          WHERE p2.chat_id = c.id AND p2.user_id != ?1
                          LIMIT 1),
                        (SELECT m.content FROM messages m
                          WHERE m.chat_id = c.id
                          ORDER BY m.seq DESC LIMIT 1),
                        (SELECT m.created_at FROM messages m
                          WHERE m.chat_id = c.id
                          ORDER BY m.seq DESC LIMIT 1),
                        (SELECT COUNT(*) FROM messages m
                          WHERE m.chat_id = c.id
                            AND m.seq > p.last_read_seq
                            AND m.sender_id != ?1)
                 FROM chats c
                 JOIN chat_participants p
                   ON p.chat_id = c.id AND p.user_id = ?1
                 ORDER BY COALESCE(
                     (SELECT m.created_at FROM messages m
                       WHERE m.chat_id = c.id
                       ORDER BY m.seq DESC LIMIT 1),
                     c.created_at) DESC",
            )?;

            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(ChatSummaryRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        last_message: row.get(2)?,
                        last_message_at: row.get(3)?,
                        unread: row.get(4)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Messages --

    /// Messages of one chat in send order, restricted to participants.
    /// Reading also advances the requester's unread cursor, but only past
    /// the messages actually returned; a truncated read leaves the rest
    /// unread.
    pub fn list_messages(
        &self,
        chat_id: &str,
        requester_id: &str,
        limit: u32,
    ) -> Result<Vec<MessageRow>, StoreError> {
        self.with_conn_mut(|conn| {
            require_participant(conn, chat_id, requester_id)?;

            let mut stmt = conn.prepare(
                "SELECT m.seq, m.id, m.chat_id, m.sender_id,
                        u.username, u.custom_id, u.is_premium, u.is_verified,
                        m.content, m.created_at
                 FROM messages m
                 JOIN users u ON u.id = m.sender_id
                 WHERE m.chat_id = ?1
                 ORDER BY m.created_at ASC, m.seq ASC
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(params![chat_id, limit], map_message_row)?
                .collect::<Result<Vec<_>, _>>()?;
            drop(stmt);

            // MAX keeps the cursor from moving backwards on a re-read of an
            // older window.
            if let Some(newest) = rows.last() {
                conn.execute(
                    "UPDATE chat_participants
                     SET last_read_seq = MAX(last_read_seq, ?1)
                     WHERE chat_id = ?2 AND user_id = ?3",
                    params![newest.seq, chat_id, requester_id],
                )?;
            }

            Ok(rows)
        })
    }

    /// Append one message. The insert and the sender's own read-cursor bump
    /// commit together, so a sender never sees their own message as unread.
    pub fn send_message(
        &self,
        chat_id: &str,
        sender_id: &str,
        message_id: &str,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<MessageRow, StoreError> {
        self.with_conn_mut(|conn| {
            require_participant(conn, chat_id, sender_id)?;

            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO messages (id, chat_id, sender_id, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![message_id, chat_id, sender_id, content, to_ts(now)],
            )?;
            let seq = tx.last_insert_rowid();
            tx.execute(
                "UPDATE chat_participants SET last_read_seq = ?1
                 WHERE chat_id = ?2 AND user_id = ?3",
                params![seq, chat_id, sender_id],
            )?;
            tx.commit()?;

            let row = conn.query_row(
                "SELECT m.seq, m.id, m.chat_id, m.sender_id,
                        u.username, u.custom_id, u.is_premium, u.is_verified,
                        m.content, m.created_at
                 FROM messages m
                 JOIN users u ON u.id = m.sender_id
                 WHERE m.id = ?1",
                [message_id],
                map_message_row,
            )?;
            Ok(row)
        })
    }
}

fn require_participant(
    conn: &Connection,
    chat_id: &str,
    user_id: &str,
) -> Result<(), StoreError> {
    let chat: Option<i64> = conn
        .query_row("SELECT 1 FROM chats WHERE id = ?1", [chat_id], |row| row.get(0))
        .optional()?;
    if chat.is_none() {
        return Err(StoreError::ChatNotFound);
    }
    let member: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM chat_participants WHERE chat_id = ?1 AND user_id = ?2",
            params![chat_id, user_id],
            |row| row.get(0),
        )
        .optional()?;
    if member.is_none() {
        return Err(StoreError::NotParticipant);
    }
    Ok(())
}

fn query_pair_chat(
    conn: &Connection,
    user_a: &str,
    user_b: &str,
) -> Result<Option<String>, StoreError> {
    let id = conn
        .query_row(
            "SELECT c.id FROM chats c
             WHERE EXISTS (SELECT 1 FROM chat_participants p
                            WHERE p.chat_id = c.id AND p.user_id = ?1)
               AND EXISTS (SELECT 1 FROM chat_participants p
                            WHERE p.chat_id = c.id AND p.user_id = ?2)",
            params![user_a, user_b],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

fn map_message_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        seq: row.get(0)?,
        id: row.get(1)?,
        chat_id: row.get(2)?,
        sender_id: row.get(3)?,
        sender_username: row.get(4)?,
        sender_custom_id: row.get(5)?,
        sender_is_premium: row.get(6)?,
        sender_is_verified: row.get(7)?,
        content: row.get(8)?,
        created_at: row.get(9)?,
    })
}
