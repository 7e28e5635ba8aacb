use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id             TEXT PRIMARY KEY,
            username       TEXT NOT NULL UNIQUE,
            custom_id      TEXT NOT NULL UNIQUE,
            email          TEXT NOT NULL UNIQUE,
            password       TEXT NOT NULL,
            him_coins      INTEGER NOT NULL DEFAULT 0 CHECK (him_coins >= 0),
            is_premium     INTEGER NOT NULL DEFAULT 0,
            is_verified    INTEGER NOT NULL DEFAULT 0,
            is_admin       INTEGER NOT NULL DEFAULT 0,
            last_bonus_at  TEXT,
            last_seen_at   TEXT,
            created_at     TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sessions (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            issued_at   TEXT NOT NULL,
            expires_at  TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_sessions_user
            ON sessions(user_id);

        CREATE TABLE IF NOT EXISTS chats (
            id          TEXT PRIMARY KEY,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS chat_participants (
            chat_id        TEXT NOT NULL REFERENCES chats(id),
            user_id        TEXT NOT NULL REFERENCES users(id),
            last_read_seq  INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (chat_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS messages (
            seq         INTEGER PRIMARY KEY AUTOINCREMENT,
            id          TEXT NOT NULL UNIQUE,
            chat_id     TEXT NOT NULL REFERENCES chats(id),
            sender_id   TEXT NOT NULL REFERENCES users(id),
            content     TEXT NOT NULL CHECK (content <> ''),
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_chat
            ON messages(chat_id, created_at, seq);

        CREATE TABLE IF NOT EXISTS reports (
            id           TEXT PRIMARY KEY,
            reporter_id  TEXT NOT NULL REFERENCES users(id),
            target_id    TEXT NOT NULL REFERENCES users(id),
            reason       TEXT NOT NULL CHECK (reason <> ''),
            status       TEXT NOT NULL DEFAULT 'pending'
                         CHECK (status IN ('pending', 'resolved')),
            created_at   TEXT NOT NULL,
            resolved_by  TEXT REFERENCES users(id),
            resolved_at  TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_reports_status
            ON reports(status, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
