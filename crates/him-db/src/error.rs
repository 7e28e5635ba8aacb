use thiserror::Error;

/// Typed failures the store can report. Handlers translate these into HTTP
/// statuses; raw SQLite errors are only ever carried by `Db` and never shown
/// to clients.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("username already exists")]
    UsernameTaken,
    #[error("email already exists")]
    EmailTaken,
    #[error("custom id already exists")]
    CustomIdTaken,
    #[error("premium required")]
    NotPremium,
    #[error("user not found")]
    UserNotFound,
    #[error("chat not found")]
    ChatNotFound,
    #[error("not a participant of this chat")]
    NotParticipant,
    #[error("cannot open a chat with yourself")]
    SelfChat,
    #[error("cannot report yourself")]
    SelfReport,
    #[error("report not found")]
    ReportNotFound,
    #[error("report already resolved")]
    AlreadyResolved,
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("daily bonus already claimed")]
    BonusCooldown,
    #[error("store lock poisoned")]
    LockPoisoned,
    #[error(transparent)]
    Db(#[from] rusqlite::Error),
}
