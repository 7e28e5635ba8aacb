use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ChatSummary, Message, Report, User};

// -- JWT Claims --

/// JWT claims shared between token issuance (login/register) and the request
/// middleware. `jti` names the server-side session row, which is what makes
/// logout actually revoke a token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub jti: Uuid,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthAction {
    Login,
    Register,
}

/// Body of `POST /auth`. The legacy client dispatches login and register
/// through one endpoint via `action`.
#[derive(Debug, Deserialize)]
pub struct AuthRequest {
    pub action: AuthAction,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub user: User,
    pub valid: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

// -- Users --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateCustomIdRequest {
    pub custom_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub user: User,
}

// -- Wallet --

#[derive(Debug, Serialize, Deserialize)]
pub struct WalletResponse {
    pub him_coins: i64,
    pub is_premium: bool,
}

// -- Chats / messages --

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatsResponse {
    pub chats: Vec<ChatSummary>,
}

/// Body of `POST /messages`, dispatched on `action`: `send` appends to a
/// chat, `create_chat` opens (or finds) the direct chat for a participant
/// pair.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum MessageRequest {
    Send {
        chat_id: Uuid,
        content: String,
        #[serde(default)]
        sender_id: Option<Uuid>,
    },
    CreateChat {
        participants: Vec<Uuid>,
    },
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub messages: Vec<Message>,
    pub chat_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendMessageResponse {
    pub message: Message,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateChatResponse {
    pub chat_id: Uuid,
    pub status: String,
}

// -- Reports --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileReportRequest {
    pub target_id: Uuid,
    pub reason: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReportResponse {
    pub report: Report,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReportsResponse {
    pub reports: Vec<Report>,
}
