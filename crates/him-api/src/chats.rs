use axum::{
    Extension, Json,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use him_types::api::{
    ChatsResponse, CreateChatResponse, MessageRequest, MessagesResponse, SendMessageResponse,
};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::CurrentUser;

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    pub chat_id: Uuid,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    100
}

/// `GET /chats` — the viewer's chat list, most recent activity first.
pub async fn list_chats(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<ChatsResponse>, ApiError> {
    let db = state.clone();
    let user_id = user.id.to_string();
    let rows = tokio::task::spawn_blocking(move || db.db.list_chats(&user_id))
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("join error: {}", e)))??;

    Ok(Json(ChatsResponse {
        chats: rows.into_iter().map(|r| r.into_summary()).collect(),
    }))
}

/// `GET /messages?chat_id=` — the poll endpoint. Reading marks the chat as
/// read for the caller.
pub async fn get_messages(
    State(state): State<AppState>,
    Query(query): Query<MessagesQuery>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<MessagesResponse>, ApiError> {
    let db = state.clone();
    let chat_id = query.chat_id;
    let requester = user.id.to_string();
    let limit = query.limit.min(500);

    let rows = tokio::task::spawn_blocking(move || {
        db.db.list_messages(&chat_id.to_string(), &requester, limit)
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow::anyhow!("join error: {}", e)))??;

    Ok(Json(MessagesResponse {
        messages: rows.into_iter().map(|r| r.into_message()).collect(),
        chat_id: query.chat_id,
    }))
}

/// `POST /messages` — `send` and `create_chat`, dispatched on `action`.
pub async fn post_messages(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(req): Json<MessageRequest>,
) -> Result<Response, ApiError> {
    match req {
        MessageRequest::Send {
            chat_id,
            content,
            sender_id,
        } => {
            // The body may echo a sender id, but the authenticated identity
            // is the only one the store ever sees.
            if let Some(claimed) = sender_id {
                if claimed != user.id {
                    return Err(ApiError::Forbidden(
                        "sender_id does not match the authenticated user".into(),
                    ));
                }
            }
            let content = content.trim().to_string();
            if content.is_empty() {
                return Err(ApiError::Validation("Message content is required".into()));
            }

            let db = state.clone();
            let sender = user.id.to_string();
            let row = tokio::task::spawn_blocking(move || {
                db.db.send_message(
                    &chat_id.to_string(),
                    &sender,
                    &Uuid::new_v4().to_string(),
                    &content,
                    Utc::now(),
                )
            })
            .await
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("join error: {}", e)))??;

            Ok(Json(SendMessageResponse {
                message: row.into_message(),
                status: "sent".into(),
            })
            .into_response())
        }

        MessageRequest::CreateChat { participants } => {
            if participants.len() != 2 {
                return Err(ApiError::Validation(
                    "Exactly two participants are required".into(),
                ));
            }
            if !participants.contains(&user.id) {
                return Err(ApiError::Forbidden(
                    "Cannot open a chat on behalf of other users".into(),
                ));
            }

            let db = state.clone();
            let a = participants[0].to_string();
            let b = participants[1].to_string();
            let (chat_id, created) = tokio::task::spawn_blocking(move || {
                db.db
                    .get_or_create_chat(&a, &b, &Uuid::new_v4().to_string(), Utc::now())
            })
            .await
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("join error: {}", e)))??;

            let chat_id: Uuid = chat_id
                .parse()
                .map_err(|e| ApiError::Internal(anyhow::anyhow!("corrupt chat id: {}", e)))?;
            Ok(Json(CreateChatResponse {
                chat_id,
                status: if created { "created" } else { "existing_chat" }.into(),
            })
            .into_response())
        }
    }
}
