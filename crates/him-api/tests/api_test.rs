use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use him_api::auth::{AppState, AppStateInner, generate_custom_id, hash_password};
use him_db::Database;
use him_db::users::NewUser;

fn test_state() -> AppState {
    Arc::new(AppStateInner {
        db: Database::open_in_memory().expect("in-memory db"),
        jwt_secret: "test-secret".into(),
        session_ttl: chrono::Duration::days(7),
        daily_bonus: 100,
        premium_price: 500,
        min_password_len: 6,
        bonus_cooldown_secs: 0,
    })
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Register a user and return (token, user json).
async fn register(app: &Router, username: &str) -> (String, Value) {
    let (status, body) = call(
        app,
        "POST",
        "/auth",
        None,
        Some(json!({
            "action": "register",
            "username": username,
            "password": "hunter22",
            "email": format!("{}@example.com", username),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "register failed: {}", body);
    (
        body["token"].as_str().unwrap().to_string(),
        body["user"].clone(),
    )
}

/// Seed an admin straight into the store and log in through the API.
async fn admin_token(app: &Router, state: &AppState) -> String {
    state
        .db
        .seed_admin(
            NewUser {
                id: &Uuid::new_v4().to_string(),
                username: "himo",
                custom_id: &generate_custom_id(),
                email: "himo@example.com",
                password_hash: &hash_password("adminpass").unwrap(),
            },
            Utc::now(),
        )
        .unwrap();

    let (status, body) = call(
        app,
        "POST",
        "/auth",
        None,
        Some(json!({"action": "login", "username": "himo", "password": "adminpass"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn register_creates_a_fresh_account_and_logs_it_in() {
    let state = test_state();
    let app = him_api::router(state);

    let (token, user) = register(&app, "alice").await;
    assert_eq!(user["him_coins"], 0);
    assert_eq!(user["is_premium"], false);
    assert_eq!(user["is_verified"], false);
    assert_eq!(user["is_admin"], false);
    assert!(user["custom_id"].as_str().unwrap().starts_with("USER"));

    // The issued token verifies and resolves to the same account.
    let (status, body) = call(&app, "GET", "/auth", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);
    assert_eq!(body["user"]["id"], user["id"]);
}

#[tokio::test]
async fn register_validates_input_and_rejects_duplicates() {
    let state = test_state();
    let app = him_api::router(state);

    for bad in [
        json!({"action": "register", "username": "ab", "password": "hunter22", "email": "a@b.c"}),
        json!({"action": "register", "username": "alice", "password": "short", "email": "a@b.c"}),
        json!({"action": "register", "username": "alice", "password": "hunter22"}),
    ] {
        let (status, _) = call(&app, "POST", "/auth", None, Some(bad)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    register(&app, "alice").await;
    let (status, _) = call(
        &app,
        "POST",
        "/auth",
        None,
        Some(json!({
            "action": "register",
            "username": "alice",
            "password": "hunter22",
            "email": "other@example.com",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn login_failure_does_not_reveal_which_credential_was_wrong() {
    let state = test_state();
    let app = him_api::router(state);
    register(&app, "alice").await;

    let (s1, b1) = call(
        &app,
        "POST",
        "/auth",
        None,
        Some(json!({"action": "login", "username": "alice", "password": "wrong-password"})),
    )
    .await;
    let (s2, b2) = call(
        &app,
        "POST",
        "/auth",
        None,
        Some(json!({"action": "login", "username": "nobody", "password": "whatever1"})),
    )
    .await;

    assert_eq!(s1, StatusCode::UNAUTHORIZED);
    assert_eq!(s2, StatusCode::UNAUTHORIZED);
    assert_eq!(b1["error"], b2["error"]);
}

#[tokio::test]
async fn logout_revokes_the_token_and_stays_idempotent() {
    let state = test_state();
    let app = him_api::router(state);
    let (token, _) = register(&app, "alice").await;

    let (status, _) = call(&app, "GET", "/auth", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app, "POST", "/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);

    // The signature is still valid, but the session is gone.
    let (status, _) = call(&app, "GET", "/auth", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Logging out again (or with garbage) is still Ok.
    let (status, _) = call(&app, "POST", "/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app, "POST", "/auth/logout", Some("not-a-token"), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn two_users_can_chat_and_unread_counts_track_reads() {
    let state = test_state();
    let app = him_api::router(state);
    let (alice_token, alice) = register(&app, "alice").await;
    let (bob_token, bob) = register(&app, "bob").await;

    // Alice opens the chat; reopening resolves to the same one.
    let participants = json!([alice["id"], bob["id"]]);
    let (status, body) = call(
        &app,
        "POST",
        "/messages",
        Some(&alice_token),
        Some(json!({"action": "create_chat", "participants": participants})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "created");
    let chat_id = body["chat_id"].as_str().unwrap().to_string();

    let (_, body) = call(
        &app,
        "POST",
        "/messages",
        Some(&bob_token),
        Some(json!({"action": "create_chat", "participants": [bob["id"], alice["id"]]})),
    )
    .await;
    assert_eq!(body["status"], "existing_chat");
    assert_eq!(body["chat_id"].as_str().unwrap(), chat_id);

    // Alice says hello (the legacy client echoes sender_id; it must match).
    let (status, body) = call(
        &app,
        "POST",
        "/messages",
        Some(&alice_token),
        Some(json!({
            "action": "send",
            "chat_id": chat_id,
            "sender_id": alice["id"],
            "content": "hello",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "sent");
    assert_eq!(body["message"]["content"], "hello");

    // Bob sees one unread chat named after Alice.
    let (_, body) = call(&app, "GET", "/chats", Some(&bob_token), None).await;
    let chats = body["chats"].as_array().unwrap();
    assert_eq!(chats.len(), 1);
    assert_eq!(chats[0]["name"], "alice");
    assert_eq!(chats[0]["unread"], 1);
    assert_eq!(chats[0]["last_message"], "hello");

    // Reading shows exactly one message from Alice and clears the counter.
    let uri = format!("/messages?chat_id={}", chat_id);
    let (status, body) = call(&app, "GET", &uri, Some(&bob_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["content"], "hello");
    assert_eq!(messages[0]["sender_id"], alice["id"]);
    assert_eq!(messages[0]["sender_username"], "alice");

    let (_, body) = call(&app, "GET", "/chats", Some(&bob_token), None).await;
    assert_eq!(body["chats"][0]["unread"], 0);
}

#[tokio::test]
async fn sending_enforces_content_participation_and_identity() {
    let state = test_state();
    let app = him_api::router(state);
    let (alice_token, alice) = register(&app, "alice").await;
    let (_, bob) = register(&app, "bob").await;
    let (carol_token, _) = register(&app, "carol").await;

    let (_, body) = call(
        &app,
        "POST",
        "/messages",
        Some(&alice_token),
        Some(json!({"action": "create_chat", "participants": [alice["id"], bob["id"]]})),
    )
    .await;
    let chat_id = body["chat_id"].as_str().unwrap().to_string();

    // Whitespace-only content is empty content.
    let (status, _) = call(
        &app,
        "POST",
        "/messages",
        Some(&alice_token),
        Some(json!({"action": "send", "chat_id": chat_id, "content": "   "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Carol is not a participant.
    let (status, _) = call(
        &app,
        "POST",
        "/messages",
        Some(&carol_token),
        Some(json!({"action": "send", "chat_id": chat_id, "content": "hi"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // A spoofed sender_id is rejected even for a participant.
    let (status, _) = call(
        &app,
        "POST",
        "/messages",
        Some(&alice_token),
        Some(json!({
            "action": "send",
            "chat_id": chat_id,
            "sender_id": bob["id"],
            "content": "hi",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn wallet_bonus_and_premium_purchase() {
    let state = test_state();
    let app = him_api::router(state);
    let (token, _) = register(&app, "alice").await;

    // Fresh accounts cannot afford premium.
    let (status, _) = call(&app, "POST", "/wallet/premium", Some(&token), None).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);

    // Custom-id changes are premium-gated.
    let (status, _) = call(
        &app,
        "PUT",
        "/users/me/custom_id",
        Some(&token),
        Some(json!({"custom_id": "ALICE"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Five claims of 100 reach the 500 price.
    for expected in [100, 200, 300, 400, 500] {
        let (status, body) = call(&app, "POST", "/wallet/bonus", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["him_coins"], expected);
    }

    let (status, body) = call(&app, "POST", "/wallet/premium", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["him_coins"], 0);
    assert_eq!(body["is_premium"], true);

    let (_, body) = call(&app, "GET", "/users/me", Some(&token), None).await;
    assert_eq!(body["user"]["is_premium"], true);

    // Premium unlocks the handle change.
    let (status, body) = call(
        &app,
        "PUT",
        "/users/me/custom_id",
        Some(&token),
        Some(json!({"custom_id": "ALICE"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["custom_id"], "ALICE");
}

#[tokio::test]
async fn authenticated_requests_bump_last_seen() {
    let state = test_state();
    let app = him_api::router(state);
    let (token, user) = register(&app, "alice").await;
    assert!(user["last_seen_at"].is_null());

    // The bump happens after the current record is loaded, so it becomes
    // visible on the following request.
    call(&app, "GET", "/users/me", Some(&token), None).await;
    let (_, body) = call(&app, "GET", "/users/me", Some(&token), None).await;
    let first: chrono::DateTime<chrono::Utc> = body["user"]["last_seen_at"]
        .as_str()
        .expect("last_seen_at set after an authenticated request")
        .parse()
        .unwrap();

    let (_, body) = call(&app, "GET", "/users/me", Some(&token), None).await;
    let second: chrono::DateTime<chrono::Utc> =
        body["user"]["last_seen_at"].as_str().unwrap().parse().unwrap();
    assert!(second >= first);
}

#[tokio::test]
async fn protected_routes_reject_missing_tokens_and_non_admins() {
    let state = test_state();
    let app = him_api::router(state);
    let (token, _) = register(&app, "alice").await;

    let (status, _) = call(&app, "GET", "/chats", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Authenticated but not authorized: a different failure.
    let (status, _) = call(&app, "GET", "/admin/reports", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn report_lifecycle_through_the_admin_queue() {
    let state = test_state();
    let app = him_api::router(state.clone());
    let (alice_token, alice) = register(&app, "alice").await;
    let (_, bob) = register(&app, "bob").await;

    // Self-reports and empty reasons never enter the queue.
    let (status, _) = call(
        &app,
        "POST",
        "/reports",
        Some(&alice_token),
        Some(json!({"target_id": alice["id"], "reason": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        "POST",
        "/reports",
        Some(&alice_token),
        Some(json!({"target_id": bob["id"], "reason": "  "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        "POST",
        "/reports",
        Some(&alice_token),
        Some(json!({"target_id": Uuid::new_v4(), "reason": "spam"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(
        &app,
        "POST",
        "/reports",
        Some(&alice_token),
        Some(json!({"target_id": bob["id"], "reason": "spam"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["report"]["status"], "pending");
    let report_id = body["report"]["id"].as_str().unwrap().to_string();

    let admin = admin_token(&app, &state).await;

    let (status, body) = call(&app, "GET", "/admin/reports", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let reports = body["reports"].as_array().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["id"].as_str().unwrap(), report_id);

    let uri = format!("/admin/reports/{}/resolve", report_id);
    let (status, _) = call(&app, "POST", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);

    // One-way: a second resolve is a conflict, not a silent success.
    let (status, _) = call(&app, "POST", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = call(&app, "GET", "/admin/reports", Some(&admin), None).await;
    assert!(body["reports"].as_array().unwrap().is_empty());
}
