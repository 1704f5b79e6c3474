//! E2E tests for profiles and the viewer's own account

mod common;

use std::sync::Arc;

use common::{FailingIdentityProvider, TestServer};
use serde_json::{Value, json};

#[tokio::test]
async fn test_profile_counts_and_follow_state() {
    let server = TestServer::new().await;
    let (alice, alice_token) = server.create_user("alice").await;
    let (_, bob_token) = server.create_user("bob").await;
    server.create_post(&alice_token, "one").await;
    server.create_post(&alice_token, "two").await;
    server
        .post_json(&format!("/api/users/{}/follow", alice.id), &bob_token, json!({}))
        .await;

    // Anonymous viewer
    let profile: Value = server
        .client
        .get(&server.url("/api/profiles/alice"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(profile["id"], alice.id.as_str());
    assert_eq!(profile["counts"]["posts"], 2);
    assert_eq!(profile["counts"]["followers"], 1);
    assert_eq!(profile["counts"]["following"], 0);
    assert_eq!(profile["is_following"], false);

    let profile: Value = server
        .get_authed("/api/profiles/alice", &bob_token)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(profile["is_following"], true);
}

#[tokio::test]
async fn test_unknown_profile_returns_404() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(&server.url("/api/profiles/nobody"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_profile_posts_and_likes() {
    let server = TestServer::new().await;
    let (_, alice_token) = server.create_user("alice").await;
    let (_, bob_token) = server.create_user("bob").await;
    let post_id = server.create_post(&alice_token, "by alice").await;
    server.create_post(&bob_token, "by bob").await;
    server
        .post_json(&format!("/api/posts/{}/like", post_id), &bob_token, json!({}))
        .await;

    let posts: Vec<Value> = server
        .client
        .get(&server.url("/api/profiles/alice/posts"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["content"], "by alice");

    let liked: Vec<Value> = server
        .client
        .get(&server.url("/api/profiles/bob/likes"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(liked.len(), 1);
    assert_eq!(liked[0]["id"], post_id.as_str());
}

#[tokio::test]
async fn test_get_me_returns_user_and_counts() {
    let server = TestServer::new().await;
    let (alice, token) = server.create_user("alice").await;
    server.create_post(&token, "hello").await;

    let json: Value = server
        .get_authed("/api/me", &token)
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(json["user"]["id"], alice.id.as_str());
    assert_eq!(json["user"]["email"], "alice@example.com");
    assert_eq!(json["counts"]["posts"], 1);
}

#[tokio::test]
async fn test_update_profile_sets_clears_and_keeps_fields() {
    let server = TestServer::new().await;
    let (_, token) = server.create_user("alice").await;

    let response = server
        .client
        .patch(&server.url("/api/me/profile"))
        .bearer_auth(&token)
        .json(&json!({ "bio": "  hello there  ", "location": "Lisbon" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["user"]["bio"], "hello there");
    assert_eq!(json["user"]["location"], "Lisbon");
    assert_eq!(json["user"]["name"], "alice name");

    // Blank clears, omitted keeps
    let json: Value = server
        .client
        .patch(&server.url("/api/me/profile"))
        .bearer_auth(&token)
        .json(&json!({ "location": "" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(json["user"]["location"], Value::Null);
    assert_eq!(json["user"]["bio"], "hello there");
}

#[tokio::test]
async fn test_update_profile_rejects_long_bio() {
    let server = TestServer::new().await;
    let (_, token) = server.create_user("alice").await;

    let response = server
        .client
        .patch(&server.url("/api/me/profile"))
        .bearer_auth(&token)
        .json(&json!({ "bio": "x".repeat(501) }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_update_image() {
    let server = TestServer::new().await;
    let (_, token) = server.create_user("alice").await;

    let response = server
        .client
        .put(&server.url("/api/me/image"))
        .bearer_auth(&token)
        .json(&json!({ "image_url": "https://img.example.com/new.png" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["user"]["image"], "https://img.example.com/new.png");
    assert!(json.get("warning").is_none());

    // Empty removes the image
    let json: Value = server
        .client
        .put(&server.url("/api/me/image"))
        .bearer_auth(&token)
        .json(&json!({ "image_url": null }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(json["user"]["image"], Value::Null);
}

#[tokio::test]
async fn test_update_image_keeps_local_change_when_provider_fails() {
    let server = TestServer::with_identity(Arc::new(FailingIdentityProvider)).await;
    let (alice, token) = server.create_user("alice").await;

    let response = server
        .client
        .put(&server.url("/api/me/image"))
        .bearer_auth(&token)
        .json(&json!({ "image_url": "https://img.example.com/new.png" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["success"], true);
    assert!(json["warning"].is_string());

    let stored = server.state.db.get_user(&alice.id).await.unwrap().unwrap();
    assert_eq!(stored.image.as_deref(), Some("https://img.example.com/new.png"));
}

#[tokio::test]
async fn test_sync_creates_then_reconciles() {
    let server = TestServer::new().await;
    let token = server.session_token("user_dana", "dana@fbi.gov", None);

    let response = server
        .post_json("/api/me/sync", &token, json!({}))
        .await;
    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["created"], true);
    assert_eq!(json["user"]["username"], "dana");
    assert_eq!(json["user"]["name"], "Test User");

    // Provider now reports a chosen username and a new address
    let token = server.session_token("user_dana", "dana@xfiles.gov", Some("scully"));
    let json: Value = server
        .post_json("/api/me/sync", &token, json!({}))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(json["created"], false);
    assert_eq!(json["user"]["username"], "scully");
    assert_eq!(json["user"]["email"], "dana@xfiles.gov");

    assert_eq!(server.state.db.count_users().await.unwrap(), 1);
}

#[tokio::test]
async fn test_sync_username_conflict_returns_409() {
    let server = TestServer::new().await;
    server.create_user("dana").await;
    let token = server.session_token("user_other", "dana@elsewhere.org", None);

    let response = server
        .post_json("/api/me/sync", &token, json!({}))
        .await;

    assert_eq!(response.status(), 409);
}

#[tokio::test]
async fn test_debug_users_dump() {
    let server = TestServer::new().await;
    server.create_user("alice").await;

    let json: Value = server
        .client
        .get(&server.url("/api/debug/users"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(json["total_users"], 1);
    assert_eq!(json["database_provider"], "sqlite");
    assert_eq!(json["user_samples"][0]["username"], "alice");
}

#[tokio::test]
async fn test_debug_users_hidden_when_disabled() {
    let server = TestServer::with_config(|config| config.debug.enabled = false).await;

    let response = server
        .client
        .get(&server.url("/api/debug/users"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
}
