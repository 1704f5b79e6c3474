//! E2E tests for posts, comments and likes

mod common;

use common::TestServer;
use serde_json::{Value, json};

#[tokio::test]
async fn test_create_and_get_post() {
    let server = TestServer::new().await;
    let (alice, token) = server.create_user("alice").await;

    let response = server
        .post_json("/api/posts", &token, json!({ "content": "hello world" }))
        .await;
    assert_eq!(response.status(), 201);

    let json: Value = response.json().await.unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["post"]["content"], "hello world");
    assert_eq!(json["post"]["author"]["id"], alice.id.as_str());
    assert_eq!(json["post"]["counts"]["likes"], 0);
    assert_eq!(json["mentions"]["outcome"]["status"], "no_mentions");

    let id = json["post"]["id"].as_str().unwrap();
    let response = server
        .client
        .get(&server.url(&format!("/api/posts/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let post: Value = response.json().await.unwrap();
    assert_eq!(post["id"], id);
    assert_eq!(post["author"]["username"], "alice");
}

#[tokio::test]
async fn test_create_response_matches_stored_post() {
    let server = TestServer::new().await;
    let (_, alice_token) = server.create_user("alice").await;
    server.create_user("bob").await;

    let created: Value = server
        .post_json("/api/posts", &alice_token, json!({ "content": "hi @bob" }))
        .await
        .json()
        .await
        .unwrap();
    let created = &created["post"];
    let id = created["id"].as_str().unwrap();

    let stored: Value = server
        .client
        .get(&server.url(&format!("/api/posts/{}", id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(created["content"], stored["content"]);
    assert_eq!(created["author"], stored["author"]);
    assert_eq!(created["mentions"], stored["mentions"]);
    assert_eq!(created["counts"], stored["counts"]);
    assert_eq!(created["mentions"][0]["username"], "bob");
}

#[tokio::test]
async fn test_create_post_requires_content_or_image() {
    let server = TestServer::new().await;
    let (_, token) = server.create_user("alice").await;

    let response = server
        .post_json("/api/posts", &token, json!({ "content": "   " }))
        .await;
    assert_eq!(response.status(), 400);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["success"], false);

    // An image alone is enough
    let response = server
        .post_json(
            "/api/posts",
            &token,
            json!({ "image": "https://img.example.com/cat.png" }),
        )
        .await;
    assert_eq!(response.status(), 201);
}

#[tokio::test]
async fn test_create_post_requires_authentication() {
    let server = TestServer::new().await;

    let response = server
        .client
        .post(&server.url("/api/posts"))
        .json(&json!({ "content": "hello" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_feed_is_newest_first_and_limited() {
    let server = TestServer::new().await;
    let (_, token) = server.create_user("alice").await;

    // Ids are time-ordered, so keep creations in distinct milliseconds
    let mut ids = Vec::new();
    for content in ["first", "second", "third"] {
        ids.push(server.create_post(&token, content).await);
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    let (first, second, third) = (&ids[0], &ids[1], &ids[2]);

    let response = server
        .client
        .get(&server.url("/api/posts?limit=2"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let posts: Vec<Value> = response.json().await.unwrap();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0]["id"], third.as_str());
    assert_eq!(posts[1]["id"], second.as_str());

    let response = server
        .client
        .get(&server.url(&format!("/api/posts?limit=2&max_id={}", second)))
        .send()
        .await
        .unwrap();
    let posts: Vec<Value> = response.json().await.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["id"], first.as_str());
}

#[tokio::test]
async fn test_get_missing_post_returns_404() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(&server.url("/api/posts/01NOSUCHPOST"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_only_author_can_delete_post() {
    let server = TestServer::new().await;
    let (_, alice_token) = server.create_user("alice").await;
    let (_, bob_token) = server.create_user("bob").await;
    let post_id = server.create_post(&alice_token, "mine").await;

    let response = server
        .client
        .delete(&server.url(&format!("/api/posts/{}", post_id)))
        .bearer_auth(&bob_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    let response = server
        .client
        .delete(&server.url(&format!("/api/posts/{}", post_id)))
        .bearer_auth(&alice_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = server
        .client
        .delete(&server.url(&format!("/api/posts/{}", post_id)))
        .bearer_auth(&alice_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_toggle_like_twice_restores_state() {
    let server = TestServer::new().await;
    let (_, alice_token) = server.create_user("alice").await;
    let (bob, bob_token) = server.create_user("bob").await;
    let post_id = server.create_post(&alice_token, "like me").await;
    let path = format!("/api/posts/{}/like", post_id);

    let json: Value = server
        .post_json(&path, &bob_token, json!({}))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(json["liked"], true);
    assert_eq!(json["likes_count"], 1);

    let post: Value = server
        .client
        .get(&server.url(&format!("/api/posts/{}", post_id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(post["likes"], json!([bob.id]));

    let json: Value = server
        .post_json(&path, &bob_token, json!({}))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(json["liked"], false);
    assert_eq!(json["likes_count"], 0);

    // One notification for the first like only
    let notifications: Vec<Value> = server
        .get_authed("/api/notifications", &alice_token)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0]["type"], "LIKE");
    assert_eq!(notifications[0]["creator"]["username"], "bob");
}

#[tokio::test]
async fn test_liking_own_post_does_not_notify() {
    let server = TestServer::new().await;
    let (_, token) = server.create_user("alice").await;
    let post_id = server.create_post(&token, "self love").await;

    let response = server
        .post_json(&format!("/api/posts/{}/like", post_id), &token, json!({}))
        .await;
    assert_eq!(response.status(), 200);

    let count: Value = server
        .get_authed("/api/notifications/unread_count", &token)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(count["count"], 0);
}

#[tokio::test]
async fn test_like_missing_post_returns_404() {
    let server = TestServer::new().await;
    let (_, token) = server.create_user("alice").await;

    let response = server
        .post_json("/api/posts/01NOSUCHPOST/like", &token, json!({}))
        .await;

    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_comment_appears_on_post_and_notifies_author() {
    let server = TestServer::new().await;
    let (_, alice_token) = server.create_user("alice").await;
    let (_, bob_token) = server.create_user("bob").await;
    let post_id = server.create_post(&alice_token, "thoughts?").await;

    let response = server
        .post_json(
            &format!("/api/posts/{}/comments", post_id),
            &bob_token,
            json!({ "content": "nice one" }),
        )
        .await;
    assert_eq!(response.status(), 201);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["comment"]["content"], "nice one");
    assert_eq!(json["comment"]["author"]["username"], "bob");

    let post: Value = server
        .client
        .get(&server.url(&format!("/api/posts/{}", post_id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(post["counts"]["comments"], 1);
    assert_eq!(post["comments"][0]["content"], "nice one");

    let notifications: Vec<Value> = server
        .get_authed("/api/notifications", &alice_token)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0]["type"], "COMMENT");
    assert_eq!(notifications[0]["comment"]["content"], "nice one");
}

#[tokio::test]
async fn test_blank_comment_is_rejected() {
    let server = TestServer::new().await;
    let (_, token) = server.create_user("alice").await;
    let post_id = server.create_post(&token, "hello").await;

    let response = server
        .post_json(
            &format!("/api/posts/{}/comments", post_id),
            &token,
            json!({ "content": "  " }),
        )
        .await;

    assert_eq!(response.status(), 400);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["error"], "Content is required");
}
