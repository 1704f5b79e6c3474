//! E2E tests for @mention fan-out

mod common;

use common::TestServer;
use serde_json::{Value, json};

#[tokio::test]
async fn test_post_mentions_notify_each_user_once() {
    let server = TestServer::new().await;
    let (alice, alice_token) = server.create_user("alice").await;
    let (_, bob_token) = server.create_user("bob").await;
    let (_, carol_token) = server.create_user("carol").await;

    let response = server
        .post_json(
            "/api/posts",
            &alice_token,
            json!({ "content": "hey @bob and @carol, cc @bob" }),
        )
        .await;
    assert_eq!(response.status(), 201);

    let json: Value = response.json().await.unwrap();
    let outcome = &json["mentions"]["outcome"];
    assert_eq!(outcome["status"], "created");
    assert_eq!(outcome["mentions"], 2);
    assert_eq!(outcome["notifications"], 2);
    assert_eq!(outcome["duplicate_handles"], 1);
    assert_eq!(
        json["mentions"]["message"],
        "Created 2 mentions and notifications"
    );

    let mut mentioned: Vec<String> = json["post"]["mentions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|user| user["username"].as_str().unwrap().to_string())
        .collect();
    mentioned.sort();
    assert_eq!(mentioned, vec!["bob", "carol"]);

    for token in [&bob_token, &carol_token] {
        let notifications: Vec<Value> = server
            .get_authed("/api/notifications", token)
            .await
            .json()
            .await
            .unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0]["type"], "MENTION");
        assert_eq!(notifications[0]["creator"]["id"], alice.id.as_str());
        assert_eq!(notifications[0]["post"]["id"], json["post"]["id"]);
    }

    // The mentioner gets nothing
    let count: Value = server
        .get_authed("/api/notifications/unread_count", &alice_token)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(count["count"], 0);
}

#[tokio::test]
async fn test_self_mention_creates_nothing() {
    let server = TestServer::new().await;
    let (_, token) = server.create_user("alice").await;

    let json: Value = server
        .post_json("/api/posts", &token, json!({ "content": "note to @alice" }))
        .await
        .json()
        .await
        .unwrap();

    let outcome = &json["mentions"]["outcome"];
    assert_eq!(outcome["status"], "created");
    assert_eq!(outcome["mentions"], 0);
    assert_eq!(json["post"]["mentions"], json!([]));
}

#[tokio::test]
async fn test_unknown_handles_report_no_valid_users() {
    let server = TestServer::new().await;
    let (_, token) = server.create_user("alice").await;

    let json: Value = server
        .post_json("/api/posts", &token, json!({ "content": "hi @nobody" }))
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(json["mentions"]["outcome"]["status"], "no_valid_users");
    assert_eq!(json["mentions"]["message"], "No valid users mentioned");
}

#[tokio::test]
async fn test_handles_match_case_sensitively() {
    let server = TestServer::new().await;
    let (_, token) = server.create_user("alice").await;
    server.create_user("bob").await;

    let json: Value = server
        .post_json("/api/posts", &token, json!({ "content": "hi @Bob" }))
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(json["mentions"]["outcome"]["status"], "no_valid_users");
}

#[tokio::test]
async fn test_comment_mentions_reference_the_comment() {
    let server = TestServer::new().await;
    let (_, alice_token) = server.create_user("alice").await;
    let (_, bob_token) = server.create_user("bob").await;
    let (_, carol_token) = server.create_user("carol").await;
    let post_id = server.create_post(&alice_token, "photo dump").await;

    let json: Value = server
        .post_json(
            &format!("/api/posts/{}/comments", post_id),
            &bob_token,
            json!({ "content": "@carol look at this" }),
        )
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(json["mentions"]["outcome"]["mentions"], 1);
    let comment_id = json["comment"]["id"].as_str().unwrap();

    let notifications: Vec<Value> = server
        .get_authed("/api/notifications", &carol_token)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0]["type"], "MENTION");
    assert_eq!(notifications[0]["comment"]["id"], comment_id);
    assert_eq!(notifications[0]["post"]["id"], post_id.as_str());

    // Comment mentions are not post mentions
    let post: Value = server
        .client
        .get(&server.url(&format!("/api/posts/{}", post_id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(post["mentions"], json!([]));
}

#[tokio::test]
async fn test_process_mentions_endpoint() {
    let server = TestServer::new().await;
    let (_, alice_token) = server.create_user("alice").await;
    let (_, bob_token) = server.create_user("bob").await;
    let post_id = server.create_post(&alice_token, "draft").await;

    let response = server
        .post_json(
            "/api/mentions",
            &alice_token,
            json!({ "content": "thanks @bob", "post_id": post_id }),
        )
        .await;
    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["outcome"]["mentions"], 1);

    let count: Value = server
        .get_authed("/api/notifications/unread_count", &bob_token)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(count["count"], 1);
}

#[tokio::test]
async fn test_process_mentions_rejects_blank_content() {
    let server = TestServer::new().await;
    let (_, token) = server.create_user("alice").await;

    let response = server
        .post_json("/api/mentions", &token, json!({ "content": "  " }))
        .await;

    assert_eq!(response.status(), 400);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["error"], "No content provided");
}

#[tokio::test]
async fn test_process_mentions_requires_authorship() {
    let server = TestServer::new().await;
    let (_, alice_token) = server.create_user("alice").await;
    let (_, bob_token) = server.create_user("bob").await;
    server.create_user("carol").await;
    let post_id = server.create_post(&alice_token, "alice's post").await;

    let response = server
        .post_json(
            "/api/mentions",
            &bob_token,
            json!({ "content": "@carol", "post_id": post_id }),
        )
        .await;
    assert_eq!(response.status(), 403);

    let response = server
        .post_json(
            "/api/mentions",
            &bob_token,
            json!({ "content": "@carol", "post_id": "01NOSUCHPOST" }),
        )
        .await;
    assert_eq!(response.status(), 404);
}
