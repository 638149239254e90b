//! Messaging flows through the full server, including edit history capture.

use chrono::TimeDelta;
use reqwest::StatusCode;
use serde_json::{json, Value};

use chat_gate::config::GateConfig;

mod common;

use common::start_server;

#[tokio::test]
async fn test_edit_history_flow() {
    let server = start_server(GateConfig::default()).await;

    let res = server.send_message("alice", "admin", "bob", "hello").await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let sent: Value = res.json().await.unwrap();
    let id = sent["id"].as_str().unwrap().to_string();
    assert_eq!(sent["edited"], false);

    server.clock.advance(TimeDelta::seconds(5));
    let res = server.edit_as("alice", "admin", &id, "hello, bob").await;
    assert_eq!(res.status(), StatusCode::OK);
    let edited: Value = res.json().await.unwrap();
    assert_eq!(edited["body"], "hello, bob");
    assert_eq!(edited["edited"], true);
    assert_eq!(edited["edited_by"], "alice");

    // Same body again: nothing new to capture.
    let res = server.edit_as("alice", "admin", &id, "hello, bob").await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = server.edit_as("bob", "moderator", &id, "hello, Bob").await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = server
        .get_as("bob", "moderator", &format!("/api/messages/{id}/history"))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let history: Vec<Value> = res.json().await.unwrap();
    let previous: Vec<&str> = history
        .iter()
        .map(|e| e["previous_body"].as_str().unwrap())
        .collect();
    assert_eq!(previous, vec!["hello", "hello, bob"]);
}

#[tokio::test]
async fn test_outsider_cannot_edit_or_read_history() {
    let server = start_server(GateConfig::default()).await;

    let sent: Value = server
        .send_message("alice", "admin", "bob", "private")
        .await
        .json()
        .await
        .unwrap();
    let id = sent["id"].as_str().unwrap().to_string();

    let res = server.edit_as("mallory", "admin", &id, "changed").await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = server
        .get_as("mallory", "admin", &format!("/api/messages/{id}/history"))
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_receiver_sees_unread_and_notification() {
    let server = start_server(GateConfig::default()).await;

    let sent: Value = server
        .send_message("alice", "admin", "bob", "ping")
        .await
        .json()
        .await
        .unwrap();
    let id = sent["id"].as_str().unwrap().to_string();

    let unread: Vec<Value> = server
        .get_as("bob", "moderator", "/api/messages/unread")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(unread.len(), 1);

    let notifications: Vec<Value> = server
        .get_as("bob", "moderator", "/api/notifications")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0]["message_id"], id.as_str());

    let res = server
        .client
        .put(server.url(&format!("/api/messages/{id}/read")))
        .header("x-user-id", "bob")
        .header("x-user-role", "moderator")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let unread: Vec<Value> = server
        .get_as("bob", "moderator", "/api/messages/unread")
        .await
        .json()
        .await
        .unwrap();
    assert!(unread.is_empty());

    let notifications: Vec<Value> = server
        .get_as("bob", "moderator", "/api/notifications")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(notifications[0]["is_read"], true);
}

#[tokio::test]
async fn test_delete_removes_message() {
    let server = start_server(GateConfig::default()).await;

    let sent: Value = server
        .send_message("alice", "admin", "bob", "oops")
        .await
        .json()
        .await
        .unwrap();
    let id = sent["id"].as_str().unwrap().to_string();

    let res = server
        .client
        .delete(server.url(&format!("/api/messages/{id}")))
        .header("x-user-id", "alice")
        .header("x-user-role", "admin")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = server.edit_as("alice", "admin", &id, "again").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_conversation_thread_and_membership() {
    let server = start_server(GateConfig::default()).await;

    let res = server
        .post_as("alice", "admin", "/api/conversations", json!({ "participants": ["bob"] }))
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let conversation: Value = res.json().await.unwrap();
    let conversation_id = conversation["id"].as_str().unwrap().to_string();
    assert_eq!(conversation["participants"], json!(["alice", "bob"]));

    let res = server
        .post_as("alice", "admin", "/api/conversations", json!({ "participants": [] }))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let root: Value = server
        .post_as(
            "alice",
            "admin",
            "/api/messages",
            json!({ "conversation_id": conversation_id, "body": "root" }),
        )
        .await
        .json()
        .await
        .unwrap();

    server.clock.advance(TimeDelta::seconds(1));
    let res = server
        .post_as(
            "bob",
            "moderator",
            "/api/messages",
            json!({ "conversation_id": conversation_id, "parent_message": root["id"], "body": "reply" }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = server
        .post_as(
            "mallory",
            "admin",
            "/api/messages",
            json!({ "conversation_id": conversation_id, "body": "intrude" }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let thread: Vec<Value> = server
        .get_as("bob", "moderator", &format!("/api/conversations/{conversation_id}/thread"))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(thread.len(), 1);
    assert_eq!(thread[0]["body"], "root");
    assert_eq!(thread[0]["replies"][0]["body"], "reply");

    let res = server
        .get_as("mallory", "admin", &format!("/api/conversations/{conversation_id}"))
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let mine: Vec<Value> = server
        .get_as("bob", "moderator", "/api/conversations")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
    let theirs: Vec<Value> = server
        .get_as("mallory", "admin", "/api/conversations")
        .await
        .json()
        .await
        .unwrap();
    assert!(theirs.is_empty());
}

#[tokio::test]
async fn test_message_listing_filters_and_pages() {
    let server = start_server(GateConfig::default()).await;

    let first: Value = server
        .send_message("alice", "admin", "bob", "one")
        .await
        .json()
        .await
        .unwrap();
    let conversation_id = first["conversation_id"].as_str().unwrap().to_string();
    for body in ["two", "three"] {
        server.clock.advance(TimeDelta::seconds(1));
        let res = server
            .post_as(
                "bob",
                "moderator",
                "/api/messages",
                json!({ "conversation_id": conversation_id, "body": body }),
            )
            .await;
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    let page: Value = server
        .get_as("alice", "admin", "/api/messages?sender=bob&page=2&page_size=1")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(page["count"], 2);
    assert_eq!(page["results"][0]["body"], "three");

    let res = server
        .get_as("alice", "admin", "/api/messages?page=9")
        .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let outsider: Value = server
        .get_as("mallory", "admin", "/api/messages")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(outsider["count"], 0);
}

#[tokio::test]
async fn test_conversation_creation_is_not_rate_limited() {
    let mut config = GateConfig::default();
    config.rate_limit.count = 1;
    let server = start_server(config).await;

    for _ in 0..3 {
        let res = server
            .post_as("alice", "admin", "/api/conversations", json!({ "participants": ["bob"] }))
            .await;
        assert_eq!(res.status(), StatusCode::CREATED);
    }
}
