//! # HTTP Route Tests

use super::*;
use crate::handlers::chat::PurgeResponse;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use lib_core::dto::{Author, Message};
use tower::ServiceExt;

async fn post_delete_chat(app: Router) -> (StatusCode, PurgeResponse) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/delete-chat")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_delete_chat_purges_store() {
    // Arrange
    let store = setup_store().await;
    for text in ["a", "b", "c"] {
        store
            .insert_message(&Message::new(text, Author::new("u", "user1")))
            .await
            .unwrap();
    }
    let app = test_app(test_state(store.clone(), "public"));

    // Act
    let (status, body) = post_delete_chat(app).await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert!(body.success);
    assert_eq!(store.count_messages().await.unwrap(), 0);
}

#[tokio::test]
async fn test_delete_chat_on_empty_store() {
    let store = setup_store().await;
    let app = test_app(test_state(store, "public"));

    let (status, body) = post_delete_chat(app).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.success);
}

#[tokio::test]
async fn test_delete_chat_storage_failure() {
    // Arrange
    let store = setup_store().await;
    store.pool().close().await;
    let app = test_app(test_state(store, "public"));

    // Act
    let (status, body) = post_delete_chat(app).await;

    // Assert
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body.success);
}

#[tokio::test]
async fn test_delete_chat_rejects_get() {
    let app = test_app(test_state(setup_store().await, "public"));

    let response = app
        .oneshot(Request::builder().uri("/delete-chat").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_health() {
    let app = test_app(test_state(setup_store().await, "public"));

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"OK");
}

#[tokio::test]
async fn test_root_serves_chat_page() {
    // Arrange
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("chat.html"), "<html>chat</html>").unwrap();
    std::fs::write(dir.path().join("app.js"), "console.log('hi')").unwrap();
    let static_dir = dir.path().to_str().unwrap();
    let state = test_state(setup_store().await, static_dir);

    // Act
    let page = test_app(state.clone())
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let script = test_app(state.clone())
        .oneshot(Request::builder().uri("/app.js").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let missing = test_app(state)
        .oneshot(Request::builder().uri("/nope.css").body(Body::empty()).unwrap())
        .await
        .unwrap();

    // Assert
    assert_eq!(page.status(), StatusCode::OK);
    let body = axum::body::to_bytes(page.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"<html>chat</html>");
    assert_eq!(script.status(), StatusCode::OK);
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bundled_chat_page_clears_log_on_clear_chat() {
    // Arrange
    let static_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/../../../public");
    let state = test_state(setup_store().await, static_dir);

    // Act
    let page = test_app(state)
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    // Assert
    assert_eq!(page.status(), StatusCode::OK);
    let body = axum::body::to_bytes(page.into_body(), usize::MAX).await.unwrap();
    let html = String::from_utf8(body.to_vec()).unwrap();
    let clear_chat = html.find("case 'clearChat':").expect("clearChat handler");
    let handler = &html[clear_chat..];
    let handler = &handler[..handler.find("break;").unwrap()];
    assert!(handler.contains("log.replaceChildren()"));
}
