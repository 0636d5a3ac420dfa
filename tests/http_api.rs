//! Drives the axum router directly via `tower::ServiceExt::oneshot`,
//! the same way `scarb-test-support::simple_http_server`'s consumers
//! exercise a router without binding a real socket.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use confd::encryption::EncryptionService;
use confd::http::{router, AppState};
use tower::ServiceExt;

fn empty_state() -> Arc<AppState> {
    Arc::new(AppState::new(HashMap::new(), Arc::new(EncryptionService::new())))
}

#[tokio::test]
async fn encrypt_without_a_key_returns_no_key() {
    let app = router(empty_state());
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/encrypt")
                .body(Body::from("hello"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn encrypt_then_decrypt_round_trips_over_http() {
    let encryption = Arc::new(EncryptionService::new());
    encryption.install_key("a passphrase nobody will guess").unwrap();
    let state = Arc::new(AppState::new(HashMap::new(), encryption));
    let app = router(state);

    let encrypt_response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/encrypt")
                .body(Body::from("hello"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(encrypt_response.status(), StatusCode::OK);
    let ciphertext = hyper::body::to_bytes(encrypt_response.into_body())
        .await
        .unwrap();
    let ciphertext = String::from_utf8(ciphertext.to_vec()).unwrap();
    assert_ne!(ciphertext, "hello");

    let decrypt_response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/decrypt")
                .body(Body::from(ciphertext))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(decrypt_response.status(), StatusCode::OK);
    let plaintext = hyper::body::to_bytes(decrypt_response.into_body())
        .await
        .unwrap();
    assert_eq!(plaintext, "hello".as_bytes());
}

#[tokio::test]
async fn status_reports_ok_once_a_key_is_installed() {
    let encryption = Arc::new(EncryptionService::new());
    encryption.install_key("a passphrase").unwrap();
    let state = Arc::new(AppState::new(HashMap::new(), encryption));
    let app = router(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/encrypt/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unknown_application_is_no_such_repository() {
    let app = router(empty_state());
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/app/default")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
