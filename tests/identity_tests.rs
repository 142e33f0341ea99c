use std::collections::HashMap;
use std::net::SocketAddr;

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};

use cinefile::{
    error::AppError,
    models::{AuthState, Credentials, ExternalCredential},
    services::{AuthProvider, IdentityToolkitAuth},
};

const API_KEY: &str = "web-key";

fn rejected(code: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"error": {"code": 400, "message": code}})),
    )
}

/// Fake Identity Toolkit; `expiresIn` of 1s lets tests observe token expiry
async fn accounts(
    Path(method): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if params.get("key").map(String::as_str) != Some(API_KEY) {
        return rejected("API_KEY_INVALID");
    }

    match method.as_str() {
        "accounts:signInWithPassword" => {
            if body["password"] != "correct-horse" {
                return rejected("INVALID_LOGIN_CREDENTIALS");
            }
            (
                StatusCode::OK,
                Json(json!({
                    "localId": "uid-ada",
                    "email": body["email"],
                    "displayName": "Ada",
                    "idToken": "token-1",
                    "expiresIn": "1"
                })),
            )
        }
        "accounts:signUp" => {
            if body["email"] == "taken@example.com" {
                return rejected("EMAIL_EXISTS");
            }
            (
                StatusCode::OK,
                Json(json!({
                    "localId": "uid-new",
                    "email": body["email"],
                    "idToken": "token-2",
                    "expiresIn": "3600"
                })),
            )
        }
        "accounts:update" => (
            StatusCode::OK,
            Json(json!({"localId": "uid-new", "displayName": body["displayName"]})),
        ),
        "accounts:signInWithIdp" => {
            let post_body = body["postBody"].as_str().unwrap_or_default();
            if !post_body.contains("providerId=google.com") {
                return rejected("INVALID_IDP_RESPONSE");
            }
            (
                StatusCode::OK,
                Json(json!({
                    "localId": "uid-google",
                    "email": "g@example.com",
                    "displayName": "Grace",
                    "idToken": "token-3",
                    "expiresIn": "3600"
                })),
            )
        }
        _ => (StatusCode::NOT_FOUND, Json(json!({}))),
    }
}

async fn spawn_fake_identity() -> SocketAddr {
    let app = Router::new().route("/v1/*method", post(accounts));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn auth(addr: SocketAddr) -> IdentityToolkitAuth {
    IdentityToolkitAuth::new(API_KEY.to_string(), format!("http://{}/v1", addr))
}

#[tokio::test]
async fn test_sign_in_publishes_user() {
    let addr = spawn_fake_identity().await;
    let auth = auth(addr);
    let mut states = auth.subscribe();

    let user = auth
        .sign_in(&Credentials::new("ada@example.com", "correct-horse"))
        .await
        .unwrap();
    assert_eq!(user.id, "uid-ada");
    assert_eq!(user.display_name, "Ada");

    assert!(states.has_changed().unwrap());
    assert_eq!(*states.borrow_and_update(), AuthState::SignedIn(user));
}

#[tokio::test]
async fn test_wrong_password_is_auth_error() {
    let addr = spawn_fake_identity().await;
    let auth = auth(addr);

    let err = auth
        .sign_in(&Credentials::new("ada@example.com", "nope"))
        .await
        .unwrap_err();
    match err {
        AppError::Auth(message) => assert_eq!(message, "Invalid email or password"),
        other => panic!("expected auth error, got {:?}", other),
    }
    assert_eq!(auth.state(), AuthState::SignedOut);
}

#[tokio::test]
async fn test_sign_up_sets_display_name() {
    let addr = spawn_fake_identity().await;
    let auth = auth(addr);

    let user = auth
        .sign_up(&Credentials::new("new@example.com", "hunter22"), "Newcomer")
        .await
        .unwrap();
    assert_eq!(user.id, "uid-new");
    assert_eq!(user.display_name, "Newcomer");

    let err = auth
        .sign_up(&Credentials::new("taken@example.com", "hunter22"), "Dup")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Auth(_)));
}

#[tokio::test]
async fn test_external_provider_sign_in() {
    let addr = spawn_fake_identity().await;
    let auth = auth(addr);

    let user = auth
        .sign_in_with_external_provider(&ExternalCredential {
            provider_id: "google.com".to_string(),
            id_token: "google-id-token".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(user.id, "uid-google");
}

#[tokio::test]
async fn test_token_expiry_signs_out() {
    let addr = spawn_fake_identity().await;
    let auth = auth(addr);
    let mut states = auth.subscribe();

    auth.sign_in(&Credentials::new("ada@example.com", "correct-horse"))
        .await
        .unwrap();
    let _ = states.borrow_and_update();

    tokio::time::timeout(std::time::Duration::from_secs(3), states.changed())
        .await
        .expect("token never expired")
        .unwrap();
    assert_eq!(*states.borrow(), AuthState::SignedOut);
}

#[tokio::test]
async fn test_sign_out_disarms_expiry_timer() {
    let addr = spawn_fake_identity().await;
    let auth = auth(addr);

    auth.sign_in(&Credentials::new("ada@example.com", "correct-horse"))
        .await
        .unwrap();
    auth.sign_out().await.unwrap();
    let signed_in_again = auth
        .sign_in_with_external_provider(&ExternalCredential {
            provider_id: "google.com".to_string(),
            id_token: "t".to_string(),
        })
        .await
        .unwrap();

    // the first token's timer fires after 1s and must not sign Grace out
    tokio::time::sleep(std::time::Duration::from_millis(1300)).await;
    assert_eq!(auth.state(), AuthState::SignedIn(signed_in_again));
}
