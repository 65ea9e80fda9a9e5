mod common;

use common::{client_for, mount_login, viewer, SESSION_TOKEN};
use serde_json::json;
use social_client::ClientError;
use social_common::models::RegisterRequest;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_check_session_anonymous_is_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/me"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized\n"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let user = client.check_session().await.unwrap();

    assert!(user.is_none());
    assert!(!client.session.is_authenticated());
    assert!(client.session.error().await.is_none());
}

#[tokio::test]
async fn test_check_session_restores_identity() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(viewer()))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let user = client.check_session().await.unwrap().unwrap();

    assert_eq!(user.id, "5");
    assert!(client.session.is_authenticated());
}

#[tokio::test]
async fn test_check_session_server_error_is_recorded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/me"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": "database down" })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = client.check_session().await;

    assert!(matches!(result, Err(ClientError::Api(_))));
    assert!(!client.session.is_authenticated());
    assert_eq!(client.session.error().await.as_deref(), Some("database down"));
}

#[tokio::test]
async fn test_login_sets_identity_and_cookie() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    let client = client_for(&server);
    let mut identity = client.watch_session();

    let user = client.login("ada@example.com", "secret").await.unwrap();

    assert_eq!(user.display_name(), "Ada Lovelace");
    assert!(identity.has_changed().unwrap());
    assert_eq!(identity.borrow_and_update().as_ref().map(|u| u.id.as_str()), Some("5"));
    assert_eq!(
        client.api.cookie("social_network_session").as_deref(),
        Some(SESSION_TOKEN)
    );
}

#[tokio::test]
async fn test_login_sends_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/login"))
        .and(body_json(json!({ "email": "ada@example.com", "password": "secret" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(viewer()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    tokio_test::assert_ok!(client.login("ada@example.com", "secret").await);
}

#[tokio::test]
async fn test_login_invalid_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "error": "Invalid email or password" })),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.login("ada@example.com", "wrong").await.unwrap_err();

    assert_eq!(
        err,
        ClientError::InvalidCredentials("Invalid email or password".into())
    );
    assert!(!client.session.is_authenticated());
    assert_eq!(
        client.session.error().await.as_deref(),
        Some("Invalid email or password")
    );
}

#[tokio::test]
async fn test_login_without_error_body_defaults_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/login"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.login("ada@example.com", "x").await.unwrap_err();

    assert_eq!(err, ClientError::InvalidCredentials("Login failed".into()));
}

#[tokio::test]
async fn test_login_empty_body_falls_back_to_me() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/login"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(viewer()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let user = client.login("ada@example.com", "secret").await.unwrap();

    assert_eq!(user.id, "5");
}

#[tokio::test]
async fn test_logout_clears_identity_even_when_backend_fails() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/logout"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.login("ada@example.com", "secret").await.unwrap();
    assert!(client.session.is_authenticated());

    client.logout().await;

    assert!(!client.session.is_authenticated());
    assert!(client.session.current_user().is_none());
    assert!(client.session.error().await.is_none());
}

#[tokio::test]
async fn test_logout_when_backend_unreachable() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    let client = client_for(&server);
    client.login("ada@example.com", "secret").await.unwrap();

    drop(server);
    client.logout().await;

    assert!(!client.session.is_authenticated());
}

#[tokio::test]
async fn test_register_failure_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/register"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({ "error": "Email already registered" })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let request = RegisterRequest {
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        nickname: None,
        email: "ada@example.com".into(),
        password: "secret".into(),
        date_of_birth: "1815-12-10".into(),
        about_me: None,
    };

    let err = client.session.register(&request).await.unwrap_err();
    assert_eq!(err.user_message(), "Email already registered");
    assert!(!client.session.is_authenticated());
}
