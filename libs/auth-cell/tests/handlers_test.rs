use std::sync::Arc;

use assert_matches::assert_matches;
use axum::{
    extract::{Extension, State},
    http::{HeaderMap, HeaderValue},
};
use axum_extra::TypedHeader;
use headers::Authorization;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use auth_cell::handlers::{get_profile, validate_token, verify_token};
use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

fn create_test_config() -> AppConfig {
    TestConfig::default().to_app_config()
}

fn create_auth_header(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        "authorization",
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );
    headers
}

#[tokio::test]
async fn validate_returns_token_subject() {
    let config = Arc::new(create_test_config());
    let user = TestUser::default();
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));

    let response = tokio_test::assert_ok!(validate_token(State(config), create_auth_header(&token)).await).0;

    assert!(response.valid);
    assert_eq!(response.user_id, user.id.to_string());
    assert_eq!(response.email, Some(user.email));
    assert_eq!(response.role, Some(user.role));
}

#[tokio::test]
async fn validate_rejects_missing_header() {
    let config = Arc::new(create_test_config());

    let result = validate_token(State(config), HeaderMap::new()).await;

    assert_matches!(result, Err(AppError::Auth(msg)) if msg == "Missing authorization header");
}

#[tokio::test]
async fn validate_rejects_non_bearer_header() {
    let config = Arc::new(create_test_config());

    for value in ["Invalid Token", "sometoken", "bearer lowercase"] {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static(value));

        let result = validate_token(State(config.clone()), headers).await;
        assert_matches!(result, Err(AppError::Auth(msg)) if msg == "Invalid authorization header format");
    }
}

#[tokio::test]
async fn validate_rejects_bad_tokens() {
    let config = Arc::new(create_test_config());
    let user = TestUser::default();

    for token in [
        JwtTestUtils::create_expired_token(&user, &config.supabase_jwt_secret),
        JwtTestUtils::create_invalid_signature_token(&user),
        JwtTestUtils::create_malformed_token(),
    ] {
        let result = validate_token(State(config.clone()), create_auth_header(&token)).await;
        assert_matches!(result, Err(AppError::Auth(_)));
    }
}

#[tokio::test]
async fn verify_answers_false_for_bad_tokens() {
    let config = Arc::new(create_test_config());
    let user = TestUser::admin(9, "admin@medflow.com");

    let valid = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(1));
    let response = verify_token(State(config.clone()), create_auth_header(&valid)).await.unwrap().0;
    assert_eq!(response["valid"], true);

    let expired = JwtTestUtils::create_expired_token(&user, &config.supabase_jwt_secret);
    let response = verify_token(State(config), create_auth_header(&expired)).await.unwrap().0;
    assert_eq!(response["valid"], false);
}

#[tokio::test]
async fn profile_returns_the_doctor_row() {
    let mock_server = MockServer::start().await;
    let config = AppConfig {
        supabase_url: mock_server.uri(),
        ..create_test_config()
    };
    let user = TestUser::doctor(12, "ana@medflow.com");
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", "eq.12"))
        .and(header("Authorization", format!("Bearer {}", token)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            MockSupabaseResponses::doctor_response(12)
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let doctor = get_profile(
        State(Arc::new(config)),
        TypedHeader(Authorization::bearer(&token).unwrap()),
        Extension(user.to_user()),
    )
    .await
    .unwrap()
    .0;

    assert_eq!(doctor.id, 12);
    assert!(doctor.is_active);
}

#[tokio::test]
async fn profile_of_unknown_doctor_is_not_found() {
    let mock_server = MockServer::start().await;
    let config = AppConfig {
        supabase_url: mock_server.uri(),
        ..create_test_config()
    };
    let user = TestUser::doctor(13, "ghost@medflow.com");

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&mock_server)
        .await;

    let result = get_profile(
        State(Arc::new(config)),
        TypedHeader(Authorization::bearer("token").unwrap()),
        Extension(user.to_user()),
    )
    .await;

    assert_matches!(result, Err(AppError::NotFound(_)));
}

#[tokio::test]
async fn profile_upstream_failure_is_external_service_error() {
    let mock_server = MockServer::start().await;
    let config = AppConfig {
        supabase_url: mock_server.uri(),
        ..create_test_config()
    };

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(500).set_body_json(
            MockSupabaseResponses::error_response("Internal server error", "INTERNAL_ERROR"),
        ))
        .mount(&mock_server)
        .await;

    let result = get_profile(
        State(Arc::new(config)),
        TypedHeader(Authorization::bearer("token").unwrap()),
        Extension(TestUser::default().to_user()),
    )
    .await;

    assert_matches!(result, Err(AppError::ExternalService(_)));
}

#[tokio::test]
async fn profile_requires_numeric_subject() {
    let config = Arc::new(create_test_config());
    let mut user = TestUser::default().to_user();
    user.id = "6f1c0e9a-uuid".to_string();

    let result = get_profile(
        State(config),
        TypedHeader(Authorization::bearer("token").unwrap()),
        Extension(user),
    )
    .await;

    assert_matches!(result, Err(AppError::BadRequest(_)));
}
