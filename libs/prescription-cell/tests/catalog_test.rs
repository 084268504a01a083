use std::sync::Arc;

use assert_matches::assert_matches;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{body_json, body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use prescription_cell::models::*;
use prescription_cell::router::{cid_routes, medicine_routes};
use prescription_cell::services::cid::CidService;
use prescription_cell::services::medicine::MedicineService;
use shared_config::AppConfig;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

const TOKEN: &str = "user-token";

fn config_for(server: &MockServer) -> AppConfig {
    AppConfig {
        supabase_url: server.uri(),
        ..TestConfig::default().to_app_config()
    }
}

#[tokio::test]
async fn medicine_search_matches_name_or_ingredient() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/medicines"))
        .and(query_param("is_active", "eq.true"))
        .and(query_param("or", "(name.ilike.*dipirona*,active_ingredient.ilike.*dipirona*)"))
        .and(query_param("order", "name.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::medicine_response(2, "Dipirona")
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let service = MedicineService::new(&config_for(&server));
    let medicines = service
        .list_medicines(SearchQuery { search: Some("dipirona".to_string()) }, TOKEN)
        .await
        .unwrap();

    assert_eq!(medicines.len(), 1);
    assert_eq!(medicines[0].name, "Dipirona");
    assert_eq!(medicines[0].dosage.as_deref(), Some("500mg"));
}

#[tokio::test]
async fn blank_medicine_name_is_rejected_without_insert() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/medicines"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let request = CreateMedicineRequest {
        name: "   ".to_string(),
        active_ingredient: None,
        dosage: None,
        form: None,
        manufacturer: None,
        instructions: None,
    };
    let result = MedicineService::new(&config_for(&server)).create_medicine(request, TOKEN).await;

    assert_matches!(result, Err(PrescriptionError::ValidationError(_)));
}

#[tokio::test]
async fn medicine_update_sends_only_given_fields() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/medicines"))
        .and(query_param("id", "eq.2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::medicine_response(2, "Dipirona")
        ])))
        .mount(&server)
        .await;

    let mut updated = MockSupabaseResponses::medicine_response(2, "Dipirona");
    updated["dosage"] = json!("1g");
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/medicines"))
        .and(query_param("id", "eq.2"))
        .and(body_partial_json(json!({ "dosage": "1g" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([updated])))
        .expect(1)
        .mount(&server)
        .await;

    let request = UpdateMedicineRequest {
        dosage: Some("1g".to_string()),
        ..Default::default()
    };
    let medicine = MedicineService::new(&config_for(&server))
        .update_medicine(2, request, TOKEN)
        .await
        .unwrap();

    assert_eq!(medicine.dosage.as_deref(), Some("1g"));
}

#[tokio::test]
async fn missing_medicine_is_reported_by_id() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/medicines"))
        .and(query_param("id", "in.(2,9)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 2 }])))
        .expect(1)
        .mount(&server)
        .await;

    let result = MedicineService::new(&config_for(&server))
        .ensure_exist(&[9, 2, 2], TOKEN)
        .await;

    assert_eq!(result, Err(PrescriptionError::MedicineNotFound(9)));
}

#[tokio::test]
async fn cid_code_is_upper_cased_on_create() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/cids"))
        .and(query_param("code", "eq.M54.5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/cids"))
        .and(body_partial_json(json!({ "code": "M54.5", "is_active": true })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::cid_response(4, "M54.5")
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let request = CreateCidRequest {
        code: " m54.5".to_string(),
        description: "Dor lombar baixa".to_string(),
        category: None,
    };
    let cid = CidService::new(&config_for(&server)).create_cid(request, TOKEN).await.unwrap();

    assert_eq!(cid.id, 4);
    assert_eq!(cid.code, "M54.5");
}

#[tokio::test]
async fn duplicate_cid_code_conflicts() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/cids"))
        .and(query_param("code", "eq.M54.5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 4 }])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/cids"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let request = CreateCidRequest {
        code: "M54.5".to_string(),
        description: "Dor lombar baixa".to_string(),
        category: None,
    };
    let result = CidService::new(&config_for(&server)).create_cid(request, TOKEN).await;

    assert_matches!(result, Err(PrescriptionError::CidCodeExists { ref code }) if code == "M54.5");
}

#[tokio::test]
async fn set_medicines_replaces_links() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/cids"))
        .and(query_param("id", "eq.4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::cid_response(4, "M54.5")
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/medicines"))
        .and(query_param("id", "in.(2,3)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 2 }, { "id": 3 }])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/cid_medicines"))
        .and(query_param("cid_id", "eq.4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/cid_medicines"))
        .and(body_json(json!([
            { "cid_id": 4, "medicine_id": 2 },
            { "cid_id": 4, "medicine_id": 3 }
        ])))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/cid_medicines"))
        .and(query_param("cid_id", "eq.4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "medicine": MockSupabaseResponses::medicine_response(3, "Ibuprofeno") },
            { "medicine": MockSupabaseResponses::medicine_response(2, "Dipirona") }
        ])))
        .mount(&server)
        .await;

    let medicines = CidService::new(&config_for(&server))
        .set_medicines(4, vec![3, 2, 3], TOKEN)
        .await
        .unwrap();

    let names: Vec<&str> = medicines.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["Dipirona", "Ibuprofeno"]);
}

#[tokio::test]
async fn catalog_routes_map_errors_to_status_codes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/medicines"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/cids"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let config = Arc::new(config_for(&server));
    let token = JwtTestUtils::create_test_token(&TestUser::default(), &config.supabase_jwt_secret, Some(1));

    let response = medicine_routes(config.clone())
        .oneshot(
            Request::builder()
                .uri("/?search=dipirona")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = cid_routes(config.clone())
        .oneshot(
            Request::builder()
                .uri("/4/medicines")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = cid_routes(config)
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
