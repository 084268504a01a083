use std::sync::Arc;

use assert_matches::assert_matches;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use chrono::NaiveDate;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use prescription_cell::models::*;
use prescription_cell::router::prescription_routes;
use prescription_cell::services::prescription::PrescriptionService;
use shared_config::AppConfig;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

const TOKEN: &str = "user-token";

fn config_for(server: &MockServer) -> AppConfig {
    AppConfig {
        supabase_url: server.uri(),
        ..TestConfig::default().to_app_config()
    }
}

fn prescription_row(id: i64, items: Value) -> Value {
    json!({
        "id": id,
        "patient_id": 5,
        "doctor_id": 1,
        "cid_id": 4,
        "instructions": "Repouso relativo",
        "prescription_date": "2024-06-01",
        "valid_until": "2024-07-01",
        "is_active": true,
        "created_at": "2024-06-01T10:00:00Z",
        "updated_at": "2024-06-01T10:00:00Z",
        "items": items,
        "cid": { "id": 4, "code": "M54.5", "description": "Dor lombar baixa" }
    })
}

fn dipirona_item() -> PrescriptionItemRequest {
    PrescriptionItemRequest {
        medicine_id: 2,
        dosage: "1 comprimido".to_string(),
        frequency: "6/6h".to_string(),
        duration: "5 dias".to_string(),
        notes: None,
    }
}

fn create_request(items: Vec<PrescriptionItemRequest>) -> CreatePrescriptionRequest {
    CreatePrescriptionRequest {
        patient_id: 5,
        cid_id: Some(4),
        items,
        instructions: Some("Repouso relativo".to_string()),
        prescription_date: NaiveDate::from_ymd_opt(2024, 6, 1),
        valid_until: NaiveDate::from_ymd_opt(2024, 7, 1),
    }
}

async fn mount_catalog(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/medicines"))
        .and(query_param("id", "in.(2)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 2 }])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/cids"))
        .and(query_param("id", "eq.4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::cid_response(4, "M54.5")
        ])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn create_stores_prescription_and_items() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/prescriptions"))
        .and(body_partial_json(json!({
            "patient_id": 5,
            "doctor_id": 1,
            "cid_id": 4,
            "prescription_date": "2024-06-01",
            "is_active": true
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([prescription_row(20, json!([]))])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/prescription_items"))
        .and(body_partial_json(json!([{ "prescription_id": 20, "medicine_id": 2, "frequency": "6/6h" }])))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/prescriptions"))
        .and(query_param("id", "eq.20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([prescription_row(20, json!([{
            "id": 31,
            "medicine_id": 2,
            "dosage": "1 comprimido",
            "frequency": "6/6h",
            "duration": "5 dias",
            "medicine": { "id": 2, "name": "Dipirona", "dosage": "500mg", "form": "comprimido" }
        }]))])))
        .mount(&server)
        .await;

    let service = PrescriptionService::new(&config_for(&server));
    let prescription = service
        .create_prescription(create_request(vec![dipirona_item()]), 1, TOKEN)
        .await
        .unwrap();

    assert_eq!(prescription.id, 20);
    assert_eq!(prescription.items.len(), 1);
    assert_eq!(prescription.items[0].medicine.as_ref().unwrap().name, "Dipirona");
    assert_eq!(prescription.cid.unwrap().code, "M54.5");
}

#[tokio::test]
async fn prescription_without_items_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/prescriptions"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let result = PrescriptionService::new(&config_for(&server))
        .create_prescription(create_request(Vec::new()), 1, TOKEN)
        .await;

    assert_matches!(result, Err(PrescriptionError::ValidationError(msg)) if msg.contains("pelo menos um medicamento"));
}

#[tokio::test]
async fn unknown_medicine_blocks_creation() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/medicines"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/prescriptions"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let result = PrescriptionService::new(&config_for(&server))
        .create_prescription(create_request(vec![dipirona_item()]), 1, TOKEN)
        .await;

    assert_eq!(result, Err(PrescriptionError::MedicineNotFound(2)));
}

#[tokio::test]
async fn validity_before_prescription_date_is_rejected() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;

    let mut request = create_request(vec![dipirona_item()]);
    request.valid_until = NaiveDate::from_ymd_opt(2024, 5, 1);

    let result = PrescriptionService::new(&config_for(&server))
        .create_prescription(request, 1, TOKEN)
        .await;

    assert_matches!(result, Err(PrescriptionError::ValidationError(_)));
}

#[tokio::test]
async fn patient_history_is_newest_first() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/prescriptions"))
        .and(query_param("patient_id", "eq.5"))
        .and(query_param("is_active", "eq.true"))
        .and(query_param("order", "prescription_date.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            prescription_row(21, json!([])),
            prescription_row(20, json!([]))
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let prescriptions = PrescriptionService::new(&config_for(&server))
        .list_by_patient(5, TOKEN)
        .await
        .unwrap();

    let ids: Vec<i64> = prescriptions.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![21, 20]);
}

#[tokio::test]
async fn update_with_items_replaces_them() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/prescriptions"))
        .and(query_param("id", "eq.20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([prescription_row(20, json!([]))])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/prescription_items"))
        .and(query_param("prescription_id", "eq.20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/prescription_items"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/prescriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let request = UpdatePrescriptionRequest {
        items: Some(vec![dipirona_item()]),
        ..Default::default()
    };
    let prescription = PrescriptionService::new(&config_for(&server))
        .update_prescription(20, request, TOKEN)
        .await
        .unwrap();

    assert_eq!(prescription.id, 20);
}

#[tokio::test]
async fn remove_soft_deletes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/prescriptions"))
        .and(query_param("id", "eq.20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([prescription_row(20, json!([]))])))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/prescriptions"))
        .and(query_param("id", "eq.20"))
        .and(body_partial_json(json!({ "is_active": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([prescription_row(20, json!([]))])))
        .expect(1)
        .mount(&server)
        .await;

    let service = PrescriptionService::new(&config_for(&server));
    tokio_test::assert_ok!(service.remove_prescription(20, TOKEN).await);
}

#[tokio::test]
async fn routes_use_authenticated_doctor() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/prescriptions"))
        .and(query_param("doctor_id", "eq.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([prescription_row(20, json!([]))])))
        .expect(1)
        .mount(&server)
        .await;

    let config = Arc::new(config_for(&server));
    let token = JwtTestUtils::create_test_token(&TestUser::default(), &config.supabase_jwt_secret, Some(1));

    let response = prescription_routes(config.clone())
        .oneshot(
            Request::builder()
                .uri("/")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = prescription_routes(config)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("Authorization", format!("Bearer {}", token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "patientId": 5, "items": [] }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
