use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            ..AppConfig::default()
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: i64,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self::doctor(1, "doctor@medflow.com")
    }
}

impl TestUser {
    pub fn new(id: i64, email: &str, role: &str) -> Self {
        Self {
            id,
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn doctor(id: i64, email: &str) -> Self {
        Self::new(id, email, "doctor")
    }

    pub fn admin(id: i64, email: &str) -> Self {
        Self::new(id, email, "admin")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.to_string(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id.to_string(),
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Canned PostgREST rows for the MedFlow tables.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn doctor_response(doctor_id: i64) -> serde_json::Value {
        json!({
            "id": doctor_id,
            "name": "Dr. Carlos Mendes",
            "email": "carlos@medflow.com",
            "crm": "CRM-SP 123456",
            "specialty": "Ortopedia",
            "role": "doctor",
            "is_active": true,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn patient_response(patient_id: i64, doctor_id: i64) -> serde_json::Value {
        json!({
            "id": patient_id,
            "name": "Maria Silva",
            "cpf": "123.456.789-00",
            "birth_date": "1980-05-12",
            "phone": "(11) 99999-0000",
            "email": "maria@example.com",
            "address": "Rua das Flores, 100",
            "medical_history": "Fratura de tíbia em 2019",
            "allergies": null,
            "doctor_id": doctor_id,
            "is_active": true,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn medicine_response(medicine_id: i64, name: &str) -> serde_json::Value {
        json!({
            "id": medicine_id,
            "name": name,
            "active_ingredient": "Dipirona monoidratada",
            "dosage": "500mg",
            "form": "comprimido",
            "manufacturer": "EMS",
            "instructions": "Tomar com água",
            "is_active": true,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn cid_response(cid_id: i64, code: &str) -> serde_json::Value {
        json!({
            "id": cid_id,
            "code": code,
            "description": "Dor lombar baixa",
            "category": "Doenças do sistema osteomuscular",
            "is_active": true,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn appointment_response(appointment_id: i64, patient_id: i64, doctor_id: i64) -> serde_json::Value {
        json!({
            "id": appointment_id,
            "title": "Consulta de retorno",
            "description": null,
            "appointment_date": "2024-06-01T10:00:00Z",
            "duration": 30,
            "status": "scheduled",
            "type": "consultation",
            "notes": null,
            "meeting_link_type": "google_meet",
            "meet_link": null,
            "google_event_id": null,
            "custom_meeting_url": null,
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "is_active": true,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "message": message,
            "code": code
        })
    }
}
