// libs/medical-record-cell/tests/integration_test.rs
//
// Router-level tests with a wiremock storage collaborator: record creation
// completing the appointment, duplicate rejection, and per-vet visibility.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use medical_record_cell::router::medical_record_routes;
use shared_config::AppConfig;
use shared_utils::test_utils::{JwtTestUtils, MockStorageResponses, TestConfig, TestUser};

fn create_test_app(config: AppConfig) -> Router {
    medical_record_routes(Arc::new(config))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("response body is JSON")
}

fn authed(method: &str, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json");

    match body {
        Some(body) => builder.body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("valid request")
}

/// Storage mocks for attaching a record to a Scheduled appointment: the
/// appointment lookup, an empty duplicate check, the record insert and the
/// Complete patch.
async fn setup_create_mocks(mock_server: &MockServer, appointment_id: &str, vet_id: &str) {
    let pet_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStorageResponses::appointment_response(
                appointment_id,
                &pet_id,
                vet_id,
                "2025-03-03T10:00:00Z",
                "2025-03-03T10:30:00Z",
                "Scheduled",
            )
        ])))
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/medical_records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/medical_records"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockStorageResponses::medical_record_response(appointment_id, &pet_id, vet_id)
        ])))
        .mount(mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStorageResponses::appointment_response(
                appointment_id,
                &pet_id,
                vet_id,
                "2025-03-03T10:00:00Z",
                "2025-03-03T10:30:00Z",
                "Complete",
            )
        ])))
        .mount(mock_server)
        .await;
}

// ==============================================================================
// CREATE
// ==============================================================================

#[tokio::test]
async fn creating_a_record_completes_the_appointment() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_storage_url(&mock_server.uri());
    let user = TestUser::veterinarian("vet@clinic.example");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, None);

    let appointment_id = Uuid::new_v4().to_string();
    setup_create_mocks(&mock_server, &appointment_id, &user.id).await;

    let body = json!({
        "appointment_id": appointment_id,
        "diagnosis": "Mild otitis",
        "treatment": "Ear drops, 7 days",
        "notes": "Recheck in two weeks"
    });

    let app = create_test_app(config.to_app_config());
    let response = app
        .oneshot(authed("POST", "/", &token, Some(body)))
        .await
        .expect("router call");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["medical_record"]["id"], json!(appointment_id));
    assert_eq!(body["medical_record"]["appointment_id"], json!(appointment_id));

    // The appointment was patched to Complete.
    let requests = mock_server
        .received_requests()
        .await
        .expect("recorded requests");
    let patched = requests.iter().any(|r| {
        r.method == wiremock::http::Method::PATCH
            && r.url.path() == "/rest/v1/appointments"
            && String::from_utf8_lossy(&r.body).contains("Complete")
    });
    assert!(patched, "expected a PATCH flipping the appointment to Complete");
}

#[tokio::test]
async fn duplicate_record_is_rejected() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_storage_url(&mock_server.uri());
    let user = TestUser::veterinarian("vet@clinic.example");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, None);

    let appointment_id = Uuid::new_v4().to_string();
    let pet_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStorageResponses::appointment_response(
                &appointment_id,
                &pet_id,
                &user.id,
                "2025-03-03T10:00:00Z",
                "2025-03-03T10:30:00Z",
                "Scheduled",
            )
        ])))
        .mount(&mock_server)
        .await;

    // Duplicate check finds an existing record with the appointment's id.
    Mock::given(method("GET"))
        .and(path("/rest/v1/medical_records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStorageResponses::medical_record_response(&appointment_id, &pet_id, &user.id)
        ])))
        .mount(&mock_server)
        .await;

    let body = json!({
        "appointment_id": appointment_id,
        "diagnosis": "Mild otitis",
        "treatment": "Ear drops, 7 days"
    });

    let app = create_test_app(config.to_app_config());
    let response = app
        .oneshot(authed("POST", "/", &token, Some(body)))
        .await
        .expect("router call");

    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Nothing was inserted.
    let requests = mock_server
        .received_requests()
        .await
        .expect("recorded requests");
    assert!(requests
        .iter()
        .all(|r| r.method != wiremock::http::Method::POST));
}

#[tokio::test]
async fn record_for_a_canceled_appointment_is_rejected() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_storage_url(&mock_server.uri());
    let user = TestUser::veterinarian("vet@clinic.example");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, None);

    let appointment_id = Uuid::new_v4().to_string();
    let mut canceled = MockStorageResponses::appointment_response(
        &appointment_id,
        &Uuid::new_v4().to_string(),
        &user.id,
        "2025-03-03T10:00:00Z",
        "2025-03-03T10:30:00Z",
        "Canceled",
    );
    canceled["canceled_at"] = json!("2025-03-01T12:00:00Z");

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([canceled])))
        .mount(&mock_server)
        .await;

    let body = json!({
        "appointment_id": appointment_id,
        "diagnosis": "n/a",
        "treatment": "n/a"
    });

    let app = create_test_app(config.to_app_config());
    let response = app
        .oneshot(authed("POST", "/", &token, Some(body)))
        .await
        .expect("router call");

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn receptionist_cannot_create_records() {
    let config = TestConfig::default();
    let user = TestUser::receptionist("front-desk@clinic.example");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, None);

    let body = json!({
        "appointment_id": Uuid::new_v4(),
        "diagnosis": "n/a",
        "treatment": "n/a"
    });

    let app = create_test_app(config.to_app_config());
    let response = app
        .oneshot(authed("POST", "/", &token, Some(body)))
        .await
        .expect("router call");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ==============================================================================
// VISIBILITY
// ==============================================================================

#[tokio::test]
async fn veterinarian_list_is_scoped_to_their_own_records() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_storage_url(&mock_server.uri());
    let user = TestUser::veterinarian("vet@clinic.example");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, None);

    Mock::given(method("GET"))
        .and(path("/rest/v1/medical_records"))
        .and(query_param("vet_id", format!("eq.{}", user.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStorageResponses::medical_record_response(
                &Uuid::new_v4().to_string(),
                &Uuid::new_v4().to_string(),
                &user.id,
            )
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config.to_app_config());
    let response = app
        .oneshot(authed("GET", "/", &token, None))
        .await
        .expect("router call");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["count"], json!(1));
    assert_eq!(body["medical_records"][0]["vet_id"], json!(user.id));
}

#[tokio::test]
async fn veterinarian_cannot_read_another_vets_record() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_storage_url(&mock_server.uri());
    let user = TestUser::veterinarian("vet@clinic.example");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, None);

    let record_id = Uuid::new_v4().to_string();
    let other_vet = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/medical_records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStorageResponses::medical_record_response(
                &record_id,
                &Uuid::new_v4().to_string(),
                &other_vet,
            )
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config.to_app_config());
    let response = app
        .oneshot(authed("GET", &format!("/{}", record_id), &token, None))
        .await
        .expect("router call");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_reads_any_record() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_storage_url(&mock_server.uri());
    let user = TestUser::admin("admin@clinic.example");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, None);

    let record_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/medical_records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStorageResponses::medical_record_response(
                &record_id,
                &Uuid::new_v4().to_string(),
                &Uuid::new_v4().to_string(),
            )
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config.to_app_config());
    let response = app
        .oneshot(authed("GET", &format!("/{}", record_id), &token, None))
        .await
        .expect("router call");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["medical_record"]["id"], json!(record_id));
}
